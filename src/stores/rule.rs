//! Defines the rule store trait.

use crate::{
    Error,
    database_id::RuleId,
    rule::{NewRule, Rule},
};

/// Handles the creation and retrieval of rules.
pub trait RuleStore {
    /// Store a new rule.
    ///
    /// Implementers must reject rules whose condition does not validate.
    fn create_rule(&mut self, rule: NewRule) -> Result<Rule, Error>;

    /// Retrieve a rule, or [Error::RuleNotFound] if `id` does not refer to a rule.
    fn get_rule(&self, id: RuleId) -> Result<Rule, Error>;
}
