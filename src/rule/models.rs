use serde::{Deserialize, Serialize};

use crate::{Error, category::CategoryName, database_id::RuleId, rule::Condition};

/// A rule that assigns `category` to every transaction matching `condition`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// The ID of the rule.
    pub id: RuleId,

    /// A label for the rule, used in listings and logs.
    pub name: String,

    /// Which transactions the rule applies to.
    pub condition: Condition,

    /// The category to assign when this rule matches.
    pub category: CategoryName,

    /// Inactive rules can be previewed but not applied.
    pub active: bool,
}

/// The fields needed to store a new [Rule].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRule {
    /// A label for the rule.
    pub name: String,
    /// Which transactions the rule applies to.
    pub condition: Condition,
    /// The category to assign when the rule matches.
    pub category: CategoryName,
    /// Whether the rule can be applied. Defaults to `true`.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl NewRule {
    /// Create an active rule.
    pub fn new(name: &str, condition: Condition, category: CategoryName) -> Self {
        Self {
            name: name.to_owned(),
            condition,
            category,
            active: true,
        }
    }

    /// Set whether the rule is active.
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Check that the rule's condition can be evaluated.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidCondition] if the condition is malformed.
    pub fn validate(&self) -> Result<(), Error> {
        self.condition.validate()
    }

    /// Create the [Rule] with the ID assigned by a store.
    pub fn finalise(self, id: RuleId) -> Rule {
        Rule {
            id,
            name: self.name,
            condition: self.condition,
            category: self.category,
            active: self.active,
        }
    }
}
