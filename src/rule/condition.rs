//! The condition tree a rule uses to select transactions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Error;

/// A predicate over a transaction's descriptive fields.
///
/// Conditions are plain data so they can be stored as JSON alongside the rule.
///
/// ```ignore
/// // merchant contains "coffee" AND amount between -20.00 and 0.00
/// Condition::all(vec![
///     Condition::merchant_contains("coffee"),
///     Condition::amount_between(Some(Decimal::new(-2000, 2)), Some(Decimal::ZERO)),
/// ]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Matches when every child matches. An empty list matches everything.
    All {
        /// The conditions that must all match.
        conditions: Vec<Condition>,
    },
    /// Matches when at least one child matches. An empty list matches nothing.
    Any {
        /// The conditions of which at least one must match.
        conditions: Vec<Condition>,
    },
    /// Matches when the child does not.
    Not {
        /// The condition to negate.
        condition: Box<Condition>,
    },
    /// Compares a text field against a pattern, ignoring case and surrounding whitespace.
    Text {
        /// The transaction field to read.
        field: TextField,
        /// The text to look for.
        pattern: String,
        /// How `pattern` is compared with the field.
        #[serde(default)]
        match_type: TextMatch,
    },
    /// Matches amounts within the inclusive bounds. A missing bound is unbounded.
    Amount {
        /// The smallest amount that matches.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<Decimal>,
        /// The largest amount that matches.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<Decimal>,
    },
}

/// The text fields of a transaction a [Condition::Text] can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    /// The merchant name.
    Merchant,
    /// The statement description.
    Description,
    /// The account name.
    Account,
}

/// How the pattern of a [Condition::Text] is compared with a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    /// The field contains the pattern anywhere.
    #[default]
    Contains,
    /// The field starts with the pattern.
    StartsWith,
    /// The field is the pattern.
    Exact,
}

impl Condition {
    /// A condition that matches when all of `conditions` match.
    pub fn all(conditions: Vec<Condition>) -> Self {
        Self::All { conditions }
    }

    /// A condition that matches when any of `conditions` match.
    pub fn any(conditions: Vec<Condition>) -> Self {
        Self::Any { conditions }
    }

    /// A condition that matches when `condition` does not.
    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: Condition) -> Self {
        Self::Not {
            condition: Box::new(condition),
        }
    }

    /// A condition on a text field.
    pub fn text(field: TextField, pattern: &str, match_type: TextMatch) -> Self {
        Self::Text {
            field,
            pattern: pattern.to_owned(),
            match_type,
        }
    }

    /// A condition that matches merchants containing `pattern`.
    pub fn merchant_contains(pattern: &str) -> Self {
        Self::text(TextField::Merchant, pattern, TextMatch::Contains)
    }

    /// A condition that matches amounts between `min` and `max`, inclusive.
    pub fn amount_between(min: Option<Decimal>, max: Option<Decimal>) -> Self {
        Self::Amount { min, max }
    }

    /// Check that the condition can be evaluated.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidCondition] if a text pattern is empty or an
    /// amount range has `min > max`.
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Condition::All { conditions } | Condition::Any { conditions } => {
                conditions.iter().try_for_each(Condition::validate)
            }
            Condition::Not { condition } => condition.validate(),
            Condition::Text { field, pattern, .. } => {
                if pattern.trim().is_empty() {
                    Err(Error::InvalidCondition(format!(
                        "the pattern for the {field:?} field is empty"
                    )))
                } else {
                    Ok(())
                }
            }
            Condition::Amount {
                min: Some(min),
                max: Some(max),
            } if min > max => Err(Error::InvalidCondition(format!(
                "the minimum amount {min} is greater than the maximum amount {max}"
            ))),
            Condition::Amount { .. } => Ok(()),
        }
    }
}
