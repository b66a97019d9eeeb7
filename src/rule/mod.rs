//! This module defines the `Rule` type for retroactively categorizing transactions.
//! A rule pairs a condition tree over transaction fields with the category to
//! assign when the condition matches.

mod apply_endpoint;
mod condition;
mod matcher;
mod models;
mod preview_endpoint;

pub use apply_endpoint::{ApplyRequest, apply_rule_endpoint};
pub use condition::{Condition, TextField, TextMatch};
pub use matcher::matches;
pub use models::{NewRule, Rule};
pub use preview_endpoint::{DateRangeQuery, preview_rule_endpoint};
