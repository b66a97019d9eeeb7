//! Evaluates rule conditions against transactions.

use crate::{
    rule::{Condition, TextField, TextMatch},
    transaction::Transaction,
};

/// Check whether `transaction` satisfies `condition`.
///
/// Pure and deterministic. A condition on a field the transaction does not
/// have (e.g. no merchant) does not match. Amounts are compared as exact
/// decimals.
pub fn matches(condition: &Condition, transaction: &Transaction) -> bool {
    match condition {
        Condition::All { conditions } => conditions
            .iter()
            .all(|condition| matches(condition, transaction)),
        Condition::Any { conditions } => conditions
            .iter()
            .any(|condition| matches(condition, transaction)),
        Condition::Not { condition } => !matches(condition, transaction),
        Condition::Text {
            field,
            pattern,
            match_type,
        } => match text_field(transaction, *field) {
            Some(value) => matches_text(value, pattern, *match_type),
            None => false,
        },
        Condition::Amount { min, max } => {
            min.is_none_or(|min| transaction.amount >= min)
                && max.is_none_or(|max| transaction.amount <= max)
        }
    }
}

fn text_field(transaction: &Transaction, field: TextField) -> Option<&str> {
    match field {
        TextField::Merchant => transaction.merchant.as_deref(),
        TextField::Description => transaction.description.as_deref(),
        TextField::Account => transaction.account.as_deref(),
    }
}

/// Compare `value` with `pattern` (case-insensitive, surrounding whitespace ignored).
#[inline]
fn matches_text(value: &str, pattern: &str, match_type: TextMatch) -> bool {
    let value = value.trim().to_lowercase();
    let pattern = pattern.trim().to_lowercase();

    // An empty pattern would match every transaction, which is never what a rule means.
    if pattern.is_empty() {
        return false;
    }

    match match_type {
        TextMatch::Contains => value.contains(&pattern),
        TextMatch::StartsWith => value.starts_with(&pattern),
        TextMatch::Exact => value == pattern,
    }
}
