//! Transactions the rule engine reads and recategorizes.
//!
//! This module contains:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - The inclusive `DateRange` used to bound previews and applies

mod core;
mod range;

pub use core::{Transaction, TransactionBuilder};
pub use range::DateRange;
