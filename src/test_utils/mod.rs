#![allow(missing_docs)]

use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{OffsetDateTime, macros::{date, datetime}};

use crate::{
    AppState, CategoryName, RuleEngine, RuleId, SQLiteLedger, TransactionId,
    rule::{Condition, NewRule},
    stores::{Ledger, RuleStore, TransactionStore},
    transaction::Transaction,
};

/// The IDs of the rows created by [seeded_state].
pub(crate) struct Seeded {
    pub rule_id: RuleId,
    pub t1: TransactionId,
    pub t2: TransactionId,
    pub t3: TransactionId,
}

fn fixed_clock() -> OffsetDateTime {
    datetime!(2025-10-17 09:30:00 UTC)
}

/// An [AppState] over an in-memory database holding the coffee rule and
/// three transactions: "BLUE BOTTLE COFFEE" (uncategorized), "COFFEE SHOP"
/// (already "Dining") and "RENT" (uncategorized).
#[track_caller]
pub(crate) fn seeded_state() -> (AppState, Seeded) {
    let ledger = SQLiteLedger::open(Connection::open_in_memory().unwrap()).unwrap();
    let dining = CategoryName::new_unchecked("Dining");

    let seeded = ledger
        .atomically(|scope| {
            let rule = scope.create_rule(NewRule::new(
                "Coffee",
                Condition::merchant_contains("COFFEE"),
                dining.clone(),
            ))?;
            let t1 = scope.create_transaction(
                Transaction::build(Decimal::new(-550, 2), date!(2025 - 10 - 01))
                    .merchant("BLUE BOTTLE COFFEE"),
            )?;
            let t2 = scope.create_transaction(
                Transaction::build(Decimal::new(-425, 2), date!(2025 - 10 - 02))
                    .merchant("COFFEE SHOP")
                    .category(Some(dining.clone())),
            )?;
            let t3 = scope.create_transaction(
                Transaction::build(Decimal::new(-180000, 2), date!(2025 - 10 - 03))
                    .merchant("RENT"),
            )?;

            Ok(Seeded {
                rule_id: rule.id,
                t1: t1.id,
                t2: t2.id,
                t3: t3.id,
            })
        })
        .unwrap();

    let state = AppState::from_engine(RuleEngine::with_clock(ledger, fixed_clock));

    (state, seeded)
}
