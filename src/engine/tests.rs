//! End to end tests for the rule engine, run against both ledgers.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{
    OffsetDateTime,
    macros::{date, datetime},
};

use crate::{
    CategoryName, DateRange, Error, MemoryLedger, SQLiteLedger,
    database_id::{RuleId, TransactionId},
    engine::RuleEngine,
    initialize_db,
    rule::{Condition, NewRule},
    stores::{
        FailurePoint, Ledger, RuleStore, TransactionQuery, TransactionStore,
    },
    transaction::Transaction,
};

fn fixed_clock() -> OffsetDateTime {
    datetime!(2025-10-17 09:30:00 UTC)
}

fn memory_engine() -> RuleEngine<MemoryLedger> {
    RuleEngine::with_clock(MemoryLedger::new(), fixed_clock)
}

fn sqlite_engine() -> RuleEngine<SQLiteLedger> {
    let connection = Connection::open_in_memory().unwrap();
    RuleEngine::with_clock(SQLiteLedger::open(connection).unwrap(), fixed_clock)
}

fn sqlite_engine_with_connection() -> (RuleEngine<SQLiteLedger>, Arc<Mutex<Connection>>) {
    let connection = Connection::open_in_memory().unwrap();
    initialize_db(&connection).unwrap();
    let connection = Arc::new(Mutex::new(connection));
    let engine = RuleEngine::with_clock(SQLiteLedger::new(connection.clone()), fixed_clock);

    (engine, connection)
}

fn dining() -> CategoryName {
    CategoryName::new_unchecked("Dining")
}

/// The coffee rule and transactions:
/// - T1 "BLUE BOTTLE COFFEE", uncategorized,
/// - T2 "COFFEE SHOP", already "Dining",
/// - T3 "RENT", uncategorized.
struct Fixture {
    rule_id: RuleId,
    t1: TransactionId,
    t2: TransactionId,
    t3: TransactionId,
}

fn seed(ledger: &impl Ledger) -> Fixture {
    ledger
        .atomically(|scope| {
            let rule = scope.create_rule(NewRule::new(
                "Coffee",
                Condition::merchant_contains("COFFEE"),
                dining(),
            ))?;
            let t1 = scope.create_transaction(
                Transaction::build(Decimal::new(-550, 2), date!(2025 - 10 - 01))
                    .merchant("BLUE BOTTLE COFFEE"),
            )?;
            let t2 = scope.create_transaction(
                Transaction::build(Decimal::new(-425, 2), date!(2025 - 10 - 02))
                    .merchant("COFFEE SHOP")
                    .category(Some(dining())),
            )?;
            let t3 = scope.create_transaction(
                Transaction::build(Decimal::new(-180000, 2), date!(2025 - 10 - 03))
                    .merchant("RENT"),
            )?;

            Ok(Fixture {
                rule_id: rule.id,
                t1: t1.id,
                t2: t2.id,
                t3: t3.id,
            })
        })
        .unwrap()
}

fn create_rule(ledger: &impl Ledger, rule: NewRule) -> RuleId {
    ledger
        .atomically(|scope| scope.create_rule(rule))
        .unwrap()
        .id
}

fn add_transaction(ledger: &impl Ledger, merchant: &str, date: time::Date) -> TransactionId {
    ledger
        .atomically(|scope| {
            scope.create_transaction(Transaction::build(Decimal::ONE, date).merchant(merchant))
        })
        .unwrap()
        .id
}

fn all_transactions(ledger: &impl Ledger) -> Vec<Transaction> {
    ledger
        .atomically(|scope| scope.query_transactions(&TransactionQuery::default()))
        .unwrap()
}

fn category_of(ledger: &impl Ledger, id: TransactionId) -> Option<CategoryName> {
    ledger
        .atomically(|scope| scope.get_transaction(id))
        .unwrap()
        .category
}

fn worked_example<L: Ledger>(engine: RuleEngine<L>) {
    let fixture = seed(engine.ledger());

    let preview = engine.preview(fixture.rule_id, None).unwrap();

    assert_eq!(preview.matched_count, 2);
    assert_eq!(preview.would_change_count, 1);
    assert_eq!(preview.entries.len(), 2);
    assert_eq!(preview.entries[0].transaction_id, fixture.t1);
    assert_eq!(preview.entries[0].previous_category, None);
    assert_eq!(preview.entries[0].new_category, dining());
    assert!(!preview.entries[0].no_op);
    assert_eq!(preview.entries[1].transaction_id, fixture.t2);
    assert_eq!(preview.entries[1].previous_category, Some(dining()));
    assert!(preview.entries[1].no_op);

    let batch = engine.apply(fixture.rule_id, None).unwrap();

    assert_eq!(batch.rule_id, fixture.rule_id);
    assert_eq!(batch.created_at, fixed_clock());
    assert_eq!(batch.changes.len(), 1);
    assert_eq!(batch.changes[0].transaction_id, fixture.t1);
    assert_eq!(batch.changes[0].previous_category, None);
    assert_eq!(batch.changes[0].new_category, dining());
    assert_eq!(category_of(engine.ledger(), fixture.t1), Some(dining()));
    assert_eq!(category_of(engine.ledger(), fixture.t3), None);

    let undo = engine.undo(batch.id).unwrap();

    assert_eq!(undo.batch_id, batch.id);
    assert_eq!(undo.transactions_reverted, 1);
    assert!(undo.overwritten.is_empty());
    assert_eq!(category_of(engine.ledger(), fixture.t1), None);
    assert_eq!(category_of(engine.ledger(), fixture.t2), Some(dining()));

    assert_eq!(engine.undo(batch.id), Err(Error::AlreadyUndone(batch.id)));
    assert_eq!(category_of(engine.ledger(), fixture.t1), None);

    let stored = engine.get_batch(batch.id).unwrap();
    assert_eq!(stored.undone_at, Some(fixed_clock()));
}

#[test]
fn worked_example_memory() {
    worked_example(memory_engine());
}

#[test]
fn worked_example_sqlite() {
    worked_example(sqlite_engine());
}

fn preview_is_idempotent_and_read_only<L: Ledger>(engine: RuleEngine<L>) {
    let fixture = seed(engine.ledger());
    let before = all_transactions(engine.ledger());

    let first = engine.preview(fixture.rule_id, None).unwrap();
    let second = engine.preview(fixture.rule_id, None).unwrap();

    assert_eq!(first, second);
    assert_eq!(all_transactions(engine.ledger()), before);
    assert!(engine.list_batches(None, true, None).unwrap().is_empty());
}

#[test]
fn preview_is_idempotent_and_read_only_memory() {
    preview_is_idempotent_and_read_only(memory_engine());
}

#[test]
fn preview_is_idempotent_and_read_only_sqlite() {
    preview_is_idempotent_and_read_only(sqlite_engine());
}

fn apply_changes_exactly_what_preview_reports<L: Ledger>(engine: RuleEngine<L>) {
    let fixture = seed(engine.ledger());
    let t4 = add_transaction(engine.ledger(), "coffee cart", date!(2025 - 09 - 15));
    let t5 = add_transaction(engine.ledger(), "Coffee Roasters", date!(2025 - 10 - 20));
    let range = DateRange::new(date!(2025 - 09 - 01), date!(2025 - 10 - 10)).unwrap();

    let preview = engine.preview(fixture.rule_id, Some(range)).unwrap();
    let batch = engine.apply(fixture.rule_id, Some(range)).unwrap();

    let changed: Vec<TransactionId> = batch
        .changes
        .iter()
        .map(|change| change.transaction_id)
        .collect();
    assert_eq!(changed, preview.would_change_ids());
    assert_eq!(changed, vec![t4, fixture.t1]);
    assert_eq!(category_of(engine.ledger(), t5), None, "outside the date range");
}

#[test]
fn apply_changes_exactly_what_preview_reports_memory() {
    apply_changes_exactly_what_preview_reports(memory_engine());
}

#[test]
fn apply_changes_exactly_what_preview_reports_sqlite() {
    apply_changes_exactly_what_preview_reports(sqlite_engine());
}

fn apply_then_undo_restores_every_transaction<L: Ledger>(engine: RuleEngine<L>) {
    seed(engine.ledger());
    add_transaction(engine.ledger(), "BEAN COFFEE", date!(2025 - 10 - 04));
    let groceries_rule = create_rule(
        engine.ledger(),
        NewRule::new(
            "Anything but rent",
            Condition::not(Condition::merchant_contains("rent")),
            CategoryName::new_unchecked("Groceries"),
        ),
    );
    let before = all_transactions(engine.ledger());

    let batch = engine.apply(groceries_rule, None).unwrap();
    assert_eq!(batch.changes.len(), 3);
    assert_ne!(all_transactions(engine.ledger()), before);

    engine.undo(batch.id).unwrap();

    assert_eq!(all_transactions(engine.ledger()), before);
}

#[test]
fn apply_then_undo_restores_every_transaction_memory() {
    apply_then_undo_restores_every_transaction(memory_engine());
}

#[test]
fn apply_then_undo_restores_every_transaction_sqlite() {
    apply_then_undo_restores_every_transaction(sqlite_engine());
}

fn inactive_rule_can_be_previewed_but_not_applied<L: Ledger>(engine: RuleEngine<L>) {
    seed(engine.ledger());
    let rule_id = create_rule(
        engine.ledger(),
        NewRule::new("Off", Condition::merchant_contains("coffee"), dining()).active(false),
    );

    assert_eq!(engine.preview(rule_id, None).unwrap().would_change_count, 1);
    assert_eq!(engine.apply(rule_id, None), Err(Error::InactiveRule(rule_id)));
    assert!(engine.list_batches(None, true, None).unwrap().is_empty());
}

#[test]
fn inactive_rule_can_be_previewed_but_not_applied_memory() {
    inactive_rule_can_be_previewed_but_not_applied(memory_engine());
}

#[test]
fn inactive_rule_can_be_previewed_but_not_applied_sqlite() {
    inactive_rule_can_be_previewed_but_not_applied(sqlite_engine());
}

fn applying_twice_creates_no_empty_batch<L: Ledger>(engine: RuleEngine<L>) {
    let fixture = seed(engine.ledger());

    engine.apply(fixture.rule_id, None).unwrap();
    let second = engine.apply(fixture.rule_id, None);

    assert_eq!(second, Err(Error::NothingToApply(fixture.rule_id)));
    assert_eq!(engine.list_batches(None, true, None).unwrap().len(), 1);
    assert!(
        engine
            .preview(fixture.rule_id, None)
            .unwrap()
            .entries
            .iter()
            .all(|entry| entry.no_op)
    );
}

#[test]
fn applying_twice_creates_no_empty_batch_memory() {
    applying_twice_creates_no_empty_batch(memory_engine());
}

#[test]
fn applying_twice_creates_no_empty_batch_sqlite() {
    applying_twice_creates_no_empty_batch(sqlite_engine());
}

fn apply_previewed_rejects_stale_preview<L: Ledger>(engine: RuleEngine<L>) {
    let fixture = seed(engine.ledger());
    let preview = engine.preview(fixture.rule_id, None).unwrap();
    add_transaction(engine.ledger(), "NEW COFFEE", date!(2025 - 10 - 05));
    let before = all_transactions(engine.ledger());

    let result = engine.apply_previewed(&preview);

    assert_eq!(
        result,
        Err(Error::PreviewMismatch {
            rule_id: fixture.rule_id,
            expected: 1,
            actual: 2,
        })
    );
    assert_eq!(all_transactions(engine.ledger()), before);

    let fresh = engine.preview(fixture.rule_id, None).unwrap();
    let batch = engine.apply_previewed(&fresh).unwrap();
    assert_eq!(batch.changes.len(), 2);
}

#[test]
fn apply_previewed_rejects_stale_preview_memory() {
    apply_previewed_rejects_stale_preview(memory_engine());
}

#[test]
fn apply_previewed_rejects_stale_preview_sqlite() {
    apply_previewed_rejects_stale_preview(sqlite_engine());
}

fn undo_reports_overwrites<L: Ledger>(engine: RuleEngine<L>) {
    let fixture = seed(engine.ledger());
    let cafe_rule = create_rule(
        engine.ledger(),
        NewRule::new(
            "Blue Bottle",
            Condition::merchant_contains("blue bottle"),
            CategoryName::new_unchecked("Cafes"),
        ),
    );
    let coffee_batch = engine.apply(fixture.rule_id, None).unwrap();
    let cafe_batch = engine.apply(cafe_rule, None).unwrap();

    let undo = engine.undo(coffee_batch.id).unwrap();

    assert_eq!(undo.transactions_reverted, 1);
    assert_eq!(undo.overwritten.len(), 1);
    assert_eq!(undo.overwritten[0].transaction_id, fixture.t1);
    assert_eq!(undo.overwritten[0].later_batch_id, Some(cafe_batch.id));
    assert_eq!(
        undo.overwritten[0].current_category,
        Some(CategoryName::new_unchecked("Cafes"))
    );
    assert_eq!(undo.overwritten[0].restored_category, None);
    assert_eq!(category_of(engine.ledger(), fixture.t1), None);
}

#[test]
fn undo_reports_overwrites_memory() {
    undo_reports_overwrites(memory_engine());
}

#[test]
fn undo_reports_overwrites_sqlite() {
    undo_reports_overwrites(sqlite_engine());
}

fn undo_reports_manual_overwrites<L: Ledger>(engine: RuleEngine<L>) {
    let fixture = seed(engine.ledger());
    let batch = engine.apply(fixture.rule_id, None).unwrap();
    engine
        .ledger()
        .atomically(|scope| {
            scope.set_category(fixture.t1, Some(&CategoryName::new_unchecked("Manual")))
        })
        .unwrap();

    let undo = engine.undo(batch.id).unwrap();

    assert_eq!(undo.overwritten.len(), 1);
    assert_eq!(undo.overwritten[0].later_batch_id, None);
    assert_eq!(category_of(engine.ledger(), fixture.t1), None);
}

#[test]
fn undo_reports_manual_overwrites_memory() {
    undo_reports_manual_overwrites(memory_engine());
}

#[test]
fn undo_reports_manual_overwrites_sqlite() {
    undo_reports_manual_overwrites(sqlite_engine());
}

fn undo_reports_later_batch_with_same_category<L: Ledger>(engine: RuleEngine<L>) {
    let fixture = seed(engine.ledger());
    let first_batch = engine.apply(fixture.rule_id, None).unwrap();
    engine
        .ledger()
        .atomically(|scope| {
            scope.set_category(fixture.t1, Some(&CategoryName::new_unchecked("Manual")))
        })
        .unwrap();
    let second_batch = engine.apply(fixture.rule_id, None).unwrap();

    let undo = engine.undo(first_batch.id).unwrap();

    assert_eq!(undo.overwritten.len(), 1);
    assert_eq!(undo.overwritten[0].transaction_id, fixture.t1);
    assert_eq!(undo.overwritten[0].later_batch_id, Some(second_batch.id));
    assert_eq!(undo.overwritten[0].current_category, Some(dining()));
    assert_eq!(undo.overwritten[0].restored_category, None);
    assert_eq!(category_of(engine.ledger(), fixture.t1), None);
    assert!(!engine.get_batch(second_batch.id).unwrap().is_undone());
}

#[test]
fn undo_reports_later_batch_with_same_category_memory() {
    undo_reports_later_batch_with_same_category(memory_engine());
}

#[test]
fn undo_reports_later_batch_with_same_category_sqlite() {
    undo_reports_later_batch_with_same_category(sqlite_engine());
}

fn unknown_ids_are_not_found<L: Ledger>(engine: RuleEngine<L>) {
    seed(engine.ledger());

    assert_eq!(engine.preview(404, None), Err(Error::RuleNotFound(404)));
    assert_eq!(engine.apply(404, None), Err(Error::RuleNotFound(404)));
    assert_eq!(engine.undo(404), Err(Error::BatchNotFound(404)));
    assert_eq!(engine.get_batch(404), Err(Error::BatchNotFound(404)));
}

#[test]
fn unknown_ids_are_not_found_memory() {
    unknown_ids_are_not_found(memory_engine());
}

#[test]
fn unknown_ids_are_not_found_sqlite() {
    unknown_ids_are_not_found(sqlite_engine());
}

fn list_batches_filters_and_orders<L: Ledger>(engine: RuleEngine<L>) {
    let fixture = seed(engine.ledger());
    let rent_rule = create_rule(
        engine.ledger(),
        NewRule::new(
            "Rent",
            Condition::merchant_contains("rent"),
            CategoryName::new_unchecked("Housing"),
        ),
    );
    let coffee_batch = engine.apply(fixture.rule_id, None).unwrap();
    let rent_batch = engine.apply(rent_rule, None).unwrap();
    engine.undo(rent_batch.id).unwrap();

    let active = engine.list_batches(None, false, None).unwrap();
    let everything = engine.list_batches(None, true, None).unwrap();
    let for_rent = engine.list_batches(Some(rent_rule), true, None).unwrap();
    let limited = engine.list_batches(None, true, Some(1)).unwrap();

    assert_eq!(active, vec![coffee_batch.summary()]);
    assert_eq!(everything.len(), 2);
    assert_eq!(everything[0].id, rent_batch.id);
    assert!(everything[0].undone);
    assert_eq!(everything[1].id, coffee_batch.id);
    assert_eq!(for_rent.len(), 1);
    assert_eq!(for_rent[0].rule_id, rent_rule);
    assert_eq!(limited.len(), 1);
    assert_eq!(engine.list_batches(None, true, Some(0)), Err(Error::InvalidLimit(0)));
}

#[test]
fn list_batches_filters_and_orders_memory() {
    list_batches_filters_and_orders(memory_engine());
}

#[test]
fn list_batches_filters_and_orders_sqlite() {
    list_batches_filters_and_orders(sqlite_engine());
}

#[test]
fn failed_category_write_rolls_back_apply() {
    let engine = memory_engine();
    let fixture = seed(engine.ledger());
    let t4 = add_transaction(engine.ledger(), "LATE COFFEE", date!(2025 - 10 - 09));
    let before = all_transactions(engine.ledger());
    engine.ledger().fail_at(FailurePoint::SetCategory(t4));

    let result = engine.apply(fixture.rule_id, None);

    assert!(matches!(result, Err(Error::StoreFailure(_))));
    assert_eq!(all_transactions(engine.ledger()), before);
    assert!(engine.list_batches(None, true, None).unwrap().is_empty());
}

#[test]
fn failed_batch_write_rolls_back_apply() {
    let engine = memory_engine();
    let fixture = seed(engine.ledger());
    let before = all_transactions(engine.ledger());
    engine.ledger().fail_at(FailurePoint::CreateBatch);

    let result = engine.apply(fixture.rule_id, None);

    assert!(matches!(result, Err(Error::StoreFailure(_))));
    assert_eq!(all_transactions(engine.ledger()), before);
    assert!(engine.list_batches(None, true, None).unwrap().is_empty());
}

#[test]
fn failed_mark_undone_rolls_back_undo() {
    let engine = memory_engine();
    let fixture = seed(engine.ledger());
    let batch = engine.apply(fixture.rule_id, None).unwrap();
    engine.ledger().fail_at(FailurePoint::MarkUndone);

    let result = engine.undo(batch.id);

    assert!(matches!(result, Err(Error::StoreFailure(_))));
    assert_eq!(category_of(engine.ledger(), fixture.t1), Some(dining()));
    assert!(!engine.get_batch(batch.id).unwrap().is_undone());

    engine.ledger().clear_failure();
    assert_eq!(engine.undo(batch.id).unwrap().transactions_reverted, 1);
}

#[test]
fn sqlite_failure_rolls_back_apply() {
    let (engine, connection) = sqlite_engine_with_connection();
    let fixture = seed(engine.ledger());
    let before = all_transactions(engine.ledger());
    connection
        .lock()
        .unwrap()
        .execute(
            "CREATE TRIGGER reject_batch BEFORE INSERT ON batch
             BEGIN SELECT RAISE(ABORT, 'batch writes are disabled'); END",
            (),
        )
        .unwrap();

    let result = engine.apply(fixture.rule_id, None);

    assert!(matches!(result, Err(Error::SqlError(_))));
    assert_eq!(all_transactions(engine.ledger()), before);
    assert!(engine.list_batches(None, true, None).unwrap().is_empty());
}

#[test]
fn undo_with_missing_transaction_reverts_nothing() {
    let (engine, connection) = sqlite_engine_with_connection();
    let fixture = seed(engine.ledger());
    let t4 = add_transaction(engine.ledger(), "GONE COFFEE", date!(2025 - 10 - 09));
    let batch = engine.apply(fixture.rule_id, None).unwrap();
    connection
        .lock()
        .unwrap()
        .execute("DELETE FROM \"transaction\" WHERE id = ?1", [t4])
        .unwrap();

    let result = engine.undo(batch.id);

    assert_eq!(result, Err(Error::TransactionNotFound(t4)));
    assert_eq!(category_of(engine.ledger(), fixture.t1), Some(dining()));
    assert!(!engine.get_batch(batch.id).unwrap().is_undone());
}
