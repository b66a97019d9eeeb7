use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use rust_decimal::Decimal;
use time::macros::date;

use rulebatch::{
    CategoryName, Condition, NewRule, SQLiteLedger, Transaction,
    stores::{Ledger, RuleStore, TransactionStore},
};

/// A utility for creating a test database for the rulebatch API server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
///
/// The database holds one rule, "merchant contains COFFEE" assigning "Dining",
/// and three transactions: one the rule would change, one that is already
/// "Dining" and one the rule does not match.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    if output_path
        .extension()
        .is_none_or(|extension| extension.is_empty())
    {
        eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
        exit(1);
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let ledger = SQLiteLedger::open(Connection::open(output_path)?)?;
    let dining = CategoryName::new("Dining")?;

    println!("Creating test rule and transactions...");

    let rule_id = ledger.atomically(|scope| {
        let rule = scope.create_rule(NewRule::new(
            "Coffee shops",
            Condition::merchant_contains("COFFEE"),
            dining.clone(),
        ))?;

        scope.create_transaction(
            Transaction::build(Decimal::new(-550, 2), date!(2025 - 10 - 01))
                .merchant("BLUE BOTTLE COFFEE")
                .account("Everyday"),
        )?;
        scope.create_transaction(
            Transaction::build(Decimal::new(-425, 2), date!(2025 - 10 - 02))
                .merchant("COFFEE SHOP")
                .account("Everyday")
                .category(Some(dining.clone())),
        )?;
        scope.create_transaction(
            Transaction::build(Decimal::new(-180000, 2), date!(2025 - 10 - 03))
                .merchant("RENT")
                .description("Monthly rent")
                .account("Everyday"),
        )?;

        Ok(rule.id)
    })?;

    println!("Success! Try previewing rule {rule_id}.");

    Ok(())
}
