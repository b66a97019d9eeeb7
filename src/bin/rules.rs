use std::error::Error;

use clap::{Parser, Subcommand};
use rusqlite::Connection;
use serde::Serialize;
use time::{Date, macros::format_description};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use rulebatch::{BatchId, DateRange, RuleEngine, RuleId, SQLiteLedger, TransactionId};

/// An admin tool for previewing, applying and undoing rules against a rulebatch database.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show which transactions a rule would change, without changing them.
    Preview {
        #[arg(long)]
        rule_id: RuleId,
        /// The first day to include, e.g. 2025-01-01.
        #[arg(long, value_parser = parse_date)]
        start: Option<Date>,
        /// The last day to include, e.g. 2025-01-31.
        #[arg(long, value_parser = parse_date)]
        end: Option<Date>,
    },
    /// Apply a rule and record the changes as a batch.
    Apply {
        #[arg(long)]
        rule_id: RuleId,
        #[arg(long, value_parser = parse_date)]
        start: Option<Date>,
        #[arg(long, value_parser = parse_date)]
        end: Option<Date>,
        /// Only apply if the rule would change exactly these transactions.
        #[arg(long, value_delimiter = ',')]
        expect: Option<Vec<TransactionId>>,
    },
    /// Restore every transaction a batch changed to its previous category.
    Undo {
        #[arg(long)]
        batch_id: BatchId,
    },
    /// List batches, newest first.
    Batches {
        #[arg(long)]
        rule_id: Option<RuleId>,
        #[arg(long)]
        include_undone: bool,
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Show a batch and its changes.
    Show {
        #[arg(long)]
        batch_id: BatchId,
    },
}

fn parse_date(text: &str) -> Result<Date, time::error::Parse> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let connection = Connection::open(&args.db_path)?;
    let engine = RuleEngine::new(SQLiteLedger::open(connection)?);

    match args.command {
        Command::Preview {
            rule_id,
            start,
            end,
        } => print_json(&engine.preview(rule_id, DateRange::from_bounds(start, end)?)?),
        Command::Apply {
            rule_id,
            start,
            end,
            expect,
        } => {
            let date_range = DateRange::from_bounds(start, end)?;
            let batch = match expect {
                Some(expected) => engine.apply_expecting(rule_id, date_range, &expected)?,
                None => engine.apply(rule_id, date_range)?,
            };
            print_json(&batch)
        }
        Command::Undo { batch_id } => print_json(&engine.undo(batch_id)?),
        Command::Batches {
            rule_id,
            include_undone,
            limit,
        } => print_json(&engine.list_batches(rule_id, include_undone, limit)?),
        Command::Show { batch_id } => print_json(&engine.get_batch(batch_id)?),
    }
}

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);

    Ok(())
}
