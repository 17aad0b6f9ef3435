// cashrec - operator CLI: schema setup, demo data and closure reports

use anyhow::{Context, Result};
use cash_reconciliation::{
    dates, logging, money, seed_demo_data, store_closures, ClosureReport, Config, ConfigOverrides,
    Database, ReconciliationStatus, SeedOptions,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cashrec", version, about = "Cash reconciliation back-office")]
struct Cli {
    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database schema
    Init,

    /// Load deterministic demo data into an empty database
    Seed {
        #[arg(long, default_value_t = 20)]
        stores: usize,

        #[arg(long, default_value_t = 30)]
        days: u32,

        #[arg(long, default_value_t = 4)]
        analysts: usize,

        /// Last day with data (defaults to today, UTC)
        #[arg(long)]
        end_date: Option<String>,
    },

    /// Print the store closure report for one day
    Closure {
        /// Day to report, YYYY-MM-DD
        #[arg(long)]
        date: String,

        /// Only consider reconciliations with this status
        #[arg(long)]
        status: Option<String>,

        /// Also write the report as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.overrides)?;
    logging::init_tracing(&config.logging)?;

    let db = Database::open(&config.database.path).with_context(|| {
        format!(
            "Failed to open database at {}",
            config.database.path.display()
        )
    })?;

    let result = run(&db, &config, cli.command);
    db.close().context("Failed to close database")?;
    result
}

fn run(db: &Database, config: &Config, command: Command) -> Result<()> {
    match command {
        Command::Init => {
            println!("✓ Schema ready at {}", config.database.path.display());
        }
        Command::Seed {
            stores,
            days,
            analysts,
            end_date,
        } => {
            let end_date = match end_date {
                Some(raw) => dates::parse_date("end_date", &raw)?,
                None => dates::now().date_naive(),
            };
            let options = SeedOptions {
                stores,
                analysts,
                days,
                end_date,
            };

            let conn = db.connection()?;
            let summary = seed_demo_data(&conn, &options)?;

            println!("✓ Seeded demo data ending {}", end_date);
            println!("  Analysts:          {}", summary.analysts);
            println!("  Stores:            {}", summary.stores);
            println!("  Cash registers:    {}", summary.cash_registers);
            println!("  Sales:             {}", summary.sales);
            println!("  Deposits:          {}", summary.deposits);
            println!("  Reconciliations:   {}", summary.reconciliations);
            println!("  Evidence requests: {}", summary.evidence_requests);
        }
        Command::Closure { date, status, csv } => {
            let date = dates::parse_date("date", &date)?;
            let status = status
                .map(|s| s.parse::<ReconciliationStatus>())
                .transpose()?;

            let conn = db.connection()?;
            let report = store_closures(&conn, date, status)?;
            print_report(date, &report);

            if let Some(path) = csv {
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                report
                    .write_csv(file)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("\n✓ CSV written to {}", path.display());
            }
        }
    }

    Ok(())
}

fn print_report(date: NaiveDate, report: &ClosureReport) {
    println!("Store closure for {}", date);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "{:<36} {:>14} {:>14} {:>14}  {}",
        "Store", "Sales", "Deposits", "Balance", "Status"
    );

    for closure in &report.closures {
        let status = closure
            .reconciliation_status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<36} {:>14} {:>14} {:>14}  {}",
            truncate(&closure.store_name, 36),
            money::to_db(&closure.total_sales),
            money::to_db(&closure.total_deposits),
            money::to_db(&closure.balance),
            status
        );
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "Stores: {}  With register: {}  Without register: {}",
        report.total_stores, report.stores_with_register, report.stores_without_register
    );
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let cut: String = value.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
