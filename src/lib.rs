// Cash Reconciliation - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod closure;
pub mod config;
pub mod dates;
pub mod db;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod money;
pub mod notification;
pub mod seed;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use closure::{store_closures, ClosureAggregator, ClosureReport, StoreClosure};
pub use config::{Config, ConfigOverrides};
pub use db::{setup_database, Database};
pub use entities::{
    Analyst, CashRegister, Deposit, EvidenceRequest, EvidenceStatus, Reconciliation,
    ReconciliationStatus, Sale, Store,
};
pub use error::{AppError, AppResult};
pub use seed::{seed_demo_data, SeedOptions, SeedSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
