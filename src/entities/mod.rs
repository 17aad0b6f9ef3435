// Entity records and their repository functions
//
// Each entity is a plain data record. Relationships are followed with
// explicit `find_*` / `list_*` calls, never lazily.

use crate::error::AppError;
use thiserror::Error;

/// A status string outside an entity's enumerated set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid status. Allowed statuses: {allowed}")]
pub struct ParseStatusError {
    pub value: String,
    pub allowed: &'static str,
}

impl From<ParseStatusError> for AppError {
    fn from(err: ParseStatusError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Implements `as_str`, `Display`, `FromStr` and the SQLite conversions for a
/// status enum stored as text
macro_rules! text_status {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn allowed_list() -> &'static str {
                concat!($($text, ", "),+).trim_end_matches(", ")
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::entities::ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::entities::ParseStatusError {
                        value: other.to_string(),
                        allowed: $name::allowed_list(),
                    }),
                }
            }
        }

        impl rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| rusqlite::types::FromSqlError::Other(Box::new(e)))
            }
        }

        impl From<$name> for rusqlite::types::Value {
            fn from(status: $name) -> Self {
                rusqlite::types::Value::Text(status.as_str().to_string())
            }
        }
    };
}

pub mod analyst;
pub mod cash_register;
pub mod deposit;
pub mod evidence_request;
pub mod reconciliation;
pub mod sale;
pub mod store;

pub use analyst::{Analyst, NewAnalyst};
pub use cash_register::{CashRegister, NewCashRegister};
pub use deposit::{Deposit, DepositListItem, DepositQuery, NewDeposit};
pub use evidence_request::{EvidenceRequest, EvidenceRequestItem, EvidenceStatus, NewEvidenceRequest};
pub use reconciliation::{NewReconciliation, Reconciliation, ReconciliationQuery, ReconciliationStatus};
pub use sale::{NewSale, PaymentAmounts, Sale};
pub use store::{NewStore, Store};
