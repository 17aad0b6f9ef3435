// Persistence handle and schema
//
// One SQLite connection behind a mutex, opened explicitly at startup and
// closed explicitly at shutdown. Repository functions in `entities` take a
// borrowed `&Connection` obtained from `Database::connection`.

use crate::dates;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Persistence client handle
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database file and make sure the schema exists
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;

        // WAL for crash recovery on file-backed databases
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        tracing::info!(path = %path.display(), "database opened");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        setup_database(&conn)?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    /// Exclusive access to the connection for the duration of one request
    pub fn connection(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Unexpected("database connection lock poisoned".to_string()))
    }

    pub fn close(self) -> AppResult<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| AppError::Unexpected("database connection lock poisoned".to_string()))?;

        conn.close().map_err(|(_, err)| AppError::from(err))?;
        tracing::info!("database closed");
        Ok(())
    }
}

/// Create tables and indexes. Safe to run on every start.
pub fn setup_database(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS stores (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL CHECK (length(name) <= 200),
            tax_id TEXT UNIQUE CHECK (tax_id IS NULL OR length(tax_id) <= 14),
            address TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS analysts (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL CHECK (length(name) <= 200),
            email TEXT NOT NULL UNIQUE CHECK (length(email) <= 200),
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cash_registers (
            id TEXT PRIMARY KEY,
            store_id TEXT NOT NULL REFERENCES stores(id) ON DELETE CASCADE,
            date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (store_id, date)
        );

        CREATE TABLE IF NOT EXISTS sales (
            id TEXT PRIMARY KEY,
            cash_register_id TEXT NOT NULL REFERENCES cash_registers(id) ON DELETE CASCADE,
            sale_date TEXT NOT NULL,
            description TEXT,
            cash TEXT NOT NULL DEFAULT '0.00',
            pix TEXT NOT NULL DEFAULT '0.00',
            digital_wallets TEXT NOT NULL DEFAULT '0.00',
            credit_card TEXT NOT NULL DEFAULT '0.00',
            debit_card TEXT NOT NULL DEFAULT '0.00',
            net_sales TEXT NOT NULL DEFAULT '0.00',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS deposits (
            id TEXT PRIMARY KEY,
            cash_register_id TEXT NOT NULL REFERENCES cash_registers(id) ON DELETE CASCADE,
            sale_id TEXT REFERENCES sales(id) ON DELETE SET NULL,
            code TEXT NOT NULL CHECK (length(code) <= 100),
            amount TEXT NOT NULL,
            deposit_date TEXT NOT NULL,
            verified INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS reconciliations (
            id TEXT PRIMARY KEY,
            store_id TEXT NOT NULL REFERENCES stores(id) ON DELETE CASCADE,
            analyst_id TEXT REFERENCES analysts(id) ON DELETE SET NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'open'
                CHECK (status IN ('open', 'closed', 'pending_return', 'not_integrated')),
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (store_id, date)
        );

        CREATE TABLE IF NOT EXISTS evidence_requests (
            id TEXT PRIMARY KEY,
            reconciliation_id TEXT NOT NULL REFERENCES reconciliations(id) ON DELETE CASCADE,
            message TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'responded', 'canceled')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_cash_registers_date ON cash_registers(date);
        CREATE INDEX IF NOT EXISTS idx_sales_register ON sales(cash_register_id);
        CREATE INDEX IF NOT EXISTS idx_deposits_register ON deposits(cash_register_id);
        CREATE INDEX IF NOT EXISTS idx_deposits_sale ON deposits(sale_id);
        CREATE INDEX IF NOT EXISTS idx_deposits_date ON deposits(deposit_date);
        CREATE INDEX IF NOT EXISTS idx_reconciliations_date ON reconciliations(date);
        CREATE INDEX IF NOT EXISTS idx_evidence_reconciliation
            ON evidence_requests(reconciliation_id, created_at);
        ",
    )?;

    Ok(())
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ============================================================================
// COLUMN DECODING
// ============================================================================

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn get_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    dates::parse_timestamp(&raw).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, dates::DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_money(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    crate::money::from_db(&raw).map_err(|e| conversion_error(idx, e))
}

// ============================================================================
// DYNAMIC FILTERS
// ============================================================================

/// WHERE clause assembled from optional filters, with positional parameters
#[derive(Debug, Default)]
pub(crate) struct Filter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `clause` must contain exactly one `?`
    pub fn push(&mut self, clause: &str, value: impl Into<Value>) {
        self.clauses.push(clause.to_string());
        self.params.push(value.into());
    }

    pub fn push_if<T: Into<Value>>(&mut self, clause: &str, value: Option<T>) {
        if let Some(value) = value {
            self.push(clause, value);
        }
    }

    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Parameters followed by LIMIT and OFFSET
    pub fn params_with_page(&self, limit: u32, offset: u32) -> Vec<Value> {
        let mut params = self.params.clone();
        params.push(Value::Integer(i64::from(limit)));
        params.push(Value::Integer(i64::from(offset)));
        params
    }
}
