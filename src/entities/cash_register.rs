// Cash register entity - one per store per calendar day

use crate::dates;
use crate::db::{self, get_date, get_timestamp};
use crate::error::AppResult;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashRegister {
    pub id: String,
    pub store_id: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCashRegister {
    pub store_id: String,
    pub date: NaiveDate,
}

const COLUMNS: &str = "id, store_id, date, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<CashRegister> {
    Ok(CashRegister {
        id: row.get(0)?,
        store_id: row.get(1)?,
        date: get_date(row, 2)?,
        created_at: get_timestamp(row, 3)?,
        updated_at: get_timestamp(row, 4)?,
    })
}

/// Fails with a duplicate error when the store already has a register that day
pub fn insert_cash_register(conn: &Connection, new: &NewCashRegister) -> AppResult<CashRegister> {
    let now = dates::now();
    let register = CashRegister {
        id: db::new_id(),
        store_id: new.store_id.clone(),
        date: new.date,
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO cash_registers (id, store_id, date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            register.id,
            register.store_id,
            dates::format_date(register.date),
            dates::format_timestamp(&register.created_at),
            dates::format_timestamp(&register.updated_at),
        ],
    )?;

    tracing::debug!(register_id = %register.id, store_id = %register.store_id, date = %register.date, "cash register inserted");
    Ok(register)
}

pub fn find_cash_register(conn: &Connection, id: &str) -> AppResult<Option<CashRegister>> {
    let register = conn
        .query_row(
            &format!("SELECT {} FROM cash_registers WHERE id = ?1", COLUMNS),
            [id],
            from_row,
        )
        .optional()?;

    Ok(register)
}

pub fn find_cash_register_for(
    conn: &Connection,
    store_id: &str,
    date: NaiveDate,
) -> AppResult<Option<CashRegister>> {
    let register = conn
        .query_row(
            &format!(
                "SELECT {} FROM cash_registers WHERE store_id = ?1 AND date = ?2",
                COLUMNS
            ),
            params![store_id, dates::format_date(date)],
            from_row,
        )
        .optional()?;

    Ok(register)
}

/// Every register dated exactly `date`, across all stores
pub fn cash_registers_on(conn: &Connection, date: NaiveDate) -> AppResult<Vec<CashRegister>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM cash_registers WHERE date = ?1 ORDER BY store_id",
        COLUMNS
    ))?;

    let registers = stmt
        .query_map([dates::format_date(date)], from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(registers)
}
