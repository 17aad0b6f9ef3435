// Store entity - a retail location that owns cash registers and reconciliations

use crate::dates;
use crate::db::{self, get_timestamp};
use crate::error::AppResult;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Store {
    pub id: String,
    pub name: String,
    /// National tax registration number, unique when present
    pub tax_id: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewStore {
    pub name: String,
    pub tax_id: Option<String>,
    pub address: Option<String>,
}

const COLUMNS: &str = "id, name, tax_id, address, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Store> {
    Ok(Store {
        id: row.get(0)?,
        name: row.get(1)?,
        tax_id: row.get(2)?,
        address: row.get(3)?,
        created_at: get_timestamp(row, 4)?,
        updated_at: get_timestamp(row, 5)?,
    })
}

pub fn insert_store(conn: &Connection, new: &NewStore) -> AppResult<Store> {
    let now = dates::now();
    let store = Store {
        id: db::new_id(),
        name: new.name.clone(),
        tax_id: new.tax_id.clone(),
        address: new.address.clone(),
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO stores (id, name, tax_id, address, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            store.id,
            store.name,
            store.tax_id,
            store.address,
            dates::format_timestamp(&store.created_at),
            dates::format_timestamp(&store.updated_at),
        ],
    )?;

    tracing::debug!(store_id = %store.id, name = %store.name, "store inserted");
    Ok(store)
}

pub fn find_store(conn: &Connection, id: &str) -> AppResult<Option<Store>> {
    let store = conn
        .query_row(
            &format!("SELECT {} FROM stores WHERE id = ?1", COLUMNS),
            [id],
            from_row,
        )
        .optional()?;

    Ok(store)
}

pub fn find_store_by_tax_id(conn: &Connection, tax_id: &str) -> AppResult<Option<Store>> {
    let store = conn
        .query_row(
            &format!("SELECT {} FROM stores WHERE tax_id = ?1", COLUMNS),
            [tax_id],
            from_row,
        )
        .optional()?;

    Ok(store)
}

/// All stores, ordered by name
pub fn list_stores(conn: &Connection) -> AppResult<Vec<Store>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM stores ORDER BY name ASC, id ASC",
        COLUMNS
    ))?;

    let stores = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(stores)
}

/// Delete a store and, through the foreign keys, everything it owns.
/// Returns false when no such store exists.
pub fn delete_store(conn: &Connection, id: &str) -> AppResult<bool> {
    let deleted = conn.execute("DELETE FROM stores WHERE id = ?1", [id])?;
    if deleted > 0 {
        tracing::info!(store_id = %id, "store deleted with dependents");
    }
    Ok(deleted > 0)
}
