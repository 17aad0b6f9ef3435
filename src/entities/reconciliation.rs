// Reconciliation entity - an analyst's review of one store-day
//
// Status moves along an explicit transition table (see `allowed_transitions`).
// Whether the table is enforced is decided by the caller.

use crate::dates::{self, TimeRange};
use crate::db::{self, get_date, get_timestamp, Filter};
use crate::error::AppResult;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;

// ============================================================================
// STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    /// Under review
    #[default]
    Open,
    /// Cash verified against deposits
    Closed,
    /// Waiting on the store to return evidence
    PendingReturn,
    /// No register data for the day
    NotIntegrated,
}

text_status!(ReconciliationStatus {
    Open => "open",
    Closed => "closed",
    PendingReturn => "pending_return",
    NotIntegrated => "not_integrated",
});

impl ReconciliationStatus {
    /// Statuses reachable from `self`, including itself
    pub fn allowed_transitions(&self) -> &'static [ReconciliationStatus] {
        use ReconciliationStatus::*;
        match self {
            Open => &[Open, Closed, PendingReturn, NotIntegrated],
            PendingReturn => &[PendingReturn, Open, Closed],
            NotIntegrated => &[NotIntegrated, Open],
            Closed => &[Closed, PendingReturn],
        }
    }

    pub fn can_transition_to(&self, next: ReconciliationStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

// ============================================================================
// ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub id: String,
    pub store_id: String,
    pub analyst_id: Option<String>,
    pub date: NaiveDate,
    pub status: ReconciliationStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReconciliation {
    pub store_id: String,
    pub date: NaiveDate,
    pub analyst_id: Option<String>,
    pub status: ReconciliationStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReconciliationQuery {
    pub store_id: Option<String>,
    pub status: Option<ReconciliationStatus>,
    pub range: TimeRange,
    pub limit: u32,
    pub offset: u32,
}

const COLUMNS: &str = "id, store_id, analyst_id, date, status, notes, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Reconciliation> {
    Ok(Reconciliation {
        id: row.get(0)?,
        store_id: row.get(1)?,
        analyst_id: row.get(2)?,
        date: get_date(row, 3)?,
        status: row.get(4)?,
        notes: row.get(5)?,
        created_at: get_timestamp(row, 6)?,
        updated_at: get_timestamp(row, 7)?,
    })
}

/// Fails with a duplicate error when the store already has one for that date
pub fn insert_reconciliation(
    conn: &Connection,
    new: &NewReconciliation,
) -> AppResult<Reconciliation> {
    let now = dates::now();
    let reconciliation = Reconciliation {
        id: db::new_id(),
        store_id: new.store_id.clone(),
        analyst_id: new.analyst_id.clone(),
        date: new.date,
        status: new.status,
        notes: new.notes.clone(),
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        &format!(
            "INSERT INTO reconciliations ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            COLUMNS
        ),
        params![
            reconciliation.id,
            reconciliation.store_id,
            reconciliation.analyst_id,
            dates::format_date(reconciliation.date),
            reconciliation.status,
            reconciliation.notes,
            dates::format_timestamp(&reconciliation.created_at),
            dates::format_timestamp(&reconciliation.updated_at),
        ],
    )?;

    tracing::info!(
        reconciliation_id = %reconciliation.id,
        store_id = %reconciliation.store_id,
        date = %reconciliation.date,
        status = %reconciliation.status,
        "reconciliation created"
    );
    Ok(reconciliation)
}

pub fn find_reconciliation(conn: &Connection, id: &str) -> AppResult<Option<Reconciliation>> {
    let reconciliation = conn
        .query_row(
            &format!("SELECT {} FROM reconciliations WHERE id = ?1", COLUMNS),
            [id],
            from_row,
        )
        .optional()?;

    Ok(reconciliation)
}

pub fn find_reconciliation_for(
    conn: &Connection,
    store_id: &str,
    date: NaiveDate,
) -> AppResult<Option<Reconciliation>> {
    let reconciliation = conn
        .query_row(
            &format!(
                "SELECT {} FROM reconciliations WHERE store_id = ?1 AND date = ?2",
                COLUMNS
            ),
            params![store_id, dates::format_date(date)],
            from_row,
        )
        .optional()?;

    Ok(reconciliation)
}

/// Reconciliations dated exactly `date`, optionally narrowed to one status
pub fn reconciliations_on(
    conn: &Connection,
    date: NaiveDate,
    status: Option<ReconciliationStatus>,
) -> AppResult<Vec<Reconciliation>> {
    let mut filter = Filter::new();
    filter.push("date = ?", dates::format_date(date));
    filter.push_if("status = ?", status);

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM reconciliations {}",
        COLUMNS,
        filter.where_sql()
    ))?;

    let reconciliations = stmt
        .query_map(params_from_iter(filter.params()), from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(reconciliations)
}

/// Page of reconciliations, newest date first, plus the total match count
pub fn list_reconciliations(
    conn: &Connection,
    query: &ReconciliationQuery,
) -> AppResult<(Vec<Reconciliation>, u64)> {
    let mut filter = Filter::new();
    filter.push_if("store_id = ?", query.store_id.clone());
    filter.push_if("status = ?", query.status);
    filter.push_if("date >= ?", query.range.first_date().map(dates::format_date));
    filter.push_if("date <= ?", query.range.last_date().map(dates::format_date));

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM reconciliations {}", filter.where_sql()),
        params_from_iter(filter.params()),
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM reconciliations {} ORDER BY date DESC, created_at DESC LIMIT ? OFFSET ?",
        COLUMNS,
        filter.where_sql()
    ))?;

    let reconciliations = stmt
        .query_map(
            params_from_iter(filter.params_with_page(query.limit, query.offset)),
            from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((reconciliations, total.max(0) as u64))
}

/// Persist a new status. `notes` of `None` keeps the stored notes,
/// `Some(None)` clears them. Transition rules are not checked here.
pub fn update_reconciliation_status(
    conn: &Connection,
    current: &Reconciliation,
    status: ReconciliationStatus,
    notes: Option<Option<String>>,
) -> AppResult<Reconciliation> {
    let mut updated = current.clone();
    updated.status = status;
    if let Some(notes) = notes {
        updated.notes = notes;
    }
    updated.updated_at = dates::next_timestamp(current.updated_at);

    conn.execute(
        "UPDATE reconciliations SET status = ?1, notes = ?2, updated_at = ?3 WHERE id = ?4",
        params![
            updated.status,
            updated.notes,
            dates::format_timestamp(&updated.updated_at),
            updated.id
        ],
    )?;

    tracing::info!(
        reconciliation_id = %updated.id,
        from = %current.status,
        to = %updated.status,
        "reconciliation status updated"
    );
    Ok(updated)
}
