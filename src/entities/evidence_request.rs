// Evidence request entity - a follow-up asking a store to justify a discrepancy

use crate::dates::{self, TimeRange};
use crate::db::{self, get_date, get_timestamp, Filter};
use crate::entities::reconciliation::ReconciliationStatus;
use crate::error::AppResult;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStatus {
    #[default]
    Pending,
    Responded,
    Canceled,
}

text_status!(EvidenceStatus {
    Pending => "pending",
    Responded => "responded",
    Canceled => "canceled",
});

impl EvidenceStatus {
    /// Statuses reachable from `self`, including itself
    pub fn allowed_transitions(&self) -> &'static [EvidenceStatus] {
        use EvidenceStatus::*;
        match self {
            Pending => &[Pending, Responded, Canceled],
            Responded => &[Responded, Pending],
            Canceled => &[Canceled],
        }
    }

    pub fn can_transition_to(&self, next: EvidenceStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceRequest {
    pub id: String,
    pub reconciliation_id: String,
    pub message: String,
    pub status: EvidenceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEvidenceRequest {
    pub reconciliation_id: String,
    pub message: String,
    pub status: EvidenceStatus,
}

/// A request as listed per store, with the reconciliation it was raised on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceRequestItem {
    #[serde(flatten)]
    pub request: EvidenceRequest,
    pub reconciliation_date: NaiveDate,
    pub reconciliation_status: ReconciliationStatus,
}

const COLUMNS: &str = "e.id, e.reconciliation_id, e.message, e.status, e.created_at, e.updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<EvidenceRequest> {
    Ok(EvidenceRequest {
        id: row.get(0)?,
        reconciliation_id: row.get(1)?,
        message: row.get(2)?,
        status: row.get(3)?,
        created_at: get_timestamp(row, 4)?,
        updated_at: get_timestamp(row, 5)?,
    })
}

pub fn insert_evidence_request(
    conn: &Connection,
    new: &NewEvidenceRequest,
) -> AppResult<EvidenceRequest> {
    let now = dates::now();
    let request = EvidenceRequest {
        id: db::new_id(),
        reconciliation_id: new.reconciliation_id.clone(),
        message: new.message.clone(),
        status: new.status,
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO evidence_requests (id, reconciliation_id, message, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            request.id,
            request.reconciliation_id,
            request.message,
            request.status,
            dates::format_timestamp(&request.created_at),
            dates::format_timestamp(&request.updated_at),
        ],
    )?;

    tracing::info!(
        evidence_request_id = %request.id,
        reconciliation_id = %request.reconciliation_id,
        "evidence request created"
    );
    Ok(request)
}

pub fn find_evidence_request(conn: &Connection, id: &str) -> AppResult<Option<EvidenceRequest>> {
    let request = conn
        .query_row(
            &format!("SELECT {} FROM evidence_requests e WHERE e.id = ?1", COLUMNS),
            [id],
            from_row,
        )
        .optional()?;

    Ok(request)
}

/// Persist a new status. Transition rules are not checked here.
pub fn update_evidence_status(
    conn: &Connection,
    current: &EvidenceRequest,
    status: EvidenceStatus,
) -> AppResult<EvidenceRequest> {
    let mut updated = current.clone();
    updated.status = status;
    updated.updated_at = dates::next_timestamp(current.updated_at);

    conn.execute(
        "UPDATE evidence_requests SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![
            updated.status,
            dates::format_timestamp(&updated.updated_at),
            updated.id
        ],
    )?;

    tracing::info!(
        evidence_request_id = %updated.id,
        from = %current.status,
        to = %updated.status,
        "evidence request status updated"
    );
    Ok(updated)
}

/// Requests raised against any reconciliation of `store_id`, newest first.
/// `range` applies to the request's creation time.
pub fn list_evidence_for_store(
    conn: &Connection,
    store_id: &str,
    status: Option<EvidenceStatus>,
    range: &TimeRange,
) -> AppResult<Vec<EvidenceRequestItem>> {
    let mut filter = Filter::new();
    filter.push("r.store_id = ?", store_id.to_string());
    filter.push_if("e.status = ?", status);
    filter.push_if("e.created_at >= ?", range.start.as_ref().map(dates::format_timestamp));
    filter.push_if("e.created_at <= ?", range.end.as_ref().map(dates::format_timestamp));

    let mut stmt = conn.prepare(&format!(
        "SELECT {}, r.date, r.status
         FROM evidence_requests e
         JOIN reconciliations r ON r.id = e.reconciliation_id
         {}
         ORDER BY e.created_at DESC",
        COLUMNS,
        filter.where_sql()
    ))?;

    let items = stmt
        .query_map(params_from_iter(filter.params()), |row| {
            Ok(EvidenceRequestItem {
                request: from_row(row)?,
                reconciliation_date: get_date(row, 6)?,
                reconciliation_status: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(items)
}
