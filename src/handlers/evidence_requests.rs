// Evidence request handlers

use super::{check_transition, non_empty, parse_status, require, time_range};
use crate::config::RulesConfig;
use crate::entities::evidence_request::{
    self, EvidenceRequest, EvidenceRequestItem, EvidenceStatus, NewEvidenceRequest,
};
use crate::entities::reconciliation;
use crate::entities::store::{self, Store};
use crate::error::{AppError, AppResult};
use crate::notification::{self, SimulatedEmail};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct CreateEvidenceRequest {
    pub reconciliation_id: Option<String>,
    pub message: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EvidenceCreatedResponse {
    pub message: String,
    pub evidence_request: EvidenceRequest,
    pub simulated_email: SimulatedEmail,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEvidenceStatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EvidenceResponse {
    pub message: String,
    pub evidence_request: EvidenceRequest,
}

/// Query string of the per-store listing
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EvidenceListParams {
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub responded: usize,
    pub canceled: usize,
}

#[derive(Debug, Serialize)]
pub struct EvidenceSummary {
    pub total: usize,
    pub by_status: StatusCounts,
}

#[derive(Debug, Serialize)]
pub struct StoreEvidenceResponse {
    pub store: Store,
    pub evidence_requests: Vec<EvidenceRequestItem>,
    pub summary: EvidenceSummary,
    pub filters: EvidenceListParams,
}

/// Create a request and compose (without sending) the email for the store
pub fn create_evidence_request(
    conn: &Connection,
    req: CreateEvidenceRequest,
) -> AppResult<EvidenceCreatedResponse> {
    let (Some(reconciliation_id), Some(message)) = (
        non_empty(req.reconciliation_id.as_deref()),
        non_empty(req.message.as_deref()),
    ) else {
        return Err(AppError::validation(
            "reconciliation_id and message are required",
        ));
    };
    // Validated before anything is read or written
    let status = parse_status::<EvidenceStatus>(req.status.as_deref())?.unwrap_or_default();

    let reconciliation = reconciliation::find_reconciliation(conn, &reconciliation_id)?
        .ok_or_else(|| AppError::not_found("Reconciliation not found"))?;
    let store = store::find_store(conn, &reconciliation.store_id)?
        .ok_or_else(|| AppError::Unexpected("reconciliation references a missing store".into()))?;

    let evidence_request = evidence_request::insert_evidence_request(
        conn,
        &NewEvidenceRequest {
            reconciliation_id,
            message,
            status,
        },
    )?;

    let simulated_email = notification::compose_evidence_email(
        &store,
        &reconciliation,
        &evidence_request.message,
        evidence_request.created_at,
    );
    tracing::info!(to = %simulated_email.to, subject = %simulated_email.subject, "evidence email composed");

    Ok(EvidenceCreatedResponse {
        message: "Evidence request created successfully".to_string(),
        evidence_request,
        simulated_email,
    })
}

pub fn get_evidence_request(conn: &Connection, id: &str) -> AppResult<EvidenceRequest> {
    evidence_request::find_evidence_request(conn, id)?
        .ok_or_else(|| AppError::not_found("Evidence request not found"))
}

pub fn update_evidence_status(
    conn: &Connection,
    rules: &RulesConfig,
    id: &str,
    req: UpdateEvidenceStatusRequest,
) -> AppResult<EvidenceResponse> {
    let raw = require("Status", req.status.as_deref())?;
    let status: EvidenceStatus = raw.parse()?;

    let current = get_evidence_request(conn, id)?;
    check_transition(
        rules.enforce_status_transitions,
        current.status,
        status,
        current.status.can_transition_to(status),
    )?;

    let evidence_request = evidence_request::update_evidence_status(conn, &current, status)?;

    Ok(EvidenceResponse {
        message: "Evidence request status updated successfully".to_string(),
        evidence_request,
    })
}

pub fn list_store_evidence(
    conn: &Connection,
    store_id: &str,
    params: EvidenceListParams,
) -> AppResult<StoreEvidenceResponse> {
    let status = parse_status::<EvidenceStatus>(params.status.as_deref())?;
    let range = time_range(params.start_date.as_deref(), params.end_date.as_deref())?;

    let store =
        store::find_store(conn, store_id)?.ok_or_else(|| AppError::not_found("Store not found"))?;

    let items = evidence_request::list_evidence_for_store(conn, store_id, status, &range)?;

    let mut by_status = StatusCounts::default();
    for item in &items {
        match item.request.status {
            EvidenceStatus::Pending => by_status.pending += 1,
            EvidenceStatus::Responded => by_status.responded += 1,
            EvidenceStatus::Canceled => by_status.canceled += 1,
        }
    }

    Ok(StoreEvidenceResponse {
        store,
        summary: EvidenceSummary {
            total: items.len(),
            by_status,
        },
        evidence_requests: items,
        filters: params,
    })
}
