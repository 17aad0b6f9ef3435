// Reconciliation handlers

use super::{
    check_transition, non_empty, parse_status, present, require, time_range, PageParams,
    Pagination,
};
use crate::config::{ApiConfig, RulesConfig};
use crate::dates;
use crate::entities::analyst;
use crate::entities::reconciliation::{
    self, NewReconciliation, Reconciliation, ReconciliationQuery, ReconciliationStatus,
};
use crate::entities::store;
use crate::error::{AppError, AppResult};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct CreateReconciliationRequest {
    pub store_id: Option<String>,
    pub date: Option<String>,
    pub analyst_id: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateReconciliationStatusRequest {
    pub status: Option<String>,
    /// Absent keeps the stored notes; null or blank clears them
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Serialize)]
pub struct ReconciliationResponse {
    pub message: String,
    pub reconciliation: Reconciliation,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReconciliationListParams {
    pub store_id: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(skip_serializing)]
    pub limit: Option<u32>,
    #[serde(skip_serializing)]
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ReconciliationListResponse {
    pub reconciliations: Vec<Reconciliation>,
    pub pagination: Pagination,
    pub filters: ReconciliationListParams,
}

pub fn create_reconciliation(
    conn: &Connection,
    req: CreateReconciliationRequest,
) -> AppResult<ReconciliationResponse> {
    let (Some(store_id), Some(raw_date)) = (
        non_empty(req.store_id.as_deref()),
        non_empty(req.date.as_deref()),
    ) else {
        return Err(AppError::validation("store_id and date are required"));
    };
    let date = dates::parse_date("date", &raw_date)?;
    let status = parse_status::<ReconciliationStatus>(req.status.as_deref())?.unwrap_or_default();

    if store::find_store(conn, &store_id)?.is_none() {
        return Err(AppError::not_found("Store not found"));
    }

    let analyst_id = non_empty(req.analyst_id.as_deref());
    if let Some(ref id) = analyst_id {
        if analyst::find_analyst(conn, id)?.is_none() {
            return Err(AppError::not_found("Analyst not found"));
        }
    }

    if reconciliation::find_reconciliation_for(conn, &store_id, date)?.is_some() {
        return Err(AppError::duplicate(
            "Reconciliation already exists for this store and date",
        ));
    }

    let reconciliation = reconciliation::insert_reconciliation(
        conn,
        &NewReconciliation {
            store_id,
            date,
            analyst_id,
            status,
            notes: non_empty(req.notes.as_deref()),
        },
    )?;

    Ok(ReconciliationResponse {
        message: "Reconciliation created successfully".to_string(),
        reconciliation,
    })
}

pub fn get_reconciliation(conn: &Connection, id: &str) -> AppResult<Reconciliation> {
    reconciliation::find_reconciliation(conn, id)?
        .ok_or_else(|| AppError::not_found("Reconciliation not found"))
}

pub fn list_reconciliations(
    conn: &Connection,
    api: &ApiConfig,
    params: ReconciliationListParams,
) -> AppResult<ReconciliationListResponse> {
    let (limit, offset) = PageParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve(api)?;

    let query = ReconciliationQuery {
        store_id: non_empty(params.store_id.as_deref()),
        status: parse_status(params.status.as_deref())?,
        range: time_range(params.start_date.as_deref(), params.end_date.as_deref())?,
        limit,
        offset,
    };

    let (reconciliations, total) = reconciliation::list_reconciliations(conn, &query)?;

    Ok(ReconciliationListResponse {
        reconciliations,
        pagination: Pagination::new(total, limit, offset),
        filters: params,
    })
}

pub fn update_reconciliation_status(
    conn: &Connection,
    rules: &RulesConfig,
    id: &str,
    req: UpdateReconciliationStatusRequest,
) -> AppResult<ReconciliationResponse> {
    let raw = require("Status", req.status.as_deref())?;
    let status: ReconciliationStatus = raw.parse()?;

    let current = get_reconciliation(conn, id)?;
    check_transition(
        rules.enforce_status_transitions,
        current.status,
        status,
        current.status.can_transition_to(status),
    )?;

    let notes = req.notes.map(|n| non_empty(n.as_deref()));
    let reconciliation =
        reconciliation::update_reconciliation_status(conn, &current, status, notes)?;

    Ok(ReconciliationResponse {
        message: "Reconciliation status updated successfully".to_string(),
        reconciliation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::entities::analyst::{insert_analyst, NewAnalyst};
    use crate::entities::store::{insert_store, NewStore};

    fn store(conn: &Connection) -> String {
        insert_store(
            conn,
            &NewStore {
                name: "Centro".to_string(),
                ..Default::default()
            },
        )
        .unwrap()
        .id
    }

    fn request(store_id: &str, date: &str) -> CreateReconciliationRequest {
        CreateReconciliationRequest {
            store_id: Some(store_id.to_string()),
            date: Some(date.to_string()),
            ..Default::default()
        }
    }

    fn set_status(
        conn: &Connection,
        rules: &RulesConfig,
        id: &str,
        status: &str,
        notes: Option<&str>,
    ) -> AppResult<ReconciliationResponse> {
        update_reconciliation_status(
            conn,
            rules,
            id,
            UpdateReconciliationStatusRequest {
                status: Some(status.to_string()),
                notes: notes.map(|n| Some(n.to_string())),
            },
        )
    }

    #[test]
    fn test_create_checks_references() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();
        let store_id = store(&conn);

        assert_eq!(
            create_reconciliation(&conn, CreateReconciliationRequest::default())
                .unwrap_err()
                .to_string(),
            "store_id and date are required"
        );
        assert!(matches!(
            create_reconciliation(&conn, request("missing", "2024-05-01")),
            Err(AppError::NotFound(_))
        ));

        let mut req = request(&store_id, "2024-05-01");
        req.analyst_id = Some("missing".to_string());
        assert_eq!(
            create_reconciliation(&conn, req).unwrap_err().to_string(),
            "Analyst not found"
        );

        let mut req = request(&store_id, "2024-05-01");
        req.status = Some("done".to_string());
        assert!(matches!(create_reconciliation(&conn, req), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_create_with_analyst_and_duplicate() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();
        let store_id = store(&conn);
        let analyst = insert_analyst(
            &conn,
            &NewAnalyst {
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                password: "x".to_string(),
            },
        )
        .unwrap();

        let mut req = request(&store_id, "2024-05-01");
        req.analyst_id = Some(analyst.id.clone());
        let created = create_reconciliation(&conn, req).unwrap().reconciliation;
        assert_eq!(created.status, ReconciliationStatus::Open);
        assert_eq!(created.analyst_id, Some(analyst.id));

        let err = create_reconciliation(&conn, request(&store_id, "2024-05-01")).unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_)));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM reconciliations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_closed_cannot_reopen_when_enforced() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();
        let store_id = store(&conn);
        let rules = RulesConfig::default();
        let id = create_reconciliation(&conn, request(&store_id, "2024-05-01"))
            .unwrap()
            .reconciliation
            .id;

        let closed = set_status(&conn, &rules, &id, "closed", Some("matched")).unwrap();
        assert_eq!(closed.reconciliation.notes.as_deref(), Some("matched"));

        let err = set_status(&conn, &rules, &id, "open", None).unwrap_err();
        assert_eq!(err.to_string(), "Cannot change status from closed to open");
        assert_eq!(
            get_reconciliation(&conn, &id).unwrap().status,
            ReconciliationStatus::Closed
        );

        // Same status may still update notes
        let same = set_status(&conn, &rules, &id, "closed", Some("rechecked")).unwrap();
        assert_eq!(same.reconciliation.notes.as_deref(), Some("rechecked"));

        let lenient = RulesConfig {
            enforce_status_transitions: false,
        };
        let reopened = set_status(&conn, &lenient, &id, "open", None).unwrap();
        assert_eq!(reopened.reconciliation.status, ReconciliationStatus::Open);
        assert_eq!(reopened.reconciliation.notes.as_deref(), Some("rechecked"));

        assert!(matches!(
            set_status(&conn, &rules, "missing", "open", None),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_notes_absent_null_and_blank() {
        let parse = |body: &str| -> UpdateReconciliationStatusRequest {
            serde_json::from_str(body).unwrap()
        };
        assert_eq!(parse(r#"{"status":"open"}"#).notes, None);
        assert_eq!(parse(r#"{"status":"open","notes":null}"#).notes, Some(None));
        assert_eq!(
            parse(r#"{"status":"open","notes":"late"}"#).notes,
            Some(Some("late".to_string()))
        );

        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();
        let store_id = store(&conn);
        let rules = RulesConfig::default();
        let id = create_reconciliation(&conn, request(&store_id, "2024-05-01"))
            .unwrap()
            .reconciliation
            .id;

        set_status(&conn, &rules, &id, "open", Some("first")).unwrap();

        let kept = update_reconciliation_status(
            &conn,
            &rules,
            &id,
            parse(r#"{"status":"pending_return"}"#),
        )
        .unwrap();
        assert_eq!(kept.reconciliation.notes.as_deref(), Some("first"));

        let cleared = update_reconciliation_status(
            &conn,
            &rules,
            &id,
            parse(r#"{"status":"pending_return","notes":null}"#),
        )
        .unwrap();
        assert_eq!(cleared.reconciliation.notes, None);

        set_status(&conn, &rules, &id, "pending_return", Some("second")).unwrap();
        let blank = set_status(&conn, &rules, &id, "pending_return", Some("  ")).unwrap();
        assert_eq!(blank.reconciliation.notes, None);
        assert_eq!(get_reconciliation(&conn, &id).unwrap().notes, None);
    }

    #[test]
    fn test_list_filters() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();
        let store_id = store(&conn);
        let api = ApiConfig::default();

        for date in ["2024-05-01", "2024-05-02", "2024-05-03"] {
            create_reconciliation(&conn, request(&store_id, date)).unwrap();
        }

        let response = list_reconciliations(
            &conn,
            &api,
            ReconciliationListParams {
                start_date: Some("2024-05-02".to_string()),
                end_date: Some("2024-05-02".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(response.pagination.total, 1);
        assert_eq!(response.reconciliations[0].date.to_string(), "2024-05-02");

        let response = list_reconciliations(
            &conn,
            &api,
            ReconciliationListParams {
                status: Some("closed".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(response.pagination.total, 0);
        assert_eq!(response.pagination.pages, 0);
    }
}
