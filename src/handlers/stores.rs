// Store handlers: CRUD plus the daily closure report

use super::{non_empty, parse_status, require, MessageResponse};
use crate::closure::{self, ClosureReport};
use crate::dates;
use crate::entities::store::{self, NewStore, Store};
use crate::entities::ReconciliationStatus;
use crate::error::{AppError, AppResult};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

const MAX_NAME_LEN: usize = 200;
const MAX_TAX_ID_LEN: usize = 14;

#[derive(Debug, Default, Deserialize)]
pub struct CreateStoreRequest {
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StoreResponse {
    pub message: String,
    pub store: Store,
}

#[derive(Debug, Serialize)]
pub struct StoreListResponse {
    pub stores: Vec<Store>,
    pub total: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClosureParams {
    pub date: Option<String>,
    pub status: Option<String>,
}

pub fn create_store(conn: &Connection, req: CreateStoreRequest) -> AppResult<StoreResponse> {
    let name = require("name", req.name.as_deref())?;
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(format!(
            "name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }

    let tax_id = non_empty(req.tax_id.as_deref());
    if let Some(ref tax_id) = tax_id {
        if tax_id.chars().count() > MAX_TAX_ID_LEN {
            return Err(AppError::validation(format!(
                "tax_id must be at most {} characters",
                MAX_TAX_ID_LEN
            )));
        }
        if store::find_store_by_tax_id(conn, tax_id)?.is_some() {
            return Err(AppError::duplicate("A store with this tax_id already exists"));
        }
    }

    let store = store::insert_store(
        conn,
        &NewStore {
            name,
            tax_id,
            address: non_empty(req.address.as_deref()),
        },
    )?;

    Ok(StoreResponse {
        message: "Store created successfully".to_string(),
        store,
    })
}

pub fn list_stores(conn: &Connection) -> AppResult<StoreListResponse> {
    let stores = store::list_stores(conn)?;
    Ok(StoreListResponse {
        total: stores.len(),
        stores,
    })
}

pub fn get_store(conn: &Connection, id: &str) -> AppResult<Store> {
    store::find_store(conn, id)?.ok_or_else(|| AppError::not_found("Store not found"))
}

pub fn delete_store(conn: &Connection, id: &str) -> AppResult<MessageResponse> {
    if !store::delete_store(conn, id)? {
        return Err(AppError::not_found("Store not found"));
    }

    Ok(MessageResponse {
        message: "Store deleted successfully".to_string(),
    })
}

/// Per-store totals for one day
pub fn store_closures(conn: &Connection, params: ClosureParams) -> AppResult<ClosureReport> {
    let raw_date = non_empty(params.date.as_deref())
        .ok_or_else(|| AppError::validation("Date is required"))?;
    let date = dates::parse_date("date", &raw_date)?;
    let status = parse_status::<ReconciliationStatus>(params.status.as_deref())?;

    closure::store_closures(conn, date, status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn create(conn: &Connection, name: &str, tax_id: Option<&str>) -> AppResult<StoreResponse> {
        create_store(
            conn,
            CreateStoreRequest {
                name: Some(name.to_string()),
                tax_id: tax_id.map(str::to_string),
                address: None,
            },
        )
    }

    #[test]
    fn test_create_requires_name() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();

        let err = create_store(&conn, CreateStoreRequest::default()).unwrap_err();
        assert_eq!(err.to_string(), "name is required");
    }

    #[test]
    fn test_duplicate_tax_id() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();

        create(&conn, "Centro", Some("12345678000190")).unwrap();
        let err = create(&conn, "Norte", Some("12345678000190")).unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_)));

        let err = create(&conn, "Sul", Some("123456780001900")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_get_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();

        let created = create(&conn, "Centro", None).unwrap().store;
        assert_eq!(get_store(&conn, &created.id).unwrap(), created);
        assert_eq!(list_stores(&conn).unwrap().total, 1);

        delete_store(&conn, &created.id).unwrap();
        assert!(matches!(get_store(&conn, &created.id), Err(AppError::NotFound(_))));
        assert!(matches!(delete_store(&conn, &created.id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_closure_params() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();
        create(&conn, "Centro", None).unwrap();

        let err = store_closures(&conn, ClosureParams::default()).unwrap_err();
        assert_eq!(err.to_string(), "Date is required");

        let err = store_closures(
            &conn,
            ClosureParams {
                date: Some("01/05/2024".to_string()),
                status: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = store_closures(
            &conn,
            ClosureParams {
                date: Some("2024-05-01".to_string()),
                status: Some("finished".to_string()),
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let report = store_closures(
            &conn,
            ClosureParams {
                date: Some("2024-05-01".to_string()),
                status: None,
            },
        )
        .unwrap();
        assert_eq!(report.total_stores, 1);
        assert_eq!(report.stores_without_register, 1);
    }
}
