// Analyst handlers

use super::require;
use crate::entities::analyst::{self, Analyst, NewAnalyst};
use crate::error::{AppError, AppResult};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct CreateAnalystRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalystResponse {
    pub message: String,
    pub analyst: Analyst,
}

pub fn create_analyst(conn: &Connection, req: CreateAnalystRequest) -> AppResult<AnalystResponse> {
    let name = require("name", req.name.as_deref())?;
    let email = require("email", req.email.as_deref())?.to_lowercase();
    let password = req
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation("password is required"))?;

    if !email.contains('@') || email.chars().count() > 200 {
        return Err(AppError::validation("email is not a valid address"));
    }
    if analyst::find_analyst_by_email(conn, &email)?.is_some() {
        return Err(AppError::duplicate("An analyst with this email already exists"));
    }

    let analyst = analyst::insert_analyst(
        conn,
        &NewAnalyst {
            name,
            email,
            password,
        },
    )?;

    Ok(AnalystResponse {
        message: "Analyst created successfully".to_string(),
        analyst,
    })
}

pub fn get_analyst(conn: &Connection, id: &str) -> AppResult<Analyst> {
    analyst::find_analyst(conn, id)?.ok_or_else(|| AppError::not_found("Analyst not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn request(email: &str) -> CreateAnalystRequest {
        CreateAnalystRequest {
            name: Some("Ana".to_string()),
            email: Some(email.to_string()),
            password: Some("s3cret".to_string()),
        }
    }

    #[test]
    fn test_create_and_get() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();

        let created = create_analyst(&conn, request("Ana@Example.com")).unwrap().analyst;
        assert_eq!(created.email, "ana@example.com");
        assert!(created.verify_password("s3cret"));

        let fetched = get_analyst(&conn, &created.id).unwrap();
        assert_eq!(fetched, created);
        assert!(matches!(get_analyst(&conn, "missing"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_password_never_serialized() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();

        let response = create_analyst(&conn, request("ana@example.com")).unwrap();
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["analyst"].get("password_hash").is_none());
        assert!(!json.to_string().contains("s3cret"));
    }

    #[test]
    fn test_validation_and_duplicates() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();

        let mut missing = request("ana@example.com");
        missing.password = None;
        assert_eq!(
            create_analyst(&conn, missing).unwrap_err().to_string(),
            "password is required"
        );
        assert!(matches!(
            create_analyst(&conn, request("not-an-email")),
            Err(AppError::Validation(_))
        ));

        create_analyst(&conn, request("ana@example.com")).unwrap();
        assert!(matches!(
            create_analyst(&conn, request("ANA@example.com")),
            Err(AppError::Duplicate(_))
        ));
    }
}
