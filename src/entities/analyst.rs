// Analyst entity - the person who reviews reconciliations
//
// The credential is stored as "salt$sha256(salt:password)" and never leaves
// this module in clear or serialized form.

use crate::dates;
use crate::db::{self, get_timestamp};
use crate::error::AppResult;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analyst {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Analyst {
    pub fn verify_password(&self, password: &str) -> bool {
        match self.password_hash.split_once('$') {
            Some((salt, digest)) => hash_with_salt(salt, password) == digest,
            None => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAnalyst {
    pub name: String,
    pub email: String,
    pub password: String,
}

fn hash_with_salt(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}", salt, password));
    format!("{:x}", hasher.finalize())
}

pub fn hash_password(password: &str) -> String {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    format!("{}${}", salt, hash_with_salt(&salt, password))
}

const COLUMNS: &str = "id, name, email, password_hash, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Analyst> {
    Ok(Analyst {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: get_timestamp(row, 4)?,
        updated_at: get_timestamp(row, 5)?,
    })
}

pub fn insert_analyst(conn: &Connection, new: &NewAnalyst) -> AppResult<Analyst> {
    let now = dates::now();
    let analyst = Analyst {
        id: db::new_id(),
        name: new.name.clone(),
        email: new.email.trim().to_lowercase(),
        password_hash: hash_password(&new.password),
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO analysts (id, name, email, password_hash, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            analyst.id,
            analyst.name,
            analyst.email,
            analyst.password_hash,
            dates::format_timestamp(&analyst.created_at),
            dates::format_timestamp(&analyst.updated_at),
        ],
    )?;

    tracing::debug!(analyst_id = %analyst.id, "analyst inserted");
    Ok(analyst)
}

pub fn find_analyst(conn: &Connection, id: &str) -> AppResult<Option<Analyst>> {
    let analyst = conn
        .query_row(
            &format!("SELECT {} FROM analysts WHERE id = ?1", COLUMNS),
            [id],
            from_row,
        )
        .optional()?;

    Ok(analyst)
}

pub fn find_analyst_by_email(conn: &Connection, email: &str) -> AppResult<Option<Analyst>> {
    let analyst = conn
        .query_row(
            &format!("SELECT {} FROM analysts WHERE email = ?1", COLUMNS),
            [email.trim().to_lowercase()],
            from_row,
        )
        .optional()?;

    Ok(analyst)
}
