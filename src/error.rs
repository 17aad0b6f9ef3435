// Error taxonomy shared by the repositories, the handlers and the HTTP layer
//
// Every failure ends up as one of four kinds, each with a fixed HTTP status:
//   Validation -> 400, Duplicate -> 400, NotFound -> 404, everything else -> 500

use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input, invalid enum value, rejected transition
    #[error("{0}")]
    Validation(String),

    /// No row matches the requested id
    #[error("{0}")]
    NotFound(String),

    /// Unique-constraint violation
    #[error("{0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Storage(rusqlite::Error),

    #[error("{0}")]
    Unexpected(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        AppError::Duplicate(message.into())
    }

    /// HTTP status code this error is reported with
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) | AppError::Duplicate(_) => 400,
            AppError::NotFound(_) => 404,
            AppError::Storage(_) | AppError::Unexpected(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, msg)
                if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                AppError::Duplicate(
                    msg.clone()
                        .unwrap_or_else(|| "Record already exists".to_string()),
                )
            }
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                AppError::Validation("Referenced record does not exist".to_string())
            }
            _ => AppError::Storage(err),
        }
    }
}
