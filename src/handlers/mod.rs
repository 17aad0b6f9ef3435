// Resource handlers
//
// Transport-agnostic operations: each takes a borrowed connection plus the
// already-decoded request, and returns a serializable body or an `AppError`.
// The HTTP layer in `api` only extracts inputs and picks the status code.

pub mod analysts;
pub mod deposits;
pub mod evidence_requests;
pub mod reconciliations;
pub mod registers;
pub mod stores;

use crate::config::ApiConfig;
use crate::dates::TimeRange;
use crate::entities::ParseStatusError;
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

// ============================================================================
// PAGINATION
// ============================================================================

/// `limit` / `offset` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageParams {
    /// Apply defaults; a limit above the configured maximum is capped
    pub fn resolve(&self, api: &ApiConfig) -> AppResult<(u32, u32)> {
        let limit = match self.limit {
            Some(0) => return Err(AppError::validation("limit must be at least 1")),
            Some(limit) => limit.min(api.max_page_size),
            None => api.default_page_size,
        };

        Ok((limit, self.offset.unwrap_or(0)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    pub pages: u64,
}

impl Pagination {
    pub fn new(total: u64, limit: u32, offset: u32) -> Self {
        let pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit))
        };

        Pagination {
            total,
            limit,
            offset,
            pages,
        }
    }
}

// ============================================================================
// INPUT HELPERS
// ============================================================================

/// Trimmed value, or None when absent or blank
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Required text field
pub fn require(field: &str, value: Option<&str>) -> AppResult<String> {
    non_empty(value).ok_or_else(|| AppError::validation(format!("{} is required", field)))
}

/// `deserialize_with` for `Option<Option<T>>` fields: a field that is present
/// (even as null) becomes `Some`, so it differs from one that is absent.
/// Pair with `#[serde(default)]`.
pub fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Parse an optional status; blank counts as absent
pub fn parse_status<T>(value: Option<&str>) -> AppResult<Option<T>>
where
    T: FromStr<Err = ParseStatusError>,
{
    match non_empty(value) {
        Some(raw) => Ok(Some(raw.parse::<T>()?)),
        None => Ok(None),
    }
}

/// `start_date` / `end_date` query parameters, blanks ignored
pub fn time_range(start: Option<&str>, end: Option<&str>) -> AppResult<TimeRange> {
    let start = non_empty(start);
    let end = non_empty(end);
    TimeRange::from_params(start.as_deref(), end.as_deref())
}

/// Reject a status change the transition table does not allow
pub(crate) fn check_transition<T: std::fmt::Display>(
    enforce: bool,
    from: T,
    to: T,
    allowed: bool,
) -> AppResult<()> {
    if enforce && !allowed {
        return Err(AppError::validation(format!(
            "Cannot change status from {} to {}",
            from, to
        )));
    }
    Ok(())
}

/// Response carrying only a message
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
