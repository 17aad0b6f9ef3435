// Deposit handlers: filtered listing, details, creation and verification

use super::{non_empty, require, time_range, PageParams, Pagination};
use crate::config::ApiConfig;
use crate::dates;
use crate::entities::cash_register::{self, CashRegister};
use crate::entities::deposit::{self, Deposit, DepositListItem, DepositQuery, NewDeposit};
use crate::entities::sale::{self, Sale};
use crate::entities::store::{self, Store};
use crate::error::{AppError, AppResult};
use crate::money;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const MAX_CODE_LEN: usize = 100;

// ============================================================================
// LIST
// ============================================================================

/// Query string of `GET /deposits`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DepositListParams {
    pub store_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub verified: Option<String>,
    pub sale_id: Option<String>,
    #[serde(skip_serializing)]
    pub limit: Option<u32>,
    #[serde(skip_serializing)]
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct DepositSummary {
    pub total_amount: Decimal,
    pub verified_amount: Decimal,
    pub unverified_amount: Decimal,
}

impl DepositSummary {
    fn of(items: &[DepositListItem]) -> Self {
        let amounts = |verified: bool| {
            money::sum(
                items
                    .iter()
                    .filter(move |i| i.deposit.verified == verified)
                    .map(|i| &i.deposit.amount),
            )
        };

        DepositSummary {
            total_amount: money::sum(items.iter().map(|i| &i.deposit.amount)),
            verified_amount: amounts(true),
            unverified_amount: amounts(false),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DepositListResponse {
    pub deposits: Vec<DepositListItem>,
    pub pagination: Pagination,
    /// The filters as received
    pub filters: DepositListParams,
    /// Over the returned page only
    pub summary: DepositSummary,
}

fn parse_verified(value: Option<&str>) -> AppResult<Option<bool>> {
    match non_empty(value).as_deref() {
        None => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(other) => Err(AppError::validation(format!(
            "Invalid verified: expected true or false, got '{}'",
            other
        ))),
    }
}

pub fn list_deposits(
    conn: &Connection,
    api: &ApiConfig,
    params: DepositListParams,
) -> AppResult<DepositListResponse> {
    let (limit, offset) = PageParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve(api)?;

    let query = DepositQuery {
        store_id: non_empty(params.store_id.as_deref()),
        range: time_range(params.start_date.as_deref(), params.end_date.as_deref())?,
        verified: parse_verified(params.verified.as_deref())?,
        sale_id: non_empty(params.sale_id.as_deref()),
        limit,
        offset,
    };

    let (deposits, total) = deposit::list_deposits(conn, &query)?;

    Ok(DepositListResponse {
        summary: DepositSummary::of(&deposits),
        pagination: Pagination::new(total, limit, offset),
        deposits,
        filters: params,
    })
}

// ============================================================================
// DETAILS
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DepositDetails {
    #[serde(flatten)]
    pub deposit: Deposit,
    pub cash_register: CashRegister,
    pub store: Store,
    pub sale: Option<Sale>,
}

#[derive(Debug, Serialize)]
pub struct DepositDetailsResponse {
    pub deposit: DepositDetails,
}

pub fn get_deposit(conn: &Connection, id: &str) -> AppResult<DepositDetailsResponse> {
    let deposit =
        deposit::find_deposit(conn, id)?.ok_or_else(|| AppError::not_found("Deposit not found"))?;

    let cash_register = cash_register::find_cash_register(conn, &deposit.cash_register_id)?
        .ok_or_else(|| AppError::Unexpected("deposit references a missing cash register".into()))?;
    let store = store::find_store(conn, &cash_register.store_id)?
        .ok_or_else(|| AppError::Unexpected("cash register references a missing store".into()))?;
    let sale = match deposit.sale_id {
        Some(ref sale_id) => sale::find_sale(conn, sale_id)?,
        None => None,
    };

    Ok(DepositDetailsResponse {
        deposit: DepositDetails {
            deposit,
            cash_register,
            store,
            sale,
        },
    })
}

// ============================================================================
// CREATE
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CreateDepositRequest {
    pub cash_register_id: Option<String>,
    pub sale_id: Option<String>,
    pub code: Option<String>,
    pub amount: Option<Decimal>,
    pub deposit_date: Option<String>,
    pub verified: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct DepositResponse {
    pub message: String,
    pub deposit: Deposit,
}

pub fn create_deposit(conn: &Connection, req: CreateDepositRequest) -> AppResult<DepositResponse> {
    let register_id = require("cash_register_id", req.cash_register_id.as_deref())?;
    let code = require("code", req.code.as_deref())?;
    if code.chars().count() > MAX_CODE_LEN {
        return Err(AppError::validation(format!(
            "code must be at most {} characters",
            MAX_CODE_LEN
        )));
    }
    let amount = req
        .amount
        .ok_or_else(|| AppError::validation("amount is required"))
        .and_then(|a| money::validate_amount("amount", a))?;

    let register = cash_register::find_cash_register(conn, &register_id)?
        .ok_or_else(|| AppError::not_found("Cash register not found"))?;

    let sale_id = non_empty(req.sale_id.as_deref());
    if let Some(ref sale_id) = sale_id {
        let sale = sale::find_sale(conn, sale_id)?
            .ok_or_else(|| AppError::validation("Sale does not exist"))?;
        if sale.cash_register_id != register.id {
            return Err(AppError::validation(
                "Sale belongs to a different cash register",
            ));
        }
    }

    let deposit_date = match non_empty(req.deposit_date.as_deref()) {
        Some(raw) => dates::parse_date("deposit_date", &raw)?,
        None => register.date,
    };

    let deposit = deposit::insert_deposit(
        conn,
        &NewDeposit {
            cash_register_id: register.id,
            sale_id,
            code,
            amount,
            deposit_date,
            verified: req.verified.unwrap_or(false),
        },
    )?;

    Ok(DepositResponse {
        message: "Deposit created successfully".to_string(),
        deposit,
    })
}

// ============================================================================
// VERIFY
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDepositStatusRequest {
    pub verified: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct DepositStatusView {
    pub id: String,
    pub code: String,
    pub amount: Decimal,
    pub verified: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DepositStatusResponse {
    pub message: String,
    pub deposit: DepositStatusView,
}

pub fn update_deposit_status(
    conn: &Connection,
    id: &str,
    req: UpdateDepositStatusRequest,
) -> AppResult<DepositStatusResponse> {
    let verified = req
        .verified
        .ok_or_else(|| AppError::validation("'verified' field is required (true/false)"))?;

    let deposit = deposit::set_deposit_verified(conn, id, verified)?
        .ok_or_else(|| AppError::not_found("Deposit not found"))?;

    Ok(DepositStatusResponse {
        message: format!(
            "Deposit marked as {} successfully",
            if verified { "verified" } else { "unverified" }
        ),
        deposit: DepositStatusView {
            id: deposit.id,
            code: deposit.code,
            amount: deposit.amount,
            verified: deposit.verified,
            updated_at: deposit.updated_at,
        },
    })
}
