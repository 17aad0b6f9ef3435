// Cash register and sale handlers

use super::{non_empty, require};
use crate::dates;
use crate::entities::cash_register::{self, CashRegister, NewCashRegister};
use crate::entities::deposit::{self, Deposit};
use crate::entities::sale::{self, NewSale, PaymentAmounts, Sale};
use crate::entities::store;
use crate::error::{AppError, AppResult};
use crate::money;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// CASH REGISTERS
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CreateCashRegisterRequest {
    pub store_id: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CashRegisterResponse {
    pub message: String,
    pub cash_register: CashRegister,
}

/// A register with everything recorded on it
#[derive(Debug, Serialize)]
pub struct CashRegisterDetails {
    pub cash_register: CashRegister,
    pub sales: Vec<Sale>,
    pub deposits: Vec<Deposit>,
    pub total_sales: Decimal,
    pub total_deposits: Decimal,
}

pub fn create_cash_register(
    conn: &Connection,
    req: CreateCashRegisterRequest,
) -> AppResult<CashRegisterResponse> {
    let (Some(store_id), Some(raw_date)) = (
        non_empty(req.store_id.as_deref()),
        non_empty(req.date.as_deref()),
    ) else {
        return Err(AppError::validation("store_id and date are required"));
    };
    let date = dates::parse_date("date", &raw_date)?;

    if store::find_store(conn, &store_id)?.is_none() {
        return Err(AppError::not_found("Store not found"));
    }
    if cash_register::find_cash_register_for(conn, &store_id, date)?.is_some() {
        return Err(AppError::duplicate(
            "Cash register already exists for this store and date",
        ));
    }

    let cash_register =
        cash_register::insert_cash_register(conn, &NewCashRegister { store_id, date })?;

    Ok(CashRegisterResponse {
        message: "Cash register created successfully".to_string(),
        cash_register,
    })
}

pub fn get_cash_register(conn: &Connection, id: &str) -> AppResult<CashRegisterDetails> {
    let cash_register = cash_register::find_cash_register(conn, id)?
        .ok_or_else(|| AppError::not_found("Cash register not found"))?;

    let sales = sale::sales_for_register(conn, id)?;
    let deposits = deposit::deposits_for_register(conn, id)?;

    Ok(CashRegisterDetails {
        total_sales: money::sum(sales.iter().map(|s| &s.net_sales)),
        total_deposits: money::sum(deposits.iter().map(|d| &d.amount)),
        cash_register,
        sales,
        deposits,
    })
}

// ============================================================================
// SALES
// ============================================================================

/// Payment amounts default to zero when omitted
#[derive(Debug, Default, Deserialize)]
pub struct CreateSaleRequest {
    pub cash_register_id: Option<String>,
    pub sale_date: Option<String>,
    pub description: Option<String>,
    pub cash: Option<Decimal>,
    pub pix: Option<Decimal>,
    pub digital_wallets: Option<Decimal>,
    pub credit_card: Option<Decimal>,
    pub debit_card: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct SaleResponse {
    pub message: String,
    pub sale: Sale,
}

fn amount(field: &str, value: Option<Decimal>) -> AppResult<Decimal> {
    money::validate_amount(field, value.unwrap_or(Decimal::ZERO))
}

pub fn create_sale(conn: &Connection, req: CreateSaleRequest) -> AppResult<SaleResponse> {
    let register_id = require("cash_register_id", req.cash_register_id.as_deref())?;

    let amounts = PaymentAmounts {
        cash: amount("cash", req.cash)?,
        pix: amount("pix", req.pix)?,
        digital_wallets: amount("digital_wallets", req.digital_wallets)?,
        credit_card: amount("credit_card", req.credit_card)?,
        debit_card: amount("debit_card", req.debit_card)?,
    };

    let register = cash_register::find_cash_register(conn, &register_id)?
        .ok_or_else(|| AppError::not_found("Cash register not found"))?;

    let sale_date = match non_empty(req.sale_date.as_deref()) {
        Some(raw) => dates::parse_date("sale_date", &raw)?,
        None => register.date,
    };

    let sale = sale::insert_sale(
        conn,
        &NewSale {
            cash_register_id: register.id,
            sale_date,
            description: non_empty(req.description.as_deref()),
            amounts,
        },
    )?;

    Ok(SaleResponse {
        message: "Sale created successfully".to_string(),
        sale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::entities::store::{insert_store, NewStore};
    use rust_decimal_macros::dec;

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

    fn register_request(store_id: &str, date: &str) -> CreateCashRegisterRequest {
        CreateCashRegisterRequest {
            store_id: Some(store_id.to_string()),
            date: Some(date.to_string()),
        }
    }

    #[test]
    fn test_create_register_checks() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();
        let store_id = store(&conn);

        assert!(matches!(
            create_cash_register(&conn, CreateCashRegisterRequest::default()),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            create_cash_register(&conn, register_request("missing", "2024-05-01")),
            Err(AppError::NotFound(_))
        ));

        create_cash_register(&conn, register_request(&store_id, "2024-05-01")).unwrap();
        assert!(matches!(
            create_cash_register(&conn, register_request(&store_id, "2024-05-01")),
            Err(AppError::Duplicate(_))
        ));
    }

    #[test]
    fn test_create_sale_defaults() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();
        let store_id = store(&conn);
        let register = create_cash_register(&conn, register_request(&store_id, "2024-05-01"))
            .unwrap()
            .cash_register;

        let sale = create_sale(
            &conn,
            CreateSaleRequest {
                cash_register_id: Some(register.id.clone()),
                cash: Some(dec!(120.5)),
                debit_card: Some(dec!(79.50)),
                ..Default::default()
            },
        )
        .unwrap()
        .sale;

        assert_eq!(sale.sale_date, register.date);
        assert_eq!(sale.amounts.pix, dec!(0.00));
        assert_eq!(sale.net_sales, dec!(200.00));

        let details = get_cash_register(&conn, &register.id).unwrap();
        assert_eq!(details.sales.len(), 1);
        assert_eq!(details.total_sales, dec!(200.00));
        assert_eq!(details.total_deposits, dec!(0.00));
    }

    #[test]
    fn test_create_sale_rejects_bad_amounts() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();
        let store_id = store(&conn);
        let register = create_cash_register(&conn, register_request(&store_id, "2024-05-01"))
            .unwrap()
            .cash_register;

        for bad in [dec!(-1.00), dec!(1.001)] {
            let err = create_sale(
                &conn,
                CreateSaleRequest {
                    cash_register_id: Some(register.id.clone()),
                    pix: Some(bad),
                    ..Default::default()
                },
            )
            .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        assert!(matches!(
            create_sale(
                &conn,
                CreateSaleRequest {
                    cash_register_id: Some("missing".to_string()),
                    ..Default::default()
                },
            ),
            Err(AppError::NotFound(_))
        ));
    }
}
