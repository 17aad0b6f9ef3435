// Sale entity - what a register took in, split by payment method

use crate::dates;
use crate::db::{self, get_date, get_money, get_timestamp};
use crate::error::AppResult;
use crate::money;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::Serialize;

/// Amounts per payment method
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PaymentAmounts {
    pub cash: Decimal,
    pub pix: Decimal,
    pub digital_wallets: Decimal,
    pub credit_card: Decimal,
    pub debit_card: Decimal,
}

impl PaymentAmounts {
    /// Net sales: the sum of every payment method
    pub fn net_total(&self) -> Decimal {
        money::sum(&[
            self.cash,
            self.pix,
            self.digital_wallets,
            self.credit_card,
            self.debit_card,
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sale {
    pub id: String,
    pub cash_register_id: String,
    pub sale_date: NaiveDate,
    pub description: Option<String>,
    #[serde(flatten)]
    pub amounts: PaymentAmounts,
    pub net_sales: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSale {
    pub cash_register_id: String,
    pub sale_date: NaiveDate,
    pub description: Option<String>,
    pub amounts: PaymentAmounts,
}

const COLUMNS: &str = "id, cash_register_id, sale_date, description, cash, pix, digital_wallets, \
                       credit_card, debit_card, net_sales, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Sale> {
    Ok(Sale {
        id: row.get(0)?,
        cash_register_id: row.get(1)?,
        sale_date: get_date(row, 2)?,
        description: row.get(3)?,
        amounts: PaymentAmounts {
            cash: get_money(row, 4)?,
            pix: get_money(row, 5)?,
            digital_wallets: get_money(row, 6)?,
            credit_card: get_money(row, 7)?,
            debit_card: get_money(row, 8)?,
        },
        net_sales: get_money(row, 9)?,
        created_at: get_timestamp(row, 10)?,
        updated_at: get_timestamp(row, 11)?,
    })
}

/// Amounts are expected to be validated already; `net_sales` is derived here
pub fn insert_sale(conn: &Connection, new: &NewSale) -> AppResult<Sale> {
    let now = dates::now();
    let sale = Sale {
        id: db::new_id(),
        cash_register_id: new.cash_register_id.clone(),
        sale_date: new.sale_date,
        description: new.description.clone(),
        amounts: new.amounts,
        net_sales: new.amounts.net_total(),
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        &format!(
            "INSERT INTO sales ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            COLUMNS
        ),
        params![
            sale.id,
            sale.cash_register_id,
            dates::format_date(sale.sale_date),
            sale.description,
            money::to_db(&sale.amounts.cash),
            money::to_db(&sale.amounts.pix),
            money::to_db(&sale.amounts.digital_wallets),
            money::to_db(&sale.amounts.credit_card),
            money::to_db(&sale.amounts.debit_card),
            money::to_db(&sale.net_sales),
            dates::format_timestamp(&sale.created_at),
            dates::format_timestamp(&sale.updated_at),
        ],
    )?;

    tracing::debug!(sale_id = %sale.id, net_sales = %sale.net_sales, "sale inserted");
    Ok(sale)
}

pub fn find_sale(conn: &Connection, id: &str) -> AppResult<Option<Sale>> {
    let sale = conn
        .query_row(
            &format!("SELECT {} FROM sales WHERE id = ?1", COLUMNS),
            [id],
            from_row,
        )
        .optional()?;

    Ok(sale)
}

pub fn sales_for_register(conn: &Connection, cash_register_id: &str) -> AppResult<Vec<Sale>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM sales WHERE cash_register_id = ?1 ORDER BY created_at",
        COLUMNS
    ))?;

    let sales = stmt
        .query_map([cash_register_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(sales)
}

/// `(cash_register_id, net_sales)` for every sale on a register dated `date`
pub fn net_sales_on(conn: &Connection, date: NaiveDate) -> AppResult<Vec<(String, Decimal)>> {
    let mut stmt = conn.prepare(
        "SELECT s.cash_register_id, s.net_sales
         FROM sales s
         JOIN cash_registers cr ON cr.id = s.cash_register_id
         WHERE cr.date = ?1",
    )?;

    let rows = stmt
        .query_map([dates::format_date(date)], |row| {
            Ok((row.get::<_, String>(0)?, get_money(row, 1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}
