// Deposit entity - money taken from a register to the bank
//
// A deposit may point at the sale it covers. That sale must belong to the
// same register; the handler checks it before calling `insert_deposit`.

use crate::dates::{self, TimeRange};
use crate::db::{self, get_date, get_money, get_timestamp, Filter};
use crate::error::AppResult;
use crate::money;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deposit {
    pub id: String,
    pub cash_register_id: String,
    pub sale_id: Option<String>,
    pub code: String,
    pub amount: Decimal,
    pub deposit_date: NaiveDate,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDeposit {
    pub cash_register_id: String,
    pub sale_id: Option<String>,
    pub code: String,
    pub amount: Decimal,
    pub deposit_date: NaiveDate,
    pub verified: bool,
}

/// A deposit as listed, with the store and register day it belongs to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepositListItem {
    #[serde(flatten)]
    pub deposit: Deposit,
    pub store_id: String,
    pub store_name: String,
    pub register_date: NaiveDate,
}

/// Filters for `list_deposits`
#[derive(Debug, Clone, Default)]
pub struct DepositQuery {
    pub store_id: Option<String>,
    pub range: TimeRange,
    pub verified: Option<bool>,
    pub sale_id: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

const COLUMNS: &str = "d.id, d.cash_register_id, d.sale_id, d.code, d.amount, d.deposit_date, \
                       d.verified, d.created_at, d.updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Deposit> {
    Ok(Deposit {
        id: row.get(0)?,
        cash_register_id: row.get(1)?,
        sale_id: row.get(2)?,
        code: row.get(3)?,
        amount: get_money(row, 4)?,
        deposit_date: get_date(row, 5)?,
        verified: row.get(6)?,
        created_at: get_timestamp(row, 7)?,
        updated_at: get_timestamp(row, 8)?,
    })
}

pub fn insert_deposit(conn: &Connection, new: &NewDeposit) -> AppResult<Deposit> {
    let now = dates::now();
    let deposit = Deposit {
        id: db::new_id(),
        cash_register_id: new.cash_register_id.clone(),
        sale_id: new.sale_id.clone(),
        code: new.code.clone(),
        amount: new.amount,
        deposit_date: new.deposit_date,
        verified: new.verified,
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO deposits (
            id, cash_register_id, sale_id, code, amount, deposit_date, verified,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            deposit.id,
            deposit.cash_register_id,
            deposit.sale_id,
            deposit.code,
            money::to_db(&deposit.amount),
            dates::format_date(deposit.deposit_date),
            deposit.verified,
            dates::format_timestamp(&deposit.created_at),
            dates::format_timestamp(&deposit.updated_at),
        ],
    )?;

    tracing::debug!(deposit_id = %deposit.id, code = %deposit.code, amount = %deposit.amount, "deposit inserted");
    Ok(deposit)
}

pub fn find_deposit(conn: &Connection, id: &str) -> AppResult<Option<Deposit>> {
    let deposit = conn
        .query_row(
            &format!("SELECT {} FROM deposits d WHERE d.id = ?1", COLUMNS),
            [id],
            from_row,
        )
        .optional()?;

    Ok(deposit)
}

/// Set the verified flag. Returns the updated row, or None when absent.
pub fn set_deposit_verified(
    conn: &Connection,
    id: &str,
    verified: bool,
) -> AppResult<Option<Deposit>> {
    let Some(mut deposit) = find_deposit(conn, id)? else {
        return Ok(None);
    };

    deposit.verified = verified;
    deposit.updated_at = dates::next_timestamp(deposit.updated_at);

    conn.execute(
        "UPDATE deposits SET verified = ?1, updated_at = ?2 WHERE id = ?3",
        params![
            deposit.verified,
            dates::format_timestamp(&deposit.updated_at),
            deposit.id
        ],
    )?;

    tracing::info!(deposit_id = %deposit.id, verified, "deposit verification updated");
    Ok(Some(deposit))
}

/// Page of deposits matching `query` plus the total count of matches.
///
/// Newest deposit date first, then newest insert first.
pub fn list_deposits(
    conn: &Connection,
    query: &DepositQuery,
) -> AppResult<(Vec<DepositListItem>, u64)> {
    let mut filter = Filter::new();
    filter.push_if("cr.store_id = ?", query.store_id.clone());
    filter.push_if(
        "d.deposit_date >= ?",
        query.range.first_date().map(dates::format_date),
    );
    filter.push_if(
        "d.deposit_date <= ?",
        query.range.last_date().map(dates::format_date),
    );
    filter.push_if("d.verified = ?", query.verified);
    filter.push_if("d.sale_id = ?", query.sale_id.clone());

    let from = format!(
        "FROM deposits d
         JOIN cash_registers cr ON cr.id = d.cash_register_id
         JOIN stores s ON s.id = cr.store_id
         {}",
        filter.where_sql()
    );

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) {}", from),
        params_from_iter(filter.params()),
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {}, s.id, s.name, cr.date {}
         ORDER BY d.deposit_date DESC, d.created_at DESC
         LIMIT ? OFFSET ?",
        COLUMNS, from
    ))?;

    let deposits = stmt
        .query_map(
            params_from_iter(filter.params_with_page(query.limit, query.offset)),
            |row| {
                Ok(DepositListItem {
                    deposit: from_row(row)?,
                    store_id: row.get(9)?,
                    store_name: row.get(10)?,
                    register_date: get_date(row, 11)?,
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(returned = deposits.len(), total, "deposits listed");
    Ok((deposits, total.max(0) as u64))
}

/// `(cash_register_id, amount)` for every deposit on a register dated `date`
pub fn deposit_amounts_on(conn: &Connection, date: NaiveDate) -> AppResult<Vec<(String, Decimal)>> {
    let mut stmt = conn.prepare(
        "SELECT d.cash_register_id, d.amount
         FROM deposits d
         JOIN cash_registers cr ON cr.id = d.cash_register_id
         WHERE cr.date = ?1",
    )?;

    let rows = stmt
        .query_map([dates::format_date(date)], |row| {
            Ok((row.get::<_, String>(0)?, get_money(row, 1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub fn deposits_for_register(conn: &Connection, cash_register_id: &str) -> AppResult<Vec<Deposit>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM deposits d WHERE d.cash_register_id = ?1 ORDER BY d.created_at",
        COLUMNS
    ))?;

    let deposits = stmt
        .query_map([cash_register_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(deposits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::entities::cash_register::{insert_cash_register, NewCashRegister};
    use crate::entities::store::{insert_store, NewStore};
    use rust_decimal_macros::dec;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Store with one register per given day; returns (store_id, register ids)
    fn setup(conn: &Connection, name: &str, days: &[&str]) -> (String, Vec<String>) {
        let store = insert_store(
            conn,
            &NewStore {
                name: name.to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        let registers = days
            .iter()
            .map(|d| {
                insert_cash_register(
                    conn,
                    &NewCashRegister {
                        store_id: store.id.clone(),
                        date: day(d),
                    },
                )
                .unwrap()
                .id
            })
            .collect();

        (store.id, registers)
    }

    fn deposit(conn: &Connection, register: &str, code: &str, amount: Decimal, date: &str) -> Deposit {
        insert_deposit(
            conn,
            &NewDeposit {
                cash_register_id: register.to_string(),
                sale_id: None,
                code: code.to_string(),
                amount,
                deposit_date: day(date),
                verified: false,
            },
        )
        .unwrap()
    }

    fn query() -> DepositQuery {
        DepositQuery {
            limit: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_verify_updates_timestamp() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();
        let (_, registers) = setup(&conn, "Centro", &["2024-05-01"]);

        let original = deposit(&conn, &registers[0], "DEP1", dec!(100.00), "2024-05-01");
        let updated = set_deposit_verified(&conn, &original.id, true).unwrap().unwrap();
        let refetched = find_deposit(&conn, &original.id).unwrap().unwrap();

        assert!(refetched.verified);
        assert!(refetched.updated_at > original.updated_at);
        assert_eq!(refetched, updated);
        assert!(set_deposit_verified(&conn, "missing", true).unwrap().is_none());
    }

    #[test]
    fn test_list_single_day_range() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();
        let (_, registers) = setup(&conn, "Centro", &["2024-04-30", "2024-05-01", "2024-05-02"]);

        deposit(&conn, &registers[0], "BEFORE", dec!(1.00), "2024-04-30");
        deposit(&conn, &registers[1], "IN-1", dec!(2.00), "2024-05-01");
        deposit(&conn, &registers[1], "IN-2", dec!(3.00), "2024-05-01");
        deposit(&conn, &registers[2], "AFTER", dec!(4.00), "2024-05-02");

        let mut q = query();
        q.range = TimeRange::from_params(Some("2024-05-01"), Some("2024-05-01")).unwrap();
        let (items, total) = list_deposits(&conn, &q).unwrap();

        assert_eq!(total, 2);
        let mut codes: Vec<&str> = items.iter().map(|i| i.deposit.code.as_str()).collect();
        codes.sort();
        assert_eq!(codes, vec!["IN-1", "IN-2"]);
    }

    #[test]
    fn test_list_filters_and_pagination() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();
        let (store_a, regs_a) = setup(&conn, "A", &["2024-05-01"]);
        let (_, regs_b) = setup(&conn, "B", &["2024-05-01"]);

        let first = deposit(&conn, &regs_a[0], "A1", dec!(10.00), "2024-05-01");
        deposit(&conn, &regs_a[0], "A2", dec!(20.00), "2024-05-01");
        deposit(&conn, &regs_a[0], "A3", dec!(30.00), "2024-05-01");
        deposit(&conn, &regs_b[0], "B1", dec!(40.00), "2024-05-01");
        set_deposit_verified(&conn, &first.id, true).unwrap();

        let mut q = query();
        q.store_id = Some(store_a.clone());
        let (items, total) = list_deposits(&conn, &q).unwrap();
        assert_eq!(total, 3);
        assert!(items.iter().all(|i| i.store_name == "A"));

        q.verified = Some(true);
        let (items, total) = list_deposits(&conn, &q).unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].deposit.code, "A1");

        // Page size 2, second page holds the remaining match
        let mut q = query();
        q.limit = 2;
        q.offset = 2;
        let (items, total) = list_deposits(&conn, &q).unwrap();
        assert_eq!(total, 4);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_amounts_on_day() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();
        let (_, registers) = setup(&conn, "Centro", &["2024-05-01", "2024-05-02"]);

        deposit(&conn, &registers[0], "D1", dec!(100.00), "2024-05-01");
        deposit(&conn, &registers[1], "D2", dec!(50.00), "2024-05-02");

        let amounts = deposit_amounts_on(&conn, day("2024-05-01")).unwrap();
        assert_eq!(amounts, vec![(registers[0].clone(), dec!(100.00))]);
        assert_eq!(deposits_for_register(&conn, &registers[1]).unwrap().len(), 1);
    }
}
