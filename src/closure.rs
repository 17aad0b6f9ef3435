// Store closure - per-store cash position for one calendar day
//
// Loads stores, that day's registers, sales, deposits and reconciliations
// with one query each, then combines them in memory.

use crate::entities::cash_register::{self, CashRegister};
use crate::entities::deposit;
use crate::entities::reconciliation::{self, Reconciliation, ReconciliationStatus};
use crate::entities::sale;
use crate::entities::store::{self, Store};
use crate::error::AppResult;
use crate::money;
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

// ============================================================================
// REPORT TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreClosure {
    pub store_id: String,
    pub store_name: String,
    pub date: NaiveDate,
    pub total_sales: Decimal,
    pub total_deposits: Decimal,
    /// total_sales - total_deposits
    pub balance: Decimal,
    pub reconciliation_status: Option<ReconciliationStatus>,
    pub has_register: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosureReport {
    pub date: NaiveDate,
    pub total_stores: usize,
    pub stores_with_register: usize,
    pub stores_without_register: usize,
    pub closures: Vec<StoreClosure>,
}

/// Everything the aggregation reads, already narrowed to one date
#[derive(Debug, Default)]
pub struct ClosureInputs {
    /// In output order
    pub stores: Vec<Store>,
    pub registers: Vec<CashRegister>,
    /// `(cash_register_id, net_sales)`
    pub sales: Vec<(String, Decimal)>,
    /// `(cash_register_id, amount)`
    pub deposits: Vec<(String, Decimal)>,
    pub reconciliations: Vec<Reconciliation>,
}

// ============================================================================
// AGGREGATION
// ============================================================================

pub struct ClosureAggregator;

impl ClosureAggregator {
    pub fn aggregate(date: NaiveDate, inputs: &ClosureInputs) -> ClosureReport {
        let mut registers_by_store: HashMap<&str, Vec<&str>> = HashMap::new();
        for register in &inputs.registers {
            registers_by_store
                .entry(register.store_id.as_str())
                .or_default()
                .push(register.id.as_str());
        }

        let sales_by_register = group_amounts(&inputs.sales);
        let deposits_by_register = group_amounts(&inputs.deposits);

        let status_by_store: HashMap<&str, ReconciliationStatus> = inputs
            .reconciliations
            .iter()
            .map(|r| (r.store_id.as_str(), r.status))
            .collect();

        let closures: Vec<StoreClosure> = inputs
            .stores
            .iter()
            .map(|store| {
                let Some(register_ids) = registers_by_store.get(store.id.as_str()) else {
                    let zero = Decimal::new(0, money::SCALE);
                    return StoreClosure {
                        store_id: store.id.clone(),
                        store_name: store.name.clone(),
                        date,
                        total_sales: zero,
                        total_deposits: zero,
                        balance: zero,
                        reconciliation_status: Some(ReconciliationStatus::NotIntegrated),
                        has_register: false,
                    };
                };

                let total_sales = money::sum(
                    register_ids
                        .iter()
                        .filter_map(|id| sales_by_register.get(id))
                        .flatten()
                        .copied(),
                );
                let total_deposits = money::sum(
                    register_ids
                        .iter()
                        .filter_map(|id| deposits_by_register.get(id))
                        .flatten()
                        .copied(),
                );

                StoreClosure {
                    store_id: store.id.clone(),
                    store_name: store.name.clone(),
                    date,
                    total_sales,
                    total_deposits,
                    balance: total_sales - total_deposits,
                    reconciliation_status: status_by_store.get(store.id.as_str()).copied(),
                    has_register: true,
                }
            })
            .collect();

        let stores_with_register = closures.iter().filter(|c| c.has_register).count();

        ClosureReport {
            date,
            total_stores: closures.len(),
            stores_with_register,
            stores_without_register: closures.len() - stores_with_register,
            closures,
        }
    }
}

fn group_amounts(rows: &[(String, Decimal)]) -> HashMap<&str, Vec<&Decimal>> {
    let mut grouped: HashMap<&str, Vec<&Decimal>> = HashMap::new();
    for (register_id, amount) in rows {
        grouped.entry(register_id.as_str()).or_default().push(amount);
    }
    grouped
}

/// Load one day's data and aggregate it.
///
/// `status` only narrows which reconciliations are considered; every store
/// is still listed.
pub fn store_closures(
    conn: &Connection,
    date: NaiveDate,
    status: Option<ReconciliationStatus>,
) -> AppResult<ClosureReport> {
    let inputs = ClosureInputs {
        stores: store::list_stores(conn)?,
        registers: cash_register::cash_registers_on(conn, date)?,
        sales: sale::net_sales_on(conn, date)?,
        deposits: deposit::deposit_amounts_on(conn, date)?,
        reconciliations: reconciliation::reconciliations_on(conn, date, status)?,
    };

    let report = ClosureAggregator::aggregate(date, &inputs);
    tracing::debug!(
        %date,
        stores = report.total_stores,
        with_register = report.stores_with_register,
        "store closure computed"
    );
    Ok(report)
}

// ============================================================================
// CSV EXPORT
// ============================================================================

const CSV_HEADER: [&str; 8] = [
    "store_id",
    "store_name",
    "date",
    "total_sales",
    "total_deposits",
    "balance",
    "reconciliation_status",
    "has_register",
];

impl ClosureReport {
    /// One row per store, amounts with two decimal places
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(CSV_HEADER)?;

        for closure in &self.closures {
            wtr.write_record([
                closure.store_id.clone(),
                closure.store_name.clone(),
                closure.date.to_string(),
                money::to_db(&closure.total_sales),
                money::to_db(&closure.total_deposits),
                money::to_db(&closure.balance),
                closure
                    .reconciliation_status
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
                closure.has_register.to_string(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::entities::cash_register::{insert_cash_register, NewCashRegister};
    use crate::entities::deposit::{insert_deposit, NewDeposit};
    use crate::entities::reconciliation::{insert_reconciliation, NewReconciliation};
    use crate::entities::sale::{insert_sale, NewSale, PaymentAmounts};
    use crate::entities::store::{insert_store, NewStore};
    use rust_decimal_macros::dec;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn store(conn: &Connection, name: &str) -> String {
        insert_store(
            conn,
            &NewStore {
                name: name.to_string(),
                ..Default::default()
            },
        )
        .unwrap()
        .id
    }

    fn register(conn: &Connection, store_id: &str, date: &str) -> String {
        insert_cash_register(
            conn,
            &NewCashRegister {
                store_id: store_id.to_string(),
                date: day(date),
            },
        )
        .unwrap()
        .id
    }

    fn sale(conn: &Connection, register_id: &str, date: &str, cash: Decimal, pix: Decimal) {
        insert_sale(
            conn,
            &NewSale {
                cash_register_id: register_id.to_string(),
                sale_date: day(date),
                description: None,
                amounts: PaymentAmounts {
                    cash,
                    pix,
                    ..Default::default()
                },
            },
        )
        .unwrap();
    }

    fn deposit(conn: &Connection, register_id: &str, code: &str, amount: Decimal, date: &str) {
        insert_deposit(
            conn,
            &NewDeposit {
                cash_register_id: register_id.to_string(),
                sale_id: None,
                code: code.to_string(),
                amount,
                deposit_date: day(date),
                verified: false,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_day_without_registers_is_not_integrated_everywhere() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();
        store(&conn, "Beta");
        store(&conn, "Alpha");

        let report = store_closures(&conn, day("2024-05-01"), None).unwrap();

        assert_eq!(report.total_stores, 2);
        assert_eq!(report.stores_with_register, 0);
        assert_eq!(report.stores_without_register, 2);
        assert_eq!(report.closures[0].store_name, "Alpha");
        for closure in &report.closures {
            assert_eq!(closure.total_sales, Decimal::ZERO);
            assert_eq!(closure.total_deposits, Decimal::ZERO);
            assert_eq!(closure.balance, Decimal::ZERO);
            assert_eq!(
                closure.reconciliation_status,
                Some(ReconciliationStatus::NotIntegrated)
            );
            assert!(!closure.has_register);
        }
    }

    #[test]
    fn test_balance_is_exact() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();
        let store_id = store(&conn, "Centro");
        let reg = register(&conn, &store_id, "2024-05-01");

        sale(&conn, &reg, "2024-05-01", dec!(600.10), dec!(399.90));
        deposit(&conn, &reg, "D1", dec!(500.25), "2024-05-01");
        deposit(&conn, &reg, "D2", dec!(249.75), "2024-05-02");

        let report = store_closures(&conn, day("2024-05-01"), None).unwrap();
        let closure = &report.closures[0];

        assert_eq!(closure.total_sales, dec!(1000.00));
        assert_eq!(closure.total_deposits, dec!(750.00));
        assert_eq!(closure.balance, dec!(250.00));
        assert!(closure.has_register);
        assert_eq!(closure.reconciliation_status, None);
    }

    #[test]
    fn test_only_that_days_data_counts() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();
        let store_id = store(&conn, "Centro");
        let today = register(&conn, &store_id, "2024-05-01");
        let tomorrow = register(&conn, &store_id, "2024-05-02");

        sale(&conn, &today, "2024-05-01", dec!(10.00), dec!(0));
        sale(&conn, &tomorrow, "2024-05-02", dec!(99.00), dec!(0));
        deposit(&conn, &tomorrow, "D", dec!(99.00), "2024-05-02");

        let report = store_closures(&conn, day("2024-05-01"), None).unwrap();
        assert_eq!(report.closures[0].total_sales, dec!(10.00));
        assert_eq!(report.closures[0].total_deposits, dec!(0.00));
        assert_eq!(report.closures[0].balance, dec!(10.00));
    }

    #[test]
    fn test_status_filter_narrows_reconciliations_only() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();
        let a = store(&conn, "A");
        let b = store(&conn, "B");
        register(&conn, &a, "2024-05-01");
        register(&conn, &b, "2024-05-01");

        for (store_id, status) in [
            (&a, ReconciliationStatus::Closed),
            (&b, ReconciliationStatus::Open),
        ] {
            insert_reconciliation(
                &conn,
                &NewReconciliation {
                    store_id: store_id.clone(),
                    date: day("2024-05-01"),
                    analyst_id: None,
                    status,
                    notes: None,
                },
            )
            .unwrap();
        }

        let report =
            store_closures(&conn, day("2024-05-01"), Some(ReconciliationStatus::Closed)).unwrap();
        assert_eq!(report.total_stores, 2);
        assert_eq!(
            report.closures[0].reconciliation_status,
            Some(ReconciliationStatus::Closed)
        );
        assert_eq!(report.closures[1].reconciliation_status, None);
    }

    #[test]
    fn test_aggregate_is_repeatable() {
        let date = day("2024-05-01");
        let mut inputs = ClosureInputs::default();
        inputs.stores.push(Store {
            id: "s1".to_string(),
            name: "Centro".to_string(),
            tax_id: None,
            address: None,
            created_at: crate::dates::now(),
            updated_at: crate::dates::now(),
        });
        inputs.registers.push(CashRegister {
            id: "r1".to_string(),
            store_id: "s1".to_string(),
            date,
            created_at: crate::dates::now(),
            updated_at: crate::dates::now(),
        });
        for _ in 0..10 {
            inputs.sales.push(("r1".to_string(), dec!(0.10)));
            inputs.deposits.push(("r1".to_string(), dec!(0.07)));
        }

        let first = ClosureAggregator::aggregate(date, &inputs);
        let second = ClosureAggregator::aggregate(date, &inputs);
        assert_eq!(first, second);
        assert_eq!(first.closures[0].total_sales, dec!(1.00));
        assert_eq!(first.closures[0].balance, dec!(0.30));
    }

    #[test]
    fn test_write_csv() {
        let report = ClosureReport {
            date: day("2024-05-01"),
            total_stores: 1,
            stores_with_register: 1,
            stores_without_register: 0,
            closures: vec![StoreClosure {
                store_id: "s1".to_string(),
                store_name: "Centro".to_string(),
                date: day("2024-05-01"),
                total_sales: dec!(1000),
                total_deposits: dec!(750.5),
                balance: dec!(249.5),
                reconciliation_status: None,
                has_register: true,
            }],
        };

        let mut out = Vec::new();
        report.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "store_id,store_name,date,total_sales,total_deposits,balance,reconciliation_status,has_register"
        );
        assert_eq!(lines[1], "s1,Centro,2024-05-01,1000.00,750.50,249.50,,true");
    }
}
