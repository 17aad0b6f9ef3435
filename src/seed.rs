// Demo data generator
//
// Deterministic: the same options always produce the same stores, amounts
// and statuses (ids and timestamps aside). Everything is written in one
// transaction.

use crate::entities::analyst::{self, NewAnalyst};
use crate::entities::cash_register::{self, NewCashRegister};
use crate::entities::deposit::{self, NewDeposit};
use crate::entities::evidence_request::{self, EvidenceStatus, NewEvidenceRequest};
use crate::entities::reconciliation::{self, NewReconciliation, ReconciliationStatus};
use crate::entities::sale::{self, NewSale, PaymentAmounts};
use crate::entities::store::{self, NewStore};
use crate::error::{AppError, AppResult};
use chrono::{Duration, NaiveDate};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

const STORE_TYPES: [&str; 6] = [
    "Shopping Center",
    "Street Store",
    "Outlet",
    "Plaza",
    "Corner Store",
    "Boutique",
];

const CITIES: [&str; 5] = ["Sao Paulo", "Curitiba", "Recife", "Porto Alegre", "Belem"];

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub stores: usize,
    pub analysts: usize,
    /// Number of days of register data, ending at `end_date`
    pub days: u32,
    pub end_date: NaiveDate,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub analysts: usize,
    pub stores: usize,
    pub cash_registers: usize,
    pub sales: usize,
    pub deposits: usize,
    pub reconciliations: usize,
    pub evidence_requests: usize,
}

/// Spread `seed` over `min..=max` cents
fn amount(seed: u64, min_cents: i64, max_cents: i64) -> Decimal {
    let mixed = seed
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(1_442_695_040_888_963_407)
        >> 33;
    let span = (max_cents - min_cents + 1) as u64;
    Decimal::new(min_cents + (mixed % span) as i64, 2)
}

/// Store-days without a register, so closures show not_integrated stores
fn skipped(store_idx: usize, day_idx: u32) -> bool {
    (store_idx * 7 + day_idx as usize) % 11 == 0
}

/// Date `days_back` days before `end_date`, or a validation error when that
/// falls outside the supported calendar
fn day_before(end_date: NaiveDate, days_back: u32) -> AppResult<NaiveDate> {
    end_date
        .checked_sub_signed(Duration::days(i64::from(days_back)))
        .ok_or_else(|| {
            AppError::validation(format!(
                "Cannot seed {} days back from {}: date out of range",
                days_back, end_date
            ))
        })
}

fn reconciliation_status(store_idx: usize, day_idx: u32) -> ReconciliationStatus {
    match (store_idx + day_idx as usize) % 5 {
        0 | 1 => ReconciliationStatus::Closed,
        2 => ReconciliationStatus::Open,
        3 => ReconciliationStatus::PendingReturn,
        _ => ReconciliationStatus::Open,
    }
}

pub fn seed_demo_data(conn: &Connection, options: &SeedOptions) -> AppResult<SeedSummary> {
    if !store::list_stores(conn)?.is_empty() {
        return Err(AppError::validation(
            "Database already contains stores; seed an empty database",
        ));
    }

    if options.days > 0 {
        day_before(options.end_date, options.days - 1)?;
    }

    let tx = conn.unchecked_transaction()?;
    let mut summary = SeedSummary::default();

    let mut analyst_ids = Vec::with_capacity(options.analysts);
    for i in 0..options.analysts {
        let analyst = analyst::insert_analyst(
            &tx,
            &NewAnalyst {
                name: format!("Analyst {}", i + 1),
                email: format!("analyst{}@cashrec.local", i + 1),
                password: "changeme".to_string(),
            },
        )?;
        analyst_ids.push(analyst.id);
    }
    summary.analysts = analyst_ids.len();

    for s in 0..options.stores {
        let city = CITIES[s % CITIES.len()];
        let store = store::insert_store(
            &tx,
            &NewStore {
                name: format!("{} {:03} - {}", STORE_TYPES[s % STORE_TYPES.len()], s + 1, city),
                tax_id: Some(format!("{:014}", 11_222_333_000_100u64 + s as u64)),
                address: Some(format!("{} Main Street, {}", 100 + s, city)),
            },
        )?;
        summary.stores += 1;

        for d in 0..options.days {
            let date = day_before(options.end_date, d)?;
            let day_seed = (s as u64) * 1_000 + u64::from(d);

            if skipped(s, d) {
                continue;
            }

            let register = cash_register::insert_cash_register(
                &tx,
                &NewCashRegister {
                    store_id: store.id.clone(),
                    date,
                },
            )?;
            summary.cash_registers += 1;

            let sale_count = 1 + (day_seed % 4) as usize;
            for k in 0..sale_count {
                let sale_seed = day_seed * 10 + k as u64;
                let sale = sale::insert_sale(
                    &tx,
                    &NewSale {
                        cash_register_id: register.id.clone(),
                        sale_date: date,
                        description: Some(format!("Shift {}", k + 1)),
                        amounts: PaymentAmounts {
                            cash: amount(sale_seed, 50_000, 800_000),
                            pix: amount(sale_seed + 1, 20_000, 500_000),
                            digital_wallets: amount(sale_seed + 2, 10_000, 300_000),
                            credit_card: amount(sale_seed + 3, 100_000, 1_500_000),
                            debit_card: amount(sale_seed + 4, 80_000, 800_000),
                        },
                    },
                )?;
                summary.sales += 1;

                // Every seventh sale is deposited short, leaving a balance
                let mut remaining = sale.net_sales;
                if sale_seed % 7 == 0 {
                    remaining -= amount(sale_seed, 1_000, 20_000).min(remaining);
                }
                let first = (remaining * Decimal::new(6, 1)).round_dp(2);
                for (n, part) in [first, remaining - first].into_iter().enumerate() {
                    deposit::insert_deposit(
                        &tx,
                        &NewDeposit {
                            cash_register_id: register.id.clone(),
                            sale_id: Some(sale.id.clone()),
                            code: format!("DEP{}{:04}", date.format("%Y%m%d"), (sale_seed % 10_000) * 2 + n as u64),
                            amount: part,
                            deposit_date: date,
                            verified: (sale_seed + n as u64) % 3 == 0,
                        },
                    )?;
                    summary.deposits += 1;
                }
            }

            let status = reconciliation_status(s, d);
            let analyst_id = match analyst_ids.len() {
                0 => None,
                n => Some(analyst_ids[(s + d as usize) % n].clone()),
            };
            let rec = reconciliation::insert_reconciliation(
                &tx,
                &NewReconciliation {
                    store_id: store.id.clone(),
                    date,
                    analyst_id,
                    status,
                    notes: Some(format!("Seeded review for {}", date)),
                },
            )?;
            summary.reconciliations += 1;

            if status == ReconciliationStatus::PendingReturn {
                evidence_request::insert_evidence_request(
                    &tx,
                    &NewEvidenceRequest {
                        reconciliation_id: rec.id,
                        message: "Please send the deposit slips for this day".to_string(),
                        status: if d % 2 == 0 {
                            EvidenceStatus::Pending
                        } else {
                            EvidenceStatus::Responded
                        },
                    },
                )?;
                summary.evidence_requests += 1;
            }
        }
    }

    tx.commit()?;
    tracing::info!(?summary, "demo data seeded");
    Ok(summary)
}
