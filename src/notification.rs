// Evidence request notification
//
// Composes the email a store would receive when evidence is requested.
// Nothing is sent; the message is returned to the caller as-is.

use crate::entities::{Reconciliation, ReconciliationStatus, Store};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

const SENDER_TEAM: &str = "Cash Reconciliation Team";
const RESPONSE_WINDOW_HOURS: u32 = 48;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatedEmail {
    pub to: String,
    pub subject: String,
    pub message: String,
    pub request_date: String,
    pub store_name: String,
    pub store_id: String,
    pub reconciliation_id: String,
    pub reconciliation_date: NaiveDate,
    pub reconciliation_status: ReconciliationStatus,
}

pub fn compose_evidence_email(
    store: &Store,
    reconciliation: &Reconciliation,
    request_message: &str,
    requested_at: DateTime<Utc>,
) -> SimulatedEmail {
    let date = reconciliation.date.format("%Y-%m-%d");

    let body = format!(
        "Dear {store} representative,\n\
         \n\
         We have identified the need to present evidence for cash flow regularization.\n\
         \n\
         Reconciliation date: {date}\n\
         Current status: {status}\n\
         \n\
         Request: {request}\n\
         \n\
         Please send the requested documentation within {hours} hours for analysis by the finance team.\n\
         \n\
         Best regards,\n\
         {team}",
        store = store.name,
        date = date,
        status = reconciliation.status,
        request = request_message,
        hours = RESPONSE_WINDOW_HOURS,
        team = SENDER_TEAM,
    );

    SimulatedEmail {
        to: format!("{} <contact@store.com.br>", store.name),
        subject: format!("Evidence Request - Reconciliation {}", date),
        message: body,
        request_date: requested_at.format("%m/%d/%Y, %I:%M %p").to_string(),
        store_name: store.name.clone(),
        store_id: store.id.clone(),
        reconciliation_id: reconciliation.id.clone(),
        reconciliation_date: reconciliation.date,
        reconciliation_status: reconciliation.status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_compose_evidence_email() {
        let at = Utc.with_ymd_and_hms(2024, 5, 2, 14, 5, 0).unwrap();
        let store = Store {
            id: "store-1".to_string(),
            name: "Loja Centro".to_string(),
            tax_id: None,
            address: None,
            created_at: at,
            updated_at: at,
        };
        let reconciliation = Reconciliation {
            id: "rec-1".to_string(),
            store_id: store.id.clone(),
            analyst_id: None,
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            status: ReconciliationStatus::PendingReturn,
            notes: None,
            created_at: at,
            updated_at: at,
        };

        let email = compose_evidence_email(&store, &reconciliation, "Send the PIX receipts", at);

        assert_eq!(email.to, "Loja Centro <contact@store.com.br>");
        assert_eq!(email.subject, "Evidence Request - Reconciliation 2024-05-01");
        assert_eq!(email.request_date, "05/02/2024, 02:05 PM");
        assert!(email.message.starts_with("Dear Loja Centro representative,\n\n"));
        assert!(email.message.contains("Current status: pending_return\n"));
        assert!(email.message.contains("Request: Send the PIX receipts\n"));
        assert!(email.message.ends_with("Best regards,\nCash Reconciliation Team"));
        assert_eq!(email.reconciliation_status, ReconciliationStatus::PendingReturn);
    }
}
