use serde::Serialize;

use super::records::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AuditSummary {
    pub given: i64,
    pub received: i64,
    pub ratio: f64,
}

impl AuditSummary {
    pub fn from_totals(given: i64, received: i64) -> Self {
        let ratio = if received != 0 {
            given as f64 / received as f64
        } else if given > 0 {
            given as f64
        } else {
            0.0
        };
        Self { given, received, ratio }
    }
}

/// `received` amounts are taken as absolute values.
pub fn audit_summary(given: &[Transaction], received: &[Transaction]) -> AuditSummary {
    let given_total: i64 = given.iter().map(|tx| tx.amount).sum();
    let received_total: i64 = received.iter().map(|tx| tx.amount.abs()).sum();
    AuditSummary::from_totals(given_total, received_total)
}
