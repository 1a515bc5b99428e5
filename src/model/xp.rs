//! XP filtering, cumulative series and per-project totals.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::records::{Transaction, TransactionKind};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct XpPoint {
    pub at: DateTime<Utc>,
    pub running_total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectXp {
    pub name: String,
    pub amount: i64,
    pub at: DateTime<Utc>,
}

/// True for piscine records belonging to the given language track.
fn is_language_piscine(tx: &Transaction, lang: &str) -> bool {
    if tx.subject.category != "piscine" {
        return false;
    }
    let name = tx.subject.name.to_lowercase();
    name.contains(lang)
        || tx.subject.path.contains(&format!("piscine-{}", lang))
        || name == format!("piscine {}", lang)
}

fn keep_xp(tx: &Transaction) -> bool {
    let category = tx.subject.category.as_str();
    if category == "exercise" || category == "raid" {
        return false;
    }
    !is_language_piscine(tx, "go") && !is_language_piscine(tx, "rust")
}

/// Drop exercise/raid XP and the Go/Rust piscines; everything else stays.
pub fn filter_xp(transactions: &[Transaction]) -> Vec<Transaction> {
    transactions.iter().filter(|tx| keep_xp(tx)).cloned().collect()
}

/// Ascending by time (stable), one point per record carrying the running sum.
pub fn cumulative_series(transactions: &[Transaction]) -> Vec<XpPoint> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by_key(|tx| tx.created_at);

    let mut running = 0i64;
    ordered
        .into_iter()
        .map(|tx| {
            running += tx.amount;
            XpPoint {
                at: tx.created_at,
                running_total: running,
            }
        })
        .collect()
}

/// Unfiltered sum over `xp` transactions.
pub fn total_xp(transactions: &[Transaction]) -> i64 {
    transactions
        .iter()
        .filter(|tx| tx.kind == TransactionKind::Xp)
        .map(|tx| tx.amount)
        .sum()
}

/// XP summed per subject name, highest first, truncated to `limit`.
pub fn xp_by_project(transactions: &[Transaction], limit: usize) -> Vec<ProjectXp> {
    let mut projects: Vec<ProjectXp> = Vec::new();
    for tx in transactions {
        let name = if tx.subject.name.is_empty() { &tx.subject.path } else { &tx.subject.name };
        match projects.iter_mut().find(|p| &p.name == name) {
            Some(p) => {
                p.amount += tx.amount;
                if tx.created_at > p.at {
                    p.at = tx.created_at;
                }
            }
            None => projects.push(ProjectXp {
                name: name.clone(),
                amount: tx.amount,
                at: tx.created_at,
            }),
        }
    }
    projects.sort_by(|a, b| b.amount.cmp(&a.amount));
    projects.truncate(limit);
    projects
}

/// Most recent grants first.
pub fn recent_xp(transactions: &[Transaction], limit: usize) -> Vec<ProjectXp> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    ordered
        .into_iter()
        .take(limit)
        .map(|tx| ProjectXp {
            name: tx.subject.name.clone(),
            amount: tx.amount,
            at: tx.created_at,
        })
        .collect()
}
