//! Rank/level estimation.
//!
//! The estimate is produced by an ordered list of strategies over the
//! records already at hand; the first strategy that returns a level wins.
//! The last strategy always answers, by replaying total XP against a fixed
//! growth curve.

use serde::Serialize;

use super::records::{Progress, Transaction};

/// Strategy 1 only trusts explicit grades at or above this level.
pub const MIN_PLAUSIBLE_LEVEL: u32 = 10;
pub const FIRST_LEVEL_XP: i64 = 50_000;
pub const LEVEL_GROWTH: f64 = 1.2;
pub const MAX_LEVEL: u32 = 100;

const LEVEL_MARKERS: [&str; 2] = ["level", "rank"];

const TITLES: &[(u32, &str)] = &[
    (60, "Senior Architect"),
    (50, "Lead Developer"),
    (40, "Senior Developer"),
    (30, "Assistant Developer"),
    (25, "Junior Developer"),
    (20, "Developer"),
    (15, "Advanced Programmer"),
    (10, "Programmer"),
    (5, "Junior Programmer"),
    (2, "Apprentice"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSource {
    ProgressGrade,
    LevelProgress,
    LevelTransaction,
    HighestGrade,
    XpCurve,
    Default,
}

impl LevelSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LevelSource::ProgressGrade => "progress_grade",
            LevelSource::LevelProgress => "level_progress",
            LevelSource::LevelTransaction => "level_transaction",
            LevelSource::HighestGrade => "highest_grade",
            LevelSource::XpCurve => "xp_curve",
            LevelSource::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelEstimate {
    pub level: u32,
    pub label: String,
    pub source: LevelSource,
}

impl LevelEstimate {
    pub fn new(level: u32, source: LevelSource) -> Self {
        Self {
            level,
            label: level_title(level).to_string(),
            source,
        }
    }

    /// Safe answer when probing failed.
    pub fn beginner() -> Self {
        Self::new(1, LevelSource::Default)
    }
}

/// Everything the strategies may look at.
#[derive(Debug, Clone, Default)]
pub struct LevelEvidence {
    /// Progress rows loaded with the profile.
    pub progress: Vec<Progress>,
    /// Progress rows returned by the level/rank probe query.
    pub probe_progress: Vec<Progress>,
    /// Transactions returned by the level/rank probe query.
    pub probe_transactions: Vec<Transaction>,
    /// Unfiltered XP total.
    pub total_xp: i64,
}

type Strategy = fn(&LevelEvidence) -> Option<u32>;

const STRATEGIES: [(LevelSource, Strategy); 5] = [
    (LevelSource::ProgressGrade, from_progress_grades),
    (LevelSource::LevelProgress, from_level_progress),
    (LevelSource::LevelTransaction, from_level_transactions),
    (LevelSource::HighestGrade, from_highest_grade),
    (LevelSource::XpCurve, from_xp_curve),
];

pub fn level_title(level: u32) -> &'static str {
    TITLES
        .iter()
        .find(|(threshold, _)| level >= *threshold)
        .map(|(_, title)| *title)
        .unwrap_or("Beginner")
}

pub fn estimate_level(evidence: &LevelEvidence) -> LevelEstimate {
    STRATEGIES
        .iter()
        .find_map(|(source, strategy)| strategy(evidence).map(|level| LevelEstimate::new(level, *source)))
        .unwrap_or_else(LevelEstimate::beginner)
}

fn has_marker(text: &str) -> bool {
    let lower = text.to_lowercase();
    LEVEL_MARKERS.iter().any(|m| lower.contains(m))
}

fn floor_level(value: f64) -> Option<u32> {
    if !value.is_finite() || value < 1.0 {
        return None;
    }
    Some(value.floor().min(u32::MAX as f64) as u32)
}

fn max_grade_above_one<'a>(rows: impl Iterator<Item = &'a Progress>) -> Option<f64> {
    rows.filter_map(|p| p.grade)
        .filter(|g| g.is_finite() && *g > 1.0)
        .fold(None, |best: Option<f64>, g| Some(best.map_or(g, |b| b.max(g))))
}

fn from_progress_grades(ev: &LevelEvidence) -> Option<u32> {
    max_grade_above_one(ev.progress.iter())
        .and_then(floor_level)
        .filter(|level| *level >= MIN_PLAUSIBLE_LEVEL)
}

fn from_level_progress(ev: &LevelEvidence) -> Option<u32> {
    ev.probe_progress
        .iter()
        .filter(|p| has_marker(&p.subject.category) || has_marker(&p.subject.name) || has_marker(&p.subject.path))
        .filter_map(|p| p.grade)
        .filter(|g| g.is_finite())
        .fold(None, |best: Option<f64>, g| Some(best.map_or(g, |b| b.max(g))))
        .and_then(floor_level)
}

fn from_level_transactions(ev: &LevelEvidence) -> Option<u32> {
    ev.probe_transactions
        .iter()
        .filter(|tx| has_marker(tx.kind.as_str()) || has_marker(&tx.subject.name))
        .map(|tx| tx.amount)
        .max()
        .and_then(|amount| floor_level((amount / 1000) as f64))
}

fn from_highest_grade(ev: &LevelEvidence) -> Option<u32> {
    max_grade_above_one(ev.progress.iter().chain(ev.probe_progress.iter())).and_then(floor_level)
}

fn from_xp_curve(ev: &LevelEvidence) -> Option<u32> {
    Some(simulate_level(ev.total_xp))
}

/// Level reached by spending `total_xp` on successive level-ups.
pub fn simulate_level(total_xp: i64) -> u32 {
    let mut level = 1u32;
    let mut required = FIRST_LEVEL_XP;
    let mut remaining = total_xp;
    while remaining >= required && level < MAX_LEVEL {
        remaining -= required;
        level += 1;
        required = (required as f64 * LEVEL_GROWTH).floor() as i64;
    }
    level
}
