//! Skill aggregation: label normalization, category inference and the two
//! ranking policies.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::records::{Transaction, SKILL_PREFIX};

/// Known skill abbreviations and their display names.
const SKILL_NAMES: &[(&str, &str)] = &[
    ("go", "Go Programming"),
    ("js", "JavaScript"),
    ("web-dev", "Web Development"),
    ("front-end", "Front-end Development"),
    ("back-end", "Back-end Development"),
    ("html", "HTML"),
    ("css", "CSS"),
    ("sql", "SQL"),
    ("unix", "Unix"),
    ("docker", "Docker"),
    ("sys-admin", "System Administration"),
    ("algo", "Algorithms"),
    ("prog", "Programming"),
    ("tcp", "TCP/IP Networking"),
    ("stats", "Statistics"),
    ("game", "Game Development"),
    ("ai", "Artificial Intelligence"),
    ("rust", "Rust Programming"),
    ("c", "C Programming"),
    ("python", "Python"),
];

/// Ordered category rules; the first rule with a matching marker wins.
const CATEGORY_RULES: &[(&str, &[&str])] = &[
    ("Web Development", &["web", "html", "css", "javascript", "front"]),
    ("Backend Development", &["back", "server", "api", "node"]),
    ("Database Management", &["sql", "database", "db"]),
    ("Network Programming", &["network", "tcp", "http", "socket"]),
    ("Algorithm Design", &["algo", "stat", "math"]),
    ("Security", &["security", "crypto", "cyber"]),
    ("DevOps", &["docker", "devops", "unix", "admin", "cloud"]),
    ("Programming Languages", &["programming", "go", "rust", "python", "java", "language"]),
];

pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillPolicy {
    /// Amount is the sum over all occurrences.
    Sum,
    /// Amount is the single highest occurrence.
    Max,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillAggregate {
    pub label: String,
    pub amount: i64,
    pub occurrences: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub category: String,
    pub policy: SkillPolicy,
    /// Displayed percentage, 0..=100.
    pub percent: u32,
    /// Relative score, 0.0..=1.0.
    pub grade: f64,
}

fn title_case(raw: &str) -> String {
    raw.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// `skill_web-dev` -> "Web Development", `skill_xyz-thing` -> "Xyz Thing".
pub fn normalize_skill_label(raw_kind: &str) -> String {
    let key = raw_kind.strip_prefix(SKILL_PREFIX).unwrap_or(raw_kind);
    SKILL_NAMES
        .iter()
        .find(|(abbr, _)| *abbr == key)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| title_case(key))
}

pub fn infer_category(label: &str) -> &'static str {
    let lower = label.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(_, markers)| markers.iter().any(|m| lower.contains(m)))
        .map(|(category, _)| *category)
        .unwrap_or(DEFAULT_CATEGORY)
}

struct Group {
    label: String,
    sum: i64,
    max: i64,
    occurrences: u32,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

/// Groups skill transactions by normalized label, in order of first appearance.
fn group_skills(transactions: &[Transaction]) -> Vec<Group> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();
    for tx in transactions.iter().filter(|tx| tx.kind.is_skill()) {
        let label = normalize_skill_label(tx.kind.as_str());
        match index.get(&label) {
            Some(&i) => {
                let g = &mut groups[i];
                g.sum += tx.amount;
                g.max = g.max.max(tx.amount);
                g.occurrences += 1;
                g.first_seen = g.first_seen.min(tx.created_at);
                g.last_seen = g.last_seen.max(tx.created_at);
            }
            None => {
                index.insert(label.clone(), groups.len());
                groups.push(Group {
                    label,
                    sum: tx.amount,
                    max: tx.amount,
                    occurrences: 1,
                    first_seen: tx.created_at,
                    last_seen: tx.created_at,
                });
            }
        }
    }
    groups
}

fn into_aggregate(g: Group, policy: SkillPolicy, amount: i64, percent: u32, grade: f64) -> SkillAggregate {
    SkillAggregate {
        category: infer_category(&g.label).to_string(),
        label: g.label,
        amount,
        occurrences: g.occurrences,
        first_seen: g.first_seen,
        last_seen: g.last_seen,
        policy,
        percent,
        grade,
    }
}

/// Sum policy: amount is the total per label, grade is relative to the top label.
pub fn aggregate_skills_by_sum(transactions: &[Transaction]) -> Vec<SkillAggregate> {
    let groups = group_skills(transactions);
    let top = groups.iter().map(|g| g.sum).max().unwrap_or(0);
    let mut skills: Vec<SkillAggregate> = groups
        .into_iter()
        .map(|g| {
            let grade = if top > 0 { g.sum as f64 / top as f64 } else { 0.0 };
            let percent = (grade * 100.0).round().clamp(0.0, 100.0) as u32;
            let amount = g.sum;
            into_aggregate(g, SkillPolicy::Sum, amount, percent, grade)
        })
        .collect();
    skills.sort_by(|a, b| b.amount.cmp(&a.amount));
    skills
}

/// Max policy: amount is the highest single grant, already on a 0..100 scale.
pub fn aggregate_skills_by_max(transactions: &[Transaction]) -> Vec<SkillAggregate> {
    let mut skills: Vec<SkillAggregate> = group_skills(transactions)
        .into_iter()
        .map(|g| {
            let percent = (g.max.min(100) as f64).round().max(0.0) as u32;
            let grade = percent as f64 / 100.0;
            let amount = g.max;
            into_aggregate(g, SkillPolicy::Max, amount, percent, grade)
        })
        .collect();
    skills.sort_by(|a, b| b.amount.cmp(&a.amount));
    skills
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::records::Subject;
    use chrono::TimeZone;

    fn skill(id: i64, kind: &str, amount: i64, day: u32) -> Transaction {
        let at = Utc.with_ymd_and_hms(2024, 2, day, 9, 0, 0).unwrap();
        Transaction::new(id, kind, amount, at, Subject::default())
    }

    #[test]
    fn test_normalize_known_and_unknown() {
        assert_eq!(normalize_skill_label("skill_web-dev"), "Web Development");
        assert_eq!(normalize_skill_label("skill_go"), "Go Programming");
        assert_eq!(normalize_skill_label("skill_js"), "JavaScript");
        assert_eq!(normalize_skill_label("skill_xyz-thing"), "Xyz Thing");
        assert_eq!(normalize_skill_label("skill_deep_learning"), "Deep Learning");
    }

    #[test]
    fn test_category_priority() {
        assert_eq!(infer_category("Web Development"), "Web Development");
        assert_eq!(infer_category("JavaScript"), "Web Development");
        assert_eq!(infer_category("Back-end Development"), "Backend Development");
        assert_eq!(infer_category("SQL"), "Database Management");
        assert_eq!(infer_category("TCP/IP Networking"), "Network Programming");
        // "algorithms" also contains "go"; algorithm rules come first
        assert_eq!(infer_category("Algorithms"), "Algorithm Design");
        assert_eq!(infer_category("Docker"), "DevOps");
        assert_eq!(infer_category("Go Programming"), "Programming Languages");
        assert_eq!(infer_category("Xyz Thing"), "General");
    }

    #[test]
    fn test_sum_policy() {
        let txs = vec![
            skill(1, "skill_go", 10, 1),
            skill(2, "skill_js", 30, 2),
            skill(3, "skill_go", 15, 3),
            skill(4, "xp", 999, 4),
        ];
        let skills = aggregate_skills_by_sum(&txs);
        assert_eq!(skills.len(), 2);
        assert_eq!(skills[0].label, "JavaScript");
        assert_eq!(skills[0].grade, 1.0);
        assert_eq!(skills[1].label, "Go Programming");
        assert_eq!(skills[1].amount, 25);
        assert_eq!(skills[1].occurrences, 2);
        assert!((skills[1].grade - 25.0 / 30.0).abs() < 1e-9);
        assert_eq!(skills[1].percent, 83);
        assert!(skills.iter().all(|s| s.policy == SkillPolicy::Sum));
    }

    #[test]
    fn test_max_policy() {
        let txs = vec![
            skill(1, "skill_go", 40, 1),
            skill(2, "skill_go", 55, 5),
            skill(3, "skill_prog", 140, 2),
        ];
        let skills = aggregate_skills_by_max(&txs);
        assert_eq!(skills[0].label, "Programming");
        assert_eq!(skills[0].amount, 140);
        assert_eq!(skills[0].percent, 100);
        assert_eq!(skills[0].grade, 1.0);
        let go = &skills[1];
        assert_eq!(go.amount, 55);
        assert_eq!(go.percent, 55);
        assert_eq!(go.grade, 0.55);
        assert_eq!(go.first_seen, Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap());
        assert_eq!(go.last_seen, Utc.with_ymd_and_hms(2024, 2, 5, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_ties_keep_first_appearance_order() {
        let txs = vec![skill(1, "skill_sql", 20, 1), skill(2, "skill_css", 20, 2)];
        let skills = aggregate_skills_by_max(&txs);
        assert_eq!(skills[0].label, "SQL");
        assert_eq!(skills[1].label, "CSS");
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate_skills_by_sum(&[]).is_empty());
        assert!(aggregate_skills_by_max(&[]).is_empty());
    }
}
