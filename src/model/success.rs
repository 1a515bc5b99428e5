use serde::Serialize;

use super::records::Progress;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SuccessSummary {
    pub passed: u32,
    pub failed: u32,
    pub total: u32,
    pub rate: f64,
}

fn counts_toward_success(p: &Progress) -> bool {
    p.subject.category == "project" && !p.subject.path.contains("piscine")
}

/// Pass/fail over graded projects outside the piscines. Ungraded rows are not counted.
pub fn success_summary(progress: &[Progress]) -> SuccessSummary {
    let grades: Vec<f64> = progress
        .iter()
        .filter(|p| counts_toward_success(p))
        .filter_map(|p| p.grade)
        .collect();

    let total = grades.len() as u32;
    let passed = grades.iter().filter(|g| **g >= 1.0).count() as u32;
    let failed = grades.iter().filter(|g| **g == 0.0).count() as u32;
    let rate = if total > 0 {
        passed as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    SuccessSummary { passed, failed, total, rate }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::records::Subject;
    use chrono::{TimeZone, Utc};

    fn p(grade: Option<f64>, category: &str, path: &str) -> Progress {
        Progress::new(1, grade, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), Subject::new("x", category, path))
    }

    #[test]
    fn test_piscine_path_excluded() {
        let rows = vec![
            p(Some(1.0), "project", "/london/div-01/forum"),
            p(Some(0.0), "project", "/london/div-01/ascii-art"),
            p(Some(1.0), "project", "/london/piscine-js/quest-01"),
        ];
        let s = success_summary(&rows);
        assert_eq!(s, SuccessSummary { passed: 1, failed: 1, total: 2, rate: 50.0 });
    }

    #[test]
    fn test_other_categories_and_ungraded_ignored() {
        let rows = vec![
            p(Some(1.0), "exercise", "/london/div-01/quad"),
            p(None, "project", "/london/div-01/forum"),
            p(Some(1.4), "project", "/london/div-01/lem-in"),
        ];
        let s = success_summary(&rows);
        assert_eq!(s.total, 1);
        assert_eq!(s.passed, 1);
        assert_eq!(s.rate, 100.0);
    }

    #[test]
    fn test_empty() {
        assert_eq!(success_summary(&[]).rate, 0.0);
    }
}
