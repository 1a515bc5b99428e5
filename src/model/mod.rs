//! View-model builder: turns the raw record bundle into display-ready aggregates.

pub mod audit;
pub mod format;
pub mod level;
pub mod records;
pub mod skills;
pub mod success;
pub mod xp;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logging::{log_level_estimate, log_profile_summary};
use audit::AuditSummary;
use level::{LevelEstimate, LevelEvidence};
use records::{Progress, Transaction, User};
use skills::SkillAggregate;
use success::SuccessSummary;
use xp::{ProjectXp, XpPoint};

const TOP_PROJECTS: usize = 5;
const RECENT_ITEMS: usize = 5;

/// Records returned by the level/rank probe queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelProbe {
    pub progress: Vec<Progress>,
    pub transactions: Vec<Transaction>,
}

/// Everything fetched for one profile load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileBundle {
    pub user: User,
    pub xp: Vec<Transaction>,
    pub audits_given: Vec<Transaction>,
    pub audits_received: Vec<Transaction>,
    pub skills: Vec<Transaction>,
    pub progress: Vec<Progress>,
    pub results: Vec<Progress>,
    /// `None` when the probe failed; the level then falls back to Beginner.
    #[serde(default)]
    pub level_probe: Option<LevelProbe>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub id: i64,
    pub login: String,
    pub display_name: String,
    pub email: Option<String>,
    pub campus: Option<String>,
    pub member_since: Option<DateTime<Utc>>,
}

impl Identity {
    fn from_user(user: &User) -> Self {
        let full = [user.first_name.as_deref(), user.last_name.as_deref()]
            .iter()
            .flatten()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<&str>>()
            .join(" ");
        Self {
            id: user.id,
            login: user.login.clone(),
            display_name: if full.is_empty() { user.login.clone() } else { full },
            email: user.email.clone(),
            campus: user.campus.clone(),
            member_since: user.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XpPanel {
    /// Sum over the filtered XP set.
    pub total: i64,
    pub project_count: usize,
    pub series: Vec<XpPoint>,
    pub top_projects: Vec<ProjectXp>,
    pub recent: Vec<ProjectXp>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeEntry {
    pub name: String,
    pub grade: f64,
    pub passed: bool,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    pub identity: Identity,
    pub xp: XpPanel,
    pub skills: Vec<SkillAggregate>,
    pub success: SuccessSummary,
    pub audits: AuditSummary,
    pub level: LevelEstimate,
    pub recent_grades: Vec<GradeEntry>,
}

fn recent_grades(results: &[Progress], limit: usize) -> Vec<GradeEntry> {
    let mut graded: Vec<&Progress> = results
        .iter()
        .filter(|r| r.subject.category == "project" && r.grade.is_some())
        .collect();
    graded.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    graded
        .into_iter()
        .take(limit)
        .map(|r| {
            let grade = r.grade.unwrap_or(0.0);
            GradeEntry {
                name: r.subject.name.clone(),
                grade,
                passed: grade >= 1.0,
                at: r.created_at,
            }
        })
        .collect()
}

pub fn estimate_level_for(bundle: &ProfileBundle) -> LevelEstimate {
    let Some(probe) = &bundle.level_probe else {
        return LevelEstimate::beginner();
    };
    let evidence = LevelEvidence {
        progress: bundle.progress.clone(),
        probe_progress: probe.progress.clone(),
        probe_transactions: probe.transactions.clone(),
        total_xp: xp::total_xp(&bundle.xp),
    };
    level::estimate_level(&evidence)
}

/// Builds the full view model. Never fails; missing data yields empty/zero sections.
pub fn build_profile(bundle: &ProfileBundle) -> ProfileView {
    let filtered = xp::filter_xp(&bundle.xp);
    let series = xp::cumulative_series(&filtered);
    let all_projects = xp::xp_by_project(&filtered, usize::MAX);

    let xp_panel = XpPanel {
        total: filtered.iter().map(|tx| tx.amount).sum(),
        project_count: all_projects.len(),
        top_projects: all_projects.into_iter().take(TOP_PROJECTS).collect(),
        recent: xp::recent_xp(&filtered, RECENT_ITEMS),
        series,
    };

    let level = estimate_level_for(bundle);
    log_level_estimate(level.level, &level.label, level.source.as_str());

    let view = ProfileView {
        identity: Identity::from_user(&bundle.user),
        skills: skills::aggregate_skills_by_max(&bundle.skills),
        success: success::success_summary(&bundle.progress),
        audits: audit::audit_summary(&bundle.audits_given, &bundle.audits_received),
        recent_grades: recent_grades(&bundle.results, RECENT_ITEMS),
        xp: xp_panel,
        level,
    };
    log_profile_summary(view.identity.id, view.xp.total, view.skills.len(), view.xp.series.len());
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use records::Subject;

    #[test]
    fn test_empty_bundle_builds() {
        let view = build_profile(&ProfileBundle::default());
        assert!(view.xp.series.is_empty());
        assert_eq!(view.xp.total, 0);
        assert!(view.skills.is_empty());
        assert_eq!(view.audits.ratio, 0.0);
        assert_eq!(view.success.total, 0);
        assert_eq!(view.level, LevelEstimate::beginner());
    }

    #[test]
    fn test_display_name_falls_back_to_login() {
        let user = User { id: 3, login: "ada".to_string(), ..Default::default() };
        assert_eq!(Identity::from_user(&user).display_name, "ada");

        let user = User {
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            ..user
        };
        assert_eq!(Identity::from_user(&user).display_name, "Ada Lovelace");
    }

    #[test]
    fn test_probe_present_uses_xp_curve() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bundle = ProfileBundle {
            xp: vec![Transaction::new(1, "xp", 50_000, at, Subject::new("quad", "exercise", "/quad"))],
            level_probe: Some(LevelProbe::default()),
            ..Default::default()
        };
        let view = build_profile(&bundle);
        // exercise XP is filtered from the panel but still counts towards the level curve
        assert_eq!(view.xp.total, 0);
        assert_eq!(view.level.level, 2);
    }

    #[test]
    fn test_recent_grades_only_projects() {
        let at = |d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
        let results = vec![
            Progress::new(1, Some(1.0), at(1), Subject::new("forum", "project", "/forum")),
            Progress::new(2, Some(0.0), at(2), Subject::new("quad", "exercise", "/quad")),
            Progress::new(3, Some(0.0), at(3), Subject::new("lem-in", "project", "/lem-in")),
        ];
        let grades = recent_grades(&results, 5);
        assert_eq!(grades.len(), 2);
        assert_eq!(grades[0].name, "lem-in");
        assert!(!grades[0].passed);
        assert!(grades[1].passed);
    }
}
