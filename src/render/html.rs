use std::fmt::Write as _;

use crate::config::PieChartKind;
use crate::logging::{log, obj, v_num, v_str, Domain, Level};
use crate::model::format::{format_date, format_number, format_percent, format_ratio, format_xp};
use crate::model::ProfileView;

use super::escape;
use super::svg::{line_chart, pie_chart, Slice};

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0;background:#f5f5f7;color:#1f2937}\
header{background:#111827;color:#fff;padding:1rem 2rem;display:flex;justify-content:space-between}\
main{display:grid;grid-template-columns:repeat(auto-fit,minmax(320px,1fr));gap:1rem;padding:1rem 2rem}\
section{background:#fff;border-radius:8px;padding:1rem 1.25rem;box-shadow:0 1px 2px rgba(0,0,0,.08)}\
h2{font-size:1.05rem;margin-top:0}dl{display:grid;grid-template-columns:auto 1fr;gap:.25rem 1rem}\
dt{color:#6b7280}.bar{background:#e5e7eb;border-radius:4px;height:8px}.bar>span{display:block;height:8px;border-radius:4px;background:#4f46e5}\
.pass{color:#16a34a}.fail{color:#dc2626}.chart .axis{stroke:#9ca3af}.chart .label{font-size:11px;fill:#6b7280}\
table{width:100%;border-collapse:collapse}td{padding:.2rem 0}td.num{text-align:right}";

const LINE_W: u32 = 640;
const LINE_H: u32 = 300;
const PIE_SIZE: u32 = 240;
const SKILLS_SHOWN: usize = 10;

fn dl_row(out: &mut String, label: &str, value: &str) {
    let _ = write!(out, "<dt>{}</dt><dd>{}</dd>", escape(label), escape(value));
}

fn identity_panel(out: &mut String, view: &ProfileView) {
    let id = &view.identity;
    out.push_str("<section id=\"identity\"><h2>Identity</h2><dl>");
    dl_row(out, "Name", &id.display_name);
    dl_row(out, "Login", &id.login);
    if let Some(email) = &id.email {
        dl_row(out, "Email", email);
    }
    if let Some(campus) = &id.campus {
        dl_row(out, "Campus", campus);
    }
    if let Some(since) = &id.member_since {
        dl_row(out, "Member since", &format_date(since));
    }
    dl_row(out, "Level", &format!("{} ({})", view.level.level, view.level.label));
    out.push_str("</dl></section>");
}

fn xp_panel(out: &mut String, view: &ProfileView) {
    let xp = &view.xp;
    out.push_str("<section id=\"xp\"><h2>XP</h2><dl>");
    dl_row(out, "Total XP", &format_xp(xp.total));
    dl_row(out, "Projects", &format_number(xp.project_count as i64));
    dl_row(out, "Audits done", &format_xp(view.audits.given));
    dl_row(out, "Audits received", &format_xp(view.audits.received));
    dl_row(out, "Audit ratio", &format_ratio(view.audits.ratio));
    out.push_str("</dl>");

    if xp.top_projects.is_empty() {
        out.push_str("<p>No XP earned yet.</p>");
    } else {
        out.push_str("<h3>Top projects</h3><table>");
        for p in &xp.top_projects {
            let _ = write!(
                out,
                "<tr><td>{}</td><td class=\"num\">{}</td></tr>",
                escape(&p.name),
                escape(&format_xp(p.amount))
            );
        }
        out.push_str("</table><h3>Recent</h3><table>");
        for p in &xp.recent {
            let _ = write!(
                out,
                "<tr><td>{}</td><td>{}</td><td class=\"num\">{}</td></tr>",
                escape(&p.name),
                escape(&format_date(&p.at)),
                escape(&format_xp(p.amount))
            );
        }
        out.push_str("</table>");
    }
    out.push_str("</section>");
}

fn skills_panel(out: &mut String, view: &ProfileView) {
    out.push_str("<section id=\"skills\"><h2>Skills &amp; grades</h2>");
    if view.skills.is_empty() {
        out.push_str("<p>No skills recorded yet.</p>");
    } else {
        out.push_str("<table>");
        for s in view.skills.iter().take(SKILLS_SHOWN) {
            let _ = write!(
                out,
                "<tr><td title=\"{cat}\">{label}</td><td class=\"num\">{pct}%</td></tr>\
                 <tr><td colspan=\"2\"><div class=\"bar\"><span style=\"width:{pct}%\"></span></div></td></tr>",
                cat = escape(&s.category),
                label = escape(&s.label),
                pct = s.percent,
            );
        }
        out.push_str("</table>");
    }

    let success = &view.success;
    out.push_str("<dl>");
    dl_row(out, "Projects passed", &success.passed.to_string());
    dl_row(out, "Projects failed", &success.failed.to_string());
    dl_row(out, "Success rate", &format_percent(success.rate));
    out.push_str("</dl>");

    if !view.recent_grades.is_empty() {
        out.push_str("<h3>Latest results</h3><table>");
        for g in &view.recent_grades {
            let _ = write!(
                out,
                "<tr><td>{}</td><td>{}</td><td class=\"num {}\">{:.2}</td></tr>",
                escape(&g.name),
                escape(&format_date(&g.at)),
                if g.passed { "pass" } else { "fail" },
                g.grade
            );
        }
        out.push_str("</table>");
    }
    out.push_str("</section>");
}

pub fn pie_slices(view: &ProfileView, kind: PieChartKind) -> Vec<Slice> {
    match kind {
        PieChartKind::Grades => vec![
            Slice { label: "Passed".to_string(), value: view.success.passed as f64, color: "#16a34a" },
            Slice { label: "Failed".to_string(), value: view.success.failed as f64, color: "#dc2626" },
        ],
        PieChartKind::Audits => vec![
            Slice { label: "Given".to_string(), value: view.audits.given as f64, color: "#4f46e5" },
            Slice { label: "Received".to_string(), value: view.audits.received as f64, color: "#f59e0b" },
        ],
    }
}

fn charts(out: &mut String, view: &ProfileView, kind: PieChartKind) {
    out.push_str("<section id=\"xp-chart\"><h2>XP over time</h2>");
    out.push_str(&line_chart(&view.xp.series, LINE_W, LINE_H));
    out.push_str("</section>");

    let title = match kind {
        PieChartKind::Grades => "Pass / fail",
        PieChartKind::Audits => "Audits given / received",
    };
    let _ = write!(out, "<section id=\"pie-chart\"><h2>{}</h2>", title);
    out.push_str(&pie_chart(&pie_slices(view, kind), PIE_SIZE));
    out.push_str("</section>");
}

/// The full page: three panels and two charts.
pub fn render_dashboard(view: &ProfileView, kind: PieChartKind) -> String {
    let mut out = String::with_capacity(16 * 1024);
    let _ = write!(
        out,
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>{name} · profile</title><style>{style}</style></head><body>\
         <header><strong>{name}</strong><span>Level {level} · {label}</span></header><main>",
        name = escape(&view.identity.display_name),
        style = STYLE,
        level = view.level.level,
        label = escape(&view.level.label),
    );
    identity_panel(&mut out, view);
    xp_panel(&mut out, view);
    skills_panel(&mut out, view);
    charts(&mut out, view, kind);
    out.push_str("</main></body></html>\n");
    log(
        Level::Debug,
        Domain::Render,
        "dashboard_rendered",
        obj(&[("pie", v_str(kind.as_str())), ("bytes", v_num(out.len() as f64))]),
    );
    out
}
