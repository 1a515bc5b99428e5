//! Minimal SVG geometry: one cumulative line chart and one pie chart.

use std::f64::consts::PI;
use std::fmt::Write as _;

use crate::model::format::{format_date, format_xp};
use crate::model::xp::XpPoint;

use super::escape;

const PAD: f64 = 40.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub label: String,
    pub value: f64,
    pub color: &'static str,
}

fn no_data(width: u32, height: u32) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" class="chart empty"><text x="{x}" y="{y}" text-anchor="middle">No data</text></svg>"#,
        w = width,
        h = height,
        x = width as f64 / 2.0,
        y = height as f64 / 2.0,
    )
}

/// Maps series points into the drawable area; x by time, y by running total.
pub fn line_coordinates(points: &[XpPoint], width: u32, height: u32) -> Vec<(f64, f64)> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Vec::new();
    };
    let inner_w = (width as f64 - 2.0 * PAD).max(1.0);
    let inner_h = (height as f64 - 2.0 * PAD).max(1.0);
    let t0 = first.at.timestamp() as f64;
    let span = (last.at.timestamp() as f64 - t0).max(0.0);
    let max_y = points.iter().map(|p| p.running_total).max().unwrap_or(0).max(0) as f64;
    let min_y = points.iter().map(|p| p.running_total).min().unwrap_or(0).min(0) as f64;
    let range_y = (max_y - min_y).max(1.0);

    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let fx = if span > 0.0 {
                (p.at.timestamp() as f64 - t0) / span
            } else if points.len() > 1 {
                i as f64 / (points.len() - 1) as f64
            } else {
                0.5
            };
            let fy = (p.running_total as f64 - min_y) / range_y;
            (PAD + fx * inner_w, PAD + (1.0 - fy) * inner_h)
        })
        .collect()
}

pub fn line_chart(points: &[XpPoint], width: u32, height: u32) -> String {
    if points.is_empty() {
        return no_data(width, height);
    }
    let coords = line_coordinates(points, width, height);
    let path = coords
        .iter()
        .map(|(x, y)| format!("{:.1},{:.1}", x, y))
        .collect::<Vec<String>>()
        .join(" ");

    let bottom = height as f64 - PAD;
    let right = width as f64 - PAD;
    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" class="chart line">"#,
        w = width,
        h = height
    );
    let _ = write!(
        svg,
        r#"<line x1="{p}" y1="{b}" x2="{r}" y2="{b}" class="axis"/><line x1="{p}" y1="{p}" x2="{p}" y2="{b}" class="axis"/>"#,
        p = PAD,
        b = bottom,
        r = right
    );
    let _ = write!(svg, r##"<polyline fill="none" stroke="#4f46e5" stroke-width="2" points="{}"/>"##, path);
    for ((x, y), p) in coords.iter().zip(points) {
        let _ = write!(
            svg,
            r##"<circle cx="{:.1}" cy="{:.1}" r="2.5" fill="#4f46e5"><title>{} · {}</title></circle>"##,
            x,
            y,
            escape(&format_date(&p.at)),
            escape(&format_xp(p.running_total))
        );
    }
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        let _ = write!(
            svg,
            r#"<text x="{p}" y="{ty}" class="label">{start}</text><text x="{r}" y="{ty}" text-anchor="end" class="label">{end}</text><text x="{p}" y="{top}" class="label">{total}</text>"#,
            p = PAD,
            r = right,
            ty = bottom + 16.0,
            top = PAD - 8.0,
            start = escape(&format_date(&first.at)),
            end = escape(&format_date(&last.at)),
            total = escape(&format_xp(last.running_total)),
        );
    }
    svg.push_str("</svg>");
    svg
}

/// Slice angles in radians, clockwise from 12 o'clock. Non-positive values get no share.
pub fn pie_angles(slices: &[Slice]) -> Vec<(f64, f64)> {
    let total: f64 = slices.iter().map(|s| s.value.max(0.0)).sum();
    let mut start = 0.0;
    slices
        .iter()
        .map(|s| {
            let sweep = if total > 0.0 { s.value.max(0.0) / total * 2.0 * PI } else { 0.0 };
            let angles = (start, start + sweep);
            start += sweep;
            angles
        })
        .collect()
}

fn point_on_circle(cx: f64, cy: f64, r: f64, angle: f64) -> (f64, f64) {
    (cx + r * angle.sin(), cy - r * angle.cos())
}

pub fn pie_chart(slices: &[Slice], size: u32) -> String {
    let total: f64 = slices.iter().map(|s| s.value.max(0.0)).sum();
    if total <= 0.0 {
        return no_data(size, size);
    }
    let c = size as f64 / 2.0;
    let r = c - 10.0;
    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{s}" height="{s}" viewBox="0 0 {s} {s}" class="chart pie">"#,
        s = size
    );
    for (slice, (a0, a1)) in slices.iter().zip(pie_angles(slices)) {
        let sweep = a1 - a0;
        if sweep <= 0.0 {
            continue;
        }
        let title = format!("{}: {:.1}%", slice.label, sweep / (2.0 * PI) * 100.0);
        if sweep >= 2.0 * PI - 1e-9 {
            // a single arc cannot draw a full circle
            let _ = write!(
                svg,
                r#"<circle cx="{c}" cy="{c}" r="{r}" fill="{f}"><title>{t}</title></circle>"#,
                c = c,
                r = r,
                f = slice.color,
                t = escape(&title)
            );
            continue;
        }
        let (x0, y0) = point_on_circle(c, c, r, a0);
        let (x1, y1) = point_on_circle(c, c, r, a1);
        let large = if sweep > PI { 1 } else { 0 };
        let _ = write!(
            svg,
            r#"<path d="M{c:.1},{c:.1} L{x0:.1},{y0:.1} A{r:.1},{r:.1} 0 {large} 1 {x1:.1},{y1:.1} Z" fill="{f}"><title>{t}</title></path>"#,
            c = c,
            x0 = x0,
            y0 = y0,
            r = r,
            large = large,
            x1 = x1,
            y1 = y1,
            f = slice.color,
            t = escape(&title)
        );
    }
    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn point(day: u32, total: i64) -> XpPoint {
        XpPoint {
            at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            running_total: total,
        }
    }

    #[test]
    fn test_empty_series_renders_placeholder() {
        let svg = line_chart(&[], 600, 300);
        assert!(svg.contains("No data"));
        assert!(!svg.contains("polyline"));
    }

    #[test]
    fn test_line_coordinates_span_the_plot() {
        let pts = vec![point(1, 0), point(11, 500), point(21, 1000)];
        let coords = line_coordinates(&pts, 600, 300);
        assert_eq!(coords.len(), 3);
        assert!((coords[0].0 - PAD).abs() < 1e-9);
        assert!((coords[2].0 - (600.0 - PAD)).abs() < 1e-9);
        // higher totals are drawn higher up
        assert!(coords[2].1 < coords[1].1 && coords[1].1 < coords[0].1);
        assert!((coords[2].1 - PAD).abs() < 1e-9);
    }

    #[test]
    fn test_single_point_is_centered() {
        let coords = line_coordinates(&[point(1, 10)], 200, 200);
        assert!((coords[0].0 - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_pie_angles_sum_to_full_turn() {
        let slices = vec![
            Slice { label: "Passed".into(), value: 3.0, color: "#16a34a" },
            Slice { label: "Failed".into(), value: 1.0, color: "#dc2626" },
        ];
        let angles = pie_angles(&slices);
        assert!((angles[0].1 - 1.5 * PI).abs() < 1e-9);
        assert!((angles[1].1 - 2.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn test_pie_full_slice_and_empty() {
        let full = vec![
            Slice { label: "Given".into(), value: 10.0, color: "#000" },
            Slice { label: "Received".into(), value: 0.0, color: "#fff" },
        ];
        let svg = pie_chart(&full, 200);
        assert!(svg.contains("<circle"));
        assert!(!svg.contains("<path"));

        let empty = vec![Slice { label: "x".into(), value: 0.0, color: "#000" }];
        assert!(pie_chart(&empty, 200).contains("No data"));
    }

    #[test]
    fn test_pie_large_arc_flag() {
        let slices = vec![
            Slice { label: "a".into(), value: 3.0, color: "#111" },
            Slice { label: "b".into(), value: 1.0, color: "#222" },
        ];
        let svg = pie_chart(&slices, 200);
        assert!(svg.contains(" 0 1 1 "));
        assert!(svg.contains(" 0 0 1 "));
    }
}
