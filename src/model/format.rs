//! Display formatting shared by the view model and the renderer.

use chrono::{DateTime, Utc};

/// XP amounts are shown the way the platform shows them: as byte sizes, base 1000.
pub fn format_xp(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs() as f64;
    if abs < 1_000.0 {
        format!("{}{} B", sign, amount.unsigned_abs())
    } else if abs < 1_000_000.0 {
        format!("{}{:.2} kB", sign, abs / 1_000.0)
    } else {
        format!("{}{:.2} MB", sign, abs / 1_000_000.0)
    }
}

/// Thousands separators: 1234567 -> "1,234,567".
pub fn format_number(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn format_date(at: &DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

pub fn format_ratio(ratio: f64) -> String {
    format!("{:.1}", ratio)
}
