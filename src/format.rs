//! Display formatting for metric values, KPIs and deltas.

use serde::{Deserialize, Serialize};

/// Text shown wherever a value is undefined (empty group, zero denominator).
pub const PLACEHOLDER: &str = "N/A";

/// Fixed-point number template: optional prefix, decimals, thousands grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFormat {
    #[serde(default)]
    pub prefix: String,
    pub decimals: usize,
    #[serde(default)]
    pub thousands: bool,
}

impl NumberFormat {
    pub fn new(prefix: &str, decimals: usize, thousands: bool) -> Self {
        Self {
            prefix: prefix.to_string(),
            decimals,
            thousands,
        }
    }

    /// `{:,.0f}`
    pub fn count() -> Self {
        Self::new("", 0, true)
    }

    /// `${:,.0f}`
    pub fn dollars() -> Self {
        Self::new("$", 0, true)
    }

    pub fn format(&self, value: Option<f64>) -> String {
        match value {
            Some(v) if v.is_finite() => {
                format!(
                    "{}{}",
                    self.prefix,
                    fixed_point(v, self.decimals, self.thousands)
                )
            }
            _ => PLACEHOLDER.to_string(),
        }
    }
}

/// Percentage with one decimal, e.g. `0.1234` -> `12.3%`.
pub fn percent(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.1}%", v * 100.0),
        _ => PLACEHOLDER.to_string(),
    }
}

fn fixed_point(value: f64, decimals: usize, thousands: bool) -> String {
    let raw = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (raw.as_str(), None),
    };

    let mut out = String::with_capacity(raw.len() + raw.len() / 3 + 1);
    // "-0" is not a thing people want to read
    if value < 0.0 && raw.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    if thousands {
        out.push_str(&group_thousands(int_part));
    } else {
        out.push_str(int_part);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
