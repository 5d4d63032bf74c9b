use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

/// Shown wherever a value is missing
pub const EMPTY_CELL: &str = "—";

const TOKYO_UTC_OFFSET_SECS: i32 = 9 * 60 * 60;

/// Sign of a day-over-day change, used for styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDirection {
    Positive,
    Negative,
    Neutral,
}

/// `1234.56789` -> `1,234.5679`
pub fn format_rate(rate: f64) -> String {
    if !rate.is_finite() {
        return EMPTY_CELL.to_string();
    }

    let formatted = format!("{:.4}", rate.abs());
    let (integer, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), ""));

    let mut grouped = String::with_capacity(formatted.len() + integer.len() / 3 + 1);
    if rate.is_sign_negative() && formatted.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        grouped.push('-');
    }
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped.push('.');
    grouped.push_str(fraction);
    grouped
}

/// `0.0025` -> `+0.25%`, `-0.01` -> `-1.00%`
pub fn format_change(change: Option<f64>) -> String {
    match change {
        Some(value) if value.is_finite() => {
            let formatted = format!("{:.2}%", value * 100.0);
            if value > 0.0 {
                format!("+{}", formatted)
            } else {
                formatted
            }
        }
        _ => EMPTY_CELL.to_string(),
    }
}

pub fn change_direction(change: Option<f64>) -> ChangeDirection {
    match change {
        Some(value) if value.is_finite() && value > 0.0 => ChangeDirection::Positive,
        Some(value) if value.is_finite() && value < 0.0 => ChangeDirection::Negative,
        _ => ChangeDirection::Neutral,
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y/%m/%d").to_string()
}

/// Rendered in Tokyo time, e.g. `2024/03/01 9:05`
pub fn format_date_time(timestamp: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(TOKYO_UTC_OFFSET_SECS) {
        Some(tokyo) => timestamp
            .with_timezone(&tokyo)
            .format("%Y/%m/%d %-H:%M")
            .to_string(),
        None => timestamp.format("%Y/%m/%d %-H:%M UTC").to_string(),
    }
}
