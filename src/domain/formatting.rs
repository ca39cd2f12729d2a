use crate::domain::models::parse_time_of_day;
use chrono::{NaiveDate, NaiveDateTime};

/// `"14:30"` or `"14:30:00"` to `"2:30 PM"`.
pub fn format_time(value: &str) -> Option<String> {
    let (hour, minute) = parse_time_of_day(value)?;
    let suffix = if hour >= 12 { "PM" } else { "AM" };
    let display_hour = match hour % 12 {
        0 => 12,
        other => other,
    };
    Some(format!("{display_hour}:{minute:02} {suffix}"))
}

pub fn format_optional_time(value: Option<&str>) -> Option<String> {
    value.and_then(format_time)
}

/// "Monday, March 4"
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d").to_string()
}

/// "Mar 4"
pub fn format_short_date(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

/// "Mon, Mar 4, 2024"
pub fn format_full_date(date: NaiveDate) -> String {
    date.format("%a, %b %-d, %Y").to_string()
}

/// "March 4, 2024"
pub fn format_dialog_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// "March 2024"
pub fn format_month_year(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

/// Time and date halves of the header clock.
pub fn format_clock(now: NaiveDateTime) -> (String, String) {
    (
        now.format("%I:%M %p").to_string(),
        now.format("%A, %B %-d, %Y").to_string(),
    )
}

/// Parses a `YYYY-MM` month key into the first day of that month.
pub fn parse_month(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d").ok()
}

/// Joins a date label and an optional time with the bullet separator used across list rows.
pub fn date_time_label(date_label: String, time: Option<&str>) -> String {
    match format_optional_time(time) {
        Some(time) => format!("{date_label} • {time}"),
        None => date_label,
    }
}
