// src/date_parser.rs

use chrono::{DateTime, Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Spreadsheet error values that show up in formula columns.
static ERROR_TOKENS: &[&str] = &["#N/A", "#DIV/0!", "#VALUE!", "#REF!", "#NAME?", "N/A"];

/// Tried in order; month-first dashes win because that's how the sheet writes them.
static DATE_FORMATS: &[&str] = &[
    "%m-%d-%Y",
    "%Y-%m-%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Two-digit years, tried only after every four-digit form has failed.
static SHORT_YEAR_FORMATS: &[&str] = &[
    "%m-%d-%y",
    "%d-%m-%y",
    "%d/%m/%y",
    "%m/%d/%y",
    "%d-%b-%y",
    "%d %b %y",
];

/// `<date> HH:MM[:SS[.fff]] [AM|PM] [Z|+hh:mm]`
static TRAILING_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<date>.+?)[ T]\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?\s*(?:[AaPp][Mm])?\s*(?:Z|[+-]\d{2}:?\d{2})?$",
    )
    .expect("trailing time pattern should be valid")
});

/// Permissive parse of a fuel date cell into a calendar date.
/// Any time-of-day is dropped. Returns `None` for blanks, error tokens and
/// anything unrecognised.
pub fn parse_fuel_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim().trim_matches('"').trim();
    if s.is_empty() || ERROR_TOKENS.iter().any(|t| t.eq_ignore_ascii_case(s)) {
        return None;
    }

    if let Some(d) = parse_date_only(s) {
        return Some(d);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local().date());
    }

    TRAILING_TIME
        .captures(s)
        .and_then(|caps| caps.name("date"))
        .and_then(|m| parse_date_only(m.as_str().trim()))
}

fn parse_date_only(s: &str) -> Option<NaiveDate> {
    // chrono's %Y takes any width, so "12-15-25" would read as year 25
    DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .find(|d| (1000..=9999).contains(&d.year()))
        .or_else(|| {
            SHORT_YEAR_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sheet_formats() {
        assert_eq!(parse_fuel_date("12-15-2025"), Some(ymd(2025, 12, 15)));
        assert_eq!(parse_fuel_date("2025-12-15"), Some(ymd(2025, 12, 15)));
        assert_eq!(parse_fuel_date("15-12-2025"), Some(ymd(2025, 12, 15)));
        assert_eq!(parse_fuel_date("15/12/2025"), Some(ymd(2025, 12, 15)));
        assert_eq!(parse_fuel_date("12/15/2025"), Some(ymd(2025, 12, 15)));
        assert_eq!(parse_fuel_date("15-Dec-2025"), Some(ymd(2025, 12, 15)));
        assert_eq!(parse_fuel_date("15 Dec 2025"), Some(ymd(2025, 12, 15)));
        assert_eq!(parse_fuel_date("December 15, 2025"), Some(ymd(2025, 12, 15)));
    }

    #[test]
    fn two_digit_years_are_this_century() {
        assert_eq!(parse_fuel_date("12-15-25"), Some(ymd(2025, 12, 15)));
        assert_eq!(parse_fuel_date("15/12/25"), Some(ymd(2025, 12, 15)));
        assert_eq!(parse_fuel_date("15-Dec-25"), Some(ymd(2025, 12, 15)));
        assert_eq!(parse_fuel_date("12-15-25 08:00"), Some(ymd(2025, 12, 15)));
    }

    #[test]
    fn month_first_wins_when_ambiguous() {
        assert_eq!(parse_fuel_date("03-04-2025"), Some(ymd(2025, 3, 4)));
    }

    #[test]
    fn time_of_day_is_discarded() {
        assert_eq!(parse_fuel_date("2025-12-15 23:59"), Some(ymd(2025, 12, 15)));
        assert_eq!(parse_fuel_date("2025/12/15 00:05:00"), Some(ymd(2025, 12, 15)));
        assert_eq!(parse_fuel_date("2025-12-15T08:30:00Z"), Some(ymd(2025, 12, 15)));
        assert_eq!(
            parse_fuel_date("2025-12-15T23:30:00-05:00"),
            Some(ymd(2025, 12, 15))
        );
        assert_eq!(parse_fuel_date("12/15/2025 7:45 PM"), Some(ymd(2025, 12, 15)));
    }

    #[test]
    fn junk_is_none() {
        for s in ["", "   ", "#N/A", "#value!", "N/A", "soon", "2025-13-40", "\"\""] {
            assert_eq!(parse_fuel_date(s), None, "{s:?}");
        }
    }

    #[test]
    fn surrounding_whitespace_and_quotes() {
        assert_eq!(parse_fuel_date("  \"2025-01-02\" "), Some(ymd(2025, 1, 2)));
    }
}
