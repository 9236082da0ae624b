// Utility helpers for lenient parsing, dates and number formatting.
//
// API payloads are loosely typed (numbers arrive as strings, dates as full
// timestamps), so everything that turns them into typed values lives here
// and degrades to `None` instead of failing.
use chrono::{DateTime, Datelike, NaiveDate};
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in form input (commas, spaces, text).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed, including NaN.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    // Dates come either as `YYYY-MM-DD` or as a full RFC 3339 timestamp.
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

/// Whole years elapsed between `dob` and `today`, counting the current year
/// only once the birthday has been reached. A birth date in the future
/// yields `None`.
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> Option<u32> {
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

/// Trimmed, lower-cased key used for every case-insensitive comparison.
pub fn fold_case(s: &str) -> String {
    s.trim().to_lowercase()
}

/// `Some` only for strings that still have content after trimming.
pub fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Render a number without a trailing `.0` when it is integral (`6` not `6.0`).
pub fn display_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_f64_safe() {
        assert_eq!(parse_f64_safe(Some("6")), Some(6.0));
        assert_eq!(parse_f64_safe(Some(" 12.5 ")), Some(12.5));
        assert_eq!(parse_f64_safe(Some("1,200,000")), Some(1_200_000.0));
        assert_eq!(parse_f64_safe(Some("6 LPA")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn test_parse_date_safe() {
        assert_eq!(parse_date_safe(Some("2002-03-15")), Some(date(2002, 3, 15)));
        assert_eq!(
            parse_date_safe(Some("2002-03-15T00:00:00.000Z")),
            Some(date(2002, 3, 15))
        );
        assert_eq!(parse_date_safe(Some("15/03/2002")), None);
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        let dob = date(2000, 6, 15);
        assert_eq!(age_on(dob, date(2024, 6, 14)), Some(23));
        assert_eq!(age_on(dob, date(2024, 6, 15)), Some(24));
        assert_eq!(age_on(dob, date(2024, 12, 1)), Some(24));
        assert_eq!(age_on(dob, date(1999, 1, 1)), None);
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-12.5, 1), "-12.5");
        assert_eq!(format_int(9855), "9,855");
        assert_eq!(display_number(6.0), "6");
        assert_eq!(display_number(4.5), "4.5");
    }
}
