use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

// WIB
const WIB_OFFSET_SECS: i32 = 7 * 3600;

pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

// Month-first before day-first: Google Forms exports US-style timestamps, and an ambiguous
// "02/03/2024" is read as February 3rd. Day-first only applies when month-first is invalid.
const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
];

const TIME_FORMATS: [&str; 3] = ["%H:%M:%S", "%H:%M", "%H:%M:%S%.f"];

pub fn parse_date_lenient(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    let (date_part, time_part) = match s.find([' ', 'T']) {
        Some(idx) => (&s[..idx], Some(s[idx + 1..].trim())),
        None => (s, None),
    };

    if let Some(time_part) = time_part {
        let valid_time = TIME_FORMATS
            .iter()
            .any(|fmt| NaiveTime::parse_from_str(time_part, fmt).is_ok());
        if !valid_time {
            return None;
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(CANONICAL_DATE_FORMAT).to_string()
}

pub fn parse_canonical_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), CANONICAL_DATE_FORMAT)
        .with_context(|| format!("invalid date {s:?} (expected YYYY-MM-DD)"))
}

pub fn today_wib(now_utc: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    let wib = chrono::FixedOffset::east_opt(WIB_OFFSET_SECS).context("invalid WIB offset")?;
    Ok(now_utc.with_timezone(&wib).date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_iso_dates_and_datetimes() {
        assert_eq!(parse_date_lenient("2024-01-01"), Some(d(2024, 1, 1)));
        assert_eq!(parse_date_lenient(" 2024-01-01 10:30:00 "), Some(d(2024, 1, 1)));
        assert_eq!(parse_date_lenient("2024-01-01T10:30:00"), Some(d(2024, 1, 1)));
        assert_eq!(
            parse_date_lenient("2024-01-01T23:30:00+07:00"),
            Some(d(2024, 1, 1))
        );
    }

    #[test]
    fn parses_google_forms_timestamps_month_first() {
        assert_eq!(parse_date_lenient("1/15/2024 10:23:45"), Some(d(2024, 1, 15)));
        assert_eq!(parse_date_lenient("02/03/2024"), Some(d(2024, 2, 3)));
    }

    #[test]
    fn falls_back_to_day_first_when_month_first_is_invalid() {
        assert_eq!(parse_date_lenient("15/01/2024"), Some(d(2024, 1, 15)));
        assert_eq!(parse_date_lenient("31-12-2023"), Some(d(2023, 12, 31)));
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_date_lenient(""), None);
        assert_eq!(parse_date_lenient("kemarin"), None);
        assert_eq!(parse_date_lenient("2024-13-45"), None);
        assert_eq!(parse_date_lenient("2024-01-01 soon"), None);
    }

    #[test]
    fn canonical_format_round_trips() {
        let date = d(2024, 3, 9);
        assert_eq!(format_date(date), "2024-03-09");
        assert_eq!(parse_canonical_date("2024-03-09").unwrap(), date);
        assert!(parse_canonical_date("09/03/2024").is_err());
    }

    #[test]
    fn today_uses_wib_offset() {
        // 2024-01-01 18:00 UTC = 2024-01-02 01:00 WIB
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 18, 0, 0).unwrap();
        assert_eq!(today_wib(now).unwrap(), d(2024, 1, 2));

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(today_wib(now).unwrap(), d(2024, 1, 1));
    }
}
