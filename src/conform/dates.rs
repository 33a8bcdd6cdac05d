//! Date and timestamp parsing with one fixed policy per run.
//!
//! Numeric dates such as `03/04/2024` are read strictly in the configured
//! [`DateOrder`]. A value that is not a valid date in that order is rejected, never
//! re-read in the other order.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::table::Value;

static NUMERIC_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[/.-](\d{1,2})[/.-](\d{4})(?:[ T](.+))?$").expect("numeric date pattern")
});

const ISO_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

// %B also accepts the three-letter abbreviation when parsing
const MONTH_NAME_FORMATS: &[&str] = &["%d %B %Y", "%d-%B-%Y", "%B %d, %Y", "%B %d %Y"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// How to read the first two fields of a numeric date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    /// `MM/DD/YYYY`
    #[default]
    MonthFirst,
    /// `DD/MM/YYYY`
    DayFirst,
}

impl FromStr for DateOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "month_first" | "mdy" => Ok(DateOrder::MonthFirst),
            "day_first" | "dmy" => Ok(DateOrder::DayFirst),
            other => Err(format!("unknown date order '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DateParser {
    order: DateOrder,
}

impl DateParser {
    pub fn new(order: DateOrder) -> Self {
        Self { order }
    }

    pub fn order(&self) -> DateOrder {
        self.order
    }

    fn numeric(&self, raw: &str) -> Option<(NaiveDate, Option<String>)> {
        let caps = NUMERIC_DATE.captures(raw)?;
        let first: u32 = caps[1].parse().ok()?;
        let second: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        let (month, day) = match self.order {
            DateOrder::MonthFirst => (first, second),
            DateOrder::DayFirst => (second, first),
        };
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        Some((date, caps.get(4).map(|m| m.as_str().to_string())))
    }

    fn time_of_day(raw: &str) -> Option<NaiveTime> {
        TIME_FORMATS
            .iter()
            .find_map(|f| NaiveTime::parse_from_str(raw.trim(), f).ok())
    }

    fn date_only(&self, raw: &str) -> Option<NaiveDate> {
        ISO_DATE_FORMATS
            .iter()
            .chain(MONTH_NAME_FORMATS)
            .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
            .or_else(|| match self.numeric(raw) {
                Some((date, None)) => Some(date),
                _ => None,
            })
    }

    /// Parse a calendar date. Timestamps are accepted and truncated to the date on
    /// their own wall clock, so `2024-01-05T23:30:00-05:00` is January 5.
    pub fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        self.date_only(raw)
            .or_else(|| self.parse_datetime_text(raw).map(|(local, _)| local.date()))
    }

    /// Wall-clock reading of a timestamp, plus its UTC offset when the text carries one
    fn parse_datetime_text(&self, raw: &str) -> Option<(NaiveDateTime, Option<FixedOffset>)> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some((ts.naive_local(), Some(*ts.offset())));
        }
        if let Some(ts) = ISO_DATETIME_FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        {
            return Some((ts, None));
        }
        match self.numeric(raw) {
            Some((date, Some(time))) => Self::time_of_day(&time).map(|t| (date.and_time(t), None)),
            _ => None,
        }
    }

    /// Parse a timestamp. Date-only values resolve to midnight; offsets are normalized to UTC.
    pub fn parse_timestamp(&self, raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        self.parse_datetime_text(raw)
            .map(|(local, offset)| match offset {
                Some(offset) => local - TimeDelta::seconds(i64::from(offset.local_minus_utc())),
                None => local,
            })
            .or_else(|| self.date_only(raw).map(|d| d.and_time(NaiveTime::MIN)))
    }

    pub fn date_from_value(&self, value: &Value) -> Option<NaiveDate> {
        match value {
            Value::Date(d) => Some(*d),
            Value::Timestamp(ts) => Some(ts.date()),
            Value::Utf8(s) => self.parse_date(s),
            Value::Int64(n) => NaiveDate::parse_from_str(&n.to_string(), "%Y%m%d").ok(),
            _ => None,
        }
    }

    pub fn timestamp_from_value(&self, value: &Value) -> Option<NaiveDateTime> {
        match value {
            Value::Timestamp(ts) => Some(*ts),
            Value::Date(d) => Some(d.and_time(NaiveTime::MIN)),
            Value::Utf8(s) => self.parse_timestamp(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_iso_dates() {
        let parser = DateParser::default();
        assert_eq!(parser.parse_date("2024-01-05"), Some(ymd(2024, 1, 5)));
        assert_eq!(parser.parse_date("2024/01/05"), Some(ymd(2024, 1, 5)));
        assert_eq!(parser.parse_date("2024-01-05 13:45:00"), Some(ymd(2024, 1, 5)));
        assert_eq!(parser.parse_date("2024-01-05T13:45:00.250"), Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn test_numeric_dates_follow_configured_order() {
        let mdy = DateParser::new(DateOrder::MonthFirst);
        let dmy = DateParser::new(DateOrder::DayFirst);
        assert_eq!(mdy.parse_date("03/04/2024"), Some(ymd(2024, 3, 4)));
        assert_eq!(dmy.parse_date("03/04/2024"), Some(ymd(2024, 4, 3)));
        assert_eq!(dmy.parse_date("25.12.2023"), Some(ymd(2023, 12, 25)));
    }

    #[test]
    fn test_numeric_date_invalid_in_order_is_rejected() {
        // valid only as day-first; month-first must not silently swap
        let mdy = DateParser::new(DateOrder::MonthFirst);
        assert_eq!(mdy.parse_date("25/12/2023"), None);
    }

    #[test]
    fn test_month_names() {
        let parser = DateParser::default();
        assert_eq!(parser.parse_date("05 Jan 2024"), Some(ymd(2024, 1, 5)));
        assert_eq!(parser.parse_date("5-Jan-2024"), Some(ymd(2024, 1, 5)));
        assert_eq!(parser.parse_date("January 5, 2024"), Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn test_garbage_is_none() {
        let parser = DateParser::default();
        assert_eq!(parser.parse_date("not a date"), None);
        assert_eq!(parser.parse_date(""), None);
        assert_eq!(parser.parse_date("2024-13-01"), None);
    }

    #[test]
    fn test_timestamps() {
        let parser = DateParser::default();
        let expected = ymd(2024, 2, 1).and_hms_opt(9, 30, 0).unwrap();
        assert_eq!(parser.parse_timestamp("2024-02-01 09:30:00"), Some(expected));
        assert_eq!(parser.parse_timestamp("2024-02-01T09:30"), Some(expected));
        assert_eq!(parser.parse_timestamp("2024-02-01T10:30:00+01:00"), Some(expected));
        assert_eq!(parser.parse_timestamp("02/01/2024 09:30"), Some(expected));
        assert_eq!(
            parser.parse_timestamp("2024-02-01"),
            Some(ymd(2024, 2, 1).and_hms_opt(0, 0, 0).unwrap())
        );
        assert_eq!(parser.parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_offset_dates_keep_their_own_calendar_day() {
        let parser = DateParser::default();
        assert_eq!(parser.parse_date("2024-01-05T23:30:00-05:00"), Some(ymd(2024, 1, 5)));
        assert_eq!(parser.parse_date("2024-01-06T00:30:00+05:30"), Some(ymd(2024, 1, 6)));
        // the instant itself is still stored in UTC
        assert_eq!(
            parser.parse_timestamp("2024-01-05T23:30:00-05:00"),
            Some(ymd(2024, 1, 6).and_hms_opt(4, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_values() {
        let parser = DateParser::default();
        assert_eq!(parser.date_from_value(&Value::Int64(20240105)), Some(ymd(2024, 1, 5)));
        assert_eq!(parser.date_from_value(&Value::Null), None);
        assert_eq!(
            parser.timestamp_from_value(&Value::Date(ymd(2024, 1, 5))),
            Some(ymd(2024, 1, 5).and_hms_opt(0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_date_order_from_str() {
        assert_eq!("day_first".parse::<DateOrder>(), Ok(DateOrder::DayFirst));
        assert_eq!("MONTH_FIRST".parse::<DateOrder>(), Ok(DateOrder::MonthFirst));
        assert!("ymd".parse::<DateOrder>().is_err());
    }
}
