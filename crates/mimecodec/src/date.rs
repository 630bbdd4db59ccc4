//! RFC 822 date parsing and RFC 1123 date formatting.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::error::{Error, Result};

/// Formats a timestamp as `Sun, 06 Nov 1994 08:49:37 GMT`.
#[must_use]
pub fn format_date(value: &DateTime<Utc>) -> String {
    value.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parses an RFC 822 date into UTC.
///
/// Accepts an optional weekday, numeric or named months, two-digit years,
/// optional seconds, numeric `+hhmm` zones and the classic named zones.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] describing the first offending part.
pub fn parse_date(text: &str) -> Result<DateTime<Utc>> {
    parse_parts(text.trim()).map_err(|reason| Error::malformed(format!("bad date format '{text}', {reason}")))
}

fn parse_parts(text: &str) -> std::result::Result<DateTime<Utc>, &'static str> {
    let mut rest = text;

    if let Some(comma) = rest.find(',') {
        if comma > 3 {
            return Err("invalid day name.");
        }
        rest = rest[comma + 1..].trim_start();
    }

    let mut parts = rest.split_whitespace();
    let mut next = |what| parts.next().ok_or(what);

    let day: u32 = next("missing day.")?.parse().map_err(|_| "invalid day.")?;
    let month = parse_month(next("missing month.")?)?;
    let year = parse_year(next("missing year.")?)?;
    let time = next("missing time.")?;
    let zone = next("missing zone.")?;

    let mut clock = time.split(':');
    let mut field = |what| -> std::result::Result<u32, &'static str> {
        clock.next().ok_or(what)?.parse().map_err(|_| what)
    };
    let hour = field("invalid hour.")?;
    let minute = field("invalid minute.")?;
    let second = match clock.next() {
        Some(s) => s.parse().map_err(|_| "invalid second.")?,
        None => 0,
    };

    let local = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or("date out of range.")?;

    let offset = zone_offset_minutes(zone)?;
    let utc = local
        .checked_sub_signed(Duration::minutes(i64::from(offset)))
        .ok_or("date out of range.")?;

    Ok(utc.and_utc())
}

fn parse_month(text: &str) -> std::result::Result<u32, &'static str> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];

    MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(text))
        .and_then(|i| u32::try_from(i + 1).ok())
        .map_or_else(|| text.parse().map_err(|_| "invalid month."), Ok)
}

fn parse_year(text: &str) -> std::result::Result<i32, &'static str> {
    let year: i32 = text.parse().map_err(|_| "invalid year.")?;
    Ok(match year {
        71..=99 => 1900 + year,
        0..=70 => 2000 + year,
        _ => year,
    })
}

/// Returns the zone's offset from UTC in minutes (east positive).
fn zone_offset_minutes(zone: &str) -> std::result::Result<i32, &'static str> {
    if let Some(digits) = zone.strip_prefix(['+', '-']) {
        if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err("invalid zone.");
        }
        let hours: i32 = digits[..2].parse().map_err(|_| "invalid zone.")?;
        let minutes: i32 = digits[2..].parse().map_err(|_| "invalid zone.")?;
        let offset = hours * 60 + minutes;
        return Ok(if zone.starts_with('-') { -offset } else { offset });
    }

    let hours = match zone {
        "UT" | "GMT" | "(UTC)" | "Z" => 0,
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        "A" => -1,
        "M" => -12,
        "N" => 1,
        "Y" => 12,
        _ => return Err("unknown timezone."),
    };
    Ok(hours * 60)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_parse_rfc1123() {
        let date = parse_date("Sun, 06 Nov 1994 08:49:37 GMT").unwrap();
        assert_eq!(date, utc(1994, 11, 6, 8, 49, 37));
    }

    #[test]
    fn test_parse_without_weekday_or_seconds() {
        let date = parse_date("6 Nov 1994 08:49 UT").unwrap();
        assert_eq!(date, utc(1994, 11, 6, 8, 49, 0));
    }

    #[test]
    fn test_parse_numeric_zone() {
        let date = parse_date("Tue, 1 Jul 2003 10:52:37 +0200").unwrap();
        assert_eq!(date, utc(2003, 7, 1, 8, 52, 37));

        let date = parse_date("Tue, 1 Jul 2003 10:52:37 -0130").unwrap();
        assert_eq!(date, utc(2003, 7, 1, 12, 22, 37));
    }

    #[test]
    fn test_parse_named_zone() {
        let date = parse_date("Mon, 2 Jan 2006 15:04:05 PST").unwrap();
        assert_eq!(date, utc(2006, 1, 2, 23, 4, 5));

        let date = parse_date("Mon, 2 Jan 2006 15:04:05 EDT").unwrap();
        assert_eq!(date, utc(2006, 1, 2, 19, 4, 5));
    }

    #[test]
    fn test_parse_two_digit_year_and_numeric_month() {
        assert_eq!(parse_date("1 1 99 00:00 Z").unwrap(), utc(1999, 1, 1, 0, 0, 0));
        assert_eq!(parse_date("1 1 05 00:00 Z").unwrap(), utc(2005, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_date("Monday, 2 Jan 2006 15:04:05 GMT").unwrap_err().is_malformed());
        assert!(parse_date("2 Foo 2006 15:04:05 GMT").is_err());
        assert!(parse_date("2 Jan 2006 15:04:05 XYZ").unwrap_err().to_string().contains("unknown timezone"));
        assert!(parse_date("2 Jan 2006").unwrap_err().to_string().contains("missing time"));
        assert!(parse_date("31 Feb 2006 15:04:05 GMT").is_err());
    }

    #[test]
    fn test_parse_malformed_numeric_zone() {
        let err = parse_date("1 Jan 2000 00:00 +1\u{e9}1").unwrap_err();
        assert!(err.to_string().contains("invalid zone"));
        assert!(parse_date("1 Jan 2000 00:00 +01000").unwrap_err().is_malformed());
        assert!(parse_date("1 Jan 2000 00:00 -1a00").unwrap_err().is_malformed());
        assert!(parse_date("1 Jan 2000 00:00 +").unwrap_err().is_malformed());
    }

    #[test]
    fn test_parse_offset_out_of_range() {
        let max = NaiveDate::MAX;
        let text = format!("{} {} {} 23:59 -9959", max.day(), max.month(), max.year());
        let err = parse_date(&text).unwrap_err();
        assert!(err.to_string().contains("date out of range"));
    }

    #[test]
    fn test_format_roundtrip() {
        let date = utc(1994, 11, 6, 8, 49, 37);
        let text = format_date(&date);
        assert_eq!(text, "Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(parse_date(&text).unwrap(), date);
    }
}
