//! Display strings shared by the HTML and JSON views.

use chrono::{NaiveDate, TimeZone};

use crate::time::EventTime;

/// Date format used for inputs, query strings and table cells.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Table cell text for an event time.
///
/// Timed values are shown as local `YYYY-MM-DD HH:MM` in `tz`. All-day values
/// are never shifted: `2024-01-10 (all day)`.
pub fn format_event_time<Tz>(time: &EventTime, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match time {
        EventTime::DateTime(dt) => dt.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string(),
        EventTime::AllDay(date) => format!("{} (all day)", format_date(*date)),
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Escapes `& < > " '` so the text is safe inside elements and quoted attributes.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    mod event_times {
        use super::*;

        #[test]
        fn timed_values_follow_timezone() {
            let et = EventTime::from_utc(utc(2024, 1, 10, 10, 0, 0));
            assert_eq!(format_event_time(&et, &Utc), "2024-01-10 10:00");
            assert_eq!(
                format_event_time(&et, &chrono_tz::America::New_York),
                "2024-01-10 05:00"
            );
        }

        #[test]
        fn all_day_values_keep_their_date() {
            let et = EventTime::from_date(date(2024, 1, 10));
            insta::assert_snapshot!(
                format_event_time(&et, &chrono_tz::Asia::Tokyo),
                @"2024-01-10 (all day)"
            );
        }
    }

    mod html_escape_tests {
        use super::*;

        #[test]
        fn escapes_special_chars() {
            assert_eq!(html_escape("<script>"), "&lt;script&gt;");
            assert_eq!(html_escape("a & b"), "a &amp; b");
            assert_eq!(html_escape("\"quoted\""), "&quot;quoted&quot;");
            assert_eq!(html_escape("it's"), "it&#x27;s");
        }

        #[test]
        fn ampersand_is_escaped_first() {
            assert_eq!(html_escape("&lt;"), "&amp;lt;");
        }
    }
}
