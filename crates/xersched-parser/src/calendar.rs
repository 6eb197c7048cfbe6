//! Decoder for the embedded calendar body grammar.
//!
//! A calendar data cell is a sequence of bracketed blocks. Two productions
//! matter here: weekday blocks `(0||<digit>()<windows>)` with the digit in
//! 1-7, and exception blocks `(0||<n>(d|<serial>)(<windows>)())` where
//! `<serial>` is the vendor's spreadsheet-compatible day number. Windows are
//! `s|HH:MM|f|HH:MM` pairs. Extra whitespace between tokens is accepted and
//! unrecognised sub-blocks are ignored.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate, NaiveTime, TimeDelta};
use regex::Regex;
use tracing::warn;

use xersched_core::{Calendar, DiagCode, Diagnostic, TimeWindow};

fn workday_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\(\s*0\s*\|\|\s*([1-7])\s*\(\s*\)\s*([^()]*)\)").expect("workday pattern")
    })
}

fn exception_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\(\s*0\s*\|\|\s*(\d+)\s*\(\s*d\s*\|\s*(\d+)\s*\)\s*(?:\(\s*(.*?)\s*\))?\s*\(\s*\)\s*\)")
            .expect("exception pattern")
    })
}

fn hours_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"s\s*\|\s*(\d{1,2}:\d{2})\s*\|\s*f\s*\|\s*(\d{1,2}:\d{2})")
            .expect("hours pattern")
    })
}

/// Convert a spreadsheet serial day to a calendar date.
///
/// Serials of 60 and above count from 1899-12-30; below 60 the origin shifts
/// one day so that serial 1 is 1900-01-01, reproducing the vendor's 1900
/// leap-year quirk. Results outside the supported range are `None`.
pub fn serial_to_date(serial: i64) -> Option<NaiveDate> {
    let base = if serial >= 60 {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    };
    let date = base.checked_add_signed(TimeDelta::try_days(serial)?)?;
    (1900..=2999).contains(&date.year()).then_some(date)
}

/// Decode one calendar body. Undecodable sub-blocks are dropped with a
/// diagnostic; the rest of the calendar still loads.
pub fn decode_calendar(
    clndr_id: &str,
    name: &str,
    data: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Calendar {
    let mut calendar = Calendar::new(clndr_id, name);

    for captures in workday_re().captures_iter(data) {
        let weekday: u32 = match captures[1].parse() {
            Ok(day) => day,
            Err(_) => continue,
        };
        let windows = parse_windows(clndr_id, &captures[2], diagnostics);
        calendar.weekdays.insert(weekday, windows);
    }

    for captures in exception_re().captures_iter(data) {
        let serial_text = &captures[2];
        let date = serial_text
            .parse::<i64>()
            .ok()
            .and_then(serial_to_date);
        let Some(date) = date else {
            warn!(calendar = clndr_id, serial = serial_text, "exception date out of range");
            diagnostics.push(
                Diagnostic::warning(
                    DiagCode::DateOutOfRange,
                    format!(
                        "calendar {}: exception serial {} is outside the supported date range",
                        clndr_id, serial_text
                    ),
                ),
            );
            continue;
        };
        let windows = captures
            .get(3)
            .map(|hours| parse_windows(clndr_id, hours.as_str(), diagnostics))
            .unwrap_or_default();
        calendar.exceptions.insert(date, windows);
    }

    calendar
}

/// Parse the `s|HH:MM|f|HH:MM` pairs of one block, merging overlaps.
fn parse_windows(
    clndr_id: &str,
    hours: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<TimeWindow> {
    let mut windows = Vec::new();
    for captures in hours_re().captures_iter(hours) {
        let start = NaiveTime::parse_from_str(&captures[1], "%H:%M");
        let end = NaiveTime::parse_from_str(&captures[2], "%H:%M");
        match (start, end) {
            (Ok(start), Ok(end)) => windows.push(TimeWindow::new(start, end)),
            _ => {
                diagnostics.push(Diagnostic::warning(
                    DiagCode::CalendarParse,
                    format!(
                        "calendar {}: dropped unparseable hour pair {:?}",
                        clndr_id, &captures[0]
                    ),
                ));
            }
        }
    }
    merge_windows(windows)
}

/// Union overlapping or touching intervals, sorted by start time.
fn merge_windows(mut windows: Vec<TimeWindow>) -> Vec<TimeWindow> {
    if windows.is_empty() {
        return windows;
    }
    windows.sort_by_key(|w| w.start);
    let mut merged: Vec<TimeWindow> = vec![windows[0]];
    for window in windows.into_iter().skip(1) {
        let previous = merged
            .last_mut()
            .filter(|previous| window.start <= previous.end);
        match previous {
            Some(previous) => previous.end = previous.end.max(window.end),
            None => merged.push(window),
        }
    }
    merged
}
