//! Decoded calendar model.
//!
//! A calendar is a weekday pattern (ISO weekday 1-7, each mapped to an
//! ordered list of working time windows) plus a sparse map of date
//! exceptions. An empty window list means the day is non-working; exceptions
//! always win over the weekday pattern.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::CalendarId;

/// A half-open working interval `[start, end)` within one day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn duration_hours(&self) -> f64 {
        (self.end - self.start).num_minutes() as f64 / 60.0
    }
}

/// A decoded working-time calendar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub clndr_id: CalendarId,
    pub name: String,
    /// ISO weekday (1 = Monday .. 7 = Sunday) to ordered, disjoint windows.
    /// A weekday mapped to an empty list, or absent entirely, is non-working.
    pub weekdays: BTreeMap<u32, Vec<TimeWindow>>,
    /// Date exceptions; an empty window list marks the date non-working.
    pub exceptions: BTreeMap<NaiveDate, Vec<TimeWindow>>,
}

impl Calendar {
    pub fn new(clndr_id: impl Into<CalendarId>, name: impl Into<String>) -> Self {
        Self {
            clndr_id: clndr_id.into(),
            name: name.into(),
            weekdays: BTreeMap::new(),
            exceptions: BTreeMap::new(),
        }
    }

    /// Whether the calendar declares any weekday pattern at all. A calendar
    /// without one treats every non-excepted day as working.
    pub fn has_weekday_pattern(&self) -> bool {
        !self.weekdays.is_empty()
    }

    /// Exception-first working-day test.
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        if let Some(windows) = self.exceptions.get(&date) {
            return !windows.is_empty();
        }
        if !self.has_weekday_pattern() {
            return true;
        }
        self.weekdays
            .get(&date.weekday().number_from_monday())
            .map(|windows| !windows.is_empty())
            .unwrap_or(false)
    }

    /// Working hours on a regular weekday, zero for non-working days.
    pub fn weekday_hours(&self, weekday: u32) -> f64 {
        self.weekdays
            .get(&weekday)
            .map(|windows| windows.iter().map(TimeWindow::duration_hours).sum())
            .unwrap_or(0.0)
    }
}

/// Flat lookup indices over a set of decoded calendars.
///
/// Shared read-only by every scheduling pass of an invocation; the two flat
/// tables mirror the relational `(clndr_id, weekday)` and `(clndr_id, date)`
/// shapes the rest of the pipeline queries.
#[derive(Clone, Debug, Default)]
pub struct CalendarIndex {
    calendars: HashMap<CalendarId, Calendar>,
    weekday_windows: HashMap<(CalendarId, u32), Vec<TimeWindow>>,
    exception_windows: HashMap<(CalendarId, NaiveDate), Vec<TimeWindow>>,
}

impl CalendarIndex {
    pub fn build(calendars: &[Calendar]) -> Self {
        let mut index = Self::default();
        for cal in calendars {
            for (weekday, windows) in &cal.weekdays {
                index
                    .weekday_windows
                    .insert((cal.clndr_id.clone(), *weekday), windows.clone());
            }
            for (date, windows) in &cal.exceptions {
                index
                    .exception_windows
                    .insert((cal.clndr_id.clone(), *date), windows.clone());
            }
            index.calendars.insert(cal.clndr_id.clone(), cal.clone());
        }
        index
    }

    pub fn contains(&self, clndr_id: &str) -> bool {
        self.calendars.contains_key(clndr_id)
    }

    pub fn calendar(&self, clndr_id: &str) -> Option<&Calendar> {
        self.calendars.get(clndr_id)
    }

    pub fn weekday_windows(&self, clndr_id: &str, weekday: u32) -> Option<&[TimeWindow]> {
        self.weekday_windows
            .get(&(clndr_id.to_string(), weekday))
            .map(Vec::as_slice)
    }

    pub fn exception_windows(&self, clndr_id: &str, date: NaiveDate) -> Option<&[TimeWindow]> {
        self.exception_windows
            .get(&(clndr_id.to_string(), date))
            .map(Vec::as_slice)
    }

    /// Working-day test; `None` when the calendar is unknown.
    pub fn is_working_day(&self, date: NaiveDate, clndr_id: &str) -> Option<bool> {
        self.calendars
            .get(clndr_id)
            .map(|cal| cal.is_working_day(date))
    }
}
