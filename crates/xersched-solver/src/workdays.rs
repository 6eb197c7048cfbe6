//! Working-day arithmetic over decoded calendars.
//!
//! Three public operations: the working-day test, working-day addition, and
//! the inclusive working-day count between two dates. A fourth, the signed
//! offset, is what total float is measured in: `offset(d, add(d, n)) == n`
//! and `offset(d, d) == 0`, where the inclusive count would also charge for
//! the starting day.
//!
//! Every operation returns `None` for an unknown calendar or an
//! out-of-range walk; callers treat `None` as "cannot schedule" and record a
//! diagnostic.

use chrono::NaiveDate;

use xersched_core::CalendarIndex;

/// Upper bound on a single working-day walk, comfortably above ten years of
/// workdays. Anything larger is a runaway and is refused.
pub const MAX_WALK_DAYS: i64 = 15_000;

/// Calculator over a shared read-only calendar index.
#[derive(Clone, Copy, Debug)]
pub struct WorkingDayCalculator<'a> {
    index: &'a CalendarIndex,
}

impl<'a> WorkingDayCalculator<'a> {
    pub fn new(index: &'a CalendarIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &'a CalendarIndex {
        self.index
    }

    /// Exceptions win over the weekday pattern; a calendar without any
    /// weekday entries treats every non-excepted day as working.
    pub fn is_working_day(&self, date: NaiveDate, clndr_id: &str) -> Option<bool> {
        self.index.is_working_day(date, clndr_id)
    }

    /// Step `n` working days from `date`; negative `n` steps backward, zero
    /// returns `date` unchanged.
    pub fn add_working_days(&self, date: NaiveDate, n: i64, clndr_id: &str) -> Option<NaiveDate> {
        if !self.index.contains(clndr_id) {
            return None;
        }
        if n == 0 {
            return Some(date);
        }
        if n.abs() > MAX_WALK_DAYS {
            return None;
        }

        let mut current = date;
        let mut remaining = n.abs();
        let mut guard = 0i64;
        while remaining > 0 {
            current = if n > 0 {
                current.succ_opt()?
            } else {
                current.pred_opt()?
            };
            if self.index.is_working_day(current, clndr_id)? {
                remaining -= 1;
            }
            guard += 1;
            if guard > MAX_WALK_DAYS * 8 {
                // A calendar with no working days at all would never finish.
                return None;
            }
        }
        Some(current)
    }

    /// Inclusive count of working days in `[min(a, b), max(a, b)]`.
    pub fn working_days_between(
        &self,
        a: NaiveDate,
        b: NaiveDate,
        clndr_id: &str,
    ) -> Option<i64> {
        if !self.index.contains(clndr_id) {
            return None;
        }
        let (from, to) = if a <= b { (a, b) } else { (b, a) };
        if (to - from).num_days() > MAX_WALK_DAYS * 8 {
            return None;
        }

        let mut count = 0i64;
        let mut current = from;
        loop {
            if self.index.is_working_day(current, clndr_id)? {
                count += 1;
            }
            if current == to {
                break;
            }
            current = current.succ_opt()?;
        }
        Some(count)
    }

    /// Signed working-day offset from `from` to `to`: the number of working
    /// days strictly after `from` up to and including `to`, negated when
    /// `to` precedes `from`.
    pub fn working_day_offset(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        clndr_id: &str,
    ) -> Option<i64> {
        if from == to {
            return if self.index.contains(clndr_id) {
                Some(0)
            } else {
                None
            };
        }
        let (lo, hi, sign) = if from < to {
            (from, to, 1)
        } else {
            (to, from, -1)
        };
        let inclusive = self.working_days_between(lo, hi, clndr_id)?;
        let charged_start = self.is_working_day(lo, clndr_id)? as i64;
        Some(sign * (inclusive - charged_start))
    }
}
