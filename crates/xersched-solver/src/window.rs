//! Window analysis.
//!
//! Composes two reprojections at a window start and end, runs CPM on each,
//! and derives a structured diff: monitored-task movement, the critical-path
//! symmetric difference with its divergence point, the activities planned,
//! completed, and started inside the window, and the rapidly-completed
//! outliers. The two endpoints are independent deep-copied snapshots and run
//! in parallel; only the decoded calendar index is shared, read-only.

use chrono::NaiveDate;
use tracing::info;

use serde::Serialize;
use xersched_core::{
    CalendarIndex, Diagnostic, ScheduleResults, TaskId, XerDocument, XerError,
};

use crate::cpm::{SchedulerOptions, TotalFloatScheduler};
use crate::reproject::Reprojector;

/// Options for one window run.
#[derive(Clone, Debug, Default)]
pub struct WindowOptions {
    pub scheduler: SchedulerOptions,
    /// Watch list of human-visible task codes for the monitored report.
    pub monitored: Vec<String>,
}

/// One reprojected endpoint with its CPM results.
#[derive(Debug)]
pub struct WindowSnapshot {
    pub data_date: NaiveDate,
    pub document: XerDocument,
    pub results: ScheduleResults,
}

/// A date with its origin flagged: actual when recorded, planned otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FlaggedDate {
    pub date: Option<NaiveDate>,
    pub is_actual: bool,
}

/// Movement of one watched activity across the window.
#[derive(Clone, Debug, Serialize)]
pub struct MonitoredTask {
    pub task_code: String,
    pub task_name: String,
    pub start_at_open: FlaggedDate,
    pub finish_at_open: FlaggedDate,
    pub start_at_close: FlaggedDate,
    pub finish_at_close: FlaggedDate,
    /// Signed calendar-day slips, close minus open.
    pub start_slip_days: Option<i64>,
    pub finish_slip_days: Option<i64>,
}

/// Critical-path difference between the two endpoints.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CriticalPathComparison {
    /// First position at which the two ordered paths diverge (one entry of
    /// context included).
    pub divergence_index: usize,
    /// Critical at the window start but no longer at the end; restricted to
    /// activities known before the window opened.
    pub removed: Vec<TaskId>,
    /// Newly critical at the window end, same restriction.
    pub added: Vec<TaskId>,
}

/// One activity row in the in-period tables.
#[derive(Clone, Debug, Serialize)]
pub struct PeriodActivity {
    pub task_id: TaskId,
    pub task_code: String,
    pub task_name: String,
    pub target_start: Option<NaiveDate>,
    pub target_end: Option<NaiveDate>,
    pub act_start: Option<NaiveDate>,
    pub act_end: Option<NaiveDate>,
    /// Planned span in calendar days, when both planned dates exist.
    pub planned_days: Option<i64>,
    /// Actual span in calendar days, when both actuals exist.
    pub actual_days: Option<i64>,
}

/// An activity finished in much less than its planned span.
#[derive(Clone, Debug, Serialize)]
pub struct RapidActivity {
    pub task_code: String,
    pub task_name: String,
    pub planned_days: i64,
    pub actual_days: i64,
    /// actual / planned, in [0, 0.7].
    pub completion_ratio: f64,
}

/// The full structured diff. Rendering belongs to an external collaborator.
#[derive(Debug)]
pub struct WindowComparison {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub open: WindowSnapshot,
    pub close: WindowSnapshot,
    pub monitored: Vec<MonitoredTask>,
    pub critical_comparison: CriticalPathComparison,
    pub planned_in_period: Vec<PeriodActivity>,
    pub completed_in_period: Vec<PeriodActivity>,
    pub started_in_period: Vec<PeriodActivity>,
    pub rapid_completions: Vec<RapidActivity>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Drives the two endpoint pipelines and the comparison.
#[derive(Clone, Debug, Default)]
pub struct WindowAnalyzer {
    options: WindowOptions,
}

impl WindowAnalyzer {
    pub fn new(options: WindowOptions) -> Self {
        Self { options }
    }

    pub fn analyze(
        &self,
        document: &XerDocument,
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> Result<WindowComparison, XerError> {
        if window_start >= window_end {
            return Err(XerError::InvalidWindow(window_start, window_end));
        }
        info!(start = %window_start, end = %window_end, "running window analysis");

        let index = CalendarIndex::build(&document.calendars);
        let (open, close) = rayon::join(
            || self.process_endpoint(document, &index, window_start),
            || self.process_endpoint(document, &index, window_end),
        );
        let (open, mut open_diags) = open?;
        let (close, mut close_diags) = close?;

        let mut diagnostics = Vec::new();
        diagnostics.append(&mut open_diags);
        diagnostics.append(&mut close_diags);

        let monitored = self.monitored_rows(&open, &close);
        let critical_comparison = compare_critical_paths(&open, &close, window_start);
        let planned_in_period = period_rows(&close.document, |a| {
            in_window(a.target_start.map(|d| d.date()), window_start, window_end)
        });
        let completed_in_period = period_rows(&close.document, |a| {
            in_window(a.act_end.map(|d| d.date()), window_start, window_end)
        });
        let started_in_period = period_rows(&close.document, |a| {
            in_window(a.act_start.map(|d| d.date()), window_start, window_end)
                && !in_window(a.act_end.map(|d| d.date()), window_start, window_end)
        });
        let rapid_completions = rapid_rows(&close.document);

        Ok(WindowComparison {
            window_start,
            window_end,
            open,
            close,
            monitored,
            critical_comparison,
            planned_in_period,
            completed_in_period,
            started_in_period,
            rapid_completions,
            diagnostics,
        })
    }

    fn process_endpoint(
        &self,
        document: &XerDocument,
        index: &CalendarIndex,
        data_date: NaiveDate,
    ) -> Result<(WindowSnapshot, Vec<Diagnostic>), XerError> {
        let reprojector =
            Reprojector::with_hours_per_workday(index, self.options.scheduler.hours_per_workday);
        let (snapshot, mut diagnostics) = reprojector.reproject(document, data_date);

        let scheduler = TotalFloatScheduler::with_options(index, self.options.scheduler);
        let results: ScheduleResults = scheduler.schedule(&snapshot)?;
        diagnostics.extend(results.diagnostics.iter().cloned());

        Ok((
            WindowSnapshot {
                data_date,
                document: snapshot,
                results,
            },
            diagnostics,
        ))
    }

    fn monitored_rows(&self, open: &WindowSnapshot, close: &WindowSnapshot) -> Vec<MonitoredTask> {
        let open_by_code = open.document.activities_by_code();
        let close_by_code = close.document.activities_by_code();

        self.options
            .monitored
            .iter()
            .filter_map(|code| {
                let at_close = close_by_code.get(code.as_str()).copied();
                let at_open = open_by_code.get(code.as_str()).copied();
                let reference = at_close.or(at_open)?;

                let (start_open, finish_open) = flagged_dates(at_open);
                let (start_close, finish_close) = flagged_dates(at_close);
                Some(MonitoredTask {
                    task_code: code.clone(),
                    task_name: reference.task_name.clone(),
                    start_at_open: start_open,
                    finish_at_open: finish_open,
                    start_at_close: start_close,
                    finish_at_close: finish_close,
                    start_slip_days: slip(start_open, start_close),
                    finish_slip_days: slip(finish_open, finish_close),
                })
            })
            .collect()
    }
}

fn flagged_dates(activity: Option<&xersched_core::Activity>) -> (FlaggedDate, FlaggedDate) {
    let Some(activity) = activity else {
        let absent = FlaggedDate {
            date: None,
            is_actual: false,
        };
        return (absent, absent);
    };
    let start = match activity.act_start {
        Some(actual) => FlaggedDate {
            date: Some(actual.date()),
            is_actual: true,
        },
        None => FlaggedDate {
            date: activity.target_start.map(|d| d.date()),
            is_actual: false,
        },
    };
    let finish = match activity.act_end {
        Some(actual) => FlaggedDate {
            date: Some(actual.date()),
            is_actual: true,
        },
        None => FlaggedDate {
            date: activity.target_end.map(|d| d.date()),
            is_actual: false,
        },
    };
    (start, finish)
}

fn slip(open: FlaggedDate, close: FlaggedDate) -> Option<i64> {
    Some((close.date? - open.date?).num_days())
}

fn in_window(date: Option<NaiveDate>, from: NaiveDate, to: NaiveDate) -> bool {
    date.map(|d| d >= from && d <= to).unwrap_or(false)
}

/// The original comparison: find where the ordered paths diverge (keeping
/// one activity of context), then diff the sets from that point on,
/// restricted to activities the schedule already knew before the window
/// opened.
fn compare_critical_paths(
    open: &WindowSnapshot,
    close: &WindowSnapshot,
    window_start: NaiveDate,
) -> CriticalPathComparison {
    let open_path = &open.results.critical_path;
    let close_path = &close.results.critical_path;

    let mut divergence_index = 0usize;
    for (i, (a, b)) in open_path.iter().zip(close_path.iter()).enumerate() {
        if a != b {
            divergence_index = i.saturating_sub(1);
            break;
        }
    }

    let open_set: std::collections::HashSet<&TaskId> =
        open_path.iter().skip(divergence_index).collect();
    let close_set: std::collections::HashSet<&TaskId> =
        close_path.iter().skip(divergence_index).collect();

    let known_before = |snapshot: &WindowSnapshot, id: &TaskId| {
        snapshot
            .document
            .activity(id)
            .and_then(|a| a.earliest_reference())
            .map(|d| d < window_start)
            .unwrap_or(false)
    };

    let mut removed: Vec<TaskId> = open_set
        .difference(&close_set)
        .filter(|id| known_before(open, id))
        .map(|id| (*id).clone())
        .collect();
    let mut added: Vec<TaskId> = close_set
        .difference(&open_set)
        .filter(|id| known_before(close, id))
        .map(|id| (*id).clone())
        .collect();
    removed.sort();
    added.sort();

    CriticalPathComparison {
        divergence_index,
        removed,
        added,
    }
}

fn period_rows<F>(document: &XerDocument, keep: F) -> Vec<PeriodActivity>
where
    F: Fn(&xersched_core::Activity) -> bool,
{
    document
        .activities
        .iter()
        .filter(|a| keep(a))
        .map(|a| {
            let planned_days = match (a.target_start, a.target_end) {
                (Some(s), Some(e)) => Some((e.date() - s.date()).num_days()),
                _ => None,
            };
            let actual_days = match (a.act_start, a.act_end) {
                (Some(s), Some(e)) => Some((e.date() - s.date()).num_days()),
                _ => None,
            };
            PeriodActivity {
                task_id: a.task_id.clone(),
                task_code: a.task_code.clone(),
                task_name: a.task_name.clone(),
                target_start: a.target_start.map(|d| d.date()),
                target_end: a.target_end.map(|d| d.date()),
                act_start: a.act_start.map(|d| d.date()),
                act_end: a.act_end.map(|d| d.date()),
                planned_days,
                actual_days,
            }
        })
        .collect()
}

/// Completed activities that took at most 70% of a planned span of at least
/// one day, sorted fastest first.
fn rapid_rows(document: &XerDocument) -> Vec<RapidActivity> {
    let mut rows: Vec<RapidActivity> = document
        .activities
        .iter()
        .filter_map(|a| {
            let act_start = a.act_start?.date();
            let act_end = a.act_end?.date();
            let target_start = a.target_start?.date();
            let target_end = a.target_end?.date();

            let planned_days = (target_end - target_start).num_days();
            let actual_days = (act_end - act_start).num_days();
            if planned_days < 1 {
                return None;
            }
            if actual_days as f64 > 0.7 * planned_days as f64 {
                return None;
            }
            Some(RapidActivity {
                task_code: a.task_code.clone(),
                task_name: a.task_name.clone(),
                planned_days,
                actual_days,
                completion_ratio: actual_days as f64 / planned_days as f64,
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        a.completion_ratio
            .partial_cmp(&b.completion_ratio)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows
}
