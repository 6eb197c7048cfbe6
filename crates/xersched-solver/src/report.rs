//! Pure-data report models.
//!
//! Converts a window diff or a single reprojected schedule into a
//! serialisable report tree. No rendering happens here; Markdown or any
//! other surface belongs to an external consumer of these structures.

use chrono::NaiveDate;
use serde::Serialize;

use xersched_core::{Diagnostic, ScheduleResults, XerDocument};

use crate::window::{
    CriticalPathComparison, MonitoredTask, PeriodActivity, RapidActivity, WindowComparison,
};

/// Project identity carried on every report.
#[derive(Clone, Debug, Serialize)]
pub struct ProjectInfo {
    pub proj_id: String,
    pub short_name: String,
}

impl ProjectInfo {
    fn from_document(document: &XerDocument) -> Self {
        match document.project() {
            Some(project) => Self {
                proj_id: project.proj_id.clone(),
                short_name: project.short_name.clone(),
            },
            None => Self {
                proj_id: String::new(),
                short_name: String::new(),
            },
        }
    }
}

/// One scheduled activity in the schedule report.
#[derive(Clone, Debug, Serialize)]
pub struct ScheduleRow {
    pub task_code: String,
    pub task_name: String,
    pub early_start: Option<NaiveDate>,
    pub early_finish: Option<NaiveDate>,
    pub late_start: Option<NaiveDate>,
    pub late_finish: Option<NaiveDate>,
    pub total_float_days: Option<i64>,
    pub is_critical: bool,
}

/// CPM results for one reprojected schedule, as pure data.
#[derive(Clone, Debug, Serialize)]
pub struct ScheduleReport {
    pub project: ProjectInfo,
    pub data_date: Option<NaiveDate>,
    pub project_finish: Option<NaiveDate>,
    pub activities: Vec<ScheduleRow>,
    /// Critical path as human-visible activity codes, in path order.
    pub critical_path: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build the schedule report from a document and its CPM results.
pub fn build_schedule_report(
    document: &XerDocument,
    results: &ScheduleResults,
) -> ScheduleReport {
    let activities = document
        .activities
        .iter()
        .map(|activity| {
            let dates = results.dates_for(&activity.task_id).cloned().unwrap_or_default();
            ScheduleRow {
                task_code: activity.task_code.clone(),
                task_name: activity.task_name.clone(),
                early_start: dates.early_start,
                early_finish: dates.early_finish,
                late_start: dates.late_start,
                late_finish: dates.late_finish,
                total_float_days: dates.total_float_days,
                is_critical: dates.is_critical,
            }
        })
        .collect();
    let critical_path = results
        .critical_path
        .iter()
        .map(|id| {
            document
                .activity(id)
                .map(|a| a.task_code.clone())
                .unwrap_or_else(|| id.clone())
        })
        .collect();

    ScheduleReport {
        project: ProjectInfo::from_document(document),
        data_date: document.data_date(),
        project_finish: results.project_finish,
        activities,
        critical_path,
        diagnostics: results.diagnostics.clone(),
    }
}

/// One activity in the single-date progress report.
#[derive(Clone, Debug, Serialize)]
pub struct ProgressRow {
    pub task_code: String,
    pub task_name: String,
    pub planned_days: f64,
    /// Actual calendar-day span, when both actuals are recorded.
    pub actual_days: Option<i64>,
    /// Fraction of the planned duration already earned, in [0, 1].
    pub progress: f64,
}

/// Completed work whose actual span differs from the plan.
#[derive(Clone, Debug, Serialize)]
pub struct DurationChange {
    pub task_code: String,
    pub task_name: String,
    pub planned_days: f64,
    pub actual_days: i64,
    pub difference_days: f64,
}

/// Progress state of one reprojected schedule at its data date.
#[derive(Clone, Debug, Serialize)]
pub struct ProgressReport {
    pub project: ProjectInfo,
    pub data_date: Option<NaiveDate>,
    pub activities: Vec<ProgressRow>,
    pub duration_changes: Vec<DurationChange>,
}

/// Build the progress report from a reprojected document.
pub fn build_progress_report(document: &XerDocument, hours_per_workday: f64) -> ProgressReport {
    let mut activities = Vec::new();
    let mut duration_changes = Vec::new();

    for activity in &document.activities {
        let planned_days = activity.target_drtn_hr / hours_per_workday;
        let actual_days = match (activity.act_start, activity.act_end) {
            (Some(start), Some(end)) => Some((end.date() - start.date()).num_days()),
            _ => None,
        };
        let progress = if activity.target_drtn_hr > 0.0 {
            (1.0 - activity.remain_drtn_hr / activity.target_drtn_hr).clamp(0.0, 1.0)
        } else if activity.act_end.is_some() || activity.act_start.is_some() {
            1.0
        } else {
            0.0
        };

        if let Some(actual) = actual_days {
            let difference = actual as f64 - planned_days;
            if difference != 0.0 {
                duration_changes.push(DurationChange {
                    task_code: activity.task_code.clone(),
                    task_name: activity.task_name.clone(),
                    planned_days,
                    actual_days: actual,
                    difference_days: difference,
                });
            }
        }
        activities.push(ProgressRow {
            task_code: activity.task_code.clone(),
            task_name: activity.task_name.clone(),
            planned_days,
            actual_days,
            progress,
        });
    }

    ProgressReport {
        project: ProjectInfo::from_document(document),
        data_date: document.data_date(),
        activities,
        duration_changes,
    }
}

/// The window diff as a serialisable tree.
#[derive(Clone, Debug, Serialize)]
pub struct WindowReport {
    pub project: ProjectInfo,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    /// Critical paths at both endpoints, as activity codes.
    pub critical_path_at_open: Vec<String>,
    pub critical_path_at_close: Vec<String>,
    pub monitored: Vec<MonitoredTask>,
    pub critical_comparison: CriticalPathComparison,
    pub planned_in_period: Vec<PeriodActivity>,
    pub completed_in_period: Vec<PeriodActivity>,
    pub started_in_period: Vec<PeriodActivity>,
    pub rapid_completions: Vec<RapidActivity>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build the window report from the structured diff.
pub fn build_window_report(comparison: &WindowComparison) -> WindowReport {
    let codes = |snapshot: &crate::window::WindowSnapshot| -> Vec<String> {
        snapshot
            .results
            .critical_path
            .iter()
            .map(|id| {
                snapshot
                    .document
                    .activity(id)
                    .map(|a| a.task_code.clone())
                    .unwrap_or_else(|| id.clone())
            })
            .collect()
    };

    WindowReport {
        project: ProjectInfo::from_document(&comparison.close.document),
        window_start: comparison.window_start,
        window_end: comparison.window_end,
        critical_path_at_open: codes(&comparison.open),
        critical_path_at_close: codes(&comparison.close),
        monitored: comparison.monitored.clone(),
        critical_comparison: comparison.critical_comparison.clone(),
        planned_in_period: comparison.planned_in_period.clone(),
        completed_in_period: comparison.completed_in_period.clone(),
        started_in_period: comparison.started_in_period.clone(),
        rapid_completions: comparison.rapid_completions.clone(),
        diagnostics: comparison.diagnostics.clone(),
    }
}
