//! Progress reprojection.
//!
//! Rewrites each activity's actual dates and remaining duration so the
//! snapshot reflects what was true at a target data date, even when the
//! input is a fully as-built export. The transform works on a deep copy and
//! finishes by stamping the project's recalc date and syncing the owned
//! columns back into the raw tables, so serializing the result is lossless
//! for everything else.

use chrono::NaiveDate;
use tracing::debug;

use xersched_core::{CalendarIndex, DiagCode, Diagnostic, XerDocument};

use crate::workdays::WorkingDayCalculator;

/// Reprojects entity snapshots to a target data date.
pub struct Reprojector<'a> {
    calc: WorkingDayCalculator<'a>,
    hours_per_workday: f64,
}

impl<'a> Reprojector<'a> {
    pub fn new(index: &'a CalendarIndex) -> Self {
        Self {
            calc: WorkingDayCalculator::new(index),
            hours_per_workday: 8.0,
        }
    }

    pub fn with_hours_per_workday(index: &'a CalendarIndex, hours_per_workday: f64) -> Self {
        Self {
            calc: WorkingDayCalculator::new(index),
            hours_per_workday,
        }
    }

    /// Produce a deep copy of the document as of `target`. After the
    /// transform every activity satisfies `act_end <= target` or has no
    /// actual finish at all.
    pub fn reproject(
        &self,
        document: &XerDocument,
        target: NaiveDate,
    ) -> (XerDocument, Vec<Diagnostic>) {
        let mut snapshot = document.clone();
        let mut diagnostics = Vec::new();

        for activity in &mut snapshot.activities {
            let progress = self.progress_fraction(activity, target, &mut diagnostics);

            if progress <= 0.0 {
                activity.act_start = None;
                activity.act_end = None;
                activity.remain_drtn_hr = activity.target_drtn_hr;
            } else if progress >= 1.0 && activity.is_completed_by(target) {
                activity.remain_drtn_hr = 0.0;
            } else {
                // In progress at the target date.
                activity.act_end = None;
                activity.remain_drtn_hr =
                    (activity.target_drtn_hr * (1.0 - progress)).max(0.0);
            }
        }

        for project in &mut snapshot.projects {
            project.last_recalc = target.and_time(chrono::NaiveTime::MIN);
        }
        snapshot.sync_entity_columns();

        debug!(target = %target, activities = snapshot.activities.len(), "reprojected snapshot");
        (snapshot, diagnostics)
    }

    /// Fraction of the planned duration elapsed at the target date, clamped
    /// to [0, 1]. Elapsed time is measured in working days on the
    /// activity's calendar.
    fn progress_fraction(
        &self,
        activity: &xersched_core::Activity,
        target: NaiveDate,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> f64 {
        let Some(act_start) = activity.act_start.map(|d| d.date()) else {
            return 0.0;
        };
        if activity.is_completed_by(target) {
            return 1.0;
        }
        if act_start > target {
            return 0.0;
        }

        let planned_days = activity.planned_days(self.hours_per_workday);
        if planned_days == 0 {
            return 1.0;
        }

        let elapsed = match self
            .calc
            .working_day_offset(act_start, target, &activity.clndr_id)
        {
            Some(days) => days,
            None => {
                diagnostics.push(
                    Diagnostic::warning(
                        DiagCode::Unscheduled,
                        format!(
                            "activity {}: calendar {} unavailable, elapsed progress measured in calendar days",
                            activity.task_id, activity.clndr_id
                        ),
                    )
                    .with_task(activity.task_id.clone()),
                );
                (target - act_start).num_days()
            }
        };
        (elapsed as f64 / planned_days as f64).clamp(0.0, 1.0)
    }
}
