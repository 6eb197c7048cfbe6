//! # xersched-solver
//!
//! Scheduling engine over a parsed XER document:
//! - Working-day arithmetic on decoded calendars
//! - Progress reprojection to an arbitrary data date
//! - Total-float CPM (forward/backward passes, constraints, actuals,
//!   milestones, level-of-effort, WBS summaries)
//! - Window analysis composing two reprojections into a structured diff
//! - Pure-data report models for external renderers
//!
//! ## Example
//!
//! ```no_run
//! use xersched_parser::parse_file;
//! use xersched_solver::{ScheduleContext, SchedulerOptions};
//!
//! let outcome = parse_file(std::path::Path::new("schedule.xer"))?;
//! let context = ScheduleContext::new(outcome.document);
//! let results = context.schedule(SchedulerOptions::default())?;
//! for task_id in &results.critical_path {
//!     println!("{task_id}");
//! }
//! # Ok::<(), xersched_core::XerError>(())
//! ```

use chrono::NaiveDate;

use xersched_core::{CalendarIndex, Diagnostic, ScheduleResults, XerDocument, XerError};

pub mod cpm;
pub mod graph;
pub mod report;
pub mod reproject;
pub mod window;
pub mod workdays;

pub use cpm::{SchedulerOptions, TotalFloatScheduler};
pub use graph::{ActivityGraph, CycleRepair};
pub use report::{
    build_progress_report, build_schedule_report, build_window_report, ProgressReport,
    ScheduleReport, WindowReport,
};
pub use reproject::Reprojector;
pub use window::{WindowAnalyzer, WindowComparison, WindowOptions, WindowSnapshot};
pub use workdays::WorkingDayCalculator;

/// Per-invocation state: the entity snapshot plus its decoded calendar
/// index. One pipeline invocation owns its context exclusively; windows
/// create fresh contexts from deep-copied snapshots.
#[derive(Debug)]
pub struct ScheduleContext {
    document: XerDocument,
    index: CalendarIndex,
}

impl ScheduleContext {
    pub fn new(document: XerDocument) -> Self {
        let index = CalendarIndex::build(&document.calendars);
        Self { document, index }
    }

    pub fn document(&self) -> &XerDocument {
        &self.document
    }

    pub fn calendar_index(&self) -> &CalendarIndex {
        &self.index
    }

    pub fn into_document(self) -> XerDocument {
        self.document
    }

    /// Run the CPM engine over the owned snapshot.
    pub fn schedule(&self, options: SchedulerOptions) -> Result<ScheduleResults, XerError> {
        TotalFloatScheduler::with_options(&self.index, options).schedule(&self.document)
    }

    /// Reproject to a target data date, producing a fresh context over the
    /// deep-copied snapshot.
    pub fn reproject(
        &self,
        target: NaiveDate,
        hours_per_workday: f64,
    ) -> (ScheduleContext, Vec<Diagnostic>) {
        let reprojector = Reprojector::with_hours_per_workday(&self.index, hours_per_workday);
        let (snapshot, diagnostics) = reprojector.reproject(&self.document, target);
        (ScheduleContext::new(snapshot), diagnostics)
    }

    /// Run the full window analysis between two data dates.
    pub fn window(
        &self,
        window_start: NaiveDate,
        window_end: NaiveDate,
        options: WindowOptions,
    ) -> Result<WindowComparison, XerError> {
        WindowAnalyzer::new(options).analyze(&self.document, window_start, window_end)
    }
}
