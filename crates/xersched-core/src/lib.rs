//! # xersched-core
//!
//! Core domain model for the xersched scheduling engine.
//!
//! This crate provides:
//! - Typed entities over an XER export: `Project`, `WbsNode`, `Activity`,
//!   `Relationship`, decoded `Calendar`
//! - The `XerDocument` entity model (typed views plus the raw tables kept
//!   for lossless serialization)
//! - Schedule-result types written back by the CPM engine
//! - The error taxonomy and collected-diagnostics model
//!
//! ## Example
//!
//! ```rust
//! use xersched_core::{Activity, TaskType};
//!
//! let mut activity = Activity::new("1000", "A1000", "Excavate footings");
//! activity.target_drtn_hr = 40.0;
//! assert_eq!(activity.planned_days(8.0), 5);
//! assert_eq!(activity.task_type, TaskType::Task);
//! ```

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod calendar;
pub mod diag;

pub use calendar::{Calendar, CalendarIndex, TimeWindow};
pub use diag::{DiagCode, Diagnostic, Severity};

// ============================================================================
// Type Aliases
// ============================================================================

/// Unique identifier for an activity (`task_id` column)
pub type TaskId = String;

/// Unique identifier for a WBS node (`wbs_id` column)
pub type WbsId = String;

/// Unique identifier for a calendar (`clndr_id` column)
pub type CalendarId = String;

/// Unique identifier for a project (`proj_id` column)
pub type ProjId = String;

// ============================================================================
// Field Conversions
// ============================================================================

/// Date format used by every date-bearing XER column.
pub const XER_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parse an XER date cell. Empty cells are null; seconds and date-only
/// spellings are tolerated on input.
pub fn parse_xer_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, XER_DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Format a date for serialization.
pub fn format_xer_date(value: NaiveDateTime) -> String {
    value.format(XER_DATE_FORMAT).to_string()
}

/// Parse a numeric cell; empty and malformed cells count as zero, matching
/// how the vendor treats blank duration and lag columns.
pub fn parse_xer_number(raw: &str) -> f64 {
    raw.trim().parse().unwrap_or(0.0)
}

/// Format a numeric cell, using the integer spelling when exact.
pub fn format_xer_number(value: f64) -> String {
    if value.fract().abs() < 1e-9 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Activity specialization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    #[default]
    Task,
    ResourceDependent,
    StartMilestone,
    FinishMilestone,
    LevelOfEffort,
    WbsSummary,
}

impl TaskType {
    /// Map a vendor code. Unknown codes return `None`; callers schedule the
    /// activity as `Task` and record a diagnostic.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "TT_Task" => Some(TaskType::Task),
            "TT_Rsrc" => Some(TaskType::ResourceDependent),
            "TT_Mile" => Some(TaskType::StartMilestone),
            "TT_FinMile" => Some(TaskType::FinishMilestone),
            "TT_LOE" => Some(TaskType::LevelOfEffort),
            "TT_WBS" => Some(TaskType::WbsSummary),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TaskType::Task => "TT_Task",
            TaskType::ResourceDependent => "TT_Rsrc",
            TaskType::StartMilestone => "TT_Mile",
            TaskType::FinishMilestone => "TT_FinMile",
            TaskType::LevelOfEffort => "TT_LOE",
            TaskType::WbsSummary => "TT_WBS",
        }
    }

    pub fn is_milestone(&self) -> bool {
        matches!(self, TaskType::StartMilestone | TaskType::FinishMilestone)
    }

    pub fn is_loe(&self) -> bool {
        matches!(self, TaskType::LevelOfEffort)
    }

    pub fn is_wbs_summary(&self) -> bool {
        matches!(self, TaskType::WbsSummary)
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TaskType::Task => "Task",
            TaskType::ResourceDependent => "Resource Dependent",
            TaskType::StartMilestone => "Start Milestone",
            TaskType::FinishMilestone => "Finish Milestone",
            TaskType::LevelOfEffort => "Level of Effort",
            TaskType::WbsSummary => "WBS Summary",
        };
        write!(f, "{}", text)
    }
}

/// Relationship kind between a predecessor and a successor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// Finish-to-Start: successor starts after predecessor finishes
    #[default]
    Fs,
    /// Start-to-Start: successor starts with predecessor start
    Ss,
    /// Finish-to-Finish: successor finishes with predecessor finish
    Ff,
    /// Start-to-Finish: successor finishes after predecessor starts
    Sf,
}

impl RelationKind {
    /// Accepts both the `PR_FS` vendor spelling and the bare `FS` suffix.
    /// Anything else is rejected at load.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        let suffix = if code.len() >= 2 {
            &code[code.len() - 2..]
        } else {
            code
        };
        match suffix {
            "FS" => Some(RelationKind::Fs),
            "SS" => Some(RelationKind::Ss),
            "FF" => Some(RelationKind::Ff),
            "SF" => Some(RelationKind::Sf),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RelationKind::Fs => "PR_FS",
            RelationKind::Ss => "PR_SS",
            RelationKind::Ff => "PR_FF",
            RelationKind::Sf => "PR_SF",
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RelationKind::Fs => "FS",
            RelationKind::Ss => "SS",
            RelationKind::Ff => "FF",
            RelationKind::Sf => "SF",
        };
        write!(f, "{}", text)
    }
}

/// Date anchor restricting an activity independently of logic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    MandatoryStart,
    StartOn,
    StartOnOrAfter,
    StartOnOrBefore,
    MandatoryFinish,
    FinishOn,
    FinishOnOrAfter,
    FinishOnOrBefore,
    AsLateAsPossible,
}

impl ConstraintKind {
    /// Unknown codes are ignored with a diagnostic; the activity still
    /// schedules from its logic.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "CS_MANDSTART" => Some(ConstraintKind::MandatoryStart),
            "CS_MSO" => Some(ConstraintKind::StartOn),
            "CS_MSOA" => Some(ConstraintKind::StartOnOrAfter),
            "CS_MSOB" => Some(ConstraintKind::StartOnOrBefore),
            "CS_MANDFIN" => Some(ConstraintKind::MandatoryFinish),
            "CS_MEO" => Some(ConstraintKind::FinishOn),
            "CS_MEOA" => Some(ConstraintKind::FinishOnOrAfter),
            "CS_MEOB" => Some(ConstraintKind::FinishOnOrBefore),
            "CS_ALAP" => Some(ConstraintKind::AsLateAsPossible),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ConstraintKind::MandatoryStart => "CS_MANDSTART",
            ConstraintKind::StartOn => "CS_MSO",
            ConstraintKind::StartOnOrAfter => "CS_MSOA",
            ConstraintKind::StartOnOrBefore => "CS_MSOB",
            ConstraintKind::MandatoryFinish => "CS_MANDFIN",
            ConstraintKind::FinishOn => "CS_MEO",
            ConstraintKind::FinishOnOrAfter => "CS_MEOA",
            ConstraintKind::FinishOnOrBefore => "CS_MEOB",
            ConstraintKind::AsLateAsPossible => "CS_ALAP",
        }
    }

    /// Whether the anchor acts on the early start during the forward pass.
    pub fn restricts_start(&self) -> bool {
        matches!(
            self,
            ConstraintKind::MandatoryStart
                | ConstraintKind::StartOn
                | ConstraintKind::StartOnOrAfter
                | ConstraintKind::StartOnOrBefore
        )
    }

    /// Whether the anchor acts on the late finish during the backward pass.
    pub fn restricts_finish(&self) -> bool {
        matches!(
            self,
            ConstraintKind::MandatoryFinish
                | ConstraintKind::FinishOn
                | ConstraintKind::FinishOnOrAfter
                | ConstraintKind::FinishOnOrBefore
        )
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A project row. One per file typically; owns every activity and
/// relationship the file declares.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub proj_id: ProjId,
    pub short_name: String,
    /// Planned project start.
    pub plan_start: NaiveDateTime,
    /// The data date; rewritten by reprojection.
    pub last_recalc: NaiveDateTime,
}

/// A work-breakdown-structure node. The set of nodes forms a forest rooted
/// at project nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WbsNode {
    pub wbs_id: WbsId,
    pub short_name: String,
    pub name: String,
    pub parent_wbs_id: Option<WbsId>,
    pub is_project_node: bool,
}

/// A schedule activity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub task_id: TaskId,
    /// Human-visible activity code.
    pub task_code: String,
    pub task_name: String,
    pub wbs_id: WbsId,
    pub clndr_id: CalendarId,
    pub task_type: TaskType,
    /// Raw status code, carried as text.
    pub status_code: String,
    /// Planned duration in hours.
    pub target_drtn_hr: f64,
    /// Remaining duration in hours; rewritten by reprojection.
    pub remain_drtn_hr: f64,
    pub target_start: Option<NaiveDateTime>,
    pub target_end: Option<NaiveDateTime>,
    pub act_start: Option<NaiveDateTime>,
    pub act_end: Option<NaiveDateTime>,
    pub cstr_type: Option<ConstraintKind>,
    pub cstr_date: Option<NaiveDateTime>,
    pub cstr_type2: Option<ConstraintKind>,
    pub cstr_date2: Option<NaiveDateTime>,
}

impl Activity {
    pub fn new(
        task_id: impl Into<TaskId>,
        task_code: impl Into<String>,
        task_name: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            task_code: task_code.into(),
            task_name: task_name.into(),
            wbs_id: WbsId::new(),
            clndr_id: CalendarId::new(),
            task_type: TaskType::Task,
            status_code: String::new(),
            target_drtn_hr: 0.0,
            remain_drtn_hr: 0.0,
            target_start: None,
            target_end: None,
            act_start: None,
            act_end: None,
            cstr_type: None,
            cstr_date: None,
            cstr_type2: None,
            cstr_date2: None,
        }
    }

    /// Planned working duration in days; non-integer results truncate
    /// toward zero.
    pub fn planned_days(&self, hours_per_workday: f64) -> i64 {
        (self.target_drtn_hr / hours_per_workday).trunc() as i64
    }

    /// Remaining working duration in days.
    pub fn remaining_days(&self, hours_per_workday: f64) -> i64 {
        (self.remain_drtn_hr / hours_per_workday).trunc() as i64
    }

    /// Started on or before the data date.
    pub fn is_started_by(&self, data_date: NaiveDate) -> bool {
        self.act_start
            .map(|s| s.date() <= data_date)
            .unwrap_or(false)
    }

    /// Finished on or before the data date.
    pub fn is_completed_by(&self, data_date: NaiveDate) -> bool {
        self.act_end.map(|e| e.date() <= data_date).unwrap_or(false)
    }

    /// Primary then secondary constraint pairs, in application order.
    pub fn constraints(&self) -> [Option<(ConstraintKind, Option<NaiveDate>)>; 2] {
        [
            self.cstr_type
                .map(|kind| (kind, self.cstr_date.map(|d| d.date()))),
            self.cstr_type2
                .map(|kind| (kind, self.cstr_date2.map(|d| d.date()))),
        ]
    }

    /// The earliest date the activity is known by: actual start when
    /// recorded, planned start otherwise.
    pub fn earliest_reference(&self) -> Option<NaiveDate> {
        self.act_start.or(self.target_start).map(|d| d.date())
    }
}

/// A logic edge between two activities.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub pred_task_id: TaskId,
    pub succ_task_id: TaskId,
    pub kind: RelationKind,
    /// Signed lag in hours.
    pub lag_hr: f64,
}

impl Relationship {
    /// Lag as a signed working-day offset, truncated toward zero.
    pub fn lag_days(&self, hours_per_workday: f64) -> i64 {
        (self.lag_hr / hours_per_workday).trunc() as i64
    }
}

// ============================================================================
// Raw Tables
// ============================================================================

/// A rectangular record set from the tabular file, kept verbatim so
/// serialization is lossless for tables and columns the engine never touches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }

    /// Overwrite one cell. Returns false when the column or row is absent.
    pub fn set_value(&mut self, row: usize, column: &str, value: String) -> bool {
        let Some(idx) = self.column_index(column) else {
            return false;
        };
        match self.rows.get_mut(row).and_then(|r| r.get_mut(idx)) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Index of the first row whose `key_column` equals `key`.
    pub fn find_row(&self, key_column: &str, key: &str) -> Option<usize> {
        let idx = self.column_index(key_column)?;
        self.rows
            .iter()
            .position(|row| row.get(idx).map(String::as_str) == Some(key))
    }
}

// ============================================================================
// Document
// ============================================================================

/// The entity model: typed views over the tables the engine uses, plus every
/// raw table in file order for round-trip serialization.
#[derive(Clone, Debug, Default)]
pub struct XerDocument {
    /// ERMHDR values, verbatim.
    pub header: Vec<String>,
    /// Every table from the file, in order.
    pub tables: Vec<Table>,
    pub projects: Vec<Project>,
    pub wbs_nodes: Vec<WbsNode>,
    pub activities: Vec<Activity>,
    pub relationships: Vec<Relationship>,
    pub calendars: Vec<Calendar>,
    task_index: HashMap<TaskId, usize>,
    wbs_index: HashMap<WbsId, usize>,
    cal_index: HashMap<CalendarId, usize>,
}

impl XerDocument {
    /// Assemble the document and its lookup indices. The typed vectors must
    /// already be internally consistent; validation happens at construction
    /// in the parser.
    pub fn assemble(
        header: Vec<String>,
        tables: Vec<Table>,
        projects: Vec<Project>,
        wbs_nodes: Vec<WbsNode>,
        activities: Vec<Activity>,
        relationships: Vec<Relationship>,
        calendars: Vec<Calendar>,
    ) -> Self {
        let task_index = activities
            .iter()
            .enumerate()
            .map(|(i, a)| (a.task_id.clone(), i))
            .collect();
        let wbs_index = wbs_nodes
            .iter()
            .enumerate()
            .map(|(i, w)| (w.wbs_id.clone(), i))
            .collect();
        let cal_index = calendars
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clndr_id.clone(), i))
            .collect();
        Self {
            header,
            tables,
            projects,
            wbs_nodes,
            activities,
            relationships,
            calendars,
            task_index,
            wbs_index,
            cal_index,
        }
    }

    /// The owning project (first project row).
    pub fn project(&self) -> Option<&Project> {
        self.projects.first()
    }

    pub fn project_mut(&mut self) -> Option<&mut Project> {
        self.projects.first_mut()
    }

    /// The data date the schedule is current to.
    pub fn data_date(&self) -> Option<NaiveDate> {
        self.project().map(|p| p.last_recalc.date())
    }

    pub fn plan_start(&self) -> Option<NaiveDate> {
        self.project().map(|p| p.plan_start.date())
    }

    pub fn activity(&self, task_id: &str) -> Option<&Activity> {
        self.task_index
            .get(task_id)
            .map(|&i| &self.activities[i])
    }

    pub fn activity_mut(&mut self, task_id: &str) -> Option<&mut Activity> {
        let idx = *self.task_index.get(task_id)?;
        self.activities.get_mut(idx)
    }

    /// Activities keyed by their human-visible code.
    pub fn activities_by_code(&self) -> HashMap<&str, &Activity> {
        self.activities
            .iter()
            .map(|a| (a.task_code.as_str(), a))
            .collect()
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn calendar(&self, clndr_id: &str) -> Option<&Calendar> {
        self.cal_index
            .get(clndr_id)
            .map(|&i| &self.calendars[i])
    }

    pub fn wbs(&self, wbs_id: &str) -> Option<&WbsNode> {
        self.wbs_index.get(wbs_id).map(|&i| &self.wbs_nodes[i])
    }

    /// Roots of the WBS forest: project nodes and orphans.
    pub fn wbs_roots(&self) -> Vec<&WbsNode> {
        self.wbs_nodes
            .iter()
            .filter(|n| {
                n.is_project_node
                    || n.parent_wbs_id
                        .as_deref()
                        .map(|p| !self.wbs_index.contains_key(p))
                        .unwrap_or(true)
            })
            .collect()
    }

    pub fn wbs_children(&self, wbs_id: &str) -> Vec<&WbsNode> {
        self.wbs_nodes
            .iter()
            .filter(|n| n.parent_wbs_id.as_deref() == Some(wbs_id))
            .collect()
    }

    /// The given node plus every descendant, depth first.
    pub fn wbs_subtree(&self, wbs_id: &str) -> Vec<WbsId> {
        let mut result = Vec::new();
        let mut stack = vec![wbs_id.to_string()];
        while let Some(current) = stack.pop() {
            for child in self.wbs_children(&current) {
                stack.push(child.wbs_id.clone());
            }
            result.push(current);
        }
        result
    }

    /// Dot-join of the `short_name` chain from a project node (exclusive)
    /// down to the node (inclusive).
    pub fn wbs_full_code(&self, wbs_id: &str) -> Option<String> {
        let mut chain = Vec::new();
        let mut current = self.wbs(wbs_id)?;
        let mut hops = 0;
        while !current.is_project_node {
            chain.push(current.short_name.clone());
            hops += 1;
            if hops > self.wbs_nodes.len() {
                // Parent chain does not terminate; treat what we have as the code.
                break;
            }
            match current.parent_wbs_id.as_deref().and_then(|p| self.wbs(p)) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        chain.reverse();
        Some(chain.join("."))
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    /// Write the columns the engine owns back into the raw tables so the
    /// serializer reproduces the mutated entity state: actual dates and
    /// remaining duration on TASK, the recalc date on PROJECT.
    pub fn sync_entity_columns(&mut self) {
        let updates: Vec<(TaskId, Option<NaiveDateTime>, Option<NaiveDateTime>, f64)> = self
            .activities
            .iter()
            .map(|a| (a.task_id.clone(), a.act_start, a.act_end, a.remain_drtn_hr))
            .collect();
        if let Some(table) = self.table_mut("TASK") {
            for (task_id, act_start, act_end, remain_hr) in updates {
                let Some(row) = table.find_row("task_id", &task_id) else {
                    continue;
                };
                table.set_value(
                    row,
                    "act_start_date",
                    act_start.map(format_xer_date).unwrap_or_default(),
                );
                table.set_value(
                    row,
                    "act_end_date",
                    act_end.map(format_xer_date).unwrap_or_default(),
                );
                table.set_value(row, "remain_drtn_hr_cnt", format_xer_number(remain_hr));
            }
        }

        let recalcs: Vec<(ProjId, NaiveDateTime)> = self
            .projects
            .iter()
            .map(|p| (p.proj_id.clone(), p.last_recalc))
            .collect();
        if let Some(table) = self.table_mut("PROJECT") {
            for (proj_id, last_recalc) in recalcs {
                let Some(row) = table.find_row("proj_id", &proj_id) else {
                    continue;
                };
                table.set_value(row, "last_recalc_date", format_xer_date(last_recalc));
            }
        }
    }
}

// ============================================================================
// Schedule Results
// ============================================================================

/// Dates the CPM engine derived for one activity. Any of them may be absent
/// when the activity could not be scheduled; the engine records a diagnostic
/// rather than inventing a value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDates {
    pub early_start: Option<NaiveDate>,
    pub early_finish: Option<NaiveDate>,
    pub late_start: Option<NaiveDate>,
    pub late_finish: Option<NaiveDate>,
    /// Working-day float; `None` for level-of-effort and unscheduled
    /// activities.
    pub total_float_days: Option<i64>,
    pub is_critical: bool,
}

/// Schedule-result table for one CPM invocation, keyed by `task_id`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScheduleResults {
    pub dates: HashMap<TaskId, ScheduleDates>,
    /// Ordered critical path: completed activities first, then the remainder
    /// in topological order.
    pub critical_path: Vec<TaskId>,
    /// Maximum early finish over all scheduled activities.
    pub project_finish: Option<NaiveDate>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ScheduleResults {
    pub fn dates_for(&self, task_id: &str) -> Option<&ScheduleDates> {
        self.dates.get(task_id)
    }

    pub fn is_critical(&self, task_id: &str) -> bool {
        self.dates_for(task_id).map(|d| d.is_critical).unwrap_or(false)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Fatal error taxonomy. Non-fatal findings travel as [`Diagnostic`]s next
/// to the result instead.
#[derive(Debug, Error)]
pub enum XerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed XER file: {0}")]
    MalformedFile(String),

    #[error("schema validation failed: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    #[error("activity logic contains {} cycle(s): {}", .0.len(), format_cycles(.0))]
    CycleDetected(Vec<Vec<TaskId>>),

    #[error("window start {0} is not before window end {1}")]
    InvalidWindow(NaiveDate, NaiveDate),
}

fn format_cycles(cycles: &[Vec<TaskId>]) -> String {
    cycles
        .iter()
        .map(|cycle| cycle.join(" -> "))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Tests
// ============================================================================
