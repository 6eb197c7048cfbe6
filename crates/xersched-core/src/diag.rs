//! Collected diagnostics.
//!
//! Non-fatal findings (dropped calendar sub-blocks, constraint conflicts,
//! activities that could not be scheduled) are accumulated and handed back
//! next to the result value. Callers never have to catch anything to learn
//! about a warning.

use serde::{Deserialize, Serialize};

use crate::TaskId;

/// How bad a diagnostic is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Machine-readable diagnostic category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagCode {
    /// A weekday or exception sub-block in a calendar body could not be decoded.
    CalendarParse,
    /// A serial or user-supplied date fell outside the supported range.
    DateOutOfRange,
    /// A task type code was not recognised; the activity schedules as Task.
    UnknownTaskType,
    /// A constraint code was not recognised; the constraint is ignored.
    UnknownConstraint,
    /// ES > LF after constraints, or a constraint date violates a predecessor.
    ConstraintConflict,
    /// The activity lacks early or late dates after both passes.
    Unscheduled,
    /// The activity logic contains one or more cycles.
    CycleDetected,
    /// The critical path does not reach the project bounds or has a gap.
    CriticalPathShape,
}

impl DiagCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagCode::CalendarParse => "calendar-parse",
            DiagCode::DateOutOfRange => "date-out-of-range",
            DiagCode::UnknownTaskType => "unknown-task-type",
            DiagCode::UnknownConstraint => "unknown-constraint",
            DiagCode::ConstraintConflict => "constraint-conflict",
            DiagCode::Unscheduled => "unscheduled",
            DiagCode::CycleDetected => "cycle-detected",
            DiagCode::CriticalPathShape => "critical-path-shape",
        }
    }
}

/// A single collected finding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagCode,
    pub message: String,
    /// Activity the finding is attached to, when there is one.
    pub task_id: Option<TaskId>,
}

impl Diagnostic {
    pub fn info(code: DiagCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            code,
            message: message.into(),
            task_id: None,
        }
    }

    pub fn warning(code: DiagCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            task_id: None,
        }
    }

    pub fn error(code: DiagCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            task_id: None,
        }
    }

    pub fn with_task(mut self, task_id: impl Into<TaskId>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.task_id {
            Some(task) => write!(
                f,
                "{}[{}] {} ({})",
                self.severity.as_str(),
                self.code.as_str(),
                self.message,
                task
            ),
            None => write!(
                f,
                "{}[{}] {}",
                self.severity.as_str(),
                self.code.as_str(),
                self.message
            ),
        }
    }
}
