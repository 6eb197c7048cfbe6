//! Entity construction over the raw tables.
//!
//! Builds the typed views the engine uses (PROJECT, PROJWBS, TASK, TASKPRED,
//! CALENDAR) and validates referential integrity. Violations are collected,
//! not thrown one at a time: construction either fails with the full list or
//! succeeds with an empty one. Non-fatal findings (unknown task types,
//! dropped calendar blocks) come back as diagnostics next to the document.

use std::collections::HashSet;

use xersched_core::{
    parse_xer_date, parse_xer_number, Activity, Calendar, ConstraintKind, DiagCode, Diagnostic,
    Project, Relationship, RelationKind, Table, TaskType, WbsNode, XerDocument, XerError,
};

use crate::calendar::decode_calendar;
use crate::tabular::TabularFile;

/// A parsed document plus everything non-fatal the parse had to say.
#[derive(Debug)]
pub struct ParseOutcome {
    pub document: XerDocument,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build the typed document from a tabular file.
pub fn build_document(file: TabularFile) -> Result<ParseOutcome, XerError> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut violations: Vec<String> = Vec::new();

    let projects = build_projects(file.table("PROJECT"), &mut violations);
    let wbs_nodes = build_wbs(file.table("PROJWBS"), &mut violations);
    let calendars = build_calendars(file.table("CALENDAR"), &mut violations, &mut diagnostics);
    let activities = build_activities(file.table("TASK"), &mut violations, &mut diagnostics);
    let relationships = build_relationships(file.table("TASKPRED"), &mut violations);

    // Referential integrity over the assembled sets.
    let wbs_ids: HashSet<&str> = wbs_nodes.iter().map(|w| w.wbs_id.as_str()).collect();
    let cal_ids: HashSet<&str> = calendars.iter().map(|c| c.clndr_id.as_str()).collect();
    let task_ids: HashSet<&str> = activities.iter().map(|a| a.task_id.as_str()).collect();

    for activity in &activities {
        if !wbs_ids.contains(activity.wbs_id.as_str()) {
            violations.push(format!(
                "activity {} references missing WBS node {}",
                activity.task_id, activity.wbs_id
            ));
        }
        if !cal_ids.contains(activity.clndr_id.as_str()) {
            violations.push(format!(
                "activity {} references missing calendar {}",
                activity.task_id, activity.clndr_id
            ));
        }
    }
    for rel in &relationships {
        if !task_ids.contains(rel.pred_task_id.as_str()) {
            violations.push(format!(
                "relationship references missing predecessor {}",
                rel.pred_task_id
            ));
        }
        if !task_ids.contains(rel.succ_task_id.as_str()) {
            violations.push(format!(
                "relationship references missing successor {}",
                rel.succ_task_id
            ));
        }
    }

    if !violations.is_empty() {
        return Err(XerError::SchemaViolation(violations));
    }

    let document = XerDocument::assemble(
        file.header,
        file.tables,
        projects,
        wbs_nodes,
        activities,
        relationships,
        calendars,
    );
    Ok(ParseOutcome {
        document,
        diagnostics,
    })
}

/// Check the columns a table must carry; one violation per missing column.
fn require_columns(table: &Table, required: &[&str], violations: &mut Vec<String>) -> bool {
    let mut complete = true;
    for column in required {
        if table.column_index(column).is_none() {
            violations.push(format!(
                "table {} is missing required column {}",
                table.name, column
            ));
            complete = false;
        }
    }
    complete
}

fn build_projects(table: Option<&Table>, violations: &mut Vec<String>) -> Vec<Project> {
    let Some(table) = table else {
        violations.push("PROJECT table is missing".into());
        return Vec::new();
    };
    if !require_columns(
        table,
        &["proj_id", "plan_start_date", "last_recalc_date"],
        violations,
    ) {
        return Vec::new();
    }

    let mut projects = Vec::new();
    for row in 0..table.rows.len() {
        let proj_id = table.value(row, "proj_id").unwrap_or("").to_string();
        let plan_start = parse_xer_date(table.value(row, "plan_start_date").unwrap_or(""));
        let last_recalc = parse_xer_date(table.value(row, "last_recalc_date").unwrap_or(""));
        let (Some(plan_start), Some(last_recalc)) = (plan_start, last_recalc) else {
            violations.push(format!(
                "project {} is missing plan_start_date or last_recalc_date",
                proj_id
            ));
            continue;
        };
        projects.push(Project {
            proj_id,
            short_name: table.value(row, "proj_short_name").unwrap_or("").to_string(),
            plan_start,
            last_recalc,
        });
    }
    if projects.is_empty() {
        violations.push("PROJECT table has no usable project row".into());
    }
    projects
}

fn build_wbs(table: Option<&Table>, violations: &mut Vec<String>) -> Vec<WbsNode> {
    let Some(table) = table else {
        return Vec::new();
    };
    if !require_columns(table, &["wbs_id", "wbs_short_name"], violations) {
        return Vec::new();
    }

    (0..table.rows.len())
        .map(|row| {
            let parent = table.value(row, "parent_wbs_id").unwrap_or("");
            WbsNode {
                wbs_id: table.value(row, "wbs_id").unwrap_or("").to_string(),
                short_name: table.value(row, "wbs_short_name").unwrap_or("").to_string(),
                name: table.value(row, "wbs_name").unwrap_or("").to_string(),
                parent_wbs_id: (!parent.is_empty()).then(|| parent.to_string()),
                is_project_node: table.value(row, "proj_node_flag").unwrap_or("") == "Y",
            }
        })
        .collect()
}

fn build_calendars(
    table: Option<&Table>,
    violations: &mut Vec<String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Calendar> {
    let Some(table) = table else {
        return Vec::new();
    };
    if !require_columns(table, &["clndr_id", "clndr_data"], violations) {
        return Vec::new();
    }

    (0..table.rows.len())
        .map(|row| {
            decode_calendar(
                table.value(row, "clndr_id").unwrap_or(""),
                table.value(row, "clndr_name").unwrap_or(""),
                table.value(row, "clndr_data").unwrap_or(""),
                diagnostics,
            )
        })
        .collect()
}

fn build_activities(
    table: Option<&Table>,
    violations: &mut Vec<String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Activity> {
    let Some(table) = table else {
        return Vec::new();
    };
    if !require_columns(
        table,
        &[
            "task_id",
            "task_code",
            "task_name",
            "wbs_id",
            "clndr_id",
            "task_type",
            "target_drtn_hr_cnt",
        ],
        violations,
    ) {
        return Vec::new();
    }

    let mut activities = Vec::new();
    for row in 0..table.rows.len() {
        let task_id = table.value(row, "task_id").unwrap_or("").to_string();
        let type_code = table.value(row, "task_type").unwrap_or("");
        let task_type = match TaskType::from_code(type_code) {
            Some(t) => t,
            None => {
                diagnostics.push(
                    Diagnostic::warning(
                        DiagCode::UnknownTaskType,
                        format!(
                            "activity {}: unknown task type {:?}, scheduling as Task",
                            task_id, type_code
                        ),
                    )
                    .with_task(task_id.clone()),
                );
                TaskType::Task
            }
        };

        let mut activity = Activity::new(
            task_id.clone(),
            table.value(row, "task_code").unwrap_or(""),
            table.value(row, "task_name").unwrap_or(""),
        );
        activity.wbs_id = table.value(row, "wbs_id").unwrap_or("").to_string();
        activity.clndr_id = table.value(row, "clndr_id").unwrap_or("").to_string();
        activity.task_type = task_type;
        activity.status_code = table.value(row, "status_code").unwrap_or("").to_string();
        activity.target_drtn_hr =
            parse_xer_number(table.value(row, "target_drtn_hr_cnt").unwrap_or(""));
        activity.remain_drtn_hr =
            parse_xer_number(table.value(row, "remain_drtn_hr_cnt").unwrap_or(""));
        activity.target_start = parse_xer_date(table.value(row, "target_start_date").unwrap_or(""));
        activity.target_end = parse_xer_date(table.value(row, "target_end_date").unwrap_or(""));
        activity.act_start = parse_xer_date(table.value(row, "act_start_date").unwrap_or(""));
        activity.act_end = parse_xer_date(table.value(row, "act_end_date").unwrap_or(""));

        let (cstr_type, cstr_date) = parse_constraint(
            table.value(row, "cstr_type").unwrap_or(""),
            table.value(row, "cstr_date").unwrap_or(""),
            &task_id,
            diagnostics,
        );
        let (cstr_type2, cstr_date2) = parse_constraint(
            table.value(row, "cstr_type2").unwrap_or(""),
            table.value(row, "cstr_date2").unwrap_or(""),
            &task_id,
            diagnostics,
        );
        activity.cstr_type = cstr_type;
        activity.cstr_date = cstr_date;
        activity.cstr_type2 = cstr_type2;
        activity.cstr_date2 = cstr_date2;

        if activity.act_end.is_some() {
            match activity.act_start {
                Some(start) if start <= activity.act_end.unwrap_or(start) => {}
                _ => violations.push(format!(
                    "activity {} has an actual finish without a consistent actual start",
                    task_id
                )),
            }
        }

        activities.push(activity);
    }
    activities
}

fn parse_constraint(
    type_code: &str,
    date_text: &str,
    task_id: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> (Option<ConstraintKind>, Option<chrono::NaiveDateTime>) {
    if type_code.trim().is_empty() {
        return (None, None);
    }
    match ConstraintKind::from_code(type_code) {
        Some(kind) => (Some(kind), parse_xer_date(date_text)),
        None => {
            diagnostics.push(
                Diagnostic::warning(
                    DiagCode::UnknownConstraint,
                    format!(
                        "activity {}: unknown constraint {:?} ignored",
                        task_id, type_code
                    ),
                )
                .with_task(task_id.to_string()),
            );
            (None, None)
        }
    }
}

fn build_relationships(table: Option<&Table>, violations: &mut Vec<String>) -> Vec<Relationship> {
    let Some(table) = table else {
        return Vec::new();
    };
    if !require_columns(table, &["task_id", "pred_task_id", "pred_type"], violations) {
        return Vec::new();
    }

    let mut relationships = Vec::new();
    for row in 0..table.rows.len() {
        let pred = table.value(row, "pred_task_id").unwrap_or("").to_string();
        let succ = table.value(row, "task_id").unwrap_or("").to_string();
        let type_code = table.value(row, "pred_type").unwrap_or("");

        let Some(kind) = RelationKind::from_code(type_code) else {
            violations.push(format!(
                "relationship {} -> {} has unknown kind {:?}",
                pred, succ, type_code
            ));
            continue;
        };
        if pred == succ {
            violations.push(format!("relationship {} -> {} is a self-loop", pred, succ));
            continue;
        }
        relationships.push(Relationship {
            pred_task_id: pred,
            succ_task_id: succ,
            kind,
            lag_hr: parse_xer_number(table.value(row, "lag_hr_cnt").unwrap_or("")),
        });
    }
    relationships
}
