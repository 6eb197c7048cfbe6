//! Total-float CPM engine.
//!
//! Forward and backward passes over the activity logic graph in working-day
//! date arithmetic, honouring the four relationship kinds, lags, the nine
//! constraint kinds, in-progress actuals, and task-type specializations.
//! Level-of-effort spans and WBS-summary bounds are resolved in deferred
//! steps after the main traversals. Everything the engine has to say about
//! individual activities lands on the schedule-result table as diagnostics;
//! only cycles (under the default refusal policy) abort the run.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;

use xersched_core::{
    CalendarIndex, ConstraintKind, DiagCode, Diagnostic, RelationKind, ScheduleDates,
    ScheduleResults, TaskId, XerDocument, XerError,
};

use crate::graph::{ActivityGraph, ActivityNode, CycleRepair, LogicEdge};
use crate::workdays::WorkingDayCalculator;

/// Knobs for one scheduling run.
#[derive(Clone, Copy, Debug)]
pub struct SchedulerOptions {
    /// Conversion factor between stored duration hours and working days.
    pub hours_per_workday: f64,
    /// Activities with total float at or under this value are critical.
    pub float_threshold: i64,
    /// Cycle handling policy.
    pub cycle_repair: CycleRepair,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            hours_per_workday: 8.0,
            float_threshold: 0,
            cycle_repair: CycleRepair::Refuse,
        }
    }
}

/// The CPM scheduler. Borrows the entity snapshot immutably for the length
/// of a pass and writes derived state into a fresh schedule-result table.
pub struct TotalFloatScheduler<'a> {
    calc: WorkingDayCalculator<'a>,
    options: SchedulerOptions,
}

impl<'a> TotalFloatScheduler<'a> {
    pub fn new(index: &'a CalendarIndex) -> Self {
        Self {
            calc: WorkingDayCalculator::new(index),
            options: SchedulerOptions::default(),
        }
    }

    pub fn with_options(index: &'a CalendarIndex, options: SchedulerOptions) -> Self {
        Self {
            calc: WorkingDayCalculator::new(index),
            options,
        }
    }

    /// Run both passes and derive float and the critical path.
    pub fn schedule(&self, document: &XerDocument) -> Result<ScheduleResults, XerError> {
        let project = document.project().ok_or_else(|| {
            XerError::SchemaViolation(vec!["document has no project row".into()])
        })?;
        let data_date = project.last_recalc.date();
        let plan_start = project.plan_start.date();

        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let graph = ActivityGraph::build(
            document,
            self.options.hours_per_workday,
            self.options.cycle_repair,
            &mut diagnostics,
        )?;
        debug!(
            activities = graph.nodes.len(),
            data_date = %data_date,
            "starting CPM passes"
        );

        let mut pass = PassState::default();

        for task_id in &graph.topo_order {
            let Some(node) = graph.node(task_id) else {
                continue;
            };
            if node.task_type.is_loe() {
                continue;
            }
            self.forward_visit(node, &graph, data_date, plan_start, &mut pass, &mut diagnostics);
        }

        let project_finish = pass.ef.values().max().copied();

        for task_id in graph.topo_order.iter().rev() {
            let Some(node) = graph.node(task_id) else {
                continue;
            };
            if node.task_type.is_loe() {
                continue;
            }
            self.backward_visit(
                node,
                &graph,
                data_date,
                project_finish,
                &mut pass,
                &mut diagnostics,
            );
        }

        self.resolve_summaries(document, &graph, &mut pass);
        self.resolve_loe(&graph, data_date, project_finish, &mut pass);

        let results = self.collect_results(
            &graph,
            data_date,
            project_finish,
            &mut pass,
            diagnostics,
        );
        Ok(results)
    }

    fn forward_visit(
        &self,
        node: &ActivityNode,
        graph: &ActivityGraph,
        data_date: NaiveDate,
        plan_start: NaiveDate,
        pass: &mut PassState,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let id = node.task_id.clone();

        // Actuals at or before the data date pin the early dates.
        if let Some(act_start) = node.act_start.filter(|s| *s <= data_date) {
            pass.es.insert(id.clone(), act_start);
            if let Some(act_end) = node.act_end.filter(|e| *e <= data_date) {
                pass.ef.insert(id, act_end);
            } else {
                match self
                    .calc
                    .add_working_days(act_start, node.duration_days, &node.clndr_id)
                {
                    Some(finish) => {
                        pass.ef.insert(id, finish.max(data_date));
                    }
                    None => pass.note_unscheduled(node, diagnostics),
                }
            }
            return;
        }

        let mut candidates: Vec<NaiveDate> = Vec::new();
        for edge in graph.predecessors_of(&id) {
            let Some(pred) = graph.node(&edge.pred) else {
                continue;
            };
            if pred.task_type.is_loe() {
                continue;
            }
            if let Some(candidate) = self.forward_candidate(edge, node, pass) {
                candidates.push(candidate);
            }
        }

        let logic_start = match candidates.into_iter().max() {
            Some(candidate) => candidate.max(data_date),
            None => plan_start.max(data_date),
        };
        let early_start = self.apply_start_constraints(node, logic_start, diagnostics);

        let early_finish = if node.task_type.is_milestone() {
            Some(early_start)
        } else {
            self.calc
                .add_working_days(early_start, node.duration_days, &node.clndr_id)
        };
        match early_finish {
            Some(finish) => {
                pass.es.insert(id.clone(), early_start);
                pass.ef.insert(id, finish);
            }
            None => pass.note_unscheduled(node, diagnostics),
        }
    }

    /// Candidate ES imposed by one incoming edge, stepped on the successor's
    /// calendar. Finish-kind constraints convert to a start by walking the
    /// successor duration back.
    fn forward_candidate(
        &self,
        edge: &LogicEdge,
        node: &ActivityNode,
        pass: &PassState,
    ) -> Option<NaiveDate> {
        let calc = &self.calc;
        let cal = &node.clndr_id;
        match edge.kind {
            RelationKind::Fs => {
                let pred_ef = *pass.ef.get(&edge.pred)?;
                calc.add_working_days(pred_ef, edge.lag_days, cal)
            }
            RelationKind::Ss => {
                let pred_es = *pass.es.get(&edge.pred)?;
                calc.add_working_days(pred_es, edge.lag_days, cal)
            }
            RelationKind::Ff => {
                let pred_ef = *pass.ef.get(&edge.pred)?;
                calc.add_working_days(pred_ef, edge.lag_days - node.duration_days, cal)
            }
            RelationKind::Sf => {
                let pred_es = *pass.es.get(&edge.pred)?;
                calc.add_working_days(pred_es, edge.lag_days - node.duration_days, cal)
            }
        }
    }

    /// Primary then secondary; the later can only further restrict.
    fn apply_start_constraints(
        &self,
        node: &ActivityNode,
        logic_start: NaiveDate,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> NaiveDate {
        let mut early_start = logic_start;
        for constraint in node.constraints.iter().flatten() {
            let (kind, date) = *constraint;
            match kind {
                ConstraintKind::MandatoryStart | ConstraintKind::StartOn => {
                    if let Some(date) = date {
                        early_start = date;
                    }
                }
                ConstraintKind::StartOnOrAfter => {
                    if let Some(date) = date {
                        early_start = early_start.max(date);
                    }
                }
                ConstraintKind::StartOnOrBefore => {
                    if let Some(date) = date {
                        early_start = early_start.min(date);
                    }
                }
                ConstraintKind::AsLateAsPossible => {
                    // No hard date effect; flag the combination with a date
                    // anchor in the other slot for review, whichever slot
                    // the preference itself occupies.
                    let paired_with_date = node.constraints.iter().flatten().any(|(k, d)| {
                        *k != ConstraintKind::AsLateAsPossible && d.is_some()
                    });
                    if paired_with_date {
                        diagnostics.push(
                            Diagnostic::info(
                                DiagCode::ConstraintConflict,
                                format!(
                                    "activity {}: as-late-as-possible combined with a date constraint",
                                    node.task_id
                                ),
                            )
                            .with_task(node.task_id.clone()),
                        );
                    }
                }
                _ => {}
            }
        }
        if early_start < logic_start {
            diagnostics.push(
                Diagnostic::warning(
                    DiagCode::ConstraintConflict,
                    format!(
                        "activity {}: constraint start {} precedes the logic-derived start {}",
                        node.task_id, early_start, logic_start
                    ),
                )
                .with_task(node.task_id.clone()),
            );
        }
        early_start
    }

    fn backward_visit(
        &self,
        node: &ActivityNode,
        graph: &ActivityGraph,
        data_date: NaiveDate,
        project_finish: Option<NaiveDate>,
        pass: &mut PassState,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let id = node.task_id.clone();

        if let Some(act_start) = node.act_start.filter(|s| *s <= data_date) {
            if let Some(act_end) = node.act_end.filter(|e| *e <= data_date) {
                pass.lf.insert(id.clone(), act_end);
                pass.ls.insert(id, act_start);
            } else {
                // In progress: the late dates collapse onto the early ones.
                pass.ls.insert(id.clone(), act_start);
                if let Some(finish) = pass.ef.get(&id).copied() {
                    pass.lf.insert(id, finish);
                } else {
                    pass.note_unscheduled(node, diagnostics);
                }
            }
            return;
        }

        let Some(fallback_finish) = project_finish else {
            pass.note_unscheduled(node, diagnostics);
            return;
        };

        let mut candidates: Vec<NaiveDate> = Vec::new();
        for edge in graph.successors_of(&id) {
            let Some(succ) = graph.node(&edge.succ) else {
                continue;
            };
            if succ.task_type.is_loe() {
                continue;
            }
            if let Some(candidate) = self.backward_candidate(edge, node, pass) {
                candidates.push(candidate);
            }
        }

        let logic_finish = candidates.into_iter().min().unwrap_or(fallback_finish);
        let late_finish = self.apply_finish_constraints(node, logic_finish, diagnostics);

        let late_start = if node.task_type.is_milestone() {
            Some(late_finish)
        } else {
            self.calc
                .add_working_days(late_finish, -node.duration_days, &node.clndr_id)
        };
        let Some(late_start) = late_start else {
            pass.note_unscheduled(node, diagnostics);
            return;
        };

        // Not-started work cannot be scheduled before the data date.
        let late_start = late_start.max(data_date);
        let late_finish = late_finish.max(data_date);
        pass.ls.insert(id.clone(), late_start);
        pass.lf.insert(id.clone(), late_finish);

        if let Some(early_start) = pass.es.get(&id) {
            if *early_start > late_finish {
                diagnostics.push(
                    Diagnostic::warning(
                        DiagCode::ConstraintConflict,
                        format!(
                            "activity {}: early start {} is after late finish {}",
                            id, early_start, late_finish
                        ),
                    )
                    .with_task(id),
                );
            }
        }
    }

    /// Candidate LF imposed by one outgoing edge, stepped on this node's
    /// calendar. Start-kind constraints convert to a finish by walking this
    /// node's duration forward.
    fn backward_candidate(
        &self,
        edge: &LogicEdge,
        node: &ActivityNode,
        pass: &PassState,
    ) -> Option<NaiveDate> {
        let calc = &self.calc;
        let cal = &node.clndr_id;
        match edge.kind {
            RelationKind::Fs => {
                let succ_ls = *pass.ls.get(&edge.succ)?;
                calc.add_working_days(succ_ls, -edge.lag_days, cal)
            }
            RelationKind::Ss => {
                let succ_ls = *pass.ls.get(&edge.succ)?;
                let bound = calc.add_working_days(succ_ls, -edge.lag_days, cal)?;
                calc.add_working_days(bound, node.duration_days, cal)
            }
            RelationKind::Ff => {
                let succ_lf = *pass.lf.get(&edge.succ)?;
                calc.add_working_days(succ_lf, -edge.lag_days, cal)
            }
            RelationKind::Sf => {
                let succ_lf = *pass.lf.get(&edge.succ)?;
                let bound = calc.add_working_days(succ_lf, -edge.lag_days, cal)?;
                calc.add_working_days(bound, node.duration_days, cal)
            }
        }
    }

    fn apply_finish_constraints(
        &self,
        node: &ActivityNode,
        logic_finish: NaiveDate,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> NaiveDate {
        let mut late_finish = logic_finish;
        for constraint in node.constraints.iter().flatten() {
            let (kind, date) = *constraint;
            match kind {
                ConstraintKind::MandatoryFinish | ConstraintKind::FinishOn => {
                    if let Some(date) = date {
                        late_finish = date;
                    }
                }
                ConstraintKind::FinishOnOrAfter => {
                    if let Some(date) = date {
                        late_finish = late_finish.max(date);
                    }
                }
                ConstraintKind::FinishOnOrBefore => {
                    if let Some(date) = date {
                        late_finish = late_finish.min(date);
                    }
                }
                _ => {}
            }
        }
        if late_finish > logic_finish {
            diagnostics.push(
                Diagnostic::warning(
                    DiagCode::ConstraintConflict,
                    format!(
                        "activity {}: constraint finish {} exceeds the logic-derived finish {}",
                        node.task_id, late_finish, logic_finish
                    ),
                )
                .with_task(node.task_id.clone()),
            );
        }
        late_finish
    }

    /// WBS-summary dates are bounds over their subtasks. The summary took
    /// part in the passes with zero duration (its logic edges still
    /// propagate); here its reported dates become the subtask envelope.
    fn resolve_summaries(
        &self,
        document: &XerDocument,
        graph: &ActivityGraph,
        pass: &mut PassState,
    ) {
        let summaries: Vec<&ActivityNode> = graph
            .nodes
            .iter()
            .filter(|n| n.task_type.is_wbs_summary())
            .collect();
        for summary in summaries {
            let subtree: HashSet<String> =
                document.wbs_subtree(&summary.wbs_id).into_iter().collect();
            let subtasks: Vec<&ActivityNode> = graph
                .nodes
                .iter()
                .filter(|n| {
                    n.task_id != summary.task_id
                        && !n.task_type.is_loe()
                        && !n.task_type.is_wbs_summary()
                        && subtree.contains(n.wbs_id.as_str())
                })
                .collect();
            if subtasks.is_empty() {
                continue;
            }

            let bound = |map: &HashMap<TaskId, NaiveDate>, min: bool| -> Option<NaiveDate> {
                let values = subtasks.iter().filter_map(|n| map.get(&n.task_id)).copied();
                if min {
                    values.min()
                } else {
                    values.max()
                }
            };
            if let Some(es) = bound(&pass.es, true) {
                pass.es.insert(summary.task_id.clone(), es);
            }
            if let Some(ef) = bound(&pass.ef, false) {
                pass.ef.insert(summary.task_id.clone(), ef);
            }
            if let Some(ls) = bound(&pass.ls, true) {
                pass.ls.insert(summary.task_id.clone(), ls);
            }
            if let Some(lf) = bound(&pass.lf, false) {
                pass.lf.insert(summary.task_id.clone(), lf);
            }
        }
    }

    /// Level-of-effort spans: start with the earliest predecessor, finish
    /// with the latest successor, data date and project finish as fallbacks.
    /// Late dates mirror the early ones; LOEs never drive neighbours.
    fn resolve_loe(
        &self,
        graph: &ActivityGraph,
        data_date: NaiveDate,
        project_finish: Option<NaiveDate>,
        pass: &mut PassState,
    ) {
        let loes: Vec<&ActivityNode> = graph
            .nodes
            .iter()
            .filter(|n| n.task_type.is_loe())
            .collect();
        for loe in loes {
            let start = graph
                .predecessors_of(&loe.task_id)
                .iter()
                .filter_map(|e| pass.es.get(&e.pred))
                .min()
                .copied()
                .unwrap_or(data_date);
            let finish = graph
                .successors_of(&loe.task_id)
                .iter()
                .filter_map(|e| pass.ef.get(&e.succ))
                .max()
                .copied()
                .or(project_finish)
                .unwrap_or(data_date)
                .max(start);

            pass.es.insert(loe.task_id.clone(), start);
            pass.ef.insert(loe.task_id.clone(), finish);
            pass.ls.insert(loe.task_id.clone(), start);
            pass.lf.insert(loe.task_id.clone(), finish);
        }
    }

    fn collect_results(
        &self,
        graph: &ActivityGraph,
        data_date: NaiveDate,
        project_finish: Option<NaiveDate>,
        pass: &mut PassState,
        mut diagnostics: Vec<Diagnostic>,
    ) -> ScheduleResults {
        let mut dates: HashMap<TaskId, ScheduleDates> = HashMap::new();
        let mut critical: Vec<&ActivityNode> = Vec::new();

        for node in &graph.nodes {
            let id = &node.task_id;
            let es = pass.es.get(id).copied();
            let ef = pass.ef.get(id).copied();
            let ls = pass.ls.get(id).copied();
            let lf = pass.lf.get(id).copied();

            let total_float_days = if node.task_type.is_loe() {
                // Spanning work; float is unbounded and stays off the path.
                None
            } else if node.act_start.map(|s| s <= data_date).unwrap_or(false) {
                // Started work has no room to move: late dates equal the
                // actuals, so LS - ES is zero for completed and in-progress
                // activities alike.
                Some(0)
            } else {
                match (es, ls) {
                    (Some(es), Some(ls)) => {
                        let anchor = es.max(data_date);
                        let offset =
                            self.calc.working_day_offset(anchor, ls, &node.clndr_id);
                        if offset.is_none() {
                            pass.note_unscheduled(node, &mut diagnostics);
                        }
                        offset
                    }
                    _ => {
                        pass.note_unscheduled(node, &mut diagnostics);
                        None
                    }
                }
            };

            let is_critical = !node.task_type.is_loe()
                && total_float_days
                    .map(|tf| tf <= self.options.float_threshold)
                    .unwrap_or(false);
            if is_critical {
                critical.push(node);
            }

            dates.insert(
                id.clone(),
                ScheduleDates {
                    early_start: es,
                    early_finish: ef,
                    late_start: ls,
                    late_finish: lf,
                    total_float_days,
                    is_critical,
                },
            );
        }

        // Completed criticals first in document order, the rest in
        // topological order over the critical set.
        let (mut completed, mut remaining): (Vec<&ActivityNode>, Vec<&ActivityNode>) = critical
            .into_iter()
            .partition(|n| n.act_end.map(|e| e <= data_date).unwrap_or(false));
        completed.sort_by_key(|n| n.doc_order);
        remaining.sort_by_key(|n| graph.topo_position(&n.task_id).unwrap_or(usize::MAX));
        let critical_path: Vec<TaskId> = completed
            .into_iter()
            .chain(remaining)
            .map(|n| n.task_id.clone())
            .collect();

        self.check_path_shape(graph, &critical_path, &mut diagnostics);

        ScheduleResults {
            dates,
            critical_path,
            project_finish,
            diagnostics,
        }
    }

    /// Warn when the path does not reach the project bounds or has a gap.
    fn check_path_shape(
        &self,
        graph: &ActivityGraph,
        path: &[TaskId],
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let (Some(first), Some(last)) = (path.first(), path.last()) else {
            return;
        };
        if !graph.predecessors_of(first).is_empty() {
            diagnostics.push(Diagnostic::warning(
                DiagCode::CriticalPathShape,
                format!("critical path starts at {} which has predecessors", first),
            ));
        }
        if !graph.successors_of(last).is_empty() {
            diagnostics.push(Diagnostic::warning(
                DiagCode::CriticalPathShape,
                format!("critical path ends at {} which has successors", last),
            ));
        }
        for pair in path.windows(2) {
            if !graph.has_edge(&pair[0], &pair[1]) {
                diagnostics.push(Diagnostic::warning(
                    DiagCode::CriticalPathShape,
                    format!(
                        "consecutive critical activities {} and {} are not directly linked",
                        pair[0], pair[1]
                    ),
                ));
            }
        }
    }
}

/// Mutable state threaded through the passes.
#[derive(Debug, Default)]
struct PassState {
    es: HashMap<TaskId, NaiveDate>,
    ef: HashMap<TaskId, NaiveDate>,
    ls: HashMap<TaskId, NaiveDate>,
    lf: HashMap<TaskId, NaiveDate>,
    unscheduled: HashSet<TaskId>,
}

impl PassState {
    fn note_unscheduled(&mut self, node: &ActivityNode, diagnostics: &mut Vec<Diagnostic>) {
        if self.unscheduled.insert(node.task_id.clone()) {
            diagnostics.push(
                Diagnostic::warning(
                    DiagCode::Unscheduled,
                    format!(
                        "activity {} could not be scheduled (calendar {} unavailable or dates out of range)",
                        node.task_id, node.clndr_id
                    ),
                )
                .with_task(node.task_id.clone()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use xersched_core::{Activity, Calendar, Project, Relationship, TaskType, TimeWindow};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dt(y: i32, m: u32, d: u32) -> chrono::NaiveDateTime {
        date(y, m, d).and_time(chrono::NaiveTime::MIN)
    }

    fn five_day(id: &str) -> Calendar {
        let hm = |h, m| chrono::NaiveTime::from_hms_opt(h, m, 0).unwrap();
        let mut cal = Calendar::new(id, "Standard");
        for weekday in 1..=5 {
            cal.weekdays
                .insert(weekday, vec![TimeWindow::new(hm(8, 0), hm(16, 0))]);
        }
        cal.weekdays.insert(6, Vec::new());
        cal.weekdays.insert(7, Vec::new());
        cal
    }

    fn task(id: &str, hours: f64) -> Activity {
        let mut a = Activity::new(id, format!("C{}", id), format!("Activity {}", id));
        a.target_drtn_hr = hours;
        a.remain_drtn_hr = hours;
        a.clndr_id = "c1".into();
        a
    }

    fn rel(pred: &str, succ: &str, kind: RelationKind, lag_hr: f64) -> Relationship {
        Relationship {
            pred_task_id: pred.into(),
            succ_task_id: succ.into(),
            kind,
            lag_hr,
        }
    }

    fn doc(
        plan_start: NaiveDate,
        data_date: NaiveDate,
        activities: Vec<Activity>,
        relationships: Vec<Relationship>,
    ) -> XerDocument {
        XerDocument::assemble(
            Vec::new(),
            Vec::new(),
            vec![Project {
                proj_id: "p1".into(),
                short_name: "P".into(),
                plan_start: plan_start.and_time(chrono::NaiveTime::MIN),
                last_recalc: data_date.and_time(chrono::NaiveTime::MIN),
            }],
            Vec::new(),
            activities,
            relationships,
            vec![five_day("c1")],
        )
    }

    fn run(document: &XerDocument) -> ScheduleResults {
        let index = CalendarIndex::build(&document.calendars);
        TotalFloatScheduler::new(&index)
            .schedule(document)
            .expect("schedules cleanly")
    }

    #[test]
    fn three_activity_fs_chain() {
        // A(5) -FS-> B(10) -FS,lag 2-> C(3), plan start Monday 2023-01-02
        let document = doc(
            date(2023, 1, 2),
            date(2023, 1, 2),
            vec![task("a", 40.0), task("b", 80.0), task("c", 24.0)],
            vec![
                rel("a", "b", RelationKind::Fs, 0.0),
                rel("b", "c", RelationKind::Fs, 16.0),
            ],
        );
        let results = run(&document);

        let a = results.dates_for("a").unwrap();
        let b = results.dates_for("b").unwrap();
        let c = results.dates_for("c").unwrap();

        assert_eq!(a.early_start, Some(date(2023, 1, 2)));
        assert_eq!(a.early_finish, Some(date(2023, 1, 9)));
        assert_eq!(b.early_start, Some(date(2023, 1, 9)));
        assert_eq!(b.early_finish, Some(date(2023, 1, 23)));
        assert_eq!(c.early_start, Some(date(2023, 1, 25)));
        assert_eq!(c.early_finish, Some(date(2023, 1, 30)));

        for id in ["a", "b", "c"] {
            assert_eq!(results.dates_for(id).unwrap().total_float_days, Some(0));
        }
        assert_eq!(results.critical_path, vec!["a", "b", "c"]);
        assert_eq!(results.project_finish, Some(date(2023, 1, 30)));
        assert!(results.diagnostics.is_empty());
    }

    #[test]
    fn pure_ff_dependency() {
        // A(4) -FF,lag 1-> B(2), plan start Wednesday 2023-02-01
        let document = doc(
            date(2023, 2, 1),
            date(2023, 2, 1),
            vec![task("a", 32.0), task("b", 16.0)],
            vec![rel("a", "b", RelationKind::Ff, 8.0)],
        );
        let results = run(&document);

        let a = results.dates_for("a").unwrap();
        let b = results.dates_for("b").unwrap();
        assert_eq!(a.early_finish, Some(date(2023, 2, 7)));
        assert_eq!(b.early_start, Some(date(2023, 2, 6)));
        assert_eq!(b.early_finish, Some(date(2023, 2, 8)));
    }

    #[test]
    fn start_on_or_after_constraint_overrides_logic() {
        // A(3) -FS-> B(2); start-on-or-after 2023-04-10 on B; a longer
        // parallel chain keeps the project end out at C so B gains float.
        let mut b = task("b", 16.0);
        b.cstr_type = Some(ConstraintKind::StartOnOrAfter);
        b.cstr_date = Some(dt(2023, 4, 10));
        let document = doc(
            date(2023, 4, 3),
            date(2023, 4, 1),
            vec![task("a", 24.0), b, task("c", 80.0)],
            vec![rel("a", "b", RelationKind::Fs, 0.0)],
        );
        let results = run(&document);

        let a = results.dates_for("a").unwrap();
        let b = results.dates_for("b").unwrap();
        assert_eq!(a.early_finish, Some(date(2023, 4, 6)));
        // Logic says 2023-04-06; the constraint floor wins.
        assert_eq!(b.early_start, Some(date(2023, 4, 10)));
        assert_eq!(b.early_finish, Some(date(2023, 4, 12)));
        assert!(b.total_float_days.unwrap() > 0);
        assert!(results.dates_for("c").unwrap().is_critical);
    }

    #[test]
    fn cycle_is_reported_and_nothing_schedules() {
        let document = doc(
            date(2023, 1, 2),
            date(2023, 1, 2),
            vec![task("a", 8.0), task("b", 8.0)],
            vec![
                rel("a", "b", RelationKind::Fs, 0.0),
                rel("b", "a", RelationKind::Fs, 0.0),
            ],
        );
        let index = CalendarIndex::build(&document.calendars);
        let err = TotalFloatScheduler::new(&index)
            .schedule(&document)
            .unwrap_err();
        match err {
            XerError::CycleDetected(cycles) => {
                assert_eq!(cycles, vec![vec!["a".to_string(), "b".into(), "a".into()]]);
            }
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn parallel_branch_carries_float() {
        // A(5) and B(3) both feed C(2); B can slip two working days.
        let document = doc(
            date(2023, 1, 2),
            date(2023, 1, 2),
            vec![task("a", 40.0), task("b", 24.0), task("c", 16.0)],
            vec![
                rel("a", "c", RelationKind::Fs, 0.0),
                rel("b", "c", RelationKind::Fs, 0.0),
            ],
        );
        let results = run(&document);

        assert_eq!(results.dates_for("a").unwrap().total_float_days, Some(0));
        assert_eq!(results.dates_for("b").unwrap().total_float_days, Some(2));
        assert!(!results.is_critical("b"));
        assert_eq!(results.critical_path, vec!["a", "c"]);
    }

    #[test]
    fn completed_actuals_pin_dates_and_zero_float() {
        let mut a = task("a", 40.0);
        a.act_start = Some(dt(2023, 1, 2));
        a.act_end = Some(dt(2023, 1, 5));
        let document = doc(
            date(2023, 1, 2),
            date(2023, 1, 9),
            vec![a, task("b", 16.0)],
            vec![rel("a", "b", RelationKind::Fs, 0.0)],
        );
        let results = run(&document);

        let a = results.dates_for("a").unwrap();
        assert_eq!(a.early_start, Some(date(2023, 1, 2)));
        assert_eq!(a.early_finish, Some(date(2023, 1, 5)));
        assert_eq!(a.late_start, Some(date(2023, 1, 2)));
        assert_eq!(a.late_finish, Some(date(2023, 1, 5)));
        assert_eq!(a.total_float_days, Some(0));

        // B starts from the actual finish but never before the data date.
        let b = results.dates_for("b").unwrap();
        assert_eq!(b.early_start, Some(date(2023, 1, 9)));
    }

    #[test]
    fn in_progress_finish_is_at_least_the_data_date() {
        let mut a = task("a", 16.0);
        a.act_start = Some(dt(2023, 1, 2));
        let document = doc(
            date(2023, 1, 2),
            date(2023, 1, 16),
            vec![a],
            Vec::new(),
        );
        let results = run(&document);

        let a = results.dates_for("a").unwrap();
        assert_eq!(a.early_start, Some(date(2023, 1, 2)));
        // Two working days from the actual start would be 2023-01-04; the
        // data date pushes the remaining work out.
        assert_eq!(a.early_finish, Some(date(2023, 1, 16)));
        assert_eq!(a.total_float_days, Some(0));
    }

    #[test]
    fn future_actuals_are_ignored() {
        let mut a = task("a", 16.0);
        a.act_start = Some(dt(2023, 2, 6));
        let document = doc(date(2023, 1, 2), date(2023, 1, 2), vec![a], Vec::new());
        let results = run(&document);

        // Scheduled from logic, not from the future actual.
        assert_eq!(
            results.dates_for("a").unwrap().early_start,
            Some(date(2023, 1, 2))
        );
    }

    #[test]
    fn milestones_have_equal_start_and_finish() {
        let mut m = task("m", 0.0);
        m.task_type = TaskType::FinishMilestone;
        let document = doc(
            date(2023, 1, 2),
            date(2023, 1, 2),
            vec![task("a", 40.0), m],
            vec![rel("a", "m", RelationKind::Fs, 0.0)],
        );
        let results = run(&document);

        let m = results.dates_for("m").unwrap();
        assert_eq!(m.early_start, m.early_finish);
        assert_eq!(m.early_start, Some(date(2023, 1, 9)));
        assert!(m.is_critical);
    }

    #[test]
    fn loe_spans_neighbours_and_stays_off_the_path() {
        let mut loe = task("loe", 160.0);
        loe.task_type = TaskType::LevelOfEffort;
        let document = doc(
            date(2023, 1, 2),
            date(2023, 1, 2),
            vec![task("a", 40.0), task("b", 16.0), loe],
            vec![
                rel("a", "b", RelationKind::Fs, 0.0),
                rel("a", "loe", RelationKind::Fs, 0.0),
                rel("loe", "b", RelationKind::Fs, 0.0),
            ],
        );
        let results = run(&document);

        let loe = results.dates_for("loe").unwrap();
        assert_eq!(loe.early_start, results.dates_for("a").unwrap().early_start);
        assert_eq!(loe.early_finish, results.dates_for("b").unwrap().early_finish);
        assert_eq!(loe.total_float_days, None);
        assert!(!results.critical_path.contains(&"loe".to_string()));
        // The LOE does not gate b; b follows a directly.
        assert_eq!(
            results.dates_for("b").unwrap().early_start,
            Some(date(2023, 1, 9))
        );
    }

    #[test]
    fn mandatory_start_pins_early_start() {
        let mut b = task("b", 16.0);
        b.cstr_type = Some(ConstraintKind::MandatoryStart);
        b.cstr_date = Some(dt(2023, 1, 4));
        let document = doc(
            date(2023, 1, 2),
            date(2023, 1, 2),
            vec![task("a", 40.0), b],
            vec![rel("a", "b", RelationKind::Fs, 0.0)],
        );
        let results = run(&document);

        // Logic says 2023-01-09; the pin drags the start back and the
        // conflict is recorded rather than thrown.
        assert_eq!(
            results.dates_for("b").unwrap().early_start,
            Some(date(2023, 1, 4))
        );
        assert!(results
            .diagnostics
            .iter()
            .any(|d| d.code == DiagCode::ConstraintConflict));
    }

    #[test]
    fn finish_on_or_before_restricts_late_finish() {
        let mut a = task("a", 40.0);
        a.cstr_type = Some(ConstraintKind::FinishOnOrBefore);
        a.cstr_date = Some(dt(2023, 1, 5));
        let document = doc(
            date(2023, 1, 2),
            date(2023, 1, 2),
            vec![a, task("b", 40.0)],
            Vec::new(),
        );
        let results = run(&document);

        // Without the ceiling the late finish would match the project end
        // (2023-01-09, set by the parallel activity).
        assert_eq!(
            results.dates_for("a").unwrap().late_finish,
            Some(date(2023, 1, 5))
        );
        assert_eq!(
            results.dates_for("b").unwrap().late_finish,
            Some(date(2023, 1, 9))
        );
    }

    #[test]
    fn wbs_summary_bounds_cover_subtasks() {
        use xersched_core::WbsNode;

        let mut summary = task("sum", 0.0);
        summary.task_type = TaskType::WbsSummary;
        summary.wbs_id = "w1".into();
        let mut a = task("a", 40.0);
        a.wbs_id = "w2".into();
        let mut b = task("b", 16.0);
        b.wbs_id = "w2".into();

        let mut document = doc(
            date(2023, 1, 2),
            date(2023, 1, 2),
            vec![summary, a, b],
            vec![rel("a", "b", RelationKind::Fs, 0.0)],
        );
        document.wbs_nodes = vec![
            WbsNode {
                wbs_id: "w1".into(),
                short_name: "TOP".into(),
                name: "Top".into(),
                parent_wbs_id: None,
                is_project_node: true,
            },
            WbsNode {
                wbs_id: "w2".into(),
                short_name: "SUB".into(),
                name: "Sub".into(),
                parent_wbs_id: Some("w1".into()),
                is_project_node: false,
            },
        ];
        let results = run(&document);

        let summary = results.dates_for("sum").unwrap();
        assert_eq!(summary.early_start, Some(date(2023, 1, 2)));
        assert_eq!(summary.early_finish, Some(date(2023, 1, 11)));
    }

    #[test]
    fn wbs_summary_logic_edges_use_placeholder_dates() {
        use xersched_core::WbsNode;

        // p -FS-> sum -FS-> b, with subtask a (five days) under the summary.
        // Neighbours of the summary see its zero-duration pass dates; only
        // the summary's own reported dates become the subtask envelope.
        let mut p = task("p", 8.0);
        p.wbs_id = "w3".into();
        let mut summary = task("sum", 0.0);
        summary.task_type = TaskType::WbsSummary;
        summary.wbs_id = "w1".into();
        let mut a = task("a", 40.0);
        a.wbs_id = "w2".into();
        let mut b = task("b", 16.0);
        b.wbs_id = "w3".into();

        let mut document = doc(
            date(2023, 1, 2),
            date(2023, 1, 2),
            vec![p, summary, a, b],
            vec![
                rel("p", "sum", RelationKind::Fs, 0.0),
                rel("sum", "b", RelationKind::Fs, 0.0),
            ],
        );
        document.wbs_nodes = vec![
            WbsNode {
                wbs_id: "w1".into(),
                short_name: "TOP".into(),
                name: "Top".into(),
                parent_wbs_id: None,
                is_project_node: true,
            },
            WbsNode {
                wbs_id: "w2".into(),
                short_name: "SUB".into(),
                name: "Sub".into(),
                parent_wbs_id: Some("w1".into()),
                is_project_node: false,
            },
            WbsNode {
                wbs_id: "w3".into(),
                short_name: "OTH".into(),
                name: "Other".into(),
                parent_wbs_id: None,
                is_project_node: false,
            },
        ];
        let results = run(&document);

        // Reported summary dates are the envelope of its one subtask.
        let summary = results.dates_for("sum").unwrap();
        assert_eq!(summary.early_start, Some(date(2023, 1, 2)));
        assert_eq!(summary.early_finish, Some(date(2023, 1, 9)));
        assert_eq!(summary.late_finish, Some(date(2023, 1, 9)));

        // The successor started from the summary's pass-time finish
        // (2023-01-03, one day after p), not the 2023-01-09 envelope.
        let b = results.dates_for("b").unwrap();
        assert_eq!(b.early_start, Some(date(2023, 1, 3)));
        assert_eq!(b.early_finish, Some(date(2023, 1, 5)));

        // The predecessor's late finish came from the summary's pass-time
        // late start (2023-01-05, driven by b), not the envelope's 01-02.
        let p = results.dates_for("p").unwrap();
        assert_eq!(p.late_finish, Some(date(2023, 1, 5)));
        assert_eq!(p.late_start, Some(date(2023, 1, 4)));
    }

    #[test]
    fn alap_in_either_slot_flags_a_paired_date_anchor() {
        // Preference in the secondary slot, date anchor in the primary.
        let mut a = task("a", 16.0);
        a.cstr_type = Some(ConstraintKind::StartOnOrAfter);
        a.cstr_date = Some(dt(2023, 1, 4));
        a.cstr_type2 = Some(ConstraintKind::AsLateAsPossible);
        let document = doc(date(2023, 1, 2), date(2023, 1, 2), vec![a], Vec::new());
        let results = run(&document);

        assert_eq!(
            results.dates_for("a").unwrap().early_start,
            Some(date(2023, 1, 4))
        );
        assert!(results
            .diagnostics
            .iter()
            .any(|d| d.message.contains("as-late-as-possible")));
    }

    #[test]
    fn unscheduled_activity_is_excluded_with_diagnostic() {
        let mut orphan = task("x", 40.0);
        orphan.clndr_id = "missing".into();
        let document = doc(
            date(2023, 1, 2),
            date(2023, 1, 2),
            vec![task("a", 40.0), orphan],
            Vec::new(),
        );
        let results = run(&document);

        let x = results.dates_for("x").unwrap();
        assert_eq!(x.total_float_days, None);
        assert!(!x.is_critical);
        assert!(!results.critical_path.contains(&"x".to_string()));
        assert!(results
            .diagnostics
            .iter()
            .any(|d| d.code == DiagCode::Unscheduled && d.task_id.as_deref() == Some("x")));
    }

    #[test]
    fn logic_edges_hold_after_scheduling() {
        // Topological soundness spot check over a mixed network.
        let document = doc(
            date(2023, 1, 2),
            date(2023, 1, 2),
            vec![
                task("a", 40.0),
                task("b", 24.0),
                task("c", 16.0),
                task("d", 32.0),
            ],
            vec![
                rel("a", "c", RelationKind::Fs, 8.0),
                rel("b", "c", RelationKind::Ss, 0.0),
                rel("c", "d", RelationKind::Ff, 0.0),
            ],
        );
        let results = run(&document);
        let index = CalendarIndex::build(&document.calendars);
        let calc = WorkingDayCalculator::new(&index);

        let get = |id: &str| results.dates_for(id).unwrap();
        // FS with lag: EF(a) + 1 working day <= ES(c)
        let bound = calc
            .add_working_days(get("a").early_finish.unwrap(), 1, "c1")
            .unwrap();
        assert!(bound <= get("c").early_start.unwrap());
        // SS: ES(b) <= ES(c)
        assert!(get("b").early_start.unwrap() <= get("c").early_start.unwrap());
        // FF: EF(c) <= EF(d)
        assert!(get("c").early_finish.unwrap() <= get("d").early_finish.unwrap());
        // Float never negative without conflicts
        for id in ["a", "b", "c", "d"] {
            assert!(get(id).total_float_days.unwrap() >= 0);
        }
    }
}
