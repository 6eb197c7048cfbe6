//! Activity graph construction and ordering.
//!
//! Flattens the entity model into nodes and typed logic edges, computes a
//! Kahn topological order, and extracts the elementary cycles of whatever
//! refuses to sort. The default on a cyclic graph is to refuse and surface
//! the cycle set; breaking the longest-duration edge inside each cycle is an
//! opt-in repair.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::NaiveDate;
use tracing::warn;

use xersched_core::{
    CalendarId, ConstraintKind, DiagCode, Diagnostic, RelationKind, TaskId, TaskType, WbsId,
    XerDocument, XerError,
};

/// What to do when the logic contains cycles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CycleRepair {
    /// Refuse to schedule and report the cycle set.
    #[default]
    Refuse,
    /// Remove the longest-duration edge inside each cycle and retry once.
    BreakLongestEdge,
}

/// One schedulable node.
#[derive(Clone, Debug)]
pub struct ActivityNode {
    pub task_id: TaskId,
    /// Working-day duration after task-type mapping (milestones and WBS
    /// summaries carry zero).
    pub duration_days: i64,
    pub clndr_id: CalendarId,
    pub task_type: TaskType,
    pub wbs_id: WbsId,
    pub act_start: Option<NaiveDate>,
    pub act_end: Option<NaiveDate>,
    /// Primary then secondary constraint, in application order.
    pub constraints: [Option<(ConstraintKind, Option<NaiveDate>)>; 2],
    /// Position in the source document, used for stable report ordering.
    pub doc_order: usize,
}

/// A logic edge with its lag as a working-day offset.
#[derive(Clone, Debug)]
pub struct LogicEdge {
    pub pred: TaskId,
    pub succ: TaskId,
    pub kind: RelationKind,
    pub lag_days: i64,
}

/// The flattened graph plus its topological order.
#[derive(Debug)]
pub struct ActivityGraph {
    pub nodes: Vec<ActivityNode>,
    index: HashMap<TaskId, usize>,
    pub successors: HashMap<TaskId, Vec<LogicEdge>>,
    pub predecessors: HashMap<TaskId, Vec<LogicEdge>>,
    pub topo_order: Vec<TaskId>,
    topo_position: HashMap<TaskId, usize>,
}

impl ActivityGraph {
    /// Build from the entity model. `diagnostics` receives repair notes when
    /// edges are removed under [`CycleRepair::BreakLongestEdge`].
    pub fn build(
        document: &XerDocument,
        hours_per_workday: f64,
        repair: CycleRepair,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Self, XerError> {
        let nodes: Vec<ActivityNode> = document
            .activities
            .iter()
            .enumerate()
            .map(|(doc_order, activity)| {
                let duration_days = match activity.task_type {
                    TaskType::StartMilestone | TaskType::FinishMilestone => 0,
                    TaskType::WbsSummary => 0,
                    _ => activity.planned_days(hours_per_workday).max(0),
                };
                ActivityNode {
                    task_id: activity.task_id.clone(),
                    duration_days,
                    clndr_id: activity.clndr_id.clone(),
                    task_type: activity.task_type,
                    wbs_id: activity.wbs_id.clone(),
                    act_start: activity.act_start.map(|d| d.date()),
                    act_end: activity.act_end.map(|d| d.date()),
                    constraints: activity.constraints(),
                    doc_order,
                }
            })
            .collect();

        let index: HashMap<TaskId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.task_id.clone(), i))
            .collect();

        let mut successors: HashMap<TaskId, Vec<LogicEdge>> = HashMap::new();
        let mut predecessors: HashMap<TaskId, Vec<LogicEdge>> = HashMap::new();
        for node in &nodes {
            successors.insert(node.task_id.clone(), Vec::new());
            predecessors.insert(node.task_id.clone(), Vec::new());
        }
        for rel in document.relationships() {
            if rel.pred_task_id == rel.succ_task_id {
                // Rejected at load; kept out of the graph regardless.
                continue;
            }
            if !index.contains_key(&rel.pred_task_id) || !index.contains_key(&rel.succ_task_id) {
                continue;
            }
            let edge = LogicEdge {
                pred: rel.pred_task_id.clone(),
                succ: rel.succ_task_id.clone(),
                kind: rel.kind,
                lag_days: rel.lag_days(hours_per_workday),
            };
            if let Some(edges) = successors.get_mut(&edge.pred) {
                edges.push(edge.clone());
            }
            if let Some(edges) = predecessors.get_mut(&edge.succ) {
                edges.push(edge);
            }
        }

        let mut graph = Self {
            nodes,
            index,
            successors,
            predecessors,
            topo_order: Vec::new(),
            topo_position: HashMap::new(),
        };

        match kahn_order(&graph) {
            Ok(order) => graph.set_order(order),
            Err(residual) => {
                let cycles = find_cycles(&graph, &residual);
                match repair {
                    CycleRepair::Refuse => return Err(XerError::CycleDetected(cycles)),
                    CycleRepair::BreakLongestEdge => {
                        graph.break_cycles(&cycles, diagnostics);
                        match kahn_order(&graph) {
                            Ok(order) => graph.set_order(order),
                            Err(residual) => {
                                return Err(XerError::CycleDetected(find_cycles(
                                    &graph, &residual,
                                )));
                            }
                        }
                    }
                }
            }
        }

        Ok(graph)
    }

    fn set_order(&mut self, order: Vec<TaskId>) {
        self.topo_position = order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        self.topo_order = order;
    }

    pub fn node(&self, task_id: &str) -> Option<&ActivityNode> {
        self.index.get(task_id).map(|&i| &self.nodes[i])
    }

    pub fn topo_position(&self, task_id: &str) -> Option<usize> {
        self.topo_position.get(task_id).copied()
    }

    pub fn predecessors_of(&self, task_id: &str) -> &[LogicEdge] {
        self.predecessors
            .get(task_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn successors_of(&self, task_id: &str) -> &[LogicEdge] {
        self.successors
            .get(task_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_edge(&self, pred: &str, succ: &str) -> bool {
        self.successors_of(pred).iter().any(|e| e.succ == succ)
    }

    /// Remove the longest-duration edge of each cycle, mirroring the legacy
    /// auto-repair: the edge whose successor carries the largest duration.
    fn break_cycles(&mut self, cycles: &[Vec<TaskId>], diagnostics: &mut Vec<Diagnostic>) {
        for cycle in cycles {
            let mut best: Option<(i64, TaskId, TaskId)> = None;
            for pair in cycle.windows(2) {
                let (from, to) = (&pair[0], &pair[1]);
                if !self.has_edge(from, to) {
                    continue;
                }
                let duration = self.node(to).map(|n| n.duration_days).unwrap_or(0);
                if best.as_ref().map(|(d, _, _)| duration > *d).unwrap_or(true) {
                    best = Some((duration, from.clone(), to.clone()));
                }
            }
            if let Some((_, from, to)) = best {
                self.remove_edge(&from, &to);
                warn!(pred = %from, succ = %to, "removed relationship to break cycle");
                diagnostics.push(Diagnostic::warning(
                    DiagCode::CycleDetected,
                    format!("removed relationship {} -> {} to break a cycle", from, to),
                ));
            }
        }
    }

    fn remove_edge(&mut self, pred: &str, succ: &str) {
        if let Some(edges) = self.successors.get_mut(pred) {
            edges.retain(|e| e.succ != succ);
        }
        if let Some(edges) = self.predecessors.get_mut(succ) {
            edges.retain(|e| e.pred != pred);
        }
    }
}

/// Kahn's algorithm. On success returns the full order; on failure returns
/// the residual (cyclic) node set.
fn kahn_order(graph: &ActivityGraph) -> Result<Vec<TaskId>, Vec<TaskId>> {
    let mut in_degree: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .map(|n| (n.task_id.as_str(), 0))
        .collect();
    for edges in graph.successors.values() {
        for edge in edges {
            if let Some(degree) = in_degree.get_mut(edge.succ.as_str()) {
                *degree += 1;
            }
        }
    }

    // Seed in document order so ties resolve deterministically.
    let mut queue: VecDeque<&str> = graph
        .nodes
        .iter()
        .filter(|n| in_degree[n.task_id.as_str()] == 0)
        .map(|n| n.task_id.as_str())
        .collect();

    let mut order: Vec<TaskId> = Vec::with_capacity(graph.nodes.len());
    while let Some(task_id) = queue.pop_front() {
        order.push(task_id.to_string());
        if let Some(edges) = graph.successors.get(task_id) {
            for edge in edges {
                if let Some(degree) = in_degree.get_mut(edge.succ.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(edge.succ.as_str());
                    }
                }
            }
        }
    }

    if order.len() == graph.nodes.len() {
        Ok(order)
    } else {
        let ordered: HashSet<&str> = order.iter().map(String::as_str).collect();
        Err(graph
            .nodes
            .iter()
            .filter(|n| !ordered.contains(n.task_id.as_str()))
            .map(|n| n.task_id.clone())
            .collect())
    }
}

/// Bound on reported cycles; enumeration past this point adds noise, not
/// information.
const MAX_CYCLES: usize = 32;

/// Enumerate elementary cycles in the residual subgraph. Each cycle is
/// reported once, anchored at its smallest-order node and closed by
/// repeating the head (`[A, B, A]`).
fn find_cycles(graph: &ActivityGraph, residual: &[TaskId]) -> Vec<Vec<TaskId>> {
    let order: HashMap<&str, usize> = residual
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();
    let mut cycles = Vec::new();

    for start in residual {
        if cycles.len() >= MAX_CYCLES {
            warn!("cycle enumeration capped at {}", MAX_CYCLES);
            break;
        }
        let start_rank = order[start.as_str()];
        let mut path = vec![start.clone()];
        let mut on_path: HashSet<TaskId> = [start.clone()].into();
        let mut budget = 100_000usize;
        dfs_cycles(
            graph, &order, start_rank, start, &mut path, &mut on_path, &mut cycles, &mut budget,
        );
    }
    cycles
}

#[allow(clippy::too_many_arguments)]
fn dfs_cycles(
    graph: &ActivityGraph,
    order: &HashMap<&str, usize>,
    start_rank: usize,
    start: &TaskId,
    path: &mut Vec<TaskId>,
    on_path: &mut HashSet<TaskId>,
    cycles: &mut Vec<Vec<TaskId>>,
    budget: &mut usize,
) {
    if *budget == 0 || cycles.len() >= MAX_CYCLES {
        return;
    }
    *budget -= 1;

    let current = path[path.len() - 1].clone();
    for edge in graph.successors_of(&current) {
        let next = &edge.succ;
        if next == start {
            let mut cycle = path.clone();
            cycle.push(start.clone());
            cycles.push(cycle);
            if cycles.len() >= MAX_CYCLES {
                return;
            }
            continue;
        }
        // Restrict to residual nodes ranked after the anchor so each cycle
        // is found exactly once.
        match order.get(next.as_str()) {
            Some(&rank) if rank > start_rank => {}
            _ => continue,
        }
        if on_path.contains(next) {
            continue;
        }
        path.push(next.clone());
        on_path.insert(next.clone());
        dfs_cycles(graph, order, start_rank, start, path, on_path, cycles, budget);
        on_path.remove(next);
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xersched_core::{Activity, Project, Relationship, XerDocument};

    fn dt(y: i32, m: u32, d: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(chrono::NaiveTime::MIN)
    }

    fn doc_with(
        tasks: &[(&str, f64, TaskType)],
        rels: &[(&str, &str, RelationKind, f64)],
    ) -> XerDocument {
        let activities = tasks
            .iter()
            .map(|(id, hours, task_type)| {
                let mut a = Activity::new(*id, format!("C{}", id), format!("Activity {}", id));
                a.target_drtn_hr = *hours;
                a.task_type = *task_type;
                a.clndr_id = "c1".into();
                a
            })
            .collect();
        let relationships = rels
            .iter()
            .map(|(pred, succ, kind, lag)| Relationship {
                pred_task_id: (*pred).into(),
                succ_task_id: (*succ).into(),
                kind: *kind,
                lag_hr: *lag,
            })
            .collect();
        XerDocument::assemble(
            Vec::new(),
            Vec::new(),
            vec![Project {
                proj_id: "p1".into(),
                short_name: "P".into(),
                plan_start: dt(2023, 1, 2),
                last_recalc: dt(2023, 1, 2),
            }],
            Vec::new(),
            activities,
            relationships,
            Vec::new(),
        )
    }

    #[test]
    fn topological_order_respects_edges() {
        let doc = doc_with(
            &[
                ("a", 40.0, TaskType::Task),
                ("b", 24.0, TaskType::Task),
                ("c", 16.0, TaskType::Task),
            ],
            &[
                ("a", "b", RelationKind::Fs, 0.0),
                ("b", "c", RelationKind::Fs, 0.0),
            ],
        );
        let mut diags = Vec::new();
        let graph = ActivityGraph::build(&doc, 8.0, CycleRepair::Refuse, &mut diags).unwrap();

        let pos = |id: &str| graph.topo_position(id).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
        assert_eq!(graph.node("a").unwrap().duration_days, 5);
    }

    #[test]
    fn milestones_and_summaries_have_zero_duration() {
        let doc = doc_with(
            &[
                ("m", 8.0, TaskType::StartMilestone),
                ("w", 80.0, TaskType::WbsSummary),
            ],
            &[],
        );
        let mut diags = Vec::new();
        let graph = ActivityGraph::build(&doc, 8.0, CycleRepair::Refuse, &mut diags).unwrap();
        assert_eq!(graph.node("m").unwrap().duration_days, 0);
        assert_eq!(graph.node("w").unwrap().duration_days, 0);
    }

    #[test]
    fn cycle_is_refused_by_default() {
        let doc = doc_with(
            &[("a", 8.0, TaskType::Task), ("b", 8.0, TaskType::Task)],
            &[
                ("a", "b", RelationKind::Fs, 0.0),
                ("b", "a", RelationKind::Fs, 0.0),
            ],
        );
        let mut diags = Vec::new();
        let err = ActivityGraph::build(&doc, 8.0, CycleRepair::Refuse, &mut diags).unwrap_err();
        match err {
            XerError::CycleDetected(cycles) => {
                assert_eq!(cycles.len(), 1);
                let cycle = &cycles[0];
                assert_eq!(cycle.first(), cycle.last());
                assert_eq!(cycle.len(), 3);
            }
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn break_longest_edge_repair_recovers() {
        let doc = doc_with(
            &[
                ("a", 8.0, TaskType::Task),
                ("b", 40.0, TaskType::Task),
                ("c", 8.0, TaskType::Task),
            ],
            &[
                ("a", "b", RelationKind::Fs, 0.0),
                ("b", "c", RelationKind::Fs, 0.0),
                ("c", "a", RelationKind::Fs, 0.0),
            ],
        );
        let mut diags = Vec::new();
        let graph =
            ActivityGraph::build(&doc, 8.0, CycleRepair::BreakLongestEdge, &mut diags).unwrap();

        assert_eq!(graph.topo_order.len(), 3);
        // The edge into the longest-duration successor (b) is the one removed.
        assert!(!graph.has_edge("a", "b"));
        assert!(diags.iter().any(|d| d.code == DiagCode::CycleDetected));
    }

    #[test]
    fn acyclic_graph_reports_no_cycles() {
        let doc = doc_with(
            &[("a", 8.0, TaskType::Task), ("b", 8.0, TaskType::Task)],
            &[("a", "b", RelationKind::Ss, 16.0)],
        );
        let mut diags = Vec::new();
        let graph = ActivityGraph::build(&doc, 8.0, CycleRepair::Refuse, &mut diags).unwrap();
        assert!(diags.is_empty());
        assert_eq!(graph.successors_of("a")[0].lag_days, 2);
    }

    #[test]
    fn two_disjoint_cycles_are_both_reported() {
        let doc = doc_with(
            &[
                ("a", 8.0, TaskType::Task),
                ("b", 8.0, TaskType::Task),
                ("c", 8.0, TaskType::Task),
                ("d", 8.0, TaskType::Task),
            ],
            &[
                ("a", "b", RelationKind::Fs, 0.0),
                ("b", "a", RelationKind::Fs, 0.0),
                ("c", "d", RelationKind::Fs, 0.0),
                ("d", "c", RelationKind::Fs, 0.0),
            ],
        );
        let mut diags = Vec::new();
        let err = ActivityGraph::build(&doc, 8.0, CycleRepair::Refuse, &mut diags).unwrap_err();
        match err {
            XerError::CycleDetected(cycles) => assert_eq!(cycles.len(), 2),
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }
}
