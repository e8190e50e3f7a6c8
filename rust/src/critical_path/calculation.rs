//! Critical path calculation using forward and backward passes.

use crate::cancellation::Cancellation;
use crate::config::AnalysisConfig;
use crate::error::{PlanningError, Result};
use crate::graph::TaskGraph;
use crate::models::{Dependency, Task};
use crate::{log_changes, log_debug};

use super::types::{CriticalPathResult, ScheduledTask, TaskTiming};

/// Build the graph for a snapshot and compute its critical path.
pub fn analyze_tasks(
    tasks: &[Task],
    edges: &[Dependency],
    config: &AnalysisConfig,
    cancel: &Cancellation,
) -> Result<CriticalPathResult> {
    let graph = TaskGraph::build(tasks, edges, config)?;
    calculate_critical_path(&graph, cancel)
}

/// Compute earliest/latest times, slack and the critical path for a graph.
///
/// Both passes run iteratively over one Kahn ordering: the forward pass in
/// order, the backward pass in reverse. Cancellation is checked after the graph
/// is available and after each pass.
///
/// # Errors
/// * `CyclicGraph` if no topological order exists
/// * `InvalidArgument` if a schedule time leaves the `i64` day range
/// * `ComputationTimeout` if `cancel` fires between phases
pub fn calculate_critical_path(
    graph: &TaskGraph,
    cancel: &Cancellation,
) -> Result<CriticalPathResult> {
    let verbosity = graph.verbosity();
    cancel.check("graph build")?;

    let order = graph.topological_order()?;
    let n = graph.len();

    // Forward pass: earliest start = max earliest finish of predecessors
    let mut earliest_start = vec![0i64; n];
    let mut earliest_finish = vec![0i64; n];
    for &idx in &order {
        let node = graph.node(idx);
        let start = node
            .predecessors
            .iter()
            .map(|&p| earliest_finish[p as usize])
            .max()
            .unwrap_or(0);
        let finish = start
            .checked_add(node.duration_days)
            .ok_or_else(|| out_of_range(graph.id_of(idx)))?;
        earliest_start[idx as usize] = start;
        earliest_finish[idx as usize] = finish;
        log_debug!(
            verbosity,
            "forward {}: es={} ef={}",
            graph.id_of(idx),
            start,
            finish
        );
    }

    let project_duration = earliest_finish.iter().copied().max().unwrap_or(0);
    cancel.check("forward pass")?;

    // Backward pass: latest finish = min latest start of successors
    let mut latest_start = vec![0i64; n];
    let mut latest_finish = vec![0i64; n];
    for &idx in order.iter().rev() {
        let node = graph.node(idx);
        let finish = node
            .successors
            .iter()
            .map(|&s| latest_start[s as usize])
            .min()
            .unwrap_or(project_duration);
        let start = finish
            .checked_sub(node.duration_days)
            .ok_or_else(|| out_of_range(graph.id_of(idx)))?;
        latest_finish[idx as usize] = finish;
        latest_start[idx as usize] = start;
        log_debug!(
            verbosity,
            "backward {}: ls={} lf={}",
            graph.id_of(idx),
            start,
            finish
        );
    }
    cancel.check("backward pass")?;

    let mut critical_path = Vec::new();
    let mut non_critical = Vec::new();
    for (i, node) in graph.nodes().iter().enumerate() {
        let timing = TaskTiming {
            earliest_start: earliest_start[i],
            earliest_finish: earliest_finish[i],
            latest_start: latest_start[i],
            latest_finish: latest_finish[i],
            slack: latest_start[i] - earliest_start[i],
        };
        let scheduled = ScheduledTask {
            task: node.task.clone(),
            duration_days: node.duration_days,
            timing,
            dependencies: graph.ids(&node.predecessors),
            dependents: graph.ids(&node.successors),
        };
        if timing.is_critical() {
            critical_path.push(scheduled);
        } else {
            non_critical.push(scheduled);
        }
    }

    critical_path.sort_by(|a, b| {
        a.timing
            .earliest_start
            .cmp(&b.timing.earliest_start)
            .then_with(|| a.task.id.cmp(&b.task.id))
    });
    non_critical.sort_by(|a, b| {
        b.timing
            .slack
            .cmp(&a.timing.slack)
            .then_with(|| a.task.id.cmp(&b.task.id))
    });

    log_changes!(
        verbosity,
        "critical path: {} of {} tasks, project duration {} days",
        critical_path.len(),
        n,
        project_duration
    );

    Ok(CriticalPathResult {
        project_duration,
        critical_path,
        non_critical,
    })
}

fn out_of_range(task_id: &str) -> PlanningError {
    PlanningError::invalid(format!("schedule of task {task_id} is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_task(id: &str, hours: f64) -> Task {
        Task::new(id, "tenant", format!("Task {id}")).with_estimate(hours)
    }

    fn run(tasks: &[Task], edges: &[(&str, &str)]) -> Result<CriticalPathResult> {
        let edges: Vec<Dependency> = edges.iter().map(|(a, b)| Dependency::blocks(*a, *b)).collect();
        analyze_tasks(tasks, &edges, &AnalysisConfig::default(), &Cancellation::none())
    }

    #[test]
    fn test_empty_snapshot() {
        let result = run(&[], &[]).unwrap();
        assert_eq!(result.project_duration, 0);
        assert!(result.is_empty());
    }

    #[test]
    fn test_single_task() {
        let result = run(&[make_task("a", 20.0)], &[]).unwrap();
        assert_eq!(result.project_duration, 3);
        assert_eq!(result.critical_path_ids(), vec!["a"]);
    }

    #[test]
    fn test_linear_chain_all_critical() {
        let tasks: Vec<Task> = (0..5).map(|i| make_task(&format!("t{i}"), 16.0)).collect();
        let result = run(&tasks, &[("t0", "t1"), ("t1", "t2"), ("t2", "t3"), ("t3", "t4")]).unwrap();
        assert_eq!(result.project_duration, 10);
        assert_eq!(result.critical_path_ids(), vec!["t0", "t1", "t2", "t3", "t4"]);
        assert!(result.tasks().all(|t| t.timing.slack == 0));
    }

    #[test]
    fn test_diamond() {
        // A -> B (3d) -> D, A -> C (1d) -> D
        let tasks = vec![
            make_task("A", 8.0),
            make_task("B", 24.0),
            make_task("C", 8.0),
            make_task("D", 8.0),
        ];
        let result = run(&tasks, &[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")]).unwrap();

        assert_eq!(result.project_duration, 5);
        assert_eq!(result.critical_path_ids(), vec!["A", "B", "D"]);
        let c = result.get("C").unwrap();
        assert_eq!(c.timing.slack, 2);
        assert_eq!(c.timing.earliest_start, 1);
        assert_eq!(c.timing.latest_start, 3);
        assert_eq!(c.timing.latest_finish, 4);
    }

    #[test]
    fn test_end_to_end_hours() {
        let tasks = vec![make_task("A", 8.0), make_task("B", 16.0), make_task("C", 8.0)];
        let result = run(&tasks, &[("A", "B"), ("B", "C")]).unwrap();
        assert_eq!(result.project_duration, 4);
        assert_eq!(result.critical_path_ids(), vec!["A", "B", "C"]);
        assert_eq!(result.critical_path_duration(), 4);
    }

    #[test]
    fn test_independent_tasks_slack_against_project_end() {
        let tasks = vec![make_task("long", 40.0), make_task("short", 8.0)];
        let result = run(&tasks, &[]).unwrap();
        assert_eq!(result.project_duration, 5);
        assert_eq!(result.critical_path_ids(), vec!["long"]);
        assert_eq!(result.get("short").unwrap().timing.slack, 4);
    }

    #[test]
    fn test_ties_ordered_by_start_then_id() {
        let tasks = vec![make_task("b", 8.0), make_task("a", 8.0), make_task("c", 8.0)];
        let result = run(&tasks, &[("b", "c"), ("a", "c")]).unwrap();
        assert_eq!(result.critical_path_ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_non_critical_sorted_by_descending_slack() {
        let tasks = vec![
            make_task("main", 80.0),
            make_task("x", 8.0),
            make_task("y", 40.0),
            make_task("z", 8.0),
        ];
        let result = run(&tasks, &[]).unwrap();
        let ids: Vec<&str> = result.non_critical.iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec!["x", "z", "y"]);
    }

    #[test]
    fn test_cycle_fails_fast() {
        let tasks = vec![make_task("a", 8.0), make_task("b", 8.0), make_task("c", 8.0)];
        let result = run(&tasks, &[("a", "b"), ("b", "c"), ("c", "a")]);
        assert!(matches!(result, Err(PlanningError::CyclicGraph(_))));
    }

    #[test]
    fn test_huge_estimates_rejected_before_scheduling() {
        let tasks = vec![make_task("a", 1e20), make_task("b", 1e20), make_task("c", 1e20)];
        let err = run(&tasks, &[("a", "b"), ("b", "c")]).unwrap_err();
        assert!(matches!(err, PlanningError::InvalidArgument(_)));
    }

    #[test]
    fn test_day_overflow_is_invalid_argument() {
        let tasks = vec![make_task("a", 8.0), make_task("b", 8.0)];
        let edges = vec![Dependency::blocks("a", "b")];
        let mut graph = TaskGraph::build(&tasks, &edges, &AnalysisConfig::default()).unwrap();
        graph.set_duration("a", i64::MAX).unwrap();
        graph.set_duration("b", i64::MAX).unwrap();
        let err = calculate_critical_path(&graph, &Cancellation::none()).unwrap_err();
        assert!(matches!(err, PlanningError::InvalidArgument(_)));
    }

    #[test]
    fn test_cancelled_before_passes() {
        let tasks = vec![make_task("a", 8.0)];
        let graph = TaskGraph::build(&tasks, &[], &AnalysisConfig::default()).unwrap();
        let cancel = Cancellation::with_timeout(std::time::Duration::ZERO);
        match calculate_critical_path(&graph, &cancel) {
            Err(PlanningError::ComputationTimeout { phase, .. }) => assert_eq!(phase, "graph build"),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_dependencies_and_dependents_reported() {
        let tasks = vec![make_task("a", 8.0), make_task("b", 8.0)];
        let result = run(&tasks, &[("a", "b")]).unwrap();
        assert_eq!(result.get("b").unwrap().dependencies, vec!["a"]);
        assert_eq!(result.get("a").unwrap().dependents, vec!["b"]);
    }
}
