//! Planning service: fetch a tenant snapshot, run an analysis, and perform the
//! few writes the engine owns (dependency insertion, score write-back,
//! forwarding findings).

use chrono::{DateTime, NaiveDate, Utc};

use crate::analytics::{self, BurndownSeries, VelocitySeries};
use crate::buffer::{estimate_buffer, BufferEstimate, BufferReport};
use crate::cancellation::Cancellation;
use crate::config::PlanningConfig;
use crate::critical_path::{calculate_critical_path, summarize, CriticalPathResult, CriticalPathSummary};
use crate::error::{PlanningError, Result};
use crate::graph::TaskGraph;
use crate::models::{AttributePatch, Dependency, EstimateHistory, Finding, ScoreRecord, Task, TaskStatus};
use crate::ports::{Notifier, TaskFilter, TaskStore};
use crate::priority::{rank_tasks, score_task, PriorityScore};
use crate::scenario::{simulate, Scenario, ScenarioImpact};
use crate::{log_changes, log_checks};

/// Default number of weeks for weekly velocity.
pub const DEFAULT_VELOCITY_WEEKS: usize = 8;
/// Default number of completed sprints in the velocity history.
pub const DEFAULT_SPRINT_HISTORY: usize = 10;

/// Tenant-scoped entry point over a [`TaskStore`] and a [`Notifier`].
pub struct PlanningService<S, N> {
    store: S,
    notifier: N,
    config: PlanningConfig,
}

impl<S: TaskStore, N: Notifier> PlanningService<S, N> {
    pub fn new(store: S, notifier: N, config: PlanningConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &PlanningConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn verbosity(&self) -> u8 {
        self.config.analysis.verbosity
    }

    /// Tasks matching `filter` and every edge touching them.
    fn snapshot(&self, tenant_id: &str, filter: &TaskFilter) -> Result<(Vec<Task>, Vec<Dependency>)> {
        let tasks = self.store.list_tasks(tenant_id, filter)?;
        let ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
        let edges = self.store.list_dependencies(tenant_id, &ids)?;
        Ok((tasks, edges))
    }

    /// Graph of every non-cancelled task of the tenant.
    fn active_graph(&self, tenant_id: &str) -> Result<(TaskGraph, Vec<Task>)> {
        let filter = TaskFilter::all().excluding(TaskStatus::Cancelled);
        let (tasks, edges) = self.snapshot(tenant_id, &filter)?;
        let graph = TaskGraph::build(&tasks, &edges, &self.config.analysis)?;
        Ok((graph, tasks))
    }

    /// Critical path over the tenant's non-cancelled tasks.
    pub fn critical_path(&self, tenant_id: &str, cancel: &Cancellation) -> Result<CriticalPathResult> {
        let (graph, _) = self.active_graph(tenant_id)?;
        let result = calculate_critical_path(&graph, cancel)?;
        log_changes!(
            self.verbosity(),
            "tenant {}: critical path of {} task(s), project duration {} day(s)",
            tenant_id,
            result.critical_path.len(),
            result.project_duration
        );
        Ok(result)
    }

    pub fn critical_path_summary(
        &self,
        tenant_id: &str,
        cancel: &Cancellation,
    ) -> Result<(CriticalPathResult, CriticalPathSummary)> {
        let result = self.critical_path(tenant_id, cancel)?;
        let summary = summarize(&result, &self.config.analysis);
        Ok((result, summary))
    }

    /// Validate a new edge against the tenant's full dependency graph, then persist it.
    ///
    /// Only the topology is checked; task estimates are not validated here.
    ///
    /// # Errors
    /// * `InvalidArgument` for self edges and duplicates
    /// * `NotFound` if either task is not in the tenant
    /// * `CyclicGraph` if a BLOCKS edge would close a cycle
    pub fn add_dependency(&self, tenant_id: &str, dependency: &Dependency) -> Result<()> {
        let (tasks, edges) = self.snapshot(tenant_id, &TaskFilter::all())?;

        if dependency.is_scheduling() {
            let graph = TaskGraph::topology(&tasks, &edges, &self.config.analysis);
            graph.check_new_dependency(&dependency.blocking_task_id, &dependency.blocked_task_id)?;
        } else {
            if dependency.blocking_task_id == dependency.blocked_task_id {
                return Err(PlanningError::invalid(format!(
                    "task {} cannot depend on itself",
                    dependency.blocking_task_id
                )));
            }
            for id in [&dependency.blocking_task_id, &dependency.blocked_task_id] {
                if !tasks.iter().any(|t| t.id == *id) {
                    return Err(PlanningError::not_found(format!("task {id}")));
                }
            }
            if edges.contains(dependency) {
                return Err(PlanningError::invalid(format!(
                    "dependency {} -> {} already exists",
                    dependency.blocking_task_id, dependency.blocked_task_id
                )));
            }
        }

        self.store.insert_dependency(tenant_id, dependency)?;
        log_changes!(
            self.verbosity(),
            "tenant {}: added {:?} dependency {} -> {}",
            tenant_id,
            dependency.kind,
            dependency.blocking_task_id,
            dependency.blocked_task_id
        );
        Ok(())
    }

    /// Buffer and deadline risk for one task.
    pub fn buffer_estimate(
        &self,
        tenant_id: &str,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> Result<BufferEstimate> {
        let (graph, tasks) = self.active_graph(tenant_id)?;
        let node = graph
            .get(task_id)
            .ok_or_else(|| PlanningError::not_found(format!("task {task_id}")))?;
        let history = EstimateHistory::from_tasks(&tasks);
        let predecessors = graph.predecessors_of(task_id);
        Ok(estimate_buffer(
            &node.task,
            &predecessors,
            history.as_ref(),
            now,
            &self.config.analysis,
            &self.config.buffer,
        ))
    }

    /// Buffer estimates for every open task with a due date.
    pub fn buffer_report(&self, tenant_id: &str, now: DateTime<Utc>) -> Result<BufferReport> {
        let (graph, tasks) = self.active_graph(tenant_id)?;
        let history = EstimateHistory::from_tasks(&tasks);
        let estimates: Vec<BufferEstimate> = graph
            .nodes()
            .iter()
            .filter(|node| node.task.status.is_open() && node.task.due_date.is_some())
            .map(|node| {
                let predecessors = graph.predecessors_of(&node.task.id);
                estimate_buffer(
                    &node.task,
                    &predecessors,
                    history.as_ref(),
                    now,
                    &self.config.analysis,
                    &self.config.buffer,
                )
            })
            .collect();
        let report = BufferReport::from_estimates(estimates);
        log_checks!(
            self.verbosity(),
            "tenant {}: buffer report high={} medium={} low={}",
            tenant_id,
            report.summary.high_risk,
            report.summary.medium_risk,
            report.summary.low_risk
        );
        Ok(report)
    }

    /// Open tasks ranked by smart priority, most urgent first.
    pub fn smart_priorities(&self, tenant_id: &str, today: NaiveDate) -> Result<Vec<PriorityScore>> {
        let (graph, _) = self.active_graph(tenant_id)?;
        Ok(rank_tasks(&graph, today, &self.config.priority))
    }

    /// Score one task and store the result on it.
    ///
    /// The write is keyed by task id, so repeating the call for the same input
    /// leaves the store unchanged.
    pub fn calculate_and_store_score(
        &self,
        tenant_id: &str,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PriorityScore> {
        let (graph, _) = self.active_graph(tenant_id)?;
        let node = graph
            .get(task_id)
            .ok_or_else(|| PlanningError::not_found(format!("task {task_id}")))?;
        let open_blockers = node
            .predecessors
            .iter()
            .filter(|&&p| graph.node(p).task.status.is_open())
            .count();
        let score = score_task(
            &node.task,
            node.successors.len(),
            open_blockers,
            now.date_naive(),
            &self.config.priority,
        );

        let patch = AttributePatch {
            scoring: Some(ScoreRecord {
                task_id: task_id.to_string(),
                score: score.score,
                computed_at: now,
            }),
        };
        self.store.update_task_attributes(tenant_id, task_id, &patch)?;
        log_changes!(
            self.verbosity(),
            "tenant {}: stored smart score {} for {}",
            tenant_id,
            score.score,
            task_id
        );
        Ok(score)
    }

    /// Evaluate a hypothetical change against the current critical path.
    pub fn what_if(
        &self,
        tenant_id: &str,
        scenario: &Scenario,
        now: DateTime<Utc>,
        cancel: &Cancellation,
    ) -> Result<ScenarioImpact> {
        let result = self.critical_path(tenant_id, cancel)?;
        simulate(&result, scenario, now, &self.config.analysis, cancel)
    }

    /// Burndown of a sprint's tasks over the sprint window.
    pub fn sprint_burndown(&self, tenant_id: &str, sprint_id: &str, today: NaiveDate) -> Result<BurndownSeries> {
        let sprint = self
            .store
            .list_sprints(tenant_id)?
            .into_iter()
            .find(|s| s.id == sprint_id)
            .ok_or_else(|| PlanningError::not_found(format!("sprint {sprint_id}")))?;
        let filter = TaskFilter::all()
            .in_sprint(sprint_id)
            .excluding(TaskStatus::Cancelled);
        let tasks = self.store.list_tasks(tenant_id, &filter)?;
        analytics::burndown(&tasks, sprint.start_date, sprint.end_date, today, &self.config.trend)
    }

    /// Burndown of every non-cancelled task over an arbitrary window.
    pub fn burndown(
        &self,
        tenant_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<BurndownSeries> {
        let filter = TaskFilter::all().excluding(TaskStatus::Cancelled);
        let tasks = self.store.list_tasks(tenant_id, &filter)?;
        analytics::burndown(&tasks, start, end, today, &self.config.trend)
    }

    pub fn weekly_velocity(&self, tenant_id: &str, weeks: usize, today: NaiveDate) -> Result<VelocitySeries> {
        let filter = TaskFilter::all().excluding(TaskStatus::Cancelled);
        let tasks = self.store.list_tasks(tenant_id, &filter)?;
        Ok(analytics::velocity_by_week(&tasks, weeks, today, &self.config.trend))
    }

    pub fn sprint_velocity(&self, tenant_id: &str, limit: usize) -> Result<VelocitySeries> {
        let sprints = self.store.list_sprints(tenant_id)?;
        let tasks = self.store.list_tasks(tenant_id, &TaskFilter::all())?;
        Ok(analytics::velocity_by_sprint(&sprints, &tasks, limit, &self.config.trend))
    }

    /// Forward a finding to a user through the notifier.
    pub fn publish_finding(&self, user_id: &str, finding: &Finding) -> Result<()> {
        self.notifier
            .notify(user_id, &finding.title, &finding.body, &finding.payload)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::Trend;
    use crate::buffer::RiskLevel;
    use crate::models::{DependencyKind, Sprint, SprintStatus};
    use crate::ports::{InMemoryTaskStore, RecordingNotifier, StoreError};
    use chrono::{Duration, TimeZone};

    const TENANT: &str = "acme";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 3, 9, 0, 0).unwrap()
    }

    fn task(id: &str, hours: f64) -> Task {
        Task::new(id, TENANT, format!("Task {id}")).with_estimate(hours)
    }

    fn service(tasks: Vec<Task>, edges: Vec<Dependency>) -> PlanningService<InMemoryTaskStore, RecordingNotifier> {
        PlanningService::new(
            InMemoryTaskStore::seeded(tasks, edges, Vec::new()),
            RecordingNotifier::new(),
            PlanningConfig::default(),
        )
    }

    #[test]
    fn test_critical_path_excludes_cancelled() {
        let svc = service(
            vec![
                task("a", 8.0),
                task("b", 16.0),
                task("c", 8.0),
                task("x", 80.0).with_status(TaskStatus::Cancelled),
                Task::new("other", "globex", "Other").with_estimate(800.0),
            ],
            vec![
                Dependency::blocks("a", "b"),
                Dependency::blocks("b", "c"),
                Dependency::blocks("c", "x"),
            ],
        );
        let (result, summary) = svc.critical_path_summary(TENANT, &Cancellation::none()).unwrap();
        assert_eq!(result.project_duration, 4);
        assert_eq!(result.critical_path_ids(), vec!["a", "b", "c"]);
        assert_eq!(summary.total_tasks, 3);
    }

    #[test]
    fn test_add_dependency_rejects_cycle_before_insert() {
        let svc = service(
            vec![task("a", 8.0), task("b", 8.0), task("c", 8.0)],
            vec![Dependency::blocks("a", "b"), Dependency::blocks("b", "c")],
        );
        let result = svc.add_dependency(TENANT, &Dependency::blocks("c", "a"));
        assert!(matches!(result, Err(PlanningError::CyclicGraph(_))));
        assert_eq!(svc.store().dependencies().len(), 2);

        assert!(matches!(
            svc.add_dependency(TENANT, &Dependency::blocks("a", "a")),
            Err(PlanningError::InvalidArgument(_))
        ));
        assert!(matches!(
            svc.add_dependency(TENANT, &Dependency::blocks("a", "zzz")),
            Err(PlanningError::NotFound(_))
        ));
        assert!(matches!(
            svc.add_dependency(TENANT, &Dependency::blocks("a", "b")),
            Err(PlanningError::InvalidArgument(_))
        ));

        svc.add_dependency(TENANT, &Dependency::blocks("a", "c")).unwrap();
        assert_eq!(svc.store().dependencies().len(), 3);
    }

    #[test]
    fn test_bad_estimate_does_not_block_new_edges() {
        let svc = service(
            vec![task("a", 8.0), task("b", 8.0), task("c", -5.0)],
            Vec::new(),
        );
        svc.add_dependency(TENANT, &Dependency::blocks("a", "b")).unwrap();
        assert!(matches!(
            svc.add_dependency(TENANT, &Dependency::blocks("b", "a")),
            Err(PlanningError::CyclicGraph(_))
        ));
        assert_eq!(svc.store().dependencies().len(), 1);
        // scheduling still rejects the estimate
        assert!(matches!(
            svc.critical_path(TENANT, &Cancellation::none()),
            Err(PlanningError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_cycle_check_includes_cancelled_tasks() {
        let svc = service(
            vec![task("a", 8.0), task("b", 8.0).with_status(TaskStatus::Cancelled)],
            vec![Dependency::blocks("a", "b")],
        );
        assert!(matches!(
            svc.add_dependency(TENANT, &Dependency::blocks("b", "a")),
            Err(PlanningError::CyclicGraph(_))
        ));
    }

    #[test]
    fn test_related_edges_skip_cycle_check() {
        let svc = service(
            vec![task("a", 8.0), task("b", 8.0)],
            vec![Dependency::blocks("a", "b")],
        );
        let related = Dependency {
            blocking_task_id: "b".to_string(),
            blocked_task_id: "a".to_string(),
            kind: DependencyKind::Related,
        };
        svc.add_dependency(TENANT, &related).unwrap();
        assert!(matches!(
            svc.add_dependency(TENANT, &related),
            Err(PlanningError::InvalidArgument(_))
        ));
        // related edges never enter the schedule
        let result = svc.critical_path(TENANT, &Cancellation::none()).unwrap();
        assert_eq!(result.project_duration, 2);
    }

    #[test]
    fn test_buffer_uses_tenant_history() {
        let mut done = task("done", 10.0).completed(now() - Duration::days(3));
        done.actual_hours = Some(20.0);
        let svc = service(
            vec![done, task("a", 8.0).with_due_date(now() + Duration::days(30))],
            Vec::new(),
        );
        let estimate = svc.buffer_estimate(TENANT, "a", now()).unwrap();
        assert!((estimate.variance_ratio - 2.0).abs() < 1e-9);
        assert_eq!(estimate.recommended_buffer_hours, 12);
        assert_eq!(estimate.risk_level, RiskLevel::Low);

        assert!(matches!(
            svc.buffer_estimate(TENANT, "nope", now()),
            Err(PlanningError::NotFound(_))
        ));
    }

    #[test]
    fn test_buffer_report_covers_open_tasks_with_due_dates() {
        let svc = service(
            vec![
                task("late", 80.0).with_due_date(now() + Duration::days(1)),
                task("fine", 8.0).with_due_date(now() + Duration::days(20)),
                task("undated", 8.0),
                task("done", 8.0)
                    .with_due_date(now() + Duration::days(1))
                    .completed(now()),
            ],
            Vec::new(),
        );
        let report = svc.buffer_report(TENANT, now()).unwrap();
        let ids: Vec<&str> = report.tasks.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, vec!["late", "fine"]);
        assert_eq!(report.summary.high_risk, 1);
        assert_eq!(report.summary.low_risk, 1);
    }

    #[test]
    fn test_calculate_and_store_score_is_idempotent() {
        let svc = service(
            vec![
                task("a", 8.0).with_priority(crate::models::TaskPriority::High),
                task("b", 8.0),
            ],
            vec![Dependency::blocks("a", "b")],
        );
        let first = svc.calculate_and_store_score(TENANT, "a", now()).unwrap();
        let second = svc.calculate_and_store_score(TENANT, "a", now()).unwrap();
        assert_eq!(first, second);
        // HIGH 22 + one successor 10
        assert_eq!(first.score, 32);
        assert_eq!(svc.store().score_of("a").unwrap().score, 32);

        let ranked = svc.smart_priorities(TENANT, now().date_naive()).unwrap();
        assert_eq!(ranked[0].task_id, "a");
    }

    #[test]
    fn test_store_outage_is_retryable() {
        let svc = service(vec![task("a", 8.0)], Vec::new());
        svc.store().set_unavailable(true);
        let err = svc.critical_path(TENANT, &Cancellation::none()).unwrap_err();
        assert_eq!(err, PlanningError::Store(StoreError::Unavailable("in-memory store offline".to_string())));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_what_if_and_publish_finding() {
        let svc = service(
            vec![task("a", 8.0), task("b", 24.0), task("c", 8.0)],
            vec![Dependency::blocks("a", "b"), Dependency::blocks("a", "c")],
        );
        let scenario = Scenario::DelayTask {
            task_id: "b".to_string(),
            delay_days: 5,
        };
        let impact = svc.what_if(TENANT, &scenario, now(), &Cancellation::none()).unwrap();
        assert_eq!(impact.project_delay_days, 5);
        assert_eq!(impact.current_state.project_duration, 4);

        let finding = impact.finding().unwrap();
        svc.publish_finding("u-1", &finding).unwrap();
        let sent = svc.notifier().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].user_id, "u-1");
        assert_eq!(sent[0].payload.task_ids, vec!["b"]);

        // nothing was written by the scenario
        assert_eq!(svc.store().dependencies().len(), 2);
    }

    #[test]
    fn test_sprint_burndown_and_velocity() {
        let start = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let sprints = vec![
            Sprint {
                id: "s0".to_string(),
                tenant_id: TENANT.to_string(),
                name: "Sprint 0".to_string(),
                start_date: start - Duration::days(14),
                end_date: start - Duration::days(1),
                status: SprintStatus::Completed,
            },
            Sprint {
                id: "s1".to_string(),
                tenant_id: TENANT.to_string(),
                name: "Sprint 1".to_string(),
                start_date: start,
                end_date: start + Duration::days(4),
                status: SprintStatus::Active,
            },
        ];
        let tasks = vec![
            task("a", 8.0)
                .with_story_points(4)
                .in_sprint("s1")
                .completed(Utc.with_ymd_and_hms(2025, 9, 2, 12, 0, 0).unwrap()),
            task("b", 8.0).with_story_points(4).in_sprint("s1"),
            task("z", 8.0)
                .with_story_points(6)
                .in_sprint("s0")
                .completed(Utc.with_ymd_and_hms(2025, 8, 25, 12, 0, 0).unwrap()),
        ];
        let svc = PlanningService::new(
            InMemoryTaskStore::seeded(tasks, Vec::new(), sprints),
            RecordingNotifier::new(),
            PlanningConfig::default(),
        );

        let series = svc.sprint_burndown(TENANT, "s1", now().date_naive()).unwrap();
        assert_eq!(series.points.len(), 5);
        assert_eq!(series.summary.total_points, 8);
        assert_eq!(series.summary.completed_points, 4);
        // day 3: ideal 8 - 2*2 = 4, actual 4
        assert_eq!(series.is_on_track, Some(true));

        assert!(matches!(
            svc.sprint_burndown(TENANT, "missing", now().date_naive()),
            Err(PlanningError::NotFound(_))
        ));

        let velocity = svc.sprint_velocity(TENANT, DEFAULT_SPRINT_HISTORY).unwrap();
        assert_eq!(velocity.points.len(), 1);
        assert_eq!(velocity.average_velocity, 6.0);
        assert_eq!(velocity.trend, Trend::Stable);

        let weekly = svc
            .weekly_velocity(TENANT, DEFAULT_VELOCITY_WEEKS, now().date_naive())
            .unwrap();
        assert_eq!(weekly.points.len(), 8);
        assert_eq!(weekly.total_completed, 2);
    }

    #[test]
    fn test_cancelled_computation() {
        let svc = service(vec![task("a", 8.0)], Vec::new());
        let token = tokio_util::sync::CancellationToken::new();
        token.cancel();
        let err = svc
            .critical_path(TENANT, &Cancellation::with_token(token))
            .unwrap_err();
        assert!(matches!(err, PlanningError::ComputationTimeout { .. }));
    }
}
