//! PyO3 bindings for the analysis entry points.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::{NaiveDate, TimeZone, Utc};
use pyo3::exceptions::{PyKeyError, PyRuntimeError, PyTimeoutError, PyValueError};
use pyo3::prelude::*;

use crate::cancellation::Cancellation;
use crate::config::{AnalysisConfig, PriorityWeights};
use crate::critical_path::{analyze_tasks, ScheduledTask};
use crate::error::PlanningError;
use crate::graph::TaskGraph;
use crate::models::{self, Dependency, TaskPriority, TaskStatus};

const PYTHON_TENANT: &str = "python";

fn to_py_err(err: PlanningError) -> PyErr {
    match err {
        PlanningError::NotFound(msg) => PyKeyError::new_err(msg),
        PlanningError::InvalidArgument(_) | PlanningError::CyclicGraph(_) => {
            PyValueError::new_err(err.to_string())
        }
        PlanningError::ComputationTimeout { .. } => PyTimeoutError::new_err(err.to_string()),
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

/// A task as seen from Python.
#[pyclass(name = "Task")]
#[derive(Clone, Debug)]
pub struct PyTask {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub title: String,
    #[pyo3(get, set)]
    pub status: String,
    #[pyo3(get, set)]
    pub priority: Option<String>,
    #[pyo3(get, set)]
    pub estimated_hours: Option<f64>,
    #[pyo3(get, set)]
    pub due_date: Option<NaiveDate>,
    #[pyo3(get, set)]
    pub story_points: Option<u32>,
}

#[pymethods]
impl PyTask {
    #[new]
    #[pyo3(signature = (id, title, status="TODO".to_string(), priority=None, estimated_hours=None, due_date=None, story_points=None))]
    fn new(
        id: String,
        title: String,
        status: String,
        priority: Option<String>,
        estimated_hours: Option<f64>,
        due_date: Option<NaiveDate>,
        story_points: Option<u32>,
    ) -> Self {
        Self {
            id,
            title,
            status,
            priority,
            estimated_hours,
            due_date,
            story_points,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Task(id={:?}, status={}, estimated_hours={:?})",
            self.id, self.status, self.estimated_hours
        )
    }
}

impl PyTask {
    fn to_model(&self) -> PyResult<models::Task> {
        let status = TaskStatus::parse(&self.status)
            .ok_or_else(|| PyValueError::new_err(format!("unknown status {:?}", self.status)))?;
        let mut task = models::Task::new(&self.id, PYTHON_TENANT, &self.title).with_status(status);
        task.priority = self.priority.as_deref().and_then(TaskPriority::parse);
        task.estimated_hours = self.estimated_hours;
        task.story_points = self.story_points;
        // Due at the end of the given day
        task.due_date = self
            .due_date
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .map(|dt| Utc.from_utc_datetime(&dt));
        Ok(task)
    }
}

/// Schedule metrics of one task (PyO3 wrapper).
#[pyclass(name = "ScheduledTask")]
#[derive(Clone, Debug)]
pub struct PyScheduledTask {
    #[pyo3(get)]
    pub id: String,
    #[pyo3(get)]
    pub duration_days: i64,
    #[pyo3(get)]
    pub earliest_start: i64,
    #[pyo3(get)]
    pub earliest_finish: i64,
    #[pyo3(get)]
    pub latest_start: i64,
    #[pyo3(get)]
    pub latest_finish: i64,
    #[pyo3(get)]
    pub slack: i64,
}

#[pymethods]
impl PyScheduledTask {
    #[getter]
    fn is_critical(&self) -> bool {
        self.slack == 0
    }

    fn __repr__(&self) -> String {
        format!(
            "ScheduledTask(id={:?}, es={}, ef={}, slack={})",
            self.id, self.earliest_start, self.earliest_finish, self.slack
        )
    }
}

impl From<&ScheduledTask> for PyScheduledTask {
    fn from(task: &ScheduledTask) -> Self {
        Self {
            id: task.id().to_string(),
            duration_days: task.duration_days,
            earliest_start: task.timing.earliest_start,
            earliest_finish: task.timing.earliest_finish,
            latest_start: task.timing.latest_start,
            latest_finish: task.timing.latest_finish,
            slack: task.timing.slack,
        }
    }
}

#[pyclass(name = "CriticalPathResult")]
#[derive(Clone, Debug)]
pub struct PyCriticalPathResult {
    #[pyo3(get)]
    pub project_duration: i64,
    #[pyo3(get)]
    pub critical_path: Vec<PyScheduledTask>,
    #[pyo3(get)]
    pub non_critical: Vec<PyScheduledTask>,
}

fn build_inputs(
    tasks: &[PyTask],
    dependencies: &[(String, String)],
) -> PyResult<(Vec<models::Task>, Vec<Dependency>)> {
    let tasks = tasks.iter().map(PyTask::to_model).collect::<PyResult<Vec<_>>>()?;
    let edges = dependencies
        .iter()
        .map(|(blocking, blocked)| Dependency::blocks(blocking, blocked))
        .collect();
    Ok((tasks, edges))
}

/// Compute the critical path of a task set.
///
/// # Arguments
/// * `tasks` - Tasks to schedule
/// * `dependencies` - `(blocking_id, blocked_id)` pairs
/// * `hours_per_day` - Working hours in one schedule day
///
/// # Raises
/// * ValueError on a cycle or an invalid estimate
#[pyfunction]
#[pyo3(signature = (tasks, dependencies, hours_per_day=8.0))]
fn analyze_critical_path(
    tasks: Vec<PyTask>,
    dependencies: Vec<(String, String)>,
    hours_per_day: f64,
) -> PyResult<PyCriticalPathResult> {
    let (tasks, edges) = build_inputs(&tasks, &dependencies)?;
    let config = AnalysisConfig {
        hours_per_day,
        ..AnalysisConfig::default()
    };
    let result = analyze_tasks(&tasks, &edges, &config, &Cancellation::none()).map_err(to_py_err)?;
    Ok(PyCriticalPathResult {
        project_duration: result.project_duration,
        critical_path: result.critical_path.iter().map(PyScheduledTask::from).collect(),
        non_critical: result.non_critical.iter().map(PyScheduledTask::from).collect(),
    })
}

/// Rank open tasks by smart priority; returns `(task_id, score)` pairs, most urgent first.
#[pyfunction]
fn rank_by_priority(
    tasks: Vec<PyTask>,
    dependencies: Vec<(String, String)>,
    today: NaiveDate,
) -> PyResult<Vec<(String, u8)>> {
    let (tasks, edges) = build_inputs(&tasks, &dependencies)?;
    let graph = TaskGraph::build(&tasks, &edges, &AnalysisConfig::default()).map_err(to_py_err)?;
    Ok(crate::priority::rank_tasks(&graph, today, &PriorityWeights::default())
        .into_iter()
        .map(|s| (s.task_id, s.score))
        .collect())
}

/// Check whether `blocking -> blocked` can be added without closing a cycle.
///
/// # Raises
/// * ValueError for self, duplicate or cyclic edges
/// * KeyError if either task is unknown
#[pyfunction]
fn check_dependency(
    tasks: Vec<PyTask>,
    dependencies: Vec<(String, String)>,
    blocking: String,
    blocked: String,
) -> PyResult<()> {
    let (tasks, edges) = build_inputs(&tasks, &dependencies)?;
    let graph = TaskGraph::topology(&tasks, &edges, &AnalysisConfig::default());
    graph
        .check_new_dependency(&blocking, &blocked)
        .map_err(to_py_err)
}

/// The taskplan.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTask>()?;
    m.add_class::<PyScheduledTask>()?;
    m.add_class::<PyCriticalPathResult>()?;

    m.add_function(wrap_pyfunction!(analyze_critical_path, m)?)?;
    m.add_function(wrap_pyfunction!(rank_by_priority, m)?)?;
    m.add_function(wrap_pyfunction!(check_dependency, m)?)?;

    Ok(())
}
