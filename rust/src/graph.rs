//! Dependency graph construction and validation.
//!
//! Only BLOCKS edges take part in scheduling. Nodes are indexed in sorted id
//! order so every traversal below is deterministic.

use rustc_hash::FxHashSet;
use std::collections::VecDeque;

use crate::config::AnalysisConfig;
use crate::error::{PlanningError, Result};
use crate::interner::{TaskIdx, TaskIndex};
use crate::models::{Dependency, Task};
use crate::{log_checks, log_debug};

/// A task with its forward and reverse adjacency.
#[derive(Clone, Debug)]
pub struct GraphNode {
    pub task: Task,
    pub duration_days: i64,
    /// Tasks that block this one.
    pub predecessors: Vec<TaskIdx>,
    /// Tasks this one blocks.
    pub successors: Vec<TaskIdx>,
}

/// In-memory dependency graph for one tenant snapshot.
#[derive(Clone, Debug, Default)]
pub struct TaskGraph {
    index: TaskIndex,
    nodes: Vec<GraphNode>,
    skipped_edges: usize,
    verbosity: u8,
}

impl TaskGraph {
    /// Build the graph from a tenant-scoped task list and its dependency edges.
    ///
    /// Edges naming a task outside `tasks` are skipped with a warning. Self edges
    /// are kept: they are a cycle and the analyzer reports them as one.
    ///
    /// # Errors
    /// * `InvalidArgument` if a task carries a negative, non-finite or oversized estimate
    pub fn build(tasks: &[Task], edges: &[Dependency], config: &AnalysisConfig) -> Result<Self> {
        Self::build_with(tasks, edges, config, |task| task.duration_days(config))
    }

    /// Build the graph for reachability checks only.
    ///
    /// Estimates are not read; every node gets a zero duration.
    pub fn topology(tasks: &[Task], edges: &[Dependency], config: &AnalysisConfig) -> Self {
        Self::build_with(tasks, edges, config, |_| Ok(0)).unwrap_or_default()
    }

    fn build_with(
        tasks: &[Task],
        edges: &[Dependency],
        config: &AnalysisConfig,
        duration_of: impl Fn(&Task) -> Result<i64>,
    ) -> Result<Self> {
        let mut sorted: Vec<&Task> = tasks.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));

        let mut index = TaskIndex::with_capacity(sorted.len());
        let mut nodes: Vec<GraphNode> = Vec::with_capacity(sorted.len());
        for task in sorted {
            if index.insert(&task.id).is_none() {
                log::warn!("duplicate task id {} in snapshot, keeping the first", task.id);
                continue;
            }
            nodes.push(GraphNode {
                task: task.clone(),
                duration_days: duration_of(task)?,
                predecessors: Vec::new(),
                successors: Vec::new(),
            });
        }

        let mut seen: FxHashSet<(TaskIdx, TaskIdx)> = FxHashSet::default();
        let mut skipped_edges = 0;
        for edge in edges.iter().filter(|e| e.is_scheduling()) {
            let (Some(from), Some(to)) = (
                index.position(&edge.blocking_task_id),
                index.position(&edge.blocked_task_id),
            ) else {
                log::warn!(
                    "ignoring dependency {} -> {}: task not in snapshot",
                    edge.blocking_task_id,
                    edge.blocked_task_id
                );
                skipped_edges += 1;
                continue;
            };
            if !seen.insert((from, to)) {
                continue;
            }
            nodes[to as usize].predecessors.push(from);
            nodes[from as usize].successors.push(to);
        }

        log_checks!(
            config.verbosity,
            "graph built: {} tasks, {} edges, {} skipped",
            nodes.len(),
            seen.len(),
            skipped_edges
        );

        Ok(Self {
            index,
            nodes,
            skipped_edges,
            verbosity: config.verbosity,
        })
    }

    /// Override the schedule duration of one task.
    ///
    /// # Errors
    /// * `NotFound` if the task is not in the graph
    /// * `InvalidArgument` if `days` is negative
    pub fn set_duration(&mut self, task_id: &str, days: i64) -> Result<()> {
        if days < 0 {
            return Err(PlanningError::invalid(format!(
                "duration of task {task_id} must not be negative"
            )));
        }
        let idx = self
            .index_of(task_id)
            .ok_or_else(|| PlanningError::not_found(format!("task {task_id}")))?;
        self.nodes[idx as usize].duration_days = days;
        Ok(())
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of edges dropped because an endpoint was missing.
    pub fn skipped_edges(&self) -> usize {
        self.skipped_edges
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node(&self, idx: TaskIdx) -> &GraphNode {
        &self.nodes[idx as usize]
    }

    pub fn index_of(&self, task_id: &str) -> Option<TaskIdx> {
        self.index.position(task_id)
    }

    pub fn id_of(&self, idx: TaskIdx) -> &str {
        self.index.id(idx)
    }

    pub fn get(&self, task_id: &str) -> Option<&GraphNode> {
        self.index_of(task_id).map(|idx| self.node(idx))
    }

    pub fn predecessors_of(&self, task_id: &str) -> Vec<&Task> {
        self.get(task_id)
            .map(|node| {
                node.predecessors
                    .iter()
                    .map(|&p| &self.node(p).task)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn ids(&self, indices: &[TaskIdx]) -> Vec<String> {
        indices.iter().map(|&i| self.id_of(i).to_string()).collect()
    }

    /// Perform a topological sort using Kahn's algorithm.
    ///
    /// Returns indices such that every task comes after all of its predecessors.
    ///
    /// # Errors
    /// * `CyclicGraph` naming the tasks that could not be ordered
    pub fn topological_order(&self) -> Result<Vec<TaskIdx>> {
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|n| n.predecessors.len()).collect();

        let mut queue: VecDeque<TaskIdx> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree == 0)
            .map(|(idx, _)| idx as TaskIdx)
            .collect();

        let mut order: Vec<TaskIdx> = Vec::with_capacity(self.nodes.len());

        while let Some(idx) = queue.pop_front() {
            order.push(idx);
            for &succ in &self.node(idx).successors {
                let degree = &mut in_degree[succ as usize];
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(succ);
                }
            }
        }

        if order.len() != self.nodes.len() {
            let stuck: Vec<&str> = in_degree
                .iter()
                .enumerate()
                .filter(|(_, &degree)| degree > 0)
                .map(|(idx, _)| self.id_of(idx as TaskIdx))
                .collect();
            return Err(PlanningError::CyclicGraph(format!(
                "tasks involved: {}",
                stuck.join(", ")
            )));
        }

        Ok(order)
    }

    /// Find a path `from -> ... -> to` following BLOCKS edges (depth-first).
    pub fn path_between(&self, from: TaskIdx, to: TaskIdx) -> Option<Vec<TaskIdx>> {
        let mut parent: Vec<Option<TaskIdx>> = vec![None; self.nodes.len()];
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];
        visited[from as usize] = true;

        while let Some(idx) = stack.pop() {
            if idx == to {
                let mut path = vec![to];
                let mut cursor = to;
                while let Some(prev) = parent[cursor as usize] {
                    path.push(prev);
                    cursor = prev;
                }
                path.reverse();
                return Some(path);
            }
            for &succ in &self.node(idx).successors {
                if !visited[succ as usize] {
                    visited[succ as usize] = true;
                    parent[succ as usize] = Some(idx);
                    stack.push(succ);
                }
            }
        }
        None
    }

    /// Every task reachable from `start` through successors, excluding `start`.
    pub fn downstream_of(&self, start: TaskIdx) -> Vec<TaskIdx> {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![start];
        let mut result = Vec::new();
        visited[start as usize] = true;
        while let Some(idx) = stack.pop() {
            for &succ in &self.node(idx).successors {
                if !visited[succ as usize] {
                    visited[succ as usize] = true;
                    result.push(succ);
                    stack.push(succ);
                }
            }
        }
        result.sort_unstable();
        result
    }

    /// Validate a proposed `blocking -> blocked` edge against the whole graph.
    ///
    /// The edge closes a cycle iff `blocked` already reaches `blocking`, whatever
    /// the length of that path.
    ///
    /// # Errors
    /// * `InvalidArgument` for a self dependency or an edge that already exists
    /// * `NotFound` if either task is absent
    /// * `CyclicGraph` with the offending path if the edge would close a cycle
    pub fn check_new_dependency(&self, blocking: &str, blocked: &str) -> Result<()> {
        if blocking == blocked {
            return Err(PlanningError::invalid(format!(
                "task {blocking} cannot depend on itself"
            )));
        }
        let from = self
            .index_of(blocking)
            .ok_or_else(|| PlanningError::not_found(format!("task {blocking}")))?;
        let to = self
            .index_of(blocked)
            .ok_or_else(|| PlanningError::not_found(format!("task {blocked}")))?;

        if self.node(to).predecessors.contains(&from) {
            return Err(PlanningError::invalid(format!(
                "dependency {blocking} -> {blocked} already exists"
            )));
        }

        if let Some(path) = self.path_between(to, from) {
            let mut names: Vec<&str> = vec![blocking];
            names.extend(path.iter().map(|&i| self.id_of(i)));
            return Err(PlanningError::CyclicGraph(names.join(" -> ")));
        }

        log_debug!(self.verbosity, "dependency {} -> {} accepted", blocking, blocked);
        Ok(())
    }
}
