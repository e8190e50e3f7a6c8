//! Ranking of open tasks by smart priority.

use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::config::PriorityWeights;
use crate::graph::TaskGraph;

use super::scoring::{score_task, PriorityScore};

/// Sort key for the ranked list (lower = more urgent).
///
/// Higher score first, then the nearer due date (tasks without one last), then id.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SortKey<'a> {
    neg_score: i16,
    days_until_due: Option<i64>,
    task_id: &'a str,
}

impl Ord for SortKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        let due = match (self.days_until_due, other.days_until_due) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        self.neg_score
            .cmp(&other.neg_score)
            .then(due)
            .then_with(|| self.task_id.cmp(other.task_id))
    }
}

impl PartialOrd for SortKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn sort_key(score: &PriorityScore) -> SortKey<'_> {
    SortKey {
        neg_score: -i16::from(score.score),
        days_until_due: score.days_until_due,
        task_id: &score.task_id,
    }
}

/// Score every open task in the graph and return them most urgent first.
///
/// Successors count every task this one blocks; predecessors count only the
/// blockers that are still open.
pub fn rank_tasks(graph: &TaskGraph, today: NaiveDate, weights: &PriorityWeights) -> Vec<PriorityScore> {
    let mut scores: Vec<PriorityScore> = graph
        .nodes()
        .iter()
        .filter(|node| node.task.status.is_open())
        .map(|node| {
            let open_blockers = node
                .predecessors
                .iter()
                .filter(|&&p| graph.node(p).task.status.is_open())
                .count();
            score_task(&node.task, node.successors.len(), open_blockers, today, weights)
        })
        .collect();

    scores.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    scores
}
