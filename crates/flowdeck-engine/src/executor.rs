use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use flowdeck_core::config::{ExecutorConfig, FailurePolicy};
use flowdeck_core::error::Result;
use flowdeck_core::types::{NodeStatus, NodeUpdate, RunId};

use crate::graph::model::Adjacency;
use crate::graph::{Node, WorkflowGraph};
use crate::processor::NodeProcessor;

/// Outcome of one `GraphExecutor::execute` call.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    /// Node ids in the order they entered `processing`.
    pub started: Vec<String>,
    /// Final state of every node, in insertion order.
    pub nodes: Vec<Node>,
    pub completed: usize,
    pub failed: usize,
    pub blocked: usize,
    /// The run stopped early because its cancellation token fired.
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl RunReport {
    /// Every node completed and nothing was skipped.
    pub fn succeeded(&self) -> bool {
        !self.cancelled && self.failed == 0 && self.blocked == 0
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    /// Nodes that never started (only non-zero after cancellation).
    pub fn not_started(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Idle)
            .count()
    }
}

/// Runs every node of a workflow graph in dependency order.
///
/// The executor holds no state between calls. Each call validates the
/// graph, takes a private working copy with every node reset to idle and
/// reports each state change through `on_update`. The caller's graph is
/// never touched.
#[derive(Debug, Clone, Default)]
pub struct GraphExecutor {
    config: ExecutorConfig,
}

impl GraphExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute the whole graph.
    ///
    /// Structural problems (duplicate ids, dangling edges, cycles) are
    /// returned before any update is emitted. Failures of individual nodes
    /// are reported as `error` updates and the run carries on.
    ///
    /// Once `cancel` fires no further node is started; nodes already in
    /// flight are awaited and reported normally.
    pub async fn execute<P, F>(
        &self,
        graph: &WorkflowGraph,
        processor: &P,
        cancel: &CancellationToken,
        on_update: F,
    ) -> Result<RunReport>
    where
        P: NodeProcessor + ?Sized,
        F: FnMut(&str, &NodeUpdate),
    {
        self.execute_as(RunId::new(), graph, processor, cancel, on_update)
            .await
    }

    /// Same as `execute`, under a run id chosen by the caller.
    pub async fn execute_as<P, F>(
        &self,
        run_id: RunId,
        graph: &WorkflowGraph,
        processor: &P,
        cancel: &CancellationToken,
        mut on_update: F,
    ) -> Result<RunReport>
    where
        P: NodeProcessor + ?Sized,
        F: FnMut(&str, &NodeUpdate),
    {
        graph.validate()?;

        let start = Instant::now();
        let limit = self.config.concurrency_limit();

        let mut working = graph.clone();
        working.reset();
        let adjacency = working.adjacency();

        info!(
            run_id = %run_id,
            nodes = working.len(),
            edges = working.edges().len(),
            limit,
            "Starting workflow run"
        );

        let mut remaining: Vec<usize> = adjacency.preds.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<usize>> = remaining
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg == 0)
            .map(|(idx, _)| Reverse(idx))
            .collect();

        let mut in_flight = FuturesUnordered::new();
        let mut started = Vec::with_capacity(working.len());
        let mut skipped = 0;
        let mut cancelled = false;

        loop {
            // Fill free slots with the earliest-inserted ready nodes.
            while in_flight.len() < limit {
                if cancel.is_cancelled() {
                    // Only a run that still had nodes to schedule was cut short.
                    let unscheduled = started.len() + skipped < working.len();
                    if unscheduled && !cancelled {
                        info!(run_id = %run_id, "Run cancelled, no further nodes will start");
                        cancelled = true;
                    }
                    break;
                }
                let Some(Reverse(idx)) = ready.pop() else {
                    break;
                };

                if let Some(reason) = self.blocked_reason(&working, &adjacency, idx) {
                    emit(&mut working, idx, NodeUpdate::blocked(reason), &mut on_update);
                    release(idx, &adjacency, &mut remaining, &mut ready);
                    skipped += 1;
                    continue;
                }

                emit(&mut working, idx, NodeUpdate::processing(), &mut on_update);
                let node = working.nodes()[idx].clone();
                started.push(node.id.clone());
                in_flight.push(async move {
                    let result = processor.process(&node).await;
                    (idx, result)
                });
            }

            let Some((idx, result)) = in_flight.next().await else {
                break;
            };

            let update = match result {
                Ok(output) => NodeUpdate::completed(output),
                Err(e) => {
                    warn!(
                        run_id = %run_id,
                        node_id = %working.nodes()[idx].id,
                        error = %e,
                        "Node processing failed"
                    );
                    NodeUpdate::error(e.to_string())
                }
            };
            emit(&mut working, idx, update, &mut on_update);
            release(idx, &adjacency, &mut remaining, &mut ready);
        }

        let nodes = working.into_nodes();
        let count = |status: NodeStatus| nodes.iter().filter(|n| n.status == status).count();
        let report = RunReport {
            run_id,
            started,
            completed: count(NodeStatus::Completed),
            failed: count(NodeStatus::Error),
            blocked: count(NodeStatus::Blocked),
            nodes,
            cancelled,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            run_id = %report.run_id,
            completed = report.completed,
            failed = report.failed,
            blocked = report.blocked,
            cancelled = report.cancelled,
            elapsed_ms = report.elapsed_ms,
            "Workflow run finished"
        );

        Ok(report)
    }

    /// Under `SkipDependents`, the reason a ready node must not run.
    fn blocked_reason(
        &self,
        working: &WorkflowGraph,
        adjacency: &Adjacency,
        idx: usize,
    ) -> Option<String> {
        if self.config.failure_policy != FailurePolicy::SkipDependents {
            return None;
        }
        adjacency.preds[idx]
            .iter()
            .map(|&p| &working.nodes()[p])
            .find(|dep| dep.status.is_failure())
            .map(|dep| format!("upstream node {} did not complete", dep.id))
    }
}

/// Apply an update to the working copy and notify the caller.
fn emit<F>(working: &mut WorkflowGraph, idx: usize, update: NodeUpdate, on_update: &mut F)
where
    F: FnMut(&str, &NodeUpdate),
{
    let node = &mut working.nodes_mut()[idx];
    node.apply(&update);
    debug!(node_id = %node.id, status = %update.status, "Node state change");
    on_update(&node.id, &update);
}

/// Mark `idx` finished and queue dependents that have nothing left to wait on.
fn release(
    idx: usize,
    adjacency: &Adjacency,
    remaining: &mut [usize],
    ready: &mut BinaryHeap<Reverse<usize>>,
) {
    for &next in &adjacency.succs[idx] {
        remaining[next] -= 1;
        if remaining[next] == 0 {
            ready.push(Reverse(next));
        }
    }
}
