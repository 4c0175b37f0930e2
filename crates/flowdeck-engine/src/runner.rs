use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use flowdeck_core::error::{FlowError, Result};
use flowdeck_core::event::EventBus;
use flowdeck_core::types::{NodeUpdate, RunId, WorkflowEvent};

use crate::executor::{GraphExecutor, RunReport};
use crate::graph::WorkflowGraph;
use crate::processor::NodeProcessor;

/// Owner of a live workflow graph.
///
/// Whole-graph runs and single-node runs share one lock, so the two paths
/// can never touch the same nodes at the same time. A second caller gets
/// `RunInProgress` instead of waiting.
pub struct WorkflowRunner {
    graph: Arc<Mutex<WorkflowGraph>>,
    executor: GraphExecutor,
    processor: Arc<dyn NodeProcessor>,
    event_bus: Arc<EventBus>,
}

impl WorkflowRunner {
    pub fn new(
        graph: WorkflowGraph,
        executor: GraphExecutor,
        processor: Arc<dyn NodeProcessor>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            graph: Arc::new(Mutex::new(graph)),
            executor,
            processor,
            event_bus,
        }
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Copy of the graph as it stands now. Waits for an active run to end.
    pub async fn snapshot(&self) -> WorkflowGraph {
        self.graph.lock().await.clone()
    }

    /// Run every node, merging each update into the shared graph and
    /// publishing it on the event bus.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunReport> {
        let mut graph = self
            .graph
            .try_lock()
            .map_err(|_| FlowError::RunInProgress)?;

        // Validate before touching the shared copy so a rejected graph
        // keeps its previous state.
        graph.validate()?;
        let input = graph.clone();

        let run_id = RunId::new();
        self.event_bus.publish(WorkflowEvent::RunStarted {
            run_id: run_id.clone(),
            node_count: input.len(),
        });

        // Subscribers only learn about the reset through these events.
        let idle = NodeUpdate::idle();
        graph.reset();
        for node in graph.nodes() {
            self.event_bus.node_updated(&run_id, &node.id, &idle);
        }

        let bus = &self.event_bus;
        let report = self
            .executor
            .execute_as(
                run_id.clone(),
                &input,
                self.processor.as_ref(),
                cancel,
                |node_id, update| {
                    if let Err(e) = graph.apply_update(node_id, update) {
                        warn!(node_id, error = %e, "Dropping update for unknown node");
                    }
                    bus.node_updated(&run_id, node_id, update);
                },
            )
            .await?;

        self.event_bus.publish(WorkflowEvent::RunFinished {
            run_id: report.run_id.clone(),
            completed: report.completed,
            failed: report.failed,
            blocked: report.blocked,
            cancelled: report.cancelled,
        });

        Ok(report)
    }

    /// Process a single node on its own, as when it is clicked in the
    /// dashboard. Dependencies are not consulted.
    ///
    /// This is a fresh run of that one node: it is reset to idle first, so
    /// a node that already finished goes idle → processing like any other.
    pub async fn run_node(&self, node_id: &str) -> Result<NodeUpdate> {
        let mut graph = self
            .graph
            .try_lock()
            .map_err(|_| FlowError::RunInProgress)?;

        if graph.node(node_id).is_none() {
            return Err(FlowError::NodeNotFound(node_id.to_string()));
        }

        let run_id = RunId::new();
        info!(run_id = %run_id, node_id, "Processing single node");

        for update in [NodeUpdate::idle(), NodeUpdate::processing()] {
            graph.apply_update(node_id, &update)?;
            self.event_bus.node_updated(&run_id, node_id, &update);
        }

        let node = graph
            .node(node_id)
            .cloned()
            .ok_or_else(|| FlowError::NodeNotFound(node_id.to_string()))?;
        let update = match self.processor.process(&node).await {
            Ok(output) => NodeUpdate::completed(output),
            Err(e) => {
                warn!(node_id, error = %e, "Node processing failed");
                NodeUpdate::error(e.to_string())
            }
        };
        graph.apply_update(node_id, &update)?;
        self.event_bus.node_updated(&run_id, node_id, &update);

        Ok(update)
    }
}
