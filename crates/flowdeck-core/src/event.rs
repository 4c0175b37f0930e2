use tokio::sync::broadcast;

use crate::types::{NodeUpdate, RunId, WorkflowEvent};

/// Fan-out of run progress to dashboards, printers and tests.
///
/// Every node transition of a run goes out as `NodeUpdated`, including the
/// reset to idle that opens each run, so a subscriber that merges the
/// updates in order holds the same node states as the runner. A subscriber
/// that falls more than `capacity` events behind gets `Lagged` and should
/// re-read the runner's snapshot.
pub struct EventBus {
    tx: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: WorkflowEvent) {
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn node_updated(&self, run_id: &RunId, node_id: &str, update: &NodeUpdate) {
        self.publish(WorkflowEvent::NodeUpdated {
            run_id: run_id.clone(),
            node_id: node_id.to_string(),
            update: update.clone(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
