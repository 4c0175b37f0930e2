use serde::{Deserialize, Serialize};

use flowdeck_core::types::{NodeOutput, NodeStatus, NodeType, NodeUpdate};

/// A node in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node.
    pub id: String,
    /// Kind of work this node performs.
    #[serde(rename = "type")]
    pub kind: NodeType,
    /// Human-readable label.
    pub label: String,
    /// Current lifecycle state.
    #[serde(default)]
    pub status: NodeStatus,
    /// Payload produced by the last successful processing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<NodeOutput>,
}

impl Node {
    /// Create an idle node.
    pub fn new(id: impl Into<String>, kind: NodeType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            status: NodeStatus::Idle,
            result: None,
        }
    }

    /// Merge a partial update. Fields the update does not carry are kept.
    pub fn apply(&mut self, update: &NodeUpdate) {
        if update.status == NodeStatus::Idle {
            self.reset();
            return;
        }
        self.status = update.status;
        if let Some(ref result) = update.result {
            self.result = Some(result.clone());
        }
    }

    /// Back to idle with no result, ready for a fresh run.
    pub fn reset(&mut self) {
        self.status = NodeStatus::Idle;
        self.result = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_keeps_unrelated_fields() {
        let mut node = Node::new("1", NodeType::Input, "User Query");
        node.apply(&NodeUpdate::completed(NodeOutput::Query {
            query: "q".into(),
        }));
        assert_eq!(node.status, NodeStatus::Completed);

        // An error update carries no result, so the previous one survives.
        node.apply(&NodeUpdate::error("boom"));
        assert_eq!(node.status, NodeStatus::Error);
        assert_eq!(node.label, "User Query");
        assert_eq!(
            node.result,
            Some(NodeOutput::Query { query: "q".into() })
        );
    }

    #[test]
    fn test_reset() {
        let mut node = Node::new("5", NodeType::Visualization, "Generate Report");
        node.apply(&NodeUpdate::completed(NodeOutput::Chart {
            chart: "url".into(),
        }));
        node.reset();
        assert_eq!(node.status, NodeStatus::Idle);
        assert!(node.result.is_none());
    }

    #[test]
    fn test_apply_idle_clears_result() {
        let mut node = Node::new("2", NodeType::Ai, "AI Assistant");
        node.apply(&NodeUpdate::completed(NodeOutput::Response {
            response: "done".into(),
        }));
        node.apply(&NodeUpdate::idle());
        assert_eq!(node.status, NodeStatus::Idle);
        assert!(node.result.is_none());
    }

    #[test]
    fn test_deserialize_dashboard_shape() {
        let node: Node = serde_json::from_str(
            r#"{"id": "3", "type": "data_retrieval", "label": "Financial Data API"}"#,
        )
        .unwrap();
        assert_eq!(node.kind, NodeType::Data);
        assert_eq!(node.status, NodeStatus::Idle);
        assert!(node.result.is_none());
    }
}
