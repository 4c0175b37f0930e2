use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    // Graph structure errors
    #[error("Dependency cycle detected among nodes: {}", nodes.join(", "))]
    Cycle { nodes: Vec<String> },

    #[error("Edge {edge} references unknown node: {missing}")]
    DanglingEdge { edge: String, missing: String },

    #[error("Duplicate node id: {0}")]
    DuplicateId(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    // Processing errors
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Node processing failed: {node}: {message}")]
    Processing { node: String, message: String },

    // Run coordination errors
    #[error("A run is already in progress for this workflow")]
    RunInProgress,

    // Plan errors
    #[error("Invalid workflow plan: {0}")]
    Plan(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlowError {
    /// True for errors that describe a malformed graph rather than a
    /// failure while running one.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Cycle { .. } | Self::DanglingEdge { .. } | Self::DuplicateId(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_nodes() {
        let err = FlowError::Cycle {
            nodes: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "Dependency cycle detected among nodes: a, b");
    }

    #[test]
    fn test_structural_classification() {
        assert!(FlowError::DuplicateId("x".into()).is_structural());
        assert!(FlowError::DanglingEdge {
            edge: "e1-9".into(),
            missing: "9".into()
        }
        .is_structural());
        assert!(!FlowError::UnknownNodeType("mystery".into()).is_structural());
        assert!(!FlowError::RunInProgress.is_structural());
    }
}
