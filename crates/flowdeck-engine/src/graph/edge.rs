use serde::{Deserialize, Serialize};

/// A dependency between two nodes: `target` may only start once `source`
/// has finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Edge id. Filled in as `e{source}-{target}` when left empty.
    #[serde(default)]
    pub id: String,
    /// Node that must finish first.
    #[serde(alias = "from")]
    pub source: String,
    /// Node that depends on `source`.
    #[serde(alias = "to")]
    pub target: String,
}

impl Edge {
    /// Create an edge with the default id.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: default_edge_id(&source, &target),
            source,
            target,
        }
    }

    /// Override the edge id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub(crate) fn ensure_id(&mut self) {
        if self.id.is_empty() {
            self.id = default_edge_id(&self.source, &self.target);
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

fn default_edge_id(source: &str, target: &str) -> String {
    format!("e{}-{}", source, target)
}
