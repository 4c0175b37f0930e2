use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of a single execution run.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of work a node performs.
///
/// Tags that are not recognised are preserved in `Unknown` so the graph can
/// still be loaded; processing such a node fails for that node only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    Input,
    Ai,
    Data,
    Analysis,
    Visualization,
    Action,
    Unknown(String),
}

impl NodeType {
    /// Canonical wire tag.
    pub fn tag(&self) -> &str {
        match self {
            Self::Input => "user_input",
            Self::Ai => "ai_agent",
            Self::Data => "data_retrieval",
            Self::Analysis => "analysis",
            Self::Visualization => "visualization",
            Self::Action => "action",
            Self::Unknown(tag) => tag,
        }
    }

    pub fn parse(tag: &str) -> Self {
        match tag {
            "user_input" | "input" => Self::Input,
            "ai_agent" | "ai" => Self::Ai,
            "data_retrieval" | "data" => Self::Data,
            "analysis" => Self::Analysis,
            "visualization" => Self::Visualization,
            "action" => Self::Action,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<String> for NodeType {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl From<NodeType> for String {
    fn from(kind: NodeType) -> Self {
        kind.tag().to_string()
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Lifecycle state of a node within one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Idle,
    Processing,
    Completed,
    Error,
    /// Not attempted because an upstream node failed. Only produced under
    /// the skip-dependents failure policy.
    Blocked,
}

impl NodeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Blocked)
    }

    /// Terminal states that count as "did not succeed".
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Error | Self::Blocked)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spot prices returned by a data-retrieval node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub btc: f64,
    pub eth: f64,
}

/// Result payload of a processed node, one shape per node kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeOutput {
    Query { query: String },
    Response { response: String },
    Data { data: MarketSnapshot },
    Insights { insights: Vec<String> },
    Chart { chart: String },
    Action { status: String },
}

impl NodeOutput {
    /// One-line human readable rendering.
    pub fn summary(&self) -> String {
        match self {
            Self::Query { query } => format!("query: {}", query),
            Self::Response { response } => format!("response: {}", response),
            Self::Data { data } => format!("btc={} eth={}", data.btc, data.eth),
            Self::Insights { insights } => format!("insights: {}", insights.join("; ")),
            Self::Chart { chart } => format!("chart: {}", chart),
            Self::Action { status } => format!("status: {}", status),
        }
    }
}

/// Partial node state change emitted by the executor.
///
/// Only the fields present are meant to be merged into the receiver's copy
/// of the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdate {
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<NodeOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl NodeUpdate {
    /// Back to idle; merging it drops any previous result.
    pub fn idle() -> Self {
        Self {
            status: NodeStatus::Idle,
            result: None,
            message: None,
        }
    }

    pub fn processing() -> Self {
        Self {
            status: NodeStatus::Processing,
            result: None,
            message: None,
        }
    }

    pub fn completed(result: NodeOutput) -> Self {
        Self {
            status: NodeStatus::Completed,
            result: Some(result),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: NodeStatus::Error,
            result: None,
            message: Some(message.into()),
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            status: NodeStatus::Blocked,
            result: None,
            message: Some(reason.into()),
        }
    }
}

/// Overall state of a workflow as shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Active,
    Scheduled,
    Completed,
    Error,
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A message in the conversation that produced a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
}

/// Workflow metadata. The node graph lives alongside it, owned by whoever
/// runs the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: WorkflowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    pub last_run: String,
    pub assignee: String,
    pub prompt: String,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
}

/// Workflow event broadcast to all subscribers.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    /// A whole-graph run started.
    RunStarted { run_id: RunId, node_count: usize },
    /// A node changed state.
    NodeUpdated {
        run_id: RunId,
        node_id: String,
        update: NodeUpdate,
    },
    /// A whole-graph run finished (or stopped after cancellation).
    RunFinished {
        run_id: RunId,
        completed: usize,
        failed: usize,
        blocked: usize,
        cancelled: bool,
    },
}
