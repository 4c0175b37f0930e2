//! Built-in workflows shown on the dashboard before anything is created.

use chrono::{DateTime, TimeZone, Utc};

use flowdeck_core::types::{
    ChatMessage, NodeType, Role, WorkflowStatus, WorkflowSummary,
};

use crate::graph::{Edge, Node, WorkflowGraph};

/// The six-step analysis pipeline every seeded workflow runs.
pub fn default_pipeline() -> WorkflowGraph {
    let nodes = vec![
        Node::new("1", NodeType::Input, "User Query"),
        Node::new("2", NodeType::Ai, "AI Assistant"),
        Node::new("3", NodeType::Data, "Financial Data API"),
        Node::new("4", NodeType::Analysis, "Data Analysis"),
        Node::new("5", NodeType::Visualization, "Generate Report"),
        Node::new("6", NodeType::Action, "Send Report"),
    ];
    let edges = vec![
        Edge::new("1", "2"),
        Edge::new("2", "3"),
        Edge::new("3", "4"),
        Edge::new("4", "5"),
        Edge::new("5", "6"),
    ];
    WorkflowGraph::new(nodes, edges)
}

pub fn workflows() -> Vec<WorkflowSummary> {
    vec![
        WorkflowSummary {
            id: "1".into(),
            name: "Bitcoin Analysis".into(),
            description: "Real-time BTC price analysis with technical indicators".into(),
            status: WorkflowStatus::Active,
            progress: Some(75),
            last_run: "2h ago".into(),
            assignee: "AI Assistant".into(),
            prompt: "Create a workflow that analyzes Bitcoin price movements and generates trading signals".into(),
            chat_history: conversation(
                "Create a workflow for Bitcoin price analysis",
                "I'll help you create a workflow for Bitcoin price analysis. What indicators would you like to include?",
                "Let's use RSI, MACD, and Moving Averages",
            ),
        },
        WorkflowSummary {
            id: "2".into(),
            name: "Portfolio Risk Assessment".into(),
            description: "Multi-asset risk analysis and portfolio optimization".into(),
            status: WorkflowStatus::Scheduled,
            progress: Some(30),
            last_run: "1d ago".into(),
            assignee: "John Doe".into(),
            prompt: "Create a workflow that analyzes portfolio risk and optimizes asset allocation".into(),
            chat_history: conversation(
                "Create a workflow for portfolio risk assessment",
                "I'll help you create a workflow for portfolio risk assessment. What is the risk tolerance for this portfolio?",
                "Let's use the Modern Portfolio Theory (MPT) to optimize the portfolio",
            ),
        },
        WorkflowSummary {
            id: "3".into(),
            name: "Market Sentiment".into(),
            description: "Social media and news sentiment analysis for crypto".into(),
            status: WorkflowStatus::Completed,
            progress: Some(100),
            last_run: "3h ago".into(),
            assignee: "AI Assistant".into(),
            prompt: "Create a workflow that analyzes social media and news sentiment for crypto".into(),
            chat_history: conversation(
                "Create a workflow for market sentiment analysis",
                "I'll help you create a workflow for market sentiment analysis. What specific social media platforms and news sources would you like to include?",
                "Let's include Twitter, Reddit, and major news outlets",
            ),
        },
    ]
}

pub fn find(id: &str) -> Option<WorkflowSummary> {
    workflows().into_iter().find(|w| w.id == id)
}

fn conversation(request: &str, question: &str, answer: &str) -> Vec<ChatMessage> {
    vec![
        message("1", Role::User, request, 0),
        message("2", Role::Assistant, question, 5),
        message("3", Role::User, answer, 30),
    ]
}

fn message(id: &str, role: Role, content: &str, offset_secs: u32) -> ChatMessage {
    ChatMessage {
        id: id.into(),
        content: content.into(),
        role,
        timestamp: seed_time(offset_secs),
    }
}

fn seed_time(offset_secs: u32) -> DateTime<Utc> {
    // 2024-03-15T10:00:00Z plus the offset; always a valid instant.
    Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, offset_secs)
        .single()
        .unwrap_or_default()
}
