use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::debug;

use flowdeck_core::config::ProcessorConfig;
use flowdeck_core::error::{FlowError, Result};
use flowdeck_core::types::{MarketSnapshot, NodeOutput, NodeType};

use crate::graph::Node;

/// Performs the work behind a single node.
///
/// Implementations stand in for whatever backend a node kind talks to.
/// Errors are reported as that node's `error` status and never abort a run.
pub trait NodeProcessor: Send + Sync {
    fn process<'a>(&'a self, node: &'a Node) -> BoxFuture<'a, Result<NodeOutput>>;
}

/// Simulated backend: waits a fixed delay, then returns the canned payload
/// for the node's kind.
#[derive(Debug, Clone)]
pub struct StubProcessor {
    delay: Duration,
}

impl StubProcessor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_config(config: &ProcessorConfig) -> Self {
        Self::new(Duration::from_millis(config.delay_ms))
    }

    /// A processor that answers immediately.
    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for StubProcessor {
    fn default() -> Self {
        Self::from_config(&ProcessorConfig::default())
    }
}

impl NodeProcessor for StubProcessor {
    fn process<'a>(&'a self, node: &'a Node) -> BoxFuture<'a, Result<NodeOutput>> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            debug!(node_id = %node.id, kind = %node.kind, "Stub processing node");
            canned_output(&node.kind)
        })
    }
}

/// Fixed payload the dashboard shows for each node kind.
pub fn canned_output(kind: &NodeType) -> Result<NodeOutput> {
    let output = match kind {
        NodeType::Input => NodeOutput::Query {
            query: "Sample user query".into(),
        },
        NodeType::Ai => NodeOutput::Response {
            response: "AI analysis complete".into(),
        },
        NodeType::Data => NodeOutput::Data {
            data: MarketSnapshot {
                btc: 50000.0,
                eth: 3000.0,
            },
        },
        NodeType::Analysis => NodeOutput::Insights {
            insights: vec!["Trend is bullish".into(), "Volume increasing".into()],
        },
        NodeType::Visualization => NodeOutput::Chart {
            chart: "chart_data_url".into(),
        },
        NodeType::Action => NodeOutput::Action {
            status: "Report sent successfully".into(),
        },
        NodeType::Unknown(tag) => return Err(FlowError::UnknownNodeType(tag.clone())),
    };
    Ok(output)
}

/// Adapts an async closure taking an owned node into a `NodeProcessor`.
pub struct FnProcessor<F> {
    f: F,
}

impl<F, Fut> FnProcessor<F>
where
    F: Fn(Node) -> Fut + Send + Sync,
    Fut: Future<Output = Result<NodeOutput>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> NodeProcessor for FnProcessor<F>
where
    F: Fn(Node) -> Fut + Send + Sync,
    Fut: Future<Output = Result<NodeOutput>> + Send + 'static,
{
    fn process<'a>(&'a self, node: &'a Node) -> BoxFuture<'a, Result<NodeOutput>> {
        Box::pin((self.f)(node.clone()))
    }
}
