use serde::{Deserialize, Serialize};
use tracing::debug;

use flowdeck_core::error::{FlowError, Result};
use flowdeck_core::types::NodeType;

use crate::graph::{Edge, Node, WorkflowGraph};

/// A workflow plan as produced by the planning model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowPlan {
    #[serde(default)]
    pub description: String,
    pub steps: Vec<PlanStep>,
}

/// One step of a plan. Dependencies are indices into `WorkflowPlan::steps`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    #[serde(rename = "type")]
    pub kind: NodeType,
    pub input: String,
    #[serde(default)]
    pub dependencies: Vec<usize>,
}

impl WorkflowPlan {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| FlowError::Plan(e.to_string()))
    }

    /// Build and validate the graph for this plan.
    ///
    /// Step `i` becomes node `node-{i}` labelled with the step input; each
    /// dependency `d` becomes edge `edge-{d}-{i}`.
    pub fn to_graph(&self) -> Result<WorkflowGraph> {
        if self.steps.is_empty() {
            return Err(FlowError::Plan("plan has no steps".into()));
        }

        let nodes = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| Node::new(node_id(i), step.kind.clone(), step.input.clone()))
            .collect();

        let edges = self
            .steps
            .iter()
            .enumerate()
            .flat_map(|(i, step)| {
                step.dependencies.iter().map(move |&dep| {
                    Edge::new(node_id(dep), node_id(i)).with_id(format!("edge-{}-{}", dep, i))
                })
            })
            .collect();

        let graph = WorkflowGraph::new(nodes, edges);
        graph.validate()?;
        debug!(
            nodes = graph.len(),
            edges = graph.edges().len(),
            "Built graph from plan"
        );
        Ok(graph)
    }
}

fn node_id(index: usize) -> String {
    format!("node-{}", index)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"{
        "description": "Fetch prices, analyse them and report",
        "steps": [
            {"type": "data_retrieval", "input": "Fetch BTC and ETH prices"},
            {"type": "analysis", "input": "Compute RSI", "dependencies": [0]},
            {"type": "analysis", "input": "Compute MACD", "dependencies": [0]},
            {"type": "visualization", "input": "Chart indicators", "dependencies": [1, 2]}
        ]
    }"#;

    #[test]
    fn test_plan_to_graph() {
        let plan = WorkflowPlan::from_json(PLAN).unwrap();
        let graph = plan.to_graph().unwrap();

        assert_eq!(graph.len(), 4);
        assert_eq!(graph.nodes()[0].id, "node-0");
        assert_eq!(graph.nodes()[0].kind, NodeType::Data);
        assert_eq!(graph.nodes()[3].label, "Chart indicators");

        let ids: Vec<&str> = graph.edges().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["edge-0-1", "edge-0-2", "edge-1-3", "edge-2-3"]);

        let deps: Vec<&str> = graph.dependencies_of("node-3").into_iter().collect();
        assert_eq!(deps, vec!["node-1", "node-2"]);
    }

    #[test]
    fn test_out_of_range_dependency_is_dangling() {
        let plan = WorkflowPlan::from_json(
            r#"{"steps": [{"type": "ai_agent", "input": "x", "dependencies": [5]}]}"#,
        )
        .unwrap();
        match plan.to_graph() {
            Err(FlowError::DanglingEdge { edge, missing }) => {
                assert_eq!(edge, "edge-5-0");
                assert_eq!(missing, "node-5");
            }
            other => panic!("expected dangling edge, got {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let plan = WorkflowPlan::from_json(
            r#"{"steps": [{"type": "action", "input": "x", "dependencies": [0]}]}"#,
        )
        .unwrap();
        assert!(matches!(plan.to_graph(), Err(FlowError::Cycle { .. })));
    }

    #[test]
    fn test_empty_and_malformed_plans() {
        let plan = WorkflowPlan::from_json(r#"{"steps": []}"#).unwrap();
        assert!(matches!(plan.to_graph(), Err(FlowError::Plan(_))));
        assert!(matches!(
            WorkflowPlan::from_json("not json"),
            Err(FlowError::Plan(_))
        ));
    }
}
