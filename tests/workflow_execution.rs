use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use flowdeck_core::config::ExecutorConfig;
use flowdeck_core::error::FlowError;
use flowdeck_core::types::{NodeOutput, NodeStatus, NodeType, NodeUpdate};
use flowdeck_engine::{seed, Edge, FnProcessor, GraphExecutor, Node, StubProcessor, WorkflowGraph};

async fn collect(
    executor: &GraphExecutor,
    graph: &WorkflowGraph,
) -> Result<Vec<(String, NodeUpdate)>, FlowError> {
    let mut updates = Vec::new();
    executor
        .execute(
            graph,
            &StubProcessor::instant(),
            &CancellationToken::new(),
            |id, update| updates.push((id.to_string(), update.clone())),
        )
        .await?;
    Ok(updates)
}

/// Deterministic DAG: node i depends on i/2 and on i-3 where those exist.
fn layered_graph(n: usize) -> WorkflowGraph {
    let kinds = [
        NodeType::Input,
        NodeType::Ai,
        NodeType::Data,
        NodeType::Analysis,
        NodeType::Visualization,
        NodeType::Action,
    ];
    let nodes = (0..n)
        .map(|i| Node::new(format!("n{}", i), kinds[i % kinds.len()].clone(), format!("Step {}", i)))
        .collect();
    let mut edges = Vec::new();
    for i in 1..n {
        edges.push(Edge::new(format!("n{}", i / 2), format!("n{}", i)));
        if i >= 3 && i / 2 != i - 3 {
            edges.push(Edge::new(format!("n{}", i - 3), format!("n{}", i)));
        }
    }
    WorkflowGraph::new(nodes, edges)
}

#[tokio::test]
async fn test_input_ai_data_scenario() {
    let graph = WorkflowGraph::new(
        vec![
            Node::new("1", NodeType::Input, "User Query"),
            Node::new("2", NodeType::Ai, "AI Assistant"),
            Node::new("3", NodeType::Data, "Financial Data API"),
        ],
        vec![Edge::new("1", "2"), Edge::new("2", "3")],
    );

    let updates = collect(&GraphExecutor::default(), &graph).await.unwrap();

    let rendered: Vec<(String, serde_json::Value)> = updates
        .into_iter()
        .map(|(id, u)| (id, serde_json::to_value(u).unwrap()))
        .collect();

    assert_eq!(
        rendered,
        vec![
            ("1".into(), serde_json::json!({"status": "processing"})),
            (
                "1".into(),
                serde_json::json!({"status": "completed", "result": {"query": "Sample user query"}})
            ),
            ("2".into(), serde_json::json!({"status": "processing"})),
            (
                "2".into(),
                serde_json::json!({"status": "completed", "result": {"response": "AI analysis complete"}})
            ),
            ("3".into(), serde_json::json!({"status": "processing"})),
            (
                "3".into(),
                serde_json::json!({"status": "completed", "result": {"data": {"btc": 50000.0, "eth": 3000.0}}})
            ),
        ]
    );
}

#[tokio::test]
async fn test_unknown_node_type_errors_but_run_completes() {
    let graph = WorkflowGraph::from_json(
        r#"{
            "nodes": [
                {"id": "n", "type": "unknown", "label": "Mystery"},
                {"id": "m", "type": "action", "label": "Send Report"}
            ],
            "edges": [{"source": "n", "target": "m"}]
        }"#,
    )
    .unwrap();

    let updates = collect(&GraphExecutor::default(), &graph).await.unwrap();
    let statuses: Vec<(&str, NodeStatus)> = updates
        .iter()
        .map(|(id, u)| (id.as_str(), u.status))
        .collect();

    assert_eq!(
        statuses,
        vec![
            ("n", NodeStatus::Processing),
            ("n", NodeStatus::Error),
            ("m", NodeStatus::Processing),
            ("m", NodeStatus::Completed),
        ]
    );
    let message = updates[1].1.message.as_deref().unwrap();
    assert!(message.contains("Unknown node type"));
}

#[tokio::test]
async fn test_dangling_edge_rejected_without_updates() {
    let graph = WorkflowGraph::new(
        vec![Node::new("1", NodeType::Input, "User Query")],
        vec![Edge::new("1", "404")],
    );
    let mut calls = 0;
    let err = GraphExecutor::default()
        .execute(
            &graph,
            &StubProcessor::instant(),
            &CancellationToken::new(),
            |_, _| calls += 1,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::DanglingEdge { .. }));
    assert_eq!(calls, 0);
}

#[tokio::test]
async fn test_cycle_rejected_without_updates() {
    let graph = WorkflowGraph::new(
        vec![
            Node::new("1", NodeType::Input, "User Query"),
            Node::new("2", NodeType::Ai, "AI Assistant"),
            Node::new("3", NodeType::Data, "Financial Data API"),
        ],
        vec![Edge::new("1", "2"), Edge::new("2", "3"), Edge::new("3", "2")],
    );
    let result = collect(&GraphExecutor::default(), &graph).await;
    assert!(matches!(result, Err(FlowError::Cycle { .. })));
}

#[tokio::test]
async fn test_every_node_visited_once_in_dependency_order() {
    let graph = layered_graph(24);
    for executor in [
        GraphExecutor::default(),
        GraphExecutor::new(ExecutorConfig::parallel(4)),
    ] {
        let updates = collect(&executor, &graph).await.unwrap();

        let mut processing = HashMap::new();
        let mut terminal = HashMap::new();
        for (pos, (id, update)) in updates.iter().enumerate() {
            let slot = if update.status == NodeStatus::Processing {
                &mut processing
            } else {
                assert!(update.status.is_terminal());
                &mut terminal
            };
            assert!(slot.insert(id.clone(), pos).is_none(), "{} reported twice", id);
        }
        assert_eq!(processing.len(), graph.len());
        assert_eq!(terminal.len(), graph.len());

        for edge in graph.edges() {
            assert!(
                terminal[&edge.source] < processing[&edge.target],
                "{} started before {} finished",
                edge.target,
                edge.source
            );
        }
    }
}

#[tokio::test]
async fn test_runs_are_deterministic() {
    let graph = layered_graph(16);
    let executor = GraphExecutor::default();

    let first: Vec<String> = collect(&executor, &graph)
        .await
        .unwrap()
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    let second: Vec<String> = collect(&executor, &graph)
        .await
        .unwrap()
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_second_run_starts_from_idle() {
    let mut graph = seed::default_pipeline();
    let executor = GraphExecutor::default();

    // Caller merges the first run's updates into its own copy.
    let updates = collect(&executor, &graph).await.unwrap();
    for (id, update) in &updates {
        graph.apply_update(id, update).unwrap();
    }
    assert!(graph
        .nodes()
        .iter()
        .all(|n| n.status == NodeStatus::Completed && n.result.is_some()));

    // Every node handed to the processor on the second run must be fresh.
    let processor = FnProcessor::new(|node: Node| async move {
        if node.status != NodeStatus::Processing || node.result.is_some() {
            return Err(FlowError::Processing {
                node: node.id,
                message: "stale state".into(),
            });
        }
        flowdeck_engine::canned_output(&node.kind)
    });

    let mut first_update = None;
    let report = executor
        .execute(&graph, &processor, &CancellationToken::new(), |id, u| {
            if first_update.is_none() {
                first_update = Some((id.to_string(), u.status));
            }
        })
        .await
        .unwrap();

    assert!(report.succeeded());
    assert_eq!(first_update, Some(("1".to_string(), NodeStatus::Processing)));
}

#[tokio::test]
async fn test_default_pipeline_results() {
    let report = GraphExecutor::new(ExecutorConfig::parallel(2))
        .execute(
            &seed::default_pipeline(),
            &StubProcessor::instant(),
            &CancellationToken::new(),
            |_, _| {},
        )
        .await
        .unwrap();

    assert!(report.succeeded());
    assert_eq!(report.started, vec!["1", "2", "3", "4", "5", "6"]);
    assert_eq!(
        report.node("6").unwrap().result,
        Some(NodeOutput::Action {
            status: "Report sent successfully".into()
        })
    );
}
