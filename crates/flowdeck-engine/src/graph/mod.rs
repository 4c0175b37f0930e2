//! Workflow graph model.
//!
//! A workflow is a set of typed `Node`s connected by `Edge`s, where an edge
//! `source -> target` means the target depends on the source. The graph
//! answers adjacency queries, validates its own structure and produces a
//! deterministic topological order for the executor.

pub mod edge;
pub mod model;
pub mod node;

pub use edge::Edge;
pub use model::WorkflowGraph;
pub use node::Node;
