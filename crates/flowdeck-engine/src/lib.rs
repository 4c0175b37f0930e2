pub mod executor;
pub mod graph;
pub mod plan;
pub mod processor;
pub mod runner;
pub mod seed;

pub use executor::{GraphExecutor, RunReport};
pub use graph::{Edge, Node, WorkflowGraph};
pub use plan::{PlanStep, WorkflowPlan};
pub use processor::{canned_output, FnProcessor, NodeProcessor, StubProcessor};
pub use runner::WorkflowRunner;
