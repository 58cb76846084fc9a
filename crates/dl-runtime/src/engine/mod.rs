mod eval;
mod tree_walk;

use dl_core::{DialogueError, FunctionLibrary, Node, NodeStep};

use crate::variables::VariableStorage;

pub use eval::evaluate;
pub use tree_walk::{TreeWalkEngine, TreeWalkExecution};

pub struct EvalContext<'a> {
    pub library: &'a FunctionLibrary,
    pub variables: &'a mut dyn VariableStorage,
}

pub trait ExecutionEngine {
    fn begin(&self, node: &Node) -> Box<dyn NodeExecution>;
}

/// A single traversal of a node body.
pub trait NodeExecution {
    fn next_step(&mut self, context: &mut EvalContext<'_>) -> Result<NodeStep, DialogueError>;
}
