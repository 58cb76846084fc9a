mod dialogue;
mod engine;
mod variables;

pub use dialogue::{
    AbortReason, Dialogue, DialogueOptions, DialogueRun, DialogueState, LogHandler,
    DEFAULT_START_NODE,
};
pub use engine::{
    evaluate, EvalContext, ExecutionEngine, NodeExecution, TreeWalkEngine, TreeWalkExecution,
};
pub use variables::{MemoryVariableStorage, VariableStorage};
