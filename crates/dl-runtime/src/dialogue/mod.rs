mod builtins;
mod run;

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use dl_core::{DialogueError, FunctionLibrary, Node, NodeTable, StandardOperatorSet, Value};

use crate::engine::{ExecutionEngine, TreeWalkEngine};
use crate::variables::VariableStorage;

pub use run::DialogueRun;

pub const DEFAULT_START_NODE: &str = "Start";

pub type LogHandler = Box<dyn Fn(&str)>;

pub struct DialogueOptions {
    pub variable_storage: Box<dyn VariableStorage>,
    pub log_debug: Option<LogHandler>,
    pub log_error: Option<LogHandler>,
    pub engine: Option<Box<dyn ExecutionEngine>>,
}

impl DialogueOptions {
    pub fn new(variable_storage: impl VariableStorage + 'static) -> Self {
        Self {
            variable_storage: Box::new(variable_storage),
            log_debug: None,
            log_error: None,
            engine: None,
        }
    }

    pub fn with_log_debug(mut self, handler: impl Fn(&str) + 'static) -> Self {
        self.log_debug = Some(Box::new(handler));
        self
    }

    pub fn with_log_error(mut self, handler: impl Fn(&str) + 'static) -> Self {
        self.log_error = Some(Box::new(handler));
        self
    }

    pub fn with_engine(mut self, engine: impl ExecutionEngine + 'static) -> Self {
        self.engine = Some(Box::new(engine));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    NodeNotFound(String),
    AssertionFailed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueState {
    Idle,
    Running(String),
    Suspended(String),
    Completed,
    Aborted(AbortReason),
}

impl DialogueState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted(_))
    }
}

/// Per-run bookkeeping shared with the `visited` and `assert` built-ins.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    pub(crate) visited: BTreeSet<String>,
    pub(crate) stop_executing: bool,
}

/// Drives a dialogue one node at a time.
pub struct Dialogue {
    nodes: BTreeMap<String, Node>,
    library: FunctionLibrary,
    variables: Box<dyn VariableStorage>,
    engine: Box<dyn ExecutionEngine>,
    log_debug: Option<LogHandler>,
    log_error: Option<LogHandler>,
    run_state: Rc<RefCell<RunState>>,
    state: DialogueState,
}

impl fmt::Debug for Dialogue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialogue")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("library", &self.library)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Dialogue {
    pub fn new(options: DialogueOptions) -> Self {
        let run_state = Rc::new(RefCell::new(RunState::default()));
        let mut library = StandardOperatorSet::new();
        builtins::register(&mut library, &run_state);

        Self {
            nodes: BTreeMap::new(),
            library,
            variables: options.variable_storage,
            engine: options
                .engine
                .unwrap_or_else(|| Box::new(TreeWalkEngine)),
            log_debug: options.log_debug,
            log_error: options.log_error,
            run_state,
            state: DialogueState::Idle,
        }
    }

    /// Adds every node of `table`. Titles already loaded are rejected and
    /// nothing from the table is kept.
    pub fn load_nodes(&mut self, table: NodeTable) -> Result<(), DialogueError> {
        self.require_log_handlers()?;

        if let Some(duplicate) = table.titles().find(|title| self.nodes.contains_key(*title)) {
            return Err(DialogueError::new(
                "DIALOGUE_DUPLICATE_NODE",
                format!("Node \"{}\" is already loaded.", duplicate),
            ));
        }

        let count = table.len();
        for node in table.into_nodes() {
            self.nodes.insert(node.title.clone(), node);
        }
        self.log_debug(&format!("Loaded {} node(s).", count));
        Ok(())
    }

    pub fn unload_all(&mut self) {
        self.nodes.clear();
        let mut run_state = self.run_state.borrow_mut();
        run_state.visited.clear();
        run_state.stop_executing = false;
        drop(run_state);
        self.state = DialogueState::Idle;
    }

    pub fn register_function<F>(&mut self, name: impl Into<String>, arity: usize, function: F)
    where
        F: Fn(&[Value]) -> Option<Value> + 'static,
    {
        self.library.register(name, arity, function);
    }

    pub fn library(&self) -> &FunctionLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut FunctionLibrary {
        &mut self.library
    }

    pub fn variables(&self) -> &dyn VariableStorage {
        self.variables.as_ref()
    }

    pub fn variables_mut(&mut self) -> &mut dyn VariableStorage {
        self.variables.as_mut()
    }

    pub fn node_exists(&self, title: &str) -> bool {
        self.nodes.contains_key(title)
    }

    pub fn node_names(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    pub fn node(&self, title: &str) -> Option<&Node> {
        self.nodes.get(title)
    }

    pub fn is_visited(&self, title: &str) -> bool {
        self.run_state.borrow().visited.contains(title)
    }

    pub fn state(&self) -> &DialogueState {
        &self.state
    }

    /// Starts a new run at `start_node`, or [`DEFAULT_START_NODE`].
    pub fn run(&mut self, start_node: Option<&str>) -> Result<DialogueRun<'_>, DialogueError> {
        self.require_log_handlers()?;

        let start_node = start_node.unwrap_or(DEFAULT_START_NODE).to_string();
        {
            let mut run_state = self.run_state.borrow_mut();
            run_state.visited.clear();
            run_state.stop_executing = false;
        }
        tracing::debug!(start = %start_node, "dialogue run started");
        self.state = DialogueState::Running(start_node);
        Ok(DialogueRun::new(self))
    }

    fn require_log_handlers(&self) -> Result<(), DialogueError> {
        let missing = match (&self.log_debug, &self.log_error) {
            (Some(_), Some(_)) => return Ok(()),
            (None, Some(_)) => "log_debug",
            (Some(_), None) => "log_error",
            (None, None) => "log_debug and log_error",
        };
        Err(DialogueError::new(
            "DIALOGUE_CONFIG_MISSING_SINK",
            format!("Dialogue requires {} to be set before loading or running.", missing),
        ))
    }

    pub(crate) fn log_debug(&self, message: &str) {
        if let Some(handler) = &self.log_debug {
            handler(message);
        }
    }

    pub(crate) fn log_error(&self, message: &str) {
        if let Some(handler) = &self.log_error {
            handler(message);
        }
    }
}
