use dl_core::{DialogueError, DialogueOutput, NodeStep};

use super::{AbortReason, Dialogue, DialogueState};
use crate::engine::{EvalContext, NodeExecution};

const STOP_COMMAND: &str = "stop";

/// Lazy sequence of host-visible steps for one run.
pub struct DialogueRun<'a> {
    dialogue: &'a mut Dialogue,
    execution: Option<Box<dyn NodeExecution>>,
}

impl<'a> DialogueRun<'a> {
    pub(super) fn new(dialogue: &'a mut Dialogue) -> Self {
        Self {
            dialogue,
            execution: None,
        }
    }

    pub fn state(&self) -> &DialogueState {
        &self.dialogue.state
    }

    pub fn current_node(&self) -> Option<&str> {
        match &self.dialogue.state {
            DialogueState::Running(node) | DialogueState::Suspended(node) => Some(node.as_str()),
            _ => None,
        }
    }

    pub fn stop(&mut self) {
        if !self.dialogue.state.is_terminal() {
            self.finish(DialogueState::Completed);
        }
    }

    pub fn dialogue(&self) -> &Dialogue {
        &*self.dialogue
    }

    fn finish(&mut self, state: DialogueState) {
        tracing::debug!(?state, "dialogue run finished");
        self.execution = None;
        self.dialogue.state = state;
    }

    fn pull_step(&mut self, node: &str) -> Option<Result<NodeStep, DialogueError>> {
        if self.execution.is_none() {
            let Some(found) = self.dialogue.nodes.get(node) else {
                tracing::warn!(node, "node not found");
                let error = DialogueError::new(
                    "DIALOGUE_NODE_NOT_FOUND",
                    format!("No node named \"{}\".", node),
                );
                self.dialogue.log_error(&error.to_string());
                self.finish(DialogueState::Aborted(AbortReason::NodeNotFound(
                    node.to_string(),
                )));
                return None;
            };
            self.execution = Some(self.dialogue.engine.begin(found));
            self.dialogue.log_debug(&format!("Running node \"{}\".", node));
        }

        let execution = self.execution.as_mut()?;
        let dialogue = &mut *self.dialogue;
        let mut context = EvalContext {
            library: &dialogue.library,
            variables: dialogue.variables.as_mut(),
        };
        Some(execution.next_step(&mut context))
    }
}

impl Iterator for DialogueRun<'_> {
    type Item = Result<DialogueOutput, DialogueError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = match &self.dialogue.state {
                DialogueState::Running(node) | DialogueState::Suspended(node) => node.clone(),
                DialogueState::Idle | DialogueState::Completed | DialogueState::Aborted(_) => {
                    return None
                }
            };
            self.dialogue.state = DialogueState::Running(node.clone());

            let step = match self.pull_step(&node)? {
                Ok(step) => step,
                Err(error) => {
                    tracing::error!(node = %node, %error, "dialogue run failed");
                    self.dialogue.log_error(&error.to_string());
                    self.finish(DialogueState::Aborted(AbortReason::Failed(
                        error.code.clone(),
                    )));
                    return Some(Err(error));
                }
            };

            if matches!(&step, NodeStep::Command(text) if text == STOP_COMMAND) {
                self.finish(DialogueState::Completed);
                return None;
            }

            if self.dialogue.run_state.borrow().stop_executing {
                self.finish(DialogueState::Aborted(AbortReason::AssertionFailed));
                return None;
            }

            let output = match step {
                NodeStep::NodeComplete(next) => {
                    self.execution = None;
                    self.dialogue
                        .run_state
                        .borrow_mut()
                        .visited
                        .insert(node.clone());
                    self.dialogue
                        .log_debug(&format!("Node \"{}\" complete.", node));
                    match next {
                        Some(next) => {
                            self.dialogue.state = DialogueState::Running(next);
                            continue;
                        }
                        None => {
                            self.finish(DialogueState::Completed);
                            return None;
                        }
                    }
                }
                NodeStep::Line(text) => DialogueOutput::Line(text),
                NodeStep::Options(set) => DialogueOutput::Options(set),
                NodeStep::Command(text) => DialogueOutput::Command(text),
            };

            self.dialogue.state = DialogueState::Suspended(node);
            return Some(Ok(output));
        }
    }
}
