use std::io::Write;

use dl_core::{DialogueError, DialogueOutput};
use dl_runtime::{AbortReason, Dialogue, DialogueState};
use serde::Serialize;

use crate::{map_cli_event_json, map_cli_io};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub(crate) enum TraceEvent {
    Line { text: String },
    Options { options: Vec<String> },
    Command { text: String },
    End,
    Aborted { reason: String },
}

impl TraceEvent {
    pub(crate) fn finished(state: &DialogueState) -> Self {
        match state {
            DialogueState::Aborted(reason) => Self::Aborted {
                reason: abort_reason_label(reason),
            },
            _ => Self::End,
        }
    }
}

pub(crate) fn abort_reason_label(reason: &AbortReason) -> String {
    match reason {
        AbortReason::NodeNotFound(node) => format!("node-not-found:{}", node),
        AbortReason::AssertionFailed => "assertion-failed".to_string(),
        AbortReason::Failed(code) => code.clone(),
    }
}

fn emit(event: &TraceEvent, writer: &mut dyn Write) -> Result<(), DialogueError> {
    let line = serde_json::to_string(event).map_err(map_cli_event_json)?;
    writeln!(writer, "{}", line).map_err(map_cli_io)
}

/// Runs to completion, answering each option set with the next entry of
/// `choices`, and writes every event as one JSON line.
pub(crate) fn run_trace_with_io(
    dialogue: &mut Dialogue,
    start_node: &str,
    choices: &[usize],
    writer: &mut dyn Write,
) -> Result<i32, DialogueError> {
    let mut remaining = choices.iter();
    let mut run = dialogue.run(Some(start_node))?;

    for output in run.by_ref() {
        match output? {
            DialogueOutput::Line(text) => emit(&TraceEvent::Line { text }, writer)?,
            DialogueOutput::Command(text) => emit(&TraceEvent::Command { text }, writer)?,
            DialogueOutput::Options(set) => {
                emit(
                    &TraceEvent::Options {
                        options: set.options.clone(),
                    },
                    writer,
                )?;
                let Some(index) = remaining.next() else {
                    return Err(DialogueError::new(
                        "CLI_CHOICE_MISSING",
                        format!(
                            "No scripted choice left for options {:?}.",
                            set.options
                        ),
                    ));
                };
                set.select(*index);
            }
        }
    }

    emit(&TraceEvent::finished(run.state()), writer)?;

    let unused = remaining.count();
    if unused > 0 {
        tracing::warn!(unused, "scripted choices left unused");
    }
    Ok(0)
}
