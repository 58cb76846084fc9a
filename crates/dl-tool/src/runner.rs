use std::collections::BTreeMap;
use std::path::Path;

use dl_api::{create_dialogue_from_json, CreateDialogueFromJsonOptions, PreparedDialogue};
use dl_core::{DialogueOutput, Value};
use dl_runtime::{AbortReason, DialogueState, MemoryVariableStorage};

use crate::source::{read_nodes_json_from_dir, read_test_case};
use crate::{DlToolError, ExpectedEvent, TestAction, TestCase};

const MAX_STEPS: usize = 5_000;

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub observed_events: Vec<ExpectedEvent>,
    pub consumed_actions: usize,
    pub steps: usize,
    /// Final values of the variables the case expects, read after the run.
    pub variables: BTreeMap<String, Value>,
}

pub fn run_case(demo_dir: &Path, case: &TestCase) -> Result<RunReport, DlToolError> {
    let nodes_json = read_nodes_json_from_dir(demo_dir)?;
    let mut options = CreateDialogueFromJsonOptions::new(nodes_json);
    options.start_node = case.start_node.clone();
    options.variable_storage = Some(Box::new(MemoryVariableStorage::with_values(
        case.variables.clone(),
    )));
    let PreparedDialogue {
        mut dialogue,
        start_node,
    } = create_dialogue_from_json(options)?;

    let mut observed_events = Vec::new();
    let mut action_index = 0usize;
    let mut steps = 0usize;

    let mut run = dialogue.run(Some(start_node.as_str()))?;
    for output in run.by_ref() {
        steps += 1;
        if steps > MAX_STEPS {
            return Err(DlToolError::GuardExceeded {
                max_steps: MAX_STEPS,
            });
        }

        match output? {
            DialogueOutput::Line(text) => observed_events.push(ExpectedEvent::Line { text }),
            DialogueOutput::Command(text) => {
                observed_events.push(ExpectedEvent::Command { text })
            }
            DialogueOutput::Options(set) => {
                observed_events.push(ExpectedEvent::Options {
                    options: set.options.clone(),
                });
                let event_index = observed_events.len() - 1;
                let action = case
                    .actions
                    .get(action_index)
                    .ok_or(DlToolError::MissingAction { event_index })?;
                match action {
                    TestAction::Choose { index } => set.select(*index),
                }
                action_index += 1;
            }
        }
    }

    let final_event = match run.state() {
        DialogueState::Aborted(AbortReason::NodeNotFound(node)) => ExpectedEvent::Aborted {
            reason: format!("node-not-found:{}", node),
        },
        DialogueState::Aborted(AbortReason::AssertionFailed) => ExpectedEvent::Aborted {
            reason: "assertion-failed".to_string(),
        },
        _ => ExpectedEvent::End,
    };
    drop(run);
    observed_events.push(final_event);

    if action_index != case.actions.len() {
        return Err(DlToolError::UnusedActions {
            used: action_index,
            total: case.actions.len(),
        });
    }

    let variables = case
        .expected_variables
        .keys()
        .map(|name| (name.clone(), dialogue.variables().get(name)))
        .collect();

    Ok(RunReport {
        observed_events,
        consumed_actions: action_index,
        steps,
        variables,
    })
}

pub fn assert_case(demo_dir: &Path, case_path: &Path) -> Result<(), DlToolError> {
    let case = read_test_case(case_path)?;
    let report = run_case(demo_dir, &case)?;

    if report.observed_events.len() != case.expected_events.len() {
        let observed = serde_json::to_string_pretty(&report.observed_events)
            .map_err(DlToolError::EventSerialize)?;
        return Err(DlToolError::EventCountMismatch {
            expected: case.expected_events.len(),
            actual: report.observed_events.len(),
            observed,
        });
    }

    for (index, (expected, actual)) in case
        .expected_events
        .iter()
        .zip(report.observed_events.iter())
        .enumerate()
    {
        if expected != actual {
            let expected = serde_json::to_string(expected).map_err(DlToolError::EventSerialize)?;
            let actual = serde_json::to_string(actual).map_err(DlToolError::EventSerialize)?;
            return Err(DlToolError::EventMismatch {
                index,
                expected,
                actual,
            });
        }
    }

    for (name, expected) in &case.expected_variables {
        let actual = report.variables.get(name).cloned().unwrap_or(Value::Null);
        if *expected != actual {
            return Err(DlToolError::VariableMismatch {
                name: name.clone(),
                expected: format!("{:?}", expected),
                actual: format!("{:?}", actual),
            });
        }
    }

    Ok(())
}
