use std::collections::BTreeMap;

use dl_core::{DialogueError, NodeTable};
use dl_loader::{dangling_destinations, load_node_table_from_json_map};
use dl_runtime::{
    Dialogue, DialogueOptions, LogHandler, MemoryVariableStorage, VariableStorage,
    DEFAULT_START_NODE,
};

pub struct CreateDialogueFromJsonOptions {
    pub nodes_json: BTreeMap<String, String>,
    pub start_node: Option<String>,
    pub variable_storage: Option<Box<dyn VariableStorage>>,
    pub log_debug: Option<LogHandler>,
    pub log_error: Option<LogHandler>,
}

impl CreateDialogueFromJsonOptions {
    pub fn new(nodes_json: BTreeMap<String, String>) -> Self {
        Self {
            nodes_json,
            start_node: None,
            variable_storage: None,
            log_debug: None,
            log_error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedProject {
    pub table: NodeTable,
    pub start_node: String,
}

/// A loaded dialogue together with the node its runs should start from.
#[derive(Debug)]
pub struct PreparedDialogue {
    pub dialogue: Dialogue,
    pub start_node: String,
}

pub fn load_project_from_json_map(
    nodes_json: &BTreeMap<String, String>,
    start_node: Option<String>,
) -> Result<LoadedProject, DialogueError> {
    let table = load_node_table_from_json_map(nodes_json)?;
    for dangling in dangling_destinations(&table) {
        tracing::warn!(
            node = %dangling.node,
            destination = %dangling.destination,
            "destination names no loaded node"
        );
    }
    let start_node = resolve_start_node(&table, start_node)?;
    Ok(LoadedProject { table, start_node })
}

/// Builds a dialogue from JSON documents. Missing log handlers default to
/// forwarding into `tracing`.
pub fn create_dialogue_from_json(
    options: CreateDialogueFromJsonOptions,
) -> Result<PreparedDialogue, DialogueError> {
    let project = load_project_from_json_map(&options.nodes_json, options.start_node)?;

    let mut dialogue = Dialogue::new(DialogueOptions {
        variable_storage: options
            .variable_storage
            .unwrap_or_else(|| Box::new(MemoryVariableStorage::new())),
        log_debug: Some(
            options
                .log_debug
                .unwrap_or_else(|| Box::new(|message: &str| tracing::debug!("{}", message))),
        ),
        log_error: Some(
            options
                .log_error
                .unwrap_or_else(|| Box::new(|message: &str| tracing::error!("{}", message))),
        ),
        engine: None,
    });
    dialogue.load_nodes(project.table)?;

    Ok(PreparedDialogue {
        dialogue,
        start_node: project.start_node,
    })
}

fn resolve_start_node(table: &NodeTable, explicit: Option<String>) -> Result<String, DialogueError> {
    if let Some(start) = explicit {
        if !table.contains(&start) {
            return Err(DialogueError::new(
                "API_START_NODE_NOT_FOUND",
                format!("Start node \"{}\" is not defined.", start),
            ));
        }
        return Ok(start);
    }

    if table.contains(DEFAULT_START_NODE) {
        return Ok(DEFAULT_START_NODE.to_string());
    }

    Err(DialogueError::new(
        "API_DEFAULT_START_NOT_FOUND",
        format!(
            "Expected a node titled \"{}\" as default start.",
            DEFAULT_START_NODE
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    use dl_core::{DialogueOutput, Value};

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn load_project_uses_default_start_node() {
        let nodes = map(&[(
            "main.json",
            r#"[{"title":"Start","body":[{"kind":"line","text":"Hello"}]}]"#,
        )]);
        let project = load_project_from_json_map(&nodes, None).expect("load should pass");
        assert_eq!(project.start_node, "Start");
        assert!(project.table.contains("Start"));
    }

    #[test]
    fn load_project_accepts_explicit_start_node() {
        let nodes = map(&[
            ("a.json", r#"[{"title":"Start"}]"#),
            ("b.json", r#"[{"title":"Alt"}]"#),
        ]);
        let project =
            load_project_from_json_map(&nodes, Some("Alt".to_string())).expect("load should pass");
        assert_eq!(project.start_node, "Alt");
    }

    #[test]
    fn load_project_reports_missing_start_nodes() {
        let nodes = map(&[("a.json", r#"[{"title":"Intro"}]"#)]);
        let error = load_project_from_json_map(&nodes, Some("Missing".to_string()))
            .expect_err("missing explicit start should fail");
        assert_eq!(error.code, "API_START_NODE_NOT_FOUND");

        let error =
            load_project_from_json_map(&nodes, None).expect_err("missing default should fail");
        assert_eq!(error.code, "API_DEFAULT_START_NOT_FOUND");
    }

    #[test]
    fn create_dialogue_runs_with_supplied_storage_and_handlers() {
        let nodes = map(&[(
            "main.json",
            r#"[{"title":"Start","body":[
  {"kind":"set","variable":"$seen","value":{"kind":"literal","value":true}},
  {"kind":"line","text":"Hello"},
  {"kind":"jump","destination":"Missing"}
]}]"#,
        )]);
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&errors);
        let mut options = CreateDialogueFromJsonOptions::new(nodes);
        options.variable_storage = Some(Box::new(MemoryVariableStorage::new()));
        options.log_error = Some(Box::new(move |message: &str| {
            sink.borrow_mut().push(message.to_string())
        }));

        let PreparedDialogue {
            mut dialogue,
            start_node,
        } = create_dialogue_from_json(options).expect("dialogue should build");
        let outputs = dialogue
            .run(Some(start_node.as_str()))
            .expect("run should start")
            .collect::<Vec<_>>();

        assert_eq!(outputs.len(), 1);
        assert!(matches!(&outputs[0], Ok(DialogueOutput::Line(text)) if text == "Hello"));
        assert_eq!(dialogue.variables().get("$seen"), Value::Bool(true));
        assert_eq!(errors.borrow().len(), 1);
    }
}
