use std::collections::{BTreeMap, BTreeSet};

use dl_core::{DialogueError, Expression, Node, NodeTable, Statement};
use serde::Deserialize;

pub const NODE_TABLE_SCHEMA_V1: &str = "dl-nodes.v1";

#[derive(Debug, Deserialize)]
struct WrappedDocument {
    #[serde(rename = "schemaVersion", default)]
    schema_version: Option<String>,
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingDestination {
    pub node: String,
    pub destination: String,
}

/// Parses one JSON node document, either a bare array of nodes or an object
/// with a `nodes` array and an optional `schemaVersion`.
pub fn load_node_table_from_json(source: &str) -> Result<NodeTable, DialogueError> {
    let nodes = parse_nodes(source)?;
    build_table(nodes)
}

/// Loads several documents keyed by path into one table. Titles must be
/// unique across all documents.
pub fn load_node_table_from_json_map(
    sources: &BTreeMap<String, String>,
) -> Result<NodeTable, DialogueError> {
    if sources.is_empty() {
        return Err(DialogueError::new(
            "LOADER_SOURCE_EMPTY",
            "No node documents were provided.",
        ));
    }

    let mut nodes = Vec::new();
    let mut origin_by_title: BTreeMap<String, String> = BTreeMap::new();
    for (path, source) in sources {
        let parsed = parse_nodes(source).map_err(|error| {
            DialogueError::new(error.code, format!("{}: {}", path, error.message))
        })?;
        for node in parsed {
            if let Some(previous) = origin_by_title.get(&node.title) {
                return Err(DialogueError::new(
                    "DIALOGUE_DUPLICATE_NODE",
                    format!(
                        "Node \"{}\" is defined in both \"{}\" and \"{}\".",
                        node.title, previous, path
                    ),
                ));
            }
            origin_by_title.insert(node.title.clone(), path.clone());
            nodes.push(node);
        }
    }

    build_table(nodes)
}

/// Link and jump destinations that name no node in `table`.
///
/// These are not load errors since a later table may supply the node, but
/// following one at runtime aborts the run.
pub fn dangling_destinations(table: &NodeTable) -> Vec<DanglingDestination> {
    let mut dangling = Vec::new();
    for node in table.nodes() {
        let mut destinations = BTreeSet::new();
        collect_destinations(&node.body, &mut destinations);
        for destination in destinations {
            if !table.contains(&destination) {
                dangling.push(DanglingDestination {
                    node: node.title.clone(),
                    destination,
                });
            }
        }
    }
    dangling
}

fn parse_nodes(source: &str) -> Result<Vec<Node>, DialogueError> {
    if !source.trim_start().starts_with('{') {
        return serde_json::from_str(source).map_err(parse_error);
    }

    let document: WrappedDocument = serde_json::from_str(source).map_err(parse_error)?;
    if let Some(found) = document.schema_version {
        if found != NODE_TABLE_SCHEMA_V1 {
            return Err(DialogueError::new(
                "LOADER_SCHEMA_VERSION",
                format!(
                    "Unsupported schemaVersion \"{}\", expected \"{}\".",
                    found, NODE_TABLE_SCHEMA_V1
                ),
            ));
        }
    }
    Ok(document.nodes)
}

fn parse_error(error: serde_json::Error) -> DialogueError {
    DialogueError::new("LOADER_PARSE_ERROR", error.to_string())
}

fn build_table(nodes: Vec<Node>) -> Result<NodeTable, DialogueError> {
    for node in &nodes {
        validate_node(node)?;
    }
    NodeTable::from_nodes(nodes)
}

fn validate_node(node: &Node) -> Result<(), DialogueError> {
    if node.title.trim().is_empty() {
        return Err(DialogueError::new(
            "LOADER_NODE_TITLE_EMPTY",
            "Node title must not be empty.",
        ));
    }
    if node.title.trim() != node.title {
        return Err(DialogueError::new(
            "LOADER_NODE_TITLE_WHITESPACE",
            format!(
                "Node title \"{}\" must not have surrounding whitespace.",
                node.title
            ),
        ));
    }
    validate_statements(&node.title, &node.body)
}

fn validate_statements(title: &str, statements: &[Statement]) -> Result<(), DialogueError> {
    for statement in statements {
        match statement {
            Statement::Line { .. } | Statement::Command { .. } => {}
            Statement::Link { destination, .. } | Statement::Jump { destination } => {
                if destination.trim().is_empty() {
                    return Err(DialogueError::new(
                        "LOADER_DESTINATION_EMPTY",
                        format!("Node \"{}\" has a link or jump without destination.", title),
                    ));
                }
            }
            Statement::Set { variable, value } => {
                if variable.trim().is_empty() {
                    return Err(DialogueError::new(
                        "LOADER_VARIABLE_EMPTY",
                        format!("Node \"{}\" assigns to an empty variable name.", title),
                    ));
                }
                validate_expression(title, value)?;
            }
            Statement::Evaluate { expression } => validate_expression(title, expression)?,
            Statement::If { clauses, else_body } => {
                if clauses.is_empty() {
                    return Err(DialogueError::new(
                        "LOADER_IF_WITHOUT_CLAUSE",
                        format!("Node \"{}\" has an if statement without clauses.", title),
                    ));
                }
                for clause in clauses {
                    validate_expression(title, &clause.condition)?;
                    validate_statements(title, &clause.body)?;
                }
                validate_statements(title, else_body)?;
            }
            Statement::Shortcuts { options } => {
                if options.is_empty() {
                    return Err(DialogueError::new(
                        "LOADER_SHORTCUTS_EMPTY",
                        format!("Node \"{}\" has a shortcut block without options.", title),
                    ));
                }
                for option in options {
                    if let Some(condition) = &option.condition {
                        validate_expression(title, condition)?;
                    }
                    validate_statements(title, &option.body)?;
                }
            }
        }
    }
    Ok(())
}

fn validate_expression(title: &str, expression: &Expression) -> Result<(), DialogueError> {
    match expression {
        Expression::Literal { .. } => Ok(()),
        Expression::Variable { name } if name.trim().is_empty() => Err(DialogueError::new(
            "LOADER_VARIABLE_EMPTY",
            format!("Node \"{}\" reads an empty variable name.", title),
        )),
        Expression::Variable { .. } => Ok(()),
        Expression::Call { function, args } => {
            if function.trim().is_empty() {
                return Err(DialogueError::new(
                    "LOADER_FUNCTION_EMPTY",
                    format!("Node \"{}\" calls a function without a name.", title),
                ));
            }
            args.iter()
                .try_for_each(|arg| validate_expression(title, arg))
        }
    }
}

fn collect_destinations(statements: &[Statement], out: &mut BTreeSet<String>) {
    for statement in statements {
        match statement {
            Statement::Link { destination, .. } | Statement::Jump { destination } => {
                out.insert(destination.clone());
            }
            Statement::If { clauses, else_body } => {
                for clause in clauses {
                    collect_destinations(&clause.body, out);
                }
                collect_destinations(else_body, out);
            }
            Statement::Shortcuts { options } => {
                for option in options {
                    collect_destinations(&option.body, out);
                }
            }
            Statement::Line { .. }
            | Statement::Command { .. }
            | Statement::Set { .. }
            | Statement::Evaluate { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn loads_bare_array_document() {
        let table = load_node_table_from_json(
            r#"[{"title":"Start","body":[{"kind":"line","text":"Hello"}]}]"#,
        )
        .expect("load should pass");
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.get("Start").expect("node").body,
            vec![Statement::Line {
                text: "Hello".to_string()
            }]
        );
    }

    #[test]
    fn loads_wrapped_document_and_checks_schema_version() {
        let table = load_node_table_from_json(
            r#"{"schemaVersion":"dl-nodes.v1","nodes":[{"title":"Start","tags":["intro"]}]}"#,
        )
        .expect("load should pass");
        assert_eq!(table.get("Start").expect("node").tags, vec!["intro"]);

        let error = load_node_table_from_json(r#"{"schemaVersion":"v0","nodes":[]}"#)
            .expect_err("unknown schema should fail");
        assert_eq!(error.code, "LOADER_SCHEMA_VERSION");
    }

    #[test]
    fn rejects_malformed_json_and_unknown_statement_kinds() {
        let error = load_node_table_from_json("{").expect_err("malformed json should fail");
        assert_eq!(error.code, "LOADER_PARSE_ERROR");

        let error = load_node_table_from_json(
            r#"[{"title":"Start","body":[{"kind":"teleport"}]}]"#,
        )
        .expect_err("unknown kind should fail");
        assert_eq!(error.code, "LOADER_PARSE_ERROR");
    }

    #[test]
    fn parse_errors_keep_field_and_position() {
        let error = load_node_table_from_json(
            "[\n  {\"title\":\"Start\",\"body\":[\n    {\"kind\":\"link\",\"text\":\"Go\"}\n  ]}\n]",
        )
        .expect_err("link without destination should fail");
        assert_eq!(error.code, "LOADER_PARSE_ERROR");
        assert!(error.message.contains("destination"), "{}", error.message);
        assert!(error.message.contains("line 3"), "{}", error.message);

        let error = load_node_table_from_json(
            r#"{"schemaVersion":"dl-nodes.v1","nodes":[{"body":[]}]}"#,
        )
        .expect_err("wrapped node without title should fail");
        assert_eq!(error.code, "LOADER_PARSE_ERROR");
        assert!(error.message.contains("title"), "{}", error.message);
        assert!(error.message.contains("line 1"), "{}", error.message);
    }

    #[test]
    fn option_kind_reads_as_link() {
        let table = load_node_table_from_json(
            r#"[{"title":"Start","body":[{"kind":"option","text":"Go","destination":"Room"}]},{"title":"Room"}]"#,
        )
        .expect("load should pass");
        assert_eq!(
            table.get("Start").expect("node").body,
            vec![Statement::Link {
                text: "Go".to_string(),
                destination: "Room".to_string(),
            }]
        );
    }

    #[test]
    fn rejects_invalid_titles_and_empty_names() {
        let cases = [
            (r#"[{"title":"  "}]"#, "LOADER_NODE_TITLE_EMPTY"),
            (r#"[{"title":" Start"}]"#, "LOADER_NODE_TITLE_WHITESPACE"),
            (
                r#"[{"title":"A","body":[{"kind":"jump","destination":""}]}]"#,
                "LOADER_DESTINATION_EMPTY",
            ),
            (
                r#"[{"title":"A","body":[{"kind":"set","variable":"","value":{"kind":"literal","value":1}}]}]"#,
                "LOADER_VARIABLE_EMPTY",
            ),
            (
                r#"[{"title":"A","body":[{"kind":"evaluate","expression":{"kind":"call","function":""}}]}]"#,
                "LOADER_FUNCTION_EMPTY",
            ),
            (
                r#"[{"title":"A","body":[{"kind":"if","clauses":[]}]}]"#,
                "LOADER_IF_WITHOUT_CLAUSE",
            ),
            (
                r#"[{"title":"A","body":[{"kind":"shortcuts","options":[]}]}]"#,
                "LOADER_SHORTCUTS_EMPTY",
            ),
            (r#"[{"title":"A"},{"title":"A"}]"#, "DIALOGUE_DUPLICATE_NODE"),
        ];
        for (source, code) in cases {
            let error = load_node_table_from_json(source).expect_err("invalid table should fail");
            assert_eq!(error.code, code, "source={}", source);
        }
    }

    #[test]
    fn json_map_merges_documents_and_reports_cross_file_duplicates() {
        let table = load_node_table_from_json_map(&map(&[
            ("a.json", r#"[{"title":"Start"}]"#),
            ("b.json", r#"[{"title":"End"}]"#),
        ]))
        .expect("load should pass");
        assert_eq!(table.titles().collect::<Vec<_>>(), vec!["End", "Start"]);

        let error = load_node_table_from_json_map(&map(&[
            ("a.json", r#"[{"title":"Start"}]"#),
            ("b.json", r#"[{"title":"Start"}]"#),
        ]))
        .expect_err("duplicate should fail");
        assert_eq!(error.code, "DIALOGUE_DUPLICATE_NODE");
        assert!(error.message.contains("a.json"));

        let error = load_node_table_from_json_map(&map(&[("bad.json", "[")]))
            .expect_err("parse error should fail");
        assert!(error.message.starts_with("bad.json: "));

        let error = load_node_table_from_json_map(&BTreeMap::new())
            .expect_err("empty map should fail");
        assert_eq!(error.code, "LOADER_SOURCE_EMPTY");
    }

    #[test]
    fn dangling_destinations_lists_links_to_unknown_nodes() {
        let table = load_node_table_from_json(
            r#"[
  {"title":"Start","body":[
    {"kind":"link","text":"Go","destination":"Room"},
    {"kind":"if","clauses":[{"condition":{"kind":"literal","value":true},"body":[
      {"kind":"jump","destination":"Nowhere"}
    ]}]}
  ]},
  {"title":"Room"}
]"#,
        )
        .expect("load should pass");

        assert_eq!(
            dangling_destinations(&table),
            vec![DanglingDestination {
                node: "Start".to_string(),
                destination: "Nowhere".to_string(),
            }]
        );
    }
}
