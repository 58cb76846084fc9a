use std::collections::BTreeMap;

use dl_core::Value;
use serde::{Deserialize, Serialize};

pub const TESTCASE_SCHEMA_V1: &str = "dl-tool-case.v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub schema_version: String,
    #[serde(default)]
    pub start_node: Option<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
    #[serde(default)]
    pub actions: Vec<TestAction>,
    #[serde(default)]
    pub expected_events: Vec<ExpectedEvent>,
    #[serde(default)]
    pub expected_variables: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TestAction {
    Choose { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExpectedEvent {
    Line { text: String },
    Options { options: Vec<String> },
    Command { text: String },
    End,
    Aborted { reason: String },
}

#[cfg(test)]
mod case_tests {
    use super::*;

    #[test]
    fn testcase_deserialize_applies_defaults() {
        let parsed: TestCase = serde_json::from_str(r#"{"schemaVersion":"dl-tool-case.v1"}"#)
            .expect("testcase should parse");
        assert_eq!(parsed.start_node, None);
        assert!(parsed.variables.is_empty());
        assert!(parsed.actions.is_empty());
        assert!(parsed.expected_events.is_empty());
        assert!(parsed.expected_variables.is_empty());
    }

    #[test]
    fn testcase_deserialize_reads_events_actions_and_variables() {
        let parsed: TestCase = serde_json::from_str(
            r#"{
  "schemaVersion": "dl-tool-case.v1",
  "startNode": "Shop",
  "variables": {"$gold": 3},
  "actions": [{"kind": "choose", "index": 1}],
  "expectedEvents": [
    {"kind": "line", "text": "Hi"},
    {"kind": "options", "options": ["A", "B"]},
    {"kind": "command", "text": "wave"},
    {"kind": "end"},
    {"kind": "aborted", "reason": "assertion-failed"}
  ],
  "expectedVariables": {"$gold": "three"}
}"#,
        )
        .expect("testcase should parse");

        assert_eq!(parsed.start_node.as_deref(), Some("Shop"));
        assert_eq!(parsed.variables.get("$gold"), Some(&Value::Number(3.0)));
        assert_eq!(parsed.actions, vec![TestAction::Choose { index: 1 }]);
        assert_eq!(parsed.expected_events.len(), 5);
        assert_eq!(parsed.expected_events[3], ExpectedEvent::End);
        assert_eq!(
            parsed.expected_events[4],
            ExpectedEvent::Aborted {
                reason: "assertion-failed".to_string()
            }
        );
        assert_eq!(
            parsed.expected_variables.get("$gold"),
            Some(&Value::from("three"))
        );
    }
}
