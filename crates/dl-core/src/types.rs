use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::operators::Operator;
use crate::value::Value;
use crate::DialogueError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Expression {
    Literal {
        value: Value,
    },
    Variable {
        name: String,
    },
    Call {
        function: String,
        #[serde(default)]
        args: Vec<Expression>,
    },
}

impl Expression {
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable { name: name.into() }
    }

    pub fn call(function: impl Into<String>, args: Vec<Expression>) -> Self {
        Self::Call {
            function: function.into(),
            args,
        }
    }

    pub fn operator(operator: Operator, args: Vec<Expression>) -> Self {
        Self::call(operator.canonical_name(), args)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IfClause {
    pub condition: Expression,
    #[serde(default)]
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutOption {
    pub text: String,
    #[serde(default)]
    pub condition: Option<Expression>,
    #[serde(default)]
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Statement {
    Line {
        text: String,
    },
    Command {
        text: String,
    },
    #[serde(alias = "option")]
    Link {
        text: String,
        destination: String,
    },
    Jump {
        destination: String,
    },
    Set {
        variable: String,
        value: Expression,
    },
    Evaluate {
        expression: Expression,
    },
    If {
        clauses: Vec<IfClause>,
        #[serde(default, rename = "elseBody")]
        else_body: Vec<Statement>,
    },
    Shortcuts {
        options: Vec<ShortcutOption>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeTable {
    nodes: BTreeMap<String, Node>,
}

impl NodeTable {
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self, DialogueError> {
        let mut table = BTreeMap::new();
        for node in nodes {
            if table.contains_key(&node.title) {
                return Err(DialogueError::new(
                    "DIALOGUE_DUPLICATE_NODE",
                    format!("Node \"{}\" is defined more than once.", node.title),
                ));
            }
            table.insert(node.title.clone(), node);
        }
        Ok(Self { nodes: table })
    }

    pub fn get(&self, title: &str) -> Option<&Node> {
        self.nodes.get(title)
    }

    pub fn contains(&self, title: &str) -> bool {
        self.nodes.contains_key(title)
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn into_nodes(self) -> impl Iterator<Item = Node> {
        self.nodes.into_values()
    }
}

/// One-shot handle for reporting the host's choice on an [`OptionSet`].
#[derive(Debug)]
pub struct OptionSelector {
    slot: Rc<Cell<Option<usize>>>,
}

impl OptionSelector {
    pub fn channel() -> (Self, SelectionSlot) {
        let slot = Rc::new(Cell::new(None));
        (
            Self {
                slot: Rc::clone(&slot),
            },
            SelectionSlot { slot },
        )
    }

    pub fn select(self, index: usize) {
        self.slot.set(Some(index));
    }
}

#[derive(Debug, Clone)]
pub struct SelectionSlot {
    slot: Rc<Cell<Option<usize>>>,
}

impl SelectionSlot {
    pub fn take(&self) -> Option<usize> {
        self.slot.take()
    }
}

#[derive(Debug)]
pub struct OptionSet {
    pub options: Vec<String>,
    pub selector: OptionSelector,
}

impl OptionSet {
    pub fn select(self, index: usize) {
        self.selector.select(index);
    }
}

/// Step surfaced to the host.
#[derive(Debug)]
pub enum DialogueOutput {
    Line(String),
    Options(OptionSet),
    Command(String),
}

#[derive(Debug)]
pub enum NodeStep {
    Line(String),
    Options(OptionSet),
    Command(String),
    NodeComplete(Option<String>),
}
