use std::rc::Rc;

use dl_core::{
    DialogueError, Node, NodeStep, OptionSelector, OptionSet, SelectionSlot, ShortcutOption,
    Statement,
};

use super::{evaluate, EvalContext, ExecutionEngine, NodeExecution};

#[derive(Debug, Clone, Copy, Default)]
pub struct TreeWalkEngine;

impl ExecutionEngine for TreeWalkEngine {
    fn begin(&self, node: &Node) -> Box<dyn NodeExecution> {
        Box::new(TreeWalkExecution::new(node))
    }
}

#[derive(Debug)]
struct Block {
    statements: Rc<[Statement]>,
    index: usize,
}

impl Block {
    fn new(statements: Vec<Statement>) -> Self {
        Self {
            statements: Rc::from(statements),
            index: 0,
        }
    }
}

#[derive(Debug)]
enum PendingChoice {
    Shortcuts {
        bodies: Vec<Vec<Statement>>,
        slot: SelectionSlot,
    },
    Links {
        destinations: Vec<String>,
        slot: SelectionSlot,
    },
}

#[derive(Debug)]
pub struct TreeWalkExecution {
    title: String,
    blocks: Vec<Block>,
    links: Vec<(String, String)>,
    pending_choice: Option<PendingChoice>,
    finished: bool,
}

impl TreeWalkExecution {
    pub fn new(node: &Node) -> Self {
        Self {
            title: node.title.clone(),
            blocks: vec![Block::new(node.body.clone())],
            links: Vec::new(),
            pending_choice: None,
            finished: false,
        }
    }

    fn resume_choice(&mut self, pending: PendingChoice) -> Result<Option<NodeStep>, DialogueError> {
        match pending {
            PendingChoice::Shortcuts { bodies, slot } => {
                let index = self.selected_index(&slot, bodies.len())?;
                if let Some(body) = bodies.into_iter().nth(index) {
                    self.blocks.push(Block::new(body));
                }
                Ok(None)
            }
            PendingChoice::Links { destinations, slot } => {
                let index = self.selected_index(&slot, destinations.len())?;
                let destination = destinations.into_iter().nth(index);
                Ok(Some(self.complete(destination)))
            }
        }
    }

    fn selected_index(&self, slot: &SelectionSlot, count: usize) -> Result<usize, DialogueError> {
        let Some(index) = slot.take() else {
            return Err(DialogueError::new(
                "ENGINE_NO_OPTION_SELECTED",
                format!(
                    "Options in node \"{}\" were pulled past without a selection.",
                    self.title
                ),
            ));
        };

        if index >= count {
            return Err(DialogueError::new(
                "ENGINE_OPTION_INDEX",
                format!(
                    "Option index \"{}\" is out of range for {} option(s) in node \"{}\".",
                    index, count, self.title
                ),
            ));
        }

        Ok(index)
    }

    fn complete(&mut self, next: Option<String>) -> NodeStep {
        self.finished = true;
        self.blocks.clear();
        self.links.clear();
        NodeStep::NodeComplete(next)
    }

    fn end_of_body(&mut self) -> NodeStep {
        if self.links.is_empty() {
            return self.complete(None);
        }

        let (texts, destinations): (Vec<_>, Vec<_>) = self.links.drain(..).unzip();
        let (selector, slot) = OptionSelector::channel();
        self.pending_choice = Some(PendingChoice::Links { destinations, slot });
        NodeStep::Options(OptionSet {
            options: texts,
            selector,
        })
    }

    fn offer_shortcuts(
        &mut self,
        options: Vec<ShortcutOption>,
        context: &mut EvalContext<'_>,
    ) -> Result<Option<NodeStep>, DialogueError> {
        let mut texts = Vec::new();
        let mut bodies = Vec::new();
        for option in options {
            if let Some(condition) = &option.condition {
                if !evaluate(condition, context)?.as_bool() {
                    continue;
                }
            }
            texts.push(option.text);
            bodies.push(option.body);
        }

        if texts.is_empty() {
            return Ok(None);
        }

        let (selector, slot) = OptionSelector::channel();
        self.pending_choice = Some(PendingChoice::Shortcuts { bodies, slot });
        Ok(Some(NodeStep::Options(OptionSet {
            options: texts,
            selector,
        })))
    }
}

impl NodeExecution for TreeWalkExecution {
    fn next_step(&mut self, context: &mut EvalContext<'_>) -> Result<NodeStep, DialogueError> {
        if self.finished {
            return Err(DialogueError::new(
                "ENGINE_NODE_EXHAUSTED",
                format!("Node \"{}\" has already completed.", self.title),
            ));
        }

        if let Some(pending) = self.pending_choice.take() {
            if let Some(step) = self.resume_choice(pending)? {
                return Ok(step);
            }
        }

        loop {
            let Some(block) = self.blocks.last_mut() else {
                return Ok(self.end_of_body());
            };
            let Some(statement) = block.statements.get(block.index).cloned() else {
                self.blocks.pop();
                continue;
            };
            block.index += 1;

            match statement {
                Statement::Line { text } => return Ok(NodeStep::Line(text)),
                Statement::Command { text } => return Ok(NodeStep::Command(text)),
                Statement::Link { text, destination } => self.links.push((text, destination)),
                Statement::Jump { destination } => return Ok(self.complete(Some(destination))),
                Statement::Set { variable, value } => {
                    let value = evaluate(&value, context)?;
                    tracing::trace!(node = %self.title, %variable, %value, "set variable");
                    context.variables.set(&variable, value);
                }
                Statement::Evaluate { expression } => {
                    evaluate(&expression, context)?;
                }
                Statement::If { clauses, else_body } => {
                    let mut branch = else_body;
                    for clause in clauses {
                        if evaluate(&clause.condition, context)?.as_bool() {
                            branch = clause.body;
                            break;
                        }
                    }
                    self.blocks.push(Block::new(branch));
                }
                Statement::Shortcuts { options } => {
                    if let Some(step) = self.offer_shortcuts(options, context)? {
                        return Ok(step);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use dl_core::{Expression, IfClause, Operator, StandardOperatorSet, Value};

    use crate::variables::{MemoryVariableStorage, VariableStorage};

    fn node(body: Vec<Statement>) -> Node {
        Node {
            title: "Start".to_string(),
            tags: Vec::new(),
            body,
        }
    }

    fn line(text: &str) -> Statement {
        Statement::Line {
            text: text.to_string(),
        }
    }

    struct Harness {
        library: dl_core::FunctionLibrary,
        variables: MemoryVariableStorage,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                library: StandardOperatorSet::new(),
                variables: MemoryVariableStorage::new(),
            }
        }

        fn pull(&mut self, execution: &mut TreeWalkExecution) -> Result<NodeStep, DialogueError> {
            let mut context = EvalContext {
                library: &self.library,
                variables: &mut self.variables,
            };
            execution.next_step(&mut context)
        }
    }

    #[test]
    fn yields_lines_and_commands_then_completes_without_next() {
        let mut harness = Harness::new();
        let mut execution = TreeWalkExecution::new(&node(vec![
            line("a"),
            Statement::Command {
                text: "shake".to_string(),
            },
        ]));

        assert!(matches!(harness.pull(&mut execution), Ok(NodeStep::Line(text)) if text == "a"));
        assert!(
            matches!(harness.pull(&mut execution), Ok(NodeStep::Command(text)) if text == "shake")
        );
        assert!(matches!(
            harness.pull(&mut execution),
            Ok(NodeStep::NodeComplete(None))
        ));
        let exhausted = harness
            .pull(&mut execution)
            .expect_err("pull after completion should fail");
        assert_eq!(exhausted.code, "ENGINE_NODE_EXHAUSTED");
    }

    #[test]
    fn jump_ends_the_node_immediately() {
        let mut harness = Harness::new();
        let mut execution = TreeWalkExecution::new(&node(vec![
            Statement::Jump {
                destination: "Next".to_string(),
            },
            line("unreachable"),
        ]));
        assert!(matches!(
            harness.pull(&mut execution),
            Ok(NodeStep::NodeComplete(Some(next))) if next == "Next"
        ));
    }

    #[test]
    fn links_are_offered_at_end_of_body_and_selection_picks_destination() {
        let mut harness = Harness::new();
        let mut execution = TreeWalkExecution::new(&node(vec![
            Statement::Link {
                text: "Go left".to_string(),
                destination: "Left".to_string(),
            },
            line("before options"),
            Statement::Link {
                text: "Go right".to_string(),
                destination: "Right".to_string(),
            },
        ]));

        assert!(matches!(harness.pull(&mut execution), Ok(NodeStep::Line(_))));
        let Ok(NodeStep::Options(set)) = harness.pull(&mut execution) else {
            panic!("expected options");
        };
        assert_eq!(set.options, vec!["Go left", "Go right"]);
        set.select(1);
        assert!(matches!(
            harness.pull(&mut execution),
            Ok(NodeStep::NodeComplete(Some(next))) if next == "Right"
        ));
    }

    #[test]
    fn shortcuts_run_selected_body_inline_and_hide_false_conditions() {
        let mut harness = Harness::new();
        let mut execution = TreeWalkExecution::new(&node(vec![
            Statement::Shortcuts {
                options: vec![
                    ShortcutOption {
                        text: "Hidden".to_string(),
                        condition: Some(Expression::literal(false)),
                        body: vec![line("never")],
                    },
                    ShortcutOption {
                        text: "Wave".to_string(),
                        condition: None,
                        body: vec![line("You wave.")],
                    },
                ],
            },
            line("after"),
        ]));

        let Ok(NodeStep::Options(set)) = harness.pull(&mut execution) else {
            panic!("expected options");
        };
        assert_eq!(set.options, vec!["Wave"]);
        set.select(0);
        assert!(
            matches!(harness.pull(&mut execution), Ok(NodeStep::Line(text)) if text == "You wave.")
        );
        assert!(matches!(harness.pull(&mut execution), Ok(NodeStep::Line(text)) if text == "after"));
    }

    #[test]
    fn shortcuts_without_visible_options_are_skipped() {
        let mut harness = Harness::new();
        let mut execution = TreeWalkExecution::new(&node(vec![
            Statement::Shortcuts {
                options: vec![ShortcutOption {
                    text: "Hidden".to_string(),
                    condition: Some(Expression::literal(0)),
                    body: Vec::new(),
                }],
            },
            line("after"),
        ]));
        assert!(matches!(harness.pull(&mut execution), Ok(NodeStep::Line(text)) if text == "after"));
    }

    #[test]
    fn missing_or_out_of_range_selection_fails() {
        let body = vec![Statement::Link {
            text: "Only".to_string(),
            destination: "Next".to_string(),
        }];

        let mut harness = Harness::new();
        let mut unselected = TreeWalkExecution::new(&node(body.clone()));
        let Ok(NodeStep::Options(_set)) = harness.pull(&mut unselected) else {
            panic!("expected options");
        };
        let error = harness
            .pull(&mut unselected)
            .expect_err("missing selection should fail");
        assert_eq!(error.code, "ENGINE_NO_OPTION_SELECTED");

        let mut out_of_range = TreeWalkExecution::new(&node(body));
        let Ok(NodeStep::Options(set)) = harness.pull(&mut out_of_range) else {
            panic!("expected options");
        };
        set.select(3);
        let error = harness
            .pull(&mut out_of_range)
            .expect_err("out of range selection should fail");
        assert_eq!(error.code, "ENGINE_OPTION_INDEX");
    }

    #[test]
    fn set_and_if_follow_first_true_clause() {
        let mut harness = Harness::new();
        let mut execution = TreeWalkExecution::new(&node(vec![
            Statement::Set {
                variable: "$gold".to_string(),
                value: Expression::literal(3),
            },
            Statement::If {
                clauses: vec![
                    IfClause {
                        condition: Expression::operator(
                            Operator::GreaterThan,
                            vec![Expression::variable("$gold"), Expression::literal(5)],
                        ),
                        body: vec![line("rich")],
                    },
                    IfClause {
                        condition: Expression::operator(
                            Operator::GreaterThan,
                            vec![Expression::variable("$gold"), Expression::literal(1)],
                        ),
                        body: vec![line("comfortable")],
                    },
                ],
                else_body: vec![line("poor")],
            },
        ]));

        assert!(
            matches!(harness.pull(&mut execution), Ok(NodeStep::Line(text)) if text == "comfortable")
        );
        assert_eq!(harness.variables.get("$gold"), Value::Number(3.0));
    }

    #[test]
    fn evaluation_errors_surface_from_the_pull() {
        let mut harness = Harness::new();
        let mut execution = TreeWalkExecution::new(&node(vec![Statement::Evaluate {
            expression: Expression::call("undefined", vec![]),
        }]));
        let error = harness
            .pull(&mut execution)
            .expect_err("unknown function should fail");
        assert_eq!(error.code, "LIBRARY_FUNCTION_NOT_FOUND");
    }

    #[test]
    fn long_silent_prelude_still_reaches_its_line() {
        let mut harness = Harness::new();
        let mut body = (0..20_000)
            .map(|_| Statement::Evaluate {
                expression: Expression::literal(true),
            })
            .collect::<Vec<_>>();
        body.push(line("done"));
        let mut execution = TreeWalkExecution::new(&node(body));

        assert!(matches!(harness.pull(&mut execution), Ok(NodeStep::Line(text)) if text == "done"));
        assert!(matches!(
            harness.pull(&mut execution),
            Ok(NodeStep::NodeComplete(None))
        ));
    }
}
