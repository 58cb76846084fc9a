use std::io::{BufRead, Write};

use dl_core::{DialogueError, DialogueOutput};
use dl_runtime::{Dialogue, DialogueState};

use crate::{abort_reason_label, map_cli_io};

const HELP: &str = "commands: :help :quit, or an option number";

enum LineCommand {
    Help,
    Quit,
    Choose(usize),
    Invalid(String),
}

fn parse_line_command(raw: &str, option_count: usize) -> LineCommand {
    match raw.trim() {
        ":help" => LineCommand::Help,
        ":quit" => LineCommand::Quit,
        other => match other.parse::<usize>() {
            Ok(index) if index < option_count => LineCommand::Choose(index),
            _ => LineCommand::Invalid(format!(
                "Invalid choice \"{}\", expected 0..{}.",
                other,
                option_count.saturating_sub(1)
            )),
        },
    }
}

/// Plays one run, reading option numbers from `reader`. End of input quits.
pub(crate) fn run_play_with_io(
    dialogue: &mut Dialogue,
    start_node: &str,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, DialogueError> {
    writeln!(writer, "Dialogue player").map_err(map_cli_io)?;
    writeln!(writer, "{}", HELP).map_err(map_cli_io)?;

    let mut run = dialogue.run(Some(start_node))?;
    while let Some(output) = run.next() {
        match output? {
            DialogueOutput::Line(text) => {
                writeln!(writer).map_err(map_cli_io)?;
                writeln!(writer, "{}", text).map_err(map_cli_io)?;
            }
            DialogueOutput::Command(text) => {
                writeln!(writer, "<<{}>>", text).map_err(map_cli_io)?;
            }
            DialogueOutput::Options(set) => {
                writeln!(writer).map_err(map_cli_io)?;
                for (index, option) in set.options.iter().enumerate() {
                    writeln!(writer, "  [{}] {}", index, option).map_err(map_cli_io)?;
                }
                loop {
                    let Some(raw) = prompt_input_from("> ", reader, writer)? else {
                        run.stop();
                        return Ok(0);
                    };
                    match parse_line_command(&raw, set.options.len()) {
                        LineCommand::Help => writeln!(writer, "{}", HELP).map_err(map_cli_io)?,
                        LineCommand::Quit => {
                            run.stop();
                            writeln!(writer, "bye").map_err(map_cli_io)?;
                            return Ok(0);
                        }
                        LineCommand::Invalid(message) => {
                            writeln!(writer, "{}", message).map_err(map_cli_io)?
                        }
                        LineCommand::Choose(index) => {
                            set.select(index);
                            break;
                        }
                    }
                }
            }
        }
    }

    writeln!(writer).map_err(map_cli_io)?;
    match run.state() {
        DialogueState::Aborted(reason) => {
            writeln!(writer, "[ABORTED: {}]", abort_reason_label(reason)).map_err(map_cli_io)?
        }
        _ => writeln!(writer, "[END]").map_err(map_cli_io)?,
    }
    Ok(0)
}

/// Returns `None` at end of input.
pub(crate) fn prompt_input_from(
    prefix: &str,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<Option<String>, DialogueError> {
    write!(writer, "{}", prefix).map_err(map_cli_io)?;
    writer.flush().map_err(map_cli_io)?;
    let mut input = String::new();
    if reader.read_line(&mut input).map_err(map_cli_io)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(&['\r', '\n'][..]).to_string()))
}
