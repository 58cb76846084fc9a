use std::ffi::OsString;
use std::io;

use clap::Parser;
use dl_api::{create_dialogue_from_json, CreateDialogueFromJsonOptions, PreparedDialogue};
use dl_core::DialogueError;

mod cli_args;
#[cfg(test)]
mod cli_test_support;
mod error_map;
mod line_mode;
mod logging;
mod source_loader;
mod trace;

pub(crate) use cli_args::{Cli, Mode, PlayArgs, SourceArgs, TraceArgs};
pub(crate) use error_map::{
    emit_error, map_cli_event_json, map_cli_io, map_cli_source_path, map_cli_source_read,
    map_cli_source_scan,
};
pub(crate) use line_mode::run_play_with_io;
pub(crate) use logging::init_tracing;
pub(crate) use source_loader::{read_nodes_json, resolve_nodes_path};
pub(crate) use trace::{abort_reason_label, run_trace_with_io};

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    init_tracing();
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, DialogueError> {
    match cli.command {
        Mode::Play(args) => run_play(args),
        Mode::Trace(args) => run_trace(args),
    }
}

fn prepare(source: SourceArgs) -> Result<PreparedDialogue, DialogueError> {
    let path = resolve_nodes_path(&source.nodes)?;
    let nodes_json = read_nodes_json(&path)?;
    let mut options = CreateDialogueFromJsonOptions::new(nodes_json);
    options.start_node = source.start;
    create_dialogue_from_json(options)
}

fn run_play(args: PlayArgs) -> Result<i32, DialogueError> {
    let PreparedDialogue {
        mut dialogue,
        start_node,
    } = prepare(args.source)?;
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut writer = io::stdout();
    run_play_with_io(&mut dialogue, &start_node, &mut reader, &mut writer)
}

fn run_trace(args: TraceArgs) -> Result<i32, DialogueError> {
    let PreparedDialogue {
        mut dialogue,
        start_node,
    } = prepare(args.source)?;
    let mut writer = io::stdout();
    run_trace_with_io(&mut dialogue, &start_node, &args.choices, &mut writer)
}
