use std::fmt::Display;
use std::io::Write;

use dl_core::DialogueError;
use serde_json::json;

fn map_error(code: &'static str, error: impl Display) -> DialogueError {
    DialogueError::new(code, error.to_string())
}

/// Reports `error` as one JSON object on `writer` and returns the exit code.
pub(crate) fn emit_error_to(error: &DialogueError, writer: &mut dyn Write) -> i32 {
    let payload = json!({ "code": error.code, "message": error.message });
    let _ = writeln!(writer, "{}", payload);
    1
}

pub(crate) fn emit_error(error: DialogueError) -> i32 {
    emit_error_to(&error, &mut std::io::stderr())
}

pub(crate) fn map_cli_io(error: std::io::Error) -> DialogueError {
    map_error("CLI_IO", error)
}

pub(crate) fn map_cli_source_path(error: std::io::Error) -> DialogueError {
    map_error("CLI_SOURCE_PATH", error)
}

pub(crate) fn map_cli_source_scan(error: std::path::StripPrefixError) -> DialogueError {
    map_error("CLI_SOURCE_SCAN", error)
}

pub(crate) fn map_cli_source_read(error: std::io::Error) -> DialogueError {
    map_error("CLI_SOURCE_READ", error)
}

pub(crate) fn map_cli_event_json(error: serde_json::Error) -> DialogueError {
    map_error("CLI_EVENT_JSON", error)
}
