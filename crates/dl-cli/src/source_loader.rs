use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use dl_core::DialogueError;
use walkdir::WalkDir;

use crate::{map_cli_source_path, map_cli_source_read, map_cli_source_scan};

const TESTCASE_FILE_NAME: &str = "testcase.json";

pub(crate) fn resolve_nodes_path(nodes: &str) -> Result<PathBuf, DialogueError> {
    let path = PathBuf::from(nodes);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(map_cli_source_path)?
            .join(path)
    };

    if !absolute.exists() {
        return Err(DialogueError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("nodes path does not exist: {}", absolute.display()),
        ));
    }

    Ok(absolute)
}

/// Reads one node table file, or every `.json` file below a directory
/// except test cases, keyed by path relative to the scanned root.
pub(crate) fn read_nodes_json(path: &Path) -> Result<BTreeMap<String, String>, DialogueError> {
    if path.is_file() {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content = fs::read_to_string(path).map_err(map_cli_source_read)?;
        return Ok(BTreeMap::from([(name, content)]));
    }

    let mut documents = BTreeMap::new();
    for entry in WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let file = entry.path();
        let is_json = file.extension().and_then(|ext| ext.to_str()) == Some("json");
        let is_case = file.file_name().and_then(|name| name.to_str()) == Some(TESTCASE_FILE_NAME);
        if !is_json || is_case {
            continue;
        }

        let relative = file
            .strip_prefix(path)
            .map_err(map_cli_source_scan)?
            .to_string_lossy()
            .replace('\\', "/");
        let content = fs::read_to_string(file).map_err(map_cli_source_read)?;
        documents.insert(relative, content);
    }

    if documents.is_empty() {
        return Err(DialogueError::new(
            "CLI_SOURCE_EMPTY",
            format!("No .json node tables under {}", path.display()),
        ));
    }

    Ok(documents)
}
