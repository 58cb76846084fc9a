use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{DlToolError, TestCase, TESTCASE_SCHEMA_V1};

pub const TESTCASE_FILE_NAME: &str = "testcase.json";

pub fn demos_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("demos")
}

/// Subdirectories of `root` holding a testcase file, sorted by path.
pub fn demo_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .filter(|path| path.join(TESTCASE_FILE_NAME).is_file())
        .collect::<Vec<_>>();
    dirs.sort();
    dirs
}

/// Collects every node document (`*.json` other than the testcase) keyed
/// by its path relative to `dir`.
pub fn read_nodes_json_from_dir(dir: &Path) -> Result<BTreeMap<String, String>, DlToolError> {
    let mut documents = BTreeMap::new();

    for entry in WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let is_json = path.extension().and_then(|ext| ext.to_str()) == Some("json");
        let is_case = path.file_name().and_then(|name| name.to_str()) == Some(TESTCASE_FILE_NAME);
        if !is_json || is_case {
            continue;
        }

        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");

        let content = fs::read_to_string(path).map_err(|source| DlToolError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        documents.insert(relative, content);
    }

    if documents.is_empty() {
        return Err(DlToolError::SourceEmpty {
            path: dir.to_path_buf(),
        });
    }

    Ok(documents)
}

pub fn read_test_case(case_path: &Path) -> Result<TestCase, DlToolError> {
    let raw = fs::read_to_string(case_path).map_err(|source| DlToolError::ReadFile {
        path: case_path.to_path_buf(),
        source,
    })?;
    let parsed: TestCase = serde_json::from_str(&raw).map_err(|source| DlToolError::ParseCase {
        path: case_path.to_path_buf(),
        source,
    })?;

    if parsed.schema_version != TESTCASE_SCHEMA_V1 {
        return Err(DlToolError::InvalidSchemaVersion {
            expected: TESTCASE_SCHEMA_V1.to_string(),
            found: parsed.schema_version,
        });
    }

    Ok(parsed)
}
