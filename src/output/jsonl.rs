// Append-only JSON lines sink for generated prompts

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// One generated prompt per benchmark instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRecord {
    pub instance_id: String,
    #[serde(rename = "num_tokens of the message")]
    pub num_tokens: usize,
    pub message: String,
}

/// Append a record as one line, creating the file and its parent directories
pub fn append_jsonl(path: &Path, record: &PromptRecord) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut line = serde_json::to_string(record)?;
    line.push('\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// Instance ids already present in a JSON lines file; empty if it does not exist
pub fn existing_instance_ids(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(path)?;
    contents
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| -> Result<String> { Ok(serde_json::from_str::<PromptRecord>(l)?.instance_id) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str) -> PromptRecord {
        PromptRecord {
            instance_id: id.to_string(),
            num_tokens: 12,
            message: "line one\nline two".to_string(),
        }
    }

    #[test]
    fn test_serialized_keys() {
        let json = serde_json::to_string(&record("django__django-1")).unwrap();
        assert_eq!(
            json,
            r#"{"instance_id":"django__django-1","num_tokens of the message":12,"message":"line one\nline two"}"#
        );
    }

    #[test]
    fn test_append_creates_and_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/nested/prompts.jsonl");

        append_jsonl(&path, &record("a-1")).unwrap();
        append_jsonl(&path, &record("b-2")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert_eq!(existing_instance_ids(&path).unwrap(), vec!["a-1", "b-2"]);
    }

    #[test]
    fn test_existing_ids_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(existing_instance_ids(&dir.path().join("none.jsonl")).unwrap().is_empty());
    }
}
