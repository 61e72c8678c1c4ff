//! Documentos JSON con líneas y runs para poblar el backend en memoria.
use std::path::Path;

use line_domain::{Line, Run};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub lines: Vec<Line>,
    #[serde(default)]
    pub runs: Vec<Run>,
}

impl Fixture {
    pub fn from_json_str(text: &str) -> Result<Self, CoreError> {
        serde_json::from_str(text).map_err(|e| CoreError::Fixture(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CoreError::Fixture(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self).map_err(|e| CoreError::Fixture(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_valid() {
        let f = Fixture::from_json_str("{}").unwrap();
        assert!(f.lines.is_empty() && f.runs.is_empty());
    }

    #[test]
    fn bad_kind_is_reported_as_fixture_error() {
        let text = r#"{"lines":[{"id":"6f1c6a43-64c1-4b52-9a2a-0b9a5b1f7c10","name":"l",
                      "steps":[{"id":"6f1c6a43-64c1-4b52-9a2a-0b9a5b1f7c11","kind":"audit"}]}]}"#;
        match Fixture::from_json_str(text) {
            Err(CoreError::Fixture(msg)) => assert!(msg.contains("unknown step kind"), "{msg}"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_fixture_error() {
        assert!(matches!(Fixture::from_path("/definitely/not/here.json"), Err(CoreError::Fixture(_))));
    }
}
