//! Reads and parses a job document file: load the raw YAML, expand
//! `${VAR}`/`${VAR:-default}` environment-variable references via
//! `regex-lite`, then deserialize into a [`Document`](super::Document).

use std::path::Path;

use regex_lite::Regex;
use taskcraft_core::{EngineError, EngineResult};
use tracing::debug;

use super::schema::{Document, RawDocument};

/// Loads and parses the job document at `path`, expanding `${VAR}` and
/// `${VAR:-default}` environment-variable references before YAML parsing.
pub fn load_document(path: &Path) -> EngineResult<Document> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        EngineError::schema(format!("failed to read document {}: {e}", path.display()))
    })?;

    if raw.trim().is_empty() {
        return Err(EngineError::NoData);
    }

    let expanded = expand_env_vars(&raw);
    debug!(path = %path.display(), "parsed job document");

    let raw_document: RawDocument = serde_yaml::from_str(&expanded)?;
    Ok(raw_document.into())
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(:-([^}]*))?\}").expect("valid regex")
    })
}

fn expand_env_vars(input: &str) -> String {
    let pattern = env_var_pattern();
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for caps in pattern.captures_iter(input) {
        let m = caps.get(0).expect("full match always present");
        out.push_str(&input[last..m.start()]);
        let name = &caps[1];
        let default = caps.get(3).map(|m| m.as_str()).unwrap_or("");
        match std::env::var(name) {
            Ok(value) => out.push_str(&value),
            Err(_) => out.push_str(default),
        }
        last = m.end();
    }
    out.push_str(&input[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_simple_var() {
        unsafe { std::env::set_var("TASKCRAFT_DOC_TEST", "resolved") };
        assert_eq!(expand_env_vars("${TASKCRAFT_DOC_TEST}"), "resolved");
        unsafe { std::env::remove_var("TASKCRAFT_DOC_TEST") };
    }

    #[test]
    fn falls_back_to_default() {
        assert_eq!(expand_env_vars("${TASKCRAFT_DOC_MISSING:-fallback}"), "fallback");
    }

    #[test]
    fn empty_document_is_no_data() {
        let dir = std::env::temp_dir().join(format!("taskcraft-doc-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("empty.yaml");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(load_document(&path), Err(EngineError::NoData)));
    }
}
