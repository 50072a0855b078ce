//! `--json` format mode: turn a request file into a single command-line
//! argument.

use configbridge_core::invocation::escape_argument;
use configbridge_core::{BridgeError, BridgeResult, FileSystem};
use std::path::Path;
use tracing::info;

/// Validate, minify and quote-escape the JSON document at `path`.
///
/// Any well-formed JSON is accepted; the request-list rules are applied only
/// when the result is used for a run.
pub fn format_json_file<F: FileSystem>(fs: &F, path: &Path) -> BridgeResult<String> {
    if !fs.exists(path) {
        return Err(BridgeError::not_found(
            path,
            format!("The specified JSON file was not found: {}", path.display()),
        ));
    }

    let content = fs.read_all_text(path).map_err(|e| {
        BridgeError::Unexpected(
            anyhow::Error::new(e).context(format!("Failed to read JSON file: {}", path.display())),
        )
    })?;

    let document: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
        BridgeError::validation(format!("Invalid JSON in file: {}. Error: {}", path.display(), e))
    })?;

    let minified = serde_json::to_string(&document)
        .map_err(|e| BridgeError::Unexpected(anyhow::Error::new(e)))?;

    info!(path = %path.display(), chars = minified.len(), "Formatted JSON file");
    Ok(escape_argument(&minified))
}
