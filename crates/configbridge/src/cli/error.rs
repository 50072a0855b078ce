//! Helpful error output for the CLI
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use configbridge_core::{BridgeError, RUNTIME_LAUNCHER};
use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    /// Create a new helpful error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a suggestion for fixing the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add multiple suggestions
    pub fn with_suggestions(mut self, suggestions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    /// Build the user-facing report for a pipeline error.
    pub fn from_bridge(err: &BridgeError) -> Self {
        match err {
            BridgeError::Validation { message } => Self::invalid_request(message),
            BridgeError::NotFound { path, message } => Self::file_not_found(path, message),
            BridgeError::Application { message, .. } => Self::application_failed(message),
            BridgeError::Unexpected(inner) => Self::new(format!("{:#}", inner))
                .with_context("An unexpected error stopped the run")
                .with_suggestion("TRY: Re-run with --debug for more detail"),
        }
    }

    fn invalid_request(message: &str) -> Self {
        Self::new(message)
            .with_context("The arguments or the request list could not be validated")
            .with_suggestions([
                r#"TRY: Pass a JSON array: '[{"kind":"Setting","name":"ApiUrl","outputParameter":"apiUrl"}]'"#
                    .to_string(),
                "TRY: Every item needs a 'name' and an 'outputParameter'".to_string(),
                "TRY: Check a request file first: configbridge --json <FILE>".to_string(),
            ])
    }

    fn file_not_found(path: &Path, message: &str) -> Self {
        Self::new(message)
            .with_context("A file this run depends on does not exist")
            .with_suggestions([
                format!("TRY: Check that the file exists: ls -la {}", path.display()),
                "TRY: Use the full path to the executable or .dll".to_string(),
            ])
    }

    fn application_failed(message: &str) -> Self {
        let mut err = Self::new(message).with_context("The launched application did not complete successfully");
        if message.contains(RUNTIME_LAUNCHER) {
            err = err.with_suggestion(format!(
                "TRY: Check that the runtime is installed: {} --info",
                RUNTIME_LAUNCHER
            ));
        }
        err.with_suggestions([
            "TRY: Re-run with --debug to see the command line and resolved values",
            "TRY: Read the application's own output above for its error",
        ])
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpful_error_display() {
        let err = HelpfulError::new("Something went wrong")
            .with_context("While resolving")
            .with_suggestion("TRY: again");

        let display = format!("{}", err);
        assert!(display.contains("ERROR: Something went wrong"));
        assert!(display.contains("CONTEXT: While resolving"));
        assert!(display.contains("  TRY: again"));
    }

    #[test]
    fn test_validation_report() {
        let err = BridgeError::validation("Configuration item 0 is missing a 'name'.");
        let display = HelpfulError::from_bridge(&err).to_string();

        assert!(display.contains("ERROR: Configuration item 0 is missing a 'name'."));
        assert!(display.contains("outputParameter"));
        assert!(display.contains("TRY:"));
    }

    #[test]
    fn test_not_found_report_names_path() {
        let err = BridgeError::not_found("/opt/app/missing.exe", "Application not found at path: /opt/app/missing.exe");
        let display = HelpfulError::from_bridge(&err).to_string();

        assert!(display.contains("ls -la /opt/app/missing.exe"), "{}", display);
    }

    #[test]
    fn test_launcher_hint_only_for_launcher_failures() {
        let launcher = BridgeError::application(format!(
            "Failed to start application. Ensure '{}' is installed and in your system PATH.",
            RUNTIME_LAUNCHER
        ));
        let display = HelpfulError::from_bridge(&launcher).to_string();
        assert!(display.contains("--info"), "{}", display);

        let exit = BridgeError::application("Application 'app' (executed via 'app') exited with code 7.");
        let display = HelpfulError::from_bridge(&exit).to_string();
        assert!(!display.contains("--info"), "{}", display);
        assert!(display.contains("--debug"), "{}", display);
    }

    #[test]
    fn test_unexpected_report_keeps_context_chain() {
        let inner = anyhow::anyhow!("disk on fire").context("Failed to read request file");
        let display = HelpfulError::from_bridge(&BridgeError::Unexpected(inner)).to_string();

        assert!(display.contains("Failed to read request file: disk on fire"), "{}", display);
    }
}
