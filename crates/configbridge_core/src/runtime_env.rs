//! Production detection.
//!
//! Debug diagnostics print configuration values, so they are never emitted
//! when the process runs in production, whatever the caller asked for.

/// Variable naming the deployment environment.
pub const APP_ENV_VAR: &str = "APP_ENV";
/// Value of [`APP_ENV_VAR`] that marks a production runtime.
pub const PRODUCTION: &str = "Production";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeEnv {
    production: bool,
}

impl RuntimeEnv {
    /// Read the indicator from the process environment.
    pub fn from_process() -> Self {
        Self::from_app_env(std::env::var(APP_ENV_VAR).ok().as_deref())
    }

    /// Exact match, as the indicator is set by deployment tooling.
    pub fn from_app_env(value: Option<&str>) -> Self {
        Self {
            production: value == Some(PRODUCTION),
        }
    }

    pub fn production() -> Self {
        Self { production: true }
    }

    pub fn development() -> Self {
        Self { production: false }
    }

    pub fn is_production(&self) -> bool {
        self.production
    }

    /// Debug mode actually in effect for a caller request.
    pub fn debug_enabled(&self, requested: bool) -> bool {
        requested && !self.production
    }
}
