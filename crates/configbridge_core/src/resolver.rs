//! Resolution: validated requests to an ordered name/value mapping.

use crate::request::{ConfigKind, ConfigRequest};
use crate::runtime_env::RuntimeEnv;
use crate::store::ConfigStore;
use indexmap::IndexMap;
use tracing::{debug, error};

/// Resolved values keyed by output parameter, in first-insertion order.
pub type ResolvedValues = IndexMap<String, String>;

/// Looks up requests in a [`ConfigStore`].
pub struct ConfigResolver<S> {
    store: S,
    env: RuntimeEnv,
}

impl<S: ConfigStore> ConfigResolver<S> {
    pub fn new(store: S, env: RuntimeEnv) -> Self {
        Self { store, env }
    }

    /// Resolve every request in order.
    ///
    /// Absent keys and unsupported kinds are skipped. A failing lookup is
    /// logged and skipped; it never aborts the remaining requests. When two
    /// requests share an output parameter the later value wins.
    pub fn resolve(&self, requests: &[ConfigRequest], debug: bool) -> ResolvedValues {
        let debug = self.env.debug_enabled(debug);
        let mut resolved = ResolvedValues::with_capacity(requests.len());

        if debug {
            debug!(requests = requests.len(), "--- Retrieving configuration values ---");
        }

        for request in requests {
            let lookup = match &request.kind {
                ConfigKind::Setting => self.store.get_setting(&request.name),
                ConfigKind::ConnectionString => self.store.get_connection_string(&request.name),
                ConfigKind::Unknown(raw) => {
                    if debug {
                        debug!(
                            kind = %raw,
                            name = %request.name,
                            "[SKIPPING] Unsupported configuration kind"
                        );
                    }
                    continue;
                }
            };

            match lookup {
                Ok(Some(value)) => {
                    if debug {
                        debug!(
                            section = request.kind.source_label(),
                            name = %request.name,
                            output = %request.output_parameter,
                            found = true,
                            value = %value,
                            "Resolved configuration value"
                        );
                    }
                    resolved.insert(request.output_parameter.clone(), value);
                }
                Ok(None) => {
                    if debug {
                        debug!(
                            section = request.kind.source_label(),
                            name = %request.name,
                            output = %request.output_parameter,
                            found = false,
                            "Configuration value NOT FOUND"
                        );
                    }
                }
                Err(e) => {
                    error!(
                        section = request.kind.source_label(),
                        name = %request.name,
                        "Error reading configuration for '{}': {}",
                        request.name,
                        e
                    );
                    if debug {
                        debug!(error = ?e, "Store error details");
                    }
                }
            }
        }

        if debug {
            debug!(resolved = resolved.len(), "--- End configuration value retrieval ---");
        }

        resolved
    }
}
