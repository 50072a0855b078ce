//! Configuration store backends.
//!
//! The resolver only sees [`ConfigStore`]; the machine-wide file, the process
//! environment and in-memory maps are interchangeable behind it.

use crate::error::StoreError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Environment variable overriding the machine-wide store location.
pub const STORE_PATH_ENV: &str = "CONFIGBRIDGE_STORE";

const APP_SETTINGS_SECTION: &str = "appsettings";
const CONNECTION_STRINGS_SECTION: &str = "connectionstrings";
const CONNECTION_STRING_FIELD: &str = "connectionstring";

/// Read-only lookup capability over a configuration source.
///
/// `Ok(None)` means the key is absent. `Err` means the source itself could
/// not be consulted.
pub trait ConfigStore {
    fn get_setting(&self, name: &str) -> Result<Option<String>, StoreError>;
    fn get_connection_string(&self, name: &str) -> Result<Option<String>, StoreError>;
}

impl<T: ConfigStore + ?Sized> ConfigStore for &T {
    fn get_setting(&self, name: &str) -> Result<Option<String>, StoreError> {
        (**self).get_setting(name)
    }

    fn get_connection_string(&self, name: &str) -> Result<Option<String>, StoreError> {
        (**self).get_connection_string(name)
    }
}

impl<T: ConfigStore + ?Sized> ConfigStore for Box<T> {
    fn get_setting(&self, name: &str) -> Result<Option<String>, StoreError> {
        (**self).get_setting(name)
    }

    fn get_connection_string(&self, name: &str) -> Result<Option<String>, StoreError> {
        (**self).get_connection_string(name)
    }
}

/// Default location of the machine-wide store.
///
/// Priority:
/// 1) CONFIGBRIDGE_STORE
/// 2) %ProgramData%\configbridge\machine.toml (Windows)
/// 3) /etc/configbridge/machine.toml
pub fn default_store_path() -> PathBuf {
    if let Ok(path) = std::env::var(STORE_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    if cfg!(windows) {
        let program_data =
            std::env::var("ProgramData").unwrap_or_else(|_| r"C:\ProgramData".to_string());
        return PathBuf::from(program_data)
            .join("configbridge")
            .join("machine.toml");
    }
    PathBuf::from("/etc/configbridge/machine.toml")
}

// ============================================================================
// TOML file store
// ============================================================================

/// Machine-wide store backed by a TOML file:
///
/// ```toml
/// [appSettings]
/// ApiUrl = "https://api.internal"
///
/// [connectionStrings]
/// MainDb = "Server=db;Database=main;"
/// Reporting = { connectionString = "Server=rpt;" }
/// ```
///
/// The file is read on first lookup. A missing file behaves as an empty
/// store; an unreadable or malformed file fails every lookup.
pub struct TomlFileStore {
    path: PathBuf,
    document: OnceLock<Result<StoreDocument, LoadFailure>>,
}

#[derive(Debug, Default)]
struct StoreDocument {
    app_settings: HashMap<String, toml::Value>,
    connection_strings: HashMap<String, toml::Value>,
}

/// Load failures are cached, so they are kept in a clonable form.
#[derive(Debug, Clone)]
enum LoadFailure {
    Io { kind: std::io::ErrorKind, message: String },
    Parse(String),
}

impl TomlFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: OnceLock::new(),
        }
    }

    /// Store at [`default_store_path`].
    pub fn machine_wide() -> Self {
        Self::new(default_store_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn document(&self) -> Result<&StoreDocument, StoreError> {
        let loaded = self.document.get_or_init(|| load_document(&self.path));
        loaded.as_ref().map_err(|failure| match failure {
            LoadFailure::Io { kind, message } => StoreError::Io {
                path: self.path.clone(),
                source: std::io::Error::new(*kind, message.clone()),
            },
            LoadFailure::Parse(message) => StoreError::Parse {
                path: self.path.clone(),
                message: message.clone(),
            },
        })
    }
}

fn load_document(path: &Path) -> Result<StoreDocument, LoadFailure> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Configuration store {} not found; treating as empty", path.display());
            return Ok(StoreDocument::default());
        }
        Err(e) => {
            return Err(LoadFailure::Io {
                kind: e.kind(),
                message: e.to_string(),
            })
        }
    };

    let table: toml::Table =
        toml::from_str(&text).map_err(|e| LoadFailure::Parse(e.to_string()))?;

    let mut document = StoreDocument::default();
    for (section, value) in table {
        let target = match section.to_ascii_lowercase().as_str() {
            APP_SETTINGS_SECTION => &mut document.app_settings,
            CONNECTION_STRINGS_SECTION => &mut document.connection_strings,
            _ => continue,
        };
        let entries = match value {
            toml::Value::Table(entries) => entries,
            _ => {
                return Err(LoadFailure::Parse(format!(
                    "section '{}' must be a table",
                    section
                )))
            }
        };
        target.extend(entries);
    }

    debug!(
        "Loaded configuration store {} ({} settings, {} connection strings)",
        path.display(),
        document.app_settings.len(),
        document.connection_strings.len()
    );
    Ok(document)
}

impl ConfigStore for TomlFileStore {
    fn get_setting(&self, name: &str) -> Result<Option<String>, StoreError> {
        match self.document()?.app_settings.get(name) {
            None => Ok(None),
            Some(toml::Value::String(value)) => Ok(Some(value.clone())),
            Some(other) => Err(StoreError::InvalidValue {
                key: name.to_string(),
                reason: format!("expected a string, found {}", other.type_str()),
            }),
        }
    }

    fn get_connection_string(&self, name: &str) -> Result<Option<String>, StoreError> {
        match self.document()?.connection_strings.get(name) {
            None => Ok(None),
            Some(toml::Value::String(value)) => Ok(Some(value.clone())),
            Some(toml::Value::Table(entry)) => {
                let value = entry
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(CONNECTION_STRING_FIELD))
                    .map(|(_, value)| value);
                match value {
                    Some(toml::Value::String(value)) => Ok(Some(value.clone())),
                    // An entry without a connection string carries no value.
                    None => Ok(None),
                    Some(other) => Err(StoreError::InvalidValue {
                        key: name.to_string(),
                        reason: format!(
                            "connectionString must be a string, found {}",
                            other.type_str()
                        ),
                    }),
                }
            }
            Some(other) => Err(StoreError::InvalidValue {
                key: name.to_string(),
                reason: format!("expected a string or table, found {}", other.type_str()),
            }),
        }
    }
}

// ============================================================================
// Environment store
// ============================================================================

/// Store backed by environment variables, one per key:
/// `CONFIGBRIDGE_SETTING_<name>` and `CONFIGBRIDGE_CONNSTR_<name>`.
pub struct EnvStore {
    setting_prefix: String,
    connection_string_prefix: String,
}

impl Default for EnvStore {
    fn default() -> Self {
        Self::new("CONFIGBRIDGE_SETTING_", "CONFIGBRIDGE_CONNSTR_")
    }
}

impl EnvStore {
    pub fn new(setting_prefix: impl Into<String>, connection_string_prefix: impl Into<String>) -> Self {
        Self {
            setting_prefix: setting_prefix.into(),
            connection_string_prefix: connection_string_prefix.into(),
        }
    }

    fn lookup(&self, prefix: &str, name: &str) -> Result<Option<String>, StoreError> {
        let variable = format!("{}{}", prefix, name);
        match std::env::var(&variable) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(StoreError::InvalidValue {
                key: name.to_string(),
                reason: format!("{} is not valid unicode", variable),
            }),
        }
    }
}

impl ConfigStore for EnvStore {
    fn get_setting(&self, name: &str) -> Result<Option<String>, StoreError> {
        self.lookup(&self.setting_prefix, name)
    }

    fn get_connection_string(&self, name: &str) -> Result<Option<String>, StoreError> {
        self.lookup(&self.connection_string_prefix, name)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Plain in-memory store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    settings: HashMap<String, String>,
    connection_strings: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_setting(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(name.into(), value.into());
        self
    }

    pub fn with_connection_string(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.connection_strings.insert(name.into(), value.into());
        self
    }
}

impl ConfigStore for MemoryStore {
    fn get_setting(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.settings.get(name).cloned())
    }

    fn get_connection_string(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.connection_strings.get(name).cloned())
    }
}
