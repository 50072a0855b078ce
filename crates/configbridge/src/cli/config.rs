//! Configuration store selection for the CLI

use configbridge_core::store::default_store_path;
use configbridge_core::{ConfigStore, EnvStore, TomlFileStore};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where configuration values are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSelection {
    /// Machine-wide TOML file.
    File(PathBuf),
    /// `CONFIGBRIDGE_SETTING_*` / `CONFIGBRIDGE_CONNSTR_*` variables.
    Environment,
}

impl StoreSelection {
    /// Priority:
    /// 1. `--env-store`
    /// 2. `--store <PATH>` (or CONFIGBRIDGE_STORE)
    /// 3. The platform default path
    pub fn from_args(store: Option<&Path>, env_store: bool) -> Self {
        if env_store {
            return StoreSelection::Environment;
        }
        match store {
            Some(path) => StoreSelection::File(path.to_path_buf()),
            None => StoreSelection::File(default_store_path()),
        }
    }

    pub fn open(&self) -> Box<dyn ConfigStore> {
        match self {
            StoreSelection::File(path) => Box::new(TomlFileStore::new(path.clone())),
            StoreSelection::Environment => Box::new(EnvStore::default()),
        }
    }
}

impl fmt::Display for StoreSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreSelection::File(path) => write!(f, "file {}", path.display()),
            StoreSelection::Environment => f.write_str("environment variables"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_store_wins() {
        let selection = StoreSelection::from_args(Some(Path::new("/tmp/x.toml")), true);
        assert_eq!(selection, StoreSelection::Environment);
    }

    #[test]
    fn test_explicit_path() {
        let selection = StoreSelection::from_args(Some(Path::new("/tmp/x.toml")), false);
        assert_eq!(selection, StoreSelection::File(PathBuf::from("/tmp/x.toml")));
        assert_eq!(selection.to_string(), "file /tmp/x.toml");
    }

    #[test]
    fn test_opened_file_store_reads_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("machine.toml");
        std::fs::write(&path, "[appSettings]\nApiUrl = \"https://api\"\n").unwrap();

        let store = StoreSelection::File(path).open();

        assert_eq!(store.get_setting("ApiUrl").unwrap().as_deref(), Some("https://api"));
        assert_eq!(store.get_connection_string("ApiUrl").unwrap(), None);
    }
}
