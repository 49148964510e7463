use std::{path::PathBuf, sync::Arc};

use serde::Deserialize;

use crate::{
    Result,
    backends::{FileStore, MemoryStore},
    r#trait::ConfigStore,
};

/// Runtime selection of the option store
///
/// File-backed store in RON config:
/// ```ron
/// Ownomail (
///     store: File(
///         path: "/var/lib/ownomail/options.ron",
///     ),
/// )
/// ```
///
/// Memory-backed store, lost on exit:
/// ```ron
/// Ownomail (
///     store: Memory,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum StoreConfig {
    File { path: PathBuf },
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::File {
            path: PathBuf::from("/var/lib/ownomail/options.ron"),
        }
    }
}

impl StoreConfig {
    /// Filesystem path for file-backed stores
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::File { path } => Some(path),
            Self::Memory => None,
        }
    }

    /// Build the configured store
    ///
    /// # Errors
    /// Returns an error if the file store path is rejected.
    pub fn into_store(self) -> Result<Arc<dyn ConfigStore>> {
        Ok(match self {
            Self::File { path } => Arc::new(FileStore::new(path)?),
            Self::Memory => Arc::new(MemoryStore::new()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::value::Scope;

    #[test]
    fn test_deserialize_variants() {
        let config: StoreConfig = ron::from_str(r#"File(path: "/tmp/options.ron")"#).unwrap();
        assert_eq!(config.path(), Some(std::path::Path::new("/tmp/options.ron")));

        let config: StoreConfig = ron::from_str("Memory").unwrap();
        assert_eq!(config, StoreConfig::Memory);
        assert!(config.path().is_none());
    }

    #[test]
    fn test_into_store() {
        let store = StoreConfig::Memory.into_store().unwrap();
        store.set(Scope::Site, "sender_name", "A".into()).unwrap();
        assert_eq!(store.keys(Scope::Site).unwrap(), vec!["sender_name"]);

        let rejected = StoreConfig::File {
            path: PathBuf::from("../options.ron"),
        }
        .into_store();
        assert!(rejected.is_err());
    }
}
