use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};

use crate::{
    Result, StoreError,
    r#trait::ConfigStore,
    value::{Scope, SettingValue},
};

/// On-disk layout of the options file
#[derive(Debug, Default, Serialize, Deserialize)]
struct OptionsFile {
    #[serde(default)]
    site: BTreeMap<String, SettingValue>,
    #[serde(default)]
    network: BTreeMap<String, SettingValue>,
}

impl OptionsFile {
    fn table(&self, scope: Scope) -> &BTreeMap<String, SettingValue> {
        match scope {
            Scope::Site => &self.site,
            Scope::Network => &self.network,
        }
    }

    fn table_mut(&mut self, scope: Scope) -> &mut BTreeMap<String, SettingValue> {
        match scope {
            Scope::Site => &mut self.site,
            Scope::Network => &mut self.network,
        }
    }
}

/// Option store persisted as a single RON file
///
/// ```ron
/// (
///     site: {
///         "sender_email": Text("noreply@example.com"),
///         "smtp_port": Int(587),
///     },
///     network: {},
/// )
/// ```
///
/// The file is re-read on every access so edits made by other processes are
/// picked up. Writes go to a temporary sibling file which is then renamed over
/// the existing file, so a crash never leaves a half-written options file. A
/// missing file reads as empty.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// # Errors
    /// Returns [`StoreError::InvalidPath`] if the path contains `..`
    /// components or does not name a file.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        Self::validate_path(&path)?;

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn validate_path(path: &Path) -> Result<()> {
        let invalid = |reason: &str| StoreError::InvalidPath {
            path: path.display().to_string(),
            reason: reason.to_string(),
        };

        if path.components().any(|c| c == Component::ParentDir) {
            return Err(invalid("cannot contain '..' components"));
        }

        if path.file_name().is_none() {
            return Err(invalid("must name a file"));
        }

        Ok(())
    }

    fn load(&self) -> Result<OptionsFile> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(OptionsFile::default()),
            Ok(content) => Ok(ron::from_str(&content)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(OptionsFile::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, options: &OptionsFile) -> Result<()> {
        let encoded = ron::ser::to_string_pretty(options, ron::ser::PrettyConfig::default())?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        fs::write(&temp, encoded)?;
        fs::rename(&temp, &self.path)?;

        tracing::trace!(path = %self.path.display(), "Options file written");
        Ok(())
    }

    /// Load, apply `f` to one table and save if `f` reports a change
    fn modify<T>(
        &self,
        scope: Scope,
        f: impl FnOnce(&mut BTreeMap<String, SettingValue>) -> (T, bool),
    ) -> Result<T> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut options = self.load()?;
        let (result, dirty) = f(options.table_mut(scope));
        if dirty {
            self.save(&options)?;
        }

        Ok(result)
    }
}

impl ConfigStore for FileStore {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<SettingValue>> {
        Ok(self.load()?.table(scope).get(key).cloned())
    }

    fn set(&self, scope: Scope, key: &str, value: SettingValue) -> Result<bool> {
        self.modify(scope, |table| {
            if table.get(key) == Some(&value) {
                (false, false)
            } else {
                table.insert(key.to_string(), value);
                (true, true)
            }
        })
    }

    fn set_many(&self, scope: Scope, values: &[(&str, SettingValue)]) -> Result<usize> {
        self.modify(scope, |table| {
            let changed = values
                .iter()
                .filter(|(key, value)| {
                    table.insert((*key).to_string(), value.clone()).as_ref() != Some(value)
                })
                .count();
            (changed, changed > 0)
        })
    }

    fn delete(&self, scope: Scope, key: &str) -> Result<bool> {
        self.modify(scope, |table| {
            let removed = table.remove(key).is_some();
            (removed, removed)
        })
    }

    fn keys(&self, scope: Scope) -> Result<Vec<String>> {
        Ok(self.load()?.table(scope).keys().cloned().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_rejects_parent_components() {
        let err = FileStore::new("/var/lib/../etc/options.ron").unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath { .. }));
        assert!(err.to_string().contains("'..'"));
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("options.ron")).unwrap();

        assert_eq!(store.get(Scope::Site, "sender_name").unwrap(), None);
        assert!(store.keys(Scope::Network).unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("options.ron");

        let store = FileStore::new(&path).unwrap();
        assert!(store.set(Scope::Site, "smtp_port", 2525_u16.into()).unwrap());
        assert!(store.set(Scope::Network, "sender_name", "Net".into()).unwrap());
        assert!(!store.set(Scope::Site, "smtp_port", 2525_u16.into()).unwrap());

        let reopened = FileStore::new(&path).unwrap();
        assert_eq!(
            reopened.get(Scope::Site, "smtp_port").unwrap(),
            Some(SettingValue::Int(2525))
        );
        assert_eq!(
            reopened.get(Scope::Network, "sender_name").unwrap(),
            Some("Net".into())
        );
        assert!(!dir.path().join("nested").join("options.ron.tmp").exists());
    }

    #[test]
    fn test_set_many_writes_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.ron");
        let store = FileStore::new(&path).unwrap();

        let values = [
            ("smtp_host", SettingValue::from("smtp.example.com")),
            ("smtp_port", 465_u16.into()),
        ];
        assert_eq!(store.set_many(Scope::Site, &values).unwrap(), 2);
        assert_eq!(store.set_many(Scope::Site, &values).unwrap(), 0);

        let reopened = FileStore::new(&path).unwrap();
        assert_eq!(reopened.keys(Scope::Site).unwrap(), vec!["smtp_host", "smtp_port"]);
    }

    #[test]
    fn test_set_many_leaves_file_untouched_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.ron");
        let store = FileStore::new(&path).unwrap();
        store.set(Scope::Site, "smtp_host", "old.example.com".into()).unwrap();

        // A directory where the temp file should go makes the write fail
        fs::create_dir(dir.path().join("options.ron.tmp")).unwrap();

        let result = store.set_many(
            Scope::Site,
            &[
                ("smtp_host", "new.example.com".into()),
                ("smtp_port", 465_u16.into()),
            ],
        );

        assert!(result.is_err());
        assert_eq!(
            store.get(Scope::Site, "smtp_host").unwrap(),
            Some("old.example.com".into())
        );
        assert_eq!(store.get(Scope::Site, "smtp_port").unwrap(), None);
    }

    #[test]
    fn test_delete_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("options.ron")).unwrap();

        store.set(Scope::Site, "smtp_host", "smtp.example.com".into()).unwrap();
        assert!(store.delete(Scope::Site, "smtp_host").unwrap());
        assert!(!store.delete(Scope::Site, "smtp_host").unwrap());
        assert_eq!(store.get(Scope::Site, "smtp_host").unwrap(), None);
    }

    #[test]
    fn test_corrupted_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.ron");
        fs::write(&path, "this is not ron").unwrap();

        let store = FileStore::new(&path).unwrap();
        assert!(matches!(
            store.get(Scope::Site, "sender_name"),
            Err(StoreError::Decode(_))
        ));
    }

    #[test]
    fn test_reads_hand_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.ron");
        fs::write(
            &path,
            r#"(
                site: {
                    "sender_email": Text("noreply@example.com"),
                    "use_smtp": Bool(true),
                },
            )"#,
        )
        .unwrap();

        let store = FileStore::new(&path).unwrap();
        assert_eq!(
            store.get(Scope::Site, "sender_email").unwrap(),
            Some("noreply@example.com".into())
        );
        assert_eq!(
            store.get(Scope::Site, "use_smtp").unwrap(),
            Some(SettingValue::Bool(true))
        );
        assert!(store.keys(Scope::Network).unwrap().is_empty());
    }
}
