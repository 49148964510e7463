use std::fmt::Debug;

use crate::{
    Result,
    value::{Scope, SettingValue},
};

/// Key-value persistence for OwnOmail options
///
/// Implementations are assumed to be safe to share across threads. OwnOmail
/// does no locking of its own around read-modify-write sequences, so the last
/// writer wins.
pub trait ConfigStore: Send + Sync + Debug {
    /// Read a key. `Ok(None)` means the key has never been written.
    ///
    /// # Errors
    /// Returns an error if the underlying storage cannot be read.
    fn get(&self, scope: Scope, key: &str) -> Result<Option<SettingValue>>;

    /// Write a key. Returns `true` if the stored value changed and `false`
    /// when it already held `value`.
    ///
    /// # Errors
    /// Returns an error if the underlying storage cannot be written.
    fn set(&self, scope: Scope, key: &str, value: SettingValue) -> Result<bool>;

    /// Write several keys of one scope as a unit: on error none of them has
    /// been written. Returns how many stored values changed.
    ///
    /// # Errors
    /// Returns an error if the underlying storage cannot be written.
    fn set_many(&self, scope: Scope, values: &[(&str, SettingValue)]) -> Result<usize>;

    /// Remove a key. Returns `true` if it was present.
    ///
    /// # Errors
    /// Returns an error if the underlying storage cannot be written.
    fn delete(&self, scope: Scope, key: &str) -> Result<bool>;

    /// List the keys present in a scope, sorted.
    ///
    /// # Errors
    /// Returns an error if the underlying storage cannot be read.
    fn keys(&self, scope: Scope) -> Result<Vec<String>>;
}

/// Convenience reads on top of [`ConfigStore`]
pub trait ConfigStoreExt: ConfigStore {
    /// `get` with a fallback for keys that were never written
    ///
    /// # Errors
    /// Returns an error if the underlying storage cannot be read.
    fn get_or(&self, scope: Scope, key: &str, default: SettingValue) -> Result<SettingValue> {
        Ok(self.get(scope, key)?.unwrap_or(default))
    }

    /// Read a site option, treating a storage failure as "never written".
    ///
    /// Readers on the mail path must not fail, so the error is logged and
    /// swallowed here.
    fn read_site(&self, key: &str) -> Option<SettingValue> {
        self.get(Scope::Site, key).unwrap_or_else(|err| {
            tracing::warn!(key, error = %err, "Option store read failed, using default");
            None
        })
    }
}

impl<T: ConfigStore + ?Sized> ConfigStoreExt for T {}
