use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, PoisonError, RwLock},
};

use crate::{
    Result,
    r#trait::ConfigStore,
    value::{Scope, SettingValue},
};

type Tables = HashMap<Scope, BTreeMap<String, SettingValue>>;

/// In-memory option store
///
/// Options live in one table per [`Scope`] behind an `RwLock`. Clones share
/// the same tables. Used by tests and by deployments that do not need the
/// options to survive a restart.
///
/// A poisoned lock is recovered rather than propagated: the tables only ever
/// hold complete values, so a panic mid-write cannot leave them torn.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with site options
    #[must_use]
    pub fn with_site_options<K, V>(options: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<SettingValue>,
    {
        let store = Self::new();
        {
            let mut tables = store.tables.write().unwrap_or_else(PoisonError::into_inner);
            let site = tables.entry(Scope::Site).or_default();
            for (key, value) in options {
                site.insert(key.into(), value.into());
            }
        }
        store
    }

    /// Total number of options across both scopes
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(BTreeMap::len)
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<SettingValue>> {
        Ok(self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&scope)
            .and_then(|table| table.get(key))
            .cloned())
    }

    fn set(&self, scope: Scope, key: &str, value: SettingValue) -> Result<bool> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let previous = tables
            .entry(scope)
            .or_default()
            .insert(key.to_string(), value.clone());

        Ok(previous.as_ref() != Some(&value))
    }

    fn set_many(&self, scope: Scope, values: &[(&str, SettingValue)]) -> Result<usize> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let table = tables.entry(scope).or_default();

        Ok(values
            .iter()
            .filter(|(key, value)| table.insert((*key).to_string(), value.clone()).as_ref() != Some(value))
            .count())
    }

    fn delete(&self, scope: Scope, key: &str) -> Result<bool> {
        Ok(self
            .tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&scope)
            .and_then(|table| table.remove(key))
            .is_some())
    }

    fn keys(&self, scope: Scope) -> Result<Vec<String>> {
        Ok(self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&scope)
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default())
    }
}
