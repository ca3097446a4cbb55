//! Durable key → value preferences.
//!
//! Every mutation goes through an [`Edit`] batch which a store applies
//! atomically. Read-modify-write sequences use [`PreferenceStore::update`],
//! which runs the closure while holding the store's lock so concurrent
//! writers cannot lose each other's updates.

mod file;
mod memory;

pub use file::FilePreferences;
pub use memory::MemoryPreferences;

use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    String(String),
}

pub type PrefMap = BTreeMap<String, PrefValue>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum EditOp {
    Put(String, PrefValue),
    Remove(String),
    Clear,
}

/// A batch of changes, applied in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Edit {
    ops: Vec<EditOp>,
}

impl Edit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops
            .push(EditOp::Put(key.into(), PrefValue::String(value.into())));
        self
    }

    pub fn put_bool(mut self, key: impl Into<String>, value: bool) -> Self {
        self.ops.push(EditOp::Put(key.into(), PrefValue::Bool(value)));
        self
    }

    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.ops.push(EditOp::Remove(key.into()));
        self
    }

    pub fn clear(mut self) -> Self {
        self.ops.push(EditOp::Clear);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply the batch to `map`, returning whether anything changed.
    pub(crate) fn apply_to(self, map: &mut PrefMap) -> bool {
        let mut changed = false;
        for op in self.ops {
            match op {
                EditOp::Put(key, value) => {
                    if map.get(&key) != Some(&value) {
                        map.insert(key, value);
                        changed = true;
                    }
                }
                EditOp::Remove(key) => changed |= map.remove(&key).is_some(),
                EditOp::Clear => {
                    changed |= !map.is_empty();
                    map.clear();
                }
            }
        }
        changed
    }
}

pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<PrefValue>;

    /// Run `f` against the current contents under the store lock and apply
    /// the edit it returns before the lock is released.
    fn update(&self, f: &mut dyn FnMut(&PrefMap) -> Edit) -> Result<(), StorageError>;

    fn apply(&self, edit: Edit) -> Result<(), StorageError> {
        let mut edit = Some(edit);
        self.update(&mut |_: &PrefMap| edit.take().unwrap_or_default())
    }

    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            PrefValue::String(s) => Some(s),
            PrefValue::Bool(_) => None,
        }
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            PrefValue::Bool(b) => Some(b),
            PrefValue::String(_) => None,
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Read a string value straight out of a locked map, as seen inside
/// [`PreferenceStore::update`].
pub fn map_string<'a>(map: &'a PrefMap, key: &str) -> Option<&'a str> {
    match map.get(key)? {
        PrefValue::String(s) => Some(s.as_str()),
        PrefValue::Bool(_) => None,
    }
}
