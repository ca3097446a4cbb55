use super::{Edit, PrefMap, PrefValue, PreferenceStore};
use crate::error::StorageError;
use std::sync::RwLock;

/// Process-local preferences. Nothing survives a restart; used by tests and
/// by hosts that bring their own persistence.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<PrefMap>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: PrefMap) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    pub fn len(&self) -> usize {
        self.values.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<PrefValue> {
        self.values
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn update(&self, f: &mut dyn FnMut(&PrefMap) -> Edit) -> Result<(), StorageError> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        let edit = f(&*values);
        edit.apply_to(&mut values);
        Ok(())
    }
}
