use super::{Edit, PrefMap, PrefValue, PreferenceStore};
use crate::error::StorageError;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

/// Preferences persisted as one JSON object on disk.
///
/// Every update takes an exclusive lock on a sibling `.lock` file, re-reads
/// the file and rewrites it through a temporary sibling and a rename. Several handles (or processes) on the same path therefore
/// never overwrite each other's changes. Reads are served from a cache that
/// is refreshed whenever the file's size or modification time changes.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    cache: RwLock<Cached>,
}

#[derive(Debug)]
struct Cached {
    values: PrefMap,
    stamp: Option<Stamp>,
}

/// Size and modification time of the file when it was last read or written.
type Stamp = (u64, SystemTime);

impl FilePreferences {
    /// Open (or create) the preferences file at `path`.
    ///
    /// An unreadable or corrupt file is treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let cache = Cached {
            stamp: stamp(&path),
            values: Self::load(&path),
        };
        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("json.lock")
    }

    fn load(path: &Path) -> PrefMap {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return PrefMap::new(),
            Err(e) => {
                tracing::warn!("Failed to read preferences {}: {}", path.display(), e);
                return PrefMap::new();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed preferences {}: {}", path.display(), e);
            PrefMap::new()
        })
    }

    /// Block until this process holds the cross-process write lock.
    /// Released when the returned handle is dropped.
    fn lock(&self) -> Result<File, StorageError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())?;
        file.lock_exclusive()?;
        Ok(file)
    }

    fn persist(&self, values: &PrefMap) -> Result<(), StorageError> {
        let contents = serde_json::to_string_pretty(values)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn stamp(path: &Path) -> Option<Stamp> {
    let meta = fs::metadata(path).ok()?;
    Some((meta.len(), meta.modified().ok()?))
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Option<PrefValue> {
        let current = stamp(&self.path);
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if cache.stamp == current {
                return cache.values.get(key).cloned();
            }
        }

        tracing::debug!("Preferences {} changed on disk, reloading", self.path.display());
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache.values = Self::load(&self.path);
        cache.stamp = current;
        cache.values.get(key).cloned()
    }

    fn update(&self, f: &mut dyn FnMut(&PrefMap) -> Edit) -> Result<(), StorageError> {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        let _lock = self.lock()?;

        // Another handle may have written since our last look.
        cache.stamp = stamp(&self.path);
        let mut values = Self::load(&self.path);

        let edit = f(&values);
        if edit.is_empty() {
            cache.values = values;
            return Ok(());
        }

        // Stage on a copy so a failed write leaves the cache matching the file.
        let mut staged = values.clone();
        if edit.apply_to(&mut staged) {
            if let Err(e) = self.persist(&staged) {
                cache.values = values;
                return Err(e);
            }
            values = staged;
            cache.stamp = stamp(&self.path);
        }
        cache.values = values;
        Ok(())
    }
}
