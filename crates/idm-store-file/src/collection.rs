//! A serialized collection mirrored to one file.
//!
//! The in-memory list is both the read path and the mutation target, so
//! reads and the read-modify-serialize-write cycle share one lock. Each
//! flush overwrites the whole file via a temporary file and a rename.

use std::fs;
use std::path::{Path, PathBuf};

use idm_store::{StorageError, StorageResult};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// An ordered collection persisted as a JSON document.
#[derive(Debug)]
pub struct PersistedCollection<T> {
    path: PathBuf,
    items: Mutex<Vec<T>>,
}

impl<T> PersistedCollection<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Opens the collection at `path`.
    ///
    /// With `recreate` set the file is replaced by an empty collection;
    /// otherwise existing state is loaded and a missing file starts empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or written.
    pub fn open(path: impl Into<PathBuf>, recreate: bool) -> StorageResult<Self> {
        let path = path.into();
        let items = if recreate || !path.exists() {
            let items: Vec<T> = Vec::new();
            write_atomic(&path, &items)?;
            items
        } else {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content).map_err(|e| {
                StorageError::Serialization(format!("{}: {e}", path.display()))
            })?
        };

        debug!(path = %path.display(), items = items.len(), "Collection opened");

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `f` over the current items.
    pub fn read<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        let items = self.items.lock();
        f(&items)
    }

    /// Returns a copy of every item.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().clone()
    }

    /// Runs `f` over the items and flushes the result to disk.
    ///
    /// If `f` fails nothing is written; `f` must not leave partial changes
    /// behind when it returns an error.
    ///
    /// # Errors
    ///
    /// Propagates errors from `f` and from writing the file.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Vec<T>) -> StorageResult<R>) -> StorageResult<R> {
        let mut items = self.items.lock();
        let result = f(&mut items)?;
        write_atomic(&self.path, &items)?;
        Ok(result)
    }
}

fn write_atomic<T: Serialize>(path: &Path, items: &[T]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content =
        serde_json::to_vec(items).map_err(|e| StorageError::Serialization(e.to_string()))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
