//! JSON snapshot file store.

use crate::change::ItemChange;
use crate::error::{StorageError, StorageResult};
use crate::item::Item;
use crate::repository::Repository;
use crate::store::ItemStore;
use fs2::FileExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Snapshot format version written by this crate.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    items: Vec<Item>,
}

/// A store persisted as a single JSON snapshot file.
///
/// Layout next to the snapshot:
///
/// ```text
/// items.json        # the snapshot
/// items.json.lock   # advisory lock for single-writer
/// items.json.tmp    # transient, replaced atomically over the snapshot
/// ```
///
/// Every commit rewrites the snapshot through the temporary file and a
/// rename, so a crash leaves either the previous or the new snapshot.
/// The lock is held for the lifetime of the store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    repository: RwLock<Repository>,
    _lock_file: File,
}

impl FileStore {
    /// Opens or creates a snapshot store.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another process holds the lock (`Locked`)
    /// - The snapshot cannot be read or decoded
    /// - The snapshot contains the same record twice (`Corrupted`)
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let lock_path = sibling(&path, ".lock");
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked { path });
        }

        let repository = if path.exists() {
            load(&path)?
        } else {
            Repository::default()
        };
        debug!(path = %path.display(), items = repository.len(), "opened file store");

        Ok(Self {
            path,
            repository: RwLock::new(repository),
            _lock_file: lock_file,
        })
    }

    /// Returns the snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the total number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.repository.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, repository: &Repository) -> StorageResult<()> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            items: repository.all(),
        };
        let temp_path = sibling(&self.path, ".tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &snapshot)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl ItemStore for FileStore {
    fn item_by_id(&self, qualifier: &str, id: &str) -> Option<Item> {
        self.repository.read().get(qualifier, id)
    }

    fn items_by_type(&self, qualifier: &str) -> Vec<Item> {
        self.repository.read().by_type(qualifier)
    }

    fn qualifiers(&self) -> Vec<String> {
        self.repository.read().qualifiers()
    }

    fn prepare(&self, change: &ItemChange) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(StorageError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("store directory {} is gone", parent.display()),
                )));
            }
        }
        if let Some(new) = &change.new {
            serde_json::to_vec(new)?;
        }
        Ok(())
    }

    fn commit(&self, change: &ItemChange) -> StorageResult<()> {
        let mut repository = self.repository.write();
        repository.check(change)?;
        let mut next = repository.clone();
        next.apply(change);
        self.persist(&next)?;
        *repository = next;
        Ok(())
    }
}

fn load(path: &Path) -> StorageResult<Repository> {
    let reader = BufReader::new(File::open(path)?);
    let snapshot: Snapshot = serde_json::from_reader(reader)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(StorageError::Corrupted(format!(
            "unsupported snapshot version {}",
            snapshot.version
        )));
    }
    let mut repository = Repository::default();
    for item in snapshot.items {
        let qualified_id = item.qualified_id();
        if repository.insert(item).is_some() {
            return Err(StorageError::Corrupted(format!(
                "duplicate item {qualified_id}"
            )));
        }
    }
    Ok(repository)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_path(dir: &TempDir) -> PathBuf {
        dir.path().join("items.json")
    }

    #[test]
    fn commit_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let item = Item::new("customer", "c1").with_field("Name", "Alice");
        {
            let store = FileStore::open(store_path(&dir)).unwrap();
            store.commit(&ItemChange::create(item.clone())).unwrap();
        }

        let store = FileStore::open(store_path(&dir)).unwrap();
        assert_eq!(store.item_by_id("customer", "c1"), Some(item));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn second_open_is_locked() {
        let dir = TempDir::new().unwrap();
        let _first = FileStore::open(store_path(&dir)).unwrap();

        let second = FileStore::open(store_path(&dir));
        assert!(matches!(second, Err(StorageError::Locked { .. })));
    }

    #[test]
    fn rejected_commit_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(store_path(&dir)).unwrap();
        store
            .commit(&ItemChange::create(Item::new("customer", "c1")))
            .unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        let result = store.commit(&ItemChange::create(Item::new("customer", "c1")));

        assert!(matches!(result, Err(StorageError::Rejected { .. })));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
        assert!(!sibling(store.path(), ".tmp").exists());
    }

    #[test]
    fn duplicate_snapshot_entries_are_corruption() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        let item = Item::new("customer", "c1");
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            items: vec![item.clone(), item],
        };
        fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).unwrap();

        let result = FileStore::open(&path);
        assert!(matches!(result, Err(StorageError::Corrupted(_))));
    }

    #[test]
    fn prepare_does_not_write() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(store_path(&dir)).unwrap();

        store
            .prepare(&ItemChange::create(Item::new("customer", "c1")))
            .unwrap();

        assert!(store.is_empty());
        assert!(!store.path().exists());
    }
}
