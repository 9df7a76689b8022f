//! Durable snapshots of the sync state as two JSON documents.
//!
//! ```text
//! <data_dir>/
//! ├── current.json   # the current item; absent when there is none
//! ├── slots.json     # {"<slot-id>": SavedSlot, ...}
//! └── files/         # blob directory, see FsBlobStore
//! ```
//!
//! Documents are always rewritten whole. Each write goes to a temporary file
//! in the data directory which is then renamed over the old document, so a
//! crash mid-flush leaves either the old or the new document, never a torn one.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use connexio_types::{SavedSlot, SlotId, SyncItem};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

pub const CURRENT_DOCUMENT: &str = "current.json";
pub const SLOTS_DOCUMENT: &str = "slots.json";
pub const FILES_DIR: &str = "files";

/// Everything the persistence layer stores.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub current: Option<SyncItem>,
    pub slots: HashMap<SlotId, SavedSlot>,
}

/// Reads and writes the state documents of one data directory.
#[derive(Clone, Debug)]
pub struct Persistence {
    dir: PathBuf,
}

impl Persistence {
    /// Use `dir` as the data directory, creating it and its `files/`
    /// subdirectory if missing.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let persistence = Self::at(dir);
        fs::create_dir_all(persistence.files_dir())?;
        Ok(persistence)
    }

    /// Use `dir` as the data directory without touching the filesystem.
    ///
    /// Suitable for read-only inspection; flushing into a directory that does
    /// not exist fails.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn files_dir(&self) -> PathBuf {
        self.dir.join(FILES_DIR)
    }

    pub fn current_path(&self) -> PathBuf {
        self.dir.join(CURRENT_DOCUMENT)
    }

    pub fn slots_path(&self) -> PathBuf {
        self.dir.join(SLOTS_DOCUMENT)
    }

    /// Load both documents.
    ///
    /// The documents are independent: a missing or malformed one loads as
    /// empty without affecting the other. Within the slot document a single
    /// malformed slot is skipped and the rest are kept. This never fails, so a
    /// fresh or partially corrupt data directory always starts.
    pub fn load(&self) -> Snapshot {
        Snapshot {
            current: read_document(&self.current_path()),
            slots: self.load_slots(),
        }
    }

    fn load_slots(&self) -> HashMap<SlotId, SavedSlot> {
        let raw: HashMap<SlotId, serde_json::Value> =
            read_document(&self.slots_path()).unwrap_or_default();
        raw.into_iter()
            .filter_map(|(id, value)| match serde_json::from_value(value) {
                Ok(slot) => Some((id, slot)),
                Err(e) => {
                    warn!(slot = %id, error = %e, "skipping malformed slot");
                    None
                }
            })
            .collect()
    }

    /// Overwrite both documents with the given state.
    ///
    /// With no current item the current document is deleted rather than
    /// written as `null`. Both documents are attempted even if the first
    /// fails; the first error is returned.
    pub fn flush(
        &self,
        current: Option<&SyncItem>,
        slots: &HashMap<SlotId, SavedSlot>,
    ) -> StoreResult<()> {
        let current_result = match current {
            Some(item) => write_document(&self.current_path(), item),
            None => remove_document(&self.current_path()),
        };
        let slots_result = write_document(&self.slots_path(), slots);

        if current_result.is_ok() && slots_result.is_ok() {
            debug!(
                has_current = current.is_some(),
                slots = slots.len(),
                "state flushed"
            );
        }
        current_result.and(slots_result)
    }

    /// Flush a whole [`Snapshot`].
    pub fn flush_snapshot(&self, snapshot: &Snapshot) -> StoreResult<()> {
        self.flush(snapshot.current.as_ref(), &snapshot.slots)
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "document absent, starting empty");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable document, starting empty");
            return None;
        }
    };
    match serde_json::from_slice(&data) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed document, starting empty");
            None
        }
    }
}

fn write_document<T: Serialize + ?Sized>(path: &Path, value: &T) -> StoreResult<()> {
    let data =
        serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

fn remove_document(path: &Path) -> StoreResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connexio_types::BlobId;

    fn sample_snapshot() -> Snapshot {
        let mut slots = HashMap::new();
        for slot in [
            SavedSlot::new("greeting", SyncItem::text("hello")),
            SavedSlot::new("", SyncItem::image("aGVsbG8=", "image/png")),
            SavedSlot::new("doc", SyncItem::file("a.txt", "text/plain", BlobId::new())),
        ] {
            slots.insert(slot.id.clone(), slot);
        }
        Snapshot {
            current: Some(SyncItem::text("current text")),
            slots,
        }
    }

    #[test]
    fn open_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data");
        let persistence = Persistence::open(&root).unwrap();
        assert!(root.is_dir());
        assert!(persistence.files_dir().is_dir());
        assert_eq!(persistence.dir(), root.as_path());
    }

    #[test]
    fn at_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data");
        let persistence = Persistence::at(&root);
        assert_eq!(persistence.load(), Snapshot::default());
        assert!(!root.exists());
    }

    #[test]
    fn fresh_directory_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Persistence::open(dir.path()).unwrap();
        assert_eq!(persistence.load(), Snapshot::default());
    }

    #[test]
    fn flush_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Persistence::open(dir.path()).unwrap();
        let snapshot = sample_snapshot();

        persistence.flush_snapshot(&snapshot).unwrap();
        assert_eq!(persistence.load(), snapshot);

        let reopened = Persistence::open(dir.path()).unwrap();
        assert_eq!(reopened.load(), snapshot);
    }

    #[test]
    fn no_current_item_removes_document() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Persistence::open(dir.path()).unwrap();

        persistence.flush_snapshot(&sample_snapshot()).unwrap();
        assert!(persistence.current_path().exists());

        let mut snapshot = sample_snapshot();
        snapshot.current = None;
        persistence.flush_snapshot(&snapshot).unwrap();
        assert!(!persistence.current_path().exists());
        assert!(persistence.slots_path().exists());

        let loaded = persistence.load();
        assert!(loaded.current.is_none());
        assert_eq!(loaded.slots, snapshot.slots);
    }

    #[test]
    fn flushing_empty_state_twice_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Persistence::open(dir.path()).unwrap();
        persistence.flush_snapshot(&Snapshot::default()).unwrap();
        persistence.flush_snapshot(&Snapshot::default()).unwrap();
        assert_eq!(fs::read_to_string(persistence.slots_path()).unwrap(), "{}");
    }

    #[test]
    fn corrupt_documents_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Persistence::open(dir.path()).unwrap();
        fs::write(persistence.current_path(), b"{ not json").unwrap();
        fs::write(persistence.slots_path(), b"[1, 2, 3]").unwrap();

        assert_eq!(persistence.load(), Snapshot::default());
    }

    #[test]
    fn documents_load_independently() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Persistence::open(dir.path()).unwrap();
        let snapshot = sample_snapshot();
        persistence.flush_snapshot(&snapshot).unwrap();

        fs::write(persistence.current_path(), b"garbage").unwrap();
        let loaded = persistence.load();
        assert!(loaded.current.is_none());
        assert_eq!(loaded.slots, snapshot.slots);
    }

    #[test]
    fn slots_document_is_an_object_keyed_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Persistence::open(dir.path()).unwrap();
        let snapshot = sample_snapshot();
        persistence.flush_snapshot(&snapshot).unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(persistence.slots_path()).unwrap()).unwrap();
        let object = raw.as_object().unwrap();
        assert_eq!(object.len(), 3);
        for (id, slot) in object {
            assert_eq!(slot["id"], id.as_str());
            assert!(slot["item"].is_object());
        }
    }

    #[test]
    fn flush_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data");
        let persistence = Persistence::open(&root).unwrap();
        fs::remove_dir_all(&root).unwrap();

        let err = persistence.flush_snapshot(&sample_snapshot()).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn loads_documents_with_free_form_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Persistence::open(dir.path()).unwrap();
        let current = serde_json::json!({
            "type": "text",
            "content": "hi",
            "filename": "",
            "mimeType": "",
            "fileId": "",
            "timestamp": "2024-05-01T12:00:00+02:00",
        });
        fs::write(persistence.current_path(), current.to_string()).unwrap();
        fs::write(
            persistence.slots_path(),
            r#"{
  "s1": {
    "id": "s1", "name": "a", "type": "text",
    "savedAt": "2024-05-01T12:00:00+02:00", "preview": "one",
    "item": {
      "type": "text", "content": "one", "filename": "", "mimeType": "",
      "fileId": "", "timestamp": ""
    }
  },
  "s2": {
    "id": "s2", "name": "b", "type": "text",
    "savedAt": "2024-05-01T12:05:00+02:00", "preview": "two",
    "item": {
      "type": "text", "content": "two", "filename": "", "mimeType": "",
      "fileId": "", "timestamp": "2024-05-01T10:05:00"
    }
  }
}"#,
        )
        .unwrap();

        let loaded = persistence.load();
        assert_eq!(loaded.current.unwrap().timestamp, "2024-05-01T12:00:00+02:00");
        assert_eq!(loaded.slots.len(), 2);
        assert_eq!(loaded.slots[&SlotId::from("s1")].item.timestamp, "");
        assert_eq!(loaded.slots[&SlotId::from("s2")].item.timestamp, "2024-05-01T10:05:00");
    }

    #[test]
    fn malformed_slot_is_skipped_not_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Persistence::open(dir.path()).unwrap();
        let good = SavedSlot::new("good", SyncItem::text("kept"));
        let mut raw = serde_json::Map::new();
        raw.insert(good.id.to_string(), serde_json::to_value(&good).unwrap());
        raw.insert("bad".into(), serde_json::json!({"id": "bad", "type": "video"}));
        fs::write(
            persistence.slots_path(),
            serde_json::to_vec(&serde_json::Value::Object(raw)).unwrap(),
        )
        .unwrap();

        let loaded = persistence.load();
        assert_eq!(loaded.slots.len(), 1);
        assert_eq!(loaded.slots[&good.id], good);
    }
}
