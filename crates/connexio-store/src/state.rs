use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use connexio_types::{BlobId, SavedSlot, SlotId, SlotSummary, SyncItem};
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::fs::FsBlobStore;
use crate::persist::{Persistence, Snapshot};
use crate::traits::BlobStore;

#[derive(Debug, Default)]
struct SyncState {
    current: Option<SyncItem>,
    slots: HashMap<SlotId, SavedSlot>,
}

/// The shared current item and slot collection.
///
/// One instance is shared by every request handler (typically behind an
/// `Arc`). Reads take the lock shared; writes take it exclusively for the
/// mutation and the following flush, so the documents on disk always match
/// the last state a reader could observe. Concurrent writers are
/// last-writer-wins.
///
/// All operations except [`ingest_upload`](Self::ingest_upload) are
/// synchronous and may block on disk I/O while flushing. Async callers should
/// run them on a blocking thread.
pub struct SyncStore<B = FsBlobStore> {
    state: RwLock<SyncState>,
    persistence: Persistence,
    blobs: B,
}

impl SyncStore<FsBlobStore> {
    /// Open the store rooted at `data_dir`, loading any persisted state and
    /// keeping blobs under `data_dir/files/`.
    pub fn open(data_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let persistence = Persistence::open(data_dir)?;
        let blobs = FsBlobStore::new(persistence.files_dir());
        Ok(Self::with_blob_store(persistence, blobs))
    }
}

impl<B: BlobStore> SyncStore<B> {
    /// Build a store over an existing persistence layer and blob backend.
    pub fn with_blob_store(persistence: Persistence, blobs: B) -> Self {
        let Snapshot { current, slots } = persistence.load();
        info!(
            dir = %persistence.dir().display(),
            has_current = current.is_some(),
            slots = slots.len(),
            "sync state loaded"
        );
        Self {
            state: RwLock::new(SyncState { current, slots }),
            persistence,
            blobs,
        }
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    // Every mutation is a single assignment or map operation, so state behind
    // a poisoned lock is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, SyncState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SyncState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called with the write lock held.
    fn flush(&self, state: &SyncState) {
        if let Err(e) = self.persistence.flush(state.current.as_ref(), &state.slots) {
            warn!(error = %e, "failed to persist sync state; in-memory change kept");
        }
    }

    /// A copy of the current item, if any.
    pub fn get_current(&self) -> Option<SyncItem> {
        self.read().current.clone()
    }

    /// Replace the current item unconditionally.
    pub fn set_current(&self, item: SyncItem) {
        let mut state = self.write();
        debug!(kind = %item.kind, "current item set");
        state.current = Some(item);
        self.flush(&state);
    }

    /// Drop the current item. Its blob, if any, is kept.
    pub fn clear_current(&self) {
        let mut state = self.write();
        state.current = None;
        debug!("current item cleared");
        self.flush(&state);
    }

    /// Store an uploaded file and make it the current item.
    ///
    /// The blob is streamed outside the lock, so a slow upload never blocks
    /// readers. Only after the blob is fully written does the store take the
    /// write lock to install a [`ItemKind::File`](connexio_types::ItemKind)
    /// item referencing it. If the blob write fails, the current item is
    /// untouched.
    pub async fn ingest_upload(
        self: &Arc<Self>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StoreResult<BlobId>
    where
        B: 'static,
    {
        let filename = filename.into();
        let mime_type = mime_type.into();

        let file_id = self.blobs.put(reader).await?;
        info!(blob = %file_id, filename = %filename, "upload stored");

        let item = SyncItem::file(filename, mime_type, file_id);
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || store.set_current(item))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?;
        Ok(file_id)
    }

    /// Metadata of every slot, without payloads. Order is unspecified.
    pub fn list_slots(&self) -> Vec<SlotSummary> {
        self.read().slots.values().map(SavedSlot::summary).collect()
    }

    /// A full copy of one slot, including its item.
    pub fn get_slot(&self, id: &SlotId) -> Option<SavedSlot> {
        self.read().slots.get(id).cloned()
    }

    pub fn slot_count(&self) -> usize {
        self.read().slots.len()
    }

    /// Save a copy of `item` as a new slot and return its ID.
    ///
    /// The name is free-form and may be empty.
    pub fn create_slot(&self, name: impl Into<String>, item: SyncItem) -> SlotId {
        let slot = SavedSlot::new(name, item);
        let id = slot.id.clone();

        let mut state = self.write();
        state.slots.insert(id.clone(), slot);
        debug!(slot = %id, "slot created");
        self.flush(&state);
        id
    }

    /// Make a copy of the slot's item the current item and return it.
    pub fn load_slot(&self, id: &SlotId) -> StoreResult<SyncItem> {
        let mut state = self.write();
        let item = state
            .slots
            .get(id)
            .map(|slot| slot.item.clone())
            .ok_or_else(|| StoreError::SlotNotFound(id.clone()))?;
        state.current = Some(item.clone());
        debug!(slot = %id, "slot loaded into current");
        self.flush(&state);
        Ok(item)
    }

    /// Remove a slot. Removing an unknown ID is not an error.
    ///
    /// Returns `true` if a slot was removed.
    pub fn delete_slot(&self, id: &SlotId) -> bool {
        let mut state = self.write();
        let removed = state.slots.remove(id).is_some();
        debug!(slot = %id, removed, "slot deleted");
        self.flush(&state);
        removed
    }
}

impl<B> std::fmt::Debug for SyncStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("SyncStore")
            .field("dir", &self.persistence.dir())
            .field("has_current", &state.current.is_some())
            .field("slot_count", &state.slots.len())
            .finish()
    }
}
