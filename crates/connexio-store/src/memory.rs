use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use connexio_types::BlobId;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobReader, BlobStore};

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Blobs are held in memory behind a
/// `RwLock`; reads hand out cheap `Bytes` clones.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<BlobId, Bytes>>,
}

impl InMemoryBlobStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|b| b.len() as u64)
            .sum()
    }

    fn get(&self, id: &BlobId) -> Option<Bytes> {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, reader: &mut (dyn AsyncRead + Send + Unpin)) -> StoreResult<BlobId> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;

        let id = BlobId::new();
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Bytes::from(data));
        Ok(id)
    }

    async fn open(&self, id: &BlobId) -> StoreResult<BlobReader> {
        self.get(id)
            .map(|data| Box::new(Cursor::new(data)) as BlobReader)
            .ok_or(StoreError::BlobNotFound(*id))
    }

    async fn exists(&self, id: &BlobId) -> StoreResult<bool> {
        Ok(self.get(id).is_some())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .finish()
    }
}
