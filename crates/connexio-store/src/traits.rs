use async_trait::async_trait;
use connexio_types::BlobId;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::StoreResult;

/// Byte stream over a stored blob.
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

/// Storage for uploaded binary payloads.
///
/// All implementations must satisfy these invariants:
/// - Every `put` generates a fresh random [`BlobId`]; IDs are never reused.
/// - Blobs are immutable once written. There is no update or delete.
/// - A blob is visible to `open`/`exists` only after `put` has returned its ID.
/// - The store never interprets blob contents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stream `reader` to durable storage and return the new blob's ID.
    ///
    /// On failure no ID is handed out; a partially written blob may or may
    /// not remain in storage.
    async fn put(&self, reader: &mut (dyn AsyncRead + Send + Unpin)) -> StoreResult<BlobId>;

    /// Open a stored blob for reading.
    ///
    /// Returns `Err(StoreError::BlobNotFound)` if no such blob exists.
    async fn open(&self, id: &BlobId) -> StoreResult<BlobReader>;

    /// Check whether a blob exists.
    async fn exists(&self, id: &BlobId) -> StoreResult<bool>;

    /// Read a whole blob into memory.
    ///
    /// Default implementation drains [`open`](Self::open).
    async fn read_to_vec(&self, id: &BlobId) -> StoreResult<Vec<u8>> {
        let mut reader = self.open(id).await?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        Ok(data)
    }
}
