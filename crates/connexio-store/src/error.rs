use connexio_types::{BlobId, SlotId};

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No blob with this ID has been written.
    #[error("blob not found: {0}")]
    BlobNotFound(BlobId),

    /// No slot with this ID exists.
    #[error("slot not found: {0}")]
    SlotNotFound(SlotId),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking state update panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Returns `true` for the "unknown ID" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::BlobNotFound(_) | Self::SlotNotFound(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
