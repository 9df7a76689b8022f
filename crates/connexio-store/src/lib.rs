//! Shared state store for the Connexio sync relay.
//!
//! The store holds the single current [`SyncItem`](connexio_types::SyncItem)
//! and the collection of saved slots, persists both on every change, and keeps
//! uploaded binary payloads in a blob store referenced by ID.
//!
//! # Components
//!
//! - [`SyncStore`] -- the guarded in-memory state and its operations
//! - [`Persistence`] -- JSON snapshot/reload of the state documents
//! - [`BlobStore`] -- trait for binary payload storage, with backends:
//!   - [`FsBlobStore`] -- one file per blob under `<data_dir>/files/`
//!   - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. One reader/writer lock guards the current item and the slot map.
//! 2. Writers hold the lock through the flush, so readers never see state
//!    newer than what is on disk.
//! 3. Flush failures are logged; the in-memory change always stands.
//! 4. Blob writes happen outside the lock; only the final state change takes it.
//! 5. Blobs are immutable and never deleted by the store.

pub mod error;
pub mod fs;
pub mod memory;
pub mod persist;
pub mod state;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use memory::InMemoryBlobStore;
pub use persist::{Persistence, Snapshot, CURRENT_DOCUMENT, FILES_DIR, SLOTS_DOCUMENT};
pub use state::SyncStore;
pub use traits::{BlobReader, BlobStore};
