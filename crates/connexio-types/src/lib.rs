//! Data model for the Connexio sync relay.
//!
//! Every other Connexio crate depends on `connexio-types`. The types here are
//! also the JSON wire format: field names and enum spellings match what
//! clients send and what the persisted documents contain.
//!
//! # Key Types
//!
//! - [`SyncItem`]: the shared payload (text, image, or uploaded file)
//! - [`ItemKind`]: discriminates the three payload kinds
//! - [`BlobId`]: random identifier of an uploaded binary payload
//! - [`SlotId`]: identifier of a saved slot
//! - [`SavedSlot`]: named snapshot of a `SyncItem`
//! - [`SlotSummary`]: list view of a slot without its payload

pub mod error;
pub mod id;
pub mod item;
pub mod slot;

pub use error::TypeError;
pub use id::{BlobId, SlotId};
pub use item::{now_timestamp, ItemKind, SyncItem};
pub use slot::{preview_of, SavedSlot, SlotSummary, PREVIEW_ELLIPSIS, PREVIEW_MAX_CHARS};
