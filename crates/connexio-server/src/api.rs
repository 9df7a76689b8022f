//! Request and response bodies of the HTTP API.

use chrono::{DateTime, Utc};
use connexio_types::{BlobId, SlotId, SyncItem};
use serde::{Deserialize, Serialize};

/// HTTP endpoint paths.
pub mod endpoints {
    pub const HEALTH: &str = "/health";
    pub const CURRENT: &str = "/current";
    pub const UPLOAD: &str = "/upload";
    pub const FILE: &str = "/files/:id";
    pub const SLOTS: &str = "/slots";
    pub const SLOT: &str = "/slots/:id";
    pub const SLOT_LOAD: &str = "/slots/:id/load";
}

/// Name of the multipart field carrying an upload.
pub const UPLOAD_FIELD: &str = "file";

const STATUS_OK: &str = "ok";
const STATUS_ERROR: &str = "error";

/// Health check response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub time: DateTime<Utc>,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: STATUS_OK.into(),
            version: env!("CARGO_PKG_VERSION").into(),
            time: Utc::now(),
        }
    }
}

/// Bare acknowledgement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: STATUS_OK.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub status: String,
    pub file_id: BlobId,
}

impl UploadResponse {
    pub fn new(file_id: BlobId) -> Self {
        Self {
            status: STATUS_OK.into(),
            file_id,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateSlotRequest {
    #[serde(default)]
    pub name: String,
    pub item: SyncItem,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSlotResponse {
    pub status: String,
    pub id: SlotId,
}

impl CreateSlotResponse {
    pub fn new(id: SlotId) -> Self {
        Self {
            status: STATUS_OK.into(),
            id,
        }
    }
}

/// Answer to a slot load: the item that is now current.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSlotResponse {
    pub status: String,
    pub item: SyncItem,
}

impl LoadSlotResponse {
    pub fn new(item: SyncItem) -> Self {
        Self {
            status: STATUS_OK.into(),
            item,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.into(),
            message: message.into(),
        }
    }
}
