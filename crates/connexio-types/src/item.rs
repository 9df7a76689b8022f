use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::id::BlobId;

/// The kind of payload a [`SyncItem`] carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Plain text carried inline in `content`.
    Text,
    /// Image carried inline as base64 in `content`.
    Image,
    /// Uploaded file stored in the blob store and referenced by `file_id`.
    File,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
            Self::File => write!(f, "file"),
        }
    }
}

/// The unit of shared content.
///
/// Optional text fields default to empty strings so that clients may omit
/// them. A missing `timestamp` is stamped with the time of decoding.
/// `timestamp` is opaque: whatever form a client sends, even an empty
/// string, is stored and returned verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncItem {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub mime_type: String,
    /// Blob reference; only set for items whose payload lives in the blob store.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub file_id: Option<BlobId>,
    #[serde(default = "now_timestamp")]
    pub timestamp: String,
}

impl SyncItem {
    /// A text item stamped with the current time.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Text,
            content: content.into(),
            filename: String::new(),
            mime_type: "text/plain".into(),
            file_id: None,
            timestamp: now_timestamp(),
        }
    }

    /// An inline image item; `base64` is the encoded image payload.
    pub fn image(base64: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Image,
            content: base64.into(),
            filename: String::new(),
            mime_type: mime_type.into(),
            file_id: None,
            timestamp: now_timestamp(),
        }
    }

    /// A file item referencing an uploaded blob.
    pub fn file(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        file_id: BlobId,
    ) -> Self {
        Self {
            kind: ItemKind::File,
            content: String::new(),
            filename: filename.into(),
            mime_type: mime_type.into(),
            file_id: Some(file_id),
            timestamp: now_timestamp(),
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == ItemKind::Text
    }
}

/// The current time as an RFC 3339 UTC timestamp with second precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

// Clients that do not track blobs send `"fileId": ""`.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<BlobId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => BlobId::parse(s).map(Some).map_err(serde::de::Error::custom),
    }
}
