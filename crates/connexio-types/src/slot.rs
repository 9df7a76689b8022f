use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::SlotId;
use crate::item::{ItemKind, SyncItem};

/// Maximum number of characters of text content shown in a slot preview.
pub const PREVIEW_MAX_CHARS: usize = 50;

/// Suffix appended to a preview that was cut short.
pub const PREVIEW_ELLIPSIS: &str = "...";

/// A named, timestamped snapshot of a [`SyncItem`].
///
/// `item` is an owned copy taken at save time; later changes to the current
/// item never reach it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSlot {
    pub id: SlotId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub saved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub preview: String,
    pub item: SyncItem,
}

impl SavedSlot {
    /// Snapshot `item` under `name` with a fresh ID, saved now.
    pub fn new(name: impl Into<String>, item: SyncItem) -> Self {
        Self {
            id: SlotId::new(),
            name: name.into(),
            kind: item.kind,
            saved_at: Utc::now(),
            preview: preview_of(&item),
            item,
        }
    }

    /// The list view of this slot, without the embedded item.
    pub fn summary(&self) -> SlotSummary {
        SlotSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind,
            saved_at: self.saved_at,
            preview: self.preview.clone(),
        }
    }
}

/// Slot metadata as returned by slot listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSummary {
    pub id: SlotId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub saved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub preview: String,
}

/// Short preview of an item's content.
///
/// Text is cut to [`PREVIEW_MAX_CHARS`] characters, counted as `char`s so
/// multi-byte text is never split, and marked with [`PREVIEW_ELLIPSIS`] when
/// cut. Non-text items have an empty preview.
pub fn preview_of(item: &SyncItem) -> String {
    if !item.is_text() {
        return String::new();
    }
    let mut chars = item.content.chars();
    let head: String = chars.by_ref().take(PREVIEW_MAX_CHARS).collect();
    if chars.next().is_some() {
        head + PREVIEW_ELLIPSIS
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::BlobId;
    use proptest::prelude::*;

    #[test]
    fn short_text_preview_is_whole_content() {
        assert_eq!(preview_of(&SyncItem::text("hello")), "hello");
        assert_eq!(preview_of(&SyncItem::text("")), "");
    }

    #[test]
    fn exactly_fifty_chars_is_not_truncated() {
        let content = "a".repeat(50);
        assert_eq!(preview_of(&SyncItem::text(content.clone())), content);
    }

    #[test]
    fn fifty_one_chars_is_truncated() {
        let content = "b".repeat(51);
        let expected = format!("{}...", "b".repeat(50));
        assert_eq!(preview_of(&SyncItem::text(content)), expected);
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundary() {
        let content = "héllo wörld ✓ ".repeat(10);
        let preview = preview_of(&SyncItem::text(content.clone()));
        assert!(preview.ends_with(PREVIEW_ELLIPSIS));
        let head: String = content.chars().take(50).collect();
        assert_eq!(preview, format!("{head}..."));
    }

    #[test]
    fn non_text_preview_is_empty() {
        assert_eq!(preview_of(&SyncItem::image("aGVsbG8=", "image/png")), "");
        assert_eq!(
            preview_of(&SyncItem::file("a.txt", "text/plain", BlobId::new())),
            ""
        );
    }

    #[test]
    fn new_slot_mirrors_item() {
        let item = SyncItem::text("greeting text");
        let slot = SavedSlot::new("greeting", item.clone());
        assert_eq!(slot.name, "greeting");
        assert_eq!(slot.kind, ItemKind::Text);
        assert_eq!(slot.preview, "greeting text");
        assert_eq!(slot.item, item);
    }

    #[test]
    fn empty_name_is_allowed() {
        let slot = SavedSlot::new("", SyncItem::text("x"));
        assert!(slot.name.is_empty());
    }

    #[test]
    fn summary_drops_item() {
        let slot = SavedSlot::new("s", SyncItem::text("payload"));
        let summary = slot.summary();
        assert_eq!(summary.id, slot.id);
        assert_eq!(summary.preview, "payload");
        let value = serde_json::to_value(&summary).unwrap();
        assert!(value.get("item").is_none());
        assert_eq!(value["type"], "text");
        assert!(value["savedAt"].is_string());
    }

    #[test]
    fn empty_preview_is_omitted() {
        let slot = SavedSlot::new("img", SyncItem::image("aGk=", "image/gif"));
        let value = serde_json::to_value(&slot).unwrap();
        assert!(value.get("preview").is_none());
        let back: SavedSlot = serde_json::from_value(value).unwrap();
        assert_eq!(back, slot);
    }

    proptest! {
        #[test]
        fn text_preview_follows_truncation_rule(content in "\\PC{0,120}") {
            let preview = preview_of(&SyncItem::text(content.clone()));
            let len = content.chars().count();
            if len <= PREVIEW_MAX_CHARS {
                prop_assert_eq!(preview, content);
            } else {
                let head: String = content.chars().take(PREVIEW_MAX_CHARS).collect();
                prop_assert_eq!(preview, format!("{head}{PREVIEW_ELLIPSIS}"));
            }
        }

        #[test]
        fn preview_never_exceeds_limit(content in "\\PC{0,200}") {
            let preview = preview_of(&SyncItem::text(content));
            prop_assert!(preview.chars().count() <= PREVIEW_MAX_CHARS + PREVIEW_ELLIPSIS.len());
        }
    }
}
