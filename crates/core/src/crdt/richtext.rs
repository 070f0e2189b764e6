//! The `rich-text` field kind's live collaborative handle (§3, §4.1).
//!
//! Lives inside the CRDT as a nested collaborative string while a table's *validated*
//! row is in hand; collapsed to a plain `String` ([`Value::RichText`](crate::field::Value::RichText))
//! whenever the row crosses into its *serialized* projection (non-CRDT materializers,
//! wire protocols). Backed by `yrs` (the teacher's own dependency for its `YDoc` store),
//! using `yrs::Text`'s standard insert/remove-range operations so concurrent edits to
//! the same rich-text field merge character-wise instead of last-writer-wins clobbering
//! the whole field.

use yrs::{Doc, GetString, Text, TextRef, Transact};

/// A live, mergeable rich-text value.
///
/// Each handle owns a private single-field `yrs::Doc`; the workspace CRDT document
/// stores the handle's plain-text projection for persistence (§3's "serialized row"),
/// and reconstructs a fresh handle from that text when a caller asks for the
/// *validated* row. Two handles merge by exchanging `yrs` update bytes, the same
/// mechanism the sync provider uses for the whole document (§4.10).
pub struct RichTextHandle {
    doc: Doc,
    text: TextRef,
}

impl RichTextHandle {
    /// A new, empty rich-text handle.
    pub fn new() -> Self {
        let doc = Doc::new();
        let text = doc.get_or_insert_text("content");
        Self { doc, text }
    }

    /// Build a handle seeded with `plain`, as when loading a row back out of a
    /// non-CRDT materializer or constructing the validated projection of a serialized row.
    pub fn from_plain_text(plain: &str) -> Self {
        let handle = Self::new();
        if !plain.is_empty() {
            let mut txn = handle.doc.transact_mut();
            handle.text.insert(&mut txn, 0, plain);
        }
        handle
    }

    /// Collapse to the lossy plain-text projection used outside the CRDT (§3).
    pub fn to_plain_text(&self) -> String {
        let txn = self.doc.transact();
        self.text.get_string(&txn)
    }

    pub fn len(&self) -> u32 {
        let txn = self.doc.transact();
        self.text.len(&txn)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert `chunk` at character offset `index`.
    pub fn insert(&mut self, index: u32, chunk: &str) {
        let mut txn = self.doc.transact_mut();
        self.text.insert(&mut txn, index, chunk);
    }

    /// Remove `len` characters starting at `index`.
    pub fn remove_range(&mut self, index: u32, len: u32) {
        let mut txn = self.doc.transact_mut();
        self.text.remove_range(&mut txn, index, len);
    }

    /// Encode this handle's update bytes for merging into a peer's handle, or for
    /// persistence alongside the rest of the document.
    pub fn encode_update(&self) -> Vec<u8> {
        let txn = self.doc.transact();
        txn.encode_update_v1()
    }

    /// Apply a peer's update bytes, merging their edits into this handle's content.
    pub fn apply_update(&mut self, update: &[u8]) -> Result<(), String> {
        let update = yrs::Update::decode_v1(update).map_err(|e| e.to_string())?;
        let mut txn = self.doc.transact_mut();
        txn.apply_update(update).map_err(|e| e.to_string())?;
        Ok(())
    }
}

impl Default for RichTextHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RichTextHandle {
    fn clone(&self) -> Self {
        Self::from_plain_text(&self.to_plain_text())
    }
}

impl std::fmt::Debug for RichTextHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RichTextHandle")
            .field("content", &self.to_plain_text())
            .finish()
    }
}

impl PartialEq for RichTextHandle {
    fn eq(&self, other: &Self) -> bool {
        self.to_plain_text() == other.to_plain_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_plain_text() {
        let handle = RichTextHandle::from_plain_text("hello world");
        assert_eq!(handle.to_plain_text(), "hello world");
        assert_eq!(handle.len(), 11);
    }

    #[test]
    fn insert_and_remove_mutate_content() {
        let mut handle = RichTextHandle::from_plain_text("hello");
        handle.insert(5, " world");
        assert_eq!(handle.to_plain_text(), "hello world");
        handle.remove_range(0, 6);
        assert_eq!(handle.to_plain_text(), "world");
    }

    #[test]
    fn concurrent_edits_merge_via_update_bytes() {
        let mut a = RichTextHandle::from_plain_text("hello");
        let mut b = RichTextHandle::from_plain_text("hello");
        a.insert(5, " there");
        b.insert(0, "say ");
        let a_update = a.encode_update();
        b.apply_update(&a_update).unwrap();
        assert_eq!(b.to_plain_text(), "say hello there");
    }
}
