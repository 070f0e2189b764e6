//! The authoritative CRDT document (§4.3): one sub-map per table (row-id -> row-map),
//! plus a kv sub-map, hosted as a recursively-mergeable [`Node`] tree, with `rich-text`
//! fields backed by a [`RichTextHandle`].

mod document;
mod errors;
mod node;
mod richtext;
mod value;

pub use document::{CrdtDocument, RowDelta, RowDeltaKind, RowSnapshot, Transaction};
pub use errors::CrdtError;
pub use node::Node;
pub use richtext::RichTextHandle;
pub use value::{node_to_field_map, CrdtValue};
