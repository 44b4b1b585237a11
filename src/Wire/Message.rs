// A self-describing typed key/value message and its backing bytes.

use crate::Core::utf::{ComparableString, Utf8Encoder};
use crate::Core::ByteList::ByteList;
use std::sync::Arc;

/// One unit of communication across the boundary.
///
/// The header (type, id, timestamp) and every field live in a single
/// contiguous [`ByteList`]. Writes always append; reads go through an
/// explicit cursor that every lookup rewinds to the start of the field
/// region.
///
/// ### Field lookup
/// Fields form an ordered sequence, not a map. Lookup is a forward scan and
/// the first field with a matching name wins; a later field reusing the name
/// still takes up wire space but is never returned.
///
/// ### Replies
/// `reply()` lazily builds a reply addressed with an empty type and this
/// message's id. The reply's storage is kept when the message is recycled so
/// a pooled request/reply cycle does not allocate.
pub struct Message {
    /// Interned type name; empty for replies.
    pub(crate) type_name: Arc<str>,

    /// Serial number. Replies carry the id of the request they answer.
    pub(crate) id: u32,

    /// Seconds since the Unix epoch.
    pub(crate) timestamp: f64,

    /// Header followed by the field region.
    pub(crate) data: ByteList,

    /// Read cursor into `data`.
    pub(crate) position: usize,

    /// Offset of the first field in `data`.
    pub(crate) field_start: usize,

    /// Set once the bytes have been handed to the other side.
    pub(crate) sent: bool,

    /// Reply storage, kept across recycles.
    pub(crate) reply: Option<Box<Message>>,

    /// Whether `reply` holds a live reply for the current request.
    pub(crate) has_reply: bool,

    /// Scratch decoder for names and string payloads.
    pub(crate) text: ComparableString,

    /// Scratch encoder for UTF-16 input.
    pub(crate) encoder: Utf8Encoder,
}

/// Numeric value of a field under its wire tag, before coercion.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum Number {
    Real(f64),
    Long(i64),
    Int(i32),
    Byte(u8),
}

/// Borrowed view of one field, produced by [`Message::fields`].
#[derive(Clone, Debug, PartialEq)]
pub struct FieldView<'a> {
    pub name: String,
    pub tag: u8,
    pub payload: &'a [u8],
}
