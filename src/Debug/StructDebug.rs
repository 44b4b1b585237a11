use std::fmt;

use crate::Bridge::Transport;
use crate::Core::alloc::MessagePool;
use crate::Core::ByteList::ByteList;
use crate::Wire::layout::FieldTag;
use crate::Wire::Message::Message;

/// Debug function for Message
///
/// Shows the decoded header and one entry per field, without moving the
/// message's read cursor.
pub fn debug_message(message: &Message, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let fields: Vec<String> = message
        .fields()
        .map(|field| {
            let tag = match FieldTag::from_byte(field.tag) {
                Some(tag) => format!("{tag:?}"),
                None => format!("tag {}", field.tag),
            };
            format!("{}: {} ({} bytes)", field.name, tag, field.payload.len())
        })
        .collect();

    f.debug_struct("Message")
        .field("type", &message.type_name())
        .field("id", &message.id())
        .field("timestamp", &message.timestamp())
        .field("bytes", &message.len())
        .field("sent", &message.is_sent())
        .field("fields", &fields)
        .finish()
}

/// Debug function for MessagePool
pub fn debug_message_pool(pool: &MessagePool, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MessagePool")
        .field("available", &pool.available())
        .field("max_pooled", &pool.max_pooled())
        .field("retained_capacity", &pool.retained_capacity())
        .field("created", &pool.created())
        .field("reused", &pool.reused())
        .finish()
}

/// Debug function for ByteList
///
/// Prints length and capacity only; use `Message::hex_dump` for content.
pub fn debug_byte_list(bytes: &ByteList, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ByteList")
        .field("len", &bytes.len())
        .field("capacity", &bytes.capacity())
        .finish()
}

pub fn debug_lookup_list<V: fmt::Debug>(
    values: &[V],
    free: &[u32],
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    f.debug_struct("LookupList")
        .field("values", &values)
        .field("free_handles", &free)
        .finish()
}

/// Debug function for Transport
pub fn debug_transport(transport: &Transport, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Transport")
        .field("next_message_id", &transport.next_message_id())
        .field("pending_outbound_bytes", &transport.pending_outbound_bytes())
        .field("pooled_messages", &transport.pooled_messages())
        .field("interned_strings", &transport.interned_strings())
        .finish_non_exhaustive()
}
