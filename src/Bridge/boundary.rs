use crate::Core::ByteList::ByteList;

/// The two synchronous primitives offered by the engine side of the boundary.
///
/// Both exchange opaque bytes in place: the caller hands over a buffer and,
/// on success, the implementation leaves the answer in that same buffer.
/// The transport calls these while holding its global lock.
pub trait Boundary: Send {
    /// `io` holds exactly one encoded message. Returns `true` when the engine
    /// replied, in which case `io` now holds the reply message.
    fn send_message(&mut self, io: &mut ByteList) -> bool;

    /// `queue` holds the outbound message queue. Returns `true` when the
    /// engine had messages for us, in which case `queue` now holds the
    /// inbound queue.
    fn post_messages(&mut self, queue: &mut ByteList) -> bool;
}

/// A boundary with nobody on the other side: every exchange fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct Disconnected;

impl Boundary for Disconnected {
    fn send_message(&mut self, _io: &mut ByteList) -> bool {
        false
    }

    fn post_messages(&mut self, _queue: &mut ByteList) -> bool {
        false
    }
}
