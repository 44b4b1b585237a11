// Dual-mode transport: queued `post` delivered once per flush cycle, and
// synchronous `send` exchanged immediately for an optional reply.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;
use parking_lot::ReentrantMutex;

use super::boundary::Boundary;
use super::builder::TransportBuilder;
use crate::Core::alloc::MessagePool;
use crate::Core::intern::StringTable;
use crate::Core::ByteList::ByteList;
use crate::Wire::queue::{push_record, QueueReader};
use crate::Wire::Message::Message;
use crate::Wire::Message_impl::now_seconds;

/// Callback invoked for every dispatched message of one type.
///
/// The handler may fill in `message.reply()` and may `post`/`send` through the
/// transport it is given.
pub type Handler = Arc<dyn Fn(&mut Message, &Transport) + Send + Sync>;

/// Everything guarded by the global lock.
///
/// The lock is reentrant because handlers run inside a flush cycle and are
/// allowed to post or send. No `RefCell` borrow is ever held across a call
/// into a handler or into the boundary.
pub(crate) struct Shared {
    pub(crate) state: RefCell<State>,
    pub(crate) boundary: RefCell<Box<dyn Boundary>>,
    pub(crate) handlers: RefCell<HashMap<Arc<str>, Handler>>,
}

pub(crate) struct State {
    /// Queue being filled by `post`.
    pub(crate) outbound: ByteList,
    /// Queue being exchanged and drained by the current flush.
    pub(crate) inbound: ByteList,
    /// Direct-exchange buffer for `send`.
    pub(crate) scratch: ByteList,
    pub(crate) pool: MessagePool,
    pub(crate) strings: StringTable,
}

/// Host-side endpoint of the message boundary.
///
/// All methods take `&self`; the transport is `Send + Sync` and is meant to be
/// shared between a producer thread and the thread driving `flush_cycle`.
pub struct Transport {
    pub(crate) shared: ReentrantMutex<Shared>,
    next_id: CachePadded<AtomicU32>,
    flush_before_send: bool,
}

impl Transport {
    pub fn builder() -> TransportBuilder {
        TransportBuilder::new()
    }

    pub(crate) fn new(config: TransportBuilder, boundary: Box<dyn Boundary>) -> Self {
        let state = State {
            outbound: ByteList::with_capacity(config.queue_capacity),
            inbound: ByteList::with_capacity(config.queue_capacity),
            scratch: ByteList::with_capacity(config.scratch_capacity),
            pool: MessagePool::new(
                config.retained_message_capacity,
                config.max_pooled_messages,
            ),
            strings: StringTable::new(),
        };

        Self {
            shared: ReentrantMutex::new(Shared {
                state: RefCell::new(state),
                boundary: RefCell::new(boundary),
                handlers: RefCell::new(HashMap::new()),
            }),
            next_id: CachePadded::new(AtomicU32::new(config.first_message_id)),
            flush_before_send: config.flush_before_send,
        }
    }

    fn allocate_id(&self) -> u32 {
        loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
        }
    }

    // ------------------------------------------------------------------
    // Message lifecycle
    // ------------------------------------------------------------------

    /// A pooled message with a fresh id, stamped with the current time.
    pub fn create(&self, type_name: &str) -> Message {
        self.create_at(type_name, now_seconds())
    }

    /// Same as [`create`](Self::create) with an explicit timestamp, for
    /// replayed or historical events.
    pub fn create_at(&self, type_name: &str, timestamp: f64) -> Message {
        let id = self.allocate_id();
        self.create_with(type_name, id, timestamp)
    }

    /// An unsolicited reply to message `reply_to`.
    pub fn create_reply(&self, reply_to: u32) -> Message {
        self.create_with("", reply_to, now_seconds())
    }

    fn create_with(&self, type_name: &str, id: u32, timestamp: f64) -> Message {
        let guard = self.shared.lock();
        let mut state = guard.state.borrow_mut();
        let type_name = state.strings.intern(type_name);
        let mut message = state.pool.take();
        message.init(type_name, id, timestamp);
        message
    }

    /// Decodes wire bytes into a pooled message.
    pub fn decode(&self, bytes: &[u8]) -> Message {
        let guard = self.shared.lock();
        let mut state = guard.state.borrow_mut();
        let state = &mut *state;
        let mut message = state.pool.take();
        message.init_from_bytes(bytes, &mut state.strings);
        message
    }

    /// Hands `message` (and any reply it carries) back to the pool.
    pub fn recycle(&self, message: Message) {
        let guard = self.shared.lock();
        guard.state.borrow_mut().pool.give_back(message);
    }

    /// Shared instance of `text` from the interning table.
    pub fn intern(&self, text: &str) -> Arc<str> {
        let guard = self.shared.lock();
        let mut state = guard.state.borrow_mut();
        state.strings.intern(text)
    }

    // ------------------------------------------------------------------
    // Delivery
    // ------------------------------------------------------------------

    /// Appends `message` to the outbound queue for the next flush cycle and
    /// recycles it. Never blocks on the boundary.
    pub fn post(&self, mut message: Message) {
        let guard = self.shared.lock();
        let mut state = guard.state.borrow_mut();
        push_record(&mut state.outbound, message.as_bytes());
        message.mark_sent();
        tracing::trace!(
            message_type = message.type_name(),
            id = message.id(),
            bytes = message.len(),
            "posted"
        );
        state.pool.give_back(message);
    }

    /// Exchanges `message` with the other side right now and returns the
    /// reply, if any.
    ///
    /// This bypasses the outbound queue: unless the transport was built with
    /// `with_flush_before_send(true)`, messages posted earlier may reach the
    /// other side after this one.
    pub fn send(&self, mut message: Message) -> Option<Message> {
        let guard = self.shared.lock();
        if self.flush_before_send {
            self.flush_locked(&guard);
        }

        let mut io = {
            let mut state = guard.state.borrow_mut();
            let mut io = mem::take(&mut state.scratch);
            io.replace_with(message.as_bytes());
            message.mark_sent();
            tracing::trace!(
                message_type = message.type_name(),
                id = message.id(),
                bytes = message.len(),
                "sending"
            );
            state.pool.give_back(message);
            io
        };

        let replied = match guard.boundary.try_borrow_mut() {
            Ok(mut boundary) => boundary.send_message(&mut io),
            Err(_) => {
                tracing::warn!("boundary is mid-exchange; nested send dropped");
                false
            }
        };

        let mut state = guard.state.borrow_mut();
        let state = &mut *state;
        let reply = if replied {
            let mut reply = state.pool.take();
            reply.init_from_bytes(io.as_slice(), &mut state.strings);
            Some(reply)
        } else {
            tracing::debug!("send returned no reply");
            None
        };
        state.scratch = io;
        reply
    }

    /// Runs the handler registered for the message's type. Messages without a
    /// handler are dropped.
    pub fn dispatch(&self, message: &mut Message) {
        let handler = {
            let guard = self.shared.lock();
            let handlers = guard.handlers.borrow();
            handlers.get(message.type_name()).cloned()
        };

        match handler {
            Some(handler) => handler(message, self),
            None => tracing::trace!(
                message_type = message.type_name(),
                id = message.id(),
                "no handler registered; message dropped"
            ),
        }
    }

    /// Serves a synchronous request initiated by the engine.
    ///
    /// `io` holds one encoded message. If its handler produced a reply, the
    /// reply bytes replace the content of `io` and `true` is returned.
    pub fn dispatch_direct(&self, io: &mut ByteList) -> bool {
        let _guard = self.shared.lock();
        let mut message = self.decode(io.as_slice());
        self.dispatch(&mut message);

        let replied = match message.existing_reply_mut() {
            Some(reply) => {
                io.replace_with(reply.as_bytes());
                reply.mark_sent();
                true
            }
            None => false,
        };
        self.recycle(message);
        replied
    }

    /// One frame's worth of queued traffic.
    ///
    /// Swaps the queue buffers, hands the filled one to the boundary and, if
    /// the engine answered with messages, dispatches them in arrival order.
    /// Returns the number of messages dispatched.
    pub fn flush_cycle(&self) -> usize {
        let guard = self.shared.lock();
        self.flush_locked(&guard)
    }

    fn flush_locked(&self, shared: &Shared) -> usize {
        let mut queue = {
            let mut state = shared.state.borrow_mut();
            let state = &mut *state;
            state.inbound.clear();
            mem::swap(&mut state.inbound, &mut state.outbound);
            mem::take(&mut state.inbound)
        };

        let delivered = match shared.boundary.try_borrow_mut() {
            Ok(mut boundary) => boundary.post_messages(&mut queue),
            Err(_) => {
                tracing::warn!("boundary is mid-exchange; flush skipped this cycle");
                false
            }
        };

        let mut dispatched = 0;
        if delivered {
            for record in QueueReader::new(queue.as_slice()) {
                let mut message = self.decode(record);
                self.dispatch(&mut message);
                self.recycle(message);
                dispatched += 1;
            }
        }
        tracing::trace!(delivered, dispatched, "flush cycle complete");

        queue.clear();
        shared.state.borrow_mut().inbound = queue;
        dispatched
    }

    // ------------------------------------------------------------------
    // Handlers
    // ------------------------------------------------------------------

    /// Registers `handler` for `type_name`, replacing any previous one.
    pub fn set_handler<F>(&self, type_name: &str, handler: F)
    where
        F: Fn(&mut Message, &Transport) + Send + Sync + 'static,
    {
        let key = self.intern(type_name);
        let guard = self.shared.lock();
        let replaced = guard
            .handlers
            .borrow_mut()
            .insert(key, Arc::new(handler))
            .is_some();
        tracing::debug!(message_type = type_name, replaced, "handler registered");
    }

    /// Returns whether a handler was registered.
    pub fn remove_handler(&self, type_name: &str) -> bool {
        let guard = self.shared.lock();
        let removed = guard.handlers.borrow_mut().remove(type_name).is_some();
        tracing::debug!(message_type = type_name, removed, "handler removed");
        removed
    }

    pub fn has_handler(&self, type_name: &str) -> bool {
        let guard = self.shared.lock();
        let handlers = guard.handlers.borrow();
        handlers.contains_key(type_name)
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Messages currently waiting in the pool.
    pub fn pooled_messages(&self) -> usize {
        let guard = self.shared.lock();
        let state = guard.state.borrow();
        state.pool.available()
    }

    /// Encoded bytes posted since the last flush.
    pub fn pending_outbound_bytes(&self) -> usize {
        let guard = self.shared.lock();
        let state = guard.state.borrow();
        state.outbound.len()
    }

    pub fn interned_strings(&self) -> usize {
        let guard = self.shared.lock();
        let state = guard.state.borrow();
        state.strings.len()
    }

    /// Id the next `create` will hand out (0 is skipped).
    pub fn next_message_id(&self) -> u32 {
        match self.next_id.load(Ordering::Relaxed) {
            0 => 1,
            id => id,
        }
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_transport(self, f)
    }
}
