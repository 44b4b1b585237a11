use crate::Wire::layout::DEFAULT_RETAINED_CAPACITY;
use crate::Wire::Message::Message;
mod debug;
mod getters;

/// Free list of reusable messages.
///
/// `take` hands out a recycled message when one is available, otherwise a
/// fresh one. `give_back` resets the message, caps the memory it may keep and
/// parks it for the next `take`. The pool itself is not synchronized; the
/// transport only touches it under its global lock.
pub struct MessagePool {
    free: Vec<Message>,
    /// Per-message buffer cap applied on recycle.
    retained_capacity: usize,
    /// Free-list length cap; extra messages are dropped.
    max_pooled: usize,
    created: u64,
    reused: u64,
}

impl Default for MessagePool {
    fn default() -> Self {
        Self::new(DEFAULT_RETAINED_CAPACITY, 256)
    }
}

impl MessagePool {
    pub fn new(retained_capacity: usize, max_pooled: usize) -> Self {
        Self {
            free: Vec::with_capacity(max_pooled.min(64)),
            retained_capacity,
            max_pooled,
            created: 0,
            reused: 0,
        }
    }

    /// A reset message, recycled when possible.
    pub fn take(&mut self) -> Message {
        match self.free.pop() {
            Some(message) => {
                self.reused += 1;
                message
            }
            None => {
                self.created += 1;
                Message::default()
            }
        }
    }

    /// Returns `message` to the free list.
    pub fn give_back(&mut self, mut message: Message) {
        if self.free.len() >= self.max_pooled {
            return;
        }
        message.reset();
        message.limit_capacity(self.retained_capacity);
        self.free.push(message);
    }

    /// Drops every pooled message.
    pub fn drain(&mut self) {
        self.free.clear();
    }
}
