use super::boundary::Boundary;
use super::transport::Transport;
use crate::error::{BridgeError, Result};
use crate::Wire::layout::DEFAULT_RETAINED_CAPACITY;

pub struct TransportBuilder {
    pub(crate) queue_capacity: usize,
    pub(crate) scratch_capacity: usize,
    pub(crate) retained_message_capacity: usize,
    pub(crate) max_pooled_messages: usize,
    pub(crate) flush_before_send: bool,
    pub(crate) first_message_id: u32,
}

impl Default for TransportBuilder {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,   // per queue buffer
            scratch_capacity: 128,  // direct exchange buffer
            retained_message_capacity: DEFAULT_RETAINED_CAPACITY,
            max_pooled_messages: 256,
            flush_before_send: false,
            first_message_id: 1, // 0 is reserved
        }
    }
}

impl TransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial bytes reserved for each of the two queue buffers.
    pub fn with_queue_capacity(mut self, bytes: usize) -> Self {
        self.queue_capacity = bytes;
        self
    }

    /// Initial bytes reserved for the direct-exchange buffer.
    pub fn with_scratch_capacity(mut self, bytes: usize) -> Self {
        self.scratch_capacity = bytes;
        self
    }

    /// Upper bound on the buffer a recycled message may keep.
    pub fn with_retained_message_capacity(mut self, bytes: usize) -> Self {
        self.retained_message_capacity = bytes;
        self
    }

    /// Upper bound on the free list. 0 turns pooling off.
    pub fn with_max_pooled_messages(mut self, count: usize) -> Self {
        self.max_pooled_messages = count;
        self
    }

    /// Deliver pending posts before every direct `send`, inside the same
    /// critical section. Off by default: a sent message may overtake
    /// messages posted before it.
    pub fn with_flush_before_send(mut self, enabled: bool) -> Self {
        self.flush_before_send = enabled;
        self
    }

    pub fn with_first_message_id(mut self, id: u32) -> Self {
        self.first_message_id = id;
        self
    }

    pub fn build<B: Boundary + 'static>(self, boundary: B) -> Result<Transport> {
        if self.first_message_id == 0 {
            return Err(BridgeError::InvalidConfig(
                "message id 0 is reserved".to_string(),
            ));
        }
        Ok(Transport::new(self, Box::new(boundary)))
    }
}
