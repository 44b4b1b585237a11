use std::sync::Arc;

use parking_lot::Mutex;

use super::boundary::Boundary;
use crate::Core::ByteList::ByteList;
use crate::Wire::queue::{push_record, QueueReader};
use crate::Wire::Message::Message;

/// One exchange observed by a [`LoopbackBoundary`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Arrival {
    /// A message delivered through the queued channel.
    Posted(Vec<u8>),
    /// A message delivered through the direct channel.
    Sent(Vec<u8>),
}

impl Arrival {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Arrival::Posted(bytes) | Arrival::Sent(bytes) => bytes,
        }
    }

    pub fn decode(&self) -> Message {
        Message::from_bytes(self.bytes())
    }
}

type Responder = Box<dyn FnMut(&mut Message) -> Option<Message> + Send>;

struct LoopbackState {
    online: bool,
    echo: bool,
    arrivals: Vec<Arrival>,
    inbound: ByteList,
    responder: Option<Responder>,
}

/// In-process stand-in for the engine side of the boundary.
///
/// Records everything it receives in arrival order, hands back scripted
/// inbound queues on `post_messages`, and answers direct sends through an
/// optional responder closure. Clones share state so a test can keep one
/// handle while the transport owns another.
#[derive(Clone)]
pub struct LoopbackBoundary {
    state: Arc<Mutex<LoopbackState>>,
}

impl Default for LoopbackBoundary {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackBoundary {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LoopbackState {
                online: true,
                echo: false,
                arrivals: Vec::new(),
                inbound: ByteList::with_capacity(256),
                responder: None,
            })),
        }
    }

    /// Queues `message` to be returned by the next `post_messages` exchange.
    pub fn queue_inbound(&self, message: &Message) {
        let mut state = self.state.lock();
        push_record(&mut state.inbound, message.as_bytes());
    }

    /// Answers direct sends. Returning `None` means "no reply".
    pub fn set_responder<F>(&self, responder: F)
    where
        F: FnMut(&mut Message) -> Option<Message> + Send + 'static,
    {
        self.state.lock().responder = Some(Box::new(responder));
    }

    pub fn clear_responder(&self) {
        self.state.lock().responder = None;
    }

    /// Return every posted queue to the sender, followed by any queued
    /// inbound messages.
    pub fn set_echo(&self, echo: bool) {
        self.state.lock().echo = echo;
    }

    /// While offline every exchange fails and nothing is recorded.
    pub fn set_online(&self, online: bool) {
        self.state.lock().online = online;
    }

    pub fn arrivals(&self) -> Vec<Arrival> {
        self.state.lock().arrivals.clone()
    }

    pub fn take_arrivals(&self) -> Vec<Arrival> {
        std::mem::take(&mut self.state.lock().arrivals)
    }

    /// Type names of everything received so far, in arrival order.
    pub fn arrival_types(&self) -> Vec<String> {
        let state = self.state.lock();
        state
            .arrivals
            .iter()
            .map(|arrival| arrival.decode().type_name().to_string())
            .collect()
    }

    pub fn posted(&self) -> Vec<Message> {
        let state = self.state.lock();
        state
            .arrivals
            .iter()
            .filter(|arrival| matches!(arrival, Arrival::Posted(_)))
            .map(Arrival::decode)
            .collect()
    }

    pub fn sent(&self) -> Vec<Message> {
        let state = self.state.lock();
        state
            .arrivals
            .iter()
            .filter(|arrival| matches!(arrival, Arrival::Sent(_)))
            .map(Arrival::decode)
            .collect()
    }
}

impl Boundary for LoopbackBoundary {
    fn send_message(&mut self, io: &mut ByteList) -> bool {
        let mut state = self.state.lock();
        if !state.online {
            return false;
        }
        state.arrivals.push(Arrival::Sent(io.as_slice().to_vec()));

        let Some(responder) = state.responder.as_mut() else {
            return false;
        };
        let mut request = Message::from_bytes(io.as_slice());
        match responder(&mut request) {
            Some(reply) => {
                io.replace_with(reply.as_bytes());
                true
            }
            None => false,
        }
    }

    fn post_messages(&mut self, queue: &mut ByteList) -> bool {
        let mut state = self.state.lock();
        if !state.online {
            return false;
        }
        for record in QueueReader::new(queue.as_slice()) {
            state.arrivals.push(Arrival::Posted(record.to_vec()));
        }

        let state = &mut *state;
        if state.echo {
            queue.extend_from_slice(state.inbound.as_slice());
        } else {
            queue.replace_with(state.inbound.as_slice());
        }
        state.inbound.clear();
        !queue.is_empty()
    }
}
