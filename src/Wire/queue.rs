// Length-prefixed message queue: Record* until the buffer runs out.

use super::layout::RECORD_PREFIX;
use super::Message::Message;
use crate::Core::ByteList::ByteList;

/// Appends one record (`length:u32` + message bytes) to `queue`.
pub fn push_record(queue: &mut ByteList, message_bytes: &[u8]) {
    queue
        .ensure_capacity(RECORD_PREFIX + message_bytes.len())
        .write_i32_be(message_bytes.len() as i32)
        .extend_from_slice(message_bytes);
}

/// Encodes `messages` into a fresh queue buffer, in order.
pub fn encode_queue<'a, I>(messages: I) -> ByteList
where
    I: IntoIterator<Item = &'a Message>,
{
    let mut queue = ByteList::with_capacity(1024);
    for message in messages {
        push_record(&mut queue, message.as_bytes());
    }
    queue
}

/// Iterates over the message records of a queue buffer.
///
/// There is no count or terminator; iteration ends when the buffer is
/// exhausted. A trailing record whose declared length runs past the end is
/// treated as the end of the queue.
pub struct QueueReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> QueueReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.position)
    }
}

impl<'a> Iterator for QueueReader<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let prefix_end = self.position.checked_add(RECORD_PREFIX)?;
        let prefix = self.bytes.get(self.position..prefix_end)?;
        let length = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        let end = prefix_end.checked_add(length)?;
        match self.bytes.get(prefix_end..end) {
            Some(record) => {
                self.position = end;
                Some(record)
            }
            None => {
                tracing::warn!(
                    declared = length,
                    available = self.bytes.len() - prefix_end,
                    "truncated record at end of message queue"
                );
                self.position = self.bytes.len();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_preserves_order_and_content() {
        let messages: Vec<Message> = (0..5)
            .map(|i| {
                let mut m = Message::new("Tick", i + 1, i as f64);
                m.set_i32("i", i as i32);
                m
            })
            .collect();

        let queue = encode_queue(&messages);
        let decoded: Vec<Message> = QueueReader::new(queue.as_slice())
            .map(Message::from_bytes)
            .collect();

        assert_eq!(decoded.len(), 5);
        for (i, mut m) in decoded.into_iter().enumerate() {
            assert_eq!(m.type_name(), "Tick");
            assert_eq!(m.id(), i as u32 + 1);
            assert_eq!(m.get_i32("i"), i as i32);
        }
    }

    #[test]
    fn random_queue_round_trips() {
        const TYPES: [&str; 4] = ["Tick", "Display.on_render", "Über", ""];
        let mut rng = fastrand::Rng::with_seed(0x5EED_0002);
        for _ in 0..50 {
            let messages: Vec<Message> = (0..rng.usize(0..40))
                .map(|_| {
                    let mut m = Message::new(
                        TYPES[rng.usize(..TYPES.len())],
                        rng.u32(..),
                        f64::from_bits(rng.u64(..)),
                    );
                    for _ in 0..rng.usize(0..4) {
                        let payload: Vec<u8> = (0..rng.usize(0..64)).map(|_| rng.u8(..)).collect();
                        m.set_bytes("payload", &payload).set_i64("n", rng.i64(..));
                    }
                    m
                })
                .collect();

            let queue = encode_queue(&messages);
            let expected_len: usize = messages.iter().map(|m| RECORD_PREFIX + m.len()).sum();
            assert_eq!(queue.len(), expected_len);

            let records: Vec<&[u8]> = QueueReader::new(queue.as_slice()).collect();
            assert_eq!(records.len(), messages.len());
            for (record, message) in records.into_iter().zip(&messages) {
                assert_eq!(record, message.as_bytes());
                let decoded = Message::from_bytes(record);
                assert_eq!(decoded.type_name(), message.type_name());
                assert_eq!(decoded.id(), message.id());
            }
        }
    }

    #[test]
    fn empty_buffer_is_empty_queue() {
        assert_eq!(QueueReader::new(&[]).count(), 0);
    }

    #[test]
    fn truncated_tail_stops_iteration() {
        let mut queue = ByteList::new();
        push_record(&mut queue, b"abc");
        queue.write_i32_be(100).extend_from_slice(b"short");
        let mut reader = QueueReader::new(queue.as_slice());
        assert_eq!(reader.next(), Some(&b"abc"[..]));
        assert_eq!(reader.next(), None);
        assert_eq!(reader.remaining(), 0);

        // a dangling partial prefix is ignored too
        let mut reader = QueueReader::new(&[0, 0, 0, 1, 9, 0, 0]);
        assert_eq!(reader.next(), Some(&[9u8][..]));
        assert_eq!(reader.next(), None);
    }
}
