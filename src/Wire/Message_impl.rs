use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use super::layout::{FieldTag, HEADER_TAIL};
use super::Message::{FieldView, Message, Number};
use crate::Core::intern::StringTable;
use crate::Core::utf::{hash_str, ComparableString, Utf8Encoder};
use crate::Core::ByteList::ByteList;

/// Current wall-clock time in seconds, the default message timestamp.
pub fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

impl Default for Message {
    fn default() -> Self {
        Self {
            type_name: Arc::from(""),
            id: 0,
            timestamp: 0.0,
            data: ByteList::with_capacity(64),
            position: 0,
            field_start: 0,
            sent: false,
            reply: None,
            has_reply: false,
            text: ComparableString::with_capacity(32),
            encoder: Utf8Encoder::with_capacity(32),
        }
    }
}

impl Message {
    /// Builds a standalone message. Transports hand out pooled messages with
    /// interned types instead; see `Transport::create`.
    pub fn new(type_name: &str, id: u32, timestamp: f64) -> Self {
        let mut message = Self::default();
        message.init(Arc::from(type_name), id, timestamp);
        message
    }

    /// Decodes a standalone message from its wire bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut table = StringTable::new();
        let mut message = Self::default();
        message.init_from_bytes(bytes, &mut table);
        message
    }

    /// Clears content and state. The reply slot is kept for reuse.
    pub fn reset(&mut self) -> &mut Self {
        self.data.clear();
        self.position = 0;
        self.field_start = 0;
        self.sent = false;
        self.has_reply = false;
        self.text.clear();
        self
    }

    /// Writes the header and marks the start of the field region.
    pub fn init(&mut self, type_name: Arc<str>, id: u32, timestamp: f64) -> &mut Self {
        self.reset();
        self.data
            .ensure_capacity(4 + type_name.len() + HEADER_TAIL)
            .write_i32_be(type_name.len() as i32)
            .extend_from_slice(type_name.as_bytes())
            .write_i32_be(id as i32);
        self.write_f64(timestamp);
        self.type_name = type_name;
        self.id = id;
        self.timestamp = timestamp;
        self.field_start = self.data.len();
        self
    }

    /// Copies `bytes` in and decodes the header; the field region starts
    /// wherever the header ends.
    pub fn init_from_bytes(&mut self, bytes: &[u8], table: &mut StringTable) -> &mut Self {
        self.reset();
        self.data.extend_from_slice(bytes);
        self.read_string();
        self.type_name = table.intern_builder(&self.text);
        self.id = self.read_i32() as u32;
        self.timestamp = self.read_f64();
        self.field_start = self.position;
        self
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[inline]
    pub fn type_arc(&self) -> &Arc<str> {
        &self.type_name
    }

    /// Replies travel with an empty type.
    #[inline]
    pub fn is_reply(&self) -> bool {
        self.type_name.is_empty()
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    #[inline]
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    #[inline]
    pub(crate) fn mark_sent(&mut self) {
        self.sent = true;
    }

    /// Encoded message (header and fields).
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_slice()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn reserve(&mut self, additional: usize) -> &mut Self {
        self.data.ensure_capacity(additional);
        self
    }

    /// Reply to this message, created on first use.
    pub fn reply(&mut self) -> &mut Message {
        if !self.has_reply {
            let id = self.id;
            let reply = self.reply.get_or_insert_with(Box::default);
            let empty = if reply.type_name.is_empty() {
                Arc::clone(&reply.type_name)
            } else {
                Arc::from("")
            };
            reply.init(empty, id, now_seconds());
            self.has_reply = true;
        }
        self.reply.get_or_insert_with(Box::default)
    }

    /// The reply, if a handler created one.
    pub fn existing_reply(&self) -> Option<&Message> {
        if self.has_reply {
            self.reply.as_deref()
        } else {
            None
        }
    }

    pub(crate) fn existing_reply_mut(&mut self) -> Option<&mut Message> {
        if self.has_reply {
            self.reply.as_deref_mut()
        } else {
            None
        }
    }

    /// Caps retained buffers (including the spare reply) before the message
    /// goes back to a pool.
    pub(crate) fn limit_capacity(&mut self, max_capacity: usize) {
        self.data.shrink_to(max_capacity);
        if let Some(reply) = self.reply.as_deref_mut() {
            reply.data.shrink_to(max_capacity);
        }
    }

    // ------------------------------------------------------------------
    // Writers
    // ------------------------------------------------------------------

    fn writable(&self, name: &str) -> bool {
        if self.sent {
            tracing::warn!(
                message_type = %self.type_name,
                id = self.id,
                field = name,
                "ignoring write to a message that was already sent"
            );
            return false;
        }
        true
    }

    fn write_field_header(&mut self, name: &str, tag: FieldTag, size: usize) {
        self.data
            .ensure_capacity(4 + name.len() + 1 + 4 + size)
            .write_i32_be(name.len() as i32)
            .extend_from_slice(name.as_bytes())
            .push(tag.as_byte())
            .write_i32_be(size as i32);
    }

    fn write_i64(&mut self, value: i64) {
        self.data
            .write_i32_be((value >> 32) as i32)
            .write_i32_be(value as i32);
    }

    fn write_f64(&mut self, value: f64) {
        self.write_i64(value.to_bits() as i64);
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> &mut Self {
        self.set_byte(name, value as u8)
    }

    pub fn set_byte(&mut self, name: &str, value: u8) -> &mut Self {
        if self.writable(name) {
            self.write_field_header(name, FieldTag::Bytes, 1);
            self.data.push(value);
        }
        self
    }

    pub fn set_bytes(&mut self, name: &str, bytes: &[u8]) -> &mut Self {
        if self.writable(name) {
            self.write_field_header(name, FieldTag::Bytes, bytes.len());
            self.data.extend_from_slice(bytes);
        }
        self
    }

    pub fn set_f64(&mut self, name: &str, value: f64) -> &mut Self {
        if self.writable(name) {
            self.write_field_header(name, FieldTag::Real64, 8);
            self.write_f64(value);
        }
        self
    }

    pub fn set_i32(&mut self, name: &str, value: i32) -> &mut Self {
        if self.writable(name) {
            self.write_field_header(name, FieldTag::Int32, 4);
            self.data.write_i32_be(value);
        }
        self
    }

    pub fn set_i64(&mut self, name: &str, value: i64) -> &mut Self {
        if self.writable(name) {
            self.write_field_header(name, FieldTag::Int64, 8);
            self.write_i64(value);
        }
        self
    }

    /// Strings are byte fields holding UTF-8.
    pub fn set_str(&mut self, name: &str, value: &str) -> &mut Self {
        self.set_bytes(name, value.as_bytes())
    }

    /// Stores UTF-16 text (as handed over by a UTF-16 host runtime) as a
    /// UTF-8 string field. Unpaired surrogates are dropped.
    pub fn set_utf16(&mut self, name: &str, units: &[u16]) -> &mut Self {
        if !self.writable(name) {
            return self;
        }
        self.encoder.clear();
        for &unit in units {
            self.encoder.write_utf16_unit(unit);
        }
        self.encoder.finish();
        if !self.encoder.is_valid() {
            tracing::debug!(field = name, "unpaired surrogate dropped from UTF-16 field");
        }
        self.write_field_header(name, FieldTag::Bytes, self.encoder.len());
        self.data.extend_from_slice(self.encoder.as_bytes());
        self
    }

    // ------------------------------------------------------------------
    // Readers
    // ------------------------------------------------------------------

    /// Next byte, or 0 once the cursor runs off the end.
    fn read_byte(&mut self) -> u8 {
        match self.data.as_slice().get(self.position) {
            Some(&b) => {
                self.position += 1;
                b
            }
            None => 0,
        }
    }

    fn read_i32(&mut self) -> i32 {
        let value = self.data.read_i32_be(self.position);
        self.position = (self.position + 4).min(self.data.len().max(self.position));
        value
    }

    fn read_i64(&mut self) -> i64 {
        let high = self.read_i32() as i64;
        let low = self.read_i32() as u32 as i64;
        (high << 32) | low
    }

    fn read_f64(&mut self) -> f64 {
        f64::from_bits(self.read_i64() as u64)
    }

    /// Reads a length-prefixed UTF-8 string into the scratch decoder.
    fn read_string(&mut self) {
        let declared = self.read_i32() as u32 as usize;
        let available = self.data.len().saturating_sub(self.position);
        let count = declared.min(available);
        self.text.clear().reserve(count);
        for _ in 0..count {
            let b = self.read_byte();
            self.text.write_utf8_byte(b);
        }
        self.text.finish();
    }

    /// Moves the cursor just past the name of the first field called `name`.
    fn seek(&mut self, name: &str) -> bool {
        let target = hash_str(name);
        self.position = self.field_start;
        while self.position < self.data.len() {
            self.read_string();
            if self.text.hash_code() == target && self.text.eq_str(name) {
                return true;
            }
            self.read_byte();
            let skip = self.read_i32() as u32 as usize;
            self.position = self.position.saturating_add(skip);
        }
        false
    }

    /// Tag and payload size of the field under the cursor.
    fn read_field_header(&mut self) -> (u8, usize) {
        let tag = self.read_byte();
        let size = self.read_i32() as u32 as usize;
        (tag, size)
    }

    fn read_number(&mut self, name: &str) -> Option<Number> {
        if !self.seek(name) {
            return None;
        }
        let (tag, size) = self.read_field_header();
        if size == 0 {
            return None;
        }
        match FieldTag::from_byte(tag)? {
            FieldTag::Bytes => Some(Number::Byte(self.read_byte())),
            FieldTag::Int32 => Some(Number::Int(self.read_i32())),
            FieldTag::Int64 => Some(Number::Long(self.read_i64())),
            FieldTag::Real64 => Some(Number::Real(self.read_f64())),
        }
    }

    /// Whether a field called `name` is present.
    pub fn contains(&mut self, name: &str) -> bool {
        self.seek(name)
    }

    pub fn get_bool(&mut self, name: &str) -> bool {
        self.get_byte(name) != 0
    }

    pub fn get_byte(&mut self, name: &str) -> u8 {
        match self.read_number(name) {
            Some(Number::Byte(v)) => v,
            Some(Number::Int(v)) => v as u8,
            Some(Number::Long(v)) => v as u8,
            Some(Number::Real(v)) => v as i64 as u8,
            None => 0,
        }
    }

    pub fn get_i32(&mut self, name: &str) -> i32 {
        match self.read_number(name) {
            Some(Number::Byte(v)) => v as i32,
            Some(Number::Int(v)) => v,
            Some(Number::Long(v)) => v as i32,
            Some(Number::Real(v)) => v as i32,
            None => 0,
        }
    }

    pub fn get_i64(&mut self, name: &str) -> i64 {
        match self.read_number(name) {
            Some(Number::Byte(v)) => v as i64,
            Some(Number::Int(v)) => v as i64,
            Some(Number::Long(v)) => v,
            Some(Number::Real(v)) => v as i64,
            None => 0,
        }
    }

    pub fn get_f64(&mut self, name: &str) -> f64 {
        match self.read_number(name) {
            Some(Number::Byte(v)) => v as f64,
            Some(Number::Int(v)) => v as f64,
            Some(Number::Long(v)) => v as f64,
            Some(Number::Real(v)) => v,
            None => 0.0,
        }
    }

    /// Text of a byte field; numeric fields are rendered as numbers.
    pub fn get_string(&mut self, name: &str) -> String {
        if !self.seek(name) {
            return String::new();
        }
        let tag = self.read_byte();
        if tag == FieldTag::Bytes.as_byte() {
            // the size field doubles as the string's length prefix
            self.read_string();
            return self.text.to_string();
        }

        let size = self.read_i32() as u32 as usize;
        if size == 0 {
            return String::new();
        }
        match FieldTag::from_byte(tag) {
            Some(FieldTag::Int32) => self.read_i32().to_string(),
            Some(FieldTag::Int64) => self.read_i64().to_string(),
            Some(FieldTag::Real64) => format!("{:?}", self.read_f64()),
            _ => String::new(),
        }
    }

    /// Raw payload of a field regardless of its tag.
    pub fn get_bytes(&mut self, name: &str) -> Vec<u8> {
        match self.payload_range(name) {
            Some((start, end)) => self.data.as_slice()[start..end].to_vec(),
            None => Vec::new(),
        }
    }

    /// Copies at most `out.len()` payload bytes into `out`; returns the
    /// number copied.
    pub fn get_bytes_into(&mut self, name: &str, out: &mut [u8]) -> usize {
        match self.payload_range(name) {
            Some((start, end)) => {
                let n = (end - start).min(out.len());
                out[..n].copy_from_slice(&self.data.as_slice()[start..start + n]);
                n
            }
            None => 0,
        }
    }

    fn payload_range(&mut self, name: &str) -> Option<(usize, usize)> {
        if !self.seek(name) {
            return None;
        }
        let (_, size) = self.read_field_header();
        let start = self.position.min(self.data.len());
        let end = start.saturating_add(size).min(self.data.len());
        Some((start, end))
    }

    /// Walks the field region without touching the read cursor.
    pub fn fields(&self) -> Fields<'_> {
        Fields {
            bytes: self.data.as_slice(),
            position: self.field_start,
        }
    }

    /// Two-line dump: hex bytes, then printable ASCII under each byte.
    pub fn hex_dump(&self) -> String {
        const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
        let bytes = self.data.as_slice();
        let mut hex = String::with_capacity(bytes.len() * 3);
        let mut ascii = String::with_capacity(bytes.len() * 3);
        for (i, &b) in bytes.iter().enumerate() {
            if i > 0 {
                hex.push(' ');
                ascii.push(' ');
            }
            hex.push(DIGITS[(b >> 4) as usize] as char);
            hex.push(DIGITS[(b & 15) as usize] as char);
            ascii.push(' ');
            ascii.push(if (b' '..=126).contains(&b) { b as char } else { '.' });
        }
        format!("{hex}\n{ascii}")
    }
}

/// Iterator over the fields of a message, in wire order.
pub struct Fields<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Fields<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.position.checked_add(n)?;
        let slice = self.bytes.get(self.position..end)?;
        self.position = end;
        Some(slice)
    }

    fn take_u32(&mut self) -> Option<usize> {
        let raw = self.take(4)?;
        Some(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize)
    }
}

impl<'a> Iterator for Fields<'a> {
    type Item = FieldView<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let name_len = self.take_u32()?;
        let name = ComparableString::from_utf8(self.take(name_len)?).to_string();
        let tag = *self.take(1)?.first()?;
        let size = self.take_u32()?;
        let payload = self.take(size)?;
        Some(FieldView { name, tag, payload })
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_message(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_scenario() {
        let mut ping = Message::new("Ping", 7, 12.5);
        ping.set_i32("n", 42);

        let mut decoded = Message::from_bytes(ping.as_bytes());
        assert_eq!(decoded.type_name(), "Ping");
        assert_eq!(decoded.id(), 7);
        assert_eq!(decoded.timestamp(), 12.5);
        assert_eq!(decoded.get_i32("n"), 42);
        assert_eq!(decoded.get_string("missing"), "");
    }

    #[test]
    fn header_bytes_are_big_endian() {
        let message = Message::new("Hi", 0x0102_0304, 1.0);
        let mut expected = vec![0, 0, 0, 2, b'H', b'i', 1, 2, 3, 4];
        expected.extend_from_slice(&1.0f64.to_bits().to_be_bytes());
        assert_eq!(message.as_bytes(), &expected[..]);
    }

    #[test]
    fn field_bytes_follow_layout() {
        let mut message = Message::new("", 0, 0.0);
        let start = message.len();
        message.set_i64("k", -2);
        let field = &message.as_bytes()[start..];
        assert_eq!(&field[..4], &[0, 0, 0, 1]);
        assert_eq!(field[4], b'k');
        assert_eq!(field[5], FieldTag::Int64.as_byte());
        assert_eq!(&field[6..10], &[0, 0, 0, 8]);
        assert_eq!(&field[10..], &(-2i64).to_be_bytes());
    }

    #[test]
    fn every_tag_round_trips() {
        let mut original = Message::new("Everything", 99, 1234.25);
        original
            .set_f64("real", -3.75)
            .set_i64("long", 0x1234_5678_9ABC_DEF0)
            .set_i32("int", -17)
            .set_bytes("blob", &[0, 1, 2, 255])
            .set_str("text", "héllo ✓ 𝄞")
            .set_bool("flag", true)
            .set_byte("byte", 200);

        let mut decoded = Message::from_bytes(original.as_bytes());
        assert_eq!(decoded.type_name(), "Everything");
        assert_eq!(decoded.id(), 99);
        assert_eq!(decoded.timestamp(), 1234.25);
        assert_eq!(decoded.get_f64("real"), -3.75);
        assert_eq!(decoded.get_i64("long"), 0x1234_5678_9ABC_DEF0);
        assert_eq!(decoded.get_i32("int"), -17);
        assert_eq!(decoded.get_bytes("blob"), vec![0, 1, 2, 255]);
        assert_eq!(decoded.get_string("text"), "héllo ✓ 𝄞");
        assert!(decoded.get_bool("flag"));
        assert_eq!(decoded.get_byte("byte"), 200);
        assert_eq!(decoded.fields().count(), 7);
    }

    #[test]
    fn first_duplicate_wins() {
        let mut message = Message::new("Dup", 1, 0.0);
        message.set_i32("x", 1).set_i32("x", 2);
        assert_eq!(message.get_i32("x"), 1);
        assert_eq!(message.fields().filter(|f| f.name == "x").count(), 2);
    }

    const NAMES: [&str; 8] = ["x", "naïve", "größe", "名前", "ключ", "𝄞clef", "é", ""];

    #[derive(Clone, Debug)]
    enum Value {
        Real(f64),
        Long(i64),
        Int(i32),
        Bytes(Vec<u8>),
    }

    fn random_text(rng: &mut fastrand::Rng) -> String {
        const PIECES: [&str; 6] = ["a", "Z", ".", "é", "名", "𝄞"];
        (0..rng.usize(0..12))
            .map(|_| PIECES[rng.usize(..PIECES.len())])
            .collect()
    }

    #[test]
    fn random_messages_round_trip() {
        let mut rng = fastrand::Rng::with_seed(0x5EED_0001);
        for _ in 0..500 {
            let type_name = random_text(&mut rng);
            let id = rng.u32(..);
            let timestamp = f64::from_bits(rng.u64(..));

            let mut message = Message::new(&type_name, id, timestamp);
            let mut written = Vec::new();
            for _ in 0..rng.usize(0..16) {
                let name = NAMES[rng.usize(..NAMES.len())];
                let value = match rng.u8(0..4) {
                    0 => Value::Real(f64::from_bits(rng.u64(..))),
                    1 => Value::Long(rng.i64(..)),
                    2 => Value::Int(rng.i32(..)),
                    _ => Value::Bytes((0..rng.usize(0..40)).map(|_| rng.u8(..)).collect()),
                };
                match &value {
                    Value::Real(v) => message.set_f64(name, *v),
                    Value::Long(v) => message.set_i64(name, *v),
                    Value::Int(v) => message.set_i32(name, *v),
                    Value::Bytes(v) => message.set_bytes(name, v),
                };
                written.push((name, value));
            }

            let mut decoded = Message::from_bytes(message.as_bytes());
            assert_eq!(decoded.type_name(), type_name);
            assert_eq!(decoded.id(), id);
            assert_eq!(decoded.timestamp().to_bits(), timestamp.to_bits());
            assert_eq!(decoded.as_bytes(), message.as_bytes());

            // wire order and payloads
            let fields: Vec<FieldView<'_>> = decoded.fields().collect();
            assert_eq!(fields.len(), written.len());
            for (field, (name, value)) in fields.iter().zip(&written) {
                assert_eq!(field.name, *name);
                let (tag, payload) = match value {
                    Value::Real(v) => (FieldTag::Real64, v.to_bits().to_be_bytes().to_vec()),
                    Value::Long(v) => (FieldTag::Int64, v.to_be_bytes().to_vec()),
                    Value::Int(v) => (FieldTag::Int32, v.to_be_bytes().to_vec()),
                    Value::Bytes(v) => (FieldTag::Bytes, v.clone()),
                };
                assert_eq!(field.tag, tag.as_byte());
                assert_eq!(field.payload, &payload[..]);
            }
            drop(fields);

            // lookups see the first field written under each name
            for name in NAMES {
                let first = written.iter().find(|(n, _)| *n == name).map(|(_, v)| v.clone());
                match first {
                    None => {
                        assert!(!decoded.contains(name));
                        assert!(decoded.get_bytes(name).is_empty());
                    }
                    Some(Value::Real(v)) => {
                        assert_eq!(decoded.get_f64(name).to_bits(), v.to_bits())
                    }
                    Some(Value::Long(v)) => assert_eq!(decoded.get_i64(name), v),
                    Some(Value::Int(v)) => assert_eq!(decoded.get_i32(name), v),
                    Some(Value::Bytes(v)) => assert_eq!(decoded.get_bytes(name), v),
                }
            }
        }
    }

    #[test]
    fn numeric_accessors_coerce_across_tags() {
        let mut message = Message::new("Coerce", 1, 0.0);
        message
            .set_f64("real", 9.99)
            .set_i64("big", 0x1_0000_0005)
            .set_i32("int", 300)
            .set_str("word", "A");
        assert_eq!(message.get_i32("real"), 9);
        assert_eq!(message.get_i64("real"), 9);
        assert_eq!(message.get_i32("big"), 5);
        assert_eq!(message.get_f64("int"), 300.0);
        assert_eq!(message.get_byte("int"), 44);
        assert_eq!(message.get_i32("word"), b'A' as i32);
        assert_eq!(message.get_string("int"), "300");
        assert_eq!(message.get_string("big"), (0x1_0000_0005i64).to_string());
        assert_eq!(message.get_string("real"), "9.99");
    }

    #[test]
    fn empty_payload_reads_as_zero_everywhere() {
        let mut message = Message::new("Empty", 1, 0.0);
        message.set_bytes("nothing", &[]);
        assert!(message.contains("nothing"));
        assert_eq!(message.get_i32("nothing"), 0);
        assert_eq!(message.get_i64("nothing"), 0);
        assert_eq!(message.get_f64("nothing"), 0.0);
        assert!(!message.get_bool("nothing"));
        assert_eq!(message.get_string("nothing"), "");
        assert!(message.get_bytes("nothing").is_empty());
    }

    #[test]
    fn missing_fields_use_defaults() {
        let mut message = Message::new("Absent", 1, 0.0);
        message.set_i32("present", 1);
        assert!(!message.contains("absent"));
        assert_eq!(message.get_i32("absent"), 0);
        assert_eq!(message.get_i64("absent"), 0);
        assert_eq!(message.get_f64("absent"), 0.0);
        assert_eq!(message.get_byte("absent"), 0);
        assert!(message.get_bytes("absent").is_empty());
        let mut buf = [9u8; 4];
        assert_eq!(message.get_bytes_into("absent", &mut buf), 0);
    }

    #[test]
    fn bytes_into_truncates_to_buffer() {
        let mut message = Message::new("Blob", 1, 0.0);
        message.set_bytes("data", &[1, 2, 3, 4, 5]);
        let mut small = [0u8; 3];
        assert_eq!(message.get_bytes_into("data", &mut small), 3);
        assert_eq!(small, [1, 2, 3]);
    }

    #[test]
    fn utf16_input_is_stored_as_utf8() {
        let units: Vec<u16> = "naïve 𝄞".encode_utf16().collect();
        let mut message = Message::new("Text", 1, 0.0);
        message.set_utf16("s", &units);
        assert_eq!(message.get_string("s"), "naïve 𝄞");

        message.set_utf16("broken", &[b'a' as u16, 0xDC00, b'b' as u16]);
        assert_eq!(message.get_string("broken"), "ab");
    }

    #[test]
    fn truncated_message_does_not_panic() {
        let mut original = Message::new("Cut", 3, 0.0);
        original.set_i32("a", 1).set_str("b", "long enough text");
        let bytes = original.as_bytes();
        for cut in 0..bytes.len() {
            let mut partial = Message::from_bytes(&bytes[..cut]);
            let _ = partial.get_i32("a");
            let _ = partial.get_string("b");
            let _ = partial.fields().count();
        }
    }

    #[test]
    fn reply_is_addressed_to_request() {
        let mut request = Message::new("Query", 41, 0.0);
        assert!(request.existing_reply().is_none());
        request.reply().set_i32("answer", 42);
        let reply = request.existing_reply().unwrap();
        assert!(reply.is_reply());
        assert_eq!(reply.id(), 41);

        let mut decoded = Message::from_bytes(reply.as_bytes());
        assert_eq!(decoded.type_name(), "");
        assert_eq!(decoded.get_i32("answer"), 42);

        // a second call returns the same reply
        request.reply().set_i32("more", 1);
        assert_eq!(request.existing_reply().unwrap().fields().count(), 2);
    }

    #[test]
    fn sent_messages_ignore_writes() {
        let mut message = Message::new("Done", 1, 0.0);
        message.set_i32("a", 1);
        message.mark_sent();
        let before = message.len();
        message.set_i32("b", 2);
        assert_eq!(message.len(), before);
        assert!(!message.contains("b"));
    }

    #[test]
    fn hex_dump_shows_bytes_and_ascii() {
        let message = Message::new("A", 1, 0.0);
        let dump = message.hex_dump();
        let mut lines = dump.lines();
        assert!(lines.next().unwrap().starts_with("00 00 00 01 41"));
        assert!(lines.next().unwrap().contains('A'));
    }
}
