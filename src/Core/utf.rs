// Incremental UTF-8 <-> UTF-16 state machines.
//
// Both sides are fed one unit at a time so the message reader can push bytes
// straight off its cursor without staging them in a temporary buffer.

use super::ByteList::ByteList;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

const REPLACEMENT_UNIT: u16 = 0;

/// Polynomial rolling hash step (`hash * 31 + unit`) with wrapping 32-bit
/// arithmetic.
#[inline]
pub fn hash_step(hash: i32, unit: u16) -> i32 {
    (hash << 5).wrapping_sub(hash).wrapping_add(unit as i32)
}

/// Rolling hash of a `&str` over its UTF-16 units. Matches
/// [`ComparableString::hash_code`] for equal text.
pub fn hash_str(text: &str) -> i32 {
    text.encode_utf16().fold(0, hash_step)
}

/// UTF-16 string builder fed by a byte-at-a-time UTF-8 decoder.
///
/// Keeps a running hash so it can be compared against interned strings
/// without materializing a `String`.
#[derive(Clone)]
pub struct ComparableString {
    units: Vec<u16>,
    hash: i32,
    code_point: u32,
    continuation_count: u8,
    valid: bool,
}

impl Default for ComparableString {
    fn default() -> Self {
        Self::with_capacity(128)
    }
}

impl ComparableString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            units: Vec::with_capacity(capacity),
            hash: 0,
            code_point: 0,
            continuation_count: 0,
            valid: true,
        }
    }

    /// Builds an instance from already-valid text.
    pub fn from_text(text: &str) -> Self {
        let mut result = Self::with_capacity(text.len());
        for unit in text.encode_utf16() {
            result.push_unit(unit);
        }
        result
    }

    /// Decodes a complete UTF-8 byte slice.
    pub fn from_utf8(bytes: &[u8]) -> Self {
        let mut result = Self::with_capacity(bytes.len());
        for &b in bytes {
            result.write_utf8_byte(b);
        }
        result.finish();
        result
    }

    pub fn clear(&mut self) -> &mut Self {
        self.units.clear();
        self.hash = 0;
        self.code_point = 0;
        self.continuation_count = 0;
        self.valid = true;
        self
    }

    pub fn reserve(&mut self, additional: usize) -> &mut Self {
        self.units.reserve(additional);
        self
    }

    /// Number of UTF-16 units.
    #[inline]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    #[inline]
    pub fn units(&self) -> &[u16] {
        &self.units
    }

    #[inline]
    pub fn hash_code(&self) -> i32 {
        self.hash
    }

    /// False once any malformed input has been seen since the last `clear`.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// True while a multi-byte sequence is still waiting for continuation bytes.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.continuation_count > 0
    }

    /// Feeds one UTF-8 byte.
    pub fn write_utf8_byte(&mut self, value: u8) {
        if self.continuation_count == 0 {
            if value & 0xC0 == 0x80 {
                // stray continuation byte
                self.valid = false;
            } else if value < 0x80 {
                self.write_code_point(value as u32);
            } else if value & 0xE0 == 0xC0 {
                self.code_point = (value & 0x1F) as u32;
                self.continuation_count = 1;
            } else if value & 0xF0 == 0xE0 {
                self.code_point = (value & 0x0F) as u32;
                self.continuation_count = 2;
            } else if value & 0xF8 == 0xF0 {
                self.code_point = (value & 0x07) as u32;
                self.continuation_count = 3;
            } else {
                self.valid = false;
            }
        } else {
            if value & 0xC0 != 0x80 {
                self.valid = false;
            } else {
                self.code_point = (self.code_point << 6) | (value & 0x3F) as u32;
            }
            self.continuation_count -= 1;
            if self.continuation_count == 0 {
                self.write_code_point(self.code_point);
            }
        }
    }

    /// Ends the current byte stream. A sequence cut short marks the string
    /// invalid and is dropped.
    pub fn finish(&mut self) {
        if self.continuation_count > 0 {
            self.valid = false;
            self.continuation_count = 0;
            self.code_point = 0;
        }
    }

    /// Appends one code point, splitting it into a surrogate pair above
    /// `0xFFFF`. Surrogates and out-of-range values are written as unit 0.
    pub fn write_code_point(&mut self, code: u32) {
        match code {
            0..=0xD7FF | 0xE000..=0xFFFF => self.push_unit(code as u16),
            0xD800..=0xDFFF => {
                self.valid = false;
                self.push_unit(REPLACEMENT_UNIT);
            }
            0x1_0000..=0x10_FFFF => {
                let offset = code - 0x1_0000;
                self.push_unit((0xD800 + (offset >> 10)) as u16);
                self.push_unit((0xDC00 + (offset & 0x3FF)) as u16);
            }
            _ => {
                self.valid = false;
                self.push_unit(REPLACEMENT_UNIT);
            }
        }
    }

    #[inline]
    fn push_unit(&mut self, unit: u16) {
        self.units.push(unit);
        self.hash = hash_step(self.hash, unit);
    }

    /// Copies `start..end` (in UTF-16 units) into a new, independently hashed
    /// instance. The range is clamped to the current length.
    pub fn sub_range(&self, start: usize, end: usize) -> ComparableString {
        let end = end.min(self.units.len());
        let start = start.min(end);
        let mut result = Self::with_capacity(end - start);
        for &unit in &self.units[start..end] {
            result.push_unit(unit);
        }
        result
    }

    /// Unit-wise equality against `other`.
    pub fn eq_str(&self, other: &str) -> bool {
        let mut count = 0;
        for unit in other.encode_utf16() {
            match self.units.get(count) {
                Some(&mine) if mine == unit => count += 1,
                _ => return false,
            }
        }
        count == self.units.len()
    }

    /// Lexicographic comparison by UTF-16 unit; a proper prefix sorts first.
    pub fn cmp_str(&self, other: &str) -> Ordering {
        self.units.iter().copied().cmp(other.encode_utf16())
    }
}

impl PartialEq for ComparableString {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.units == other.units
    }
}

impl Eq for ComparableString {}

impl PartialEq<str> for ComparableString {
    fn eq(&self, other: &str) -> bool {
        self.eq_str(other)
    }
}

impl PartialEq<&str> for ComparableString {
    fn eq(&self, other: &&str) -> bool {
        self.eq_str(other)
    }
}

impl PartialOrd for ComparableString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComparableString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.units.cmp(&other.units)
    }
}

impl Hash for ComparableString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i32(self.hash);
    }
}

impl fmt::Display for ComparableString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in char::decode_utf16(self.units.iter().copied()) {
            write!(f, "{}", ch.unwrap_or(char::REPLACEMENT_CHARACTER))?;
        }
        Ok(())
    }
}

impl fmt::Debug for ComparableString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComparableString")
            .field("text", &self.to_string())
            .field("hash", &self.hash)
            .field("valid", &self.valid)
            .finish()
    }
}

/// UTF-16 unit to UTF-8 byte encoder.
#[derive(Debug, Clone)]
pub struct Utf8Encoder {
    utf8: ByteList,
    high_surrogate: u32,
    pending: bool,
    valid: bool,
}

impl Default for Utf8Encoder {
    fn default() -> Self {
        Self::with_capacity(128)
    }
}

impl Utf8Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            utf8: ByteList::with_capacity(capacity),
            high_surrogate: 0,
            pending: false,
            valid: true,
        }
    }

    pub fn clear(&mut self) -> &mut Self {
        self.utf8.clear();
        self.high_surrogate = 0;
        self.pending = false;
        self.valid = true;
        self
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.utf8.as_slice()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.utf8.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.utf8.is_empty()
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn write_str(&mut self, text: &str) -> &mut Self {
        for unit in text.encode_utf16() {
            self.write_utf16_unit(unit);
        }
        self
    }

    /// Feeds one UTF-16 unit. A low surrogate without a preceding high one,
    /// or a high surrogate not followed by a low one, marks the output
    /// invalid and is dropped.
    pub fn write_utf16_unit(&mut self, unit: u16) {
        let value = unit as u32;
        if !self.pending {
            match value & 0xFC00 {
                0xD800 => {
                    self.high_surrogate = (value - 0xD800) << 10;
                    self.pending = true;
                }
                0xDC00 => self.valid = false,
                _ => self.write_code_point(value),
            }
        } else {
            if value & 0xFC00 != 0xDC00 {
                self.valid = false;
            } else {
                let code = (self.high_surrogate | (value - 0xDC00)) + 0x1_0000;
                self.write_code_point(code);
            }
            self.pending = false;
        }
    }

    /// Flags a trailing unpaired high surrogate.
    pub fn finish(&mut self) {
        if self.pending {
            self.valid = false;
            self.pending = false;
        }
    }

    /// Encodes one code point using the 1/2/3/4-byte forms by range.
    pub fn write_code_point(&mut self, value: u32) {
        if value <= 0x7F {
            self.utf8.push(value as u8);
        } else if value <= 0x7FF {
            self.utf8
                .push(0xC0 | ((value >> 6) & 0x1F) as u8)
                .push(0x80 | (value & 0x3F) as u8);
        } else if value <= 0xFFFF {
            self.utf8
                .push(0xE0 | ((value >> 12) & 0x0F) as u8)
                .push(0x80 | ((value >> 6) & 0x3F) as u8)
                .push(0x80 | (value & 0x3F) as u8);
        } else {
            self.utf8
                .push(0xF0 | ((value >> 18) & 0x07) as u8)
                .push(0x80 | ((value >> 12) & 0x3F) as u8)
                .push(0x80 | ((value >> 6) & 0x3F) as u8)
                .push(0x80 | (value & 0x3F) as u8);
        }
    }
}
