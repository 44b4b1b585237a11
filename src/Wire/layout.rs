// Byte-exact layout of one message and of a message queue.
//
// All integers are big-endian. Real64 travels as the raw bit pattern of its
// Int64 representation.
//
// Queue    := Record*                               (to end of buffer)
// Record   := length:u32 message:byte[length]
// Message  := type_len:u32 type_utf8:byte[type_len]
//             id:i32 timestamp:f64
//             Field*                                (to end of message)
// Field    := name_len:u32 name_utf8:byte[name_len]
//             tag:u8 size:u32 payload:byte[size]

/// Bytes of the `length` prefix in front of every queued message.
pub const RECORD_PREFIX: usize = 4;

/// Header bytes that follow the type name: id (4) + timestamp (8).
pub const HEADER_TAIL: usize = 4 + 8;

/// Bytes a recycled message is allowed to keep allocated.
pub const DEFAULT_RETAINED_CAPACITY: usize = 1024;

/// Type tag of one field payload.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldTag {
    /// `f64` stored as the bit pattern of an `i64`.
    Real64 = 1,
    /// `i64` as high and low 32-bit halves.
    Int64 = 2,
    Int32 = 3,
    /// Raw bytes; strings are UTF-8 bytes under this tag.
    Bytes = 4,
}

impl FieldTag {
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            1 => Some(FieldTag::Real64),
            2 => Some(FieldTag::Int64),
            3 => Some(FieldTag::Int32),
            4 => Some(FieldTag::Bytes),
            _ => None,
        }
    }

    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}
