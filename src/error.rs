use thiserror::Error;

/// Errors surfaced to callers.
///
/// Most protocol-level problems (garbled text, missing fields, unhandled
/// message types, a failed boundary exchange) are absorbed where they happen
/// and never show up here.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("unknown or stale handle {0}")]
    UnknownHandle(u32),

    #[error("index {index} out of range for collection of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("value is already a member of the collection")]
    DuplicateValue,

    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
