use thiserror::Error;

use pstream_channel::ChannelError;

use crate::mode::Mode;

/// Errors raised while encoding or decoding a typed stream.
///
/// Every variant is fatal to the current read or write: this layer
/// performs no recovery or resynchronization, and a partially decoded
/// value must not be used after an error.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("expected {expected}, found {found} at byte offset {offset}")]
    UnexpectedByte {
        expected: String,
        found: String,
        offset: u64,
    },

    #[error("unexpected end of stream while reading {context} at byte offset {offset}")]
    UnexpectedEof { context: String, offset: u64 },

    #[error("malformed number {text:?} at byte offset {offset}")]
    MalformedNumber { text: String, offset: u64 },

    #[error("referenced object *{id} has not been previously defined")]
    UnresolvedAlias { id: u32 },

    #[error("alias *{id} refers to an object of a different type")]
    AliasTypeMismatch { id: u32 },

    #[error("incompatible binary type tag 0x{found:02X}, expected {expected}")]
    TagMismatch { expected: String, found: u8 },

    #[error("element count {actual} does not match fixed size {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("sequence of {len} elements exceeds the u32 count limit")]
    CountOverflow { len: usize },

    #[error("sparse element index {index} out of range for {len} elements")]
    SparseIndexOutOfRange { index: u32, len: usize },

    #[error("mode {mode:?} cannot be used to read {what}")]
    UnreadableMode { mode: Mode, what: &'static str },

    #[error("serialized text is not valid UTF-8")]
    NotUtf8,

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

pub type StreamResult<T> = Result<T, StreamError>;

/// Render a byte for error messages: printable ascii as a character,
/// anything else as hex.
pub(crate) fn byte_repr(b: u8) -> String {
    if (0x20..0x7F).contains(&b) {
        format!("'{}'", b as char)
    } else {
        format!("0x{b:02X}")
    }
}
