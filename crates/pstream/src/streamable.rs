use pstream_channel::ByteChannel;

use crate::error::StreamResult;
use crate::stream::TypedStream;

/// A value that can pass through a typed stream in every mode.
///
/// This is the collaborator interface of the protocol: a type that wants
/// to persist implements these two methods, decomposing itself into the
/// scalar, container and pointer codecs this crate provides. Pointer
/// fields must go through the alias-tracked pointer codec so that sharing
/// and cycles survive the trip.
///
/// `read_from` decodes into an existing value rather than producing a new
/// one. Raw modes depend on this (a raw sequence fills the container's
/// current length in place, since nothing on the wire says how long it
/// is), and so does the pointer protocol (a definition decodes into the
/// object the target slot already holds, when it holds one).
pub trait Streamable {
    /// Encode `self` in the stream's current output mode.
    fn write_to<C: ByteChannel>(&self, out: &mut TypedStream<C>) -> StreamResult<()>;

    /// Decode from the stream's current input mode, replacing `self`.
    fn read_from<C: ByteChannel>(&mut self, input: &mut TypedStream<C>) -> StreamResult<()>;

    /// Decode a fresh value, starting from `Default`.
    fn read_new<C: ByteChannel>(input: &mut TypedStream<C>) -> StreamResult<Self>
    where
        Self: Default + Sized,
    {
        let mut value = Self::default();
        value.read_from(input)?;
        Ok(value)
    }
}
