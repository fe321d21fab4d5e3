use std::io::SeekFrom;

use crate::error::{ChannelError, ChannelResult};

/// A blocking byte source/sink underneath a typed stream.
///
/// All implementations must satisfy these invariants:
/// - `read` blocks until at least one byte is available or the stream has
///   ended; `Ok(0)` always means end of stream, never "try again".
/// - `write` blocks until at least one byte has been accepted and returns
///   the number of bytes taken, which may be less than `buf.len()`.
/// - A channel closed in one direction reports it through
///   `is_readable`/`is_writable` and fails calls in that direction.
/// - All I/O errors are propagated, never silently ignored.
///
/// Timeouts and cancellation are not modeled here: a stalled peer blocks
/// the caller. Any timeout policy belongs to the concrete channel (for
/// example socket-level timeouts), surfacing as an ordinary I/O error.
pub trait ByteChannel {
    /// Read up to `buf.len()` bytes. `Ok(0)` means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> ChannelResult<usize>;

    /// Write up to `buf.len()` bytes, returning how many were taken.
    fn write(&mut self, buf: &[u8]) -> ChannelResult<usize>;

    /// Push buffered bytes down to the underlying resource.
    fn flush(&mut self) -> ChannelResult<()>;

    /// Whether this channel can serve `read` calls.
    fn is_readable(&self) -> bool;

    /// Whether this channel can serve `write` calls.
    fn is_writable(&self) -> bool;

    /// Short name of the underlying resource, used in error messages.
    fn name(&self) -> String;

    /// Reposition the cursor. Channels without random access refuse.
    fn seek(&mut self, _pos: SeekFrom) -> ChannelResult<u64> {
        Err(ChannelError::SeekUnsupported { name: self.name() })
    }

    /// Current cursor position, for channels that support `seek`.
    fn position(&mut self) -> ChannelResult<u64> {
        self.seek(SeekFrom::Current(0))
    }
}

impl<C: ByteChannel + ?Sized> ByteChannel for &mut C {
    fn read(&mut self, buf: &mut [u8]) -> ChannelResult<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> ChannelResult<usize> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> ChannelResult<()> {
        (**self).flush()
    }

    fn is_readable(&self) -> bool {
        (**self).is_readable()
    }

    fn is_writable(&self) -> bool {
        (**self).is_writable()
    }

    fn name(&self) -> String {
        (**self).name()
    }

    fn seek(&mut self, pos: SeekFrom) -> ChannelResult<u64> {
        (**self).seek(pos)
    }
}

impl<C: ByteChannel + ?Sized> ByteChannel for Box<C> {
    fn read(&mut self, buf: &mut [u8]) -> ChannelResult<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> ChannelResult<usize> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> ChannelResult<()> {
        (**self).flush()
    }

    fn is_readable(&self) -> bool {
        (**self).is_readable()
    }

    fn is_writable(&self) -> bool {
        (**self).is_writable()
    }

    fn name(&self) -> String {
        (**self).name()
    }

    fn seek(&mut self, pos: SeekFrom) -> ChannelResult<u64> {
        (**self).seek(pos)
    }
}
