//! Byte channels underneath PStream typed streams.
//!
//! A [`ByteChannel`] is the raw transport a typed stream reads from and
//! writes to: a blocking byte source/sink with optional random access.
//! The protocol layer above never touches files, pipes or sockets
//! directly — it sees only this trait.
//!
//! # Channels
//!
//! - [`MemChannel`] — growable in-memory buffer (tests, string encoding)
//! - [`FileChannel`] — owned file handle, read or write mode
//! - [`PipeChannel`] — child process over piped stdin/stdout
//! - [`DuplexChannel`] — pairs an input channel with an output channel
//! - [`ReadChannel`] / [`WriteChannel`] / [`IoChannel`] — adapters over
//!   arbitrary `std::io` values (e.g. TCP streams)
//!
//! # Ownership
//!
//! `&mut C` and `Box<C>` forward the trait, so a stream can either own its
//! channel — closing it on drop — or borrow a caller-supplied one, which
//! stays open after the stream is gone.
//!
//! # Concurrency
//!
//! Everything here is blocking and single-threaded. A read against a
//! stalled peer blocks the caller; timeout policy, if any, lives inside
//! the concrete channel (e.g. socket timeouts) and surfaces as an
//! ordinary I/O error.

pub mod adapter;
pub mod channel;
pub mod duplex;
pub mod error;
pub mod file;
pub mod mem;
pub mod pipe;

pub use adapter::{IoChannel, ReadChannel, WriteChannel};
pub use channel::ByteChannel;
pub use duplex::DuplexChannel;
pub use error::{ChannelError, ChannelResult};
pub use file::FileChannel;
pub use mem::MemChannel;
pub use pipe::PipeChannel;

#[cfg(test)]
mod tests {
    use super::*;

    fn write_all(ch: &mut impl ByteChannel, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let n = ch.write(bytes).unwrap();
            bytes = &bytes[n..];
        }
    }

    #[test]
    fn borrowed_channel_forwards_the_trait() {
        let mut mem = MemChannel::new();
        write_all(&mut (&mut mem), b"shared");
        assert_eq!(mem.bytes(), b"shared");
    }

    #[test]
    fn boxed_channel_forwards_the_trait() {
        let mut boxed: Box<dyn ByteChannel> = Box::new(MemChannel::from_bytes(b"dyn".as_slice()));
        let mut buf = [0u8; 3];
        assert_eq!(boxed.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"dyn");
    }

    #[test]
    fn file_roundtrip_through_duplex() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::write(&src, b"payload").unwrap();

        let mut duplex =
            DuplexChannel::new(FileChannel::open(&src).unwrap(), FileChannel::create(&dst).unwrap());
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4];
        loop {
            let n = duplex.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        write_all(&mut duplex, &buf);
        duplex.flush().unwrap();
        drop(duplex);

        assert_eq!(std::fs::read(&dst).unwrap(), b"payload");
    }
}
