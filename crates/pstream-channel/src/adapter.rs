use std::io::{Read, Write};

use crate::channel::ByteChannel;
use crate::error::{ChannelError, ChannelResult};

/// Read-only channel over any `std::io::Read` value.
pub struct ReadChannel<R> {
    inner: R,
    name: String,
}

impl<R: Read> ReadChannel<R> {
    pub fn new(inner: R, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteChannel for ReadChannel<R> {
    fn read(&mut self, buf: &mut [u8]) -> ChannelResult<usize> {
        self.inner.read(buf).map_err(|source| ChannelError::Io {
            name: self.name.clone(),
            source,
        })
    }

    fn write(&mut self, _buf: &[u8]) -> ChannelResult<usize> {
        Err(ChannelError::NotWritable {
            name: self.name.clone(),
        })
    }

    fn flush(&mut self) -> ChannelResult<()> {
        Ok(())
    }

    fn is_readable(&self) -> bool {
        true
    }

    fn is_writable(&self) -> bool {
        false
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Write-only channel over any `std::io::Write` value.
pub struct WriteChannel<W> {
    inner: W,
    name: String,
}

impl<W: Write> WriteChannel<W> {
    pub fn new(inner: W, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ByteChannel for WriteChannel<W> {
    fn read(&mut self, _buf: &mut [u8]) -> ChannelResult<usize> {
        Err(ChannelError::NotReadable {
            name: self.name.clone(),
        })
    }

    fn write(&mut self, buf: &[u8]) -> ChannelResult<usize> {
        self.inner.write(buf).map_err(|source| ChannelError::Io {
            name: self.name.clone(),
            source,
        })
    }

    fn flush(&mut self) -> ChannelResult<()> {
        self.inner.flush().map_err(|source| ChannelError::Io {
            name: self.name.clone(),
            source,
        })
    }

    fn is_readable(&self) -> bool {
        false
    }

    fn is_writable(&self) -> bool {
        true
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Bidirectional channel over any `Read + Write` value, such as a
/// `TcpStream` or `UnixStream`.
pub struct IoChannel<S> {
    inner: S,
    name: String,
}

impl<S: Read + Write> IoChannel<S> {
    pub fn new(inner: S, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Read + Write> ByteChannel for IoChannel<S> {
    fn read(&mut self, buf: &mut [u8]) -> ChannelResult<usize> {
        self.inner.read(buf).map_err(|source| ChannelError::Io {
            name: self.name.clone(),
            source,
        })
    }

    fn write(&mut self, buf: &[u8]) -> ChannelResult<usize> {
        self.inner.write(buf).map_err(|source| ChannelError::Io {
            name: self.name.clone(),
            source,
        })
    }

    fn flush(&mut self) -> ChannelResult<()> {
        self.inner.flush().map_err(|source| ChannelError::Io {
            name: self.name.clone(),
            source,
        })
    }

    fn is_readable(&self) -> bool {
        true
    }

    fn is_writable(&self) -> bool {
        true
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_adapter_wraps_a_slice_reader() {
        let mut ch = ReadChannel::new(&b"xyz"[..], "slice");
        let mut buf = [0u8; 3];
        assert_eq!(ch.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"xyz");
        assert!(matches!(
            ch.write(b"no"),
            Err(ChannelError::NotWritable { .. })
        ));
    }

    #[test]
    fn write_adapter_wraps_a_vec() {
        let mut ch = WriteChannel::new(Vec::new(), "vec");
        ch.write(b"ab").unwrap();
        ch.flush().unwrap();
        assert_eq!(ch.into_inner(), b"ab");
    }
}
