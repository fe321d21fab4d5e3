use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::channel::ByteChannel;
use crate::error::{ChannelError, ChannelResult};

/// Channel over an owned file, open for reading or for writing.
///
/// The handle closes when the channel is dropped. Construction failures
/// carry the path; later I/O errors carry it as the channel name.
#[derive(Debug)]
pub struct FileChannel {
    file: File,
    path: PathBuf,
    writable: bool,
}

impl FileChannel {
    /// Open an existing file for reading.
    pub fn open(path: impl AsRef<Path>) -> ChannelResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| ChannelError::Open {
            path: path.clone(),
            source,
        })?;
        debug!(?path, "opened file channel for reading");
        Ok(Self {
            file,
            path,
            writable: false,
        })
    }

    /// Create (or truncate) a file for writing.
    pub fn create(path: impl AsRef<Path>) -> ChannelResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| ChannelError::Open {
            path: path.clone(),
            source,
        })?;
        debug!(?path, "opened file channel for writing");
        Ok(Self {
            file,
            path,
            writable: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> ChannelError {
        ChannelError::Io {
            name: self.name(),
            source,
        }
    }
}

impl ByteChannel for FileChannel {
    fn read(&mut self, buf: &mut [u8]) -> ChannelResult<usize> {
        if self.writable {
            return Err(ChannelError::NotReadable { name: self.name() });
        }
        let result = self.file.read(buf);
        result.map_err(|e| self.io_err(e))
    }

    fn write(&mut self, buf: &[u8]) -> ChannelResult<usize> {
        if !self.writable {
            return Err(ChannelError::NotWritable { name: self.name() });
        }
        let result = self.file.write(buf);
        result.map_err(|e| self.io_err(e))
    }

    fn flush(&mut self) -> ChannelResult<()> {
        let result = self.file.flush();
        result.map_err(|e| self.io_err(e))
    }

    fn is_readable(&self) -> bool {
        !self.writable
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn seek(&mut self, pos: SeekFrom) -> ChannelResult<u64> {
        let result = self.file.seek(pos);
        result.map_err(|e| self.io_err(e))
    }
}
