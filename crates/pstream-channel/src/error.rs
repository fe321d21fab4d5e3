use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by channel construction and raw byte I/O.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("cannot open {path:?}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("I/O error on {name}: {source}")]
    Io { name: String, source: io::Error },

    #[error("channel {name} is not readable")]
    NotReadable { name: String },

    #[error("channel {name} is not writable")]
    NotWritable { name: String },

    #[error("seek is not supported by {name}")]
    SeekUnsupported { name: String },

    #[error("failed to spawn {command:?}: {source}")]
    Spawn { command: String, source: io::Error },

    #[error("failed to wait for child process {command:?}: {source}")]
    Wait { command: String, source: io::Error },
}

pub type ChannelResult<T> = Result<T, ChannelError>;
