//! File and in-memory save/load conveniences.
//!
//! One top-level value per call: the stream is opened fresh, written (or
//! read) once and closed, so alias sessions never leak across files. Any
//! failure aborts the whole call with the resource name and parse
//! location; no partial object is returned.

use std::fs;
use std::path::Path;

use pstream_channel::{ChannelError, FileChannel, MemChannel};
use tracing::debug;

use crate::error::{StreamError, StreamResult};
use crate::mode::Mode;
use crate::stream::TypedStream;
use crate::streamable::Streamable;

/// Write one value to `path` in tagged text form.
///
/// Missing directories along the path are created.
pub fn save<T: Streamable>(path: impl AsRef<Path>, value: &T) -> StreamResult<()> {
    save_with_mode(path, value, Mode::Ascii)
}

/// Write one value to `path` in the given output mode.
pub fn save_with_mode<T: Streamable>(
    path: impl AsRef<Path>,
    value: &T,
    mode: Mode,
) -> StreamResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| {
                StreamError::Channel(ChannelError::Open {
                    path: parent.to_path_buf(),
                    source,
                })
            })?;
        }
    }
    let channel = FileChannel::create(path)?;
    let mut out = TypedStream::with_modes(channel, Mode::Ascii, mode);
    value.write_to(&mut out)?;
    out.flush()?;
    debug!(?path, ?mode, "saved value");
    Ok(())
}

/// Read one value from `path`, auto-detecting the tagged format.
pub fn load<T: Streamable + Default>(path: impl AsRef<Path>) -> StreamResult<T> {
    let mut value = T::default();
    load_into(path, &mut value)?;
    Ok(value)
}

/// Read one value from `path` into an existing object.
pub fn load_into<T: Streamable>(path: impl AsRef<Path>, value: &mut T) -> StreamResult<()> {
    let path = path.as_ref();
    let channel = FileChannel::open(path)?;
    let mut input = TypedStream::new(channel);
    value.read_from(&mut input)?;
    debug!(?path, "loaded value");
    Ok(())
}

/// Serialize one value to bytes in the given output mode.
pub fn write_to_bytes<T: Streamable>(value: &T, mode: Mode) -> StreamResult<Vec<u8>> {
    let mut out = TypedStream::with_modes(MemChannel::new(), Mode::Ascii, mode);
    value.write_to(&mut out)?;
    Ok(out.into_inner().into_bytes())
}

/// Deserialize one value from bytes; tagged formats auto-detect.
pub fn read_from_bytes<T: Streamable + Default>(bytes: &[u8]) -> StreamResult<T> {
    let mut input = TypedStream::new(MemChannel::from_bytes(bytes));
    T::read_new(&mut input)
}

/// Serialize one value to tagged text.
pub fn write_to_string<T: Streamable>(value: &T) -> StreamResult<String> {
    let bytes = write_to_bytes(value, Mode::Ascii)?;
    String::from_utf8(bytes).map_err(|_| StreamError::NotUtf8)
}

/// Deserialize one value from text.
pub fn read_from_string<T: Streamable + Default>(text: &str) -> StreamResult<T> {
    read_from_bytes(text.as_bytes())
}
