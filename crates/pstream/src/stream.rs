use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use pstream_channel::{ByteChannel, ChannelError};
use tracing::trace;

use crate::error::{byte_repr, StreamError, StreamResult};
use crate::mode::{CompressionMode, Mode};

/// Typed dual-format stream over a byte channel.
///
/// A `TypedStream` unifies text and binary serialization behind one typed
/// interface. It owns the per-direction format modes, the float
/// compression policy, and the per-direction alias maps that make shared
/// and cyclic pointer graphs serialize correctly. Values move through it
/// via the [`Streamable`](crate::Streamable) trait; the stream itself
/// only provides raw byte primitives and the lexical utilities the text
/// grammar needs.
///
/// All I/O is blocking and single-threaded. A stream is not reentrant:
/// the alias maps and mode flags are unguarded mutable state, so
/// concurrent use of one instance requires external mutual exclusion.
///
/// Alias maps are never cleared implicitly between values. A caller
/// writing several independent top-level values to one persistent channel
/// must call [`reset_aliases`](Self::reset_aliases) between them unless
/// continued aliasing across those values is intended.
pub struct TypedStream<C: ByteChannel> {
    channel: C,
    inmode: Mode,
    outmode: Mode,
    compression: CompressionMode,
    /// LIFO pushback for peek/unget; drained before the channel.
    pushback: Vec<u8>,
    /// Net bytes consumed from the input direction, for error reporting.
    read_offset: u64,
    copies_out: HashMap<usize, u32>,
    copies_in: HashMap<u32, Rc<dyn Any>>,
}

impl<C: ByteChannel> TypedStream<C> {
    /// Stream over `channel` with both directions in tagged text mode.
    pub fn new(channel: C) -> Self {
        Self::with_modes(channel, Mode::Ascii, Mode::Ascii)
    }

    pub fn with_modes(channel: C, inmode: Mode, outmode: Mode) -> Self {
        Self {
            channel,
            inmode,
            outmode,
            compression: CompressionMode::None,
            pushback: Vec::new(),
            read_offset: 0,
            copies_out: HashMap::new(),
            copies_in: HashMap::new(),
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Consume the stream, returning its channel.
    pub fn into_inner(self) -> C {
        self.channel
    }

    /// Swap in a new channel, returning the old one.
    ///
    /// Alias maps, pushback and the byte offset all reset: a new channel
    /// is a new session.
    pub fn rebind(&mut self, channel: C) -> C {
        self.reset_aliases();
        self.pushback.clear();
        self.read_offset = 0;
        std::mem::replace(&mut self.channel, channel)
    }

    /// Forget every pointer identity seen so far, in both directions.
    ///
    /// Ends the current aliasing session: the next pointer written gets a
    /// fresh definition even if it was already serialized, and pending
    /// back-reference ids from before the reset can no longer resolve.
    pub fn reset_aliases(&mut self) {
        trace!(
            write_ids = self.copies_out.len(),
            read_ids = self.copies_in.len(),
            "resetting alias maps"
        );
        self.copies_out.clear();
        self.copies_in.clear();
    }

    pub fn input_mode(&self) -> Mode {
        self.inmode
    }

    pub fn output_mode(&self) -> Mode {
        self.outmode
    }

    pub fn set_input_mode(&mut self, mode: Mode) {
        self.inmode = mode;
    }

    pub fn set_output_mode(&mut self, mode: Mode) {
        self.outmode = mode;
    }

    /// Set both directions at once.
    pub fn set_mode(&mut self, mode: Mode) {
        self.inmode = mode;
        self.outmode = mode;
    }

    pub fn compression(&self) -> CompressionMode {
        self.compression
    }

    pub fn set_compression(&mut self, compression: CompressionMode) {
        self.compression = compression;
    }

    /// Run `f` with the output mode temporarily set to `mode`.
    pub fn with_output_mode<R>(
        &mut self,
        mode: Mode,
        f: impl FnOnce(&mut Self) -> StreamResult<R>,
    ) -> StreamResult<R> {
        let prev = self.outmode;
        self.outmode = mode;
        let result = f(self);
        self.outmode = prev;
        result
    }

    /// Run `f` with the input mode temporarily set to `mode`.
    pub fn with_input_mode<R>(
        &mut self,
        mode: Mode,
        f: impl FnOnce(&mut Self) -> StreamResult<R>,
    ) -> StreamResult<R> {
        let prev = self.inmode;
        self.inmode = mode;
        let result = f(self);
        self.inmode = prev;
        result
    }

    /// Net bytes consumed from the input direction so far.
    pub fn offset(&self) -> u64 {
        self.read_offset
    }

    // ---- raw byte primitives -------------------------------------------

    /// Consume one byte; `None` at end of stream.
    pub fn get(&mut self) -> StreamResult<Option<u8>> {
        if let Some(b) = self.pushback.pop() {
            self.read_offset += 1;
            return Ok(Some(b));
        }
        let mut byte = [0u8; 1];
        let n = self.channel.read(&mut byte)?;
        if n == 0 {
            Ok(None)
        } else {
            self.read_offset += 1;
            Ok(Some(byte[0]))
        }
    }

    /// Consume one byte, failing at end of stream.
    pub fn get_some(&mut self, context: &str) -> StreamResult<u8> {
        match self.get()? {
            Some(b) => Ok(b),
            None => Err(self.eof_error(context)),
        }
    }

    /// Look at the next byte without consuming it.
    pub fn peek(&mut self) -> StreamResult<Option<u8>> {
        if let Some(&b) = self.pushback.last() {
            return Ok(Some(b));
        }
        match self.get()? {
            Some(b) => {
                self.unget(b);
                Ok(Some(b))
            }
            None => Ok(None),
        }
    }

    /// Push a byte back; the next `get` returns it.
    pub fn unget(&mut self, byte: u8) {
        self.pushback.push(byte);
        self.read_offset = self.read_offset.saturating_sub(1);
    }

    /// Fill `buf` completely, failing if the stream ends first.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> StreamResult<()> {
        let mut filled = 0;
        while filled < buf.len() {
            if let Some(b) = self.pushback.pop() {
                buf[filled] = b;
                filled += 1;
                self.read_offset += 1;
                continue;
            }
            let n = self.channel.read(&mut buf[filled..])?;
            if n == 0 {
                let context = format!("{} raw bytes", buf.len());
                return Err(self.eof_error(&context));
            }
            filled += n;
            self.read_offset += n as u64;
        }
        Ok(())
    }

    pub fn put(&mut self, byte: u8) -> StreamResult<()> {
        self.write_all(&[byte])
    }

    pub fn write_all(&mut self, mut bytes: &[u8]) -> StreamResult<()> {
        while !bytes.is_empty() {
            let n = self.channel.write(bytes)?;
            if n == 0 {
                return Err(StreamError::Channel(ChannelError::Io {
                    name: self.channel.name(),
                    source: std::io::ErrorKind::WriteZero.into(),
                }));
            }
            bytes = &bytes[n..];
        }
        Ok(())
    }

    pub fn write_str(&mut self, s: &str) -> StreamResult<()> {
        self.write_all(s.as_bytes())
    }

    pub fn flush(&mut self) -> StreamResult<()> {
        self.channel.flush()?;
        Ok(())
    }

    // ---- lexical utilities ---------------------------------------------

    /// Consume through the next newline (inclusive).
    pub fn skip_rest_of_line(&mut self) -> StreamResult<()> {
        while let Some(b) = self.get()? {
            if b == b'\n' {
                break;
            }
        }
        Ok(())
    }

    /// Skip spaces, tabs, newlines.
    pub fn skip_blanks(&mut self) -> StreamResult<()> {
        while let Some(b) = self.peek()? {
            if !is_blank(b) {
                break;
            }
            self.get()?;
        }
        Ok(())
    }

    /// Skip blanks and `#`-led line comments.
    pub fn skip_blanks_and_comments(&mut self) -> StreamResult<()> {
        while let Some(b) = self.peek()? {
            if is_blank(b) {
                self.get()?;
            } else if b == b'#' {
                self.skip_rest_of_line()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Skip blanks, comments, and the `,` / `;` element separators.
    pub fn skip_blanks_comments_separators(&mut self) -> StreamResult<()> {
        while let Some(b) = self.peek()? {
            if is_blank(b) || b == b',' || b == b';' {
                self.get()?;
            } else if b == b'#' {
                self.skip_rest_of_line()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Skip every occurrence of the given bytes.
    pub fn skip_all(&mut self, bytes_to_skip: &[u8]) -> StreamResult<()> {
        while let Some(b) = self.peek()? {
            if !bytes_to_skip.contains(&b) {
                break;
            }
            self.get()?;
        }
        Ok(())
    }

    /// Consume bytes into `out` until one of `stops` is next or the
    /// stream ends. The stopping byte is left unconsumed and returned
    /// when one was found.
    pub fn read_until(&mut self, stops: &[u8], out: &mut Vec<u8>) -> StreamResult<Option<u8>> {
        while let Some(b) = self.peek()? {
            if stops.contains(&b) {
                return Ok(Some(b));
            }
            self.get()?;
            out.push(b);
        }
        Ok(None)
    }

    /// Consume bytes into `out` until one of `closers` appears at the
    /// current nesting level.
    ///
    /// Parentheses, brackets, braces and double quotes opened along the
    /// way must close before a closer counts, so a closer belonging to an
    /// inner scope never terminates the scan. The closing byte is
    /// consumed and returned, not appended.
    pub fn smart_read_until(&mut self, closers: &[u8], out: &mut Vec<u8>) -> StreamResult<u8> {
        loop {
            let b = self.get_some("a balanced expression")?;
            if closers.contains(&b) {
                return Ok(b);
            }
            out.push(b);
            match b {
                b'(' => {
                    let closer = self.smart_read_until(&[b')'], out)?;
                    out.push(closer);
                }
                b'[' => {
                    let closer = self.smart_read_until(&[b']'], out)?;
                    out.push(closer);
                }
                b'{' => {
                    let closer = self.smart_read_until(&[b'}'], out)?;
                    out.push(closer);
                }
                b'"' => self.read_quoted_tail(out)?,
                _ => {}
            }
        }
    }

    /// Consume up to and including an unescaped closing quote, appending
    /// everything (closing quote included) to `out`.
    fn read_quoted_tail(&mut self, out: &mut Vec<u8>) -> StreamResult<()> {
        loop {
            let b = self.get_some("a closing '\"'")?;
            out.push(b);
            match b {
                b'"' => return Ok(()),
                b'\\' => {
                    let escaped = self.get_some("an escaped character")?;
                    out.push(escaped);
                }
                _ => {}
            }
        }
    }

    /// Consume one byte and require it to be `expected`; `what` names the
    /// token for the error message.
    pub fn expect_byte(&mut self, expected: u8, what: &str) -> StreamResult<()> {
        let b = self.get_some(what)?;
        if b != expected {
            return Err(self.unexpected(what, b));
        }
        Ok(())
    }

    // ---- alias maps ----------------------------------------------------

    /// Id previously assigned to the object identity `key` on the write
    /// side, if any.
    pub fn write_alias(&self, key: usize) -> Option<u32> {
        self.copies_out.get(&key).copied()
    }

    /// Assign the next id to a fresh object identity on the write side.
    ///
    /// Must be called before serializing the pointee: a cycle back to the
    /// same object then resolves as a back-reference instead of recursing
    /// forever.
    pub fn register_write_alias(&mut self, key: usize) -> u32 {
        let id = self.copies_out.len() as u32 + 1;
        self.copies_out.insert(key, id);
        id
    }

    /// Register a freshly materialized object under `id` on the read
    /// side.
    ///
    /// Must be called before decoding the object's contents, so a cycle
    /// back to `id` resolves to the object being built.
    pub fn register_read_alias(&mut self, id: u32, object: Rc<dyn Any>) {
        self.copies_in.insert(id, object);
    }

    /// Resolve a back-reference on the read side.
    pub fn read_alias<T: 'static>(&self, id: u32) -> StreamResult<Rc<RefCell<T>>> {
        let entry = self
            .copies_in
            .get(&id)
            .ok_or(StreamError::UnresolvedAlias { id })?;
        entry
            .clone()
            .downcast::<RefCell<T>>()
            .map_err(|_| StreamError::AliasTypeMismatch { id })
    }

    // ---- error constructors --------------------------------------------

    pub fn unexpected(&self, expected: impl Into<String>, found: u8) -> StreamError {
        StreamError::UnexpectedByte {
            expected: expected.into(),
            found: byte_repr(found),
            offset: self.read_offset,
        }
    }

    pub fn eof_error(&self, context: impl Into<String>) -> StreamError {
        StreamError::UnexpectedEof {
            context: context.into(),
            offset: self.read_offset,
        }
    }
}

fn is_blank(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pstream_channel::MemChannel;

    fn reader(text: &str) -> TypedStream<MemChannel> {
        TypedStream::new(MemChannel::from_bytes(text.as_bytes()))
    }

    #[test]
    fn peek_does_not_consume() {
        let mut s = reader("ab");
        assert_eq!(s.peek().unwrap(), Some(b'a'));
        assert_eq!(s.get().unwrap(), Some(b'a'));
        assert_eq!(s.get().unwrap(), Some(b'b'));
        assert_eq!(s.get().unwrap(), None);
    }

    #[test]
    fn unget_rewinds_one_byte() {
        let mut s = reader("xy");
        let b = s.get().unwrap().unwrap();
        s.unget(b);
        assert_eq!(s.get().unwrap(), Some(b'x'));
    }

    #[test]
    fn offset_tracks_consumed_bytes() {
        let mut s = reader("abcd");
        s.get().unwrap();
        s.get().unwrap();
        assert_eq!(s.offset(), 2);
        s.unget(b'b');
        assert_eq!(s.offset(), 1);
    }

    #[test]
    fn skip_blanks_and_comments_eats_comment_lines() {
        let mut s = reader("  # a comment\n\t# another\n  7");
        s.skip_blanks_and_comments().unwrap();
        assert_eq!(s.get().unwrap(), Some(b'7'));
    }

    #[test]
    fn skip_separators_eats_commas_and_semicolons() {
        let mut s = reader(", ;\n ,x");
        s.skip_blanks_comments_separators().unwrap();
        assert_eq!(s.get().unwrap(), Some(b'x'));
    }

    #[test]
    fn read_until_stops_before_the_stop_byte() {
        let mut s = reader("abc]d");
        let mut out = Vec::new();
        let stop = s.read_until(&[b']'], &mut out).unwrap();
        assert_eq!(stop, Some(b']'));
        assert_eq!(out, b"abc");
        assert_eq!(s.get().unwrap(), Some(b']'));
    }

    #[test]
    fn smart_read_until_respects_nesting() {
        let mut s = reader("a [ b ] c ; rest");
        let mut out = Vec::new();
        let closer = s.smart_read_until(&[b';'], &mut out).unwrap();
        assert_eq!(closer, b';');
        assert_eq!(out, b"a [ b ] c ");
    }

    #[test]
    fn smart_read_until_ignores_closers_inside_quotes() {
        let mut s = reader(r#"x "a;b" y;z"#);
        let mut out = Vec::new();
        let closer = s.smart_read_until(&[b';'], &mut out).unwrap();
        assert_eq!(closer, b';');
        assert_eq!(out, br#"x "a;b" y"#);
    }

    #[test]
    fn with_output_mode_restores_previous_mode() {
        let mut s = TypedStream::new(MemChannel::new());
        s.set_output_mode(Mode::RawAscii);
        s.with_output_mode(Mode::Binary, |s| {
            assert_eq!(s.output_mode(), Mode::Binary);
            Ok(())
        })
        .unwrap();
        assert_eq!(s.output_mode(), Mode::RawAscii);
    }

    #[test]
    fn rebind_clears_alias_state() {
        let mut s = TypedStream::new(MemChannel::new());
        s.register_write_alias(0xdead);
        assert_eq!(s.write_alias(0xdead), Some(1));
        s.rebind(MemChannel::new());
        assert_eq!(s.write_alias(0xdead), None);
        assert_eq!(s.register_write_alias(0xbeef), 1);
    }

    #[test]
    fn unresolved_alias_lookup_fails() {
        let s = TypedStream::new(MemChannel::new());
        let err = s.read_alias::<i32>(5).unwrap_err();
        assert!(matches!(err, StreamError::UnresolvedAlias { id: 5 }));
    }
}
