//! Scalar codec: lossless round-trip of primitive values in every mode.
//!
//! Tagged text writes locale-independent decimal; tagged binary writes a
//! one-byte type tag followed by the native byte pattern. Readers in a
//! tagged mode dispatch on the first non-blank byte — ascii numeric
//! grammar versus a known tag — which is what makes the two tagged modes
//! interchangeable on input. Raw modes are bare passthrough in both
//! directions and never auto-detect.

use std::str::FromStr;

use pstream_channel::ByteChannel;

use crate::error::{StreamError, StreamResult};
use crate::mode::Mode;
use crate::stream::TypedStream;
use crate::streamable::Streamable;
use crate::typecode::{self, Endianness};

/// Bytes that end a bareword or numeric token in tagged text.
pub(crate) fn is_token_end(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'\t'
            | b'\n'
            | b'\r'
            | b','
            | b';'
            | b':'
            | b'#'
            | b'*'
            | b'"'
            | b'['
            | b']'
            | b'{'
            | b'}'
            | b'('
            | b')'
    )
}

/// Start byte of the ascii numeric grammar, including the `nan`/`inf`
/// literals.
pub(crate) fn is_number_start(b: u8) -> bool {
    b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'n' | b'N' | b'i' | b'I')
}

/// Consume one token of the ascii numeric grammar: optional sign, digits,
/// optional fraction, optional exponent — or a `nan`/`inf` word. Stops
/// exactly at the first byte outside the grammar, so `1->` yields `1`.
fn read_number_token<C: ByteChannel>(input: &mut TypedStream<C>) -> StreamResult<String> {
    let mut text = String::new();
    if matches!(input.peek()?, Some(b'+') | Some(b'-')) {
        let sign = input.get_some("a number")?;
        text.push(sign as char);
    }
    if matches!(input.peek()?, Some(b) if b.is_ascii_alphabetic()) {
        while let Some(b) = input.peek()? {
            if !b.is_ascii_alphabetic() {
                break;
            }
            input.get()?;
            text.push(b as char);
        }
        return Ok(text);
    }
    while let Some(b) = input.peek()? {
        if !b.is_ascii_digit() {
            break;
        }
        input.get()?;
        text.push(b as char);
    }
    if input.peek()? == Some(b'.') {
        input.get()?;
        text.push('.');
        while let Some(b) = input.peek()? {
            if !b.is_ascii_digit() {
                break;
            }
            input.get()?;
            text.push(b as char);
        }
    }
    if matches!(input.peek()?, Some(b'e') | Some(b'E')) {
        input.get()?;
        text.push('e');
        if matches!(input.peek()?, Some(b'+') | Some(b'-')) {
            let sign = input.get_some("an exponent")?;
            text.push(sign as char);
        }
        while let Some(b) = input.peek()? {
            if !b.is_ascii_digit() {
                break;
            }
            input.get()?;
            text.push(b as char);
        }
    }
    Ok(text)
}

/// Parse one ascii number at the cursor.
pub(crate) fn parse_number<T: FromStr, C: ByteChannel>(
    input: &mut TypedStream<C>,
) -> StreamResult<T> {
    let offset = input.offset();
    let text = read_number_token(input)?;
    if text.is_empty() {
        return Err(match input.peek()? {
            Some(b) => input.unexpected("a number", b),
            None => input.eof_error("a number"),
        });
    }
    text.parse::<T>()
        .map_err(|_| StreamError::MalformedNumber { text, offset })
}

/// Shortest decimal text that reparses to the identical f32 bit pattern.
pub(crate) fn format_f32(x: f32) -> String {
    if x.is_nan() {
        "nan".to_string()
    } else if x == f32::INFINITY {
        "inf".to_string()
    } else if x == f32::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{x}")
    }
}

/// Shortest decimal text that reparses to the identical f64 bit pattern.
pub(crate) fn format_f64(x: f64) -> String {
    if x.is_nan() {
        "nan".to_string()
    } else if x == f64::INFINITY {
        "inf".to_string()
    } else if x == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{x}")
    }
}

macro_rules! int_streamable {
    ($ty:ty, $size:expr, $le:expr, $be:expr) => {
        impl Streamable for $ty {
            fn write_to<C: ByteChannel>(&self, out: &mut TypedStream<C>) -> StreamResult<()> {
                match out.output_mode() {
                    Mode::RawAscii | Mode::PrettyAscii => out.write_str(&self.to_string()),
                    Mode::Ascii => {
                        out.write_str(&self.to_string())?;
                        out.put(b' ')
                    }
                    Mode::RawBinary => out.write_all(&self.to_ne_bytes()),
                    Mode::Binary => {
                        let tag = match Endianness::host() {
                            Endianness::Little => $le,
                            Endianness::Big => $be,
                        };
                        out.put(tag)?;
                        out.write_all(&self.to_ne_bytes())
                    }
                }
            }

            fn read_from<C: ByteChannel>(
                &mut self,
                input: &mut TypedStream<C>,
            ) -> StreamResult<()> {
                match input.input_mode() {
                    Mode::RawAscii | Mode::PrettyAscii => {
                        input.skip_blanks()?;
                        *self = parse_number(input)?;
                        Ok(())
                    }
                    Mode::RawBinary => {
                        let mut bytes = [0u8; $size];
                        input.read_exact(&mut bytes)?;
                        *self = <$ty>::from_ne_bytes(bytes);
                        Ok(())
                    }
                    Mode::Ascii | Mode::Binary => {
                        input.skip_blanks_and_comments()?;
                        let first = match input.peek()? {
                            Some(b) => b,
                            None => return Err(input.eof_error(stringify!($ty))),
                        };
                        if first == $le || first == $be {
                            input.get()?;
                            let mut bytes = [0u8; $size];
                            input.read_exact(&mut bytes)?;
                            *self = if first == $le {
                                <$ty>::from_le_bytes(bytes)
                            } else {
                                <$ty>::from_be_bytes(bytes)
                            };
                            Ok(())
                        } else if is_number_start(first) {
                            *self = parse_number(input)?;
                            Ok(())
                        } else {
                            Err(input.unexpected(concat!("a ", stringify!($ty), " value"), first))
                        }
                    }
                }
            }
        }
    };
}

int_streamable!(i8, 1, typecode::I8, typecode::I8);
int_streamable!(u8, 1, typecode::U8, typecode::U8);
int_streamable!(i16, 2, typecode::I16_LE, typecode::I16_BE);
int_streamable!(u16, 2, typecode::U16_LE, typecode::U16_BE);
int_streamable!(i32, 4, typecode::I32_LE, typecode::I32_BE);
int_streamable!(u32, 4, typecode::U32_LE, typecode::U32_BE);
int_streamable!(i64, 8, typecode::I64_LE, typecode::I64_BE);
int_streamable!(u64, 8, typecode::U64_LE, typecode::U64_BE);

macro_rules! float_streamable {
    ($ty:ty, $size:expr, $fmt:path, $le:expr, $be:expr,
     $sib:ty, $sib_size:expr, $sib_le:expr, $sib_be:expr) => {
        impl Streamable for $ty {
            fn write_to<C: ByteChannel>(&self, out: &mut TypedStream<C>) -> StreamResult<()> {
                match out.output_mode() {
                    Mode::RawAscii | Mode::PrettyAscii => out.write_str(&$fmt(*self)),
                    Mode::Ascii => {
                        out.write_str(&$fmt(*self))?;
                        out.put(b' ')
                    }
                    Mode::RawBinary => out.write_all(&self.to_ne_bytes()),
                    Mode::Binary => {
                        let tag = match Endianness::host() {
                            Endianness::Little => $le,
                            Endianness::Big => $be,
                        };
                        out.put(tag)?;
                        out.write_all(&self.to_ne_bytes())
                    }
                }
            }

            fn read_from<C: ByteChannel>(
                &mut self,
                input: &mut TypedStream<C>,
            ) -> StreamResult<()> {
                match input.input_mode() {
                    Mode::RawAscii | Mode::PrettyAscii => {
                        input.skip_blanks()?;
                        *self = parse_number(input)?;
                        Ok(())
                    }
                    Mode::RawBinary => {
                        let mut bytes = [0u8; $size];
                        input.read_exact(&mut bytes)?;
                        *self = <$ty>::from_ne_bytes(bytes);
                        Ok(())
                    }
                    Mode::Ascii | Mode::Binary => {
                        input.skip_blanks_and_comments()?;
                        let first = match input.peek()? {
                            Some(b) => b,
                            None => return Err(input.eof_error(stringify!($ty))),
                        };
                        if first == $le || first == $be {
                            input.get()?;
                            let mut bytes = [0u8; $size];
                            input.read_exact(&mut bytes)?;
                            *self = if first == $le {
                                <$ty>::from_le_bytes(bytes)
                            } else {
                                <$ty>::from_be_bytes(bytes)
                            };
                            Ok(())
                        } else if first == $sib_le || first == $sib_be {
                            // The other float width: convert per element.
                            input.get()?;
                            let mut bytes = [0u8; $sib_size];
                            input.read_exact(&mut bytes)?;
                            let sibling = if first == $sib_le {
                                <$sib>::from_le_bytes(bytes)
                            } else {
                                <$sib>::from_be_bytes(bytes)
                            };
                            *self = sibling as $ty;
                            Ok(())
                        } else if is_number_start(first) {
                            *self = parse_number(input)?;
                            Ok(())
                        } else {
                            Err(input.unexpected(concat!("a ", stringify!($ty), " value"), first))
                        }
                    }
                }
            }
        }
    };
}

float_streamable!(
    f32, 4, format_f32, typecode::F32_LE, typecode::F32_BE,
    f64, 8, typecode::F64_LE, typecode::F64_BE
);
float_streamable!(
    f64, 8, format_f64, typecode::F64_LE, typecode::F64_BE,
    f32, 4, typecode::F32_LE, typecode::F32_BE
);

impl Streamable for bool {
    fn write_to<C: ByteChannel>(&self, out: &mut TypedStream<C>) -> StreamResult<()> {
        let digit = if *self { b'1' } else { b'0' };
        match out.output_mode() {
            Mode::RawBinary => out.put(*self as u8),
            Mode::Ascii => {
                out.put(digit)?;
                out.put(b' ')
            }
            Mode::Binary | Mode::RawAscii | Mode::PrettyAscii => out.put(digit),
        }
    }

    fn read_from<C: ByteChannel>(&mut self, input: &mut TypedStream<C>) -> StreamResult<()> {
        match input.input_mode() {
            Mode::RawBinary => {
                let b = input.get_some("a bool byte")?;
                *self = match b {
                    0 => false,
                    1 => true,
                    other => return Err(input.unexpected("a 0 or 1 bool byte", other)),
                };
                Ok(())
            }
            Mode::RawAscii | Mode::PrettyAscii => {
                input.skip_blanks()?;
                *self = read_bool_digit(input)?;
                Ok(())
            }
            Mode::Ascii | Mode::Binary => {
                input.skip_blanks_and_comments()?;
                *self = read_bool_digit(input)?;
                Ok(())
            }
        }
    }
}

fn read_bool_digit<C: ByteChannel>(input: &mut TypedStream<C>) -> StreamResult<bool> {
    let b = input.get_some("a bool")?;
    match b {
        b'0' => Ok(false),
        b'1' => Ok(true),
        other => Err(input.unexpected("'0' or '1'", other)),
    }
}

/// True when the text form of `s` must be quoted to survive the trip.
fn needs_quoting(s: &str) -> bool {
    s.is_empty()
        || s.bytes()
            .any(|b| is_token_end(b) || b == b'\\' || b.is_ascii_control())
}

fn write_quoted<C: ByteChannel>(out: &mut TypedStream<C>, s: &str) -> StreamResult<()> {
    out.put(b'"')?;
    for &b in s.as_bytes() {
        match b {
            b'"' => out.write_str("\\\"")?,
            b'\\' => out.write_str("\\\\")?,
            b'\n' => out.write_str("\\n")?,
            b'\t' => out.write_str("\\t")?,
            b'\r' => out.write_str("\\r")?,
            _ => out.put(b)?,
        }
    }
    out.put(b'"')
}

fn read_quoted_string<C: ByteChannel>(input: &mut TypedStream<C>) -> StreamResult<String> {
    input.expect_byte(b'"', "'\"' opening a string")?;
    let mut raw = Vec::new();
    loop {
        let b = input.get_some("a closing '\"'")?;
        match b {
            b'"' => break,
            b'\\' => {
                let escaped = input.get_some("an escaped character")?;
                raw.push(match escaped {
                    b'n' => b'\n',
                    b't' => b'\t',
                    b'r' => b'\r',
                    other => other,
                });
            }
            _ => raw.push(b),
        }
    }
    String::from_utf8(raw).map_err(|_| StreamError::NotUtf8)
}

fn read_bareword<C: ByteChannel>(input: &mut TypedStream<C>) -> StreamResult<String> {
    let mut raw = Vec::new();
    while let Some(b) = input.peek()? {
        if is_token_end(b) || b.is_ascii_control() {
            break;
        }
        input.get()?;
        raw.push(b);
    }
    String::from_utf8(raw).map_err(|_| StreamError::NotUtf8)
}

impl Streamable for String {
    fn write_to<C: ByteChannel>(&self, out: &mut TypedStream<C>) -> StreamResult<()> {
        match out.output_mode() {
            Mode::RawAscii | Mode::PrettyAscii => out.write_str(self),
            Mode::RawBinary => {
                // NUL-terminated so raw binary strings stay self-delimiting.
                out.write_str(self)?;
                out.put(0)
            }
            Mode::Ascii | Mode::Binary => {
                if needs_quoting(self) {
                    write_quoted(out, self)?;
                } else {
                    out.write_str(self)?;
                }
                out.put(b' ')
            }
        }
    }

    fn read_from<C: ByteChannel>(&mut self, input: &mut TypedStream<C>) -> StreamResult<()> {
        match input.input_mode() {
            Mode::RawAscii | Mode::PrettyAscii => {
                input.skip_blanks()?;
                let mut raw = Vec::new();
                while let Some(b) = input.peek()? {
                    if matches!(b, b' ' | b'\t' | b'\n' | b'\r') {
                        break;
                    }
                    input.get()?;
                    raw.push(b);
                }
                *self = String::from_utf8(raw).map_err(|_| StreamError::NotUtf8)?;
                Ok(())
            }
            Mode::RawBinary => {
                let mut raw = Vec::new();
                loop {
                    let b = input.get_some("a NUL-terminated string")?;
                    if b == 0 {
                        break;
                    }
                    raw.push(b);
                }
                *self = String::from_utf8(raw).map_err(|_| StreamError::NotUtf8)?;
                Ok(())
            }
            Mode::Ascii | Mode::Binary => {
                input.skip_blanks_and_comments()?;
                let first = match input.peek()? {
                    Some(b) => b,
                    None => return Err(input.eof_error("a string")),
                };
                if first == b'"' {
                    *self = read_quoted_string(input)?;
                } else {
                    let word = read_bareword(input)?;
                    if word.is_empty() {
                        return Err(input.unexpected("a string", first));
                    }
                    *self = word;
                }
                Ok(())
            }
        }
    }
}
