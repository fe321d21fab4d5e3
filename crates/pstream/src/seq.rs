//! Sequence codec: ordered containers of arbitrary element type.
//!
//! Writers pick a form from the output mode — bare elements, a pretty
//! bracket display, the counted text form `n [ e1 .. en ]`, or a binary
//! block whose marker byte declares the writer's endianness. Tagged
//! readers dispatch on the first non-blank byte, so any tagged writer's
//! output is readable without configuration.
//!
//! Fixed-width primitives travel as one bulk payload for throughput;
//! everything else falls back to per-element encoding under the generic
//! 0xFF tag.

use pstream_channel::ByteChannel;

use crate::error::{StreamError, StreamResult};
use crate::mode::{CompressionMode, Mode};
use crate::stream::TypedStream;
use crate::streamable::Streamable;
use crate::typecode::{self, Endianness};

/// Sequence element with an optional bulk binary form.
///
/// The default methods encode elements one by one through their own
/// codec under the generic tag. Fixed-width primitives override them
/// with single-block slice copies; floats additionally honor the
/// stream's compression mode.
pub trait Element: Streamable + Default {
    /// Tag identifying this element's bulk binary form in the given byte
    /// order, or [`typecode::GENERIC`] when there is none.
    fn type_tag(_endian: Endianness) -> u8 {
        typecode::GENERIC
    }

    /// Append the bulk payload for `xs` (no header).
    fn bulk_write<C: ByteChannel>(out: &mut TypedStream<C>, xs: &[Self]) -> StreamResult<()>
    where
        Self: Sized,
    {
        // Elements of a binary block keep a binary encoding even when the
        // surrounding mode is textual; raw modes pass through unchanged.
        if matches!(out.output_mode(), Mode::Binary | Mode::RawBinary) {
            for x in xs {
                x.write_to(out)?;
            }
            Ok(())
        } else {
            out.with_output_mode(Mode::Binary, |out| {
                for x in xs {
                    x.write_to(out)?;
                }
                Ok(())
            })
        }
    }

    /// Decode the bulk payload of a block tagged `tag` into `xs`.
    fn bulk_read<C: ByteChannel>(
        input: &mut TypedStream<C>,
        xs: &mut [Self],
        tag: u8,
    ) -> StreamResult<()>
    where
        Self: Sized,
    {
        if tag != typecode::GENERIC {
            return Err(StreamError::TagMismatch {
                expected: "the generic tag 0xFF".to_string(),
                found: tag,
            });
        }
        for x in xs.iter_mut() {
            x.read_from(input)?;
        }
        Ok(())
    }

    /// Write one binary block (marker, tag, count, payload) for `xs`.
    fn write_block<C: ByteChannel>(out: &mut TypedStream<C>, xs: &[Self]) -> StreamResult<()>
    where
        Self: Sized,
    {
        write_block_header(out, xs.len(), Self::type_tag(Endianness::host()))?;
        Self::bulk_write(out, xs)
    }

    /// Decode a sparse block body (its 0x16/0x17 marker already
    /// consumed). Only float elements have a sparse form.
    fn read_sparse_block<C: ByteChannel>(
        _input: &mut TypedStream<C>,
        _seq: &mut Vec<Self>,
        endian: Endianness,
    ) -> StreamResult<()>
    where
        Self: Sized,
    {
        let marker = match endian {
            Endianness::Little => typecode::SPARSE_LE,
            Endianness::Big => typecode::SPARSE_BE,
        };
        Err(StreamError::TagMismatch {
            expected: "an element type with a sparse form".to_string(),
            found: marker,
        })
    }
}

/// Marker, type tag and element count opening a dense binary block.
fn write_block_header<C: ByteChannel>(
    out: &mut TypedStream<C>,
    len: usize,
    tag: u8,
) -> StreamResult<()> {
    let n = u32::try_from(len).map_err(|_| StreamError::CountOverflow { len })?;
    match Endianness::host() {
        Endianness::Little => out.put(typecode::SEQ_LE)?,
        Endianness::Big => out.put(typecode::SEQ_BE)?,
    }
    out.put(tag)?;
    out.write_all(&n.to_ne_bytes())
}

pub(crate) fn read_u32_endian<C: ByteChannel>(
    input: &mut TypedStream<C>,
    endian: Endianness,
) -> StreamResult<u32> {
    let mut bytes = [0u8; 4];
    input.read_exact(&mut bytes)?;
    Ok(match endian {
        Endianness::Little => u32::from_le_bytes(bytes),
        Endianness::Big => u32::from_be_bytes(bytes),
    })
}

macro_rules! element_fixed {
    ($ty:ty, $size:expr, $le:expr, $be:expr) => {
        impl Element for $ty {
            fn type_tag(endian: Endianness) -> u8 {
                match endian {
                    Endianness::Little => $le,
                    Endianness::Big => $be,
                }
            }

            fn bulk_write<C: ByteChannel>(
                out: &mut TypedStream<C>,
                xs: &[Self],
            ) -> StreamResult<()> {
                let mut payload = Vec::with_capacity(xs.len() * $size);
                for x in xs {
                    payload.extend_from_slice(&x.to_ne_bytes());
                }
                out.write_all(&payload)
            }

            fn bulk_read<C: ByteChannel>(
                input: &mut TypedStream<C>,
                xs: &mut [Self],
                tag: u8,
            ) -> StreamResult<()> {
                if tag != $le && tag != $be {
                    return Err(StreamError::TagMismatch {
                        expected: concat!("the ", stringify!($ty), " element tag").to_string(),
                        found: tag,
                    });
                }
                let mut bytes = vec![0u8; xs.len() * $size];
                input.read_exact(&mut bytes)?;
                for (slot, chunk) in xs.iter_mut().zip(bytes.chunks_exact($size)) {
                    let mut arr = [0u8; $size];
                    arr.copy_from_slice(chunk);
                    *slot = if tag == $le {
                        <$ty>::from_le_bytes(arr)
                    } else {
                        <$ty>::from_be_bytes(arr)
                    };
                }
                Ok(())
            }
        }
    };
}

element_fixed!(i8, 1, typecode::I8, typecode::I8);
element_fixed!(u8, 1, typecode::U8, typecode::U8);
element_fixed!(i16, 2, typecode::I16_LE, typecode::I16_BE);
element_fixed!(u16, 2, typecode::U16_LE, typecode::U16_BE);
element_fixed!(i32, 4, typecode::I32_LE, typecode::I32_BE);
element_fixed!(u32, 4, typecode::U32_LE, typecode::U32_BE);
element_fixed!(i64, 8, typecode::I64_LE, typecode::I64_BE);
element_fixed!(u64, 8, typecode::U64_LE, typecode::U64_BE);

impl Element for bool {
    fn type_tag(_endian: Endianness) -> u8 {
        typecode::BOOL
    }

    fn bulk_write<C: ByteChannel>(out: &mut TypedStream<C>, xs: &[Self]) -> StreamResult<()> {
        let payload: Vec<u8> = xs.iter().map(|&x| if x { b'1' } else { b'0' }).collect();
        out.write_all(&payload)
    }

    fn bulk_read<C: ByteChannel>(
        input: &mut TypedStream<C>,
        xs: &mut [Self],
        tag: u8,
    ) -> StreamResult<()> {
        if tag != typecode::BOOL {
            return Err(StreamError::TagMismatch {
                expected: "the bool element tag".to_string(),
                found: tag,
            });
        }
        let mut bytes = vec![0u8; xs.len()];
        input.read_exact(&mut bytes)?;
        for (slot, &b) in xs.iter_mut().zip(bytes.iter()) {
            *slot = match b {
                b'0' => false,
                b'1' => true,
                other => return Err(input.unexpected("'0' or '1' in a bool block", other)),
            };
        }
        Ok(())
    }
}

impl Element for f32 {
    fn type_tag(endian: Endianness) -> u8 {
        match endian {
            Endianness::Little => typecode::F32_LE,
            Endianness::Big => typecode::F32_BE,
        }
    }

    fn bulk_write<C: ByteChannel>(out: &mut TypedStream<C>, xs: &[Self]) -> StreamResult<()> {
        let mut payload = Vec::with_capacity(xs.len() * 4);
        for x in xs {
            payload.extend_from_slice(&x.to_ne_bytes());
        }
        out.write_all(&payload)
    }

    fn bulk_read<C: ByteChannel>(
        input: &mut TypedStream<C>,
        xs: &mut [Self],
        tag: u8,
    ) -> StreamResult<()> {
        match tag {
            typecode::F32_LE | typecode::F32_BE => {
                let mut bytes = vec![0u8; xs.len() * 4];
                input.read_exact(&mut bytes)?;
                for (slot, chunk) in xs.iter_mut().zip(bytes.chunks_exact(4)) {
                    let mut arr = [0u8; 4];
                    arr.copy_from_slice(chunk);
                    *slot = if tag == typecode::F32_LE {
                        f32::from_le_bytes(arr)
                    } else {
                        f32::from_be_bytes(arr)
                    };
                }
                Ok(())
            }
            typecode::F64_LE | typecode::F64_BE => {
                let mut bytes = vec![0u8; xs.len() * 8];
                input.read_exact(&mut bytes)?;
                for (slot, chunk) in xs.iter_mut().zip(bytes.chunks_exact(8)) {
                    let mut arr = [0u8; 8];
                    arr.copy_from_slice(chunk);
                    let wide = if tag == typecode::F64_LE {
                        f64::from_le_bytes(arr)
                    } else {
                        f64::from_be_bytes(arr)
                    };
                    *slot = wide as f32;
                }
                Ok(())
            }
            other => Err(StreamError::TagMismatch {
                expected: "a float element tag".to_string(),
                found: other,
            }),
        }
    }

    fn write_block<C: ByteChannel>(out: &mut TypedStream<C>, xs: &[Self]) -> StreamResult<()> {
        match out.compression() {
            CompressionMode::None | CompressionMode::NarrowFloat => {
                write_block_header(out, xs.len(), Self::type_tag(Endianness::host()))?;
                Self::bulk_write(out, xs)
            }
            CompressionMode::Sparse | CompressionMode::LossySparse => write_sparse_block(
                out,
                xs.len(),
                f32::type_tag(Endianness::host()),
                xs.iter().enumerate().filter_map(|(i, &x)| {
                    if x != 0.0 {
                        Some((i as u32, SparseValue::F32(x)))
                    } else {
                        None
                    }
                }),
            ),
        }
    }

    fn read_sparse_block<C: ByteChannel>(
        input: &mut TypedStream<C>,
        seq: &mut Vec<Self>,
        endian: Endianness,
    ) -> StreamResult<()> {
        let values = read_sparse_values(input, endian)?;
        *seq = values.into_iter().map(|x| x as f32).collect();
        Ok(())
    }
}

impl Element for f64 {
    fn type_tag(endian: Endianness) -> u8 {
        match endian {
            Endianness::Little => typecode::F64_LE,
            Endianness::Big => typecode::F64_BE,
        }
    }

    fn bulk_write<C: ByteChannel>(out: &mut TypedStream<C>, xs: &[Self]) -> StreamResult<()> {
        let mut payload = Vec::with_capacity(xs.len() * 8);
        for x in xs {
            payload.extend_from_slice(&x.to_ne_bytes());
        }
        out.write_all(&payload)
    }

    fn bulk_read<C: ByteChannel>(
        input: &mut TypedStream<C>,
        xs: &mut [Self],
        tag: u8,
    ) -> StreamResult<()> {
        match tag {
            typecode::F64_LE | typecode::F64_BE => {
                let mut bytes = vec![0u8; xs.len() * 8];
                input.read_exact(&mut bytes)?;
                for (slot, chunk) in xs.iter_mut().zip(bytes.chunks_exact(8)) {
                    let mut arr = [0u8; 8];
                    arr.copy_from_slice(chunk);
                    *slot = if tag == typecode::F64_LE {
                        f64::from_le_bytes(arr)
                    } else {
                        f64::from_be_bytes(arr)
                    };
                }
                Ok(())
            }
            typecode::F32_LE | typecode::F32_BE => {
                // A narrowed block: widen per element.
                let mut bytes = vec![0u8; xs.len() * 4];
                input.read_exact(&mut bytes)?;
                for (slot, chunk) in xs.iter_mut().zip(bytes.chunks_exact(4)) {
                    let mut arr = [0u8; 4];
                    arr.copy_from_slice(chunk);
                    let narrow = if tag == typecode::F32_LE {
                        f32::from_le_bytes(arr)
                    } else {
                        f32::from_be_bytes(arr)
                    };
                    *slot = narrow as f64;
                }
                Ok(())
            }
            other => Err(StreamError::TagMismatch {
                expected: "a float element tag".to_string(),
                found: other,
            }),
        }
    }

    fn write_block<C: ByteChannel>(out: &mut TypedStream<C>, xs: &[Self]) -> StreamResult<()> {
        match out.compression() {
            CompressionMode::None => {
                write_block_header(out, xs.len(), Self::type_tag(Endianness::host()))?;
                Self::bulk_write(out, xs)
            }
            CompressionMode::NarrowFloat => {
                write_block_header(out, xs.len(), f32::type_tag(Endianness::host()))?;
                let mut payload = Vec::with_capacity(xs.len() * 4);
                for &x in xs {
                    payload.extend_from_slice(&(x as f32).to_ne_bytes());
                }
                out.write_all(&payload)
            }
            CompressionMode::Sparse => write_sparse_block(
                out,
                xs.len(),
                f64::type_tag(Endianness::host()),
                xs.iter().enumerate().filter_map(|(i, &x)| {
                    if x != 0.0 {
                        Some((i as u32, SparseValue::F64(x)))
                    } else {
                        None
                    }
                }),
            ),
            CompressionMode::LossySparse => write_sparse_block(
                out,
                xs.len(),
                f32::type_tag(Endianness::host()),
                xs.iter().enumerate().filter_map(|(i, &x)| {
                    if x != 0.0 {
                        Some((i as u32, SparseValue::F32(x as f32)))
                    } else {
                        None
                    }
                }),
            ),
        }
    }

    fn read_sparse_block<C: ByteChannel>(
        input: &mut TypedStream<C>,
        seq: &mut Vec<Self>,
        endian: Endianness,
    ) -> StreamResult<()> {
        *seq = read_sparse_values(input, endian)?;
        Ok(())
    }
}

enum SparseValue {
    F32(f32),
    F64(f64),
}

impl SparseValue {
    fn push_ne_bytes(&self, payload: &mut Vec<u8>) {
        match self {
            SparseValue::F32(x) => payload.extend_from_slice(&x.to_ne_bytes()),
            SparseValue::F64(x) => payload.extend_from_slice(&x.to_ne_bytes()),
        }
    }
}

/// Sparse float block: marker, storage tag, total count, non-zero count,
/// then ascending (index, value) pairs, all in the host byte order.
fn write_sparse_block<C: ByteChannel>(
    out: &mut TypedStream<C>,
    len: usize,
    tag: u8,
    nonzero: impl Iterator<Item = (u32, SparseValue)>,
) -> StreamResult<()> {
    let total = u32::try_from(len).map_err(|_| StreamError::CountOverflow { len })?;
    let entries: Vec<(u32, SparseValue)> = nonzero.collect();
    match Endianness::host() {
        Endianness::Little => out.put(typecode::SPARSE_LE)?,
        Endianness::Big => out.put(typecode::SPARSE_BE)?,
    }
    out.put(tag)?;
    let mut payload = Vec::new();
    payload.extend_from_slice(&total.to_ne_bytes());
    payload.extend_from_slice(&(entries.len() as u32).to_ne_bytes());
    for (index, value) in &entries {
        payload.extend_from_slice(&index.to_ne_bytes());
        value.push_ne_bytes(&mut payload);
    }
    out.write_all(&payload)
}

/// Decode a sparse block body into full-width values, zero-filling the
/// omitted positions.
fn read_sparse_values<C: ByteChannel>(
    input: &mut TypedStream<C>,
    endian: Endianness,
) -> StreamResult<Vec<f64>> {
    let tag = input.get_some("a sparse block type tag")?;
    let narrow = match (endian, tag) {
        (Endianness::Little, typecode::F32_LE) | (Endianness::Big, typecode::F32_BE) => true,
        (Endianness::Little, typecode::F64_LE) | (Endianness::Big, typecode::F64_BE) => false,
        _ => {
            return Err(StreamError::TagMismatch {
                expected: "a float tag matching the block byte order".to_string(),
                found: tag,
            })
        }
    };
    let total = read_u32_endian(input, endian)? as usize;
    let nnz = read_u32_endian(input, endian)?;
    let mut values = vec![0.0f64; total];
    for _ in 0..nnz {
        let index = read_u32_endian(input, endian)?;
        let value = if narrow {
            let mut bytes = [0u8; 4];
            input.read_exact(&mut bytes)?;
            (match endian {
                Endianness::Little => f32::from_le_bytes(bytes),
                Endianness::Big => f32::from_be_bytes(bytes),
            }) as f64
        } else {
            let mut bytes = [0u8; 8];
            input.read_exact(&mut bytes)?;
            match endian {
                Endianness::Little => f64::from_le_bytes(bytes),
                Endianness::Big => f64::from_be_bytes(bytes),
            }
        };
        let slot = values
            .get_mut(index as usize)
            .ok_or(StreamError::SparseIndexOutOfRange { index, len: total })?;
        *slot = value;
    }
    Ok(values)
}

impl Element for String {}

impl<T: Element> Element for Vec<T> {}

/// Serialize a slice in the stream's current output mode.
pub fn write_sequence<T: Element, C: ByteChannel>(
    out: &mut TypedStream<C>,
    xs: &[T],
) -> StreamResult<()> {
    match out.output_mode() {
        Mode::RawAscii => {
            for x in xs {
                x.write_to(out)?;
                out.put(b' ')?;
            }
            Ok(())
        }
        Mode::PrettyAscii => {
            out.write_str("[ ")?;
            for (i, x) in xs.iter().enumerate() {
                x.write_to(out)?;
                if i + 1 < xs.len() {
                    out.write_str(", ")?;
                }
            }
            out.write_str(" ] ")
        }
        Mode::RawBinary => T::bulk_write(out, xs),
        Mode::Ascii => {
            let n = u32::try_from(xs.len()).map_err(|_| StreamError::CountOverflow {
                len: xs.len(),
            })?;
            n.write_to(out)?;
            out.write_str("[ ")?;
            for x in xs {
                x.write_to(out)?;
            }
            out.write_str("] ")
        }
        Mode::Binary => T::write_block(out, xs),
    }
}

/// Deserialize into `seq` per the stream's current input mode.
///
/// Raw modes fill the existing length in place; tagged modes resize from
/// the count, bracket scan, or binary header they find.
pub fn read_sequence<T: Element, C: ByteChannel>(
    input: &mut TypedStream<C>,
    seq: &mut Vec<T>,
) -> StreamResult<()> {
    match input.input_mode() {
        Mode::RawAscii | Mode::RawBinary => {
            for slot in seq.iter_mut() {
                slot.read_from(input)?;
            }
            Ok(())
        }
        Mode::PrettyAscii => Err(StreamError::UnreadableMode {
            mode: Mode::PrettyAscii,
            what: "a sequence",
        }),
        Mode::Ascii | Mode::Binary => read_tagged_sequence(input, seq),
    }
}

pub(crate) fn read_tagged_sequence<T: Element, C: ByteChannel>(
    input: &mut TypedStream<C>,
    seq: &mut Vec<T>,
) -> StreamResult<()> {
    input.skip_blanks_and_comments()?;
    let first = match input.peek()? {
        Some(b) => b,
        None => return Err(input.eof_error("a sequence")),
    };
    match first {
        b'[' => {
            input.get()?;
            input.skip_blanks_comments_separators()?;
            seq.clear();
            loop {
                match input.peek()? {
                    None => return Err(input.eof_error("']' closing a sequence")),
                    Some(b']') => {
                        input.get()?;
                        return Ok(());
                    }
                    Some(_) => {
                        let mut x = T::default();
                        x.read_from(input)?;
                        seq.push(x);
                        input.skip_blanks_comments_separators()?;
                    }
                }
            }
        }
        b'0'..=b'9' => {
            let mut n = 0u32;
            n.read_from(input)?;
            input.skip_blanks_and_comments()?;
            input.expect_byte(b'[', "'[' after a sequence count")?;
            input.skip_blanks_comments_separators()?;
            seq.clear();
            seq.resize_with(n as usize, T::default);
            for slot in seq.iter_mut() {
                slot.read_from(input)?;
                input.skip_blanks_comments_separators()?;
            }
            input.expect_byte(b']', "']' closing a sequence")
        }
        typecode::SEQ_LE | typecode::SEQ_BE => {
            input.get()?;
            let endian = if first == typecode::SEQ_LE {
                Endianness::Little
            } else {
                Endianness::Big
            };
            let tag = input.get_some("a type tag")?;
            let n = read_u32_endian(input, endian)?;
            seq.clear();
            seq.resize_with(n as usize, T::default);
            T::bulk_read(input, seq.as_mut_slice(), tag)
        }
        typecode::SPARSE_LE | typecode::SPARSE_BE => {
            input.get()?;
            let endian = if first == typecode::SPARSE_LE {
                Endianness::Little
            } else {
                Endianness::Big
            };
            T::read_sparse_block(input, seq, endian)
        }
        other => Err(input.unexpected("'[', a count, or a binary sequence marker", other)),
    }
}

impl<T: Element> Streamable for Vec<T> {
    fn write_to<C: ByteChannel>(&self, out: &mut TypedStream<C>) -> StreamResult<()> {
        write_sequence(out, self)
    }

    fn read_from<C: ByteChannel>(&mut self, input: &mut TypedStream<C>) -> StreamResult<()> {
        read_sequence(input, self)
    }
}

impl<T: Element, const N: usize> Streamable for [T; N] {
    fn write_to<C: ByteChannel>(&self, out: &mut TypedStream<C>) -> StreamResult<()> {
        write_sequence(out, self.as_slice())
    }

    fn read_from<C: ByteChannel>(&mut self, input: &mut TypedStream<C>) -> StreamResult<()> {
        match input.input_mode() {
            Mode::RawAscii | Mode::RawBinary => {
                for slot in self.iter_mut() {
                    slot.read_from(input)?;
                }
                Ok(())
            }
            Mode::PrettyAscii => Err(StreamError::UnreadableMode {
                mode: Mode::PrettyAscii,
                what: "a fixed-size sequence",
            }),
            Mode::Ascii | Mode::Binary => {
                let mut v: Vec<T> = Vec::new();
                read_tagged_sequence(input, &mut v)?;
                let actual = v.len();
                *self = v.try_into().map_err(|_| StreamError::LengthMismatch {
                    expected: N,
                    actual,
                })?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pstream_channel::MemChannel;

    fn roundtrip<T>(value: &T, outmode: Mode) -> T
    where
        T: Streamable + Default,
    {
        let mut s = TypedStream::with_modes(MemChannel::new(), Mode::Ascii, outmode);
        value.write_to(&mut s).unwrap();
        T::read_new(&mut s).unwrap()
    }

    #[test]
    fn counted_text_form() {
        let mut s = TypedStream::new(MemChannel::new());
        vec![1i32, 2, 3].write_to(&mut s).unwrap();
        assert_eq!(s.channel().bytes(), b"3 [ 1 2 3 ] ");
        assert_eq!(Vec::<i32>::read_new(&mut s).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn binary_block_layout_matches_the_wire_format() {
        let mut s = TypedStream::with_modes(MemChannel::new(), Mode::Ascii, Mode::Binary);
        vec![1i32, 2, 3].write_to(&mut s).unwrap();
        let bytes = s.channel().bytes().to_vec();

        let mut expected = Vec::new();
        match Endianness::host() {
            Endianness::Little => {
                expected.push(typecode::SEQ_LE);
                expected.push(typecode::I32_LE);
                expected.extend_from_slice(&3u32.to_le_bytes());
                for x in [1i32, 2, 3] {
                    expected.extend_from_slice(&x.to_le_bytes());
                }
            }
            Endianness::Big => {
                expected.push(typecode::SEQ_BE);
                expected.push(typecode::I32_BE);
                expected.extend_from_slice(&3u32.to_be_bytes());
                for x in [1i32, 2, 3] {
                    expected.extend_from_slice(&x.to_be_bytes());
                }
            }
        }
        assert_eq!(bytes, expected);
        assert_eq!(Vec::<i32>::read_new(&mut s).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn foreign_endian_block_is_byte_swapped() {
        // Hand-built big-endian block, read on any host.
        let mut bytes = vec![typecode::SEQ_BE, typecode::I32_BE];
        bytes.extend_from_slice(&2u32.to_be_bytes());
        bytes.extend_from_slice(&0x01020304i32.to_be_bytes());
        bytes.extend_from_slice(&(-5i32).to_be_bytes());

        let mut s = TypedStream::new(MemChannel::from_bytes(bytes));
        assert_eq!(
            Vec::<i32>::read_new(&mut s).unwrap(),
            vec![0x01020304, -5]
        );

        // And the little-endian mirror.
        let mut bytes = vec![typecode::SEQ_LE, typecode::I32_LE];
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&7i32.to_le_bytes());
        let mut s = TypedStream::new(MemChannel::from_bytes(bytes));
        assert_eq!(Vec::<i32>::read_new(&mut s).unwrap(), vec![7]);
    }

    #[test]
    fn bracket_form_accepts_commas_and_comments() {
        let text = "[ 1, 2, # comment\n 3 ]";
        let mut s = TypedStream::new(MemChannel::from_bytes(text.as_bytes()));
        assert_eq!(Vec::<i32>::read_new(&mut s).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn empty_sequences_roundtrip() {
        for mode in [Mode::Ascii, Mode::Binary] {
            assert_eq!(roundtrip(&Vec::<i32>::new(), mode), Vec::<i32>::new());
            assert_eq!(roundtrip(&Vec::<String>::new(), mode), Vec::<String>::new());
        }
    }

    #[test]
    fn generic_elements_fall_back_to_per_element_encoding() {
        let words = vec!["alpha".to_string(), "two words".to_string()];
        assert_eq!(roundtrip(&words, Mode::Ascii), words);
        assert_eq!(roundtrip(&words, Mode::Binary), words);

        // The binary header carries the generic tag.
        let mut s = TypedStream::with_modes(MemChannel::new(), Mode::Ascii, Mode::Binary);
        words.write_to(&mut s).unwrap();
        assert_eq!(s.channel().bytes()[1], typecode::GENERIC);
    }

    #[test]
    fn nested_sequences_roundtrip_in_both_tagged_modes() {
        let grid = vec![vec![1.0f64, 2.0], vec![], vec![3.5]];
        assert_eq!(roundtrip(&grid, Mode::Ascii), grid);
        assert_eq!(roundtrip(&grid, Mode::Binary), grid);
    }

    #[test]
    fn bool_sequences_use_digit_payloads() {
        let flags = vec![true, false, true];
        let mut s = TypedStream::with_modes(MemChannel::new(), Mode::Ascii, Mode::Binary);
        flags.write_to(&mut s).unwrap();
        let bytes = s.channel().bytes();
        assert_eq!(bytes[1], typecode::BOOL);
        assert_eq!(&bytes[6..], b"101");
        assert_eq!(Vec::<bool>::read_new(&mut s).unwrap(), flags);
    }

    #[test]
    fn raw_ascii_fills_the_existing_length() {
        let mut s = TypedStream::with_modes(
            MemChannel::from_bytes(b"7 8 9".as_slice()),
            Mode::RawAscii,
            Mode::RawAscii,
        );
        let mut v = vec![0i32; 3];
        v.read_from(&mut s).unwrap();
        assert_eq!(v, vec![7, 8, 9]);
    }

    #[test]
    fn pretty_output_is_display_only() {
        let mut s = TypedStream::with_modes(MemChannel::new(), Mode::PrettyAscii, Mode::PrettyAscii);
        vec![1i32, 2].write_to(&mut s).unwrap();
        assert_eq!(s.channel().bytes(), b"[ 1, 2 ] ");

        let mut v: Vec<i32> = Vec::new();
        assert!(matches!(
            v.read_from(&mut s),
            Err(StreamError::UnreadableMode { .. })
        ));
    }

    #[test]
    fn fixed_size_arrays_enforce_their_length() {
        let arr = [1i32, 2, 3];
        let mut s = TypedStream::new(MemChannel::new());
        arr.write_to(&mut s).unwrap();
        let mut back = [0i32; 3];
        back.read_from(&mut s).unwrap();
        assert_eq!(back, arr);

        let mut s = TypedStream::new(MemChannel::from_bytes(b"2 [ 1 2 ] ".as_slice()));
        let mut wrong = [0i32; 3];
        let err = wrong.read_from(&mut s).unwrap_err();
        assert!(matches!(
            err,
            StreamError::LengthMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn garbage_sequence_header_is_fatal() {
        let mut s = TypedStream::new(MemChannel::from_bytes(b"@oops".as_slice()));
        let err = Vec::<i32>::read_new(&mut s).unwrap_err();
        assert!(matches!(err, StreamError::UnexpectedByte { .. }));
    }

    #[test]
    fn narrow_float_compression_autodetects_on_read() {
        let xs = vec![1.5f64, -2.25, 0.0];
        let mut s = TypedStream::with_modes(MemChannel::new(), Mode::Ascii, Mode::Binary);
        s.set_compression(CompressionMode::NarrowFloat);
        xs.write_to(&mut s).unwrap();
        // Reader has no compression configured; the f32 tag says it all.
        assert_eq!(Vec::<f64>::read_new(&mut s).unwrap(), xs);
    }

    #[test]
    fn sparse_compression_roundtrips_zero_runs() {
        let mut xs = vec![0.0f64; 64];
        xs[3] = 1.25;
        xs[40] = -9.5;

        let mut s = TypedStream::with_modes(MemChannel::new(), Mode::Ascii, Mode::Binary);
        s.set_compression(CompressionMode::Sparse);
        xs.write_to(&mut s).unwrap();
        // Far smaller than the 8 * 64 dense payload.
        assert!(s.channel().bytes().len() < 64);
        assert_eq!(Vec::<f64>::read_new(&mut s).unwrap(), xs);
    }

    #[test]
    fn lossy_sparse_narrows_the_stored_values() {
        let mut xs = vec![0.0f64; 10];
        xs[2] = 1.5;
        xs[7] = 0.1f32 as f64;

        let mut s = TypedStream::with_modes(MemChannel::new(), Mode::Ascii, Mode::Binary);
        s.set_compression(CompressionMode::LossySparse);
        xs.write_to(&mut s).unwrap();
        let back = Vec::<f64>::read_new(&mut s).unwrap();
        assert_eq!(back.len(), 10);
        assert_eq!(back[2], 1.5);
        assert_eq!(back[7], 0.1f32 as f64);
    }

    #[test]
    fn sparse_f32_sequences_roundtrip() {
        let mut xs = vec![0.0f32; 16];
        xs[5] = 2.5;
        let mut s = TypedStream::with_modes(MemChannel::new(), Mode::Ascii, Mode::Binary);
        s.set_compression(CompressionMode::Sparse);
        xs.write_to(&mut s).unwrap();
        assert_eq!(Vec::<f32>::read_new(&mut s).unwrap(), xs);
    }

    #[test]
    fn sparse_index_out_of_range_is_fatal() {
        let mut bytes = vec![typecode::SPARSE_LE, typecode::F64_LE];
        bytes.extend_from_slice(&2u32.to_le_bytes()); // total
        bytes.extend_from_slice(&1u32.to_le_bytes()); // nnz
        bytes.extend_from_slice(&9u32.to_le_bytes()); // bad index
        bytes.extend_from_slice(&1.0f64.to_le_bytes());

        let mut s = TypedStream::new(MemChannel::from_bytes(bytes));
        let err = Vec::<f64>::read_new(&mut s).unwrap_err();
        assert!(matches!(err, StreamError::SparseIndexOutOfRange { index: 9, .. }));
    }
}
