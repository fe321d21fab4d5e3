//! Pair, map and set codecs.
//!
//! The brace/bracket grammar is textual in every tagged mode — only the
//! elements inside it follow the stream's output mode — so a map written
//! to a binary stream still reads back through the same auto-detecting
//! path as everything else. Duplicate keys on read overwrite (maps) or
//! are ignored (sets), the ordinary associative semantics.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use pstream_channel::ByteChannel;

use crate::error::StreamResult;
use crate::seq::Element;
use crate::stream::TypedStream;
use crate::streamable::Streamable;

/// Pairs serialize as `first: second`.
impl<A: Streamable, B: Streamable> Streamable for (A, B) {
    fn write_to<C: ByteChannel>(&self, out: &mut TypedStream<C>) -> StreamResult<()> {
        self.0.write_to(out)?;
        out.write_str(": ")?;
        self.1.write_to(out)?;
        out.put(b' ')
    }

    fn read_from<C: ByteChannel>(&mut self, input: &mut TypedStream<C>) -> StreamResult<()> {
        input.skip_blanks_comments_separators()?;
        self.0.read_from(input)?;
        input.skip_blanks_and_comments()?;
        input.expect_byte(b':', "':' between the halves of a pair")?;
        input.skip_blanks_and_comments()?;
        self.1.read_from(input)
    }
}

/// Write map entries as `{ k: v, k: v, }`.
pub fn write_map<'a, K, V, C, I>(out: &mut TypedStream<C>, entries: I) -> StreamResult<()>
where
    K: Streamable + 'a,
    V: Streamable + 'a,
    C: ByteChannel,
    I: Iterator<Item = (&'a K, &'a V)>,
{
    out.put(b'{')?;
    for (k, v) in entries {
        k.write_to(out)?;
        out.write_str(": ")?;
        v.write_to(out)?;
        out.write_str(", ")?;
    }
    out.put(b'}')
}

/// Read `{ k: v, ... }`, feeding each entry to `insert`.
pub fn read_map<K, V, C, F>(input: &mut TypedStream<C>, mut insert: F) -> StreamResult<()>
where
    K: Streamable + Default,
    V: Streamable + Default,
    C: ByteChannel,
    F: FnMut(K, V),
{
    input.skip_blanks_comments_separators()?;
    input.expect_byte(b'{', "'{' opening a map")?;
    input.skip_blanks_comments_separators()?;
    loop {
        match input.peek()? {
            None => return Err(input.eof_error("'}' closing a map")),
            Some(b'}') => {
                input.get()?;
                return Ok(());
            }
            Some(_) => {
                let mut key = K::default();
                key.read_from(input)?;
                input.skip_blanks_comments_separators()?;
                input.expect_byte(b':', "':' between a map key and value")?;
                input.skip_blanks_comments_separators()?;
                let mut value = V::default();
                value.read_from(input)?;
                insert(key, value);
                input.skip_blanks_comments_separators()?;
            }
        }
    }
}

/// Write set elements as `[ e, e ]`.
pub fn write_set<'a, T, C, I>(out: &mut TypedStream<C>, elems: I) -> StreamResult<()>
where
    T: Streamable + 'a,
    C: ByteChannel,
    I: Iterator<Item = &'a T>,
{
    out.put(b'[')?;
    let mut it = elems.peekable();
    while let Some(x) = it.next() {
        x.write_to(out)?;
        if it.peek().is_some() {
            out.write_str(", ")?;
        }
    }
    out.put(b']')
}

/// Read `[ e, ... ]`, feeding each element to `insert`.
pub fn read_set<T, C, F>(input: &mut TypedStream<C>, mut insert: F) -> StreamResult<()>
where
    T: Streamable + Default,
    C: ByteChannel,
    F: FnMut(T),
{
    input.skip_blanks_comments_separators()?;
    input.expect_byte(b'[', "'[' opening a set")?;
    input.skip_blanks_comments_separators()?;
    loop {
        match input.peek()? {
            None => return Err(input.eof_error("']' closing a set")),
            Some(b']') => {
                input.get()?;
                return Ok(());
            }
            Some(_) => {
                let mut elem = T::default();
                elem.read_from(input)?;
                insert(elem);
                input.skip_blanks_comments_separators()?;
            }
        }
    }
}

impl<K, V> Streamable for HashMap<K, V>
where
    K: Streamable + Default + Eq + Hash,
    V: Streamable + Default,
{
    fn write_to<C: ByteChannel>(&self, out: &mut TypedStream<C>) -> StreamResult<()> {
        write_map(out, self.iter())
    }

    fn read_from<C: ByteChannel>(&mut self, input: &mut TypedStream<C>) -> StreamResult<()> {
        self.clear();
        read_map(input, |k, v| {
            self.insert(k, v);
        })
    }
}

impl<K, V> Streamable for BTreeMap<K, V>
where
    K: Streamable + Default + Ord,
    V: Streamable + Default,
{
    fn write_to<C: ByteChannel>(&self, out: &mut TypedStream<C>) -> StreamResult<()> {
        write_map(out, self.iter())
    }

    fn read_from<C: ByteChannel>(&mut self, input: &mut TypedStream<C>) -> StreamResult<()> {
        self.clear();
        read_map(input, |k, v| {
            self.insert(k, v);
        })
    }
}

impl<T> Streamable for HashSet<T>
where
    T: Streamable + Default + Eq + Hash,
{
    fn write_to<C: ByteChannel>(&self, out: &mut TypedStream<C>) -> StreamResult<()> {
        write_set(out, self.iter())
    }

    fn read_from<C: ByteChannel>(&mut self, input: &mut TypedStream<C>) -> StreamResult<()> {
        self.clear();
        read_set(input, |x| {
            self.insert(x);
        })
    }
}

impl<T> Streamable for BTreeSet<T>
where
    T: Streamable + Default + Ord,
{
    fn write_to<C: ByteChannel>(&self, out: &mut TypedStream<C>) -> StreamResult<()> {
        write_set(out, self.iter())
    }

    fn read_from<C: ByteChannel>(&mut self, input: &mut TypedStream<C>) -> StreamResult<()> {
        self.clear();
        read_set(input, |x| {
            self.insert(x);
        })
    }
}

impl<A: Element, B: Element> Element for (A, B) {}

impl<K: Element + Eq + Hash, V: Element> Element for HashMap<K, V> {}

impl<K: Element + Ord, V: Element> Element for BTreeMap<K, V> {}

impl<T: Element + Eq + Hash> Element for HashSet<T> {}

impl<T: Element + Ord> Element for BTreeSet<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamError;
    use crate::mode::Mode;
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
    fn pair_text_form() {
        let mut s = TypedStream::new(MemChannel::new());
        (1i32, "x".to_string()).write_to(&mut s).unwrap();
        assert_eq!(s.channel().bytes(), b"1 : x  ");
        let back = <(i32, String)>::read_new(&mut s).unwrap();
        assert_eq!(back, (1, "x".to_string()));
    }

    #[test]
    fn pair_missing_colon_is_fatal() {
        let mut s = TypedStream::new(MemChannel::from_bytes(b"1 2 ".as_slice()));
        let err = <(i32, i32)>::read_new(&mut s).unwrap_err();
        assert!(matches!(err, StreamError::UnexpectedByte { .. }));
        assert!(err.to_string().contains("':'"));
    }

    #[test]
    fn maps_roundtrip_in_both_tagged_modes() {
        let mut m = BTreeMap::new();
        m.insert("alpha".to_string(), 1i32);
        m.insert("two words".to_string(), -2);
        assert_eq!(roundtrip(&m, Mode::Ascii), m);
        assert_eq!(roundtrip(&m, Mode::Binary), m);

        let mut h = HashMap::new();
        h.insert(3i32, vec![1.5f64, 2.5]);
        h.insert(-1, vec![]);
        assert_eq!(roundtrip(&h, Mode::Ascii), h);
    }

    #[test]
    fn duplicate_map_keys_last_write_wins() {
        let text = "{ k: 1, k: 2, }";
        let mut s = TypedStream::new(MemChannel::from_bytes(text.as_bytes()));
        let m = BTreeMap::<String, i32>::read_new(&mut s).unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m["k"], 2);
    }

    #[test]
    fn empty_map_and_set_roundtrip() {
        assert_eq!(
            roundtrip(&BTreeMap::<String, i32>::new(), Mode::Ascii),
            BTreeMap::new()
        );
        assert_eq!(
            roundtrip(&BTreeSet::<i32>::new(), Mode::Ascii),
            BTreeSet::new()
        );
    }

    #[test]
    fn sets_roundtrip_and_dedup() {
        let s: BTreeSet<i32> = [3, 1, 2].into_iter().collect();
        assert_eq!(roundtrip(&s, Mode::Ascii), s);
        assert_eq!(roundtrip(&s, Mode::Binary), s);

        let text = "[ 5, 5, 5 ]";
        let mut input = TypedStream::new(MemChannel::from_bytes(text.as_bytes()));
        let set = HashSet::<i32>::read_new(&mut input).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn maps_of_pairs_and_nested_values() {
        let mut m = BTreeMap::new();
        m.insert(1u32, (2i32, "v".to_string()));
        assert_eq!(roundtrip(&m, Mode::Ascii), m);
    }

    #[test]
    fn unclosed_map_is_fatal() {
        let mut s = TypedStream::new(MemChannel::from_bytes(b"{ a: 1, ".as_slice()));
        let err = BTreeMap::<String, i32>::read_new(&mut s).unwrap_err();
        assert!(matches!(err, StreamError::UnexpectedEof { .. }));
    }
}
