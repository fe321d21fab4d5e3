//! Self-describing, typed, dual-format stream protocol.
//!
//! PStream serializes in-memory object graphs — scalars, strings,
//! containers, and shared or cyclic pointer structures — to text or
//! binary, over any byte channel, with automatic format detection on
//! read.
//!
//! # Concepts
//!
//! - [`TypedStream`] — the stream itself: per-direction [`Mode`]s, float
//!   [`CompressionMode`], alias maps, lexical utilities
//! - [`Streamable`] — the typed read/write interface every serializable
//!   value implements
//! - [`Element`] — bulk binary dispatch for sequence elements
//! - [`mode`] / [`typecode`] — the format flags and the one-byte type
//!   tags binary records carry
//! - [`persist`] — one-call file and string save/load
//!
//! # Formats
//!
//! Output mode is a deliberate choice; input is forgiving. The two
//! tagged modes ([`Mode::Ascii`], [`Mode::Binary`]) share one reader
//! that dispatches on the first non-blank byte of every value, so a
//! file's text and binary sections can interleave freely. The raw modes
//! are bare passthrough for callers that carry their own structure.
//!
//! # Design rules
//!
//! 1. Output mode changes are never retroactive; they affect only
//!    subsequent operations.
//! 2. Every detected inconsistency is fatal to the current call — no
//!    recovery, no partial results.
//! 3. An object is serialized in full at most once per session; later
//!    writes emit back-references. Alias maps are never cleared
//!    implicitly between values.
//! 4. Binary bulk records always declare their element type and byte
//!    order, so readers on any host decode them portably.

pub mod alias;
pub mod error;
pub mod map;
pub mod mode;
pub mod persist;
pub mod scalar;
pub mod seq;
pub mod stream;
pub mod streamable;
pub mod typecode;

pub use error::{StreamError, StreamResult};
pub use map::{read_map, read_set, write_map, write_set};
pub use mode::{CompressionMode, Mode};
pub use persist::{
    load, load_into, read_from_bytes, read_from_string, save, save_with_mode, write_to_bytes,
    write_to_string,
};
pub use seq::{read_sequence, write_sequence, Element};
pub use stream::TypedStream;
pub use streamable::Streamable;
pub use typecode::Endianness;

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use pstream_channel::{ByteChannel, MemChannel};

    type Ptr<T> = Option<Rc<RefCell<T>>>;

    /// A singly linked node, the classic shared/cyclic test subject.
    #[derive(Default)]
    struct Node {
        value: i32,
        next: Ptr<Node>,
    }

    impl Streamable for Node {
        fn write_to<C: ByteChannel>(&self, out: &mut TypedStream<C>) -> StreamResult<()> {
            self.value.write_to(out)?;
            self.next.write_to(out)
        }

        fn read_from<C: ByteChannel>(&mut self, input: &mut TypedStream<C>) -> StreamResult<()> {
            self.value.read_from(input)?;
            self.next.read_from(input)
        }
    }

    #[test]
    fn ascii_output_reads_under_a_binary_configured_input() {
        let value = vec![1.25f64, -3.0, 0.5];
        let mut s = TypedStream::with_modes(MemChannel::new(), Mode::Binary, Mode::Ascii);
        value.write_to(&mut s).unwrap();
        assert_eq!(Vec::<f64>::read_new(&mut s).unwrap(), value);
    }

    #[test]
    fn binary_output_reads_under_an_ascii_configured_input() {
        let value = vec![1.25f64, -3.0, 0.5];
        let mut s = TypedStream::with_modes(MemChannel::new(), Mode::Ascii, Mode::Binary);
        value.write_to(&mut s).unwrap();
        assert_eq!(Vec::<f64>::read_new(&mut s).unwrap(), value);
    }

    #[test]
    fn mode_switches_mid_stream_are_not_retroactive() {
        let mut s = TypedStream::new(MemChannel::new());
        11i32.write_to(&mut s).unwrap();
        s.set_output_mode(Mode::Binary);
        22i32.write_to(&mut s).unwrap();
        s.set_output_mode(Mode::Ascii);
        33i32.write_to(&mut s).unwrap();

        // One auto-detecting reader handles the interleaved encodings.
        assert_eq!(i32::read_new(&mut s).unwrap(), 11);
        assert_eq!(i32::read_new(&mut s).unwrap(), 22);
        assert_eq!(i32::read_new(&mut s).unwrap(), 33);
    }

    #[test]
    fn every_output_mode_roundtrips_a_mixed_value() {
        let value = (7u64, "a label".to_string());
        for mode in [Mode::Ascii, Mode::Binary] {
            let mut s = TypedStream::with_modes(MemChannel::new(), Mode::Ascii, mode);
            value.write_to(&mut s).unwrap();
            assert_eq!(<(u64, String)>::read_new(&mut s).unwrap(), value);
        }
    }

    #[test]
    fn diamond_sharing_survives_the_trip() {
        // Two branches pointing at one leaf.
        let leaf: Ptr<i32> = Some(Rc::new(RefCell::new(100)));
        let diamond = vec![leaf.clone(), None, leaf.clone()];

        let mut s = TypedStream::new(MemChannel::new());
        diamond.write_to(&mut s).unwrap();

        // Exactly one definition, one back-reference, one null.
        let text = String::from_utf8(s.channel().bytes().to_vec()).unwrap();
        assert_eq!(text.matches("->").count(), 1);
        assert_eq!(text.matches("*0").count(), 1);

        let back = Vec::<Ptr<i32>>::read_new(&mut s).unwrap();
        assert!(back[1].is_none());
        let first = back[0].clone().unwrap();
        let third = back[2].clone().unwrap();
        assert!(Rc::ptr_eq(&first, &third));
        assert_eq!(*first.borrow(), 100);
    }

    #[test]
    fn two_node_cycle_terminates_and_rebuilds_its_shape() {
        let a = Rc::new(RefCell::new(Node {
            value: 1,
            next: None,
        }));
        let b = Rc::new(RefCell::new(Node {
            value: 2,
            next: Some(a.clone()),
        }));
        a.borrow_mut().next = Some(b.clone());

        let graph: Ptr<Node> = Some(a.clone());
        let mut s = TypedStream::new(MemChannel::new());
        graph.write_to(&mut s).unwrap();

        let back = Ptr::<Node>::read_new(&mut s).unwrap().unwrap();
        assert_eq!(back.borrow().value, 1);
        let second = back.borrow().next.clone().unwrap();
        assert_eq!(second.borrow().value, 2);
        let third = second.borrow().next.clone().unwrap();
        assert!(Rc::ptr_eq(&back, &third));

        // Break the cycles so the Rcs can drop.
        a.borrow_mut().next = None;
        back.borrow_mut().next = None;
    }

    #[test]
    fn cyclic_graphs_roundtrip_in_binary_mode_too() {
        let a = Rc::new(RefCell::new(Node {
            value: -7,
            next: None,
        }));
        a.borrow_mut().next = Some(a.clone());

        let graph: Ptr<Node> = Some(a.clone());
        let mut s = TypedStream::with_modes(MemChannel::new(), Mode::Ascii, Mode::Binary);
        graph.write_to(&mut s).unwrap();

        let back = Ptr::<Node>::read_new(&mut s).unwrap().unwrap();
        let next = back.borrow().next.clone().unwrap();
        assert!(Rc::ptr_eq(&back, &next));

        a.borrow_mut().next = None;
        back.borrow_mut().next = None;
    }

    #[test]
    fn sequences_of_pointers_to_structured_values() {
        let row: Ptr<Vec<f64>> = Some(Rc::new(RefCell::new(vec![1.0, 2.0])));
        let matrix = vec![row.clone(), row.clone()];

        let mut s = TypedStream::new(MemChannel::new());
        matrix.write_to(&mut s).unwrap();
        let back = Vec::<Ptr<Vec<f64>>>::read_new(&mut s).unwrap();

        let first = back[0].clone().unwrap();
        let second = back[1].clone().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(*first.borrow(), vec![1.0, 2.0]);
    }

    #[test]
    fn comments_are_tolerated_anywhere_blanks_are() {
        let text = "# header comment\n 2 [ # count above\n 5 6 ] ";
        let back: Vec<i32> = read_from_string(text).unwrap();
        assert_eq!(back, vec![5, 6]);
    }

    #[test]
    fn complex_nested_value_roundtrips_through_text() {
        let mut value: BTreeMap<String, Vec<(i32, String)>> = BTreeMap::new();
        value.insert(
            "first key".to_string(),
            vec![(1, "one".to_string()), (2, "two words".to_string())],
        );
        value.insert("empty".to_string(), vec![]);

        let text = write_to_string(&value).unwrap();
        let back: BTreeMap<String, Vec<(i32, String)>> = read_from_string(&text).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn truncated_input_reports_eof_not_a_panic() {
        let err = read_from_string::<Vec<i32>>("3 [ 1 2 ").unwrap_err();
        assert!(matches!(err, StreamError::UnexpectedEof { .. }));
    }
}
