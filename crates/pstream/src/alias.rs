//! Alias-tracked serialization of shared, possibly cyclic pointer graphs.
//!
//! Pointer values are `Option<Rc<RefCell<T>>>`; `None` is the null
//! pointer, written `*0`. The first time an allocation is written it gets
//! the next integer id and a full definition `*<id>-><value>`; every
//! later write of the same allocation in the session emits only the
//! back-reference `*<id>`, so shared substructures are encoded once and
//! cyclic graphs terminate. Identity is the allocation address, keyed in
//! the stream's write map; the read side rebuilds identity through its
//! own id-to-object map.
//!
//! The ordering rule on both sides is what makes cycles safe: an id is
//! registered *before* recursing into the pointee, so a reference back to
//! the object being encoded (or decoded) resolves instead of recursing
//! forever (or failing).

use std::cell::RefCell;
use std::rc::Rc;

use pstream_channel::ByteChannel;

use crate::error::StreamResult;
use crate::seq::Element;
use crate::stream::TypedStream;
use crate::streamable::Streamable;

impl<T> Streamable for Option<Rc<RefCell<T>>>
where
    T: Streamable + Default + 'static,
{
    fn write_to<C: ByteChannel>(&self, out: &mut TypedStream<C>) -> StreamResult<()> {
        let rc = match self {
            None => return out.write_str("*0 "),
            Some(rc) => rc,
        };
        let key = Rc::as_ptr(rc) as *const () as usize;
        if let Some(id) = out.write_alias(key) {
            out.put(b'*')?;
            id.write_to(out)?;
            out.put(b' ')?;
            return Ok(());
        }
        let id = out.register_write_alias(key);
        out.put(b'*')?;
        id.write_to(out)?;
        out.write_str("->")?;
        rc.borrow().write_to(out)
    }

    fn read_from<C: ByteChannel>(&mut self, input: &mut TypedStream<C>) -> StreamResult<()> {
        input.skip_blanks_comments_separators()?;
        if input.peek()? != Some(b'*') {
            // A bare value: decode into the existing object, or a fresh one.
            let rc = match self.take() {
                Some(rc) => rc,
                None => Rc::new(RefCell::new(T::default())),
            };
            rc.borrow_mut().read_from(input)?;
            *self = Some(rc);
            return Ok(());
        }
        input.get()?;
        let mut id = 0u32;
        id.read_from(input)?;
        if id == 0 {
            *self = None;
            return Ok(());
        }
        input.skip_blanks_comments_separators()?;
        if input.peek()? == Some(b'-') {
            input.get()?;
            input.expect_byte(b'>', "'>' completing a '->' alias definition")?;
            input.skip_blanks_comments_separators()?;
            let rc = match self.take() {
                Some(rc) => rc,
                None => Rc::new(RefCell::new(T::default())),
            };
            input.register_read_alias(id, rc.clone());
            rc.borrow_mut().read_from(input)?;
            *self = Some(rc);
            Ok(())
        } else {
            *self = Some(input.read_alias::<T>(id)?);
            Ok(())
        }
    }
}

impl<T: Streamable + Default + 'static> Element for Option<Rc<RefCell<T>>> {}
