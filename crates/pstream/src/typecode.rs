//! One-byte type tags for binary records.
//!
//! A tag identifies the element type, width and byte order of the bytes
//! that follow it, so a reader with no prior type information can decode
//! a block correctly and portably. Multi-byte types get distinct
//! little-endian and big-endian tags; single-byte types are
//! order-invariant and get one.
//!
//! Tag values are constrained two ways: the lexer skips blanks and `#`
//! comments before dispatching on the next byte, so no tag may equal a
//! skippable byte (tab 0x09, newline 0x0A, carriage return 0x0D), and
//! none may collide with the block markers 0x12/0x13/0x16/0x17. That is
//! why the assignment below is not contiguous.

/// Byte order of a binary record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Byte order of the running host.
    pub const fn host() -> Self {
        if cfg!(target_endian = "big") {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }
}

pub const BOOL: u8 = 0x01;
pub const I8: u8 = 0x02;
pub const U8: u8 = 0x03;
pub const I16_LE: u8 = 0x04;
pub const I16_BE: u8 = 0x05;
pub const U16_LE: u8 = 0x06;
pub const U16_BE: u8 = 0x07;
pub const I32_LE: u8 = 0x08;
pub const I32_BE: u8 = 0x0B;
pub const U32_LE: u8 = 0x0C;
pub const U32_BE: u8 = 0x0E;
pub const I64_LE: u8 = 0x0F;
pub const I64_BE: u8 = 0x10;
pub const U64_LE: u8 = 0x11;
pub const U64_BE: u8 = 0x14;
pub const F32_LE: u8 = 0x15;
pub const F32_BE: u8 = 0x18;
pub const F64_LE: u8 = 0x19;
pub const F64_BE: u8 = 0x1A;

/// "No bulk form": elements encode one by one through their own codec.
pub const GENERIC: u8 = 0xFF;

/// Bulk sequence block written by a little-endian host.
pub const SEQ_LE: u8 = 0x12;
/// Bulk sequence block written by a big-endian host.
pub const SEQ_BE: u8 = 0x13;
/// Sparse float block written by a little-endian host.
pub const SPARSE_LE: u8 = 0x16;
/// Sparse float block written by a big-endian host.
pub const SPARSE_BE: u8 = 0x17;
