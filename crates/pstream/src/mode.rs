/// Serialization format of one stream direction.
///
/// Input and output modes are independent and may be changed at any time;
/// a change is never retroactive and affects only subsequent operations.
/// The two tagged modes are interchangeable on input — readers detect
/// which one was used from the first non-blank byte of each value — so
/// the mode choice only matters on output. Raw modes are never
/// auto-detected and never mix with tagged data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Tagged text: explicit counts and brackets, human-editable, always
    /// round-trips.
    Ascii,
    /// Tagged binary: type/endianness markers and bulk payloads for
    /// numeric data; built for throughput.
    Binary,
    /// Untagged text: bare space-separated values, structure supplied by
    /// the caller's context.
    RawAscii,
    /// Untagged binary: bare native byte patterns.
    RawBinary,
    /// Display-oriented bracketed text; not guaranteed to round-trip.
    PrettyAscii,
}

impl Mode {
    /// The two self-describing modes that readers auto-detect between.
    pub fn is_tagged(self) -> bool {
        matches!(self, Mode::Ascii | Mode::Binary)
    }
}

/// Output-side packing policy for homogeneous float buffers.
///
/// Never consulted on input: every packed block is self-describing and
/// auto-detected from its marker and type tag. Integer buffers ignore
/// the setting entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionMode {
    /// Store elements densely at full width.
    #[default]
    None,
    /// Store f64 elements as f32.
    NarrowFloat,
    /// Omit zero elements, storing (index, value) pairs.
    Sparse,
    /// Sparse layout with f64 values narrowed to f32.
    LossySparse,
}
