//! Leaf node kinds: integers, enumerations, padding, strings and opaque blobs.
//!
//! Every leaf knows how to consume itself from a [`BitReader`] and produce
//! itself into a [`BitWriter`]. Setters validate before they mutate, so a
//! rejected assignment never changes the stored value.

use std::borrow::Cow;
use std::fmt;
use std::io::{Read, Write};

use crate::bitio::{BitReader, BitWriter};
use crate::error::{BitIoError, Result, ValueError};

/// Maximum content length of a length-prefixed string, in bytes.
pub const MAX_STRING_LEN: usize = u8::MAX as usize;

/// Widths an integer node can hold.
pub const INT_BITS: std::ops::RangeInclusive<u8> = 1..=64;

fn fits_in(value: u64, bits: u8) -> bool {
    bits >= 64 || value >> bits == 0
}

/// Unsigned integer of 1-64 bits with optional inclusive bounds.
///
/// Bounds are checked on assignment only; decode accepts whatever the
/// source holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntNode {
    bits: u8,
    value: u64,
    bounds: Option<(u64, u64)>,
}

impl IntNode {
    /// Unbounded integer of `bits` bits, holding zero.
    ///
    /// `bits` must lie in [`INT_BITS`]; any other width is rejected by
    /// `set_value`, `decode` and `encode` with `BitIoError::InvalidBitCount`.
    pub fn new(bits: u8) -> Self {
        Self {
            bits,
            value: 0,
            bounds: None,
        }
    }

    /// An integer whose assignments must fall within `min..=max`.
    ///
    /// The width contract of [`IntNode::new`] applies.
    pub fn bounded(bits: u8, min: u64, max: u64) -> Self {
        Self {
            bits,
            value: 0,
            bounds: Some((min.min(max), min.max(max))),
        }
    }

    /// Width in bits.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// The stored value.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Inclusive `(min, max)` assignment bounds, if any.
    pub fn bounds(&self) -> Option<(u64, u64)> {
        self.bounds
    }

    /// Assign a new value.
    ///
    /// # Errors
    /// - `ValueError::OutOfRange` if the value lies outside the bounds
    /// - `ValueError::TooWide` if the value needs more than `bits` bits
    /// - `BitIoError::InvalidBitCount` if the node's width is outside 1-64
    pub fn set_value(&mut self, value: u64) -> Result<()> {
        if !INT_BITS.contains(&self.bits) {
            return Err(BitIoError::InvalidBitCount(self.bits as usize).into());
        }
        if let Some((min, max)) = self.bounds {
            if value < min || value > max {
                return Err(ValueError::OutOfRange { value, min, max }.into());
            }
        }
        if !fits_in(value, self.bits) {
            return Err(ValueError::TooWide {
                value,
                bits: self.bits,
            }
            .into());
        }
        self.value = value;
        Ok(())
    }

    /// Read `bits` bits; bounds are not checked.
    pub fn decode<R: Read>(&mut self, reader: &mut BitReader<R>) -> Result<()> {
        self.value = reader.read_bits(self.bits as usize)?;
        Ok(())
    }

    /// Write the value in `bits` bits.
    pub fn encode<W: Write>(&self, writer: &mut BitWriter<W>) -> Result<()> {
        writer.write_bits(self.value, self.bits as usize)
    }
}

impl fmt::Display for IntNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:X})", self.value, self.value)
    }
}

/// Raw code to label table of an enumeration.
///
/// Reverse lookups resolve to the first entry carrying a label.
pub type EnumOptions = &'static [(u64, &'static str)];

/// An integer whose raw codes map to symbolic labels.
///
/// Decoding an unmapped code keeps the code verbatim; it renders as `???`
/// and re-encodes unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumNode {
    raw: IntNode,
    options: EnumOptions,
}

impl EnumNode {
    /// New enumeration holding the first option's code.
    ///
    /// `bits` follows the width contract of [`IntNode::new`].
    pub fn new(bits: u8, options: EnumOptions) -> Self {
        let mut raw = IntNode::new(bits);
        raw.value = options.first().map_or(0, |(code, _)| *code);
        Self { raw, options }
    }

    /// Width of the raw code in bits.
    pub fn bits(&self) -> u8 {
        self.raw.bits
    }

    /// The raw code, whether or not it has a label.
    pub fn raw(&self) -> u64 {
        self.raw.value
    }

    /// The label of the current code, `None` when the code is unmapped.
    pub fn label(&self) -> Option<&'static str> {
        self.options
            .iter()
            .find(|(code, _)| *code == self.raw.value)
            .map(|(_, label)| *label)
    }

    /// The code to label table.
    pub fn options(&self) -> EnumOptions {
        self.options
    }

    /// Assign by label.
    ///
    /// # Errors
    /// Returns `ValueError::InvalidLabel` if `label` is not in the option set.
    pub fn set_label(&mut self, label: &str) -> Result<()> {
        match self.options.iter().find(|(_, l)| *l == label) {
            Some((code, _)) => {
                self.raw.value = *code;
                Ok(())
            }
            None => {
                let expected = self
                    .options
                    .iter()
                    .map(|(_, l)| *l)
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(ValueError::InvalidLabel {
                    label: label.to_string(),
                    expected,
                }
                .into())
            }
        }
    }

    pub fn decode<R: Read>(&mut self, reader: &mut BitReader<R>) -> Result<()> {
        self.raw.decode(reader)
    }

    pub fn encode<W: Write>(&self, writer: &mut BitWriter<W>) -> Result<()> {
        self.raw.encode(writer)
    }
}

impl fmt::Display for EnumNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:X})", self.label().unwrap_or("???"), self.raw.value)
    }
}

/// Granularity of a padding node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadUnit {
    Bytes,
    Bits,
}

/// Filler that carries no value: discarded on decode, regenerated on encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Padding {
    unit: PadUnit,
    len: usize,
    ones: bool,
}

impl Padding {
    /// `len` bytes of zero filler.
    pub fn bytes(len: usize) -> Self {
        Self {
            unit: PadUnit::Bytes,
            len,
            ones: false,
        }
    }

    /// `len` bits of zero filler; `len` must be 1-64.
    pub fn bits(len: usize) -> Self {
        Self {
            unit: PadUnit::Bits,
            len,
            ones: false,
        }
    }

    /// Emit all-one filler instead of all-zero.
    pub fn with_ones(mut self) -> Self {
        self.ones = true;
        self
    }

    /// Whether `len` counts bytes or bits.
    pub fn unit(&self) -> PadUnit {
        self.unit
    }

    /// Filler length in units of [`Padding::unit`].
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when encode emits one bits.
    pub fn fills_ones(&self) -> bool {
        self.ones
    }

    pub fn decode<R: Read>(&mut self, reader: &mut BitReader<R>) -> Result<()> {
        match self.unit {
            PadUnit::Bytes => {
                reader.read_bytes(self.len)?;
            }
            PadUnit::Bits => {
                reader.read_bits(self.len)?;
            }
        }
        Ok(())
    }

    pub fn encode<W: Write>(&self, writer: &mut BitWriter<W>) -> Result<()> {
        match self.unit {
            PadUnit::Bytes => {
                let fill = if self.ones { 0xFF } else { 0x00 };
                writer.write_bytes(&vec![fill; self.len])
            }
            PadUnit::Bits => {
                let fill = if self.ones { u64::MAX } else { 0 };
                writer.write_bits(fill, self.len)
            }
        }
    }
}

impl fmt::Display for Padding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            PadUnit::Bytes => write!(f, "NullBytes({})", self.len),
            PadUnit::Bits => write!(f, "NullBits({})", self.len),
        }
    }
}

/// Length-prefixed byte string: one length byte, then that many raw bytes.
///
/// Content is kept as raw bytes so non-text data round-trips unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrNode {
    bytes: Vec<u8>,
}

impl StrNode {
    /// Empty string.
    pub fn new() -> Self {
        Self::default()
    }

    /// A string holding the UTF-8 encoding of `text`.
    pub fn from_text(text: &str) -> Result<Self> {
        Self::from_bytes(text.as_bytes().to_vec())
    }

    /// A string holding raw `bytes`.
    ///
    /// # Errors
    /// Returns `ValueError::StringTooLong` above 255 bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() > MAX_STRING_LEN {
            return Err(ValueError::StringTooLong { len: bytes.len() }.into());
        }
        Ok(Self { bytes })
    }

    /// Raw content bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Content decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Content length in bytes, without the prefix.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// # Errors
    /// Returns `ValueError::StringTooLong` if the UTF-8 form exceeds 255 bytes.
    pub fn set_text(&mut self, text: &str) -> Result<()> {
        *self = Self::from_text(text)?;
        Ok(())
    }

    /// Replace the content with raw bytes, under the same limit.
    pub fn set_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        *self = Self::from_bytes(bytes.to_vec())?;
        Ok(())
    }

    pub fn decode<R: Read>(&mut self, reader: &mut BitReader<R>) -> Result<()> {
        let len = reader.read_bits(8)? as usize;
        self.bytes = reader.read_bytes(len)?;
        Ok(())
    }

    pub fn encode<W: Write>(&self, writer: &mut BitWriter<W>) -> Result<()> {
        writer.write_bits(self.bytes.len() as u64, 8)?;
        writer.write_bytes(&self.bytes)
    }
}

impl fmt::Display for StrNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Opaque payload: swallows the rest of a bounded source and re-emits it
/// verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blob {
    bytes: Vec<u8>,
}

impl Blob {
    /// A blob holding `bytes` verbatim.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Raw content bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Content length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn decode<R: Read>(&mut self, reader: &mut BitReader<R>) -> Result<()> {
        self.bytes = reader.read_to_end()?;
        Ok(())
    }

    pub fn encode<W: Write>(&self, writer: &mut BitWriter<W>) -> Result<()> {
        writer.write_bytes(&self.bytes)
    }
}

impl fmt::Display for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Bytes", self.bytes.len())
    }
}
