//! Bit-level I/O against a byte source or sink.
//!
//! This module provides BitReader and BitWriter for the SII codec. Both
//! operate in little-endian, LSB-first order: the first bit read from a byte
//! is its least significant bit, and the first bit of a multi-bit value is
//! the value's least significant bit.
//!
//! # Alignment Rules
//! - Byte-level access (`read_bytes` / `write_bytes`) is only legal when the
//!   stream is byte aligned; mid-byte it fails with `BitIoError::Misaligned`.
//! - BitWriter: `flush` zero-extends an incomplete final byte.
//! - BitReader: leftover bits of a partially consumed byte are buffered and
//!   handed out by the next `read_bits` call.
//!
//! # Example
//! ```
//! use ecat_sii_core::bitio::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new(Vec::new());
//! writer.write_bits(0b01, 2).unwrap();     // bits 1, 0
//! writer.write_bits(0b100101, 6).unwrap(); // bits 1, 0, 1, 0, 0, 1
//! let bytes = writer.into_inner().unwrap();
//! assert_eq!(bytes, vec![0b1001_0101]);
//!
//! let mut reader = BitReader::new(&bytes[..]);
//! assert_eq!(reader.read_bits(2).unwrap(), 0b01);
//! assert_eq!(reader.read_bits(6).unwrap(), 0b100101);
//! ```

use std::io::{self, Read, Write};

use crate::error::{BitIoError, Error, Result};

/// Width of one byte of the underlying stream.
pub const BITS_PER_BYTE: u8 = 8;

/// Largest bit count accepted by a single `read_bits` / `write_bits` call.
pub const MAX_BITS: usize = 64;

fn check_bit_count(count: usize) -> Result<()> {
    if count == 0 || count > MAX_BITS {
        return Err(BitIoError::InvalidBitCount(count).into());
    }
    Ok(())
}

fn map_read_error(err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        BitIoError::OutOfData.into()
    } else {
        Error::Io(err)
    }
}

/// Reads bits LSB-first from a byte source.
///
/// # Invariants
/// - `bit_count` is always < `BITS_PER_BYTE`
/// - the stream is byte aligned exactly when `bit_count == 0`
#[derive(Debug)]
pub struct BitReader<R> {
    /// Underlying byte source
    inner: R,
    /// Unconsumed bits of the current source byte, next bit in position 0
    bit_buffer: u8,
    /// Number of valid bits left in bit_buffer
    bit_count: u8,
    /// Bits handed out since construction
    consumed: u64,
}

impl<R: Read> BitReader<R> {
    /// Create a new BitReader positioned at the start of `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            bit_buffer: 0,
            bit_count: 0,
            consumed: 0,
        }
    }

    /// Number of bits successfully read so far.
    pub fn bits_consumed(&self) -> u64 {
        self.consumed
    }

    /// True when no bits of a partially consumed byte are pending.
    pub fn is_aligned(&self) -> bool {
        self.bit_count == 0
    }

    fn require_aligned(&self) -> Result<()> {
        if !self.is_aligned() {
            return Err(BitIoError::Misaligned {
                pending: self.bit_count,
            }
            .into());
        }
        Ok(())
    }

    /// Read exactly `n` bytes.
    ///
    /// # Errors
    /// - `BitIoError::Misaligned` if bits of the current byte are still pending
    /// - `BitIoError::OutOfData` if the source holds fewer than `n` bytes
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.require_aligned()?;
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf).map_err(map_read_error)?;
        self.consumed += n as u64 * u64::from(BITS_PER_BYTE);
        Ok(buf)
    }

    /// Read every byte left in the source.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        self.require_aligned()?;
        let mut buf = Vec::new();
        self.inner.read_to_end(&mut buf)?;
        self.consumed += buf.len() as u64 * u64::from(BITS_PER_BYTE);
        Ok(buf)
    }

    /// Read `count` bits (1-64) and return them as an unsigned value.
    ///
    /// Bits are taken LSB-first from each source byte and accumulated
    /// LSB-first into the result, so reading 16 bits from an aligned stream
    /// yields a little-endian `u16`.
    ///
    /// # Errors
    /// - `BitIoError::InvalidBitCount` if count is 0 or greater than 64
    /// - `BitIoError::OutOfData` if the source is exhausted mid-read
    pub fn read_bits(&mut self, count: usize) -> Result<u64> {
        check_bit_count(count)?;

        let mut result = 0u64;
        let mut filled = 0usize;

        while filled < count {
            if self.bit_count == 0 {
                self.bit_buffer = self.next_byte()?;
                self.bit_count = BITS_PER_BYTE;
            }

            // Take as many bits as the current byte still holds
            let take = (count - filled).min(self.bit_count as usize);
            let mask = ((1u16 << take) - 1) as u8;
            let bits = self.bit_buffer & mask;

            result |= u64::from(bits) << filled;

            self.bit_buffer = (u16::from(self.bit_buffer) >> take) as u8;
            self.bit_count -= take as u8;
            filled += take;
        }

        self.consumed += count as u64;
        Ok(result)
    }

    /// Read a single bit.
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    fn next_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.inner.read_exact(&mut byte).map_err(map_read_error)?;
        Ok(byte[0])
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the reader and return the underlying source.
    ///
    /// Pending bits of a partially consumed byte are discarded.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Writes bits LSB-first into a byte sink.
///
/// Completed bytes are forwarded to the sink as soon as their last bit is
/// written; only an incomplete byte is held back until `flush`.
///
/// # Invariants
/// - `bit_count` is always < `BITS_PER_BYTE`
#[derive(Debug)]
pub struct BitWriter<W: Write> {
    /// Underlying byte sink
    inner: W,
    /// Accumulator for the current partial byte (filled from bit 0 upward)
    bit_buffer: u8,
    /// Number of bits in bit_buffer
    bit_count: u8,
}

impl<W: Write> BitWriter<W> {
    /// Create a new BitWriter emitting into `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bit_buffer: 0,
            bit_count: 0,
        }
    }

    /// True when no bits of a partial byte are pending.
    pub fn is_aligned(&self) -> bool {
        self.bit_count == 0
    }

    /// Write raw bytes.
    ///
    /// # Errors
    /// Returns `BitIoError::Misaligned` if a partial byte is pending.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        if !self.is_aligned() {
            return Err(BitIoError::Misaligned {
                pending: self.bit_count,
            }
            .into());
        }
        self.inner.write_all(data)?;
        Ok(())
    }

    /// Write the low `count` bits (1-64) of `value`, LSB-first.
    ///
    /// When the stream is aligned and `count` is a whole number of bytes the
    /// value is emitted directly as little-endian bytes; this produces the
    /// same output as the bit-by-bit path.
    ///
    /// # Errors
    /// Returns `BitIoError::InvalidBitCount` if count is 0 or greater than 64.
    pub fn write_bits(&mut self, value: u64, count: usize) -> Result<()> {
        check_bit_count(count)?;

        if self.is_aligned() && count % BITS_PER_BYTE as usize == 0 {
            let bytes = value.to_le_bytes();
            return self.write_bytes(&bytes[..count / BITS_PER_BYTE as usize]);
        }

        let mut remaining = count;
        let mut val = value;

        while remaining > 0 {
            // How many bits still fit into the pending byte?
            let space = (BITS_PER_BYTE - self.bit_count) as usize;
            let take = remaining.min(space);
            let mask = ((1u16 << take) - 1) as u8;

            self.bit_buffer |= ((val as u8) & mask) << self.bit_count;
            self.bit_count += take as u8;

            if self.bit_count == BITS_PER_BYTE {
                self.inner.write_all(&[self.bit_buffer])?;
                self.bit_buffer = 0;
                self.bit_count = 0;
            }

            val >>= take;
            remaining -= take;
        }

        Ok(())
    }

    /// Write a single bit.
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.write_bits(u64::from(bit), 1)
    }

    /// Emit any partially filled byte (zero-extended) and flush the sink.
    pub fn flush(&mut self) -> Result<()> {
        if self.bit_count > 0 {
            self.inner.write_all(&[self.bit_buffer])?;
            self.bit_buffer = 0;
            self.bit_count = 0;
        }
        self.inner.flush()?;
        Ok(())
    }

    /// Flush and return the underlying sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.inner)
    }
}
