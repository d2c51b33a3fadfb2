//! Bit-level reader.

use crate::error::{BitError, BitResult};

/// Reads bit fields back out of a borrowed byte slice.
///
/// The inverse of [`BitWriter`](crate::BitWriter): bits come off the low end
/// of each byte and multi-bit fields are assembled low bit first.
///
/// Every read is bounds-checked and a failed read leaves the position where
/// it was. Cloning is cheap; decoders clone a reader to look ahead.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Creates a reader positioned at byte `offset` of `data`.
    ///
    /// An offset past the end yields an empty reader.
    #[must_use]
    pub fn at_offset(data: &'a [u8], offset: usize) -> Self {
        let bit_pos = offset.min(data.len()).saturating_mul(8);
        Self { data, bit_pos }
    }

    #[must_use]
    pub const fn bits_remaining(&self) -> usize {
        self.data
            .len()
            .saturating_mul(8)
            .saturating_sub(self.bit_pos)
    }

    /// Whole bytes left after the current position.
    #[must_use]
    pub const fn bytes_remaining(&self) -> usize {
        self.bits_remaining() / 8
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits_remaining() == 0
    }

    #[must_use]
    pub const fn bit_position(&self) -> usize {
        self.bit_pos
    }

    /// Byte offset of the next aligned read. A partly read byte counts as
    /// consumed.
    #[must_use]
    pub const fn byte_position(&self) -> usize {
        self.bit_pos.div_ceil(8)
    }

    #[must_use]
    pub const fn is_aligned(&self) -> bool {
        self.bit_pos % 8 == 0
    }

    /// Reads one bit.
    pub fn read_bit(&mut self) -> BitResult<bool> {
        self.ensure_bits(1)?;
        let bit = (self.data[self.bit_pos / 8] >> (self.bit_pos % 8)) & 1;
        self.bit_pos += 1;
        Ok(bit == 1)
    }

    /// Reads a `bits`-wide field, low bit first.
    pub fn read_bits(&mut self, bits: u8) -> BitResult<u64> {
        if bits > 64 {
            return Err(BitError::InvalidBitCount { bits, max_bits: 64 });
        }
        self.ensure_bits(usize::from(bits))?;

        let width = usize::from(bits);
        let mut value = 0u64;
        let mut filled = 0usize;
        while filled < width {
            let offset = self.bit_pos % 8;
            let take = (8 - offset).min(width - filled);
            let byte = u64::from(self.data[self.bit_pos / 8] >> offset);
            value |= (byte & ((1u64 << take) - 1)) << filled;
            self.bit_pos += take;
            filled += take;
        }
        Ok(value)
    }

    /// Counts zero bits up to and including the first one bit, stopping
    /// after `max_zeros` zeros without reading further.
    ///
    /// Returns the number of zeros read. A result of `max_zeros` means no
    /// terminating one bit was consumed.
    pub fn read_unary(&mut self, max_zeros: u8) -> BitResult<u8> {
        let start = self.bit_pos;
        let mut zeros = 0u8;
        while zeros < max_zeros {
            match self.read_bit() {
                Ok(true) => return Ok(zeros),
                Ok(false) => zeros += 1,
                Err(err) => {
                    self.bit_pos = start;
                    return Err(err);
                }
            }
        }
        Ok(zeros)
    }

    /// Reads a field without advancing.
    pub fn peek_bits(&self, bits: u8) -> BitResult<u64> {
        self.clone().read_bits(bits)
    }

    /// Skips to the next byte boundary.
    pub fn align_to_byte(&mut self) -> BitResult<()> {
        let rem = self.bit_pos % 8;
        if rem != 0 {
            self.ensure_bits(8 - rem)?;
            self.bit_pos += 8 - rem;
        }
        Ok(())
    }

    pub fn read_u8_aligned(&mut self) -> BitResult<u8> {
        let [value] = self.read_array::<1>()?;
        Ok(value)
    }

    /// Reads a byte-aligned little-endian `u16`.
    pub fn read_u16_aligned(&mut self) -> BitResult<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Reads a byte-aligned little-endian `u32`.
    pub fn read_u32_aligned(&mut self) -> BitResult<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Reads a byte-aligned little-endian `u64`.
    pub fn read_u64_aligned(&mut self) -> BitResult<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Reads a fixed-size byte-aligned array.
    pub fn read_array<const N: usize>(&mut self) -> BitResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Borrows the next `len` bytes.
    ///
    /// Lengths come from untrusted headers, so the bounds check happens
    /// before any caller allocates for them.
    pub fn read_bytes(&mut self, len: usize) -> BitResult<&'a [u8]> {
        if !self.is_aligned() {
            return Err(BitError::MisalignedAccess {
                bit_position: self.bit_pos,
            });
        }
        self.ensure_bits(len.saturating_mul(8))?;
        let start = self.bit_pos / 8;
        self.bit_pos += len * 8;
        Ok(&self.data[start..start + len])
    }

    fn ensure_bits(&self, bits: usize) -> BitResult<()> {
        let available = self.bits_remaining();
        if bits > available {
            return Err(BitError::UnexpectedEof {
                requested: bits,
                available,
            });
        }
        Ok(())
    }
}
