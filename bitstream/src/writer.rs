//! Bit-level writer.

use crate::error::{BitError, BitResult};

/// Appends bit fields to a growable byte buffer.
///
/// Each byte fills from its least significant bit. A field is written low bit
/// first, so one that spans bytes reads back as a little-endian integer and
/// the first field of a byte can be recovered with a plain mask
/// (`byte & 0x03` for a 2-bit marker).
///
/// Unused high bits of a partially filled byte are zero, both after
/// [`align_to_byte`](Self::align_to_byte) and in the buffer returned by
/// [`finish`](Self::finish).
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    /// Output so far. A partially filled byte is already the last element.
    bytes: Vec<u8>,
    /// Bits used in the last byte, zero when it is full or absent.
    used_bits: u8,
}

impl BitWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty writer with room for `bytes` bytes.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            used_bits: 0,
        }
    }

    #[must_use]
    pub fn bits_written(&self) -> usize {
        let full = self.bytes.len() * 8;
        if self.used_bits == 0 {
            full
        } else {
            full - 8 + usize::from(self.used_bits)
        }
    }

    /// Returns `true` if the next write starts on a byte boundary.
    #[must_use]
    pub const fn is_aligned(&self) -> bool {
        self.used_bits == 0
    }

    /// Writes a single bit.
    pub fn write_bool(&mut self, value: bool) {
        self.push_chunk(u8::from(value), 1);
    }

    /// Writes the low `bits` bits of `value`, low bit first.
    ///
    /// # Errors
    ///
    /// [`BitError::InvalidBitCount`] if `bits > 64`, and
    /// [`BitError::ValueOutOfRange`] if `value` has bits set above `bits`.
    pub fn write_bits(&mut self, value: u64, bits: u8) -> BitResult<()> {
        if bits > 64 {
            return Err(BitError::InvalidBitCount { bits, max_bits: 64 });
        }
        if bits < 64 && value >> bits != 0 {
            return Err(BitError::ValueOutOfRange { value, bits });
        }

        let mut rest = value;
        let mut left = bits;
        while left > 0 {
            let take = (8 - self.used_bits).min(left);
            let mask = (1u64 << take) - 1;
            self.push_chunk((rest & mask).to_le_bytes()[0], take);
            rest >>= take;
            left -= take;
        }
        Ok(())
    }

    /// Writes `zeros` zero bits followed by a single one bit.
    ///
    /// This is the unary prefix that opens compact integers and extended
    /// GUIDs.
    pub fn write_unary(&mut self, zeros: u8) -> BitResult<()> {
        let mut left = zeros;
        while left > 0 {
            let take = left.min(64);
            self.write_bits(0, take)?;
            left -= take;
        }
        self.write_bool(true);
        Ok(())
    }

    /// Zero-pads up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        self.used_bits = 0;
    }

    /// Writes a byte-aligned `u8`.
    pub fn write_u8_aligned(&mut self, value: u8) -> BitResult<()> {
        self.write_bytes(&[value])
    }

    /// Writes a byte-aligned little-endian `u16`.
    pub fn write_u16_aligned(&mut self, value: u16) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a byte-aligned little-endian `u32`.
    pub fn write_u32_aligned(&mut self, value: u32) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a byte-aligned little-endian `u64`.
    pub fn write_u64_aligned(&mut self, value: u64) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Copies raw bytes to the output.
    ///
    /// # Errors
    ///
    /// [`BitError::MisalignedAccess`] unless the writer is on a byte boundary.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> BitResult<()> {
        if !self.is_aligned() {
            return Err(BitError::MisalignedAccess {
                bit_position: self.bits_written(),
            });
        }
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }

    /// Returns the encoded bytes.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }

    /// Appends the encoded bytes to `buf`.
    pub fn finish_into(mut self, buf: &mut Vec<u8>) {
        buf.append(&mut self.bytes);
    }

    /// Places the low `width` bits of `chunk` into the current byte.
    /// `width` never exceeds the room left in that byte.
    fn push_chunk(&mut self, chunk: u8, width: u8) {
        if self.used_bits == 0 {
            self.bytes.push(0);
        }
        if let Some(last) = self.bytes.last_mut() {
            *last |= chunk << self.used_bits;
        }
        self.used_bits = (self.used_bits + width) % 8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(f: impl FnOnce(&mut BitWriter)) -> Vec<u8> {
        let mut writer = BitWriter::new();
        f(&mut writer);
        writer.finish()
    }

    #[test]
    fn first_bit_is_least_significant() {
        assert_eq!(written(|w| w.write_bool(true)), vec![0x01]);
        assert_eq!(written(|w| w.write_bool(false)), vec![0x00]);
    }

    #[test]
    fn bits_written_tracks_partial_bytes() {
        let mut writer = BitWriter::new();
        assert_eq!(writer.bits_written(), 0);
        writer.write_bits(0b101, 3).unwrap();
        assert_eq!(writer.bits_written(), 3);
        writer.write_bits(0x1F, 5).unwrap();
        assert_eq!(writer.bits_written(), 8);
        assert!(writer.is_aligned());
        writer.write_bool(true);
        assert_eq!(writer.bits_written(), 9);
    }

    #[test]
    fn compact_one_is_0x03() {
        // Unary prefix with no zeros, then the 7-bit payload 1.
        let bytes = written(|w| {
            w.write_unary(0).unwrap();
            w.write_bits(1, 7).unwrap();
        });
        assert_eq!(bytes, vec![0x03]);
    }

    #[test]
    fn exguid_five_bit_prefix_is_0x04() {
        let bytes = written(|w| {
            w.write_unary(2).unwrap();
            w.write_bits(0, 5).unwrap();
        });
        assert_eq!(bytes, vec![0x04]);
    }

    #[test]
    fn unary_prefix_can_span_bytes() {
        let bytes = written(|w| w.write_unary(9).unwrap());
        assert_eq!(bytes, vec![0x00, 0x02]);
    }

    #[test]
    fn start16_header_fields() {
        // Marker 00, compound flag, 6-bit type 0x02, 7-bit length 3.
        let bytes = written(|w| {
            w.write_bits(0b00, 2).unwrap();
            w.write_bool(true);
            w.write_bits(0x02, 6).unwrap();
            w.write_bits(3, 7).unwrap();
        });
        assert_eq!(bytes, vec![0x14, 0x06]);
    }

    #[test]
    fn wide_field_is_little_endian() {
        assert_eq!(written(|w| w.write_bits(0xABCD, 16).unwrap()), vec![0xCD, 0xAB]);
        assert_eq!(
            written(|w| w.write_bits(u64::MAX, 64).unwrap()),
            vec![0xFF; 8]
        );
    }

    #[test]
    fn field_continues_in_next_byte() {
        let bytes = written(|w| {
            w.write_bits(0b1111, 4).unwrap();
            w.write_bits(0b1010_1010, 8).unwrap();
        });
        assert_eq!(bytes, vec![0b1010_1111, 0b0000_1010]);
    }

    #[test]
    fn zero_width_is_a_no_op() {
        let mut writer = BitWriter::new();
        writer.write_bits(0, 0).unwrap();
        assert!(writer.finish().is_empty());
    }

    #[test]
    fn rejects_bad_widths_and_values() {
        let mut writer = BitWriter::new();
        assert_eq!(
            writer.write_bits(0, 65),
            Err(BitError::InvalidBitCount {
                bits: 65,
                max_bits: 64
            })
        );
        assert_eq!(
            writer.write_bits(0x80, 7),
            Err(BitError::ValueOutOfRange { value: 0x80, bits: 7 })
        );
        assert_eq!(
            writer.write_bits(1, 0),
            Err(BitError::ValueOutOfRange { value: 1, bits: 0 })
        );
        assert_eq!(writer.bits_written(), 0);
    }

    #[test]
    fn preamble_is_little_endian() {
        let bytes = written(|w| {
            w.write_u16_aligned(12).unwrap();
            w.write_u16_aligned(11).unwrap();
            w.write_u32_aligned(0x1234_5678).unwrap();
        });
        assert_eq!(bytes, vec![0x0C, 0x00, 0x0B, 0x00, 0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn aligned_write_needs_boundary() {
        let mut writer = BitWriter::new();
        writer.write_bool(true);
        assert_eq!(
            writer.write_u8_aligned(0xFF),
            Err(BitError::MisalignedAccess { bit_position: 1 })
        );
        writer.align_to_byte();
        writer.write_bytes(&[0xAA, 0xBB]).unwrap();
        assert_eq!(writer.finish(), vec![0x01, 0xAA, 0xBB]);
    }

    #[test]
    fn finish_into_appends() {
        let mut writer = BitWriter::with_capacity(4);
        writer.write_bits(0xAB, 8).unwrap();
        let mut buf = vec![0x00, 0x11];
        writer.finish_into(&mut buf);
        assert_eq!(buf, vec![0x00, 0x11, 0xAB]);
    }
}
