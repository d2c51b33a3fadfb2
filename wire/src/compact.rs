//! Compact unsigned integers.
//!
//! A compact integer starts with a unary prefix: `k` zero bits followed by a
//! one bit select a width class, and the payload follows in the remaining bits
//! of the class. Eight zero bits (the byte `0x00`) encode the value zero.

use bitstream::{BitReader, BitWriter};

use crate::encoding::{Decode, Encode};
use crate::error::{WireError, WireResult};

/// Width class of a compact unsigned integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompactWidth {
    /// The value zero, a single `0x00` byte.
    Zero,
    Bits7,
    Bits14,
    Bits21,
    Bits28,
    Bits35,
    Bits42,
    Bits49,
    /// Prefix byte `0x80` followed by eight little-endian bytes.
    Bits64,
}

impl CompactWidth {
    /// Returns the narrowest class that holds `value`.
    #[must_use]
    pub const fn classify(value: u64) -> Self {
        match value {
            0 => Self::Zero,
            0x01..=0x7F => Self::Bits7,
            0x80..=0x3FFF => Self::Bits14,
            0x4000..=0x1F_FFFF => Self::Bits21,
            0x20_0000..=0xFFF_FFFF => Self::Bits28,
            0x1000_0000..=0x7_FFFF_FFFF => Self::Bits35,
            0x8_0000_0000..=0x3FF_FFFF_FFFF => Self::Bits42,
            0x400_0000_0000..=0x1_FFFF_FFFF_FFFF => Self::Bits49,
            _ => Self::Bits64,
        }
    }

    /// Number of zero bits before the terminating one bit of the prefix.
    #[must_use]
    pub const fn leading_zeros(self) -> u8 {
        match self {
            Self::Bits7 => 0,
            Self::Bits14 => 1,
            Self::Bits21 => 2,
            Self::Bits28 => 3,
            Self::Bits35 => 4,
            Self::Bits42 => 5,
            Self::Bits49 => 6,
            Self::Bits64 => 7,
            Self::Zero => 8,
        }
    }

    /// Number of payload bits after the prefix.
    #[must_use]
    pub const fn payload_bits(self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::Bits64 => 64,
            other => 7 * (other.leading_zeros() + 1),
        }
    }

    /// Total encoded size in bytes.
    #[must_use]
    pub const fn encoded_len(self) -> usize {
        match self {
            Self::Zero => 1,
            Self::Bits64 => 9,
            other => other.leading_zeros() as usize + 1,
        }
    }

    const fn from_leading_zeros(zeros: u8) -> Self {
        match zeros {
            0 => Self::Bits7,
            1 => Self::Bits14,
            2 => Self::Bits21,
            3 => Self::Bits28,
            4 => Self::Bits35,
            5 => Self::Bits42,
            6 => Self::Bits49,
            7 => Self::Bits64,
            _ => Self::Zero,
        }
    }
}

/// A `u64` carried in compact form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CompactU64(u64);

impl CompactU64 {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn width(self) -> CompactWidth {
        CompactWidth::classify(self.0)
    }

    #[must_use]
    pub const fn encoded_len(self) -> usize {
        self.width().encoded_len()
    }
}

impl From<u64> for CompactU64 {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<CompactU64> for u64 {
    fn from(value: CompactU64) -> Self {
        value.0
    }
}

impl Encode for CompactU64 {
    fn encode(&self, writer: &mut BitWriter) -> WireResult<()> {
        let width = self.width();
        if width == CompactWidth::Zero {
            writer.write_bits(0, 8)?;
            return Ok(());
        }
        writer.write_unary(width.leading_zeros())?;
        writer.write_bits(self.0, width.payload_bits())?;
        Ok(())
    }
}

impl Decode for CompactU64 {
    fn decode(reader: &mut BitReader<'_>) -> WireResult<Self> {
        let zeros = reader.read_unary(8)?;
        let width = CompactWidth::from_leading_zeros(zeros);
        if width == CompactWidth::Zero {
            return Ok(Self(0));
        }
        let value = reader.read_bits(width.payload_bits())?;
        if CompactWidth::classify(value) != width {
            return Err(WireError::MalformedCompactInt {
                value,
                encoded_len: width.encoded_len(),
            });
        }
        Ok(Self(value))
    }
}

/// Writes `value` in compact form.
pub fn write_compact(writer: &mut BitWriter, value: u64) -> WireResult<()> {
    CompactU64(value).encode(writer)
}

/// Reads a compact integer and returns its value.
pub fn read_compact(reader: &mut BitReader<'_>) -> WireResult<u64> {
    CompactU64::decode(reader).map(CompactU64::value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: u64) -> Vec<u8> {
        CompactU64::new(value).to_bytes().unwrap()
    }

    #[test]
    fn zero_is_single_zero_byte() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(CompactU64::decode_from(&[0x00], 0).unwrap(), (CompactU64(0), 1));
    }

    #[test]
    fn reference_bytes() {
        assert_eq!(encode(1), vec![0x03]);
        assert_eq!(encode(0x7F), vec![0xFF]);
        assert_eq!(encode(0x80), vec![0x02, 0x02]);
        assert_eq!(encode(0x4000), vec![0x04, 0x00, 0x02]);
        let mut max = vec![0x80];
        max.extend_from_slice(&u64::MAX.to_le_bytes());
        assert_eq!(encode(u64::MAX), max);
    }

    #[test]
    fn width_boundaries() {
        let cases = [
            (0x7F, 1),
            (0x80, 2),
            (0x3FFF, 2),
            (0x4000, 3),
            (0x1F_FFFF, 3),
            (0x20_0000, 4),
            (0xFFF_FFFF, 4),
            (0x1000_0000, 5),
            (0x7_FFFF_FFFF, 5),
            (0x8_0000_0000, 6),
            (0x3FF_FFFF_FFFF, 6),
            (0x400_0000_0000, 7),
            (0x1_FFFF_FFFF_FFFF, 7),
            (0x2_0000_0000_0000, 9),
        ];
        for (value, len) in cases {
            let bytes = encode(value);
            assert_eq!(bytes.len(), len, "length for {value:#x}");
            assert_eq!(CompactU64::new(value).encoded_len(), len);
            let (decoded, consumed) = CompactU64::decode_from(&bytes, 0).unwrap();
            assert_eq!(decoded.value(), value);
            assert_eq!(consumed, len);
        }
    }

    #[test]
    fn non_minimal_encoding_is_rejected() {
        // Zero in the 7-bit class.
        let err = CompactU64::decode_from(&[0x01], 0).unwrap_err();
        assert_eq!(
            err,
            WireError::MalformedCompactInt {
                value: 0,
                encoded_len: 1
            }
        );
        // 1 in the 14-bit class.
        let err = CompactU64::decode_from(&[0x06, 0x00], 0).unwrap_err();
        assert!(matches!(err, WireError::MalformedCompactInt { value: 1, .. }));
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let bytes = encode(0x4000);
        let err = CompactU64::decode_from(&bytes[..2], 0).unwrap_err();
        assert!(matches!(err, WireError::TruncatedInput { .. }));
        let err = CompactU64::decode_from(&[], 0).unwrap_err();
        assert!(matches!(err, WireError::TruncatedInput { .. }));
    }

    #[test]
    fn decode_at_offset() {
        let mut buf = vec![0xAA, 0xBB];
        buf.extend(encode(300));
        let (value, consumed) = CompactU64::decode_from(&buf, 2).unwrap();
        assert_eq!(value.value(), 300);
        assert_eq!(consumed, 2);
    }

    #[test]
    fn classify_is_minimal() {
        assert_eq!(CompactWidth::classify(0), CompactWidth::Zero);
        assert_eq!(CompactWidth::classify(1), CompactWidth::Bits7);
        assert_eq!(CompactWidth::classify(u64::MAX), CompactWidth::Bits64);
        assert_eq!(CompactWidth::Bits49.payload_bits(), 49);
        assert_eq!(CompactWidth::Bits64.leading_zeros(), 7);
    }
}
