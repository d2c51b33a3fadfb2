//! Bit-level failures.

use std::fmt;

/// Result type for bitstream operations.
pub type BitResult<T> = Result<T, BitError>;

/// Failures raised by [`BitWriter`](crate::BitWriter) and [`BitReader`](crate::BitReader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitError {
    /// The input ended before the requested bits.
    UnexpectedEof {
        /// Bits the operation needed.
        requested: usize,
        /// Bits left in the input.
        available: usize,
    },

    /// A field width above 64 bits was requested.
    InvalidBitCount { bits: u8, max_bits: u8 },

    /// The value does not fit the declared field width.
    ValueOutOfRange { value: u64, bits: u8 },

    /// A byte-aligned access was attempted in the middle of a byte.
    MisalignedAccess {
        /// Bit position at the time of the access.
        bit_position: usize,
    },
}

impl fmt::Display for BitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof {
                requested,
                available,
            } => write!(
                f,
                "input ended: {requested} bits requested, {available} available"
            ),
            Self::InvalidBitCount { bits, max_bits } => {
                write!(f, "field width {bits} exceeds {max_bits} bits")
            }
            Self::ValueOutOfRange { value, bits } => {
                write!(f, "value {value:#x} does not fit in {bits} bits")
            }
            Self::MisalignedAccess { bit_position } => {
                write!(f, "byte-aligned access at bit {bit_position}")
            }
        }
    }
}

impl std::error::Error for BitError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BitReader, BitWriter};

    #[test]
    fn eof_reports_shortfall() {
        let err = BitReader::new(&[0x01]).read_bits(12).unwrap_err();
        assert_eq!(
            err,
            BitError::UnexpectedEof {
                requested: 12,
                available: 8
            }
        );
        assert_eq!(err.to_string(), "input ended: 12 bits requested, 8 available");
    }

    #[test]
    fn out_of_range_shows_hex_value() {
        let err = BitWriter::new().write_bits(0x80, 7).unwrap_err();
        assert_eq!(err, BitError::ValueOutOfRange { value: 0x80, bits: 7 });
        assert!(err.to_string().contains("0x80"));
    }

    #[test]
    fn misaligned_names_position() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b10, 2).unwrap();
        let err = writer.write_u16_aligned(12).unwrap_err();
        assert_eq!(err.to_string(), "byte-aligned access at bit 2");
    }

    #[test]
    fn is_std_error() {
        fn assert_error<E: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<BitError>();
    }
}
