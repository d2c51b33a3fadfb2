//! Error types for wire format operations.

use std::fmt;

use bitstream::BitError;

/// Result type for wire format operations.
pub type WireResult<T> = Result<T, WireError>;

/// Errors raised while encoding or decoding primitives, basic types and
/// stream object headers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WireError {
    /// The input ended before a complete value could be read.
    TruncatedInput {
        /// Number of bits the decoder needed.
        needed: usize,
        /// Number of bits left in the input.
        available: usize,
    },

    /// A compact unsigned integer did not use its canonical width.
    MalformedCompactInt {
        /// The decoded value.
        value: u64,
        /// Number of bytes the non-canonical encoding used.
        encoded_len: usize,
    },

    /// An extended GUID could not be decoded.
    MalformedExtendedId { reason: ExGuidReason },

    /// A serial number could not be decoded.
    MalformedSerialNumber { reason: SerialNumberReason },

    /// String item content was not valid UTF-16.
    InvalidUtf16 { code_units: usize },

    /// A header's compound bit disagrees with the object type registry.
    InconsistentCompoundFlag { type_code: u16, compound: bool },

    /// A header named a type code outside the registry.
    UndefinedTypeCode { type_code: u16 },

    /// A header form marker did not match the header role being read.
    InvalidHeaderForm { expected: HeaderRole, marker: u8 },

    /// A length does not fit the requested header form.
    LengthOutOfRange { length: u64, max: u64 },

    /// A type code does not fit the requested header form.
    TypeCodeOutOfRange { type_code: u16, max: u16 },

    /// A large length followed the sentinel but fits the 15-bit field.
    NonMinimalLargeLength { length: u64 },

    /// Any other bit-level failure.
    Bitstream(BitError),
}

/// Why an extended GUID was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExGuidReason {
    /// The unary prefix does not name a defined width class.
    InvalidPrefix { leading_zeros: u8 },
    /// The value fits a narrower class than the one on the wire.
    NonMinimal { value: u32 },
    /// A non-null class carried the empty GUID.
    EmptyGuid,
}

/// Why a serial number was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialNumberReason {
    /// The leading marker byte was neither the absent nor the present form.
    InvalidMarker { marker: u8 },
    /// The present form carried the empty GUID.
    EmptyGuid,
}

/// Which half of a stream object header a decoder was reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRole {
    Start,
    End,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedInput { needed, available } => {
                write!(
                    f,
                    "truncated input: need {needed} bits, {available} available"
                )
            }
            Self::MalformedCompactInt { value, encoded_len } => {
                write!(
                    f,
                    "malformed compact integer: {value} encoded in {encoded_len} bytes"
                )
            }
            Self::MalformedExtendedId { reason } => {
                write!(f, "malformed extended GUID: {reason}")
            }
            Self::MalformedSerialNumber { reason } => {
                write!(f, "malformed serial number: {reason}")
            }
            Self::InvalidUtf16 { code_units } => {
                write!(f, "string item of {code_units} code units is not valid UTF-16")
            }
            Self::InconsistentCompoundFlag {
                type_code,
                compound,
            } => {
                write!(
                    f,
                    "compound flag {compound} is inconsistent with type 0x{type_code:02X}"
                )
            }
            Self::UndefinedTypeCode { type_code } => {
                write!(f, "undefined stream object type 0x{type_code:02X}")
            }
            Self::InvalidHeaderForm { expected, marker } => {
                write!(f, "form marker {marker:#04b} is not a {expected} header")
            }
            Self::LengthOutOfRange { length, max } => {
                write!(f, "length {length} exceeds header maximum {max}")
            }
            Self::TypeCodeOutOfRange { type_code, max } => {
                write!(
                    f,
                    "type code 0x{type_code:02X} exceeds header maximum 0x{max:02X}"
                )
            }
            Self::NonMinimalLargeLength { length } => {
                write!(f, "large length {length} is below the 0x7FFF sentinel")
            }
            Self::Bitstream(err) => write!(f, "bitstream error: {err}"),
        }
    }
}

impl fmt::Display for ExGuidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPrefix { leading_zeros } => {
                write!(f, "no width class has {leading_zeros} leading zero bits")
            }
            Self::NonMinimal { value } => write!(f, "value {value} is not minimally encoded"),
            Self::EmptyGuid => write!(f, "non-null class with empty GUID"),
        }
    }
}

impl fmt::Display for SerialNumberReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMarker { marker } => write!(f, "invalid marker 0x{marker:02X}"),
            Self::EmptyGuid => write!(f, "present form with empty GUID"),
        }
    }
}

impl fmt::Display for HeaderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::End => "end",
        };
        write!(f, "{name}")
    }
}

impl std::error::Error for WireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bitstream(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BitError> for WireError {
    fn from(err: BitError) -> Self {
        match err {
            BitError::UnexpectedEof {
                requested,
                available,
            } => Self::TruncatedInput {
                needed: requested,
                available,
            },
            other => Self::Bitstream(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_becomes_truncated_input() {
        let err = WireError::from(BitError::UnexpectedEof {
            requested: 8,
            available: 3,
        });
        assert_eq!(
            err,
            WireError::TruncatedInput {
                needed: 8,
                available: 3
            }
        );
    }

    #[test]
    fn other_bit_errors_are_wrapped() {
        let err = WireError::from(BitError::MisalignedAccess { bit_position: 3 });
        assert!(matches!(err, WireError::Bitstream(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn display_undefined_type_code() {
        let err = WireError::UndefinedTypeCode { type_code: 0x3E };
        assert!(err.to_string().contains("0x3E"));
    }

    #[test]
    fn display_invalid_header_form() {
        let err = WireError::InvalidHeaderForm {
            expected: HeaderRole::End,
            marker: 0b10,
        };
        let msg = err.to_string();
        assert!(msg.contains("end"));
        assert!(msg.contains("0b10"));
    }

    #[test]
    fn display_malformed_extended_id() {
        let err = WireError::MalformedExtendedId {
            reason: ExGuidReason::InvalidPrefix { leading_zeros: 3 },
        };
        assert!(err.to_string().contains("3 leading zero bits"));
    }
}
