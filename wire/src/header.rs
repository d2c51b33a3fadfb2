//! Stream object header framing.
//!
//! Every stream object opens with a Start header naming its type and the
//! length of its own items. Compound objects also close with an End header.
//! The first two bits on the wire select the form:
//!
//! | Marker | Header | Fields after the marker |
//! |---|---|---|
//! | `00` | 16-bit Start | compound (1), type (6), length (7) |
//! | `10` | 32-bit Start | compound (1), type (14), length (15), optional large length |
//! | `01` | 8-bit End | type (6) |
//! | `11` | 16-bit End | type (14) |

use bitstream::{BitReader, BitWriter};

use crate::compact::{read_compact, write_compact};
use crate::encoding::{Decode, Encode};
use crate::error::{HeaderRole, WireError, WireResult};
use crate::object_type::StreamObjectType;

const MARKER_START16: u64 = 0b00;
const MARKER_END8: u64 = 0b01;
const MARKER_START32: u64 = 0b10;
const MARKER_END16: u64 = 0b11;

/// Largest type code a 16-bit Start or 8-bit End can carry.
pub const SHORT_TYPE_MAX: u16 = 0x3F;
/// Largest type code a 32-bit Start or 16-bit End can carry.
pub const LONG_TYPE_MAX: u16 = 0x3FFF;
/// Largest length a 16-bit Start can carry.
pub const SHORT_LENGTH_MAX: u64 = 0x7F;
/// Length field value announcing a trailing compact large length.
pub const LARGE_LENGTH_SENTINEL: u64 = 0x7FFF;

/// Encoded size of a Start header form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum StartForm {
    Bits16,
    Bits32,
}

/// Encoded size of an End header form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum EndForm {
    Bits8,
    Bits16,
}

/// Which kind of header sits next in a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    Start,
    End,
}

/// Reports whether the next header is a Start or an End without consuming it.
pub fn peek_header_kind(reader: &BitReader<'_>) -> WireResult<HeaderKind> {
    let marker = reader.peek_bits(2)?;
    Ok(if marker & 0b01 == 0 {
        HeaderKind::Start
    } else {
        HeaderKind::End
    })
}

/// Reads the next Start header without consuming it.
pub fn peek_start(reader: &BitReader<'_>) -> WireResult<StreamObjectHeaderStart> {
    StreamObjectHeaderStart::decode(&mut reader.clone())
}

fn lookup_type(code: u64) -> WireResult<StreamObjectType> {
    let type_code = code as u16;
    StreamObjectType::from_code(type_code).ok_or(WireError::UndefinedTypeCode { type_code })
}

/// A Start header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StreamObjectHeaderStart {
    form: StartForm,
    object_type: StreamObjectType,
    length: u64,
}

impl StreamObjectHeaderStart {
    /// Creates a Start header, choosing the smallest form that fits.
    #[must_use]
    pub const fn new(object_type: StreamObjectType, length: u64) -> Self {
        let form = if object_type.code() <= SHORT_TYPE_MAX && length <= SHORT_LENGTH_MAX {
            StartForm::Bits16
        } else {
            StartForm::Bits32
        };
        Self {
            form,
            object_type,
            length,
        }
    }

    /// Creates a Start header in an explicit form.
    pub fn with_form(
        form: StartForm,
        object_type: StreamObjectType,
        length: u64,
    ) -> WireResult<Self> {
        let type_code = object_type.code();
        match form {
            StartForm::Bits16 => {
                if type_code > SHORT_TYPE_MAX {
                    return Err(WireError::TypeCodeOutOfRange {
                        type_code,
                        max: SHORT_TYPE_MAX,
                    });
                }
                if length > SHORT_LENGTH_MAX {
                    return Err(WireError::LengthOutOfRange {
                        length,
                        max: SHORT_LENGTH_MAX,
                    });
                }
            }
            StartForm::Bits32 => {
                if type_code > LONG_TYPE_MAX {
                    return Err(WireError::TypeCodeOutOfRange {
                        type_code,
                        max: LONG_TYPE_MAX,
                    });
                }
            }
        }
        Ok(Self {
            form,
            object_type,
            length,
        })
    }

    /// Creates a Start header with a caller-supplied compound flag, which
    /// must agree with the type registry.
    pub fn with_compound_flag(
        form: StartForm,
        object_type: StreamObjectType,
        compound: bool,
        length: u64,
    ) -> WireResult<Self> {
        if compound != object_type.is_compound() {
            return Err(WireError::InconsistentCompoundFlag {
                type_code: object_type.code(),
                compound,
            });
        }
        Self::with_form(form, object_type, length)
    }

    #[must_use]
    pub const fn form(&self) -> StartForm {
        self.form
    }

    #[must_use]
    pub const fn object_type(&self) -> StreamObjectType {
        self.object_type
    }

    /// Length in bytes of the object's own items.
    #[must_use]
    pub const fn length(&self) -> u64 {
        self.length
    }

    #[must_use]
    pub const fn is_compound(&self) -> bool {
        self.object_type.is_compound()
    }

    /// Returns `true` if a compact large length follows the 15-bit field.
    #[must_use]
    pub const fn has_large_length(&self) -> bool {
        matches!(self.form, StartForm::Bits32) && self.length >= LARGE_LENGTH_SENTINEL
    }

    /// Encoded size in bytes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self.form {
            StartForm::Bits16 => 2,
            StartForm::Bits32 if self.has_large_length() => {
                4 + crate::compact::CompactU64::new(self.length).encoded_len()
            }
            StartForm::Bits32 => 4,
        }
    }
}

impl Encode for StreamObjectHeaderStart {
    fn encode(&self, writer: &mut BitWriter) -> WireResult<()> {
        let code = u64::from(self.object_type.code());
        match self.form {
            StartForm::Bits16 => {
                writer.write_bits(MARKER_START16, 2)?;
                writer.write_bool(self.is_compound());
                writer.write_bits(code, 6)?;
                writer.write_bits(self.length, 7)?;
            }
            StartForm::Bits32 => {
                writer.write_bits(MARKER_START32, 2)?;
                writer.write_bool(self.is_compound());
                writer.write_bits(code, 14)?;
                if self.has_large_length() {
                    writer.write_bits(LARGE_LENGTH_SENTINEL, 15)?;
                    write_compact(writer, self.length)?;
                } else {
                    writer.write_bits(self.length, 15)?;
                }
            }
        }
        Ok(())
    }
}

impl Decode for StreamObjectHeaderStart {
    fn decode(reader: &mut BitReader<'_>) -> WireResult<Self> {
        let marker = reader.read_bits(2)?;
        let (form, type_bits, length_bits) = match marker {
            MARKER_START16 => (StartForm::Bits16, 6, 7),
            MARKER_START32 => (StartForm::Bits32, 14, 15),
            other => {
                return Err(WireError::InvalidHeaderForm {
                    expected: HeaderRole::Start,
                    marker: other as u8,
                })
            }
        };
        let compound = reader.read_bit()?;
        let object_type = lookup_type(reader.read_bits(type_bits)?)?;
        if compound != object_type.is_compound() {
            return Err(WireError::InconsistentCompoundFlag {
                type_code: object_type.code(),
                compound,
            });
        }
        let mut length = reader.read_bits(length_bits)?;
        if form == StartForm::Bits32 && length == LARGE_LENGTH_SENTINEL {
            length = read_compact(reader)?;
            if length < LARGE_LENGTH_SENTINEL {
                return Err(WireError::NonMinimalLargeLength { length });
            }
        }
        Ok(Self {
            form,
            object_type,
            length,
        })
    }
}

/// An End header closing a compound object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StreamObjectHeaderEnd {
    form: EndForm,
    object_type: StreamObjectType,
}

impl StreamObjectHeaderEnd {
    /// Creates an End header, choosing the smallest form that fits.
    #[must_use]
    pub const fn new(object_type: StreamObjectType) -> Self {
        let form = if object_type.code() <= SHORT_TYPE_MAX {
            EndForm::Bits8
        } else {
            EndForm::Bits16
        };
        Self { form, object_type }
    }

    /// Creates an End header in an explicit form.
    pub fn with_form(form: EndForm, object_type: StreamObjectType) -> WireResult<Self> {
        let type_code = object_type.code();
        let max = match form {
            EndForm::Bits8 => SHORT_TYPE_MAX,
            EndForm::Bits16 => LONG_TYPE_MAX,
        };
        if type_code > max {
            return Err(WireError::TypeCodeOutOfRange { type_code, max });
        }
        Ok(Self { form, object_type })
    }

    #[must_use]
    pub const fn form(&self) -> EndForm {
        self.form
    }

    #[must_use]
    pub const fn object_type(&self) -> StreamObjectType {
        self.object_type
    }

    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        match self.form {
            EndForm::Bits8 => 1,
            EndForm::Bits16 => 2,
        }
    }
}

impl Encode for StreamObjectHeaderEnd {
    fn encode(&self, writer: &mut BitWriter) -> WireResult<()> {
        let code = u64::from(self.object_type.code());
        match self.form {
            EndForm::Bits8 => {
                writer.write_bits(MARKER_END8, 2)?;
                writer.write_bits(code, 6)?;
            }
            EndForm::Bits16 => {
                writer.write_bits(MARKER_END16, 2)?;
                writer.write_bits(code, 14)?;
            }
        }
        Ok(())
    }
}

impl Decode for StreamObjectHeaderEnd {
    fn decode(reader: &mut BitReader<'_>) -> WireResult<Self> {
        let marker = reader.read_bits(2)?;
        let (form, type_bits) = match marker {
            MARKER_END8 => (EndForm::Bits8, 6),
            MARKER_END16 => (EndForm::Bits16, 14),
            other => {
                return Err(WireError::InvalidHeaderForm {
                    expected: HeaderRole::End,
                    marker: other as u8,
                })
            }
        };
        let object_type = lookup_type(reader.read_bits(type_bits)?)?;
        Ok(Self { form, object_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compact::CompactU64;

    fn roundtrip_start(header: StreamObjectHeaderStart) -> Vec<u8> {
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes.len(), header.encoded_len());
        let (decoded, consumed) = StreamObjectHeaderStart::decode_from(&bytes, 0).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(consumed, bytes.len());
        bytes
    }

    #[test]
    fn start16_layout() {
        let header = StreamObjectHeaderStart::new(StreamObjectType::DataElement, 5);
        assert_eq!(header.form(), StartForm::Bits16);
        // marker 00, compound 1, type 0x01, length 5
        let bytes = roundtrip_start(header);
        assert_eq!(bytes, vec![0x0C, 0x0A]);
    }

    #[test]
    fn start32_layout() {
        let header = StreamObjectHeaderStart::new(StreamObjectType::SubRequest, 3);
        assert_eq!(header.form(), StartForm::Bits32);
        let bytes = roundtrip_start(header);
        assert_eq!(bytes, vec![0x16, 0x02, 0x06, 0x00]);
    }

    #[test]
    fn start16_length_boundary() {
        let ok = StreamObjectHeaderStart::with_form(
            StartForm::Bits16,
            StreamObjectType::CellKnowledgeRange,
            127,
        )
        .unwrap();
        roundtrip_start(ok);

        let err = StreamObjectHeaderStart::with_form(
            StartForm::Bits16,
            StreamObjectType::CellKnowledgeRange,
            128,
        )
        .unwrap_err();
        assert_eq!(
            err,
            WireError::LengthOutOfRange {
                length: 128,
                max: 127
            }
        );

        let promoted = StreamObjectHeaderStart::new(StreamObjectType::CellKnowledgeRange, 128);
        assert_eq!(promoted.form(), StartForm::Bits32);
        roundtrip_start(promoted);
    }

    #[test]
    fn start16_type_code_limit() {
        let err = StreamObjectHeaderStart::with_form(
            StartForm::Bits16,
            StreamObjectType::QueryChangesRequest,
            1,
        )
        .unwrap_err();
        assert_eq!(
            err,
            WireError::TypeCodeOutOfRange {
                type_code: 0x51,
                max: 0x3F
            }
        );
    }

    #[test]
    fn start32_large_length_boundary() {
        let below = StreamObjectHeaderStart::new(StreamObjectType::ObjectDataBlob, 32766);
        assert!(!below.has_large_length());
        assert_eq!(roundtrip_start(below).len(), 4);

        let at = StreamObjectHeaderStart::new(StreamObjectType::ObjectDataBlob, 32767);
        assert!(at.has_large_length());
        assert_eq!(roundtrip_start(at).len(), 4 + 3);

        let big = StreamObjectHeaderStart::new(StreamObjectType::ObjectDataBlob, 1 << 40);
        assert!(big.has_large_length());
        roundtrip_start(big);
    }

    #[test]
    fn large_length_below_sentinel_is_rejected() {
        // Start32 ObjectDataBlob, length field 0x7FFF, then compact 5.
        let err = StreamObjectHeaderStart::decode_from(&[0x12, 0x00, 0xFE, 0xFF, 0x0B], 0)
            .unwrap_err();
        assert_eq!(err, WireError::NonMinimalLargeLength { length: 5 });
        assert!(err.to_string().contains("below the 0x7FFF sentinel"));

        // Exactly the sentinel is the smallest large length.
        let mut bytes = vec![0x12, 0x00, 0xFE, 0xFF];
        bytes.extend(CompactU64::new(LARGE_LENGTH_SENTINEL).to_bytes().unwrap());
        let (header, used) = StreamObjectHeaderStart::decode_from(&bytes, 0).unwrap();
        assert_eq!(header.length(), LARGE_LENGTH_SENTINEL);
        assert_eq!(used, bytes.len());
    }

    #[test]
    fn compound_flag_must_match_registry() {
        let err = StreamObjectHeaderStart::with_compound_flag(
            StartForm::Bits32,
            StreamObjectType::Request,
            false,
            0,
        )
        .unwrap_err();
        assert_eq!(
            err,
            WireError::InconsistentCompoundFlag {
                type_code: 0x40,
                compound: false
            }
        );

        // A leaf type with the compound bit set on the wire.
        let mut bytes = StreamObjectHeaderStart::new(StreamObjectType::ObjectDataBlob, 1)
            .to_bytes()
            .unwrap();
        bytes[0] |= 0b100;
        let err = StreamObjectHeaderStart::decode_from(&bytes, 0).unwrap_err();
        assert_eq!(
            err,
            WireError::InconsistentCompoundFlag {
                type_code: 0x02,
                compound: true
            }
        );
    }

    #[test]
    fn undefined_type_code_is_rejected() {
        // marker 00, compound 0, type 0x3F, length 0
        let err = StreamObjectHeaderStart::decode_from(&[0xF8, 0x01], 0).unwrap_err();
        assert_eq!(err, WireError::UndefinedTypeCode { type_code: 0x3F });
    }

    #[test]
    fn end_headers() {
        let end = StreamObjectHeaderEnd::new(StreamObjectType::SubRequest);
        assert_eq!(end.form(), EndForm::Bits16);
        assert_eq!(end.to_bytes().unwrap(), vec![0x0B, 0x01]);

        let end = StreamObjectHeaderEnd::new(StreamObjectType::Knowledge);
        assert_eq!(end.form(), EndForm::Bits8);
        let bytes = end.to_bytes().unwrap();
        assert_eq!(bytes, vec![0x41]);
        assert_eq!(
            StreamObjectHeaderEnd::decode_from(&bytes, 0).unwrap(),
            (end, 1)
        );

        let err = StreamObjectHeaderEnd::with_form(EndForm::Bits8, StreamObjectType::Request)
            .unwrap_err();
        assert!(matches!(err, WireError::TypeCodeOutOfRange { .. }));
    }

    #[test]
    fn start_and_end_markers_are_not_interchangeable() {
        let end = StreamObjectHeaderEnd::new(StreamObjectType::Request)
            .to_bytes()
            .unwrap();
        let err = StreamObjectHeaderStart::decode_from(&end, 0).unwrap_err();
        assert_eq!(
            err,
            WireError::InvalidHeaderForm {
                expected: HeaderRole::Start,
                marker: 0b11
            }
        );

        let start = StreamObjectHeaderStart::new(StreamObjectType::Request, 0)
            .to_bytes()
            .unwrap();
        let err = StreamObjectHeaderEnd::decode_from(&start, 0).unwrap_err();
        assert_eq!(
            err,
            WireError::InvalidHeaderForm {
                expected: HeaderRole::End,
                marker: 0b10
            }
        );
    }

    #[test]
    fn peek_reports_kind_without_consuming() {
        let bytes = StreamObjectHeaderEnd::new(StreamObjectType::Knowledge)
            .to_bytes()
            .unwrap();
        let reader = BitReader::new(&bytes);
        assert_eq!(peek_header_kind(&reader).unwrap(), HeaderKind::End);
        assert_eq!(reader.bit_position(), 0);

        let bytes = StreamObjectHeaderStart::new(StreamObjectType::Knowledge, 0)
            .to_bytes()
            .unwrap();
        let reader = BitReader::new(&bytes);
        assert_eq!(peek_header_kind(&reader).unwrap(), HeaderKind::Start);
        assert_eq!(
            peek_start(&reader).unwrap().object_type(),
            StreamObjectType::Knowledge
        );
        assert_eq!(reader.bit_position(), 0);
    }
}
