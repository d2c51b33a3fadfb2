//! Error types for codec operations.

use std::fmt;

use wire::{CellId, ExGuid, Guid, StreamObjectType, WireError};

use crate::data_element::DataElementType;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while building, encoding or decoding requests.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    /// Wire format error.
    Wire(WireError),

    /// A request must carry at least one sub-request.
    EmptySubRequestList,

    /// A stream object of a different type was found.
    UnexpectedObjectType {
        expected: StreamObjectType,
        found: StreamObjectType,
    },

    /// An End header closed a different type than the one opened.
    MismatchedEnd {
        expected: StreamObjectType,
        found: StreamObjectType,
    },

    /// A leaf object's body did not match its declared length.
    LengthMismatch {
        object_type: StreamObjectType,
        declared: u64,
        actual: usize,
    },

    /// The fixed request preamble held an unexpected value.
    InvalidPreamble {
        field: PreambleField,
        expected: u64,
        found: u64,
    },

    /// The sub-request type is not one this codec builds.
    UnsupportedRequestType { code: u64 },

    /// Unknown query changes filter type byte.
    UnknownFilterType { code: u8 },

    /// Unknown query changes filter operation byte.
    UnknownFilterOperation { code: u8 },

    /// Unknown hierarchy filter depth byte.
    UnknownHierarchyDepth { code: u8 },

    /// Unknown data element type.
    UnknownDataElementType { code: u64 },

    /// Specialized knowledge named a GUID this codec does not model.
    UnknownKnowledgeType { guid: Guid },

    /// An object that may appear once appeared again.
    DuplicateObject { object_type: StreamObjectType },

    /// No data element carries the referenced id.
    MissingDataElement { id: ExGuid },

    /// A referenced data element has the wrong type.
    DataElementTypeMismatch {
        id: ExGuid,
        expected: DataElementType,
        found: DataElementType,
    },

    /// A mapping, root or object id named by the file's data elements is absent.
    UnresolvedReference { id: ExGuid },

    /// The storage index has no mapping for a cell.
    UnmappedCell { cell_id: CellId },

    /// Data element ids cannot be allocated under the empty GUID.
    EmptyIdGuid,

    /// Limits exceeded.
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// Stream objects were nested deeper than allowed.
    NestingTooDeep { depth: usize, limit: usize },

    /// Bytes remained after a complete request was decoded.
    TrailingBytes { remaining: usize },

    /// The base64 text could not be decoded.
    InvalidBase64(base64::DecodeError),
}

/// Specific limit that was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    RequestBytes,
    SubRequests,
    FiltersPerSubRequest,
    DataElements,
    DataElementObjects,
    KnowledgeEntries,
}

/// Fields of the fixed request preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreambleField {
    ProtocolVersion,
    MinimumVersion,
    Signature,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wire(e) => write!(f, "wire error: {e}"),
            Self::EmptySubRequestList => write!(f, "request has no sub-requests"),
            Self::UnexpectedObjectType { expected, found } => {
                write!(f, "expected stream object {expected}, found {found}")
            }
            Self::MismatchedEnd { expected, found } => {
                write!(f, "stream object {expected} closed by end of {found}")
            }
            Self::LengthMismatch {
                object_type,
                declared,
                actual,
            } => {
                write!(
                    f,
                    "stream object {object_type} declared {declared} bytes but used {actual}"
                )
            }
            Self::InvalidPreamble {
                field,
                expected,
                found,
            } => {
                write!(
                    f,
                    "invalid {field}: expected 0x{expected:X}, found 0x{found:X}"
                )
            }
            Self::UnsupportedRequestType { code } => {
                write!(f, "unsupported sub-request type {code}")
            }
            Self::UnknownFilterType { code } => write!(f, "unknown filter type {code}"),
            Self::UnknownFilterOperation { code } => {
                write!(f, "unknown filter operation {code}")
            }
            Self::UnknownHierarchyDepth { code } => {
                write!(f, "unknown hierarchy filter depth {code}")
            }
            Self::UnknownDataElementType { code } => {
                write!(f, "unknown data element type {code}")
            }
            Self::UnknownKnowledgeType { guid } => {
                write!(f, "unknown specialized knowledge {guid}")
            }
            Self::DuplicateObject { object_type } => {
                write!(f, "stream object {object_type} appears more than once")
            }
            Self::MissingDataElement { id } => write!(f, "no data element with id {id:?}"),
            Self::DataElementTypeMismatch {
                id,
                expected,
                found,
            } => {
                write!(f, "data element {id:?} is {found:?}, expected {expected:?}")
            }
            Self::UnresolvedReference { id } => write!(f, "unresolved reference {id:?}"),
            Self::UnmappedCell { cell_id } => {
                write!(
                    f,
                    "no storage index mapping for cell ({:?}, {:?})",
                    cell_id.ex_guid1, cell_id.ex_guid2
                )
            }
            Self::EmptyIdGuid => write!(f, "data element ids need a non-empty GUID"),
            Self::LimitsExceeded {
                kind,
                limit,
                actual,
            } => {
                write!(f, "{kind} limit exceeded: {actual} > {limit}")
            }
            Self::NestingTooDeep { depth, limit } => {
                write!(f, "stream objects nested {depth} deep, limit is {limit}")
            }
            Self::TrailingBytes { remaining } => {
                write!(f, "{remaining} trailing bytes after request")
            }
            Self::InvalidBase64(e) => write!(f, "invalid base64: {e}"),
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RequestBytes => "request bytes",
            Self::SubRequests => "sub-requests",
            Self::FiltersPerSubRequest => "filters per sub-request",
            Self::DataElements => "data elements",
            Self::DataElementObjects => "objects per data element",
            Self::KnowledgeEntries => "knowledge entries",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for PreambleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ProtocolVersion => "protocol version",
            Self::MinimumVersion => "minimum version",
            Self::Signature => "signature",
        };
        write!(f, "{name}")
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Wire(e) => Some(e),
            Self::InvalidBase64(e) => Some(e),
            _ => None,
        }
    }
}

impl From<WireError> for CodecError {
    fn from(err: WireError) -> Self {
        Self::Wire(err)
    }
}

impl From<bitstream::BitError> for CodecError {
    fn from(err: bitstream::BitError) -> Self {
        Self::Wire(WireError::from(err))
    }
}

impl From<base64::DecodeError> for CodecError {
    fn from(err: base64::DecodeError) -> Self {
        Self::InvalidBase64(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_limits_exceeded() {
        let err = CodecError::LimitsExceeded {
            kind: LimitKind::SubRequests,
            limit: 4,
            actual: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("sub-requests"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn display_mismatched_end() {
        let err = CodecError::MismatchedEnd {
            expected: StreamObjectType::SubRequest,
            found: StreamObjectType::Request,
        };
        let msg = err.to_string();
        assert!(msg.contains("SubRequest(0x42)"));
        assert!(msg.contains("Request(0x40)"));
    }

    #[test]
    fn display_invalid_preamble() {
        let err = CodecError::InvalidPreamble {
            field: PreambleField::Signature,
            expected: 0x9B06_9439_F329_CF9C,
            found: 0,
        };
        assert!(err.to_string().contains("9B069439F329CF9C"));
    }

    #[test]
    fn display_data_element_type_mismatch() {
        let id = ExGuid::new(3, Guid::from_u128(1));
        let err = CodecError::DataElementTypeMismatch {
            id,
            expected: DataElementType::StorageIndex,
            found: DataElementType::ObjectGroup,
        };
        let msg = err.to_string();
        assert!(msg.contains("ObjectGroup"));
        assert!(msg.contains("expected StorageIndex"));
    }

    #[test]
    fn bit_errors_flow_through_wire() {
        let err = CodecError::from(bitstream::BitError::UnexpectedEof {
            requested: 8,
            available: 0,
        });
        assert!(matches!(
            err,
            CodecError::Wire(WireError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn wire_error_is_source() {
        let err = CodecError::from(WireError::UndefinedTypeCode { type_code: 3 });
        assert!(std::error::Error::source(&err).is_some());
    }
}
