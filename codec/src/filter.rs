//! Query changes filters.
//!
//! A filter is a compound object carrying a type byte and an operation byte,
//! followed by at most one data leaf whose shape depends on the type.

use bitstream::{BitReader, BitWriter};
use wire::{
    read_compact, write_compact, CellId, Decode, Encode, ExGuidArray, Guid,
    StreamObjectHeaderStart, StreamObjectType, GUID_LEN,
};

use crate::data_element::DataElementType;
use crate::error::{CodecError, CodecResult};
use crate::stream_object::{
    check_items_consumed, decode_stream_object, encode_stream_object, DecodeContext,
    StreamObject,
};

/// Whether matching data elements are kept or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FilterOperation {
    Exclude,
    #[default]
    Include,
}

impl FilterOperation {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Exclude => 0,
            Self::Include => 1,
        }
    }

    pub const fn from_code(code: u8) -> CodecResult<Self> {
        match code {
            0 => Ok(Self::Exclude),
            1 => Ok(Self::Include),
            _ => Err(CodecError::UnknownFilterOperation { code }),
        }
    }
}

/// How far a hierarchy filter descends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum HierarchyDepth {
    #[default]
    IndexOnly,
    FirstDataElement,
    SingleLevel,
    Deep,
}

impl HierarchyDepth {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::IndexOnly => 0,
            Self::FirstDataElement => 1,
            Self::SingleLevel => 2,
            Self::Deep => 3,
        }
    }

    pub const fn from_code(code: u8) -> CodecResult<Self> {
        match code {
            0 => Ok(Self::IndexOnly),
            1 => Ok(Self::FirstDataElement),
            2 => Ok(Self::SingleLevel),
            3 => Ok(Self::Deep),
            _ => Err(CodecError::UnknownHierarchyDepth { code }),
        }
    }
}

/// What a filter matches.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FilterKind {
    All,
    DataElementType(DataElementType),
    StorageIndexReferencedDataElements,
    CellId(CellId),
    Custom { schema: Guid, data: Vec<u8> },
    DataElementIds(ExGuidArray),
    Hierarchy { depth: HierarchyDepth, key: Vec<u8> },
}

impl FilterKind {
    /// The filter type byte.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::All => 1,
            Self::DataElementType(_) => 2,
            Self::StorageIndexReferencedDataElements => 3,
            Self::CellId(_) => 4,
            Self::Custom { .. } => 5,
            Self::DataElementIds(_) => 6,
            Self::Hierarchy { .. } => 7,
        }
    }
}

/// One query changes filter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Filter {
    pub operation: FilterOperation,
    pub kind: FilterKind,
}

impl Filter {
    #[must_use]
    pub const fn new(operation: FilterOperation, kind: FilterKind) -> Self {
        Self { operation, kind }
    }

    /// An including filter of the given kind.
    #[must_use]
    pub const fn include(kind: FilterKind) -> Self {
        Self::new(FilterOperation::Include, kind)
    }

    /// An excluding filter of the given kind.
    #[must_use]
    pub const fn exclude(kind: FilterKind) -> Self {
        Self::new(FilterOperation::Exclude, kind)
    }
}

impl StreamObject for Filter {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::QueryChangesFilter;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        writer.write_u8_aligned(self.kind.code())?;
        writer.write_u8_aligned(self.operation.code())?;
        Ok(())
    }

    fn encode_children(&self, writer: &mut BitWriter) -> CodecResult<()> {
        match &self.kind {
            FilterKind::All | FilterKind::StorageIndexReferencedDataElements => Ok(()),
            FilterKind::DataElementType(ty) => {
                encode_stream_object(&DataElementTypeData(*ty), writer)
            }
            FilterKind::CellId(cell_id) => encode_stream_object(&CellIdData(*cell_id), writer),
            FilterKind::Custom { schema, data } => encode_stream_object(
                &CustomData {
                    schema: *schema,
                    data: data.clone(),
                },
                writer,
            ),
            FilterKind::DataElementIds(ids) => {
                encode_stream_object(&DataElementIdsData(ids.clone()), writer)
            }
            FilterKind::Hierarchy { depth, key } => encode_stream_object(
                &HierarchyData {
                    depth: *depth,
                    key: key.clone(),
                },
                writer,
            ),
        }
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        header: &StreamObjectHeaderStart,
        ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let start = reader.byte_position();
        let type_code = reader.read_u8_aligned()?;
        let operation = FilterOperation::from_code(reader.read_u8_aligned()?)?;
        check_items_consumed(header, start, reader)?;

        let kind = match type_code {
            1 => FilterKind::All,
            2 => {
                let DataElementTypeData(ty) = decode_stream_object(reader, ctx)?;
                FilterKind::DataElementType(ty)
            }
            3 => FilterKind::StorageIndexReferencedDataElements,
            4 => {
                let CellIdData(cell_id) = decode_stream_object(reader, ctx)?;
                FilterKind::CellId(cell_id)
            }
            5 => {
                let CustomData { schema, data } = decode_stream_object(reader, ctx)?;
                FilterKind::Custom { schema, data }
            }
            6 => {
                let DataElementIdsData(ids) = decode_stream_object(reader, ctx)?;
                FilterKind::DataElementIds(ids)
            }
            7 => {
                let HierarchyData { depth, key } = decode_stream_object(reader, ctx)?;
                FilterKind::Hierarchy { depth, key }
            }
            code => return Err(CodecError::UnknownFilterType { code }),
        };
        Ok(Self { operation, kind })
    }
}

/// Reads the bytes a leaf declares beyond its `fixed` leading bytes.
fn read_rest(
    reader: &mut BitReader<'_>,
    header: &StreamObjectHeaderStart,
    fixed: usize,
) -> CodecResult<Vec<u8>> {
    let rest = usize::try_from(header.length())
        .ok()
        .and_then(|len| len.checked_sub(fixed))
        .ok_or(CodecError::LengthMismatch {
            object_type: header.object_type(),
            declared: header.length(),
            actual: fixed,
        })?;
    Ok(reader.read_bytes(rest)?.to_vec())
}

struct DataElementTypeData(DataElementType);

impl StreamObject for DataElementTypeData {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::QueryChangesFilterDataElementType;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        write_compact(writer, self.0.code())?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        DataElementType::from_code(read_compact(reader)?).map(Self)
    }
}

struct CellIdData(CellId);

impl StreamObject for CellIdData {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::QueryChangesFilterCellId;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.0.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        Ok(Self(CellId::decode(reader)?))
    }
}

struct CustomData {
    schema: Guid,
    data: Vec<u8>,
}

impl StreamObject for CustomData {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::QueryChangesFilterSchemaSpecific;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.schema.encode(writer)?;
        writer.write_bytes(&self.data)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let schema = Guid::decode(reader)?;
        let data = read_rest(reader, header, GUID_LEN)?;
        Ok(Self { schema, data })
    }
}

struct DataElementIdsData(ExGuidArray);

impl StreamObject for DataElementIdsData {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::QueryChangesFilterDataElementIds;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.0.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        Ok(Self(ExGuidArray::decode(reader)?))
    }
}

struct HierarchyData {
    depth: HierarchyDepth,
    key: Vec<u8>,
}

impl StreamObject for HierarchyData {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::QueryChangesFilterHierarchy;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        writer.write_u8_aligned(self.depth.code())?;
        writer.write_bytes(&self.key)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let depth = HierarchyDepth::from_code(reader.read_u8_aligned()?)?;
        let key = read_rest(reader, header, 1)?;
        Ok(Self { depth, key })
    }
}
