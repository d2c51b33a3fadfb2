//! Data elements and data element packages.
//!
//! A data element's items are its id, serial number and type code; its body
//! follows as framed children laid out according to the type.

use bitstream::{BitReader, BitWriter};
use wire::{
    read_compact, write_compact, BinaryItem, Decode, Encode, ExGuid, FileChunk, SerialNumber,
    StreamObjectHeaderStart, StreamObjectType,
};

use crate::error::{CodecError, CodecResult, LimitKind};
use crate::object_group::ObjectGroup;
use crate::storage::{CellManifest, RevisionManifest, StorageIndex, StorageManifest};
use crate::stream_object::{
    check_items_consumed, decode_repeated, decode_stream_object, encode_stream_object,
    DecodeContext, StreamObject,
};

/// What a data element carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DataElementType {
    None,
    StorageIndex,
    StorageManifest,
    CellManifest,
    RevisionManifest,
    ObjectGroup,
    Fragment,
    ObjectDataBlob,
}

impl DataElementType {
    #[must_use]
    pub const fn code(self) -> u64 {
        match self {
            Self::None => 0,
            Self::StorageIndex => 1,
            Self::StorageManifest => 2,
            Self::CellManifest => 3,
            Self::RevisionManifest => 4,
            Self::ObjectGroup => 5,
            Self::Fragment => 6,
            Self::ObjectDataBlob => 10,
        }
    }

    pub fn from_code(code: u64) -> CodecResult<Self> {
        Ok(match code {
            0 => Self::None,
            1 => Self::StorageIndex,
            2 => Self::StorageManifest,
            3 => Self::CellManifest,
            4 => Self::RevisionManifest,
            5 => Self::ObjectGroup,
            6 => Self::Fragment,
            10 => Self::ObjectDataBlob,
            _ => return Err(CodecError::UnknownDataElementType { code }),
        })
    }
}

/// A framed unit of file content.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DataElement {
    pub id: ExGuid,
    pub serial_number: SerialNumber,
    pub body: DataElementBody,
}

impl DataElement {
    #[must_use]
    pub const fn new(id: ExGuid, serial_number: SerialNumber, body: DataElementBody) -> Self {
        Self {
            id,
            serial_number,
            body,
        }
    }

    /// Builds an object data BLOB element holding `data`.
    #[must_use]
    pub fn object_data_blob(
        id: ExGuid,
        serial_number: SerialNumber,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        let blob = ObjectDataBlob {
            data: BinaryItem::new(data),
        };
        Self::new(id, serial_number, DataElementBody::ObjectDataBlob(blob))
    }

    /// Type code written in the element's items.
    #[must_use]
    pub const fn element_type(&self) -> DataElementType {
        self.body.element_type()
    }
}

impl StreamObject for DataElement {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::DataElement;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.id.encode(writer)?;
        self.serial_number.encode(writer)?;
        write_compact(writer, self.element_type().code())?;
        Ok(())
    }

    fn encode_children(&self, writer: &mut BitWriter) -> CodecResult<()> {
        match &self.body {
            DataElementBody::StorageIndex(index) => index.encode_objects(writer),
            DataElementBody::StorageManifest(manifest) => manifest.encode_objects(writer),
            DataElementBody::CellManifest(manifest) => manifest.encode_objects(writer),
            DataElementBody::RevisionManifest(manifest) => manifest.encode_objects(writer),
            DataElementBody::ObjectGroup(group) => group.encode_objects(writer),
            DataElementBody::Fragment(fragment) => encode_stream_object(fragment, writer),
            DataElementBody::ObjectDataBlob(blob) => encode_stream_object(blob, writer),
        }
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        header: &StreamObjectHeaderStart,
        ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let start = reader.byte_position();
        let id = ExGuid::decode(reader)?;
        let serial_number = SerialNumber::decode(reader)?;
        let element_type = DataElementType::from_code(read_compact(reader)?)?;
        check_items_consumed(header, start, reader)?;

        let body = match element_type {
            DataElementType::None => {
                return Err(CodecError::UnknownDataElementType {
                    code: DataElementType::None.code(),
                })
            }
            DataElementType::StorageIndex => {
                DataElementBody::StorageIndex(StorageIndex::decode_objects(reader, ctx)?)
            }
            DataElementType::StorageManifest => {
                DataElementBody::StorageManifest(StorageManifest::decode_objects(reader, ctx)?)
            }
            DataElementType::CellManifest => {
                DataElementBody::CellManifest(CellManifest::decode_objects(reader, ctx)?)
            }
            DataElementType::RevisionManifest => {
                DataElementBody::RevisionManifest(RevisionManifest::decode_objects(reader, ctx)?)
            }
            DataElementType::ObjectGroup => {
                DataElementBody::ObjectGroup(ObjectGroup::decode_objects(reader, ctx)?)
            }
            DataElementType::Fragment => {
                DataElementBody::Fragment(decode_stream_object(reader, ctx)?)
            }
            DataElementType::ObjectDataBlob => {
                DataElementBody::ObjectDataBlob(decode_stream_object(reader, ctx)?)
            }
        };

        Ok(Self {
            id,
            serial_number,
            body,
        })
    }
}

/// The typed content of a data element. Its variant fixes the element's type code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DataElementBody {
    StorageIndex(StorageIndex),
    StorageManifest(StorageManifest),
    CellManifest(CellManifest),
    RevisionManifest(RevisionManifest),
    ObjectGroup(ObjectGroup),
    Fragment(DataElementFragment),
    ObjectDataBlob(ObjectDataBlob),
}

impl DataElementBody {
    #[must_use]
    pub const fn element_type(&self) -> DataElementType {
        match self {
            Self::StorageIndex(_) => DataElementType::StorageIndex,
            Self::StorageManifest(_) => DataElementType::StorageManifest,
            Self::CellManifest(_) => DataElementType::CellManifest,
            Self::RevisionManifest(_) => DataElementType::RevisionManifest,
            Self::ObjectGroup(_) => DataElementType::ObjectGroup,
            Self::Fragment(_) => DataElementType::Fragment,
            Self::ObjectDataBlob(_) => DataElementType::ObjectDataBlob,
        }
    }
}

/// One piece of a data element sent in several parts.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DataElementFragment {
    /// Id of the data element this piece belongs to.
    pub fragment_id: ExGuid,
    /// Size of the whole data element in bytes.
    pub size: u64,
    pub chunk: FileChunk,
    pub data: BinaryItem,
}

impl StreamObject for DataElementFragment {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::DataElementFragment;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.fragment_id.encode(writer)?;
        write_compact(writer, self.size)?;
        self.chunk.encode(writer)?;
        self.data.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let fragment_id = ExGuid::decode(reader)?;
        let size = read_compact(reader)?;
        let chunk = FileChunk::decode(reader)?;
        let data = BinaryItem::decode(reader)?;
        Ok(Self {
            fragment_id,
            size,
            chunk,
            data,
        })
    }
}

/// Raw object data carried by an object data BLOB element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ObjectDataBlob {
    pub data: BinaryItem,
}

impl StreamObject for ObjectDataBlob {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::ObjectDataBlob;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.data.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let data = BinaryItem::decode(reader)?;
        Ok(Self { data })
    }
}

/// The data elements sent along with a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DataElementPackage {
    pub elements: Vec<DataElement>,
}

impl DataElementPackage {
    #[must_use]
    pub fn new(elements: Vec<DataElement>) -> Self {
        Self { elements }
    }
}

impl StreamObject for DataElementPackage {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::DataElementPackage;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        // reserved
        writer.write_u8_aligned(0)?;
        Ok(())
    }

    fn encode_children(&self, writer: &mut BitWriter) -> CodecResult<()> {
        for element in &self.elements {
            encode_stream_object(element, writer)?;
        }
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        header: &StreamObjectHeaderStart,
        ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let start = reader.byte_position();
        reader.read_u8_aligned()?;
        check_items_consumed(header, start, reader)?;
        let limit = ctx.limits().max_data_elements;
        let elements = decode_repeated(reader, ctx, LimitKind::DataElements, limit)?;
        Ok(Self { elements })
    }
}
