//! Object group data element bodies.
//!
//! An object group declares its objects, optionally attaches change metadata,
//! then carries each object's data in declaration order. Objects held in a
//! separate object data BLOB element are declared and referenced by the BLOB's
//! id instead.

use bitstream::{BitReader, BitWriter};
use wire::{
    read_compact, write_compact, BinaryItem, CellIdArray, Decode, Encode, ExGuid, ExGuidArray,
    StreamObjectHeaderStart, StreamObjectType,
};

use crate::error::{CodecResult, LimitKind};
use crate::storage::check_object_count;
use crate::stream_object::{
    check_items_consumed, decode_optional, decode_repeated, decode_stream_object,
    encode_stream_object, peek_object_type, DecodeContext, StreamObject,
};

/// A group of objects sent as one data element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ObjectGroup {
    pub hash: Option<DataElementHash>,
    pub declarations: ObjectGroupDeclarations,
    pub metadata: Option<ObjectGroupMetadataDeclarations>,
    pub data: ObjectGroupData,
}

impl ObjectGroup {
    /// Returns the data paired with the declaration of `object_id`.
    #[must_use]
    pub fn object(&self, object_id: ExGuid) -> Option<&ObjectGroupObject> {
        self.declarations
            .entries
            .iter()
            .position(|declaration| declaration.object_id() == object_id)
            .and_then(|index| self.data.objects.get(index))
    }

    /// Declares `object` and appends its data.
    pub fn push(&mut self, declaration: ObjectDeclaration, object: ObjectGroupObject) {
        self.declarations.entries.push(declaration);
        self.data.objects.push(object);
    }

    pub(crate) fn encode_objects(&self, writer: &mut BitWriter) -> CodecResult<()> {
        if let Some(hash) = &self.hash {
            encode_stream_object(hash, writer)?;
        }
        encode_stream_object(&self.declarations, writer)?;
        if let Some(metadata) = &self.metadata {
            encode_stream_object(metadata, writer)?;
        }
        encode_stream_object(&self.data, writer)?;
        Ok(())
    }

    pub(crate) fn decode_objects(
        reader: &mut BitReader<'_>,
        ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let hash = decode_optional(reader, ctx)?;
        let declarations = decode_stream_object(reader, ctx)?;
        let metadata = decode_optional(reader, ctx)?;
        let data = decode_stream_object(reader, ctx)?;
        Ok(Self {
            hash,
            declarations,
            metadata,
            data,
        })
    }
}

/// Hash over an object group's content.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DataElementHash {
    /// 1 for content information data structure version 1.0.
    pub scheme: u64,
    pub data: BinaryItem,
}

impl StreamObject for DataElementHash {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::DataElementHash;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        write_compact(writer, self.scheme)?;
        self.data.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let scheme = read_compact(reader)?;
        let data = BinaryItem::decode(reader)?;
        Ok(Self { scheme, data })
    }
}

/// Declares one object of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ObjectDeclaration {
    Object(ObjectDeclare),
    Blob(ObjectBlobDeclaration),
}

impl ObjectDeclaration {
    #[must_use]
    pub const fn object_id(&self) -> ExGuid {
        match self {
            Self::Object(declare) => declare.object_id,
            Self::Blob(declare) => declare.object_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ObjectDeclare {
    pub object_id: ExGuid,
    pub partition_id: u64,
    pub data_size: u64,
    pub object_references: u64,
    pub cell_references: u64,
}

impl StreamObject for ObjectDeclare {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::ObjectGroupObjectDeclare;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.object_id.encode(writer)?;
        write_compact(writer, self.partition_id)?;
        write_compact(writer, self.data_size)?;
        write_compact(writer, self.object_references)?;
        write_compact(writer, self.cell_references)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        Ok(Self {
            object_id: ExGuid::decode(reader)?,
            partition_id: read_compact(reader)?,
            data_size: read_compact(reader)?,
            object_references: read_compact(reader)?,
            cell_references: read_compact(reader)?,
        })
    }
}

/// Declares an object whose data lives in an object data BLOB element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ObjectBlobDeclaration {
    pub object_id: ExGuid,
    pub blob_id: ExGuid,
    pub partition_id: u64,
    pub object_references: u64,
    pub cell_references: u64,
}

impl StreamObject for ObjectBlobDeclaration {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::ObjectGroupObjectBlobDataDeclaration;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.object_id.encode(writer)?;
        self.blob_id.encode(writer)?;
        write_compact(writer, self.partition_id)?;
        write_compact(writer, self.object_references)?;
        write_compact(writer, self.cell_references)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        Ok(Self {
            object_id: ExGuid::decode(reader)?,
            blob_id: ExGuid::decode(reader)?,
            partition_id: read_compact(reader)?,
            object_references: read_compact(reader)?,
            cell_references: read_compact(reader)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ObjectGroupMetadata {
    pub change_frequency: u64,
}

impl StreamObject for ObjectGroupMetadata {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::ObjectGroupMetadata;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        write_compact(writer, self.change_frequency)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let change_frequency = read_compact(reader)?;
        Ok(Self { change_frequency })
    }
}

/// The data of one declared object.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ObjectGroupObject {
    Data(ObjectData),
    BlobReference(ObjectBlobReference),
}

/// Inline object data with the objects and cells it references.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ObjectData {
    pub object_ids: ExGuidArray,
    pub cell_ids: CellIdArray,
    pub data: BinaryItem,
}

impl StreamObject for ObjectData {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::ObjectGroupObjectData;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.object_ids.encode(writer)?;
        self.cell_ids.encode(writer)?;
        self.data.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let object_ids = ExGuidArray::decode(reader)?;
        let cell_ids = CellIdArray::decode(reader)?;
        let data = BinaryItem::decode(reader)?;
        Ok(Self {
            object_ids,
            cell_ids,
            data,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ObjectBlobReference {
    pub object_ids: ExGuidArray,
    pub cell_ids: CellIdArray,
    pub blob_id: ExGuid,
}

impl StreamObject for ObjectBlobReference {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::ObjectGroupObjectDataBlobReference;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.object_ids.encode(writer)?;
        self.cell_ids.encode(writer)?;
        self.blob_id.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let object_ids = ExGuidArray::decode(reader)?;
        let cell_ids = CellIdArray::decode(reader)?;
        let blob_id = ExGuid::decode(reader)?;
        Ok(Self {
            object_ids,
            cell_ids,
            blob_id,
        })
    }
}

/// The declarations of an object group, object and BLOB declarations in any order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ObjectGroupDeclarations {
    pub entries: Vec<ObjectDeclaration>,
}

impl StreamObject for ObjectGroupDeclarations {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::ObjectGroupDeclarations;

    fn encode_items(&self, _writer: &mut BitWriter) -> CodecResult<()> {
        Ok(())
    }

    fn encode_children(&self, writer: &mut BitWriter) -> CodecResult<()> {
        for declaration in &self.entries {
            match declaration {
                ObjectDeclaration::Object(declare) => encode_stream_object(declare, writer)?,
                ObjectDeclaration::Blob(declare) => encode_stream_object(declare, writer)?,
            }
        }
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        header: &StreamObjectHeaderStart,
        ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        check_items_consumed(header, reader.byte_position(), reader)?;
        let mut entries = Vec::new();
        loop {
            let declaration = match peek_object_type(reader)? {
                Some(StreamObjectType::ObjectGroupObjectDeclare) => {
                    ObjectDeclaration::Object(decode_stream_object(reader, ctx)?)
                }
                Some(StreamObjectType::ObjectGroupObjectBlobDataDeclaration) => {
                    ObjectDeclaration::Blob(decode_stream_object(reader, ctx)?)
                }
                _ => break,
            };
            entries.push(declaration);
            check_object_count(ctx, entries.len())?;
        }
        Ok(Self { entries })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ObjectGroupMetadataDeclarations {
    pub entries: Vec<ObjectGroupMetadata>,
}

impl StreamObject for ObjectGroupMetadataDeclarations {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::ObjectGroupMetadataDeclarations;

    fn encode_items(&self, _writer: &mut BitWriter) -> CodecResult<()> {
        Ok(())
    }

    fn encode_children(&self, writer: &mut BitWriter) -> CodecResult<()> {
        for entry in &self.entries {
            encode_stream_object(entry, writer)?;
        }
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        header: &StreamObjectHeaderStart,
        ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        check_items_consumed(header, reader.byte_position(), reader)?;
        let limit = ctx.limits().max_objects_per_data_element;
        let entries = decode_repeated(reader, ctx, LimitKind::DataElementObjects, limit)?;
        Ok(Self { entries })
    }
}

/// The object data of a group, one entry per declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ObjectGroupData {
    pub objects: Vec<ObjectGroupObject>,
}

impl StreamObject for ObjectGroupData {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::ObjectGroupData;

    fn encode_items(&self, _writer: &mut BitWriter) -> CodecResult<()> {
        Ok(())
    }

    fn encode_children(&self, writer: &mut BitWriter) -> CodecResult<()> {
        for object in &self.objects {
            match object {
                ObjectGroupObject::Data(data) => encode_stream_object(data, writer)?,
                ObjectGroupObject::BlobReference(reference) => {
                    encode_stream_object(reference, writer)?;
                }
            }
        }
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        header: &StreamObjectHeaderStart,
        ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        check_items_consumed(header, reader.byte_position(), reader)?;
        let mut objects = Vec::new();
        loop {
            let object = match peek_object_type(reader)? {
                Some(StreamObjectType::ObjectGroupObjectData) => {
                    ObjectGroupObject::Data(decode_stream_object(reader, ctx)?)
                }
                Some(StreamObjectType::ObjectGroupObjectDataBlobReference) => {
                    ObjectGroupObject::BlobReference(decode_stream_object(reader, ctx)?)
                }
                _ => break,
            };
            objects.push(object);
            check_object_count(ctx, objects.len())?;
        }
        Ok(Self { objects })
    }
}
