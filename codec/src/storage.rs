//! Storage index, storage manifest, cell manifest and revision manifest
//! data element bodies.
//!
//! These form the chain from a storage index down to the object groups of a
//! cell's current revision:
//!
//! ```text
//! storage index -> storage manifest -> cell manifest -> revision manifest -> object groups
//! ```

use bitstream::{BitReader, BitWriter};
use wire::{
    CellId, Decode, Encode, ExGuid, Guid, SerialNumber, StreamObjectHeaderStart,
    StreamObjectType,
};

use crate::error::{CodecError, CodecResult, LimitKind};
use crate::stream_object::{
    decode_repeated, decode_stream_object, encode_stream_object, peek_object_type,
    DecodeContext, StreamObject,
};

/// Fails once a data element holds more than the configured number of objects.
pub(crate) fn check_object_count(ctx: &DecodeContext<'_>, count: usize) -> CodecResult<()> {
    let limit = ctx.limits().max_objects_per_data_element;
    DecodeContext::check_limit(LimitKind::DataElementObjects, limit, count)
}

/// Maps storage manifest, cell and revision ids to the data elements that
/// hold them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StorageIndex {
    pub manifest_mapping: Option<StorageIndexManifestMapping>,
    pub cell_mappings: Vec<StorageIndexCellMapping>,
    pub revision_mappings: Vec<StorageIndexRevisionMapping>,
}

impl StorageIndex {
    /// Returns the data element id mapped to `cell_id`.
    #[must_use]
    pub fn cell_mapping(&self, cell_id: &CellId) -> Option<ExGuid> {
        self.cell_mappings
            .iter()
            .find(|mapping| mapping.cell_id == *cell_id)
            .map(|mapping| mapping.mapping_id)
    }

    /// Returns the data element id mapped to `revision_id`.
    #[must_use]
    pub fn revision_mapping(&self, revision_id: ExGuid) -> Option<ExGuid> {
        self.revision_mappings
            .iter()
            .find(|mapping| mapping.revision_id == revision_id)
            .map(|mapping| mapping.mapping_id)
    }

    pub(crate) fn encode_objects(&self, writer: &mut BitWriter) -> CodecResult<()> {
        if let Some(mapping) = &self.manifest_mapping {
            encode_stream_object(mapping, writer)?;
        }
        for mapping in &self.cell_mappings {
            encode_stream_object(mapping, writer)?;
        }
        for mapping in &self.revision_mappings {
            encode_stream_object(mapping, writer)?;
        }
        Ok(())
    }

    pub(crate) fn decode_objects(
        reader: &mut BitReader<'_>,
        ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let mut index = Self::default();
        let mut count = 0;
        // Mappings may come in any order; the manifest mapping at most once.
        loop {
            match peek_object_type(reader)? {
                Some(StreamObjectType::StorageIndexManifestMapping) => {
                    if index.manifest_mapping.is_some() {
                        return Err(CodecError::DuplicateObject {
                            object_type: StreamObjectType::StorageIndexManifestMapping,
                        });
                    }
                    index.manifest_mapping = Some(decode_stream_object(reader, ctx)?);
                }
                Some(StreamObjectType::StorageIndexCellMapping) => {
                    index.cell_mappings.push(decode_stream_object(reader, ctx)?);
                }
                Some(StreamObjectType::StorageIndexRevisionMapping) => {
                    index.revision_mappings.push(decode_stream_object(reader, ctx)?);
                }
                Some(found) => {
                    return Err(CodecError::UnexpectedObjectType {
                        expected: StreamObjectType::StorageIndexCellMapping,
                        found,
                    });
                }
                None => break,
            }
            count += 1;
            check_object_count(ctx, count)?;
        }
        Ok(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StorageIndexManifestMapping {
    /// Id of the storage manifest data element.
    pub mapping_id: ExGuid,
    pub serial_number: SerialNumber,
}

impl StreamObject for StorageIndexManifestMapping {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::StorageIndexManifestMapping;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.mapping_id.encode(writer)?;
        self.serial_number.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let mapping_id = ExGuid::decode(reader)?;
        let serial_number = SerialNumber::decode(reader)?;
        Ok(Self {
            mapping_id,
            serial_number,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StorageIndexCellMapping {
    pub cell_id: CellId,
    /// Id of the cell manifest data element.
    pub mapping_id: ExGuid,
    pub serial_number: SerialNumber,
}

impl StreamObject for StorageIndexCellMapping {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::StorageIndexCellMapping;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.cell_id.encode(writer)?;
        self.mapping_id.encode(writer)?;
        self.serial_number.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let cell_id = CellId::decode(reader)?;
        let mapping_id = ExGuid::decode(reader)?;
        let serial_number = SerialNumber::decode(reader)?;
        Ok(Self {
            cell_id,
            mapping_id,
            serial_number,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StorageIndexRevisionMapping {
    pub revision_id: ExGuid,
    /// Id of the revision manifest data element.
    pub mapping_id: ExGuid,
    pub serial_number: SerialNumber,
}

impl StreamObject for StorageIndexRevisionMapping {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::StorageIndexRevisionMapping;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.revision_id.encode(writer)?;
        self.mapping_id.encode(writer)?;
        self.serial_number.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let revision_id = ExGuid::decode(reader)?;
        let mapping_id = ExGuid::decode(reader)?;
        let serial_number = SerialNumber::decode(reader)?;
        Ok(Self {
            revision_id,
            mapping_id,
            serial_number,
        })
    }
}

/// Names the schema of a storage and the cells at its roots.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StorageManifest {
    pub schema_guid: Guid,
    pub roots: Vec<StorageManifestRootDeclare>,
}

impl StorageManifest {
    pub(crate) fn encode_objects(&self, writer: &mut BitWriter) -> CodecResult<()> {
        encode_stream_object(&SchemaGuid(self.schema_guid), writer)?;
        for root in &self.roots {
            encode_stream_object(root, writer)?;
        }
        Ok(())
    }

    pub(crate) fn decode_objects(
        reader: &mut BitReader<'_>,
        ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let SchemaGuid(schema_guid) = decode_stream_object(reader, ctx)?;
        let limit = ctx.limits().max_objects_per_data_element;
        let roots = decode_repeated(reader, ctx, LimitKind::DataElementObjects, limit)?;
        Ok(Self { schema_guid, roots })
    }
}

struct SchemaGuid(Guid);

impl StreamObject for SchemaGuid {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::StorageManifestSchemaGuid;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.0.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        Ok(Self(Guid::decode(reader)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StorageManifestRootDeclare {
    pub root_id: ExGuid,
    pub cell_id: CellId,
}

impl StreamObject for StorageManifestRootDeclare {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::StorageManifestRootDeclare;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.root_id.encode(writer)?;
        self.cell_id.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let root_id = ExGuid::decode(reader)?;
        let cell_id = CellId::decode(reader)?;
        Ok(Self { root_id, cell_id })
    }
}

/// Points a cell at its current revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CellManifest {
    pub current_revision: ExGuid,
}

impl CellManifest {
    pub(crate) fn encode_objects(&self, writer: &mut BitWriter) -> CodecResult<()> {
        encode_stream_object(&CurrentRevision(self.current_revision), writer)
    }

    pub(crate) fn decode_objects(
        reader: &mut BitReader<'_>,
        ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let CurrentRevision(current_revision) = decode_stream_object(reader, ctx)?;
        Ok(Self { current_revision })
    }
}

struct CurrentRevision(ExGuid);

impl StreamObject for CurrentRevision {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::CellManifestCurrentRevision;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.0.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        Ok(Self(ExGuid::decode(reader)?))
    }
}

/// One revision of a cell: its root objects and the object groups holding them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RevisionManifest {
    pub revision_id: ExGuid,
    /// Null for the first revision.
    pub base_revision_id: ExGuid,
    pub roots: Vec<RevisionManifestRootDeclare>,
    /// Ids of object group data elements.
    pub object_groups: Vec<ExGuid>,
}

impl RevisionManifest {
    /// Returns the object declared under `root_id`.
    #[must_use]
    pub fn root_object(&self, root_id: ExGuid) -> Option<ExGuid> {
        self.roots
            .iter()
            .find(|root| root.root_id == root_id)
            .map(|root| root.object_id)
    }

    pub(crate) fn encode_objects(&self, writer: &mut BitWriter) -> CodecResult<()> {
        let header = RevisionHeader {
            revision_id: self.revision_id,
            base_revision_id: self.base_revision_id,
        };
        encode_stream_object(&header, writer)?;
        for root in &self.roots {
            encode_stream_object(root, writer)?;
        }
        for group in &self.object_groups {
            encode_stream_object(&ObjectGroupReference(*group), writer)?;
        }
        Ok(())
    }

    pub(crate) fn decode_objects(
        reader: &mut BitReader<'_>,
        ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let header: RevisionHeader = decode_stream_object(reader, ctx)?;
        let mut manifest = Self {
            revision_id: header.revision_id,
            base_revision_id: header.base_revision_id,
            ..Self::default()
        };
        // Root declares and group references may be interleaved.
        loop {
            match peek_object_type(reader)? {
                Some(StreamObjectType::RevisionManifestRootDeclare) => {
                    manifest.roots.push(decode_stream_object(reader, ctx)?);
                }
                Some(StreamObjectType::RevisionManifestObjectGroupReferences) => {
                    let ObjectGroupReference(id) = decode_stream_object(reader, ctx)?;
                    manifest.object_groups.push(id);
                }
                _ => break,
            }
            check_object_count(ctx, manifest.roots.len() + manifest.object_groups.len())?;
        }
        Ok(manifest)
    }
}

struct RevisionHeader {
    revision_id: ExGuid,
    base_revision_id: ExGuid,
}

impl StreamObject for RevisionHeader {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::RevisionManifest;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.revision_id.encode(writer)?;
        self.base_revision_id.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let revision_id = ExGuid::decode(reader)?;
        let base_revision_id = ExGuid::decode(reader)?;
        Ok(Self {
            revision_id,
            base_revision_id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RevisionManifestRootDeclare {
    pub root_id: ExGuid,
    pub object_id: ExGuid,
}

impl StreamObject for RevisionManifestRootDeclare {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::RevisionManifestRootDeclare;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.root_id.encode(writer)?;
        self.object_id.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let root_id = ExGuid::decode(reader)?;
        let object_id = ExGuid::decode(reader)?;
        Ok(Self { root_id, object_id })
    }
}

struct ObjectGroupReference(ExGuid);

impl StreamObject for ObjectGroupReference {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::RevisionManifestObjectGroupReferences;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.0.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        Ok(Self(ExGuid::decode(reader)?))
    }
}
