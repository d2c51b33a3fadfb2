//! Builds the data elements that carry a whole file, and reads a file back
//! out of them.
//!
//! The file is split into chunks. Each chunk is one object in its own object
//! group; a root object in a further group references the chunks in order.
//! A revision manifest declares the root object, a cell manifest points at
//! that revision, a storage manifest declares the cell, and a storage index
//! maps all of them to their data elements.

use std::num::NonZeroUsize;

use tracing::debug;
use wire::{BinaryItem, CellId, CellIdArray, ExGuid, ExGuidArray, Guid, SerialNumber};

use crate::data_element::{DataElement, DataElementBody, DataElementType};
use crate::error::{CodecError, CodecResult, LimitKind};
use crate::object_group::{
    ObjectData, ObjectDeclaration, ObjectDeclare, ObjectGroup, ObjectGroupObject,
};
use crate::storage::{
    CellManifest, RevisionManifest, RevisionManifestRootDeclare, StorageIndex,
    StorageIndexCellMapping, StorageIndexManifestMapping, StorageIndexRevisionMapping,
    StorageManifest, StorageManifestRootDeclare,
};

/// GUID of the root id that storage and revision manifests declare the file under.
pub const ROOT_GUID: Guid = Guid::from_u128(0x84DE_FAB9_AAA3_4A0D_A3A8_520C_77AC_7073);
/// GUID of the second half of the file's cell id.
pub const CELL_SECOND_GUID: Guid = Guid::from_u128(0x6F2A_4665_42C8_46C7_BAB4_E28F_DCE1_E32B);
/// Schema of a storage holding one file.
pub const SCHEMA_GUID: Guid = Guid::from_u128(0x0EB9_3394_571D_41E9_AAD3_880D_92D3_1955);

/// Chunk size used unless overridden.
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(1024 * 1024) {
    Some(size) => size,
    None => NonZeroUsize::MIN,
};

const MAX_CHUNKS: usize = 1 << 30;
const PARTITION_ID: u64 = 1;

/// Root id the file is declared under.
#[must_use]
pub fn file_root_id() -> ExGuid {
    ExGuid::new(2, ROOT_GUID)
}

/// Id of the cell holding the file.
#[must_use]
pub fn file_cell_id() -> CellId {
    CellId::new(ExGuid::new(1, ROOT_GUID), ExGuid::new(1, CELL_SECOND_GUID))
}

/// The data elements of one file and the id of their storage index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileElements {
    pub storage_index_id: ExGuid,
    pub elements: Vec<DataElement>,
}

/// Splits file content into data elements.
///
/// Ids are `ExGuid(n, guid)` and serial numbers `(guid, n)` for a counter `n`
/// starting at 1, so the same input always builds the same elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataElementBuilder {
    guid: Guid,
    chunk_size: NonZeroUsize,
}

impl DataElementBuilder {
    #[must_use]
    pub const fn new(guid: Guid) -> Self {
        Self {
            guid,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: NonZeroUsize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn build(&self, content: &[u8]) -> CodecResult<FileElements> {
        if self.guid.is_empty() {
            return Err(CodecError::EmptyIdGuid);
        }
        let chunks: Vec<&[u8]> = content.chunks(self.chunk_size.get()).collect();
        if chunks.len() > MAX_CHUNKS {
            return Err(CodecError::LimitsExceeded {
                kind: LimitKind::DataElements,
                limit: MAX_CHUNKS,
                actual: chunks.len(),
            });
        }

        let mut ids = Ids::new(self.guid);
        let root_object = ids.next_id();
        let chunk_objects: Vec<ExGuid> = chunks.iter().map(|_| ids.next_id()).collect();
        let mut elements = Vec::with_capacity(chunks.len() + 5);

        let mut root = ObjectGroup::default();
        root.push(
            declare(root_object, 0, chunk_objects.len()),
            ObjectGroupObject::Data(ObjectData {
                object_ids: ExGuidArray::new(chunk_objects.clone()),
                cell_ids: CellIdArray::default(),
                data: BinaryItem::default(),
            }),
        );
        elements.push(ids.element(DataElementBody::ObjectGroup(root)));

        for (&object_id, chunk) in chunk_objects.iter().zip(&chunks) {
            let mut group = ObjectGroup::default();
            group.push(
                declare(object_id, chunk.len(), 0),
                ObjectGroupObject::Data(ObjectData {
                    data: BinaryItem::new(chunk.to_vec()),
                    ..ObjectData::default()
                }),
            );
            elements.push(ids.element(DataElementBody::ObjectGroup(group)));
        }
        let object_groups = elements.iter().map(|element| element.id).collect();

        let revision_id = ids.next_id();
        let revision = ids.element(DataElementBody::RevisionManifest(RevisionManifest {
            revision_id,
            base_revision_id: ExGuid::NULL,
            roots: vec![RevisionManifestRootDeclare {
                root_id: file_root_id(),
                object_id: root_object,
            }],
            object_groups,
        }));
        let cell = ids.element(DataElementBody::CellManifest(CellManifest {
            current_revision: revision_id,
        }));
        let manifest = ids.element(DataElementBody::StorageManifest(StorageManifest {
            schema_guid: SCHEMA_GUID,
            roots: vec![StorageManifestRootDeclare {
                root_id: file_root_id(),
                cell_id: file_cell_id(),
            }],
        }));
        let index = StorageIndex {
            manifest_mapping: Some(StorageIndexManifestMapping {
                mapping_id: manifest.id,
                serial_number: ids.next_serial(),
            }),
            cell_mappings: vec![StorageIndexCellMapping {
                cell_id: file_cell_id(),
                mapping_id: cell.id,
                serial_number: ids.next_serial(),
            }],
            revision_mappings: vec![StorageIndexRevisionMapping {
                revision_id,
                mapping_id: revision.id,
                serial_number: ids.next_serial(),
            }],
        };
        let index = ids.element(DataElementBody::StorageIndex(index));
        let storage_index_id = index.id;
        elements.extend([revision, cell, manifest, index]);

        debug!(
            bytes = content.len(),
            chunks = chunks.len(),
            elements = elements.len(),
            "built file data elements"
        );
        Ok(FileElements {
            storage_index_id,
            elements,
        })
    }
}

fn declare(object_id: ExGuid, data_size: usize, object_references: usize) -> ObjectDeclaration {
    ObjectDeclaration::Object(ObjectDeclare {
        object_id,
        partition_id: PARTITION_ID,
        data_size: u64::try_from(data_size).unwrap_or(u64::MAX),
        object_references: u64::try_from(object_references).unwrap_or(u64::MAX),
        cell_references: 0,
    })
}

/// Hands out sequential ids and serial numbers under one GUID.
struct Ids {
    guid: Guid,
    next: u32,
}

impl Ids {
    const fn new(guid: Guid) -> Self {
        Self { guid, next: 0 }
    }

    fn advance(&mut self) -> u32 {
        self.next = self.next.saturating_add(1);
        self.next
    }

    fn next_id(&mut self) -> ExGuid {
        let value = self.advance();
        ExGuid::new(value, self.guid)
    }

    fn next_serial(&mut self) -> SerialNumber {
        let value = self.advance();
        SerialNumber::new(self.guid, u64::from(value))
    }

    fn element(&mut self, body: DataElementBody) -> DataElement {
        let id = self.next_id();
        let serial_number = self.next_serial();
        DataElement::new(id, serial_number, body)
    }
}

/// Reassembles the file whose storage index is `storage_index_id`.
///
/// Follows the storage index through the storage, cell and revision
/// manifests to the root object, then concatenates the root object's data
/// with the data of each object it references, in order. Object data held in
/// object data BLOB elements is resolved through the BLOB's id.
pub fn read_file_content(
    elements: &[DataElement],
    storage_index_id: ExGuid,
) -> CodecResult<Vec<u8>> {
    let index = lookup(elements, storage_index_id, DataElementType::StorageIndex, |body| {
        match body {
            DataElementBody::StorageIndex(index) => Some(index),
            _ => None,
        }
    })?;
    let manifest_id = index
        .manifest_mapping
        .ok_or(CodecError::UnresolvedReference {
            id: storage_index_id,
        })?
        .mapping_id;
    let manifest = lookup(elements, manifest_id, DataElementType::StorageManifest, |body| {
        match body {
            DataElementBody::StorageManifest(manifest) => Some(manifest),
            _ => None,
        }
    })?;
    let cell_id = manifest
        .roots
        .iter()
        .find(|root| root.root_id == file_root_id())
        .ok_or(CodecError::UnresolvedReference { id: file_root_id() })?
        .cell_id;

    let cell_element = index
        .cell_mapping(&cell_id)
        .ok_or(CodecError::UnmappedCell { cell_id })?;
    let cell = lookup(elements, cell_element, DataElementType::CellManifest, |body| {
        match body {
            DataElementBody::CellManifest(cell) => Some(cell),
            _ => None,
        }
    })?;
    let revision_element = index
        .revision_mapping(cell.current_revision)
        .ok_or(CodecError::UnresolvedReference {
            id: cell.current_revision,
        })?;
    let revision = lookup(elements, revision_element, DataElementType::RevisionManifest, |body| {
        match body {
            DataElementBody::RevisionManifest(revision) => Some(revision),
            _ => None,
        }
    })?;
    let root_object = revision
        .root_object(file_root_id())
        .ok_or(CodecError::UnresolvedReference { id: file_root_id() })?;

    let groups = revision
        .object_groups
        .iter()
        .map(|&id| {
            lookup(elements, id, DataElementType::ObjectGroup, |body| match body {
                DataElementBody::ObjectGroup(group) => Some(group),
                _ => None,
            })
        })
        .collect::<CodecResult<Vec<_>>>()?;

    let (children, root_data) = object_content(elements, &groups, root_object)?;
    let mut content = root_data.to_vec();
    for &child in children {
        let (_, data) = object_content(elements, &groups, child)?;
        content.extend_from_slice(data);
    }
    debug!(bytes = content.len(), groups = groups.len(), "read file content");
    Ok(content)
}

fn lookup<'a, T>(
    elements: &'a [DataElement],
    id: ExGuid,
    expected: DataElementType,
    view: impl Fn(&'a DataElementBody) -> Option<&'a T>,
) -> CodecResult<&'a T> {
    let element = elements
        .iter()
        .find(|element| element.id == id)
        .ok_or(CodecError::MissingDataElement { id })?;
    view(&element.body).ok_or(CodecError::DataElementTypeMismatch {
        id,
        expected,
        found: element.element_type(),
    })
}

/// Returns the ids an object references and its data.
fn object_content<'a>(
    elements: &'a [DataElement],
    groups: &[&'a ObjectGroup],
    object_id: ExGuid,
) -> CodecResult<(&'a [ExGuid], &'a [u8])> {
    let object = groups
        .iter()
        .copied()
        .find_map(|group| group.object(object_id))
        .ok_or(CodecError::UnresolvedReference { id: object_id })?;
    match object {
        ObjectGroupObject::Data(data) => Ok((data.object_ids.items.as_slice(), data.data.content.as_slice())),
        ObjectGroupObject::BlobReference(reference) => {
            let blob = lookup(elements, reference.blob_id, DataElementType::ObjectDataBlob, |body| {
                match body {
                    DataElementBody::ObjectDataBlob(blob) => Some(blob),
                    _ => None,
                }
            })?;
            Ok((
                reference.object_ids.items.as_slice(),
                blob.data.content.as_slice(),
            ))
        }
    }
}
