//! FSSHTTPB request assembly.
//!
//! This crate builds on the wire primitives to frame typed stream objects and
//! assemble them into cell requests: sub-requests with their bodies, query
//! changes filters, knowledge, and data element packages. Files are split
//! into typed data elements by [`DataElementBuilder`] and read back with
//! [`read_file_content`].
//!
//! # Features
//!
//! - Generic stream object driver with type, length and End checks
//! - Query access, query changes, put changes and allocate extended GUID range sub-requests
//! - Filters, cell, waterline, fragment and content tag knowledge
//! - Data element packages with typed storage index, manifest and object group bodies
//! - File to data element building and reassembly
//! - Base64 transport form
//!
//! # Design Principles
//!
//! - **Correctness first** - Every framed object is checked against its header on decode.
//! - **Bounded decoding** - All counts and depths are capped by [`CodecLimits`].
//! - **No partial success** - Any error aborts the whole encode or decode.

mod builder;
mod data_element;
mod error;
mod filter;
mod knowledge;
mod limits;
mod object_group;
mod request;
mod storage;
mod stream_object;
mod sub_request;

pub use builder::{
    file_cell_id, file_root_id, read_file_content, DataElementBuilder, FileElements,
    CELL_SECOND_GUID, DEFAULT_CHUNK_SIZE, ROOT_GUID, SCHEMA_GUID,
};
pub use data_element::{
    DataElement, DataElementBody, DataElementFragment, DataElementPackage, DataElementType,
    ObjectDataBlob,
};
pub use error::{CodecError, CodecResult, LimitKind, PreambleField};
pub use filter::{Filter, FilterKind, FilterOperation, HierarchyDepth};
pub use knowledge::{
    CellKnowledge, CellKnowledgeEntry, CellKnowledgeRange, ContentTagKnowledge,
    ContentTagKnowledgeEntry, FragmentKnowledge, FragmentKnowledgeEntry, Knowledge,
    SpecializedKnowledge, WaterlineKnowledge, WaterlineKnowledgeEntry, CELL_KNOWLEDGE_GUID,
    CONTENT_TAG_KNOWLEDGE_GUID, FRAGMENT_KNOWLEDGE_GUID, WATERLINE_KNOWLEDGE_GUID,
};
pub use limits::CodecLimits;
pub use object_group::{
    DataElementHash, ObjectBlobDeclaration, ObjectBlobReference, ObjectData, ObjectDeclaration,
    ObjectDeclare, ObjectGroup, ObjectGroupData, ObjectGroupDeclarations, ObjectGroupMetadata,
    ObjectGroupMetadataDeclarations, ObjectGroupObject,
};
pub use request::{
    CellRequest, HashingOptions, DEFAULT_CLIENT_VERSION, DEFAULT_USER_AGENT_GUID,
    MINIMUM_VERSION, PROTOCOL_VERSION, SIGNATURE,
};
pub use storage::{
    CellManifest, RevisionManifest, RevisionManifestRootDeclare, StorageIndex,
    StorageIndexCellMapping, StorageIndexManifestMapping, StorageIndexRevisionMapping,
    StorageManifest, StorageManifestRootDeclare,
};
pub use stream_object::{
    decode_optional, decode_repeated, decode_stream_object, encode_stream_object, next_is,
    peek_object_type, skip_stream_object, walk_stream_object, DecodeContext, FrameEvent,
    StreamObject,
};
pub use sub_request::{
    AdditionalFlags, AllocateExtendedGuidRange, DiagnosticRequestOptions, PutChanges,
    QueryChanges, RequestType, SubRequest, SubRequestBody,
};
