//! Sub-requests and their bodies.
//!
//! Each sub-request is a compound object whose items are its id, type and
//! priority. The body follows as framed children whose layout depends on the
//! request type.

use bitstream::{BitReader, BitWriter};
use wire::{
    read_compact, write_compact, BinaryItem, CellId, Decode, Encode, ExGuid, Guid,
    StreamObjectHeaderStart, StreamObjectType, StringItemArray,
};

use crate::error::{CodecError, CodecResult, LimitKind};
use crate::filter::Filter;
use crate::knowledge::Knowledge;
use crate::stream_object::{
    check_items_consumed, decode_optional, decode_repeated, decode_stream_object,
    encode_stream_object, DecodeContext, StreamObject,
};

/// Sub-request type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum RequestType {
    QueryAccess,
    QueryChanges,
    QueryKnowledge,
    PutChanges,
    QueryRawStorage,
    PutRawStorage,
    QueryDiagnosticStoreInfo,
    AllocateExtendedGuidRange,
}

impl RequestType {
    #[must_use]
    pub const fn code(self) -> u64 {
        match self {
            Self::QueryAccess => 1,
            Self::QueryChanges => 2,
            Self::QueryKnowledge => 3,
            Self::PutChanges => 5,
            Self::QueryRawStorage => 6,
            Self::PutRawStorage => 7,
            Self::QueryDiagnosticStoreInfo => 8,
            Self::AllocateExtendedGuidRange => 11,
        }
    }

    #[must_use]
    pub const fn from_code(code: u64) -> Option<Self> {
        Some(match code {
            1 => Self::QueryAccess,
            2 => Self::QueryChanges,
            3 => Self::QueryKnowledge,
            5 => Self::PutChanges,
            6 => Self::QueryRawStorage,
            7 => Self::PutRawStorage,
            8 => Self::QueryDiagnosticStoreInfo,
            11 => Self::AllocateExtendedGuidRange,
            _ => return None,
        })
    }

    /// Returns `true` if this codec can build and read the type's body.
    #[must_use]
    pub const fn is_supported(self) -> bool {
        matches!(
            self,
            Self::QueryAccess
                | Self::QueryChanges
                | Self::PutChanges
                | Self::AllocateExtendedGuidRange
        )
    }
}

/// One operation inside a cell request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SubRequest {
    pub request_id: u64,
    pub priority: u64,
    pub partition_id: Option<Guid>,
    pub body: SubRequestBody,
}

/// The type-specific part of a sub-request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SubRequestBody {
    QueryAccess,
    QueryChanges(QueryChanges),
    PutChanges(PutChanges),
    AllocateExtendedGuidRange(AllocateExtendedGuidRange),
}

impl SubRequestBody {
    #[must_use]
    pub const fn request_type(&self) -> RequestType {
        match self {
            Self::QueryAccess => RequestType::QueryAccess,
            Self::QueryChanges(_) => RequestType::QueryChanges,
            Self::PutChanges(_) => RequestType::PutChanges,
            Self::AllocateExtendedGuidRange(_) => RequestType::AllocateExtendedGuidRange,
        }
    }
}

impl SubRequest {
    #[must_use]
    pub const fn new(request_id: u64, body: SubRequestBody) -> Self {
        Self {
            request_id,
            priority: 0,
            partition_id: None,
            body,
        }
    }

    #[must_use]
    pub const fn query_access(request_id: u64) -> Self {
        Self::new(request_id, SubRequestBody::QueryAccess)
    }

    #[must_use]
    pub const fn query_changes(request_id: u64, query: QueryChanges) -> Self {
        Self::new(request_id, SubRequestBody::QueryChanges(query))
    }

    #[must_use]
    pub const fn put_changes(request_id: u64, put: PutChanges) -> Self {
        Self::new(request_id, SubRequestBody::PutChanges(put))
    }

    #[must_use]
    pub const fn allocate_extended_guid_range(request_id: u64, request_id_count: u64) -> Self {
        Self::new(
            request_id,
            SubRequestBody::AllocateExtendedGuidRange(AllocateExtendedGuidRange {
                request_id_count,
            }),
        )
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: u64) -> Self {
        self.priority = priority;
        self
    }

    /// Targets the sub-request at a partition other than the default one.
    #[must_use]
    pub const fn with_partition_id(mut self, partition_id: Guid) -> Self {
        self.partition_id = Some(partition_id);
        self
    }

    #[must_use]
    pub const fn request_type(&self) -> RequestType {
        self.body.request_type()
    }
}

impl StreamObject for SubRequest {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::SubRequest;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        write_compact(writer, self.request_id)?;
        write_compact(writer, self.request_type().code())?;
        write_compact(writer, self.priority)?;
        Ok(())
    }

    fn encode_children(&self, writer: &mut BitWriter) -> CodecResult<()> {
        if let Some(partition_id) = self.partition_id {
            encode_stream_object(&TargetPartitionId(partition_id), writer)?;
        }
        match &self.body {
            SubRequestBody::QueryAccess => Ok(()),
            SubRequestBody::QueryChanges(query) => query.encode_objects(writer),
            SubRequestBody::PutChanges(put) => put.encode_objects(writer),
            SubRequestBody::AllocateExtendedGuidRange(allocate) => {
                encode_stream_object(allocate, writer)
            }
        }
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        header: &StreamObjectHeaderStart,
        ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let start = reader.byte_position();
        let request_id = read_compact(reader)?;
        let type_code = read_compact(reader)?;
        let priority = read_compact(reader)?;
        check_items_consumed(header, start, reader)?;

        let unsupported = CodecError::UnsupportedRequestType { code: type_code };
        let Some(request_type) = RequestType::from_code(type_code) else {
            return Err(unsupported);
        };

        let partition_id = decode_optional::<TargetPartitionId>(reader, ctx)?.map(|p| p.0);
        let body = match request_type {
            RequestType::QueryAccess => SubRequestBody::QueryAccess,
            RequestType::QueryChanges => {
                SubRequestBody::QueryChanges(QueryChanges::decode_objects(reader, ctx)?)
            }
            RequestType::PutChanges => {
                SubRequestBody::PutChanges(PutChanges::decode_objects(reader, ctx)?)
            }
            RequestType::AllocateExtendedGuidRange => {
                SubRequestBody::AllocateExtendedGuidRange(decode_stream_object(reader, ctx)?)
            }
            RequestType::QueryKnowledge
            | RequestType::QueryRawStorage
            | RequestType::PutRawStorage
            | RequestType::QueryDiagnosticStoreInfo => return Err(unsupported),
        };

        Ok(Self {
            request_id,
            priority,
            partition_id,
            body,
        })
    }
}

struct TargetPartitionId(Guid);

impl StreamObject for TargetPartitionId {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::TargetPartitionId;

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

/// Body of a query changes sub-request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct QueryChanges {
    pub allow_fragments: bool,
    pub exclude_object_data: bool,
    pub include_filtered_out_data_elements_in_knowledge: bool,
    pub allow_fragments_2: bool,
    pub round_knowledge_to_whole_cell_changes: bool,
    pub user_content_equivalent_version_ok: bool,
    pub include_storage_manifest: bool,
    pub include_cell_changes: bool,
    pub cell_id: CellId,
    /// Upper bound on returned data elements; zero means unconstrained.
    pub max_data_elements: u64,
    pub filters: Vec<Filter>,
    pub knowledge: Option<Knowledge>,
}

impl QueryChanges {
    #[must_use]
    pub fn new(cell_id: CellId) -> Self {
        Self {
            cell_id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn with_knowledge(mut self, knowledge: Knowledge) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    fn encode_objects(&self, writer: &mut BitWriter) -> CodecResult<()> {
        encode_stream_object(&QueryChangesFlags::from(self), writer)?;
        encode_stream_object(
            &QueryChangesArguments {
                include_storage_manifest: self.include_storage_manifest,
                include_cell_changes: self.include_cell_changes,
                cell_id: self.cell_id,
            },
            writer,
        )?;
        if self.max_data_elements > 0 {
            encode_stream_object(&DataConstraint(self.max_data_elements), writer)?;
        }
        for filter in &self.filters {
            encode_stream_object(filter, writer)?;
        }
        if let Some(knowledge) = &self.knowledge {
            encode_stream_object(knowledge, writer)?;
        }
        Ok(())
    }

    fn decode_objects(reader: &mut BitReader<'_>, ctx: &mut DecodeContext<'_>) -> CodecResult<Self> {
        let flags: QueryChangesFlags = decode_stream_object(reader, ctx)?;
        let arguments: QueryChangesArguments = decode_stream_object(reader, ctx)?;
        let max_data_elements = decode_optional::<DataConstraint>(reader, ctx)?.map_or(0, |c| c.0);
        let limit = ctx.limits().max_filters_per_sub_request;
        let filters = decode_repeated(reader, ctx, LimitKind::FiltersPerSubRequest, limit)?;
        let knowledge = decode_optional(reader, ctx)?;

        Ok(Self {
            allow_fragments: flags.allow_fragments,
            exclude_object_data: flags.exclude_object_data,
            include_filtered_out_data_elements_in_knowledge: flags
                .include_filtered_out_data_elements_in_knowledge,
            allow_fragments_2: flags.allow_fragments_2,
            round_knowledge_to_whole_cell_changes: flags.round_knowledge_to_whole_cell_changes,
            user_content_equivalent_version_ok: flags.user_content_equivalent_version_ok,
            include_storage_manifest: arguments.include_storage_manifest,
            include_cell_changes: arguments.include_cell_changes,
            cell_id: arguments.cell_id,
            max_data_elements,
            filters,
            knowledge,
        })
    }
}

#[allow(clippy::struct_excessive_bools)]
struct QueryChangesFlags {
    allow_fragments: bool,
    exclude_object_data: bool,
    include_filtered_out_data_elements_in_knowledge: bool,
    allow_fragments_2: bool,
    round_knowledge_to_whole_cell_changes: bool,
    user_content_equivalent_version_ok: bool,
}

impl From<&QueryChanges> for QueryChangesFlags {
    fn from(query: &QueryChanges) -> Self {
        Self {
            allow_fragments: query.allow_fragments,
            exclude_object_data: query.exclude_object_data,
            include_filtered_out_data_elements_in_knowledge: query
                .include_filtered_out_data_elements_in_knowledge,
            allow_fragments_2: query.allow_fragments_2,
            round_knowledge_to_whole_cell_changes: query.round_knowledge_to_whole_cell_changes,
            user_content_equivalent_version_ok: query.user_content_equivalent_version_ok,
        }
    }
}

impl StreamObject for QueryChangesFlags {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::QueryChangesRequest;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        writer.write_bool(false);
        writer.write_bool(self.allow_fragments);
        writer.write_bool(self.exclude_object_data);
        writer.write_bool(self.include_filtered_out_data_elements_in_knowledge);
        writer.write_bool(self.allow_fragments_2);
        writer.write_bool(self.round_knowledge_to_whole_cell_changes);
        writer.write_bits(0, 2)?;
        writer.write_bool(self.user_content_equivalent_version_ok);
        writer.write_bits(0, 7)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        reader.read_bit()?;
        let allow_fragments = reader.read_bit()?;
        let exclude_object_data = reader.read_bit()?;
        let include_filtered_out_data_elements_in_knowledge = reader.read_bit()?;
        let allow_fragments_2 = reader.read_bit()?;
        let round_knowledge_to_whole_cell_changes = reader.read_bit()?;
        reader.read_bits(2)?;
        let user_content_equivalent_version_ok = reader.read_bit()?;
        reader.read_bits(7)?;
        Ok(Self {
            allow_fragments,
            exclude_object_data,
            include_filtered_out_data_elements_in_knowledge,
            allow_fragments_2,
            round_knowledge_to_whole_cell_changes,
            user_content_equivalent_version_ok,
        })
    }
}

struct QueryChangesArguments {
    include_storage_manifest: bool,
    include_cell_changes: bool,
    cell_id: CellId,
}

impl StreamObject for QueryChangesArguments {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::QueryChangesRequestArguments;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        writer.write_bool(self.include_storage_manifest);
        writer.write_bool(self.include_cell_changes);
        writer.write_bits(0, 6)?;
        self.cell_id.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let include_storage_manifest = reader.read_bit()?;
        let include_cell_changes = reader.read_bit()?;
        reader.read_bits(6)?;
        let cell_id = CellId::decode(reader)?;
        Ok(Self {
            include_storage_manifest,
            include_cell_changes,
            cell_id,
        })
    }
}

struct DataConstraint(u64);

impl StreamObject for DataConstraint {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::QueryChangesDataConstraint;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        write_compact(writer, self.0)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        Ok(Self(read_compact(reader)?))
    }
}

/// Body of a put changes sub-request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct PutChanges {
    pub storage_index: ExGuid,
    pub expected_storage_index: ExGuid,
    pub imply_null_expected_if_no_mapping: bool,
    pub partial: bool,
    pub partial_last: bool,
    pub favor_coherency_failure_over_not_found: bool,
    pub abort_remaining_put_changes_on_failure: bool,
    pub return_complete_knowledge_if_possible: bool,
    pub last_writer_wins_on_next_change: bool,
    pub coherency_check: BinaryItem,
    pub author_logins: StringItemArray,
    pub additional_flags: Option<AdditionalFlags>,
    pub lock_id: Option<Guid>,
    pub knowledge: Option<Knowledge>,
    pub diagnostic_options: Option<DiagnosticRequestOptions>,
}

impl PutChanges {
    /// Puts changes rooted at `storage_index` with no expected index.
    #[must_use]
    pub fn new(storage_index: ExGuid) -> Self {
        Self {
            storage_index,
            expected_storage_index: ExGuid::NULL,
            imply_null_expected_if_no_mapping: false,
            partial: false,
            partial_last: false,
            favor_coherency_failure_over_not_found: true,
            abort_remaining_put_changes_on_failure: false,
            return_complete_knowledge_if_possible: true,
            last_writer_wins_on_next_change: false,
            coherency_check: BinaryItem::new(vec![0]),
            author_logins: StringItemArray::default(),
            additional_flags: None,
            lock_id: None,
            knowledge: None,
            diagnostic_options: None,
        }
    }

    #[must_use]
    pub const fn with_additional_flags(mut self, flags: AdditionalFlags) -> Self {
        self.additional_flags = Some(flags);
        self
    }

    #[must_use]
    pub const fn with_lock_id(mut self, lock_id: Guid) -> Self {
        self.lock_id = Some(lock_id);
        self
    }

    #[must_use]
    pub fn with_knowledge(mut self, knowledge: Knowledge) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    #[must_use]
    pub const fn with_diagnostic_options(mut self, options: DiagnosticRequestOptions) -> Self {
        self.diagnostic_options = Some(options);
        self
    }

    fn encode_objects(&self, writer: &mut BitWriter) -> CodecResult<()> {
        encode_stream_object(self, writer)?;
        if let Some(flags) = &self.additional_flags {
            encode_stream_object(flags, writer)?;
        }
        if let Some(lock_id) = self.lock_id {
            encode_stream_object(&LockId(lock_id), writer)?;
        }
        if let Some(knowledge) = &self.knowledge {
            encode_stream_object(knowledge, writer)?;
        }
        if let Some(options) = &self.diagnostic_options {
            encode_stream_object(options, writer)?;
        }
        Ok(())
    }

    fn decode_objects(reader: &mut BitReader<'_>, ctx: &mut DecodeContext<'_>) -> CodecResult<Self> {
        let mut put: Self = decode_stream_object(reader, ctx)?;
        put.additional_flags = decode_optional(reader, ctx)?;
        put.lock_id = decode_optional::<LockId>(reader, ctx)?.map(|l| l.0);
        put.knowledge = decode_optional(reader, ctx)?;
        put.diagnostic_options = decode_optional(reader, ctx)?;
        Ok(put)
    }
}

/// The put changes request leaf. Additional flags, lock id, knowledge and
/// diagnostic options follow it as sibling objects.
impl StreamObject for PutChanges {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::PutChangesRequest;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.storage_index.encode(writer)?;
        self.expected_storage_index.encode(writer)?;
        writer.write_bool(self.imply_null_expected_if_no_mapping);
        writer.write_bool(self.partial);
        writer.write_bool(self.partial_last);
        writer.write_bool(self.favor_coherency_failure_over_not_found);
        writer.write_bool(self.abort_remaining_put_changes_on_failure);
        writer.write_bool(false);
        writer.write_bool(self.return_complete_knowledge_if_possible);
        writer.write_bool(self.last_writer_wins_on_next_change);
        self.coherency_check.encode(writer)?;
        self.author_logins.encode(writer)?;
        // reserved
        writer.write_u8_aligned(0)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let storage_index = ExGuid::decode(reader)?;
        let expected_storage_index = ExGuid::decode(reader)?;
        let imply_null_expected_if_no_mapping = reader.read_bit()?;
        let partial = reader.read_bit()?;
        let partial_last = reader.read_bit()?;
        let favor_coherency_failure_over_not_found = reader.read_bit()?;
        let abort_remaining_put_changes_on_failure = reader.read_bit()?;
        reader.read_bit()?;
        let return_complete_knowledge_if_possible = reader.read_bit()?;
        let last_writer_wins_on_next_change = reader.read_bit()?;
        let coherency_check = BinaryItem::decode(reader)?;
        let author_logins = StringItemArray::decode(reader)?;
        reader.read_u8_aligned()?;

        Ok(Self {
            storage_index,
            expected_storage_index,
            imply_null_expected_if_no_mapping,
            partial,
            partial_last,
            favor_coherency_failure_over_not_found,
            abort_remaining_put_changes_on_failure,
            return_complete_knowledge_if_possible,
            last_writer_wins_on_next_change,
            coherency_check,
            author_logins,
            additional_flags: None,
            lock_id: None,
            knowledge: None,
            diagnostic_options: None,
        })
    }
}

/// Optional put changes behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct AdditionalFlags {
    pub return_applied_storage_index_id_entries: bool,
    pub return_data_elements_added: bool,
    pub check_for_id_reuse: bool,
    pub coherency_check_only_applied_index_entries: bool,
    pub full_file_replace_put: bool,
    pub require_storage_mappings_rooted: bool,
}

impl StreamObject for AdditionalFlags {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::AdditionalFlags;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        writer.write_bool(self.return_applied_storage_index_id_entries);
        writer.write_bool(self.return_data_elements_added);
        writer.write_bool(self.check_for_id_reuse);
        writer.write_bool(self.coherency_check_only_applied_index_entries);
        writer.write_bool(self.full_file_replace_put);
        writer.write_bool(self.require_storage_mappings_rooted);
        writer.write_bits(0, 10)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let flags = Self {
            return_applied_storage_index_id_entries: reader.read_bit()?,
            return_data_elements_added: reader.read_bit()?,
            check_for_id_reuse: reader.read_bit()?,
            coherency_check_only_applied_index_entries: reader.read_bit()?,
            full_file_replace_put: reader.read_bit()?,
            require_storage_mappings_rooted: reader.read_bit()?,
        };
        reader.read_bits(10)?;
        Ok(flags)
    }
}

/// Diagnostic switches sent with a put changes sub-request.
///
/// Two bytes on the wire: the flag in the lowest bit, the rest reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DiagnosticRequestOptions {
    pub force_revision_chain_optimization: bool,
}

impl StreamObject for DiagnosticRequestOptions {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::DiagnosticRequestOptionInput;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        writer.write_bool(self.force_revision_chain_optimization);
        writer.write_bits(0, 15)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let force_revision_chain_optimization = reader.read_bit()?;
        reader.read_bits(15)?;
        Ok(Self {
            force_revision_chain_optimization,
        })
    }
}

struct LockId(Guid);

impl StreamObject for LockId {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::PutChangesLockId;

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

/// Body of an allocate extended GUID range sub-request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AllocateExtendedGuidRange {
    pub request_id_count: u64,
}

impl StreamObject for AllocateExtendedGuidRange {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::AllocateExtendedGuidRangeRequest;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        write_compact(writer, self.request_id_count)?;
        // reserved
        writer.write_u8_aligned(0)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let request_id_count = read_compact(reader)?;
        reader.read_u8_aligned()?;
        Ok(Self { request_id_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterKind, HierarchyDepth};
    use crate::knowledge::{CellKnowledge, CellKnowledgeRange, SpecializedKnowledge};
    use crate::limits::CodecLimits;
    use crate::stream_object::tests::{decode, encode};
    use wire::StringItem;

    const GUID: Guid = Guid::from_u128(0xAAAA_BBBB_CCCC_DDDD_EEEE_FFFF_0000_1111);

    fn cell_id() -> CellId {
        CellId::new(ExGuid::new(1, GUID), ExGuid::new(2, GUID))
    }

    #[test]
    fn query_access_layout() {
        let bytes = encode(&SubRequest::query_access(1));
        // Start32(SubRequest, len 3), id 1, type 1, priority 0, End16(SubRequest)
        assert_eq!(bytes, vec![0x16, 0x02, 0x06, 0x00, 0x03, 0x03, 0x00, 0x0B, 0x01]);
        assert_eq!(decode::<SubRequest>(&bytes).unwrap(), SubRequest::query_access(1));
    }

    #[test]
    fn partition_and_priority_roundtrip() {
        let sub = SubRequest::query_access(7)
            .with_priority(300)
            .with_partition_id(GUID);
        let decoded = decode::<SubRequest>(&encode(&sub)).unwrap();
        assert_eq!(decoded, sub);
        assert_eq!(decoded.partition_id, Some(GUID));
    }

    #[test]
    fn query_changes_roundtrip() {
        let mut query = QueryChanges::new(cell_id())
            .with_filter(Filter::include(FilterKind::All))
            .with_filter(Filter::exclude(FilterKind::Hierarchy {
                depth: HierarchyDepth::SingleLevel,
                key: vec![1, 2, 3],
            }))
            .with_knowledge(Knowledge::new(vec![SpecializedKnowledge::Cell(
                CellKnowledge {
                    ranges: vec![CellKnowledgeRange::new(GUID, 1, 10)],
                    entries: Vec::new(),
                },
            )]));
        query.allow_fragments = true;
        query.round_knowledge_to_whole_cell_changes = true;
        query.user_content_equivalent_version_ok = true;
        query.include_cell_changes = true;
        query.max_data_elements = 500;

        let sub = SubRequest::query_changes(2, query);
        assert_eq!(decode::<SubRequest>(&encode(&sub)).unwrap(), sub);
    }

    #[test]
    fn query_changes_flag_bits() {
        let mut query = QueryChanges::new(CellId::default());
        query.allow_fragments = true;
        query.user_content_equivalent_version_ok = true;
        let bytes = encode(&SubRequest::query_changes(1, query));
        // SubRequest Start32 (4) + items (3), then the QueryChangesRequest Start32 (4).
        assert_eq!(bytes[11..13], [0x02, 0x01]);
    }

    #[test]
    fn zero_data_constraint_is_omitted() {
        let without = encode(&SubRequest::query_changes(1, QueryChanges::new(cell_id())));
        let mut constrained = QueryChanges::new(cell_id());
        constrained.max_data_elements = 1;
        let with = encode(&SubRequest::query_changes(1, constrained));
        // Start32 header (4) + compact (1)
        assert_eq!(with.len(), without.len() + 5);
    }

    #[test]
    fn filter_limit_is_enforced() {
        let mut query = QueryChanges::new(cell_id());
        for _ in 0..5 {
            query.filters.push(Filter::include(FilterKind::All));
        }
        let bytes = encode(&SubRequest::query_changes(1, query));
        let limits = CodecLimits::for_testing();
        let mut ctx = DecodeContext::new(&limits);
        let err = decode_stream_object::<SubRequest>(&mut BitReader::new(&bytes), &mut ctx)
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::LimitsExceeded {
                kind: LimitKind::FiltersPerSubRequest,
                limit: 4,
                actual: 5,
            }
        );
    }

    #[test]
    fn put_changes_defaults() {
        let put = PutChanges::new(ExGuid::new(3, GUID));
        assert!(put.favor_coherency_failure_over_not_found);
        assert!(put.return_complete_knowledge_if_possible);
        assert!(put.expected_storage_index.is_null());
        assert_eq!(put.coherency_check.content, vec![0]);
    }

    #[test]
    fn put_changes_roundtrip() {
        let mut put = PutChanges::new(ExGuid::new(3, GUID))
            .with_additional_flags(AdditionalFlags {
                full_file_replace_put: true,
                require_storage_mappings_rooted: true,
                ..AdditionalFlags::default()
            })
            .with_lock_id(Guid::from_u128(99))
            .with_knowledge(Knowledge::default());
        put.partial = true;
        put.author_logins = StringItemArray::new(vec![StringItem::new("alice")]);

        let sub = SubRequest::put_changes(5, put);
        assert_eq!(decode::<SubRequest>(&encode(&sub)).unwrap(), sub);
    }

    #[test]
    fn put_changes_flag_byte() {
        let put = PutChanges::new(ExGuid::NULL);
        let bytes = encode(&SubRequest::put_changes(1, put));
        // SubRequest (4 + 3), PutChangesRequest Start32 (4), two null ExGuids (2).
        assert_eq!(bytes[13], 0b0100_1000);
    }

    #[test]
    fn additional_flags_layout() {
        let flags = AdditionalFlags {
            return_applied_storage_index_id_entries: true,
            require_storage_mappings_rooted: true,
            ..AdditionalFlags::default()
        };
        let bytes = encode(&flags);
        assert_eq!(bytes[4..], [0b0010_0001, 0x00]);
    }

    #[test]
    fn diagnostic_options_follow_knowledge() {
        let put = PutChanges::new(ExGuid::new(3, GUID))
            .with_knowledge(Knowledge::default())
            .with_diagnostic_options(DiagnosticRequestOptions {
                force_revision_chain_optimization: true,
            });
        let sub = SubRequest::put_changes(2, put);
        let bytes = encode(&sub);
        // Start32(0x8A, length 2), flag byte, reserved byte, then SubRequest End16.
        let tail = &bytes[bytes.len() - 8..];
        assert_eq!(tail[..4], [0x52, 0x04, 0x04, 0x00]);
        assert_eq!(tail[4..6], [0x01, 0x00]);
        assert_eq!(decode::<SubRequest>(&bytes).unwrap(), sub);

        let cleared = PutChanges::new(ExGuid::NULL)
            .with_diagnostic_options(DiagnosticRequestOptions::default());
        let sub = SubRequest::put_changes(3, cleared);
        assert_eq!(decode::<SubRequest>(&encode(&sub)).unwrap(), sub);
    }

    #[test]
    fn allocate_roundtrip() {
        let sub = SubRequest::allocate_extended_guid_range(9, 100);
        let bytes = encode(&sub);
        assert_eq!(decode::<SubRequest>(&bytes).unwrap(), sub);
        assert_eq!(sub.request_type().code(), 11);
    }

    #[test]
    fn unsupported_request_type_is_rejected() {
        let mut bytes = encode(&SubRequest::query_access(1));
        // type compact: 3 (QueryKnowledge)
        bytes[5] = (3 << 1) | 1;
        assert_eq!(
            decode::<SubRequest>(&bytes).unwrap_err(),
            CodecError::UnsupportedRequestType { code: 3 }
        );

        bytes[5] = (4 << 1) | 1;
        assert_eq!(
            decode::<SubRequest>(&bytes).unwrap_err(),
            CodecError::UnsupportedRequestType { code: 4 }
        );
    }

    #[test]
    fn request_type_codes() {
        for code in [1, 2, 3, 5, 6, 7, 8, 11] {
            assert_eq!(RequestType::from_code(code).unwrap().code(), code);
        }
        assert!(RequestType::from_code(4).is_none());
        assert!(!RequestType::QueryRawStorage.is_supported());
    }
}
