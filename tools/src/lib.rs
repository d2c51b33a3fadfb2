//! Inspection and sample generation for FSSHTTPB requests.
//!
//! This crate backs the `fsshttpb-tools` binary. It walks the frame tree of an
//! encoded request without interpreting object bodies, and builds small
//! sample requests for each supported sub-request kind.
//!
//! # Design Principles
//!
//! - **Structure over meaning** - Frames come from the codec's own object walker, which only
//!   trusts Start/End headers and lengths.
//! - **Same limits** - Walking honours the nesting depth and size limits of [`CodecLimits`].
//! - **Readable output** - Reports render as an indented tree or serialize to JSON.

use std::fmt;

use bitstream::BitReader;
use codec::{
    walk_stream_object, CellKnowledge, CellKnowledgeRange, CellRequest, CodecError, CodecLimits,
    CodecResult, DataElementBuilder, DataElementType, DecodeContext, Filter, FilterKind,
    FrameEvent, Knowledge, LimitKind, PutChanges, QueryChanges, SpecializedKnowledge, SubRequest,
    MINIMUM_VERSION, PROTOCOL_VERSION, SIGNATURE,
};
use serde::Serialize;
use tracing::{debug, warn};
use wire::{CellId, ExGuid, Guid, WireError};

/// Storage GUID used by the sample requests.
pub const SAMPLE_STORAGE_GUID: Guid = Guid::from_u128(0x6F2A_4665_42C8_46C7_BAB4_E28F_DF0C_F2E4);

/// Cell GUID used by the sample requests.
pub const SAMPLE_CELL_GUID: Guid = Guid::from_u128(0x84DE_FAB9_AAA3_4A0D_A3A8_520C_77AC_7073);

/// Fixed fields read ahead of the Request object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Preamble {
    pub protocol_version: u16,
    pub minimum_version: u16,
    pub signature: u64,
}

impl Preamble {
    /// Returns `true` when every field holds the value this codec writes.
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        self.protocol_version == PROTOCOL_VERSION
            && self.minimum_version == MINIMUM_VERSION
            && self.signature == SIGNATURE
    }
}

/// One framed stream object and the frames nested inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    /// Object type name.
    pub name: &'static str,
    /// Object type code.
    pub code: u16,
    /// Byte offset of the Start header.
    pub offset: usize,
    /// Size of the Start header in bytes.
    pub header_len: usize,
    /// Declared item length.
    pub length: u64,
    pub compound: bool,
    pub children: Vec<Frame>,
    /// Size of the End header in bytes, zero for leaves.
    pub end_len: usize,
}

impl Frame {
    /// Total encoded size including children and the End header.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let items = usize::try_from(self.length).unwrap_or(usize::MAX);
        let children: usize = self.children.iter().map(Self::encoded_len).sum();
        self.header_len
            .saturating_add(items)
            .saturating_add(children)
            .saturating_add(self.end_len)
    }

    /// Number of frames in this subtree, including this one.
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Self::count).sum::<usize>()
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let kind = if self.compound { "compound" } else { "leaf" };
        writeln!(
            f,
            "{:indent$}{} (0x{:03X}) @{} header {} items {} {kind}",
            "",
            self.name,
            self.code,
            self.offset,
            self.header_len,
            self.length,
            indent = indent * 2
        )?;
        for child in &self.children {
            child.write_tree(f, indent + 1)?;
        }
        Ok(())
    }
}

/// Structural view of one encoded request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectReport {
    pub total_bytes: usize,
    pub preamble: Preamble,
    pub root: Frame,
}

impl fmt::Display for InspectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "version: {} minimum: {} signature: 0x{:016x}",
            self.preamble.protocol_version, self.preamble.minimum_version, self.preamble.signature
        )?;
        writeln!(
            f,
            "total: {} bytes, {} frames",
            self.total_bytes,
            self.root.count()
        )?;
        self.root.write_tree(f, 0)
    }
}

/// Walks the frame tree of an encoded request.
///
/// Object bodies are skipped, so this succeeds on well-framed input that
/// [`CellRequest::decode`] would reject for its content. A preamble with
/// unexpected values is reported, not rejected.
pub fn inspect_request(bytes: &[u8], limits: &CodecLimits) -> CodecResult<InspectReport> {
    if bytes.len() > limits.max_request_bytes {
        return Err(CodecError::LimitsExceeded {
            kind: LimitKind::RequestBytes,
            limit: limits.max_request_bytes,
            actual: bytes.len(),
        });
    }
    let mut reader = BitReader::new(bytes);
    let preamble = Preamble {
        protocol_version: reader.read_u16_aligned()?,
        minimum_version: reader.read_u16_aligned()?,
        signature: reader.read_u64_aligned()?,
    };
    if !preamble.is_expected() {
        warn!(?preamble, "unexpected request preamble");
    }

    let root = walk_frames(&mut reader, limits)?;
    if !reader.is_empty() {
        return Err(CodecError::TrailingBytes {
            remaining: reader.bytes_remaining(),
        });
    }
    debug!(frames = root.count(), bytes = bytes.len(), "walked request frames");
    Ok(InspectReport {
        total_bytes: bytes.len(),
        preamble,
        root,
    })
}

/// Assembles [`Frame`]s from the events of one walked object.
#[derive(Debug, Default)]
struct FrameTree {
    open: Vec<Frame>,
    root: Option<Frame>,
}

impl FrameTree {
    fn visit(&mut self, event: FrameEvent) {
        match event {
            FrameEvent::Start { offset, header } => {
                let frame = Frame {
                    name: header.object_type().name(),
                    code: header.object_type().code(),
                    offset,
                    header_len: header.encoded_len(),
                    length: header.length(),
                    compound: header.is_compound(),
                    children: Vec::new(),
                    end_len: 0,
                };
                if header.is_compound() {
                    self.open.push(frame);
                } else {
                    self.close(frame);
                }
            }
            FrameEvent::End { header } => {
                if let Some(mut frame) = self.open.pop() {
                    frame.end_len = header.encoded_len();
                    self.close(frame);
                }
            }
        }
    }

    fn close(&mut self, frame: Frame) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(frame),
            None => self.root = Some(frame),
        }
    }
}

fn walk_frames(reader: &mut BitReader<'_>, limits: &CodecLimits) -> CodecResult<Frame> {
    let mut ctx = DecodeContext::new(limits);
    let mut tree = FrameTree::default();
    walk_stream_object(reader, &mut ctx, &mut |event| tree.visit(event))?;
    tree.root.ok_or(CodecError::Wire(WireError::TruncatedInput {
        needed: 1,
        available: reader.bits_remaining(),
    }))
}

/// Kinds of sample request the tools can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    QueryAccess,
    QueryChanges,
    PutChanges,
    Allocate,
}

/// Builds a small, valid request carrying one sub-request of `kind`.
pub fn sample_request(kind: SampleKind) -> CodecResult<CellRequest> {
    let cell_id = CellId::new(
        ExGuid::new(1, SAMPLE_CELL_GUID),
        ExGuid::new(1, SAMPLE_STORAGE_GUID),
    );
    match kind {
        SampleKind::QueryAccess => CellRequest::new(vec![SubRequest::query_access(1)]),
        SampleKind::QueryChanges => {
            let knowledge = Knowledge::new(vec![SpecializedKnowledge::Cell(CellKnowledge {
                ranges: vec![CellKnowledgeRange::new(SAMPLE_STORAGE_GUID, 1, 16)],
                entries: Vec::new(),
            })]);
            let query = QueryChanges::new(cell_id)
                .with_filter(Filter::include(FilterKind::All))
                .with_filter(Filter::exclude(FilterKind::DataElementType(
                    DataElementType::ObjectDataBlob,
                )))
                .with_knowledge(knowledge);
            CellRequest::new(vec![SubRequest::query_changes(1, query)])
        }
        SampleKind::PutChanges => {
            let file = DataElementBuilder::new(SAMPLE_STORAGE_GUID).build(b"sample file content")?;
            let put = PutChanges::new(file.storage_index_id);
            Ok(CellRequest::new(vec![SubRequest::put_changes(1, put)])?
                .with_data_elements(file.elements))
        }
        SampleKind::Allocate => {
            CellRequest::new(vec![SubRequest::allocate_extended_guid_range(1, 1000)])
        }
    }
}
