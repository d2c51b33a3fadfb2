//! Knowledge: what the client already holds.

use bitstream::{BitReader, BitWriter};
use wire::{
    read_compact, write_compact, BinaryItem, Decode, Encode, ExGuid, FileChunk, Guid,
    SerialNumber, StreamObjectHeaderStart, StreamObjectType,
};

use crate::error::{CodecError, CodecResult, LimitKind};
use crate::stream_object::{
    check_items_consumed, decode_repeated, decode_stream_object, encode_stream_object,
    peek_object_type, DecodeContext, StreamObject,
};

/// Identifies cell knowledge inside specialized knowledge.
pub const CELL_KNOWLEDGE_GUID: Guid = Guid::from_u128(0x327A_35F6_0761_4414_9686_51E9_0066_7A4D);
/// Identifies waterline knowledge inside specialized knowledge.
pub const WATERLINE_KNOWLEDGE_GUID: Guid =
    Guid::from_u128(0x3A76_E90E_8032_4D0C_B9DD_F3C6_5029_433E);
/// Identifies fragment knowledge inside specialized knowledge.
pub const FRAGMENT_KNOWLEDGE_GUID: Guid =
    Guid::from_u128(0x0ABE_4F35_01DF_4134_A24A_7C79_F085_9844);
/// Identifies content tag knowledge inside specialized knowledge.
pub const CONTENT_TAG_KNOWLEDGE_GUID: Guid =
    Guid::from_u128(0x1009_1F13_C882_40FB_9886_6533_F934_C21D);

/// A knowledge object: a list of specialized knowledge.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Knowledge {
    pub specialized: Vec<SpecializedKnowledge>,
}

impl Knowledge {
    #[must_use]
    pub fn new(specialized: Vec<SpecializedKnowledge>) -> Self {
        Self { specialized }
    }
}

impl StreamObject for Knowledge {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::Knowledge;

    fn encode_items(&self, _writer: &mut BitWriter) -> CodecResult<()> {
        Ok(())
    }

    fn encode_children(&self, writer: &mut BitWriter) -> CodecResult<()> {
        for entry in &self.specialized {
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
        let limit = ctx.limits().max_knowledge_entries;
        let specialized = decode_repeated(reader, ctx, LimitKind::KnowledgeEntries, limit)?;
        Ok(Self { specialized })
    }
}

/// One kind of knowledge, tagged on the wire by a GUID.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SpecializedKnowledge {
    Cell(CellKnowledge),
    Waterline(WaterlineKnowledge),
    Fragment(FragmentKnowledge),
    ContentTag(ContentTagKnowledge),
}

impl SpecializedKnowledge {
    /// GUID written ahead of the nested knowledge.
    #[must_use]
    pub const fn guid(&self) -> Guid {
        match self {
            Self::Cell(_) => CELL_KNOWLEDGE_GUID,
            Self::Waterline(_) => WATERLINE_KNOWLEDGE_GUID,
            Self::Fragment(_) => FRAGMENT_KNOWLEDGE_GUID,
            Self::ContentTag(_) => CONTENT_TAG_KNOWLEDGE_GUID,
        }
    }
}

impl StreamObject for SpecializedKnowledge {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::SpecializedKnowledge;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.guid().encode(writer)?;
        Ok(())
    }

    fn encode_children(&self, writer: &mut BitWriter) -> CodecResult<()> {
        match self {
            Self::Cell(knowledge) => encode_stream_object(knowledge, writer),
            Self::Waterline(knowledge) => encode_stream_object(knowledge, writer),
            Self::Fragment(knowledge) => encode_stream_object(knowledge, writer),
            Self::ContentTag(knowledge) => encode_stream_object(knowledge, writer),
        }
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        header: &StreamObjectHeaderStart,
        ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let start = reader.byte_position();
        let guid = Guid::decode(reader)?;
        check_items_consumed(header, start, reader)?;
        if guid == CELL_KNOWLEDGE_GUID {
            decode_stream_object(reader, ctx).map(Self::Cell)
        } else if guid == WATERLINE_KNOWLEDGE_GUID {
            decode_stream_object(reader, ctx).map(Self::Waterline)
        } else if guid == FRAGMENT_KNOWLEDGE_GUID {
            decode_stream_object(reader, ctx).map(Self::Fragment)
        } else if guid == CONTENT_TAG_KNOWLEDGE_GUID {
            decode_stream_object(reader, ctx).map(Self::ContentTag)
        } else {
            Err(CodecError::UnknownKnowledgeType { guid })
        }
    }
}

/// Cell knowledge: serial number ranges and individual serial numbers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CellKnowledge {
    pub ranges: Vec<CellKnowledgeRange>,
    pub entries: Vec<CellKnowledgeEntry>,
}

impl StreamObject for CellKnowledge {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::CellKnowledge;

    fn encode_items(&self, _writer: &mut BitWriter) -> CodecResult<()> {
        Ok(())
    }

    fn encode_children(&self, writer: &mut BitWriter) -> CodecResult<()> {
        for range in &self.ranges {
            encode_stream_object(range, writer)?;
        }
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
        let limit = ctx.limits().max_knowledge_entries;
        let mut knowledge = Self::default();
        // Ranges and entries may be interleaved.
        loop {
            match peek_object_type(reader)? {
                Some(StreamObjectType::CellKnowledgeRange) => {
                    knowledge.ranges.push(decode_stream_object(reader, ctx)?);
                }
                Some(StreamObjectType::CellKnowledgeEntry) => {
                    knowledge.entries.push(decode_stream_object(reader, ctx)?);
                }
                _ => break,
            }
            let count = knowledge.ranges.len() + knowledge.entries.len();
            DecodeContext::check_limit(LimitKind::KnowledgeEntries, limit, count)?;
        }
        Ok(knowledge)
    }
}

/// A contiguous range of serial numbers under one GUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CellKnowledgeRange {
    pub guid: Guid,
    pub from: u64,
    pub to: u64,
}

impl CellKnowledgeRange {
    #[must_use]
    pub const fn new(guid: Guid, from: u64, to: u64) -> Self {
        Self { guid, from, to }
    }
}

impl StreamObject for CellKnowledgeRange {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::CellKnowledgeRange;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.guid.encode(writer)?;
        write_compact(writer, self.from)?;
        write_compact(writer, self.to)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let guid = Guid::decode(reader)?;
        let from = read_compact(reader)?;
        let to = read_compact(reader)?;
        Ok(Self { guid, from, to })
    }
}

/// A single serial number the client holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CellKnowledgeEntry {
    pub serial_number: SerialNumber,
}

impl StreamObject for CellKnowledgeEntry {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::CellKnowledgeEntry;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.serial_number.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let serial_number = SerialNumber::decode(reader)?;
        Ok(Self { serial_number })
    }
}

/// Waterline knowledge: per-cell-storage serial number high-water marks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct WaterlineKnowledge {
    pub entries: Vec<WaterlineKnowledgeEntry>,
}

impl StreamObject for WaterlineKnowledge {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::WaterlineKnowledge;

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
        let limit = ctx.limits().max_knowledge_entries;
        let entries = decode_repeated(reader, ctx, LimitKind::KnowledgeEntries, limit)?;
        Ok(Self { entries })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct WaterlineKnowledgeEntry {
    pub cell_storage_id: ExGuid,
    pub waterline: u64,
    pub reserved: u64,
}

impl StreamObject for WaterlineKnowledgeEntry {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::WaterlineKnowledgeEntry;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.cell_storage_id.encode(writer)?;
        write_compact(writer, self.waterline)?;
        write_compact(writer, self.reserved)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let cell_storage_id = ExGuid::decode(reader)?;
        let waterline = read_compact(reader)?;
        let reserved = read_compact(reader)?;
        Ok(Self {
            cell_storage_id,
            waterline,
            reserved,
        })
    }
}

/// Fragment knowledge: the parts of partially uploaded data elements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FragmentKnowledge {
    pub entries: Vec<FragmentKnowledgeEntry>,
}

impl StreamObject for FragmentKnowledge {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::FragmentKnowledge;

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
        let limit = ctx.limits().max_knowledge_entries;
        let entries = decode_repeated(reader, ctx, LimitKind::KnowledgeEntries, limit)?;
        Ok(Self { entries })
    }
}

/// The chunk of one data element the client already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FragmentKnowledgeEntry {
    pub data_element_id: ExGuid,
    /// Full size of the data element in bytes.
    pub data_element_size: u64,
    pub chunk: FileChunk,
}

impl StreamObject for FragmentKnowledgeEntry {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::FragmentKnowledgeEntry;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.data_element_id.encode(writer)?;
        write_compact(writer, self.data_element_size)?;
        self.chunk.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let data_element_id = ExGuid::decode(reader)?;
        let data_element_size = read_compact(reader)?;
        let chunk = FileChunk::decode(reader)?;
        Ok(Self {
            data_element_id,
            data_element_size,
            chunk,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ContentTagKnowledge {
    pub entries: Vec<ContentTagKnowledgeEntry>,
}

impl StreamObject for ContentTagKnowledge {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::ContentTagKnowledge;

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
        let limit = ctx.limits().max_knowledge_entries;
        let entries = decode_repeated(reader, ctx, LimitKind::KnowledgeEntries, limit)?;
        Ok(Self { entries })
    }
}

/// Clock data last seen for one BLOB heap.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ContentTagKnowledgeEntry {
    pub blob_heap_id: ExGuid,
    pub clock_data: BinaryItem,
}

impl StreamObject for ContentTagKnowledgeEntry {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::ContentTagKnowledgeEntry;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        self.blob_heap_id.encode(writer)?;
        self.clock_data.encode(writer)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let blob_heap_id = ExGuid::decode(reader)?;
        let clock_data = BinaryItem::decode(reader)?;
        Ok(Self {
            blob_heap_id,
            clock_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream_object::tests::{decode, encode};

    const SOURCE: Guid = Guid::from_u128(0xAAAA_0000_0000_0000_0000_0000_0000_0001);

    fn sample() -> Knowledge {
        Knowledge::new(vec![
            SpecializedKnowledge::Cell(CellKnowledge {
                ranges: vec![CellKnowledgeRange::new(SOURCE, 1, 40)],
                entries: vec![CellKnowledgeEntry {
                    serial_number: SerialNumber::new(SOURCE, 41),
                }],
            }),
            SpecializedKnowledge::Waterline(WaterlineKnowledge {
                entries: vec![WaterlineKnowledgeEntry {
                    cell_storage_id: ExGuid::new(3, SOURCE),
                    waterline: 99,
                    reserved: 0,
                }],
            }),
        ])
    }

    #[test]
    fn knowledge_roundtrip() {
        let knowledge = sample();
        let bytes = encode(&knowledge);
        assert_eq!(decode::<Knowledge>(&bytes).unwrap(), knowledge);
    }

    #[test]
    fn empty_knowledge_is_start_and_end() {
        let bytes = encode(&Knowledge::default());
        // Start16(0x10, compound, len 0), End8(0x10)
        assert_eq!(bytes, vec![0x84, 0x00, 0x41]);
    }

    #[test]
    fn specialized_knowledge_items_are_the_guid() {
        let bytes = encode(&SpecializedKnowledge::Cell(CellKnowledge::default()));
        // 32-bit Start for type 0x44 carries length 16.
        let header = StreamObjectHeaderStart::decode_from(&bytes, 0).unwrap().0;
        assert_eq!(header.length(), 16);
        assert_eq!(&bytes[4..20], &CELL_KNOWLEDGE_GUID.to_wire_bytes());
    }

    #[test]
    fn unknown_specialized_guid_is_rejected() {
        let mut bytes = encode(&SpecializedKnowledge::Cell(CellKnowledge::default()));
        bytes[4] ^= 0xFF;
        let err = decode::<SpecializedKnowledge>(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::UnknownKnowledgeType { .. }));
    }

    #[test]
    fn fragment_and_content_tag_knowledge_roundtrip() {
        let knowledge = Knowledge::new(vec![
            SpecializedKnowledge::Fragment(FragmentKnowledge {
                entries: vec![FragmentKnowledgeEntry {
                    data_element_id: ExGuid::new(7, SOURCE),
                    data_element_size: 0x1_0000,
                    chunk: FileChunk::new(0, 0x8000),
                }],
            }),
            SpecializedKnowledge::ContentTag(ContentTagKnowledge {
                entries: vec![ContentTagKnowledgeEntry {
                    blob_heap_id: ExGuid::new(2, SOURCE),
                    clock_data: BinaryItem::new(vec![0x01, 0x02, 0x03]),
                }],
            }),
        ]);
        let bytes = encode(&knowledge);
        assert_eq!(decode::<Knowledge>(&bytes).unwrap(), knowledge);
    }

    #[test]
    fn fragment_knowledge_guid_selects_fragment_entries() {
        let fragment = SpecializedKnowledge::Fragment(FragmentKnowledge::default());
        let bytes = encode(&fragment);
        assert_eq!(&bytes[4..20], &FRAGMENT_KNOWLEDGE_GUID.to_wire_bytes());
        // 32-bit Start for the compound 0x6B, no items.
        let inner = StreamObjectHeaderStart::decode_from(&bytes, 20).unwrap().0;
        assert_eq!(inner.object_type(), StreamObjectType::FragmentKnowledge);
        assert_eq!(decode::<SpecializedKnowledge>(&bytes).unwrap(), fragment);

        let tag = SpecializedKnowledge::ContentTag(ContentTagKnowledge::default());
        assert_eq!(tag.guid(), CONTENT_TAG_KNOWLEDGE_GUID);
        assert_eq!(decode::<SpecializedKnowledge>(&encode(&tag)).unwrap(), tag);
    }

    #[test]
    fn interleaved_cell_knowledge_decodes() {
        let range = CellKnowledgeRange::new(SOURCE, 5, 6);
        let entry = CellKnowledgeEntry {
            serial_number: SerialNumber::new(SOURCE, 1),
        };
        let mut children = BitWriter::new();
        encode_stream_object(&entry, &mut children).unwrap();
        encode_stream_object(&range, &mut children).unwrap();
        encode_stream_object(&entry, &mut children).unwrap();

        let mut writer = BitWriter::new();
        StreamObjectHeaderStart::new(StreamObjectType::CellKnowledge, 0)
            .encode(&mut writer)
            .unwrap();
        writer.write_bytes(&children.finish()).unwrap();
        wire::StreamObjectHeaderEnd::new(StreamObjectType::CellKnowledge)
            .encode(&mut writer)
            .unwrap();

        let decoded = decode::<CellKnowledge>(&writer.finish()).unwrap();
        assert_eq!(decoded.ranges, vec![range]);
        assert_eq!(decoded.entries, vec![entry, entry]);
    }
}
