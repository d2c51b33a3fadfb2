//! Composite basic types built from the primitives.

use bitstream::{BitReader, BitWriter};

use crate::compact::{read_compact, write_compact};
use crate::encoding::{Decode, Encode};
use crate::error::{WireError, WireResult};
use crate::exguid::ExGuid;

/// Converts a decoded count into a byte budget, failing before any allocation
/// when the input cannot hold it.
fn checked_len(reader: &BitReader<'_>, count: u64, unit_bytes: u64) -> WireResult<usize> {
    let available = reader.bytes_remaining();
    let needed = count
        .checked_mul(unit_bytes)
        .and_then(|bytes| usize::try_from(bytes).ok())
        .filter(|&bytes| bytes <= available);
    needed.ok_or(WireError::TruncatedInput {
        needed: usize::try_from(count.saturating_mul(unit_bytes).saturating_mul(8))
            .unwrap_or(usize::MAX),
        available: reader.bits_remaining(),
    })
}

/// A length-prefixed run of opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BinaryItem {
    pub content: Vec<u8>,
}

impl BinaryItem {
    #[must_use]
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl Encode for BinaryItem {
    fn encode(&self, writer: &mut BitWriter) -> WireResult<()> {
        write_compact(writer, self.content.len() as u64)?;
        writer.write_bytes(&self.content)?;
        Ok(())
    }
}

impl Decode for BinaryItem {
    fn decode(reader: &mut BitReader<'_>) -> WireResult<Self> {
        let length = read_compact(reader)?;
        let len = checked_len(reader, length, 1)?;
        let content = reader.read_bytes(len)?.to_vec();
        Ok(Self { content })
    }
}

/// A UTF-16 string prefixed with its length in code units.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct StringItem {
    pub content: String,
}

impl StringItem {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Number of UTF-16 code units the content occupies.
    #[must_use]
    pub fn code_units(&self) -> usize {
        self.content.encode_utf16().count()
    }
}

impl Encode for StringItem {
    fn encode(&self, writer: &mut BitWriter) -> WireResult<()> {
        write_compact(writer, self.code_units() as u64)?;
        for unit in self.content.encode_utf16() {
            writer.write_bits(u64::from(unit), 16)?;
        }
        Ok(())
    }
}

impl Decode for StringItem {
    fn decode(reader: &mut BitReader<'_>) -> WireResult<Self> {
        let count = read_compact(reader)?;
        let len = checked_len(reader, count, 2)?;
        let bytes = reader.read_bytes(len)?;
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        let content = String::from_utf16(&units).map_err(|_| WireError::InvalidUtf16 {
            code_units: units.len(),
        })?;
        Ok(Self { content })
    }
}

/// Identifies a cell by a pair of extended GUIDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CellId {
    pub ex_guid1: ExGuid,
    pub ex_guid2: ExGuid,
}

impl CellId {
    #[must_use]
    pub const fn new(ex_guid1: ExGuid, ex_guid2: ExGuid) -> Self {
        Self { ex_guid1, ex_guid2 }
    }
}

impl Encode for CellId {
    fn encode(&self, writer: &mut BitWriter) -> WireResult<()> {
        self.ex_guid1.encode(writer)?;
        self.ex_guid2.encode(writer)
    }
}

impl Decode for CellId {
    fn decode(reader: &mut BitReader<'_>) -> WireResult<Self> {
        let ex_guid1 = ExGuid::decode(reader)?;
        let ex_guid2 = ExGuid::decode(reader)?;
        Ok(Self { ex_guid1, ex_guid2 })
    }
}

/// A byte range within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FileChunk {
    pub start: u64,
    pub length: u64,
}

impl FileChunk {
    #[must_use]
    pub const fn new(start: u64, length: u64) -> Self {
        Self { start, length }
    }
}

impl Encode for FileChunk {
    fn encode(&self, writer: &mut BitWriter) -> WireResult<()> {
        write_compact(writer, self.start)?;
        write_compact(writer, self.length)
    }
}

impl Decode for FileChunk {
    fn decode(reader: &mut BitReader<'_>) -> WireResult<Self> {
        let start = read_compact(reader)?;
        let length = read_compact(reader)?;
        Ok(Self { start, length })
    }
}

/// A counted array of extended GUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ExGuidArray {
    pub items: Vec<ExGuid>,
}

impl ExGuidArray {
    #[must_use]
    pub fn new(items: Vec<ExGuid>) -> Self {
        Self { items }
    }
}

impl Encode for ExGuidArray {
    fn encode(&self, writer: &mut BitWriter) -> WireResult<()> {
        write_compact(writer, self.items.len() as u64)?;
        for item in &self.items {
            item.encode(writer)?;
        }
        Ok(())
    }
}

impl Decode for ExGuidArray {
    fn decode(reader: &mut BitReader<'_>) -> WireResult<Self> {
        let count = read_compact(reader)?;
        // Every element occupies at least one byte.
        let count = checked_len(reader, count, 1)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(ExGuid::decode(reader)?);
        }
        Ok(Self { items })
    }
}

/// A counted array of string items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct StringItemArray {
    pub items: Vec<StringItem>,
}

impl StringItemArray {
    #[must_use]
    pub fn new(items: Vec<StringItem>) -> Self {
        Self { items }
    }
}

impl Encode for StringItemArray {
    fn encode(&self, writer: &mut BitWriter) -> WireResult<()> {
        write_compact(writer, self.items.len() as u64)?;
        for item in &self.items {
            item.encode(writer)?;
        }
        Ok(())
    }
}

impl Decode for StringItemArray {
    fn decode(reader: &mut BitReader<'_>) -> WireResult<Self> {
        let count = read_compact(reader)?;
        let count = checked_len(reader, count, 1)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(StringItem::decode(reader)?);
        }
        Ok(Self { items })
    }
}

/// A counted array of cell ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CellIdArray {
    pub items: Vec<CellId>,
}

impl CellIdArray {
    #[must_use]
    pub fn new(items: Vec<CellId>) -> Self {
        Self { items }
    }
}

impl Encode for CellIdArray {
    fn encode(&self, writer: &mut BitWriter) -> WireResult<()> {
        write_compact(writer, self.items.len() as u64)?;
        for item in &self.items {
            item.encode(writer)?;
        }
        Ok(())
    }
}

impl Decode for CellIdArray {
    fn decode(reader: &mut BitReader<'_>) -> WireResult<Self> {
        let count = read_compact(reader)?;
        // Two extended GUIDs per cell.
        let count = checked_len(reader, count, 2)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(CellId::decode(reader)?);
        }
        Ok(Self { items })
    }
}
