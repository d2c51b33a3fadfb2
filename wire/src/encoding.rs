//! Encode/decode traits shared by every wire type.

use bitstream::{BitReader, BitWriter};

use crate::error::WireResult;

/// A value with a fixed bit-level serialization.
pub trait Encode {
    /// Appends the encoding of `self` to `writer`.
    fn encode(&self, writer: &mut BitWriter) -> WireResult<()>;

    /// Encodes `self` into a fresh byte buffer.
    fn to_bytes(&self) -> WireResult<Vec<u8>> {
        let mut writer = BitWriter::new();
        self.encode(&mut writer)?;
        Ok(writer.finish())
    }
}

/// A value that can be rebuilt from its bit-level serialization.
pub trait Decode: Sized {
    /// Reads one value, advancing `reader` past exactly the bits consumed.
    fn decode(reader: &mut BitReader<'_>) -> WireResult<Self>;

    /// Decodes one value starting at byte `offset` of `buf`.
    ///
    /// Returns the value and the number of bytes consumed.
    fn decode_from(buf: &[u8], offset: usize) -> WireResult<(Self, usize)> {
        let mut reader = BitReader::at_offset(buf, offset);
        let start = reader.byte_position();
        let value = Self::decode(&mut reader)?;
        Ok((value, reader.byte_position() - start))
    }
}

/// Returns the number of bytes `value` occupies once encoded.
pub fn encoded_len<T: Encode + ?Sized>(value: &T) -> WireResult<usize> {
    let mut writer = BitWriter::new();
    value.encode(&mut writer)?;
    Ok(writer.bits_written().div_ceil(8))
}
