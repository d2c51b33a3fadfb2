//! LSB-first bit packing for the FSSHTTPB codec.
//!
//! [`BitWriter`] appends fields of 0 to 64 bits and [`BitReader`] reads them
//! back. The first bit written to a byte is its least significant bit, so a
//! 2-bit marker written first is `byte & 0x03`, and a field that does not fit
//! in the current byte continues in the low bits of the next one. Whole-byte
//! values (`u16`, `u32`, `u64`) are little-endian and must start on a byte
//! boundary.
//!
//! # Design Principles
//!
//! - **No unsafe code** - `unsafe_code` is forbidden workspace-wide.
//! - **No zero fill** - Reading past the end is an error, never an implicit zero.
//! - **No silent truncation** - A value wider than its field is rejected.
//! - **No domain knowledge** - Stream objects and requests live in higher crates.
//!
//! # Example
//!
//! ```
//! use bitstream::{BitReader, BitWriter};
//!
//! // Compact integer 1: unary prefix with no zeros, then 7 payload bits.
//! let mut writer = BitWriter::new();
//! writer.write_unary(0).unwrap();
//! writer.write_bits(1, 7).unwrap();
//! let bytes = writer.finish();
//! assert_eq!(bytes, vec![0x03]);
//!
//! let mut reader = BitReader::new(&bytes);
//! assert_eq!(reader.read_unary(8).unwrap(), 0);
//! assert_eq!(reader.read_bits(7).unwrap(), 1);
//! ```

mod error;
mod reader;
mod writer;

pub use error::{BitError, BitResult};
pub use reader::BitReader;
pub use writer::BitWriter;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end16_of_sub_request() {
        // Marker 11, then the 14-bit type 0x42.
        let mut writer = BitWriter::new();
        writer.write_bits(0b11, 2).unwrap();
        writer.write_bits(0x42, 14).unwrap();
        let bytes = writer.finish();
        assert_eq!(bytes, vec![0x0B, 0x01]);

        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read_bits(2).unwrap(), 0b11);
        assert_eq!(reader.read_bits(14).unwrap(), 0x42);
        assert!(reader.is_empty());
    }

    #[test]
    fn flag_byte_then_aligned_guid_bytes() {
        let mut writer = BitWriter::new();
        for flag in [false, true, false, false, true] {
            writer.write_bool(flag);
        }
        writer.write_bits(0, 3).unwrap();
        writer.write_bytes(&[0xAA; 16]).unwrap();
        let bytes = writer.finish();
        assert_eq!(bytes[0], 0b0001_0010);
        assert_eq!(bytes.len(), 17);

        let mut reader = BitReader::new(&bytes);
        let flags: Vec<bool> = (0..5).map(|_| reader.read_bit().unwrap()).collect();
        assert_eq!(flags, vec![false, true, false, false, true]);
        reader.read_bits(3).unwrap();
        assert_eq!(reader.read_array::<16>().unwrap(), [0xAA; 16]);
    }

    #[test]
    fn unaligned_tail_is_zero_padded() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b101, 3).unwrap();
        writer.align_to_byte();
        writer.write_u64_aligned(0x9B06_9439_F329_CF9C).unwrap();
        let bytes = writer.finish();
        assert_eq!(bytes[0], 0b0000_0101);

        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        reader.align_to_byte().unwrap();
        assert_eq!(reader.read_u64_aligned().unwrap(), 0x9B06_9439_F329_CF9C);
        assert!(reader.is_empty());
    }
}
