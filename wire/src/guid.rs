//! 128-bit GUIDs in the protocol's mixed-endian byte layout.

use std::fmt;
use std::str::FromStr;

use bitstream::{BitReader, BitWriter};
use uuid::Uuid;

use crate::encoding::{Decode, Encode};
use crate::error::WireResult;

/// Size of an encoded GUID in bytes.
pub const GUID_LEN: usize = 16;

/// A GUID as carried on the wire.
///
/// The first three fields are stored little-endian and the last eight bytes
/// verbatim, matching the Windows `GUID` structure layout.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Guid(Uuid);

impl Guid {
    /// The all-zero GUID.
    pub const EMPTY: Self = Self(Uuid::nil());

    /// Wraps a [`Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Builds a GUID from its canonical 128-bit value.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Returns the underlying [`Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns `true` for the all-zero GUID.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_nil()
    }

    /// Returns the 16 bytes written on the wire.
    #[must_use]
    pub fn to_wire_bytes(&self) -> [u8; GUID_LEN] {
        self.0.to_bytes_le()
    }

    /// Rebuilds a GUID from its 16 wire bytes.
    #[must_use]
    pub fn from_wire_bytes(bytes: [u8; GUID_LEN]) -> Self {
        Self(Uuid::from_bytes_le(bytes))
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self.0.hyphenated())
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for Guid {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for Guid {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Encode for Guid {
    fn encode(&self, writer: &mut BitWriter) -> WireResult<()> {
        writer.write_bytes(&self.to_wire_bytes())?;
        Ok(())
    }
}

impl Decode for Guid {
    fn decode(reader: &mut BitReader<'_>) -> WireResult<Self> {
        let bytes = reader.read_array::<GUID_LEN>()?;
        Ok(Self::from_wire_bytes(bytes))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Guid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WireError;

    #[test]
    fn wire_layout_is_mixed_endian() {
        let guid: Guid = "00112233-4455-6677-8899-aabbccddeeff".parse().unwrap();
        assert_eq!(
            guid.to_wire_bytes(),
            [
                0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66, 0x88, 0x99, 0xAA, 0xBB, 0xCC,
                0xDD, 0xEE, 0xFF
            ]
        );
    }

    #[test]
    fn roundtrip() {
        let guid = Guid::from_u128(0x327A_35F6_0761_4414_9686_51E9_0066_7A4D);
        let bytes = guid.to_bytes().unwrap();
        assert_eq!(bytes.len(), GUID_LEN);
        let (decoded, consumed) = Guid::decode_from(&bytes, 0).unwrap();
        assert_eq!(decoded, guid);
        assert_eq!(consumed, GUID_LEN);
    }

    #[test]
    fn empty_is_all_zero() {
        assert!(Guid::EMPTY.is_empty());
        assert_eq!(Guid::EMPTY.to_wire_bytes(), [0u8; GUID_LEN]);
        assert_eq!(Guid::default(), Guid::EMPTY);
    }

    #[test]
    fn truncated_guid_fails() {
        let err = Guid::decode_from(&[0u8; 15], 0).unwrap_err();
        assert!(matches!(err, WireError::TruncatedInput { .. }));
    }

    #[test]
    fn display_is_hyphenated() {
        let guid = Guid::from_u128(0x3A76_E90E_8032_4D0C_B9DD_F3C6_5029_433E);
        assert_eq!(guid.to_string(), "3a76e90e-8032-4d0c-b9dd-f3c65029433e");
    }
}
