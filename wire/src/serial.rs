//! Serial numbers.

use std::fmt;

use bitstream::{BitReader, BitWriter};

use crate::encoding::{Decode, Encode};
use crate::error::{SerialNumberReason, WireError, WireResult};
use crate::guid::{Guid, GUID_LEN};

const ABSENT_MARKER: u8 = 0x00;
const PRESENT_MARKER: u8 = 0x80;

/// A GUID-scoped 64-bit serial number, or the absent serial number.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SerialNumber {
    guid: Guid,
    value: u64,
}

impl SerialNumber {
    pub const ABSENT: Self = Self {
        guid: Guid::EMPTY,
        value: 0,
    };

    /// Creates a serial number. An empty `guid` yields [`SerialNumber::ABSENT`].
    #[must_use]
    pub fn new(guid: Guid, value: u64) -> Self {
        if guid.is_empty() {
            Self::ABSENT
        } else {
            Self { guid, value }
        }
    }

    #[must_use]
    pub const fn guid(&self) -> Guid {
        self.guid
    }

    #[must_use]
    pub const fn value(&self) -> u64 {
        self.value
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        !self.guid.is_empty()
    }

    /// 1 byte when absent, 25 when present.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        if self.is_present() {
            1 + GUID_LEN + 8
        } else {
            1
        }
    }
}

impl fmt::Debug for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_present() {
            write!(f, "SerialNumber({}, {})", self.guid, self.value)
        } else {
            write!(f, "SerialNumber(absent)")
        }
    }
}

impl Encode for SerialNumber {
    fn encode(&self, writer: &mut BitWriter) -> WireResult<()> {
        if !self.is_present() {
            writer.write_bits(u64::from(ABSENT_MARKER), 8)?;
            return Ok(());
        }
        writer.write_bits(u64::from(PRESENT_MARKER), 8)?;
        self.guid.encode(writer)?;
        writer.write_bits(self.value, 64)?;
        Ok(())
    }
}

impl Decode for SerialNumber {
    fn decode(reader: &mut BitReader<'_>) -> WireResult<Self> {
        let marker = reader.read_bits(8)? as u8;
        match marker {
            ABSENT_MARKER => Ok(Self::ABSENT),
            PRESENT_MARKER => {
                let guid = Guid::decode(reader)?;
                if guid.is_empty() {
                    return Err(WireError::MalformedSerialNumber {
                        reason: SerialNumberReason::EmptyGuid,
                    });
                }
                let value = reader.read_bits(64)?;
                Ok(Self { guid, value })
            }
            other => Err(WireError::MalformedSerialNumber {
                reason: SerialNumberReason::InvalidMarker { marker: other },
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUID: Guid = Guid::from_u128(0x0102_0304_0506_0708_090A_0B0C_0D0E_0F10);

    #[test]
    fn absent_is_single_zero_byte() {
        assert_eq!(SerialNumber::ABSENT.to_bytes().unwrap(), vec![0x00]);
        let (decoded, consumed) = SerialNumber::decode_from(&[0x00], 0).unwrap();
        assert!(!decoded.is_present());
        assert_eq!(consumed, 1);
    }

    #[test]
    fn present_layout() {
        let serial = SerialNumber::new(GUID, 0x1122_3344_5566_7788);
        let bytes = serial.to_bytes().unwrap();
        assert_eq!(bytes.len(), 25);
        assert_eq!(bytes[0], 0x80);
        assert_eq!(&bytes[1..17], &GUID.to_wire_bytes());
        assert_eq!(&bytes[17..], &0x1122_3344_5566_7788u64.to_le_bytes());

        let (decoded, consumed) = SerialNumber::decode_from(&bytes, 0).unwrap();
        assert_eq!(decoded, serial);
        assert_eq!(consumed, 25);
    }

    #[test]
    fn invalid_marker_is_rejected() {
        let err = SerialNumber::decode_from(&[0x40; 25], 0).unwrap_err();
        assert_eq!(
            err,
            WireError::MalformedSerialNumber {
                reason: SerialNumberReason::InvalidMarker { marker: 0x40 }
            }
        );
    }

    #[test]
    fn present_marker_with_empty_guid_is_rejected() {
        let mut bytes = vec![0x80];
        bytes.extend_from_slice(&[0u8; 24]);
        let err = SerialNumber::decode_from(&bytes, 0).unwrap_err();
        assert_eq!(
            err,
            WireError::MalformedSerialNumber {
                reason: SerialNumberReason::EmptyGuid
            }
        );
    }

    #[test]
    fn truncated_value_is_rejected() {
        let bytes = SerialNumber::new(GUID, 9).to_bytes().unwrap();
        let err = SerialNumber::decode_from(&bytes[..20], 0).unwrap_err();
        assert!(matches!(err, WireError::TruncatedInput { .. }));
    }
}
