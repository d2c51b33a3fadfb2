//! Extended GUIDs: a small integer scoped by a GUID.

use std::fmt;

use bitstream::{BitReader, BitWriter};

use crate::encoding::{Decode, Encode};
use crate::error::{ExGuidReason, WireError, WireResult};
use crate::guid::{Guid, GUID_LEN};

/// Width class of an extended GUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExGuidWidth {
    /// A single `0x00` byte, no GUID.
    Null,
    Bits5,
    Bits10,
    Bits17,
    Bits32,
}

impl ExGuidWidth {
    /// Returns the narrowest non-null class that holds `value`.
    #[must_use]
    pub const fn classify(value: u32) -> Self {
        match value {
            0..=0x1F => Self::Bits5,
            0x20..=0x3FF => Self::Bits10,
            0x400..=0x1_FFFF => Self::Bits17,
            _ => Self::Bits32,
        }
    }

    /// Zero bits preceding the terminating one bit of the prefix.
    #[must_use]
    pub const fn leading_zeros(self) -> u8 {
        match self {
            Self::Bits5 => 2,
            Self::Bits10 => 5,
            Self::Bits17 => 6,
            Self::Bits32 => 7,
            Self::Null => 8,
        }
    }

    #[must_use]
    pub const fn payload_bits(self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bits5 => 5,
            Self::Bits10 => 10,
            Self::Bits17 => 17,
            Self::Bits32 => 32,
        }
    }

    /// Total encoded size in bytes, GUID included.
    #[must_use]
    pub const fn encoded_len(self) -> usize {
        match self {
            Self::Null => 1,
            Self::Bits5 => 1 + GUID_LEN,
            Self::Bits10 => 2 + GUID_LEN,
            Self::Bits17 => 3 + GUID_LEN,
            Self::Bits32 => 5 + GUID_LEN,
        }
    }

    const fn from_leading_zeros(zeros: u8) -> Option<Self> {
        match zeros {
            2 => Some(Self::Bits5),
            5 => Some(Self::Bits10),
            6 => Some(Self::Bits17),
            7 => Some(Self::Bits32),
            8 => Some(Self::Null),
            _ => None,
        }
    }
}

/// An extended GUID.
///
/// The empty GUID marks the null extended GUID, whose value is always zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExGuid {
    guid: Guid,
    value: u32,
}

impl ExGuid {
    pub const NULL: Self = Self {
        guid: Guid::EMPTY,
        value: 0,
    };

    /// Creates an extended GUID. An empty `guid` yields [`ExGuid::NULL`].
    #[must_use]
    pub fn new(value: u32, guid: Guid) -> Self {
        if guid.is_empty() {
            Self::NULL
        } else {
            Self { guid, value }
        }
    }

    #[must_use]
    pub const fn value(&self) -> u32 {
        self.value
    }

    #[must_use]
    pub const fn guid(&self) -> Guid {
        self.guid
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.guid.is_empty()
    }

    #[must_use]
    pub fn width(&self) -> ExGuidWidth {
        if self.is_null() {
            ExGuidWidth::Null
        } else {
            ExGuidWidth::classify(self.value)
        }
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.width().encoded_len()
    }
}

impl fmt::Debug for ExGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "ExGuid(null)")
        } else {
            write!(f, "ExGuid({}, {})", self.guid, self.value)
        }
    }
}

impl Encode for ExGuid {
    fn encode(&self, writer: &mut BitWriter) -> WireResult<()> {
        let width = self.width();
        if width == ExGuidWidth::Null {
            writer.write_bits(0, 8)?;
            return Ok(());
        }
        writer.write_unary(width.leading_zeros())?;
        writer.write_bits(u64::from(self.value), width.payload_bits())?;
        self.guid.encode(writer)
    }
}

impl Decode for ExGuid {
    fn decode(reader: &mut BitReader<'_>) -> WireResult<Self> {
        let zeros = reader.read_unary(8)?;
        let width = ExGuidWidth::from_leading_zeros(zeros).ok_or(WireError::MalformedExtendedId {
            reason: ExGuidReason::InvalidPrefix {
                leading_zeros: zeros,
            },
        })?;
        if width == ExGuidWidth::Null {
            return Ok(Self::NULL);
        }

        let raw = reader.read_bits(width.payload_bits())?;
        let value = u32::try_from(raw).map_err(|_| WireError::MalformedExtendedId {
            reason: ExGuidReason::NonMinimal { value: u32::MAX },
        })?;
        if ExGuidWidth::classify(value) != width {
            return Err(WireError::MalformedExtendedId {
                reason: ExGuidReason::NonMinimal { value },
            });
        }

        let guid = Guid::decode(reader)?;
        if guid.is_empty() {
            return Err(WireError::MalformedExtendedId {
                reason: ExGuidReason::EmptyGuid,
            });
        }
        Ok(Self { guid, value })
    }
}
