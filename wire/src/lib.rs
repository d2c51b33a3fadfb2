//! FSSHTTPB wire primitives and stream object framing.
//!
//! This crate handles the byte-level vocabulary of the protocol: compact
//! unsigned integers, extended GUIDs, serial numbers, the basic composite
//! types built from them, and the Start/End headers that frame every stream
//! object. It knows which object types are compound, but not what any object
//! contains.
//!
//! # Design Principles
//!
//! - **Canonical encodings** - Every value has exactly one valid encoding; decoders reject the rest.
//! - **Bounded decoding** - Declared lengths are checked against the input before allocation.
//! - **One registry** - Compound classification lives only in [`StreamObjectType::is_compound`].
//! - **No domain knowledge** - Requests, filters and knowledge belong to the codec crate.

mod compact;
mod encoding;
mod error;
mod exguid;
mod guid;
mod header;
mod items;
mod object_type;
mod serial;

pub use compact::{read_compact, write_compact, CompactU64, CompactWidth};
pub use encoding::{encoded_len, Decode, Encode};
pub use error::{ExGuidReason, HeaderRole, SerialNumberReason, WireError, WireResult};
pub use exguid::{ExGuid, ExGuidWidth};
pub use guid::{Guid, GUID_LEN};
pub use header::{
    peek_header_kind, peek_start, EndForm, HeaderKind, StartForm, StreamObjectHeaderEnd,
    StreamObjectHeaderStart, LARGE_LENGTH_SENTINEL, LONG_TYPE_MAX, SHORT_LENGTH_MAX,
    SHORT_TYPE_MAX,
};
pub use items::{
    BinaryItem, CellId, CellIdArray, ExGuidArray, FileChunk, StringItem, StringItemArray,
};
pub use object_type::StreamObjectType;
pub use serial::SerialNumber;
