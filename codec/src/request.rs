//! The top-level cell request message.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bitstream::{BitReader, BitWriter};
use tracing::debug;
use wire::{
    read_compact, write_compact, Decode, Encode, Guid, StreamObjectHeaderStart, StreamObjectType,
};

use crate::data_element::{DataElement, DataElementPackage};
use crate::error::{CodecError, CodecResult, LimitKind, PreambleField};
use crate::limits::CodecLimits;
use crate::stream_object::{
    check_items_consumed, decode_optional, decode_repeated, decode_stream_object,
    encode_stream_object, DecodeContext, StreamObject,
};
use crate::sub_request::SubRequest;

/// Protocol version written in every request preamble.
pub const PROTOCOL_VERSION: u16 = 12;
/// Minimum protocol version written in every request preamble.
pub const MINIMUM_VERSION: u16 = 11;
/// Request signature.
pub const SIGNATURE: u64 = 0x9B06_9439_F329_CF9C;
/// User agent GUID sent unless overridden.
pub const DEFAULT_USER_AGENT_GUID: Guid =
    Guid::from_u128(0xE731_B87E_DD45_44AA_AB80_0C75_FBD1_530E);
/// Client version sent unless overridden.
pub const DEFAULT_CLIENT_VERSION: u32 = 0x0FA1_2994;

/// Asks the server for data element hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HashingOptions {
    pub schema: u64,
    pub hashes_instead_of_data: bool,
    pub include_hashes: bool,
}

impl Default for HashingOptions {
    fn default() -> Self {
        Self {
            schema: 1,
            hashes_instead_of_data: false,
            include_hashes: false,
        }
    }
}

impl StreamObject for HashingOptions {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::RequestHashOptions;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        write_compact(writer, self.schema)?;
        writer.write_bits(0, 2)?;
        writer.write_bool(self.hashes_instead_of_data);
        writer.write_bool(self.include_hashes);
        writer.write_bits(0, 4)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        let schema = read_compact(reader)?;
        reader.read_bits(2)?;
        let hashes_instead_of_data = reader.read_bit()?;
        let include_hashes = reader.read_bit()?;
        reader.read_bits(4)?;
        Ok(Self {
            schema,
            hashes_instead_of_data,
            include_hashes,
        })
    }
}

/// A complete request: a fixed preamble followed by a Request object holding
/// the user agent, sub-requests in order, and any data elements they send.
///
/// A request always carries at least one sub-request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CellRequest {
    user_agent_guid: Guid,
    client_version: u32,
    hashing_options: Option<HashingOptions>,
    sub_requests: Vec<SubRequest>,
    data_elements: Option<DataElementPackage>,
}

impl CellRequest {
    /// Creates a request with default user agent settings.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EmptySubRequestList`] if `sub_requests` is empty.
    pub fn new(sub_requests: Vec<SubRequest>) -> CodecResult<Self> {
        if sub_requests.is_empty() {
            return Err(CodecError::EmptySubRequestList);
        }
        Ok(Self {
            user_agent_guid: DEFAULT_USER_AGENT_GUID,
            client_version: DEFAULT_CLIENT_VERSION,
            hashing_options: None,
            sub_requests,
            data_elements: None,
        })
    }

    #[must_use]
    pub const fn with_user_agent(mut self, guid: Guid, client_version: u32) -> Self {
        self.user_agent_guid = guid;
        self.client_version = client_version;
        self
    }

    #[must_use]
    pub const fn with_hashing_options(mut self, options: HashingOptions) -> Self {
        self.hashing_options = Some(options);
        self
    }

    /// Attaches data elements, replacing any already attached.
    #[must_use]
    pub fn with_data_elements(mut self, elements: Vec<DataElement>) -> Self {
        self.data_elements = Some(DataElementPackage::new(elements));
        self
    }

    /// Appends a sub-request along with the data elements it sends.
    pub fn add_sub_request(&mut self, sub_request: SubRequest, elements: Vec<DataElement>) {
        self.sub_requests.push(sub_request);
        if !elements.is_empty() {
            self.data_elements
                .get_or_insert_with(DataElementPackage::default)
                .elements
                .extend(elements);
        }
    }

    #[must_use]
    pub const fn user_agent_guid(&self) -> Guid {
        self.user_agent_guid
    }

    #[must_use]
    pub const fn client_version(&self) -> u32 {
        self.client_version
    }

    #[must_use]
    pub const fn hashing_options(&self) -> Option<&HashingOptions> {
        self.hashing_options.as_ref()
    }

    #[must_use]
    pub fn sub_requests(&self) -> &[SubRequest] {
        &self.sub_requests
    }

    /// Data elements sent with the request, if any.
    #[must_use]
    pub fn data_elements(&self) -> &[DataElement] {
        self.data_elements
            .as_ref()
            .map_or(&[], |package| package.elements.as_slice())
    }

    /// Encodes the preamble and Request object.
    pub fn to_bytes(&self) -> CodecResult<Vec<u8>> {
        let mut writer = BitWriter::new();
        writer.write_u16_aligned(PROTOCOL_VERSION)?;
        writer.write_u16_aligned(MINIMUM_VERSION)?;
        writer.write_u64_aligned(SIGNATURE)?;
        encode_stream_object(self, &mut writer)?;
        let bytes = writer.finish();
        debug!(
            sub_requests = self.sub_requests.len(),
            data_elements = self.data_elements().len(),
            bytes = bytes.len(),
            "encoded cell request"
        );
        Ok(bytes)
    }

    /// Encodes the request as standard padded base64.
    pub fn to_base64(&self) -> CodecResult<String> {
        Ok(STANDARD.encode(self.to_bytes()?))
    }

    /// Decodes a request, rejecting anything after the Request End header.
    pub fn decode(bytes: &[u8], limits: &CodecLimits) -> CodecResult<Self> {
        DecodeContext::check_limit(LimitKind::RequestBytes, limits.max_request_bytes, bytes.len())?;
        let mut reader = BitReader::new(bytes);

        expect_preamble(
            PreambleField::ProtocolVersion,
            u64::from(PROTOCOL_VERSION),
            u64::from(reader.read_u16_aligned()?),
        )?;
        expect_preamble(
            PreambleField::MinimumVersion,
            u64::from(MINIMUM_VERSION),
            u64::from(reader.read_u16_aligned()?),
        )?;
        expect_preamble(PreambleField::Signature, SIGNATURE, reader.read_u64_aligned()?)?;

        let mut ctx = DecodeContext::new(limits);
        let request: Self = decode_stream_object(&mut reader, &mut ctx)?;
        if !reader.is_empty() {
            return Err(CodecError::TrailingBytes {
                remaining: reader.bytes_remaining(),
            });
        }

        debug!(
            sub_requests = request.sub_requests.len(),
            data_elements = request.data_elements().len(),
            bytes = bytes.len(),
            "decoded cell request"
        );
        Ok(request)
    }

    /// Decodes a request from standard padded base64.
    pub fn from_base64(text: &str, limits: &CodecLimits) -> CodecResult<Self> {
        let bytes = STANDARD.decode(text.trim())?;
        Self::decode(&bytes, limits)
    }
}

fn expect_preamble(field: PreambleField, expected: u64, found: u64) -> CodecResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(CodecError::InvalidPreamble {
            field,
            expected,
            found,
        })
    }
}

impl StreamObject for CellRequest {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::Request;

    fn encode_items(&self, _writer: &mut BitWriter) -> CodecResult<()> {
        Ok(())
    }

    fn encode_children(&self, writer: &mut BitWriter) -> CodecResult<()> {
        encode_stream_object(
            &UserAgent {
                guid: self.user_agent_guid,
                version: self.client_version,
            },
            writer,
        )?;
        if let Some(options) = &self.hashing_options {
            encode_stream_object(options, writer)?;
        }
        for sub_request in &self.sub_requests {
            encode_stream_object(sub_request, writer)?;
        }
        if let Some(package) = &self.data_elements {
            encode_stream_object(package, writer)?;
        }
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        header: &StreamObjectHeaderStart,
        ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        check_items_consumed(header, reader.byte_position(), reader)?;
        let user_agent: UserAgent = decode_stream_object(reader, ctx)?;
        let hashing_options = decode_optional(reader, ctx)?;
        let limit = ctx.limits().max_sub_requests;
        let sub_requests: Vec<SubRequest> =
            decode_repeated(reader, ctx, LimitKind::SubRequests, limit)?;
        if sub_requests.is_empty() {
            return Err(CodecError::EmptySubRequestList);
        }
        let data_elements = decode_optional(reader, ctx)?;

        Ok(Self {
            user_agent_guid: user_agent.guid,
            client_version: user_agent.version,
            hashing_options,
            sub_requests,
            data_elements,
        })
    }
}

struct UserAgent {
    guid: Guid,
    version: u32,
}

impl StreamObject for UserAgent {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::UserAgent;

    fn encode_items(&self, _writer: &mut BitWriter) -> CodecResult<()> {
        Ok(())
    }

    fn encode_children(&self, writer: &mut BitWriter) -> CodecResult<()> {
        encode_stream_object(&UserAgentGuid(self.guid), writer)?;
        encode_stream_object(&UserAgentVersion(self.version), writer)
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        header: &StreamObjectHeaderStart,
        ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        check_items_consumed(header, reader.byte_position(), reader)?;
        let UserAgentGuid(guid) = decode_stream_object(reader, ctx)?;
        let UserAgentVersion(version) = decode_stream_object(reader, ctx)?;
        Ok(Self { guid, version })
    }
}

struct UserAgentGuid(Guid);

impl StreamObject for UserAgentGuid {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::UserAgentGuid;

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

struct UserAgentVersion(u32);

impl StreamObject for UserAgentVersion {
    const OBJECT_TYPE: StreamObjectType = StreamObjectType::UserAgentVersion;

    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()> {
        writer.write_u32_aligned(self.0)?;
        Ok(())
    }

    fn decode_body(
        reader: &mut BitReader<'_>,
        _header: &StreamObjectHeaderStart,
        _ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self> {
        Ok(Self(reader.read_u32_aligned()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{read_file_content, DataElementBuilder};
    use crate::stream_object::tests::{decode, encode};
    use wire::{ExGuid, SerialNumber};

    fn query_access_request() -> CellRequest {
        CellRequest::new(vec![SubRequest::query_access(1)]).unwrap()
    }

    #[test]
    fn empty_request_is_rejected() {
        assert_eq!(
            CellRequest::new(Vec::new()).unwrap_err(),
            CodecError::EmptySubRequestList
        );
    }

    #[test]
    fn preamble_layout() {
        let bytes = query_access_request().to_bytes().unwrap();
        assert_eq!(bytes[..4], [0x0C, 0x00, 0x0B, 0x00]);
        assert_eq!(bytes[4..12], SIGNATURE.to_le_bytes());
        // Request Start32, compound, no items
        assert_eq!(bytes[12..16], [0x06, 0x02, 0x00, 0x00]);
    }

    #[test]
    fn request_ends_with_request_end() {
        let bytes = query_access_request().to_bytes().unwrap();
        assert_eq!(bytes[bytes.len() - 2..], [0x03, 0x01]);
    }

    #[test]
    fn user_agent_layout() {
        let bytes = encode(&UserAgent {
            guid: Guid::from_u128(1),
            version: 0x0102_0304,
        });
        // UserAgent Start32, UserAgentGuid Start32 + GUID, UserAgentVersion Start32 + u32, End16
        assert_eq!(bytes.len(), 4 + 4 + 16 + 4 + 4 + 2);
        assert_eq!(bytes[28..32], [0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn hashing_options_roundtrip() {
        let options = HashingOptions {
            include_hashes: true,
            ..HashingOptions::default()
        };
        let bytes = encode(&options);
        assert_eq!(bytes[4..], [0x03, 0b0000_1000]);
        assert_eq!(decode::<HashingOptions>(&bytes).unwrap(), options);
    }

    #[test]
    fn full_request_roundtrip() {
        let guid = Guid::from_u128(0x1234);
        let element = DataElement::object_data_blob(
            ExGuid::new(1, guid),
            SerialNumber::new(guid, 1),
            b"payload".to_vec(),
        );
        let mut request = CellRequest::new(vec![SubRequest::query_access(1)])
            .unwrap()
            .with_user_agent(guid, 42)
            .with_hashing_options(HashingOptions::default());
        request.add_sub_request(SubRequest::allocate_extended_guid_range(2, 10), vec![element]);

        let bytes = request.to_bytes().unwrap();
        let decoded = CellRequest::decode(&bytes, &CodecLimits::default()).unwrap();
        assert_eq!(decoded, request);
        assert_eq!(decoded.sub_requests().len(), 2);
        assert_eq!(decoded.data_elements().len(), 1);
        assert_eq!(decoded.client_version(), 42);
    }

    #[test]
    fn object_group_with_header_like_bytes_roundtrips() {
        let guid = Guid::from_u128(0x1234);
        let file = DataElementBuilder::new(guid)
            .build(&[0xFF, 0x00, 0x13])
            .unwrap();
        let mut request = query_access_request();
        request.add_sub_request(SubRequest::allocate_extended_guid_range(2, 10), file.elements);

        let bytes = request.to_bytes().unwrap();
        let decoded = CellRequest::decode(&bytes, &CodecLimits::default()).unwrap();
        assert_eq!(decoded, request);
        assert_eq!(
            read_file_content(decoded.data_elements(), file.storage_index_id).unwrap(),
            [0xFF, 0x00, 0x13]
        );
    }

    #[test]
    fn base64_roundtrip_is_byte_identical() {
        let request = query_access_request();
        let bytes = request.to_bytes().unwrap();
        let text = request.to_base64().unwrap();
        let decoded = CellRequest::from_base64(&text, &CodecLimits::default()).unwrap();
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let err = CellRequest::from_base64("not base64!", &CodecLimits::default()).unwrap_err();
        assert!(matches!(err, CodecError::InvalidBase64(_)));
    }

    #[test]
    fn wrong_preamble_is_rejected() {
        let mut bytes = query_access_request().to_bytes().unwrap();
        bytes[0] = 13;
        assert_eq!(
            CellRequest::decode(&bytes, &CodecLimits::default()).unwrap_err(),
            CodecError::InvalidPreamble {
                field: PreambleField::ProtocolVersion,
                expected: 12,
                found: 13,
            }
        );

        let mut bytes = query_access_request().to_bytes().unwrap();
        bytes[4] ^= 0xFF;
        assert!(matches!(
            CellRequest::decode(&bytes, &CodecLimits::default()).unwrap_err(),
            CodecError::InvalidPreamble {
                field: PreambleField::Signature,
                ..
            }
        ));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = query_access_request().to_bytes().unwrap();
        bytes.push(0);
        assert_eq!(
            CellRequest::decode(&bytes, &CodecLimits::default()).unwrap_err(),
            CodecError::TrailingBytes { remaining: 1 }
        );
    }

    #[test]
    fn request_byte_limit_is_enforced() {
        let bytes = query_access_request().to_bytes().unwrap();
        let limits = CodecLimits {
            max_request_bytes: 16,
            ..CodecLimits::default()
        };
        assert!(matches!(
            CellRequest::decode(&bytes, &limits).unwrap_err(),
            CodecError::LimitsExceeded {
                kind: LimitKind::RequestBytes,
                limit: 16,
                ..
            }
        ));
    }
}
