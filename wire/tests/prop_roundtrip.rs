use proptest::prelude::*;
use wire::{
    BinaryItem, CellId, CompactU64, Decode, Encode, ExGuid, FileChunk, Guid, SerialNumber,
    StreamObjectHeaderEnd, StreamObjectHeaderStart, StreamObjectType, StringItem, WireError,
};

fn guid_strategy() -> impl Strategy<Value = Guid> {
    any::<u128>().prop_map(Guid::from_u128)
}

fn ex_guid_strategy() -> impl Strategy<Value = ExGuid> {
    prop_oneof![
        Just(ExGuid::NULL),
        (any::<u32>(), guid_strategy()).prop_map(|(value, guid)| ExGuid::new(value, guid)),
        (0u32..0x20, guid_strategy()).prop_map(|(value, guid)| ExGuid::new(value, guid)),
    ]
}

fn object_type_strategy() -> impl Strategy<Value = StreamObjectType> {
    prop::sample::select(StreamObjectType::ALL.to_vec())
}

fn assert_roundtrip<T>(value: &T) -> Result<(), TestCaseError>
where
    T: Encode + Decode + PartialEq + std::fmt::Debug,
{
    let bytes = value.to_bytes().unwrap();
    let (decoded, consumed) = T::decode_from(&bytes, 0).unwrap();
    prop_assert_eq!(&decoded, value);
    prop_assert_eq!(consumed, bytes.len());
    Ok(())
}

proptest! {
    #[test]
    fn compact_roundtrip(value in any::<u64>()) {
        let compact = CompactU64::new(value);
        prop_assert_eq!(compact.to_bytes().unwrap().len(), compact.encoded_len());
        assert_roundtrip(&compact)?;
    }

    #[test]
    fn compact_small_values_roundtrip(value in 0u64..0x1_0000) {
        assert_roundtrip(&CompactU64::new(value))?;
    }

    #[test]
    fn ex_guid_roundtrip(id in ex_guid_strategy()) {
        prop_assert_eq!(id.to_bytes().unwrap().len(), id.encoded_len());
        assert_roundtrip(&id)?;
    }

    #[test]
    fn serial_number_roundtrip(guid in guid_strategy(), value in any::<u64>()) {
        assert_roundtrip(&SerialNumber::new(guid, value))?;
    }

    #[test]
    fn cell_id_roundtrip(a in ex_guid_strategy(), b in ex_guid_strategy()) {
        assert_roundtrip(&CellId::new(a, b))?;
    }

    #[test]
    fn binary_item_roundtrip(content in prop::collection::vec(any::<u8>(), 0..300)) {
        assert_roundtrip(&BinaryItem::new(content))?;
    }

    #[test]
    fn string_item_roundtrip(content in ".{0,40}") {
        assert_roundtrip(&StringItem::new(content))?;
    }

    #[test]
    fn file_chunk_roundtrip(start in any::<u64>(), length in any::<u64>()) {
        assert_roundtrip(&FileChunk::new(start, length))?;
    }

    #[test]
    fn start_header_roundtrip(ty in object_type_strategy(), length in 0u64..100_000) {
        let header = StreamObjectHeaderStart::new(ty, length);
        prop_assert_eq!(header.to_bytes().unwrap().len(), header.encoded_len());
        assert_roundtrip(&header)?;
    }

    #[test]
    fn end_header_roundtrip(ty in object_type_strategy()) {
        assert_roundtrip(&StreamObjectHeaderEnd::new(ty))?;
    }

    #[test]
    fn truncated_inputs_never_panic(value in any::<u64>(), cut in 0usize..9) {
        let bytes = CompactU64::new(value).to_bytes().unwrap();
        let cut = cut.min(bytes.len().saturating_sub(1));
        let err = CompactU64::decode_from(&bytes[..cut], 0).unwrap_err();
        prop_assert!(matches!(err, WireError::TruncatedInput { .. }), "unexpected error: {:?}", err);
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = ExGuid::decode_from(&bytes, 0);
        let _ = SerialNumber::decode_from(&bytes, 0);
        let _ = StringItem::decode_from(&bytes, 0);
        let _ = StreamObjectHeaderStart::decode_from(&bytes, 0);
        let _ = StreamObjectHeaderEnd::decode_from(&bytes, 0);
    }
}
