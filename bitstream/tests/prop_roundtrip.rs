use bitstream::{BitReader, BitWriter};
use proptest::prelude::*;

/// One field as a stream object encoder would emit it.
#[derive(Clone, Debug)]
enum Field {
    Flag(bool),
    Packed { width: u8, value: u64 },
    Unary(u8),
    Word(u32),
    Raw(Vec<u8>),
}

impl Field {
    const fn is_aligned(&self) -> bool {
        matches!(self, Self::Word(_) | Self::Raw(_))
    }

    fn write(&self, writer: &mut BitWriter) {
        if self.is_aligned() {
            writer.align_to_byte();
        }
        match self {
            Self::Flag(flag) => writer.write_bool(*flag),
            Self::Packed { width, value } => writer.write_bits(*value, *width).unwrap(),
            Self::Unary(zeros) => writer.write_unary(*zeros).unwrap(),
            Self::Word(word) => writer.write_u32_aligned(*word).unwrap(),
            Self::Raw(bytes) => writer.write_bytes(bytes).unwrap(),
        }
    }

    fn check(&self, reader: &mut BitReader<'_>) -> Result<(), TestCaseError> {
        if self.is_aligned() {
            reader.align_to_byte().unwrap();
        }
        match self {
            Self::Flag(flag) => prop_assert_eq!(reader.read_bit().unwrap(), *flag),
            Self::Packed { width, value } => {
                prop_assert_eq!(reader.read_bits(*width).unwrap(), *value);
            }
            Self::Unary(zeros) => prop_assert_eq!(reader.read_unary(u8::MAX).unwrap(), *zeros),
            Self::Word(word) => prop_assert_eq!(reader.read_u32_aligned().unwrap(), *word),
            Self::Raw(bytes) => prop_assert_eq!(reader.read_bytes(bytes.len()).unwrap(), &bytes[..]),
        }
        Ok(())
    }
}

fn field_strategy() -> impl Strategy<Value = Field> {
    prop_oneof![
        any::<bool>().prop_map(Field::Flag),
        (0u8..=64, any::<u64>()).prop_map(|(width, value)| Field::Packed {
            width,
            value: if width == 64 { value } else { value & ((1u64 << width) - 1) },
        }),
        (0u8..16).prop_map(Field::Unary),
        any::<u32>().prop_map(Field::Word),
        prop::collection::vec(any::<u8>(), 0..24).prop_map(Field::Raw),
    ]
}

proptest! {
    #[test]
    fn fields_read_back_in_order(fields in prop::collection::vec(field_strategy(), 1..48)) {
        let mut writer = BitWriter::new();
        for field in &fields {
            field.write(&mut writer);
        }
        let bits = writer.bits_written();
        let bytes = writer.finish();
        prop_assert_eq!(bytes.len(), bits.div_ceil(8));

        let mut reader = BitReader::new(&bytes);
        for field in &fields {
            field.check(&mut reader)?;
        }
        prop_assert!(reader.bits_remaining() < 8);
    }

    #[test]
    fn wide_fields_are_little_endian(value in any::<u64>()) {
        let mut writer = BitWriter::new();
        writer.write_bits(value, 64).unwrap();
        prop_assert_eq!(writer.finish(), value.to_le_bytes().to_vec());
    }

    #[test]
    fn reads_never_panic(data in prop::collection::vec(any::<u8>(), 0..32), widths in prop::collection::vec(0u8..=70, 0..32)) {
        let mut reader = BitReader::new(&data);
        for width in widths {
            let _ = reader.read_bits(width);
            let _ = reader.read_unary(width);
        }
    }
}
