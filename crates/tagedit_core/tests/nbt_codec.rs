use std::sync::Arc;

use tagedit_core::nbt::{self, DEFAULT_MAX_DEPTH, FormatVariant};
use tagedit_core::{Compound, List, NamedTag, Tag, TagKind};

fn hello_world_big() -> Vec<u8> {
    let mut bytes = vec![0x0a, 0x00, 0x0b];
    bytes.extend_from_slice(b"hello world");
    bytes.extend_from_slice(&[0x08, 0x00, 0x04]);
    bytes.extend_from_slice(b"name");
    bytes.extend_from_slice(&[0x00, 0x09]);
    bytes.extend_from_slice(b"Bananrama");
    bytes.push(0x00);
    bytes
}

fn every_kind() -> NamedTag {
    let items = List::new(
        TagKind::Compound,
        vec![
            Tag::Compound(Compound::new().with("id", Tag::String("stone".into()))),
            Tag::Compound(Compound::new().with("Count", Tag::Byte(64))),
        ],
    )
    .unwrap();
    let nested = List::new(
        TagKind::List,
        vec![
            Tag::List(List::new(TagKind::Int, vec![Tag::Int(1), Tag::Int(-2)]).unwrap()),
            Tag::List(List::empty(TagKind::End)),
        ],
    )
    .unwrap();
    let root = Compound::new()
        .with("byte", Tag::Byte(-7))
        .with("short", Tag::Short(-300))
        .with("int", Tag::Int(123_456_789))
        .with("long", Tag::Long(i64::MAX))
        .with("float", Tag::Float(1.5))
        .with("double", Tag::Double(-2.25))
        .with("string", Tag::String("héllo wörld".into()))
        .with("bytes", Tag::ByteArray(Arc::from(vec![-1i8, 0, 1])))
        .with("ints", Tag::IntArray(Arc::from(vec![i32::MIN, 7])))
        .with("longs", Tag::LongArray(Arc::from(vec![i64::MIN, 0, i64::MAX])))
        .with("Inventory", Tag::List(items))
        .with("nested", Tag::List(nested))
        .with("empty", Tag::Compound(Compound::new()));
    NamedTag::new("Data", Tag::Compound(root))
}

#[test]
fn reads_hello_world_fixture() {
    let bytes = hello_world_big();
    let root = nbt::read(&bytes, FormatVariant::Big).expect("parse hello world");
    assert_eq!(root.name, "hello world");
    let compound = root.tag.as_compound().expect("root compound");
    assert_eq!(compound.len(), 1);
    assert_eq!(compound.get("name"), Some(&Tag::String("Bananrama".into())));

    assert_eq!(nbt::write(&root, FormatVariant::Big).unwrap(), bytes);
}

#[test]
fn structured_roundtrip_in_every_variant() {
    let tree = every_kind();
    for variant in [
        FormatVariant::Big,
        FormatVariant::Little,
        FormatVariant::LittleVarint,
        FormatVariant::BedrockLevel { storage_version: 10 },
    ] {
        let bytes = nbt::write(&tree, variant)
            .unwrap_or_else(|e| panic!("failed to encode {variant}: {e}"));
        let parsed = nbt::read(&bytes, variant)
            .unwrap_or_else(|e| panic!("failed to decode {variant}: {e}"));
        assert_eq!(parsed, tree, "{variant}");
        assert_eq!(nbt::write(&parsed, variant).unwrap(), bytes, "{variant}");
    }
}

#[test]
fn detects_big_endian() {
    let (root, variant) = nbt::detect(&hello_world_big(), DEFAULT_MAX_DEPTH).expect("detect");
    assert_eq!(variant, FormatVariant::Big);
    assert_eq!(root.name, "hello world");
}

#[test]
fn detects_little_endian() {
    let bytes = [
        0x0a, 0x00, 0x00, // root compound, empty name
        0x03, 0x01, 0x00, b'a', 0x01, 0x00, 0x00, 0x00, // int "a" = 1
        0x00,
    ];
    let (root, variant) = nbt::detect(&bytes, DEFAULT_MAX_DEPTH).expect("detect");
    assert_eq!(variant, FormatVariant::Little);
    assert_eq!(
        root.tag.as_compound().and_then(|c| c.get("a")),
        Some(&Tag::Int(1))
    );
}

#[test]
fn detects_little_varint() {
    let bytes = [
        0x0a, 0x00, // root compound, empty name
        0x03, 0x01, b'a', 0x02, // int "a" = zigzag(1)
        0x01, 0x01, b'b', 0x05, // byte "b" = 5
        0x00,
    ];
    let (root, variant) = nbt::detect(&bytes, DEFAULT_MAX_DEPTH).expect("detect");
    assert_eq!(variant, FormatVariant::LittleVarint);
    let compound = root.tag.as_compound().unwrap();
    assert_eq!(compound.get("a"), Some(&Tag::Int(1)));
    assert_eq!(compound.get("b"), Some(&Tag::Byte(5)));
}

#[test]
fn detects_bedrock_level_header() {
    let payload = [
        0x0a, 0x00, 0x00, 0x03, 0x01, 0x00, b'a', 0x01, 0x00, 0x00, 0x00, 0x00,
    ];
    let mut bytes = 10i32.to_le_bytes().to_vec();
    bytes.extend_from_slice(&(payload.len() as i32).to_le_bytes());
    bytes.extend_from_slice(&payload);

    let (root, variant) = nbt::detect(&bytes, DEFAULT_MAX_DEPTH).expect("detect");
    assert_eq!(variant, FormatVariant::BedrockLevel { storage_version: 10 });
    assert_eq!(nbt::write(&root, variant).unwrap(), bytes);
}

#[test]
fn level_header_length_is_recomputed_on_write() {
    let variant = FormatVariant::BedrockLevel { storage_version: 9 };
    let root = NamedTag::new(
        "",
        Tag::Compound(Compound::new().with("LevelName", Tag::String("My World".into()))),
    );
    let bytes = nbt::write(&root, variant).unwrap();
    assert_eq!(&bytes[..4], &9i32.to_le_bytes());
    assert_eq!(
        i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize,
        bytes.len() - 8
    );
}

#[test]
fn rejects_trailing_bytes() {
    let mut bytes = hello_world_big();
    bytes.push(0x00);
    assert!(nbt::read(&bytes, FormatVariant::Big).is_err());
}

#[test]
fn rejects_truncated_input() {
    let mut bytes = hello_world_big();
    bytes.truncate(bytes.len() - 3);
    assert!(nbt::read(&bytes, FormatVariant::Big).is_err());
    assert!(nbt::detect(&bytes, DEFAULT_MAX_DEPTH).is_none());
}

#[test]
fn rejects_negative_and_oversized_lengths() {
    // root int array with length -1
    let negative = [0x0b, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff];
    assert!(nbt::read(&negative, FormatVariant::Big).is_err());
    // root byte array claiming far more bytes than present
    let oversized = [0x07, 0x00, 0x00, 0x7f, 0xff, 0xff, 0xff, 0x01];
    assert!(nbt::read(&oversized, FormatVariant::Big).is_err());
}

#[test]
fn rejects_duplicate_compound_names() {
    let bytes = [
        0x0a, 0x00, 0x00, //
        0x01, 0x00, 0x01, b'x', 0x01, //
        0x01, 0x00, 0x01, b'x', 0x02, //
        0x00,
    ];
    assert!(nbt::read(&bytes, FormatVariant::Big).is_err());
}

#[test]
fn rejects_invalid_utf8_strings() {
    let bytes = [0x08, 0x00, 0x00, 0x00, 0x02, 0xc0, 0x80];
    assert!(nbt::read(&bytes, FormatVariant::Big).is_err());
}

#[test]
fn rejects_end_root_and_unknown_kinds() {
    assert!(nbt::read(&[0x00], FormatVariant::Big).is_err());
    assert!(nbt::read(&[0x0d, 0x00, 0x00], FormatVariant::Big).is_err());
    assert!(nbt::detect(&[], DEFAULT_MAX_DEPTH).is_none());
}

#[test]
fn enforces_depth_limit() {
    // root list of lists, nested 10 deep, innermost empty
    let mut bytes = vec![0x09, 0x00, 0x00];
    for _ in 0..9 {
        bytes.extend_from_slice(&[0x09, 0x00, 0x00, 0x00, 0x01]);
    }
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00]);
    assert!(nbt::read_with_depth(&bytes, FormatVariant::Big, 16).is_ok());
    assert!(nbt::read_with_depth(&bytes, FormatVariant::Big, 5).is_err());
}

#[test]
fn non_canonical_varints_are_not_detected() {
    // the varint fixture with "a" encoded as a padded two-byte varint
    let padded = [
        0x0a, 0x00, 0x03, 0x01, b'a', 0x82, 0x00, 0x01, 0x01, b'b', 0x05, 0x00,
    ];
    assert!(nbt::read(&padded, FormatVariant::LittleVarint).is_ok());
    assert!(nbt::detect(&padded, DEFAULT_MAX_DEPTH).is_none());
}

#[test]
fn write_rejects_inconsistent_list() {
    let list = List::new(TagKind::Int, vec![Tag::Int(1), Tag::Int(2)]).unwrap();
    let root = tagedit_core::path::set(
        &Tag::List(list),
        &[tagedit_core::PathSegment::Index(1)],
        Tag::String("two".into()),
    );
    let err = nbt::write(&NamedTag::new("", root), FormatVariant::Big).unwrap_err();
    assert!(err.to_string().contains("index 1"));
}

#[test]
fn write_rejects_overlong_strings() {
    let root = NamedTag::new("", Tag::String("x".repeat(70_000)));
    assert!(nbt::write(&root, FormatVariant::Big).is_err());
    assert!(nbt::write(&root, FormatVariant::LittleVarint).is_ok());
}
