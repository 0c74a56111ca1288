use std::sync::Arc;

use serde_json::{Value, json};
use tagedit_core::compression::{self, Compression};
use tagedit_core::core_api::{Engine, MemoryStore, OpenMode};
use tagedit_core::nbt::{self, FormatVariant};
use tagedit_core::{Compound, List, NamedTag, PathSegment, Tag, TagKind};
use tagedit_render::{
    JsonStyle, TextRenderOptions, TextStyle, render_children, render_json, render_json_at,
    render_json_session, render_session_header, render_text, render_text_with_options,
};

fn player() -> NamedTag {
    let pos = List::new(TagKind::Double, vec![Tag::Double(0.5), Tag::Double(64.0)]).unwrap();
    NamedTag::new(
        "Player",
        Tag::Compound(
            Compound::new()
                .with("Health", Tag::Byte(20))
                .with("Pos", Tag::List(pos))
                .with("display name", Tag::String("Steve".into()))
                .with("Seed", Tag::Long(i64::MAX)),
        ),
    )
}

#[test]
fn tree_text_indents_children() {
    let text = render_text(&player(), TextStyle::Tree);
    assert_eq!(
        text,
        "Player: compound (4 entries)\n\
         \x20 Health: 20b\n\
         \x20 Pos: list of double (2 items)\n\
         \x20   [0]: 0.5d\n\
         \x20   [1]: 64d\n\
         \x20 display name: \"Steve\"\n\
         \x20 Seed: 9223372036854775807L\n"
    );
}

#[test]
fn snbt_text_is_single_line() {
    let text = render_text(&player(), TextStyle::Snbt);
    assert_eq!(
        text,
        "{Health: 20b, Pos: [0.5d, 64d], \"display name\": \"Steve\", Seed: 9223372036854775807L}"
    );
}

#[test]
fn long_arrays_are_previewed_unless_verbose() {
    let root = NamedTag::new(
        "",
        Tag::Compound(Compound::new().with("data", Tag::ByteArray((0..10i8).collect()))),
    );

    let short = render_text(&root, TextStyle::Tree);
    assert!(short.starts_with("(root): compound (1 entries)\n"));
    assert!(short.contains("  data: byte_array (10) [0b, 1b, 2b, 3b, 4b, 5b, 6b, 7b, ... +2 more]"));

    let full = render_text_with_options(&root, TextStyle::Tree, TextRenderOptions { verbose: true });
    assert!(full.contains("[0b, 1b, 2b, 3b, 4b, 5b, 6b, 7b, 8b, 9b]"));
}

#[test]
fn plain_json_keeps_entry_order_and_long_precision() {
    let value = render_json(&player(), JsonStyle::Plain);
    assert_eq!(value["name"], json!("Player"));
    let root = value["root"].as_object().expect("root object");
    let keys: Vec<&str> = root.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["Health", "Pos", "display name", "Seed"]);
    assert_eq!(root["Seed"].as_i64(), Some(i64::MAX));
    assert_eq!(root["Pos"], json!([0.5, 64.0]));
}

#[test]
fn typed_json_names_kinds() {
    let pos = render_json_at(
        &player(),
        &[PathSegment::Key("Pos".into())],
        JsonStyle::Typed,
    )
    .expect("path resolves");
    assert_eq!(
        pos,
        json!({
            "kind": "list",
            "item_kind": "double",
            "value": [
                {"kind": "double", "value": 0.5},
                {"kind": "double", "value": 64.0},
            ],
        })
    );
    assert!(render_json_at(&player(), &[PathSegment::Index(0)], JsonStyle::Plain).is_none());
}

#[test]
fn children_listing_matches_tree_rows() {
    let listing = render_children(&player(), &[]).expect("root has children");
    assert_eq!(
        listing,
        "Health  byte\nPos  list (2)\ndisplay name  string\nSeed  long\n"
    );
    let listing = render_children(&player(), &[PathSegment::Key("Pos".into())]).unwrap();
    assert_eq!(listing, "[0]  double\n[1]  double\n");
    assert!(render_children(&player(), &[PathSegment::Key("Health".into())]).is_none());
}

#[tokio::test]
async fn session_views_cover_both_modes() {
    let payload = nbt::write(&player(), FormatVariant::Big).unwrap();
    let packed = compression::compress(&payload, &Compression::gzip()).unwrap();
    let store = Arc::new(
        MemoryStore::new()
            .with_file("player.dat", packed)
            .with_file("notes.bin", b"Hello".to_vec()),
    );
    let engine = Engine::new(store);

    let session = engine.open("player.dat", OpenMode::Auto).await.unwrap();
    let header = render_session_header(&session);
    assert_eq!(
        header,
        format!(
            "path:       player.dat\n\
             mode:       structured (big)\n\
             compressed: gzip\n\
             size:       {} bytes\n",
            payload.len()
        )
    );
    let value = render_json_session(&session, JsonStyle::Plain);
    assert_eq!(value["mode"], json!("structured"));
    assert_eq!(value["variant"], json!("big"));
    assert_eq!(value["compressed"], json!(true));
    assert_eq!(value["root"]["Health"], json!(20));

    let session = engine.open("notes.bin", OpenMode::Auto).await.unwrap();
    let value = render_json_session(&session, JsonStyle::Plain);
    assert_eq!(value["mode"], json!("raw"));
    assert_eq!(value["variant"], Value::Null);
    assert_eq!(value["hex"], json!("48 65 6c 6c 6f"));
    assert!(render_session_header(&session).contains("mode:       raw\n"));
}
