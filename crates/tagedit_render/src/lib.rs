use serde_json::{Map as JsonMap, Value as JsonValue};
use tagedit_core::core_api::{EditMode, Session};
use tagedit_core::path;
use tagedit_core::{ChildInfo, NamedTag, PathSegment, Tag};

const INDENT: &str = "  ";
const ARRAY_PREVIEW_ITEMS: usize = 8;
const LABEL_WIDTH: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    /// Plain JSON values: compounds become objects, lists and arrays become
    /// arrays. Kinds are lost.
    #[default]
    Plain,
    /// Every node is `{"kind": ..., "value": ...}`; lists also carry
    /// `item_kind`.
    Typed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextStyle {
    /// One node per line, children indented under their parent.
    #[default]
    Tree,
    /// The whole tree on one line in stringified form.
    Snbt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextRenderOptions {
    /// Print every array element instead of a short preview.
    pub verbose: bool,
}

pub fn render_json(tree: &NamedTag, style: JsonStyle) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("name".to_string(), JsonValue::String(tree.name.clone()));
    out.insert("root".to_string(), tag_to_json(&tree.tag, style));
    JsonValue::Object(out)
}

/// JSON for the node at `path`, `None` when the path does not resolve.
pub fn render_json_at(tree: &NamedTag, path: &[PathSegment], style: JsonStyle) -> Option<JsonValue> {
    path::get(&tree.tag, path).map(|tag| tag_to_json(tag, style))
}

pub fn render_json_session(session: &Session, style: JsonStyle) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("path".to_string(), JsonValue::String(session.path().to_string()));
    out.insert(
        "mode".to_string(),
        JsonValue::String(mode_label(session.mode()).to_string()),
    );
    out.insert(
        "variant".to_string(),
        match session.variant() {
            Some(variant) => JsonValue::String(variant.to_string()),
            None => JsonValue::Null,
        },
    );
    out.insert(
        "compressed".to_string(),
        JsonValue::Bool(session.was_compressed()),
    );
    match session.tree() {
        Some(tree) => {
            out.insert("name".to_string(), JsonValue::String(tree.name.clone()));
            out.insert("root".to_string(), tag_to_json(&tree.tag, style));
        }
        None => {
            out.insert(
                "hex".to_string(),
                JsonValue::String(session.hex_text().unwrap_or_default().to_string()),
            );
        }
    }
    JsonValue::Object(out)
}

pub fn tag_to_json(tag: &Tag, style: JsonStyle) -> JsonValue {
    let value = match tag {
        Tag::Byte(v) => JsonValue::from(*v),
        Tag::Short(v) => JsonValue::from(*v),
        Tag::Int(v) => JsonValue::from(*v),
        Tag::Long(v) => JsonValue::from(*v),
        Tag::Float(v) => JsonValue::from(*v),
        Tag::Double(v) => JsonValue::from(*v),
        Tag::String(s) => JsonValue::String(s.clone()),
        Tag::ByteArray(values) => values.iter().copied().map(JsonValue::from).collect(),
        Tag::IntArray(values) => values.iter().copied().map(JsonValue::from).collect(),
        Tag::LongArray(values) => values.iter().copied().map(JsonValue::from).collect(),
        Tag::List(list) => list.iter().map(|item| tag_to_json(item, style)).collect(),
        Tag::Compound(compound) => JsonValue::Object(
            compound
                .iter()
                .map(|(name, child)| (name.to_string(), tag_to_json(child, style)))
                .collect(),
        ),
    };

    match style {
        JsonStyle::Plain => value,
        JsonStyle::Typed => {
            let mut node = JsonMap::new();
            node.insert(
                "kind".to_string(),
                JsonValue::String(tag.kind().as_str().to_string()),
            );
            if let Tag::List(list) = tag {
                node.insert(
                    "item_kind".to_string(),
                    JsonValue::String(list.item_kind().as_str().to_string()),
                );
            }
            node.insert("value".to_string(), value);
            JsonValue::Object(node)
        }
    }
}

pub fn render_text(tree: &NamedTag, style: TextStyle) -> String {
    render_text_with_options(tree, style, TextRenderOptions::default())
}

pub fn render_text_with_options(
    tree: &NamedTag,
    style: TextStyle,
    options: TextRenderOptions,
) -> String {
    match style {
        TextStyle::Tree => {
            let mut out = String::new();
            write_node(&mut out, &root_label(&tree.name), &tree.tag, 0, options);
            out
        }
        TextStyle::Snbt => tree.tag.to_string(),
    }
}

/// Header block describing an open session.
pub fn render_session_header(session: &Session) -> String {
    let mut out = String::new();
    let mode = match session.variant() {
        Some(variant) => format!("{} ({variant})", mode_label(session.mode())),
        None => mode_label(session.mode()).to_string(),
    };
    push_field(&mut out, "path", session.path());
    push_field(&mut out, "mode", &mode);
    push_field(
        &mut out,
        "compressed",
        if session.was_compressed() { "gzip" } else { "no" },
    );
    push_field(
        &mut out,
        "size",
        &format!("{} bytes", session.payload().len()),
    );
    out
}

/// One line per direct child of the node at `path`, as a tree widget would
/// list them. `None` when the path does not resolve to a compound or list.
pub fn render_children(tree: &NamedTag, path: &[PathSegment]) -> Option<String> {
    let rows = path::children(&tree.tag, path)?;
    let mut out = String::new();
    for row in &rows {
        out.push_str(&child_row(row));
        out.push('\n');
    }
    Some(out)
}

fn child_row(row: &ChildInfo) -> String {
    match row.len {
        Some(len) => format!("{}  {} ({len})", row.segment, row.kind),
        None => format!("{}  {}", row.segment, row.kind),
    }
}

fn write_node(out: &mut String, label: &str, tag: &Tag, depth: usize, options: TextRenderOptions) {
    let indent = INDENT.repeat(depth);
    match tag {
        Tag::Compound(compound) => {
            out.push_str(&format!(
                "{indent}{label}: compound ({} entries)\n",
                compound.len()
            ));
            for (name, child) in compound.iter() {
                write_node(out, &key_label(name), child, depth + 1, options);
            }
        }
        Tag::List(list) => {
            out.push_str(&format!(
                "{indent}{label}: list of {} ({} items)\n",
                list.item_kind(),
                list.len()
            ));
            for (i, item) in list.iter().enumerate() {
                write_node(out, &format!("[{i}]"), item, depth + 1, options);
            }
        }
        Tag::ByteArray(values) => {
            write_array_line(out, &indent, label, tag, values.iter().map(|v| format!("{v}b")), options)
        }
        Tag::IntArray(values) => {
            write_array_line(out, &indent, label, tag, values.iter().map(i32::to_string), options)
        }
        Tag::LongArray(values) => {
            write_array_line(out, &indent, label, tag, values.iter().map(|v| format!("{v}L")), options)
        }
        scalar => {
            out.push_str(&format!("{indent}{label}: {scalar}\n"));
        }
    }
}

fn write_array_line(
    out: &mut String,
    indent: &str,
    label: &str,
    tag: &Tag,
    items: impl ExactSizeIterator<Item = String>,
    options: TextRenderOptions,
) {
    let total = items.len();
    let shown = if options.verbose {
        total
    } else {
        total.min(ARRAY_PREVIEW_ITEMS)
    };
    let mut body = items.take(shown).collect::<Vec<_>>().join(", ");
    if shown < total {
        body.push_str(&format!(", ... +{} more", total - shown));
    }
    out.push_str(&format!("{indent}{label}: {} ({total}) [{body}]\n", tag.kind()));
}

fn root_label(name: &str) -> String {
    if name.is_empty() {
        "(root)".to_string()
    } else {
        key_label(name)
    }
}

fn key_label(name: &str) -> String {
    PathSegment::Key(name.to_string()).to_string()
}

fn mode_label(mode: EditMode) -> &'static str {
    match mode {
        EditMode::Structured => "structured",
        EditMode::Raw => "raw",
    }
}

fn push_field(out: &mut String, label: &str, value: &str) {
    out.push_str(&format!(
        "{:<width$}{value}\n",
        format!("{label}:"),
        width = LABEL_WIDTH
    ));
}
