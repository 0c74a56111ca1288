//! The tag tree model.
//!
//! Containers keep their children behind an [`Arc`], so cloning a [`Tag`]
//! never copies a subtree. Mutation goes through copy-on-write helpers that
//! leave every other holder of the old tree untouched.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::kind::TagKind;

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    ByteArray(Arc<[i8]>),
    IntArray(Arc<[i32]>),
    LongArray(Arc<[i64]>),
    List(List),
    Compound(Compound),
}

/// A document root: the root tag plus the name it was stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTag {
    pub name: String,
    pub tag: Tag,
}

impl NamedTag {
    pub fn new(name: impl Into<String>, tag: Tag) -> Self {
        Self {
            name: name.into(),
            tag,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("list of {expected} cannot hold {found} at index {index}")]
    ListItemKind {
        expected: TagKind,
        found: TagKind,
        index: usize,
    },
    #[error("duplicate compound name {0:?}")]
    DuplicateName(String),
    #[error("cannot parse {text:?} as {kind}: {reason}")]
    InvalidValue {
        kind: TagKind,
        text: String,
        reason: String,
    },
    #[error("{0} values cannot be edited from text")]
    NotEditable(TagKind),
}

impl Tag {
    pub fn kind(&self) -> TagKind {
        match self {
            Self::Byte(_) => TagKind::Byte,
            Self::Short(_) => TagKind::Short,
            Self::Int(_) => TagKind::Int,
            Self::Long(_) => TagKind::Long,
            Self::Float(_) => TagKind::Float,
            Self::Double(_) => TagKind::Double,
            Self::String(_) => TagKind::String,
            Self::ByteArray(_) => TagKind::ByteArray,
            Self::IntArray(_) => TagKind::IntArray,
            Self::LongArray(_) => TagKind::LongArray,
            Self::List(_) => TagKind::List,
            Self::Compound(_) => TagKind::Compound,
        }
    }

    /// Integer kinds widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Byte(v) => Some(v.into()),
            Self::Short(v) => Some(v.into()),
            Self::Int(v) => Some(v.into()),
            Self::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(v.into()),
            Self::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Self::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// Number of direct children (elements for arrays), `None` for scalars.
    pub fn child_count(&self) -> Option<usize> {
        match self {
            Self::ByteArray(v) => Some(v.len()),
            Self::IntArray(v) => Some(v.len()),
            Self::LongArray(v) => Some(v.len()),
            Self::List(l) => Some(l.len()),
            Self::Compound(c) => Some(c.len()),
            _ => None,
        }
    }

    /// Parses `text` into a new tag of the same kind as `self`.
    ///
    /// Arrays take comma or whitespace separated elements. Lists and compounds
    /// are edited through their children and are rejected here.
    pub fn parse_like(&self, text: &str) -> Result<Tag, TagError> {
        let kind = self.kind();
        let trimmed = text.trim();
        let invalid = |reason: String| TagError::InvalidValue {
            kind,
            text: text.to_string(),
            reason,
        };
        let tag = match kind {
            TagKind::Byte => Tag::Byte(trimmed.parse().map_err(|e| invalid(format!("{e}")))?),
            TagKind::Short => Tag::Short(trimmed.parse().map_err(|e| invalid(format!("{e}")))?),
            TagKind::Int => Tag::Int(trimmed.parse().map_err(|e| invalid(format!("{e}")))?),
            TagKind::Long => Tag::Long(trimmed.parse().map_err(|e| invalid(format!("{e}")))?),
            TagKind::Float => Tag::Float(trimmed.parse().map_err(|e| invalid(format!("{e}")))?),
            TagKind::Double => Tag::Double(trimmed.parse().map_err(|e| invalid(format!("{e}")))?),
            TagKind::String => Tag::String(text.to_string()),
            TagKind::ByteArray => Tag::ByteArray(parse_elements::<i8>(trimmed).map_err(invalid)?.into()),
            TagKind::IntArray => Tag::IntArray(parse_elements::<i32>(trimmed).map_err(invalid)?.into()),
            TagKind::LongArray => Tag::LongArray(parse_elements::<i64>(trimmed).map_err(invalid)?.into()),
            TagKind::List | TagKind::Compound | TagKind::End => {
                return Err(TagError::NotEditable(kind));
            }
        };
        Ok(tag)
    }
}

fn parse_elements<T>(text: &str) -> Result<Vec<T>, String>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<T>().map_err(|e| format!("{part:?}: {e}")))
        .collect()
}

/// An ordered, homogeneously typed sequence of tags.
#[derive(Debug, Clone)]
pub struct List {
    item_kind: TagKind,
    items: Arc<Vec<Tag>>,
}

impl List {
    pub fn new(item_kind: TagKind, items: Vec<Tag>) -> Result<Self, TagError> {
        let list = Self {
            item_kind,
            items: Arc::new(items),
        };
        match list.first_mismatch() {
            Some((index, found)) => Err(TagError::ListItemKind {
                expected: item_kind,
                found,
                index,
            }),
            None => Ok(list),
        }
    }

    pub fn empty(item_kind: TagKind) -> Self {
        Self {
            item_kind,
            items: Arc::new(Vec::new()),
        }
    }

    pub fn item_kind(&self) -> TagKind {
        self.item_kind
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Tag> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.items.iter()
    }

    /// Appends `tag`, adopting its kind if the list is still typed `End`.
    pub fn push(&mut self, tag: Tag) -> Result<(), TagError> {
        if self.items.is_empty() && self.item_kind == TagKind::End {
            self.item_kind = tag.kind();
        }
        if tag.kind() != self.item_kind {
            return Err(TagError::ListItemKind {
                expected: self.item_kind,
                found: tag.kind(),
                index: self.items.len(),
            });
        }
        Arc::make_mut(&mut self.items).push(tag);
        Ok(())
    }

    /// True when both lists share the same child storage.
    pub fn ptr_eq(&self, other: &List) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }

    /// First child whose kind differs from the declared item kind.
    ///
    /// Edits can break the invariant since the mutator does not re-check kinds.
    pub fn first_mismatch(&self) -> Option<(usize, TagKind)> {
        if self.item_kind == TagKind::End {
            return self.items.first().map(|t| (0, t.kind()));
        }
        self.items
            .iter()
            .position(|t| t.kind() != self.item_kind)
            .map(|i| (i, self.items[i].kind()))
    }

    pub(crate) fn with_item(&self, index: usize, tag: Tag) -> List {
        let mut items = Vec::clone(&self.items);
        items[index] = tag;
        List {
            item_kind: self.item_kind,
            items: Arc::new(items),
        }
    }

    pub(crate) fn without_item(&self, index: usize) -> List {
        let mut items = Vec::clone(&self.items);
        items.remove(index);
        List {
            item_kind: self.item_kind,
            items: Arc::new(items),
        }
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.item_kind == other.item_kind && self.items == other.items
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Name to tag mapping. Names are unique; insertion order is kept for display.
#[derive(Debug, Clone, Default)]
pub struct Compound {
    entries: Arc<Vec<(String, Tag)>>,
}

impl Compound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<(String, Tag)>) -> Result<Self, TagError> {
        let mut seen = HashSet::with_capacity(entries.len());
        if let Some((name, _)) = entries.iter().find(|(name, _)| !seen.insert(name.as_str())) {
            return Err(TagError::DuplicateName(name.clone()));
        }
        Ok(Self {
            entries: Arc::new(entries),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.position(name).map(|i| &self.entries[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tag)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Inserts or replaces `name`, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, tag: Tag) -> Option<Tag> {
        let name = name.into();
        let entries = Arc::make_mut(&mut self.entries);
        match entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, tag)),
            None => {
                entries.push((name, tag));
                None
            }
        }
    }

    /// Builder form of [`Compound::insert`].
    pub fn with(mut self, name: impl Into<String>, tag: Tag) -> Self {
        self.insert(name, tag);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Tag> {
        let index = self.position(name)?;
        Some(Arc::make_mut(&mut self.entries).remove(index).1)
    }

    pub fn ptr_eq(&self, other: &Compound) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    pub(crate) fn entry_at(&self, index: usize) -> &Tag {
        &self.entries[index].1
    }

    pub(crate) fn with_value_at(&self, index: usize, tag: Tag) -> Compound {
        let mut entries = Vec::clone(&self.entries);
        entries[index].1 = tag;
        Compound {
            entries: Arc::new(entries),
        }
    }

    pub(crate) fn without_index(&self, index: usize) -> Compound {
        let mut entries = Vec::clone(&self.entries);
        entries.remove(index);
        Compound {
            entries: Arc::new(entries),
        }
    }
}

impl PartialEq for Compound {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(name, tag)| other.get(name).is_some_and(|t| t == tag))
    }
}

impl From<Compound> for Tag {
    fn from(value: Compound) -> Self {
        Tag::Compound(value)
    }
}

impl From<List> for Tag {
    fn from(value: List) -> Self {
        Tag::List(value)
    }
}

impl fmt::Display for Tag {
    /// Stringified-NBT style rendering.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte(v) => write!(f, "{v}b"),
            Self::Short(v) => write!(f, "{v}s"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}L"),
            Self::Float(v) => write!(f, "{v}f"),
            Self::Double(v) => write!(f, "{v}d"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::ByteArray(v) => write_array(f, "B", v.iter().map(|x| format!("{x}b"))),
            Self::IntArray(v) => write_array(f, "I", v.iter().map(|x| x.to_string())),
            Self::LongArray(v) => write_array(f, "L", v.iter().map(|x| format!("{x}L"))),
            Self::List(list) => {
                f.write_str("[")?;
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Compound(compound) => {
                f.write_str("{")?;
                for (i, (name, tag)) in compound.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_key(f, name)?;
                    write!(f, ": {tag}")?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_array(
    f: &mut fmt::Formatter<'_>,
    prefix: &str,
    items: impl Iterator<Item = String>,
) -> fmt::Result {
    write!(f, "[{prefix};")?;
    for (i, item) in items.enumerate() {
        f.write_str(if i == 0 { " " } else { ", " })?;
        f.write_str(&item)?;
    }
    f.write_str("]")
}

fn write_key(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    let bare = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+'));
    if bare {
        f.write_str(name)
    } else {
        write!(f, "{name:?}")
    }
}
