//! Path addressing over a tag tree.
//!
//! `get`, `set` and `remove` never fail: a path that does not resolve yields
//! `None` from `get` and hands the original tree back from the mutators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kind::TagKind;
use crate::tag::Tag;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        Self::Key(value.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(value: String) -> Self {
        Self::Key(value)
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(&key.replace('~', "~0").replace('/', "~1")),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// An ordered list of selectors; the empty path is the root.
///
/// Text form joins segments with `/`, writes indices as `[n]` and escapes `~`
/// and `/` in keys as `~0` and `~1`: `Inventory/[0]/id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagPath(Vec<PathSegment>);

impl TagPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.0.split_last()?;
        Some(Self(init.to_vec()))
    }
}

impl From<Vec<PathSegment>> for TagPath {
    fn from(value: Vec<PathSegment>) -> Self {
        Self(value)
    }
}

impl AsRef<[PathSegment]> for TagPath {
    fn as_ref(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for TagPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathParseError {
    #[error("invalid list index {0:?}")]
    BadIndex(String),
    #[error("invalid escape in {0:?}; use ~0 for '~' and ~1 for '/'")]
    BadEscape(String),
}

impl FromStr for TagPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix('/').unwrap_or(s);
        if s.is_empty() {
            return Ok(Self::root());
        }
        s.split('/').map(parse_segment).collect::<Result<_, _>>().map(Self)
    }
}

fn parse_segment(raw: &str) -> Result<PathSegment, PathParseError> {
    if let Some(inner) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        return inner
            .parse::<usize>()
            .map(PathSegment::Index)
            .map_err(|_| PathParseError::BadIndex(raw.to_string()));
    }
    let mut key = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            key.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => key.push('~'),
            Some('1') => key.push('/'),
            _ => return Err(PathParseError::BadEscape(raw.to_string())),
        }
    }
    Ok(PathSegment::Key(key))
}

pub fn get<'a>(tree: &'a Tag, path: &[PathSegment]) -> Option<&'a Tag> {
    path.iter().try_fold(tree, step)
}

fn step<'a>(node: &'a Tag, segment: &PathSegment) -> Option<&'a Tag> {
    match (node, segment) {
        (Tag::Compound(compound), PathSegment::Key(key)) => compound.get(key),
        (Tag::List(list), PathSegment::Index(index)) => list.get(*index),
        _ => None,
    }
}

/// Returns a tree with the node at `path` replaced by `value`.
///
/// Only the ancestors of the target are rebuilt; every other subtree is shared
/// with `tree`. The kind of `value` is not checked against the old node. When
/// `path` does not resolve the result is `tree` itself (same storage).
pub fn set(tree: &Tag, path: &[PathSegment], value: Tag) -> Tag {
    let mut value = Some(value);
    rebuild(tree, path, &mut |_: &Tag| value.take()).unwrap_or_else(|| tree.clone())
}

/// Returns a tree without the compound entry or list element at `path`.
///
/// The root cannot be removed; like [`set`], an unresolved path is a no-op.
pub fn remove(tree: &Tag, path: &[PathSegment]) -> Tag {
    let Some((last, parent_path)) = path.split_last() else {
        return tree.clone();
    };
    rebuild(tree, parent_path, &mut |parent: &Tag| match (parent, last) {
        (Tag::Compound(compound), PathSegment::Key(key)) => compound
            .position(key)
            .map(|i| Tag::Compound(compound.without_index(i))),
        (Tag::List(list), PathSegment::Index(index)) if *index < list.len() => {
            Some(Tag::List(list.without_item(*index)))
        }
        _ => None,
    })
    .unwrap_or_else(|| tree.clone())
}

fn rebuild(
    node: &Tag,
    path: &[PathSegment],
    leaf: &mut dyn FnMut(&Tag) -> Option<Tag>,
) -> Option<Tag> {
    let Some((head, rest)) = path.split_first() else {
        return leaf(node);
    };
    match (node, head) {
        (Tag::Compound(compound), PathSegment::Key(key)) => {
            let index = compound.position(key)?;
            let child = rebuild(compound.entry_at(index), rest, leaf)?;
            Some(Tag::Compound(compound.with_value_at(index, child)))
        }
        (Tag::List(list), PathSegment::Index(index)) => {
            let child = rebuild(list.get(*index)?, rest, leaf)?;
            Some(Tag::List(list.with_item(*index, child)))
        }
        _ => None,
    }
}

/// One row of a tree widget: how to reach the child and what it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildInfo {
    pub segment: PathSegment,
    pub kind: TagKind,
    pub len: Option<usize>,
}

/// Direct children of the compound or list at `path`, in display order.
///
/// `None` when the path does not resolve or the node has no addressable
/// children (scalars and arrays).
pub fn children(tree: &Tag, path: &[PathSegment]) -> Option<Vec<ChildInfo>> {
    let info = |segment: PathSegment, tag: &Tag| ChildInfo {
        segment,
        kind: tag.kind(),
        len: tag.child_count(),
    };
    match get(tree, path)? {
        Tag::Compound(compound) => Some(
            compound
                .iter()
                .map(|(name, tag)| info(PathSegment::Key(name.to_string()), tag))
                .collect(),
        ),
        Tag::List(list) => Some(
            list.iter()
                .enumerate()
                .map(|(i, tag)| info(PathSegment::Index(i), tag))
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_text_roundtrip() {
        let path: TagPath = "Inventory/[3]/tag/a~1b~0c".parse().unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("Inventory".into()),
                PathSegment::Index(3),
                PathSegment::Key("tag".into()),
                PathSegment::Key("a/b~c".into()),
            ]
        );
        assert_eq!(path.to_string(), "Inventory/[3]/tag/a~1b~0c");
        assert_eq!(path.to_string().parse::<TagPath>().unwrap(), path);
    }

    #[test]
    fn empty_text_is_root() {
        assert!("".parse::<TagPath>().unwrap().is_root());
        assert!("/".parse::<TagPath>().unwrap().is_root());
    }

    #[test]
    fn rejects_bad_segments() {
        assert_eq!(
            "a/[x]".parse::<TagPath>(),
            Err(PathParseError::BadIndex("[x]".into()))
        );
        assert_eq!(
            "a~2".parse::<TagPath>(),
            Err(PathParseError::BadEscape("a~2".into()))
        );
    }

    #[test]
    fn numeric_keys_stay_keys() {
        let path: TagPath = "0".parse().unwrap();
        assert_eq!(path.segments(), &[PathSegment::Key("0".into())]);
    }
}
