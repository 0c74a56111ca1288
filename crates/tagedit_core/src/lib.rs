//! Structured editing of NBT save data.
//!
//! A file is opened through [`core_api::Engine`], which strips gzip, detects
//! the on-disk [`nbt::FormatVariant`] and hands back either a tag tree or a
//! raw hex buffer. Saving re-encodes in the detected variant and restores
//! the original compression.

pub mod compression;
pub mod core_api;
pub mod hex;
pub mod kind;
pub mod nbt;
pub mod path;
pub mod tag;

pub use kind::TagKind;
pub use path::{ChildInfo, PathSegment, TagPath};
pub use tag::{Compound, List, NamedTag, Tag, TagError};
