use serde::{Deserialize, Serialize};

use crate::compression::Compression;
use crate::nbt::{DEFAULT_MAX_DEPTH, FormatVariant};
use crate::tag::NamedTag;

/// Whether an open should try the structured parse at all.
///
/// Callers decide this from their own file-type policy; the engine does not
/// look at file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpenMode {
    #[default]
    Auto,
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    pub max_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// What crosses the file boundary for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileBinaryState {
    /// Payload with any gzip layer removed.
    pub bytes: Vec<u8>,
    pub was_compressed: bool,
    pub compression: Compression,
    pub structured: Option<(NamedTag, FormatVariant)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub len: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditMode {
    Structured,
    Raw,
}
