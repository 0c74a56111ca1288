use std::fmt;

use serde::{Deserialize, Serialize};

/// On-disk layout conventions of the tag format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatVariant {
    /// Big-endian numbers, u16 string lengths (Java edition).
    Big,
    /// Little-endian numbers, u16 string lengths (Bedrock storage).
    Little,
    /// Little-endian with zigzag varint ints, longs and lengths (Bedrock network).
    LittleVarint,
    /// `Little` behind an 8-byte header of storage version and payload length
    /// (Bedrock `level.dat`).
    BedrockLevel { storage_version: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ByteOrder {
    Big,
    Little,
}

impl FormatVariant {
    pub(crate) fn byte_order(&self) -> ByteOrder {
        match self {
            Self::Big => ByteOrder::Big,
            Self::Little | Self::LittleVarint | Self::BedrockLevel { .. } => ByteOrder::Little,
        }
    }

    pub(crate) fn uses_varints(&self) -> bool {
        matches!(self, Self::LittleVarint)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Big => "big",
            Self::Little => "little",
            Self::LittleVarint => "little-varint",
            Self::BedrockLevel { .. } => "bedrock-level",
        }
    }
}

impl fmt::Display for FormatVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BedrockLevel { storage_version } => {
                write!(f, "{} (storage version {})", self.as_str(), storage_version)
            }
            _ => f.write_str(self.as_str()),
        }
    }
}
