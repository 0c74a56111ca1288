//! Binary codec for the tag format and detection of its on-disk variants.

pub mod reader;
pub mod variant;
pub mod writer;

use std::io;

use tracing::debug;

use crate::tag::NamedTag;
pub use reader::TagReader;
pub use variant::FormatVariant;
pub use writer::TagWriter;

pub const DEFAULT_MAX_DEPTH: usize = 512;
const LEVEL_HEADER_LEN: usize = 8;

/// Parses the whole of `bytes` as one tree in `variant`.
pub fn read(bytes: &[u8], variant: FormatVariant) -> io::Result<NamedTag> {
    read_with_depth(bytes, variant, DEFAULT_MAX_DEPTH)
}

pub fn read_with_depth(
    bytes: &[u8],
    variant: FormatVariant,
    max_depth: usize,
) -> io::Result<NamedTag> {
    let body = match variant {
        FormatVariant::BedrockLevel { storage_version } => {
            let found = level_header(bytes).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    "missing or inconsistent bedrock level header",
                )
            })?;
            if found != storage_version {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("storage version {found}, expected {storage_version}"),
                ));
            }
            &bytes[LEVEL_HEADER_LEN..]
        }
        _ => bytes,
    };

    let mut reader = TagReader::new(body, variant, max_depth);
    let root = reader.read_named_root()?;
    if reader.remaining() > 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "{} trailing bytes after root tag at offset {:#x}",
                reader.remaining(),
                reader.position()
            ),
        ));
    }
    Ok(root)
}

pub fn write(root: &NamedTag, variant: FormatVariant) -> io::Result<Vec<u8>> {
    let mut writer = TagWriter::new(variant);
    writer.write_named_root(root)?;
    let payload = writer.finish();

    let FormatVariant::BedrockLevel { storage_version } = variant else {
        return Ok(payload);
    };
    let len = i32::try_from(payload.len()).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidData, "level payload exceeds i32 length")
    })?;
    let mut out = Vec::with_capacity(LEVEL_HEADER_LEN + payload.len());
    out.extend_from_slice(&storage_version.to_le_bytes());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Tries every known variant and returns the first that parses `bytes` and
/// re-encodes to exactly the same bytes.
///
/// Order: big, bedrock level (only when its header matches), little, little
/// varint. A parse that would not round-trip is rejected so a structured save
/// can never silently rewrite bytes the user did not touch.
pub fn detect(bytes: &[u8], max_depth: usize) -> Option<(NamedTag, FormatVariant)> {
    for variant in candidates(bytes) {
        let root = match read_with_depth(bytes, variant, max_depth) {
            Ok(root) => root,
            Err(e) => {
                debug!(%variant, error = %e, "variant did not parse");
                continue;
            }
        };
        match write(&root, variant) {
            Ok(emitted) if emitted == bytes => {
                debug!(%variant, "structured parse accepted");
                return Some((root, variant));
            }
            Ok(_) => debug!(%variant, "parsed but re-encoding differs; rejected"),
            Err(e) => debug!(%variant, error = %e, "parsed but failed to re-encode"),
        }
    }
    None
}

fn candidates(bytes: &[u8]) -> Vec<FormatVariant> {
    let mut out = vec![FormatVariant::Big];
    if let Some(storage_version) = level_header(bytes) {
        out.push(FormatVariant::BedrockLevel { storage_version });
    }
    out.push(FormatVariant::Little);
    out.push(FormatVariant::LittleVarint);
    out
}

/// Storage version of a bedrock level header whose length field matches.
fn level_header(bytes: &[u8]) -> Option<i32> {
    let header: &[u8; LEVEL_HEADER_LEN] = bytes.get(..LEVEL_HEADER_LEN)?.try_into().ok()?;
    let version = i32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let len = i32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    (usize::try_from(len).ok()? == bytes.len() - LEVEL_HEADER_LEN).then_some(version)
}
