use std::io::{self, Read, Write};

use flate2::Compression as Level;
use flate2::GzBuilder;
use flate2::bufread::GzDecoder;
use tracing::warn;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const XFL_OFFSET: usize = 8;
const XFL_BEST: u8 = 2;
const XFL_FASTEST: u8 = 4;

/// Compression observed on disk, kept so a save can re-apply it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Compression {
    #[default]
    None,
    Gzip(GzipProfile),
}

/// Gzip header fields recorded from the original file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzipProfile {
    pub mtime: u32,
    pub operating_system: u8,
    pub filename: Option<Vec<u8>>,
    pub comment: Option<Vec<u8>>,
    pub level: u32,
}

impl Default for GzipProfile {
    fn default() -> Self {
        Self {
            mtime: 0,
            operating_system: 255,
            filename: None,
            comment: None,
            level: Level::default().level(),
        }
    }
}

impl Compression {
    pub fn gzip() -> Self {
        Self::Gzip(GzipProfile::default())
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Gzip(_))
    }
}

pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Inflates `bytes` if they carry the gzip magic, otherwise copies them.
///
/// Only a single gzip member is accepted; anything after the first member is
/// `InvalidData`.
pub fn decompress(bytes: &[u8]) -> io::Result<(Vec<u8>, Compression)> {
    if !is_gzip(bytes) {
        return Ok((bytes.to_vec(), Compression::None));
    }
    let mut decoder = GzDecoder::new(bytes);
    let mut payload = Vec::new();
    decoder.read_to_end(&mut payload)?;
    let trailing = decoder.get_ref().len();
    if trailing > 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{trailing} bytes follow the first gzip member"),
        ));
    }
    let header = decoder
        .header()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing gzip header"))?;
    let level = match bytes.get(XFL_OFFSET) {
        Some(&XFL_BEST) => Level::best().level(),
        Some(&XFL_FASTEST) => Level::fast().level(),
        _ => Level::default().level(),
    };
    let profile = GzipProfile {
        mtime: header.mtime(),
        operating_system: header.operating_system(),
        filename: header.filename().map(<[u8]>::to_vec),
        comment: header.comment().map(<[u8]>::to_vec),
        level,
    };
    Ok((payload, Compression::Gzip(profile)))
}

/// Like [`decompress`], but a buffer that only looks like gzip is kept as is.
pub fn decompress_lenient(bytes: &[u8]) -> (Vec<u8>, Compression) {
    match decompress(bytes) {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "gzip magic present but stream is not a single member; keeping raw bytes");
            (bytes.to_vec(), Compression::None)
        }
    }
}

pub fn compress(payload: &[u8], compression: &Compression) -> io::Result<Vec<u8>> {
    let Compression::Gzip(profile) = compression else {
        return Ok(payload.to_vec());
    };
    let mut builder = GzBuilder::new()
        .mtime(profile.mtime)
        .operating_system(profile.operating_system);
    if let Some(name) = &profile.filename {
        builder = builder.filename(name.clone());
    }
    if let Some(comment) = &profile.comment {
        builder = builder.comment(comment.clone());
    }
    let mut encoder = builder.write(Vec::new(), Level::new(profile.level));
    encoder.write_all(payload)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_bytes_pass_through() {
        let (payload, compression) = decompress(b"plain").unwrap();
        assert_eq!(payload, b"plain");
        assert_eq!(compression, Compression::None);
        assert_eq!(compress(b"plain", &compression).unwrap(), b"plain");
    }

    #[test]
    fn gzip_header_fields_survive_recompression() {
        let profile = GzipProfile {
            mtime: 1_700_000_000,
            operating_system: 3,
            filename: Some(b"level.dat".to_vec()),
            comment: None,
            level: 6,
        };
        let packed = compress(b"payload bytes", &Compression::Gzip(profile.clone())).unwrap();
        assert!(is_gzip(&packed));

        let (payload, observed) = decompress(&packed).unwrap();
        assert_eq!(payload, b"payload bytes");
        assert_eq!(observed, Compression::Gzip(profile.clone()));
        assert_eq!(compress(&payload, &observed).unwrap(), packed);
    }

    #[test]
    fn second_member_is_not_swallowed() {
        let mut bytes = compress(b"AAAA", &Compression::gzip()).unwrap();
        bytes.extend(compress(b"BBBB", &Compression::gzip()).unwrap());
        assert!(decompress(&bytes).is_err());
        let (payload, compression) = decompress_lenient(&bytes);
        assert_eq!(payload, bytes);
        assert_eq!(compression, Compression::None);
    }

    #[test]
    fn trailing_bytes_after_member_are_kept() {
        let mut bytes = compress(b"CCCC", &Compression::gzip()).unwrap();
        bytes.extend_from_slice(b"TRAILING");
        let err = decompress(&bytes).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("8 bytes"));
        let (payload, compression) = decompress_lenient(&bytes);
        assert_eq!(payload, bytes);
        assert_eq!(compression, Compression::None);
    }

    #[test]
    fn broken_gzip_is_kept_raw() {
        let bytes = [0x1f, 0x8b, 0x00, 0x01];
        assert!(decompress(&bytes).is_err());
        let (payload, compression) = decompress_lenient(&bytes);
        assert_eq!(payload, bytes);
        assert_eq!(compression, Compression::None);
    }
}
