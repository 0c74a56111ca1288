use std::sync::Arc;

use tracing::{info, warn};

use crate::compression::{self, Compression};
use crate::hex;
use crate::nbt::{self, FormatVariant};
use crate::path::{self, PathSegment};
use crate::tag::{NamedTag, Tag};

use super::error::{CoreError, CoreErrorCode};
use super::store::FileStore;
use super::types::{DirEntry, EditMode, EngineConfig, FileBinaryState, OpenMode};

#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn FileStore>,
    config: EngineConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditState {
    Structured {
        tree: NamedTag,
        variant: FormatVariant,
    },
    Raw {
        hex: String,
    },
}

/// One open file.
///
/// `disk_bytes` and `payload` are the last bytes read from or written to the
/// store, before and after removing compression.
#[derive(Debug, Clone)]
pub struct Session {
    path: String,
    compression: Compression,
    disk_bytes: Vec<u8>,
    payload: Vec<u8>,
    state: EditState,
    dirty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    pub bytes_written: usize,
    /// The payload was unchanged, so the original on-disk bytes were reused.
    pub reused_original: bool,
}

impl Engine {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<dyn FileStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn FileStore> {
        &self.store
    }

    pub async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, CoreError> {
        self.store.list_dir(path).await
    }

    /// Reads `path`, strips gzip and, in `OpenMode::Auto`, tries every
    /// structured variant. Falls back to a raw session when none fits.
    pub async fn open(&self, path: &str, mode: OpenMode) -> Result<Session, CoreError> {
        let disk_bytes = self.store.read(path).await?;
        let binary = self.inspect(&disk_bytes, mode);

        let state = match binary.structured {
            Some((tree, variant)) => {
                info!(path, %variant, compressed = binary.was_compressed, "opened structured");
                EditState::Structured { tree, variant }
            }
            None => {
                if mode == OpenMode::Auto {
                    warn!(path, len = binary.bytes.len(), "no structured variant matched; opening raw");
                } else {
                    info!(path, len = binary.bytes.len(), "opened raw");
                }
                EditState::Raw {
                    hex: hex::to_editable(&binary.bytes),
                }
            }
        };

        Ok(Session {
            path: path.to_string(),
            compression: binary.compression,
            disk_bytes,
            payload: binary.bytes,
            state,
            dirty: false,
        })
    }

    /// Strips compression from `disk_bytes` and, in `OpenMode::Auto`, fills
    /// `structured` with the first variant that parses losslessly.
    pub fn inspect(&self, disk_bytes: &[u8], mode: OpenMode) -> FileBinaryState {
        let (bytes, compression) = compression::decompress_lenient(disk_bytes);
        let structured = match mode {
            OpenMode::Auto => nbt::detect(&bytes, self.config.max_depth),
            OpenMode::Raw => None,
        };
        FileBinaryState {
            bytes,
            was_compressed: compression.is_compressed(),
            compression,
            structured,
        }
    }

    /// Opens the session's file again from the store, re-attempting the
    /// structured parse. This is the only way back from raw to structured.
    pub async fn reopen(&self, session: &Session) -> Result<Session, CoreError> {
        self.open(&session.path, OpenMode::Auto).await
    }

    /// Switches a session to the raw byte view.
    ///
    /// The bytes are read again from the store rather than produced by
    /// serialising the in-memory tree, so unsaved tree edits are dropped. On a
    /// read failure the session is left as it was.
    pub async fn view_raw(&self, session: &mut Session) -> Result<(), CoreError> {
        let disk_bytes = self.store.read(&session.path).await?;
        let (payload, compression) = compression::decompress_lenient(&disk_bytes);
        session.state = EditState::Raw {
            hex: hex::to_editable(&payload),
        };
        session.disk_bytes = disk_bytes;
        session.payload = payload;
        session.compression = compression;
        session.dirty = false;
        Ok(())
    }

    pub async fn save(&self, session: &mut Session) -> Result<SaveReport, CoreError> {
        let path = session.path.clone();
        self.save_as(session, &path).await
    }

    /// Encodes the session, re-applies its compression and writes to `path`.
    ///
    /// Nothing is written if the hex text is malformed or the tree cannot be
    /// encoded. Any failure leaves the session's edits in place.
    pub async fn save_as(&self, session: &mut Session, path: &str) -> Result<SaveReport, CoreError> {
        let payload = session.encode_payload()?;
        let reused_original = payload == session.payload;
        let disk_bytes = if reused_original {
            session.disk_bytes.clone()
        } else {
            compression::compress(&payload, &session.compression).map_err(|e| {
                CoreError::new(CoreErrorCode::Io, format!("failed to recompress: {e}"))
            })?
        };

        if let Err(e) = self.store.write(path, &disk_bytes).await {
            warn!(path, error = %e, "save failed; edits kept");
            return Err(e);
        }
        info!(path, bytes = disk_bytes.len(), reused_original, "saved");

        let report = SaveReport {
            bytes_written: disk_bytes.len(),
            reused_original,
        };
        session.path = path.to_string();
        session.payload = payload;
        session.disk_bytes = disk_bytes;
        session.dirty = false;
        Ok(report)
    }
}

impl Session {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn compression(&self) -> &Compression {
        &self.compression
    }

    pub fn was_compressed(&self) -> bool {
        self.compression.is_compressed()
    }

    pub fn mode(&self) -> EditMode {
        match self.state {
            EditState::Structured { .. } => EditMode::Structured,
            EditState::Raw { .. } => EditMode::Raw,
        }
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Decompressed bytes as last read or written.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn tree(&self) -> Option<&NamedTag> {
        match &self.state {
            EditState::Structured { tree, .. } => Some(tree),
            EditState::Raw { .. } => None,
        }
    }

    pub fn variant(&self) -> Option<FormatVariant> {
        match self.state {
            EditState::Structured { variant, .. } => Some(variant),
            EditState::Raw { .. } => None,
        }
    }

    pub fn get(&self, path: &[PathSegment]) -> Option<&Tag> {
        path::get(&self.tree()?.tag, path)
    }

    /// The session's current contents in boundary form: the payload as last
    /// read or written, plus the tree and variant in structured mode.
    pub fn binary_state(&self) -> FileBinaryState {
        let structured = match &self.state {
            EditState::Structured { tree, variant } => Some((tree.clone(), *variant)),
            EditState::Raw { .. } => None,
        };
        FileBinaryState {
            bytes: self.payload.clone(),
            was_compressed: self.compression.is_compressed(),
            compression: self.compression.clone(),
            structured,
        }
    }

    /// Replaces the node at `path`. Returns whether the path resolved; an
    /// unresolved path changes nothing.
    pub fn set(&mut self, path: &[PathSegment], value: Tag) -> Result<bool, CoreError> {
        let tree = self.tree_mut("set")?;
        if path::get(&tree.tag, path).is_none() {
            return Ok(false);
        }
        tree.tag = path::set(&tree.tag, path, value);
        self.dirty = true;
        Ok(true)
    }

    /// Removes the compound entry or list element at `path`.
    pub fn remove(&mut self, path: &[PathSegment]) -> Result<bool, CoreError> {
        let tree = self.tree_mut("remove")?;
        if path.is_empty() || path::get(&tree.tag, path).is_none() {
            return Ok(false);
        }
        tree.tag = path::remove(&tree.tag, path);
        self.dirty = true;
        Ok(true)
    }

    fn tree_mut(&mut self, op: &str) -> Result<&mut NamedTag, CoreError> {
        match &mut self.state {
            EditState::Structured { tree, .. } => Ok(tree),
            EditState::Raw { .. } => Err(CoreError::new(
                CoreErrorCode::UnsupportedOperation,
                format!("cannot {op} a path in a raw session; reopen it to parse the tree"),
            )),
        }
    }

    pub fn hex_text(&self) -> Option<&str> {
        match &self.state {
            EditState::Raw { hex } => Some(hex),
            EditState::Structured { .. } => None,
        }
    }

    /// Replaces the raw edit buffer. The text is only validated on save.
    pub fn set_hex_text(&mut self, text: impl Into<String>) -> Result<(), CoreError> {
        let EditState::Raw { hex } = &mut self.state else {
            return Err(CoreError::new(
                CoreErrorCode::UnsupportedOperation,
                "hex text can only be edited in a raw session; use view_raw first",
            ));
        };
        *hex = text.into();
        self.dirty = true;
        Ok(())
    }

    /// Read-only offset/hex/ASCII listing of the payload.
    pub fn dump(&self) -> String {
        hex::dump(&self.payload)
    }

    fn encode_payload(&self) -> Result<Vec<u8>, CoreError> {
        match &self.state {
            EditState::Structured { tree, variant } => nbt::write(tree, *variant).map_err(|e| {
                CoreError::new(
                    CoreErrorCode::Serialize,
                    format!("failed to encode tree as {variant}: {e}"),
                )
            }),
            EditState::Raw { hex } => hex::parse_editable(hex).map_err(|e| {
                CoreError::new(CoreErrorCode::MalformedHex, format!("save rejected: {e}"))
            }),
        }
    }
}

/// Reads `path` and removes any gzip layer; `structured` is left empty.
pub async fn read_binary(store: &dyn FileStore, path: &str) -> Result<FileBinaryState, CoreError> {
    let disk_bytes = store.read(path).await?;
    let (bytes, compression) = compression::decompress_lenient(&disk_bytes);
    Ok(FileBinaryState {
        bytes,
        was_compressed: compression.is_compressed(),
        compression,
        structured: None,
    })
}

/// `None` when the file is not parseable as any structured variant.
pub async fn read_structured(
    store: &dyn FileStore,
    path: &str,
    config: &EngineConfig,
) -> Result<Option<(NamedTag, FormatVariant)>, CoreError> {
    let state = read_binary(store, path).await?;
    Ok(nbt::detect(&state.bytes, config.max_depth))
}

pub async fn write_binary(
    store: &dyn FileStore,
    path: &str,
    bytes: &[u8],
    recompress: &Compression,
) -> Result<(), CoreError> {
    let disk_bytes = compression::compress(bytes, recompress)
        .map_err(|e| CoreError::new(CoreErrorCode::Io, format!("failed to recompress: {e}")))?;
    store.write(path, &disk_bytes).await
}

pub async fn write_structured(
    store: &dyn FileStore,
    path: &str,
    tree: &NamedTag,
    variant: FormatVariant,
    recompress: &Compression,
) -> Result<(), CoreError> {
    let bytes = nbt::write(tree, variant).map_err(|e| {
        CoreError::new(
            CoreErrorCode::Serialize,
            format!("failed to encode tree as {variant}: {e}"),
        )
    })?;
    write_binary(store, path, &bytes, recompress).await
}
