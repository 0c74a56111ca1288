//! File-system collaborator used by the engine.
//!
//! The engine only ever reads whole files, writes whole files and lists
//! directories. Everything else about storage stays behind this trait.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::error::CoreError;
use super::types::DirEntry;

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Raw on-disk bytes of `path`.
    async fn read(&self, path: &str) -> Result<Vec<u8>, CoreError>;

    /// Replaces the contents of `path`.
    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), CoreError>;

    /// Entries directly under `path`, sorted by name.
    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, CoreError>;
}

/// Local file system through `tokio::fs`, optionally rooted at a directory.
#[derive(Debug, Clone, Default)]
pub struct FsStore {
    root: Option<PathBuf>,
}

impl FsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(path),
            None => PathBuf::from(path),
        }
    }
}

#[async_trait]
impl FileStore for FsStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>, CoreError> {
        tokio::fs::read(self.resolve(path))
            .await
            .map_err(|e| CoreError::io(path, e))
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), CoreError> {
        tokio::fs::write(self.resolve(path), bytes)
            .await
            .map_err(|e| CoreError::io(path, e))
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, CoreError> {
        let mut dir = tokio::fs::read_dir(self.resolve(path))
            .await
            .map_err(|e| CoreError::io(path, e))?;
        let mut out = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| CoreError::io(path, e))? {
            let meta = entry.metadata().await.map_err(|e| CoreError::io(path, e))?;
            out.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: meta.is_dir(),
                len: meta.len(),
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}

/// In-memory store keyed by `/`-separated paths.
///
/// Reads and writes can be made to fail on demand, which is how callers
/// exercise the engine's failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn insert(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files().insert(path.into(), bytes.into());
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files().get(path).cloned()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn files(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>, CoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CoreError::io(path, "read refused"));
        }
        self.get(path)
            .ok_or_else(|| CoreError::io(path, "no such file"))
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), CoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CoreError::io(path, "write refused"));
        }
        self.insert(path, bytes);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, CoreError> {
        let prefix = match path.trim_end_matches('/') {
            "" => String::new(),
            dir => format!("{dir}/"),
        };
        let mut out: BTreeMap<String, DirEntry> = BTreeMap::new();
        for (key, bytes) in self.files().iter() {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            let entry = match rest.split_once('/') {
                Some((dir, _)) => DirEntry {
                    name: dir.to_string(),
                    is_dir: true,
                    len: 0,
                },
                None => DirEntry {
                    name: rest.to_string(),
                    is_dir: false,
                    len: bytes.len() as u64,
                },
            };
            out.entry(entry.name.clone()).or_insert(entry);
        }
        if out.is_empty() && !prefix.is_empty() {
            return Err(CoreError::io(path, "no such directory"));
        }
        Ok(out.into_values().collect())
    }
}
