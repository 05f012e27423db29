//! Content-addressed persistence for derived artifacts.
//!
//! Every key embeds the dataset hash, so artifacts built from one dataset
//! are never served for another. Read or parse failures are treated as a
//! miss; write failures are logged and the freshly built value is still
//! returned. Nothing in here is fatal to the host process.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// The four derived artifacts versioned by the dataset hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    EmbeddingModel,
    LexicalIndex,
    LexicalRetriever,
    EmbeddingTable,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::EmbeddingModel => "embedding_model",
            ArtifactKind::LexicalIndex => "lexical_index",
            ArtifactKind::LexicalRetriever => "lexical_retriever",
            ArtifactKind::EmbeddingTable => "embedding_table",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheFileInfo {
    pub name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CacheInfo {
    pub files: Vec<CacheFileInfo>,
    pub total_size_bytes: u64,
}

impl CacheInfo {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

pub struct ArtifactCache {
    dir: PathBuf,
    // One lock per (kind, hash) key so at most one builder runs per key.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    // clear() takes this exclusively; builds and reads take it shared.
    admin: RwLock<()>,
}

impl ArtifactCache {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache dir {}", dir.display()))?;
        Ok(Self { dir, locks: Mutex::new(HashMap::new()), admin: RwLock::new(()) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key(kind: ArtifactKind, dataset_hash: &str) -> String {
        format!("{}_{}", kind.as_str(), dataset_hash)
    }

    fn blob_path(&self, kind: ArtifactKind, dataset_hash: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::key(kind, dataset_hash)))
    }

    /// Directory for artifacts with a native on-disk format (tantivy).
    /// Namespacing by hash gives the same isolation as blob keys.
    pub fn index_dir(&self, kind: ArtifactKind, dataset_hash: &str) -> PathBuf {
        self.dir.join(Self::key(kind, dataset_hash))
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(key.to_string()).or_default().clone()
    }

    /// Return the persisted artifact for `(kind, dataset_hash)` when it
    /// deserializes cleanly, otherwise run `builder`, persist its result,
    /// and return it. Builder errors propagate; the caller maps them to a
    /// disabled capability.
    pub fn get_or_build<T, F>(&self, kind: ArtifactKind, dataset_hash: &str, builder: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        let _shared = self.admin.read().unwrap_or_else(PoisonError::into_inner);
        let key = Self::key(kind, dataset_hash);
        let lock = self.key_lock(&key);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let path = self.blob_path(kind, dataset_hash);
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(raw) => match serde_json::from_str::<T>(&raw) {
                    Ok(value) => {
                        tracing::info!(kind = kind.as_str(), "cache hit: {}", path.display());
                        return Ok(value);
                    }
                    Err(e) => {
                        tracing::warn!(kind = kind.as_str(), "stale cache entry ({}); rebuilding", e);
                    }
                },
                Err(e) => {
                    tracing::warn!(kind = kind.as_str(), "cache read failed ({}); rebuilding", e);
                }
            }
        } else {
            tracing::info!(kind = kind.as_str(), "cache miss: {}", path.display());
        }

        let value = builder()?;
        self.persist(&path, &value);
        Ok(value)
    }

    // Write to a temp file and rename so concurrent readers never observe
    // a partial blob. Write failures downgrade to a warning.
    fn persist<T: Serialize>(&self, path: &Path, value: &T) {
        let write = || -> Result<()> {
            let raw = serde_json::to_string(value)?;
            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, raw)?;
            fs::rename(&tmp, path)?;
            Ok(())
        };
        match write() {
            Ok(()) => tracing::info!("cached artifact: {}", path.display()),
            Err(e) => tracing::warn!("failed to persist {} ({}); continuing uncached", path.display(), e),
        }
    }

    /// Delete every persisted artifact. Subsequent lookups rebuild from
    /// scratch; slower, not incorrect.
    pub fn clear(&self) -> Result<()> {
        let _excl = self.admin.write().unwrap_or_else(PoisonError::into_inner);
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        tracing::info!("cache cleared: {}", self.dir.display());
        Ok(())
    }

    /// Enumerate persisted files (recursively) with byte sizes.
    pub fn info(&self) -> Result<CacheInfo> {
        let _shared = self.admin.read().unwrap_or_else(PoisonError::into_inner);
        let mut info = CacheInfo::default();
        collect_files(&self.dir, &self.dir, &mut info)?;
        info.files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(info)
    }
}

fn collect_files(root: &Path, dir: &Path, info: &mut CacheInfo) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, info)?;
        } else {
            let meta = entry.metadata()?;
            let name = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().to_string();
            info.total_size_bytes += meta.len();
            info.files.push(CacheFileInfo { name, size_bytes: meta.len() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[test]
    fn builder_runs_at_most_once_per_key() {
        let tmp = TempDir::new().expect("tmp");
        let cache = ArtifactCache::open(tmp.path()).expect("open");
        let calls = AtomicUsize::new(0);

        let build = || -> Result<Vec<u32>> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1, 2, 3])
        };
        let first: Vec<u32> = cache
            .get_or_build(ArtifactKind::EmbeddingTable, "h1", build)
            .expect("first");
        let second: Vec<u32> = cache
            .get_or_build(ArtifactKind::EmbeddingTable, "h1", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![9])
            })
            .expect("second");

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn artifacts_are_isolated_per_dataset_hash() {
        let tmp = TempDir::new().expect("tmp");
        let cache = ArtifactCache::open(tmp.path()).expect("open");

        let a: String = cache
            .get_or_build(ArtifactKind::LexicalRetriever, "hash-a", || Ok("from A".to_string()))
            .expect("a");
        let b: String = cache
            .get_or_build(ArtifactKind::LexicalRetriever, "hash-b", || Ok("from B".to_string()))
            .expect("b");

        assert_eq!(a, "from A");
        assert_eq!(b, "from B");
    }

    #[test]
    fn clear_empties_then_rebuild_succeeds() {
        let tmp = TempDir::new().expect("tmp");
        let cache = ArtifactCache::open(tmp.path()).expect("open");

        let _: u64 = cache.get_or_build(ArtifactKind::EmbeddingModel, "h", || Ok(7)).expect("build");
        assert!(cache.info().expect("info").file_count() > 0);

        cache.clear().expect("clear");
        assert_eq!(cache.info().expect("info").file_count(), 0);

        let again: u64 = cache.get_or_build(ArtifactKind::EmbeddingModel, "h", || Ok(8)).expect("rebuild");
        assert_eq!(again, 8);
    }

    #[test]
    fn corrupted_blob_counts_as_miss() {
        let tmp = TempDir::new().expect("tmp");
        let cache = ArtifactCache::open(tmp.path()).expect("open");

        let path = cache.blob_path(ArtifactKind::EmbeddingTable, "h");
        fs::write(&path, "{ definitely not a table").expect("corrupt");

        let rebuilt: Vec<u32> = cache
            .get_or_build(ArtifactKind::EmbeddingTable, "h", || Ok(vec![4]))
            .expect("rebuild");
        assert_eq!(rebuilt, vec![4]);
    }

    #[test]
    fn index_dirs_are_namespaced_by_hash() {
        let tmp = TempDir::new().expect("tmp");
        let cache = ArtifactCache::open(tmp.path()).expect("open");
        let a = cache.index_dir(ArtifactKind::LexicalIndex, "h1");
        let b = cache.index_dir(ArtifactKind::LexicalIndex, "h2");
        assert_ne!(a, b);
        assert!(a.starts_with(tmp.path()));
    }
}
