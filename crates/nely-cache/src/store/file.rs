use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

use super::{KeyValueStore, StoreError, StoreResult};

/// Extension of every record file written by the store.
const RECORD_EXTENSION: &str = "json";

/// Common file name limit (ext4, APFS, NTFS).
const MAX_FILE_NAME_LEN: usize = 255;

/// Extension of in-flight writes; never reported by `all_keys`.
const TEMP_EXTENSION: &str = "tmp";

/// Distinguishes concurrent writes from this process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Directory-backed store: one file per key.
///
/// File names are the hex encoding of the key, so arbitrary key strings
/// (including `@`, `:` and `/`) map to safe, reversible names.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &str) -> StoreResult<PathBuf> {
        let name = format!("{}.{}", hex::encode(key.as_bytes()), RECORD_EXTENSION);
        if name.len() > MAX_FILE_NAME_LEN {
            return Err(StoreError::InvalidKey(format!(
                "key of {} bytes is too long for a file name",
                key.len()
            )));
        }
        Ok(self.dir.join(name))
    }

    fn temp_path(&self) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!(".{}-{}.{}", std::process::id(), n, TEMP_EXTENSION))
    }

    fn key_from_path(path: &Path) -> Option<String> {
        if path.extension()? != RECORD_EXTENSION {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let bytes = hex::decode(stem).ok()?;
        String::from_utf8(bytes).ok()
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match tokio::fs::read_to_string(self.record_path(key)?).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes a temp file and renames it over the record, so a crash never
    /// leaves a half-written record behind.
    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        let path = self.record_path(key)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, value).await?;
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        match tokio::fs::remove_file(self.record_path(key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn all_keys(&self) -> StoreResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::Unavailable(format!(
                    "store directory {} is missing",
                    self.dir.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            match Self::key_from_path(&path) {
                Some(key) => keys.push(key),
                None => debug!(path = %path.display(), "Skipping foreign file in store directory"),
            }
        }
        Ok(keys)
    }

    async fn multi_remove(&self, keys: &[String]) -> StoreResult<()> {
        try_join_all(keys.iter().map(|key| self.remove(key))).await?;
        Ok(())
    }
}
