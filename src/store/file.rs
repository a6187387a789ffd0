//! File-backed key-value store: one file per key.
//!
//! Writes land in a hidden `.partial` sibling and are renamed into place, so
//! readers never see a half-written value. Each write holds an exclusive
//! advisory lock on `<dir>/.locks/<key>.lock` for its whole duration.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use fs2::FileExt;
use futures_util::TryStreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{validate_key, ChunkStream, KeyValueStore};

/// Directory of `<key>.<extension>` files
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    extension: String,
    locks_dir: PathBuf,
}

/// Held while writing a key; the lock is released when the file is dropped
struct KeyLock {
    _file: File,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub async fn open(dir: impl Into<PathBuf>, extension: &str) -> Result<Self> {
        let dir = dir.into();
        let locks_dir = dir.join(".locks");

        fs::create_dir_all(&locks_dir)
            .await
            .with_context(|| format!("Failed to create store directory: {}", dir.display()))?;

        Ok(Self {
            dir,
            extension: extension.trim_start_matches('.').to_string(),
            locks_dir,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, self.extension))
    }

    fn partial_path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{}.{}.partial", key, self.extension))
    }

    async fn lock(&self, key: &str) -> Result<KeyLock> {
        let lock_path = self.locks_dir.join(format!("{}.lock", key));

        tokio::task::spawn_blocking(move || -> Result<KeyLock> {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&lock_path)
                .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

            file.lock_exclusive()
                .with_context(|| format!("Failed to acquire lock: {}", lock_path.display()))?;

            Ok(KeyLock { _file: file })
        })
        .await
        .context("Lock task failed")?
    }

    async fn commit(&self, key: &str, partial: &Path) -> Result<()> {
        let path = self.path_for(key);
        fs::rename(partial, &path)
            .await
            .with_context(|| format!("Failed to move {} into place", path.display()))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let path = self.path_for(key);

        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        validate_key(key)?;
        let _lock = self.lock(key).await?;

        let partial = self.partial_path_for(key);
        fs::write(&partial, value)
            .await
            .with_context(|| format!("Failed to write {}", partial.display()))?;
        self.commit(key, &partial).await?;

        debug!(key, bytes = value.len(), dir = %self.dir.display(), "Stored value");
        Ok(())
    }

    async fn put_chunks(&self, key: &str, mut chunks: ChunkStream) -> Result<u64> {
        validate_key(key)?;
        let _lock = self.lock(key).await?;

        let partial = self.partial_path_for(key);
        let mut file = fs::File::create(&partial)
            .await
            .with_context(|| format!("Failed to create {}", partial.display()))?;

        let mut written = 0u64;
        let streamed: Result<()> = async {
            while let Some(chunk) = chunks.try_next().await? {
                file.write_all(&chunk).await.context("Failed to write chunk")?;
                written += chunk.len() as u64;
            }
            file.flush().await.context("Failed to flush chunks")?;
            Ok(())
        }
        .await;

        drop(file);
        let streamed = streamed.and_then(|()| {
            if written == 0 {
                anyhow::bail!("Stream for {} produced no bytes", key);
            }
            Ok(())
        });

        if let Err(e) = streamed {
            // The previous value stays in place
            let _ = fs::remove_file(&partial).await;
            return Err(e);
        }

        self.commit(key, &partial).await?;

        debug!(key, bytes = written, dir = %self.dir.display(), "Stored streamed value");
        Ok(written)
    }

    async fn size(&self, key: &str) -> Result<Option<u64>> {
        validate_key(key)?;
        let path = self.path_for(key);

        match fs::metadata(&path).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to stat {}", path.display())),
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let _lock = self.lock(key).await?;
        let path = self.path_for(key);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let suffix = format!(".{}", self.extension);

        let mut entries = fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with('.') {
                    continue;
                }
                if let Some(key) = name.strip_suffix(&suffix) {
                    keys.push(key.to_string());
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn locate(&self, key: &str) -> String {
        self.path_for(key).display().to_string()
    }
}
