//! Persistent stores for the pipeline.
//!
//! Every store sits on a [`KeyValueStore`]. The contract is at most one
//! writer per key at a time; readers may run concurrently with a writer and
//! observe either the previous or the new value, never a mix.
//!
//! - [`FreshnessStore`]: the event list snapshot with its TTL
//! - [`DetailStore`]: extracted text per event
//! - [`VoiceStore`]: synthesized audio per event

pub mod detail;
pub mod file;
pub mod freshness;
pub mod voice;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::stream::BoxStream;

pub use detail::DetailStore;
pub use file::FileStore;
pub use freshness::FreshnessStore;
pub use voice::VoiceStore;

/// Ordered stream of byte chunks, e.g. audio arriving from a provider
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>>>;

/// Key-value persistence with a single-writer-per-key contract
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the whole value, `None` if the key was never written
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the value for `key`
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Replace the value for `key` with chunks appended in arrival order.
    ///
    /// Returns the number of bytes written. A stream that fails or yields
    /// no bytes is an error and leaves the previous value in place.
    async fn put_chunks(&self, key: &str, chunks: ChunkStream) -> Result<u64>;

    /// Stored size in bytes, `None` if absent
    async fn size(&self, key: &str) -> Result<Option<u64>>;

    async fn remove(&self, key: &str) -> Result<()>;

    /// All keys currently stored
    async fn keys(&self) -> Result<Vec<String>>;

    /// Where `key` lives, for handing out references (e.g. a file path)
    fn locate(&self, key: &str) -> String;
}

/// Reject keys that could escape the store's namespace
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        anyhow::bail!("Store key is empty");
    }
    if key.starts_with('.') || key.contains(['/', '\\']) || key.contains('\0') {
        anyhow::bail!("Illegal store key: {}", key);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("events").is_ok());
        assert!(validate_key("demo-night_2").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("a\\b").is_err());
    }
}
