//! Persistent key-value storage backends.
//!
//! The cache never talks to a concrete storage engine directly. Anything that
//! implements [`KeyValueStore`] (string keys, string values, async I/O) can sit
//! underneath it:
//!
//! - `MemoryStore`: process-local map, used for tests and throwaway sessions
//! - `FileStore`: one JSON file per key in a directory, survives restarts

pub mod error;
pub mod file;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;

/// Asynchronous, string-keyed persistent storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` when the key is absent.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> StoreResult<()>;

    /// Deletes `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> StoreResult<()>;

    /// Lists every key currently held by the store, in no particular order.
    async fn all_keys(&self) -> StoreResult<Vec<String>>;

    /// Deletes several keys at once.
    async fn multi_remove(&self, keys: &[String]) -> StoreResult<()> {
        for key in keys {
            self.remove(key).await?;
        }
        Ok(())
    }
}

/// Lets several caches (e.g. different namespaces) share one store.
#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        (**self).remove(key).await
    }

    async fn all_keys(&self) -> StoreResult<Vec<String>> {
        (**self).all_keys().await
    }

    async fn multi_remove(&self, keys: &[String]) -> StoreResult<()> {
        (**self).multi_remove(keys).await
    }
}
