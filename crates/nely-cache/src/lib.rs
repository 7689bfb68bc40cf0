//! Expiring, namespaced key-value cache for the Nely family health app.
//!
//! The cache gives data-access code a best-effort local copy of recently
//! fetched records (elderly profiles, vitals, medications, appointments, care
//! notes, family members, user profile) so screens can render offline and
//! avoid redundant network calls. The backend stays the source of truth: a
//! cache failure is always just a miss.
//!
//! ```no_run
//! use nely_cache::cache::{durations, keys, Cache};
//! use nely_cache::store::MemoryStore;
//!
//! # async fn demo() {
//! let cache = Cache::new(MemoryStore::new());
//! let key = keys::vital_signs("elder42");
//! cache.write_with_ttl(&key, &vec![120, 80], durations::SHORT).await;
//! let readings: Option<Vec<u32>> = cache.read(&key).await;
//! # }
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod store;

pub use cache::{Cache, CacheEntry, CacheStats, TtlPreset};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
