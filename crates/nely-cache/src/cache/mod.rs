//! Local caching module for offline-tolerant reads.
//!
//! This module provides [`Cache`], an expiring key-value cache layered over
//! any [`KeyValueStore`](crate::store::KeyValueStore). Entries are stored as
//! JSON under a namespace prefix and expire after a per-write TTL.
//!
//! Cached data kinds (see [`keys`]):
//! - Elderly profiles, family members (per family)
//! - Vital signs and history, medications, appointments, care notes (per elderly)
//! - User profile (per user)

pub mod durations;
pub mod entry;
pub mod keys;
pub mod manager;

pub use durations::TtlPreset;
pub use entry::CacheEntry;
pub use manager::{Cache, CacheStats, DEFAULT_NAMESPACE};
