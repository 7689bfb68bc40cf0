use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::duration_millis;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// A cached payload plus the bookkeeping needed to expire it.
///
/// Serialized as `{"data": .., "timestamp": .., "expiresAt": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CacheEntry<T> {
    pub data: T,
    /// Epoch milliseconds when the entry was written.
    pub timestamp: i64,
    /// Epoch milliseconds after which the entry is stale.
    pub expires_at: i64,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, now_millis: i64, ttl: Duration) -> Self {
        Self {
            data,
            timestamp: now_millis,
            expires_at: now_millis.saturating_add(duration_millis(ttl)),
        }
    }

    /// An entry is still served at exactly `expires_at`.
    pub fn is_expired(&self, now_millis: i64) -> bool {
        now_millis > self.expires_at
    }

    pub fn age_millis(&self, now_millis: i64) -> i64 {
        now_millis.saturating_sub(self.timestamp)
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self, now_millis: i64) -> Duration {
        let left = self.expires_at.saturating_sub(now_millis).max(0);
        Duration::from_millis(left as u64)
    }

    pub fn into_data(self) -> T {
        self.data
    }

    /// Short "last updated" label, e.g. `5m ago`.
    pub fn age_display(&self, now_millis: i64) -> String {
        let minutes = self.age_millis(now_millis) / MILLIS_PER_MINUTE;
        if minutes < 1 {
            // Also covers entries stamped in the future (clock skew)
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            // 1h 30m+ rounds up to 2h
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}
