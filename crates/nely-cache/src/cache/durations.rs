//! Named TTL presets. Call sites pick one to match how volatile their data is.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 2 minutes: join requests, anything a family member may change any moment.
pub const SHORT: Duration = Duration::from_millis(120_000);
/// 5 minutes: the default.
pub const MEDIUM: Duration = Duration::from_millis(300_000);
/// 15 minutes: vitals history and other slowly changing lists.
pub const LONG: Duration = Duration::from_millis(900_000);
/// 1 hour.
pub const VERY_LONG: Duration = Duration::from_millis(3_600_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum TtlPreset {
    Short,
    #[default]
    Medium,
    Long,
    VeryLong,
}

impl TtlPreset {
    pub fn duration(self) -> Duration {
        match self {
            TtlPreset::Short => SHORT,
            TtlPreset::Medium => MEDIUM,
            TtlPreset::Long => LONG,
            TtlPreset::VeryLong => VERY_LONG,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TtlPreset::Short => "short",
            TtlPreset::Medium => "medium",
            TtlPreset::Long => "long",
            TtlPreset::VeryLong => "very_long",
        }
    }
}

impl From<TtlPreset> for Duration {
    fn from(preset: TtlPreset) -> Self {
        preset.duration()
    }
}

impl fmt::Display for TtlPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown TTL preset '{0}' (expected short, medium, long or very_long)")]
pub struct UnknownPreset(pub String);

impl FromStr for TtlPreset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "short" => Ok(TtlPreset::Short),
            "medium" => Ok(TtlPreset::Medium),
            "long" => Ok(TtlPreset::Long),
            "very_long" | "verylong" => Ok(TtlPreset::VeryLong),
            _ => Err(UnknownPreset(s.to_string())),
        }
    }
}
