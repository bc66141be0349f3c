//! "Last synchronized" indicator.

use std::fmt;

/// Age after which the view is considered stale, in seconds.
pub const STALE_AFTER_SECS: u64 = 60;

/// Coarse age of the last successful synchronisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Freshness {
    /// Never synchronised.
    Never,
    /// Under 15 seconds.
    JustNow,
    /// Under 30 seconds.
    HalfMinute,
    /// Under a minute.
    Minute,
    /// Whole minutes since the last sync.
    Minutes(u64),
}

impl Freshness {
    /// Freshness at wall-clock `now_secs` for a sync at `last_sync_secs`.
    pub fn at(last_sync_secs: Option<u64>, now_secs: u64) -> Self {
        let Some(last) = last_sync_secs else {
            return Self::Never;
        };

        match now_secs.saturating_sub(last) {
            0..15 => Self::JustNow,
            15..30 => Self::HalfMinute,
            30..60 => Self::Minute,
            age => Self::Minutes(age / 60),
        }
    }

    /// Whether the last sync is older than [`STALE_AFTER_SECS`]. Never
    /// synchronised is not stale.
    pub fn is_stale(last_sync_secs: Option<u64>, now_secs: u64) -> bool {
        last_sync_secs.is_some_and(|last| now_secs.saturating_sub(last) > STALE_AFTER_SECS)
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => f.write_str("-"),
            Self::JustNow => f.write_str("just now"),
            Self::HalfMinute => f.write_str("30s"),
            Self::Minute => f.write_str("1m"),
            Self::Minutes(n) => write!(f, "{n}m"),
        }
    }
}
