//! Reveal policy -- pure time arithmetic.
//!
//! Everything here is recomputed from absolute instants on every call.
//! Nothing is decremented between calls, which is what keeps repeated
//! evaluation drift-free and lets a clock jump self-correct on the next
//! evaluation instead of needing explicit skew handling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MS_PER_DAY: u64 = 86_400_000;
const MS_PER_HOUR: u64 = 3_600_000;
const MS_PER_MINUTE: u64 = 60_000;
const MS_PER_SECOND: u64 = 1_000;

/// Outcome of evaluating the reveal policy at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub revealed: bool,
    pub remaining_ms: u64,
}

/// Evaluate whether content is revealed at `now_ms` for a reveal instant
/// `reveal_at_ms`.
///
/// `remaining_ms` is clamped at zero; `revealed` is exactly
/// `remaining_ms == 0`.
pub fn evaluate(now_ms: u64, reveal_at_ms: u64) -> PolicyDecision {
    let remaining_ms = reveal_at_ms.saturating_sub(now_ms);
    PolicyDecision {
        revealed: remaining_ms == 0,
        remaining_ms,
    }
}

/// Remaining time decomposed for display. All components are non-negative
/// and never carry over (hours 0-23, minutes/seconds 0-59).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Countdown {
    /// Decompose remaining milliseconds by chained floor division.
    ///
    /// The modulo chain runs largest unit first so no component carries
    /// into the next.
    pub fn from_remaining_ms(remaining_ms: u64) -> Self {
        Self {
            days: remaining_ms / MS_PER_DAY,
            hours: (remaining_ms % MS_PER_DAY) / MS_PER_HOUR,
            minutes: (remaining_ms % MS_PER_HOUR) / MS_PER_MINUTE,
            seconds: (remaining_ms % MS_PER_MINUTE) / MS_PER_SECOND,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }

    /// Reconstruct whole milliseconds. Inverse of `from_remaining_ms` up to
    /// sub-second truncation.
    pub fn as_ms(&self) -> u64 {
        (((self.days * 24 + self.hours) * 60 + self.minutes) * 60 + self.seconds) * MS_PER_SECOND
    }
}

impl std::fmt::Display for Countdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}d {:02}:{:02}:{:02}",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// The reveal instant as a UTC datetime, for "revealing on ..." banners.
///
/// Returns `None` for instants chrono cannot represent.
pub fn reveal_date_utc(reveal_at_ms: u64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(i64::try_from(reveal_at_ms).ok()?)
}

/// Human-readable banner line for the teaser, e.g.
/// `Revealing on Saturday, August 15, 2026 10:00 UTC`.
pub fn reveal_banner(reveal_at_ms: u64) -> Option<String> {
    let at = reveal_date_utc(reveal_at_ms)?;
    Some(format!("Revealing on {}", at.format("%A, %B %-d, %Y %H:%M UTC")))
}
