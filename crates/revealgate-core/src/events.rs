use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gate::{Countdown, GateView};

/// Every externally observable gate change produces an Event.
/// The host view (or the CLI) drains these; nothing in the core blocks on
/// a consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The mounted subtree changed.
    ViewChanged {
        view: GateView,
        at: DateTime<Utc>,
    },
    /// A countdown evaluation completed.
    CountdownTick {
        countdown: Countdown,
        revealed: bool,
        at: DateTime<Utc>,
    },
    /// A status document (real or fail-closed synthetic) was applied.
    StatusUpdated {
        is_revealed: bool,
        reveal_date: Option<u64>,
        refresh_interval_ms: Option<u64>,
        at: DateTime<Utc>,
    },
}
