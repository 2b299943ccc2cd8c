mod countdown;
mod policy;
mod poller;
mod reveal;

pub use countdown::{CountdownHandle, CountdownTimer, TICK_INTERVAL_MS};
pub use policy::{evaluate, reveal_banner, reveal_date_utc, Countdown, PolicyDecision};
pub use poller::{
    HttpStatusFetcher, PollerHandle, RemoteStatusPoller, StatusFetcher, StatusFuture,
};
pub use reveal::{GateHandle, GateView, RevealGate, RevealSource};
