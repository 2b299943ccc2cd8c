//! Gate composition -- which subtree is mounted.
//!
//! The gate starts in `Loading` and flips to `Teaser` or `Revealed` only
//! after the first policy evaluation (local strategy) or the first poll
//! result (remote strategy), so the real content never flashes early. The
//! two strategies are never merged: a deployment configures exactly one
//! source of truth.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::countdown::{CountdownHandle, CountdownTimer};
use super::policy::Countdown;
use super::poller::{RemoteStatusPoller, StatusFetcher};
use crate::clock::Clock;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateView {
    /// Before the first evaluation result is available.
    Loading,
    /// Countdown teaser.
    Teaser,
    /// The real content.
    Revealed,
}

/// The source of truth for the reveal decision. Exactly one per deployment.
pub enum RevealSource {
    /// Fixed instant; no network dependency.
    Local { reveal_at_ms: u64 },
    /// A polled remote status document is authoritative.
    Remote { fetcher: Box<dyn StatusFetcher> },
}

/// Handle to a running gate. Dropping it tears down the gate and every
/// timer it owns.
pub struct GateHandle {
    view_rx: watch::Receiver<GateView>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    task: JoinHandle<()>,
}

impl GateHandle {
    /// The currently mounted subtree. Only ever one.
    pub fn view(&self) -> GateView {
        *self.view_rx.borrow()
    }

    pub fn subscribe_view(&self) -> watch::Receiver<GateView> {
        self.view_rx.clone()
    }

    /// Next gate event. `None` once the gate has shut down and the queue
    /// is drained.
    pub async fn next_event(&mut self) -> Option<Event> {
        self.events_rx.recv().await
    }

    /// Tear down the gate, its countdown and its poller. Calling it twice
    /// is a no-op.
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for GateHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawns the composition task behind [`GateHandle`].
pub struct RevealGate;

impl RevealGate {
    pub fn spawn<C>(clock: C, source: RevealSource) -> GateHandle
    where
        C: Clock + Clone,
    {
        let (view_tx, view_rx) = watch::channel(GateView::Loading);
        let (event_tx, events_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            match source {
                RevealSource::Local { reveal_at_ms } => {
                    run_local(clock, reveal_at_ms, view_tx, event_tx).await;
                }
                RevealSource::Remote { fetcher } => {
                    run_remote(clock, fetcher, view_tx, event_tx).await;
                }
            }
        });

        GateHandle {
            view_rx,
            events_rx,
            task,
        }
    }
}

/// Flip the mounted view, emitting an event only on an actual change.
fn set_view(
    view_tx: &watch::Sender<GateView>,
    event_tx: &mpsc::UnboundedSender<Event>,
    view: GateView,
) {
    let changed = view_tx.send_if_modified(|current| {
        if *current == view {
            false
        } else {
            *current = view;
            true
        }
    });
    if changed {
        let _ = event_tx.send(Event::ViewChanged {
            view,
            at: Utc::now(),
        });
    }
}

fn emit_tick(
    event_tx: &mpsc::UnboundedSender<Event>,
    countdown: Countdown,
    revealed: bool,
) {
    let _ = event_tx.send(Event::CountdownTick {
        countdown,
        revealed,
        at: Utc::now(),
    });
}

/// Local strategy: the countdown itself decides the flip.
async fn run_local<C>(
    clock: C,
    reveal_at_ms: u64,
    view_tx: watch::Sender<GateView>,
    event_tx: mpsc::UnboundedSender<Event>,
) where
    C: Clock,
{
    let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
    let countdown = CountdownTimer::spawn(clock, reveal_at_ms, move |cd, revealed| {
        let _ = tick_tx.send((cd, revealed));
    });

    while let Some((cd, revealed)) = tick_rx.recv().await {
        if revealed {
            set_view(&view_tx, &event_tx, GateView::Revealed);
            emit_tick(&event_tx, cd, true);
            countdown.stop();
            break;
        }
        set_view(&view_tx, &event_tx, GateView::Teaser);
        emit_tick(&event_tx, cd, false);
    }
}

/// Remote strategy: the polled status is authoritative; the countdown only
/// renders numbers and never flips the view on its own.
async fn run_remote<C>(
    clock: C,
    fetcher: Box<dyn StatusFetcher>,
    view_tx: watch::Sender<GateView>,
    event_tx: mpsc::UnboundedSender<Event>,
) where
    C: Clock + Clone,
{
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let poller = RemoteStatusPoller::spawn(fetcher, move |status| {
        let _ = status_tx.send(status);
    });

    let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
    let mut countdown: Option<CountdownHandle> = None;

    loop {
        tokio::select! {
            status = status_rx.recv() => {
                let Some(status) = status else { break };
                let _ = event_tx.send(Event::StatusUpdated {
                    is_revealed: status.is_revealed,
                    reveal_date: status.reveal_date,
                    refresh_interval_ms: status.refresh_interval_ms(),
                    at: Utc::now(),
                });

                if status.is_revealed {
                    set_view(&view_tx, &event_tx, GateView::Revealed);
                    if let Some(cd) = countdown.take() {
                        cd.stop();
                    }
                    poller.stop();
                    break;
                }

                set_view(&view_tx, &event_tx, GateView::Teaser);

                // Absolute instants survive clock skew; use the relative
                // remainder only when that is all the backend sent.
                let anchor = status.reveal_date.or_else(|| {
                    status
                        .time_remaining_ms
                        .map(|rem| clock.now_ms().saturating_add(rem))
                });
                if let Some(anchor_ms) = anchor {
                    if let Some(cd) = &countdown {
                        cd.set_anchor(anchor_ms);
                    } else {
                        let tick_tx = tick_tx.clone();
                        countdown = Some(CountdownTimer::spawn(
                            clock.clone(),
                            anchor_ms,
                            move |cd, revealed| {
                                let _ = tick_tx.send((cd, revealed));
                            },
                        ));
                    }
                }
            }
            tick = tick_rx.recv() => {
                let Some((cd, revealed)) = tick else { break };
                emit_tick(&event_tx, cd, revealed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn local_gate_loading_then_teaser_then_revealed() {
        let clock = ManualClock::new(0);
        let mut handle = RevealGate::spawn(
            clock.clone(),
            RevealSource::Local {
                reveal_at_ms: 3_000,
            },
        );

        // Nothing has been evaluated yet.
        assert_eq!(handle.view(), GateView::Loading);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.view(), GateView::Teaser);

        clock.set(3_000);
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(handle.view(), GateView::Revealed);

        // The revealed flip must come through the event stream too.
        let mut saw_teaser = false;
        let mut saw_revealed = false;
        while let Some(event) = handle.next_event().await {
            if let Event::ViewChanged { view, .. } = event {
                match view {
                    GateView::Teaser => saw_teaser = true,
                    GateView::Revealed => saw_revealed = true,
                    GateView::Loading => panic!("never re-enters loading"),
                }
            }
        }
        assert!(saw_teaser);
        assert!(saw_revealed);
    }

    #[tokio::test(start_paused = true)]
    async fn local_gate_already_past_reveals_without_teaser_flash() {
        let clock = ManualClock::new(10_000);
        let handle = RevealGate::spawn(
            clock,
            RevealSource::Local {
                reveal_at_ms: 3_000,
            },
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.view(), GateView::Revealed);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_gate_emits_nothing_further() {
        let clock = ManualClock::new(0);
        let mut handle = RevealGate::spawn(
            clock,
            RevealSource::Local {
                reveal_at_ms: 1_000_000,
            },
        );

        tokio::time::sleep(Duration::from_millis(2_100)).await;
        handle.stop();

        // Drain whatever was queued before the stop; the stream must end.
        let mut drained = 0;
        while handle.next_event().await.is_some() {
            drained += 1;
            assert!(drained < 100, "event stream did not terminate");
        }

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(handle.next_event().await.is_none());
    }
}
