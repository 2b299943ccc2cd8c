//! End-to-end gate flows over both reveal strategies.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use revealgate_core::gate::StatusFuture;
use revealgate_core::{
    Event, GateView, ManualClock, RemoteStatus, RevealGate, RevealSource, ScreenConfig,
    StatusError, StatusFetcher,
};

/// First poll: not revealed yet, reveal in 20 s, re-poll every second.
/// Every later poll: revealed.
struct FlipFetcher {
    calls: Arc<AtomicUsize>,
}

impl StatusFetcher for FlipFetcher {
    fn fetch(&self) -> StatusFuture<'_> {
        let calls = self.calls.clone();
        Box::pin(async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(RemoteStatus {
                    is_revealed: false,
                    reveal_date: Some(20_000),
                    time_remaining_ms: Some(20_000),
                    config: Some(ScreenConfig {
                        refresh_interval_ms: 1_000,
                        ..ScreenConfig::default()
                    }),
                })
            } else {
                Ok(RemoteStatus {
                    is_revealed: true,
                    reveal_date: Some(20_000),
                    time_remaining_ms: Some(0),
                    config: None,
                })
            }
        })
    }
}

struct OutageFetcher;

impl StatusFetcher for OutageFetcher {
    fn fetch(&self) -> StatusFuture<'_> {
        Box::pin(async { Err(StatusError::HttpStatus(502)) })
    }
}

#[tokio::test(start_paused = true)]
async fn remote_gate_teaser_then_reveal() {
    let clock = ManualClock::new(0);
    let calls = Arc::new(AtomicUsize::new(0));
    let mut handle = RevealGate::spawn(
        clock,
        RevealSource::Remote {
            fetcher: Box::new(FlipFetcher {
                calls: calls.clone(),
            }),
        },
    );

    // No poll result has been applied yet.
    assert_eq!(handle.view(), GateView::Loading);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(handle.view(), GateView::Teaser);

    // The second poll lands at the 1 s interval the first response set.
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert_eq!(handle.view(), GateView::Revealed);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let mut status_updates = 0;
    let mut saw_tick = false;
    let mut last_view_change = None;
    while let Some(event) = handle.next_event().await {
        match event {
            Event::StatusUpdated { .. } => status_updates += 1,
            Event::CountdownTick { .. } => saw_tick = true,
            Event::ViewChanged { view, .. } => last_view_change = Some(view),
        }
    }
    assert_eq!(status_updates, 2);
    assert!(saw_tick, "countdown must run while the teaser is mounted");
    assert_eq!(last_view_change, Some(GateView::Revealed));
}

#[tokio::test(start_paused = true)]
async fn remote_outage_fails_closed_forever() {
    let clock = ManualClock::new(0);
    let mut handle = RevealGate::spawn(
        clock,
        RevealSource::Remote {
            fetcher: Box::new(OutageFetcher),
        },
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(handle.view(), GateView::Teaser);

    // Three default poll intervals of outage: still hidden.
    tokio::time::sleep(Duration::from_secs(3 * 60 + 1)).await;
    assert_eq!(handle.view(), GateView::Teaser);

    handle.stop();
    let mut fail_closed_updates = 0;
    while let Some(event) = handle.next_event().await {
        if let Event::StatusUpdated { is_revealed, .. } = event {
            assert!(!is_revealed);
            fail_closed_updates += 1;
        }
    }
    assert!(fail_closed_updates >= 3);
}

#[tokio::test(start_paused = true)]
async fn local_gate_counts_down_to_reveal() {
    let clock = ManualClock::new(0);
    let mut handle = RevealGate::spawn(
        clock.clone(),
        RevealSource::Local {
            reveal_at_ms: 90_061_000,
        },
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(handle.view(), GateView::Teaser);

    let first_tick = loop {
        match handle.next_event().await {
            Some(Event::CountdownTick { countdown, .. }) => break countdown,
            Some(_) => continue,
            None => panic!("event stream ended before a tick"),
        }
    };
    assert_eq!(
        (
            first_tick.days,
            first_tick.hours,
            first_tick.minutes,
            first_tick.seconds
        ),
        (1, 1, 1, 1)
    );

    clock.set(90_061_000);
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert_eq!(handle.view(), GateView::Revealed);
}
