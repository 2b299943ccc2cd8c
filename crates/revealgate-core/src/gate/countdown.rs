//! Live countdown driver.
//!
//! Owns a single repeating 1 s schedule. Every tick re-evaluates the policy
//! from the clock and the current anchor -- the emitted value is never
//! derived from the previous one. Replacing the anchor forces one immediate
//! re-evaluation so the consumer never sees up to a second of stale numbers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::policy::{self, Countdown};
use crate::clock::Clock;

/// Tick cadence.
pub const TICK_INTERVAL_MS: u64 = 1_000;

/// Handle to a running countdown. Dropping it stops the countdown.
pub struct CountdownHandle {
    anchor_tx: watch::Sender<u64>,
    stopped: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl CountdownHandle {
    /// Replace the reveal instant the countdown computes against.
    ///
    /// Triggers one immediate evaluation instead of waiting for the next
    /// scheduled tick.
    pub fn set_anchor(&self, reveal_at_ms: u64) {
        let _ = self.anchor_tx.send(reveal_at_ms);
    }

    /// Stop the countdown. No tick callback runs after this returns.
    /// Calling it twice is a no-op.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawns the tick task behind [`CountdownHandle`].
pub struct CountdownTimer;

impl CountdownTimer {
    /// Start ticking against `reveal_at_ms`, invoking `on_tick` with the
    /// fresh decomposition and reveal flag once immediately and then every
    /// second.
    pub fn spawn<C, F>(clock: C, reveal_at_ms: u64, mut on_tick: F) -> CountdownHandle
    where
        C: Clock,
        F: FnMut(Countdown, bool) + Send + 'static,
    {
        let (anchor_tx, mut anchor_rx) = watch::channel(reveal_at_ms);
        let stopped = Arc::new(AtomicBool::new(false));
        let guard = stopped.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(TICK_INTERVAL_MS));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    changed = anchor_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        // Re-anchored: fall through and evaluate now.
                    }
                }
                if guard.load(Ordering::SeqCst) {
                    break;
                }
                let anchor = *anchor_rx.borrow();
                let decision = policy::evaluate(clock.now_ms(), anchor);
                on_tick(Countdown::from_remaining_ms(decision.remaining_ms), decision.revealed);
            }
        });

        CountdownHandle {
            anchor_tx,
            stopped,
            task,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Mutex;

    type Ticks = Arc<Mutex<Vec<(Countdown, bool)>>>;

    fn collector() -> (Ticks, impl FnMut(Countdown, bool) + Send + 'static) {
        let ticks: Ticks = Arc::new(Mutex::new(Vec::new()));
        let sink = ticks.clone();
        (ticks, move |cd, revealed| {
            sink.lock().unwrap().push((cd, revealed));
        })
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_second() {
        let clock = ManualClock::new(0);
        let (ticks, on_tick) = collector();
        let handle = CountdownTimer::spawn(clock, 100_000, on_tick);

        tokio::time::sleep(Duration::from_millis(3_100)).await;
        // Immediate first evaluation plus one per elapsed second.
        assert_eq!(ticks.lock().unwrap().len(), 4);
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn recomputes_from_clock_not_by_decrement() {
        let clock = ManualClock::new(0);
        let (ticks, on_tick) = collector();
        let handle = CountdownTimer::spawn(clock.clone(), 10_000, on_tick);

        tokio::time::sleep(Duration::from_millis(10)).await;
        // Clock jumped way past the instant between ticks.
        clock.set(60_000);
        tokio::time::sleep(Duration::from_millis(1_000)).await;

        let ticks = ticks.lock().unwrap();
        let (cd, revealed) = *ticks.last().unwrap();
        assert!(revealed);
        assert!(cd.is_zero());
        drop(ticks);
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn set_anchor_reevaluates_immediately() {
        let clock = ManualClock::new(0);
        let (ticks, on_tick) = collector();
        let handle = CountdownTimer::spawn(clock, 5_000, on_tick);

        tokio::time::sleep(Duration::from_millis(10)).await;
        let before = ticks.lock().unwrap().len();

        handle.set_anchor(90_061_000);
        // Well under the tick interval: the fresh anchor must already show.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let ticks = ticks.lock().unwrap();
        assert_eq!(ticks.len(), before + 1);
        let (cd, revealed) = *ticks.last().unwrap();
        assert!(!revealed);
        assert_eq!(cd.days, 1);
        drop(ticks);
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn no_ticks_after_stop() {
        let clock = ManualClock::new(0);
        let (ticks, on_tick) = collector();
        let handle = CountdownTimer::spawn(clock, 100_000, on_tick);

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        handle.stop();
        let frozen = ticks.lock().unwrap().len();

        // Advance far past every pending schedule.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ticks.lock().unwrap().len(), frozen);

        // Stopping again is a no-op.
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn drop_stops_the_schedule() {
        let clock = ManualClock::new(0);
        let (ticks, on_tick) = collector();
        let handle = CountdownTimer::spawn(clock, 100_000, on_tick);

        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(handle);
        let frozen = ticks.lock().unwrap().len();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.lock().unwrap().len(), frozen);
    }
}
