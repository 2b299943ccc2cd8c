//! Autoplay recovery state machine.
//!
//! Runtimes differ in when, or whether, they permit unsolicited media
//! playback. The ladder is: immediate attempt, one 500 ms delayed retry,
//! then a gesture-gated fallback where the next user interaction issues the
//! play request. The machine also watches for unexpected pauses while
//! playing (end-of-stream is not unexpected -- the media loops) and walks
//! the ladder again with a fresh retry budget.
//!
//! ## States
//!
//! ```text
//! Idle -> Attempting -> (Playing | AwaitingGesture)
//! Playing -> PausedUnexpectedly -> Attempting
//! AwaitingGesture -> Playing
//! ```
//!
//! The controller owns its retry timer exclusively; at most one is pending
//! at any moment. The media element itself is owned by the caller and
//! reached only through [`MediaPlayer`].

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::PlaybackDenied;

/// Delay before the single automatic retry.
pub const RETRY_DELAY_MS: u64 = 500;

/// Automatic retries per ladder cycle.
const RETRY_BUDGET: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoplayState {
    Idle,
    Attempting,
    Playing,
    PausedUnexpectedly,
    AwaitingGesture,
}

/// Media lifecycle and interaction notifications fed into the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    /// Native "playing" notification.
    Playing,
    /// Native "pause" notification. `ended` is true when the media reached
    /// its natural end.
    Paused { ended: bool },
    /// Generic user interaction (pointer or touch).
    Gesture,
}

/// Future returned by [`MediaPlayer::play`].
pub type PlayFuture<'a> = Pin<Box<dyn Future<Output = Result<(), PlaybackDenied>> + Send + 'a>>;

/// The controller's view of the media element. The element's lifetime is
/// owned by the surrounding view, not by the controller.
pub trait MediaPlayer: Send + Sync + 'static {
    /// Ask the runtime to start playback.
    fn play(&self) -> PlayFuture<'_>;

    /// Reset the playback position to the start.
    fn rewind(&self);
}

/// Handle to a running controller. Dropping it tears the controller down.
pub struct AutoplayHandle {
    events_tx: mpsc::UnboundedSender<MediaEvent>,
    stopped: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl AutoplayHandle {
    /// Feed a media lifecycle or interaction event into the machine.
    pub fn notify(&self, event: MediaEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Tear down: releases the pending retry timer and stops listening for
    /// events. No state callback runs after this returns.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

impl Drop for AutoplayHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawns the state machine behind [`AutoplayHandle`].
pub struct AutoplayController;

impl AutoplayController {
    /// Mount the controller: rewind the media, start the ladder, and report
    /// every state transition through `on_state`.
    pub fn spawn<P, S>(player: P, mut on_state: S) -> AutoplayHandle
    where
        P: MediaPlayer,
        S: FnMut(AutoplayState) + Send + 'static,
    {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let stopped = Arc::new(AtomicBool::new(false));
        let guard = stopped.clone();

        let task = tokio::spawn(async move {
            let mut emit = move |state: AutoplayState| {
                if !guard.load(Ordering::SeqCst) {
                    on_state(state);
                }
            };
            drive(&player, &mut events_rx, &mut emit).await;
        });

        AutoplayHandle {
            events_tx,
            stopped,
            task,
        }
    }
}

enum AttemptOutcome {
    Playing,
    Exhausted,
    Detached,
}

async fn drive<P>(
    player: &P,
    events: &mut mpsc::UnboundedReceiver<MediaEvent>,
    emit: &mut impl FnMut(AutoplayState),
) where
    P: MediaPlayer,
{
    emit(AutoplayState::Idle);
    player.rewind();

    loop {
        // Attempt phase.
        emit(AutoplayState::Attempting);
        match attempt(player, events, emit).await {
            AttemptOutcome::Playing => emit(AutoplayState::Playing),
            AttemptOutcome::Exhausted => {
                // Gesture phase: the next interaction issues the play
                // request. A request already in flight swallows any burst
                // of rapid interactions, so play is never double-invoked.
                emit(AutoplayState::AwaitingGesture);
                loop {
                    match events.recv().await {
                        Some(MediaEvent::Gesture) => {
                            if player.play().await.is_ok() {
                                emit(AutoplayState::Playing);
                                break;
                            }
                            // Still denied: stay gesture-gated.
                        }
                        Some(MediaEvent::Playing) => {
                            emit(AutoplayState::Playing);
                            break;
                        }
                        Some(MediaEvent::Paused { .. }) => {}
                        None => return,
                    }
                }
            }
            AttemptOutcome::Detached => return,
        }

        // Playing phase: wait for an unexpected pause, then walk the ladder
        // again with a fresh retry budget.
        loop {
            match events.recv().await {
                Some(MediaEvent::Paused { ended: false }) => {
                    emit(AutoplayState::PausedUnexpectedly);
                    break;
                }
                // Natural-end pauses, redundant "playing" notifications and
                // stray interactions are all fine while playing.
                Some(_) => {}
                None => return,
            }
        }
    }
}

/// Issue play requests until one sticks or the automatic budget runs out.
/// Exactly one retry timer can be pending; a native "playing" notification
/// cancels it.
async fn attempt<P>(
    player: &P,
    events: &mut mpsc::UnboundedReceiver<MediaEvent>,
    emit: &mut impl FnMut(AutoplayState),
) -> AttemptOutcome
where
    P: MediaPlayer,
{
    let mut retries_left = RETRY_BUDGET;
    'request: loop {
        let mut play_fut = player.play();
        loop {
            tokio::select! {
                result = &mut play_fut => match result {
                    Ok(()) => return AttemptOutcome::Playing,
                    Err(PlaybackDenied) => {
                        if retries_left == 0 {
                            return AttemptOutcome::Exhausted;
                        }
                        retries_left -= 1;
                        emit(AutoplayState::Attempting);

                        let delay = tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS));
                        tokio::pin!(delay);
                        loop {
                            tokio::select! {
                                _ = &mut delay => continue 'request,
                                event = events.recv() => match event {
                                    Some(MediaEvent::Playing) => return AttemptOutcome::Playing,
                                    Some(_) => {}
                                    None => return AttemptOutcome::Detached,
                                },
                            }
                        }
                    }
                },
                event = events.recv() => match event {
                    Some(MediaEvent::Playing) => return AttemptOutcome::Playing,
                    Some(_) => {}
                    None => return AttemptOutcome::Detached,
                },
            }
        }
    }
}
