//! Remote status polling with fail-closed degradation.
//!
//! One fetch fires immediately, then the loop sleeps for whatever interval
//! the most recent response asked for (default 60 s until a response says
//! otherwise). A failed fetch never reaches the caller as an error: the
//! subscriber receives the fail-closed synthetic status and polling carries
//! on at the previous interval.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::error::StatusError;
use crate::status::{RemoteStatus, DEFAULT_REFRESH_INTERVAL_MS};

/// Future returned by [`StatusFetcher::fetch`].
pub type StatusFuture<'a> =
    Pin<Box<dyn Future<Output = Result<RemoteStatus, StatusError>> + Send + 'a>>;

/// Fetches the remote reveal-status document.
///
/// The production implementation is [`HttpStatusFetcher`]; tests substitute
/// scripted stubs.
pub trait StatusFetcher: Send + Sync + 'static {
    fn fetch(&self) -> StatusFuture<'_>;
}

impl StatusFetcher for Box<dyn StatusFetcher> {
    fn fetch(&self) -> StatusFuture<'_> {
        (**self).fetch()
    }
}

/// HTTP GET fetcher. Non-2xx responses and undecodable bodies are fetch
/// failures.
pub struct HttpStatusFetcher {
    client: reqwest::Client,
    url: url::Url,
}

impl HttpStatusFetcher {
    pub fn new(status_url: &str) -> Result<Self, StatusError> {
        let url = url::Url::parse(status_url).map_err(|e| StatusError::InvalidUrl {
            url: status_url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            url,
        })
    }
}

impl StatusFetcher for HttpStatusFetcher {
    fn fetch(&self) -> StatusFuture<'_> {
        Box::pin(async move {
            let resp = self.client.get(self.url.clone()).send().await?;
            if !resp.status().is_success() {
                return Err(StatusError::HttpStatus(resp.status().as_u16()));
            }
            let body = resp.text().await?;
            serde_json::from_str::<RemoteStatus>(&body)
                .map_err(|e| StatusError::Parse(e.to_string()))
        })
    }
}

/// Handle to a running poll loop. Dropping it stops the loop.
pub struct PollerHandle {
    stopped: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop all pending and future fetches. Calling it twice is a no-op.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawns the poll loop behind [`PollerHandle`].
pub struct RemoteStatusPoller;

impl RemoteStatusPoller {
    /// Start polling. `on_update` receives every status, real or
    /// fail-closed synthetic; it is never skipped and never handed an
    /// error.
    pub fn spawn<F, U>(fetcher: F, mut on_update: U) -> PollerHandle
    where
        F: StatusFetcher,
        U: FnMut(RemoteStatus) + Send + 'static,
    {
        let stopped = Arc::new(AtomicBool::new(false));
        let guard = stopped.clone();

        let task = tokio::spawn(async move {
            let mut interval_ms = DEFAULT_REFRESH_INTERVAL_MS;
            loop {
                let status = match fetcher.fetch().await {
                    Ok(status) => {
                        if let Some(ms) = status.refresh_interval_ms() {
                            if ms > 0 {
                                interval_ms = ms;
                            }
                        }
                        status
                    }
                    Err(err) => {
                        log::warn!("status fetch failed, staying hidden: {err}");
                        RemoteStatus::fail_closed()
                    }
                };
                if guard.load(Ordering::SeqCst) {
                    break;
                }
                on_update(status);
                // The single outstanding schedule for this poller.
                tokio::time::sleep(Duration::from_millis(interval_ms)).await;
            }
        });

        PollerHandle { stopped, task }
    }
}
