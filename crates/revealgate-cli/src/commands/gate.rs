use clap::Subcommand;
use revealgate_core::gate::{evaluate, reveal_banner, Countdown};
use revealgate_core::{
    Clock, ConfigError, Event, GateConfig, GateView, HttpStatusFetcher, RemoteStatusPoller,
    RevealGate, RevealSource, StatusFetcher, SystemClock,
};

#[derive(Subcommand)]
pub enum GateAction {
    /// Print the current gate decision as JSON
    Status,
    /// Run the gate live, printing events as JSON lines until revealed
    Watch,
    /// Poll the status endpoint, printing every update as a JSON line
    Poll,
}

pub fn run(action: GateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = GateConfig::load_or_default();
    match action {
        GateAction::Status => status(&config),
        GateAction::Watch => watch(config),
        GateAction::Poll => poll(&config),
    }
}

fn status(config: &GateConfig) -> Result<(), Box<dyn std::error::Error>> {
    match config.reveal_source()? {
        RevealSource::Local { reveal_at_ms } => {
            let decision = evaluate(SystemClock.now_ms(), reveal_at_ms);
            let snapshot = serde_json::json!({
                "revealed": decision.revealed,
                "remaining_ms": decision.remaining_ms,
                "countdown": Countdown::from_remaining_ms(decision.remaining_ms),
                "banner": reveal_banner(reveal_at_ms),
            });
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        RevealSource::Remote { fetcher } => {
            let runtime = tokio::runtime::Runtime::new()?;
            let status = runtime.block_on(fetcher.fetch())?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}

fn watch(config: GateConfig) -> Result<(), Box<dyn std::error::Error>> {
    let source = config.reveal_source()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let mut handle = RevealGate::spawn(SystemClock, source);
        while let Some(event) = handle.next_event().await {
            println!("{}", serde_json::to_string(&event)?);
            if matches!(
                event,
                Event::ViewChanged {
                    view: GateView::Revealed,
                    ..
                }
            ) {
                break;
            }
        }
        Ok(())
    })
}

fn poll(config: &GateConfig) -> Result<(), Box<dyn std::error::Error>> {
    let url = config
        .reveal
        .status_url
        .clone()
        .ok_or(ConfigError::NoRevealSource)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let fetcher = HttpStatusFetcher::new(&url)?;
        let (update_tx, mut update_rx) = tokio::sync::mpsc::unbounded_channel();
        let poller = RemoteStatusPoller::spawn(fetcher, move |status| {
            let _ = update_tx.send(status);
        });
        while let Some(status) = update_rx.recv().await {
            println!("{}", serde_json::to_string(&status)?);
            if status.is_revealed {
                break;
            }
        }
        poller.stop();
        Ok(())
    })
}
