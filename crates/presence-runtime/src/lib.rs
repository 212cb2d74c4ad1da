//! The polling loop that drives the presence pipeline.
//!
//! One task reads the status source at a fixed interval and hands each
//! outcome to the [`PresenceEngine`]. A cycle always runs to completion;
//! the stop signal is observed between cycles and during the sleep.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;

use presence_api::{ImageSearch, MetadataSearch};
use presence_core::config::AppConfig;
use presence_core::error::PresenceError;
use presence_core::orchestrator::{CycleReport, PresenceEngine};
use presence_core::sink::PresenceSink;
use presence_detect::{DetectError, PollOutcome, StatusSource};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("status error: {0}")]
    Detect(#[from] DetectError),
    #[error("presence error: {0}")]
    Presence(#[from] PresenceError),
}

pub struct Runtime<Src, M, I, S> {
    source: Src,
    engine: PresenceEngine<M, I, S>,
    interval: Duration,
    backoff: Duration,
}

impl<Src, M, I, S> Runtime<Src, M, I, S>
where
    Src: StatusSource,
    M: MetadataSearch,
    I: ImageSearch,
    S: PresenceSink,
{
    pub fn new(
        source: Src,
        engine: PresenceEngine<M, I, S>,
        interval: Duration,
        backoff: Duration,
    ) -> Self {
        Self {
            source,
            engine,
            interval,
            backoff,
        }
    }

    pub fn from_config(source: Src, engine: PresenceEngine<M, I, S>, config: &AppConfig) -> Self {
        Self::new(source, engine, config.poll_interval(), config.error_backoff())
    }

    /// Poll once and deliver the result. `force` bypasses change detection.
    pub async fn run_cycle(&mut self, force: bool) -> Result<CycleReport, RuntimeError> {
        let outcome = self.source.poll(force).await?;
        let now = self.source.clock();
        let detector = self.source.change_detector();
        Ok(self.engine.process(outcome, detector, now).await?)
    }

    /// The source failed to read: treat the cycle as one without a status so
    /// a source that stays broken ages into `Stopped` and clears.
    async fn process_without_status(&mut self) {
        let now = self.source.clock();
        let detector = self.source.change_detector();
        if let Err(e) = self
            .engine
            .process(PollOutcome::Unavailable, detector, now)
            .await
        {
            tracing::debug!(error = %e, "Presence update after source error failed");
        }
    }

    /// Run until `stop` becomes `true` (or its sender is dropped), then
    /// clear the presence and close the sink.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        tracing::info!(
            source = %self.source.describe(),
            interval = ?self.interval,
            "Presence loop started"
        );

        // The first read is always processed in full.
        let mut force = true;
        loop {
            if *stop.borrow() {
                break;
            }

            let delay = match AssertUnwindSafe(self.run_cycle(force)).catch_unwind().await {
                Ok(Ok(_)) => {
                    force = self.engine.needs_refresh();
                    self.interval
                }
                Ok(Err(e)) => {
                    match &e {
                        RuntimeError::Detect(DetectError::Unauthorized) => {
                            tracing::error!(error = %e, "Presence cycle failed")
                        }
                        _ => tracing::warn!(error = %e, "Presence cycle failed"),
                    }
                    if matches!(e, RuntimeError::Detect(_)) {
                        let _ = AssertUnwindSafe(self.process_without_status())
                            .catch_unwind()
                            .await;
                    }
                    force = true;
                    self.backoff
                }
                Err(panic) => {
                    tracing::error!(panic = panic_message(&*panic), "Presence cycle panicked");
                    force = true;
                    self.backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.engine.shutdown().await;
        tracing::info!("Presence loop stopped");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
