//! Presence sinks and the connection-aware presenter in front of them.

use std::future::Future;

use thiserror::Error;

use crate::presence::{PresenceAction, PresencePayload, PresenceState};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("command failed: {0}")]
    Command(String),

    #[error("sink did not answer in time")]
    Timeout,

    #[error("sink is closed")]
    Closed,
}

/// Destination for rich presence updates.
pub trait PresenceSink: Send {
    fn connect(&mut self) -> impl Future<Output = Result<(), SinkError>> + Send;

    fn update(
        &mut self,
        payload: &PresencePayload,
    ) -> impl Future<Output = Result<(), SinkError>> + Send;

    fn clear(&mut self) -> impl Future<Output = Result<(), SinkError>> + Send;

    fn close(&mut self) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// What [`Presenter::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Cleared,
    /// Nothing changed since the last delivery.
    Skipped,
}

/// Tracks the sink connection and suppresses redundant commands.
///
/// Clears are sent once per transition into an idle state; updates only
/// when the payload differs from the last one delivered. Any sink failure
/// drops the connection so the next call reconnects and re-sends.
pub struct Presenter<S> {
    sink: S,
    connected: bool,
    degraded: bool,
    last_state: Option<PresenceState>,
    last_payload: Option<PresencePayload>,
}

impl<S: PresenceSink> Presenter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            connected: false,
            degraded: false,
            last_state: None,
            last_payload: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// The last command failed; the next cycle should refresh fully.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn last_state(&self) -> Option<PresenceState> {
        self.last_state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub async fn apply(
        &mut self,
        state: PresenceState,
        action: PresenceAction,
    ) -> Result<Delivery, SinkError> {
        let result = match action {
            PresenceAction::Clear => self.clear(state).await,
            PresenceAction::Update(payload) => self.update(state, payload).await,
        };
        match &result {
            Ok(_) => self.degraded = false,
            Err(e) => {
                tracing::warn!(error = %e, "Presence sink failed, reconnecting next cycle");
                self.connected = false;
                self.degraded = true;
                self.last_state = None;
                self.last_payload = None;
            }
        }
        result
    }

    async fn clear(&mut self, state: PresenceState) -> Result<Delivery, SinkError> {
        if self.last_state == Some(state) {
            return Ok(Delivery::Skipped);
        }
        if self.connected {
            self.sink.clear().await?;
            tracing::info!(%state, "Cleared presence");
        }
        self.last_state = Some(state);
        self.last_payload = None;
        Ok(Delivery::Cleared)
    }

    async fn update(
        &mut self,
        state: PresenceState,
        payload: PresencePayload,
    ) -> Result<Delivery, SinkError> {
        if !self.connected {
            self.sink.connect().await?;
            self.connected = true;
            tracing::info!("Connected to presence sink");
        }
        self.last_state = Some(state);
        if self.last_payload.as_ref() == Some(&payload) {
            return Ok(Delivery::Skipped);
        }

        self.sink.update(&payload).await?;
        tracing::debug!(details = %payload.details, state = %payload.state, "Updated presence");
        self.last_payload = Some(payload);
        Ok(Delivery::Sent)
    }

    /// Clear and close the connection, ignoring failures.
    pub async fn shutdown(&mut self) {
        if !self.connected {
            return;
        }
        if let Err(e) = self.sink.clear().await {
            tracing::debug!(error = %e, "Clear on shutdown failed");
        }
        if let Err(e) = self.sink.close().await {
            tracing::debug!(error = %e, "Close on shutdown failed");
        }
        self.connected = false;
        self.last_state = None;
        self.last_payload = None;
    }
}
