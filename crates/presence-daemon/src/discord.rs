//! Discord Rich Presence sink.
//!
//! Runs a `DiscordIpcClient` on a dedicated OS thread (IPC is blocking)
//! and talks to it over a channel. Every command carries a reply channel so
//! failures reach the presenter, which reconnects on the next cycle.

use std::sync::mpsc;
use std::time::Duration;

use discord_rich_presence::{activity, DiscordIpc, DiscordIpcClient};
use tokio::sync::oneshot;

use presence_core::presence::{ActivityType, PresencePayload};
use presence_core::sink::{PresenceSink, SinkError};

/// How long to wait for the IPC thread to answer one command.
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

type Reply = oneshot::Sender<Result<(), SinkError>>;

/// Commands sent to the Discord actor thread.
enum DiscordCommand {
    Connect(Reply),
    Update(Box<PresencePayload>, Reply),
    Clear(Reply),
    Close(Reply),
}

/// Handle to the Discord actor thread.
pub struct DiscordSink {
    tx: mpsc::Sender<DiscordCommand>,
}

impl DiscordSink {
    /// Spawn the actor thread. Nothing connects until the first update.
    pub fn start(client_id: String) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();

        std::thread::Builder::new()
            .name("discord-rpc".into())
            .spawn(move || actor_loop(&client_id, rx))?;

        Ok(Self { tx })
    }

    async fn request(
        &self,
        command: impl FnOnce(Reply) -> DiscordCommand,
    ) -> Result<(), SinkError> {
        let (reply, answer) = oneshot::channel();
        self.tx.send(command(reply)).map_err(|_| SinkError::Closed)?;

        match tokio::time::timeout(REPLY_TIMEOUT, answer).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SinkError::Closed),
            Err(_) => Err(SinkError::Timeout),
        }
    }
}

impl PresenceSink for DiscordSink {
    async fn connect(&mut self) -> Result<(), SinkError> {
        self.request(DiscordCommand::Connect).await
    }

    async fn update(&mut self, payload: &PresencePayload) -> Result<(), SinkError> {
        let payload = Box::new(payload.clone());
        self.request(|reply| DiscordCommand::Update(payload, reply))
            .await
    }

    async fn clear(&mut self) -> Result<(), SinkError> {
        self.request(DiscordCommand::Clear).await
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.request(DiscordCommand::Close).await
    }
}

/// The actor loop: owns the IPC client and processes commands until the
/// sink is dropped.
fn actor_loop(client_id: &str, rx: mpsc::Receiver<DiscordCommand>) {
    let mut client: Option<DiscordIpcClient> = None;

    for cmd in rx {
        match cmd {
            DiscordCommand::Connect(reply) => {
                if let Some(mut stale) = client.take() {
                    let _ = stale.close();
                }
                let mut ipc = DiscordIpcClient::new(client_id);
                let result = match ipc.connect() {
                    Ok(()) => {
                        tracing::info!("Connected to Discord IPC");
                        client = Some(ipc);
                        Ok(())
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "Discord not available");
                        Err(SinkError::Connect(e.to_string()))
                    }
                };
                let _ = reply.send(result);
            }
            DiscordCommand::Update(payload, reply) => {
                let result = match client.as_mut() {
                    Some(ipc) => set_activity(ipc, &payload),
                    None => Err(SinkError::Closed),
                };
                if result.is_err() {
                    // Connection probably died; the presenter reconnects.
                    client = None;
                }
                let _ = reply.send(result);
            }
            DiscordCommand::Clear(reply) => {
                let result = match client.as_mut() {
                    Some(ipc) => ipc
                        .clear_activity()
                        .map_err(|e| SinkError::Command(e.to_string())),
                    None => Err(SinkError::Closed),
                };
                if result.is_err() {
                    client = None;
                }
                let _ = reply.send(result);
            }
            DiscordCommand::Close(reply) => {
                let result = match client.take() {
                    Some(mut ipc) => ipc.close().map_err(|e| SinkError::Command(e.to_string())),
                    None => Ok(()),
                };
                let _ = reply.send(result);
            }
        }
    }

    if let Some(mut ipc) = client {
        let _ = ipc.close();
    }
}

fn set_activity(ipc: &mut DiscordIpcClient, payload: &PresencePayload) -> Result<(), SinkError> {
    let mut timestamps = activity::Timestamps::new();
    if let Some(start) = payload.start {
        timestamps = timestamps.start(start);
    }
    if let Some(end) = payload.end {
        timestamps = timestamps.end(end);
    }

    let assets = activity::Assets::new()
        .large_image(payload.large_image.as_str())
        .large_text(payload.large_text.as_str())
        .small_image(payload.small_image.as_str())
        .small_text(payload.small_text.as_str());

    let mut activity = activity::Activity::new()
        .activity_type(activity_type(payload.activity_type))
        .details(payload.details.as_str())
        .assets(assets);
    if !payload.state.is_empty() {
        activity = activity.state(payload.state.as_str());
    }
    if payload.start.is_some() || payload.end.is_some() {
        activity = activity.timestamps(timestamps);
    }

    ipc.set_activity(activity)
        .map_err(|e| SinkError::Command(e.to_string()))
}

fn activity_type(kind: ActivityType) -> activity::ActivityType {
    match kind {
        ActivityType::Listening => activity::ActivityType::Listening,
        ActivityType::Watching => activity::ActivityType::Watching,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dead_actor_reports_closed() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let mut sink = DiscordSink { tx };

        assert!(matches!(sink.clear().await, Err(SinkError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_actor_times_out() {
        let (tx, rx) = mpsc::channel::<DiscordCommand>();
        let mut sink = DiscordSink { tx };

        // Hold the reply channels without answering.
        let _pending = rx;
        let result = sink.connect().await;

        assert!(matches!(result, Err(SinkError::Timeout)));
    }

    #[tokio::test]
    async fn test_update_reaches_actor() {
        let (tx, rx) = mpsc::channel();
        let mut sink = DiscordSink { tx };
        let actor = std::thread::spawn(move || {
            let Ok(DiscordCommand::Update(payload, reply)) = rx.recv() else {
                panic!("expected an update");
            };
            let _ = reply.send(Ok(()));
            payload.details
        });

        let payload = PresencePayload {
            details: "Money".into(),
            state: "by Pink Floyd".into(),
            large_image: "logo".into(),
            large_text: "VLC Media Player".into(),
            small_image: "playing".into(),
            small_text: "Playing".into(),
            start: Some(970),
            end: Some(1270),
            activity_type: ActivityType::Listening,
        };
        sink.update(&payload).await.unwrap();

        assert_eq!(actor.join().unwrap(), "Money");
    }
}
