use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::protocol::{self, EnginePacket, SocketPacket};
use super::{CONNECT_FAILED_MESSAGE, ChannelContext, ChannelState, PushNotice};
use crate::actions::RefetchTarget;

/// Owned push connection. Dropping the handle closes the connection.
pub struct ChannelHandle {
    cancel: CancellationToken,
    state: watch::Receiver<ChannelState>,
    task: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    /// Connects and authenticates with `token` in a background task,
    /// reconnecting after transport failures until dropped.
    pub fn spawn(ctx: ChannelContext, token: String) -> Self {
        Self::spawn_with_backoff(ctx, token, Backoff::default())
    }

    pub fn spawn_with_backoff(ctx: ChannelContext, token: String, backoff: Backoff) -> Self {
        let cancel = CancellationToken::new();
        let (state_tx, state) = watch::channel(ChannelState::Connecting);
        let task = tokio::spawn(run(ctx, token, backoff, state_tx, cancel.clone()));
        Self {
            cancel,
            state,
            task: Some(task),
        }
    }

    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.state.clone()
    }

    /// Closes the connection and waits for the task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Delay between reconnect attempts, doubling from `initial` up to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(5),
        }
    }
}

impl Backoff {
    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn delay(self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1).min(16));
        self.initial.saturating_mul(factor).min(self.max)
    }
}

enum Step {
    Continue,
    Reply(String),
    /// Transport is gone; reconnect.
    Lost,
    /// Server ended the session on purpose; stay down.
    Reject,
}

/// How one connection ended.
enum Ended {
    Cancelled,
    Rejected,
    Unreachable,
    Dropped { authenticated: bool },
}

/// Ping deadline from the Engine.IO handshake.
struct Heartbeat {
    window: Duration,
    deadline: Instant,
}

impl Heartbeat {
    fn new() -> Self {
        Self {
            window: protocol::DEFAULT_HEARTBEAT,
            deadline: Instant::now() + protocol::DEFAULT_HEARTBEAT,
        }
    }

    fn reset(&mut self) {
        self.deadline = Instant::now() + self.window;
    }
}

async fn run(
    ctx: ChannelContext,
    token: String,
    backoff: Backoff,
    state: watch::Sender<ChannelState>,
    cancel: CancellationToken,
) {
    let url = match protocol::socket_url(&ctx.socket_url) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(error = %e, "push channel misconfigured");
            ctx.toasts.error(CONNECT_FAILED_MESSAGE);
            state.send_replace(ChannelState::Disconnected);
            return;
        }
    };

    let mut failures: u32 = 0;
    loop {
        state.send_replace(ChannelState::Connecting);
        match connect(&ctx, &token, &url, &state, &cancel).await {
            Ended::Cancelled | Ended::Rejected => break,
            Ended::Unreachable => {
                // One toast per outage.
                if failures == 0 {
                    ctx.toasts.error(CONNECT_FAILED_MESSAGE);
                }
            }
            Ended::Dropped { authenticated } => {
                if authenticated {
                    failures = 0;
                }
            }
        }
        state.send_replace(ChannelState::Disconnected);

        failures = failures.saturating_add(1);
        let delay = backoff.delay(failures);
        tracing::info!(attempt = failures, ?delay, "reconnecting push channel");
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    state.send_replace(ChannelState::Disconnected);
}

/// Runs one connection from WebSocket upgrade until it ends.
async fn connect(
    ctx: &ChannelContext,
    token: &str,
    url: &url::Url,
    state: &watch::Sender<ChannelState>,
    cancel: &CancellationToken,
) -> Ended {
    tracing::info!(%url, "connecting push channel");
    let connect = tokio::select! {
        () = cancel.cancelled() => return Ended::Cancelled,
        result = tokio_tungstenite::connect_async(url.as_str()) => result,
    };
    let stream = match connect {
        Ok((stream, _response)) => stream,
        Err(e) => {
            tracing::warn!(error = %e, "push channel connect failed");
            return Ended::Unreachable;
        }
    };

    let (mut write, mut read) = stream.split();
    let mut heartbeat = Heartbeat::new();
    loop {
        let frame = tokio::select! {
            () = cancel.cancelled() => {
                let _ = write.send(Message::text(protocol::DISCONNECT)).await;
                let _ = write.close().await;
                tracing::info!("push channel closed");
                return Ended::Cancelled;
            }
            () = tokio::time::sleep_until(heartbeat.deadline) => {
                tracing::warn!(window = ?heartbeat.window, "push channel heartbeat missed");
                let _ = write.close().await;
                return dropped(state);
            }
            frame = read.next() => frame,
        };

        let step = match frame {
            Some(Ok(Message::Text(text))) => {
                handle_frame(ctx, token, state, &mut heartbeat, text.as_str())
            }
            Some(Ok(Message::Close(_))) | None => {
                tracing::info!("push channel closed by server");
                Step::Lost
            }
            Some(Ok(_)) => Step::Continue,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "push channel transport error");
                Step::Lost
            }
        };

        match step {
            Step::Continue => {}
            Step::Reply(reply) => {
                if let Err(e) = write.send(Message::text(reply)).await {
                    tracing::warn!(error = %e, "push channel write failed");
                    return dropped(state);
                }
            }
            Step::Lost => return dropped(state),
            Step::Reject => {
                let _ = write.close().await;
                return Ended::Rejected;
            }
        }
    }
}

fn dropped(state: &watch::Sender<ChannelState>) -> Ended {
    Ended::Dropped {
        authenticated: *state.borrow() == ChannelState::Authenticated,
    }
}

fn handle_frame(
    ctx: &ChannelContext,
    token: &str,
    state: &watch::Sender<ChannelState>,
    heartbeat: &mut Heartbeat,
    frame: &str,
) -> Step {
    let packet = match protocol::decode(frame) {
        Ok(packet) => packet,
        Err(e) => {
            tracing::debug!(error = %e, frame, "ignoring undecodable frame");
            return Step::Continue;
        }
    };

    match packet {
        EnginePacket::Open(handshake) => {
            tracing::debug!(sid = %handshake.sid, "engine.io open");
            heartbeat.window = handshake.heartbeat_window();
            heartbeat.reset();
            Step::Reply(protocol::CONNECT.to_string())
        }
        EnginePacket::Ping => {
            heartbeat.reset();
            Step::Reply(protocol::PONG.to_string())
        }
        EnginePacket::Close => Step::Lost,
        EnginePacket::Pong | EnginePacket::Upgrade | EnginePacket::Noop => Step::Continue,
        EnginePacket::Message(SocketPacket::Connect(_)) => {
            state.send_replace(ChannelState::Connected);
            Step::Reply(protocol::encode_event(
                "authenticate_user",
                &json!({ "token": token }),
            ))
        }
        EnginePacket::Message(SocketPacket::ConnectError(data)) => {
            tracing::warn!(%data, "socket.io connect rejected");
            ctx.toasts.error(CONNECT_FAILED_MESSAGE);
            Step::Reject
        }
        EnginePacket::Message(SocketPacket::Disconnect) => {
            tracing::info!("push channel disconnected by server");
            Step::Reject
        }
        EnginePacket::Message(SocketPacket::Ack) => Step::Continue,
        EnginePacket::Message(SocketPacket::Event { name, data }) => {
            handle_event(ctx, state, &name, &data);
            Step::Continue
        }
    }
}

fn handle_event(ctx: &ChannelContext, state: &watch::Sender<ChannelState>, name: &str, data: &Value) {
    match name {
        "auth_success" => {
            tracing::info!("push channel authenticated");
            state.send_replace(ChannelState::Authenticated);
        }
        "auth_failure" => {
            let reason = data
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("authentication failed");
            tracing::warn!(reason, "push channel authentication failed");
            ctx.toasts
                .error(format!("Notification server rejected the session: {reason}"));
        }
        _ => match super::PushNotice::from_event(name, data) {
            Some(notice) => deliver(ctx, notice),
            None => tracing::debug!(event = name, "ignoring push event"),
        },
    }
}

fn deliver(ctx: &ChannelContext, notice: PushNotice) {
    ctx.refetcher.refetch(RefetchTarget::Notifications);
    if !ctx.session.borrow().notifications_enabled() {
        tracing::info!(title = %notice.title, "notifications disabled; banner dropped");
        return;
    }
    tracing::debug!(title = %notice.title, "push notice");
    let _ = ctx.notices.send(notice);
}
