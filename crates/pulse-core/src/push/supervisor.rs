use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{ChannelContext, ChannelHandle, ChannelState};
use crate::session::SessionSnapshot;

/// Keeps one push channel per authenticated session.
pub struct ChannelSupervisor {
    ctx: ChannelContext,
    current: Option<(String, ChannelHandle)>,
    state: watch::Sender<ChannelState>,
}

impl ChannelSupervisor {
    pub fn new(ctx: ChannelContext) -> Self {
        Self {
            ctx,
            current: None,
            state: watch::Sender::new(ChannelState::Disconnected),
        }
    }

    /// Runs until `cancel` fires or the session store goes away.
    ///
    /// The returned receiver follows whichever channel is current.
    pub fn spawn(
        ctx: ChannelContext,
        cancel: CancellationToken,
    ) -> (JoinHandle<()>, watch::Receiver<ChannelState>) {
        let mut supervisor = Self::new(ctx);
        let state = supervisor.subscribe_state();
        let task = tokio::spawn(async move {
            supervisor.run(cancel).await;
        });
        (task, state)
    }

    async fn run(&mut self, cancel: CancellationToken) {
        let mut session = self.ctx.session.clone();
        loop {
            let snapshot = session.borrow_and_update().clone();
            self.apply(&snapshot);

            tokio::select! {
                () = cancel.cancelled() => break,
                changed = session.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        if let Some((_, handle)) = self.current.take() {
            handle.shutdown().await;
        }
        self.state.send_replace(ChannelState::Disconnected);
    }

    /// Opens, replaces or closes the channel to match `snapshot`.
    pub fn apply(&mut self, snapshot: &SessionSnapshot) {
        let wanted = snapshot
            .token
            .as_deref()
            .filter(|_| snapshot.is_authenticated);

        if wanted == self.current.as_ref().map(|(token, _)| token.as_str()) {
            return;
        }

        if self.current.take().is_some() {
            tracing::info!("session changed; closing push channel");
            self.state.send_replace(ChannelState::Disconnected);
        }
        if let Some(token) = wanted {
            let handle = ChannelHandle::spawn(self.ctx.clone(), token.to_string());
            self.forward_state(handle.subscribe_state());
            self.current = Some((token.to_string(), handle));
        }
    }

    /// Mirrors one channel's state until that channel finishes.
    fn forward_state(&self, mut channel: watch::Receiver<ChannelState>) {
        let state = self.state.clone();
        tokio::spawn(async move {
            loop {
                state.send_replace(*channel.borrow_and_update());
                if channel.changed().await.is_err() {
                    break;
                }
            }
        });
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.current.is_some()
    }

    pub fn handle(&self) -> Option<&ChannelHandle> {
        self.current.as_ref().map(|(_, handle)| handle)
    }
}
