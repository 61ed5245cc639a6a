//! Real-time notification channel.
//!
//! A Socket.IO connection that lives exactly as long as an authenticated
//! session. [`ChannelSupervisor`] watches session snapshots and owns the
//! current [`ChannelHandle`]; a new token always means a new connection.

mod channel;
pub mod protocol;
mod supervisor;

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{mpsc, watch};

pub use channel::{Backoff, ChannelHandle};
pub use supervisor::ChannelSupervisor;

use crate::actions::Refetcher;
use crate::models::EventId;
use crate::session::SessionSnapshot;
use crate::toast::ToastSink;

pub const CONNECT_FAILED_MESSAGE: &str = "Could not connect to the notification server.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Authenticated,
}

impl ChannelState {
    pub fn label(self) -> &'static str {
        match self {
            ChannelState::Disconnected => "offline",
            ChannelState::Connecting => "connecting",
            ChannelState::Connected => "connected",
            ChannelState::Authenticated => "live",
        }
    }
}

/// A pushed notification, normalised for the banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushNotice {
    pub title: String,
    pub message: String,
    pub event_id: Option<EventId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewEventPayload {
    #[serde(default)]
    event_id: Option<EventId>,
    #[serde(default)]
    event_title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpcomingEventPayload {
    #[serde(default)]
    title: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    event_id: Option<EventId>,
}

impl PushNotice {
    /// Normalises one of the server's push events. Returns `None` for events
    /// that are not user notifications.
    pub fn from_event(name: &str, data: &Value) -> Option<Self> {
        match name {
            "new_event_added" => {
                let payload: NewEventPayload = serde_json::from_value(data.clone()).ok()?;
                Some(Self {
                    title: "New event!".to_string(),
                    message: format!("Added: \"{}\".", payload.event_title),
                    event_id: payload.event_id,
                })
            }
            "upcoming_event" | "upcoming_event_for_user" => {
                let payload: UpcomingEventPayload = serde_json::from_value(data.clone()).ok()?;
                Some(Self {
                    title: payload.title,
                    message: payload.message,
                    event_id: payload.event_id,
                })
            }
            _ => None,
        }
    }
}

/// Everything a channel needs besides its token.
#[derive(Clone)]
pub struct ChannelContext {
    /// Socket.IO server base URL (`http(s)://host:port`).
    pub socket_url: String,
    pub session: watch::Receiver<SessionSnapshot>,
    pub toasts: ToastSink,
    pub refetcher: Arc<dyn Refetcher>,
    pub notices: mpsc::UnboundedSender<PushNotice>,
}
