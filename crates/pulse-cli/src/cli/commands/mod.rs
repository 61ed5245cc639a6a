//! CLI command handlers.

pub mod auth;
pub mod calendar;
pub mod config;
pub mod events;
pub mod interactive;
pub mod notifications;
pub mod participations;

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use pulse_core::actions::{EventActions, RefetchTarget, Refetcher};
use pulse_core::config::Config;
use pulse_core::models::{EventFilters, User};
use pulse_core::toast::{self, ToastReceiver};
use pulse_core::{SessionStore, ToastLevel, ToastSink};

/// Filters and search text of an events query.
#[derive(Debug, Clone, Default)]
pub struct EventsSelection {
    pub filters: EventFilters,
    pub search: String,
}

/// Core services for one command invocation.
///
/// Toasts raised by the core are collected and printed to stderr once the
/// command has finished, so stdout carries only the command's output.
pub struct Client {
    pub session: SessionStore,
    pub actions: EventActions,
    toasts: Mutex<ToastReceiver>,
}

impl Client {
    pub fn open(config: &Config) -> Result<Self> {
        let (sink, rx) = ToastSink::channel();
        let session = SessionStore::from_config(config, sink.clone()).context("open session")?;
        // One-shot commands have no lists to keep fresh.
        let refetcher: Arc<dyn Refetcher> = Arc::new(|target: RefetchTarget| {
            tracing::trace!(?target, "refetch ignored");
        });
        let actions = EventActions::new(session.gateway(), sink, refetcher);
        Ok(Self {
            session,
            actions,
            toasts: Mutex::new(rx),
        })
    }

    /// Resolves the stored token, failing when nobody is signed in.
    pub async fn require_user(&self) -> Result<User> {
        self.session.verify().await;
        self.session
            .current_user()
            .context("Not signed in. Run `pulse login --email <EMAIL>` first.")
    }

    /// Prints pending non-error toasts. Errors surface through the returned
    /// `anyhow` chain instead.
    pub fn flush_toasts(&self) {
        let Ok(mut rx) = self.toasts.lock() else {
            return;
        };
        for toast in toast::drain(&mut rx) {
            if toast.level != ToastLevel::Error {
                eprintln!("{}: {}", toast.level.label(), toast.message);
            }
        }
    }
}
