//! TUI runtime: owns the terminal, runs the event loop, executes effects.
//!
//! This is the only place side effects happen. The reducer stays pure and
//! returns `UiEffect`s; handlers run them on tokio and report back as
//! `UiEvent`s through the inbox, which the loop drains every frame.
//!
//! Structure:
//! - `mod.rs`: `TuiRuntime`, event loop, effect dispatch
//! - `inbox.rs`: inbox channel and forwarders for the core's channels
//! - `handlers.rs`: async effect handlers

mod handlers;
mod inbox;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use inbox::{UiEventReceiver, UiEventSender};
use pulse_core::actions::{EventActions, RefetchTarget, Refetcher};
use pulse_core::config::{CalendarConfig, Config};
use pulse_core::push::{ChannelContext, ChannelSupervisor};
use pulse_core::{SessionStore, ToastSink};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::AppState;
use crate::terminal::{self, PulseTerminal};
use crate::{render, update};

/// Frame cadence while the user is interacting or something is in flight.
pub const FRAME_DURATION: Duration = Duration::from_millis(16);

/// Poll duration when idle.
pub const IDLE_POLL_DURATION: Duration = Duration::from_millis(100);

/// Core services the handlers work through. Cheap to clone.
#[derive(Clone)]
struct Services {
    session: SessionStore,
    actions: EventActions,
    toasts: ToastSink,
    calendar: CalendarConfig,
    export_dir: PathBuf,
}

/// Full-screen TUI runtime.
///
/// The terminal is restored on drop and on panic.
pub struct TuiRuntime {
    terminal: PulseTerminal,
    pub state: AppState,
    services: Services,
    inbox_tx: UiEventSender,
    inbox_rx: UiEventReceiver,
    /// Stops the push supervisor and with it the channel.
    cancel: CancellationToken,
    last_tick: Instant,
    last_terminal_event: Instant,
}

impl TuiRuntime {
    /// Wires the core services to the inbox and enters the alternate screen.
    ///
    /// Must be called inside a multi-threaded tokio runtime.
    ///
    /// # Errors
    /// Returns an error if the configured URLs are invalid, the token store
    /// cannot be opened, or the terminal cannot be set up.
    pub fn new(config: &Config) -> Result<Self> {
        let (toasts, toast_rx) = ToastSink::channel();
        let session =
            SessionStore::from_config(config, toasts.clone()).context("Failed to open session")?;
        let socket_url = config.effective_socket_url()?;
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        let refetch_tx = inbox_tx.clone();
        let refetcher: Arc<dyn Refetcher> = Arc::new(move |target: RefetchTarget| {
            let _ = refetch_tx.send(UiEvent::Refetch(target));
        });
        let actions = EventActions::new(session.gateway(), toasts.clone(), Arc::clone(&refetcher));

        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let (_supervisor, channel_rx) = ChannelSupervisor::spawn(
            ChannelContext {
                socket_url,
                session: session.subscribe(),
                toasts: toasts.clone(),
                refetcher,
                notices: notice_tx,
            },
            cancel.clone(),
        );

        inbox::forward_queue(toast_rx, inbox_tx.clone(), UiEvent::Toast);
        inbox::forward_queue(notice_rx, inbox_tx.clone(), UiEvent::Push);
        inbox::forward_watch(session.subscribe(), inbox_tx.clone(), UiEvent::Session);
        inbox::forward_watch(channel_rx, inbox_tx.clone(), UiEvent::Channel);

        let verifying = session.clone();
        tokio::spawn(async move { verifying.verify().await });

        let export_dir = std::env::current_dir().context("Failed to resolve export directory")?;

        terminal::install_panic_hook();
        let terminal = terminal::setup_terminal()?;

        let now = Instant::now();
        Ok(Self {
            terminal,
            state: AppState::new(config),
            services: Services {
                session,
                actions,
                toasts,
                calendar: config.calendar.clone(),
                export_dir,
            },
            inbox_tx,
            inbox_rx,
            cancel,
            last_tick: now,
            last_terminal_event: now,
        })
    }

    /// Runs the main event loop until the user quits.
    ///
    /// # Errors
    /// Returns an error if drawing or reading terminal input fails.
    pub fn run(&mut self) -> Result<()> {
        self.dispatch_event(UiEvent::Refetch(RefetchTarget::Events));
        let result = self.event_loop();
        self.cancel.cancel();
        result
    }

    fn event_loop(&mut self) -> Result<()> {
        let mut dirty = true;

        while !self.state.tui.should_quit {
            for event in self.collect_events()? {
                if matches!(&event, UiEvent::Terminal(_)) {
                    self.last_terminal_event = Instant::now();
                }
                // Renders are batched to the tick cadence.
                if matches!(&event, UiEvent::Tick) {
                    dirty = true;
                }
                let effects = update::update(&mut self.state, event);
                self.execute_effects(effects);
            }

            if dirty {
                self.terminal.draw(|frame| render::render(&self.state, frame))?;
                dirty = false;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Event Collection
    // ========================================================================

    fn collect_events(&mut self) -> Result<Vec<UiEvent>> {
        let mut events = Vec::new();

        let tui = &self.state.tui;
        let needs_fast_poll = tui.is_busy()
            || tui.feed.resource.is_loading
            || !tui.toasts.is_empty()
            || self.last_terminal_event.elapsed() < IDLE_POLL_DURATION;
        let tick_interval = if needs_fast_poll {
            FRAME_DURATION
        } else {
            IDLE_POLL_DURATION
        };

        while let Ok(ev) = self.inbox_rx.try_recv() {
            events.push(ev);
        }

        // Block until the next tick only when there is nothing to process.
        let poll_duration = if events.is_empty() {
            tick_interval.saturating_sub(self.last_tick.elapsed())
        } else {
            Duration::ZERO
        };
        if event::poll(poll_duration)? {
            events.push(UiEvent::Terminal(event::read()?));
            while event::poll(Duration::ZERO)? {
                events.push(UiEvent::Terminal(event::read()?));
            }
        }

        if self.last_tick.elapsed() >= tick_interval {
            events.push(UiEvent::Tick);
            self.last_tick = Instant::now();
        }
        Ok(events)
    }

    // ========================================================================
    // Effect Dispatch
    // ========================================================================

    fn execute_effects(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    fn dispatch_event(&mut self, event: UiEvent) {
        let effects = update::update(&mut self.state, event);
        self.execute_effects(effects);
    }

    /// Spawns a handler and sends the event it returns to the inbox.
    fn spawn_effect<F, Fut>(&self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = UiEvent> + Send + 'static,
    {
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(f().await);
        });
    }

    fn execute_effect(&mut self, effect: UiEffect) {
        let services = self.services.clone();
        match effect {
            UiEffect::Quit => {
                self.state.tui.should_quit = true;
            }
            UiEffect::OpenUrl { url } => {
                if let Err(e) = open::that(&url) {
                    tracing::warn!(%url, error = %e, "failed to open link");
                    services.toasts.error(format!("Could not open {url}"));
                }
            }

            // Session
            UiEffect::Login(credentials) => {
                self.spawn_effect(move || handlers::login(services.session, credentials));
            }
            UiEffect::Register(registration) => {
                self.spawn_effect(move || handlers::register(services.session, registration));
            }
            UiEffect::Logout => services.session.logout(),
            UiEffect::UpdateSettings(settings) => {
                self.spawn_effect(move || handlers::update_settings(services.session, settings));
            }
            UiEffect::UpdateProfile { profile, avatar } => {
                self.spawn_effect(move || {
                    handlers::update_profile(services.session, profile, avatar)
                });
            }
            UiEffect::ChangePassword(change) => {
                self.spawn_effect(move || handlers::change_password(services.session, change));
            }

            // Resources
            UiEffect::FetchEvents { ticket, query } => {
                let gateway = services.session.gateway();
                self.spawn_effect(move || handlers::fetch_events(gateway, ticket, query));
            }
            UiEffect::FetchParticipations { ticket, status } => {
                let gateway = services.session.gateway();
                self.spawn_effect(move || handlers::fetch_participations(gateway, ticket, status));
            }
            UiEffect::FetchParticipationCounts { ticket } => {
                let gateway = services.session.gateway();
                self.spawn_effect(move || handlers::fetch_counts(gateway, ticket));
            }
            UiEffect::FetchNotifications { ticket } => {
                let gateway = services.session.gateway();
                self.spawn_effect(move || handlers::fetch_notifications(gateway, ticket));
            }
            UiEffect::ScheduleSearch { generation, delay } => {
                self.spawn_effect(move || async move {
                    tokio::time::sleep(delay).await;
                    UiEvent::SearchSettled { generation }
                });
            }

            // Event actions
            UiEffect::SaveEvent { id, payload, image } => {
                self.spawn_effect(move || {
                    handlers::save_event(services.actions, id, *payload, image)
                });
            }
            UiEffect::RunEventCommand { command, id } => {
                self.spawn_effect(move || {
                    handlers::run_event_command(services.actions, command, id)
                });
            }
            UiEffect::ToggleParticipation { event } => {
                self.spawn_effect(move || handlers::toggle_participation(services.actions, *event));
            }
            UiEffect::MarkNotificationRead { id } => {
                tokio::spawn(handlers::mark_notification_read(services.actions, id));
            }
            UiEffect::MarkAllNotificationsRead => {
                self.spawn_effect(move || handlers::mark_all_notifications_read(services.actions));
            }

            UiEffect::ExportCalendar { month, events } => {
                self.spawn_effect(move || {
                    handlers::export_calendar(
                        services.calendar,
                        services.export_dir,
                        month,
                        events,
                        services.toasts,
                    )
                });
            }
        }
    }
}

impl Drop for TuiRuntime {
    fn drop(&mut self) {
        self.cancel.cancel();
        let _ = terminal::restore_terminal();
    }
}
