//! Application state.
//!
//! ```text
//! AppState
//! ├── tui: TuiState
//! │   ├── session / channel      (mirrors of the core watch channels)
//! │   ├── screen                 (events, calendar, archive, profile)
//! │   ├── feed                   (events list for the current screen)
//! │   ├── participations, counts, notifications
//! │   ├── toasts, banner
//! │   └── pending_action         (submit buttons disabled while set)
//! └── overlay: Option<Overlay>
//! ```
//!
//! The overlay lives beside `TuiState` so overlay key handlers can hold
//! `&mut Overlay` and `&TuiState` at the same time.

use std::time::{Duration, Instant};

use chrono::{FixedOffset, NaiveDate, Utc};
use pulse_core::SessionSnapshot;
use pulse_core::calendar::{self, Month, MonthView};
use pulse_core::config::{CalendarConfig, Config};
use pulse_core::models::{
    Event, EventId, EventStatus, Notification, Participation, ParticipationCounts,
    ParticipationStatus,
};
use pulse_core::push::{ChannelState, PushNotice};
use pulse_core::resources::{Debouncer, EventsFeed, Resource};
use pulse_core::toast::Toast;

use crate::common::TextField;
use crate::overlays::Overlay;

/// Lifetime of a toast on screen.
pub const TOAST_TTL: Duration = Duration::from_secs(5);

/// Toasts shown at once; older ones are dropped first.
pub const MAX_TOASTS: usize = 4;

// ============================================================================
// AppState
// ============================================================================

pub struct AppState {
    pub tui: TuiState,
    pub overlay: Option<Overlay>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            tui: TuiState::new(config),
            overlay: None,
        }
    }
}

// ============================================================================
// Screens
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Events,
    Calendar,
    Archive,
    Profile,
}

impl Screen {
    pub const ALL: [Screen; 4] = [
        Screen::Events,
        Screen::Calendar,
        Screen::Archive,
        Screen::Profile,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Screen::Events => "Events",
            Screen::Calendar => "Calendar",
            Screen::Archive => "Archive",
            Screen::Profile => "Profile",
        }
    }

    /// Status of the events the screen lists, if it lists any.
    pub fn event_status(self) -> Option<EventStatus> {
        match self {
            Screen::Events | Screen::Calendar => Some(EventStatus::Active),
            Screen::Archive => Some(EventStatus::Archive),
            Screen::Profile => None,
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

// ============================================================================
// Actions in flight
// ============================================================================

/// Admin command on a single event, confirmed before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCommand {
    Archive,
    Restore,
    HardDelete,
    DeleteImage,
}

impl EventCommand {
    pub fn verb(self) -> &'static str {
        match self {
            EventCommand::Archive => "Archive",
            EventCommand::Restore => "Restore",
            EventCommand::HardDelete => "Delete permanently",
            EventCommand::DeleteImage => "Remove image",
        }
    }

    pub fn question(self) -> &'static str {
        match self {
            EventCommand::Archive => "Move this event to the archive?",
            EventCommand::Restore => "Restore this event from the archive?",
            EventCommand::HardDelete => "Delete this event forever? This cannot be undone.",
            EventCommand::DeleteImage => "Remove the image of this event?",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    Login,
    Register,
    SaveEvent,
    EventCommand(EventCommand),
    Participation(EventId),
    Notifications,
    Settings,
    Profile,
    Password,
    Export,
}

// ============================================================================
// Toasts and banner
// ============================================================================

#[derive(Debug, Clone)]
pub struct ToastEntry {
    pub toast: Toast,
    pub shown_at: Instant,
}

#[derive(Debug, Clone)]
pub struct Banner {
    pub notice: PushNotice,
    pub shown_at: Instant,
}

// ============================================================================
// Calendar cursor
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarCursor {
    pub month: Month,
    pub day: NaiveDate,
    /// Index into the events of `day`.
    pub event: usize,
}

impl CalendarCursor {
    pub fn today(offset: FixedOffset) -> Self {
        let day = calendar::local_date(Utc::now(), offset);
        Self {
            month: Month::containing(day),
            day,
            event: 0,
        }
    }

    /// Moves the day, following it into the next or previous month.
    pub fn move_days(&mut self, days: i64) {
        if let Some(day) = self.day.checked_add_signed(chrono::Duration::days(days)) {
            self.day = day;
            self.month = Month::containing(day);
            self.event = 0;
        }
    }

    pub fn next_month(&mut self) {
        self.jump_to(self.month.next());
    }

    pub fn prev_month(&mut self) {
        self.jump_to(self.month.prev());
    }

    fn jump_to(&mut self, month: Month) {
        self.month = month;
        self.day = month.first_day();
        self.event = 0;
    }
}

// ============================================================================
// TuiState
// ============================================================================

pub struct TuiState {
    pub should_quit: bool,

    pub calendar_config: CalendarConfig,
    pub offset: FixedOffset,
    pub banner_timeout: Duration,

    pub session: SessionSnapshot,
    pub channel: ChannelState,

    pub screen: Screen,
    pub feed: EventsFeed,
    /// Selected row in the events list.
    pub selected: usize,
    pub search: TextField,
    pub search_focused: bool,
    pub search_debounce: Debouncer<String>,
    pub cursor: CalendarCursor,

    pub participation_status: ParticipationStatus,
    pub participations: Resource<Vec<Participation>>,
    pub counts: Resource<ParticipationCounts>,
    pub notifications: Resource<Vec<Notification>>,

    pub toasts: Vec<ToastEntry>,
    pub banner: Option<Banner>,
    pub pending_action: Option<PendingAction>,
    /// Event to open once the list containing it has loaded.
    pub pending_open: Option<EventId>,
}

impl TuiState {
    pub fn new(config: &Config) -> Self {
        let offset = config.calendar.offset();
        Self {
            should_quit: false,
            calendar_config: config.calendar.clone(),
            offset,
            banner_timeout: config.banner_timeout(),
            session: SessionSnapshot {
                is_loading: true,
                ..SessionSnapshot::default()
            },
            channel: ChannelState::Disconnected,
            screen: Screen::Events,
            feed: EventsFeed::new(EventStatus::Active),
            selected: 0,
            search: TextField::default(),
            search_focused: false,
            search_debounce: Debouncer::new(config.search_debounce()),
            cursor: CalendarCursor::today(offset),
            participation_status: ParticipationStatus::default(),
            participations: Resource::new("Failed to load your participations"),
            counts: Resource::new("Failed to load participation counts"),
            notifications: Resource::new("Failed to load notifications"),
            toasts: Vec::new(),
            banner: None,
            pending_action: None,
            pending_open: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated
    }

    pub fn is_admin(&self) -> bool {
        self.session.is_admin()
    }

    pub fn is_busy(&self) -> bool {
        self.pending_action.is_some()
    }

    pub fn events(&self) -> &[Event] {
        self.feed.events()
    }

    pub fn selected_event(&self) -> Option<&Event> {
        self.events().get(self.selected)
    }

    pub fn month_view(&self) -> MonthView {
        MonthView::new(self.cursor.month, self.offset)
    }

    /// Events on the calendar's selected day, in start order.
    pub fn day_events(&self) -> Vec<&Event> {
        let mut events = self.month_view().events_on(self.events(), self.cursor.day);
        events.sort_by_key(|e| e.start_datetime);
        events
    }

    pub fn calendar_event(&self) -> Option<&Event> {
        self.day_events().get(self.cursor.event).copied()
    }

    pub fn unread_notifications(&self) -> usize {
        pulse_core::models::unread_count(&self.notifications.data)
    }

    pub fn push_toast(&mut self, toast: Toast) {
        self.toasts.push(ToastEntry {
            toast,
            shown_at: Instant::now(),
        });
        if self.toasts.len() > MAX_TOASTS {
            let excess = self.toasts.len() - MAX_TOASTS;
            self.toasts.drain(..excess);
        }
    }

    /// Drops toasts and the banner whose time is up.
    pub fn expire(&mut self, now: Instant) {
        self.toasts
            .retain(|entry| now.saturating_duration_since(entry.shown_at) < TOAST_TTL);
        if self
            .banner
            .as_ref()
            .is_some_and(|b| now.saturating_duration_since(b.shown_at) >= self.banner_timeout)
        {
            self.banner = None;
        }
    }

    pub fn clamp_selection(&mut self) {
        let len = self.events().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
        let day_len = self.day_events().len();
        if self.cursor.event >= day_len {
            self.cursor.event = day_len.saturating_sub(1);
        }
    }
}
