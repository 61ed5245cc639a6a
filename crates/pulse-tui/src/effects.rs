//! Side effects requested by the reducer.
//!
//! The reducer never talks to the network or the filesystem; it returns
//! `UiEffect`s and the runtime executes them, reporting back through the inbox.

use std::path::PathBuf;
use std::time::Duration;

use pulse_core::calendar::Month;
use pulse_core::models::{
    Credentials, Event, EventId, EventPayload, ParticipationStatus, PasswordChange,
    ProfileUpdate, Registration, SettingsUpdate,
};
use pulse_core::resources::{EventsQuery, FetchTicket};

use crate::state::EventCommand;

#[derive(Debug)]
pub enum UiEffect {
    Quit,

    Login(Credentials),
    Register(Registration),
    Logout,

    FetchEvents {
        ticket: FetchTicket,
        query: EventsQuery,
    },
    FetchParticipations {
        ticket: FetchTicket,
        status: ParticipationStatus,
    },
    FetchParticipationCounts {
        ticket: FetchTicket,
    },
    FetchNotifications {
        ticket: FetchTicket,
    },

    /// Report `SearchSettled { generation }` after `delay`.
    ScheduleSearch {
        generation: u64,
        delay: Duration,
    },

    SaveEvent {
        id: Option<EventId>,
        payload: Box<EventPayload>,
        image: Option<PathBuf>,
    },
    RunEventCommand {
        command: EventCommand,
        id: EventId,
    },
    ToggleParticipation {
        event: Box<Event>,
    },

    MarkNotificationRead {
        id: i64,
    },
    MarkAllNotificationsRead,

    UpdateSettings(SettingsUpdate),
    UpdateProfile {
        profile: ProfileUpdate,
        avatar: Option<PathBuf>,
    },
    ChangePassword(PasswordChange),

    ExportCalendar {
        month: Month,
        events: Vec<Event>,
    },
    OpenUrl {
        url: String,
    },
}
