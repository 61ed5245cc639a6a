//! Inputs to the reducer.
//!
//! Terminal input, ticks, and the results of every task the runtime spawned
//! arrive here as `UiEvent`s, in the order the runtime collected them.

use pulse_core::ClientResult;
use pulse_core::actions::RefetchTarget;
use pulse_core::models::{Event, Notification, Participation, ParticipationCounts};
use pulse_core::push::{ChannelState, PushNotice};
use pulse_core::resources::FetchTicket;
use pulse_core::{SessionSnapshot, Toast};

use crate::state::PendingAction;

/// How an action failed, from the overlay's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionFailure {
    /// Already shown to the user as a toast (or a forced sign-out).
    Reported,
    /// Shown inside the overlay that started the action.
    Inline(String),
}

pub type ActionResult = Result<(), ActionFailure>;

#[derive(Debug)]
pub enum UiEvent {
    Tick,
    Terminal(crossterm::event::Event),

    Session(SessionSnapshot),
    Channel(ChannelState),
    Toast(Toast),
    Push(PushNotice),
    Refetch(RefetchTarget),
    SearchSettled {
        generation: u64,
    },

    EventsLoaded {
        ticket: FetchTicket,
        result: ClientResult<Vec<Event>>,
    },
    ParticipationsLoaded {
        ticket: FetchTicket,
        result: ClientResult<Vec<Participation>>,
    },
    CountsLoaded {
        ticket: FetchTicket,
        result: ClientResult<ParticipationCounts>,
    },
    NotificationsLoaded {
        ticket: FetchTicket,
        result: ClientResult<Vec<Notification>>,
    },

    ActionFinished {
        action: PendingAction,
        result: ActionResult,
    },
}
