//! Modal overlays.
//!
//! Each overlay owns its state, key handler, and render function. Key
//! handlers get `&TuiState` and return an [`OverlayUpdate`]: whether to stay,
//! close, or open another overlay, plus state mutations and effects for the
//! reducer to apply.

pub mod auth;
pub mod confirm;
pub mod detail;
pub mod event_form;
pub mod filter;
pub mod notifications;
pub mod password;
pub mod profile;
pub mod render_utils;

pub use auth::{AuthMode, AuthState};
pub use confirm::ConfirmState;
use crossterm::event::KeyEvent;
pub use detail::DetailState;
pub use event_form::EventFormState;
pub use filter::FilterState;
pub use notifications::NotificationsState;
pub use password::PasswordState;
pub use profile::ProfileState;
use pulse_core::models::Event;
use ratatui::Frame;
use ratatui::layout::Rect;

use crate::effects::UiEffect;
use crate::mutations::StateMutation;
use crate::state::{EventCommand, TuiState};

// ============================================================================
// OverlayRequest / OverlayTransition / OverlayUpdate
// ============================================================================

#[derive(Debug)]
pub enum OverlayRequest {
    Auth(AuthMode),
    Filter,
    NewEvent,
    EditEvent(Box<Event>),
    Detail(Box<Event>),
    Confirm {
        command: EventCommand,
        event: Box<Event>,
    },
    Password,
    Profile,
    Notifications,
}

#[derive(Debug)]
pub enum OverlayTransition {
    Stay,
    Close,
    Open(OverlayRequest),
}

#[derive(Debug)]
pub struct OverlayUpdate {
    pub transition: OverlayTransition,
    pub mutations: Vec<StateMutation>,
    pub effects: Vec<UiEffect>,
}

impl OverlayUpdate {
    fn new(transition: OverlayTransition) -> Self {
        Self {
            transition,
            mutations: Vec::new(),
            effects: Vec::new(),
        }
    }

    pub fn stay() -> Self {
        Self::new(OverlayTransition::Stay)
    }

    pub fn close() -> Self {
        Self::new(OverlayTransition::Close)
    }

    pub fn open(request: OverlayRequest) -> Self {
        Self::new(OverlayTransition::Open(request))
    }

    #[must_use]
    pub fn with_mutations(mut self, mutations: Vec<StateMutation>) -> Self {
        self.mutations = mutations;
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: Vec<UiEffect>) -> Self {
        self.effects = effects;
        self
    }

    /// Starts `action`: marks it pending and runs `effect`.
    #[must_use]
    pub fn submit(self, action: crate::state::PendingAction, effect: UiEffect) -> Self {
        self.with_mutations(vec![StateMutation::BeginAction(action)])
            .with_effects(vec![effect])
    }
}

// ============================================================================
// Overlay
// ============================================================================

#[derive(Debug)]
pub enum Overlay {
    Auth(AuthState),
    Filter(FilterState),
    EventForm(EventFormState),
    Detail(DetailState),
    Confirm(ConfirmState),
    Password(PasswordState),
    Profile(ProfileState),
    Notifications(NotificationsState),
}

impl Overlay {
    pub fn open(request: OverlayRequest, tui: &TuiState) -> Self {
        match request {
            OverlayRequest::Auth(mode) => Overlay::Auth(AuthState::new(mode)),
            OverlayRequest::Filter => Overlay::Filter(FilterState::new(&tui.feed.query().filters)),
            OverlayRequest::NewEvent => Overlay::EventForm(EventFormState::create(tui.offset)),
            OverlayRequest::EditEvent(event) => {
                Overlay::EventForm(EventFormState::edit(&event, tui.offset))
            }
            OverlayRequest::Detail(event) => Overlay::Detail(DetailState::new(*event)),
            OverlayRequest::Confirm { command, event } => {
                Overlay::Confirm(ConfirmState::new(command, *event))
            }
            OverlayRequest::Password => Overlay::Password(PasswordState::default()),
            OverlayRequest::Profile => Overlay::Profile(ProfileState::new(&tui.session)),
            OverlayRequest::Notifications => Overlay::Notifications(NotificationsState::default()),
        }
    }

    /// Overlays that only make sense for a signed-in user.
    pub fn requires_auth(&self) -> bool {
        !matches!(
            self,
            Overlay::Auth(_) | Overlay::Filter(_) | Overlay::Detail(_)
        )
    }

    pub fn handle_key(&mut self, tui: &TuiState, key: KeyEvent) -> OverlayUpdate {
        match self {
            Overlay::Auth(state) => state.handle_key(tui, key),
            Overlay::Filter(state) => state.handle_key(key),
            Overlay::EventForm(state) => state.handle_key(tui, key),
            Overlay::Detail(state) => state.handle_key(tui, key),
            Overlay::Confirm(state) => state.handle_key(tui, key),
            Overlay::Password(state) => state.handle_key(tui, key),
            Overlay::Profile(state) => state.handle_key(tui, key),
            Overlay::Notifications(state) => state.handle_key(tui, key),
        }
    }

    /// Pasted text goes to the focused field, if the overlay has one.
    pub fn handle_paste(&mut self, text: &str) {
        match self {
            Overlay::Auth(state) => state.focused_field().paste(text),
            Overlay::Filter(state) => state.paste(text),
            Overlay::EventForm(state) => state.paste(text),
            Overlay::Password(state) => state.focused_field().paste(text),
            Overlay::Profile(state) => state.focused_field().paste(text),
            Overlay::Detail(_) | Overlay::Confirm(_) | Overlay::Notifications(_) => {}
        }
    }

    pub fn render(&self, tui: &TuiState, frame: &mut Frame, area: Rect) {
        match self {
            Overlay::Auth(state) => state.render(tui, frame, area),
            Overlay::Filter(state) => state.render(frame, area),
            Overlay::EventForm(state) => state.render(tui, frame, area),
            Overlay::Detail(state) => state.render(tui, frame, area),
            Overlay::Confirm(state) => state.render(tui, frame, area),
            Overlay::Password(state) => state.render(tui, frame, area),
            Overlay::Profile(state) => state.render(tui, frame, area),
            Overlay::Notifications(state) => state.render(tui, frame, area),
        }
    }
}

/// Moves a focus index by one, wrapping around `len` fields.
pub(crate) fn cycle(focus: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        return 0;
    }
    if forward {
        (focus + 1) % len
    } else {
        (focus + len - 1) % len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_wraps_both_ways() {
        assert_eq!(cycle(2, 3, true), 0);
        assert_eq!(cycle(0, 3, false), 2);
        assert_eq!(cycle(0, 0, true), 0);
    }
}
