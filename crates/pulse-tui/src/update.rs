//! TUI reducer (update function).
//!
//! All state mutations happen here. The runtime calls `update(app, event)`
//! and executes the returned effects.

use std::time::Instant;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use pulse_core::actions::RefetchTarget;
use pulse_core::models::EventId;
use pulse_core::push::PushNotice;
use pulse_core::resources::EventsQuery;
use pulse_core::{SessionSnapshot, Toast, ToastLevel};

use crate::effects::UiEffect;
use crate::events::{ActionFailure, ActionResult, UiEvent};
use crate::features::{ScreenUpdate, calendar, events, profile};
use crate::mutations::StateMutation;
use crate::overlays::{AuthMode, DetailState, Overlay, OverlayRequest, OverlayTransition, OverlayUpdate};
use crate::state::{AppState, Banner, PendingAction, Screen, TuiState};

/// The main reducer function.
///
/// Takes the current state and an event, mutates state, and returns effects
/// for the runtime to execute.
pub fn update(app: &mut AppState, event: UiEvent) -> Vec<UiEffect> {
    match event {
        UiEvent::Tick => {
            app.tui.expire(Instant::now());
            vec![]
        }
        UiEvent::Terminal(term_event) => handle_terminal_event(app, term_event),
        UiEvent::Session(snapshot) => handle_session(app, snapshot),
        UiEvent::Channel(state) => {
            app.tui.channel = state;
            vec![]
        }
        UiEvent::Toast(toast) => {
            app.tui.push_toast(toast);
            vec![]
        }
        UiEvent::Push(notice) => {
            show_banner(&mut app.tui, notice);
            vec![]
        }
        UiEvent::Refetch(target) => refetch(&mut app.tui, target),
        UiEvent::SearchSettled { generation } => events::settle_search(&mut app.tui, generation),

        UiEvent::EventsLoaded { ticket, result } => {
            if app.tui.feed.complete(ticket, result) {
                report_load_error(&mut app.tui, |tui| tui.feed.resource.error.clone());
                app.tui.clamp_selection();
                if let Some(Overlay::Detail(detail)) = &mut app.overlay {
                    detail.refresh(&app.tui.feed);
                }
                resolve_pending_open(app);
            }
            vec![]
        }
        UiEvent::ParticipationsLoaded { ticket, result } => {
            if app.tui.participations.complete(ticket, result) {
                report_load_error(&mut app.tui, |tui| tui.participations.error.clone());
            }
            vec![]
        }
        UiEvent::CountsLoaded { ticket, result } => {
            if app.tui.counts.complete(ticket, result) {
                report_load_error(&mut app.tui, |tui| tui.counts.error.clone());
            }
            vec![]
        }
        UiEvent::NotificationsLoaded { ticket, result } => {
            if app.tui.notifications.complete(ticket, result) {
                report_load_error(&mut app.tui, |tui| tui.notifications.error.clone());
            }
            vec![]
        }

        UiEvent::ActionFinished { action, result } => {
            handle_action_finished(app, action, result);
            vec![]
        }
    }
}

fn report_load_error(tui: &mut TuiState, error: impl FnOnce(&TuiState) -> Option<String>) {
    if let Some(message) = error(tui) {
        tui.push_toast(Toast::new(ToastLevel::Error, message));
    }
}

// ============================================================================
// Session and push
// ============================================================================

fn handle_session(app: &mut AppState, snapshot: SessionSnapshot) -> Vec<UiEffect> {
    let was_authenticated = app.tui.session.is_authenticated;
    let token_changed = app.tui.session.token != snapshot.token;
    app.tui.session = snapshot;

    let mut effects = Vec::new();
    if app.tui.is_authenticated() && (!was_authenticated || token_changed) {
        for target in [
            RefetchTarget::Notifications,
            RefetchTarget::Participations,
            RefetchTarget::ParticipationCounts,
            RefetchTarget::Events,
        ] {
            effects.extend(refetch(&mut app.tui, target));
        }
    } else if !app.tui.is_authenticated() && was_authenticated {
        app.tui.participations.clear();
        app.tui.counts.clear();
        app.tui.notifications.clear();
        app.tui.banner = None;
        if app.overlay.as_ref().is_some_and(Overlay::requires_auth) {
            app.overlay = None;
        }
        effects.extend(refetch(&mut app.tui, RefetchTarget::Events));
    }
    effects
}

fn show_banner(tui: &mut TuiState, notice: PushNotice) {
    tracing::debug!(title = %notice.title, "showing push banner");
    tui.banner = Some(Banner {
        notice,
        shown_at: Instant::now(),
    });
}

/// Starts a fetch for `target`, or clears it when it needs a session.
fn refetch(tui: &mut TuiState, target: RefetchTarget) -> Vec<UiEffect> {
    let authenticated = tui.is_authenticated();
    match target {
        RefetchTarget::Events => {
            let ticket = tui.feed.refetch();
            events::fetch_events(tui, ticket)
        }
        RefetchTarget::Participations if authenticated => vec![profile::fetch_participations(tui)],
        RefetchTarget::ParticipationCounts if authenticated => {
            vec![UiEffect::FetchParticipationCounts {
                ticket: tui.counts.begin(),
            }]
        }
        RefetchTarget::Notifications if authenticated => vec![UiEffect::FetchNotifications {
            ticket: tui.notifications.begin(),
        }],
        RefetchTarget::Participations => {
            tui.participations.clear();
            vec![]
        }
        RefetchTarget::ParticipationCounts => {
            tui.counts.clear();
            vec![]
        }
        RefetchTarget::Notifications => {
            tui.notifications.clear();
            vec![]
        }
    }
}

// ============================================================================
// Navigation
// ============================================================================

fn switch_screen(tui: &mut TuiState, screen: Screen) -> Vec<UiEffect> {
    if tui.screen == screen {
        return vec![];
    }
    tui.screen = screen;
    tui.search_focused = false;

    let mut effects = Vec::new();
    // Moving between active and archived lists starts from a clean query.
    if let Some(status) = screen.event_status()
        && tui.feed.query().status != Some(status)
    {
        tui.search.clear();
        tui.search_debounce.cancel();
        tui.selected = 0;
        if let Some(ticket) = tui.feed.set_query(EventsQuery::with_status(status)) {
            effects.extend(events::fetch_events(tui, ticket));
        }
    }
    if screen == Screen::Profile {
        effects.extend(refetch(tui, RefetchTarget::Participations));
        effects.extend(refetch(tui, RefetchTarget::ParticipationCounts));
    }
    effects
}

/// Shows `id` in the events list and opens it, loading the list first when
/// the event is not in it.
fn open_event(app: &mut AppState, id: EventId) -> Vec<UiEffect> {
    if app.tui.screen == Screen::Events
        && let Some(index) = app.tui.events().iter().position(|e| e.id == id)
    {
        app.tui.selected = index;
        let event = app.tui.events()[index].clone();
        app.overlay = Some(Overlay::Detail(DetailState::new(event)));
        return vec![];
    }
    let mut effects = switch_screen(&mut app.tui, Screen::Events);
    app.tui.pending_open = Some(id);
    if !app.tui.feed.resource.is_loading {
        effects.extend(refetch(&mut app.tui, RefetchTarget::Events));
    }
    effects
}

fn resolve_pending_open(app: &mut AppState) {
    let Some(id) = app.tui.pending_open.take() else {
        return;
    };
    match app.tui.events().iter().position(|e| e.id == id) {
        Some(index) => {
            app.tui.selected = index;
            if app.overlay.is_none() {
                let event = app.tui.events()[index].clone();
                app.overlay = Some(Overlay::Detail(DetailState::new(event)));
            }
        }
        None => app.tui.push_toast(Toast::new(
            ToastLevel::Info,
            "That event is not in the current list.",
        )),
    }
}

// ============================================================================
// Actions
// ============================================================================

fn handle_action_finished(app: &mut AppState, action: PendingAction, result: ActionResult) {
    app.tui.pending_action = None;
    match result {
        Ok(()) => {
            let done = match (&mut app.overlay, action) {
                (Some(Overlay::Auth(auth)), PendingAction::Register) => {
                    auth.registered();
                    false
                }
                (Some(Overlay::Auth(_)), PendingAction::Login)
                | (Some(Overlay::EventForm(_)), PendingAction::SaveEvent)
                | (Some(Overlay::Confirm(_)), PendingAction::EventCommand(_))
                | (Some(Overlay::Password(_)), PendingAction::Password)
                | (Some(Overlay::Profile(_)), PendingAction::Profile) => true,
                _ => false,
            };
            if done {
                app.overlay = None;
            }
        }
        Err(ActionFailure::Reported) => {}
        Err(ActionFailure::Inline(message)) => match &mut app.overlay {
            Some(Overlay::Auth(state)) => state.error = Some(message),
            Some(Overlay::EventForm(state)) => state.error = Some(message),
            Some(Overlay::Confirm(state)) => state.error = Some(message),
            Some(Overlay::Password(state)) => state.error = Some(message),
            Some(Overlay::Profile(state)) => state.error = Some(message),
            _ => app.tui.push_toast(Toast::new(ToastLevel::Error, message)),
        },
    }
}

// ============================================================================
// StateMutation Dispatcher
// ============================================================================

fn apply_mutations(app: &mut AppState, mutations: Vec<StateMutation>) -> Vec<UiEffect> {
    let mut effects = Vec::new();
    for mutation in mutations {
        match mutation {
            StateMutation::BeginAction(action) => app.tui.pending_action = Some(action),
            StateMutation::ApplyFilters(filters) => {
                effects.extend(events::apply_filters(&mut app.tui, filters));
            }
            StateMutation::ResetFilters => effects.extend(events::reset_query(&mut app.tui)),
            StateMutation::OpenEvent(id) => effects.extend(open_event(app, id)),
        }
    }
    effects
}

fn open_overlay(app: &mut AppState, request: OverlayRequest) {
    let overlay = Overlay::open(request, &app.tui);
    app.overlay = Some(if overlay.requires_auth() && !app.tui.is_authenticated() {
        Overlay::open(OverlayRequest::Auth(AuthMode::Login), &app.tui)
    } else {
        overlay
    });
}

fn apply_overlay_update(app: &mut AppState, mut update: OverlayUpdate) -> Vec<UiEffect> {
    let mutations = std::mem::take(&mut update.mutations);
    match update.transition {
        OverlayTransition::Stay => {}
        OverlayTransition::Close => app.overlay = None,
        OverlayTransition::Open(request) => open_overlay(app, request),
    }
    // After the transition, so a mutation may open a new overlay.
    let mut effects = apply_mutations(app, mutations);
    effects.extend(update.effects);
    effects
}

fn apply_screen_update(app: &mut AppState, update: ScreenUpdate) -> Vec<UiEffect> {
    if let Some(request) = update.open
        && app.overlay.is_none()
    {
        open_overlay(app, request);
    }
    update.effects
}

// ============================================================================
// Terminal Event Handlers
// ============================================================================

fn handle_terminal_event(app: &mut AppState, event: Event) -> Vec<UiEffect> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key(app, key),
        Event::Paste(text) => {
            if let Some(overlay) = app.overlay.as_mut() {
                overlay.handle_paste(&text);
                return vec![];
            }
            let update = events::handle_paste(&mut app.tui, &text);
            apply_screen_update(app, update)
        }
        _ => vec![],
    }
}

fn handle_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return vec![UiEffect::Quit];
    }

    if let Some(overlay) = app.overlay.as_mut() {
        let update = overlay.handle_key(&app.tui, key);
        return apply_overlay_update(app, update);
    }

    if app.tui.search_focused {
        let update = screen_key(&mut app.tui, key);
        return apply_screen_update(app, update);
    }

    match key.code {
        KeyCode::Char('q') => vec![UiEffect::Quit],
        KeyCode::Tab => {
            let next = app.tui.screen.next();
            switch_screen(&mut app.tui, next)
        }
        KeyCode::Char(c @ '1'..='4') => {
            let screen = Screen::ALL[c as usize - '1' as usize];
            switch_screen(&mut app.tui, screen)
        }
        KeyCode::Char('L') if app.tui.is_authenticated() => vec![UiEffect::Logout],
        KeyCode::Char('L') => {
            open_overlay(app, OverlayRequest::Auth(AuthMode::Login));
            vec![]
        }
        KeyCode::Char('R') if !app.tui.is_authenticated() => {
            open_overlay(app, OverlayRequest::Auth(AuthMode::Register));
            vec![]
        }
        KeyCode::Char('n') if app.tui.is_authenticated() => {
            open_overlay(app, OverlayRequest::Notifications);
            refetch(&mut app.tui, RefetchTarget::Notifications)
        }
        KeyCode::Char('o') if app.tui.banner.is_some() => {
            let event_id = app.tui.banner.take().and_then(|b| b.notice.event_id);
            event_id.map(|id| open_event(app, id)).unwrap_or_default()
        }
        KeyCode::Char('r') => match app.tui.screen {
            Screen::Profile => [RefetchTarget::Participations, RefetchTarget::ParticipationCounts]
                .into_iter()
                .flat_map(|target| refetch(&mut app.tui, target))
                .collect(),
            _ => refetch(&mut app.tui, RefetchTarget::Events),
        },
        KeyCode::Esc => {
            app.tui.banner = None;
            app.tui.toasts.clear();
            vec![]
        }
        _ => {
            let update = screen_key(&mut app.tui, key);
            apply_screen_update(app, update)
        }
    }
}

fn screen_key(tui: &mut TuiState, key: KeyEvent) -> ScreenUpdate {
    match tui.screen {
        Screen::Events | Screen::Archive => events::handle_key(tui, key),
        Screen::Calendar => calendar::handle_key(tui, key),
        Screen::Profile => profile::handle_key(tui, key),
    }
}
