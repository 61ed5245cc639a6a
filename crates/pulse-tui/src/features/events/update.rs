//! Events list reducer: selection, search box, filters.

use crossterm::event::{KeyCode, KeyEvent};
use pulse_core::models::{Event, EventFilters};
use pulse_core::resources::{EventsQuery, FetchTicket};

use crate::common::FieldKey;
use crate::effects::UiEffect;
use crate::features::ScreenUpdate;
use crate::overlays::{AuthMode, OverlayRequest};
use crate::state::{PendingAction, Screen, TuiState};

/// Loads the list for the current query. The API only serves signed-in
/// users, so signed out the list is emptied instead.
pub fn fetch_events(tui: &mut TuiState, ticket: FetchTicket) -> Vec<UiEffect> {
    if !tui.is_authenticated() {
        tui.feed.resource.clear();
        tui.pending_open = None;
        tui.selected = 0;
        return Vec::new();
    }
    vec![UiEffect::FetchEvents {
        ticket,
        query: tui.feed.query().clone(),
    }]
}

fn fetch_if_changed(tui: &mut TuiState, ticket: Option<FetchTicket>) -> Vec<UiEffect> {
    ticket.map(|t| fetch_events(tui, t)).unwrap_or_default()
}

pub fn apply_filters(tui: &mut TuiState, filters: EventFilters) -> Vec<UiEffect> {
    let ticket = tui.feed.set_filters(filters);
    tui.selected = 0;
    fetch_if_changed(tui, ticket)
}

/// Clears filters and the search box.
pub fn reset_query(tui: &mut TuiState) -> Vec<UiEffect> {
    tui.search.clear();
    tui.search_debounce.cancel();
    let query = EventsQuery {
        status: tui.feed.query().status,
        ..EventsQuery::default()
    };
    let ticket = tui.feed.set_query(query);
    tui.selected = 0;
    fetch_if_changed(tui, ticket)
}

/// Applies a settled search, unless a newer keystroke superseded it.
pub fn settle_search(tui: &mut TuiState, generation: u64) -> Vec<UiEffect> {
    let Some(search) = tui.search_debounce.settle(generation) else {
        return Vec::new();
    };
    let ticket = tui.feed.set_search(&search);
    tui.selected = 0;
    fetch_if_changed(tui, ticket)
}

/// Join or leave `event`, asking to sign in first when needed. Admins run
/// events rather than attend them.
pub fn toggle_participation(tui: &mut TuiState, event: &Event) -> ScreenUpdate {
    if !tui.is_authenticated() {
        return ScreenUpdate::open(OverlayRequest::Auth(AuthMode::Login));
    }
    if tui.is_admin() || tui.is_busy() || event.is_archived {
        return ScreenUpdate::none();
    }
    tui.pending_action = Some(PendingAction::Participation(event.id));
    ScreenUpdate::effects(vec![UiEffect::ToggleParticipation {
        event: Box::new(event.clone()),
    }])
}

fn handle_search_key(tui: &mut TuiState, key: KeyEvent) -> ScreenUpdate {
    match key.code {
        KeyCode::Esc => {
            tui.search_focused = false;
            ScreenUpdate::none()
        }
        KeyCode::Enter => {
            tui.search_focused = false;
            tui.search_debounce.cancel();
            let ticket = tui.feed.set_search(tui.search.value());
            tui.selected = 0;
            ScreenUpdate::effects(fetch_if_changed(tui, ticket))
        }
        _ => match tui.search.handle_key(key) {
            FieldKey::Edited => {
                let generation = tui.search_debounce.push(tui.search.value().to_string());
                ScreenUpdate::effects(vec![UiEffect::ScheduleSearch {
                    generation,
                    delay: tui.search_debounce.delay(),
                }])
            }
            FieldKey::Ignored => ScreenUpdate::none(),
        },
    }
}

pub fn handle_paste(tui: &mut TuiState, text: &str) -> ScreenUpdate {
    if !tui.search_focused {
        return ScreenUpdate::none();
    }
    tui.search.paste(text);
    let generation = tui.search_debounce.push(tui.search.value().to_string());
    ScreenUpdate::effects(vec![UiEffect::ScheduleSearch {
        generation,
        delay: tui.search_debounce.delay(),
    }])
}

pub fn handle_key(tui: &mut TuiState, key: KeyEvent) -> ScreenUpdate {
    if tui.search_focused {
        return handle_search_key(tui, key);
    }
    let len = tui.events().len();
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => {
            if tui.selected + 1 < len {
                tui.selected += 1;
            }
            ScreenUpdate::none()
        }
        KeyCode::Up | KeyCode::Char('k') => {
            tui.selected = tui.selected.saturating_sub(1);
            ScreenUpdate::none()
        }
        KeyCode::Home | KeyCode::Char('g') => {
            tui.selected = 0;
            ScreenUpdate::none()
        }
        KeyCode::End | KeyCode::Char('G') => {
            tui.selected = len.saturating_sub(1);
            ScreenUpdate::none()
        }
        KeyCode::Enter => match tui.selected_event() {
            Some(event) => ScreenUpdate::open(OverlayRequest::Detail(Box::new(event.clone()))),
            None => ScreenUpdate::none(),
        },
        KeyCode::Char('/') => {
            tui.search_focused = true;
            ScreenUpdate::none()
        }
        KeyCode::Char('f') => ScreenUpdate::open(OverlayRequest::Filter),
        KeyCode::Char('x') => ScreenUpdate::effects(reset_query(tui)),
        KeyCode::Char('c') if tui.is_admin() && tui.screen != Screen::Archive => {
            ScreenUpdate::open(OverlayRequest::NewEvent)
        }
        KeyCode::Char('p') => match tui.selected_event().cloned() {
            Some(event) => toggle_participation(tui, &event),
            None => ScreenUpdate::none(),
        },
        _ => ScreenUpdate::none(),
    }
}
