//! Fixtures shared by the unit tests.

use pulse_core::SessionSnapshot;
use pulse_core::config::Config;
use pulse_core::models::{Event, Notification, User};
use serde_json::json;

use crate::state::{AppState, TuiState};

pub fn event(id: i64, title: &str) -> Event {
    serde_json::from_value(json!({
        "id": id,
        "title": title,
        "description": "Описание",
        "start_datetime": "2025-05-14T09:00:00",
        "end_datetime": "2025-05-14T11:00:00",
        "location": "Другое",
        "event_type": "Другое",
        "roles_available": ["Участник", "Волонтёр"],
        "registration_link_participant": "https://forms.example/p",
        "created_at": "2025-01-01T00:00:00",
        "updated_at": "2025-01-01T00:00:00",
        "author_id": 1
    }))
    .unwrap()
}

pub fn archived(id: i64, title: &str) -> Event {
    Event {
        is_archived: true,
        ..event(id, title)
    }
}

pub fn notification(id: i64, event_id: Option<i64>, is_read: bool) -> Notification {
    serde_json::from_value(json!({
        "id": id,
        "message": format!("notice {id}"),
        "is_read": is_read,
        "created_at": "2025-05-01T10:00:00",
        "event_id": event_id,
    }))
    .unwrap()
}

pub fn session(is_admin: bool) -> SessionSnapshot {
    SessionSnapshot {
        token: Some("token".into()),
        user: Some(User {
            id: 7,
            username: "alice".into(),
            email: "alice@example.com".into(),
            is_admin,
            avatar_url: None,
            notifications_enabled: true,
        }),
        is_authenticated: true,
        is_loading: false,
    }
}

pub fn tui() -> TuiState {
    TuiState::new(&Config::default())
}

pub fn signed_in(is_admin: bool) -> TuiState {
    let mut tui = tui();
    tui.session = session(is_admin);
    tui
}

pub fn app() -> AppState {
    AppState::new(&Config::default())
}
