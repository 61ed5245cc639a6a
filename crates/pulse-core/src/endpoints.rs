//! Paths of the events REST API, relative to the configured base URL.

use crate::models::EventId;

pub const LOGIN: &str = "/api/login";
pub const REGISTER: &str = "/api/register";
pub const ME: &str = "/api/me";
pub const ME_AVATAR: &str = "/api/me/avatar";
pub const ME_SETTINGS: &str = "/api/me/settings";
pub const ME_CHANGE_PASSWORD: &str = "/api/me/change-password";
pub const ME_PARTICIPATIONS: &str = "/api/me/participations";
pub const ME_PARTICIPATIONS_COUNT: &str = "/api/me/participations/count";
pub const EVENTS: &str = "/api/events";
pub const NOTIFICATIONS: &str = "/api/notifications";
pub const NOTIFICATIONS_MARK_ALL_READ: &str = "/api/notifications/mark-as-read";

pub fn event(id: EventId) -> String {
    format!("{EVENTS}/{id}")
}

pub fn event_archive(id: EventId) -> String {
    format!("{EVENTS}/{id}/archive")
}

pub fn event_restore(id: EventId) -> String {
    format!("{EVENTS}/{id}/restore")
}

pub fn event_upload_image(id: EventId) -> String {
    format!("{EVENTS}/{id}/upload_image")
}

pub fn event_image(id: EventId) -> String {
    format!("{EVENTS}/{id}/image")
}

pub fn event_participate(id: EventId) -> String {
    format!("{EVENTS}/{id}/participate")
}

pub fn notification_mark_read(id: i64) -> String {
    format!("{NOTIFICATIONS}/{id}/mark-as-read")
}

/// Appends an encoded query string, if any, to a path.
pub fn with_query(path: &str, query: &str) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}
