//! Effect handlers for the TUI runtime.
//!
//! Pure async functions: each performs its I/O through the core services and
//! returns the `UiEvent` that reports the outcome. They never touch state;
//! the runtime spawns them and forwards the result to the inbox.

use std::path::{Path, PathBuf};

use chrono::Utc;
use pulse_core::actions::EventActions;
use pulse_core::calendar::Month;
use pulse_core::config::CalendarConfig;
use pulse_core::models::{
    Credentials, Event, EventId, EventPayload, ImageUpload, ParticipationStatus, PasswordChange,
    ProfileUpdate, Registration, SettingsUpdate,
};
use pulse_core::resources::{self, EventsQuery, FetchTicket};
use pulse_core::session::UserUpdate;
use pulse_core::{ClientError, Gateway, SessionStore, ToastSink, ics};

use crate::events::{ActionFailure, ActionResult, UiEvent};
use crate::state::{EventCommand, PendingAction};

fn finished(action: PendingAction, result: ActionResult) -> UiEvent {
    UiEvent::ActionFinished { action, result }
}

/// Errors the orchestrators have already toasted (or the 401 logout).
fn reported<T>(result: Result<T, ClientError>) -> ActionResult {
    result.map(|_| ()).map_err(|_| ActionFailure::Reported)
}

/// Errors the session store leaves to the caller, shown in the open form.
fn inline(error: &ClientError, fallback: &str) -> ActionFailure {
    if error.is_unauthorized() {
        ActionFailure::Reported
    } else {
        ActionFailure::Inline(error.user_message(fallback))
    }
}

/// Errors the session store leaves to the caller, shown as a toast.
fn toasted(error: &ClientError, toasts: &ToastSink, fallback: &str) -> ActionFailure {
    if !error.is_unauthorized() {
        toasts.error(error.user_message(fallback));
    }
    ActionFailure::Reported
}

// ============================================================================
// Session
// ============================================================================

pub async fn login(session: SessionStore, credentials: Credentials) -> UiEvent {
    let result = session
        .login(&credentials)
        .await
        .map(|_| ())
        .map_err(|e| {
            tracing::info!(error = %e, "login rejected");
            inline(&e, "Login failed")
        });
    finished(PendingAction::Login, result)
}

pub async fn register(session: SessionStore, registration: Registration) -> UiEvent {
    let result = session
        .register(&registration)
        .await
        .map_err(|e| inline(&e, "Registration failed"));
    finished(PendingAction::Register, result)
}

pub async fn update_settings(session: SessionStore, settings: SettingsUpdate) -> UiEvent {
    let enabled = settings.notifications_enabled;
    let result = match session.update_settings(settings).await {
        Ok(_) => {
            session.toasts().success(if enabled {
                "Notifications enabled."
            } else {
                "Notifications disabled."
            });
            Ok(())
        }
        Err(e) => Err(toasted(&e, session.toasts(), "Failed to update settings")),
    };
    finished(PendingAction::Settings, result)
}

/// Saves the changed profile fields, then the avatar.
pub async fn update_profile(
    session: SessionStore,
    profile: ProfileUpdate,
    avatar: Option<PathBuf>,
) -> UiEvent {
    let avatar = match avatar.as_deref().map(load_image).transpose() {
        Ok(avatar) => avatar,
        Err(message) => return finished(PendingAction::Profile, Err(ActionFailure::Inline(message))),
    };
    if (profile.username.is_some() || profile.email.is_some())
        && let Err(e) = session.update_user(UserUpdate::Profile(profile)).await
    {
        return finished(PendingAction::Profile, Err(inline(&e, "Failed to update profile")));
    }
    if let Some(image) = avatar
        && let Err(e) = session.update_user(UserUpdate::Avatar(image)).await
    {
        return finished(PendingAction::Profile, Err(inline(&e, "Failed to update avatar")));
    }
    session.toasts().success("Profile updated.");
    finished(PendingAction::Profile, Ok(()))
}

pub async fn change_password(session: SessionStore, change: PasswordChange) -> UiEvent {
    let result = match session.change_password(&change).await {
        Ok(()) => {
            session.toasts().success("Password changed.");
            Ok(())
        }
        Err(e) => Err(inline(&e, "Failed to change password")),
    };
    finished(PendingAction::Password, result)
}

// ============================================================================
// Resources
// ============================================================================

pub async fn fetch_events(gateway: Gateway, ticket: FetchTicket, query: EventsQuery) -> UiEvent {
    let result = resources::fetch_events(&gateway, &query).await;
    UiEvent::EventsLoaded { ticket, result }
}

pub async fn fetch_participations(
    gateway: Gateway,
    ticket: FetchTicket,
    status: ParticipationStatus,
) -> UiEvent {
    let result = resources::fetch_participations(&gateway, status).await;
    UiEvent::ParticipationsLoaded { ticket, result }
}

pub async fn fetch_counts(gateway: Gateway, ticket: FetchTicket) -> UiEvent {
    let result = resources::fetch_participation_counts(&gateway).await;
    UiEvent::CountsLoaded { ticket, result }
}

pub async fn fetch_notifications(gateway: Gateway, ticket: FetchTicket) -> UiEvent {
    let result = resources::fetch_notifications(&gateway).await;
    UiEvent::NotificationsLoaded { ticket, result }
}

// ============================================================================
// Event actions
// ============================================================================

fn load_image(path: &Path) -> Result<ImageUpload, String> {
    ImageUpload::from_path(path).map_err(|e| format!("{e:#}"))
}

pub async fn save_event(
    actions: EventActions,
    id: Option<EventId>,
    payload: EventPayload,
    image: Option<PathBuf>,
) -> UiEvent {
    let image = match image.as_deref().map(load_image).transpose() {
        Ok(image) => image,
        Err(message) => {
            return finished(PendingAction::SaveEvent, Err(ActionFailure::Inline(message)));
        }
    };
    let saved = match id {
        Some(id) => actions.update(id, &payload, image).await,
        None => actions.create(&payload, image).await,
    };
    let result = match saved {
        Ok(_) => Ok(()),
        Err(ClientError::Validation(message)) => Err(ActionFailure::Inline(message)),
        Err(_) => Err(ActionFailure::Reported),
    };
    finished(PendingAction::SaveEvent, result)
}

pub async fn run_event_command(actions: EventActions, command: EventCommand, id: EventId) -> UiEvent {
    let result = match command {
        EventCommand::Archive => actions.archive(id).await,
        EventCommand::Restore => actions.restore(id).await,
        EventCommand::HardDelete => actions.hard_delete(id).await,
        EventCommand::DeleteImage => actions.delete_image(id).await,
    };
    finished(PendingAction::EventCommand(command), reported(result))
}

pub async fn toggle_participation(actions: EventActions, event: Event) -> UiEvent {
    let result = actions.toggle_participation(&event).await;
    finished(PendingAction::Participation(event.id), reported(result))
}

/// Silent: the refetched list shows the change, and nothing waits on it.
pub async fn mark_notification_read(actions: EventActions, id: i64) {
    if let Err(e) = actions.mark_notification_read(id).await {
        tracing::debug!(id, error = %e, "mark as read failed");
    }
}

pub async fn mark_all_notifications_read(actions: EventActions) -> UiEvent {
    let result = actions.mark_all_notifications_read().await;
    finished(PendingAction::Notifications, reported(result))
}

// ============================================================================
// Calendar export
// ============================================================================

/// Writes the month's events to `dir` and toasts where they went.
pub async fn export_calendar(
    calendar: CalendarConfig,
    dir: PathBuf,
    month: Month,
    events: Vec<Event>,
    toasts: ToastSink,
) -> UiEvent {
    let result = if events.is_empty() {
        toasts.info("No events to export this month.");
        Ok(())
    } else {
        let body = ics::export(&events, &calendar, Utc::now());
        let path = dir.join(ics::file_name(month));
        match tokio::fs::write(&path, body).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), count = events.len(), "calendar exported");
                toasts.success(format!("Exported {} events to {}", events.len(), path.display()));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "calendar export failed");
                toasts.error(format!("Failed to write {}: {e}", path.display()));
                Err(ActionFailure::Reported)
            }
        }
    };
    finished(PendingAction::Export, result)
}

#[cfg(test)]
mod tests {
    use pulse_core::toast;

    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn test_export_writes_month_file() {
        let dir = tempfile::tempdir().unwrap();
        let (toasts, mut rx) = ToastSink::channel();
        let month = Month::new(2025, 5).unwrap();
        let event = test_support::event(1, "Весенний бал");

        let finished = export_calendar(
            CalendarConfig::default(),
            dir.path().to_path_buf(),
            month,
            vec![event],
            toasts,
        )
        .await;

        assert!(matches!(
            finished,
            UiEvent::ActionFinished {
                action: PendingAction::Export,
                result: Ok(())
            }
        ));
        let text = std::fs::read_to_string(dir.path().join(ics::file_name(month))).unwrap();
        assert!(text.contains("SUMMARY:Весенний бал"));
        assert!(toast::drain(&mut rx)[0].message.contains("Exported 1 events"));
    }

    #[tokio::test]
    async fn test_export_empty_month_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (toasts, mut rx) = ToastSink::channel();
        let month = Month::new(2025, 6).unwrap();
        export_calendar(CalendarConfig::default(), dir.path().to_path_buf(), month, Vec::new(), toasts)
            .await;
        assert!(!dir.path().join(ics::file_name(month)).exists());
        assert_eq!(toast::drain(&mut rx).len(), 1);
    }

    #[test]
    fn test_unauthorized_is_never_inline() {
        assert_eq!(inline(&ClientError::Unauthorized, "x"), ActionFailure::Reported);
        assert_eq!(
            inline(&ClientError::Validation("Bad".into()), "x"),
            ActionFailure::Inline("Bad".into())
        );
    }
}
