//! Action orchestrators for events, participation and notifications.
//!
//! Each action sequences its gateway calls, reports the result as a toast and
//! asks the injected [`Refetcher`] to reload the affected lists. Nothing is
//! patched locally: a write followed by a refetch is the only way list state
//! advances.

use std::sync::Arc;

use reqwest::Method;

use crate::endpoints;
use crate::error::{ClientError, ClientResult};
use crate::gateway::{Gateway, RequestBody};
use crate::models::{Event, EventId, EventPayload, ImageUpload};
use crate::session::image_form;
use crate::toast::ToastSink;

/// List that must be reloaded after a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefetchTarget {
    Events,
    Participations,
    ParticipationCounts,
    Notifications,
}

/// Receives refetch requests from actions and the push channel.
pub trait Refetcher: Send + Sync {
    fn refetch(&self, target: RefetchTarget);
}

impl<F> Refetcher for F
where
    F: Fn(RefetchTarget) + Send + Sync,
{
    fn refetch(&self, target: RefetchTarget) {
        self(target);
    }
}

/// Result of an action whose primary step succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome<T> {
    Completed(T),
    /// The primary write is kept; a secondary step failed.
    PartialFailure { value: T, warning: String },
}

impl<T> ActionOutcome<T> {
    pub fn value(&self) -> &T {
        match self {
            ActionOutcome::Completed(value) | ActionOutcome::PartialFailure { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            ActionOutcome::Completed(value) | ActionOutcome::PartialFailure { value, .. } => value,
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            ActionOutcome::Completed(_) => None,
            ActionOutcome::PartialFailure { warning, .. } => Some(warning),
        }
    }
}

#[derive(Clone)]
pub struct EventActions {
    gateway: Gateway,
    toasts: ToastSink,
    refetcher: Arc<dyn Refetcher>,
}

impl EventActions {
    pub fn new(gateway: Gateway, toasts: ToastSink, refetcher: Arc<dyn Refetcher>) -> Self {
        Self {
            gateway,
            toasts,
            refetcher,
        }
    }

    /// Hard delete is only offered for archived events.
    pub fn can_hard_delete(event: &Event) -> bool {
        event.is_archived
    }

    // ------------------------------------------------------------------------
    // Event lifecycle
    // ------------------------------------------------------------------------

    /// Creates an event, then uploads its image if one is given.
    ///
    /// # Errors
    /// `Validation` for an invalid payload (no toast), otherwise the error of
    /// the create call after it has been reported.
    pub async fn create(
        &self,
        payload: &EventPayload,
        image: Option<ImageUpload>,
    ) -> ClientResult<ActionOutcome<Event>> {
        validate(payload)?;
        let body = RequestBody::json(payload)?;
        let event: Event = self.report(
            self.gateway
                .send_json(Method::POST, endpoints::EVENTS, body, "Failed to create event")
                .await,
            "Failed to create event",
        )?;
        tracing::info!(event_id = event.id, "event created");
        self.toasts.success("Event created!");
        Ok(self.finish_save(event, image).await)
    }

    /// Updates an event, then uploads its image if one is given.
    ///
    /// # Errors
    /// `Validation` for an invalid payload (no toast), otherwise the error of
    /// the update call after it has been reported.
    pub async fn update(
        &self,
        id: EventId,
        payload: &EventPayload,
        image: Option<ImageUpload>,
    ) -> ClientResult<ActionOutcome<Event>> {
        validate(payload)?;
        let body = RequestBody::json(payload)?;
        let event: Event = self.report(
            self.gateway
                .send_json(Method::PUT, &endpoints::event(id), body, "Failed to save event")
                .await,
            "Failed to save event",
        )?;
        tracing::info!(event_id = event.id, "event updated");
        self.toasts.success("Event updated!");
        Ok(self.finish_save(event, image).await)
    }

    async fn finish_save(&self, event: Event, image: Option<ImageUpload>) -> ActionOutcome<Event> {
        let outcome = match image {
            None => ActionOutcome::Completed(event),
            Some(image) => match self.upload_image(event.id, image).await {
                Ok(()) => ActionOutcome::Completed(event),
                Err(ClientError::Unauthorized) => ActionOutcome::PartialFailure {
                    value: event,
                    warning: ClientError::Unauthorized.to_string(),
                },
                Err(e) => {
                    let warning = format!(
                        "Event saved, but the image upload failed: {}",
                        e.user_message("upload rejected")
                    );
                    tracing::warn!(event_id = event.id, error = %e, "image upload failed");
                    self.toasts.warn(warning.clone());
                    ActionOutcome::PartialFailure {
                        value: event,
                        warning,
                    }
                }
            },
        };
        self.refetcher.refetch(RefetchTarget::Events);
        outcome
    }

    async fn upload_image(&self, id: EventId, image: ImageUpload) -> ClientResult<()> {
        let form = image_form("image", image)?;
        self.gateway
            .send_ok(
                Method::POST,
                &endpoints::event_upload_image(id),
                RequestBody::Multipart(form),
                "Image upload failed",
            )
            .await
            .map(|_| ())
    }

    /// # Errors
    /// The reported gateway or API error.
    pub async fn archive(&self, id: EventId) -> ClientResult<()> {
        self.simple(
            Method::POST,
            &endpoints::event_archive(id),
            "Event archived!",
            "Failed to archive event",
            &[RefetchTarget::Events],
        )
        .await
    }

    /// # Errors
    /// The reported gateway or API error.
    pub async fn restore(&self, id: EventId) -> ClientResult<()> {
        self.simple(
            Method::POST,
            &endpoints::event_restore(id),
            "Event restored!",
            "Failed to restore event",
            &[RefetchTarget::Events],
        )
        .await
    }

    /// Permanently deletes an event.
    ///
    /// # Errors
    /// The reported gateway or API error.
    pub async fn hard_delete(&self, id: EventId) -> ClientResult<()> {
        self.simple(
            Method::DELETE,
            &endpoints::event(id),
            "Event permanently deleted!",
            "Failed to delete event",
            &[RefetchTarget::Events],
        )
        .await
    }

    /// # Errors
    /// The reported gateway or API error.
    pub async fn delete_image(&self, id: EventId) -> ClientResult<()> {
        self.simple(
            Method::DELETE,
            &endpoints::event_image(id),
            "Image deleted!",
            "Failed to delete image",
            &[RefetchTarget::Events],
        )
        .await
    }

    // ------------------------------------------------------------------------
    // Participation
    // ------------------------------------------------------------------------

    /// # Errors
    /// The reported gateway or API error.
    pub async fn register(&self, id: EventId) -> ClientResult<()> {
        let result = self
            .gateway
            .send_ok(
                Method::POST,
                &endpoints::event_participate(id),
                RequestBody::Empty,
                "Failed to register for event",
            )
            .await;
        self.report(result, "Failed to register for event")?;
        self.toasts.success("You are registered for the event!");
        self.refetch_participation();
        Ok(())
    }

    /// # Errors
    /// The reported gateway or API error.
    pub async fn unregister(&self, id: EventId) -> ClientResult<()> {
        let result = self
            .gateway
            .send_ok(
                Method::DELETE,
                &endpoints::event_participate(id),
                RequestBody::Empty,
                "Failed to cancel registration",
            )
            .await;
        self.report(result, "Failed to cancel registration")?;
        self.toasts.info("Your registration was cancelled.");
        self.refetch_participation();
        Ok(())
    }

    /// Registers or unregisters based on the event's current state.
    /// Returns the new participation state.
    ///
    /// # Errors
    /// The reported gateway or API error.
    pub async fn toggle_participation(&self, event: &Event) -> ClientResult<bool> {
        if event.is_participating() {
            self.unregister(event.id).await?;
            Ok(false)
        } else {
            self.register(event.id).await?;
            Ok(true)
        }
    }

    fn refetch_participation(&self) {
        self.refetcher.refetch(RefetchTarget::Events);
        self.refetcher.refetch(RefetchTarget::Participations);
        self.refetcher.refetch(RefetchTarget::ParticipationCounts);
    }

    // ------------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------------

    /// Marks one notification as read. Success is shown by the refetched
    /// list, not by a toast.
    ///
    /// # Errors
    /// The reported gateway or API error.
    pub async fn mark_notification_read(&self, id: i64) -> ClientResult<()> {
        let result = self
            .gateway
            .send_ok(
                Method::POST,
                &endpoints::notification_mark_read(id),
                RequestBody::Empty,
                "Failed to update notification",
            )
            .await;
        self.report(result, "Failed to update notification")?;
        self.refetcher.refetch(RefetchTarget::Notifications);
        Ok(())
    }

    /// # Errors
    /// The reported gateway or API error.
    pub async fn mark_all_notifications_read(&self) -> ClientResult<()> {
        self.simple(
            Method::POST,
            endpoints::NOTIFICATIONS_MARK_ALL_READ,
            "All notifications marked as read.",
            "Failed to update notifications",
            &[RefetchTarget::Notifications],
        )
        .await
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    async fn simple(
        &self,
        method: Method,
        path: &str,
        success: &str,
        fallback: &str,
        targets: &[RefetchTarget],
    ) -> ClientResult<()> {
        let result = self
            .gateway
            .send_ok(method, path, RequestBody::Empty, fallback)
            .await;
        self.report(result, fallback)?;
        self.toasts.success(success);
        for target in targets {
            self.refetcher.refetch(*target);
        }
        Ok(())
    }

    /// Emits an error toast for failures other than the 401 sentinel.
    fn report<T>(&self, result: ClientResult<T>, fallback: &str) -> ClientResult<T> {
        if let Err(e) = &result
            && !e.is_unauthorized()
        {
            tracing::warn!(error = %e, "action failed");
            self.toasts.error(e.user_message(fallback));
        }
        result
    }
}

fn validate(payload: &EventPayload) -> ClientResult<()> {
    payload.validate().map_err(|errors| {
        let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
        ClientError::Validation(joined.join("; "))
    })
}
