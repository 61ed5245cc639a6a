//! Wire types for the events API.
//!
//! Every entity is a value object replaced wholesale on each fetch. Nullable
//! server fields are explicit `Option`s so shape problems surface once, at
//! deserialization, instead of at every use site.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type EventId = i64;
pub type UserId = i64;

// ============================================================================
// Enums
// ============================================================================

macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal, $alias:literal;)+ }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Returns every variant in display order.
            pub fn all() -> &'static [$name] {
                &[$($name::$variant),+]
            }

            /// Returns the label the server uses on the wire.
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            /// Returns the short ASCII alias accepted on the command line.
            pub fn alias(self) -> &'static str {
                match self {
                    $($name::$variant => $alias,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let trimmed = value.trim();
                $name::all()
                    .iter()
                    .copied()
                    .find(|v| v.label() == trimmed || v.alias().eq_ignore_ascii_case(trimmed))
                    .ok_or_else(|| {
                        let known: Vec<&str> = $name::all().iter().map(|v| v.alias()).collect();
                        format!(
                            "Unknown {}: {trimmed} (expected one of: {})",
                            stringify!($name),
                            known.join(", ")
                        )
                    })
            }
        }
    };
}

labelled_enum! {
    /// Campus where an event takes place.
    EventLocation {
        Central => "Центральный кампус", "central";
        East => "Восточный кампус", "east";
        Kpitip => "КПИТиП", "kpitip";
        Law => "Юридический корпус", "law";
        Other => "Другое", "other";
    }
}

labelled_enum! {
    /// Category of an event.
    EventType {
        Social => "Общественное", "social";
        Cultural => "Культурно-творческое", "cultural";
        Sports => "Спортивное", "sports";
        Educational => "Просветительское", "educational";
        Other => "Другое", "other";
    }
}

labelled_enum! {
    /// Role a user can take at an event.
    ParticipantRole {
        Participant => "Участник", "participant";
        Volunteer => "Волонтёр", "volunteer";
        Organizer => "Организатор", "organizer";
    }
}

/// Status segment of the events list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Active,
    Archive,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Active => "active",
            EventStatus::Archive => "archive",
        }
    }
}

/// Time segment of the participations list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipationStatus {
    Upcoming,
    Past,
    #[default]
    All,
}

impl ParticipationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ParticipationStatus::Upcoming => "upcoming",
            ParticipationStatus::Past => "past",
            ParticipationStatus::All => "all",
        }
    }
}

impl FromStr for ParticipationStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Ok(Self::Upcoming),
            "past" => Ok(Self::Past),
            "all" => Ok(Self::All),
            other => Err(format!(
                "Unknown participation status: {other} (expected upcoming, past or all)"
            )),
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "timestamp")]
    pub start_datetime: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub end_datetime: Option<DateTime<Utc>>,
    pub location: EventLocation,
    #[serde(default)]
    pub location_details: Option<String>,
    pub event_type: EventType,
    #[serde(default)]
    pub roles_available: BTreeSet<ParticipantRole>,
    #[serde(default)]
    pub registration_link_participant: Option<String>,
    #[serde(default)]
    pub registration_link_volunteer: Option<String>,
    #[serde(default)]
    pub registration_link_organizer: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    pub author_id: UserId,
    #[serde(default)]
    pub author_username: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default, with = "timestamp::option")]
    pub archived_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_participating: Option<bool>,
}

impl Event {
    /// End of the event, or its start when no end is set.
    pub fn effective_end(&self) -> DateTime<Utc> {
        self.end_datetime.unwrap_or(self.start_datetime)
    }

    /// Location label with details appended (`Campus - room 101`).
    pub fn location_line(&self) -> String {
        match self.location_details.as_deref().map(str::trim) {
            Some(details) if !details.is_empty() => format!("{} - {details}", self.location),
            _ => self.location.to_string(),
        }
    }

    /// Registration link for a given role, if the organisers published one.
    pub fn registration_link(&self, role: ParticipantRole) -> Option<&str> {
        let link = match role {
            ParticipantRole::Participant => self.registration_link_participant.as_deref(),
            ParticipantRole::Volunteer => self.registration_link_volunteer.as_deref(),
            ParticipantRole::Organizer => self.registration_link_organizer.as_deref(),
        };
        link.filter(|l| !l.trim().is_empty())
    }

    pub fn is_participating(&self) -> bool {
        self.is_participating.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participation {
    pub id: i64,
    pub user_id: UserId,
    pub event_id: EventId,
    pub event_title: String,
    pub role_name: ParticipantRole,
    #[serde(default = "default_true")]
    pub is_registered: bool,
    #[serde(default)]
    pub attended: bool,
    #[serde(with = "timestamp")]
    pub registered_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub event_start_datetime: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub event_end_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub event_image_url: Option<String>,
    pub event_location: EventLocation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationCounts {
    #[serde(default)]
    pub total_participated: u32,
    #[serde(default)]
    pub attended_events: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub event_id: Option<EventId>,
    #[serde(default)]
    pub event_title: Option<String>,
}

/// Number of unread entries, as shown next to the bell.
pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.is_read).count()
}

// ============================================================================
// Filters
// ============================================================================

/// Transient filter set for the events list. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilters {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub role: Option<ParticipantRole>,
    pub location: Option<EventLocation>,
    pub event_type: Option<EventType>,
}

impl EventFilters {
    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    pub fn active_count(&self) -> usize {
        [
            self.start_date.is_some(),
            self.end_date.is_some(),
            self.role.is_some(),
            self.location.is_some(),
            self.event_type.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    /// Query pairs in the server's key names, skipping unset filters.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(date) = self.start_date {
            pairs.push(("startDate", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(date) = self.end_date {
            pairs.push(("endDate", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(role) = self.role {
            pairs.push(("role", role.label().to_string()));
        }
        if let Some(location) = self.location {
            pairs.push(("location", location.label().to_string()));
        }
        if let Some(event_type) = self.event_type {
            pairs.push(("type", event_type.label().to_string()));
        }
        pairs
    }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettingsUpdate {
    pub notifications_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_new_password: String,
}

impl PasswordChange {
    /// Checks the form locally before it is sent.
    ///
    /// # Errors
    /// Returns the first failing field.
    pub fn validate(&self) -> Result<(), FieldError> {
        if self.current_password.is_empty() {
            return Err(FieldError::new("current_password", "Enter your current password"));
        }
        if self.new_password.len() < 6 {
            return Err(FieldError::new(
                "new_password",
                "New password must be at least 6 characters",
            ));
        }
        if self.new_password != self.confirm_new_password {
            return Err(FieldError::new("confirm_new_password", "Passwords do not match"));
        }
        Ok(())
    }
}

/// Inline validation failure attached to a form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Create/update body for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventPayload {
    pub title: String,
    pub description: String,
    #[serde(with = "timestamp")]
    pub start_datetime: DateTime<Utc>,
    #[serde(with = "timestamp::option")]
    pub end_datetime: Option<DateTime<Utc>>,
    pub location: EventLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_details: Option<String>,
    pub event_type: EventType,
    pub roles_available: Vec<ParticipantRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_link_participant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_link_volunteer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_link_organizer: Option<String>,
}

impl EventPayload {
    /// Pre-fills a payload from an existing event (edit form).
    pub fn from_event(event: &Event) -> Self {
        Self {
            title: event.title.clone(),
            description: event.description.clone(),
            start_datetime: event.start_datetime,
            end_datetime: event.end_datetime,
            location: event.location,
            location_details: event.location_details.clone(),
            event_type: event.event_type,
            roles_available: event.roles_available.iter().copied().collect(),
            registration_link_participant: event.registration_link_participant.clone(),
            registration_link_volunteer: event.registration_link_volunteer.clone(),
            registration_link_organizer: event.registration_link_organizer.clone(),
        }
    }

    /// Checks the fields the server requires.
    ///
    /// # Errors
    /// Returns every failing field so the form can mark them all.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(FieldError::new("title", "Title is required"));
        }
        if self.description.trim().is_empty() {
            errors.push(FieldError::new("description", "Description is required"));
        }
        if self.roles_available.is_empty() {
            errors.push(FieldError::new("roles_available", "Select at least one role"));
        }
        if let Some(end) = self.end_datetime
            && end < self.start_datetime
        {
            errors.push(FieldError::new(
                "end_datetime",
                "End cannot be earlier than start",
            ));
        }
        for (field, link) in [
            ("registration_link_participant", &self.registration_link_participant),
            ("registration_link_volunteer", &self.registration_link_volunteer),
            ("registration_link_organizer", &self.registration_link_organizer),
        ] {
            if let Some(link) = link
                && url::Url::parse(link).is_err()
            {
                errors.push(FieldError::new(field, "Link must be a full URL"));
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Image file attached to an event or used as an avatar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Reads an image from disk, guessing the MIME type from the extension.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        let file_name = path
            .file_name()
            .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().to_string());
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            file_name,
            mime,
            bytes,
        })
    }
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserEnvelope {
    pub user: User,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================================================
// Timestamps
// ============================================================================

/// Serde helpers for server timestamps.
///
/// The server emits naive ISO strings (`2025-05-01T10:00:00`) that are UTC;
/// RFC 3339 strings with an offset are also accepted.
pub mod timestamp {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Parses a server timestamp.
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(naive.and_utc());
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        #[allow(clippy::ref_option)]
        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => s.serialize_str(&super::format(v)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw: Option<String> = Option::deserialize(d)?;
            match raw.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(text) => super::parse(text).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid timestamp: {text}"))
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn event_json() -> serde_json::Value {
        json!({
            "id": 7,
            "title": "Турнир по волейболу",
            "description": "Межфакультетский турнир",
            "start_datetime": "2025-05-14T09:00:00",
            "end_datetime": null,
            "location": "Восточный кампус",
            "location_details": "Спортзал",
            "event_type": "Спортивное",
            "roles_available": ["Участник", "Волонтёр"],
            "registration_link_participant": "https://forms.example/p",
            "created_at": "2025-05-01T10:00:00",
            "updated_at": "2025-05-01T10:00:00+00:00",
            "author_id": 1,
            "author_username": "admin"
        })
    }

    #[test]
    fn test_event_deserializes_server_shape() {
        let event: Event = serde_json::from_value(event_json()).unwrap();
        assert_eq!(event.location, EventLocation::East);
        assert_eq!(event.event_type, EventType::Sports);
        assert_eq!(
            event.start_datetime,
            Utc.with_ymd_and_hms(2025, 5, 14, 9, 0, 0).unwrap()
        );
        assert!(event.end_datetime.is_none());
        assert!(!event.is_archived);
        assert!(!event.is_participating());
        assert!(event.roles_available.contains(&ParticipantRole::Volunteer));
        assert_eq!(event.location_line(), "Восточный кампус - Спортзал");
        assert_eq!(
            event.registration_link(ParticipantRole::Participant),
            Some("https://forms.example/p")
        );
        assert_eq!(event.registration_link(ParticipantRole::Organizer), None);
    }

    #[test]
    fn test_unknown_location_is_rejected() {
        let mut value = event_json();
        value["location"] = json!("Луна");
        assert!(serde_json::from_value::<Event>(value).is_err());
    }

    #[test]
    fn test_user_defaults_notifications_enabled() {
        let user: User =
            serde_json::from_value(json!({"id": 1, "username": "alice", "email": "a@b.com"}))
                .unwrap();
        assert!(user.notifications_enabled);
        assert!(!user.is_admin);
    }

    #[test]
    fn test_enum_from_str_accepts_label_and_alias() {
        assert_eq!("Спортивное".parse::<EventType>(), Ok(EventType::Sports));
        assert_eq!("SPORTS".parse::<EventType>(), Ok(EventType::Sports));
        assert_eq!("kpitip".parse::<EventLocation>(), Ok(EventLocation::Kpitip));
        assert!("pilot".parse::<ParticipantRole>().is_err());
    }

    #[test]
    fn test_filters_query_pairs_skip_unset() {
        let filters = EventFilters {
            event_type: Some(EventType::Sports),
            start_date: NaiveDate::from_ymd_opt(2025, 5, 1),
            ..EventFilters::default()
        };
        assert_eq!(
            filters.query_pairs(),
            vec![
                ("startDate", "2025-05-01".to_string()),
                ("type", "Спортивное".to_string())
            ]
        );
        assert_eq!(filters.active_count(), 2);
        assert!(EventFilters::default().is_empty());
    }

    #[test]
    fn test_payload_validation_reports_all_fields() {
        let payload = EventPayload {
            title: " ".into(),
            description: String::new(),
            start_datetime: Utc.with_ymd_and_hms(2025, 5, 14, 9, 0, 0).unwrap(),
            end_datetime: Some(Utc.with_ymd_and_hms(2025, 5, 13, 9, 0, 0).unwrap()),
            location: EventLocation::Central,
            location_details: None,
            event_type: EventType::Social,
            roles_available: vec![],
            registration_link_participant: Some("forms".into()),
            registration_link_volunteer: None,
            registration_link_organizer: None,
        };
        let errors = payload.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "title",
                "description",
                "roles_available",
                "end_datetime",
                "registration_link_participant"
            ]
        );
    }

    #[test]
    fn test_payload_serializes_wire_names() {
        let event: Event = serde_json::from_value(event_json()).unwrap();
        let payload = EventPayload::from_event(&event);
        assert!(payload.validate().is_ok());
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["event_type"], "Спортивное");
        assert_eq!(value["start_datetime"], "2025-05-14T09:00:00Z");
        assert_eq!(value["end_datetime"], serde_json::Value::Null);
        assert_eq!(value["roles_available"], json!(["Участник", "Волонтёр"]));
    }

    #[test]
    fn test_password_change_validation() {
        let mut change = PasswordChange {
            current_password: "old".into(),
            new_password: "newpass".into(),
            confirm_new_password: "newpasX".into(),
        };
        assert_eq!(change.validate().unwrap_err().field, "confirm_new_password");
        change.confirm_new_password = "newpass".into();
        assert!(change.validate().is_ok());
    }

    #[test]
    fn test_timestamp_parse_variants() {
        let expected = Utc.with_ymd_and_hms(2025, 5, 14, 2, 0, 0).unwrap();
        assert_eq!(timestamp::parse("2025-05-14T02:00:00"), Some(expected));
        assert_eq!(timestamp::parse("2025-05-14T09:00:00+07:00"), Some(expected));
        assert_eq!(timestamp::parse("2025-05-14T02:00:00.000000"), Some(expected));
        assert!(timestamp::parse("yesterday").is_none());
    }

    #[test]
    fn test_unread_count() {
        let make = |id, is_read| Notification {
            id,
            message: "m".into(),
            is_read,
            created_at: Utc::now(),
            event_id: None,
            event_title: None,
        };
        assert_eq!(unread_count(&[make(1, false), make(2, true), make(3, false)]), 2);
    }
}
