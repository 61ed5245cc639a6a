//! Create / edit form for events (admins only).
//!
//! Dates are typed in campus time as `YYYY-MM-DD HH:MM`. Validation errors
//! are shown under the offending row and never as toasts.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use pulse_core::models::{
    Event, EventId, EventLocation, EventPayload, EventType, FieldError, ParticipantRole,
};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use super::render_utils::{
    FormRow, InputHint, OverlayConfig, aligned_form_lines, render_overlay, status_line,
};
use super::{OverlayUpdate, cycle};
use crate::common::TextField;
use crate::effects::UiEffect;
use crate::state::{PendingAction, TuiState};

const INPUT_FORMAT: &str = "%Y-%m-%d %H:%M";
const LABEL_WIDTH: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Row {
    Title,
    Description,
    Start,
    End,
    Location,
    LocationDetails,
    Type,
    Roles,
    LinkParticipant,
    LinkVolunteer,
    LinkOrganizer,
    Image,
}

const ROWS: [Row; 12] = [
    Row::Title,
    Row::Description,
    Row::Start,
    Row::End,
    Row::Location,
    Row::LocationDetails,
    Row::Type,
    Row::Roles,
    Row::LinkParticipant,
    Row::LinkVolunteer,
    Row::LinkOrganizer,
    Row::Image,
];

impl Row {
    fn label(self) -> &'static str {
        match self {
            Row::Title => "Title",
            Row::Description => "Description",
            Row::Start => "Starts",
            Row::End => "Ends",
            Row::Location => "Campus",
            Row::LocationDetails => "Place",
            Row::Type => "Type",
            Row::Roles => "Roles",
            Row::LinkParticipant => "Participant link",
            Row::LinkVolunteer => "Volunteer link",
            Row::LinkOrganizer => "Organizer link",
            Row::Image => "Image file",
        }
    }

    /// Payload field the row edits, as named in validation errors.
    fn field(self) -> &'static str {
        match self {
            Row::Title => "title",
            Row::Description => "description",
            Row::Start => "start_datetime",
            Row::End => "end_datetime",
            Row::Location => "location",
            Row::LocationDetails => "location_details",
            Row::Type => "event_type",
            Row::Roles => "roles_available",
            Row::LinkParticipant => "registration_link_participant",
            Row::LinkVolunteer => "registration_link_volunteer",
            Row::LinkOrganizer => "registration_link_organizer",
            Row::Image => "image",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventFormState {
    pub editing: Option<EventId>,
    pub has_image: bool,
    pub title: TextField,
    pub description: TextField,
    pub start: TextField,
    pub end: TextField,
    pub location: EventLocation,
    pub location_details: TextField,
    pub event_type: EventType,
    pub roles: BTreeSet<ParticipantRole>,
    pub role_cursor: usize,
    pub link_participant: TextField,
    pub link_volunteer: TextField,
    pub link_organizer: TextField,
    pub image: TextField,
    pub focus: usize,
    pub errors: Vec<FieldError>,
    pub error: Option<String>,
    offset: FixedOffset,
}

fn format_input(instant: DateTime<Utc>, offset: FixedOffset) -> String {
    instant.with_timezone(&offset).format(INPUT_FORMAT).to_string()
}

fn parse_input(
    field: &TextField,
    name: &'static str,
    offset: FixedOffset,
) -> Result<Option<DateTime<Utc>>, FieldError> {
    let Some(text) = field.optional() else {
        return Ok(None);
    };
    NaiveDateTime::parse_from_str(&text, INPUT_FORMAT)
        .ok()
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|local| Some(local.with_timezone(&Utc)))
        .ok_or_else(|| FieldError::new(name, "Use the format 2025-05-14 16:00"))
}

impl EventFormState {
    pub fn create(offset: FixedOffset) -> Self {
        Self {
            editing: None,
            has_image: false,
            title: TextField::default(),
            description: TextField::default(),
            start: TextField::default(),
            end: TextField::default(),
            location: EventLocation::all()[0],
            location_details: TextField::default(),
            event_type: EventType::all()[0],
            roles: BTreeSet::from([ParticipantRole::all()[0]]),
            role_cursor: 0,
            link_participant: TextField::default(),
            link_volunteer: TextField::default(),
            link_organizer: TextField::default(),
            image: TextField::default(),
            focus: 0,
            errors: Vec::new(),
            error: None,
            offset,
        }
    }

    pub fn edit(event: &Event, offset: FixedOffset) -> Self {
        let text = |value: &Option<String>| TextField::new(value.clone().unwrap_or_default());
        Self {
            editing: Some(event.id),
            has_image: event.image_url.is_some(),
            title: TextField::new(event.title.clone()),
            description: TextField::new(event.description.clone()),
            start: TextField::new(format_input(event.start_datetime, offset)),
            end: TextField::new(
                event
                    .end_datetime
                    .map(|end| format_input(end, offset))
                    .unwrap_or_default(),
            ),
            location: event.location,
            location_details: text(&event.location_details),
            event_type: event.event_type,
            roles: event.roles_available.clone(),
            role_cursor: 0,
            link_participant: text(&event.registration_link_participant),
            link_volunteer: text(&event.registration_link_volunteer),
            link_organizer: text(&event.registration_link_organizer),
            image: TextField::default(),
            focus: 0,
            errors: Vec::new(),
            error: None,
            offset,
        }
    }

    fn row(&self) -> Row {
        ROWS[self.focus.min(ROWS.len() - 1)]
    }

    fn text_field(&mut self, row: Row) -> Option<&mut TextField> {
        match row {
            Row::Title => Some(&mut self.title),
            Row::Description => Some(&mut self.description),
            Row::Start => Some(&mut self.start),
            Row::End => Some(&mut self.end),
            Row::LocationDetails => Some(&mut self.location_details),
            Row::LinkParticipant => Some(&mut self.link_participant),
            Row::LinkVolunteer => Some(&mut self.link_volunteer),
            Row::LinkOrganizer => Some(&mut self.link_organizer),
            Row::Image => Some(&mut self.image),
            Row::Location | Row::Type | Row::Roles => None,
        }
    }

    pub fn paste(&mut self, text: &str) {
        let row = self.row();
        if let Some(field) = self.text_field(row) {
            field.paste(text);
        }
    }

    /// Builds the request body, collecting every field error.
    ///
    /// # Errors
    /// Every malformed or missing field.
    pub fn payload(&self) -> Result<EventPayload, Vec<FieldError>> {
        let mut errors = Vec::new();
        let start = match parse_input(&self.start, "start_datetime", self.offset) {
            Ok(Some(start)) => Some(start),
            Ok(None) => {
                errors.push(FieldError::new("start_datetime", "Start is required"));
                None
            }
            Err(e) => {
                errors.push(e);
                None
            }
        };
        let end = parse_input(&self.end, "end_datetime", self.offset).unwrap_or_else(|e| {
            errors.push(e);
            None
        });

        let Some(start) = start else {
            return Err(errors);
        };
        let payload = EventPayload {
            title: self.title.trimmed().to_string(),
            description: self.description.trimmed().to_string(),
            start_datetime: start,
            end_datetime: end,
            location: self.location,
            location_details: self.location_details.optional(),
            event_type: self.event_type,
            roles_available: self.roles.iter().copied().collect(),
            registration_link_participant: self.link_participant.optional(),
            registration_link_volunteer: self.link_volunteer.optional(),
            registration_link_organizer: self.link_organizer.optional(),
        };
        if let Err(more) = payload.validate() {
            errors.extend(more);
        }
        if errors.is_empty() { Ok(payload) } else { Err(errors) }
    }

    fn error_for(&self, row: Row) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == row.field())
            .map(|e| e.message.as_str())
    }

    fn submit(&mut self, tui: &TuiState) -> OverlayUpdate {
        if tui.is_busy() {
            return OverlayUpdate::stay();
        }
        match self.payload() {
            Ok(payload) => {
                self.errors.clear();
                OverlayUpdate::stay().submit(
                    PendingAction::SaveEvent,
                    UiEffect::SaveEvent {
                        id: self.editing,
                        payload: Box::new(payload),
                        image: self.image.optional().map(PathBuf::from),
                    },
                )
            }
            Err(errors) => {
                if let Some(first) = errors.first()
                    && let Some(index) = ROWS.iter().position(|r| r.field() == first.field)
                {
                    self.focus = index;
                }
                self.errors = errors;
                OverlayUpdate::stay()
            }
        }
    }

    pub fn handle_key(&mut self, tui: &TuiState, key: KeyEvent) -> OverlayUpdate {
        self.error = None;
        let row = self.row();
        match key.code {
            KeyCode::Esc => OverlayUpdate::close(),
            KeyCode::Enter => self.submit(tui),
            KeyCode::Tab | KeyCode::Down => {
                self.focus = cycle(self.focus, ROWS.len(), true);
                OverlayUpdate::stay()
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = cycle(self.focus, ROWS.len(), false);
                OverlayUpdate::stay()
            }
            KeyCode::Left | KeyCode::Right => {
                let forward = key.code == KeyCode::Right;
                match row {
                    Row::Location => {
                        let all = EventLocation::all();
                        let index = all.iter().position(|l| *l == self.location).unwrap_or(0);
                        self.location = all[cycle(index, all.len(), forward)];
                    }
                    Row::Type => {
                        let all = EventType::all();
                        let index = all.iter().position(|t| *t == self.event_type).unwrap_or(0);
                        self.event_type = all[cycle(index, all.len(), forward)];
                    }
                    Row::Roles => {
                        self.role_cursor =
                            cycle(self.role_cursor, ParticipantRole::all().len(), forward);
                    }
                    _ => {}
                }
                OverlayUpdate::stay()
            }
            KeyCode::Char(' ') if row == Row::Roles => {
                let role = ParticipantRole::all()[self.role_cursor];
                if !self.roles.remove(&role) {
                    self.roles.insert(role);
                }
                OverlayUpdate::stay()
            }
            _ => {
                if let Some(field) = self.text_field(row) {
                    field.handle_key(key);
                }
                OverlayUpdate::stay()
            }
        }
    }

    fn row_value(&self, row: Row) -> String {
        match row {
            Row::Title => self.title.display(),
            Row::Description => self.description.display(),
            Row::Start => self.start.display(),
            Row::End => self.end.display(),
            Row::Location => format!("‹ {} ›", self.location),
            Row::LocationDetails => self.location_details.display(),
            Row::Type => format!("‹ {} ›", self.event_type),
            Row::Roles => String::new(),
            Row::LinkParticipant => self.link_participant.display(),
            Row::LinkVolunteer => self.link_volunteer.display(),
            Row::LinkOrganizer => self.link_organizer.display(),
            Row::Image => {
                if self.image.is_empty() && self.has_image {
                    "(keep current image)".to_string()
                } else {
                    self.image.display()
                }
            }
        }
    }

    fn roles_line(&self) -> Line<'static> {
        let mut spans = vec![Span::styled(
            format!("{:<LABEL_WIDTH$}", Row::Roles.label()),
            if self.row() == Row::Roles {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            },
        )];
        for (i, role) in ParticipantRole::all().iter().enumerate() {
            let mark = if self.roles.contains(role) { "[x]" } else { "[ ]" };
            let style = if self.row() == Row::Roles && i == self.role_cursor {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            spans.push(Span::styled(format!("{mark} {role}"), style));
            spans.push(Span::raw("  "));
        }
        Line::from(spans)
    }

    pub fn render(&self, tui: &TuiState, frame: &mut Frame, area: Rect) {
        let hints = [
            InputHint::new("Enter", "save"),
            InputHint::new("Tab", "next"),
            InputHint::new("←/→", "change"),
            InputHint::new("Space", "toggle role"),
            InputHint::new("Esc", "cancel"),
        ];
        let title = if self.editing.is_some() {
            "Edit event"
        } else {
            "New event"
        };
        let layout = render_overlay(
            frame,
            area,
            &OverlayConfig {
                title,
                border_color: Color::Green,
                width: 90,
                height: 30,
                hints: &hints,
            },
        );

        let mut lines = Vec::new();
        for (i, row) in ROWS.iter().enumerate() {
            if *row == Row::Roles {
                lines.push(self.roles_line());
                if let Some(error) = self.error_for(*row) {
                    lines.push(Line::from(Span::styled(
                        format!("{:LABEL_WIDTH$}{error}", ""),
                        Style::default().fg(Color::Red),
                    )));
                }
                continue;
            }
            lines.extend(aligned_form_lines(
                &[FormRow {
                    label: row.label(),
                    value: self.row_value(*row),
                    focused: i == self.focus,
                    error: self.error_for(*row),
                }],
                LABEL_WIDTH,
                layout.body.width,
            ));
        }
        lines.push(Line::default());
        lines.push(status_line(self.error.as_deref(), tui.is_busy()));
        frame.render_widget(Paragraph::new(lines), layout.body);
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;
    use pulse_core::config::Config;

    use super::*;

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn filled() -> EventFormState {
        let mut form = EventFormState::create(offset());
        form.title.set("Весенний бал");
        form.description.set("Танцы");
        form.start.set("2025-05-03 19:00");
        form.end.set("2025-05-03 23:00");
        form
    }

    #[test]
    fn test_payload_converts_campus_time_to_utc() {
        let payload = filled().payload().unwrap();
        assert_eq!(
            payload.start_datetime,
            Utc.with_ymd_and_hms(2025, 5, 3, 12, 0, 0).unwrap()
        );
        assert_eq!(
            payload.end_datetime,
            Some(Utc.with_ymd_and_hms(2025, 5, 3, 16, 0, 0).unwrap())
        );
        assert_eq!(payload.roles_available, vec![ParticipantRole::all()[0]]);
    }

    #[test]
    fn test_missing_fields_are_reported_inline() {
        let mut form = EventFormState::create(offset());
        form.start.set("tomorrow");
        form.roles.clear();
        let tui = TuiState::new(&Config::default());
        let update = form.handle_key(&tui, KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert!(update.effects.is_empty());
        let fields: Vec<_> = form.errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["start_datetime"]);

        form.start.set("2025-05-03 19:00");
        form.handle_key(&tui, KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        let fields: Vec<_> = form.errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["title", "description", "roles_available"]);
        assert_eq!(form.focus, 0);
    }

    #[test]
    fn test_end_before_start_is_rejected() {
        let mut form = filled();
        form.end.set("2025-05-03 18:00");
        let errors = form.payload().unwrap_err();
        assert_eq!(errors[0].field, "end_datetime");
    }

    #[test]
    fn test_submit_carries_image_path() {
        let mut form = filled();
        form.image.set("/tmp/poster.png");
        let tui = TuiState::new(&Config::default());
        let update = form.handle_key(&tui, KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert!(matches!(
            update.effects.as_slice(),
            [UiEffect::SaveEvent { id: None, image: Some(path), .. }]
                if path == &PathBuf::from("/tmp/poster.png")
        ));
    }

    #[test]
    fn test_space_toggles_role() {
        let mut form = filled();
        form.focus = ROWS.iter().position(|r| *r == Row::Roles).unwrap();
        let tui = TuiState::new(&Config::default());
        form.handle_key(&tui, KeyEvent::new(KeyCode::Right, KeyModifiers::NONE));
        form.handle_key(&tui, KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE));
        assert!(form.roles.contains(&ParticipantRole::all()[1]));
        assert_eq!(form.roles.len(), 2);
    }
}
