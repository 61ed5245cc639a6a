//! Filter editor for the events list.

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pulse_core::models::{EventFilters, EventLocation, EventType, ParticipantRole};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::text::Line;
use ratatui::widgets::Paragraph;

use super::render_utils::{FormRow, InputHint, OverlayConfig, form_lines, render_overlay, status_line};
use super::{OverlayUpdate, cycle};
use crate::common::TextField;
use crate::mutations::StateMutation;

const FIELDS: usize = 5;
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct FilterState {
    pub start_date: TextField,
    pub end_date: TextField,
    pub role: Option<ParticipantRole>,
    pub location: Option<EventLocation>,
    pub event_type: Option<EventType>,
    pub focus: usize,
    pub error: Option<String>,
}

/// Steps through `None` and every value of `all`.
fn step<T: Copy + PartialEq>(current: Option<T>, all: &[T], forward: bool) -> Option<T> {
    let position = current.and_then(|c| all.iter().position(|v| *v == c));
    let len = all.len() + 1;
    let index = position.map_or(0, |p| p + 1);
    let next = cycle(index, len, forward);
    next.checked_sub(1).map(|i| all[i])
}

fn parse_date(field: &TextField, label: &str) -> Result<Option<NaiveDate>, String> {
    match field.optional() {
        None => Ok(None),
        Some(text) => NaiveDate::parse_from_str(&text, DATE_FORMAT)
            .map(Some)
            .map_err(|_| format!("{label} must look like 2025-05-14")),
    }
}

impl FilterState {
    pub fn new(current: &EventFilters) -> Self {
        let date = |d: Option<NaiveDate>| {
            TextField::new(d.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default())
        };
        Self {
            start_date: date(current.start_date),
            end_date: date(current.end_date),
            role: current.role,
            location: current.location,
            event_type: current.event_type,
            focus: 0,
            error: None,
        }
    }

    /// Builds the filter set, or explains which date is wrong.
    ///
    /// # Errors
    /// A message for the first malformed or inverted date.
    pub fn filters(&self) -> Result<EventFilters, String> {
        let start_date = parse_date(&self.start_date, "Start date")?;
        let end_date = parse_date(&self.end_date, "End date")?;
        if let (Some(start), Some(end)) = (start_date, end_date)
            && end < start
        {
            return Err("End date cannot be earlier than start date".to_string());
        }
        Ok(EventFilters {
            start_date,
            end_date,
            role: self.role,
            location: self.location,
            event_type: self.event_type,
        })
    }

    pub fn paste(&mut self, text: &str) {
        match self.focus {
            0 => self.start_date.paste(text),
            1 => self.end_date.paste(text),
            _ => {}
        }
    }

    fn step_choice(&mut self, forward: bool) {
        match self.focus {
            2 => self.role = step(self.role, ParticipantRole::all(), forward),
            3 => self.location = step(self.location, EventLocation::all(), forward),
            4 => self.event_type = step(self.event_type, EventType::all(), forward),
            _ => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> OverlayUpdate {
        self.error = None;
        match key.code {
            KeyCode::Esc => OverlayUpdate::close(),
            KeyCode::Tab | KeyCode::Down => {
                self.focus = cycle(self.focus, FIELDS, true);
                OverlayUpdate::stay()
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = cycle(self.focus, FIELDS, false);
                OverlayUpdate::stay()
            }
            KeyCode::Left | KeyCode::Right => {
                self.step_choice(key.code == KeyCode::Right);
                OverlayUpdate::stay()
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                OverlayUpdate::close().with_mutations(vec![StateMutation::ResetFilters])
            }
            KeyCode::Enter => match self.filters() {
                Ok(filters) => {
                    OverlayUpdate::close().with_mutations(vec![StateMutation::ApplyFilters(filters)])
                }
                Err(error) => {
                    self.error = Some(error);
                    OverlayUpdate::stay()
                }
            },
            _ => {
                match self.focus {
                    0 => self.start_date.handle_key(key),
                    1 => self.end_date.handle_key(key),
                    _ => return OverlayUpdate::stay(),
                };
                OverlayUpdate::stay()
            }
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let hints = [
            InputHint::new("Enter", "apply"),
            InputHint::new("←/→", "change"),
            InputHint::new("Ctrl+R", "reset"),
            InputHint::new("Esc", "close"),
        ];
        let layout = render_overlay(
            frame,
            area,
            &OverlayConfig {
                title: "Filters",
                border_color: Color::Blue,
                width: 64,
                height: 11,
                hints: &hints,
            },
        );
        let choice = |label: Option<&'static str>| format!("‹ {} ›", label.unwrap_or("Any"));
        let values = [
            ("From", self.start_date.display()),
            ("To", self.end_date.display()),
            ("Role", choice(self.role.map(ParticipantRole::label))),
            ("Campus", choice(self.location.map(EventLocation::label))),
            ("Type", choice(self.event_type.map(EventType::label))),
        ];
        let rows: Vec<FormRow<'_>> = values
            .into_iter()
            .enumerate()
            .map(|(i, (label, value))| FormRow {
                label,
                value,
                focused: i == self.focus,
                error: None,
            })
            .collect();
        let mut lines = form_lines(&rows, layout.body.width);
        lines.push(Line::default());
        lines.push(status_line(self.error.as_deref(), false));
        frame.render_widget(Paragraph::new(lines), layout.body);
    }
}
