//! Change password form.

use crossterm::event::{KeyCode, KeyEvent};
use pulse_core::models::PasswordChange;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::text::Line;
use ratatui::widgets::Paragraph;

use super::render_utils::{FormRow, InputHint, OverlayConfig, form_lines, render_overlay, status_line};
use super::{OverlayUpdate, cycle};
use crate::common::TextField;
use crate::effects::UiEffect;
use crate::state::{PendingAction, TuiState};

const FIELDS: [(&str, &str); 3] = [
    ("Current", "current_password"),
    ("New", "new_password"),
    ("Repeat new", "confirm_new_password"),
];

#[derive(Debug, Clone)]
pub struct PasswordState {
    pub fields: [TextField; 3],
    pub focus: usize,
    /// Failing field and its message.
    pub field_error: Option<(&'static str, String)>,
    pub error: Option<String>,
}

impl Default for PasswordState {
    fn default() -> Self {
        Self {
            fields: [TextField::secret(), TextField::secret(), TextField::secret()],
            focus: 0,
            field_error: None,
            error: None,
        }
    }
}

impl PasswordState {
    pub fn focused_field(&mut self) -> &mut TextField {
        &mut self.fields[self.focus]
    }

    fn change(&self) -> PasswordChange {
        let [current, new, confirm] = &self.fields;
        PasswordChange {
            current_password: current.value().to_string(),
            new_password: new.value().to_string(),
            confirm_new_password: confirm.value().to_string(),
        }
    }

    pub fn handle_key(&mut self, tui: &TuiState, key: KeyEvent) -> OverlayUpdate {
        match key.code {
            KeyCode::Esc => OverlayUpdate::close(),
            KeyCode::Tab | KeyCode::Down => {
                self.focus = cycle(self.focus, FIELDS.len(), true);
                OverlayUpdate::stay()
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = cycle(self.focus, FIELDS.len(), false);
                OverlayUpdate::stay()
            }
            KeyCode::Enter => {
                if tui.is_busy() {
                    return OverlayUpdate::stay();
                }
                let change = self.change();
                if let Err(e) = change.validate() {
                    self.focus = FIELDS.iter().position(|(_, f)| *f == e.field).unwrap_or(0);
                    self.field_error = Some((e.field, e.message));
                    return OverlayUpdate::stay();
                }
                self.field_error = None;
                self.error = None;
                OverlayUpdate::stay().submit(PendingAction::Password, UiEffect::ChangePassword(change))
            }
            _ => {
                self.field_error = None;
                self.error = None;
                self.focused_field().handle_key(key);
                OverlayUpdate::stay()
            }
        }
    }

    pub fn render(&self, tui: &TuiState, frame: &mut Frame, area: Rect) {
        let hints = [
            InputHint::new("Enter", "change"),
            InputHint::new("Tab", "next"),
            InputHint::new("Esc", "cancel"),
        ];
        let layout = render_overlay(
            frame,
            area,
            &OverlayConfig {
                title: "Change password",
                border_color: Color::Cyan,
                width: 60,
                height: 10,
                hints: &hints,
            },
        );
        let rows: Vec<FormRow<'_>> = FIELDS
            .iter()
            .zip(&self.fields)
            .enumerate()
            .map(|(i, ((label, name), field))| FormRow {
                label: *label,
                value: field.display(),
                focused: i == self.focus,
                error: self
                    .field_error
                    .as_ref()
                    .filter(|(f, _)| f == name)
                    .map(|(_, message)| message.as_str()),
            })
            .collect();
        let mut lines = form_lines(&rows, layout.body.width);
        lines.push(Line::default());
        lines.push(status_line(self.error.as_deref(), tui.is_busy()));
        frame.render_widget(Paragraph::new(lines), layout.body);
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;

    use super::*;
    use crate::test_support::signed_in;

    fn enter(state: &mut PasswordState, tui: &TuiState) -> OverlayUpdate {
        state.handle_key(tui, KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))
    }

    #[test]
    fn test_short_password_is_flagged_inline() {
        let tui = signed_in(false);
        let mut state = PasswordState::default();
        state.fields[0].set("old-secret");
        state.fields[1].set("abc");
        state.fields[2].set("abc");
        assert!(enter(&mut state, &tui).effects.is_empty());
        assert_eq!(state.focus, 1);
        assert_eq!(state.field_error.as_ref().map(|(f, _)| *f), Some("new_password"));
    }

    #[test]
    fn test_valid_change_is_submitted() {
        let tui = signed_in(false);
        let mut state = PasswordState::default();
        state.fields[0].set("old-secret");
        state.fields[1].set("new-secret");
        state.fields[2].set("new-secret");
        let update = enter(&mut state, &tui);
        assert!(matches!(
            update.effects.as_slice(),
            [UiEffect::ChangePassword(change)] if change.new_password == "new-secret"
        ));
    }
}
