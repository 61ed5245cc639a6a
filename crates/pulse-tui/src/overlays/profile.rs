//! Edit profile: username, email and avatar.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent};
use pulse_core::SessionSnapshot;
use pulse_core::models::ProfileUpdate;
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

const FIELDS: usize = 3;

#[derive(Debug, Clone)]
pub struct ProfileState {
    pub username: TextField,
    pub email: TextField,
    pub avatar: TextField,
    original_username: String,
    original_email: String,
    pub focus: usize,
    pub error: Option<String>,
}

impl ProfileState {
    pub fn new(session: &SessionSnapshot) -> Self {
        let (username, email) = session
            .user
            .as_ref()
            .map(|u| (u.username.clone(), u.email.clone()))
            .unwrap_or_default();
        Self {
            username: TextField::new(username.clone()),
            email: TextField::new(email.clone()),
            avatar: TextField::default(),
            original_username: username,
            original_email: email,
            focus: 0,
            error: None,
        }
    }

    pub fn focused_field(&mut self) -> &mut TextField {
        match self.focus {
            0 => &mut self.username,
            1 => &mut self.email,
            _ => &mut self.avatar,
        }
    }

    /// Only changed fields are sent.
    fn update(&self) -> Result<(ProfileUpdate, Option<PathBuf>), &'static str> {
        let username = self.username.trimmed();
        let email = self.email.trimmed();
        if username.is_empty() || email.is_empty() {
            return Err("Username and email cannot be empty");
        }
        if !email.contains('@') {
            return Err("Enter a valid email address");
        }
        let profile = ProfileUpdate {
            username: (username != self.original_username).then(|| username.to_string()),
            email: (email != self.original_email).then(|| email.to_string()),
        };
        let avatar = self.avatar.optional().map(PathBuf::from);
        if profile == ProfileUpdate::default() && avatar.is_none() {
            return Err("Nothing to save");
        }
        Ok((profile, avatar))
    }

    pub fn handle_key(&mut self, tui: &TuiState, key: KeyEvent) -> OverlayUpdate {
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
            KeyCode::Enter if !tui.is_busy() => match self.update() {
                Ok((profile, avatar)) => {
                    self.error = None;
                    OverlayUpdate::stay().submit(
                        PendingAction::Profile,
                        UiEffect::UpdateProfile { profile, avatar },
                    )
                }
                Err(message) => {
                    self.error = Some(message.to_string());
                    OverlayUpdate::stay()
                }
            },
            _ => {
                self.error = None;
                self.focused_field().handle_key(key);
                OverlayUpdate::stay()
            }
        }
    }

    pub fn render(&self, tui: &TuiState, frame: &mut Frame, area: Rect) {
        let hints = [
            InputHint::new("Enter", "save"),
            InputHint::new("Tab", "next"),
            InputHint::new("Esc", "cancel"),
        ];
        let layout = render_overlay(
            frame,
            area,
            &OverlayConfig {
                title: "Edit profile",
                border_color: Color::Cyan,
                width: 64,
                height: 10,
                hints: &hints,
            },
        );
        let rows = [
            ("Username", self.username.display()),
            ("Email", self.email.display()),
            ("Avatar file", self.avatar.display()),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (label, value))| FormRow {
            label,
            value,
            focused: i == self.focus,
            error: None,
        })
        .collect::<Vec<_>>();
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
    use crate::test_support::{session, signed_in};

    fn enter(state: &mut ProfileState, tui: &TuiState) -> OverlayUpdate {
        state.handle_key(tui, KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))
    }

    #[test]
    fn test_only_changed_fields_are_sent() {
        let tui = signed_in(false);
        let mut state = ProfileState::new(&session(false));
        state.username.set("alice2");
        let update = enter(&mut state, &tui);
        assert!(matches!(
            update.effects.as_slice(),
            [UiEffect::UpdateProfile { profile, avatar: None }]
                if profile.username.as_deref() == Some("alice2") && profile.email.is_none()
        ));
    }

    #[test]
    fn test_unchanged_profile_is_not_sent() {
        let tui = signed_in(false);
        let mut state = ProfileState::new(&session(false));
        assert!(enter(&mut state, &tui).effects.is_empty());
        assert_eq!(state.error.as_deref(), Some("Nothing to save"));
    }

    #[test]
    fn test_avatar_alone_is_enough() {
        let tui = signed_in(false);
        let mut state = ProfileState::new(&session(false));
        state.avatar.set("me.png");
        let update = enter(&mut state, &tui);
        assert!(matches!(
            update.effects.as_slice(),
            [UiEffect::UpdateProfile { avatar: Some(_), .. }]
        ));
    }
}
