//! Sign-in and registration.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pulse_core::models::{Credentials, Registration};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::text::Line;
use ratatui::widgets::{Paragraph, Wrap};

use super::render_utils::{FormRow, InputHint, OverlayConfig, form_lines, render_overlay, status_line};
use super::{OverlayUpdate, cycle};
use crate::common::TextField;
use crate::effects::UiEffect;
use crate::state::{PendingAction, TuiState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

#[derive(Debug, Clone)]
pub struct AuthState {
    pub mode: AuthMode,
    pub username: TextField,
    pub email: TextField,
    pub password: TextField,
    pub confirm: TextField,
    pub focus: usize,
    pub error: Option<String>,
}

impl AuthState {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            username: TextField::default(),
            email: TextField::default(),
            password: TextField::secret(),
            confirm: TextField::secret(),
            focus: 0,
            error: None,
        }
    }

    /// Switches to sign-in after a successful registration, keeping the email.
    pub fn registered(&mut self) {
        self.mode = AuthMode::Login;
        self.password.clear();
        self.confirm.clear();
        self.focus = 1;
        self.error = None;
    }

    fn field_count(&self) -> usize {
        match self.mode {
            AuthMode::Login => 2,
            AuthMode::Register => 4,
        }
    }

    pub fn focused_field(&mut self) -> &mut TextField {
        match (self.mode, self.focus) {
            (AuthMode::Login, 0) | (AuthMode::Register, 1) => &mut self.email,
            (AuthMode::Login, _) | (AuthMode::Register, 2) => &mut self.password,
            (AuthMode::Register, 0) => &mut self.username,
            (AuthMode::Register, _) => &mut self.confirm,
        }
    }

    pub fn handle_key(&mut self, tui: &TuiState, key: KeyEvent) -> OverlayUpdate {
        if !matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            self.error = None;
        }
        match key.code {
            KeyCode::Esc => OverlayUpdate::close(),
            KeyCode::Tab | KeyCode::Down => {
                self.focus = cycle(self.focus, self.field_count(), true);
                OverlayUpdate::stay()
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = cycle(self.focus, self.field_count(), false);
                OverlayUpdate::stay()
            }
            KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.mode = match self.mode {
                    AuthMode::Login => AuthMode::Register,
                    AuthMode::Register => AuthMode::Login,
                };
                self.focus = 0;
                OverlayUpdate::stay()
            }
            KeyCode::Enter => self.submit(tui),
            _ => {
                self.focused_field().handle_key(key);
                OverlayUpdate::stay()
            }
        }
    }

    fn submit(&mut self, tui: &TuiState) -> OverlayUpdate {
        if tui.is_busy() {
            return OverlayUpdate::stay();
        }
        match self.mode {
            AuthMode::Login => {
                if self.email.trimmed().is_empty() || self.password.is_empty() {
                    self.error = Some("Enter your email and password".to_string());
                    return OverlayUpdate::stay();
                }
                OverlayUpdate::stay().submit(
                    PendingAction::Login,
                    UiEffect::Login(Credentials {
                        email: self.email.trimmed().to_string(),
                        password: self.password.value().to_string(),
                    }),
                )
            }
            AuthMode::Register => {
                if let Some(error) = self.registration_error() {
                    self.error = Some(error.to_string());
                    return OverlayUpdate::stay();
                }
                OverlayUpdate::stay().submit(
                    PendingAction::Register,
                    UiEffect::Register(Registration {
                        username: self.username.trimmed().to_string(),
                        email: self.email.trimmed().to_string(),
                        password: self.password.value().to_string(),
                        confirm_password: self.confirm.value().to_string(),
                    }),
                )
            }
        }
    }

    fn registration_error(&self) -> Option<&'static str> {
        if self.username.trimmed().is_empty()
            || self.email.trimmed().is_empty()
            || self.password.is_empty()
        {
            Some("All fields are required")
        } else if !self.email.trimmed().contains('@') {
            Some("Enter a valid email address")
        } else if self.password.value() != self.confirm.value() {
            Some("Passwords do not match")
        } else {
            None
        }
    }

    pub fn render(&self, tui: &TuiState, frame: &mut Frame, area: Rect) {
        let (title, hints) = match self.mode {
            AuthMode::Login => (
                "Sign in",
                [
                    InputHint::new("Enter", "sign in"),
                    InputHint::new("Ctrl+T", "register"),
                    InputHint::new("Esc", "close"),
                ],
            ),
            AuthMode::Register => (
                "Create account",
                [
                    InputHint::new("Enter", "register"),
                    InputHint::new("Ctrl+T", "sign in"),
                    InputHint::new("Esc", "close"),
                ],
            ),
        };
        let layout = render_overlay(
            frame,
            area,
            &OverlayConfig {
                title,
                border_color: Color::Cyan,
                width: 60,
                height: 10,
                hints: &hints,
            },
        );

        let mut rows = Vec::new();
        if self.mode == AuthMode::Register {
            rows.push(("Username", self.username.display()));
        }
        rows.push(("Email", self.email.display()));
        rows.push(("Password", self.password.display()));
        if self.mode == AuthMode::Register {
            rows.push(("Confirm", self.confirm.display()));
        }
        let rows: Vec<FormRow<'_>> = rows
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
        lines.push(status_line(self.error.as_deref(), tui.is_busy()));
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), layout.body);
    }
}
