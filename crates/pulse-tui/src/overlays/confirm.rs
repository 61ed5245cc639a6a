use crossterm::event::{KeyCode, KeyEvent};
use pulse_core::models::Event;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

use super::OverlayUpdate;
use super::render_utils::{InputHint, OverlayConfig, render_overlay, status_line};
use crate::effects::UiEffect;
use crate::state::{EventCommand, PendingAction, TuiState};

#[derive(Debug, Clone)]
pub struct ConfirmState {
    pub command: EventCommand,
    pub event: Event,
    pub error: Option<String>,
}

impl ConfirmState {
    pub fn new(command: EventCommand, event: Event) -> Self {
        Self {
            command,
            event,
            error: None,
        }
    }

    pub fn handle_key(&mut self, tui: &TuiState, key: KeyEvent) -> OverlayUpdate {
        match key.code {
            KeyCode::Esc | KeyCode::Char('n') => OverlayUpdate::close(),
            KeyCode::Enter | KeyCode::Char('y') if !tui.is_busy() => OverlayUpdate::stay().submit(
                PendingAction::EventCommand(self.command),
                UiEffect::RunEventCommand {
                    command: self.command,
                    id: self.event.id,
                },
            ),
            _ => OverlayUpdate::stay(),
        }
    }

    pub fn render(&self, tui: &TuiState, frame: &mut Frame, area: Rect) {
        let hints = [InputHint::new("y", "confirm"), InputHint::new("n", "cancel")];
        let destructive = matches!(
            self.command,
            EventCommand::HardDelete | EventCommand::DeleteImage
        );
        let layout = render_overlay(
            frame,
            area,
            &OverlayConfig {
                title: self.command.verb(),
                border_color: if destructive { Color::Red } else { Color::Yellow },
                width: 56,
                height: 8,
                hints: &hints,
            },
        );
        let lines = vec![
            Line::from(self.command.question()),
            Line::from(Span::styled(
                self.event.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            status_line(self.error.as_deref(), tui.is_busy()),
        ];
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), layout.body);
    }
}
