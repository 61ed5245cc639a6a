//! Full view of one event, with participation and admin commands.

use crossterm::event::{KeyCode, KeyEvent};
use pulse_core::actions::EventActions;
use pulse_core::calendar;
use pulse_core::models::{Event, ParticipantRole};
use pulse_core::resources::EventsFeed;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

use super::render_utils::{InputHint, OverlayConfig, render_overlay};
use super::{AuthMode, OverlayRequest, OverlayUpdate};
use crate::effects::UiEffect;
use crate::state::{EventCommand, PendingAction, TuiState};

#[derive(Debug, Clone)]
pub struct DetailState {
    pub event: Event,
    pub scroll: u16,
}

impl DetailState {
    pub fn new(event: Event) -> Self {
        Self { event, scroll: 0 }
    }

    /// Picks up the reloaded copy of the event, if the feed still has it.
    pub fn refresh(&mut self, feed: &EventsFeed) {
        if let Some(event) = feed.find(self.event.id) {
            self.event = event.clone();
        }
    }

    fn confirm(&self, command: EventCommand) -> OverlayUpdate {
        OverlayUpdate::open(OverlayRequest::Confirm {
            command,
            event: Box::new(self.event.clone()),
        })
    }

    pub fn handle_key(&mut self, tui: &TuiState, key: KeyEvent) -> OverlayUpdate {
        let admin = tui.is_admin();
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => OverlayUpdate::close(),
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll = self.scroll.saturating_add(1);
                OverlayUpdate::stay()
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                OverlayUpdate::stay()
            }
            KeyCode::Char('p') if !tui.is_authenticated() => {
                OverlayUpdate::open(OverlayRequest::Auth(AuthMode::Login))
            }
            KeyCode::Char('p') if !admin && !self.event.is_archived && !tui.is_busy() => {
                OverlayUpdate::stay().submit(
                    PendingAction::Participation(self.event.id),
                    UiEffect::ToggleParticipation {
                        event: Box::new(self.event.clone()),
                    },
                )
            }
            KeyCode::Char('e') if admin && !self.event.is_archived => {
                OverlayUpdate::open(OverlayRequest::EditEvent(Box::new(self.event.clone())))
            }
            KeyCode::Char('a') if admin => self.confirm(if self.event.is_archived {
                EventCommand::Restore
            } else {
                EventCommand::Archive
            }),
            KeyCode::Char('d') if admin && EventActions::can_hard_delete(&self.event) => {
                self.confirm(EventCommand::HardDelete)
            }
            KeyCode::Char('i') if admin && self.event.image_url.is_some() => {
                self.confirm(EventCommand::DeleteImage)
            }
            KeyCode::Char(c @ '1'..='3') => {
                let index = c as usize - '1' as usize;
                let link = ParticipantRole::all()
                    .get(index)
                    .and_then(|role| self.event.registration_link(*role));
                match link {
                    Some(url) => OverlayUpdate::stay().with_effects(vec![UiEffect::OpenUrl {
                        url: url.to_string(),
                    }]),
                    None => OverlayUpdate::stay(),
                }
            }
            _ => OverlayUpdate::stay(),
        }
    }

    fn hints(&self, tui: &TuiState) -> Vec<InputHint<'static>> {
        let mut hints = Vec::new();
        if !self.event.is_archived && !tui.is_admin() {
            let verb = if !tui.is_authenticated() {
                "sign in to join"
            } else if self.event.is_participating() {
                "leave"
            } else {
                "join"
            };
            hints.push(InputHint::new("p", verb));
        }
        if tui.is_admin() {
            if !self.event.is_archived {
                hints.push(InputHint::new("e", "edit"));
                hints.push(InputHint::new("a", "archive"));
            } else {
                hints.push(InputHint::new("a", "restore"));
                hints.push(InputHint::new("d", "delete"));
            }
            if self.event.image_url.is_some() {
                hints.push(InputHint::new("i", "remove image"));
            }
        }
        hints.push(InputHint::new("1-3", "register link"));
        hints.push(InputHint::new("Esc", "close"));
        hints
    }

    pub fn render(&self, tui: &TuiState, frame: &mut Frame, area: Rect) {
        let hints = self.hints(tui);
        let layout = render_overlay(
            frame,
            area,
            &OverlayConfig {
                title: &self.event.title,
                border_color: Color::Magenta,
                width: 84,
                height: 24,
                hints: &hints,
            },
        );

        let event = &self.event;
        let label = |text: &'static str| Span::styled(format!("{text:<10}"), Style::default().fg(Color::Gray));
        let mut lines = vec![
            Line::from(vec![
                label("When"),
                Span::raw(calendar::format_range(
                    event.start_datetime,
                    event.end_datetime,
                    tui.offset,
                )),
            ]),
            Line::from(vec![label("Where"), Span::raw(event.location_line())]),
            Line::from(vec![label("Type"), Span::raw(event.event_type.to_string())]),
            Line::from(vec![
                label("Roles"),
                Span::raw(
                    event
                        .roles_available
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", "),
                ),
            ]),
        ];
        if let Some(author) = &event.author_username {
            lines.push(Line::from(vec![label("Author"), Span::raw(author.clone())]));
        }
        if event.is_archived {
            lines.push(Line::from(Span::styled(
                "Archived",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        } else if event.is_participating() {
            lines.push(Line::from(Span::styled(
                "You are taking part",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )));
        }
        if let Some(image) = &event.image_url {
            lines.push(Line::from(vec![label("Image"), Span::raw(image.clone())]));
        }

        lines.push(Line::default());
        lines.extend(event.description.lines().map(|l| Line::from(l.to_string())));

        let links: Vec<Line<'static>> = ParticipantRole::all()
            .iter()
            .enumerate()
            .filter_map(|(i, role)| {
                event.registration_link(*role).map(|url| {
                    Line::from(vec![
                        Span::styled(format!("[{}] ", i + 1), Style::default().fg(Color::Magenta)),
                        Span::raw(format!("{role}: ")),
                        Span::styled(url.to_string(), Style::default().fg(Color::Blue)),
                    ])
                })
            })
            .collect();
        if !links.is_empty() {
            lines.push(Line::default());
            lines.extend(links);
        }

        frame.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .scroll((self.scroll, 0)),
            layout.body,
        );
    }
}
