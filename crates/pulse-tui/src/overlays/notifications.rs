//! Notification list.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{List, ListItem, ListState, Paragraph};

use super::OverlayUpdate;
use super::render_utils::{InputHint, OverlayConfig, render_overlay};
use crate::common::truncate_with_ellipsis;
use crate::effects::UiEffect;
use crate::mutations::StateMutation;
use crate::state::{PendingAction, TuiState};

#[derive(Debug, Clone, Default)]
pub struct NotificationsState {
    pub selected: usize,
}

impl NotificationsState {
    pub fn handle_key(&mut self, tui: &TuiState, key: KeyEvent) -> OverlayUpdate {
        let notifications = &tui.notifications.data;
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => OverlayUpdate::close(),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < notifications.len() {
                    self.selected += 1;
                }
                OverlayUpdate::stay()
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                OverlayUpdate::stay()
            }
            KeyCode::Char('a') if !tui.is_busy() && tui.unread_notifications() > 0 => {
                OverlayUpdate::stay().submit(
                    PendingAction::Notifications,
                    UiEffect::MarkAllNotificationsRead,
                )
            }
            KeyCode::Enter => {
                let Some(notification) = notifications.get(self.selected) else {
                    return OverlayUpdate::stay();
                };
                let mut effects = Vec::new();
                if !notification.is_read {
                    effects.push(UiEffect::MarkNotificationRead {
                        id: notification.id,
                    });
                }
                match notification.event_id {
                    Some(id) => OverlayUpdate::close()
                        .with_mutations(vec![StateMutation::OpenEvent(id)])
                        .with_effects(effects),
                    None => OverlayUpdate::stay().with_effects(effects),
                }
            }
            _ => OverlayUpdate::stay(),
        }
    }

    pub fn render(&self, tui: &TuiState, frame: &mut Frame, area: Rect) {
        let hints = [
            InputHint::new("Enter", "open"),
            InputHint::new("a", "mark all read"),
            InputHint::new("Esc", "close"),
        ];
        let title = format!("Notifications ({} unread)", tui.unread_notifications());
        let layout = render_overlay(
            frame,
            area,
            &OverlayConfig {
                title: &title,
                border_color: Color::Yellow,
                width: 80,
                height: 20,
                hints: &hints,
            },
        );

        let notifications = &tui.notifications.data;
        if notifications.is_empty() {
            let text = if tui.notifications.is_loading {
                "Loading…"
            } else {
                "No notifications yet"
            };
            frame.render_widget(
                Paragraph::new(Span::styled(
                    text,
                    Style::default().fg(Color::DarkGray),
                )),
                layout.body,
            );
            return;
        }

        let width = layout.body.width as usize;
        let items: Vec<ListItem<'_>> = notifications
            .iter()
            .map(|n| {
                let style = if n.is_read {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default().add_modifier(Modifier::BOLD)
                };
                let when = n.created_at.with_timezone(&tui.offset).format("%d.%m %H:%M");
                let marker = if n.is_read { "  " } else { "● " };
                let mut lines = vec![Line::from(vec![
                    Span::styled(marker, Style::default().fg(Color::Yellow)),
                    Span::styled(format!("{when}  "), Style::default().fg(Color::Gray)),
                    Span::styled(truncate_with_ellipsis(&n.message, width.saturating_sub(16)), style),
                ])];
                if let Some(title) = &n.event_title {
                    lines.push(Line::from(Span::styled(
                        format!("    {}", truncate_with_ellipsis(title, width.saturating_sub(4))),
                        Style::default().fg(Color::Magenta),
                    )));
                }
                ListItem::new(lines)
            })
            .collect();
        let mut list_state = ListState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(
            List::new(items).highlight_style(Style::default().bg(Color::DarkGray)),
            layout.body,
            &mut list_state,
        );
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;

    use super::*;
    use crate::overlays::OverlayTransition;
    use crate::test_support::{notification, signed_in};

    fn press(state: &mut NotificationsState, tui: &TuiState, code: KeyCode) -> OverlayUpdate {
        state.handle_key(tui, KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_enter_marks_read_and_opens_event() {
        let mut tui = signed_in(false);
        tui.notifications.data = vec![notification(1, None, true), notification(2, Some(9), false)];
        let mut state = NotificationsState::default();
        press(&mut state, &tui, KeyCode::Down);
        let update = press(&mut state, &tui, KeyCode::Enter);
        assert!(matches!(update.transition, OverlayTransition::Close));
        assert_eq!(update.mutations, vec![StateMutation::OpenEvent(9)]);
        assert!(matches!(
            update.effects.as_slice(),
            [UiEffect::MarkNotificationRead { id: 2 }]
        ));
    }

    #[test]
    fn test_mark_all_needs_unread() {
        let mut tui = signed_in(false);
        tui.notifications.data = vec![notification(1, None, true)];
        let mut state = NotificationsState::default();
        assert!(press(&mut state, &tui, KeyCode::Char('a')).effects.is_empty());

        tui.notifications.data.push(notification(2, None, false));
        let update = press(&mut state, &tui, KeyCode::Char('a'));
        assert!(matches!(
            update.effects.as_slice(),
            [UiEffect::MarkAllNotificationsRead]
        ));
    }
}
