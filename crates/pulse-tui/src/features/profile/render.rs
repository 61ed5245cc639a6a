use pulse_core::calendar;
use pulse_core::models::ParticipationStatus;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::common::truncate_with_ellipsis;
use crate::features::events::render_placeholder;
use crate::state::TuiState;

fn label(text: &'static str) -> Span<'static> {
    Span::styled(format!("{text:<16}"), Style::default().fg(Color::Gray))
}

fn render_account(tui: &TuiState, frame: &mut Frame, area: Rect) {
    let Some(user) = &tui.session.user else {
        return;
    };
    let on_off = if user.notifications_enabled {
        Span::styled("on", Style::default().fg(Color::Green))
    } else {
        Span::styled("off", Style::default().fg(Color::DarkGray))
    };
    let mut lines = vec![
        Line::from(vec![
            label("Username"),
            Span::styled(user.username.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(vec![label("Email"), Span::raw(user.email.clone())]),
        Line::from(vec![label("Notifications"), on_off]),
    ];
    if user.is_admin {
        lines.push(Line::from(vec![
            label("Role"),
            Span::styled("administrator", Style::default().fg(Color::Magenta)),
        ]));
    }
    if let Some(avatar) = &user.avatar_url {
        lines.push(Line::from(vec![label("Avatar"), Span::raw(avatar.clone())]));
    }
    let counts = tui.counts.data;
    lines.push(Line::default());
    lines.push(Line::from(vec![
        label("Participated"),
        Span::raw(counts.total_participated.to_string()),
    ]));
    lines.push(Line::from(vec![
        label("Attended"),
        Span::raw(counts.attended_events.to_string()),
    ]));
    frame.render_widget(Paragraph::new(lines), area);
}

fn status_tabs(current: ParticipationStatus) -> Line<'static> {
    let tabs = [
        (ParticipationStatus::Upcoming, "Upcoming"),
        (ParticipationStatus::Past, "Past"),
        (ParticipationStatus::All, "All"),
    ];
    let mut spans = vec![Span::raw(" ")];
    for (status, name) in tabs {
        let style = if status == current {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {name} "), style));
    }
    Line::from(spans)
}

fn render_participations(tui: &TuiState, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::TOP)
        .title(status_tabs(tui.participation_status))
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let participations = &tui.participations;
    if participations.data.is_empty() {
        let text = if participations.is_loading {
            "Loading…"
        } else if let Some(error) = &participations.error {
            error.as_str()
        } else {
            "No participations"
        };
        render_placeholder(frame, inner, text);
        return;
    }

    let width = inner.width as usize;
    let lines: Vec<Line<'static>> = participations
        .data
        .iter()
        .map(|p| {
            let when = calendar::format_range(p.event_start_datetime, p.event_end_datetime, tui.offset);
            let attended = if p.attended {
                Span::styled(" attended", Style::default().fg(Color::Green))
            } else {
                Span::raw("")
            };
            Line::from(vec![
                Span::styled(
                    truncate_with_ellipsis(&p.event_title, width.saturating_sub(40).max(10)),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!("  {when} · {}", p.role_name), Style::default().fg(Color::Gray)),
                attended,
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

pub fn render(tui: &TuiState, frame: &mut Frame, area: Rect) {
    if tui.session.is_loading {
        render_placeholder(frame, area, "Checking your session…");
        return;
    }
    if !tui.is_authenticated() {
        render_placeholder(frame, area, "Sign in to see your profile (press L)");
        return;
    }
    let [account, list] = Layout::vertical([Constraint::Length(9), Constraint::Min(1)]).areas(area);
    render_account(tui, frame, account);
    render_participations(tui, frame, list);
}
