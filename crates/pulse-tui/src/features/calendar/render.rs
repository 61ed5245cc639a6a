use chrono::{Datelike, NaiveDate, Utc};
use pulse_core::calendar;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::common::truncate_with_ellipsis;
use crate::features::events::{render_placeholder, render_search_bar};
use crate::state::TuiState;

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const CELL_WIDTH: usize = 6;

fn day_cell(tui: &TuiState, day: NaiveDate, today: NaiveDate) -> Span<'static> {
    let count = tui.month_view().events_on(tui.events(), day).len();
    let marker = match count {
        0 => "  ",
        1 => " •",
        _ => " ‣",
    };
    let text = format!("{:>2}{marker}", day.day());
    let mut style = Style::default();
    if !tui.cursor.month.contains(day) {
        style = style.fg(Color::DarkGray);
    } else if calendar::is_weekend(day) {
        style = style.fg(Color::LightRed);
    }
    if count > 0 && tui.cursor.month.contains(day) {
        style = style.add_modifier(Modifier::BOLD);
    }
    if day == today {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if day == tui.cursor.day {
        style = style.bg(Color::Blue).fg(Color::White);
    }
    Span::styled(format!("{text:<CELL_WIDTH$}"), style)
}

fn render_grid(tui: &TuiState, frame: &mut Frame, area: Rect) {
    let today = calendar::local_date(Utc::now(), tui.offset);
    let mut lines = vec![
        Line::from(Span::styled(
            tui.cursor.month.label(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(
            WEEKDAYS
                .iter()
                .map(|d| Span::styled(format!("{d:<CELL_WIDTH$}"), Style::default().fg(Color::Gray)))
                .collect::<Vec<_>>(),
        ),
    ];
    for week in tui.cursor.month.weeks() {
        lines.push(Line::from(
            week.iter()
                .map(|day| day_cell(tui, *day, today))
                .collect::<Vec<_>>(),
        ));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_day(tui: &TuiState, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::LEFT)
        .title(format!(" {} ", tui.cursor.day.format("%-d %B %Y")))
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let events = tui.day_events();
    if events.is_empty() {
        let text = if tui.feed.resource.is_loading {
            "Loading events…"
        } else {
            "Nothing on this day"
        };
        render_placeholder(frame, inner, text);
        return;
    }

    let width = inner.width as usize;
    let mut lines = Vec::new();
    for (i, event) in events.iter().enumerate() {
        let selected = i == tui.cursor.event;
        let style = if selected {
            Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        let time = event
            .start_datetime
            .with_timezone(&tui.offset)
            .format("%H:%M")
            .to_string();
        lines.push(Line::from(vec![
            Span::styled(format!("{time} "), Style::default().fg(Color::Cyan)),
            Span::styled(truncate_with_ellipsis(&event.title, width.saturating_sub(6)), style),
        ]));
        lines.push(Line::from(Span::styled(
            format!("      {}", truncate_with_ellipsis(&event.location_line(), width.saturating_sub(6))),
            Style::default().fg(Color::Gray),
        )));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

pub fn render(tui: &TuiState, frame: &mut Frame, area: Rect) {
    let [search, body] = Layout::vertical([Constraint::Length(2), Constraint::Min(1)]).areas(area);
    render_search_bar(tui, frame, search);

    let grid_width = (CELL_WIDTH * 7 + 2) as u16;
    let [grid, day] =
        Layout::horizontal([Constraint::Length(grid_width), Constraint::Min(20)]).areas(body);
    render_grid(tui, frame, grid);
    render_day(tui, frame, day);
}
