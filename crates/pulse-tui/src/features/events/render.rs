use pulse_core::calendar;
use pulse_core::models::Event;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::common::{truncate_with_ellipsis, text::truncate_start};
use crate::state::{Screen, TuiState};

/// Search box plus the active filter count.
pub fn render_search_bar(tui: &TuiState, frame: &mut Frame, area: Rect) {
    let label_style = if tui.search_focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let filters = tui.feed.query().filters.active_count();
    let suffix = if filters > 0 {
        format!("  {filters} filter(s)")
    } else {
        String::new()
    };
    let room = (area.width as usize).saturating_sub(10 + suffix.chars().count());
    let mut spans = vec![
        Span::styled("Search: ", label_style),
        Span::raw(truncate_start(tui.search.value(), room)),
    ];
    if tui.search_focused {
        spans.push(Span::styled("█", Style::default().fg(Color::Yellow)));
    } else if tui.search.is_empty() {
        spans.push(Span::styled("press / to search", Style::default().fg(Color::DarkGray)));
    }
    spans.push(Span::styled(suffix, Style::default().fg(Color::Blue)));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn event_item(tui: &TuiState, event: &Event, width: usize) -> ListItem<'static> {
    let mut title = vec![Span::styled(
        truncate_with_ellipsis(&event.title, width.saturating_sub(4)),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if event.is_participating() {
        title.push(Span::styled(" ✓", Style::default().fg(Color::Green)));
    }
    let meta = format!(
        "{} · {} · {}",
        calendar::format_range(event.start_datetime, event.end_datetime, tui.offset),
        event.location_line(),
        event.event_type
    );
    ListItem::new(vec![
        Line::from(title),
        Line::from(Span::styled(
            truncate_with_ellipsis(&meta, width),
            Style::default().fg(Color::Gray),
        )),
    ])
}

/// Dimmed one-line message in place of a list.
pub fn render_placeholder(frame: &mut Frame, area: Rect, text: &str) {
    frame.render_widget(
        Paragraph::new(Span::styled(
            text.to_string(),
            Style::default().fg(Color::DarkGray),
        )),
        area,
    );
}

pub fn render(tui: &TuiState, frame: &mut Frame, area: Rect) {
    let [search, list] = Layout::vertical([Constraint::Length(2), Constraint::Min(1)]).areas(area);
    render_search_bar(tui, frame, search);

    let title = if tui.screen == Screen::Archive {
        " Archived events "
    } else {
        " Events "
    };
    let block = Block::default()
        .borders(Borders::TOP)
        .title(title)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(list);
    frame.render_widget(block, list);

    let events = tui.events();
    let resource = &tui.feed.resource;
    if events.is_empty() {
        let text = if resource.is_loading {
            "Loading events…"
        } else if let Some(error) = &resource.error {
            error.as_str()
        } else if tui.feed.query().filters.is_empty() && tui.feed.query().search.is_empty() {
            "No events yet"
        } else {
            "No events match the filters (x to reset)"
        };
        render_placeholder(frame, inner, text);
        return;
    }

    let width = inner.width as usize;
    let items: Vec<ListItem<'static>> = events
        .iter()
        .map(|event| event_item(tui, event, width))
        .collect();
    let mut state = ListState::default().with_selected(Some(tui.selected));
    frame.render_stateful_widget(
        List::new(items)
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("▌"),
        inner,
        &mut state,
    );
}
