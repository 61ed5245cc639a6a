use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::common::text::truncate_start;

/// Centers a `width` x `height` box in `area`, shrinking it to fit.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    )
}

pub struct OverlayConfig<'a> {
    pub title: &'a str,
    pub border_color: Color,
    pub width: u16,
    pub height: u16,
    pub hints: &'a [InputHint<'a>],
}

pub struct OverlayLayout {
    pub body: Rect,
}

/// Clears a centered box, draws its border and hints, and returns the body area.
pub fn render_overlay(frame: &mut Frame, area: Rect, config: &OverlayConfig<'_>) -> OverlayLayout {
    let popup = centered(area, config.width, config.height);
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(config.border_color))
            .title(format!(" {} ", config.title))
            .title_style(
                Style::default()
                    .fg(config.border_color)
                    .add_modifier(Modifier::BOLD),
            ),
        popup,
    );

    let inner = Rect::new(
        popup.x + 1,
        popup.y + 1,
        popup.width.saturating_sub(2),
        popup.height.saturating_sub(2),
    );
    let footer = u16::from(!config.hints.is_empty());
    if footer > 0 {
        render_hints(frame, inner, config.hints, config.border_color);
    }
    OverlayLayout {
        body: Rect::new(inner.x, inner.y, inner.width, inner.height.saturating_sub(footer)),
    }
}

pub struct InputHint<'a> {
    pub key: &'a str,
    pub action: &'a str,
}

impl<'a> InputHint<'a> {
    pub fn new(key: &'a str, action: &'a str) -> Self {
        Self { key, action }
    }
}

fn render_hints(frame: &mut Frame, area: Rect, hints: &[InputHint<'_>], color: Color) {
    let mut spans = Vec::new();
    for (i, hint) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" • ", Style::default().fg(Color::DarkGray)));
        }
        spans.push(Span::styled(hint.key, Style::default().fg(color)));
        spans.push(Span::styled(
            format!(" {}", hint.action),
            Style::default().fg(Color::DarkGray),
        ));
    }
    let y = area.y + area.height.saturating_sub(1);
    frame.render_widget(
        Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
        Rect::new(area.x, y, area.width, 1),
    );
}

/// One labelled form row: `Label  value█` with an optional error under it.
pub struct FormRow<'a> {
    pub label: &'a str,
    pub value: String,
    pub focused: bool,
    pub error: Option<&'a str>,
}

/// Renders form rows top to bottom and returns the lines used.
pub fn form_lines(rows: &[FormRow<'_>], width: u16) -> Vec<Line<'static>> {
    let label_width = rows.iter().map(|r| r.label.chars().count()).max().unwrap_or(0) + 2;
    aligned_form_lines(rows, label_width, width)
}

/// Like [`form_lines`], with a fixed label column.
pub fn aligned_form_lines(rows: &[FormRow<'_>], label_width: usize, width: u16) -> Vec<Line<'static>> {
    let value_width = (width as usize).saturating_sub(label_width + 1);
    let mut lines = Vec::new();
    for row in rows {
        let label_style = if row.focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let mut spans = vec![
            Span::styled(format!("{:<label_width$}", row.label), label_style),
            Span::raw(truncate_start(&row.value, value_width)),
        ];
        if row.focused {
            spans.push(Span::styled("█", Style::default().fg(Color::Yellow)));
        }
        lines.push(Line::from(spans));
        if let Some(error) = row.error {
            lines.push(Line::from(Span::styled(
                format!("{:label_width$}{error}", ""),
                Style::default().fg(Color::Red),
            )));
        }
    }
    lines
}

/// Status line at the bottom of a form: error, busy marker, or nothing.
pub fn status_line(error: Option<&str>, busy: bool) -> Line<'static> {
    if busy {
        Line::from(Span::styled(
            "Working…",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
    } else if let Some(error) = error {
        Line::from(Span::styled(error.to_string(), Style::default().fg(Color::Red)))
    } else {
        Line::default()
    }
}
