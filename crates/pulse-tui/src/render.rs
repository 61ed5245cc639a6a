//! Pure view/render functions for the TUI.
//!
//! Functions here take `&AppState`, draw to a ratatui `Frame`, and never
//! mutate state or return effects.

use pulse_core::ToastLevel;
use pulse_core::push::ChannelState;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::common::truncate_with_ellipsis;
use crate::features::{calendar, events, profile};
use crate::state::{AppState, Banner, Screen, TuiState};

const HEADER_HEIGHT: u16 = 1;
const TABS_HEIGHT: u16 = 1;
const FOOTER_HEIGHT: u16 = 1;
const TOAST_WIDTH: u16 = 48;
const BANNER_HEIGHT: u16 = 4;

/// Renders the entire TUI to the frame.
pub fn render(app: &AppState, frame: &mut Frame) {
    let area = frame.area();
    let tui = &app.tui;

    let [header, tabs, body, footer] = Layout::vertical([
        Constraint::Length(HEADER_HEIGHT),
        Constraint::Length(TABS_HEIGHT),
        Constraint::Min(3),
        Constraint::Length(FOOTER_HEIGHT),
    ])
    .areas(area);

    render_header(tui, frame, header);
    render_tabs(tui, frame, tabs);
    let body = Rect::new(
        body.x + 1,
        body.y,
        body.width.saturating_sub(2),
        body.height,
    );
    match tui.screen {
        Screen::Events | Screen::Archive => events::render(tui, frame, body),
        Screen::Calendar => calendar::render(tui, frame, body),
        Screen::Profile => profile::render(tui, frame, body),
    }
    render_footer(tui, frame, footer);

    if let Some(banner) = &tui.banner {
        render_banner(banner, frame, body);
    }
    if let Some(overlay) = &app.overlay {
        overlay.render(tui, frame, area);
    }
    render_toasts(tui, frame, area);
}

fn channel_style(state: ChannelState) -> Style {
    match state {
        ChannelState::Authenticated => Style::default().fg(Color::Green),
        ChannelState::Connecting | ChannelState::Connected => Style::default().fg(Color::Yellow),
        ChannelState::Disconnected => Style::default().fg(Color::DarkGray),
    }
}

fn render_header(tui: &TuiState, frame: &mut Frame, area: Rect) {
    let [left_area, right_area] =
        Layout::horizontal([Constraint::Fill(1), Constraint::Fill(1)]).areas(area);
    let left = Line::from(vec![
        Span::styled(
            " KemSU Pulse ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled("●", channel_style(tui.channel)),
        Span::styled(format!(" {}", tui.channel.label()), Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(left), left_area);

    let mut right = Vec::new();
    if tui.session.is_loading {
        right.push(Span::styled("checking session… ", Style::default().fg(Color::DarkGray)));
    } else if let Some(user) = &tui.session.user {
        let unread = tui.unread_notifications();
        if unread > 0 {
            right.push(Span::styled(
                format!("🔔 {unread}  "),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ));
        }
        right.push(Span::styled(
            user.username.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        if user.is_admin {
            right.push(Span::styled(" (admin)", Style::default().fg(Color::Magenta)));
        }
        right.push(Span::raw(" "));
    } else {
        right.push(Span::styled("not signed in ", Style::default().fg(Color::DarkGray)));
    }
    frame.render_widget(
        Paragraph::new(Line::from(right)).alignment(Alignment::Right),
        right_area,
    );
}

fn render_tabs(tui: &TuiState, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for (i, screen) in Screen::ALL.iter().enumerate() {
        let style = if *screen == tui.screen {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!("{} {}", i + 1, screen.title()), style));
        spans.push(Span::raw("   "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn footer_hints(tui: &TuiState) -> Vec<(&'static str, &'static str)> {
    if tui.search_focused {
        return vec![("Enter", "search now"), ("Esc", "done")];
    }
    let mut hints = match tui.screen {
        Screen::Events | Screen::Archive => vec![
            ("↑/↓", "move"),
            ("Enter", "open"),
            ("/", "search"),
            ("f", "filters"),
            ("x", "reset"),
        ],
        Screen::Calendar => vec![
            ("←↑↓→", "day"),
            ("</>", "month"),
            ("[/]", "event"),
            ("Enter", "open"),
            ("e", "export"),
        ],
        Screen::Profile if tui.is_authenticated() => vec![
            ("s", "status"),
            ("N", "notifications on/off"),
            ("e", "edit"),
            ("w", "password"),
        ],
        Screen::Profile => vec![],
    };
    if tui.is_admin() && matches!(tui.screen, Screen::Events | Screen::Calendar) {
        hints.push(("c", "create"));
    }
    if tui.banner.as_ref().is_some_and(|b| b.notice.event_id.is_some()) {
        hints.push(("o", "open notice"));
    }
    if tui.is_authenticated() {
        hints.push(("n", "inbox"));
        hints.push(("L", "sign out"));
    } else {
        hints.push(("L", "sign in"));
        hints.push(("R", "register"));
    }
    hints.push(("q", "quit"));
    hints
}

fn render_footer(tui: &TuiState, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for (i, (key, action)) in footer_hints(tui).into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" • ", Style::default().fg(Color::DarkGray)));
        }
        spans.push(Span::styled(key, Style::default().fg(Color::Cyan)));
        spans.push(Span::styled(format!(" {action}"), Style::default().fg(Color::DarkGray)));
    }
    if tui.is_busy() {
        spans.push(Span::styled(
            "   working…",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_banner(banner: &Banner, frame: &mut Frame, body: Rect) {
    let width = body.width.min(72);
    let area = Rect::new(
        body.x + body.width.saturating_sub(width),
        body.y,
        width,
        BANNER_HEIGHT.min(body.height),
    );
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            format!(" {} ", banner.notice.title),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    let mut lines = vec![Line::from(banner.notice.message.clone())];
    if banner.notice.event_id.is_some() {
        lines.push(Line::from(Span::styled(
            "press o to open",
            Style::default().fg(Color::DarkGray),
        )));
    }
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

fn toast_color(level: ToastLevel) -> Color {
    match level {
        ToastLevel::Info => Color::Cyan,
        ToastLevel::Success => Color::Green,
        ToastLevel::Warning => Color::Yellow,
        ToastLevel::Error => Color::Red,
    }
}

/// Newest toast at the bottom right, older ones stacked above it.
fn render_toasts(tui: &TuiState, frame: &mut Frame, area: Rect) {
    let width = TOAST_WIDTH.min(area.width.saturating_sub(2));
    let text_width = width.saturating_sub(4) as usize;
    let mut bottom = area.y + area.height.saturating_sub(FOOTER_HEIGHT);
    for entry in tui.toasts.iter().rev() {
        let height = 3;
        if bottom < area.y + height {
            break;
        }
        bottom -= height;
        let rect = Rect::new(area.x + area.width.saturating_sub(width + 1), bottom, width, height);
        let color = toast_color(entry.toast.level);
        frame.render_widget(Clear, rect);
        frame.render_widget(
            Paragraph::new(Span::raw(truncate_with_ellipsis(&entry.toast.message, text_width))).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color))
                    .title(Span::styled(
                        format!(" {} ", entry.toast.level.label()),
                        Style::default().fg(color),
                    )),
            ),
            rect,
        );
    }
}

#[cfg(test)]
mod tests {
    use pulse_core::Toast;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::overlays::{AuthMode, AuthState, Overlay};
    use crate::test_support::{app, event, session};

    fn draw(app: &AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_header_shows_user_and_channel() {
        let mut app = app();
        app.tui.session = session(true);
        app.tui.channel = ChannelState::Authenticated;
        let screen = draw(&app);
        assert!(screen.contains("alice"));
        assert!(screen.contains("(admin)"));
        assert!(screen.contains("live"));
    }

    #[test]
    fn test_events_list_and_toast_render() {
        let mut app = app();
        let ticket = app.tui.feed.refetch();
        app.tui.feed.complete(ticket, Ok(vec![event(1, "Весенний бал")]));
        app.tui.push_toast(Toast::new(ToastLevel::Success, "Saved"));
        let screen = draw(&app);
        assert!(screen.contains("Весенний бал"));
        assert!(screen.contains("Saved"));
    }

    #[test]
    fn test_overlay_renders_on_top() {
        let mut app = app();
        app.overlay = Some(Overlay::Auth(AuthState::new(AuthMode::Login)));
        assert!(draw(&app).contains("Sign in"));
    }
}
