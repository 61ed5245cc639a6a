use crossterm::event::{KeyCode, KeyEvent};

use crate::effects::UiEffect;
use crate::features::{ScreenUpdate, events};
use crate::overlays::OverlayRequest;
use crate::state::{CalendarCursor, PendingAction, TuiState};

/// Exports the events visible in the cursor's month.
fn export(tui: &mut TuiState) -> ScreenUpdate {
    if tui.is_busy() {
        return ScreenUpdate::none();
    }
    let events: Vec<_> = tui
        .month_view()
        .visible(tui.events())
        .into_iter()
        .cloned()
        .collect();
    tui.pending_action = Some(PendingAction::Export);
    ScreenUpdate::effects(vec![UiEffect::ExportCalendar {
        month: tui.cursor.month,
        events,
    }])
}

pub fn handle_key(tui: &mut TuiState, key: KeyEvent) -> ScreenUpdate {
    if tui.search_focused {
        return events::handle_key(tui, key);
    }
    match key.code {
        KeyCode::Left | KeyCode::Char('h') => tui.cursor.move_days(-1),
        KeyCode::Right | KeyCode::Char('l') => tui.cursor.move_days(1),
        KeyCode::Up | KeyCode::Char('k') => tui.cursor.move_days(-7),
        KeyCode::Down | KeyCode::Char('j') => tui.cursor.move_days(7),
        KeyCode::PageUp | KeyCode::Char('<') => tui.cursor.prev_month(),
        KeyCode::PageDown | KeyCode::Char('>') => tui.cursor.next_month(),
        KeyCode::Char('t') => tui.cursor = CalendarCursor::today(tui.offset),
        KeyCode::Char(']') => {
            if tui.cursor.event + 1 < tui.day_events().len() {
                tui.cursor.event += 1;
            }
        }
        KeyCode::Char('[') => tui.cursor.event = tui.cursor.event.saturating_sub(1),
        KeyCode::Enter => {
            return match tui.calendar_event() {
                Some(event) => ScreenUpdate::open(OverlayRequest::Detail(Box::new(event.clone()))),
                None => ScreenUpdate::none(),
            };
        }
        KeyCode::Char('p') => {
            return match tui.calendar_event().cloned() {
                Some(event) => events::toggle_participation(tui, &event),
                None => ScreenUpdate::none(),
            };
        }
        KeyCode::Char('e') => return export(tui),
        KeyCode::Char('/' | 'f' | 'x' | 'c') => return events::handle_key(tui, key),
        _ => {}
    }
    ScreenUpdate::none()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use crossterm::event::KeyModifiers;
    use pulse_core::calendar::Month;

    use super::*;
    use crate::test_support::{event, tui};

    fn press(tui: &mut TuiState, code: KeyCode) -> ScreenUpdate {
        handle_key(tui, KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn on_may_14(tui: &mut TuiState) {
        let day = NaiveDate::from_ymd_opt(2025, 5, 14).unwrap();
        tui.cursor = CalendarCursor {
            month: Month::containing(day),
            day,
            event: 0,
        };
    }

    #[test]
    fn test_arrows_move_across_months() {
        let mut tui = tui();
        on_may_14(&mut tui);
        press(&mut tui, KeyCode::Down);
        press(&mut tui, KeyCode::Down);
        press(&mut tui, KeyCode::Down);
        assert_eq!(tui.cursor.day, NaiveDate::from_ymd_opt(2025, 6, 4).unwrap());
        assert_eq!(tui.cursor.month, Month::new(2025, 6).unwrap());
        press(&mut tui, KeyCode::Char('<'));
        assert_eq!(tui.cursor.day, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
    }

    #[test]
    fn test_enter_opens_event_of_selected_day() {
        let mut tui = tui();
        on_may_14(&mut tui);
        let ticket = tui.feed.refetch();
        tui.feed.complete(ticket, Ok(vec![event(1, "Бал"), event(2, "Турнир")]));
        press(&mut tui, KeyCode::Char(']'));
        assert!(matches!(
            press(&mut tui, KeyCode::Enter).open,
            Some(OverlayRequest::Detail(event)) if event.id == 2
        ));
    }

    #[test]
    fn test_export_takes_visible_month() {
        let mut tui = tui();
        on_may_14(&mut tui);
        let ticket = tui.feed.refetch();
        tui.feed.complete(ticket, Ok(vec![event(1, "Бал")]));
        let update = press(&mut tui, KeyCode::Char('e'));
        assert!(matches!(
            update.effects.as_slice(),
            [UiEffect::ExportCalendar { events, .. }] if events.len() == 1
        ));
        assert_eq!(tui.pending_action, Some(PendingAction::Export));

        tui.pending_action = None;
        press(&mut tui, KeyCode::Char('>'));
        let update = press(&mut tui, KeyCode::Char('e'));
        assert!(matches!(
            update.effects.as_slice(),
            [UiEffect::ExportCalendar { events, .. }] if events.is_empty()
        ));
    }
}
