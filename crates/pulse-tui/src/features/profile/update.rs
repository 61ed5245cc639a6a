use crossterm::event::{KeyCode, KeyEvent};
use pulse_core::models::{ParticipationStatus, SettingsUpdate};

use crate::effects::UiEffect;
use crate::features::ScreenUpdate;
use crate::overlays::OverlayRequest;
use crate::state::{PendingAction, TuiState};

pub fn next_status(status: ParticipationStatus) -> ParticipationStatus {
    match status {
        ParticipationStatus::Upcoming => ParticipationStatus::Past,
        ParticipationStatus::Past => ParticipationStatus::All,
        ParticipationStatus::All => ParticipationStatus::Upcoming,
    }
}

pub fn fetch_participations(tui: &mut TuiState) -> UiEffect {
    UiEffect::FetchParticipations {
        ticket: tui.participations.begin(),
        status: tui.participation_status,
    }
}

pub fn handle_key(tui: &mut TuiState, key: KeyEvent) -> ScreenUpdate {
    if !tui.is_authenticated() {
        return ScreenUpdate::none();
    }
    match key.code {
        KeyCode::Char('s') => {
            tui.participation_status = next_status(tui.participation_status);
            ScreenUpdate::effects(vec![fetch_participations(tui)])
        }
        KeyCode::Char('N') if !tui.is_busy() => {
            tui.pending_action = Some(PendingAction::Settings);
            ScreenUpdate::effects(vec![UiEffect::UpdateSettings(SettingsUpdate {
                notifications_enabled: !tui.session.notifications_enabled(),
            })])
        }
        KeyCode::Char('e') => ScreenUpdate::open(OverlayRequest::Profile),
        KeyCode::Char('w') => ScreenUpdate::open(OverlayRequest::Password),
        _ => ScreenUpdate::none(),
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;

    use super::*;
    use crate::test_support::{signed_in, tui};

    fn press(tui: &mut TuiState, c: char) -> ScreenUpdate {
        handle_key(tui, KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    #[test]
    fn test_status_cycle_refetches() {
        let mut tui = signed_in(false);
        assert_eq!(tui.participation_status, ParticipationStatus::All);
        let update = press(&mut tui, 's');
        assert_eq!(tui.participation_status, ParticipationStatus::Upcoming);
        assert!(matches!(
            update.effects.as_slice(),
            [UiEffect::FetchParticipations {
                status: ParticipationStatus::Upcoming,
                ..
            }]
        ));
        assert!(tui.participations.is_loading);
    }

    #[test]
    fn test_notifications_toggle_flips_setting() {
        let mut tui = signed_in(false);
        let update = press(&mut tui, 'N');
        assert!(matches!(
            update.effects.as_slice(),
            [UiEffect::UpdateSettings(SettingsUpdate {
                notifications_enabled: false
            })]
        ));
        assert!(press(&mut tui, 'N').effects.is_empty());
    }

    #[test]
    fn test_signed_out_profile_ignores_keys() {
        let mut tui = tui();
        assert!(press(&mut tui, 'e').open.is_none());
    }
}
