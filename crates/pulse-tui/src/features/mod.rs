//! Screen slices: key handling and rendering per screen.
//!
//! Screens get `&mut TuiState` directly. Anything that leaves the reducer
//! (fetches, actions, overlays) is returned as a [`ScreenUpdate`].

pub mod calendar;
pub mod events;
pub mod profile;

use crate::effects::UiEffect;
use crate::overlays::OverlayRequest;

#[derive(Debug, Default)]
pub struct ScreenUpdate {
    pub effects: Vec<UiEffect>,
    pub open: Option<OverlayRequest>,
}

impl ScreenUpdate {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn effects(effects: Vec<UiEffect>) -> Self {
        Self {
            effects,
            open: None,
        }
    }

    pub fn open(request: OverlayRequest) -> Self {
        Self {
            effects: Vec::new(),
            open: Some(request),
        }
    }
}
