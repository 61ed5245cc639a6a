//! State changes requested by overlays.
//!
//! Overlay key handlers only see `&TuiState`; anything they need changed
//! outside the overlay is returned as a `StateMutation` and applied by the
//! reducer.

use pulse_core::models::{EventFilters, EventId};

use crate::state::PendingAction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateMutation {
    /// Marks an action as in flight; submit buttons are disabled until it finishes.
    BeginAction(PendingAction),
    ApplyFilters(EventFilters),
    /// Clears filters and the search box.
    ResetFilters,
    /// Shows the event in the list and opens its details once loaded.
    OpenEvent(EventId),
}
