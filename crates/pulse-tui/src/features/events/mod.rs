//! Events and archive lists.

mod render;
mod update;

pub use render::{render, render_placeholder, render_search_bar};
pub use update::{
    apply_filters, fetch_events, handle_key, handle_paste, reset_query, settle_search,
    toggle_participation,
};
