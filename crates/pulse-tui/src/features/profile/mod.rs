//! Account details, settings, and participation history.

mod render;
mod update;

pub use render::render;
pub use update::{fetch_participations, handle_key};
