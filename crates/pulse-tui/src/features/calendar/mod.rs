//! Month grid with the selected day's events.

mod render;
mod update;

pub use render::render;
pub use update::handle_key;
