//! Helpers shared by screens and overlays.

mod field;
pub mod text;

pub use field::{FieldKey, TextField};
pub use text::truncate_with_ellipsis;
