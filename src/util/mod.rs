//! Text helpers shared by storage, the hierarchy builder and the renderers.

mod text;

pub use text::{collation_key, display_width, strip_control_chars, truncate_to_width};
