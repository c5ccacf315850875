//! Terminal user interface.
//!
//! - `loop_runner` - main event loop and terminal management
//! - `input` - keyboard input and overlays
//! - `events` - results from background repository tasks
//! - `helpers` - task spawning shared by the two above
//! - `render` - layout and overlay dispatch
//! - `tree`, `selected`, `dialog`, `help`, `status` - widgets

mod dialog;
mod events;
mod help;
mod helpers;
mod input;
mod loop_runner;
mod render;
mod selected;
mod status;
mod tree;

pub use loop_runner::{run, Action};
