//! doceria: terminal manager for a bakery catalog's category hierarchy.
//!
//! Categories live in a local SQLite file or a hosted REST table and are
//! shown as an indented, collapsible tree with multi-select.

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod keybindings;
pub mod remote;
pub mod repository;
pub mod storage;
pub mod theme;
pub mod ui;
pub mod util;
