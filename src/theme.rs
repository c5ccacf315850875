//! Dark and light palettes, addressed by semantic role name.

use ratatui::style::{Color, Modifier, Style};
use std::collections::HashMap;

// ============================================================================
// Theme Variant
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeVariant {
    Dark,
    Light,
}

impl ThemeVariant {
    /// Case-insensitive; `None` for unknown names.
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    pub fn palette(self) -> ColorPalette {
        match self {
            Self::Dark => ColorPalette::dark(),
            Self::Light => ColorPalette::light(),
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Dark => "Dark",
            Self::Light => "Light",
        }
    }
}

// ============================================================================
// Color Palette
// ============================================================================

/// Declares the palette struct and the role-name table from one list, so the
/// two cannot drift apart.
macro_rules! palette_roles {
    ($($role:ident),+ $(,)?) => {
        #[derive(Debug, Clone)]
        pub struct ColorPalette {
            $(pub $role: Style,)+
        }

        const ROLE_NAMES: &[&str] = &[$(stringify!($role)),+];

        impl ColorPalette {
            fn styles(&self) -> Vec<(&'static str, Style)> {
                vec![$((stringify!($role), self.$role)),+]
            }
        }
    };
}

palette_roles!(
    tree_normal,
    tree_selected,
    tree_branch,
    tree_leaf,
    tree_marked,
    tree_placeholder,
    path_dim,
    dialog_body,
    dialog_field_active,
    dialog_hint,
    dialog_error,
    help_heading,
    status_bar,
    status_error,
    panel_border,
    panel_border_focused,
    empty_state,
);

impl ColorPalette {
    fn dark() -> Self {
        let highlight = Style::default().bg(Color::DarkGray).fg(Color::White);
        Self {
            tree_normal: Style::default(),
            tree_selected: highlight,
            tree_branch: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            tree_leaf: Style::default().fg(Color::Gray),
            tree_marked: Style::default().fg(Color::Green),
            tree_placeholder: Style::default().fg(Color::DarkGray),
            path_dim: Style::default().fg(Color::DarkGray),
            dialog_body: Style::default(),
            dialog_field_active: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            dialog_hint: Style::default().fg(Color::DarkGray),
            dialog_error: Style::default().fg(Color::Red),
            help_heading: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            status_bar: highlight,
            status_error: Style::default().bg(Color::Red).fg(Color::White),
            panel_border: Style::default(),
            panel_border_focused: Style::default().fg(Color::Cyan),
            empty_state: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        }
    }

    fn light() -> Self {
        let highlight = Style::default().bg(Color::Blue).fg(Color::White);
        Self {
            tree_normal: Style::default().fg(Color::Black),
            tree_selected: highlight,
            tree_branch: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            tree_leaf: Style::default().fg(Color::Black),
            tree_marked: Style::default().fg(Color::Green),
            tree_placeholder: Style::default().fg(Color::Gray),
            path_dim: Style::default().fg(Color::DarkGray),
            dialog_body: Style::default().fg(Color::Black),
            dialog_field_active: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            dialog_hint: Style::default().fg(Color::DarkGray),
            dialog_error: Style::default().fg(Color::Red),
            help_heading: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            status_bar: Style::default().bg(Color::White).fg(Color::Black),
            status_error: Style::default().bg(Color::Red).fg(Color::White),
            panel_border: Style::default().fg(Color::DarkGray),
            panel_border_focused: Style::default().fg(Color::Blue),
            empty_state: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        }
    }
}

// ============================================================================
// Style Map
// ============================================================================

/// Role name to style, built from a palette.
#[derive(Debug, Clone)]
pub struct StyleMap {
    map: HashMap<&'static str, Style>,
}

impl StyleMap {
    pub fn from_palette(p: &ColorPalette) -> Self {
        Self {
            map: p.styles().into_iter().collect(),
        }
    }

    /// Unknown roles resolve to `Style::default()`.
    pub fn resolve(&self, role: &str) -> Style {
        self.map.get(role).copied().unwrap_or_default()
    }
}
