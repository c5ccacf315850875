//! Keybinding registry: (context, key) to action, with config overrides.
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

// ============================================================================
// Action Enum
// ============================================================================

/// Every action reachable from a key in the tree or selection panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    NavDown,
    NavUp,
    CycleFocus,
    Back,
    ToggleExpand,
    Collapse,
    Expand,
    ExpandAll,
    CollapseAll,
    ToggleSelect,
    RemoveSelected,
    ClearSelection,
    NewCategory,
    AddSubcategory,
    EditCategory,
    DeleteCategory,
    Reload,
    CycleTheme,
    ShowHelp,
}

/// Config name of each action. The first spelling is canonical.
const ACTION_NAMES: &[(&str, Action)] = &[
    ("quit", Action::Quit),
    ("nav_down", Action::NavDown),
    ("down", Action::NavDown),
    ("nav_up", Action::NavUp),
    ("up", Action::NavUp),
    ("cycle_focus", Action::CycleFocus),
    ("back", Action::Back),
    ("toggle_expand", Action::ToggleExpand),
    ("collapse", Action::Collapse),
    ("expand", Action::Expand),
    ("expand_all", Action::ExpandAll),
    ("collapse_all", Action::CollapseAll),
    ("toggle_select", Action::ToggleSelect),
    ("select", Action::ToggleSelect),
    ("remove_selected", Action::RemoveSelected),
    ("clear_selection", Action::ClearSelection),
    ("new_category", Action::NewCategory),
    ("add_subcategory", Action::AddSubcategory),
    ("edit_category", Action::EditCategory),
    ("edit", Action::EditCategory),
    ("delete_category", Action::DeleteCategory),
    ("delete", Action::DeleteCategory),
    ("reload", Action::Reload),
    ("refresh", Action::Reload),
    ("cycle_theme", Action::CycleTheme),
    ("theme", Action::CycleTheme),
    ("show_help", Action::ShowHelp),
    ("help", Action::ShowHelp),
];

impl Action {
    /// Text for the help overlay.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Quit => "Quit",
            Self::NavDown => "Move down",
            Self::NavUp => "Move up",
            Self::CycleFocus => "Switch panel",
            Self::Back => "Dismiss / back to tree",
            Self::ToggleExpand => "Expand or collapse",
            Self::Collapse => "Collapse (or go to parent)",
            Self::Expand => "Expand",
            Self::ExpandAll => "Expand all",
            Self::CollapseAll => "Collapse all",
            Self::ToggleSelect => "Toggle selection",
            Self::RemoveSelected => "Remove from selection",
            Self::ClearSelection => "Clear selection",
            Self::NewCategory => "New root category",
            Self::AddSubcategory => "Add subcategory here",
            Self::EditCategory => "Edit category",
            Self::DeleteCategory => "Delete category and subtree",
            Self::Reload => "Reload from store",
            Self::CycleTheme => "Cycle theme",
            Self::ShowHelp => "Show help",
        }
    }
}

fn parse_action_name(name: &str) -> Option<Action> {
    let name = name.trim().to_lowercase().replace('-', "_");
    ACTION_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, action)| *action)
}

// ============================================================================
// Context Enum
// ============================================================================

/// Which panel has focus. Global bindings apply everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    Global,
    Tree,
    Selected,
}

impl Context {
    pub fn label(self) -> &'static str {
        match self {
            Self::Global => "Global",
            Self::Tree => "Category tree",
            Self::Selected => "Selected panel",
        }
    }
}

// ============================================================================
// Key Specification
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn char(c: char) -> Self {
        Self::plain(KeyCode::Char(c))
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    /// Terminals report `E` as Shift+E; the character already carries the case.
    fn normalized(self) -> Self {
        match self.code {
            KeyCode::Char(_) => Self::new(self.code, self.modifiers.difference(KeyModifiers::SHIFT)),
            _ => self,
        }
    }
}

/// Parse a config key string: `"q"`, `"Enter"`, `"Ctrl+r"`, `"F5"`, `"Space"`.
fn parse_key_string(s: &str) -> Option<KeySpec> {
    let s = s.trim();

    if let Some(rest) = s.strip_prefix("Ctrl+").or_else(|| s.strip_prefix("ctrl+")) {
        let mut chars = rest.trim().chars();
        let c = chars.next()?;
        return chars.next().is_none().then(|| KeySpec::ctrl(c));
    }

    let named = match s.to_lowercase().as_str() {
        "enter" | "return" => Some(KeyCode::Enter),
        "esc" | "escape" => Some(KeyCode::Esc),
        "tab" => Some(KeyCode::Tab),
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "backspace" => Some(KeyCode::Backspace),
        "delete" | "del" => Some(KeyCode::Delete),
        "home" => Some(KeyCode::Home),
        "end" => Some(KeyCode::End),
        "space" => Some(KeyCode::Char(' ')),
        _ => None,
    };
    if let Some(code) = named {
        return Some(KeySpec::plain(code));
    }

    if let Some(n) = s
        .strip_prefix(['F', 'f'])
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| (1..=12).contains(n))
    {
        return Some(KeySpec::plain(KeyCode::F(n)));
    }

    let mut chars = s.chars();
    let c = chars.next()?;
    chars.next().is_none().then(|| KeySpec::char(c))
}

/// Display form for the help overlay.
fn format_key(key: &KeySpec) -> String {
    let name = match key.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Up => "↑".to_string(),
        KeyCode::Down => "↓".to_string(),
        KeyCode::Left => "←".to_string(),
        KeyCode::Right => "→".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Delete => "Del".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => "?".to_string(),
    };
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        format!("Ctrl+{}", name)
    } else {
        name
    }
}

// ============================================================================
// Keybinding Registry
// ============================================================================

const DEFAULT_BINDINGS: &[(Context, KeySpec, Action)] = &[
    (Context::Global, KeySpec::char('q'), Action::Quit),
    (Context::Global, KeySpec::ctrl('c'), Action::Quit),
    (Context::Global, KeySpec::char('j'), Action::NavDown),
    (Context::Global, KeySpec::plain(KeyCode::Down), Action::NavDown),
    (Context::Global, KeySpec::char('k'), Action::NavUp),
    (Context::Global, KeySpec::plain(KeyCode::Up), Action::NavUp),
    (Context::Global, KeySpec::plain(KeyCode::Tab), Action::CycleFocus),
    (Context::Global, KeySpec::plain(KeyCode::Esc), Action::Back),
    (Context::Global, KeySpec::char('X'), Action::ClearSelection),
    (Context::Global, KeySpec::char('r'), Action::Reload),
    (Context::Global, KeySpec::char('n'), Action::NewCategory),
    (Context::Global, KeySpec::char('T'), Action::CycleTheme),
    (Context::Global, KeySpec::char('?'), Action::ShowHelp),
    (Context::Tree, KeySpec::plain(KeyCode::Enter), Action::ToggleExpand),
    (Context::Tree, KeySpec::char('h'), Action::Collapse),
    (Context::Tree, KeySpec::plain(KeyCode::Left), Action::Collapse),
    (Context::Tree, KeySpec::char('l'), Action::Expand),
    (Context::Tree, KeySpec::plain(KeyCode::Right), Action::Expand),
    (Context::Tree, KeySpec::char('E'), Action::ExpandAll),
    (Context::Tree, KeySpec::char('C'), Action::CollapseAll),
    (Context::Tree, KeySpec::char(' '), Action::ToggleSelect),
    (Context::Tree, KeySpec::char('a'), Action::AddSubcategory),
    (Context::Tree, KeySpec::char('e'), Action::EditCategory),
    (Context::Tree, KeySpec::char('d'), Action::DeleteCategory),
    (Context::Selected, KeySpec::char('x'), Action::RemoveSelected),
    (Context::Selected, KeySpec::char(' '), Action::RemoveSelected),
    (Context::Selected, KeySpec::plain(KeyCode::Delete), Action::RemoveSelected),
];

/// Context-aware lookup: a panel binding wins over a Global one for the
/// same key.
pub struct KeybindingRegistry {
    lookup: HashMap<(Context, KeySpec), Action>,
    /// Registration order, for the help overlay.
    bindings: Vec<(Context, KeySpec, Action)>,
}

impl KeybindingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            lookup: HashMap::new(),
            bindings: Vec::with_capacity(DEFAULT_BINDINGS.len()),
        };
        for &(context, key, action) in DEFAULT_BINDINGS {
            registry.bind(context, key, action);
        }
        registry
    }

    fn bind(&mut self, context: Context, key: KeySpec, action: Action) {
        if let Some(previous) = self.lookup.insert((context, key), action) {
            self.bindings
                .retain(|(c, k, a)| !(*c == context && *k == key && *a == previous));
        }
        self.bindings.push((context, key, action));
    }

    /// Apply `[keybindings]` from the config file.
    ///
    /// The new key replaces every default key of that action, in each context
    /// the action was bound in. Returns warnings for names or keys that could
    /// not be parsed.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        // Sorted for deterministic results when two overrides share a key
        let mut entries: Vec<(&String, &String)> = overrides.iter().collect();
        entries.sort();

        for (action_name, key_str) in entries {
            let Some(action) = parse_action_name(action_name) else {
                warnings.push(format!("Unknown action '{}', ignoring", action_name));
                continue;
            };
            let Some(key) = parse_key_string(key_str) else {
                warnings.push(format!(
                    "Cannot parse key '{}' for action '{}', ignoring",
                    key_str, action_name
                ));
                continue;
            };

            let mut contexts: Vec<Context> = Vec::new();
            for (c, _, a) in &self.bindings {
                if *a == action && !contexts.contains(c) {
                    contexts.push(*c);
                }
            }
            self.lookup.retain(|_, a| *a != action);
            self.bindings.retain(|(_, _, a)| *a != action);
            for ctx in contexts {
                self.bind(ctx, key, action);
            }

            tracing::info!(action = %action_name, key = %key_str, "Applied keybinding override");
        }

        warnings
    }

    /// Action bound to a key in `context`, falling back to Global.
    pub fn action_for_key(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        context: Context,
    ) -> Option<Action> {
        let key = KeySpec::new(code, modifiers).normalized();
        self.lookup
            .get(&(context, key))
            .or_else(|| self.lookup.get(&(Context::Global, key)))
            .copied()
    }

    /// `(context, key label, action, description)` in registration order.
    pub fn all_bindings(&self) -> Vec<(Context, String, Action, &'static str)> {
        self.bindings
            .iter()
            .map(|(ctx, key, action)| (*ctx, format_key(key), *action, action.describe()))
            .collect()
    }

    /// First key bound to `action`, for hints in the status bar.
    pub fn key_label(&self, action: Action) -> Option<String> {
        self.bindings
            .iter()
            .find(|(_, _, a)| *a == action)
            .map(|(_, key, _)| format_key(key))
    }
}

impl Default for KeybindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
