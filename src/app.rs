use crate::catalog::{
    CategoryEntry, CategoryForest, CategoryForm, CategorySelection, ParentRef, SelectionMode,
};
use crate::config::Config;
use crate::keybindings::KeybindingRegistry;
use crate::repository::CategoryRepository;
use crate::storage::Category;
use crate::theme::{StyleMap, ThemeVariant};
use ratatui::style::Style;
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Instant;

// ============================================================================
// Events
// ============================================================================

/// Results reported back to the UI task by spawned repository calls.
#[derive(Debug)]
pub enum AppEvent {
    /// A reload finished. Stale generations are discarded by the handler.
    CategoriesLoaded {
        generation: u64,
        result: Result<CategoryForest, String>,
    },
    /// Save results name the dialog that submitted them, so a result that
    /// outlives its dialog never touches a newer one.
    CategoryCreated {
        dialog: u64,
        category: Category,
    },
    CategoryCreateFailed {
        dialog: u64,
        error: String,
    },
    CategoryUpdated {
        dialog: u64,
        category: Category,
    },
    CategoryUpdateFailed {
        dialog: u64,
        error: String,
    },
    /// `descendants` is the store's count when it reports one, otherwise
    /// the count shown when the delete was confirmed.
    CategoryDeleted {
        id: i64,
        nome: String,
        descendants: usize,
    },
    /// The row was gone before the delete reached the store.
    CategoryAlreadyGone {
        id: i64,
        nome: String,
    },
    CategoryDeleteFailed {
        id: i64,
        error: String,
    },
    /// A background task panicked.
    TaskPanicked {
        task: &'static str,
        error: String,
    },
}

// ============================================================================
// UI State Types
// ============================================================================

/// Which panel receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Tree,
    Selected,
}

/// Awaiting y/n before a destructive action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteCategory {
        id: i64,
        nome: String,
        descendants: usize,
    },
}

/// Parent picker opened from the create form. Picking closes it.
#[derive(Debug, Clone)]
pub struct ParentPicker {
    pub selection: CategorySelection,
    /// Row 0 is "no parent"; row `n` is `forest.entries()[n - 1]`.
    pub cursor: usize,
}

impl ParentPicker {
    pub fn new(current: Option<i64>, forest: &CategoryForest) -> Self {
        let mut selection = CategorySelection::new(SelectionMode::Single);
        let cursor = match current {
            Some(id) => {
                selection.select(id);
                forest.position(id).map_or(0, |pos| pos + 1)
            }
            None => 0,
        };
        Self { selection, cursor }
    }
}

/// Create/edit dialog state.
#[derive(Debug, Clone)]
pub struct CategoryDialog {
    /// Unique per opened dialog.
    pub id: u64,
    pub form: CategoryForm,
    /// Validation or repository error shown under the inputs.
    pub error: Option<String>,
    pub picker: Option<ParentPicker>,
}

impl CategoryDialog {
    pub fn new(id: u64, form: CategoryForm) -> Self {
        Self {
            id,
            form,
            error: None,
            picker: None,
        }
    }
}

/// Presentation knobs taken from the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiSettings {
    pub indent_width: u16,
    pub placeholder_rows: usize,
    pub keep_creating: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            indent_width: 2,
            placeholder_rows: 5,
            keep_creating: false,
        }
    }
}

impl From<&Config> for UiSettings {
    fn from(config: &Config) -> Self {
        Self {
            indent_width: config.indent_width,
            placeholder_rows: config.placeholder_rows,
            keep_creating: config.keep_creating,
        }
    }
}

/// Visible tree content; exactly one applies at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeState {
    Loading,
    Empty,
    Populated,
}

// ============================================================================
// App
// ============================================================================

pub struct App {
    pub repo: CategoryRepository,
    pub theme_variant: ThemeVariant,
    pub theme: StyleMap,
    pub keybindings: KeybindingRegistry,
    pub settings: UiSettings,

    /// Last successfully loaded forest. Replaced wholesale on each reload.
    pub forest: Arc<CategoryForest>,
    /// Expanded is the default; only collapsed ids are tracked.
    pub collapsed: HashSet<i64>,
    /// Positions into `forest.entries()` currently on screen.
    visible: Vec<usize>,
    /// Cursor into `visible`.
    pub tree_cursor: usize,
    /// Jump here once the next reload lands (e.g. a just-created row).
    pub pending_cursor_id: Option<i64>,

    pub selection: CategorySelection,
    /// Cursor into the Selected panel.
    pub selected_cursor: usize,
    pub focus: Focus,

    pub dialog: Option<CategoryDialog>,
    last_dialog_id: u64,
    pub pending_confirm: Option<ConfirmAction>,
    pub show_help: bool,
    pub help_scroll_offset: usize,

    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
    pub spinner_frame: usize,

    /// A reload is outstanding.
    pub loading: bool,
    /// Bumped per reload; only the latest generation's result is applied.
    pub reload_generation: u64,
    pub reload_handle: Option<tokio::task::JoinHandle<()>>,
}

impl App {
    pub fn new(repo: CategoryRepository, settings: UiSettings) -> Self {
        Self {
            repo,
            theme_variant: ThemeVariant::Dark,
            theme: StyleMap::from_palette(&ThemeVariant::Dark.palette()),
            keybindings: KeybindingRegistry::new(),
            settings,
            forest: Arc::new(CategoryForest::default()),
            collapsed: HashSet::new(),
            visible: Vec::new(),
            tree_cursor: 0,
            pending_cursor_id: None,
            selection: CategorySelection::new(SelectionMode::Multiple),
            selected_cursor: 0,
            focus: Focus::Tree,
            dialog: None,
            last_dialog_id: 0,
            pending_confirm: None,
            show_help: false,
            help_scroll_offset: 0,
            status_message: None,
            needs_redraw: true,
            spinner_frame: 0,
            loading: false,
            reload_generation: 0,
            reload_handle: None,
        }
    }

    pub fn style(&self, role: &str) -> Style {
        self.theme.resolve(role)
    }

    pub fn set_theme(&mut self, variant: ThemeVariant) {
        self.theme_variant = variant;
        self.theme = StyleMap::from_palette(&variant.palette());
        self.needs_redraw = true;
    }

    /// Dark → Light → Dark. Returns the new theme's name.
    pub fn cycle_theme(&mut self) -> &'static str {
        let next = self.theme_variant.next();
        self.set_theme(next);
        next.name()
    }

    /// Shown for 3 seconds.
    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Returns true if a message was cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        match &self.status_message {
            Some((_, at)) if at.elapsed().as_secs() >= 3 => {
                self.status_message = None;
                true
            }
            _ => false,
        }
    }

    // ========================================================================
    // Forest
    // ========================================================================

    pub fn tree_state(&self) -> TreeState {
        if self.loading && self.forest.is_empty() {
            TreeState::Loading
        } else if self.forest.is_empty() {
            TreeState::Empty
        } else {
            TreeState::Populated
        }
    }

    /// Install a freshly built forest.
    ///
    /// The cursor stays on the same category when it still exists. Selected
    /// and collapsed ids that vanished are dropped.
    pub fn apply_forest(&mut self, forest: CategoryForest) {
        let keep_id = self.pending_cursor_id.take().or_else(|| self.current_id());

        let pruned = self.selection.retain_known(&forest);
        if pruned > 0 {
            tracing::debug!(pruned, "Dropped selections for deleted categories");
        }
        self.collapsed.retain(|id| forest.get(*id).is_some());

        if !forest.cycle_breaks().is_empty() {
            self.set_status(format!(
                "Warning: {} category cycle(s) broken; check parent links",
                forest.cycle_breaks().len()
            ));
        }

        self.forest = Arc::new(forest);
        self.rebuild_visible();

        if let Some(id) = keep_id {
            self.reveal(id);
        }
        self.clamp_cursors();
        self.needs_redraw = true;
    }

    fn rebuild_visible(&mut self) {
        let mut visible = Vec::with_capacity(self.forest.len());
        let mut hidden_below: Option<usize> = None;

        for (pos, entry) in self.forest.entries().iter().enumerate() {
            if let Some(nivel) = hidden_below {
                if entry.nivel > nivel {
                    continue;
                }
                hidden_below = None;
            }
            visible.push(pos);
            if entry.has_children && self.collapsed.contains(&entry.id) {
                hidden_below = Some(entry.nivel);
            }
        }

        self.visible = visible;
    }

    /// Visible rows in display order.
    pub fn visible_rows(&self) -> impl Iterator<Item = &CategoryEntry> + '_ {
        let entries = self.forest.entries();
        self.visible.iter().map(move |&pos| &entries[pos])
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn current_entry(&self) -> Option<&CategoryEntry> {
        self.visible
            .get(self.tree_cursor)
            .and_then(|&pos| self.forest.entries().get(pos))
    }

    pub fn current_id(&self) -> Option<i64> {
        self.current_entry().map(|e| e.id)
    }

    pub fn is_expanded(&self, id: i64) -> bool {
        !self.collapsed.contains(&id)
    }

    /// Expand every ancestor of `id` and move the cursor onto it.
    pub fn reveal(&mut self, id: i64) {
        let Some(pos) = self.forest.position(id) else {
            return;
        };
        let entries = self.forest.entries();
        let mut nivel = entries[pos].nivel;
        let mut ancestors = Vec::new();
        for entry in entries[..pos].iter().rev() {
            if nivel == 0 {
                break;
            }
            if entry.nivel < nivel {
                ancestors.push(entry.id);
                nivel = entry.nivel;
            }
        }
        let changed = ancestors.iter().fold(false, |acc, a| self.collapsed.remove(a) || acc);
        if changed {
            self.rebuild_visible();
        }
        if let Some(row) = self.visible.iter().position(|&p| p == pos) {
            self.tree_cursor = row;
        }
    }

    pub fn toggle_collapse(&mut self, id: i64) {
        let Some(entry) = self.forest.get(id) else {
            return;
        };
        if !entry.has_children {
            return;
        }
        if !self.collapsed.remove(&id) {
            self.collapsed.insert(id);
        }
        self.rebuild_visible();
        self.reveal(id);
    }

    /// Collapse the current row, or step to its parent if already collapsed
    /// (or a leaf).
    pub fn collapse_or_parent(&mut self) {
        let Some(entry) = self.current_entry() else {
            return;
        };
        let id = entry.id;
        if entry.has_children && self.is_expanded(id) {
            self.toggle_collapse(id);
            return;
        }
        if entry.nivel == 0 {
            return;
        }
        let nivel = entry.nivel;
        let parent_row = self.visible[..self.tree_cursor]
            .iter()
            .rposition(|&pos| self.forest.entries()[pos].nivel < nivel);
        if let Some(row) = parent_row {
            self.tree_cursor = row;
        }
    }

    /// Expand the current row, or step into its first child if already open.
    pub fn expand_or_child(&mut self) {
        let Some(entry) = self.current_entry() else {
            return;
        };
        if !entry.has_children {
            return;
        }
        let id = entry.id;
        if self.is_expanded(id) {
            self.nav_down();
        } else {
            self.toggle_collapse(id);
        }
    }

    pub fn expand_all(&mut self) {
        let keep = self.current_id();
        self.collapsed.clear();
        self.rebuild_visible();
        if let Some(id) = keep {
            self.reveal(id);
        }
    }

    pub fn collapse_all(&mut self) {
        // Land on the root that contained the cursor
        let root = self.current_entry().and_then(|entry| {
            let pos = self.forest.position(entry.id)?;
            self.forest.entries()[..=pos]
                .iter()
                .rev()
                .find(|e| e.nivel == 0)
                .map(|e| e.id)
        });
        self.collapsed = self
            .forest
            .entries()
            .iter()
            .filter(|e| e.has_children)
            .map(|e| e.id)
            .collect();
        self.rebuild_visible();
        self.tree_cursor = 0;
        if let Some(id) = root {
            self.reveal(id);
        }
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn nav_down(&mut self) {
        match self.focus {
            Focus::Tree => {
                if self.tree_cursor + 1 < self.visible.len() {
                    self.tree_cursor += 1;
                }
            }
            Focus::Selected => {
                if self.selected_cursor + 1 < self.selection.selected_categories(&self.forest).len()
                {
                    self.selected_cursor += 1;
                }
            }
        }
    }

    pub fn nav_up(&mut self) {
        match self.focus {
            Focus::Tree => self.tree_cursor = self.tree_cursor.saturating_sub(1),
            Focus::Selected => self.selected_cursor = self.selected_cursor.saturating_sub(1),
        }
    }

    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Tree => Focus::Selected,
            Focus::Selected => Focus::Tree,
        };
        self.clamp_cursors();
    }

    pub fn clamp_cursors(&mut self) {
        self.tree_cursor = self.tree_cursor.min(self.visible.len().saturating_sub(1));
        let selected = self.selection.selected_categories(&self.forest).len();
        self.selected_cursor = self.selected_cursor.min(selected.saturating_sub(1));
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Toggle the row under the cursor. Returns the status line to show.
    pub fn toggle_current_selection(&mut self) -> Option<String> {
        let entry = self.current_entry()?;
        let (id, nome) = (entry.id, entry.nome.clone());
        match self.selection.select(id) {
            crate::catalog::SelectOutcome::Toggled { selected: true } => {
                Some(format!("Selected '{}' ({} total)", nome, self.selection.len()))
            }
            _ => Some(format!("Deselected '{}'", nome)),
        }
    }

    /// Remove the entry under the Selected panel's cursor.
    pub fn remove_selected_at_cursor(&mut self) -> Option<String> {
        let (id, nome) = {
            let entries = self.selection.selected_categories(&self.forest);
            let entry = entries.get(self.selected_cursor)?;
            (entry.id, entry.nome.clone())
        };
        self.selection.remove(id);
        self.clamp_cursors();
        Some(format!("Removed '{}' from selection", nome))
    }

    // ========================================================================
    // Dialogs
    // ========================================================================

    /// Replace any open dialog with a fresh one and return its id.
    pub fn show_dialog(&mut self, form: CategoryForm) -> u64 {
        self.last_dialog_id += 1;
        self.dialog = Some(CategoryDialog::new(self.last_dialog_id, form));
        self.last_dialog_id
    }

    /// The open dialog, if it is the one with `id`.
    pub fn dialog_with_id(&mut self, id: u64) -> Option<&mut CategoryDialog> {
        self.dialog.as_mut().filter(|d| d.id == id)
    }

    pub fn open_create_dialog(&mut self, parent: Option<ParentRef>) {
        let form = CategoryForm::create(parent, self.settings.keep_creating);
        self.show_dialog(form);
    }

    /// Create form scoped to the row under the cursor.
    pub fn open_add_subcategory_dialog(&mut self) -> bool {
        let Some(entry) = self.current_entry() else {
            return false;
        };
        let parent = ParentRef {
            id: entry.id,
            caminho: entry.caminho.clone(),
        };
        self.open_create_dialog(Some(parent));
        true
    }

    pub fn open_edit_dialog(&mut self) -> bool {
        let Some(category) = self
            .current_id()
            .and_then(|id| self.forest.category(id).cloned())
        else {
            return false;
        };
        self.show_dialog(CategoryForm::edit(&category));
        true
    }

    /// Ask before deleting the row under the cursor and its subtree.
    pub fn request_delete(&mut self) -> bool {
        let Some(entry) = self.current_entry() else {
            return false;
        };
        self.pending_confirm = Some(ConfirmAction::DeleteCategory {
            id: entry.id,
            nome: entry.nome.clone(),
            descendants: self.forest.descendant_count(entry.id),
        });
        true
    }
}

// ============================================================================
// Resource Cleanup
// ============================================================================

impl Drop for App {
    fn drop(&mut self) {
        if let Some(handle) = self.reload_handle.take() {
            handle.abort();
            tracing::debug!("Aborted reload task on App drop");
        }
    }
}
