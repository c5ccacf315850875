//! Set of selected category ids.
//!
//! The set is independent of the forest's lifecycle: ids survive a reload
//! until the owner calls [`CategorySelection::retain_known`].

use std::collections::HashSet;

use super::hierarchy::{CategoryEntry, CategoryForest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Picking replaces the set and closes the picker.
    Single,
    /// Picking toggles membership.
    Multiple,
}

/// What the surface showing the selection should do after [`CategorySelection::select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    Toggled { selected: bool },
    Close,
}

#[derive(Debug, Clone)]
pub struct CategorySelection {
    mode: SelectionMode,
    ids: HashSet<i64>,
}

impl CategorySelection {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            ids: HashSet::new(),
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn select(&mut self, id: i64) -> SelectOutcome {
        match self.mode {
            SelectionMode::Single => {
                self.ids.clear();
                self.ids.insert(id);
                SelectOutcome::Close
            }
            SelectionMode::Multiple => {
                let selected = if self.ids.remove(&id) {
                    false
                } else {
                    self.ids.insert(id);
                    true
                };
                SelectOutcome::Toggled { selected }
            }
        }
    }

    /// Remove `id` if present.
    pub fn remove(&mut self, id: i64) {
        self.ids.remove(&id);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn is_selected(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Selected ids in ascending order.
    pub fn ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.ids.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// First selected id (the only one in single mode).
    pub fn first(&self) -> Option<i64> {
        self.ids.iter().min().copied()
    }

    /// Selected entries in tree order, not selection order.
    ///
    /// Ids missing from `forest` are skipped.
    pub fn selected_categories<'a>(&self, forest: &'a CategoryForest) -> Vec<&'a CategoryEntry> {
        forest
            .entries()
            .iter()
            .filter(|e| self.ids.contains(&e.id))
            .collect()
    }

    /// Drop ids that no longer exist in `forest`. Returns how many went away.
    pub fn retain_known(&mut self, forest: &CategoryForest) -> usize {
        let before = self.ids.len();
        self.ids.retain(|id| forest.get(*id).is_some());
        before - self.ids.len()
    }
}
