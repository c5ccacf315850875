//! Flat category rows to an ordered, leveled forest.
//!
//! [`build_forest`] is the only constructor. It never fails: orphans become
//! roots and parent cycles are cut so every row is emitted exactly once.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::storage::Category;
use crate::util::{collation_key, strip_control_chars};

/// Separator between names in a [`CategoryEntry::caminho`].
pub const PATH_SEPARATOR: &str = " > ";

/// One row of the depth-first flattened tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryEntry {
    pub id: i64,
    pub nome: String,
    pub parent_id: Option<i64>,
    pub descricao: Option<String>,
    /// Depth in the emitted tree; 0 for roots.
    pub nivel: usize,
    /// Names from the root down to this node, joined by `" > "`.
    pub caminho: String,
    pub has_children: bool,
}

/// Owned tree node. Children are held by value; there are no back references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub nivel: usize,
    pub caminho: String,
    pub subcategorias: Vec<CategoryNode>,
}

/// Result of [`build_forest`]. Immutable; rebuilt from scratch on each load.
#[derive(Debug, Clone, Default)]
pub struct CategoryForest {
    rows: Vec<Category>,
    row_index: HashMap<i64, usize>,
    entries: Vec<CategoryEntry>,
    entry_index: HashMap<i64, usize>,
    children: HashMap<i64, Vec<i64>>,
    cycle_breaks: Vec<i64>,
}

impl CategoryForest {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flattened entry for `id`.
    pub fn get(&self, id: i64) -> Option<&CategoryEntry> {
        self.entry_index.get(&id).map(|&pos| &self.entries[pos])
    }

    /// The stored row for `id`, timestamps included.
    pub fn category(&self, id: i64) -> Option<&Category> {
        self.row_index.get(&id).map(|&pos| &self.rows[pos])
    }

    /// Position of `id` in [`entries`](Self::entries).
    pub fn position(&self, id: i64) -> Option<usize> {
        self.entry_index.get(&id).copied()
    }

    /// Depth-first order: each root's whole subtree precedes the next root.
    pub fn entries(&self) -> &[CategoryEntry] {
        &self.entries
    }

    /// Children of `id` in sibling order, as emitted in the tree.
    pub fn children_of(&self, id: i64) -> &[i64] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids that were promoted to roots to break a parent cycle.
    pub fn cycle_breaks(&self) -> &[i64] {
        &self.cycle_breaks
    }

    /// Number of categories below `id` (not counting `id` itself).
    pub fn descendant_count(&self, id: i64) -> usize {
        let Some(pos) = self.position(id) else {
            return 0;
        };
        let nivel = self.entries[pos].nivel;
        self.entries[pos + 1..]
            .iter()
            .take_while(|e| e.nivel > nivel)
            .count()
    }

    /// Owned forest with `subcategorias`, rebuilt from the flattened order.
    pub fn roots(&self) -> Vec<CategoryNode> {
        let mut roots = Vec::new();
        let mut stack: Vec<CategoryNode> = Vec::new();

        for entry in &self.entries {
            while stack.len() > entry.nivel {
                attach(&mut stack, &mut roots);
            }
            let Some(category) = self.category(entry.id) else {
                continue;
            };
            stack.push(CategoryNode {
                category: category.clone(),
                nivel: entry.nivel,
                caminho: entry.caminho.clone(),
                subcategorias: Vec::new(),
            });
        }
        while !stack.is_empty() {
            attach(&mut stack, &mut roots);
        }
        roots
    }
}

fn attach(stack: &mut Vec<CategoryNode>, roots: &mut Vec<CategoryNode>) {
    if let Some(node) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.subcategorias.push(node),
            None => roots.push(node),
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Build the forest from rows in any order.
///
/// Siblings sort by accent- and case-folded name, then raw name, then id. A
/// `parent_id` that matches no row makes that row a root. Rows caught in a
/// parent cycle are unreachable from any root; the smallest of each cycle is
/// promoted to a root and logged.
pub fn build_forest(rows: &[Category]) -> CategoryForest {
    let mut kept: Vec<Category> = Vec::with_capacity(rows.len());
    let mut row_index: HashMap<i64, usize> = HashMap::with_capacity(rows.len());
    for row in rows {
        if row_index.contains_key(&row.id) {
            tracing::warn!(id = row.id, "Duplicate category id ignored");
            continue;
        }
        row_index.insert(row.id, kept.len());
        kept.push(row.clone());
    }

    let keys: Vec<String> = kept.iter().map(|c| collation_key(&c.nome)).collect();
    let order = |a: &usize, b: &usize| {
        keys[*a]
            .cmp(&keys[*b])
            .then_with(|| kept[*a].nome.cmp(&kept[*b].nome))
            .then_with(|| kept[*a].id.cmp(&kept[*b].id))
    };

    // Raw adjacency; unresolvable parents count as roots
    let mut roots: Vec<usize> = Vec::new();
    let mut raw_children: Vec<Vec<usize>> = vec![Vec::new(); kept.len()];
    for (idx, row) in kept.iter().enumerate() {
        match row.parent_id.and_then(|p| row_index.get(&p)) {
            Some(&parent) => raw_children[parent].push(idx),
            None => roots.push(idx),
        }
    }
    roots.sort_by(order);
    for list in &mut raw_children {
        list.sort_by(order);
    }

    let mut walk = Walk {
        rows: &kept,
        raw_children: &raw_children,
        visited: vec![false; kept.len()],
        entries: Vec::with_capacity(kept.len()),
        children: HashMap::new(),
    };
    for &root in &roots {
        walk.emit_subtree(root);
    }

    let mut cycle_breaks = Vec::new();
    if walk.entries.len() < kept.len() {
        let mut members = cycle_members(&kept, &row_index, &walk.visited);
        members.sort_by(order);
        // Rows hanging off a cycle are reached through the promoted member
        let remaining = (0..kept.len()).filter(|&i| !walk.visited[i]);
        let candidates: Vec<usize> = members.into_iter().chain(remaining).collect();
        for idx in candidates {
            if walk.visited[idx] {
                continue;
            }
            tracing::warn!(
                id = kept[idx].id,
                nome = %kept[idx].nome,
                parent_id = ?kept[idx].parent_id,
                "Category parent cycle broken; promoted to root"
            );
            cycle_breaks.push(kept[idx].id);
            walk.emit_subtree(idx);
        }
    }

    let Walk {
        entries, children, ..
    } = walk;
    let entry_index = entries
        .iter()
        .enumerate()
        .map(|(pos, e)| (e.id, pos))
        .collect();

    CategoryForest {
        rows: kept,
        row_index,
        entries,
        entry_index,
        children,
        cycle_breaks,
    }
}

struct Walk<'a> {
    rows: &'a [Category],
    raw_children: &'a [Vec<usize>],
    visited: Vec<bool>,
    entries: Vec<CategoryEntry>,
    children: HashMap<i64, Vec<i64>>,
}

impl Walk<'_> {
    /// Iterative pre-order walk. A row is marked when first pushed, so each
    /// row is emitted at most once even if the parent links loop back.
    fn emit_subtree(&mut self, root: usize) {
        if self.visited[root] {
            return;
        }
        self.visited[root] = true;
        // (row, nivel, position of the parent entry)
        let mut stack: Vec<(usize, usize, Option<usize>)> = vec![(root, 0, None)];

        while let Some((idx, nivel, parent_pos)) = stack.pop() {
            let row = &self.rows[idx];
            // Rows from other writers can carry terminal escapes
            let nome = strip_control_chars(&row.nome).into_owned();
            let caminho = match parent_pos {
                Some(pos) => format!("{}{}{}", self.entries[pos].caminho, PATH_SEPARATOR, nome),
                None => nome.clone(),
            };

            let kids: Vec<usize> = self.raw_children[idx]
                .iter()
                .copied()
                .filter(|&c| !self.visited[c])
                .collect();
            for &kid in &kids {
                self.visited[kid] = true;
            }

            let pos = self.entries.len();
            self.entries.push(CategoryEntry {
                id: row.id,
                nome,
                parent_id: row.parent_id,
                descricao: row.descricao.clone(),
                nivel,
                caminho,
                has_children: !kids.is_empty(),
            });

            if !kids.is_empty() {
                self.children
                    .insert(row.id, kids.iter().map(|&k| self.rows[k].id).collect());
            }
            for &kid in kids.iter().rev() {
                stack.push((kid, nivel + 1, Some(pos)));
            }
        }
    }
}

/// Unvisited rows that sit on a parent cycle.
///
/// Every unvisited row has a resolvable parent that is also unvisited, so
/// walking up from any of them ends on a cycle.
fn cycle_members(
    rows: &[Category],
    row_index: &HashMap<i64, usize>,
    visited: &[bool],
) -> Vec<usize> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Fresh,
        OnPath,
        Done,
    }

    let mut marks = vec![Mark::Fresh; rows.len()];
    let mut members = HashSet::new();

    for start in 0..rows.len() {
        if visited[start] || marks[start] != Mark::Fresh {
            continue;
        }
        let mut path = Vec::new();
        let mut current = Some(start);
        while let Some(idx) = current {
            if visited[idx] {
                break;
            }
            match marks[idx] {
                Mark::Done => break,
                Mark::OnPath => {
                    if let Some(at) = path.iter().position(|&p| p == idx) {
                        members.extend(path[at..].iter().copied());
                    }
                    break;
                }
                Mark::Fresh => {
                    marks[idx] = Mark::OnPath;
                    path.push(idx);
                    current = rows[idx].parent_id.and_then(|p| row_index.get(&p).copied());
                }
            }
        }
        for idx in path {
            marks[idx] = Mark::Done;
        }
    }

    members.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cat(id: i64, nome: &str, parent_id: Option<i64>) -> Category {
        Category {
            id,
            nome: nome.to_string(),
            parent_id,
            descricao: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn flat(forest: &CategoryForest) -> Vec<(String, usize, String)> {
        forest
            .entries()
            .iter()
            .map(|e| (e.nome.clone(), e.nivel, e.caminho.clone()))
            .collect()
    }

    #[test]
    fn test_basic_flatten() {
        let forest = build_forest(&[
            cat(1, "Bolos", None),
            cat(2, "Recheados", Some(1)),
            cat(3, "Doces", None),
        ]);
        assert_eq!(
            flat(&forest),
            vec![
                ("Bolos".to_string(), 0, "Bolos".to_string()),
                ("Recheados".to_string(), 1, "Bolos > Recheados".to_string()),
                ("Doces".to_string(), 0, "Doces".to_string()),
            ]
        );
        assert!(forest.get(1).unwrap().has_children);
        assert!(!forest.get(3).unwrap().has_children);
        assert_eq!(forest.children_of(1), &[2]);
        assert!(forest.cycle_breaks().is_empty());
    }

    #[test]
    fn test_children_before_parent_in_input() {
        let forest = build_forest(&[
            cat(3, "Chocolate", Some(2)),
            cat(2, "Recheados", Some(1)),
            cat(1, "Bolos", None),
        ]);
        assert_eq!(
            forest.get(3).unwrap().caminho,
            "Bolos > Recheados > Chocolate"
        );
        assert_eq!(forest.get(3).unwrap().nivel, 2);
    }

    #[test]
    fn test_sibling_order_folds_accents_and_case() {
        let forest = build_forest(&[
            cat(1, "Zeppole", None),
            cat(2, "éclair", None),
            cat(3, "Açúcar", None),
            cat(4, "bolos", None),
        ]);
        let names: Vec<&str> = forest.entries().iter().map(|e| e.nome.as_str()).collect();
        assert_eq!(names, vec!["Açúcar", "bolos", "éclair", "Zeppole"]);
    }

    #[test]
    fn test_equal_keys_tie_break_on_raw_name_then_id() {
        let forest = build_forest(&[
            cat(5, "doces", None),
            cat(4, "Doces", None),
            cat(2, "Doces", None),
        ]);
        let ids: Vec<i64> = forest.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 4, 5]);
    }

    #[test]
    fn test_display_names_drop_escape_sequences() {
        let forest = build_forest(&[
            cat(1, "Bolos\x1b[31m", None),
            cat(2, "Re\x1b]0;title\x07cheados", Some(1)),
        ]);
        assert_eq!(forest.get(1).unwrap().nome, "Bolos");
        assert_eq!(forest.get(2).unwrap().caminho, "Bolos > Recheados");
        // The stored row is untouched
        assert_eq!(forest.category(1).unwrap().nome, "Bolos\x1b[31m");
    }

    #[test]
    fn test_orphan_becomes_root() {
        let forest = build_forest(&[cat(1, "Tortas", Some(99))]);
        let entry = forest.get(1).unwrap();
        assert_eq!(entry.nivel, 0);
        assert_eq!(entry.caminho, "Tortas");
        assert_eq!(entry.parent_id, Some(99));
        assert!(forest.cycle_breaks().is_empty());
    }

    #[test]
    fn test_two_node_cycle_terminates() {
        let forest = build_forest(&[cat(1, "A", Some(2)), cat(2, "B", Some(1))]);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest.cycle_breaks(), &[1]);
        assert_eq!(
            flat(&forest),
            vec![
                ("A".to_string(), 0, "A".to_string()),
                ("B".to_string(), 1, "A > B".to_string()),
            ]
        );
        // The back edge to the promoted root is dropped
        assert!(!forest.get(2).unwrap().has_children);
    }

    #[test]
    fn test_self_parent_terminates() {
        let forest = build_forest(&[cat(7, "Loop", Some(7)), cat(1, "Bolos", None)]);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest.cycle_breaks(), &[7]);
        assert_eq!(forest.get(7).unwrap().nivel, 0);
    }

    #[test]
    fn test_branch_hanging_off_cycle_stays_attached() {
        // 1 <-> 2 cycle, 3 is a plain child of 2
        let forest = build_forest(&[
            cat(1, "Beta", Some(2)),
            cat(2, "Gama", Some(1)),
            cat(3, "Alfa", Some(2)),
        ]);
        assert_eq!(forest.cycle_breaks(), &[1]);
        assert_eq!(forest.get(3).unwrap().caminho, "Beta > Gama > Alfa");
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let forest = build_forest(&[cat(1, "Bolos", None), cat(1, "Outro", None)]);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest.get(1).unwrap().nome, "Bolos");
    }

    #[test]
    fn test_roots_owns_subtrees() {
        let forest = build_forest(&[
            cat(1, "Bolos", None),
            cat(2, "Recheados", Some(1)),
            cat(4, "Chocolate", Some(2)),
            cat(5, "Simples", Some(1)),
            cat(3, "Doces", None),
        ]);
        let roots = forest.roots();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].category.nome, "Bolos");
        let kids: Vec<&str> = roots[0]
            .subcategorias
            .iter()
            .map(|n| n.category.nome.as_str())
            .collect();
        assert_eq!(kids, vec!["Recheados", "Simples"]);
        assert_eq!(roots[0].subcategorias[0].subcategorias[0].nivel, 2);
        assert!(roots[1].subcategorias.is_empty());
    }

    #[test]
    fn test_descendant_count() {
        let forest = build_forest(&[
            cat(1, "Bolos", None),
            cat(2, "Recheados", Some(1)),
            cat(4, "Chocolate", Some(2)),
            cat(3, "Doces", None),
        ]);
        assert_eq!(forest.descendant_count(1), 2);
        assert_eq!(forest.descendant_count(2), 1);
        assert_eq!(forest.descendant_count(3), 0);
        assert_eq!(forest.descendant_count(42), 0);
    }

    #[test]
    fn test_empty_input() {
        let forest = build_forest(&[]);
        assert!(forest.is_empty());
        assert!(forest.roots().is_empty());
    }
}
