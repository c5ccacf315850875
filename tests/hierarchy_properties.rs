//! Properties of the flattened forest, over arbitrary parent links.
//!
//! Rows come from proptest with duplicate ids, dangling parents, self
//! references and longer cycles mixed in. The builder must always terminate
//! and emit every distinct id exactly once.

use doceria::catalog::{build_forest, CategoryForest, PATH_SEPARATOR};
use doceria::storage::Category;
use doceria::util::collation_key;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

const NAMES: &[&str] = &[
    "Bolos", "bolos", "Éclair", "eclair", "Doces", "Tortas", "Pães", "paes", "Zeppole", "Açúcar",
];

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

/// Any shape: ids and parents drawn from an overlapping range.
fn arbitrary_rows() -> impl Strategy<Value = Vec<Category>> {
    prop::collection::vec(
        (1i64..25, prop::option::of(0i64..30), prop::sample::select(NAMES)),
        0..40,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(id, parent, nome)| cat(id, nome, parent))
            .collect()
    })
}

/// Acyclic: a parent always has a smaller id, or dangles past the id range.
fn acyclic_rows() -> impl Strategy<Value = Vec<Category>> {
    prop::collection::vec(
        (prop::option::of(0usize..60), prop::sample::select(NAMES)),
        0..40,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (parent, nome))| {
                let id = i as i64 + 1;
                let parent_id = parent.map(|p| if p < i { p as i64 + 1 } else { 1000 + p as i64 });
                cat(id, nome, parent_id)
            })
            .collect()
    })
}

/// Checks that hold for every forest regardless of input shape.
fn check_structure(rows: &[Category], forest: &CategoryForest) {
    let distinct: HashSet<i64> = rows.iter().map(|r| r.id).collect();
    let emitted: Vec<i64> = forest.entries().iter().map(|e| e.id).collect();
    let emitted_set: HashSet<i64> = emitted.iter().copied().collect();
    assert_eq!(emitted.len(), emitted_set.len(), "an id was emitted twice");
    assert_eq!(emitted_set, distinct, "an id was dropped or invented");

    let entries = forest.entries();
    for (pos, entry) in entries.iter().enumerate() {
        if pos == 0 {
            assert_eq!(entry.nivel, 0);
        } else {
            assert!(entry.nivel <= entries[pos - 1].nivel + 1);
        }

        let next_deeper = entries
            .get(pos + 1)
            .is_some_and(|next| next.nivel > entry.nivel);
        assert_eq!(entry.has_children, next_deeper);

        if entry.nivel == 0 {
            assert_eq!(entry.caminho, entry.nome);
        } else {
            let parent = entries[..pos]
                .iter()
                .rev()
                .find(|e| e.nivel == entry.nivel - 1)
                .unwrap();
            assert_eq!(
                entry.caminho,
                format!("{}{}{}", parent.caminho, PATH_SEPARATOR, entry.nome)
            );
            assert!(forest.children_of(parent.id).contains(&entry.id));
        }
    }
}

fn sort_key(forest: &CategoryForest, id: i64) -> (String, String, i64) {
    let nome = forest.get(id).unwrap().nome.clone();
    (collation_key(&nome), nome, id)
}

proptest! {
    #[test]
    fn prop_any_input_terminates_with_each_id_once(rows in arbitrary_rows()) {
        let forest = build_forest(&rows);
        check_structure(&rows, &forest);
        for id in forest.cycle_breaks() {
            prop_assert_eq!(forest.get(*id).map(|e| e.nivel), Some(0));
        }
    }

    #[test]
    fn prop_acyclic_input_follows_parent_links(rows in acyclic_rows()) {
        let forest = build_forest(&rows);
        check_structure(&rows, &forest);
        prop_assert!(forest.cycle_breaks().is_empty());

        let by_id: HashMap<i64, &Category> = rows.iter().map(|r| (r.id, r)).collect();
        let entries = forest.entries();
        for (pos, entry) in entries.iter().enumerate() {
            let parent_exists = entry.parent_id.is_some_and(|p| by_id.contains_key(&p));
            if parent_exists {
                let parent = entries[..pos]
                    .iter()
                    .rev()
                    .find(|e| e.nivel + 1 == entry.nivel);
                prop_assert_eq!(parent.map(|p| Some(p.id)), Some(entry.parent_id));
            } else {
                prop_assert_eq!(entry.nivel, 0);
            }
        }

        // Siblings are ordered by folded name, raw name, then id
        let roots: Vec<i64> = entries.iter().filter(|e| e.nivel == 0).map(|e| e.id).collect();
        let mut groups = vec![roots];
        groups.extend(entries.iter().map(|e| forest.children_of(e.id).to_vec()));
        for group in groups {
            let keys: Vec<_> = group.iter().map(|&id| sort_key(&forest, id)).collect();
            let mut sorted = keys.clone();
            sorted.sort();
            prop_assert_eq!(keys, sorted);
        }
    }

    #[test]
    fn prop_input_order_does_not_matter(rows in acyclic_rows()) {
        let mut reversed = rows.clone();
        reversed.reverse();
        let a: Vec<String> = build_forest(&rows).entries().iter().map(|e| e.caminho.clone()).collect();
        let b: Vec<String> = build_forest(&reversed).entries().iter().map(|e| e.caminho.clone()).collect();
        prop_assert_eq!(a, b);
    }
}

#[test]
fn test_bakery_example() {
    let rows = vec![
        cat(3, "Doces", None),
        cat(2, "Recheados", Some(1)),
        cat(1, "Bolos", None),
    ];
    let forest = build_forest(&rows);
    let flat: Vec<(usize, &str)> = forest
        .entries()
        .iter()
        .map(|e| (e.nivel, e.caminho.as_str()))
        .collect();
    assert_eq!(
        flat,
        vec![(0, "Bolos"), (1, "Bolos > Recheados"), (0, "Doces")]
    );

    let roots = forest.roots();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0].category.nome, "Bolos");
    assert_eq!(roots[0].subcategorias[0].category.nome, "Recheados");
    assert!(roots[1].subcategorias.is_empty());
}

#[test]
fn test_self_parent_and_two_cycle_terminate() {
    let rows = vec![
        cat(1, "Loop", Some(1)),
        cat(2, "A", Some(3)),
        cat(3, "B", Some(2)),
        cat(4, "Pendurado", Some(3)),
    ];
    let forest = build_forest(&rows);
    check_structure(&rows, &forest);
    assert_eq!(forest.len(), 4);

    let mut breaks = forest.cycle_breaks().to_vec();
    breaks.sort();
    assert_eq!(breaks, vec![1, 2]);
    assert_eq!(forest.get(4).unwrap().caminho, "A > B > Pendurado");
}

#[test]
fn test_duplicate_ids_keep_first() {
    let rows = vec![cat(1, "Bolos", None), cat(1, "Outro", None)];
    let forest = build_forest(&rows);
    assert_eq!(forest.len(), 1);
    assert_eq!(forest.get(1).unwrap().nome, "Bolos");
}
