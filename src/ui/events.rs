//! Application event handling.
//!
//! Applies the results of background repository calls to the app state.

use crate::app::{App, AppEvent, CategoryDialog};
use crate::catalog::CategoryForest;
use crate::storage::Category;
use tokio::sync::mpsc;

use super::helpers::start_reload;

/// Handle one event from a background task.
pub(super) fn handle_app_event(app: &mut App, event: AppEvent, event_tx: &mpsc::Sender<AppEvent>) {
    match event {
        AppEvent::CategoriesLoaded { generation, result } => {
            handle_categories_loaded(app, generation, result);
        }
        AppEvent::CategoryCreated { dialog, category } => {
            handle_category_created(app, dialog, category);
            start_reload(app, event_tx);
        }
        AppEvent::CategoryUpdated { dialog, category } => {
            if app.dialog_with_id(dialog).is_some() {
                app.dialog = None;
                app.pending_cursor_id = Some(category.id);
            }
            app.set_status(format!("Saved '{}'", category.nome));
            start_reload(app, event_tx);
        }
        AppEvent::CategoryCreateFailed { dialog, error }
        | AppEvent::CategoryUpdateFailed { dialog, error } => {
            handle_save_failed(app, dialog, error);
        }
        AppEvent::CategoryDeleted {
            id,
            nome,
            descendants,
        } => {
            app.selection.remove(id);
            if descendants > 0 {
                app.set_status(format!(
                    "Deleted '{}' and {} subcategories",
                    nome, descendants
                ));
            } else {
                app.set_status(format!("Deleted '{}'", nome));
            }
            start_reload(app, event_tx);
        }
        AppEvent::CategoryAlreadyGone { id, nome } => {
            app.selection.remove(id);
            app.set_status(format!("'{}' was already deleted", nome));
            start_reload(app, event_tx);
        }
        AppEvent::CategoryDeleteFailed { id, error } => {
            tracing::debug!(id, "Delete failure reported to user");
            app.set_status(format!("Delete failed: {}", error));
        }
        AppEvent::TaskPanicked { task, error } => {
            tracing::error!(task, error, "Background task panicked");
            if task == "save_category" {
                if let Some(dialog) = app.dialog.as_mut() {
                    dialog.form.submitting = false;
                }
            }
            if task == "reload" {
                app.loading = false;
                app.reload_handle = None;
            }
            app.set_status(format!("Internal error in {} task", task));
        }
    }
    app.needs_redraw = true;
}

fn handle_categories_loaded(app: &mut App, generation: u64, result: Result<CategoryForest, String>) {
    if generation != app.reload_generation {
        tracing::debug!(
            generation,
            current = app.reload_generation,
            "Discarding stale category load"
        );
        return;
    }

    app.loading = false;
    app.reload_handle = None;

    match result {
        Ok(forest) => {
            tracing::debug!(count = forest.len(), generation, "Categories loaded");
            app.apply_forest(forest);
        }
        Err(error) => {
            // The previous forest stays on screen
            app.set_status(format!("Failed to load categories: {}", error));
        }
    }
}

/// Only the submitting dialog is reset or closed. If it was dismissed while
/// the insert ran, whatever is open now is left alone.
fn handle_category_created(app: &mut App, dialog_id: u64, category: Category) {
    app.set_status(format!("Created '{}'", category.nome));

    if let Some(parent_id) = category.parent_id {
        app.collapsed.remove(&parent_id);
    }

    let Some(dialog) = app.dialog_with_id(dialog_id) else {
        tracing::debug!(dialog_id, "Create finished after its dialog closed");
        return;
    };
    if dialog.form.is_create() && dialog.form.keep_creating {
        dialog.form.reset_for_next();
        dialog.error = None;
    } else {
        app.dialog = None;
        app.pending_cursor_id = Some(category.id);
    }
}

fn handle_save_failed(app: &mut App, dialog_id: u64, error: String) {
    if let Some(CategoryDialog { form, error: slot, .. }) = app.dialog_with_id(dialog_id) {
        form.submitting = false;
        *slot = Some(error.clone());
    }
    app.set_status(format!("Save failed: {}", error));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::UiSettings;
    use crate::catalog::{build_forest, CategoryForm, ParentRef};
    use crate::repository::CategoryRepository;
    use crate::storage::Database;

    async fn test_app() -> App {
        let db = Database::open(":memory:").await.unwrap();
        App::new(CategoryRepository::Local(db), UiSettings::default())
    }

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

    #[tokio::test]
    async fn test_stale_generation_is_discarded() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        app.reload_generation = 3;
        app.loading = true;

        handle_app_event(
            &mut app,
            AppEvent::CategoriesLoaded {
                generation: 2,
                result: Ok(build_forest(&[cat(1, "Velho", None)])),
            },
            &tx,
        );
        assert!(app.forest.is_empty());
        assert!(app.loading);

        handle_app_event(
            &mut app,
            AppEvent::CategoriesLoaded {
                generation: 3,
                result: Ok(build_forest(&[cat(1, "Bolos", None)])),
            },
            &tx,
        );
        assert_eq!(app.forest.len(), 1);
        assert!(!app.loading);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_forest() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        app.apply_forest(build_forest(&[cat(1, "Bolos", None)]));
        app.reload_generation = 1;
        app.loading = true;

        handle_app_event(
            &mut app,
            AppEvent::CategoriesLoaded {
                generation: 1,
                result: Err("connection refused".to_string()),
            },
            &tx,
        );
        assert_eq!(app.forest.len(), 1);
        assert!(!app.loading);
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert!(msg.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_create_closes_dialog_and_targets_new_row() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        let dialog = app.show_dialog(CategoryForm::create(None, false));

        handle_app_event(
            &mut app,
            AppEvent::CategoryCreated {
                dialog,
                category: cat(9, "Tortas", None),
            },
            &tx,
        );
        assert!(app.dialog.is_none());
        assert_eq!(app.pending_cursor_id, Some(9));
        assert!(app.loading, "a reload is started");
    }

    #[tokio::test]
    async fn test_keep_creating_resets_form() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        let parent = ParentRef {
            id: 1,
            caminho: "Bolos".to_string(),
        };
        let mut form = CategoryForm::create(Some(parent.clone()), true);
        form.nome = "Simples".to_string();
        form.submitting = true;
        let dialog = app.show_dialog(form);
        app.collapsed.insert(1);

        handle_app_event(
            &mut app,
            AppEvent::CategoryCreated {
                dialog,
                category: cat(5, "Simples", Some(1)),
            },
            &tx,
        );
        let dialog = app.dialog.as_ref().unwrap();
        assert!(dialog.form.nome.is_empty());
        assert!(!dialog.form.submitting);
        assert_eq!(dialog.form.parent(), Some(&parent));
        assert!(!app.collapsed.contains(&1));
    }

    #[tokio::test]
    async fn test_save_failure_stays_in_dialog() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        let mut form = CategoryForm::create(None, false);
        form.nome = "Bolos".to_string();
        form.submitting = true;
        let dialog = app.show_dialog(form);

        handle_app_event(
            &mut app,
            AppEvent::CategoryCreateFailed {
                dialog,
                error: "HTTP 401".to_string(),
            },
            &tx,
        );
        let dialog = app.dialog.as_ref().unwrap();
        assert_eq!(dialog.error.as_deref(), Some("HTTP 401"));
        assert!(!dialog.form.submitting);
        assert_eq!(dialog.form.nome, "Bolos");
        assert!(!app.loading);
    }

    #[tokio::test]
    async fn test_late_save_result_leaves_other_dialog_alone() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        let mut form = CategoryForm::create(None, false);
        form.nome = "Tortas".to_string();
        form.submitting = true;
        let create_dialog = app.show_dialog(form);

        // Dismissed while the insert runs, then an edit is opened
        app.dialog = None;
        let mut edit = CategoryForm::edit(&cat(3, "Doces", None));
        edit.nome.push_str(" finos");
        let edit_dialog = app.show_dialog(edit);
        assert_ne!(create_dialog, edit_dialog);

        handle_app_event(
            &mut app,
            AppEvent::CategoryCreateFailed {
                dialog: create_dialog,
                error: "HTTP 500".to_string(),
            },
            &tx,
        );
        let open = app.dialog.as_ref().unwrap();
        assert_eq!(open.id, edit_dialog);
        assert_eq!(open.error, None);
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert!(msg.contains("HTTP 500"));

        handle_app_event(
            &mut app,
            AppEvent::CategoryCreated {
                dialog: create_dialog,
                category: cat(9, "Tortas", None),
            },
            &tx,
        );
        let open = app.dialog.as_ref().unwrap();
        assert_eq!(open.id, edit_dialog);
        assert_eq!(open.form.nome, "Doces finos");
        assert_eq!(app.pending_cursor_id, None);
        assert!(app.loading, "the new row is still loaded");

        handle_app_event(
            &mut app,
            AppEvent::CategoryUpdated {
                dialog: create_dialog,
                category: cat(3, "Doces", None),
            },
            &tx,
        );
        assert!(app.dialog.is_some());
    }

    #[tokio::test]
    async fn test_delete_reports_subtree_and_unselects() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        app.apply_forest(build_forest(&[cat(1, "Bolos", None), cat(2, "Recheados", Some(1))]));
        app.selection.select(1);

        handle_app_event(
            &mut app,
            AppEvent::CategoryDeleted {
                id: 1,
                nome: "Bolos".to_string(),
                descendants: 1,
            },
            &tx,
        );
        assert!(app.selection.is_empty());
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert_eq!(msg, "Deleted 'Bolos' and 1 subcategories");
    }

    #[tokio::test]
    async fn test_reload_panic_clears_loading() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        app.loading = true;

        handle_app_event(
            &mut app,
            AppEvent::TaskPanicked {
                task: "reload",
                error: "boom".to_string(),
            },
            &tx,
        );
        assert!(!app.loading);
    }
}
