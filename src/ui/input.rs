//! Keyboard input handling.
//!
//! Overlays capture every key while visible, in this order: help, delete
//! confirmation, the category dialog (and its parent picker). Otherwise keys
//! go through the keybinding registry for the focused panel.

use crate::app::{App, AppEvent, CategoryDialog, ConfirmAction, Focus, ParentPicker};
use crate::catalog::{ParentRef, SelectOutcome};
use crate::keybindings::{Action as KbAction, Context as KbContext};
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::helpers::{spawn_delete, spawn_submission, start_reload};
use super::Action;

fn focus_to_context(focus: Focus) -> KbContext {
    match focus {
        Focus::Tree => KbContext::Tree,
        Focus::Selected => KbContext::Selected,
    }
}

/// Main input dispatch.
pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    if app.show_help {
        handle_help_input(app, code);
        return Action::Continue;
    }

    if app.pending_confirm.is_some() {
        handle_confirm_input(app, code, event_tx);
        return Action::Continue;
    }

    if app.dialog.is_some() {
        handle_dialog_input(app, code, modifiers, event_tx);
        return Action::Continue;
    }

    handle_browse_input(app, code, modifiers, event_tx)
}

/// j/k scroll, Esc/q/? dismiss.
fn handle_help_input(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
            app.show_help = false;
            app.help_scroll_offset = 0;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_sub(1);
        }
        _ => {}
    }
}

/// y/Y confirms, n/N/Esc cancels.
fn handle_confirm_input(app: &mut App, code: KeyCode, event_tx: &mpsc::Sender<AppEvent>) {
    match code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            if let Some(ConfirmAction::DeleteCategory {
                id,
                nome,
                descendants,
            }) = app.pending_confirm.take()
            {
                app.set_status(format!("Deleting '{}'...", nome));
                spawn_delete(id, nome, descendants, app.repo.clone(), event_tx.clone());
            }
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.pending_confirm = None;
            app.set_status("Cancelled");
        }
        _ => {}
    }
}

fn handle_dialog_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    if app.dialog.as_ref().is_some_and(|d| d.picker.is_some()) {
        handle_picker_input(app, code);
        return;
    }

    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    match code {
        KeyCode::Esc => {
            app.dialog = None;
        }
        KeyCode::Enter => submit_dialog(app, event_tx),
        KeyCode::Tab | KeyCode::BackTab => {
            if let Some(dialog) = app.dialog.as_mut() {
                dialog.form.next_field();
            }
        }
        KeyCode::Char('p') if ctrl => {
            let forest = app.forest.clone();
            if let Some(dialog) = app.dialog.as_mut() {
                if dialog.form.is_create() {
                    let current = dialog.form.parent().map(|p| p.id);
                    dialog.picker = Some(ParentPicker::new(current, &forest));
                }
            }
        }
        KeyCode::Char('k') if ctrl => {
            if let Some(dialog) = app.dialog.as_mut() {
                if dialog.form.is_create() {
                    dialog.form.keep_creating = !dialog.form.keep_creating;
                }
            }
        }
        KeyCode::Backspace => {
            if let Some(dialog) = app.dialog.as_mut() {
                dialog.form.backspace();
                dialog.error = None;
            }
        }
        KeyCode::Char(c) if !ctrl => {
            if let Some(dialog) = app.dialog.as_mut() {
                dialog.form.push_char(c);
                dialog.error = None;
            }
        }
        _ => {}
    }
}

/// Validate locally, then hand the payload to a background task.
///
/// Invalid input never reaches the repository.
fn submit_dialog(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(dialog) = app.dialog.as_mut() else {
        return;
    };
    if dialog.form.submitting {
        return;
    }
    match dialog.form.submission() {
        Ok(submission) => {
            dialog.form.submitting = true;
            dialog.error = None;
            spawn_submission(dialog.id, submission, app.repo.clone(), event_tx.clone());
        }
        Err(e) => {
            dialog.error = Some(e.to_string());
        }
    }
}

fn handle_picker_input(app: &mut App, code: KeyCode) {
    let forest = app.forest.clone();
    let Some(CategoryDialog {
        form,
        picker: picker_slot,
        ..
    }) = app.dialog.as_mut()
    else {
        return;
    };
    let Some(picker) = picker_slot.as_mut() else {
        return;
    };

    // Row 0 is "no parent"
    let rows = forest.len() + 1;
    match code {
        KeyCode::Esc => {
            *picker_slot = None;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if picker.cursor + 1 < rows {
                picker.cursor += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            picker.cursor = picker.cursor.saturating_sub(1);
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            if picker.cursor == 0 {
                picker.selection.clear();
                form.set_parent(None);
                *picker_slot = None;
                return;
            }
            let Some(entry) = forest.entries().get(picker.cursor - 1) else {
                return;
            };
            if picker.selection.select(entry.id) == SelectOutcome::Close {
                form.set_parent(Some(ParentRef {
                    id: entry.id,
                    caminho: entry.caminho.clone(),
                }));
                *picker_slot = None;
            }
        }
        _ => {}
    }
}

fn handle_browse_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    let context = focus_to_context(app.focus);
    let Some(action) = app.keybindings.action_for_key(code, modifiers, context) else {
        return Action::Continue;
    };

    match action {
        KbAction::Quit => return Action::Quit,
        KbAction::NavDown => app.nav_down(),
        KbAction::NavUp => app.nav_up(),
        KbAction::CycleFocus => app.cycle_focus(),
        KbAction::Back => {
            if app.focus == Focus::Selected {
                app.cycle_focus();
            }
        }
        KbAction::ToggleExpand => {
            if let Some(id) = app.current_id() {
                app.toggle_collapse(id);
            }
        }
        KbAction::Collapse => app.collapse_or_parent(),
        KbAction::Expand => app.expand_or_child(),
        KbAction::ExpandAll => app.expand_all(),
        KbAction::CollapseAll => app.collapse_all(),
        KbAction::ToggleSelect => {
            if let Some(msg) = app.toggle_current_selection() {
                app.set_status(msg);
            }
        }
        KbAction::RemoveSelected => {
            if let Some(msg) = app.remove_selected_at_cursor() {
                app.set_status(msg);
            }
        }
        KbAction::ClearSelection => {
            if !app.selection.is_empty() {
                app.selection.clear();
                app.clamp_cursors();
                app.set_status("Selection cleared");
            }
        }
        KbAction::NewCategory => app.open_create_dialog(None),
        KbAction::AddSubcategory => {
            if !app.open_add_subcategory_dialog() {
                app.set_status("No category selected");
            }
        }
        KbAction::EditCategory => {
            if !app.open_edit_dialog() {
                app.set_status("No category selected");
            }
        }
        KbAction::DeleteCategory => {
            if !app.request_delete() {
                app.set_status("No category selected");
            }
        }
        KbAction::Reload => {
            app.set_status("Reloading...");
            start_reload(app, event_tx);
        }
        KbAction::CycleTheme => {
            let name = app.cycle_theme();
            app.set_status(format!("Theme: {}", name));
        }
        KbAction::ShowHelp => {
            app.show_help = true;
            app.help_scroll_offset = 0;
        }
    }
    Action::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::UiSettings;
    use crate::catalog::build_forest;
    use crate::repository::CategoryRepository;
    use crate::storage::{Category, Database, NewCategory};

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

    fn press(app: &mut App, code: KeyCode, tx: &mpsc::Sender<AppEvent>) -> Action {
        handle_input(app, code, KeyModifiers::NONE, tx)
    }

    fn type_str(app: &mut App, s: &str, tx: &mpsc::Sender<AppEvent>) {
        for c in s.chars() {
            press(app, KeyCode::Char(c), tx);
        }
    }

    #[tokio::test]
    async fn test_quit() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        assert_eq!(press(&mut app, KeyCode::Char('q'), &tx), Action::Quit);
    }

    #[tokio::test]
    async fn test_dialog_captures_q() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Char('n'), &tx);
        assert!(app.dialog.is_some());
        assert_eq!(press(&mut app, KeyCode::Char('q'), &tx), Action::Continue);
        assert_eq!(app.dialog.as_ref().unwrap().form.nome, "q");
    }

    #[tokio::test]
    async fn test_blank_submit_shows_error_without_request() {
        let mut app = test_app().await;
        let (tx, mut rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Char('n'), &tx);
        type_str(&mut app, "   ", &tx);
        press(&mut app, KeyCode::Enter, &tx);

        let dialog = app.dialog.as_ref().unwrap();
        assert_eq!(dialog.error.as_deref(), Some("Name cannot be empty"));
        assert!(!dialog.form.submitting);
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_submit_creates_category() {
        let mut app = test_app().await;
        let (tx, mut rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Char('n'), &tx);
        type_str(&mut app, "Tortas", &tx);
        press(&mut app, KeyCode::Enter, &tx);
        assert!(app.dialog.as_ref().unwrap().form.submitting);

        // A second Enter while in flight is ignored
        press(&mut app, KeyCode::Enter, &tx);

        match rx.recv().await.unwrap() {
            AppEvent::CategoryCreated { category, .. } => assert_eq!(category.nome, "Tortas"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(app.repo.list_categories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_parent_picker_sets_parent() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        app.apply_forest(build_forest(&[cat(1, "Bolos", None), cat(2, "Recheados", Some(1))]));

        press(&mut app, KeyCode::Char('n'), &tx);
        handle_input(&mut app, KeyCode::Char('p'), KeyModifiers::CONTROL, &tx);
        assert!(app.dialog.as_ref().unwrap().picker.is_some());

        press(&mut app, KeyCode::Down, &tx);
        press(&mut app, KeyCode::Down, &tx);
        press(&mut app, KeyCode::Enter, &tx);

        let dialog = app.dialog.as_ref().unwrap();
        assert!(dialog.picker.is_none());
        assert_eq!(
            dialog.form.parent(),
            Some(&ParentRef {
                id: 2,
                caminho: "Bolos > Recheados".to_string(),
            })
        );

        // Row 0 detaches again
        handle_input(&mut app, KeyCode::Char('p'), KeyModifiers::CONTROL, &tx);
        press(&mut app, KeyCode::Up, &tx);
        press(&mut app, KeyCode::Up, &tx);
        press(&mut app, KeyCode::Enter, &tx);
        assert_eq!(app.dialog.as_ref().unwrap().form.parent(), None);
    }

    #[tokio::test]
    async fn test_delete_confirm_and_cancel() {
        let mut app = test_app().await;
        let (tx, mut rx) = mpsc::channel(8);
        let bolos = app
            .repo
            .create_category(&NewCategory::root("Bolos"))
            .await
            .unwrap();
        app.apply_forest(build_forest(&[bolos.clone()]));

        press(&mut app, KeyCode::Char('d'), &tx);
        assert!(app.pending_confirm.is_some());
        press(&mut app, KeyCode::Char('n'), &tx);
        assert!(app.pending_confirm.is_none());

        press(&mut app, KeyCode::Char('d'), &tx);
        press(&mut app, KeyCode::Char('y'), &tx);
        match rx.recv().await.unwrap() {
            AppEvent::CategoryDeleted { id, descendants, .. } => {
                assert_eq!(id, bolos.id);
                assert_eq!(descendants, 0);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_reports_store_count_not_stale_forest() {
        let mut app = test_app().await;
        let (tx, mut rx) = mpsc::channel(8);
        let bolos = app
            .repo
            .create_category(&NewCategory::root("Bolos"))
            .await
            .unwrap();
        app.apply_forest(build_forest(&[bolos.clone()]));

        // Added behind the loaded forest's back
        app.repo
            .create_category(&NewCategory::child_of(bolos.id, "Recheados"))
            .await
            .unwrap();

        press(&mut app, KeyCode::Char('d'), &tx);
        press(&mut app, KeyCode::Char('y'), &tx);
        match rx.recv().await.unwrap() {
            AppEvent::CategoryDeleted { descendants, .. } => assert_eq!(descendants, 1),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_of_vanished_row() {
        let mut app = test_app().await;
        let (tx, mut rx) = mpsc::channel(8);
        app.apply_forest(build_forest(&[cat(41, "Fantasma", None)]));

        press(&mut app, KeyCode::Char('d'), &tx);
        press(&mut app, KeyCode::Char('y'), &tx);
        match rx.recv().await.unwrap() {
            AppEvent::CategoryAlreadyGone { id, nome } => {
                assert_eq!(id, 41);
                assert_eq!(nome, "Fantasma");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_space_selects_in_tree_and_removes_in_panel() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        app.apply_forest(build_forest(&[cat(1, "Bolos", None), cat(3, "Doces", None)]));

        press(&mut app, KeyCode::Char(' '), &tx);
        press(&mut app, KeyCode::Char('j'), &tx);
        press(&mut app, KeyCode::Char(' '), &tx);
        assert_eq!(app.selection.ids(), vec![1, 3]);

        press(&mut app, KeyCode::Tab, &tx);
        assert_eq!(app.focus, Focus::Selected);
        press(&mut app, KeyCode::Char(' '), &tx);
        assert_eq!(app.selection.ids(), vec![3]);

        press(&mut app, KeyCode::Esc, &tx);
        assert_eq!(app.focus, Focus::Tree);
    }

    #[tokio::test]
    async fn test_actions_without_rows_report_status() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Char('e'), &tx);
        assert!(app.dialog.is_none());
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert_eq!(msg, "No category selected");
    }

    #[tokio::test]
    async fn test_help_overlay_scroll_and_close() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Char('?'), &tx);
        assert!(app.show_help);
        press(&mut app, KeyCode::Char('j'), &tx);
        assert_eq!(app.help_scroll_offset, 1);
        press(&mut app, KeyCode::Esc, &tx);
        assert!(!app.show_help);
        assert_eq!(app.help_scroll_offset, 0);
    }
}
