//! Background task spawning shared by input and event handling.
//!
//! Every repository call runs on its own task and reports back through the
//! app event channel, so the render loop never awaits the network or disk.

use crate::app::{App, AppEvent};
use crate::catalog::{build_forest, FormSubmission};
use crate::repository::CategoryRepository;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;

/// Wraps a future to catch panics and convert them to errors.
///
/// A panicking task would otherwise vanish inside the runtime and leave the
/// UI waiting on an event that never arrives.
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

/// Send an event, logging instead of failing when the UI has gone away.
async fn send_event(tx: &mpsc::Sender<AppEvent>, event: AppEvent, name: &'static str) {
    if let Err(e) = tx.send(event).await {
        tracing::warn!(error = %e, event = name, "Channel send failed (receiver dropped)");
    }
}

/// Run `work` on a new task, reporting a panic as `TaskPanicked`.
fn spawn_guarded<F>(
    task: &'static str,
    tx: mpsc::Sender<AppEvent>,
    work: F,
) -> tokio::task::JoinHandle<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(panic_msg) = catch_task_panic(work).await {
            tracing::error!(task, error = %panic_msg, "Background task panicked");
            let _ = tx
                .send(AppEvent::TaskPanicked {
                    task,
                    error: panic_msg,
                })
                .await;
        }
    })
}

/// Start a reload, superseding any reload still in flight.
///
/// The forest is built on the worker so a large catalog never stalls a
/// frame. Results from older generations are ignored when they arrive.
pub(super) fn start_reload(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    if let Some(handle) = app.reload_handle.take() {
        handle.abort();
    }
    app.reload_generation = app.reload_generation.wrapping_add(1);
    app.loading = true;
    app.needs_redraw = true;

    let generation = app.reload_generation;
    let repo = app.repo.clone();
    let event_tx = tx.clone();
    app.reload_handle = Some(spawn_guarded("reload", tx.clone(), async move {
        let result = match repo.list_categories().await {
            Ok(categories) => Ok(build_forest(&categories)),
            Err(e) => {
                tracing::error!(error = %e, generation, "Failed to load categories");
                Err(format!("{:#}", e))
            }
        };
        send_event(
            &event_tx,
            AppEvent::CategoriesLoaded { generation, result },
            "CategoriesLoaded",
        )
        .await;
    }));
}

/// Submit a validated form to the repository on behalf of dialog `dialog`.
pub(super) fn spawn_submission(
    dialog: u64,
    submission: FormSubmission,
    repo: CategoryRepository,
    tx: mpsc::Sender<AppEvent>,
) {
    let event_tx = tx.clone();
    spawn_guarded("save_category", tx, async move {
        let event = match submission {
            FormSubmission::Create(new) => match repo.create_category(&new).await {
                Ok(category) => {
                    tracing::info!(id = category.id, nome = %category.nome, "Category created");
                    AppEvent::CategoryCreated { dialog, category }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Category create failed");
                    AppEvent::CategoryCreateFailed {
                        dialog,
                        error: format!("{:#}", e),
                    }
                }
            },
            FormSubmission::Update { id, update } => match repo.update_category(id, &update).await {
                Ok(category) => {
                    tracing::info!(id, nome = %category.nome, "Category updated");
                    AppEvent::CategoryUpdated { dialog, category }
                }
                Err(e) => {
                    tracing::error!(id, error = %e, "Category update failed");
                    AppEvent::CategoryUpdateFailed {
                        dialog,
                        error: format!("{:#}", e),
                    }
                }
            },
        };
        send_event(&event_tx, event, "CategorySaved").await;
    });
}

/// Delete a category (and, through the cascade, its subtree).
///
/// `shown_descendants` is reported only when the store does not count the
/// cascade itself.
pub(super) fn spawn_delete(
    id: i64,
    nome: String,
    shown_descendants: usize,
    repo: CategoryRepository,
    tx: mpsc::Sender<AppEvent>,
) {
    let event_tx = tx.clone();
    spawn_guarded("delete_category", tx, async move {
        let event = match repo.delete_category(id).await {
            Ok(Some(deleted)) => {
                let descendants = deleted
                    .descendants()
                    .and_then(|n| usize::try_from(n).ok())
                    .unwrap_or(shown_descendants);
                tracing::info!(id, nome = %deleted.category.nome, descendants, "Category deleted");
                AppEvent::CategoryDeleted {
                    id,
                    nome: deleted.category.nome,
                    descendants,
                }
            }
            Ok(None) => {
                tracing::info!(id, "Category was already deleted");
                AppEvent::CategoryAlreadyGone { id, nome }
            }
            Err(e) => {
                tracing::error!(id, error = %e, "Category delete failed");
                AppEvent::CategoryDeleteFailed {
                    id,
                    error: format!("{:#}", e),
                }
            }
        };
        send_event(&event_tx, event, "CategoryDeleted").await;
    });
}
