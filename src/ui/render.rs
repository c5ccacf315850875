//! Render dispatch for the TUI.

use crate::app::{App, ConfirmAction};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::dialog::centered;
use super::{dialog, help, selected, status, tree};

/// Minimum terminal dimensions for the two-panel layout.
pub(super) const MIN_WIDTH: u16 = 60;
pub(super) const MIN_HEIGHT: u16 = 10;

pub(super) fn render(f: &mut Frame, app: &App) {
    let area = f.area();
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);
    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(rows[0]);

    tree::render(f, app, panels[0]);
    selected::render(f, app, panels[1]);
    status::render(f, app, rows[1]);

    if let Some(dialog) = &app.dialog {
        dialog::render(f, app, dialog);
    }
    if let Some(confirm) = &app.pending_confirm {
        render_confirm_overlay(f, app, confirm);
    }
    if app.show_help {
        help::render(f, app);
    }
}

fn render_confirm_overlay(f: &mut Frame, app: &App, confirm: &ConfirmAction) {
    let text = match confirm {
        ConfirmAction::DeleteCategory {
            nome,
            descendants: 0,
            ..
        } => format!("Delete \"{}\"?\n\n\n(y) Confirm  (n/Esc) Cancel", nome),
        ConfirmAction::DeleteCategory {
            nome, descendants, ..
        } => format!(
            "Delete \"{}\"?\n\nIts {} subcategories will also be removed.\n\n(y) Confirm  (n/Esc) Cancel",
            nome, descendants
        ),
    };

    let overlay = centered(f.area(), 54, 8);
    if overlay.width < 10 || overlay.height < 5 {
        return;
    }
    f.render_widget(Clear, overlay);

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border_focused"))
                .title(" Confirm "),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .style(app.style("dialog_body"));
    f.render_widget(paragraph, overlay);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::UiSettings;
    use crate::catalog::build_forest;
    use crate::repository::CategoryRepository;
    use crate::storage::{Category, Database};
    use ratatui::{backend::TestBackend, Terminal};

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

    fn draw(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..height {
            for x in 0..width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[tokio::test]
    async fn test_empty_state() {
        let app = test_app().await;
        assert!(draw(&app, 80, 20).contains("No categories found"));
    }

    #[tokio::test]
    async fn test_loading_shows_placeholders_not_empty_state() {
        let mut app = test_app().await;
        app.loading = true;
        let screen = draw(&app, 80, 20);
        assert!(screen.contains('░'));
        assert!(!screen.contains("No categories found"));
    }

    #[tokio::test]
    async fn test_tree_indents_children() {
        let mut app = test_app().await;
        app.apply_forest(build_forest(&[cat(1, "Bolos", None), cat(2, "Recheados", Some(1))]));
        let screen = draw(&app, 80, 20);
        assert!(screen.contains("│v Bolos"));
        assert!(screen.contains("│    Recheados"));
    }

    #[tokio::test]
    async fn test_confirm_mentions_descendants() {
        let mut app = test_app().await;
        app.apply_forest(build_forest(&[cat(1, "Bolos", None), cat(2, "Recheados", Some(1))]));
        app.request_delete();
        let screen = draw(&app, 80, 20);
        assert!(screen.contains("1 subcategories"));
    }

    #[tokio::test]
    async fn test_too_small() {
        let app = test_app().await;
        assert!(draw(&app, 40, 8).contains("Terminal too small"));
    }
}
