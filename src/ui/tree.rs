use crate::app::{App, Focus, TreeState};
use crate::util::truncate_to_width;
use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::loop_runner::SPINNER_FRAMES;

const SPINNER: [&str; SPINNER_FRAMES] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Placeholder bar widths, cycled across rows.
const PLACEHOLDER_WIDTHS: [usize; 4] = [18, 12, 24, 15];

fn panel_block<'a>(app: &App, title: String) -> Block<'a> {
    let border_style = if app.focus == Focus::Tree {
        app.style("panel_border_focused")
    } else {
        app.style("panel_border")
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(title)
}

/// Render the category tree panel.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let title = if app.loading {
        format!("Categories {}", SPINNER[app.spinner_frame % SPINNER_FRAMES])
    } else {
        format!("Categories ({})", app.forest.len())
    };

    match app.tree_state() {
        TreeState::Loading => render_placeholders(f, app, area, title),
        TreeState::Empty => {
            let empty = Paragraph::new("No categories found")
                .alignment(Alignment::Center)
                .style(app.style("empty_state"))
                .block(panel_block(app, title));
            f.render_widget(empty, area);
        }
        TreeState::Populated => render_rows(f, app, area, title),
    }
}

fn render_placeholders(f: &mut Frame, app: &App, area: Rect, title: String) {
    let style = app.style("tree_placeholder");
    let items: Vec<ListItem> = (0..app.settings.placeholder_rows)
        .map(|i| {
            let indent = if i % 3 == 0 { 0 } else { app.settings.indent_width as usize };
            let bar = "░".repeat(PLACEHOLDER_WIDTHS[i % PLACEHOLDER_WIDTHS.len()]);
            ListItem::new(Line::from(Span::styled(
                format!("{}{}", " ".repeat(indent), bar),
                style,
            )))
        })
        .collect();

    f.render_widget(List::new(items).block(panel_block(app, title)), area);
}

fn render_rows(f: &mut Frame, app: &App, area: Rect, title: String) {
    let style_selected = app.style("tree_selected");
    let style_branch = app.style("tree_branch");
    let style_leaf = app.style("tree_leaf");
    let style_marked = app.style("tree_marked");

    // Borders take two columns
    let inner_width = area.width.saturating_sub(2) as usize;
    let indent_width = app.settings.indent_width as usize;
    let focused = app.focus == Focus::Tree;

    let items: Vec<ListItem> = app
        .visible_rows()
        .enumerate()
        .map(|(i, entry)| {
            let indent = " ".repeat(indent_width * entry.nivel);
            let icon = if !entry.has_children {
                "  "
            } else if app.is_expanded(entry.id) {
                "v "
            } else {
                "> "
            };
            let marked = app.selection.is_selected(entry.id);
            let mark = if marked { "* " } else { "" };

            let style: Style = if focused && i == app.tree_cursor {
                style_selected
            } else if marked {
                style_marked
            } else if entry.has_children {
                style_branch
            } else {
                style_leaf
            };

            let prefix = format!("{}{}{}", indent, icon, mark);
            let room = inner_width.saturating_sub(prefix.chars().count());
            let name = truncate_to_width(&entry.nome, room);
            ListItem::new(Line::from(vec![
                Span::styled(prefix, style),
                Span::styled(name.into_owned(), style),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(panel_block(app, title))
        .highlight_style(Style::default());

    let mut state = ListState::default().with_selected(Some(app.tree_cursor));
    f.render_stateful_widget(list, area, &mut state);
}
