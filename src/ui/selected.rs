use crate::app::{App, Focus};
use crate::util::truncate_to_width;
use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

/// Render the "Selected" panel: chosen categories by full path, tree order.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let focused = app.focus == Focus::Selected;
    let border_style = if focused {
        app.style("panel_border_focused")
    } else {
        app.style("panel_border")
    };
    let entries = app.selection.selected_categories(&app.forest);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(format!("Selected ({})", entries.len()));

    if entries.is_empty() {
        let hint = app
            .keybindings
            .key_label(crate::keybindings::Action::ToggleSelect)
            .map(|key| format!("Press {} on a category to select it", key))
            .unwrap_or_else(|| "Nothing selected".to_string());
        let empty = Paragraph::new(hint)
            .alignment(Alignment::Center)
            .style(app.style("empty_state"))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let inner_width = area.width.saturating_sub(2) as usize;
    let items: Vec<ListItem> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let style = if focused && i == app.selected_cursor {
                app.style("tree_selected")
            } else {
                app.style("path_dim")
            };
            let caminho = truncate_to_width(&entry.caminho, inner_width);
            ListItem::new(Line::from(Span::styled(caminho.into_owned(), style)))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default());
    let mut state = ListState::default().with_selected(Some(app.selected_cursor));
    f.render_stateful_widget(list, area, &mut state);
}
