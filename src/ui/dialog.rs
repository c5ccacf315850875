//! Create/edit dialog and the parent picker drawn over it.

use crate::app::{App, CategoryDialog, ParentPicker};
use crate::catalog::FormField;
use crate::util::truncate_to_width;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

/// A `width` x `height` rect centered in `area`, shrunk to leave a margin.
pub(super) fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}

pub fn render(f: &mut Frame, app: &App, dialog: &CategoryDialog) {
    let overlay = centered(f.area(), 64, 14);
    if overlay.width < 20 || overlay.height < 8 {
        return;
    }
    f.render_widget(Clear, overlay);

    let form = &dialog.form;
    let body = app.style("dialog_body");
    let active = app.style("dialog_field_active");
    let hint = app.style("dialog_hint");
    let inner_width = overlay.width.saturating_sub(4) as usize;

    let mut lines: Vec<Line> = Vec::with_capacity(12);

    if form.is_create() {
        let parent = form
            .parent()
            .map(|p| truncate_to_width(&p.caminho, inner_width.saturating_sub(8)).into_owned())
            .unwrap_or_else(|| "(none)".to_string());
        lines.push(Line::from(vec![
            Span::styled("Parent: ", hint),
            Span::styled(parent, body),
        ]));
        lines.push(Line::default());
    }

    for (field, label, value) in [
        (FormField::Nome, "Name", &form.nome),
        (FormField::Descricao, "Description", &form.descricao),
    ] {
        let is_active = form.field == field;
        let style = if is_active { active } else { body };
        let cursor = if is_active { "_" } else { "" };
        lines.push(Line::from(Span::styled(format!("{}:", label), hint)));
        lines.push(Line::from(Span::styled(format!("> {}{}", value, cursor), style)));
    }
    lines.push(Line::default());

    if form.submitting {
        lines.push(Line::from(Span::styled("Saving...", hint)));
    } else if let Some(error) = &dialog.error {
        lines.push(Line::from(Span::styled(error.clone(), app.style("dialog_error"))));
    } else {
        lines.push(Line::default());
    }

    let hints = if form.is_create() {
        let keep = if form.keep_creating { "on" } else { "off" };
        format!(
            "(Enter) Save  (Tab) Field  (Ctrl+p) Parent  (Ctrl+k) Keep creating: {}  (Esc) Cancel",
            keep
        )
    } else {
        "(Enter) Save  (Tab) Field  (Esc) Cancel".to_string()
    };
    lines.push(Line::from(Span::styled(hints, hint)));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border_focused"))
                .title(form.title()),
        )
        .wrap(Wrap { trim: false })
        .style(body);
    f.render_widget(paragraph, overlay);

    if let Some(picker) = &dialog.picker {
        render_picker(f, app, picker);
    }
}

fn render_picker(f: &mut Frame, app: &App, picker: &ParentPicker) {
    let overlay = centered(f.area(), 50, 16);
    if overlay.width < 20 || overlay.height < 5 {
        return;
    }
    f.render_widget(Clear, overlay);

    let inner_width = overlay.width.saturating_sub(4) as usize;
    let row_style = |row: usize| -> Style {
        if row == picker.cursor {
            app.style("tree_selected")
        } else {
            app.style("dialog_body")
        }
    };

    let mut items = Vec::with_capacity(app.forest.len() + 1);
    items.push(ListItem::new(Span::styled("(no parent)", row_style(0))));
    for (i, entry) in app.forest.entries().iter().enumerate() {
        let mark = if picker.selection.is_selected(entry.id) { "* " } else { "  " };
        let caminho = truncate_to_width(&entry.caminho, inner_width.saturating_sub(2));
        items.push(ListItem::new(Span::styled(
            format!("{}{}", mark, caminho),
            row_style(i + 1),
        )));
    }

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(app.style("panel_border_focused"))
            .title(" Parent (Enter pick, Esc back) "),
    );
    let mut state = ListState::default().with_selected(Some(picker.cursor));
    f.render_stateful_widget(list, overlay, &mut state);
}
