//! Help overlay: scrollable keybinding table.
//!
//! Lists the live bindings, config overrides included, grouped by panel.
//! Dialog keys are fixed and listed last.

use crate::app::App;
use crate::keybindings::Context;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table},
    Frame,
};

const CONTEXT_ORDER: [Context; 3] = [Context::Global, Context::Tree, Context::Selected];

const DIALOG_KEYS: [(&str, &str); 6] = [
    ("Enter", "Save the form"),
    ("Tab", "Switch between name and description"),
    ("Ctrl+p", "Choose the parent category"),
    ("Ctrl+k", "Toggle keep creating"),
    ("Backspace", "Delete last character"),
    ("Esc", "Close without saving"),
];

fn section_header<'a>(app: &App, label: &str) -> Row<'a> {
    Row::new(vec![
        Line::from(Span::styled(
            format!("-- {} --", label),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ])
    .style(app.style("help_heading"))
}

pub fn render(f: &mut Frame, app: &App) {
    let overlay = centered_rect(80, 80, f.area());
    if overlay.width < 20 || overlay.height < 6 {
        return;
    }
    f.render_widget(Clear, overlay);

    let bindings = app.keybindings.all_bindings();
    let mut rows: Vec<Row> = Vec::new();

    for ctx in CONTEXT_ORDER {
        let mut group = bindings.iter().filter(|(c, ..)| *c == ctx).peekable();
        if group.peek().is_none() {
            continue;
        }
        rows.push(section_header(app, ctx.label()));
        for (_, key, _, description) in group {
            rows.push(Row::new(vec![format!("  {}", key), description.to_string()]));
        }
        rows.push(Row::new(vec![String::new(), String::new()]));
    }

    rows.push(section_header(app, "Dialog"));
    for (key, description) in DIALOG_KEYS {
        rows.push(Row::new(vec![format!("  {}", key), description.to_string()]));
    }

    let total_rows = rows.len();
    // Two border rows and the header
    let visible_height = overlay.height.saturating_sub(3) as usize;
    let max_scroll = total_rows.saturating_sub(visible_height);
    let scroll = app.help_scroll_offset.min(max_scroll);
    let visible_rows: Vec<Row> = rows.into_iter().skip(scroll).take(visible_height).collect();

    let title = if max_scroll > 0 {
        format!(" Help ({}/{}) ", scroll + 1, max_scroll + 1)
    } else {
        " Help (? to close) ".to_string()
    };

    let table = Table::new(visible_rows, [Constraint::Length(14), Constraint::Min(20)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border_focused"))
                .title(title),
        )
        .header(
            Row::new(vec!["Key", "Action"])
                .style(
                    Style::default()
                        .add_modifier(Modifier::BOLD)
                        .add_modifier(Modifier::UNDERLINED),
                )
                .bottom_margin(1),
        )
        .style(app.style("dialog_body"));
    f.render_widget(table, overlay);

    if scroll < max_scroll {
        let hint = Line::from(Span::styled(
            " j/k to scroll, ? or Esc to close ",
            app.style("dialog_hint"),
        ));
        let hint_area = Rect {
            x: overlay.x + 1,
            y: overlay.y + overlay.height.saturating_sub(1),
            width: overlay.width.saturating_sub(2),
            height: 1,
        };
        f.render_widget(Paragraph::new(hint), hint_area);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    )
}
