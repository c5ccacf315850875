use crate::app::{App, Focus};
use crate::util::display_width;
use ratatui::{layout::Rect, widgets::Paragraph, Frame};
use std::borrow::Cow;

/// Render the status bar: the latest message, or key hints for the panel.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let (text, style): (Cow<'_, str>, _) = if let Some((msg, _)) = &app.status_message {
        let lower = msg.to_lowercase();
        let style = if lower.contains("failed") || lower.contains("error") {
            app.style("status_error")
        } else {
            app.style("status_bar")
        };
        (Cow::Borrowed(&**msg), style)
    } else {
        let hints = match app.focus {
            Focus::Tree => {
                "[n]ew [a]dd sub [e]dit [d]elete [Space]select [Enter]toggle [r]eload [?]help [q]uit"
            }
            Focus::Selected => "[x]remove [X]clear [Tab]tree [?]help [q]uit",
        };
        (Cow::Borrowed(hints), app.style("status_bar"))
    };

    let source = app.repo.describe();
    let text = if area.width as usize > display_width(&text) + display_width(&source) + 4 {
        Cow::Owned(format!("{}  [{}]", text, source))
    } else {
        text
    };

    f.render_widget(Paragraph::new(text).style(style), area);
}
