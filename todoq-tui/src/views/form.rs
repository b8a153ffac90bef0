//! New todo input.

use crate::app::App;
use crate::keys::InputMode;
use crate::theme::border_color;
use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let editing = app.mode == InputMode::Editing;
    let title = if app.form.is_submitting() {
        "New todo (adding...)"
    } else if editing {
        "New todo"
    } else {
        "New todo [i]"
    };
    let text_color = if app.form.is_submitting() {
        app.theme.text_dim
    } else {
        app.theme.text
    };
    let input = Paragraph::new(app.form.title()).style(Style::default().fg(text_color)).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color(editing, &app.theme))),
    );
    f.render_widget(input, area);

    if editing && !app.form.is_submitting() {
        let offset = u16::try_from(app.form.title().chars().count()).unwrap_or(u16::MAX);
        let max_x = area.x + area.width.saturating_sub(2);
        f.set_cursor((area.x + 1).saturating_add(offset).min(max_x), area.y + 1);
    }
}
