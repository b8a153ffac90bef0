//! Todo list panel.

use crate::app::App;
use crate::theme::todo_color;
use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};
use todoq_core::TodoItem;

pub const SPINNER_TEXT: &str = "Loading todos...";
pub const EMPTY_TEXT: &str = "No todos on this page.";

pub fn todo_line(item: &TodoItem) -> String {
    let mark = if item.completed { "[x]" } else { "[ ]" };
    if item.is_pending() {
        format!("{mark} {} (saving)", item.title)
    } else {
        format!("{mark} {}", item.title)
    }
}

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let block = Block::default().title("Todos").borders(Borders::ALL);

    if app.page.show_spinner(&app.view) {
        let spinner = Paragraph::new(SPINNER_TEXT)
            .alignment(Alignment::Center)
            .style(Style::default().fg(app.theme.primary_dim))
            .block(block);
        f.render_widget(spinner, area);
        return;
    }
    if app.page.show_empty(&app.view) {
        let empty = Paragraph::new(EMPTY_TEXT)
            .alignment(Alignment::Center)
            .style(Style::default().fg(app.theme.text_dim))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .visible()
        .iter()
        .map(|item| {
            ListItem::new(todo_line(item)).style(Style::default().fg(todo_color(item, &app.theme)))
        })
        .collect();
    f.render_widget(List::new(items).block(block), area);
}
