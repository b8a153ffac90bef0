//! View rendering.

pub mod form;
pub mod modal;
pub mod todos;

use crate::app::App;
use crate::keys::InputMode;
use crate::widgets::StatusIndicator;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use todoq_sync::LOAD_FAILED_MESSAGE;

pub fn render_view(f: &mut Frame<'_>, app: &App) {
    let banner_height = if app.page.load_failed(&app.view) { 3 } else { 0 };
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(banner_height),
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(f.size());

    render_header(f, app, layout[0]);
    if banner_height > 0 {
        StatusIndicator::error(LOAD_FAILED_MESSAGE, &app.theme).render(f, layout[1]);
    }
    todos::render(f, app, layout[2]);
    form::render(f, app, layout[3]);
    render_footer(f, app, layout[4]);

    if let Some(modal) = &app.modal {
        modal::render(f, app, modal, f.size());
    }
}

fn render_header(f: &mut Frame<'_>, app: &App, area: Rect) {
    let title = format!("todoq | {} | {}", app.page.label(), app.config.api.base_url);
    let block = Block::default().borders(Borders::ALL).title(Span::styled(
        title,
        Style::default().fg(app.theme.primary),
    ));
    f.render_widget(block, area);
}

/// Key hints; page keys are dimmed while they would be ignored.
pub fn footer_hints(app: &App) -> Vec<(&'static str, bool)> {
    match app.mode {
        InputMode::Editing => vec![("Enter add", !app.form.is_submitting()), ("Esc done", true)],
        InputMode::Browse => vec![
            ("p/← prev", app.page.can_prev(&app.view)),
            ("n/→ next", app.page.can_next(&app.view)),
            ("i new todo", true),
            ("r refresh", true),
            ("q quit", true),
        ],
    }
}

fn render_footer(f: &mut Frame<'_>, app: &App, area: Rect) {
    let mut spans = Vec::new();
    for (i, (hint, enabled)) in footer_hints(app).into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" • ", Style::default().fg(app.theme.text_muted)));
        }
        let color = if enabled {
            app.theme.text_dim
        } else {
            app.theme.text_muted
        };
        spans.push(Span::styled(hint, Style::default().fg(color)));
    }
    let footer = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}
