//! Color theme.

use ratatui::style::Color;
use todoq_core::TodoItem;

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color,
    pub primary_dim: Color,
    pub success: Color,
    pub error: Color,
    pub text: Color,
    pub text_dim: Color,
    pub text_muted: Color,
    pub border: Color,
    pub border_focus: Color,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            primary: Color::Rgb(0, 255, 255),
            primary_dim: Color::Rgb(0, 136, 136),
            success: Color::Rgb(0, 255, 0),
            error: Color::Rgb(255, 0, 0),
            text: Color::Rgb(255, 255, 255),
            text_dim: Color::Rgb(136, 136, 136),
            text_muted: Color::Rgb(68, 68, 68),
            border: Color::Rgb(68, 68, 68),
            border_focus: Color::Rgb(0, 255, 255),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

/// Placeholders awaiting confirmation are dimmed.
pub fn todo_color(item: &TodoItem, theme: &Theme) -> Color {
    if item.is_pending() {
        theme.text_muted
    } else if item.completed {
        theme.success
    } else {
        theme.text
    }
}

pub fn border_color(focused: bool, theme: &Theme) -> Color {
    if focused {
        theme.border_focus
    } else {
        theme.border
    }
}
