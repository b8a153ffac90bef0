//! Event types for the TUI event loop.

use crossterm::event::KeyEvent;
use todoq_core::{TodoItem, TodoResult};
use todoq_sync::ListView;

#[derive(Debug, Clone)]
pub enum TuiEvent {
    Input(KeyEvent),
    Tick,
    Resize { width: u16, height: u16 },
    /// New snapshot of an observed page.
    ListChanged(ListView),
    /// Outcome of a submitted creation.
    Created(TodoResult<TodoItem>),
}
