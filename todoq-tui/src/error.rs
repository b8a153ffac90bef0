//! Error types for the TUI.

use crate::config::ConfigLoadError;
use todoq_core::TodoError;

#[derive(Debug, thiserror::Error)]
pub enum TuiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigLoadError),
    #[error(transparent)]
    Todo(#[from] TodoError),
}
