//! todoq terminal front end.

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod keys;
pub mod logging;
pub mod theme;
pub mod views;
pub mod widgets;
