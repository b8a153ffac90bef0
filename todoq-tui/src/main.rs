//! todoq entry point.

use crossterm::{
    event::{self, Event as CrosstermEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use todoq_client::{RestTodoClient, TodoService};
use todoq_core::{TodoItem, TodoqConfig};
use todoq_sync::TodoStore;
use todoq_tui::app::App;
use todoq_tui::config::TuiConfig;
use todoq_tui::error::TuiError;
use todoq_tui::events::TuiEvent;
use todoq_tui::logging;
use todoq_tui::views::render_view;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), TuiError> {
    let config = TuiConfig::load()?;
    logging::init(&config.terminal.log_path)?;

    let core = config.core();
    let service: Arc<dyn TodoService> = Arc::new(RestTodoClient::new(&core.api)?);
    let store = TodoStore::new(Arc::clone(&service), &core);
    let initial_items = load_initial_items(&service, &core).await;
    if !initial_items.is_empty() {
        store.hydrate(core.initial_key(), initial_items.clone());
    }

    let (event_tx, mut event_rx) = mpsc::channel::<TuiEvent>(256);
    let tick_rate = config.refresh_interval();
    let mut app = App::new(config, store, initial_items, event_tx.clone());

    let mut terminal = setup_terminal()?;
    let _guard = TerminalGuard;

    spawn_input_reader(event_tx);
    app.watch_current_page();

    let mut ticker = tokio::time::interval(tick_rate);
    loop {
        terminal.draw(|f| render_view(f, &app))?;

        tokio::select! {
            _ = ticker.tick() => {}
            Some(event) = event_rx.recv() => {
                if app.handle_event(event) {
                    break;
                }
            }
        }
    }

    tracing::info!("Exiting");
    Ok(())
}

/// Fetch the first page with a throwaway store, so the list is never blank
/// while the real one starts up. Failures leave the list empty.
async fn load_initial_items(service: &Arc<dyn TodoService>, config: &TodoqConfig) -> Vec<TodoItem> {
    let scratch = TodoStore::new(Arc::clone(service), config);
    match scratch.prefetch(config.initial_key()).await {
        Ok(items) => {
            tracing::info!(count = items.len(), "Loaded initial todos");
            items
        }
        Err(err) => {
            tracing::warn!(error = %err, "Initial load failed");
            Vec::new()
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen);
    }
}

fn spawn_input_reader(sender: mpsc::Sender<TuiEvent>) {
    std::thread::spawn(move || loop {
        if let Ok(true) = event::poll(Duration::from_millis(200)) {
            if let Ok(evt) = event::read() {
                let sent = match evt {
                    CrosstermEvent::Key(key) => sender.blocking_send(TuiEvent::Input(key)),
                    CrosstermEvent::Resize(width, height) => {
                        sender.blocking_send(TuiEvent::Resize { width, height })
                    }
                    _ => Ok(()),
                };
                if sent.is_err() {
                    break;
                }
            }
        }
    });
}
