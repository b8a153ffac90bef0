use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use proptest::prelude::*;
use ratatui::{backend::TestBackend, Terminal};
use std::io::Write;
use std::sync::Arc;
use todoq_core::{PendingId, TodoItem};
use todoq_sync::{TodoStore, EMPTY_TITLE_MESSAGE, LOAD_FAILED_MESSAGE};
use todoq_test_utils::{fixtures, generators, MockTodoService, TodoService};
use todoq_tui::app::{App, Modal};
use todoq_tui::config::{ConfigLoadError, TerminalConfig, TuiConfig};
use todoq_tui::events::TuiEvent;
use todoq_tui::keys::{map_key, Action, InputMode};
use todoq_tui::theme::{todo_color, Theme};
use todoq_tui::views::{render_view, todos};
use tokio::sync::mpsc;

const CONFIG_TOML: &str = r#"
[api]
base_url = "http://127.0.0.1:9"
request_timeout_ms = 1000

[cache]
eviction_grace_ms = 60000

[pagination]
page_limit = 10
initial_page = 0

[mutation]
owner_ref = 1

[terminal]
refresh_interval_ms = 250
log_path = "logs/todoq.log"
"#;

fn base_config() -> TuiConfig {
    let core = fixtures::test_config();
    TuiConfig {
        api: core.api,
        cache: core.cache,
        pagination: core.pagination,
        mutation: core.mutation,
        terminal: TerminalConfig {
            refresh_interval_ms: 250,
            log_path: "tmp/todoq.log".into(),
        },
    }
}

fn press(code: KeyCode) -> KeyEvent {
    KeyEvent {
        code,
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Press,
        state: KeyEventState::empty(),
    }
}

fn app_with(service: Arc<MockTodoService>, initial: Vec<TodoItem>) -> (App, mpsc::Receiver<TuiEvent>) {
    let config = base_config();
    let dyn_service: Arc<dyn TodoService> = service;
    let store = TodoStore::new(dyn_service, &config.core());
    let (tx, rx) = mpsc::channel(64);
    (App::new(config, store, initial, tx), rx)
}

fn screen(app: &App) -> String {
    let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
    terminal.draw(|f| render_view(f, app)).unwrap();
    let buffer = terminal.backend().buffer().clone();
    let mut text = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            text.push_str(buffer.get(x, y).symbol());
        }
        text.push('\n');
    }
    text
}

#[test]
fn config_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CONFIG_TOML.as_bytes()).unwrap();

    let config = TuiConfig::from_path(file.path()).unwrap();
    assert_eq!(config.terminal.log_path.to_str(), Some("logs/todoq.log"));
    assert_eq!(config.mutation.owner_ref, 1);
}

#[test]
fn config_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = TuiConfig::from_path(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigLoadError::Io(_))));
}

#[test]
fn config_requires_log_path() {
    let mut config = base_config();
    config.terminal.log_path = "".into();
    assert!(config.validate().is_err());
}

#[test]
fn browse_keys_mapped() {
    let cases = [
        (KeyCode::Char('n'), Action::NextPage),
        (KeyCode::Right, Action::NextPage),
        (KeyCode::Char('p'), Action::PrevPage),
        (KeyCode::Left, Action::PrevPage),
        (KeyCode::Char('i'), Action::EditTitle),
        (KeyCode::Char('r'), Action::Refresh),
        (KeyCode::Char('q'), Action::Quit),
        (KeyCode::Esc, Action::Cancel),
    ];
    for (code, expected) in cases {
        assert_eq!(map_key(press(code), InputMode::Browse), Some(expected));
    }
}

#[test]
fn key_release_ignored() {
    let mut event = press(KeyCode::Char('q'));
    event.kind = KeyEventKind::Release;
    assert_eq!(map_key(event, InputMode::Browse), None);
}

#[test]
fn ctrl_c_quits_while_editing() {
    let event = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
    assert_eq!(map_key(event, InputMode::Editing), Some(Action::Quit));
}

#[test]
fn pending_items_are_dimmed() {
    let theme = Theme::dark();
    let pending = TodoItem::speculative(&fixtures::new_todo("Buy milk"), PendingId::new());
    assert_eq!(todo_color(&pending, &theme), theme.text_muted);
    assert_eq!(todo_color(&fixtures::todo(2), &theme), theme.success);
    assert_eq!(todo_color(&fixtures::todo(1), &theme), theme.text);
    assert!(todos::todo_line(&pending).ends_with("(saving)"));
}

#[tokio::test]
async fn initial_items_render_before_fetch() {
    let service = Arc::new(MockTodoService::seeded(3));
    let (app, _rx) = app_with(service, fixtures::todos(1..=3));

    let text = screen(&app);
    assert!(text.contains("Page 1"));
    assert!(text.contains("[ ] Todo 1"));
    assert!(text.contains("[x] Todo 2"));
}

#[tokio::test]
async fn empty_state_and_error_banner() {
    let service = Arc::new(MockTodoService::new());
    let (mut app, _rx) = app_with(service, Vec::new());
    app.view.data = Some(Vec::new());
    assert!(screen(&app).contains(todos::EMPTY_TEXT));

    app.view.error = Some(fixtures::server_error());
    assert!(screen(&app).contains(LOAD_FAILED_MESSAGE));
}

#[tokio::test]
async fn modal_renders_message() {
    let service = Arc::new(MockTodoService::new());
    let (mut app, _rx) = app_with(service, Vec::new());
    app.modal = Some(Modal::error(EMPTY_TITLE_MESSAGE));
    assert!(screen(&app).contains(EMPTY_TITLE_MESSAGE));
}

#[tokio::test]
async fn spinner_while_fetching_empty_page() {
    let service = Arc::new(MockTodoService::new());
    let (mut app, _rx) = app_with(service, Vec::new());
    app.view.is_fetching = true;
    app.view.is_loading = true;
    assert!(screen(&app).contains(todos::SPINNER_TEXT));
}

proptest! {
    #[test]
    fn editing_captures_printable_chars(c in proptest::char::range('!', '~')) {
        let action = map_key(press(KeyCode::Char(c)), InputMode::Editing);
        prop_assert_eq!(action, Some(Action::Input(c)));
    }

    #[test]
    fn refresh_interval_validated(interval in 0u64..5_000) {
        let mut config = base_config();
        config.terminal.refresh_interval_ms = interval;
        prop_assert_eq!(config.validate().is_ok(), interval > 0);
    }

    #[test]
    fn todo_line_shows_title(item in generators::arb_todo_item()) {
        let line = todos::todo_line(&item);
        prop_assert!(line.contains(&item.title));
        prop_assert_eq!(line.starts_with("[x]"), item.completed);
    }
}
