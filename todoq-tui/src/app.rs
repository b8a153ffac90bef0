//! Application state and input handling.

use crate::config::TuiConfig;
use crate::events::TuiEvent;
use crate::keys::{map_key, Action, InputMode};
use crate::theme::Theme;
use todoq_core::{TodoItem, TodoResult};
use todoq_sync::{CreateForm, ListObservation, ListView, PageState, TodoStore};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Blocking message box, closed with Esc or Enter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modal {
    pub title: String,
    pub message: String,
}

impl Modal {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            message: message.into(),
        }
    }
}

pub struct App {
    pub config: TuiConfig,
    pub theme: Theme,
    pub store: TodoStore,
    pub page: PageState,
    pub view: ListView,
    pub form: CreateForm,
    pub mode: InputMode,
    pub modal: Option<Modal>,
    observation: Option<ListObservation>,
    forwarder: Option<JoinHandle<()>>,
    events: mpsc::Sender<TuiEvent>,
}

impl App {
    pub fn new(
        config: TuiConfig,
        store: TodoStore,
        initial_items: Vec<TodoItem>,
        events: mpsc::Sender<TuiEvent>,
    ) -> Self {
        let page = PageState::from_config(&config.core(), initial_items);
        let view = ListView {
            key: page.key(),
            ..ListView::default()
        };
        Self {
            config,
            theme: Theme::dark(),
            store,
            page,
            view,
            form: CreateForm::new(),
            mode: InputMode::Browse,
            modal: None,
            observation: None,
            forwarder: None,
            events,
        }
    }

    /// Observe the current page and forward its snapshots to the event loop.
    /// Must be called from within a tokio runtime.
    pub fn watch_current_page(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
        let observation = self.store.observe(self.page.key());
        self.view = observation.current();
        self.forwarder = Some(spawn_forwarder(
            observation.receiver(),
            self.events.clone(),
        ));
        // Replacing the old observation releases its subscription.
        self.observation = Some(observation);
        tracing::debug!(key = %self.page.key(), "Watching page");
    }

    /// Accept a snapshot if it belongs to the current page and is not older
    /// than the one shown.
    pub fn apply_view(&mut self, view: ListView) {
        if view.key == self.page.key() && view.revision >= self.view.revision {
            self.view = view;
        }
    }

    pub fn visible(&self) -> &[TodoItem] {
        self.page.visible(&self.view)
    }

    pub fn next_page(&mut self) -> bool {
        if !self.page.can_next(&self.view) {
            return false;
        }
        self.page.next();
        self.watch_current_page();
        true
    }

    pub fn prev_page(&mut self) -> bool {
        if !self.page.can_prev(&self.view) {
            return false;
        }
        self.page.prev();
        self.watch_current_page();
        true
    }

    pub fn refresh(&mut self) {
        if !self.store.refresh(self.page.key()) {
            self.watch_current_page();
        }
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.modal = Some(Modal::error(message));
    }

    /// Validate the form and send the creation off. The outcome comes back
    /// as [`TuiEvent::Created`].
    pub fn submit(&mut self) {
        if self.form.is_submitting() {
            return;
        }
        match self.form.submit(self.config.mutation.owner_ref) {
            Err(message) => self.show_error(message),
            Ok(new_todo) => {
                let store = self.store.clone();
                let events = self.events.clone();
                tokio::spawn(async move {
                    let result = store.submit_create(new_todo).await;
                    let _ = events.send(TuiEvent::Created(result)).await;
                });
            }
        }
    }

    pub fn on_created(&mut self, result: TodoResult<TodoItem>) {
        match self.form.finish(&result) {
            Some(message) => {
                if let Err(err) = &result {
                    tracing::warn!(error = %err, "Creation failed");
                }
                self.show_error(message);
            }
            None => self.mode = InputMode::Browse,
        }
    }

    /// Returns true when the app should exit.
    pub fn handle_action(&mut self, action: Action) -> bool {
        if self.modal.is_some() {
            match action {
                Action::Quit => return true,
                Action::Cancel | Action::Submit => self.modal = None,
                _ => {}
            }
            return false;
        }

        match action {
            Action::Quit => return true,
            Action::NextPage => {
                self.next_page();
            }
            Action::PrevPage => {
                self.prev_page();
            }
            Action::EditTitle => self.mode = InputMode::Editing,
            Action::Input(c) => self.form.push(c),
            Action::Backspace => self.form.backspace(),
            Action::Submit => {
                if self.mode == InputMode::Editing {
                    self.submit();
                }
            }
            Action::Cancel => self.mode = InputMode::Browse,
            Action::Refresh => self.refresh(),
        }
        false
    }

    /// Returns true when the app should exit.
    pub fn handle_event(&mut self, event: TuiEvent) -> bool {
        match event {
            TuiEvent::Input(key) => {
                if let Some(action) = map_key(key, self.mode) {
                    return self.handle_action(action);
                }
            }
            TuiEvent::ListChanged(view) => self.apply_view(view),
            TuiEvent::Created(result) => self.on_created(result),
            TuiEvent::Tick | TuiEvent::Resize { .. } => {}
        }
        false
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

fn spawn_forwarder(
    mut rx: watch::Receiver<ListView>,
    events: mpsc::Sender<TuiEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let view = rx.borrow_and_update().clone();
            if events.send(TuiEvent::ListChanged(view)).await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerminalConfig;
    use std::sync::Arc;
    use todoq_sync::{CREATE_FAILED_MESSAGE, EMPTY_TITLE_MESSAGE};
    use todoq_test_utils::{fixtures, MockTodoService, TodoService};

    fn tui_config() -> TuiConfig {
        let core = fixtures::test_config();
        TuiConfig {
            api: core.api,
            cache: core.cache,
            pagination: core.pagination,
            mutation: core.mutation,
            terminal: TerminalConfig {
                refresh_interval_ms: 100,
                log_path: "todoq.log".into(),
            },
        }
    }

    fn app_over(service: &Arc<MockTodoService>) -> (App, mpsc::Receiver<TuiEvent>) {
        let config = tui_config();
        let dyn_service: Arc<dyn TodoService> = service.clone();
        let store = TodoStore::new(dyn_service, &config.core());
        let (tx, rx) = mpsc::channel(64);
        (App::new(config, store, Vec::new(), tx), rx)
    }

    /// Feed events back into the app until `done` holds.
    async fn pump(app: &mut App, rx: &mut mpsc::Receiver<TuiEvent>, done: impl Fn(&App) -> bool) {
        while !done(app) {
            let event = rx.recv().await.unwrap();
            app.handle_event(event);
        }
    }

    fn loaded(app: &App) -> bool {
        app.view.data.is_some() && !app.view.is_fetching
    }

    #[tokio::test]
    async fn test_first_page_loads() {
        let service = Arc::new(MockTodoService::seeded(15));
        let (mut app, mut rx) = app_over(&service);
        app.watch_current_page();
        pump(&mut app, &mut rx, loaded).await;

        assert_eq!(app.visible().len(), 10);
        assert!(app.page.show_list(&app.view));
        assert_eq!(app.page.label(), "Page 1");
    }

    #[tokio::test]
    async fn test_next_page_blocked_while_fetching() {
        let service = Arc::new(MockTodoService::seeded(15));
        service.hold_lists(true);
        let (mut app, mut rx) = app_over(&service);
        app.watch_current_page();

        assert!(!app.handle_action(Action::NextPage));
        assert_eq!(app.page.page(), 0);

        service.wait_for_list_calls(1).await;
        service.hold_lists(false);
        service.release_all_lists();
        pump(&mut app, &mut rx, loaded).await;

        assert!(app.next_page());
        pump(&mut app, &mut rx, loaded).await;
        assert_eq!(app.visible().len(), 5);
        assert!(app.prev_page());
        assert_eq!(app.page.page(), 0);
    }

    #[tokio::test]
    async fn test_blank_submit_opens_modal() {
        let service = Arc::new(MockTodoService::seeded(3));
        let (mut app, _rx) = app_over(&service);

        app.handle_action(Action::EditTitle);
        app.handle_action(Action::Input(' '));
        app.handle_action(Action::Submit);

        assert_eq!(app.modal, Some(Modal::error(EMPTY_TITLE_MESSAGE)));
        assert_eq!(service.create_calls(), 0);

        // Keys other than close are swallowed by the modal.
        app.handle_action(Action::Input('x'));
        assert_eq!(app.form.title(), " ");
        app.handle_action(Action::Cancel);
        assert!(app.modal.is_none());
        assert_eq!(app.mode, InputMode::Editing);
    }

    #[tokio::test]
    async fn test_failed_create_keeps_title() {
        let service = Arc::new(MockTodoService::seeded(3));
        service.fail_creates_with(fixtures::server_error());
        let (mut app, mut rx) = app_over(&service);

        app.handle_action(Action::EditTitle);
        app.form.set_title("Buy milk");
        app.handle_action(Action::Submit);
        assert!(app.form.is_submitting());
        pump(&mut app, &mut rx, |app| !app.form.is_submitting()).await;

        assert_eq!(app.modal, Some(Modal::error(CREATE_FAILED_MESSAGE)));
        assert_eq!(app.form.title(), "Buy milk");
    }

    #[tokio::test]
    async fn test_successful_create_shows_up() {
        let service = Arc::new(MockTodoService::seeded(3));
        let (mut app, mut rx) = app_over(&service);
        app.watch_current_page();
        pump(&mut app, &mut rx, loaded).await;

        app.handle_action(Action::EditTitle);
        app.form.set_title("Buy milk");
        app.handle_action(Action::Submit);
        pump(&mut app, &mut rx, |app| !app.form.is_submitting()).await;
        pump(&mut app, &mut rx, |app| {
            loaded(app) && app.visible().first().is_some_and(|item| !item.is_pending())
        })
        .await;

        assert!(app.modal.is_none());
        assert_eq!(app.mode, InputMode::Browse);
        assert_eq!(app.form.title(), "");
        assert_eq!(app.visible()[0].title, "Buy milk");
        assert_eq!(app.visible().len(), 4);
    }

    #[tokio::test]
    async fn test_stale_snapshots_ignored() {
        let service = Arc::new(MockTodoService::seeded(3));
        let (mut app, _rx) = app_over(&service);
        app.view.revision = 10;

        let older = ListView {
            key: app.page.key(),
            revision: 9,
            data: Some(Vec::new()),
            ..ListView::default()
        };
        app.apply_view(older);
        assert!(app.view.data.is_none());

        let other_page = ListView {
            key: todoq_core::QueryKey::page(5, 10),
            revision: 11,
            data: Some(Vec::new()),
            ..ListView::default()
        };
        app.apply_view(other_page);
        assert!(app.view.data.is_none());
    }
}
