//! List view model: what a front end needs to render one page.

use todoq_cache::{CacheEntry, QueryStatus};
use todoq_core::{NewTodo, OwnerRef, QueryKey, TodoError, TodoItem, TodoResult, TodoqConfig};

/// Shown when the submitted title is blank.
pub const EMPTY_TITLE_MESSAGE: &str = "Todo title must not be empty.";
/// Shown when the service rejects or never answers a creation.
pub const CREATE_FAILED_MESSAGE: &str = "Failed to add todo. Please try again.";
/// Shown when a page could not be loaded.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load todos.";

/// Render-ready projection of a cache entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListView {
    pub key: QueryKey,
    pub data: Option<Vec<TodoItem>>,
    /// First load, nothing to show yet.
    pub is_loading: bool,
    /// Any fetch in flight, including background refetches.
    pub is_fetching: bool,
    pub error: Option<TodoError>,
    pub revision: u64,
}

impl From<&CacheEntry> for ListView {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            key: entry.key,
            data: entry.data.clone(),
            is_loading: entry.status == QueryStatus::Loading,
            is_fetching: entry.is_fetching,
            error: entry.error.clone(),
            revision: entry.revision,
        }
    }
}

/// Page navigation over the todo list.
///
/// Until the cache has data for the current window, the items passed at
/// construction are shown in its place.
#[derive(Debug, Clone, PartialEq)]
pub struct PageState {
    page: u32,
    limit: u32,
    initial_page: u32,
    initial_items: Vec<TodoItem>,
}

impl PageState {
    pub fn new(initial_page: u32, limit: u32, initial_items: Vec<TodoItem>) -> Self {
        Self {
            page: initial_page,
            limit: limit.max(1),
            initial_page,
            initial_items,
        }
    }

    pub fn from_config(config: &TodoqConfig, initial_items: Vec<TodoItem>) -> Self {
        Self::new(
            config.pagination.initial_page,
            config.pagination.page_limit,
            initial_items,
        )
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn initial_page(&self) -> u32 {
        self.initial_page
    }

    pub fn key(&self) -> QueryKey {
        QueryKey::page(self.page, self.limit)
    }

    pub fn next(&mut self) {
        self.page = self.page.saturating_add(1);
    }

    /// Previous page; stays on page 0.
    pub fn prev(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    pub fn set_initial_items(&mut self, items: Vec<TodoItem>) {
        self.initial_items = items;
    }

    pub fn visible<'a>(&'a self, view: &'a ListView) -> &'a [TodoItem] {
        view.data.as_deref().unwrap_or(&self.initial_items)
    }

    /// Spinner replaces the list while fetching away from the initial page,
    /// or while there is nothing to show.
    pub fn show_spinner(&self, view: &ListView) -> bool {
        view.is_fetching && (self.page != self.initial_page || self.visible(view).is_empty())
    }

    pub fn show_empty(&self, view: &ListView) -> bool {
        !self.show_spinner(view) && self.visible(view).is_empty()
    }

    pub fn show_list(&self, view: &ListView) -> bool {
        !self.show_spinner(view) && !self.visible(view).is_empty()
    }

    pub fn load_failed(&self, view: &ListView) -> bool {
        view.error.is_some()
    }

    pub fn can_prev(&self, view: &ListView) -> bool {
        self.page > 0 && !view.is_loading && !view.is_fetching
    }

    pub fn can_next(&self, view: &ListView) -> bool {
        !view.is_loading && !view.is_fetching
    }

    /// One-based page number for display.
    pub fn label(&self) -> String {
        format!("Page {}", u64::from(self.page) + 1)
    }
}

/// Title input for new todos.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateForm {
    title: String,
    submitting: bool,
}

impl CreateForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Input is ignored while a submission is in flight.
    pub fn push(&mut self, c: char) {
        if !self.submitting {
            self.title.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if !self.submitting {
            self.title.pop();
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        if !self.submitting {
            self.title = title.into();
        }
    }

    /// Build the creation payload, or the message to show instead.
    ///
    /// The title is sent as typed; only blankness is checked here.
    pub fn submit(&mut self, owner_ref: OwnerRef) -> Result<NewTodo, &'static str> {
        if self.submitting {
            return Err(CREATE_FAILED_MESSAGE);
        }
        let new_todo = NewTodo::new(owner_ref, self.title.clone());
        if new_todo.validate().is_err() {
            return Err(EMPTY_TITLE_MESSAGE);
        }
        self.submitting = true;
        Ok(new_todo)
    }

    /// Record the outcome of a submission. Success clears the title; a
    /// failure keeps it and returns the message to show.
    pub fn finish(&mut self, result: &TodoResult<TodoItem>) -> Option<&'static str> {
        self.submitting = false;
        match result {
            Ok(_) => {
                self.title.clear();
                None
            }
            Err(err) if err.is_validation() => Some(EMPTY_TITLE_MESSAGE),
            Err(_) => Some(CREATE_FAILED_MESSAGE),
        }
    }
}
