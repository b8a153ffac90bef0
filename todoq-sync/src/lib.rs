//! todoq Sync - Optimistic Mutations and View Boundary
//!
//! [`MutationCoordinator`] applies creations to the cache speculatively and
//! confirms or rolls them back. [`TodoStore`] is what a front end talks to;
//! [`PageState`] and [`CreateForm`] hold the per-screen view state.

pub mod coordinator;
pub mod store;
pub mod view;

pub use coordinator::{
    insert_speculative, MutationCoordinator, MutationState, PendingMutation, Settlement,
};
pub use store::{ListObservation, TodoStore};
pub use view::{
    CreateForm, ListView, PageState, CREATE_FAILED_MESSAGE, EMPTY_TITLE_MESSAGE,
    LOAD_FAILED_MESSAGE,
};
