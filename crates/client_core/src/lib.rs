//! Client-side core of the to-do list: draft editing and list
//! synchronization against a [`TodoBackend`].

pub mod backend;
pub mod form;
pub mod sync;

pub use backend::{BackendError, HttpTodoBackend, TodoBackend};
pub use form::{DraftItem, Field, FormError, ItemForm};
pub use sync::{FailurePolicy, ListSynchronizer, Operation, SyncError, SyncEvent};
