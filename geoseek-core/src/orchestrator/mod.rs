//! Command-driven search store.
//!
//! The store is an actor owning the `SearchState`. Every command is folded
//! into the state, published to observers, and then handed to the text
//! search and item selection processes, which may emit further commands.
//! Commands derived synchronously from one command are drained in order
//! before the next external command is taken.

mod actor;
mod handle;
mod processes;
mod store_tests;

pub use actor::spawn_search_store;
pub use handle::SearchHandle;
pub use processes::{resolve_nested_parent, resolve_services};
