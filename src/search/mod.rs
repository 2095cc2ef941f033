//! Incremental movie search: debounce bookkeeping, the controller that drives
//! fetches from query edits, and the render snapshot it exposes.

pub mod controller;
pub mod debouncer;
pub mod view;

pub use controller::{DebouncedSearchController, MovieFetchState, SearchPhase};
pub use debouncer::SearchDebouncer;
pub use view::{SearchView, ViewNotice};
