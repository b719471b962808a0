//! Page revision histories
//!
//! [`EditFetcher`] turns a page title and a [`TimeWindow`] into a list of
//! fully populated [`crate::models::Edit`]s sorted newest first.

mod fetcher;
mod window;

pub use fetcher::{
    edit_from_record, EditFetcher, FetchOptions, ProgressCallback, DEFAULT_WORKERS,
    MAX_WORKERS,
};
pub use window::{months_between, TimeWindow};
