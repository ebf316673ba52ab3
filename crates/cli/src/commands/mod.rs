//! Command implementations.

mod merge;
mod tags;
mod validate;

pub use merge::run_merge;
pub use tags::{print_tag_usage, run_tags};
pub use validate::run_validate;
