//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Every record carries a [`UniqueTime`] read from its tile's own clock
//! - A file's [`ClockOffset`] translates local time onto the shared axis:
//!   `aligned = local - effective_offset`

mod alignment_config;
mod error;
mod file_number;
mod merged;
mod record;
mod sink;
mod time;

pub use alignment_config::*;
pub use error::*;
pub use file_number::FileNumber;
pub use merged::*;
pub use record::*;
pub use sink::*;
pub use time::*;
