//! Sink implementations
//!
//! Contains DumpSink and JsonSink.

mod dump;
mod json;

pub use self::dump::{format_entry, DumpSink, TimestampStyle};
pub use self::json::JsonSink;
