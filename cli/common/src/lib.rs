//! Shared utilities for logbrowse CLI binaries.
//!
//! Argument types, logging setup and human-readable formatting used by the
//! `lb-discoverer` binary.

pub mod args;
pub mod format;
pub mod logging;

pub use args::LogLevel;
pub use format::{format_bytes, format_number};
pub use logging::init_logging;
