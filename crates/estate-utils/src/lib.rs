//! Shared utilities for estate-rs
//!
//! Logging setup and the number formatting used by prompts, tables and
//! reports.

pub mod format;
pub mod logging;

pub use format::{format_inr, format_inr_compact, format_thousands};
pub use logging::{init_tracing, init_tracing_json};
