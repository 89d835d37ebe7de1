//! User interface module.
//!
//! Output only; the workflow is non-interactive.

pub mod formatter;

pub use formatter::{display_error, display_outcome, display_status, display_success, display_warning};
