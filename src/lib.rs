pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod git;
pub mod manifest;
pub mod notes;
pub mod orchestration;
pub mod planner;
pub mod tracker;
pub mod ui;
pub mod warning;

pub use error::{ReleaseError, Result};
pub use orchestration::{Orchestrator, OutcomeStatus, ReleaseOutcome, ReleaseRequest};
