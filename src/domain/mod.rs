//! Domain logic - pure release rules independent of git and the tracker

pub mod release;
pub mod ticket;
pub mod version;

pub use release::{InvalidReason, NoChangeReason, ReleaseDecision, ReleaseIdentifier};
pub use ticket::{TicketExtractor, TicketStrategy};
pub use version::{
    compare, compare_versions, is_valid_semver, SemanticVersion, VersionComparison,
};
