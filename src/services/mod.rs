pub mod issue_tracker;
#[cfg(test)]
pub mod testing;

pub use issue_tracker::{IssueTrackerService, LinkKind};
