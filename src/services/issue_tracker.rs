use async_trait::async_trait;

use crate::domain::ticket::{Ticket, TicketFields, TicketMatch, TrackerVersion};
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    RelatesTo,
}

/// Remote issue tracker. Every call is a fallible remote request; callers
/// decide whether a failure aborts their batch.
#[async_trait]
pub trait IssueTrackerService: Send + Sync {
    async fn create_ticket(&self, fields: &TicketFields) -> AppResult<Ticket>;
    async fn create_link(&self, kind: LinkKind, from: &str, to: &str) -> AppResult<()>;
    async fn assign(&self, key: &str, assignee: &str) -> AppResult<()>;
    async fn add_watcher(&self, key: &str, watcher: &str) -> AppResult<()>;
    async fn remove_watcher(&self, key: &str, watcher: &str) -> AppResult<()>;
    async fn fetch_summary(&self, key: &str) -> AppResult<String>;
    async fn search(&self, query: &str) -> AppResult<Vec<TicketMatch>>;
    async fn delete_ticket(&self, key: &str) -> AppResult<()>;
    async fn list_versions(&self, project: &str) -> AppResult<Vec<TrackerVersion>>;
}
