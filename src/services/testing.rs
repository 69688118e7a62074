use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::ticket::{Ticket, TicketFields, TicketMatch, TrackerVersion};
use crate::error::{AppError, AppResult};
use crate::services::{IssueTrackerService, LinkKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(String),
    Link(String, String),
    Assign(String, String),
    AddWatcher(String, String),
    RemoveWatcher(String, String),
    FetchSummary(String),
    Search(String),
    Delete(String),
    ListVersions(String),
}

/// In-memory tracker that records every call in order.
#[derive(Default)]
pub struct RecordingTracker {
    pub calls: Mutex<Vec<Call>>,
    pub summaries: Mutex<HashMap<String, String>>,
    pub missing: HashSet<String>,
    pub fail_create_after: Option<usize>,
    pub fail_remove_watcher: bool,
    pub versions: Vec<TrackerVersion>,
    pub search_results: Vec<TicketMatch>,
}

impl RecordingTracker {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn rename(&self, key: &str, summary: &str) {
        self.summaries
            .lock()
            .unwrap()
            .insert(key.to_string(), summary.to_string());
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl IssueTrackerService for RecordingTracker {
    async fn create_ticket(&self, fields: &TicketFields) -> AppResult<Ticket> {
        let mut summaries = self.summaries.lock().unwrap();
        if self.fail_create_after == Some(summaries.len()) {
            return Err(AppError::IssueTracker("create rejected".to_string()));
        }
        let key = format!("{}-{}", fields.project, summaries.len() + 1);
        summaries.insert(key.clone(), fields.summary.clone());
        drop(summaries);

        self.record(Call::Create(fields.summary.clone()));
        Ok(Ticket { key, url: None })
    }

    async fn create_link(&self, _kind: LinkKind, from: &str, to: &str) -> AppResult<()> {
        self.record(Call::Link(from.to_string(), to.to_string()));
        Ok(())
    }

    async fn assign(&self, key: &str, assignee: &str) -> AppResult<()> {
        self.record(Call::Assign(key.to_string(), assignee.to_string()));
        Ok(())
    }

    async fn add_watcher(&self, key: &str, watcher: &str) -> AppResult<()> {
        self.record(Call::AddWatcher(key.to_string(), watcher.to_string()));
        Ok(())
    }

    async fn remove_watcher(&self, key: &str, watcher: &str) -> AppResult<()> {
        self.record(Call::RemoveWatcher(key.to_string(), watcher.to_string()));
        if self.fail_remove_watcher {
            return Err(AppError::IssueTracker(format!(
                "cannot remove {watcher} from {key}"
            )));
        }
        Ok(())
    }

    async fn fetch_summary(&self, key: &str) -> AppResult<String> {
        self.record(Call::FetchSummary(key.to_string()));
        self.summaries
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::IssueTracker(format!("issue {key} does not exist")))
    }

    async fn search(&self, query: &str) -> AppResult<Vec<TicketMatch>> {
        self.record(Call::Search(query.to_string()));
        Ok(self.search_results.clone())
    }

    async fn delete_ticket(&self, key: &str) -> AppResult<()> {
        self.record(Call::Delete(key.to_string()));
        if self.missing.contains(key) {
            return Err(AppError::IssueTracker(format!("issue {key} does not exist")));
        }
        self.summaries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list_versions(&self, project: &str) -> AppResult<Vec<TrackerVersion>> {
        self.record(Call::ListVersions(project.to_string()));
        Ok(self.versions.clone())
    }
}
