//! Provisioning engine: materializes a built backlog in the tracker.
//!
//! Creation runs in two passes. Every ticket is created before any link is
//! requested, because a link needs the tracker keys of both endpoints.

use std::fmt::Write as _;

use tracing::{info, warn};

use crate::config::DeploySettings;
use crate::domain::ticket::{Ticket, TicketId, TicketMatch};
use crate::error::{AppError, AppResult};
use crate::services::{IssueTrackerService, LinkKind};
use crate::workflow::SprintBacklog;

#[derive(Debug, Clone)]
pub struct CreatedTicket {
    pub id: TicketId,
    pub ticket: Ticket,
    pub summary: String,
}

#[derive(Debug, Clone, Default)]
pub struct CreateReport {
    pub created: Vec<CreatedTicket>,
    pub links: usize,
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: TicketId,
    pub key: String,
    pub expected: String,
    pub actual: String,
}

impl AuditEntry {
    pub fn drifted(&self) -> bool {
        self.expected != self.actual
    }
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub id: TicketId,
    pub query: String,
    pub matches: Vec<TicketMatch>,
}

#[derive(Debug, Clone, Default)]
pub struct RetireReport {
    pub deleted: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub skipped: usize,
}

/// Renders every ticket in construction order with its links. Never touches the tracker.
pub fn enumerate(backlog: &SprintBacklog, with_descriptions: bool) -> String {
    let tickets = &backlog.tickets;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "--> {} backlog for {}, deadline {} ({} tickets)",
        backlog.phase.as_str(),
        backlog.sprint.fix_version(),
        backlog.deadline,
        tickets.len()
    );
    let _ = writeln!(out, "root: {}", tickets[backlog.root].summary());
    if let Some(retrospective_root) = backlog.retrospective_root {
        let _ = writeln!(
            out,
            "retrospective root: {}",
            tickets[retrospective_root].summary()
        );
    }
    out.push('\n');

    for (id, ticket) in tickets.iter() {
        let deadline = ticket
            .deadline()
            .map(|day| day.to_string())
            .unwrap_or_else(|| "-".to_string());
        let assignee = ticket.assignee.as_deref().unwrap_or("-");
        let _ = writeln!(
            out,
            "{} [{}] {} : Deadline= {deadline} : Assignee= {assignee}",
            id.index() + 1,
            ticket.kind.tag(),
            ticket.summary()
        );
        if with_descriptions {
            let _ = writeln!(out, "{}", ticket.description());
        }
        for link in ticket.inwards() {
            let _ = writeln!(out, "\t in: {}", tickets[*link].summary());
        }
        for link in ticket.outwards() {
            let _ = writeln!(out, "\t out: {}", tickets[*link].summary());
        }
        out.push('\n');
    }
    out
}

pub struct BacklogDeployer<'a> {
    tracker: &'a dyn IssueTrackerService,
    settings: &'a DeploySettings,
}

impl<'a> BacklogDeployer<'a> {
    pub fn new(tracker: &'a dyn IssueTrackerService, settings: &'a DeploySettings) -> Self {
        Self { tracker, settings }
    }

    /// Creates every ticket, then every link. A failure aborts the remaining
    /// work. A ticket is marked resolved as soon as the tracker returns its
    /// key, so Retire can remove it even if a follow-up call failed.
    pub async fn create(&self, backlog: &mut SprintBacklog) -> AppResult<CreateReport> {
        let mut report = CreateReport::default();

        for id in backlog.tickets.ids() {
            let fields = backlog.tickets[id].fields(&self.settings.issue_type);
            let created = self.tracker.create_ticket(&fields).await?;
            info!(key = %created.key, summary = %fields.summary, "created");
            if let Some(ticket) = backlog.tickets.get_mut(id) {
                ticket.resolved = Some(created.clone());
            }

            let ticket = &backlog.tickets[id];
            if ticket.reporter.is_some() {
                self.tracker
                    .remove_watcher(&created.key, &self.settings.implicit_watcher)
                    .await?;
            }
            if let Some(assignee) = &ticket.assignee {
                self.tracker.assign(&created.key, assignee).await?;
            }
            for watcher in &ticket.watchers {
                self.tracker.add_watcher(&created.key, watcher).await?;
            }

            report.created.push(CreatedTicket {
                id,
                ticket: created,
                summary: fields.summary,
            });
        }

        for (id, ticket) in backlog.tickets.iter() {
            let from = resolved_key(backlog, id)?;
            for target in ticket.outwards() {
                let to = resolved_key(backlog, *target)?;
                self.tracker
                    .create_link(LinkKind::RelatesTo, from, to)
                    .await?;
                report.links += 1;
            }
        }

        info!(
            tickets = report.created.len(),
            links = report.links,
            "backlog provisioned"
        );
        Ok(report)
    }

    /// Fetches the tracker summary of every created ticket.
    pub async fn audit(&self, backlog: &SprintBacklog) -> AppResult<Vec<AuditEntry>> {
        let mut entries = Vec::new();
        for (id, ticket) in backlog.tickets.iter() {
            let Some(resolved) = &ticket.resolved else {
                continue;
            };
            let actual = self.tracker.fetch_summary(&resolved.key).await?;
            let entry = AuditEntry {
                id,
                key: resolved.key.clone(),
                expected: ticket.summary(),
                actual,
            };
            if entry.drifted() {
                warn!(key = %entry.key, expected = %entry.expected, actual = %entry.actual, "summary drift");
            }
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Looks for tickets of a previous run by component and action.
    pub async fn search(&self, backlog: &SprintBacklog) -> AppResult<Vec<SearchResult>> {
        let mut results = Vec::new();
        for (id, ticket) in backlog.tickets.iter() {
            let query = search_query(&ticket.component, &ticket.action);
            let matches = self.tracker.search(&query).await?;
            results.push(SearchResult { id, query, matches });
        }
        Ok(results)
    }

    /// Deletes every created ticket. Failures are logged and skipped so the
    /// rest of the batch is still cleaned up.
    pub async fn retire(&self, backlog: &mut SprintBacklog) -> RetireReport {
        let mut report = RetireReport::default();
        for id in backlog.tickets.ids() {
            let Some(ticket) = backlog.tickets.get_mut(id) else {
                continue;
            };
            let Some(resolved) = ticket.resolved.clone() else {
                report.skipped += 1;
                continue;
            };

            match self.tracker.delete_ticket(&resolved.key).await {
                Ok(()) => {
                    info!(key = %resolved.key, "removed");
                    ticket.resolved = None;
                    report.deleted.push(resolved.key);
                }
                Err(err) => {
                    warn!(key = %resolved.key, error = %err, "could not remove ticket");
                    report.failed.push((resolved.key, err.to_string()));
                }
            }
        }
        report
    }
}

fn resolved_key(backlog: &SprintBacklog, id: TicketId) -> AppResult<&str> {
    backlog
        .tickets
        .get(id)
        .and_then(|ticket| ticket.resolved.as_ref())
        .map(|ticket| ticket.key.as_str())
        .ok_or_else(|| AppError::Graph(format!("ticket {id} has not been created")))
}

fn search_query(component: &str, action: &str) -> String {
    format!("component = {component} and summary ~ \"{action}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildSettings;
    use crate::domain::calendar::SprintLabel;
    use crate::domain::directory::Directory;
    use crate::domain::directory::fixtures::{chapter, lab, unit};
    use crate::services::testing::{Call, RecordingTracker};
    use crate::workflow::closing::SprintClosing;
    use crate::workflow::testing::date;

    fn backlog() -> SprintBacklog {
        let directory = Directory {
            chapters: vec![
                chapter("Ops", vec![unit("Deploy", "Deploy", "Active")]),
                chapter("Data", vec![unit("Orion", "Orion", "Active")]),
            ],
            labs: vec![lab("Lab", vec![unit("Spain", "Spain", "Active")])],
            ..Directory::default()
        };
        SprintClosing::new(&directory, &BuildSettings::default())
            .build(SprintLabel::new("5.2"), date("2017-09-29"))
            .unwrap()
    }

    #[tokio::test]
    async fn creates_everything_before_linking() {
        let tracker = RecordingTracker::default();
        let settings = DeploySettings::default();
        let mut backlog = backlog();
        let link_count: usize = backlog
            .tickets
            .iter()
            .map(|(_, ticket)| ticket.outwards().len())
            .sum();

        let report = BacklogDeployer::new(&tracker, &settings)
            .create(&mut backlog)
            .await
            .unwrap();

        let calls = tracker.calls();
        let last_create = calls
            .iter()
            .rposition(|call| matches!(call, Call::Create(_)))
            .unwrap();
        let first_link = calls
            .iter()
            .position(|call| matches!(call, Call::Link(..)))
            .unwrap();
        assert!(last_create < first_link);

        assert_eq!(report.created.len(), backlog.tickets.len());
        assert_eq!(report.links, link_count);
        assert!(backlog.tickets.iter().all(|(_, ticket)| ticket.resolved.is_some()));

        let root_key = backlog.tickets[backlog.root].resolved.clone().unwrap().key;
        assert_eq!(calls[0], Call::Create(backlog.tickets[backlog.root].summary()));
        assert_eq!(calls[1], Call::RemoveWatcher(root_key, "mev".to_string()));
    }

    #[tokio::test]
    async fn assigns_and_adds_watchers() {
        let tracker = RecordingTracker::default();
        let settings = DeploySettings::default();
        let mut backlog = backlog();
        let root = backlog.root;
        if let Some(ticket) = backlog.tickets.get_mut(root) {
            ticket.reporter = None;
            ticket.assignee = Some("scrum.master".to_string());
            ticket.watchers.insert("observer".to_string());
        }

        BacklogDeployer::new(&tracker, &settings)
            .create(&mut backlog)
            .await
            .unwrap();

        let key = backlog.tickets[root].resolved.clone().unwrap().key;
        let calls = tracker.calls();
        assert_eq!(calls[1], Call::Assign(key.clone(), "scrum.master".to_string()));
        assert_eq!(calls[2], Call::AddWatcher(key, "observer".to_string()));
    }

    #[tokio::test]
    async fn creation_failure_leaves_partial_backlog_unlinked() {
        let tracker = RecordingTracker {
            fail_create_after: Some(3),
            ..RecordingTracker::default()
        };
        let settings = DeploySettings::default();
        let mut backlog = backlog();

        let result = BacklogDeployer::new(&tracker, &settings)
            .create(&mut backlog)
            .await;

        assert!(matches!(result, Err(AppError::IssueTracker(_))));
        let resolved = backlog
            .tickets
            .iter()
            .filter(|(_, ticket)| ticket.resolved.is_some())
            .count();
        assert_eq!(resolved, 3);
        assert!(!tracker.calls().iter().any(|call| matches!(call, Call::Link(..))));
    }

    #[tokio::test]
    async fn follow_up_failure_keeps_created_ticket_retirable() {
        let tracker = RecordingTracker {
            fail_remove_watcher: true,
            ..RecordingTracker::default()
        };
        let settings = DeploySettings::default();
        let mut backlog = backlog();
        let deployer = BacklogDeployer::new(&tracker, &settings);

        let result = deployer.create(&mut backlog).await;

        assert!(matches!(result, Err(AppError::IssueTracker(_))));
        let in_tracker = tracker.summaries.lock().unwrap().len();
        let resolved: Vec<_> = backlog
            .tickets
            .iter()
            .filter_map(|(_, ticket)| ticket.resolved.clone())
            .collect();
        assert_eq!(in_tracker, 1);
        assert_eq!(resolved.len(), in_tracker);

        let report = deployer.retire(&mut backlog).await;
        assert_eq!(report.deleted, vec![resolved[0].key.clone()]);
        assert_eq!(report.skipped, backlog.tickets.len() - 1);
        assert!(tracker.summaries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn audit_reports_drift() {
        let tracker = RecordingTracker::default();
        let settings = DeploySettings::default();
        let mut backlog = backlog();
        let deployer = BacklogDeployer::new(&tracker, &settings);
        deployer.create(&mut backlog).await.unwrap();

        let root_key = backlog.tickets[backlog.root].resolved.clone().unwrap().key;
        tracker.rename(&root_key, "renamed by hand");

        let entries = deployer.audit(&backlog).await.unwrap();
        assert_eq!(entries.len(), backlog.tickets.len());
        let drifted: Vec<_> = entries.iter().filter(|entry| entry.drifted()).collect();
        assert_eq!(drifted.len(), 1);
        assert_eq!(drifted[0].key, root_key);
    }

    #[tokio::test]
    async fn search_filters_by_component_and_action() {
        let tracker = RecordingTracker {
            search_results: vec![TicketMatch {
                key: "COR-42".to_string(),
                summary: "FIWARE.WorkItem.Coordination.Agile.Sprint-51.Close".to_string(),
            }],
            ..RecordingTracker::default()
        };
        let settings = DeploySettings::default();
        let backlog = backlog();

        let results = BacklogDeployer::new(&tracker, &settings)
            .search(&backlog)
            .await
            .unwrap();

        assert_eq!(results[0].id, backlog.root);
        assert_eq!(results[0].matches.len(), 1);
        assert_eq!(results[0].matches[0].key, "COR-42");
        assert_eq!(
            results[0].matches[0].summary,
            "FIWARE.WorkItem.Coordination.Agile.Sprint-51.Close"
        );
        assert_eq!(
            tracker.calls()[0],
            Call::Search(results[0].query.clone())
        );

        assert_eq!(results.len(), backlog.tickets.len());
        assert_eq!(
            results[0].query,
            "component = 10249 and summary ~ \"Close\""
        );
        assert_eq!(
            results[1].query,
            "component = 10249 and summary ~ \"Retrospective\""
        );
    }

    #[tokio::test]
    async fn retire_continues_past_missing_tickets() {
        let mut tracker = RecordingTracker::default();
        let settings = DeploySettings::default();
        let mut backlog = backlog();
        BacklogDeployer::new(&tracker, &settings)
            .create(&mut backlog)
            .await
            .unwrap();

        let root_key = backlog.tickets[backlog.root].resolved.clone().unwrap().key;
        tracker.missing.insert(root_key.clone());

        let report = BacklogDeployer::new(&tracker, &settings)
            .retire(&mut backlog)
            .await;

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, root_key);
        assert_eq!(report.deleted.len(), backlog.tickets.len() - 1);
        assert!(backlog.tickets[backlog.root].resolved.is_some());
        let deletes = tracker
            .calls()
            .iter()
            .filter(|call| matches!(call, Call::Delete(_)))
            .count();
        assert_eq!(deletes, backlog.tickets.len());
    }

    #[test]
    fn enumerate_lists_links_without_tracker() {
        let backlog = backlog();
        let listing = enumerate(&backlog, false);

        assert!(listing.starts_with("--> closing backlog for Sprint 5.2"));
        assert!(listing.contains(
            "1 [source] FIWARE.WorkItem.Coordination.Agile.Sprint-52.Close : Deadline= 2017-09-29 : Assignee= -"
        ));
        assert!(listing.contains("root: FIWARE.WorkItem.Coordination.Agile.Sprint-52.Close\n"));
        assert!(listing.contains(
            "retrospective root: FIWARE.WorkItem.Coordination.Agile.Sprint-52.Retrospective\n"
        ));
        assert!(listing.contains("\t out: FIWARE.WorkItem.Ops.Coordination.Agile.Sprint-52.Close"));
        assert!(listing.contains("\t in: FIWARE.WorkItem.Lab.Coordination.Agile.Sprint-52.Close"));
        assert!(!listing.contains("Activities requested"));
        assert!(enumerate(&backlog, true).contains("Activities requested"));
    }
}
