use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::ops::Index;

use chrono::NaiveDate;

use crate::domain::calendar::SprintLabel;
use crate::domain::catalog;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Closing,
    Planning,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Closing => "closing",
            Phase::Planning => "planning",
        }
    }

    /// Action recorded on the phase's main tickets.
    pub fn action(&self) -> &'static str {
        match self {
            Phase::Closing => "Close",
            Phase::Planning => "Planning",
        }
    }

    /// Verb used in description headers.
    pub fn verb(&self) -> &'static str {
        match self {
            Phase::Closing => "Close",
            Phase::Planning => "Plan",
        }
    }
}

pub const RETROSPECTIVE_ACTION: &str = "Retrospective";

/// Which template applies to a ticket, together with the organizational
/// names it was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketKind {
    Source,
    ScrumMasterRetrospective,
    Chapter {
        chapter: String,
    },
    ChapterRetrospective {
        chapter: String,
    },
    Enabler {
        chapter: String,
        enabler: String,
        keyword: String,
    },
    WorkGroup {
        work_group: String,
    },
    WorkGroupRetrospective {
        work_group: String,
    },
    Group {
        work_group: String,
        group: String,
        keyword: String,
    },
    Lab {
        lab: String,
    },
    LabRetrospective {
        lab: String,
    },
    Node {
        lab: String,
        node: String,
        keyword: String,
    },
    QualityAssurance,
}

impl TicketKind {
    pub fn tag(&self) -> &'static str {
        match self {
            TicketKind::Source => "source",
            TicketKind::ScrumMasterRetrospective => "scrum-master-retrospective",
            TicketKind::Chapter { .. } => "chapter",
            TicketKind::ChapterRetrospective { .. } => "chapter-retrospective",
            TicketKind::Enabler { .. } => "enabler",
            TicketKind::WorkGroup { .. } => "work-group",
            TicketKind::WorkGroupRetrospective { .. } => "work-group-retrospective",
            TicketKind::Group { .. } => "group",
            TicketKind::Lab { .. } => "lab",
            TicketKind::LabRetrospective { .. } => "lab-retrospective",
            TicketKind::Node { .. } => "node",
            TicketKind::QualityAssurance => "quality-assurance",
        }
    }

    #[cfg(test)]
    pub fn is_root(&self) -> bool {
        matches!(
            self,
            TicketKind::Source | TicketKind::ScrumMasterRetrospective
        )
    }

    #[cfg(test)]
    pub fn is_retrospective(&self) -> bool {
        matches!(
            self,
            TicketKind::ScrumMasterRetrospective
                | TicketKind::ChapterRetrospective { .. }
                | TicketKind::WorkGroupRetrospective { .. }
                | TicketKind::LabRetrospective { .. }
        )
    }
}

/// Handle of a ticket inside its [`Backlog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TicketId(usize);

impl TicketId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0 + 1)
    }
}

/// A ticket as the tracker knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub key: String,
    pub url: Option<String>,
}

/// Field payload for a ticket creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketFields {
    pub project: String,
    pub component: String,
    pub summary: String,
    pub description: String,
    pub issue_type: String,
    pub fix_version: String,
    pub due_date: Option<NaiveDate>,
    pub reporter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketMatch {
    pub key: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerVersion {
    pub name: String,
    pub release_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct TicketDefinition {
    pub kind: TicketKind,
    pub phase: Phase,
    pub project: String,
    pub component: String,
    pub action: String,
    pub sprint: SprintLabel,
    pub reporter: Option<String>,
    pub assignee: Option<String>,
    pub watchers: BTreeSet<String>,
    pub resolved: Option<Ticket>,
    deadline: Option<NaiveDate>,
    inwards: BTreeSet<TicketId>,
    outwards: BTreeSet<TicketId>,
}

impl TicketDefinition {
    pub fn new(
        kind: TicketKind,
        phase: Phase,
        project: impl Into<String>,
        component: impl Into<String>,
        action: impl Into<String>,
        sprint: SprintLabel,
        deadline: Option<NaiveDate>,
    ) -> Self {
        Self {
            kind,
            phase,
            project: project.into(),
            component: component.into(),
            action: action.into(),
            sprint,
            reporter: None,
            assignee: None,
            watchers: BTreeSet::new(),
            resolved: None,
            deadline,
            inwards: BTreeSet::new(),
            outwards: BTreeSet::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: Option<String>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn deadline(&self) -> Option<NaiveDate> {
        self.deadline
    }

    pub fn inwards(&self) -> &BTreeSet<TicketId> {
        &self.inwards
    }

    pub fn outwards(&self) -> &BTreeSet<TicketId> {
        &self.outwards
    }

    pub fn summary(&self) -> String {
        catalog::summary(self)
    }

    pub fn description(&self) -> String {
        catalog::description(self)
    }

    pub fn fields(&self, issue_type: &str) -> TicketFields {
        TicketFields {
            project: self.project.clone(),
            component: self.component.clone(),
            summary: self.summary(),
            description: self.description(),
            issue_type: issue_type.to_string(),
            fix_version: self.sprint.fix_version(),
            due_date: self.deadline,
            reporter: self.reporter.clone(),
        }
    }
}

/// Flat, insertion-ordered arena owning every ticket of one run. Links are
/// handle sets, so tickets never own each other.
#[derive(Debug, Clone, Default)]
pub struct Backlog {
    tickets: Vec<TicketDefinition>,
    summaries: HashSet<String>,
}

impl Backlog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a ticket. Summaries are the tracker search key, so a second
    /// ticket with the same summary is rejected.
    pub fn push(&mut self, ticket: TicketDefinition) -> AppResult<TicketId> {
        let summary = ticket.summary();
        if !self.summaries.insert(summary.clone()) {
            return Err(AppError::Graph(format!("duplicate ticket summary {summary}")));
        }
        self.tickets.push(ticket);
        Ok(TicketId(self.tickets.len() - 1))
    }

    /// Adds `to` to `from.outwards` and `from` to `to.inwards`. Only an
    /// earlier ticket may point at a later one, which keeps the graph acyclic.
    pub fn link(&mut self, from: TicketId, to: TicketId) -> AppResult<()> {
        if to.0 >= self.tickets.len() {
            return Err(AppError::Graph(format!("unknown ticket {to}")));
        }
        if from >= to {
            return Err(AppError::Graph(format!(
                "ticket {from} cannot link to {to}: links must point at later tickets"
            )));
        }
        self.tickets[from.0].outwards.insert(to);
        self.tickets[to.0].inwards.insert(from);
        Ok(())
    }

    pub fn get(&self, id: TicketId) -> Option<&TicketDefinition> {
        self.tickets.get(id.0)
    }

    pub fn get_mut(&mut self, id: TicketId) -> Option<&mut TicketDefinition> {
        self.tickets.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = TicketId> + use<> {
        (0..self.tickets.len()).map(TicketId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TicketId, &TicketDefinition)> {
        self.tickets
            .iter()
            .enumerate()
            .map(|(index, ticket)| (TicketId(index), ticket))
    }
}

impl Index<TicketId> for Backlog {
    type Output = TicketDefinition;

    fn index(&self, id: TicketId) -> &Self::Output {
        &self.tickets[id.0]
    }
}
