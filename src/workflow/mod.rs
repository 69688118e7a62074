pub mod closing;
pub mod deploy;
pub mod planning;

use chrono::{Duration, NaiveDate};

use crate::config::BuildSettings;
use crate::domain::calendar::SprintLabel;
use crate::domain::directory::Directory;
use crate::domain::ticket::{
    Backlog, Phase, RETROSPECTIVE_ACTION, TicketDefinition, TicketId, TicketKind,
};
use crate::error::AppResult;

const EXCLUDED_ENABLER_MODES: &[&str] = &["Support", "Deprecated"];
const EXCLUDED_NODE_MODES: &[&str] = &["Negotiation", "Closed"];
const EXCLUDED_GROUP_MODES: &[&str] = &["Inactive", "Deprecated", "Closed"];
/// Work groups that only keep a coordination backlog; their groups get no tickets.
const COORDINATION_ONLY_WORK_GROUPS: &[&str] =
    &["Collaboration", "Dissemination", "Exploitation", "PressOffice"];

/// Deadline shifted by a whole number of days.
pub(crate) fn offset(deadline: NaiveDate, days: i64) -> NaiveDate {
    deadline + Duration::days(days)
}

/// Everything a builder produced for one sprint phase.
#[derive(Debug, Clone)]
pub struct SprintBacklog {
    pub phase: Phase,
    pub sprint: SprintLabel,
    pub deadline: NaiveDate,
    pub tickets: Backlog,
    pub root: TicketId,
    pub retrospective_root: Option<TicketId>,
}

/// Resolves organizational names into ticket definitions for one phase and sprint.
pub(crate) struct TicketFactory<'a> {
    directory: &'a Directory,
    settings: &'a BuildSettings,
    phase: Phase,
    sprint: SprintLabel,
}

impl<'a> TicketFactory<'a> {
    pub(crate) fn new(
        directory: &'a Directory,
        settings: &'a BuildSettings,
        phase: Phase,
        sprint: SprintLabel,
    ) -> Self {
        Self {
            directory,
            settings,
            phase,
            sprint,
        }
    }

    fn ticket(
        &self,
        kind: TicketKind,
        project: &str,
        component: &str,
        action: &str,
        deadline: NaiveDate,
    ) -> TicketDefinition {
        TicketDefinition::new(
            kind,
            self.phase,
            project,
            component,
            action,
            self.sprint.clone(),
            Some(deadline),
        )
        .with_reporter(self.settings.reporter.clone())
    }

    pub(crate) fn source(&self, action: &str, deadline: NaiveDate) -> TicketDefinition {
        let target = &self.settings.coordination;
        self.ticket(
            TicketKind::Source,
            &target.project,
            &target.component,
            action,
            deadline,
        )
    }

    pub(crate) fn scrum_master_retrospective(
        &self,
        action: &str,
        deadline: NaiveDate,
    ) -> TicketDefinition {
        let target = &self.settings.coordination;
        self.ticket(
            TicketKind::ScrumMasterRetrospective,
            &target.project,
            &target.component,
            action,
            deadline,
        )
    }

    pub(crate) fn quality_assurance(&self, action: &str, deadline: NaiveDate) -> TicketDefinition {
        let target = &self.settings.quality_assurance;
        self.ticket(
            TicketKind::QualityAssurance,
            &target.project,
            &target.component,
            action,
            deadline,
        )
    }

    pub(crate) fn chapter(
        &self,
        chapter: &str,
        action: &str,
        deadline: NaiveDate,
        retrospective: bool,
    ) -> AppResult<TicketDefinition> {
        let coordination = &self.directory.chapter(chapter)?.coordination;
        let kind = if retrospective {
            TicketKind::ChapterRetrospective {
                chapter: chapter.to_string(),
            }
        } else {
            TicketKind::Chapter {
                chapter: chapter.to_string(),
            }
        };
        Ok(self.ticket(
            kind,
            &coordination.tracker,
            &coordination.key,
            action,
            deadline,
        ))
    }

    pub(crate) fn enabler(
        &self,
        chapter: &str,
        enabler: &str,
        action: &str,
        deadline: NaiveDate,
    ) -> AppResult<TicketDefinition> {
        let unit = self.directory.enabler(chapter, enabler)?;
        let kind = TicketKind::Enabler {
            chapter: chapter.to_string(),
            enabler: enabler.to_string(),
            keyword: unit.backlog_keyword.clone(),
        };
        Ok(self.ticket(kind, &unit.tracker, &unit.key, action, deadline))
    }

    pub(crate) fn work_group(
        &self,
        work_group: &str,
        action: &str,
        deadline: NaiveDate,
        retrospective: bool,
    ) -> AppResult<TicketDefinition> {
        let coordination = &self.directory.work_group(work_group)?.coordination;
        let kind = if retrospective {
            TicketKind::WorkGroupRetrospective {
                work_group: work_group.to_string(),
            }
        } else {
            TicketKind::WorkGroup {
                work_group: work_group.to_string(),
            }
        };
        Ok(self.ticket(
            kind,
            &coordination.tracker,
            &coordination.key,
            action,
            deadline,
        ))
    }

    pub(crate) fn group(
        &self,
        work_group: &str,
        group: &str,
        action: &str,
        deadline: NaiveDate,
    ) -> AppResult<TicketDefinition> {
        let unit = self.directory.group(work_group, group)?;
        let kind = TicketKind::Group {
            work_group: work_group.to_string(),
            group: group.to_string(),
            keyword: unit.backlog_keyword.clone(),
        };
        Ok(self.ticket(kind, &unit.tracker, &unit.key, action, deadline))
    }

    pub(crate) fn lab(
        &self,
        lab: &str,
        action: &str,
        deadline: NaiveDate,
        retrospective: bool,
    ) -> AppResult<TicketDefinition> {
        let coordination = &self.directory.lab(lab)?.coordination;
        let kind = if retrospective {
            TicketKind::LabRetrospective {
                lab: lab.to_string(),
            }
        } else {
            TicketKind::Lab {
                lab: lab.to_string(),
            }
        };
        Ok(self.ticket(
            kind,
            &coordination.tracker,
            &coordination.key,
            action,
            deadline,
        ))
    }

    pub(crate) fn node(
        &self,
        lab: &str,
        node: &str,
        action: &str,
        deadline: NaiveDate,
    ) -> AppResult<TicketDefinition> {
        let unit = self.directory.node(lab, node)?;
        let kind = TicketKind::Node {
            lab: lab.to_string(),
            node: node.to_string(),
            keyword: unit.backlog_keyword.clone(),
        };
        Ok(self.ticket(kind, &unit.tracker, &unit.key, action, deadline))
    }
}

/// Work-group tickets, optionally mirrored by retrospective tickets, with
/// their groups linked beneath both.
pub(crate) fn add_work_groups(
    factory: &TicketFactory<'_>,
    tickets: &mut Backlog,
    anchors: (TicketId, Option<TicketId>),
    action: &str,
    deadline: NaiveDate,
    retrospective_deadline: NaiveDate,
) -> AppResult<()> {
    let (root, retrospective_root) = anchors;
    for work_group in &factory.directory.work_groups {
        let work_group_id = tickets.push(factory.work_group(
            &work_group.name,
            action,
            deadline,
            false,
        )?)?;
        tickets.link(root, work_group_id)?;

        let retrospective_id = match retrospective_root {
            Some(retrospective_root) => {
                let id = tickets.push(factory.work_group(
                    &work_group.name,
                    RETROSPECTIVE_ACTION,
                    retrospective_deadline,
                    true,
                )?)?;
                tickets.link(retrospective_root, id)?;
                Some(id)
            }
            None => None,
        };

        if COORDINATION_ONLY_WORK_GROUPS.contains(&work_group.name.as_str()) {
            continue;
        }

        for group in &work_group.groups {
            if group.mode_in(EXCLUDED_GROUP_MODES) {
                continue;
            }
            let group_id =
                tickets.push(factory.group(&work_group.name, &group.name, action, deadline)?)?;
            tickets.link(work_group_id, group_id)?;
            if let Some(retrospective_id) = retrospective_id {
                tickets.link(retrospective_id, group_id)?;
            }
        }
    }
    Ok(())
}

/// The configured lab ticket, optionally mirrored by a retrospective ticket,
/// with the lab's eligible nodes linked beneath the lab ticket.
pub(crate) fn add_lab(
    factory: &TicketFactory<'_>,
    tickets: &mut Backlog,
    anchors: (TicketId, Option<TicketId>),
    action: &str,
    deadline: NaiveDate,
    retrospective_deadline: NaiveDate,
) -> AppResult<()> {
    let Some(lab_name) = factory.settings.lab.as_deref() else {
        return Ok(());
    };
    let (root, retrospective_root) = anchors;
    let lab = factory.directory.lab(lab_name)?;

    let lab_id = tickets.push(factory.lab(lab_name, action, deadline, false)?)?;
    tickets.link(root, lab_id)?;

    if let Some(retrospective_root) = retrospective_root {
        let retrospective_id = tickets.push(factory.lab(
            lab_name,
            RETROSPECTIVE_ACTION,
            retrospective_deadline,
            true,
        )?)?;
        tickets.link(retrospective_root, retrospective_id)?;
    }

    for node in &lab.nodes {
        if node.mode_in(EXCLUDED_NODE_MODES) {
            continue;
        }
        let node_id = tickets.push(factory.node(lab_name, &node.name, action, deadline)?)?;
        tickets.link(lab_id, node_id)?;
    }
    Ok(())
}
