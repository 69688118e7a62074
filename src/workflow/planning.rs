use chrono::NaiveDate;
use tracing::{debug, info};

use crate::config::BuildSettings;
use crate::domain::calendar::SprintLabel;
use crate::domain::directory::Directory;
use crate::domain::ticket::{Backlog, Phase};
use crate::error::AppResult;
use crate::workflow::{
    EXCLUDED_ENABLER_MODES, SprintBacklog, TicketFactory, add_lab, add_work_groups,
};

const EXCLUDED_CHAPTERS: &[&str] = &["Marketplace", "InGEIs", "Catalogue", "Academy"];

pub struct SprintPlanning<'a> {
    directory: &'a Directory,
    settings: &'a BuildSettings,
}

impl<'a> SprintPlanning<'a> {
    pub fn new(directory: &'a Directory, settings: &'a BuildSettings) -> Self {
        Self {
            directory,
            settings,
        }
    }

    pub fn build(&self, sprint: SprintLabel, deadline: NaiveDate) -> AppResult<SprintBacklog> {
        let phase = Phase::Planning;
        let action = phase.action();
        let factory = TicketFactory::new(self.directory, self.settings, phase, sprint.clone());
        let mut tickets = Backlog::new();

        let root = tickets.push(factory.source(action, deadline))?;

        for chapter in &self.directory.chapters {
            if EXCLUDED_CHAPTERS.contains(&chapter.name.as_str()) {
                continue;
            }

            let chapter_id = tickets.push(factory.chapter(&chapter.name, action, deadline, false)?)?;
            tickets.link(root, chapter_id)?;

            for enabler in &chapter.enablers {
                if enabler.mode_in(EXCLUDED_ENABLER_MODES) {
                    debug!(chapter = %chapter.name, enabler = %enabler.name, mode = %enabler.mode, "skipping enabler");
                    continue;
                }
                let enabler_id =
                    tickets.push(factory.enabler(&chapter.name, &enabler.name, action, deadline)?)?;
                tickets.link(chapter_id, enabler_id)?;
            }
        }

        if self.settings.include_work_groups {
            add_work_groups(&factory, &mut tickets, (root, None), action, deadline, deadline)?;
        }

        add_lab(&factory, &mut tickets, (root, None), action, deadline, deadline)?;

        if self.settings.include_quality_assurance {
            let qa = tickets.push(factory.quality_assurance(action, deadline))?;
            tickets.link(root, qa)?;
        }

        info!(sprint = %sprint.as_str(), tickets = tickets.len(), "planning backlog built");

        Ok(SprintBacklog {
            phase,
            sprint,
            deadline,
            tickets,
            root,
            retrospective_root: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::directory::fixtures::{chapter, lab, unit};
    use crate::domain::ticket::TicketKind;
    use crate::error::AppError;
    use crate::workflow::testing::{assert_well_formed, date, summaries};

    #[test]
    fn every_kept_chapter_anchors_its_enablers() {
        let directory = Directory {
            chapters: vec![
                chapter("Academy", vec![unit("Courses", "Courses", "Active")]),
                chapter(
                    "Data",
                    vec![
                        unit("Orion", "Orion", "Active"),
                        unit("Old", "Old", "Deprecated"),
                    ],
                ),
                chapter("Cloud", vec![unit("Nova", "Compute", "Active")]),
                chapter("Marketplace", vec![]),
            ],
            labs: vec![lab("Lab", vec![unit("Spain", "Spain", "Active")])],
            ..Directory::default()
        };
        let settings = BuildSettings::default();
        let backlog = SprintPlanning::new(&directory, &settings)
            .build(SprintLabel::new("6.1"), date("2016-12-09"))
            .unwrap();

        assert_well_formed(&backlog);
        assert!(backlog.retrospective_root.is_none());
        assert_eq!(
            summaries(&backlog),
            vec![
                "FIWARE.WorkItem.Coordination.Agile.Sprint-61.Planning",
                "FIWARE.WorkItem.Data.Coordination.Agile.Sprint-61.Planning",
                "FIWARE.WorkItem.Data.Orion.Agile.Sprint-61.Planning",
                "FIWARE.WorkItem.Cloud.Coordination.Agile.Sprint-61.Planning",
                "FIWARE.WorkItem.Cloud.Compute.Agile.Sprint-61.Planning",
                "FIWARE.WorkItem.Lab.Coordination.Agile.Sprint-61.Planning",
                "FIWARE.WorkItem.Lab.Spain.Agile.Sprint-61.Planning",
            ]
        );

        for (_, ticket) in backlog.tickets.iter() {
            assert_eq!(ticket.deadline(), Some(date("2016-12-09")));
            assert!(!ticket.kind.is_retrospective());
            if let TicketKind::Enabler { chapter, .. } = &ticket.kind {
                let parent = *ticket.inwards().iter().next().unwrap();
                assert_eq!(
                    backlog.tickets[parent].kind,
                    TicketKind::Chapter {
                        chapter: chapter.clone()
                    }
                );
            }
        }
    }

    #[test]
    fn unknown_lab_aborts_before_provisioning() {
        let directory = Directory {
            labs: vec![lab("Other", vec![])],
            ..Directory::default()
        };
        let settings = BuildSettings::default();
        let result = SprintPlanning::new(&directory, &settings)
            .build(SprintLabel::new("6.1"), date("2016-12-09"));

        assert!(matches!(result, Err(AppError::Directory(_))));
    }
}
