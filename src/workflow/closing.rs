use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::config::BuildSettings;
use crate::domain::calendar::SprintLabel;
use crate::domain::directory::Directory;
use crate::domain::ticket::{Backlog, Phase, RETROSPECTIVE_ACTION};
use crate::error::{AppError, AppResult};
use crate::services::IssueTrackerService;
use crate::workflow::{
    EXCLUDED_ENABLER_MODES, SprintBacklog, TicketFactory, add_lab, add_work_groups, offset,
};

const EXCLUDED_CHAPTERS: &[&str] = &["Marketplace"];
/// Chapter that gets its own coordination and retrospective tickets.
const ANCHORED_CHAPTER: &str = "Ops";
const RETROSPECTIVE_ROOT_OFFSET_DAYS: i64 = 10;
const RETROSPECTIVE_OFFSET_DAYS: i64 = 5;

/// Closing deadline: the release date of the sprint's fix version, unless a
/// fixed date is configured, in which case the fixed date wins.
pub async fn resolve_deadline(
    tracker: &dyn IssueTrackerService,
    version_project: &str,
    sprint: &SprintLabel,
    fixed: Option<NaiveDate>,
) -> AppResult<NaiveDate> {
    let fix_version = sprint.fix_version();
    let released = match tracker.list_versions(version_project).await {
        Ok(versions) => versions
            .into_iter()
            .find(|version| version.name == fix_version)
            .and_then(|version| version.release_date),
        Err(err) if fixed.is_some() => {
            warn!(error = %err, "release date lookup failed; using configured deadline");
            None
        }
        Err(err) => return Err(err),
    };

    match (fixed, released) {
        (Some(fixed), released) => {
            debug!(?released, %fixed, "configured closing deadline overrides release date");
            Ok(fixed)
        }
        (None, Some(released)) => Ok(released),
        (None, None) => Err(AppError::Configuration(format!(
            "no release date for '{fix_version}' in project {version_project} and no closing deadline configured"
        ))),
    }
}

pub struct SprintClosing<'a> {
    directory: &'a Directory,
    settings: &'a BuildSettings,
}

impl<'a> SprintClosing<'a> {
    pub fn new(directory: &'a Directory, settings: &'a BuildSettings) -> Self {
        Self {
            directory,
            settings,
        }
    }

    pub fn build(&self, sprint: SprintLabel, deadline: NaiveDate) -> AppResult<SprintBacklog> {
        let phase = Phase::Closing;
        let action = phase.action();
        let retrospective_deadline = offset(deadline, RETROSPECTIVE_OFFSET_DAYS);
        let factory = TicketFactory::new(self.directory, self.settings, phase, sprint.clone());
        let mut tickets = Backlog::new();

        let root = tickets.push(factory.source(action, deadline))?;
        let retrospective_root = tickets.push(factory.scrum_master_retrospective(
            RETROSPECTIVE_ACTION,
            offset(deadline, RETROSPECTIVE_ROOT_OFFSET_DAYS),
        ))?;

        for chapter in &self.directory.chapters {
            if EXCLUDED_CHAPTERS.contains(&chapter.name.as_str()) {
                continue;
            }

            let (anchor, retrospective_anchor) = if chapter.name == ANCHORED_CHAPTER {
                let chapter_id =
                    tickets.push(factory.chapter(&chapter.name, action, deadline, false)?)?;
                tickets.link(root, chapter_id)?;
                let retrospective_id = tickets.push(factory.chapter(
                    &chapter.name,
                    RETROSPECTIVE_ACTION,
                    retrospective_deadline,
                    true,
                )?)?;
                tickets.link(retrospective_root, retrospective_id)?;
                (chapter_id, retrospective_id)
            } else {
                (root, retrospective_root)
            };

            for enabler in &chapter.enablers {
                if enabler.mode_in(EXCLUDED_ENABLER_MODES) {
                    debug!(chapter = %chapter.name, enabler = %enabler.name, mode = %enabler.mode, "skipping enabler");
                    continue;
                }
                let enabler_id =
                    tickets.push(factory.enabler(&chapter.name, &enabler.name, action, deadline)?)?;
                tickets.link(anchor, enabler_id)?;
                tickets.link(retrospective_anchor, enabler_id)?;
            }
        }

        add_lab(
            &factory,
            &mut tickets,
            (root, Some(retrospective_root)),
            action,
            deadline,
            retrospective_deadline,
        )?;

        if self.settings.include_work_groups {
            add_work_groups(
                &factory,
                &mut tickets,
                (root, Some(retrospective_root)),
                action,
                deadline,
                retrospective_deadline,
            )?;
        }

        if self.settings.include_quality_assurance {
            let qa = tickets.push(factory.quality_assurance(action, deadline))?;
            tickets.link(root, qa)?;
        }

        info!(sprint = %sprint.as_str(), tickets = tickets.len(), "closing backlog built");

        Ok(SprintBacklog {
            phase,
            sprint,
            deadline,
            tickets,
            root,
            retrospective_root: Some(retrospective_root),
        })
    }
}
