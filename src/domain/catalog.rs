//! Summary and description templates for every ticket kind.
//!
//! Summaries are dot-delimited paths and double as search keys, so two
//! tickets of one run must never share one. Descriptions use Jira wiki markup.

use chrono::NaiveDate;

use crate::domain::ticket::{Phase, TicketDefinition, TicketKind};

const NAMESPACE: &str = "FIWARE.WorkItem";
const COORDINATION: &str = "Coordination";

const RETROSPECTIVE_PATTERN: &str = "# Retrospective Pattern:\n\
#* {color:blue}What went well{color}\n\
#** identify aspects working smoothly\n\
#* {color:blue}What to improve{color}\n\
#** identify aspects making progress difficult\n";

const REMINDERS: &str = "+Reminders:+\n\
# Issues left open are moved forward to next sprint automatically at sprint closing time\n\
# WorkItems almost finished can be closed, and then cloned for the next sprint\n";

pub fn summary(ticket: &TicketDefinition) -> String {
    let unit = match &ticket.kind {
        TicketKind::Source | TicketKind::ScrumMasterRetrospective => COORDINATION.to_string(),
        TicketKind::Chapter { chapter } | TicketKind::ChapterRetrospective { chapter } => {
            format!("{chapter}.{COORDINATION}")
        }
        TicketKind::Enabler {
            chapter, keyword, ..
        } => format!("{chapter}.{keyword}"),
        TicketKind::WorkGroup { work_group }
        | TicketKind::WorkGroupRetrospective { work_group } => {
            format!("{work_group}.{COORDINATION}")
        }
        TicketKind::Group {
            work_group,
            keyword,
            ..
        } => format!("{work_group}.{keyword}"),
        TicketKind::Lab { lab } | TicketKind::LabRetrospective { lab } => {
            format!("{lab}.{COORDINATION}")
        }
        TicketKind::Node { lab, keyword, .. } => format!("{lab}.{keyword}"),
        TicketKind::QualityAssurance => "QualityAssurance".to_string(),
    };

    format!(
        "{NAMESPACE}.{unit}.Agile.Sprint-{}.{}",
        ticket.sprint.compact(),
        ticket.action
    )
}

pub fn description(ticket: &TicketDefinition) -> String {
    let deadline = deadline_line(ticket.deadline());
    match &ticket.kind {
        TicketKind::ScrumMasterRetrospective => format!(
            "# Drawn from {{color:blue}}Chapter's and Working Group's Summary Retrospectives{{color}} \
             the {{color:red}}Global Retrospective{{color}} \n\
             # Share Global Retrospective {RETROSPECTIVE_PATTERN}"
        ),
        TicketKind::ChapterRetrospective { .. } => {
            aggregation("Chapter Summary Retrospective", "Enablers' Retrospectives")
        }
        TicketKind::WorkGroupRetrospective { .. } => {
            aggregation("Working Group Summary Retrospective", "Groups' Retrospectives")
        }
        TicketKind::LabRetrospective { .. } => {
            aggregation("Lab Summary Retrospective", "Nodes' Retrospectives")
        }
        kind => {
            let mut text = header(ticket);
            text.push_str(&checklist(kind, ticket.phase, &ticket.sprint.fix_version()));
            text.push('\n');
            text.push_str(&deadline);
            if ticket.phase == Phase::Closing && is_closing_leaf(kind) {
                text.push('\n');
                text.push_str(REMINDERS);
                text.push_str(RETROSPECTIVE_PATTERN);
            }
            text
        }
    }
}

fn header(ticket: &TicketDefinition) -> String {
    format!(
        "+Activities requested to {{color:red}}{}{{color}} {{color:blue}}*{}*{{color}}+\n",
        ticket.phase.verb(),
        ticket.sprint.fix_version()
    )
}

fn aggregation(target: &str, sources: &str) -> String {
    format!(
        "# Drawn {{color:red}} {target}{{color}} from {{color:blue}} {sources}{{color}} \n\
         {RETROSPECTIVE_PATTERN}"
    )
}

fn deadline_line(deadline: Option<NaiveDate>) -> String {
    match deadline {
        Some(day) => format!(
            "{{color:red}}Deadline = {} at 18:00{{color}}\n",
            day.format("%d-%m-%Y")
        ),
        None => "{color:red}Deadline = to be agreed{color}\n".to_string(),
    }
}

fn is_closing_leaf(kind: &TicketKind) -> bool {
    matches!(
        kind,
        TicketKind::Enabler { .. }
            | TicketKind::WorkGroup { .. }
            | TicketKind::Group { .. }
            | TicketKind::Lab { .. }
            | TicketKind::Node { .. }
            | TicketKind::QualityAssurance
    )
}

fn checklist(kind: &TicketKind, phase: Phase, fix_version: &str) -> String {
    let items: Vec<String> = match (phase, kind) {
        (Phase::Closing, TicketKind::Source) => vec![
            "Create hierarchically backlog issues for all tech chapters leaders and GE owners".into(),
            "Create hierarchically backlog issues for all working group leaders and groups".into(),
            "Schedule and attend sprint closing meetings for all tech chapters and working groups".into(),
            format!("Take backlog snapshot for {fix_version}"),
            format!("Close effectively {fix_version} by the deadline"),
            "Share sprint closing outcome with project partners".into(),
        ],
        (Phase::Planning, TicketKind::Source) => vec![
            "Create hierarchically backlog issues for all tech chapters leaders and GE owners".into(),
            "Schedule and attend sprint planning meetings for all tech chapters".into(),
            format!("Take backlog snapshot for {fix_version}"),
            "Share sprint planning outcome with project partners".into(),
        ],
        (Phase::Closing, TicketKind::Chapter { .. }) => vec![
            "Close your coordination backlog issues finished during the sprint".into(),
            "Update your help desk issues linked to the backlog".into(),
            "Verify chapter enabler/tools's backlog are properly closed".into(),
            "Verify chapter enabler/tools's retrospective are provided in time".into(),
        ],
        (Phase::Planning, TicketKind::Chapter { .. }) => vec![
            "Verify sprint planning issues are available for all GE owners".into(),
            "Organise and hold sprint planning meeting for the chapter before deadline".into(),
            "Update your chapter coordination backlog properly".into(),
            "Verify all GEs are properly planned for the sprint".into(),
        ],
        (Phase::Closing, TicketKind::Enabler { .. }) => vec![
            "Close your enabler/tool backlog issues finished during the sprint".into(),
            "Update your help desk issues linked to the backlog".into(),
            "Provide your retrospective in this specific issue created for this purpose by adding a comment".into(),
        ],
        (Phase::Planning, TicketKind::Enabler { .. }) => {
            return planning_topics(
                &[
                    "Check your sprint planning issue is available and update its status as you progress",
                    "Create and/or schedule your backlog issues for the sprint",
                ],
                &[
                    "My HelpDesk Issues - My Bugs",
                    "My Roadmap - My Developments",
                    "My Deployments (FIWARE LAB)",
                    "My Publishing (Catalogue)",
                    "My Training (Academy)",
                    "My Contribution to Deliverables",
                    "Others?",
                ],
            );
        }
        (Phase::Closing, TicketKind::WorkGroup { .. }) => vec![
            "Close your Working Group coordination backlog issues finished during the sprint".into(),
            "Add any workitem not foreseen but arisen during the sprint".into(),
            "Verify your groups' backlog are properly closed".into(),
            "Verify your groups' retrospective are provided in time".into(),
            "Provide your retrospective in this specific issue created for this purpose by adding a comment".into(),
        ],
        (Phase::Planning, TicketKind::WorkGroup { .. }) => vec![
            "If needed, organise and hold sprint planning meeting for the workgroup before deadline".into(),
            "Update your work group coordination backlog properly".into(),
            "Verify all components are properly planned for the sprint".into(),
        ],
        (Phase::Closing, TicketKind::Group { .. })
        | (Phase::Closing, TicketKind::Node { .. })
        | (Phase::Closing, TicketKind::QualityAssurance) => vec![
            "Close your backlog issues finished during the sprint".into(),
            "Add any work item not foreseen but arisen during the sprint".into(),
            "Provide your retrospective in this specific issue created for this purpose by adding a comment".into(),
        ],
        (Phase::Planning, TicketKind::Group { .. }) => {
            return planning_topics(
                &["Create and/or schedule your backlog issues for the sprint"],
                &["My Contribution to Deliverables", "Others?"],
            );
        }
        (Phase::Planning, TicketKind::QualityAssurance) => {
            return planning_topics(
                &["Create and/or schedule backlog issues for the sprint"],
                &[
                    "Test Cases and test descriptions",
                    "My Contribution to Deliverables",
                    "Test reports",
                    "Others?",
                ],
            );
        }
        (Phase::Closing, TicketKind::Lab { .. }) => vec![
            "Close your coordination backlog issues finished during the sprint".into(),
            "Add any workitem not foreseen but arisen during the sprint".into(),
            "Verify nodes' backlog are properly closed".into(),
            "Verify nodes' retrospective are provided in time".into(),
        ],
        (Phase::Planning, TicketKind::Lab { .. }) => vec![
            "Verify sprint planning issues are available for all Nodes".into(),
            "Organise and hold sprint planning meeting for the lab before deadline".into(),
            "Update your lab coordination backlog properly".into(),
            "Verify all Nodes are properly planned for the sprint".into(),
        ],
        (Phase::Planning, TicketKind::Node { .. }) => vec![
            "Check your sprint planning issue is available and update its status as you progress".into(),
            "Create and/or schedule foreseen backlog issues for the sprint".into(),
        ],
        // retrospective kinds are rendered by `description` before reaching here
        (_, TicketKind::ScrumMasterRetrospective)
        | (_, TicketKind::ChapterRetrospective { .. })
        | (_, TicketKind::WorkGroupRetrospective { .. })
        | (_, TicketKind::LabRetrospective { .. }) => Vec::new(),
    };

    numbered(&items)
}

fn numbered<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| format!("# {}\n", item.as_ref()))
        .collect()
}

fn planning_topics(steps: &[&str], topics: &[&str]) -> String {
    let mut text = numbered(steps);
    text.push_str("Topics:\n");
    for topic in topics {
        text.push_str(&format!("#* {topic}\n"));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::calendar::SprintLabel;
    use crate::domain::ticket::RETROSPECTIVE_ACTION;

    fn ticket(kind: TicketKind, phase: Phase, action: &str) -> TicketDefinition {
        TicketDefinition::new(
            kind,
            phase,
            "PRJ",
            "1000",
            action,
            SprintLabel::new("5.2"),
            NaiveDate::from_ymd_opt(2017, 9, 29),
        )
    }

    #[test]
    fn root_summaries_omit_organizational_segment() {
        let root = ticket(TicketKind::Source, Phase::Closing, "Close");
        let retro = ticket(
            TicketKind::ScrumMasterRetrospective,
            Phase::Closing,
            RETROSPECTIVE_ACTION,
        );

        assert_eq!(root.summary(), "FIWARE.WorkItem.Coordination.Agile.Sprint-52.Close");
        assert_eq!(
            retro.summary(),
            "FIWARE.WorkItem.Coordination.Agile.Sprint-52.Retrospective"
        );
    }

    #[test]
    fn leaf_summaries_use_backlog_keyword() {
        let enabler = ticket(
            TicketKind::Enabler {
                chapter: "Data".to_string(),
                enabler: "Orion".to_string(),
                keyword: "ContextBroker".to_string(),
            },
            Phase::Planning,
            "Planning",
        );
        let node = ticket(
            TicketKind::Node {
                lab: "Lab".to_string(),
                node: "Spain".to_string(),
                keyword: "Spain2".to_string(),
            },
            Phase::Closing,
            "Close",
        );
        let chapter = ticket(
            TicketKind::Chapter {
                chapter: "Ops".to_string(),
            },
            Phase::Closing,
            "Close",
        );

        assert_eq!(
            enabler.summary(),
            "FIWARE.WorkItem.Data.ContextBroker.Agile.Sprint-52.Planning"
        );
        assert_eq!(node.summary(), "FIWARE.WorkItem.Lab.Spain2.Agile.Sprint-52.Close");
        assert_eq!(chapter.summary(), "FIWARE.WorkItem.Ops.Coordination.Agile.Sprint-52.Close");
    }

    #[test]
    fn closing_leaf_description_carries_deadline_and_reminders() {
        let node = ticket(
            TicketKind::Node {
                lab: "Lab".to_string(),
                node: "Spain".to_string(),
                keyword: "Spain".to_string(),
            },
            Phase::Closing,
            "Close",
        );
        let text = node.description();

        assert!(text.starts_with(
            "+Activities requested to {color:red}Close{color} {color:blue}*Sprint 5.2*{color}+\n"
        ));
        assert!(text.contains("# Close your backlog issues finished during the sprint\n"));
        assert!(text.contains("Deadline = 29-09-2017 at 18:00"));
        assert!(text.contains("+Reminders:+"));
        assert!(text.contains("What went well"));
    }

    #[test]
    fn planning_descriptions_skip_reminders() {
        let enabler = ticket(
            TicketKind::Enabler {
                chapter: "Data".to_string(),
                enabler: "Orion".to_string(),
                keyword: "Orion".to_string(),
            },
            Phase::Planning,
            "Planning",
        );
        let text = enabler.description();

        assert!(text.contains("{color:red}Plan{color}"));
        assert!(text.contains("Topics:\n#* My HelpDesk Issues - My Bugs\n"));
        assert!(!text.contains("Reminders"));
    }

    #[test]
    fn root_and_chapter_descriptions_skip_reminders() {
        let root = ticket(TicketKind::Source, Phase::Closing, "Close");
        let text = root.description();

        assert!(text.contains("# Take backlog snapshot for Sprint 5.2\n"));
        assert!(!text.contains("Reminders"));
    }

    #[test]
    fn retrospectives_aggregate_children() {
        let lab = ticket(
            TicketKind::LabRetrospective {
                lab: "Lab".to_string(),
            },
            Phase::Closing,
            RETROSPECTIVE_ACTION,
        );
        let text = lab.description();

        assert!(text.contains("Lab Summary Retrospective"));
        assert!(text.contains("Nodes' Retrospectives"));
        assert!(text.contains("# Retrospective Pattern:"));
    }

    #[test]
    fn missing_deadline_is_rendered() {
        let root = TicketDefinition::new(
            TicketKind::Source,
            Phase::Planning,
            "COR",
            "1",
            "Planning",
            SprintLabel::new("6.1"),
            None,
        );
        assert!(root.description().contains("Deadline = to be agreed"));
    }
}
