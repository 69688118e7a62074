use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SprintWindow {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// A sprint identifier such as `5.2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintLabel(String);

impl SprintLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Label with dots removed, used inside summaries: `5.2` -> `52`.
    pub fn compact(&self) -> String {
        self.0.replace('.', "")
    }

    /// Tracker fix version and human form: `Sprint 5.2`.
    pub fn fix_version(&self) -> String {
        format!("Sprint {}", self.0)
    }
}

pub struct AgileCalendar {
    sprints: Vec<SprintWindow>,
}

impl AgileCalendar {
    pub fn new(sprints: Vec<SprintWindow>) -> Self {
        Self { sprints }
    }

    pub fn sprint_at(&self, day: NaiveDate) -> AppResult<SprintLabel> {
        self.sprints
            .iter()
            .find(|sprint| sprint.start <= day && day <= sprint.end)
            .map(|sprint| SprintLabel::new(sprint.label.clone()))
            .ok_or_else(|| AppError::Calendar(format!("no sprint covers {day}")))
    }

    pub fn current_sprint(&self) -> AppResult<SprintLabel> {
        self.sprint_at(chrono::Local::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn formats_sprint_label() {
        let label = SprintLabel::new("5.2");
        assert_eq!(label.compact(), "52");
        assert_eq!(label.fix_version(), "Sprint 5.2");
    }

    #[test]
    fn finds_sprint_covering_day() {
        let calendar = AgileCalendar::new(vec![
            SprintWindow {
                label: "5.1".to_string(),
                start: date("2017-08-01"),
                end: date("2017-08-31"),
            },
            SprintWindow {
                label: "5.2".to_string(),
                start: date("2017-09-01"),
                end: date("2017-09-29"),
            },
        ]);

        assert_eq!(calendar.sprint_at(date("2017-09-29")).unwrap().as_str(), "5.2");
        assert_eq!(calendar.sprint_at(date("2017-08-01")).unwrap().as_str(), "5.1");
        assert!(matches!(
            calendar.sprint_at(date("2017-10-02")),
            Err(AppError::Calendar(_))
        ));
    }
}
