use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::domain::calendar::SprintWindow;
use crate::error::{AppError, AppResult};

/// Tracker destination of a coordination backlog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Coordination {
    pub tracker: String,
    pub key: String,
}

/// A backlog owned by an enabler, a group or a lab node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BacklogUnit {
    pub name: String,
    pub tracker: String,
    pub key: String,
    pub backlog_keyword: String,
    #[serde(default)]
    pub mode: String,
}

impl BacklogUnit {
    /// Lifecycle modes are compared verbatim; anything not listed stays eligible.
    pub fn mode_in(&self, modes: &[&str]) -> bool {
        modes.iter().any(|mode| *mode == self.mode)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chapter {
    pub name: String,
    pub coordination: Coordination,
    #[serde(default)]
    pub enablers: Vec<BacklogUnit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkGroup {
    pub name: String,
    pub coordination: Coordination,
    #[serde(default)]
    pub groups: Vec<BacklogUnit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Lab {
    pub name: String,
    pub coordination: Coordination,
    #[serde(default)]
    pub nodes: Vec<BacklogUnit>,
}

/// Read-only view of the organization: chapters, work groups and labs in the
/// order the directory file declares them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Directory {
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub work_groups: Vec<WorkGroup>,
    #[serde(default)]
    pub labs: Vec<Lab>,
}

impl Directory {
    pub fn chapter(&self, name: &str) -> AppResult<&Chapter> {
        self.chapters
            .iter()
            .find(|chapter| chapter.name == name)
            .ok_or_else(|| AppError::Directory(format!("unknown chapter '{name}'")))
    }

    pub fn enabler(&self, chapter: &str, name: &str) -> AppResult<&BacklogUnit> {
        self.chapter(chapter)?
            .enablers
            .iter()
            .find(|enabler| enabler.name == name)
            .ok_or_else(|| {
                AppError::Directory(format!("unknown enabler '{name}' in chapter '{chapter}'"))
            })
    }

    pub fn work_group(&self, name: &str) -> AppResult<&WorkGroup> {
        self.work_groups
            .iter()
            .find(|group| group.name == name)
            .ok_or_else(|| AppError::Directory(format!("unknown work group '{name}'")))
    }

    pub fn group(&self, work_group: &str, name: &str) -> AppResult<&BacklogUnit> {
        self.work_group(work_group)?
            .groups
            .iter()
            .find(|group| group.name == name)
            .ok_or_else(|| {
                AppError::Directory(format!(
                    "unknown group '{name}' in work group '{work_group}'"
                ))
            })
    }

    pub fn lab(&self, name: &str) -> AppResult<&Lab> {
        self.labs
            .iter()
            .find(|lab| lab.name == name)
            .ok_or_else(|| AppError::Directory(format!("unknown lab '{name}'")))
    }

    pub fn node(&self, lab: &str, name: &str) -> AppResult<&BacklogUnit> {
        self.lab(lab)?
            .nodes
            .iter()
            .find(|node| node.name == name)
            .ok_or_else(|| AppError::Directory(format!("unknown node '{name}' in lab '{lab}'")))
    }
}

/// On-disk organization file: the directory plus the sprint calendar.
#[derive(Debug, Deserialize)]
pub struct OrganizationFile {
    #[serde(flatten)]
    pub directory: Directory,
    #[serde(default)]
    pub sprints: Vec<SprintWindow>,
}

impl OrganizationFile {
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path).map_err(|err| {
            AppError::Configuration(format!(
                "cannot read organization file {}: {err}",
                path.display()
            ))
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            AppError::Configuration(format!(
                "invalid organization file {}: {err}",
                path.display()
            ))
        })
    }
}
