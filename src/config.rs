use std::env;
use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const CONFIG_DIR_NAME: &str = "sprintdeck";
const CONFIG_FILE_NAME: &str = "config.json";
const DIRECTORY_FILE_NAME: &str = "organization.json";

const DEFAULT_ISSUE_TYPE: &str = "WorkItem";
const DEFAULT_REPORTER: &str = "backlogmanager";
const DEFAULT_IMPLICIT_WATCHER: &str = "mev";
const DEFAULT_VERSION_PROJECT: &str = "COR";
const DEFAULT_COORDINATION_PROJECT: &str = "COR";
const DEFAULT_COORDINATION_COMPONENT: &str = "10249";
const DEFAULT_QA_PROJECT: &str = "TCOR";
const DEFAULT_QA_COMPONENT: &str = "11700";
const DEFAULT_LAB: &str = "Lab";

/// Values persisted by `sprintdeck config init`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredConfig {
    pub jira_domain: Option<String>,
    pub jira_username: Option<String>,
    pub jira_password: Option<String>,
    pub directory_path: Option<String>,
    pub current_sprint: Option<String>,
    pub closing_deadline: Option<String>,
    pub planning_deadline: Option<String>,
    pub reporter: Option<String>,
    pub implicit_watcher: Option<String>,
    pub issue_type: Option<String>,
    pub include_work_groups: Option<bool>,
    pub include_quality_assurance: Option<bool>,
}

impl StoredConfig {
    pub fn load() -> AppResult<Self> {
        let path = config_file_path()?;
        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|err| {
                AppError::Configuration(format!("invalid config file {}: {err}", path.display()))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    pub fn save(&self) -> AppResult<()> {
        let path = config_file_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|err| AppError::Configuration(format!("failed to write config: {err}")))?;
        fs::write(&path, data)?;
        Ok(())
    }
}

pub fn config_directory() -> AppResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .ok_or_else(|| AppError::Configuration("cannot locate a configuration directory".into()))
}

pub fn config_file_path() -> AppResult<PathBuf> {
    Ok(config_directory()?.join(CONFIG_FILE_NAME))
}

/// A tracker project plus component pair for tickets not owned by a directory unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub project: String,
    pub component: String,
}

/// Settings consumed by the graph builders.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub reporter: Option<String>,
    pub coordination: Destination,
    pub quality_assurance: Destination,
    /// Lab whose nodes get tickets; `None` skips the lab subtree.
    pub lab: Option<String>,
    pub include_work_groups: bool,
    pub include_quality_assurance: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            reporter: Some(DEFAULT_REPORTER.to_string()),
            coordination: Destination {
                project: DEFAULT_COORDINATION_PROJECT.to_string(),
                component: DEFAULT_COORDINATION_COMPONENT.to_string(),
            },
            quality_assurance: Destination {
                project: DEFAULT_QA_PROJECT.to_string(),
                component: DEFAULT_QA_COMPONENT.to_string(),
            },
            lab: Some(DEFAULT_LAB.to_string()),
            include_work_groups: false,
            include_quality_assurance: false,
        }
    }
}

/// Settings consumed by the provisioning engine.
#[derive(Debug, Clone)]
pub struct DeploySettings {
    pub issue_type: String,
    /// Identity the tracker silently adds as watcher to tickets filed with a reporter.
    pub implicit_watcher: String,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            issue_type: DEFAULT_ISSUE_TYPE.to_string(),
            implicit_watcher: DEFAULT_IMPLICIT_WATCHER.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JiraSettings {
    pub domain: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Project whose versions carry the sprint release dates.
    pub version_project: String,
}

/// Resolved configuration, built once at startup and handed to every component.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jira: JiraSettings,
    pub directory_path: PathBuf,
    pub current_sprint: Option<String>,
    pub closing_deadline: Option<NaiveDate>,
    pub planning_deadline: Option<NaiveDate>,
    pub build: BuildSettings,
    pub deploy: DeploySettings,
}

impl AppConfig {
    pub fn load() -> AppResult<Self> {
        let stored = StoredConfig::load()?;
        Self::from_stored(stored, |key| env::var(key).ok())
    }

    /// Layers `SPRINTDECK_*` variables over the stored values.
    pub fn from_stored(
        stored: StoredConfig,
        var: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        let pick = |key: &str, value: Option<String>| var(key).or(value).filter(|v| !v.is_empty());

        let directory_path = match pick("SPRINTDECK_DIRECTORY", stored.directory_path) {
            Some(path) => PathBuf::from(path),
            None => config_directory()?.join(DIRECTORY_FILE_NAME),
        };

        let closing_deadline = pick("SPRINTDECK_CLOSING_DEADLINE", stored.closing_deadline)
            .map(|value| parse_date(&value))
            .transpose()?;
        let planning_deadline = pick("SPRINTDECK_PLANNING_DEADLINE", stored.planning_deadline)
            .map(|value| parse_date(&value))
            .transpose()?;

        let mut build = BuildSettings::default();
        if let Some(reporter) = pick("SPRINTDECK_REPORTER", stored.reporter) {
            build.reporter = if reporter == "-" { None } else { Some(reporter) };
        }
        build.include_work_groups = stored.include_work_groups.unwrap_or(false);
        build.include_quality_assurance = stored.include_quality_assurance.unwrap_or(false);

        let mut deploy = DeploySettings::default();
        if let Some(issue_type) = pick("SPRINTDECK_ISSUE_TYPE", stored.issue_type) {
            deploy.issue_type = issue_type;
        }
        if let Some(watcher) = pick("SPRINTDECK_IMPLICIT_WATCHER", stored.implicit_watcher) {
            deploy.implicit_watcher = watcher;
        }

        Ok(Self {
            jira: JiraSettings {
                domain: pick("SPRINTDECK_JIRA_DOMAIN", stored.jira_domain),
                username: pick("SPRINTDECK_JIRA_USERNAME", stored.jira_username),
                password: pick("SPRINTDECK_JIRA_PASSWORD", stored.jira_password),
                version_project: DEFAULT_VERSION_PROJECT.to_string(),
            },
            directory_path,
            current_sprint: pick("SPRINTDECK_SPRINT", stored.current_sprint),
            closing_deadline,
            planning_deadline,
            build,
            deploy,
        })
    }
}

pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|err| {
        AppError::Configuration(format!("invalid date '{value}' (expected YYYY-MM-DD): {err}"))
    })
}
