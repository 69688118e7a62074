use std::io::{self, Write};

use clap::{Args, Subcommand};

use crate::config::{StoredConfig, config_file_path, parse_date};
use crate::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Run the interactive configuration wizard.
    Init,
    /// Show the stored configuration (secrets masked).
    Show,
}

pub fn run(command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Init => run_init(),
        ConfigCommand::Show => run_show(),
    }
}

fn run_init() -> AppResult<()> {
    let mut cfg = StoredConfig::load()?;

    println!("Configuring sprintdeck.");
    println!("Press Enter to keep the current value, '-' to clear it.");
    println!("The Jira password is stored in the local config file; protect your filesystem accordingly.");
    println!();

    apply_prompt("Jira domain (e.g., jira.fiware.org)", &mut cfg.jira_domain, false)?;
    apply_prompt("Jira username", &mut cfg.jira_username, false)?;
    apply_prompt("Jira password", &mut cfg.jira_password, true)?;
    apply_prompt("Organization file path", &mut cfg.directory_path, false)?;
    apply_prompt(
        "Current sprint override (e.g., 5.2)",
        &mut cfg.current_sprint,
        false,
    )?;
    apply_date_prompt("Closing deadline (YYYY-MM-DD)", &mut cfg.closing_deadline)?;
    apply_date_prompt("Planning deadline (YYYY-MM-DD)", &mut cfg.planning_deadline)?;
    apply_prompt("Ticket reporter", &mut cfg.reporter, false)?;
    apply_prompt(
        "Implicit watcher removed after creation",
        &mut cfg.implicit_watcher,
        false,
    )?;
    apply_prompt("Issue type", &mut cfg.issue_type, false)?;
    apply_flag_prompt("Create work group tickets", &mut cfg.include_work_groups)?;
    apply_flag_prompt(
        "Create quality assurance ticket",
        &mut cfg.include_quality_assurance,
    )?;

    cfg.save()?;

    let path = config_file_path()?;
    println!("\nConfiguration saved to {}", path.display());
    Ok(())
}

fn run_show() -> AppResult<()> {
    let cfg = StoredConfig::load()?;
    let path = config_file_path()?;

    println!("Configuration file: {}", path.display());
    println!("Jira domain: {}", display_value(&cfg.jira_domain));
    println!("Jira username: {}", display_value(&cfg.jira_username));
    println!("Jira password: {}", mask_secret(&cfg.jira_password));
    println!("Organization file: {}", display_value(&cfg.directory_path));
    println!("Current sprint: {}", display_value(&cfg.current_sprint));
    println!("Closing deadline: {}", display_value(&cfg.closing_deadline));
    println!("Planning deadline: {}", display_value(&cfg.planning_deadline));
    println!("Reporter: {}", display_value(&cfg.reporter));
    println!("Implicit watcher: {}", display_value(&cfg.implicit_watcher));
    println!("Issue type: {}", display_value(&cfg.issue_type));
    println!("Work group tickets: {}", display_flag(cfg.include_work_groups));
    println!(
        "Quality assurance ticket: {}",
        display_flag(cfg.include_quality_assurance)
    );

    Ok(())
}

fn apply_prompt(field: &str, target: &mut Option<String>, secret: bool) -> AppResult<()> {
    match prompt(field, target.as_deref(), secret)? {
        PromptAction::Keep => {}
        PromptAction::Clear => *target = None,
        PromptAction::Set(value) => *target = Some(value),
    }
    Ok(())
}

fn apply_date_prompt(field: &str, target: &mut Option<String>) -> AppResult<()> {
    loop {
        match prompt(field, target.as_deref(), false)? {
            PromptAction::Keep => return Ok(()),
            PromptAction::Clear => {
                *target = None;
                return Ok(());
            }
            PromptAction::Set(value) => match parse_date(&value) {
                Ok(date) => {
                    *target = Some(date.format("%Y-%m-%d").to_string());
                    return Ok(());
                }
                Err(err) => println!("{err}"),
            },
        }
    }
}

fn apply_flag_prompt(field: &str, target: &mut Option<bool>) -> AppResult<()> {
    let current = target.map(|flag| if flag { "yes" } else { "no" });
    match prompt(&format!("{field} (yes/no)"), current, false)? {
        PromptAction::Keep => {}
        PromptAction::Clear => *target = None,
        PromptAction::Set(value) => *target = Some(parse_flag(&value)),
    }
    Ok(())
}

fn prompt(field: &str, current: Option<&str>, secret: bool) -> AppResult<PromptAction> {
    let mut stdout = io::stdout();

    match (current, secret) {
        (Some(_), true) => write!(stdout, "{field} [****] (Enter to keep, '-' to clear): ")?,
        (Some(value), false) => {
            write!(stdout, "{field} [{value}] (Enter to keep, '-' to clear): ")?
        }
        (None, _) => write!(stdout, "{field} (Enter to skip): ")?,
    }
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let trimmed = input.trim();

    if trimmed.is_empty() {
        Ok(PromptAction::Keep)
    } else if trimmed == "-" {
        Ok(PromptAction::Clear)
    } else {
        Ok(PromptAction::Set(trimmed.to_string()))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "y" | "yes" | "true" | "1"
    )
}

fn display_value(value: &Option<String>) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<not set>".to_string())
}

fn display_flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) | None => "no",
    }
}

fn mask_secret(value: &Option<String>) -> String {
    match value {
        Some(secret) if secret.len() > 6 => {
            let prefix = &secret[..3];
            let suffix = &secret[secret.len() - 3..];
            format!("{prefix}***{suffix}")
        }
        Some(secret) if !secret.is_empty() => "***".to_string(),
        _ => "<not set>".to_string(),
    }
}

enum PromptAction {
    Keep,
    Clear,
    Set(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_secrets() {
        assert_eq!(mask_secret(&Some("hunter2000".to_string())), "hun***000");
        assert_eq!(mask_secret(&Some("abc".to_string())), "***");
        assert_eq!(mask_secret(&None), "<not set>");
    }

    #[test]
    fn parses_flags() {
        assert!(parse_flag("Yes"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("no"));
        assert!(!parse_flag("maybe"));
    }
}
