use std::io::{self, Write};
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use tracing::info;

use crate::config::parse_date;
use crate::context::AppContext;
use crate::domain::calendar::{AgileCalendar, SprintLabel};
use crate::domain::directory::OrganizationFile;
use crate::domain::ticket::Phase;
use crate::error::{AppError, AppResult};
use crate::workflow::SprintBacklog;
use crate::workflow::closing::{SprintClosing, resolve_deadline};
use crate::workflow::deploy::{BacklogDeployer, enumerate};
use crate::workflow::planning::SprintPlanning;

#[derive(Args, Debug, Clone)]
pub struct PhaseArgs {
    /// Organization file with chapters, work groups, labs and sprints.
    #[arg(short, long)]
    pub directory: Option<PathBuf>,
    /// Sprint label (e.g. 5.2); defaults to the sprint covering today.
    #[arg(short, long)]
    pub sprint: Option<String>,
    /// Phase deadline as YYYY-MM-DD.
    #[arg(long, value_parser = parse_deadline)]
    pub deadline: Option<NaiveDate>,
    /// Include ticket descriptions when listing.
    #[arg(long)]
    pub descriptions: bool,
    /// Run a single operation instead of the interactive menu.
    #[arg(long, value_enum)]
    pub op: Option<Operation>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Audit,
    Search,
    Retire,
}

impl Operation {
    fn from_choice(choice: &str) -> Option<Self> {
        match choice {
            "0" => Some(Operation::List),
            "1" => Some(Operation::Create),
            "2" => Some(Operation::Audit),
            "3" => Some(Operation::Search),
            "4" => Some(Operation::Retire),
            _ => None,
        }
    }
}

fn parse_deadline(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).map_err(|err| err.to_string())
}

pub async fn run(ctx: &AppContext, phase: Phase, args: PhaseArgs) -> AppResult<()> {
    let mut backlog = build_backlog(ctx, phase, &args).await?;

    match args.op {
        Some(op) => execute(ctx, &mut backlog, op, args.descriptions).await,
        None => menu(ctx, &mut backlog, args.descriptions).await,
    }
}

async fn build_backlog(ctx: &AppContext, phase: Phase, args: &PhaseArgs) -> AppResult<SprintBacklog> {
    let config = &ctx.config;
    let path = args
        .directory
        .clone()
        .unwrap_or_else(|| config.directory_path.clone());
    let organization = OrganizationFile::load(&path)?;

    let sprint = match args.sprint.clone().or_else(|| config.current_sprint.clone()) {
        Some(label) => SprintLabel::new(label),
        None => AgileCalendar::new(organization.sprints.clone()).current_sprint()?,
    };
    info!(phase = phase.as_str(), sprint = sprint.as_str(), directory = %path.display(), "building backlog");

    match phase {
        Phase::Closing => {
            let deadline = resolve_deadline(
                ctx.issue_tracker.as_ref(),
                &config.jira.version_project,
                &sprint,
                args.deadline.or(config.closing_deadline),
            )
            .await?;
            SprintClosing::new(&organization.directory, &config.build).build(sprint, deadline)
        }
        Phase::Planning => {
            let deadline = args.deadline.or(config.planning_deadline).ok_or_else(|| {
                AppError::Configuration("no planning deadline configured".to_string())
            })?;
            SprintPlanning::new(&organization.directory, &config.build).build(sprint, deadline)
        }
    }
}

async fn menu(ctx: &AppContext, backlog: &mut SprintBacklog, descriptions: bool) -> AppResult<()> {
    let mut stdout = io::stdout();
    loop {
        write!(
            stdout,
            "\nMenu:\n\t0: list\n\t1: create\n\t2: audit\n\t3: search\n\t4: retire\n\tE: exit\n\
             Enter your choice [0-4, (E)xit]: "
        )?;
        stdout.flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(());
        }
        let choice = input.trim();
        if choice.eq_ignore_ascii_case("e") {
            return Ok(());
        }

        match Operation::from_choice(choice) {
            Some(op) => execute(ctx, backlog, op, descriptions).await?,
            None => println!("Wrong option '{choice}', please try again."),
        }
    }
}

async fn execute(
    ctx: &AppContext,
    backlog: &mut SprintBacklog,
    op: Operation,
    descriptions: bool,
) -> AppResult<()> {
    let deployer = BacklogDeployer::new(ctx.issue_tracker.as_ref(), &ctx.config.deploy);

    match op {
        Operation::List => print!("{}", enumerate(backlog, descriptions)),
        Operation::Create => {
            println!("--> CREATING");
            let report = deployer.create(backlog).await?;
            for created in &report.created {
                println!("Created {}: {} {}", created.id, created.ticket.key, created.summary);
            }
            println!(
                "{} tickets created, {} links added.",
                report.created.len(),
                report.links
            );
        }
        Operation::Audit => {
            println!("--> AUDIT");
            let entries = deployer.audit(backlog).await?;
            if entries.is_empty() {
                println!("No tickets created in this session.");
            }
            for entry in entries {
                let marker = if entry.drifted() { " (drifted)" } else { "" };
                println!("{} {} {}{marker}", entry.id, entry.key, entry.actual);
            }
        }
        Operation::Search => {
            println!("--> SEARCHING");
            for result in deployer.search(backlog).await? {
                println!("{} [{}]", backlog.tickets[result.id].summary(), result.query);
                for found in result.matches {
                    println!("\t{} {}", found.key, found.summary);
                }
            }
        }
        Operation::Retire => {
            println!("--> RETIRING");
            let report = deployer.retire(backlog).await;
            for key in &report.deleted {
                println!("Removed: {key}");
            }
            for (key, reason) in &report.failed {
                println!("Could not remove {key}: {reason}");
            }
            if report.skipped > 0 {
                println!("{} tickets were never created in this session.", report.skipped);
            }
        }
    }
    Ok(())
}
