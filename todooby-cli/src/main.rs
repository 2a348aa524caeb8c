use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use todooby_core::time::{format_date, format_hhmm, parse_date, parse_timezone, today_in};
use todooby_core::{
    AnalysisRequest, AnalyzedTask, DifficultyLevel, Placement, ScheduleConfig, ScheduleOutcome,
    StampedIds, Subtask, TaskAnalyzer, UserSchedule, analyze_task, build_day_slots,
    schedule_subtasks,
};
use tracing::Level;

mod analyzer;
mod calendar;
mod config;
mod state;

use analyzer::{CommandAnalyzer, FileAnalyzer, Unavailable};
use config::{Config, load_config};
use state::{read_text, write_text};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TODOOBY_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "todooby", version = VERSION, about = "Calendar-aware subtask scheduler")]
struct Cli {
    /// Debug-level logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Place a JSON list of subtasks into free calendar time
    Schedule {
        /// JSON array of subtasks
        #[arg(long)]
        input: PathBuf,

        /// First day to schedule (default: today in the configured timezone)
        #[arg(long)]
        start_date: Option<String>,

        /// Last day work should be spread over
        #[arg(long)]
        deadline: Option<String>,

        /// JSON user schedule (default: [schedule] from config.toml)
        #[arg(long)]
        schedule: Option<PathBuf>,

        /// Also write placed subtasks as an iCalendar file
        #[arg(long)]
        ics: Option<PathBuf>,

        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Break a task into subtasks and schedule them
    Analyze {
        #[arg(long)]
        title: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        deadline: Option<String>,

        #[arg(long)]
        requirements: Option<String>,

        /// easy | normal | hard (default: [analysis] from config.toml)
        #[arg(long)]
        difficulty: Option<DifficultyLevel>,

        /// Saved LLM response to parse instead of running analysis.command
        #[arg(long)]
        response: Option<PathBuf>,

        #[arg(long)]
        schedule: Option<PathBuf>,

        #[arg(long)]
        ics: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Show the free slots for one date
    Slots {
        #[arg(long)]
        date: String,

        #[arg(long)]
        schedule: Option<PathBuf>,
    },

    /// Manage ~/.todooby/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,
    /// Print the effective config
    Show,
    /// Print the config file location
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Schedule {
            input,
            start_date,
            deadline,
            schedule,
            ics,
            json,
        } => {
            let cfg = load_config()?;
            let user = resolve_schedule(&cfg, schedule.as_deref())?;
            let subtasks: Vec<Subtask> = serde_json::from_str(&read_text(&input)?)
                .with_context(|| format!("parse subtasks from {}", input.display()))?;

            let start = match start_date {
                Some(s) => s,
                None => format_date(today(&user)?),
            };
            let outcome = schedule_subtasks(&subtasks, &start, deadline.as_deref(), Some(&user))
                .context("scheduling input rejected")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_outcome(&outcome);
            }
            if let Some(path) = ics {
                export_ics(&path, &outcome.placements, &outcome.subtasks, &user)?;
            }
        }

        Command::Analyze {
            title,
            description,
            deadline,
            requirements,
            difficulty,
            response,
            schedule,
            ics,
            json,
        } => {
            let cfg = load_config()?;
            let user = resolve_schedule(&cfg, schedule.as_deref())?;
            let today = today(&user)?;

            let request = AnalysisRequest {
                title,
                description,
                deadline,
                user_requirements: requirements,
                difficulty: difficulty.unwrap_or(cfg.analysis.difficulty),
                user_schedule: Some(user.clone()),
            };

            let analyzer: Box<dyn TaskAnalyzer> = match (response, &cfg.analysis.command) {
                (Some(path), _) => Box::new(FileAnalyzer { path }),
                (None, Some(command)) => Box::new(CommandAnalyzer {
                    command: command.clone(),
                    args: cfg.analysis.args.clone(),
                    today,
                }),
                (None, None) => Box::new(Unavailable),
            };

            let mut ids = StampedIds::new(Utc::now().timestamp_millis());
            let analyzed = analyze_task(analyzer.as_ref(), &request, today, &mut ids);

            if json {
                println!("{}", serde_json::to_string_pretty(&analyzed)?);
            } else {
                print_analyzed(&analyzed);
            }
            if let Some(path) = ics {
                export_ics(
                    &path,
                    &analyzed.placements,
                    &analyzed.analysis.suggested_subtasks,
                    &user,
                )?;
            }
        }

        Command::Slots { date, schedule } => {
            let cfg = load_config()?;
            let user = resolve_schedule(&cfg, schedule.as_deref())?;
            let day = parse_date(&date)?;

            let mut notes = Vec::new();
            let resolved = ScheduleConfig::from_user(Some(&user), &mut notes)?;
            let slots = build_day_slots(day, &resolved);

            println!("# Free slots on {}\n", format_date(day));
            if slots.is_empty() {
                println!("(none)");
            }
            for s in &slots {
                println!(
                    "- {}-{} ({} min)",
                    format_hhmm(s.start),
                    format_hhmm(s.end),
                    s.width()
                );
            }
            print_notes("Assumptions", &notes);
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => print!("{}", config::render_config(&load_config()?)?),
            ConfigCommand::Path => println!("{}", config::config_path()?.display()),
        },
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

/// `--schedule <file>` wins over the config's `[schedule]` table.
fn resolve_schedule(cfg: &Config, path: Option<&Path>) -> Result<UserSchedule> {
    let Some(path) = path else {
        return Ok(cfg.schedule.clone());
    };
    let mut user: UserSchedule = serde_json::from_str(&read_text(path)?)
        .with_context(|| format!("parse user schedule from {}", path.display()))?;
    if user.timezone.is_none() {
        user.timezone = Some(cfg.timezone().to_string());
    }
    Ok(user)
}

fn timezone_of(user: &UserSchedule) -> &str {
    user.timezone.as_deref().unwrap_or(todooby_core::DEFAULT_TIMEZONE)
}

fn today(user: &UserSchedule) -> Result<NaiveDate> {
    Ok(today_in(timezone_of(user), Utc::now())?)
}

fn export_ics(
    path: &Path,
    placements: &[Placement],
    subtasks: &[Subtask],
    user: &UserSchedule,
) -> Result<()> {
    if placements.is_empty() {
        bail!("nothing was placed; no calendar written");
    }
    let tz = parse_timezone(timezone_of(user))?;
    let events = calendar::placements_to_events(placements, subtasks, tz, "")?;
    write_text(path, &calendar::events_to_ics(&events, Utc::now()))?;
    eprintln!("Wrote {} events to {}", events.len(), path.display());
    Ok(())
}

fn print_subtasks(subtasks: &[Subtask], unplaced: &[String]) {
    for s in subtasks {
        let flag = if unplaced.contains(&s.id) { " (unplaced)" } else { "" };
        println!(
            "- {} {} | {:>3} min | {:?} | {}{}",
            s.date.as_deref().unwrap_or("????-??-??"),
            s.time.as_deref().unwrap_or("--:--"),
            s.estimated_duration,
            s.priority,
            s.text,
            flag
        );
    }
}

fn print_notes(heading: &str, notes: &[String]) {
    if notes.is_empty() {
        return;
    }
    println!("\n## {heading}\n");
    for n in notes {
        println!("- {n}");
    }
}

fn print_outcome(outcome: &ScheduleOutcome) {
    println!("# Schedule\n");
    print_subtasks(&outcome.subtasks, &outcome.unplaced);
    print_notes("Assumptions", &outcome.assumptions);
    print_notes("Missing info", &outcome.missing_info);
}

fn print_analyzed(analyzed: &AnalyzedTask) {
    let a = &analyzed.analysis;
    println!("# Plan\n");
    println!(
        "complexity={:?} | total={} min | priority={:?} | scheduling={:?}{}\n",
        a.complexity,
        a.estimated_total_time,
        a.priority,
        analyzed.status,
        if analyzed.used_fallback { " | default plan" } else { "" }
    );

    let placed: Vec<&str> = analyzed.placements.iter().map(|p| p.subtask_id.as_str()).collect();
    let unplaced: Vec<String> = a
        .suggested_subtasks
        .iter()
        .filter(|s| !placed.contains(&s.id.as_str()))
        .map(|s| s.id.clone())
        .collect();
    print_subtasks(&a.suggested_subtasks, &unplaced);
    print_notes("Assumptions", &analyzed.assumptions);
    print_notes("Missing info", &analyzed.missing_info);
}
