use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use todooby_core::{DEFAULT_TIMEZONE, DifficultyLevel, TimeRange, UserSchedule};

use crate::state::{ensure_todooby_home, read_text, write_text};

/// `~/.todooby/config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Used whenever a command is not given `--schedule`.
    #[serde(default)]
    pub schedule: UserSchedule,
    #[serde(default)]
    pub analysis: AnalysisSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSection {
    #[serde(default)]
    pub difficulty: DifficultyLevel,

    /// Command that answers an analysis prompt on stdout (e.g. an LLM CLI).
    /// The prompt is passed as the final argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Extra args passed before the prompt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schedule: UserSchedule {
                timezone: Some(DEFAULT_TIMEZONE.to_string()),
                working_hours: Some(TimeRange::new("09:00", "18:00")),
                // TOML has no null; a zero-length range disables lunch.
                lunch_break: Some(Some(TimeRange::new("12:00", "13:00"))),
                avoid_weekends: Some(false),
                ..Default::default()
            },
            analysis: AnalysisSection::default(),
        }
    }
}

impl Config {
    pub fn timezone(&self) -> &str {
        self.schedule.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE)
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_todooby_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    parse_config(&read_text(&p)?)
}

pub fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config.toml")
}

pub fn render_config(cfg: &Config) -> Result<String> {
    toml::to_string_pretty(cfg).context("serialize config")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    write_text(&p, &render_config(cfg)?)
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
