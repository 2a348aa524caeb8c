//! Task analysis: turn a high-level task into scheduled subtasks.
//!
//! The LLM itself sits behind [`TaskAnalyzer`]; prompting and transport live
//! with the caller. This module owns what happens to the text that comes
//! back: cleanup, parsing, the default plan when analysis fails, id
//! assignment, and handing the result to the scheduler.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::UserSchedule;
use crate::error::AnalysisError;
use crate::placer::Placement;
use crate::scheduler::{SchedulingResult, schedule_or_keep};
use crate::task::{Priority, Subtask};
use crate::time::format_date;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Moderate,
    Complex,
}

/// How finely the analyzer should slice the work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl FromStr for DifficultyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(DifficultyLevel::Easy),
            "normal" => Ok(DifficultyLevel::Normal),
            "hard" => Ok(DifficultyLevel::Hard),
            other => Err(format!("unknown difficulty '{other}' (easy|normal|hard)")),
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DifficultyLevel::Easy => "easy",
            DifficultyLevel::Normal => "normal",
            DifficultyLevel::Hard => "hard",
        })
    }
}

/// The analyzer's JSON answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAnalysis {
    #[serde(default)]
    pub complexity: Complexity,
    /// Minutes.
    #[serde(default)]
    pub estimated_total_time: u32,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub suggested_subtasks: Vec<Subtask>,
}

/// An "analyze task" request as received from the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `YYYY-MM-DD`; empty means none.
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub user_requirements: Option<String>,
    #[serde(default)]
    pub difficulty: DifficultyLevel,
    #[serde(default)]
    pub user_schedule: Option<UserSchedule>,
}

impl AnalysisRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn deadline(&self) -> Option<&str> {
        self.deadline.as_deref().map(str::trim).filter(|d| !d.is_empty())
    }
}

/// Produces raw analyzer text (expected to contain a [`TaskAnalysis`] JSON
/// object) for a request.
pub trait TaskAnalyzer {
    fn analyze(&self, request: &AnalysisRequest) -> anyhow::Result<String>;
}

/// Source of subtask ids, injected so callers control "now".
pub trait IdGenerator {
    fn generate(&mut self, prefix: &str, index: usize) -> String;
}

/// `"{prefix}-{stamp}-{index}"`, with the stamp fixed at construction
/// (typically epoch milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StampedIds {
    stamp: i64,
}

impl StampedIds {
    pub fn new(stamp: i64) -> Self {
        Self { stamp }
    }
}

impl IdGenerator for StampedIds {
    fn generate(&mut self, prefix: &str, index: usize) -> String {
        format!("{prefix}-{}-{index}", self.stamp)
    }
}

/// Give every subtask a fresh id (analyzer ids are not trusted to be unique).
pub fn reassign_ids(subtasks: &mut [Subtask], prefix: &str, ids: &mut dyn IdGenerator) {
    for (i, s) in subtasks.iter_mut().enumerate() {
        s.id = ids.generate(prefix, i);
    }
}

/// Extract and parse the analysis JSON from analyzer output.
///
/// Accepts bare JSON, a fenced block (```` ```json ```` preferred), and JSON
/// surrounded by prose. Markdown headings and bold fragments are stripped
/// only if the first parse fails, since they can legitimately occur inside
/// JSON strings.
pub fn parse_analysis_response(raw: &str) -> Result<TaskAnalysis, AnalysisError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }

    let body = strip_code_fence(text);
    let json = brace_slice(body).ok_or(AnalysisError::MissingJson)?;
    match serde_json::from_str(json) {
        Ok(analysis) => Ok(analysis),
        Err(first) => {
            let cleaned = strip_markdown(body)?;
            let Some(json) = brace_slice(&cleaned) else {
                return Err(first.into());
            };
            serde_json::from_str(json).map_err(|_| AnalysisError::InvalidJson(first))
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let body_start = if let Some(i) = text.find("```json") {
        i + "```json".len()
    } else if let Some(i) = text.find("```") {
        i + "```".len()
    } else {
        return text;
    };

    let rest = &text[body_start..];
    match rest.find("```") {
        Some(end) => rest[..end].trim(),
        // Unterminated fence: take everything after the opener.
        None => rest.trim(),
    }
}

fn brace_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn strip_markdown(text: &str) -> Result<String, AnalysisError> {
    let heading_re = Regex::new(r"(?m)^[ \t]*#{1,6}[ \t].*$")?;
    let bold_re = Regex::new(r"\*\*[^*\n]*\*\*")?;

    let out = heading_re.replace_all(text, "");
    Ok(bold_re.replace_all(&out, "").into_owned())
}

/// Default four-step plan used when analysis is unavailable.
pub fn fallback_analysis(title: &str, today: NaiveDate, ids: &mut dyn IdGenerator) -> TaskAnalysis {
    let date = format_date(today);
    let steps = [
        ("planning", 30, Priority::High, "09:00"),
        ("research and gathering material", 45, Priority::High, "10:00"),
        ("execution", 60, Priority::Medium, "14:00"),
        ("review and wrap-up", 15, Priority::Medium, "16:00"),
    ];

    let suggested_subtasks: Vec<Subtask> = steps
        .into_iter()
        .enumerate()
        .map(|(i, (label, minutes, priority, time))| {
            Subtask::new(ids.generate("fallback-subtask", i + 1), format!("{title} - {label}"))
                .with_duration(minutes)
                .with_priority(priority)
                .with_order(i as i32 + 1)
                .with_suggested(date.clone(), time)
        })
        .collect();

    TaskAnalysis {
        complexity: Complexity::Moderate,
        estimated_total_time: suggested_subtasks.iter().map(|s| s.estimated_duration).sum(),
        priority: Priority::Medium,
        suggested_subtasks,
    }
}

/// How far scheduling got for an analyzed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulingStatus {
    /// Every subtask has a concrete slot.
    Scheduled,
    /// Ran, but some subtasks kept their suggested date/time.
    Degraded,
    /// Input could not be interpreted; suggested dates/times kept as-is.
    Skipped,
}

/// Result of the full analyze-then-schedule flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedTask {
    pub analysis: TaskAnalysis,
    pub used_fallback: bool,
    pub status: SchedulingStatus,
    pub placements: Vec<Placement>,
    pub assumptions: Vec<String>,
    pub missing_info: Vec<String>,
}

/// Analyze `request` and schedule the resulting subtasks from `today`.
///
/// Never fails: analyzer problems fall back to the default plan and
/// scheduling problems keep the suggested dates and times, each with a note.
pub fn analyze_task(
    analyzer: &dyn TaskAnalyzer,
    request: &AnalysisRequest,
    today: NaiveDate,
    ids: &mut dyn IdGenerator,
) -> AnalyzedTask {
    let mut assumptions = Vec::new();
    let mut missing_info = Vec::new();

    let parsed = analyzer
        .analyze(request)
        .and_then(|raw| parse_analysis_response(&raw).map_err(anyhow::Error::from));

    let (mut analysis, used_fallback) = match parsed {
        Ok(mut analysis) if !analysis.suggested_subtasks.is_empty() => {
            reassign_ids(&mut analysis.suggested_subtasks, "ai-subtask", ids);
            if analysis.estimated_total_time == 0 {
                analysis.estimated_total_time = analysis
                    .suggested_subtasks
                    .iter()
                    .map(|s| s.estimated_duration)
                    .sum();
            }
            (analysis, false)
        }
        Ok(_) => {
            warn!(title = %request.title, "analyzer returned no subtasks");
            assumptions.push("Analysis returned no subtasks; used a default four-step plan".to_string());
            (fallback_analysis(&request.title, today, ids), true)
        }
        Err(err) => {
            warn!(title = %request.title, error = ?err, "task analysis failed");
            assumptions.push("Automatic analysis was unavailable; used a default four-step plan".to_string());
            (fallback_analysis(&request.title, today, ids), true)
        }
    };

    if request.deadline().is_none() {
        missing_info.push("No deadline provided; work was placed as early as possible".to_string());
    }

    let start = format_date(today);
    let result = schedule_or_keep(
        &analysis.suggested_subtasks,
        &start,
        request.deadline(),
        request.user_schedule.as_ref(),
    );

    let (status, placements) = match result {
        SchedulingResult::Scheduled(outcome) => {
            let status = if outcome.is_degraded() {
                SchedulingStatus::Degraded
            } else {
                SchedulingStatus::Scheduled
            };
            assumptions.extend(outcome.assumptions);
            missing_info.extend(outcome.missing_info);
            analysis.suggested_subtasks = outcome.subtasks;
            (status, outcome.placements)
        }
        SchedulingResult::Skipped { subtasks, reason } => {
            assumptions.push(format!("Scheduling skipped ({reason}); kept suggested dates and times"));
            analysis.suggested_subtasks = subtasks;
            (SchedulingStatus::Skipped, Vec::new())
        }
    };

    info!(
        title = %request.title,
        subtasks = analysis.suggested_subtasks.len(),
        used_fallback,
        ?status,
        "task analyzed"
    );

    AnalyzedTask {
        analysis,
        used_fallback,
        status,
        placements,
        assumptions,
        missing_info,
    }
}
