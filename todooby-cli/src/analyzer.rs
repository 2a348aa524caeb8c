//! Analyzer backends for the `analyze` command.
//!
//! The core only sees [`TaskAnalyzer`]; these supply the raw text either from
//! a saved response file or by shelling out to an LLM CLI.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use std::path::PathBuf;
use todooby_core::time::{format_date, parse_date};
use todooby_core::{AnalysisRequest, DifficultyLevel, TaskAnalyzer};
use tracing::debug;

use crate::state::read_text;

/// Reads a previously captured LLM response.
pub struct FileAnalyzer {
    pub path: PathBuf,
}

impl TaskAnalyzer for FileAnalyzer {
    fn analyze(&self, _request: &AnalysisRequest) -> Result<String> {
        read_text(&self.path)
    }
}

/// Runs `command [args..] <prompt>` and takes stdout as the response.
pub struct CommandAnalyzer {
    pub command: String,
    pub args: Vec<String>,
    pub today: NaiveDate,
}

impl TaskAnalyzer for CommandAnalyzer {
    fn analyze(&self, request: &AnalysisRequest) -> Result<String> {
        let prompt = build_prompt(request, self.today);
        debug!(command = %self.command, prompt_len = prompt.len(), "running analyzer command");

        let output = std::process::Command::new(&self.command)
            .args(&self.args)
            .arg(&prompt)
            .stdin(std::process::Stdio::null())
            .output()
            .with_context(|| format!("spawning {}", self.command))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with {}. stderr: {}", self.command, output.status, stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// No analyzer configured: always fails so the default plan is used.
pub struct Unavailable;

impl TaskAnalyzer for Unavailable {
    fn analyze(&self, _request: &AnalysisRequest) -> Result<String> {
        bail!("no analyzer configured (pass --response or set analysis.command)")
    }
}

fn difficulty_guide(level: DifficultyLevel) -> &'static str {
    match level {
        DifficultyLevel::Easy => {
            "Relaxed: group the work into a few large chunks, leave generous buffer days, no pressure."
        }
        DifficultyLevel::Normal => {
            "Balanced: moderately sized subtasks at a steady pace up to the deadline."
        }
        DifficultyLevel::Hard => {
            "Intensive: split into small, precise subtasks on a tight, focused schedule."
        }
    }
}

/// Prompt asking for a `TaskAnalysis` JSON object.
pub fn build_prompt(request: &AnalysisRequest, today: NaiveDate) -> String {
    let mut p = String::new();
    p.push_str("You are an experienced project manager. Break the following task into concrete, executable subtasks.\n\n");
    p.push_str(&format!("Task: {}\n", request.title));

    if let Some(desc) = request.description.as_deref().filter(|d| !d.trim().is_empty()) {
        p.push_str(&format!("Description: {desc}\n"));
    }

    if let Some(deadline) = request.deadline() {
        p.push_str(&format!("Deadline: {deadline}"));
        if let Ok(dl) = parse_date(deadline) {
            let days = (dl - today).num_days();
            match days {
                d if d > 0 => p.push_str(&format!(" ({d} days from today)")),
                0 => p.push_str(" (due today)"),
                d => p.push_str(&format!(" ({} days overdue)", -d)),
            }
        }
        p.push('\n');
    }

    if let Some(req) = request.user_requirements.as_deref().filter(|r| !r.trim().is_empty()) {
        p.push_str(&format!("\nUser requirements: {req}\n"));
    }

    p.push_str(&format!(
        "\nDifficulty ({}): {}\n",
        request.difficulty,
        difficulty_guide(request.difficulty)
    ));
    p.push_str(&format!("\nToday: {}\n", format_date(today)));

    p.push_str(
        r#"
Respond with JSON only, no commentary, in exactly this shape:
{
  "complexity": "simple|moderate|complex",
  "estimatedTotalTime": 180,
  "priority": "high|medium|low",
  "suggestedSubtasks": [
    {
      "id": "subtask-1",
      "text": "concrete piece of work",
      "estimatedDuration": 30,
      "priority": "high",
      "order": 1,
      "time": "09:00",
      "date": "YYYY-MM-DD"
    }
  ]
}

Rules:
- 3 to 7 subtasks, each concrete and actionable
- size the work to the difficulty setting and honour the user requirements
- with a deadline, spread subtasks evenly from today through the deadline day
"#,
    );
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        parse_date("2025-03-03").unwrap()
    }

    #[test]
    fn prompt_mentions_remaining_days_and_difficulty() {
        let mut req = AnalysisRequest::new("Write thesis chapter");
        req.deadline = Some("2025-03-08".into());
        req.difficulty = DifficultyLevel::Hard;
        req.user_requirements = Some("mornings only".into());

        let p = build_prompt(&req, today());
        assert!(p.contains("Task: Write thesis chapter"));
        assert!(p.contains("Deadline: 2025-03-08 (5 days from today)"));
        assert!(p.contains("User requirements: mornings only"));
        assert!(p.contains("Difficulty (hard): Intensive"));
        assert!(p.contains("Today: 2025-03-03"));
        assert!(!p.contains("Description:"));
    }

    #[test]
    fn prompt_handles_due_and_overdue() {
        let mut req = AnalysisRequest::new("x");
        req.deadline = Some("2025-03-03".into());
        assert!(build_prompt(&req, today()).contains("(due today)"));

        req.deadline = Some("2025-03-01".into());
        assert!(build_prompt(&req, today()).contains("(2 days overdue)"));

        req.deadline = Some("  ".into());
        assert!(!build_prompt(&req, today()).contains("Deadline:"));
    }

    #[test]
    fn unavailable_always_errors() {
        assert!(Unavailable.analyze(&AnalysisRequest::new("x")).is_err());
    }
}
