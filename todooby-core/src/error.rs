//! Error types for the scheduling core.
//!
//! Capacity problems ("no room today") are never errors; they are reported as
//! assumption strings on the outcome. These types cover input the core cannot
//! interpret at all.

use thiserror::Error;

/// Malformed scheduling input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// A time-of-day that is not `HH:MM` within `00:00..=24:00`.
    #[error("invalid time of day '{value}' (expected HH:MM)")]
    InvalidTime { value: String },

    /// A calendar date that is not `YYYY-MM-DD`.
    #[error("invalid date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { value: String },

    /// Unknown IANA timezone name.
    #[error("invalid timezone '{value}'")]
    InvalidTimezone { value: String },

    /// Working hours whose end does not come after their start.
    #[error("working hours must end after they start ({start}-{end})")]
    InvalidRange { start: String, end: String },
}

/// Failure to turn raw LLM output into a [`crate::analysis::TaskAnalysis`].
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("analyzer returned an empty response")]
    EmptyResponse,

    #[error("no JSON object found in analyzer response")]
    MissingJson,

    #[error("analyzer response is not valid analysis JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("cleanup pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),
}
