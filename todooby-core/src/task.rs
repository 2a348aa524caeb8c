//! Subtask model shared by the analysis flow and the scheduler.

use serde::{Deserialize, Serialize};

/// No placement is shorter than this, whatever the estimate says.
pub const MIN_PLACEMENT_MINUTES: u32 = 5;

/// Informational priority; placement order comes from [`Subtask::order`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// One step of a decomposed task.
///
/// `date` / `time` arrive as advisory values from the generator and are
/// overwritten by the scheduler when it finds a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    #[serde(default)]
    pub id: String,
    pub text: String,

    /// Minutes.
    #[serde(default)]
    pub estimated_duration: u32,

    #[serde(default)]
    pub priority: Priority,

    /// Queue position among siblings of the same parent task.
    #[serde(default)]
    pub order: i32,

    /// `HH:MM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    /// `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl Subtask {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            estimated_duration: 30,
            priority: Priority::Medium,
            order: 0,
            time: None,
            date: None,
        }
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.estimated_duration = minutes;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_suggested(mut self, date: impl Into<String>, time: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self.time = Some(time.into());
        self
    }

    /// Minutes this subtask occupies once placed.
    pub fn need_minutes(&self) -> u32 {
        self.estimated_duration.max(MIN_PLACEMENT_MINUTES)
    }
}
