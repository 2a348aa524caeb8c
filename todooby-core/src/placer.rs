//! Daily placer: greedy first-fit of the queue head into one day's free slots.
//!
//! Rules:
//! - subtasks are taken strictly in queue order; the first one that does not
//!   fit ends the day (later, smaller ones are not pulled forward)
//! - a subtask never spans two slots
//! - the daily cap stops *adding* subtasks; the first subtask of a day is
//!   placed even if it alone exceeds the cap
//! - start times never go backwards within a day: once a slot is used,
//!   earlier slots are left alone

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::interval::Interval;
use crate::task::Subtask;
use crate::time::format_hhmm;

/// A subtask pinned to a concrete date and time span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub subtask_id: String,
    pub date: NaiveDate,
    /// Minutes since midnight.
    pub start: u32,
    pub end: u32,
}

impl Placement {
    pub fn minutes(&self) -> u32 {
        self.end - self.start
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    pub fn start_time(&self) -> String {
        format_hhmm(self.start)
    }
}

/// What one day absorbed.
///
/// `scheduled[k]` always belongs to `queue[k]`: placement stops at the first
/// misfit, so the placed subtasks are a prefix of the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayPlacement {
    pub scheduled: Vec<Placement>,
    pub used_minutes: u32,
}

pub fn place_on_date(
    date: NaiveDate,
    free_slots: &[Interval],
    queue: &[Subtask],
    daily_cap_minutes: u32,
) -> DayPlacement {
    let mut slots = free_slots.to_vec();
    let mut cursor = 0usize;
    let mut day = DayPlacement::default();

    for subtask in queue {
        let need = subtask.need_minutes();

        if day.used_minutes > 0 && day.used_minutes + need > daily_cap_minutes {
            break;
        }

        let Some(offset) = slots[cursor..].iter().position(|s| s.width() >= need) else {
            break;
        };
        let idx = cursor + offset;
        let start = slots[idx].start;
        slots[idx].start += need;
        cursor = idx;

        debug!(
            %date,
            subtask = %subtask.id,
            start = %format_hhmm(start),
            minutes = need,
            "placed subtask"
        );

        day.used_minutes += need;
        day.scheduled.push(Placement {
            subtask_id: subtask.id.clone(),
            date,
            start,
            end: start + need,
        });
    }

    day
}
