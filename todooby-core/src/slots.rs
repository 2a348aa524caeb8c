//! Day slot builder: working hours minus lunch and that date's busy time.

use chrono::NaiveDate;

use crate::config::ScheduleConfig;
use crate::interval::{Interval, subtract_busy_from_working};

/// Free slots on `date`, sorted by start.
pub fn build_day_slots(date: NaiveDate, config: &ScheduleConfig) -> Vec<Interval> {
    let mut busy: Vec<Interval> = config.lunch_break.into_iter().collect();
    busy.extend_from_slice(config.busy_on(date));
    subtract_busy_from_working(&[config.working_hours], &busy)
}

/// Width of the largest slot a date with no extra busy time would have.
///
/// Date-specific busy time only removes minutes, so nothing longer than this
/// can ever be placed.
pub fn widest_possible_slot(config: &ScheduleConfig) -> u32 {
    let busy: Vec<Interval> = config.lunch_break.into_iter().collect();
    subtract_busy_from_working(&[config.working_hours], &busy)
        .iter()
        .map(Interval::width)
        .max()
        .unwrap_or(0)
}
