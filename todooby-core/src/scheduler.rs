//! Scheduling driver: walks forward day by day, budgets each day against the
//! deadline, and lets the placer fill it until the queue is empty.
//!
//! The queue is the order-sorted copy of the caller's subtasks and is never
//! mutated; a cursor marks how much of it has been placed.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::budget::target_minutes_today;
use crate::config::{ScheduleConfig, UserSchedule};
use crate::error::ScheduleError;
use crate::placer::{Placement, place_on_date};
use crate::slots::{build_day_slots, widest_possible_slot};
use crate::task::Subtask;
use crate::time::{format_date, format_hhmm, is_weekend, parse_date};

/// Hard bound on simulated calendar days per run.
pub const MAX_SCHEDULE_DAYS: u32 = 60;

/// Slack before a day over `maxDailyMinutes` is reported.
pub const OVER_CAP_TOLERANCE_MINUTES: u32 = 5;

/// Start time given to an unplaced subtask that had no suggestion.
pub const FALLBACK_TIME: &str = "09:00";

/// Scheduler output: every input subtask exactly once, in `order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOutcome {
    pub subtasks: Vec<Subtask>,
    /// Concrete placements, one per scheduled subtask.
    pub placements: Vec<Placement>,
    /// Ids of subtasks that kept their suggested (or default) date/time.
    pub unplaced: Vec<String>,
    pub assumptions: Vec<String>,
    pub missing_info: Vec<String>,
}

impl ScheduleOutcome {
    /// Some subtasks could not be given a slot.
    pub fn is_degraded(&self) -> bool {
        !self.unplaced.is_empty()
    }
}

/// Scheduling either ran (possibly degraded) or was skipped because the
/// input could not be interpreted, in which case the subtasks come back
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingResult {
    Scheduled(ScheduleOutcome),
    Skipped {
        subtasks: Vec<Subtask>,
        reason: ScheduleError,
    },
}

impl SchedulingResult {
    pub fn subtasks(&self) -> &[Subtask] {
        match self {
            SchedulingResult::Scheduled(outcome) => &outcome.subtasks,
            SchedulingResult::Skipped { subtasks, .. } => subtasks,
        }
    }
}

/// One configured scheduling run.
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: ScheduleConfig,
    start_date: NaiveDate,
    deadline: Option<NaiveDate>,
}

impl Scheduler {
    pub fn new(config: ScheduleConfig, start_date: NaiveDate, deadline: Option<NaiveDate>) -> Self {
        Self {
            config,
            start_date,
            deadline,
        }
    }

    /// Place `subtasks`; `assumptions` seeds the outcome's notes.
    ///
    /// A subtask longer than any slot an empty day can offer is set aside
    /// before the day loop, so the subtasks after it are still placed.
    pub fn run(&self, subtasks: &[Subtask], mut assumptions: Vec<String>) -> ScheduleOutcome {
        let mut ordered = subtasks.to_vec();
        ordered.sort_by_key(|s| s.order);

        // Anything wider than an empty day's widest slot can never be placed
        // and would otherwise hold up the queue until the day bound.
        let widest = widest_possible_slot(&self.config);
        let mut queue: Vec<Subtask> = Vec::with_capacity(ordered.len());
        let mut queue_index: Vec<usize> = Vec::with_capacity(ordered.len());
        for (i, s) in ordered.iter().enumerate() {
            if s.need_minutes() <= widest {
                queue.push(s.clone());
                queue_index.push(i);
            } else {
                warn!(subtask = %s.id, need = s.need_minutes(), widest, "subtask cannot fit any slot");
                assumptions.push(format!(
                    "\"{}\" needs {} min but the longest free block in a day is {} min; kept its suggested date/time",
                    s.text,
                    s.need_minutes(),
                    widest
                ));
            }
        }

        let mut placed: Vec<Option<Placement>> = vec![None; ordered.len()];
        let mut cursor = 0usize;
        let mut overrun_noted = false;

        for offset in 0..MAX_SCHEDULE_DAYS {
            if cursor >= queue.len() {
                break;
            }
            let Some(date) = self.start_date.checked_add_days(Days::new(offset.into())) else {
                break;
            };
            if self.config.avoid_weekends && is_weekend(date) {
                continue;
            }

            if let Some(deadline) = self.deadline {
                if date > deadline && !overrun_noted {
                    overrun_noted = true;
                    warn!(%date, %deadline, "scheduling past deadline");
                    assumptions.push(format!(
                        "Not everything fits before the deadline ({}); some subtasks are scheduled after it",
                        format_date(deadline)
                    ));
                }
            }

            let pending = &queue[cursor..];
            let remaining_total: u32 = pending.iter().map(Subtask::need_minutes).sum();
            let target = target_minutes_today(
                remaining_total,
                date,
                self.deadline,
                self.config.avoid_weekends,
                self.config.max_daily_minutes,
            );

            let free = build_day_slots(date, &self.config);
            let day = place_on_date(date, &free, pending, target);
            if day.scheduled.is_empty() {
                debug!(%date, "no room today");
                continue;
            }

            debug!(%date, target, used = day.used_minutes, count = day.scheduled.len(), "day filled");
            let count = day.scheduled.len();
            for (k, placement) in day.scheduled.into_iter().enumerate() {
                placed[queue_index[cursor + k]] = Some(placement);
            }
            cursor += count;
        }

        if cursor < queue.len() {
            let left = queue.len() - cursor;
            warn!(left, days = MAX_SCHEDULE_DAYS, "queue not drained");
            assumptions.push(format!(
                "{left} subtask(s) found no free slot within {MAX_SCHEDULE_DAYS} days; kept their suggested date/time"
            ));
        }

        self.assemble(ordered, placed, assumptions)
    }

    fn assemble(
        &self,
        ordered: Vec<Subtask>,
        placed: Vec<Option<Placement>>,
        mut assumptions: Vec<String>,
    ) -> ScheduleOutcome {
        let mut subtasks = Vec::with_capacity(ordered.len());
        let mut placements = Vec::new();
        let mut unplaced = Vec::new();

        for (mut subtask, placement) in ordered.into_iter().zip(placed) {
            match placement {
                Some(p) => {
                    subtask.date = Some(format_date(p.date));
                    subtask.time = Some(format_hhmm(p.start));
                    placements.push(p);
                }
                None => {
                    subtask.time = subtask
                        .time
                        .filter(|t| !t.trim().is_empty())
                        .or_else(|| Some(FALLBACK_TIME.to_string()));
                    subtask.date = subtask
                        .date
                        .filter(|d| !d.trim().is_empty())
                        .or_else(|| Some(format_date(self.start_date)));
                    unplaced.push(subtask.id.clone());
                }
            }
            subtasks.push(subtask);
        }

        if let Some(cap) = self.config.max_daily_minutes {
            let mut per_day: BTreeMap<NaiveDate, u32> = BTreeMap::new();
            for p in &placements {
                *per_day.entry(p.date).or_default() += p.minutes();
            }
            for (date, total) in per_day {
                if total.saturating_sub(cap) > OVER_CAP_TOLERANCE_MINUTES {
                    warn!(%date, total, cap, "daily cap exceeded");
                    assumptions.push(format!(
                        "{} has {total} min scheduled, over the {cap} min daily limit",
                        format_date(date)
                    ));
                }
            }
        }

        info!(
            placed = placements.len(),
            unplaced = unplaced.len(),
            "scheduling finished"
        );

        ScheduleOutcome {
            subtasks,
            placements,
            unplaced,
            assumptions,
            missing_info: Vec::new(),
        }
    }
}

/// Parse the boundary strings, resolve the user schedule, and run.
///
/// An empty `deadline` means none.
pub fn schedule_subtasks(
    subtasks: &[Subtask],
    start_date: &str,
    deadline: Option<&str>,
    user_schedule: Option<&UserSchedule>,
) -> Result<ScheduleOutcome, ScheduleError> {
    let mut assumptions = Vec::new();
    let config = ScheduleConfig::from_user(user_schedule, &mut assumptions)?;
    let start = parse_date(start_date)?;
    let deadline = match deadline.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => Some(parse_date(d)?),
        None => None,
    };

    Ok(Scheduler::new(config, start, deadline).run(subtasks, assumptions))
}

/// Like [`schedule_subtasks`], but malformed input yields
/// [`SchedulingResult::Skipped`] with the subtasks untouched.
pub fn schedule_or_keep(
    subtasks: &[Subtask],
    start_date: &str,
    deadline: Option<&str>,
    user_schedule: Option<&UserSchedule>,
) -> SchedulingResult {
    match schedule_subtasks(subtasks, start_date, deadline, user_schedule) {
        Ok(outcome) => SchedulingResult::Scheduled(outcome),
        Err(reason) => {
            warn!(%reason, "scheduling skipped");
            SchedulingResult::Skipped {
                subtasks: subtasks.to_vec(),
                reason,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeRange;
    use crate::interval::Interval;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn task(id: &str, minutes: u32, order: i32) -> Subtask {
        Subtask::new(id, format!("step {id}"))
            .with_duration(minutes)
            .with_order(order)
    }

    fn run(config: ScheduleConfig, start: &str, deadline: Option<&str>, tasks: &[Subtask]) -> ScheduleOutcome {
        Scheduler::new(config, d(start), deadline.map(d)).run(tasks, Vec::new())
    }

    #[test]
    fn one_hour_task_starts_at_nine_on_start_date() {
        let out = run(ScheduleConfig::default(), "2025-01-01", None, &[task("a", 60, 1)]);
        assert_eq!(out.subtasks[0].date.as_deref(), Some("2025-01-01"));
        assert_eq!(out.subtasks[0].time.as_deref(), Some("09:00"));
        assert!(!out.is_degraded());
        assert!(out.assumptions.is_empty());
    }

    #[test]
    fn four_hour_tasks_take_the_afternoon_then_defer() {
        let tasks = [task("a", 240, 1), task("b", 240, 2), task("c", 240, 3)];
        let out = run(ScheduleConfig::default(), "2025-01-01", None, &tasks);

        let when: Vec<_> = out
            .subtasks
            .iter()
            .map(|s| (s.date.clone().unwrap(), s.time.clone().unwrap()))
            .collect();
        assert_eq!(when[0], ("2025-01-01".to_string(), "13:00".to_string()));
        assert_eq!(when[1], ("2025-01-02".to_string(), "13:00".to_string()));
        assert_eq!(when[2], ("2025-01-03".to_string(), "13:00".to_string()));
    }

    #[test]
    fn queue_is_sorted_by_order_not_input_position() {
        let tasks = [task("late", 30, 2), task("early", 30, 1)];
        let out = run(ScheduleConfig::default(), "2025-01-01", None, &tasks);
        assert_eq!(out.subtasks[0].id, "early");
        assert_eq!(out.subtasks[0].time.as_deref(), Some("09:00"));
        assert_eq!(out.subtasks[1].time.as_deref(), Some("09:30"));
    }

    #[test]
    fn oversized_tasks_go_one_per_day_and_warn_about_cap() {
        let config = ScheduleConfig {
            working_hours: Interval::new(8 * 60, 20 * 60),
            lunch_break: None,
            max_daily_minutes: Some(500),
            ..Default::default()
        };
        let tasks: Vec<_> = (1..=5).map(|i| task(&format!("t{i}"), 600, i)).collect();
        let out = run(config, "2025-01-01", None, &tasks);

        let dates: Vec<_> = out.subtasks.iter().map(|s| s.date.clone().unwrap()).collect();
        assert_eq!(
            dates,
            vec!["2025-01-01", "2025-01-02", "2025-01-03", "2025-01-04", "2025-01-05"]
        );
        assert!(out.subtasks.iter().all(|s| s.time.as_deref() == Some("08:00")));
        let cap_notes = out
            .assumptions
            .iter()
            .filter(|a| a.contains("over the 500 min daily limit"))
            .count();
        assert_eq!(cap_notes, 5);
    }

    fn cap_config(cap: u32) -> ScheduleConfig {
        ScheduleConfig {
            max_daily_minutes: Some(cap),
            ..Default::default()
        }
    }

    fn cap_notes(out: &ScheduleOutcome) -> usize {
        out.assumptions
            .iter()
            .filter(|a| a.contains("daily limit"))
            .count()
    }

    #[test]
    fn over_cap_note_allows_five_minutes_of_slack() {
        let within = run(cap_config(60), "2025-01-01", None, &[task("a", 65, 1)]);
        assert_eq!(within.placements[0].minutes(), 65);
        assert_eq!(cap_notes(&within), 0);

        let over = run(cap_config(60), "2025-01-01", None, &[task("a", 66, 1)]);
        assert_eq!(over.placements[0].minutes(), 66);
        assert_eq!(cap_notes(&over), 1);
        assert!(over.assumptions[0].contains("66 min scheduled, over the 60 min daily limit"));
    }

    #[test]
    fn huge_daily_cap_is_never_reported() {
        let user = UserSchedule {
            max_daily_minutes: Some(u32::MAX),
            working_hours: Some(TimeRange::new("09:00", "18:00")),
            lunch_break: Some(None),
            ..Default::default()
        };
        let out = schedule_subtasks(&[task("a", 60, 1)], "2025-01-01", None, Some(&user)).unwrap();
        assert_eq!(out.subtasks[0].time.as_deref(), Some("09:00"));
        assert_eq!(cap_notes(&out), 0);
        assert!(out.assumptions.is_empty());
    }

    #[test]
    fn task_longer_than_any_slot_keeps_suggestion_without_blocking_others() {
        let tasks = [
            task("huge", 600, 1).with_suggested("2025-02-01", "10:00"),
            task("small", 30, 2),
        ];
        let out = run(ScheduleConfig::default(), "2025-01-01", None, &tasks);

        assert_eq!(out.unplaced, vec!["huge".to_string()]);
        assert_eq!(out.subtasks[0].date.as_deref(), Some("2025-02-01"));
        assert_eq!(out.subtasks[0].time.as_deref(), Some("10:00"));
        assert_eq!(out.subtasks[1].date.as_deref(), Some("2025-01-01"));
        assert!(out.assumptions[0].contains("longest free block"));
        assert!(out.is_degraded());
    }

    #[test]
    fn weekends_are_skipped_and_budget_uses_three_days() {
        let config = ScheduleConfig {
            avoid_weekends: true,
            ..Default::default()
        };
        // Friday 2025-01-03 through Tuesday 2025-01-07.
        let tasks: Vec<_> = (1..=3).map(|i| task(&format!("t{i}"), 120, i)).collect();
        let out = run(config, "2025-01-03", Some("2025-01-07"), &tasks);

        let dates: Vec<_> = out.subtasks.iter().map(|s| s.date.clone().unwrap()).collect();
        assert_eq!(dates, vec!["2025-01-03", "2025-01-06", "2025-01-07"]);
    }

    #[test]
    fn deadline_spreads_equal_tasks_over_every_day() {
        let tasks: Vec<_> = (1..=6).map(|i| task(&format!("t{i}"), 60, i)).collect();
        let out = run(ScheduleConfig::default(), "2025-01-01", Some("2025-01-03"), &tasks);

        let mut per_day: BTreeMap<String, usize> = BTreeMap::new();
        for s in &out.subtasks {
            *per_day.entry(s.date.clone().unwrap()).or_default() += 1;
        }
        assert_eq!(per_day.len(), 3);
        assert!(per_day.values().all(|n| *n == 2));
        assert!(out.assumptions.is_empty());
    }

    #[test]
    fn running_past_deadline_is_noted_once() {
        let tasks: Vec<_> = (1..=3).map(|i| task(&format!("t{i}"), 300, i)).collect();
        let out = run(ScheduleConfig::default(), "2025-01-01", Some("2025-01-01"), &tasks);

        assert_eq!(out.unplaced.len(), 0);
        let notes: Vec<_> = out
            .assumptions
            .iter()
            .filter(|a| a.contains("deadline (2025-01-01)"))
            .collect();
        assert_eq!(notes.len(), 1);
        assert_eq!(out.subtasks[2].date.as_deref(), Some("2025-01-03"));
    }

    #[test]
    fn fully_booked_days_are_passed_over() {
        let mut config = ScheduleConfig::default();
        config.busy_by_date.insert(d("2025-01-01"), vec![Interval::new(0, 1440)]);
        let out = run(config, "2025-01-01", None, &[task("a", 30, 1)]);
        assert_eq!(out.subtasks[0].date.as_deref(), Some("2025-01-02"));
    }

    #[test]
    fn busy_every_day_stops_at_day_bound() {
        let mut config = ScheduleConfig::default();
        let start = d("2025-01-01");
        for offset in 0..u64::from(MAX_SCHEDULE_DAYS) {
            let day = start.checked_add_days(Days::new(offset)).unwrap();
            config.busy_by_date.insert(day, vec![Interval::new(0, 1440)]);
        }
        let out = run(config, "2025-01-01", None, &[task("a", 30, 1)]);

        assert_eq!(out.unplaced, vec!["a".to_string()]);
        assert_eq!(out.subtasks[0].time.as_deref(), Some(FALLBACK_TIME));
        assert!(out.assumptions.iter().any(|a| a.contains("within 60 days")));
    }

    #[test]
    fn no_working_time_keeps_suggestions() {
        let config = ScheduleConfig {
            working_hours: Interval::new(540, 600),
            lunch_break: Some(Interval::new(540, 600)),
            ..Default::default()
        };
        let tasks = [task("a", 30, 1), task("b", 30, 2).with_suggested("2025-03-03", "15:00")];
        let out = run(config, "2025-01-01", None, &tasks);

        assert_eq!(out.unplaced.len(), 2);
        assert_eq!(out.subtasks[0].date.as_deref(), Some("2025-01-01"));
        assert_eq!(out.subtasks[0].time.as_deref(), Some(FALLBACK_TIME));
        assert_eq!(out.subtasks[1].time.as_deref(), Some("15:00"));
    }

    #[test]
    fn caller_slice_is_not_reordered() {
        let tasks = vec![task("b", 30, 2), task("a", 30, 1)];
        let _ = run(ScheduleConfig::default(), "2025-01-01", None, &tasks);
        assert_eq!(tasks[0].id, "b");
        assert!(tasks[0].date.is_none());
    }

    #[test]
    fn string_entry_point_parses_and_treats_empty_deadline_as_none() {
        let user = UserSchedule {
            working_hours: Some(TimeRange::new("10:00", "16:00")),
            lunch_break: Some(None),
            ..Default::default()
        };
        let out = schedule_subtasks(&[task("a", 30, 1)], "2025-01-01", Some(" "), Some(&user)).unwrap();
        assert_eq!(out.subtasks[0].time.as_deref(), Some("10:00"));
        assert!(out.assumptions.is_empty());
    }

    #[test]
    fn malformed_input_is_skipped_not_fatal() {
        let tasks = [task("a", 30, 1).with_suggested("2025-01-09", "11:00")];
        match schedule_or_keep(&tasks, "01/01/2025", None, None) {
            SchedulingResult::Skipped { subtasks, reason } => {
                assert_eq!(subtasks, tasks.to_vec());
                assert!(matches!(reason, ScheduleError::InvalidDate { .. }));
            }
            other => panic!("expected skip, got {other:?}"),
        }

        let ok = schedule_or_keep(&tasks, "2025-01-01", None, None);
        assert!(matches!(ok, SchedulingResult::Scheduled(_)));
        assert_eq!(ok.subtasks()[0].time.as_deref(), Some("09:00"));
    }
}
