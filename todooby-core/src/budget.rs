//! Deadline-aware day budget: spread the remaining work evenly over the
//! candidate days left before the deadline.

use chrono::NaiveDate;

use crate::time::is_weekend;

/// Candidate days in `from..=to`, skipping weekends when asked.
pub fn candidate_days_between(from: NaiveDate, to: NaiveDate, avoid_weekends: bool) -> u32 {
    let mut count = 0;
    let mut day = from;
    while day <= to {
        if !(avoid_weekends && is_weekend(day)) {
            count += 1;
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    count
}

/// Minutes to aim for on `today`.
///
/// Without a deadline the whole remainder is today's target, so each day
/// simply fills up. Past the deadline the remainder also lands on one day.
pub fn target_minutes_today(
    remaining_total: u32,
    today: NaiveDate,
    deadline: Option<NaiveDate>,
    avoid_weekends: bool,
    max_daily_minutes: Option<u32>,
) -> u32 {
    let days = deadline
        .map(|dl| candidate_days_between(today, dl, avoid_weekends))
        .unwrap_or(1)
        .max(1);
    let target = remaining_total.div_ceil(days);
    match max_daily_minutes {
        Some(cap) => target.min(cap),
        None => target,
    }
}
