//! Time utilities: `HH:MM` / `YYYY-MM-DD` boundaries and timezone-aware "today".
//!
//! All interval math in the core runs on minutes since midnight; strings are
//! only parsed and formatted here.

use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::ScheduleError;

/// Minutes in a day; `24:00` is accepted as an end-of-day boundary.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Parse `"HH:MM"` (or `"H:MM"`) into minutes since midnight.
pub fn parse_hhmm(value: &str) -> Result<u32, ScheduleError> {
    let invalid = || ScheduleError::InvalidTime {
        value: value.to_string(),
    };

    let (h, m) = value.trim().split_once(':').ok_or_else(invalid)?;
    let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if h.is_empty() || h.len() > 2 || m.len() != 2 || !digits(h) || !digits(m) {
        return Err(invalid());
    }
    let hours: u32 = h.parse().map_err(|_| invalid())?;
    let minutes: u32 = m.parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }

    let total = hours * 60 + minutes;
    if total > MINUTES_PER_DAY {
        return Err(invalid());
    }
    Ok(total)
}

/// Format minutes since midnight as zero-padded `"HH:MM"`.
pub fn format_hhmm(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn parse_date(value: &str) -> Result<NaiveDate, ScheduleError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ScheduleError::InvalidDate {
        value: value.to_string(),
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn parse_timezone(value: &str) -> Result<Tz, ScheduleError> {
    value.trim().parse().map_err(|_| ScheduleError::InvalidTimezone {
        value: value.to_string(),
    })
}

/// The local calendar date at `now` in the IANA timezone `tz`.
pub fn today_in(tz: &str, now: DateTime<Utc>) -> Result<NaiveDate, ScheduleError> {
    let tz = parse_timezone(tz)?;
    Ok(now.with_timezone(&tz).date_naive())
}

/// Convert a local date + minute-of-day in `tz` to UTC. `24:00` is midnight
/// of the following day.
pub fn local_to_utc(date: NaiveDate, minute: u32, tz: Tz) -> Result<DateTime<Utc>> {
    let (date, minute) = if minute == MINUTES_PER_DAY {
        let next = date
            .succ_opt()
            .ok_or_else(|| anyhow::anyhow!("no day after {date}"))?;
        (next, 0)
    } else {
        (date, minute)
    };
    let time = NaiveTime::from_hms_opt(minute / 60, minute % 60, 0)
        .ok_or_else(|| anyhow::anyhow!("minute out of range: {minute}"))?;
    let ndt = NaiveDateTime::new(date, time);

    // A DST gap has no local instant; a fold has two and we take the earlier.
    let local = tz
        .from_local_datetime(&ndt)
        .earliest()
        .ok_or_else(|| anyhow::anyhow!("nonexistent local time (DST?): {ndt} {tz}"))?;

    Ok(local.with_timezone(&Utc))
}
