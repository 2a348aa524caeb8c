//! Schedule configuration.
//!
//! [`UserSchedule`] is the wire shape supplied with an analysis request: every
//! field optional, `HH:MM` strings, camelCase JSON. [`ScheduleConfig`] is the
//! resolved form the scheduler runs on, with defaults applied and times parsed
//! to minutes.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ScheduleError;
use crate::interval::Interval;
use crate::time::{format_hhmm, parse_date, parse_hhmm};

/// Timezone assumed by the surrounding system when none is configured.
pub const DEFAULT_TIMEZONE: &str = "Asia/Seoul";

const DEFAULT_WORKING_HOURS: (u32, u32) = (9 * 60, 18 * 60);
const DEFAULT_LUNCH_BREAK: (u32, u32) = (12 * 60, 13 * 60);

/// `{ "start": "HH:MM", "end": "HH:MM" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Parse both ends. Inverted ranges are returned as-is; the interval
    /// algebra drops them.
    pub fn to_interval(&self) -> Result<Interval, ScheduleError> {
        Ok(Interval::new(parse_hhmm(&self.start)?, parse_hhmm(&self.end)?))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_hours: Option<TimeRange>,

    /// Absent: default lunch. `null`: no lunch break.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub lunch_break: Option<Option<TimeRange>>,

    /// Date (`YYYY-MM-DD`) -> busy ranges on that date.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub busy_by_date: BTreeMap<String, Vec<TimeRange>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avoid_weekends: Option<bool>,

    /// `0` and `null` both mean "no cap".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_daily_minutes: Option<u32>,
}

/// Distinguish an explicit `null` from a missing key.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Resolved, parsed configuration for one scheduling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub working_hours: Interval,
    pub lunch_break: Option<Interval>,
    pub busy_by_date: BTreeMap<NaiveDate, Vec<Interval>>,
    pub avoid_weekends: bool,
    pub max_daily_minutes: Option<u32>,
    /// Carried for callers; no arithmetic uses it.
    pub timezone: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            working_hours: Interval::new(DEFAULT_WORKING_HOURS.0, DEFAULT_WORKING_HOURS.1),
            lunch_break: Some(Interval::new(DEFAULT_LUNCH_BREAK.0, DEFAULT_LUNCH_BREAK.1)),
            busy_by_date: BTreeMap::new(),
            avoid_weekends: false,
            max_daily_minutes: None,
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

impl ScheduleConfig {
    /// Apply defaults to a user schedule, noting each default in `assumptions`.
    pub fn from_user(
        user: Option<&UserSchedule>,
        assumptions: &mut Vec<String>,
    ) -> Result<Self, ScheduleError> {
        let mut cfg = ScheduleConfig::default();
        let empty = UserSchedule::default();
        let user = user.unwrap_or(&empty);

        match &user.working_hours {
            Some(range) => {
                let wh = range.to_interval()?;
                if wh.is_empty() {
                    return Err(ScheduleError::InvalidRange {
                        start: range.start.clone(),
                        end: range.end.clone(),
                    });
                }
                cfg.working_hours = wh;
            }
            None => assumptions.push(format!(
                "Working hours not provided; assumed {}-{}",
                format_hhmm(cfg.working_hours.start),
                format_hhmm(cfg.working_hours.end)
            )),
        }

        match &user.lunch_break {
            Some(Some(range)) => cfg.lunch_break = Some(range.to_interval()?),
            Some(None) => cfg.lunch_break = None,
            None => {
                if let Some(lunch) = cfg.lunch_break {
                    assumptions.push(format!(
                        "Lunch break not provided; kept {}-{} free",
                        format_hhmm(lunch.start),
                        format_hhmm(lunch.end)
                    ));
                }
            }
        }

        for (date, ranges) in &user.busy_by_date {
            let date = parse_date(date)?;
            let busy = ranges
                .iter()
                .map(TimeRange::to_interval)
                .collect::<Result<Vec<_>, _>>()?;
            cfg.busy_by_date.entry(date).or_default().extend(busy);
        }

        cfg.avoid_weekends = user.avoid_weekends.unwrap_or(false);
        cfg.max_daily_minutes = user.max_daily_minutes.filter(|m| *m > 0);
        if let Some(tz) = &user.timezone {
            cfg.timezone = tz.clone();
        }

        Ok(cfg)
    }

    pub fn busy_on(&self, date: NaiveDate) -> &[Interval] {
        self.busy_by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }
}
