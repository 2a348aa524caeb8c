use std::collections::{BTreeMap, HashMap};

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use todooby_core::{
    Interval, ScheduleConfig, Scheduler, Subtask, merge_intervals, subtract_busy_from_working,
};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn interval() -> impl Strategy<Value = Interval> {
    (0u32..=1440, 0u32..=1440).prop_map(|(a, b)| Interval::new(a, b))
}

fn intervals() -> impl Strategy<Value = Vec<Interval>> {
    prop::collection::vec(interval(), 0..12)
}

fn subtasks() -> impl Strategy<Value = Vec<Subtask>> {
    prop::collection::vec((0u32..400, 0i32..6), 1..10).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (minutes, order))| {
                Subtask::new(format!("t{i}"), format!("step {i}"))
                    .with_duration(minutes)
                    .with_order(order)
            })
            .collect()
    })
}

fn config() -> impl Strategy<Value = ScheduleConfig> {
    let busy = prop::collection::btree_map(0u64..14, prop::collection::vec(interval(), 0..4), 0..6);
    (busy, any::<bool>(), prop::option::of(60u32..600), any::<bool>()).prop_map(
        |(busy, avoid_weekends, max_daily_minutes, lunch)| ScheduleConfig {
            busy_by_date: busy
                .into_iter()
                .map(|(offset, ranges)| (start().checked_add_days(Days::new(offset)).unwrap(), ranges))
                .collect(),
            avoid_weekends,
            max_daily_minutes,
            lunch_break: lunch.then(|| Interval::new(720, 780)),
            ..Default::default()
        },
    )
}

/// Minutes of `b` that fall inside `w`.
fn overlap(w: Interval, b: Interval) -> i64 {
    let lo = i64::from(w.start.max(b.start));
    let hi = i64::from(w.end.min(b.end));
    (hi - lo).max(0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn merge_is_idempotent(xs in intervals()) {
        let once = merge_intervals(&xs);
        prop_assert_eq!(merge_intervals(&once), once.clone());
        for pair in once.windows(2) {
            prop_assert!(pair[0].end < pair[1].start);
        }
    }

    #[test]
    fn free_time_is_working_minus_busy(w in interval(), busy in intervals()) {
        let free = subtract_busy_from_working(&[w], &busy);
        let free_minutes: i64 = free.iter().map(|f| i64::from(f.width())).sum();

        let busy_inside: i64 = merge_intervals(&busy).into_iter().map(|b| overlap(w, b)).sum();
        let working = i64::from(w.width());
        prop_assert_eq!(free_minutes, (working - busy_inside).max(0));

        for f in &free {
            prop_assert!(!f.is_empty());
            prop_assert!(f.start >= w.start && f.end <= w.end);
            prop_assert!(busy.iter().filter(|b| !b.is_empty()).all(|b| !f.overlaps(b)));
        }
    }

    #[test]
    fn schedule_keeps_every_subtask_and_respects_busy_time(
        tasks in subtasks(),
        cfg in config(),
        deadline in prop::option::of(0u64..10),
    ) {
        let deadline = deadline.map(|d| start().checked_add_days(Days::new(d)).unwrap());
        let out = Scheduler::new(cfg.clone(), start(), deadline).run(&tasks, Vec::new());

        let mut ids: Vec<_> = out.subtasks.iter().map(|s| s.id.clone()).collect();
        ids.sort();
        let mut expected: Vec<_> = tasks.iter().map(|s| s.id.clone()).collect();
        expected.sort();
        prop_assert_eq!(ids, expected);
        prop_assert!(out.subtasks.iter().all(|s| s.date.is_some() && s.time.is_some()));
        prop_assert_eq!(out.placements.len() + out.unplaced.len(), tasks.len());

        let order: HashMap<&str, i32> = tasks.iter().map(|s| (s.id.as_str(), s.order)).collect();
        let mut by_day: BTreeMap<NaiveDate, Vec<_>> = BTreeMap::new();
        for p in &out.placements {
            by_day.entry(p.date).or_default().push(p);
        }

        for (date, day) in &by_day {
            for p in day {
                let span = p.interval();
                prop_assert!(span.start >= cfg.working_hours.start && span.end <= cfg.working_hours.end);
                if let Some(lunch) = cfg.lunch_break {
                    prop_assert!(!span.overlaps(&lunch));
                }
                for b in cfg.busy_on(*date).iter().filter(|b| !b.is_empty()) {
                    prop_assert!(!span.overlaps(b));
                }
            }
            for (i, a) in day.iter().enumerate() {
                for b in &day[i + 1..] {
                    prop_assert!(!a.interval().overlaps(&b.interval()));
                    if order[a.subtask_id.as_str()] < order[b.subtask_id.as_str()] {
                        prop_assert!(a.start <= b.start);
                    }
                }
            }
        }
    }
}
