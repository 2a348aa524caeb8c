use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use todooby_core::{Placement, Priority, Subtask, time::local_to_utc};

/// RFC 5545 content lines are at most 75 octets before folding.
const MAX_LINE_OCTETS: usize = 75;

const UTC_STAMP: &str = "%Y%m%dT%H%M%SZ";

/// One placed subtask as a calendar entry.
pub struct CalendarEvent {
    pub uid: String,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub summary: String,
    pub description: String,
    pub priority: Priority,
    /// Position in the parent task's plan, 1-based as the analyzer emits it.
    pub order: i32,
}

/// Turn placements into UTC events, reading wall-clock times in `tz`.
///
/// Placements whose subtask is not in `subtasks` are skipped.
pub fn placements_to_events(
    placements: &[Placement],
    subtasks: &[Subtask],
    tz: Tz,
    prefix: &str,
) -> Result<Vec<CalendarEvent>> {
    let by_id: HashMap<&str, &Subtask> = subtasks.iter().map(|s| (s.id.as_str(), s)).collect();

    let mut events = Vec::with_capacity(placements.len());
    for p in placements {
        let Some(subtask) = by_id.get(p.subtask_id.as_str()) else {
            continue;
        };
        let start_utc = local_to_utc(p.date, p.start, tz)
            .with_context(|| format!("start of {} on {}", p.subtask_id, p.date))?;
        let end_utc = local_to_utc(p.date, p.end, tz)
            .with_context(|| format!("end of {} on {}", p.subtask_id, p.date))?;

        events.push(CalendarEvent {
            uid: format!("{}@todooby", p.subtask_id),
            start_utc,
            end_utc,
            summary: format!("{prefix}{}", subtask.text),
            description: format!(
                "{} min (estimated {}), planned {} {}",
                p.minutes(),
                subtask.estimated_duration,
                p.date,
                p.start_time()
            ),
            priority: subtask.priority,
            order: subtask.order,
        });
    }
    Ok(events)
}

/// iCalendar PRIORITY: 1 highest, 5 normal, 9 lowest.
fn ics_priority(priority: Priority) -> u8 {
    match priority {
        Priority::High => 1,
        Priority::Medium => 5,
        Priority::Low => 9,
    }
}

/// Render events as an iCalendar document, `stamp` being the DTSTAMP.
pub fn events_to_ics(events: &[CalendarEvent], stamp: DateTime<Utc>) -> String {
    let stamp = stamp.format(UTC_STAMP).to_string();
    let mut out = String::new();

    push_line(&mut out, "BEGIN:VCALENDAR");
    push_line(&mut out, "VERSION:2.0");
    push_line(&mut out, "PRODID:-//Todooby//Subtask Schedule//EN");
    push_line(&mut out, "CALSCALE:GREGORIAN");

    for e in events {
        push_line(&mut out, "BEGIN:VEVENT");
        push_line(&mut out, &format!("UID:{}", escape_text(&e.uid)));
        push_line(&mut out, &format!("DTSTAMP:{stamp}"));
        push_line(&mut out, &format!("DTSTART:{}", e.start_utc.format(UTC_STAMP)));
        push_line(&mut out, &format!("DTEND:{}", e.end_utc.format(UTC_STAMP)));
        push_line(&mut out, &format!("SUMMARY:{}", escape_text(&e.summary)));
        push_line(&mut out, &format!("DESCRIPTION:{}", escape_text(&e.description)));
        push_line(&mut out, &format!("PRIORITY:{}", ics_priority(e.priority)));
        push_line(&mut out, &format!("X-TODOOBY-ORDER:{}", e.order));
        push_line(&mut out, "END:VEVENT");
    }

    push_line(&mut out, "END:VCALENDAR");
    out
}

/// Append a CRLF-terminated content line, folding it on char boundaries.
fn push_line(out: &mut String, line: &str) {
    let mut width = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(ch);
        width += len;
    }
    out.push_str("\r\n");
}

/// TEXT value escaping.
fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(ch),
        }
    }
    out
}
