//! iCalendar (RFC 5545) export of the visible month, and a parser for the
//! subset we emit.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

use crate::config::CalendarConfig;
use crate::models::Event;

pub const PRODID: &str = "-//KemSU Pulse Events//NONSGML v1.0//EN";

const LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";
const MAX_LINE_OCTETS: usize = 75;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IcsError {
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("missing END:VCALENDAR")]
    Unterminated,
}

/// Event as read back from an iCalendar file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcsEvent {
    pub uid: String,
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Renders `events` as a `VCALENDAR`. `now` becomes every `DTSTAMP`.
pub fn export<'a, I>(events: I, calendar: &CalendarConfig, now: DateTime<Utc>) -> String
where
    I: IntoIterator<Item = &'a Event>,
{
    let offset = calendar.offset();
    let mut out = String::new();
    let mut line = |text: String| {
        out.push_str(&fold(&text));
        out.push_str("\r\n");
    };

    line("BEGIN:VCALENDAR".into());
    line("VERSION:2.0".into());
    line(format!("PRODID:{PRODID}"));
    line("CALSCALE:GREGORIAN".into());
    line("METHOD:PUBLISH".into());
    line(format!("X-WR-CALNAME:{}", escape(&calendar.calendar_name)));
    line(format!("X-WR-TIMEZONE:{}", calendar.tzid));

    let dtstamp = now.format("%Y%m%dT%H%M%SZ").to_string();
    for event in events {
        let start = event.start_datetime.with_timezone(&offset).format(LOCAL_FORMAT);
        let end = event.effective_end().with_timezone(&offset).format(LOCAL_FORMAT);
        line("BEGIN:VEVENT".into());
        line(format!("UID:{}", uuid::Uuid::new_v4()));
        line(format!("DTSTAMP:{dtstamp}"));
        line(format!("DTSTART;TZID={}:{start}", calendar.tzid));
        line(format!("DTEND;TZID={}:{end}", calendar.tzid));
        line(format!("SUMMARY:{}", escape(&event.title)));
        line(format!("DESCRIPTION:{}", escape(&event.description)));
        line(format!("LOCATION:{}", escape(&event.location_line())));
        line("END:VEVENT".into());
    }
    line("END:VCALENDAR".into());
    out
}

/// Suggested file name for a month export.
pub fn file_name(month: crate::calendar::Month) -> String {
    format!("events-{month}.ics")
}

/// Escapes TEXT values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Folds a content line at 75 octets without splitting a UTF-8 sequence.
pub fn fold(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut used = 0;
    // Continuation lines start with a space, which counts toward the limit.
    let mut limit = MAX_LINE_OCTETS;
    for c in line.chars() {
        let width = c.len_utf8();
        if used + width > limit {
            out.push_str("\r\n ");
            used = 0;
            limit = MAX_LINE_OCTETS - 1;
        }
        out.push(c);
        used += width;
    }
    out
}

fn unfold(text: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();
    for (index, raw) in text.split('\n').enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(rest) = raw.strip_prefix([' ', '\t'])
            && let Some((_, last)) = lines.last_mut()
        {
            last.push_str(rest);
            continue;
        }
        if !raw.is_empty() {
            lines.push((index + 1, raw.to_string()));
        }
    }
    lines
}

/// Parses the events of a calendar we exported. Zoned times are converted
/// back to UTC with `offset`; `Z`-suffixed times are taken as UTC.
///
/// # Errors
/// Returns [`IcsError`] on malformed lines or a missing calendar end.
pub fn parse(text: &str, offset: FixedOffset) -> Result<Vec<IcsEvent>, IcsError> {
    let mut events = Vec::new();
    let mut current: Option<PartialEvent> = None;
    let mut closed = false;

    for (line_no, line) in unfold(text) {
        let (head, value) = line.split_once(':').ok_or_else(|| IcsError::Malformed {
            line: line_no,
            reason: "missing ':'".into(),
        })?;
        let name = head.split(';').next().unwrap_or(head).to_ascii_uppercase();

        match (name.as_str(), value) {
            ("BEGIN", "VEVENT") => current = Some(PartialEvent::default()),
            ("END", "VEVENT") => {
                let partial = current.take().ok_or_else(|| IcsError::Malformed {
                    line: line_no,
                    reason: "END:VEVENT without BEGIN".into(),
                })?;
                events.push(partial.finish(line_no)?);
            }
            ("END", "VCALENDAR") => closed = true,
            _ => {
                if let Some(event) = current.as_mut() {
                    event.set(&name, value, offset, line_no)?;
                }
            }
        }
    }

    if closed { Ok(events) } else { Err(IcsError::Unterminated) }
}

#[derive(Default)]
struct PartialEvent {
    uid: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl PartialEvent {
    fn set(
        &mut self,
        name: &str,
        value: &str,
        offset: FixedOffset,
        line: usize,
    ) -> Result<(), IcsError> {
        match name {
            "UID" => self.uid = Some(value.to_string()),
            "SUMMARY" => self.summary = Some(unescape(value)),
            "DESCRIPTION" => self.description = Some(unescape(value)),
            "LOCATION" => self.location = Some(unescape(value)),
            "DTSTART" => self.start = Some(parse_time(value, offset, line)?),
            "DTEND" => self.end = Some(parse_time(value, offset, line)?),
            _ => {}
        }
        Ok(())
    }

    fn finish(self, line: usize) -> Result<IcsEvent, IcsError> {
        let start = self.start.ok_or_else(|| IcsError::Malformed {
            line,
            reason: "VEVENT without DTSTART".into(),
        })?;
        Ok(IcsEvent {
            uid: self.uid.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            end: self.end.unwrap_or(start),
            start,
        })
    }
}

fn parse_time(value: &str, offset: FixedOffset, line: usize) -> Result<DateTime<Utc>, IcsError> {
    let malformed = || IcsError::Malformed {
        line,
        reason: format!("invalid date-time '{value}'"),
    };
    if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, LOCAL_FORMAT).map_err(|_| malformed())?;
        return Ok(naive.and_utc());
    }
    let naive = NaiveDateTime::parse_from_str(value, LOCAL_FORMAT).map_err(|_| malformed())?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(malformed)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn calendar() -> CalendarConfig {
        CalendarConfig::default()
    }

    fn event(title: &str, description: &str, details: Option<&str>) -> Event {
        serde_json::from_value(json!({
            "id": 1,
            "title": title,
            "description": description,
            "start_datetime": "2025-05-14T02:00:00",
            "location": "КПИТиП",
            "location_details": details,
            "event_type": "Другое",
            "created_at": "2025-01-01T00:00:00",
            "updated_at": "2025-01-01T00:00:00",
            "author_id": 1
        }))
        .unwrap()
    }

    #[test]
    fn test_export_header_and_event_lines() {
        let e = event("Хакатон", "Команды, до 5 человек", Some("ауд. 101"));
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        let ics = export([&e], &calendar(), now);

        assert!(ics.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n"));
        assert!(ics.contains("PRODID:-//KemSU Pulse Events//NONSGML v1.0//EN\r\n"));
        assert!(ics.contains("METHOD:PUBLISH\r\n"));
        assert!(ics.contains("X-WR-TIMEZONE:Asia/Krasnoyarsk\r\n"));
        assert!(ics.contains("DTSTAMP:20250501T000000Z\r\n"));
        assert!(ics.contains("DTSTART;TZID=Asia/Krasnoyarsk:20250514T090000\r\n"));
        // No end time: DTEND repeats the start.
        assert!(ics.contains("DTEND;TZID=Asia/Krasnoyarsk:20250514T090000\r\n"));
        assert!(ics.contains("DESCRIPTION:Команды\\, до 5 человек\r\n"));
        assert!(ics.contains("LOCATION:КПИТиП - ауд. 101\r\n"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
    }

    #[test]
    fn test_escape_roundtrip() {
        let raw = "a;b,c\\d\nline";
        assert_eq!(escape(raw), "a\\;b\\,c\\\\d\\nline");
        assert_eq!(unescape(&escape(raw)), raw);
    }

    #[test]
    fn test_fold_respects_octets_and_char_boundaries() {
        let long = format!("DESCRIPTION:{}", "Ж".repeat(80));
        let folded = fold(&long);
        for (i, part) in folded.split("\r\n").enumerate() {
            assert!(part.len() <= MAX_LINE_OCTETS, "part {i} too long");
            if i > 0 {
                assert!(part.starts_with(' '));
            }
        }
        let rejoined: String = folded.split("\r\n ").collect();
        assert_eq!(rejoined, long);
    }

    #[test]
    fn test_parse_recovers_exported_events() {
        let long_description = "Описание, очень длинное; ".repeat(10);
        let e = event("Турнир; финал", &long_description, None);
        let ics = export([&e], &calendar(), Utc::now());
        let parsed = parse(&ics, calendar().offset()).unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].summary, "Турнир; финал");
        assert_eq!(parsed[0].description, long_description);
        assert_eq!(parsed[0].location, "КПИТиП");
        assert_eq!(parsed[0].start, e.start_datetime);
        assert_eq!(parsed[0].end, e.start_datetime);
        assert!(!parsed[0].uid.is_empty());
    }

    #[test]
    fn test_parse_rejects_unterminated() {
        assert_eq!(
            parse("BEGIN:VCALENDAR\r\n", calendar().offset()),
            Err(IcsError::Unterminated)
        );
    }

    #[test]
    fn test_parse_reports_bad_time() {
        let text = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nDTSTART:tomorrow\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        assert!(matches!(
            parse(text, calendar().offset()),
            Err(IcsError::Malformed { line: 3, .. })
        ));
    }
}
