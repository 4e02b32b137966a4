//! iCalendar (RFC 5545) event reader.
//!
//! Supports the subset needed to extract capacity windows:
//! - line unfolding
//! - `VEVENT` components with `SUMMARY`, `DTSTART`, `DTEND` and `DURATION`
//! - UTC (`...Z`), floating and `TZID=` date-times, and `VALUE=DATE` dates
//! - `RRULE` and `EXDATE`, expanded inside the requested window
//!
//! `TZID=` names are looked up in the IANA database. Floating times, dates and
//! unknown `TZID=` names are interpreted in the reader's time zone.

use std::io::BufRead;

use chrono::{
    DateTime, Days, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc,
};
use rrule::{RRule, RRuleSet, Unvalidated};
use tracing::{debug, warn};

use crate::{CalendarError, CalendarEvent, CalendarSource};

/// Upper bound on occurrences generated for one recurring event.
const MAX_OCCURRENCES: u16 = 1000;

/// Reads events from iCalendar text.
pub struct IcsCalendar<R, Tz> {
    reader: R,
    tz: Tz,
}

impl<R: BufRead, Tz: TimeZone> IcsCalendar<R, Tz> {
    /// Creates a reader over `reader`, resolving local times in `tz`.
    pub fn new(reader: R, tz: Tz) -> Self {
        Self { reader, tz }
    }
}

impl<R: BufRead, Tz: TimeZone> CalendarSource for IcsCalendar<R, Tz> {
    fn events(
        self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let lines = unfold(self.reader)?;
        let mut events = Vec::new();
        let mut current: Option<PendingEvent> = None;
        let mut nested = 0usize;

        for line in &lines {
            let Some(prop) = ContentLine::parse(line) else {
                continue;
            };

            match (prop.name.as_str(), current.is_some()) {
                ("BEGIN", false) if prop.value.eq_ignore_ascii_case("VEVENT") => {
                    current = Some(PendingEvent::default());
                    nested = 0;
                }
                ("BEGIN", true) => nested += 1,
                ("END", true) if nested > 0 => nested -= 1,
                ("END", true) if prop.value.eq_ignore_ascii_case("VEVENT") => {
                    if let Some(pending) = current.take() {
                        let occurrences = pending.finish(&self.tz, window_start, window_end)?;
                        events.extend(
                            occurrences
                                .into_iter()
                                .filter(|event| event.overlaps(window_start, window_end)),
                        );
                    }
                }
                (_, true) if nested == 0 => {
                    if let Some(pending) = current.as_mut() {
                        pending.apply(&prop);
                    }
                }
                _ => {}
            }
        }

        debug!(count = events.len(), "Read calendar events");
        Ok(events)
    }
}

/// Reads all lines, joining folded continuation lines.
fn unfold<R: BufRead>(reader: R) -> Result<Vec<String>, CalendarError> {
    let mut lines: Vec<String> = Vec::new();
    for line in reader.lines() {
        let line = line?;
        match (line.strip_prefix([' ', '\t']), lines.last_mut()) {
            (Some(rest), Some(last)) => last.push_str(rest),
            _ => lines.push(line),
        }
    }
    Ok(lines)
}

/// One `NAME;PARAM=VALUE:value` line.
#[derive(Debug)]
struct ContentLine {
    name: String,
    params: Vec<(String, String)>,
    value: String,
}

impl ContentLine {
    fn parse(line: &str) -> Option<Self> {
        let mut in_quotes = false;
        let colon = line.char_indices().find_map(|(i, c)| match c {
            '"' => {
                in_quotes = !in_quotes;
                None
            }
            ':' if !in_quotes => Some(i),
            _ => None,
        })?;

        let (head, value) = (&line[..colon], &line[colon + 1..]);
        let mut parts = head.split(';');
        let name = parts.next()?.trim().to_ascii_uppercase();
        if name.is_empty() {
            return None;
        }

        let params = parts
            .filter_map(|p| p.split_once('='))
            .map(|(k, v)| (k.to_ascii_uppercase(), v.trim_matches('"').to_string()))
            .collect();

        Some(Self {
            name,
            params,
            value: value.to_string(),
        })
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A date-time property value before time zone resolution.
#[derive(Debug, Clone)]
enum IcsTime {
    Utc(NaiveDateTime),
    Local(NaiveDateTime),
    Zoned(NaiveDateTime, chrono_tz::Tz),
    Date(NaiveDate),
}

impl IcsTime {
    fn parse(prop: &ContentLine, value: &str) -> Result<Self, CalendarError> {
        let invalid = || CalendarError::InvalidDateTime {
            property: prop.name.clone(),
            value: value.to_string(),
        };
        let value = value.trim();

        if prop.param("VALUE") == Some("DATE") || value.len() == 8 {
            return NaiveDate::parse_from_str(value, "%Y%m%d")
                .map(IcsTime::Date)
                .map_err(|_| invalid());
        }

        if let Some(utc) = value.strip_suffix('Z') {
            return NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
                .map(IcsTime::Utc)
                .map_err(|_| invalid());
        }

        let naive =
            NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").map_err(|_| invalid())?;
        match prop.param("TZID") {
            Some(tzid) => match tzid.parse::<chrono_tz::Tz>() {
                Ok(zone) => Ok(IcsTime::Zoned(naive, zone)),
                Err(_) => {
                    warn!(tzid, property = %prop.name, "Unknown TZID, using local time zone");
                    Ok(IcsTime::Local(naive))
                }
            },
            None => Ok(IcsTime::Local(naive)),
        }
    }

    /// Parses a comma-separated value list such as `EXDATE`.
    fn parse_list(prop: &ContentLine) -> Vec<Result<Self, CalendarError>> {
        prop.value
            .split(',')
            .filter(|value| !value.trim().is_empty())
            .map(|value| IcsTime::parse(prop, value))
            .collect()
    }

    fn is_date(&self) -> bool {
        matches!(self, IcsTime::Date(_))
    }

    /// Wall-clock value, ignoring the zone.
    fn naive(&self) -> NaiveDateTime {
        match self {
            IcsTime::Utc(naive) | IcsTime::Local(naive) | IcsTime::Zoned(naive, _) => *naive,
            IcsTime::Date(date) => date.and_time(NaiveTime::MIN),
        }
    }

    /// Same kind and zone, different wall-clock value.
    fn with_naive(&self, naive: NaiveDateTime) -> Self {
        match self {
            IcsTime::Utc(_) => IcsTime::Utc(naive),
            IcsTime::Local(_) => IcsTime::Local(naive),
            IcsTime::Zoned(_, zone) => IcsTime::Zoned(naive, *zone),
            IcsTime::Date(_) => IcsTime::Date(naive.date()),
        }
    }

    fn resolve<Tz: TimeZone>(
        &self,
        tz: &Tz,
        property: &str,
    ) -> Result<DateTime<FixedOffset>, CalendarError> {
        let local = self.naive();
        let resolved = match self {
            IcsTime::Utc(naive) => return Ok(naive.and_utc().fixed_offset()),
            IcsTime::Zoned(_, zone) => zone
                .from_local_datetime(&local)
                .earliest()
                .map(|dt| dt.fixed_offset()),
            IcsTime::Local(_) | IcsTime::Date(_) => tz
                .from_local_datetime(&local)
                .earliest()
                .map(|dt| dt.fixed_offset()),
        };

        resolved.ok_or_else(|| CalendarError::NonexistentLocalTime {
            property: property.to_string(),
            value: local.to_string(),
        })
    }
}

/// Properties collected for the `VEVENT` being read.
#[derive(Debug, Default)]
struct PendingEvent {
    summary: String,
    start: Option<Result<IcsTime, CalendarError>>,
    end: Option<Result<IcsTime, CalendarError>>,
    duration: Option<String>,
    rrule: Option<String>,
    exdates: Vec<Result<IcsTime, CalendarError>>,
}

impl PendingEvent {
    fn apply(&mut self, prop: &ContentLine) {
        match prop.name.as_str() {
            "SUMMARY" => self.summary = unescape_text(&prop.value),
            "DTSTART" => self.start = Some(IcsTime::parse(prop, &prop.value)),
            "DTEND" => self.end = Some(IcsTime::parse(prop, &prop.value)),
            "DURATION" => self.duration = Some(prop.value.trim().to_string()),
            "RRULE" => self.rrule = Some(prop.value.trim().to_string()),
            "EXDATE" => self.exdates.extend(IcsTime::parse_list(prop)),
            _ => {}
        }
    }

    /// Resolves the event, expanding any recurrence rule around the window.
    fn finish<Tz: TimeZone>(
        self,
        tz: &Tz,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let Some(start) = self.start else {
            warn!(summary = %self.summary, "Skipping event without DTSTART");
            return Ok(Vec::new());
        };
        let start_raw = start?;
        let start = start_raw.resolve(tz, "DTSTART")?;

        let end = match (self.end, &self.duration) {
            (Some(end), _) => end?.resolve(tz, "DTEND")?,
            (None, Some(duration)) => start
                .checked_add_signed(parse_duration(duration)?)
                .ok_or_else(|| CalendarError::InvalidDuration(duration.clone()))?,
            (None, None) if start_raw.is_date() => start
                .checked_add_days(Days::new(1))
                .ok_or_else(|| CalendarError::InvalidDateTime {
                    property: "DTSTART".to_string(),
                    value: start_raw.naive().to_string(),
                })?,
            (None, None) => start,
        };

        let Some(rule) = self.rrule else {
            return Ok(vec![CalendarEvent::new(self.summary, start, end)]);
        };

        let length = end - start;
        let occurrences = match expand(&start_raw, &rule, length, window_start, window_end) {
            Ok(occurrences) => occurrences,
            Err(err) => {
                warn!(
                    summary = %self.summary,
                    rule = %rule,
                    error = %err,
                    "Ignoring recurrence rule"
                );
                return Ok(vec![CalendarEvent::new(self.summary, start, end)]);
            }
        };

        let excluded = self
            .exdates
            .into_iter()
            .map(|exdate| exdate?.resolve(tz, "EXDATE"))
            .collect::<Result<Vec<_>, _>>()?;

        let mut events = Vec::new();
        for occurrence in occurrences {
            let occurrence_start = match occurrence.resolve(tz, "DTSTART") {
                Ok(dt) => dt,
                Err(err) => {
                    warn!(summary = %self.summary, error = %err, "Skipping recurrence");
                    continue;
                }
            };
            if excluded.contains(&occurrence_start) {
                continue;
            }
            let occurrence_end = occurrence_start
                .checked_add_signed(length)
                .ok_or(CalendarError::WindowOutOfRange)?;
            events.push(CalendarEvent::new(
                self.summary.clone(),
                occurrence_start,
                occurrence_end,
            ));
        }

        debug!(summary = %self.summary, count = events.len(), "Expanded recurring event");
        Ok(events)
    }
}

/// Expands `rule` from `start`, keeping occurrences that can reach the window.
///
/// Recurrences step in wall-clock time: the rule is evaluated with UTC
/// standing in for the event's own zone, and each occurrence keeps the zone of
/// `start`.
fn expand(
    start: &IcsTime,
    rule: &str,
    length: TimeDelta,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Result<Vec<IcsTime>, rrule::RRuleError> {
    let dt_start = start.naive().and_utc().with_timezone(&rrule::Tz::UTC);
    let rule = rule.parse::<RRule<Unvalidated>>()?.validate(dt_start)?;

    // Zone offsets stay within a day of UTC.
    let margin = length.abs() + TimeDelta::days(1);
    let mut set = RRuleSet::new(dt_start).rrule(rule);
    if let Some(after) = window_start.checked_sub_signed(margin) {
        set = set.after(after.with_timezone(&rrule::Tz::UTC));
    }
    if let Some(before) = window_end.checked_add_signed(TimeDelta::days(1)) {
        set = set.before(before.with_timezone(&rrule::Tz::UTC));
    }

    let result = set.all(MAX_OCCURRENCES);
    if result.limited {
        warn!(limit = MAX_OCCURRENCES, "Recurrence expansion truncated");
    }

    Ok(result
        .dates
        .iter()
        .map(|dt| start.with_naive(dt.naive_utc()))
        .collect())
}

/// Parses an RFC 5545 `DURATION` such as `PT1H30M`, `P1D` or `-PT15M`.
fn parse_duration(value: &str) -> Result<TimeDelta, CalendarError> {
    let invalid = || CalendarError::InvalidDuration(value.to_string());

    let (negative, rest) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let rest = rest.strip_prefix('P').ok_or_else(invalid)?;

    let mut total = TimeDelta::zero();
    let mut digits = String::new();
    let mut in_time = false;
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'T' if digits.is_empty() => in_time = true,
            unit => {
                let n: i64 = digits.parse().map_err(|_| invalid())?;
                digits.clear();
                let part = match (unit, in_time) {
                    ('W', false) => TimeDelta::try_weeks(n),
                    ('D', false) => TimeDelta::try_days(n),
                    ('H', true) => TimeDelta::try_hours(n),
                    ('M', true) => TimeDelta::try_minutes(n),
                    ('S', true) => TimeDelta::try_seconds(n),
                    _ => return Err(invalid()),
                }
                .ok_or_else(invalid)?;
                total = total.checked_add(&part).ok_or_else(invalid)?;
            }
        }
    }
    if !digits.is_empty() {
        return Err(invalid());
    }

    Ok(if negative { -total } else { total })
}

/// Reverses RFC 5545 TEXT escaping.
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
