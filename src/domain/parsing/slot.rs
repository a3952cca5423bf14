//! Appointment slot selection.
//!
//! Clients pick from a numbered list of offered slots. Three strategies
//! are tried in order: an explicit number, a weekday plus time of day,
//! then a bare clock time. Ambiguity is always a rejection.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::normalize::normalize;

/// Clock times further than this from every slot do not match.
pub const CLOCK_TOLERANCE_MINUTES: i64 = 30;

static CLOCK_12H_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})(?::([0-5]\d))?\s*(am|pm)\b").expect("12h clock pattern is valid")
});

static CLOCK_24H_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").expect("24h clock pattern is valid")
});

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d+)(?:st|nd|rd|th)?\b").expect("number pattern is valid"));

static ORDINAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(first|second|third|fourth|fifth|sixth)\b").expect("ordinal pattern is valid")
});

static WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(monday|mon|tuesday|tues|tue|wednesday|weds|wed|thursday|thurs|thur|thu|friday|fri|saturday|sat|sunday|sun)\b",
    )
    .expect("weekday pattern is valid")
});

static TIME_OF_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(morning|afternoon|evening)\b").expect("time of day pattern is valid"));

/// An offered appointment window, in the studio's local offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl TimeSlot {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        Self { start, end }
    }

    /// Human-readable label, e.g. "Mon 02 Mar 10:00".
    pub fn label(&self) -> String {
        self.start.format("%a %d %b %H:%M").to_string()
    }

    fn minute_of_day(&self) -> i64 {
        i64::from(self.start.hour()) * 60 + i64::from(self.start.minute())
    }
}

/// Why a slot reply could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRejection {
    NoMatch,
    OutOfRange,
    MultipleNumbers,
}

impl SlotRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotRejection::NoMatch => "no_match",
            SlotRejection::OutOfRange => "out_of_range",
            SlotRejection::MultipleNumbers => "multiple_numbers",
        }
    }
}

impl fmt::Display for SlotRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "morning" => Some(TimeOfDay::Morning),
            "afternoon" => Some(TimeOfDay::Afternoon),
            "evening" => Some(TimeOfDay::Evening),
            _ => None,
        }
    }

    fn contains_hour(self, hour: u32) -> bool {
        match self {
            TimeOfDay::Morning => (6..12).contains(&hour),
            TimeOfDay::Afternoon => (12..17).contains(&hour),
            TimeOfDay::Evening => (17..22).contains(&hour),
        }
    }
}

/// Resolves a reply to a 1-based index into `slots`.
///
/// Only the first `max_index` slots are selectable.
pub fn parse_slot_selection(
    text: &str,
    slots: &[TimeSlot],
    max_index: usize,
) -> Result<usize, SlotRejection> {
    let lowered = normalize(text).to_lowercase();
    if lowered.is_empty() {
        return Err(SlotRejection::NoMatch);
    }
    let selectable = &slots[..slots.len().min(max_index)];

    // Clock times would otherwise read as slot numbers.
    let without_12h = CLOCK_12H_RE.replace_all(&lowered, " ");
    let without_clocks = CLOCK_24H_RE.replace_all(&without_12h, " ");

    if let Some(result) = match_number(&without_clocks, selectable.len()) {
        return result;
    }

    let weekday = WEEKDAY_RE
        .captures(&without_clocks)
        .and_then(|c| c.get(1))
        .and_then(|m| weekday_from_token(m.as_str()));

    if let Some(day) = weekday {
        let time_of_day = TIME_OF_DAY_RE
            .captures(&without_clocks)
            .and_then(|c| c.get(1))
            .and_then(|m| TimeOfDay::from_token(m.as_str()));
        if let Some(tod) = time_of_day {
            return selectable
                .iter()
                .position(|s| s.start.weekday() == day && tod.contains_hour(s.start.hour()))
                .map(|i| i + 1)
                .ok_or(SlotRejection::NoMatch);
        }
    }

    if let Some(minute) = first_clock_minute(&lowered) {
        return match_clock(minute, weekday, selectable);
    }

    Err(SlotRejection::NoMatch)
}

fn match_number(text: &str, count: usize) -> Option<Result<usize, SlotRejection>> {
    let mut numbers: BTreeSet<usize> = NUMBER_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().parse::<usize>().unwrap_or(usize::MAX))
        .collect();
    numbers.extend(
        ORDINAL_RE
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .filter_map(|m| ordinal_value(m.as_str())),
    );

    let mut iter = numbers.iter();
    let first = *iter.next()?;
    if iter.next().is_some() {
        return Some(Err(SlotRejection::MultipleNumbers));
    }
    if first == 0 || first > count {
        return Some(Err(SlotRejection::OutOfRange));
    }
    Some(Ok(first))
}

fn match_clock(
    minute: i64,
    weekday: Option<Weekday>,
    slots: &[TimeSlot],
) -> Result<usize, SlotRejection> {
    let mut best: Option<(usize, i64)> = None;
    let mut tied = false;
    for (index, slot) in slots.iter().enumerate() {
        if weekday.map_or(false, |d| slot.start.weekday() != d) {
            continue;
        }
        let distance = (slot.minute_of_day() - minute).abs();
        if distance > CLOCK_TOLERANCE_MINUTES {
            continue;
        }
        match best {
            Some((best_index, best_distance)) if distance == best_distance => {
                if slots[best_index].start != slot.start {
                    tied = true;
                }
            }
            Some((_, best_distance)) if distance > best_distance => {}
            _ => {
                best = Some((index, distance));
                tied = false;
            }
        }
    }
    match best {
        Some((index, _)) if !tied => Ok(index + 1),
        _ => Err(SlotRejection::NoMatch),
    }
}

fn first_clock_minute(text: &str) -> Option<i64> {
    if let Some(caps) = CLOCK_12H_RE.captures(text) {
        let hour: i64 = caps.get(1)?.as_str().parse().ok()?;
        let minute: i64 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
        if !(1..=12).contains(&hour) {
            return None;
        }
        let hour = match (caps.get(3)?.as_str(), hour) {
            ("am", 12) => 0,
            ("am", h) => h,
            ("pm", 12) => 12,
            (_, h) => h + 12,
        };
        return Some(hour * 60 + minute);
    }
    let caps = CLOCK_24H_RE.captures(text)?;
    let hour: i64 = caps.get(1)?.as_str().parse().ok()?;
    let minute: i64 = caps.get(2)?.as_str().parse().ok()?;
    Some(hour * 60 + minute)
}

fn ordinal_value(token: &str) -> Option<usize> {
    match token {
        "first" => Some(1),
        "second" => Some(2),
        "third" => Some(3),
        "fourth" => Some(4),
        "fifth" => Some(5),
        "sixth" => Some(6),
        _ => None,
    }
}

fn weekday_from_token(token: &str) -> Option<Weekday> {
    match token {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tues" | "tue" => Some(Weekday::Tue),
        "wednesday" | "weds" | "wed" => Some(Weekday::Wed),
        "thursday" | "thurs" | "thur" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}
