use std::fmt;

use anyhow::anyhow;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;

use crate::datetime::{clock_serde, format_clock, slot_label};
use crate::recurrence::Recurrence;

pub const SCHEDULE_CATEGORY: &str = "schedule";
pub const DEFAULT_COLOR: &str = "#1a365d";
pub const DEFAULT_REMINDER_LEAD_MINUTES: i64 = 15;
pub const MAX_REMINDER_LEAD_MINUTES: i64 = 7 * 24 * 60;
pub const MAX_TASK_MINUTES: i64 = 480;

/// Session-unique identifier shared by every entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EntityId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().trim_start_matches('#');
        raw.parse::<u64>()
            .map(Self)
            .map_err(|err| anyhow::anyhow!("invalid id {s:?}: {err}"))
    }
}

/// Hands out monotonically increasing ids.
#[derive(Debug, Clone, Default)]
pub struct IdSource {
    last: u64,
}

impl IdSource {
    pub fn next_id(&mut self) -> EntityId {
        self.last += 1;
        EntityId(self.last)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: EntityId,

    pub title: String,

    #[serde(serialize_with = "clock_serde::option::serialize")]
    pub start: Option<NaiveTime>,

    #[serde(serialize_with = "clock_serde::option::serialize")]
    pub end: Option<NaiveTime>,

    pub description: String,

    pub category: String,

    pub color: String,

    pub all_day: bool,

    pub recurrence: Recurrence,

    pub date: NaiveDate,
}

impl CalendarEvent {
    pub fn new(id: EntityId, title: String, date: NaiveDate) -> Self {
        Self {
            id,
            title,
            start: None,
            end: None,
            description: String::new(),
            category: String::new(),
            color: DEFAULT_COLOR.to_string(),
            all_day: false,
            recurrence: Recurrence::None,
            date,
        }
    }

    pub fn is_schedule(&self) -> bool {
        self.category == SCHEDULE_CATEGORY
    }

    /// Hourly slot the event is drawn in. All-day events sit in the first
    /// slot; events without a start time have no slot.
    pub fn start_slot(&self) -> Option<String> {
        if self.all_day {
            return Some(slot_label(NaiveTime::MIN));
        }
        self.start.map(slot_label)
    }

    pub fn time_range_label(&self) -> String {
        if self.all_day {
            return "All Day".to_string();
        }
        let start = self.start.map(format_clock).unwrap_or_default();
        let end = self.end.map(format_clock).unwrap_or_default();
        format!("{start} - {end}")
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Reminder {
    pub id: EntityId,
    pub event_title: String,
    pub event_time: String,
    pub fire_at: NaiveDateTime,
    pub description: String,

    /// Weak back-reference; the event may be gone.
    pub event_id: Option<EntityId>,
}

impl Reminder {
    pub fn for_event(
        id: EntityId,
        event: &CalendarEvent,
        lead_minutes: i64,
    ) -> anyhow::Result<Self> {
        let start = event.start.unwrap_or(NaiveTime::MIN);
        let fire_at = TimeDelta::try_minutes(lead_minutes)
            .and_then(|lead| event.date.and_time(start).checked_sub_signed(lead))
            .ok_or_else(|| anyhow!("reminder lead of {lead_minutes} minutes is out of range"))?;

        Ok(Self {
            id,
            event_title: event.title.clone(),
            event_time: event.start.map(format_clock).unwrap_or_default(),
            fire_at,
            description: format!("Reminder for {}", event.title),
            event_id: Some(event.id),
        })
    }

    pub fn manual(
        id: EntityId,
        title: String,
        fire_at: NaiveDateTime,
        description: Option<String>,
    ) -> Self {
        let description = description
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| format!("Reminder for {title}"));
        Self {
            id,
            event_title: title,
            event_time: "Manual reminder".to_string(),
            fire_at,
            description,
            event_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Goal {
    pub id: EntityId,
    pub title: String,

    pub description: String,

    pub target_date: Option<NaiveDate>,

    pub category: String,

    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    #[serde(untagged)]
    Other(String),
}

impl Difficulty {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "easy" => Self::Easy,
            "medium" => Self::Medium,
            "hard" => Self::Hard,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Other(raw) => raw.as_str(),
        }
    }

    /// Eat-the-frog rank: hardest first.
    pub fn frog_rank(&self) -> u8 {
        match self {
            Self::Hard => 0,
            Self::Medium => 1,
            Self::Easy => 2,
            Self::Other(_) => 3,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Easy => "#28a745",
            Self::Medium => "#ffc107",
            Self::Hard => "#dc3545",
            Self::Other(_) => DEFAULT_COLOR,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScheduleTask {
    pub id: EntityId,
    pub title: String,
    pub difficulty: Difficulty,
    pub estimated_minutes: i64,
}

impl ScheduleTask {
    pub fn blank(id: EntityId) -> Self {
        Self {
            id,
            title: String::new(),
            difficulty: Difficulty::Medium,
            estimated_minutes: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn reminder_fires_before_event_start() {
        let mut event = CalendarEvent::new(EntityId(7), "Standup".to_string(), date(2026, 3, 2));
        event.start = NaiveTime::from_hms_opt(9, 0, 0);

        let reminder = Reminder::for_event(EntityId(8), &event, DEFAULT_REMINDER_LEAD_MINUTES)
            .expect("reminder");
        assert_eq!(
            reminder.fire_at,
            date(2026, 3, 2).and_hms_opt(8, 45, 0).expect("valid")
        );
        assert_eq!(reminder.event_id, Some(EntityId(7)));
        assert_eq!(reminder.event_time, "09:00");
        assert_eq!(reminder.description, "Reminder for Standup");
    }

    #[test]
    fn reminder_without_start_rolls_back_past_midnight() {
        let event = CalendarEvent::new(EntityId(1), "Trip".to_string(), date(2026, 3, 2));
        let reminder = Reminder::for_event(EntityId(2), &event, 15).expect("reminder");
        assert_eq!(
            reminder.fire_at,
            date(2026, 3, 1).and_hms_opt(23, 45, 0).expect("valid")
        );
    }

    #[test]
    fn oversized_lead_is_an_error() {
        let mut event = CalendarEvent::new(EntityId(1), "Gym".to_string(), date(2026, 3, 2));
        event.start = NaiveTime::from_hms_opt(9, 0, 0);
        assert!(Reminder::for_event(EntityId(2), &event, 1_000_000_000_000).is_err());
        assert!(Reminder::for_event(EntityId(2), &event, i64::MAX).is_err());
    }

    #[test]
    fn manual_reminder_defaults_description() {
        let at = date(2026, 3, 2).and_hms_opt(7, 0, 0).expect("valid");
        let reminder = Reminder::manual(EntityId(3), "Call".to_string(), at, Some("  ".to_string()));
        assert_eq!(reminder.description, "Reminder for Call");
        assert_eq!(reminder.event_time, "Manual reminder");
        assert!(reminder.event_id.is_none());
    }

    #[test]
    fn start_slot_follows_all_day_and_start_time() {
        let mut event = CalendarEvent::new(EntityId(1), "Lunch".to_string(), date(2026, 3, 2));
        assert_eq!(event.start_slot(), None);

        event.start = NaiveTime::from_hms_opt(12, 30, 0);
        assert_eq!(event.start_slot().as_deref(), Some("12:00 PM"));

        event.all_day = true;
        assert_eq!(event.start_slot().as_deref(), Some("12:00 AM"));
        assert_eq!(event.time_range_label(), "All Day");
    }

    #[test]
    fn difficulty_parsing_and_colors() {
        assert_eq!(Difficulty::parse("Hard"), Difficulty::Hard);
        assert_eq!(Difficulty::parse("epic"), Difficulty::Other("epic".to_string()));
        assert_eq!(Difficulty::Easy.color(), "#28a745");
        assert_eq!(Difficulty::Other("x".to_string()).color(), DEFAULT_COLOR);
        assert!(Difficulty::Hard.frog_rank() < Difficulty::Medium.frog_rank());
        assert!(Difficulty::Medium.frog_rank() < Difficulty::Easy.frog_rank());
    }

    #[test]
    fn entity_ids_are_monotonic() {
        let mut ids = IdSource::default();
        let a = ids.next_id();
        let b = ids.next_id();
        assert!(b > a);
        assert_eq!("#12".parse::<EntityId>().expect("parse id"), EntityId(12));
    }
}
