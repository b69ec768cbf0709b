use chrono::{
  Datelike,
  NaiveDate
};
use serde::Serialize;
use tracing::trace;

use crate::datetime::days_in_month;
use crate::event::CalendarEvent;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize
)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
  #[default]
  None,
  Daily,
  Weekly,
  Monthly
}

impl Recurrence {
  /// Unknown recurrence names yield
  /// `None` so the caller decides
  /// whether that is an error.
  pub fn from_key(
    key: &str
  ) -> Option<Self> {
    match key
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "none" | "no" | "" => {
        Some(Self::None)
      }
      | "daily" => Some(Self::Daily),
      | "weekly" => Some(Self::Weekly),
      | "monthly" => Some(Self::Monthly),
      | _ => None
    }
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::None => "none",
      | Self::Daily => "daily",
      | Self::Weekly => "weekly",
      | Self::Monthly => "monthly"
    }
  }
}

/// What a monthly event does in months
/// shorter than its anchor day.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub enum MonthlyOverflow {
  #[default]
  Skip,
  Clamp
}

impl MonthlyOverflow {
  pub fn from_key(
    key: &str
  ) -> Option<Self> {
    match key
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "skip" => Some(Self::Skip),
      | "clamp" => Some(Self::Clamp),
      | _ => None
    }
  }
}

#[must_use]
pub fn is_visible(
  event: &CalendarEvent,
  date: NaiveDate,
  overflow: MonthlyOverflow
) -> bool {
  let anchor = event.date;
  let visible = match event.recurrence {
    | Recurrence::None => date == anchor,
    | Recurrence::Daily => date >= anchor,
    | Recurrence::Weekly => {
      date >= anchor
        && date.weekday()
          == anchor.weekday()
    }
    | Recurrence::Monthly => {
      date >= anchor
        && monthly_day_matches(
          anchor, date, overflow
        )
    }
  };

  trace!(
    event = %event.id,
    %date,
    recurrence = event.recurrence.as_key(),
    visible,
    "matched event against date"
  );
  visible
}

fn monthly_day_matches(
  anchor: NaiveDate,
  date: NaiveDate,
  overflow: MonthlyOverflow
) -> bool {
  if date.day() == anchor.day() {
    return true;
  }

  match overflow {
    | MonthlyOverflow::Skip => false,
    | MonthlyOverflow::Clamp => {
      let last = days_in_month(
        date.year(),
        date.month()
      );
      anchor.day() > last
        && date.day() == last
    }
  }
}
