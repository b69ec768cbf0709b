use std::fmt;

use tracing::trace;

use crate::event::{
  CalendarEvent,
  SCHEDULE_CATEGORY
};

/// Category filter applied before any
/// event reaches a view.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub enum CategoryFilter {
  #[default]
  All,
  Schedule,
  Calendar,
  Exact(String)
}

impl CategoryFilter {
  #[tracing::instrument]
  pub fn parse(raw: &str) -> Self {
    let trimmed = raw.trim();
    match trimmed
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" | "" => Self::All,
      | "schedule" => Self::Schedule,
      | "calendar" => Self::Calendar,
      | _ => {
        Self::Exact(trimmed.to_string())
      }
    }
  }

  pub fn matches(
    &self,
    event: &CalendarEvent
  ) -> bool {
    let ok = match self {
      | Self::All => true,
      | Self::Schedule => {
        event.category
          == SCHEDULE_CATEGORY
      }
      | Self::Calendar => {
        event.category
          != SCHEDULE_CATEGORY
      }
      | Self::Exact(category) => {
        event.category == *category
      }
    };
    trace!(filter = %self, event = %event.id, ok, "evaluated category filter");
    ok
  }
}

impl fmt::Display for CategoryFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | Self::All => f.write_str("all"),
      | Self::Schedule => {
        f.write_str("schedule")
      }
      | Self::Calendar => {
        f.write_str("calendar")
      }
      | Self::Exact(category) => {
        f.write_str(category)
      }
    }
  }
}
