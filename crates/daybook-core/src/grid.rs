//! Date and time-slot layout for the
//! four calendar views.
//!
//! Everything here is a pure function
//! of a [`ViewState`] and "today"; the
//! resulting [`Grid`] is plain data for
//! a view layer to draw.

use chrono::{
  Datelike,
  NaiveDate
};
use serde::Serialize;
use tracing::debug;

use crate::datetime::{
  MONTH_NAMES,
  WEEKDAY_ABBREVS,
  add_days,
  days_in_month,
  hour_label,
  month_abbrev,
  shift_months,
  shift_years,
  weekday_abbrev
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
  Daily,
  Weekly,
  Monthly,
  Yearly
}

impl ViewMode {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Daily => "daily",
      | Self::Weekly => "weekly",
      | Self::Monthly => "monthly",
      | Self::Yearly => "yearly"
    }
  }

  pub fn from_key(
    key: &str
  ) -> Option<Self> {
    match key
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "daily" | "day" => {
        Some(Self::Daily)
      }
      | "weekly" | "week" => {
        Some(Self::Weekly)
      }
      | "monthly" | "month" => {
        Some(Self::Monthly)
      }
      | "yearly" | "year" => {
        Some(Self::Yearly)
      }
      | _ => None
    }
  }
}

/// Current view mode and the date the
/// grid is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
  pub mode:      ViewMode,
  pub reference: NaiveDate
}

impl ViewState {
  pub fn new(
    mode: ViewMode,
    reference: NaiveDate
  ) -> Self {
    Self {
      mode,
      reference
    }
  }

  pub fn select_mode(
    &mut self,
    mode: ViewMode
  ) {
    debug!(from = self.mode.as_key(), to = mode.as_key(), "switching view");
    self.mode = mode;
  }

  /// Clicking a day opens the daily
  /// view on it.
  pub fn drill_into_day(
    &mut self,
    date: NaiveDate
  ) {
    self.mode = ViewMode::Daily;
    self.reference = date;
  }

  /// Clicking a month card opens the
  /// monthly view on its first day.
  pub fn drill_into_month(
    &mut self,
    year: i32,
    month: u32
  ) {
    if let Some(first) =
      NaiveDate::from_ymd_opt(
        year, month, 1
      )
    {
      self.mode = ViewMode::Monthly;
      self.reference = first;
    }
  }

  /// Moves the reference date by `step`
  /// units of the current view.
  pub fn shift(&mut self, step: i64) {
    self.reference = match self.mode {
      | ViewMode::Daily => {
        add_days(self.reference, step)
      }
      | ViewMode::Weekly => {
        add_days(
          self.reference,
          step * 7
        )
      }
      | ViewMode::Monthly => {
        shift_months(
          self.reference,
          step as i32
        )
      }
      | ViewMode::Yearly => {
        shift_years(
          self.reference,
          step as i32
        )
      }
    };
  }
}

/// Sunday through Saturday of the week
/// containing `date`.
#[must_use]
pub fn week_dates(
  date: NaiveDate
) -> [NaiveDate; 7] {
  let back = i64::from(
    date.weekday().num_days_from_sunday()
  );
  let sunday = add_days(date, -back);
  std::array::from_fn(|offset| {
    add_days(sunday, offset as i64)
  })
}

/// Every day of the month containing
/// `date`, first to last.
#[must_use]
pub fn month_dates(
  date: NaiveDate
) -> Vec<NaiveDate> {
  let days = days_in_month(
    date.year(),
    date.month()
  );
  (1..=days)
    .filter_map(|day| {
      NaiveDate::from_ymd_opt(
        date.year(),
        date.month(),
        day
      )
    })
    .collect()
}

#[must_use]
pub fn time_slots() -> Vec<String> {
  (0..24).map(hour_label).collect()
}

/// `DD MON` over `DOW`, e.g. `5 MAR`
/// then `THU`.
#[must_use]
pub fn format_day_label(
  date: NaiveDate
) -> String {
  format!(
    "{} {}\n{}",
    date.day(),
    month_abbrev(date),
    weekday_abbrev(date)
  )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateColumn {
  pub date:     NaiveDate,
  pub label:    String,
  pub selected: bool,
  pub today:    bool
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeTable {
  pub columns: Vec<DateColumn>,
  pub slots:   Vec<String>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCell {
  pub date:     NaiveDate,
  pub selected: bool,
  pub today:    bool
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthGrid {
  pub year:    i32,
  pub month:   u32,
  pub headers: [&'static str; 7],
  pub weeks:   Vec<[Option<DayCell>; 7]>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCard {
  pub year:    i32,
  pub month:   u32,
  pub name:    &'static str,
  pub current: bool
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearGrid {
  pub year:  i32,
  pub cards: Vec<MonthCard>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Grid {
  Day(TimeTable),
  Week(TimeTable),
  Month(MonthGrid),
  Year(YearGrid)
}

/// Addresses one cell of a [`Grid`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
)]
pub enum CellRef {
  Slot { row: usize, column: usize },
  Day { week: usize, weekday: usize },
  MonthCard { month: u32 }
}

fn date_column(
  date: NaiveDate,
  state: &ViewState,
  today: NaiveDate
) -> DateColumn {
  DateColumn {
    date,
    label: format_day_label(date),
    selected: date == state.reference,
    today: date == today
  }
}

#[tracing::instrument]
pub fn build_grid(
  state: &ViewState,
  today: NaiveDate
) -> Grid {
  match state.mode {
    | ViewMode::Daily => {
      Grid::Day(TimeTable {
        columns: vec![date_column(
          state.reference,
          state,
          today
        )],
        slots:   time_slots()
      })
    }
    | ViewMode::Weekly => {
      Grid::Week(TimeTable {
        columns: week_dates(
          state.reference
        )
        .into_iter()
        .map(|date| {
          date_column(date, state, today)
        })
        .collect(),
        slots:   time_slots()
      })
    }
    | ViewMode::Monthly => {
      Grid::Month(build_month_grid(
        state, today
      ))
    }
    | ViewMode::Yearly => {
      let year = state.reference.year();
      Grid::Year(YearGrid {
        year,
        cards: (1..=12_u32)
          .map(|month| {
            MonthCard {
              year,
              month,
              name: MONTH_NAMES
                [month as usize - 1],
              current: month
                == state
                  .reference
                  .month()
            }
          })
          .collect()
      })
    }
  }
}

fn build_month_grid(
  state: &ViewState,
  today: NaiveDate
) -> MonthGrid {
  let dates =
    month_dates(state.reference);
  let mut weeks = Vec::new();
  let mut week: [Option<DayCell>; 7] =
    Default::default();

  for date in dates {
    let weekday = date
      .weekday()
      .num_days_from_sunday()
      as usize;
    week[weekday] = Some(DayCell {
      date,
      selected: date == state.reference,
      today: date == today
    });
    if weekday == 6 {
      weeks.push(std::mem::take(
        &mut week
      ));
    }
  }
  if week.iter().any(Option::is_some) {
    weeks.push(week);
  }

  MonthGrid {
    year: state.reference.year(),
    month: state.reference.month(),
    headers: WEEKDAY_ABBREVS,
    weeks
  }
}
