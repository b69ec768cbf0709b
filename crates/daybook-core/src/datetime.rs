use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Local,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeDelta,
  Timelike,
  Weekday
};
use regex::Regex;

pub const MONTH_ABBREVS: [&str; 12] = [
  "JAN", "FEB", "MAR", "APR", "MAY",
  "JUN", "JUL", "AUG", "SEP", "OCT",
  "NOV", "DEC"
];

pub const MONTH_NAMES: [&str; 12] = [
  "January",
  "February",
  "March",
  "April",
  "May",
  "June",
  "July",
  "August",
  "September",
  "October",
  "November",
  "December"
];

pub const WEEKDAY_ABBREVS: [&str; 7] = [
  "SUN", "MON", "TUE", "WED", "THU",
  "FRI", "SAT"
];

#[must_use]
pub fn local_today() -> NaiveDate {
  Local::now().date_naive()
}

#[must_use]
pub fn local_now() -> NaiveDateTime {
  Local::now().naive_local()
}

/// Label of the hourly row an hour of
/// the day belongs to, e.g. `9:00 AM`.
#[must_use]
pub fn hour_label(hour: u32) -> String {
  let ampm =
    if hour < 12 { "AM" } else { "PM" };
  let display = if hour % 12 == 0 {
    12
  } else {
    hour % 12
  };
  format!("{display}:00 {ampm}")
}

#[must_use]
pub fn slot_label(
  time: NaiveTime
) -> String {
  hour_label(time.hour())
}

#[must_use]
pub fn format_clock(
  time: NaiveTime
) -> String {
  time.format("%H:%M").to_string()
}

#[must_use]
pub fn month_abbrev(
  date: NaiveDate
) -> &'static str {
  MONTH_ABBREVS[date.month0() as usize]
}

#[must_use]
pub fn weekday_abbrev(
  date: NaiveDate
) -> &'static str {
  WEEKDAY_ABBREVS[date
    .weekday()
    .num_days_from_sunday()
    as usize]
}

#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  checked_add_days(date, days)
    .unwrap_or(date)
}

/// `None` when the result falls outside
/// the representable calendar.
#[must_use]
pub fn checked_add_days(
  date: NaiveDate,
  days: i64
) -> Option<NaiveDate> {
  TimeDelta::try_days(days).and_then(
    |delta| date.checked_add_signed(delta)
  )
}

fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

#[must_use]
pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

#[must_use]
pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

#[must_use]
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  checked_shift_months(
    date,
    i64::from(months)
  )
  .unwrap_or(date)
}

/// Moves `date` by whole months, clamping
/// the day to the target month's length.
#[must_use]
pub fn checked_shift_months(
  date: NaiveDate,
  months: i64
) -> Option<NaiveDate> {
  let index = i64::from(date.year())
    .checked_mul(12)?
    .checked_add(i64::from(date.month0()))?
    .checked_add(months)?;
  let year =
    i32::try_from(index.div_euclid(12))
      .ok()?;
  let month =
    u32::try_from(index.rem_euclid(12))
      .ok()?
      + 1;
  let day = date
    .day()
    .min(days_in_month(year, month));
  NaiveDate::from_ymd_opt(
    year, month, day
  )
}

#[must_use]
pub fn shift_years(
  date: NaiveDate,
  years: i32
) -> NaiveDate {
  checked_shift_months(
    date,
    i64::from(years) * 12
  )
  .unwrap_or(date)
}

/// Parses a form-style time of day:
/// `HH:MM`, `H:MM` or a 12-hour clock
/// such as `3:23pm`.
#[tracing::instrument(fields(input = input))]
pub fn parse_time_of_day(
  input: &str
) -> anyhow::Result<NaiveTime> {
  let (hour, minute) =
    parse_clock_time(input).ok_or_else(
      || {
        anyhow!(
          "invalid time of day: \
           {input}"
        )
      }
    )?;
  NaiveTime::from_hms_opt(
    hour, minute, 0
  )
  .ok_or_else(|| {
    anyhow!(
      "time out of range: {input}"
    )
  })
}

#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return Ok(add_days(today, -1));
    }
    | _ => {}
  }

  if token.len() == 4
    && token
      .chars()
      .all(|c| c.is_ascii_digit())
  {
    let year: i32 =
      token.parse().context(
        "invalid 4-digit year"
      )?;
    return NaiveDate::from_ymd_opt(
      year, 1, 1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid year value: {year}"
      )
    });
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today,
      target_weekday
    ));
  }

  if let Some(target_month) =
    parse_month_name(&lower)
  {
    let this_year =
      first_day_of_month(
        today.year(),
        target_month
      );
    return Ok(if this_year <= today {
      first_day_of_month(
        today.year().saturating_add(1),
        target_month
      )
    } else {
      this_year
    });
  }

  if let Some(caps) = relative_re()
    .and_then(|re| re.captures(token))
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;
    let signed =
      if sign == "-" { -num } else { num };

    let shifted = match unit {
      | "d" => {
        checked_add_days(today, signed)
      }
      | "w" => signed
        .checked_mul(7)
        .and_then(|days| {
          checked_add_days(today, days)
        }),
      | "m" => {
        checked_shift_months(today, signed)
      }
      | "y" => signed
        .checked_mul(12)
        .and_then(|months| {
          checked_shift_months(
            today, months
          )
        }),
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    };
    return shifted.ok_or_else(|| {
      anyhow!(
        "relative date out of range: \
         {token}"
      )
    });
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, 4-digit \
     year, weekday names (e.g. \
     monday), month names (e.g. \
     march), +Nd/+Nw/+Nm/+Ny, \
     YYYY-MM-DD"
  })
}

/// Parses a reminder fire time. A bare
/// clock time means today, a bare date
/// means midnight.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_datetime_expr(
  input: &str,
  now: NaiveDateTime
) -> anyhow::Result<NaiveDateTime> {
  let token = input.trim();

  for fmt in [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(ndt);
    }
  }

  if let Some((date_part, time_part)) =
    token.split_once('@')
  {
    let date = parse_date_expr(
      date_part,
      now.date()
    )?;
    let time =
      parse_time_of_day(time_part)?;
    return Ok(date.and_time(time));
  }

  if let Ok(time) =
    parse_time_of_day(token)
  {
    return Ok(now.date().and_time(time));
  }

  let date =
    parse_date_expr(token, now.date())?;
  Ok(date.and_time(NaiveTime::MIN))
}

fn relative_re() -> Option<&'static Regex>
{
  static RELATIVE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  RELATIVE
    .get_or_init(|| {
      Regex::new(
        r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dwmy])$",
      )
      .ok()
    })
    .as_ref()
}

fn clock_re() -> Option<&'static Regex> {
  static CLOCK: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  CLOCK
    .get_or_init(|| {
      Regex::new(
        r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<ampm>[ap]m)?$",
      )
      .ok()
    })
    .as_ref()
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  add_days(from, delta)
}

fn parse_clock_time(
  token: &str
) -> Option<(u32, u32)> {
  let captures =
    clock_re()?.captures(token.trim())?;

  let raw_hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = captures
    .name("minute")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  if minute > 59 {
    return None;
  }

  let hour = if let Some(ampm_match) =
    captures.name("ampm")
  {
    let ampm = ampm_match
      .as_str()
      .to_ascii_lowercase();
    if raw_hour == 0 || raw_hour > 12 {
      return None;
    }
    match ampm.as_str() {
      | "am" => {
        if raw_hour == 12 {
          0
        } else {
          raw_hour
        }
      }
      | "pm" => {
        if raw_hour == 12 {
          12
        } else {
          raw_hour + 12
        }
      }
      | _ => return None
    }
  } else {
    if raw_hour > 23 {
      return None;
    }
    raw_hour
  };

  Some((hour, minute))
}

/// Lowercase month name or abbreviation
/// to its number.
pub fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}


/// Serializes optional times of day as
/// the `HH:MM` strings the forms use.
pub mod clock_serde {
  pub mod option {
    use chrono::NaiveTime;
    use serde::Serializer;

    pub fn serialize<S>(
      time: &Option<NaiveTime>,
      serializer: S
    ) -> Result<S::Ok, S::Error>
    where
      S: Serializer
    {
      match time {
        | Some(value) => {
          serializer.serialize_str(
            &value
              .format("%H:%M")
              .to_string()
          )
        }
        | None => {
          serializer.serialize_none()
        }
      }
    }
  }
}
