use anyhow::{
  Context,
  anyhow
};
use chrono::{
  NaiveDate,
  NaiveDateTime,
  NaiveTime
};
use tracing::instrument;

use crate::datetime::{
  parse_date_expr,
  parse_datetime_expr,
  parse_time_of_day
};
use crate::event::{
  Difficulty,
  MAX_TASK_MINUTES
};
use crate::planner::MAX_BREAK_MINUTES;
use crate::recurrence::Recurrence;

/// One `key:value` token of a command
/// line.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Mod {
  Start(NaiveTime),
  End(NaiveTime),
  Date(NaiveDate),
  At(NaiveDateTime),
  By(NaiveDate),
  Category(String),
  Color(String),
  Description(String),
  Recur(Recurrence),
  AllDay(bool),
  Difficulty(Difficulty),
  Minutes(i64),
  Breaks(i64),
  Frog(bool)
}

impl Mod {
  pub(super) fn key(&self) -> &'static str {
    match self {
      | Self::Start(_) => "start",
      | Self::End(_) => "end",
      | Self::Date(_) => "date",
      | Self::At(_) => "at",
      | Self::By(_) => "by",
      | Self::Category(_) => "category",
      | Self::Color(_) => "color",
      | Self::Description(_) => "desc",
      | Self::Recur(_) => "recur",
      | Self::AllDay(_) => "allday",
      | Self::Difficulty(_) => {
        "difficulty"
      }
      | Self::Minutes(_) => "minutes",
      | Self::Breaks(_) => "breaks",
      | Self::Frog(_) => "frog"
    }
  }

  /// Error for a modifier the command
  /// does not take.
  pub(super) fn rejected(
    &self,
    command: &str
  ) -> anyhow::Error {
    anyhow!(
      "{command}: {}: is not accepted \
       here",
      self.key()
    )
  }
}

/// Free words plus the modifiers found
/// between them.
#[derive(Debug, Default)]
pub(super) struct Parsed {
  pub words: Vec<String>,
  pub mods:  Vec<Mod>
}

impl Parsed {
  pub(super) fn text(&self) -> String {
    self.words.join(" ")
  }
}

#[instrument(skip(args, now))]
pub(super) fn parse_words_and_mods(
  args: &[String],
  now: NaiveDateTime
) -> anyhow::Result<Parsed> {
  let mut parsed = Parsed::default();

  let mut literal = false;
  for arg in args {
    if arg == "--" {
      literal = true;
      continue;
    }

    if !literal
      && let Some(one_mod) =
        parse_one_mod(arg, now)?
    {
      parsed.mods.push(one_mod);
      continue;
    }

    parsed.words.push(arg.clone());
  }

  Ok(parsed)
}

fn parse_one_mod(
  tok: &str,
  now: NaiveDateTime
) -> anyhow::Result<Option<Mod>> {
  let Some((key, value)) =
    tok.split_once(':')
  else {
    return Ok(None);
  };

  let key = key.to_ascii_lowercase();
  let one_mod = match key.as_str() {
    | "start" => {
      Mod::Start(parse_time_of_day(
        value
      )?)
    }
    | "end" => {
      Mod::End(parse_time_of_day(value)?)
    }
    | "date" | "on" => {
      Mod::Date(parse_date_expr(
        value,
        now.date()
      )?)
    }
    | "at" => {
      Mod::At(parse_datetime_expr(
        value, now
      )?)
    }
    | "by" => {
      Mod::By(parse_date_expr(
        value,
        now.date()
      )?)
    }
    | "category" | "cat" => {
      Mod::Category(value.to_string())
    }
    | "color" => {
      Mod::Color(parse_color(value)?)
    }
    | "desc" | "description" => {
      Mod::Description(value.to_string())
    }
    | "recur" | "repeat" => {
      Mod::Recur(parse_recurrence(value)?)
    }
    | "allday" => {
      Mod::AllDay(parse_flag(
        &key, value
      )?)
    }
    | "difficulty" | "diff" => {
      Mod::Difficulty(Difficulty::parse(
        value
      ))
    }
    | "minutes" | "estimate" => {
      Mod::Minutes(parse_positive(
        &key,
        value,
        MAX_TASK_MINUTES
      )?)
    }
    | "breaks" | "break" => {
      Mod::Breaks(parse_count(
        &key,
        value,
        MAX_BREAK_MINUTES
      )?)
    }
    | "frog" => {
      Mod::Frog(parse_flag(&key, value)?)
    }
    | _ => return Ok(None)
  };

  Ok(Some(one_mod))
}

fn parse_recurrence(
  value: &str
) -> anyhow::Result<Recurrence> {
  Recurrence::from_key(value).ok_or_else(
    || {
      anyhow!(
        "recur: expected daily, weekly \
         or monthly, got {value:?}"
      )
    }
  )
}

fn parse_color(
  value: &str
) -> anyhow::Result<String> {
  let hex = value.strip_prefix('#');
  match hex {
    | Some(digits)
      if matches!(digits.len(), 3 | 6)
        && digits
          .chars()
          .all(|c| c.is_ascii_hexdigit()) =>
    {
      Ok(value.to_ascii_lowercase())
    }
    | _ => {
      Err(anyhow!(
        "color must be #rgb or \
         #rrggbb, got {value:?}"
      ))
    }
  }
}

fn parse_flag(
  key: &str,
  value: &str
) -> anyhow::Result<bool> {
  match value
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "" | "1" | "y" | "yes" | "on"
    | "true" => Ok(true),
    | "0" | "n" | "no" | "off"
    | "false" => Ok(false),
    | other => {
      Err(anyhow!(
        "{key}: expected yes or no, got \
         {other:?}"
      ))
    }
  }
}

fn parse_count(
  key: &str,
  value: &str,
  max: i64
) -> anyhow::Result<i64> {
  let n: i64 = value
    .trim()
    .parse()
    .with_context(|| {
      format!(
        "{key}: not a number: {value:?}"
      )
    })?;
  if n < 0 {
    return Err(anyhow!(
      "{key}: cannot be negative"
    ));
  }
  if n > max {
    return Err(anyhow!(
      "{key}: at most {max}, got {n}"
    ));
  }
  Ok(n)
}

fn parse_positive(
  key: &str,
  value: &str,
  max: i64
) -> anyhow::Result<i64> {
  let n = parse_count(key, value, max)?;
  if n == 0 {
    return Err(anyhow!(
      "{key}: must be positive"
    ));
  }
  Ok(n)
}
