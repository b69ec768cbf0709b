use std::io::Write;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  NaiveDate
};
use tracing::{
  debug,
  info,
  instrument
};

use super::modifiers::{
  Mod,
  parse_words_and_mods
};
use super::{
  Session,
  parse_id
};
use crate::datetime::{
  parse_date_expr,
  parse_month_name
};
use crate::event::{
  CalendarEvent,
  EntityId
};
use crate::filter::CategoryFilter;
use crate::grid::ViewMode;
use crate::render::TextRenderer;
use crate::view::render_view;

#[instrument(skip(session, out))]
pub(super) fn cmd_show<W: Write>(
  session: &Session,
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let matching = session
    .store
    .query_by_filter(&session.filter)
    .len();
  out.line(&format!(
    "{} view, {}, filter {} ({})",
    session.view.mode.as_key(),
    session
      .view
      .reference
      .format("%Y-%m-%d"),
    session.filter,
    event_count_label(matching)
  ))?;
  let shown = render_view(
    &session.store,
    &session.view,
    &session.filter,
    session.today(),
    out
  )?;
  debug!(shown, "view rendered");
  Ok(())
}

fn event_count_label(count: usize) -> String {
  if count == 1 {
    "1 event".to_string()
  } else {
    format!("{count} events")
  }
}

pub(super) fn cmd_view<W: Write>(
  session: &mut Session,
  args: &[String],
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let raw = args.first().ok_or_else(|| {
    anyhow!(
      "view: expected daily, weekly, \
       monthly or yearly"
    )
  })?;
  let mode = ViewMode::from_key(raw)
    .ok_or_else(|| {
      anyhow!("view: unknown mode {raw}")
    })?;
  session.view.select_mode(mode);
  cmd_show(session, out)
}

pub(super) fn cmd_goto<W: Write>(
  session: &mut Session,
  args: &[String],
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let date = parse_date_arg(
    session, args, "goto"
  )?;
  session.view.reference = date;
  cmd_show(session, out)
}

pub(super) fn cmd_today<W: Write>(
  session: &mut Session,
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  session.view.reference =
    session.today();
  cmd_show(session, out)
}

pub(super) fn cmd_step<W: Write>(
  session: &mut Session,
  step: i64,
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  session.view.shift(step);
  cmd_show(session, out)
}

pub(super) fn cmd_day<W: Write>(
  session: &mut Session,
  args: &[String],
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let date =
    parse_date_arg(session, args, "day")?;
  session.view.drill_into_day(date);
  cmd_show(session, out)
}

pub(super) fn cmd_month<W: Write>(
  session: &mut Session,
  args: &[String],
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let raw = args.first().ok_or_else(|| {
    anyhow!(
      "month: a month number or name is \
       required"
    )
  })?;
  let month = match raw.parse::<u32>() {
    | Ok(n) if (1..=12).contains(&n) => n,
    | Ok(n) => {
      return Err(anyhow!(
        "month: {n} is not between 1 \
         and 12"
      ));
    }
    | Err(_) => {
      parse_month_name(
        &raw.to_ascii_lowercase()
      )
      .ok_or_else(|| {
        anyhow!(
          "month: unknown month {raw}"
        )
      })?
    }
  };
  let year = match args.get(1) {
    | Some(raw_year) => {
      raw_year.parse::<i32>().with_context(
        || {
          format!(
            "month: bad year {raw_year}"
          )
        }
      )?
    }
    | None => session.view.reference.year()
  };

  session
    .view
    .drill_into_month(year, month);
  cmd_show(session, out)
}

pub(super) fn cmd_filter<W: Write>(
  session: &mut Session,
  args: &[String],
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  session.filter =
    CategoryFilter::parse(&args.join(" "));
  info!(filter = %session.filter, "filter changed");
  cmd_show(session, out)
}

/// Nothing is stored unless both the
/// event and its reminder can be built.
#[instrument(skip(session, args, out))]
pub(super) fn cmd_add<W: Write>(
  session: &mut Session,
  args: &[String],
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let parsed =
    parse_words_and_mods(args, session.now())?;
  let title = parsed.text();
  if title.trim().is_empty() {
    return Err(anyhow!(
      "add: a title is required"
    ));
  }

  let mut draft = CalendarEvent::new(
    EntityId(0),
    title,
    session.view.reference
  );
  for one_mod in parsed.mods {
    match one_mod {
      | Mod::Start(time) => {
        draft.start = Some(time)
      }
      | Mod::End(time) => {
        draft.end = Some(time)
      }
      | Mod::Date(date) => {
        draft.date = date
      }
      | Mod::Category(category) => {
        draft.category = category
      }
      | Mod::Color(color) => {
        draft.color = color
      }
      | Mod::Description(text) => {
        draft.description = text
      }
      | Mod::Recur(recurrence) => {
        draft.recurrence = recurrence
      }
      | Mod::AllDay(all_day) => {
        draft.all_day = all_day
      }
      | other => {
        return Err(other.rejected("add"));
      }
    }
  }

  let (id, reminder_id) = session
    .store
    .add_with_reminder(
      draft,
      session.lead_minutes
    )?;

  out.line(&format!(
    "Created event {id}."
  ))?;
  if let Some(reminder) = session
    .store
    .reminders()
    .iter()
    .find(|r| r.id == reminder_id)
  {
    out.line(&format!(
      "Reminder {} fires at {}.",
      reminder.id,
      reminder
        .fire_at
        .format("%Y-%m-%d %H:%M")
    ))?;
  }
  Ok(())
}

pub(super) fn cmd_delete<W: Write>(
  session: &mut Session,
  args: &[String],
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let id = parse_id(args, "delete")?;
  if session.store.remove(id) {
    out.line(&format!(
      "Deleted event {id}."
    ))
  } else {
    out.line(&format!("No event {id}."))
  }
}

pub(super) fn cmd_info<W: Write>(
  session: &Session,
  args: &[String],
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let id = parse_id(args, "info")?;
  let event =
    session.store.event(id).ok_or_else(
      || anyhow!("event not found: {id}")
    )?;
  out.print_event_info(event)
}

pub(super) fn cmd_events<W: Write>(
  session: &Session,
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let events = session
    .store
    .query_by_filter(&session.filter);
  out.print_event_table(&events)
}

#[instrument(skip(session, out))]
pub(super) fn cmd_export<W: Write>(
  session: &Session,
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let events = session
    .store
    .query_by_filter(&session.filter);
  let json = serde_json::to_string(&events)
    .context("failed to encode events")?;
  out.line(&json)
}

fn parse_date_arg(
  session: &Session,
  args: &[String],
  what: &str
) -> anyhow::Result<NaiveDate> {
  let raw = args.first().ok_or_else(|| {
    anyhow!("{what}: a date is required")
  })?;
  parse_date_expr(raw, session.today())
    .with_context(|| {
      format!("{what}: bad date {raw}")
    })
}
