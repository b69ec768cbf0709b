use std::io::Write;

use anyhow::anyhow;
use tracing::{
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
use crate::planner::{
  PlanOptions,
  ScheduleWindow,
  plan_into_store
};
use crate::render::TextRenderer;
use crate::store::TaskField;

/// `task add|set|rm ...`
pub(super) fn cmd_task<W: Write>(
  session: &mut Session,
  args: &[String],
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let Some((sub, rest)) = args.split_first()
  else {
    return Err(anyhow!(
      "task: expected add, set or rm"
    ));
  };

  match sub.to_ascii_lowercase().as_str() {
    | "add" => task_add(session, rest, out),
    | "set" | "modify" => {
      task_set(session, rest, out)
    }
    | "rm" | "remove" | "delete" => {
      let id = parse_id(rest, "task rm")?;
      if session.store.remove_task(id) {
        out.line(&format!(
          "Removed task {id}."
        ))
      } else {
        out.line(&format!("No task {id}."))
      }
    }
    | other => {
      Err(anyhow!(
        "task: unknown subcommand {other}"
      ))
    }
  }
}

fn task_add<W: Write>(
  session: &mut Session,
  args: &[String],
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let parsed =
    parse_words_and_mods(args, session.now())?;
  let title = parsed.text();

  let mut difficulty = None;
  let mut minutes = None;
  for one_mod in parsed.mods {
    match one_mod {
      | Mod::Difficulty(value) => {
        difficulty = Some(value)
      }
      | Mod::Minutes(value) => {
        minutes = Some(value)
      }
      | other => {
        return Err(
          other.rejected("task add")
        );
      }
    }
  }

  let id = session.store.add_task();
  if !title.is_empty() {
    session.store.update_task(
      id,
      TaskField::Title,
      &title
    )?;
  }
  if let Some(difficulty) = difficulty {
    session.store.update_task(
      id,
      TaskField::Difficulty,
      difficulty.as_str()
    )?;
  }
  if let Some(minutes) = minutes {
    session.store.update_task(
      id,
      TaskField::Estimate,
      &minutes.to_string()
    )?;
  }

  out.line(&format!("Created task {id}."))
}

fn task_set<W: Write>(
  session: &mut Session,
  args: &[String],
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let id = parse_id(args, "task set")?;
  let field: TaskField = args
    .get(1)
    .ok_or_else(|| {
      anyhow!(
        "task set: expected title, \
         difficulty or estimate"
      )
    })?
    .parse()?;
  let value = args
    .get(2..)
    .map(|words| words.join(" "))
    .unwrap_or_default();

  session
    .store
    .update_task(id, field, &value)?;
  out.line(&format!("Updated task {id}."))
}

/// Validates the window first; only a
/// valid window consumes the task list.
#[instrument(skip(session, args, out))]
pub(super) fn cmd_plan<W: Write>(
  session: &mut Session,
  args: &[String],
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let parsed =
    parse_words_and_mods(args, session.now())?;
  if let Some(word) = parsed.words.first() {
    return Err(anyhow!(
      "plan: unexpected argument {word}"
    ));
  }

  let mut start = None;
  let mut end = None;
  let mut date = session.view.reference;
  let mut options = PlanOptions {
    break_minutes: session.break_minutes,
    eat_the_frog:  false
  };
  for one_mod in parsed.mods {
    match one_mod {
      | Mod::Start(time) => start = Some(time),
      | Mod::End(time) => end = Some(time),
      | Mod::Date(day) => date = day,
      | Mod::Breaks(minutes) => {
        options.break_minutes = minutes
      }
      | Mod::Frog(frog) => {
        options.eat_the_frog = frog
      }
      | other => {
        return Err(other.rejected("plan"));
      }
    }
  }
  let window =
    ScheduleWindow::new(start, end)?;

  let pending = session.store.tasks().len();
  let added = plan_into_store(
    &mut session.store,
    window,
    options,
    date
  );
  info!(
    planned = added.len(),
    pending, "plan command finished"
  );

  out.line(&format!(
    "Planned {} of {pending} tasks.",
    added.len()
  ))?;
  let events: Vec<_> = added
    .iter()
    .filter_map(|id| session.store.event(*id))
    .collect();
  out.print_event_table(&events)
}
