use std::io::Write;

use anyhow::anyhow;
use tracing::instrument;

use super::modifiers::{
  Mod,
  parse_words_and_mods
};
use super::{
  Session,
  parse_id
};
use crate::event::Reminder;
use crate::render::TextRenderer;

#[instrument(skip(session, args, out))]
pub(super) fn cmd_remind<W: Write>(
  session: &mut Session,
  args: &[String],
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let parsed =
    parse_words_and_mods(args, session.now())?;
  let title = parsed.text();
  if title.trim().is_empty() {
    return Err(anyhow!(
      "remind: a title is required"
    ));
  }

  let mut fire_at = None;
  let mut description = None;
  for one_mod in parsed.mods {
    match one_mod {
      | Mod::At(at) => fire_at = Some(at),
      | Mod::Description(text) => {
        description = Some(text)
      }
      | other => {
        return Err(other.rejected("remind"));
      }
    }
  }
  let fire_at = fire_at.ok_or_else(|| {
    anyhow!(
      "remind: at:<datetime> is required"
    )
  })?;

  let id = session.store.next_id();
  let reminder = Reminder::manual(
    id,
    title,
    fire_at,
    description
  );
  session.store.add_reminder(reminder);
  out.line(&format!(
    "Created reminder {id} for {}.",
    fire_at.format("%Y-%m-%d %H:%M")
  ))
}

pub(super) fn cmd_unremind<W: Write>(
  session: &mut Session,
  args: &[String],
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let id = parse_id(args, "unremind")?;
  if session.store.remove_reminder(id) {
    out.line(&format!(
      "Deleted reminder {id}."
    ))
  } else {
    out.line(&format!("No reminder {id}."))
  }
}

#[instrument(skip(session, args, out))]
pub(super) fn cmd_goal<W: Write>(
  session: &mut Session,
  args: &[String],
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let parsed =
    parse_words_and_mods(args, session.now())?;
  let title = parsed.text();
  if title.trim().is_empty() {
    return Err(anyhow!(
      "goal: a title is required"
    ));
  }

  let mut target_date = None;
  let mut category = String::new();
  let mut description = String::new();
  for one_mod in parsed.mods {
    match one_mod {
      | Mod::By(date) | Mod::Date(date) => {
        target_date = Some(date)
      }
      | Mod::Category(text) => {
        category = text
      }
      | Mod::Description(text) => {
        description = text
      }
      | other => {
        return Err(other.rejected("goal"));
      }
    }
  }

  let created_at = session.now();
  let id = session.store.add_goal(
    title,
    description,
    target_date,
    category,
    created_at
  );
  out.line(&format!("Created goal {id}."))
}

pub(super) fn cmd_ungoal<W: Write>(
  session: &mut Session,
  args: &[String],
  out: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let id = parse_id(args, "ungoal")?;
  if session.store.remove_goal(id) {
    out.line(&format!(
      "Deleted goal {id}."
    ))
  } else {
    out.line(&format!("No goal {id}."))
  }
}
