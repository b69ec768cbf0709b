mod calendar;
mod modifiers;
mod planning;
mod records;

use std::io::Write;

use anyhow::{Context, anyhow};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument};

use crate::cli::Invocation;
use crate::config::Config;
use crate::datetime::{local_now, local_today};
use crate::event::EntityId;
use crate::filter::CategoryFilter;
use crate::grid::ViewState;
use crate::render::TextRenderer;
use crate::store::EventStore;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "view",
        "goto",
        "today",
        "prev",
        "next",
        "day",
        "month",
        "show",
        "filter",
        "add",
        "delete",
        "info",
        "events",
        "export",
        "remind",
        "reminders",
        "unremind",
        "goal",
        "goals",
        "ungoal",
        "task",
        "tasks",
        "plan",
        "help",
        "version",
        "quit",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// Whether the session keeps reading input after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Application root. Owns every piece of state a command can touch.
#[derive(Debug)]
pub struct Session {
    store: EventStore,
    view: ViewState,
    filter: CategoryFilter,
    lead_minutes: i64,
    break_minutes: i64,
    fixed_now: Option<NaiveDateTime>,
}

impl Session {
    #[instrument(skip(cfg))]
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let mode = cfg.default_view()?;
        let filter = CategoryFilter::parse(&cfg.get("default.filter").unwrap_or_default());
        let overflow = cfg.monthly_overflow()?;
        let lead_minutes = cfg.reminder_lead_minutes()?;
        let break_minutes = cfg.break_minutes()?;

        debug!(
            view = mode.as_key(),
            %filter,
            ?overflow,
            lead_minutes,
            break_minutes,
            "session configured"
        );

        Ok(Self {
            store: EventStore::new(overflow),
            view: ViewState::new(mode, local_today()),
            filter,
            lead_minutes,
            break_minutes,
            fixed_now: None,
        })
    }

    /// Pins the session clock; the view jumps to the pinned day.
    pub fn with_fixed_now(mut self, now: NaiveDateTime) -> Self {
        self.fixed_now = Some(now);
        self.view.reference = now.date();
        self
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn filter(&self) -> &CategoryFilter {
        &self.filter
    }

    fn now(&self) -> NaiveDateTime {
        self.fixed_now.unwrap_or_else(local_now)
    }

    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Runs one command to completion. On error nothing has been changed.
    #[instrument(skip(self, inv, out), fields(command = %inv.command))]
    pub fn execute<W: Write>(
        &mut self,
        inv: &Invocation,
        out: &mut TextRenderer<W>,
    ) -> anyhow::Result<Flow> {
        let args = inv.args.as_slice();
        debug!(?args, "dispatching command");

        match inv.command.as_str() {
            "view" => calendar::cmd_view(self, args, out)?,
            "goto" => calendar::cmd_goto(self, args, out)?,
            "today" => calendar::cmd_today(self, out)?,
            "prev" => calendar::cmd_step(self, -1, out)?,
            "next" => calendar::cmd_step(self, 1, out)?,
            "day" => calendar::cmd_day(self, args, out)?,
            "month" => calendar::cmd_month(self, args, out)?,
            "show" => calendar::cmd_show(self, out)?,
            "filter" => calendar::cmd_filter(self, args, out)?,
            "add" => calendar::cmd_add(self, args, out)?,
            "delete" => calendar::cmd_delete(self, args, out)?,
            "info" => calendar::cmd_info(self, args, out)?,
            "events" => calendar::cmd_events(self, out)?,
            "export" => calendar::cmd_export(self, out)?,
            "remind" => records::cmd_remind(self, args, out)?,
            "reminders" => out.print_reminders(self.store.reminders())?,
            "unremind" => records::cmd_unremind(self, args, out)?,
            "goal" => records::cmd_goal(self, args, out)?,
            "goals" => out.print_goals(self.store.goals())?,
            "ungoal" => records::cmd_ungoal(self, args, out)?,
            "task" => planning::cmd_task(self, args, out)?,
            "tasks" => out.print_tasks(self.store.tasks())?,
            "plan" => planning::cmd_plan(self, args, out)?,
            "help" => cmd_help(out)?,
            "version" => out.line(env!("CARGO_PKG_VERSION"))?,
            "quit" => {
                info!("quit requested");
                return Ok(Flow::Quit);
            }
            other => return Err(anyhow!("unknown command: {other}")),
        }

        Ok(Flow::Continue)
    }
}

fn parse_id(args: &[String], what: &str) -> anyhow::Result<EntityId> {
    let raw = args
        .first()
        .ok_or_else(|| anyhow!("{what}: an id is required"))?;
    raw.parse::<EntityId>()
        .with_context(|| format!("{what}: bad id"))
}

fn cmd_help<W: Write>(out: &mut TextRenderer<W>) -> anyhow::Result<()> {
    const HELP: &str = "\
Views:     view <daily|weekly|monthly|yearly>, goto <date>, today, prev, next,
           day <date>, month <1-12|name> [year], show, filter <all|schedule|calendar|category>
Events:    add <title> [start:HH:MM] [end:HH:MM] [date:<date>] [category:X] [color:#hex]
               [desc:text] [recur:daily|weekly|monthly] [allday:yes]
           delete <id>, info <id>, events, export
Reminders: remind <title> at:<datetime> [desc:text], reminders, unremind <id>
Goals:     goal <title> [by:<date>] [category:X] [desc:text], goals, ungoal <id>
Planner:   task add [title] [difficulty:easy|medium|hard] [minutes:N],
           task set <id> <title|difficulty|estimate> <value>, task rm <id>, tasks,
           plan start:HH:MM end:HH:MM [breaks:N] [frog:yes] [date:<date>]
Other:     help, version, quit";
    out.line(HELP)
}
