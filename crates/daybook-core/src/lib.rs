pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod event;
pub mod filter;
pub mod grid;
pub mod planner;
pub mod recurrence;
pub mod render;
pub mod store;
pub mod view;

use std::ffi::OsString;
use std::io::{
  self,
  BufRead,
  IsTerminal,
  Write
};

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info,
  warn
};

use crate::cli::Invocation;
use crate::commands::{
  Flow,
  Session
};
use crate::render::TextRenderer;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting daybook"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.daybookrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let mut session =
    Session::from_config(&cfg)
      .context("invalid configuration")?;
  let mut renderer =
    TextRenderer::stdout(&cfg)?;

  match Invocation::from_os_args(cli.rest)?
  {
    | Some(inv) => {
      session.execute(&inv, &mut renderer)?;
    }
    | None => {
      run_interactive(
        &mut session,
        &mut renderer
      )?;
    }
  }

  info!("done");
  Ok(())
}

/// Reads one command per line until EOF
/// or `quit`. A failing command reports
/// and the session carries on.
#[tracing::instrument(skip_all)]
pub fn run_interactive<W: Write>(
  session: &mut Session,
  renderer: &mut TextRenderer<W>
) -> anyhow::Result<()> {
  let stdin = io::stdin();
  let prompt = stdin.is_terminal();
  let show = Invocation {
    command: "show".to_string(),
    args:    vec![]
  };
  session.execute(&show, renderer)?;
  run_lines(
    session,
    stdin.lock(),
    renderer,
    prompt
  )
}

pub fn run_lines<R, W>(
  session: &mut Session,
  input: R,
  renderer: &mut TextRenderer<W>,
  prompt: bool
) -> anyhow::Result<()>
where
  R: BufRead,
  W: Write
{
  let mut lines = input.lines();

  loop {
    if prompt {
      print!("daybook> ");
      io::stdout().flush()?;
    }

    let Some(line) = lines.next() else {
      break;
    };
    let line =
      line.context("failed to read input")?;

    let inv = match cli::split_line(&line)
      .and_then(Invocation::parse)
    {
      | Ok(Some(inv)) => inv,
      | Ok(None) => continue,
      | Err(err) => {
        eprintln!("error: {err:#}");
        continue;
      }
    };

    match session.execute(&inv, renderer) {
      | Ok(Flow::Quit) => break,
      | Ok(Flow::Continue) => {}
      | Err(err) => {
        warn!(command = %inv.command, error = %err, "command failed");
        eprintln!("error: {err:#}");
      }
    }
  }

  Ok(())
}
