use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::event::{
  DEFAULT_REMINDER_LEAD_MINUTES,
  MAX_REMINDER_LEAD_MINUTES
};
use crate::grid::ViewMode;
use crate::planner::MAX_BREAK_MINUTES;
use crate::recurrence::MonthlyOverflow;

const RC_ENV_VAR: &str = "DAYBOOKRC";
const RC_FILE_NAME: &str = ".daybookrc";

#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    for (key, value) in [
      ("default.view", "weekly"),
      ("default.filter", "all"),
      ("color", "on"),
      ("reminder.lead_minutes", "15"),
      ("schedule.break_minutes", "0"),
      (
        "recurrence.monthly_overflow",
        "skip"
      )
    ] {
      map.insert(
        key.to_string(),
        value.to_string()
      );
    }
    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc = resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading daybookrc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no daybookrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_i64(
    &self,
    key: &str
  ) -> anyhow::Result<Option<i64>> {
    self
      .map
      .get(key)
      .map(|raw| {
        raw.trim().parse::<i64>().with_context(
          || {
            format!(
              "config {key} must be an \
               integer, got {raw:?}"
            )
          }
        )
      })
      .transpose()
  }

  pub fn default_view(
    &self
  ) -> anyhow::Result<ViewMode> {
    let raw = self
      .get("default.view")
      .unwrap_or_default();
    ViewMode::from_key(&raw).ok_or_else(
      || {
        anyhow!(
          "invalid default.view: {raw}"
        )
      }
    )
  }

  pub fn monthly_overflow(
    &self
  ) -> anyhow::Result<MonthlyOverflow> {
    let raw = self
      .get("recurrence.monthly_overflow")
      .unwrap_or_default();
    MonthlyOverflow::from_key(&raw)
      .ok_or_else(|| {
        anyhow!(
          "invalid \
           recurrence.monthly_overflow: \
           {raw} (expected skip or clamp)"
        )
      })
  }

  pub fn reminder_lead_minutes(
    &self
  ) -> anyhow::Result<i64> {
    let minutes = self
      .get_i64("reminder.lead_minutes")?
      .unwrap_or(
        DEFAULT_REMINDER_LEAD_MINUTES
      );
    if !(0..=MAX_REMINDER_LEAD_MINUTES)
      .contains(&minutes)
    {
      return Err(anyhow!(
        "reminder.lead_minutes must be \
         between 0 and \
         {MAX_REMINDER_LEAD_MINUTES}: \
         {minutes}"
      ));
    }
    Ok(minutes)
  }

  pub fn break_minutes(
    &self
  ) -> anyhow::Result<i64> {
    let minutes = self
      .get_i64("schedule.break_minutes")?
      .unwrap_or(0);
    if !(0..=MAX_BREAK_MINUTES)
      .contains(&minutes)
    {
      return Err(anyhow!(
        "schedule.break_minutes must be \
         between 0 and \
         {MAX_BREAK_MINUTES}: {minutes}"
      ));
    }
    Ok(minutes)
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping daybookrc"
    );
    return Ok(None);
  };
  let candidate = home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}
