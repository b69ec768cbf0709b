use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::{expand_command_abbrev, known_command_names};

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "daybook",
    version,
    about = "Daybook: terminal calendar with reminders, goals and a day planner",
    disable_help_subcommand = true,
    arg_required_else_help = false
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "daybookrc")]
    pub daybookrc: Option<PathBuf>,

    /// Run one command and exit; without it commands are read from stdin.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = match (quiet, verbose) {
        (2.., _) => "error",
        (1, _) => "warn",
        (0, 3..) => "trace",
        (0, 2) => "debug",
        (0, 1) => "info",
        _ => "warn",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` overrides out of argv.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

/// Splits an input line into words. Double quotes group words, so
/// `desc:"quarterly review"` stays one token.
pub fn split_line(line: &str) -> anyhow::Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err(anyhow!("unterminated quote in: {line}"));
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// One resolved command and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// `Ok(None)` for an empty token list.
    #[tracing::instrument]
    pub fn parse(tokens: Vec<String>) -> anyhow::Result<Option<Self>> {
        let mut tokens = tokens.into_iter();
        let Some(head) = tokens.next() else {
            return Ok(None);
        };

        let known = known_command_names();
        let command = expand_command_abbrev(&head.to_ascii_lowercase(), &known)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {head}"))?;
        debug!(token = %head, expanded = %command, "resolved command token");

        Ok(Some(Self {
            command,
            args: tokens.collect(),
        }))
    }

    pub fn from_os_args(rest: Vec<OsString>) -> anyhow::Result<Option<Self>> {
        Self::parse(
            rest.into_iter()
                .map(|arg| arg.to_string_lossy().to_string())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::{Invocation, preprocess_args, split_line};

    #[test]
    fn positional_rc_overrides_are_extracted() {
        let raw: Vec<OsString> = ["daybook", "rc.color=off", "show", "rc.default.view:monthly"]
            .into_iter()
            .map(OsString::from)
            .collect();
        let pre = preprocess_args(&raw).expect("preprocess");
        assert_eq!(pre.cleaned_args.len(), 2);
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.default.view".to_string(), "monthly".to_string()),
            ]
        );
    }

    #[test]
    fn quotes_group_words() {
        let tokens = split_line(r#"add Lunch start:12:00 desc:"with the team""#)
            .expect("split");
        assert_eq!(tokens, vec!["add", "Lunch", "start:12:00", "desc:with the team"]);
        assert!(split_line("add \"open").is_err());
        assert!(split_line("   ").expect("blank").is_empty());
    }

    #[test]
    fn abbreviations_resolve_when_unambiguous() {
        let inv = Invocation::parse(vec!["unr".to_string(), "4".to_string()])
            .expect("parse")
            .expect("command");
        assert_eq!(inv.command, "unremind");
        assert_eq!(inv.args, vec!["4"]);

        let inv = Invocation::parse(vec!["ex".to_string()])
            .expect("parse")
            .expect("command");
        assert_eq!(inv.command, "export");

        assert!(Invocation::parse(vec!["g".to_string()]).is_err());
        assert!(Invocation::parse(vec!["rem".to_string()]).is_err());
        assert!(Invocation::parse(vec!["frobnicate".to_string()]).is_err());
        assert!(Invocation::parse(vec![]).expect("empty").is_none());
    }
}
