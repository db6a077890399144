use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::{Command, expand_command_abbrev, known_command_names};
use crate::config::Config;

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
    name = "tick",
    version,
    about = "tick: a small JSON-backed task list",
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

    #[arg(long = "tickrc")]
    pub tickrc: Option<PathBuf>,

    /// File path or http(s) URL of the load document.
    #[arg(long = "source")]
    pub source: Option<String>,

    /// Answer yes to every confirmation prompt.
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
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

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
}

impl Invocation {
    #[tracing::instrument(skip(cfg, rest))]
    pub fn parse(cfg: &Config, rest: Vec<OsString>) -> anyhow::Result<Self> {
        let tokens: Vec<String> = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect();

        if tokens.is_empty() {
            let cmd = cfg
                .get("default.command")
                .unwrap_or_else(|| "list".to_string());
            debug!(command = %cmd, "no explicit command, using default");
            return Ok(Self {
                command: parse_command_words(&[cmd])?,
            });
        }

        Ok(Self {
            command: parse_command_words(&tokens)?,
        })
    }
}

/// Resolves `words[0]` (abbreviations allowed) and parses the arguments
/// that follow it.
pub fn parse_command_words(words: &[String]) -> anyhow::Result<Command> {
    let Some((head, args)) = words.split_first() else {
        return Err(anyhow!("missing command"));
    };

    let known = known_command_names();
    let name = expand_command_abbrev(head, &known)
        .ok_or_else(|| anyhow!("unknown or ambiguous command: {head}"))?;
    debug!(token = %head, expanded = %name, "resolved command token");

    match name {
        "list" => Ok(Command::List),
        "stats" => Ok(Command::Stats),
        "add" => {
            let text = args.join(" ");
            Ok(Command::Add(text))
        }
        "toggle" | "done" => Ok(Command::Toggle(parse_id(name, args)?)),
        "delete" => Ok(Command::Delete(parse_id(name, args)?)),
        "clear" => Ok(Command::ClearCompleted),
        "export" => Ok(Command::Export(args.first().map(PathBuf::from))),
        "shell" => Ok(Command::Shell),
        "help" => Ok(Command::Help),
        "version" => Ok(Command::Version),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(anyhow!("unknown command: {other}")),
    }
}

fn parse_id(command: &str, args: &[String]) -> anyhow::Result<u64> {
    let raw = args
        .first()
        .ok_or_else(|| anyhow!("{command} requires a task id"))?;
    raw.parse::<u64>()
        .map_err(|_| anyhow!("{command}: invalid task id {raw:?}"))
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::path::PathBuf;

    use super::{Invocation, parse_command_words, preprocess_args};
    use crate::commands::Command;
    use crate::config::Config;

    fn words(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn extracts_positional_rc_overrides() {
        let raw: Vec<OsString> = ["tick", "rc.color:off", "list", "rc.confirm=no"]
            .iter()
            .map(OsString::from)
            .collect();
        let pre = preprocess_args(&raw).expect("preprocess");
        assert_eq!(
            pre.cleaned_args,
            vec![OsString::from("tick"), OsString::from("list")]
        );
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.confirm".to_string(), "no".to_string())
            ]
        );
    }

    #[test]
    fn empty_invocation_uses_default_command() {
        let inv = Invocation::parse(&Config::default(), vec![]).expect("parse");
        assert_eq!(inv.command, Command::List);
    }

    #[test]
    fn parses_words_and_abbreviations() {
        assert_eq!(
            parse_command_words(&words(&["add", "Buy", "milk"])).expect("add"),
            Command::Add("Buy milk".to_string())
        );
        assert_eq!(
            parse_command_words(&words(&["tog", "3"])).expect("toggle"),
            Command::Toggle(3)
        );
        assert_eq!(
            parse_command_words(&words(&["done", "2"])).expect("done"),
            Command::Toggle(2)
        );
        assert_eq!(
            parse_command_words(&words(&["exp", "out.json"])).expect("export"),
            Command::Export(Some(PathBuf::from("out.json")))
        );
        assert_eq!(
            parse_command_words(&words(&["cl"])).expect("clear"),
            Command::ClearCompleted
        );
    }

    #[test]
    fn rejects_bad_ids_and_unknown_words() {
        assert!(parse_command_words(&words(&["delete"])).is_err());
        assert!(parse_command_words(&words(&["delete", "x"])).is_err());
        assert!(parse_command_words(&words(&["frobnicate"])).is_err());
    }
}
