use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use crate::config::{self, Config};
use crate::controller::Controller;
use crate::datetime;
use crate::document::ExportDocument;
use crate::render::Renderer;
use crate::session::TerminalUi;
use crate::task::TaskId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Stats,
    Add(String),
    Toggle(TaskId),
    Delete(TaskId),
    ClearCompleted,
    Export(Option<PathBuf>),
    Shell,
    Help,
    Version,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    EnterShell,
    Quit,
}

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "list", "stats", "add", "toggle", "done", "delete", "clear", "export", "shell", "help",
        "version", "quit", "exit",
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

#[instrument(skip(controller, cfg, renderer, ui))]
pub fn dispatch<R: BufRead, W: Write>(
    controller: &mut Controller,
    cfg: &Config,
    renderer: &Renderer,
    ui: &mut TerminalUi<R, W>,
    command: Command,
) -> anyhow::Result<Flow> {
    debug!("dispatching command");

    let refresh = match command {
        Command::List => controller.refresh(),
        Command::Stats => {
            renderer.print_stats(ui.writer(), &controller.store().statistics())?;
            return Ok(Flow::Continue);
        }
        Command::Add(text) => controller.add_task(&text, ui),
        Command::Toggle(id) => controller.toggle_task(id, ui),
        Command::Delete(id) => controller.delete_task(id, ui),
        Command::ClearCompleted => controller.clear_completed(ui),
        Command::Export(path) => {
            cmd_export(controller, cfg, ui.writer(), path.as_deref())?;
            return Ok(Flow::Continue);
        }
        Command::Shell => return Ok(Flow::EnterShell),
        Command::Help => {
            cmd_help(ui.writer())?;
            return Ok(Flow::Continue);
        }
        Command::Version => {
            writeln!(ui.writer(), "{}", env!("CARGO_PKG_VERSION"))?;
            return Ok(Flow::Continue);
        }
        Command::Quit => return Ok(Flow::Quit),
    };

    renderer.print_view(ui.writer(), &refresh.view, &refresh.stats)?;
    Ok(Flow::Continue)
}

#[instrument(skip(controller, cfg, out))]
fn cmd_export<W: Write>(
    controller: &Controller,
    cfg: &Config,
    mut out: W,
    target: Option<&Path>,
) -> anyhow::Result<()> {
    info!("command export");

    let now = Utc::now();
    let doc = controller.store().export_at(now);
    let path = match target {
        Some(path) => config::expand_tilde(path),
        None => config::resolve_export_dir(cfg).join(datetime::export_filename(now)),
    };

    write_export(&doc, &path)?;
    info!(file = %path.display(), count = doc.total_tasks, "Tasks exported as JSON");
    writeln!(
        out,
        "Exported {} task(s) to {}.",
        doc.total_tasks,
        path.display()
    )?;
    Ok(())
}

/// Writes the pretty-printed document through a temp file in the target
/// directory, then renames it into place.
#[instrument(skip(doc))]
pub fn write_export(doc: &ExportDocument, path: &Path) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let json = doc.to_json_pretty().context("failed to serialize export")?;
    let mut temp = NamedTempFile::new_in(&dir)?;
    temp.write_all(json.as_bytes())?;
    writeln!(temp)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
    Ok(())
}

fn cmd_help<W: Write>(mut out: W) -> anyhow::Result<()> {
    writeln!(
        out,
        "Commands: list, stats, add <text>, toggle|done <id>, delete <id>, clear, \
         export [path], shell, help, version, quit"
    )?;
    Ok(())
}
