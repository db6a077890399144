use std::io::{BufRead, Write};

use tracing::{debug, info, warn};

use crate::cli::parse_command_words;
use crate::commands::{self, Flow};
use crate::config::Config;
use crate::controller::{Controller, Ui};
use crate::render::Renderer;

const SHELL_PROMPT: &str = "tick> ";

/// Line-oriented prompt and notice surface over any reader/writer pair.
#[derive(Debug)]
pub struct TerminalUi<R, W> {
    input: R,
    output: W,
    assume_yes: bool,
}

impl<R: BufRead, W: Write> TerminalUi<R, W> {
    pub fn new(input: R, output: W, assume_yes: bool) -> Self {
        Self {
            input,
            output,
            assume_yes,
        }
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.output
    }

    /// `None` at end of input.
    pub fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn write_line(&mut self, text: &str) {
        if let Err(err) = writeln!(self.output, "{text}").and_then(|()| self.output.flush()) {
            warn!(error = %err, "failed writing to terminal");
        }
    }
}

impl<R: BufRead, W: Write> Ui for TerminalUi<R, W> {
    fn confirm(&mut self, message: &str) -> bool {
        if self.assume_yes {
            debug!(message, "auto-confirming");
            return true;
        }

        if let Err(err) = write!(self.output, "{message} [y/N] ").and_then(|()| self.output.flush())
        {
            warn!(error = %err, "failed writing prompt");
            return false;
        }

        match self.read_line() {
            Ok(Some(answer)) => {
                matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
            }
            Ok(None) => {
                self.write_line("");
                false
            }
            Err(err) => {
                warn!(error = %err, "failed reading confirmation");
                false
            }
        }
    }

    fn notify(&mut self, message: &str) {
        self.write_line(message);
    }
}

/// Reads commands until `quit`, `exit` or end of input. A bad line is
/// reported and the session carries on.
#[tracing::instrument(skip_all)]
pub fn run_shell<R: BufRead, W: Write>(
    controller: &mut Controller,
    cfg: &Config,
    renderer: &Renderer,
    ui: &mut TerminalUi<R, W>,
) -> anyhow::Result<()> {
    info!("starting shell");
    let refresh = controller.refresh();
    renderer.print_view(ui.writer(), &refresh.view, &refresh.stats)?;

    loop {
        write!(ui.writer(), "{SHELL_PROMPT}")?;
        ui.writer().flush()?;

        let Some(line) = ui.read_line()? else {
            writeln!(ui.writer())?;
            break;
        };
        let words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if words.is_empty() {
            continue;
        }

        let command = match parse_command_words(&words) {
            Ok(command) => command,
            Err(err) => {
                ui.notify(&format!("{err}"));
                continue;
            }
        };

        match commands::dispatch(controller, cfg, renderer, ui, command)? {
            Flow::Continue => {}
            Flow::EnterShell => ui.notify("Already in the shell."),
            Flow::Quit => break,
        }
    }

    info!("shell closed");
    Ok(())
}
