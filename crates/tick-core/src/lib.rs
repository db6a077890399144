pub mod cli;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod controller;
pub mod datetime;
pub mod document;
pub mod error;
pub mod render;
pub mod session;
pub mod source;
pub mod store;
pub mod task;
pub mod view;

use std::ffi::OsString;
use std::io;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use controller::{
  Controller,
  Refresh,
  Ui
};
pub use error::{
  ConfirmError,
  LoadError,
  NoOpError,
  NotFoundError,
  ValidationError
};
pub use store::TaskStore;
pub use task::{
  Statistics,
  Task,
  TaskId
};
pub use view::{
  RowView,
  ViewModel,
  project
};

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
    "starting tick CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.tickrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let location =
    config::resolve_source_location(
      &cfg,
      cli.source.as_deref()
    );
  let source =
    source::AnySource::from_location(
      &location
    );

  let renderer =
    render::Renderer::new(&cfg)?;
  let confirm = cfg
    .get_bool("confirm")?
    .unwrap_or(true);
  let assume_yes = cli.yes || !confirm;
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async \
         runtime"
      )?;

  let mut controller =
    Controller::new(TaskStore::new());
  runtime
    .block_on(controller.load(&source));

  let stdin = io::stdin();
  let mut ui = session::TerminalUi::new(
    stdin.lock(),
    io::stdout().lock(),
    assume_yes
  );

  let flow = commands::dispatch(
    &mut controller,
    &cfg,
    &renderer,
    &mut ui,
    inv.command
  )?;
  if flow == commands::Flow::EnterShell
  {
    session::run_shell(
      &mut controller,
      &cfg,
      &renderer,
      &mut ui
    )?;
  }

  info!("done");
  Ok(())
}
