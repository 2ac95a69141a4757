pub mod calculator;
pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dateexpr;
pub mod error;
pub mod render;
pub mod rotation;
pub mod shift;

use std::ffi::OsString;
use std::io::{self, IsTerminal};

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use calculator::ShiftCalculator;
pub use calendar::{
  CalendarController,
  CalendarSelectionState,
  MonthTarget,
  YearMonth
};
pub use error::{
  ShiftError,
  ShiftResult
};
pub use rotation::{
  ShiftConfigPatch,
  ShiftCycleConfig
};
pub use shift::{
  ShiftAssignment,
  ShiftLabel,
  TeamId
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting wardshift"
  );

  let cfg = config::AppConfig::load(
    cli.config.as_deref()
  )?;

  let calculator =
    ShiftCalculator::new(
      cfg.rotation.clone()
    )
    .context(
      "invalid rotation \
       configuration"
    )?;

  let team = cli
    .team
    .unwrap_or(cfg.calendar.default_team);
  let mut controller =
    CalendarController::new(
      calculator,
      team,
      calendar::SystemClock {
        timezone: cfg.calendar.timezone
      }
    );
  controller.subscribe(|state| {
    debug!(
      selected_date = %state.selected_date,
      selected_team = %state.selected_team,
      visible_month = %state.visible_month,
      "selection updated"
    );
  });

  let color = cfg.calendar.color
    && !cli.no_color
    && io::stdout().is_terminal();
  let renderer =
    render::Renderer::new(color);
  let mode = if cli.json {
    commands::OutputMode::Json
  } else {
    commands::OutputMode::Table
  };

  commands::dispatch(
    io::stdout().lock(),
    &mut controller,
    &cfg,
    &renderer,
    mode,
    cli.command.unwrap_or_default()
  )?;

  info!("done");
  Ok(())
}
