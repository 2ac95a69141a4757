use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::shift::{ShiftLabel, TeamId};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "wardshift",
    version,
    about = "Ward shift rotation calendar",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Path to a wardshift.toml file.
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Team to show; defaults to calendar.default_team.
    #[arg(
        short = 't',
        long = "team",
        global = true,
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<TeamId>())
    )]
    pub team: Option<TeamId>,

    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[arg(long = "json", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Shift for the selected team on a date.
    Shift { date: Option<String> },

    /// Every team's shift on a date.
    Teams { date: Option<String> },

    /// Month calendar for the selected team.
    Month {
        /// YYYY-MM; defaults to the month of --select or today.
        month: Option<String>,

        /// Date to highlight.
        #[arg(long = "select")]
        select: Option<String>,
    },

    /// Schedule over an inclusive date range.
    Range { from: String, to: String },

    /// Next date the team works the given shift.
    Next {
        #[arg(value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<ShiftLabel>()))]
        label: ShiftLabel,
        from: Option<String>,
    },

    /// Shift color tables.
    Colors,

    /// Effective rotation configuration.
    Config,
}

impl Default for Command {
    fn default() -> Self {
        Command::Month {
            month: None,
            select: None,
        }
    }
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

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Command, GlobalCli};
    use crate::shift::{ShiftLabel, TeamId};

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = GlobalCli::try_parse_from(["wardshift", "shift", "2025-07-16", "--team", "3", "-vv"])
            .expect("parse");
        assert_eq!(cli.team, Some(TeamId::Team3));
        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.command,
            Some(Command::Shift {
                date: Some("2025-07-16".to_string())
            })
        );
    }

    #[test]
    fn rejects_unknown_team_and_label() {
        assert!(GlobalCli::try_parse_from(["wardshift", "--team", "Team7", "colors"]).is_err());
        assert!(GlobalCli::try_parse_from(["wardshift", "next", "swing"]).is_err());
    }

    #[test]
    fn next_takes_a_shift_label() {
        let cli = GlobalCli::try_parse_from(["wardshift", "next", "night", "tomorrow"]).expect("parse");
        assert_eq!(
            cli.command,
            Some(Command::Next {
                label: ShiftLabel::Night,
                from: Some("tomorrow".to_string())
            })
        );
    }

    #[test]
    fn no_subcommand_means_month() {
        let cli = GlobalCli::try_parse_from(["wardshift", "--json"]).expect("parse");
        assert!(cli.json);
        assert_eq!(cli.command.unwrap_or_default(), Command::default());
    }
}
