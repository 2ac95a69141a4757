use std::collections::BTreeMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{
  debug,
  info,
  warn
};

use crate::dateexpr::parse_iso_date;
use crate::rotation::{
  ShiftConfigPatch,
  ShiftCycleConfig
};
use crate::shift::{
  ShiftLabel,
  TeamId
};

const CONFIG_FILE: &str =
  "wardshift.toml";
const CONFIG_ENV_VAR: &str =
  "WARDSHIFT_CONFIG";
const DEFAULT_TIMEZONE: &str = "UTC";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
  rotation: Option<RawRotation>,
  calendar: Option<RawCalendar>
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRotation {
  base_date:    Option<String>,
  cycle_length: Option<usize>,
  teams:
    Option<BTreeMap<String, Vec<String>>>
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCalendar {
  timezone:     Option<String>,
  default_team: Option<String>,
  color:        Option<bool>
}

#[derive(Debug, Clone)]
pub struct CalendarSettings {
  pub timezone:     Tz,
  pub default_team: TeamId,
  pub color:        bool
}

impl Default for CalendarSettings {
  fn default() -> Self {
    Self {
      timezone:     chrono_tz::UTC,
      default_team: TeamId::Team1,
      color:        true
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
  pub rotation:    ShiftCycleConfig,
  pub calendar:    CalendarSettings,
  pub loaded_file: Option<PathBuf>
}

impl AppConfig {
  #[tracing::instrument(skip(
    override_path
  ))]
  pub fn load(
    override_path: Option<&Path>
  ) -> anyhow::Result<Self> {
    let Some(path) =
      resolve_config_path(override_path)?
    else {
      warn!(
        "no wardshift.toml found; \
         using reference rotation"
      );
      return Ok(Self::default());
    };

    info!(config = %path.display(), "loading config");
    let text = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;

    let mut cfg = Self::from_toml_str(
      &text
    )
    .with_context(|| {
      format!(
        "invalid config in {}",
        path.display()
      )
    })?;
    cfg.loaded_file = Some(path);
    Ok(cfg)
  }

  /// Builds the effective config from
  /// TOML text. Absent rotation fields
  /// keep the reference values.
  pub fn from_toml_str(
    text: &str
  ) -> anyhow::Result<Self> {
    let raw =
      toml::from_str::<RawConfig>(text)
        .context(
          "failed to parse TOML"
        )?;

    let patch = rotation_patch(
      raw.rotation.unwrap_or_default()
    )?;
    let rotation =
      ShiftCycleConfig::reference()
        .merged(&patch)
        .context(
          "invalid [rotation] section"
        )?;

    let calendar = calendar_settings(
      raw.calendar.unwrap_or_default()
    )?;

    debug!(
      base_date = %rotation.base_date,
      cycle_length = rotation.cycle_length,
      timezone = %calendar.timezone,
      default_team = %calendar.default_team,
      "resolved config"
    );

    Ok(Self {
      rotation,
      calendar,
      loaded_file: None
    })
  }
}

fn rotation_patch(
  raw: RawRotation
) -> anyhow::Result<ShiftConfigPatch> {
  let base_date = raw
    .base_date
    .as_deref()
    .map(parse_iso_date)
    .transpose()
    .context(
      "invalid rotation.base_date"
    )?;

  let shift_table = match raw.teams {
    | Some(teams) => {
      let mut table = BTreeMap::new();
      for (team, labels) in teams {
        let team_id = team
          .parse::<TeamId>()
          .with_context(|| {
            format!(
              "invalid team key \
               rotation.teams.{team}"
            )
          })?;
        let sequence = labels
          .iter()
          .map(|label| {
            label.parse::<ShiftLabel>()
          })
          .collect::<Result<Vec<_>, _>>()
          .with_context(|| {
            format!(
              "invalid shift label in \
               rotation.teams.{team}"
            )
          })?;
        if table
          .insert(team_id, sequence)
          .is_some()
        {
          return Err(anyhow!(
            "team {team_id} is listed \
             more than once"
          ));
        }
      }
      Some(table)
    }
    | None => None
  };

  // A new table without an explicit
  // length defines its own length.
  let cycle_length =
    raw.cycle_length.or_else(|| {
      shift_table.as_ref().and_then(
        |table| {
          table
            .values()
            .next()
            .map(Vec::len)
        }
      )
    });

  Ok(ShiftConfigPatch {
    base_date,
    cycle_length,
    shift_table
  })
}

fn calendar_settings(
  raw: RawCalendar
) -> anyhow::Result<CalendarSettings> {
  let default_team = raw
    .default_team
    .as_deref()
    .map(str::parse::<TeamId>)
    .transpose()
    .context(
      "invalid calendar.default_team"
    )?
    .unwrap_or(TeamId::Team1);

  let timezone = raw
    .timezone
    .as_deref()
    .and_then(|tz| {
      parse_timezone(tz, "config")
    })
    .or_else(|| {
      parse_timezone(
        DEFAULT_TIMEZONE,
        "DEFAULT_TIMEZONE"
      )
    })
    .unwrap_or(chrono_tz::UTC);

  Ok(CalendarSettings {
    timezone,
    default_team,
    color: raw.color.unwrap_or(true)
  })
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    warn!(
      source,
      "timezone value was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => Some(tz),
    | Err(error) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %error,
        "invalid timezone id; falling back"
      );
      None
    }
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if trimmed == "/dev/null" {
      return Ok(None);
    }
    if !trimmed.is_empty() {
      return Ok(Some(expand_tilde(
        Path::new(trimmed)
      )));
    }
  }

  let local = std::env::current_dir()
    .context(
      "cannot determine current \
       directory"
    )?
    .join(CONFIG_FILE);
  if local.exists() {
    return Ok(Some(local));
  }

  if let Some(dir) = dirs::config_dir() {
    let candidate = dir
      .join("wardshift")
      .join(CONFIG_FILE);
    if candidate.exists() {
      return Ok(Some(candidate));
    }
  }

  Ok(None)
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
