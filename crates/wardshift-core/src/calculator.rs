use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{
  Duration,
  NaiveDate
};
use tracing::{
  debug,
  trace
};

use crate::dateexpr::parse_iso_date;
use crate::error::{
  ShiftError,
  ShiftResult
};
use crate::rotation::{
  ShiftConfigPatch,
  ShiftCycleConfig
};
use crate::shift::{
  HexColor,
  NamedColor,
  ShiftAssignment,
  ShiftLabel,
  TeamId,
  detailed_shift_colors,
  shift_colors
};

/// Maps `(date, team)` to a shift label
/// under a replaceable configuration.
///
/// The configuration sits behind an
/// `Arc` and is swapped wholesale by
/// [`ShiftCalculator::update_config`];
/// snapshots taken with
/// [`ShiftCalculator::config`] keep
/// observing the values they were taken
/// with.
#[derive(Debug, Clone)]
pub struct ShiftCalculator {
  config: Arc<ShiftCycleConfig>
}

impl ShiftCalculator {
  pub fn new(
    config: ShiftCycleConfig
  ) -> ShiftResult<Self> {
    config.validate()?;
    Ok(Self {
      config: Arc::new(config)
    })
  }

  #[must_use]
  pub fn config(
    &self
  ) -> Arc<ShiftCycleConfig> {
    Arc::clone(&self.config)
  }

  #[tracing::instrument(level = "trace", skip(self))]
  pub fn calculate_shift(
    &self,
    date: NaiveDate,
    team: TeamId
  ) -> ShiftResult<ShiftLabel> {
    let config = &self.config;
    let index = cycle_index(
      date,
      config.base_date,
      config.cycle_length
    )?;
    let label =
      config.label_at(team, index)?;
    trace!(%date, index, %label, "calculated shift");
    Ok(label)
  }

  /// String front door for callers that
  /// hold unparsed input.
  pub fn calculate_shift_str(
    &self,
    raw_date: &str,
    raw_team: &str
  ) -> ShiftResult<ShiftLabel> {
    let date = parse_iso_date(raw_date)?;
    let team =
      raw_team.parse::<TeamId>()?;
    self.calculate_shift(date, team)
  }

  pub fn get_all_teams_shifts(
    &self,
    date: NaiveDate
  ) -> ShiftResult<Vec<ShiftAssignment>>
  {
    TeamId::ALL
      .iter()
      .map(|team| {
        self
          .calculate_shift(date, *team)
          .map(|shift| ShiftAssignment {
            team: *team,
            shift
          })
      })
      .collect()
  }

  pub fn get_shift_colors(
    &self
  ) -> BTreeMap<ShiftLabel, NamedColor>
  {
    shift_colors()
  }

  pub fn get_detailed_shift_colors(
    &self
  ) -> BTreeMap<ShiftLabel, HexColor> {
    detailed_shift_colors()
  }

  #[must_use]
  pub fn is_valid_date(
    &self,
    raw: &str
  ) -> bool {
    parse_iso_date(raw).is_ok()
  }

  /// Replaces the configuration with
  /// `current` overlaid by `patch`. On
  /// error the current configuration is
  /// kept.
  #[tracing::instrument(skip(self, patch))]
  pub fn update_config(
    &mut self,
    patch: &ShiftConfigPatch
  ) -> ShiftResult<()> {
    if patch.is_empty() {
      return Ok(());
    }
    let next =
      self.config.merged(patch)?;
    debug!(
      base_date = %next.base_date,
      cycle_length = next.cycle_length,
      "replacing rotation config"
    );
    self.config = Arc::new(next);
    Ok(())
  }

  /// One team's schedule over an
  /// inclusive date range.
  pub fn shifts_in_range(
    &self,
    team: TeamId,
    from: NaiveDate,
    to: NaiveDate
  ) -> ShiftResult<
    Vec<(NaiveDate, ShiftLabel)>
  > {
    if to < from {
      return Err(ShiftError::InvalidDate(
        format!(
          "range end {to} is before \
           start {from}"
        )
      ));
    }

    from
      .iter_days()
      .take_while(|date| *date <= to)
      .map(|date| {
        self
          .calculate_shift(date, team)
          .map(|label| (date, label))
      })
      .collect()
  }

  /// First date on or after `from` on
  /// which `team` works `label`.
  pub fn next_occurrence(
    &self,
    team: TeamId,
    label: ShiftLabel,
    from: NaiveDate
  ) -> ShiftResult<Option<NaiveDate>> {
    for offset in
      0..self.config.cycle_length
    {
      let date = i64::try_from(offset)
        .ok()
        .and_then(Duration::try_days)
        .and_then(|step| {
          from.checked_add_signed(step)
        })
        .ok_or_else(|| {
          ShiftError::InvalidDate(
            format!(
              "{from} + {offset} days is \
               out of range"
            )
          )
        })?;
      if self.calculate_shift(date, team)?
        == label
      {
        return Ok(Some(date));
      }
    }
    Ok(None)
  }
}

impl Default for ShiftCalculator {
  fn default() -> Self {
    Self {
      config: Arc::new(
        ShiftCycleConfig::reference()
      )
    }
  }
}

/// Position of `date` within the cycle.
///
/// `num_days` of a date difference is an
/// exact whole-day count, so the floor
/// and truncating differences agree. The
/// double modulo keeps the index in
/// `[0, cycle_length)` for dates before
/// the base date.
pub fn cycle_index(
  date: NaiveDate,
  base_date: NaiveDate,
  cycle_length: usize
) -> ShiftResult<usize> {
  let cycle =
    i64::try_from(cycle_length)
      .ok()
      .filter(|len| *len > 0)
      .ok_or_else(|| {
        ShiftError::MalformedConfig(
          format!(
            "invalid cycle length \
             {cycle_length}"
          )
        )
      })?;

  let days = date
    .signed_duration_since(base_date)
    .num_days();
  let index =
    ((days % cycle) + cycle) % cycle;

  usize::try_from(index).map_err(|_| {
    ShiftError::InvalidDate(
      date.to_string()
    )
  })
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::{
    ShiftCalculator,
    cycle_index
  };
  use crate::rotation::ShiftCycleConfig;
  use crate::error::ShiftError;
  use crate::shift::{
    ShiftLabel,
    TeamId
  };

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn index_wraps_for_negative_offsets()
  {
    let base = ymd(2025, 7, 15);
    assert_eq!(
      cycle_index(
        ymd(2025, 7, 14),
        base,
        4
      )
      .expect("index"),
      3
    );
    assert_eq!(
      cycle_index(
        ymd(2025, 7, 11),
        base,
        4
      )
      .expect("index"),
      0
    );
    assert_eq!(
      cycle_index(
        ymd(2025, 7, 10),
        base,
        4
      )
      .expect("index"),
      3
    );
  }

  #[test]
  fn string_input_errors_propagate() {
    let calc = ShiftCalculator::default();
    assert!(matches!(
      calc.calculate_shift_str(
        "2025-02-30",
        "Team1"
      ),
      Err(ShiftError::InvalidDate(_))
    ));
    assert!(matches!(
      calc.calculate_shift_str(
        "2025-07-15",
        "Team9"
      ),
      Err(ShiftError::UnknownTeam(_))
    ));
    assert_eq!(
      calc
        .calculate_shift_str(
          "2025-07-16",
          "team1"
        )
        .expect("shift"),
      ShiftLabel::Day
    );
  }

  #[test]
  fn range_is_inclusive_and_ordered() {
    let calc = ShiftCalculator::default();
    let range = calc
      .shifts_in_range(
        TeamId::Team2,
        ymd(2025, 7, 15),
        ymd(2025, 7, 18)
      )
      .expect("range");
    let labels = range
      .iter()
      .map(|(_, label)| *label)
      .collect::<Vec<_>>();
    assert_eq!(
      labels,
      vec![
        ShiftLabel::Morning,
        ShiftLabel::Rest,
        ShiftLabel::Day,
        ShiftLabel::Night
      ]
    );
    assert!(
      calc
        .shifts_in_range(
          TeamId::Team2,
          ymd(2025, 7, 18),
          ymd(2025, 7, 15)
        )
        .is_err()
    );
  }

  #[test]
  fn next_occurrence_searches_one_cycle()
  {
    let calc = ShiftCalculator::default();
    assert_eq!(
      calc
        .next_occurrence(
          TeamId::Team1,
          ShiftLabel::Morning,
          ymd(2025, 7, 15)
        )
        .expect("search"),
      Some(ymd(2025, 7, 18))
    );
    assert_eq!(
      calc
        .next_occurrence(
          TeamId::Team1,
          ShiftLabel::Rest,
          ymd(2025, 7, 19)
        )
        .expect("search"),
      Some(ymd(2025, 7, 19))
    );
  }

  #[test]
  fn failed_update_keeps_current_config()
  {
    let mut calc =
      ShiftCalculator::default();
    let before = calc.config();
    let patch =
      crate::rotation::ShiftConfigPatch {
        cycle_length: Some(5),
        ..Default::default()
      };
    assert!(
      calc.update_config(&patch).is_err()
    );
    assert_eq!(*calc.config(), *before);
  }

  #[test]
  fn validates_date_text() {
    let calc = ShiftCalculator::default();
    assert!(calc.is_valid_date("2024-02-29"));
    assert!(calc.is_valid_date("2025-07-15"));
    assert!(!calc.is_valid_date("2025-02-29"));
    assert!(!calc.is_valid_date("2025-13-01"));
    assert!(!calc.is_valid_date("next week"));
    assert!(!calc.is_valid_date(""));
  }

  #[test]
  fn next_occurrence_is_none_for_unused_label()
  {
    let mut config =
      ShiftCycleConfig::reference();
    config.shift_table.insert(
      TeamId::Team1,
      vec![
        ShiftLabel::Rest,
        ShiftLabel::Day,
        ShiftLabel::Day,
        ShiftLabel::Morning
      ]
    );
    let calc = ShiftCalculator::new(config)
      .expect("custom config");

    assert_eq!(
      calc
        .next_occurrence(
          TeamId::Team1,
          ShiftLabel::Night,
          ymd(2025, 7, 15)
        )
        .expect("search"),
      None
    );
    assert_eq!(
      calc
        .next_occurrence(
          TeamId::Team2,
          ShiftLabel::Night,
          ymd(2025, 7, 15)
        )
        .expect("search"),
      Some(ymd(2025, 7, 18))
    );
  }
}
