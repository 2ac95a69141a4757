use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::error::{
  ShiftError,
  ShiftResult
};
use crate::shift::{
  ShiftLabel,
  TeamId
};

/// Longest accepted rotation, ten years
/// of days.
pub const MAX_CYCLE_LENGTH: usize = 3_660;

/// Rotation parameters shared by every
/// calculation.
///
/// `shift_table` is the single canonical
/// representation: one sequence per team,
/// indexed by day of cycle. The day-major
/// view is derived on demand by
/// [`ShiftCycleConfig::rotation_for_day`].
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct ShiftCycleConfig {
  pub base_date:    NaiveDate,
  pub cycle_length: usize,
  pub shift_table:
    BTreeMap<TeamId, Vec<ShiftLabel>>
}

/// Partial configuration for
/// reconfiguration. Absent fields are
/// retained from the current config.
#[derive(Debug, Clone, Default)]
pub struct ShiftConfigPatch {
  pub base_date:    Option<NaiveDate>,
  pub cycle_length: Option<usize>,
  pub shift_table: Option<
    BTreeMap<TeamId, Vec<ShiftLabel>>
  >
}

impl ShiftConfigPatch {
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.base_date.is_none()
      && self.cycle_length.is_none()
      && self.shift_table.is_none()
  }
}

impl ShiftCycleConfig {
  /// 2025-07-15 anchored four-day
  /// rotation.
  pub fn reference() -> Self {
    use ShiftLabel::{
      Day,
      Morning,
      Night,
      Rest
    };

    let mut shift_table =
      BTreeMap::new();
    shift_table.insert(
      TeamId::Team1,
      vec![Rest, Day, Night, Morning]
    );
    shift_table.insert(
      TeamId::Team2,
      vec![Morning, Rest, Day, Night]
    );
    shift_table.insert(
      TeamId::Team3,
      vec![Day, Night, Morning, Rest]
    );
    shift_table.insert(
      TeamId::Team4,
      vec![Night, Morning, Rest, Day]
    );

    Self {
      base_date: NaiveDate::from_ymd_opt(
        2025, 7, 15
      )
      .unwrap_or(NaiveDate::MIN),
      cycle_length: 4,
      shift_table
    }
  }

  pub fn validate(
    &self
  ) -> ShiftResult<()> {
    if self.cycle_length == 0 {
      return Err(
        ShiftError::MalformedConfig(
          "cycle length must be at \
           least 1"
            .to_string()
        )
      );
    }
    check_cycle_length(
      self.cycle_length
    )?;

    for team in TeamId::ALL {
      let Some(sequence) =
        self.shift_table.get(&team)
      else {
        return Err(
          ShiftError::MalformedConfig(
            format!(
              "team {team} has no \
               shift sequence"
            )
          )
        );
      };

      if sequence.len()
        != self.cycle_length
      {
        return Err(
          ShiftError::MalformedConfig(
            format!(
              "team {team} has {} \
               entries, expected {}",
              sequence.len(),
              self.cycle_length
            )
          )
        );
      }
    }

    Ok(())
  }

  /// Builds a new config from `self`
  /// overlaid with `patch`.
  ///
  /// When only the cycle length changes
  /// and it is a whole multiple of the
  /// current one, each retained sequence
  /// is repeated to fill the new length so
  /// the rotation pattern is unchanged.
  #[tracing::instrument(skip(self, patch))]
  pub fn merged(
    &self,
    patch: &ShiftConfigPatch
  ) -> ShiftResult<Self> {
    let cycle_length = patch
      .cycle_length
      .unwrap_or(self.cycle_length);
    check_cycle_length(cycle_length)?;

    let shift_table = match &patch
      .shift_table
    {
      | Some(table) => table.clone(),
      | None
        if cycle_length
          != self.cycle_length =>
      {
        retile_table(
          &self.shift_table,
          self.cycle_length,
          cycle_length
        )?
      }
      | None => {
        self.shift_table.clone()
      }
    };

    let next = Self {
      base_date: patch
        .base_date
        .unwrap_or(self.base_date),
      cycle_length,
      shift_table
    };
    next.validate()?;

    debug!(
      base_date = %next.base_date,
      cycle_length = next.cycle_length,
      "merged rotation config"
    );
    Ok(next)
  }

  /// Every team's label on one day of
  /// the cycle, in canonical team order.
  pub fn rotation_for_day(
    &self,
    day_index: usize
  ) -> ShiftResult<
    BTreeMap<TeamId, ShiftLabel>
  > {
    if day_index >= self.cycle_length {
      return Err(
        ShiftError::MalformedConfig(
          format!(
            "day {day_index} is outside \
             a {}-day cycle",
            self.cycle_length
          )
        )
      );
    }

    TeamId::ALL
      .iter()
      .map(|team| {
        self
          .label_at(*team, day_index)
          .map(|label| (*team, label))
      })
      .collect()
  }

  pub fn rotation_days(
    &self
  ) -> ShiftResult<
    Vec<BTreeMap<TeamId, ShiftLabel>>
  > {
    (0..self.cycle_length)
      .map(|day| {
        self.rotation_for_day(day)
      })
      .collect()
  }

  pub(crate) fn label_at(
    &self,
    team: TeamId,
    index: usize
  ) -> ShiftResult<ShiftLabel> {
    let sequence = self
      .shift_table
      .get(&team)
      .ok_or_else(|| {
        ShiftError::UnknownTeam(
          team.to_string()
        )
      })?;

    sequence.get(index).copied().ok_or_else(
      || {
        ShiftError::MalformedConfig(
          format!(
            "team {team} has no entry \
             for cycle day {index}"
          )
        )
      }
    )
  }

  /// Labels that can be produced by any
  /// team under this config.
  pub fn labels_in_use(
    &self
  ) -> Vec<ShiftLabel> {
    let mut labels = self
      .shift_table
      .values()
      .flatten()
      .copied()
      .collect::<Vec<_>>();
    labels.sort();
    labels.dedup();
    labels
  }
}

impl Default for ShiftCycleConfig {
  fn default() -> Self {
    Self::reference()
  }
}

fn check_cycle_length(
  cycle_length: usize
) -> ShiftResult<()> {
  if cycle_length > MAX_CYCLE_LENGTH {
    return Err(
      ShiftError::MalformedConfig(
        format!(
          "cycle length {cycle_length} \
           exceeds {MAX_CYCLE_LENGTH} days"
        )
      )
    );
  }
  Ok(())
}

fn retile_table(
  table: &BTreeMap<
    TeamId,
    Vec<ShiftLabel>
  >,
  old_length: usize,
  new_length: usize
) -> ShiftResult<
  BTreeMap<TeamId, Vec<ShiftLabel>>
> {
  if old_length == 0
    || new_length % old_length != 0
  {
    return Err(
      ShiftError::MalformedConfig(
        format!(
          "cycle length {new_length} \
           needs a new shift table; \
           existing sequences have \
           {old_length} entries"
        )
      )
    );
  }

  Ok(
    table
      .iter()
      .map(|(team, sequence)| {
        let tiled = sequence
          .iter()
          .copied()
          .cycle()
          .take(new_length)
          .collect();
        (*team, tiled)
      })
      .collect()
  )
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::{
    MAX_CYCLE_LENGTH,
    ShiftConfigPatch,
    ShiftCycleConfig
  };
  use crate::error::ShiftError;
  use crate::shift::{
    ShiftLabel,
    TeamId
  };

  #[test]
  fn reference_config_is_valid() {
    let config =
      ShiftCycleConfig::reference();
    config
      .validate()
      .expect("reference validates");
    assert_eq!(config.cycle_length, 4);
    assert_eq!(
      config.base_date.to_string(),
      "2025-07-15"
    );
  }

  #[test]
  fn day_view_is_derived_from_team_table()
  {
    let config =
      ShiftCycleConfig::reference();
    let day0 = config
      .rotation_for_day(0)
      .expect("day 0");
    assert_eq!(
      day0[&TeamId::Team1],
      ShiftLabel::Rest
    );
    assert_eq!(
      day0[&TeamId::Team2],
      ShiftLabel::Morning
    );
    assert_eq!(
      day0[&TeamId::Team3],
      ShiftLabel::Day
    );
    assert_eq!(
      day0[&TeamId::Team4],
      ShiftLabel::Night
    );

    let days = config
      .rotation_days()
      .expect("all days");
    assert_eq!(days.len(), 4);
    assert!(
      config.rotation_for_day(4).is_err()
    );
  }

  #[test]
  fn every_day_covers_all_shift_kinds() {
    let config =
      ShiftCycleConfig::reference();
    for day in config
      .rotation_days()
      .expect("days")
    {
      let mut labels = day
        .values()
        .copied()
        .collect::<Vec<_>>();
      labels.sort();
      assert_eq!(
        labels,
        ShiftLabel::ALL.to_vec()
      );
    }
  }

  #[test]
  fn merge_retains_absent_fields() {
    let config =
      ShiftCycleConfig::reference();
    let new_base =
      NaiveDate::from_ymd_opt(2025, 1, 1)
        .expect("date");
    let merged = config
      .merged(&ShiftConfigPatch {
        base_date: Some(new_base),
        ..ShiftConfigPatch::default()
      })
      .expect("merge");

    assert_eq!(merged.base_date, new_base);
    assert_eq!(
      merged.shift_table,
      config.shift_table
    );
    assert_eq!(
      config.base_date.to_string(),
      "2025-07-15"
    );
  }

  #[test]
  fn merge_retiles_on_multiple_length() {
    let config =
      ShiftCycleConfig::reference();
    let merged = config
      .merged(&ShiftConfigPatch {
        cycle_length: Some(8),
        ..ShiftConfigPatch::default()
      })
      .expect("merge");

    let team1 =
      &merged.shift_table[&TeamId::Team1];
    assert_eq!(team1.len(), 8);
    assert_eq!(team1[..4], team1[4..]);
  }

  #[test]
  fn merge_rejects_incompatible_length() {
    let config =
      ShiftCycleConfig::reference();
    let err = config
      .merged(&ShiftConfigPatch {
        cycle_length: Some(6),
        ..ShiftConfigPatch::default()
      })
      .expect_err("6 is not a multiple");
    assert!(matches!(
      err,
      ShiftError::MalformedConfig(_)
    ));
  }

  #[test]
  fn merge_rejects_missing_team() {
    let config =
      ShiftCycleConfig::reference();
    let mut table =
      config.shift_table.clone();
    table.remove(&TeamId::Team4);

    let err = config
      .merged(&ShiftConfigPatch {
        shift_table: Some(table),
        ..ShiftConfigPatch::default()
      })
      .expect_err("missing team");
    assert!(
      err.to_string().contains("Team4")
    );
  }

  #[test]
  fn zero_cycle_length_is_malformed() {
    let config =
      ShiftCycleConfig::reference();
    assert!(
      config
        .merged(&ShiftConfigPatch {
          cycle_length: Some(0),
          ..ShiftConfigPatch::default()
        })
        .is_err()
    );
  }

  #[test]
  fn oversized_cycle_length_is_malformed()
  {
    let config =
      ShiftCycleConfig::reference();
    for length in [
      MAX_CYCLE_LENGTH + 4,
      (usize::MAX / 4) * 4
    ] {
      let err = config
        .merged(&ShiftConfigPatch {
          cycle_length: Some(length),
          ..ShiftConfigPatch::default()
        })
        .expect_err("too long");
      assert!(matches!(
        err,
        ShiftError::MalformedConfig(_)
      ));
    }

    let longest = config
      .merged(&ShiftConfigPatch {
        cycle_length: Some(
          MAX_CYCLE_LENGTH
        ),
        ..ShiftConfigPatch::default()
      })
      .expect("longest cycle");
    assert_eq!(
      longest.shift_table[&TeamId::Team1]
        .len(),
      MAX_CYCLE_LENGTH
    );
  }
}
