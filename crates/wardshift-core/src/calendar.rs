use std::fmt;
use std::str::FromStr;

use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{
  debug,
  trace
};

use crate::calculator::ShiftCalculator;
use crate::error::{
  ShiftError,
  ShiftResult
};
use crate::rotation::ShiftConfigPatch;
use crate::shift::{
  HexColor,
  NamedColor,
  ShiftAssignment,
  TeamId
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
)]
pub struct YearMonth {
  year:  i32,
  month: u32
}

impl YearMonth {
  pub fn new(
    year: i32,
    month: u32
  ) -> ShiftResult<Self> {
    if NaiveDate::from_ymd_opt(
      year, month, 1
    )
    .is_none()
    {
      return Err(ShiftError::InvalidDate(
        format!("{year:04}-{month:02}")
      ));
    }
    Ok(Self { year, month })
  }

  pub fn of(date: NaiveDate) -> Self {
    Self {
      year:  date.year(),
      month: date.month()
    }
  }

  pub fn year(self) -> i32 {
    self.year
  }

  pub fn month(self) -> u32 {
    self.month
  }

  pub fn first_day(self) -> NaiveDate {
    NaiveDate::from_ymd_opt(
      self.year, self.month, 1
    )
    .unwrap_or(NaiveDate::MIN)
  }

  pub fn last_day(self) -> NaiveDate {
    if self.month >= 12 {
      return NaiveDate::from_ymd_opt(
        self.year, 12, 31
      )
      .unwrap_or(NaiveDate::MAX);
    }
    NaiveDate::from_ymd_opt(
      self.year,
      self.month + 1,
      1
    )
    .and_then(|next| {
      next.checked_sub_signed(
        Duration::days(1)
      )
    })
    .unwrap_or(NaiveDate::MAX)
  }

  pub fn days_in_month(self) -> u32 {
    self.last_day().day()
  }

  /// Moves by `months`, clamped to the
  /// representable calendar range.
  #[must_use]
  pub fn offset(
    self,
    months: i32
  ) -> Self {
    let min = i64::from(
      NaiveDate::MIN.year()
    ) * 12;
    let max = i64::from(
      NaiveDate::MAX.year()
    ) * 12
      + 11;
    let current = i64::from(self.year)
      * 12
      + i64::from(self.month - 1);
    let target = (current
      + i64::from(months))
    .clamp(min, max);

    Self {
      year:  target.div_euclid(12)
        as i32,
      month: target.rem_euclid(12)
        as u32
        + 1
    }
  }

  /// Every date of the month, ascending.
  pub fn dates(self) -> Vec<NaiveDate> {
    let last = self.last_day();
    self
      .first_day()
      .iter_days()
      .take_while(|date| *date <= last)
      .collect()
  }
}

impl fmt::Display for YearMonth {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{:04}-{:02}",
      self.year, self.month
    )
  }
}

impl FromStr for YearMonth {
  type Err = ShiftError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let token = s.trim();
    let invalid = || {
      ShiftError::InvalidDate(
        token.to_string()
      )
    };
    let (year, month) = token
      .rsplit_once('-')
      .or_else(|| {
        token.rsplit_once('/')
      })
      .ok_or_else(invalid)?;
    let year = year
      .parse::<i32>()
      .map_err(|_| invalid())?;
    let month = month
      .parse::<u32>()
      .map_err(|_| invalid())?;
    YearMonth::new(year, month)
  }
}

/// What the calendar currently shows.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct CalendarSelectionState {
  pub selected_date: NaiveDate,
  pub selected_team: TeamId,
  pub visible_month: YearMonth
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthTarget {
  Offset(i32),
  Exact(YearMonth)
}

/// Source of "today".
pub trait Clock {
  fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
  pub timezone: Tz
}

impl Clock for SystemClock {
  fn today(&self) -> NaiveDate {
    Utc::now()
      .with_timezone(&self.timezone)
      .date_naive()
  }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
  fn today(&self) -> NaiveDate {
    self.0
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
pub struct SubscriptionId(u64);

type Listener =
  Box<dyn FnMut(&CalendarSelectionState)>;

/// One rendered day of the visible month.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CalendarCell {
  pub date:        NaiveDate,
  pub assignment:  ShiftAssignment,
  pub named_color: NamedColor,
  pub hex_color:   HexColor,
  pub is_selected: bool,
  pub is_today:    bool
}

/// Owns the selection state. The
/// operations below are the only way to
/// change it; each one swaps in a fully
/// built state and then notifies
/// subscribers.
pub struct CalendarController {
  calculator: ShiftCalculator,
  state:      CalendarSelectionState,
  clock:      Box<dyn Clock>,
  listeners:  Vec<(SubscriptionId, Listener)>,
  next_subscription: u64
}

impl CalendarController {
  pub fn new<C>(
    calculator: ShiftCalculator,
    default_team: TeamId,
    clock: C
  ) -> Self
  where
    C: Clock + 'static
  {
    let today = clock.today();
    Self {
      calculator,
      state: CalendarSelectionState {
        selected_date: today,
        selected_team: default_team,
        visible_month: YearMonth::of(
          today
        )
      },
      clock: Box::new(clock),
      listeners: Vec::new(),
      next_subscription: 0
    }
  }

  pub fn state(
    &self
  ) -> CalendarSelectionState {
    self.state
  }

  pub fn calculator(
    &self
  ) -> &ShiftCalculator {
    &self.calculator
  }

  pub fn today(&self) -> NaiveDate {
    self.clock.today()
  }

  pub fn subscribe<F>(
    &mut self,
    listener: F
  ) -> SubscriptionId
  where
    F: FnMut(&CalendarSelectionState)
      + 'static
  {
    let id = SubscriptionId(
      self.next_subscription
    );
    self.next_subscription += 1;
    self
      .listeners
      .push((id, Box::new(listener)));
    trace!(?id, "calendar subscriber added");
    id
  }

  pub fn unsubscribe(
    &mut self,
    id: SubscriptionId
  ) -> bool {
    let before = self.listeners.len();
    self
      .listeners
      .retain(|(existing, _)| {
        *existing != id
      });
    before != self.listeners.len()
  }

  pub fn select_date(
    &mut self,
    date: NaiveDate
  ) {
    self.replace_state(
      CalendarSelectionState {
        selected_date: date,
        visible_month: YearMonth::of(
          date
        ),
        ..self.state
      }
    );
  }

  pub fn select_team(
    &mut self,
    team: TeamId
  ) {
    self.replace_state(
      CalendarSelectionState {
        selected_team: team,
        ..self.state
      }
    );
  }

  pub fn navigate_month(
    &mut self,
    target: MonthTarget
  ) {
    let visible_month = match target {
      | MonthTarget::Offset(delta) => {
        self
          .state
          .visible_month
          .offset(delta)
      }
      | MonthTarget::Exact(month) => {
        month
      }
    };
    self.replace_state(
      CalendarSelectionState {
        visible_month,
        ..self.state
      }
    );
  }

  pub fn go_to_today(&mut self) {
    let today = self.clock.today();
    self.replace_state(
      CalendarSelectionState {
        selected_date: today,
        visible_month: YearMonth::of(
          today
        ),
        ..self.state
      }
    );
  }

  pub fn list_visible_dates(
    &self
  ) -> Vec<NaiveDate> {
    self.state.visible_month.dates()
  }

  pub fn get_shift_for_date(
    &self,
    date: NaiveDate,
    team: Option<TeamId>
  ) -> ShiftResult<ShiftAssignment> {
    let team = team.unwrap_or(
      self.state.selected_team
    );
    let shift = self
      .calculator
      .calculate_shift(date, team)?;
    Ok(ShiftAssignment { team, shift })
  }

  /// Reconfigures the calculator.
  /// Subscribers are notified so they
  /// re-query derived views. An empty
  /// patch changes nothing and is not
  /// broadcast.
  pub fn update_config(
    &mut self,
    patch: &ShiftConfigPatch
  ) -> ShiftResult<()> {
    if patch.is_empty() {
      return Ok(());
    }
    self.calculator.update_config(patch)?;
    self.notify();
    Ok(())
  }

  /// Cells for every visible date with
  /// the selected team's shift.
  pub fn month_view(
    &self
  ) -> ShiftResult<Vec<CalendarCell>> {
    let today = self.clock.today();
    self
      .list_visible_dates()
      .into_iter()
      .map(|date| -> ShiftResult<CalendarCell> {
        let assignment = self
          .get_shift_for_date(
            date, None
          )?;
        Ok(CalendarCell {
          date,
          assignment,
          named_color: assignment
            .shift
            .named_color(),
          hex_color: assignment
            .shift
            .hex_color(),
          is_selected: date
            == self.state.selected_date,
          is_today: date == today
        })
      })
      .collect()
  }

  fn replace_state(
    &mut self,
    next: CalendarSelectionState
  ) {
    if next == self.state {
      return;
    }
    debug!(
      selected_date = %next.selected_date,
      selected_team = %next.selected_team,
      visible_month = %next.visible_month,
      "calendar selection changed"
    );
    self.state = next;
    self.notify();
  }

  fn notify(&mut self) {
    let state = self.state;
    for (_, listener) in
      &mut self.listeners
    {
      listener(&state);
    }
  }
}
