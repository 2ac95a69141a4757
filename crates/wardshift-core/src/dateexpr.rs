use chrono::{
  Duration,
  NaiveDate
};
use regex::Regex;

use crate::error::{
  ShiftError,
  ShiftResult
};

/// Parses `YYYY-MM-DD` (or
/// `YYYY/MM/DD`) into a calendar date.
pub fn parse_iso_date(
  raw: &str
) -> ShiftResult<NaiveDate> {
  let token = raw.trim();
  let invalid = || {
    ShiftError::InvalidDate(
      token.to_string()
    )
  };

  let iso_re = Regex::new(
    r"^(?P<y>-?\d{4,6})[-/](?P<m>\d{1,2})[-/](?P<d>\d{1,2})$"
  )
  .map_err(|err| {
    ShiftError::InvalidDate(format!(
      "{token}: {err}"
    ))
  })?;

  let caps = iso_re
    .captures(token)
    .ok_or_else(invalid)?;
  let year = caps["y"]
    .parse::<i32>()
    .map_err(|_| invalid())?;
  let month = caps["m"]
    .parse::<u32>()
    .map_err(|_| invalid())?;
  let day = caps["d"]
    .parse::<u32>()
    .map_err(|_| invalid())?;

  NaiveDate::from_ymd_opt(
    year, month, day
  )
  .ok_or_else(invalid)
}

/// Resolves a user-facing date
/// expression relative to `today`.
///
/// Accepts `today`, `tomorrow`,
/// `yesterday`, offsets such as `+3d` or
/// `-2w`, and ISO dates.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> ShiftResult<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" | "now" => {
      return Ok(today);
    }
    | "tomorrow" => {
      return add_days(today, 1, token);
    }
    | "yesterday" => {
      return add_days(today, -1, token);
    }
    | _ => {}
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$"
  )
  .map_err(|err| {
    ShiftError::InvalidDate(format!(
      "{token}: {err}"
    ))
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num = caps["num"]
      .parse::<i64>()
      .map_err(|_| {
        ShiftError::InvalidDate(
          token.to_string()
        )
      })?;
    let sign = if &caps["sign"] == "-" {
      -1
    } else {
      1
    };
    let unit_days = match &caps["unit"]
    {
      | "w" => 7,
      | _ => 1
    };
    let days = num
      .checked_mul(unit_days)
      .and_then(|d| d.checked_mul(sign))
      .ok_or_else(|| {
        ShiftError::InvalidDate(
          token.to_string()
        )
      })?;
    return add_days(today, days, token);
  }

  parse_iso_date(token)
}

fn add_days(
  date: NaiveDate,
  days: i64,
  source: &str
) -> ShiftResult<NaiveDate> {
  Duration::try_days(days)
    .and_then(|delta| {
      date.checked_add_signed(delta)
    })
    .ok_or_else(|| {
      ShiftError::InvalidDate(format!(
        "{source} is out of range"
      ))
    })
}
