use std::collections::BTreeMap;
use std::io::Write;

use chrono::{Datelike, NaiveDate};
use unicode_width::UnicodeWidthStr;

use crate::calendar::{CalendarCell, YearMonth};
use crate::rotation::ShiftCycleConfig;
use crate::shift::{HexColor, NamedColor, ShiftAssignment, ShiftLabel, TeamId};

const WEEKDAY_HEADERS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    /// `color` should already account for whether the target is a terminal.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    #[tracing::instrument(skip(self, out))]
    pub fn write_shift<W: Write>(
        &self,
        mut out: W,
        date: NaiveDate,
        assignment: ShiftAssignment,
    ) -> anyhow::Result<()> {
        writeln!(
            out,
            "{} {} {}",
            date.format("%Y-%m-%d %a"),
            assignment.team,
            self.paint_label(assignment.shift)
        )?;
        Ok(())
    }

    #[tracing::instrument(skip(self, out, assignments))]
    pub fn write_teams<W: Write>(
        &self,
        mut out: W,
        date: NaiveDate,
        assignments: &[ShiftAssignment],
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", date.format("%Y-%m-%d %A"))?;
        let rows: Vec<Vec<String>> = assignments
            .iter()
            .map(|a| vec![a.team.to_string(), self.paint_label(a.shift)])
            .collect();
        write_table(&mut out, vec!["Team".to_string(), "Shift".to_string()], rows)
    }

    /// Monday-first month grid. Today is suffixed with `*` and the selected
    /// date is prefixed with `>`.
    #[tracing::instrument(skip(self, out, cells))]
    pub fn write_month<W: Write>(
        &self,
        mut out: W,
        month: YearMonth,
        team: TeamId,
        cells: &[CalendarCell],
    ) -> anyhow::Result<()> {
        writeln!(out, "{month} {team}")?;

        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut week: Vec<String> = Vec::with_capacity(7);

        let lead = month.first_day().weekday().num_days_from_monday() as usize;
        week.extend(std::iter::repeat_n(String::new(), lead));

        for cell in cells {
            let marker = if cell.is_selected { ">" } else { "" };
            let today = if cell.is_today { "*" } else { "" };
            week.push(format!(
                "{marker}{:>2} {}{today}",
                cell.date.day(),
                self.paint_label(cell.assignment.shift)
            ));
            if week.len() == 7 {
                rows.push(std::mem::take(&mut week));
            }
        }

        if !week.is_empty() {
            week.resize(7, String::new());
            rows.push(week);
        }

        let headers: Vec<String> = WEEKDAY_HEADERS.iter().map(|h| h.to_string()).collect();
        write_table(&mut out, headers, rows)
    }

    #[tracing::instrument(skip(self, out, schedule))]
    pub fn write_range<W: Write>(
        &self,
        mut out: W,
        team: TeamId,
        schedule: &[(NaiveDate, ShiftLabel)],
    ) -> anyhow::Result<()> {
        writeln!(out, "{team}")?;
        let rows: Vec<Vec<String>> = schedule
            .iter()
            .map(|(date, label)| {
                vec![
                    date.format("%Y-%m-%d").to_string(),
                    date.format("%a").to_string(),
                    self.paint_label(*label),
                ]
            })
            .collect();
        write_table(
            &mut out,
            vec!["Date".to_string(), "Day".to_string(), "Shift".to_string()],
            rows,
        )
    }

    pub fn write_colors<W: Write>(
        &self,
        mut out: W,
        named: &BTreeMap<ShiftLabel, NamedColor>,
        detailed: &BTreeMap<ShiftLabel, HexColor>,
    ) -> anyhow::Result<()> {
        let rows: Vec<Vec<String>> = ShiftLabel::ALL
            .iter()
            .map(|label| {
                vec![
                    self.paint_label(*label),
                    named.get(label).map(ToString::to_string).unwrap_or_default(),
                    detailed.get(label).map(ToString::to_string).unwrap_or_default(),
                ]
            })
            .collect();
        write_table(
            &mut out,
            vec!["Shift".to_string(), "Color".to_string(), "Hex".to_string()],
            rows,
        )
    }

    /// Team table followed by the derived day-of-cycle table.
    pub fn write_rotation<W: Write>(
        &self,
        mut out: W,
        config: &ShiftCycleConfig,
        source: Option<&str>,
    ) -> anyhow::Result<()> {
        writeln!(out, "source        {}", source.unwrap_or("reference defaults"))?;
        writeln!(out, "base date     {}", config.base_date)?;
        writeln!(out, "cycle length  {}", config.cycle_length)?;
        writeln!(out)?;

        let day_headers = (0..config.cycle_length).map(|day| format!("D{day}"));
        let headers: Vec<String> = std::iter::once("Team".to_string()).chain(day_headers).collect();
        let rows: Vec<Vec<String>> = config
            .shift_table
            .iter()
            .map(|(team, sequence)| {
                std::iter::once(team.to_string())
                    .chain(sequence.iter().map(|label| self.paint_label(*label)))
                    .collect()
            })
            .collect();
        write_table(&mut out, headers, rows)?;
        writeln!(out)?;

        let rotation_days = config.rotation_days()?;
        let headers: Vec<String> = std::iter::once("Day".to_string())
            .chain(TeamId::ALL.iter().map(ToString::to_string))
            .collect();
        let rows: Vec<Vec<String>> = rotation_days
            .iter()
            .enumerate()
            .map(|(day, teams)| {
                std::iter::once(format!("D{day}"))
                    .chain(teams.values().map(|label| self.paint_label(*label)))
                    .collect()
            })
            .collect();
        write_table(&mut out, headers, rows)
    }

    fn paint_label(&self, label: ShiftLabel) -> String {
        self.paint(label.as_str(), label.named_color().ansi_code())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// Prints `value` as pretty JSON on its own line.
pub fn write_json<W: Write, T: serde::Serialize>(mut out: W, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, width) in widths.iter().enumerate() {
            let cell = row.get(idx).map(String::as_str).unwrap_or("");
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
