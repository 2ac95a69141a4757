use std::io::Write;

use anyhow::Context;
use chrono::NaiveDate;
use serde_json::json;
use tracing::{debug, instrument};

use crate::calendar::{CalendarController, MonthTarget, YearMonth};
use crate::cli::Command;
use crate::config::AppConfig;
use crate::dateexpr::parse_date_expr;
use crate::render::{Renderer, write_json};
use crate::shift::ShiftLabel;

/// How results are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

#[instrument(skip(out, controller, cfg, renderer))]
pub fn dispatch<W: Write>(
    mut out: W,
    controller: &mut CalendarController,
    cfg: &AppConfig,
    renderer: &Renderer,
    mode: OutputMode,
    command: Command,
) -> anyhow::Result<()> {
    debug!(?command, team = %controller.state().selected_team, "dispatching command");

    match command {
        Command::Shift { date } => cmd_shift(&mut out, controller, renderer, mode, date.as_deref()),
        Command::Teams { date } => cmd_teams(&mut out, controller, renderer, mode, date.as_deref()),
        Command::Month { month, select } => cmd_month(
            &mut out,
            controller,
            renderer,
            mode,
            month.as_deref(),
            select.as_deref(),
        ),
        Command::Range { from, to } => cmd_range(&mut out, controller, renderer, mode, &from, &to),
        Command::Next { label, from } => cmd_next(&mut out, controller, mode, label, from.as_deref()),
        Command::Colors => cmd_colors(&mut out, controller, renderer, mode),
        Command::Config => cmd_config(&mut out, controller, cfg, renderer, mode),
    }
}

fn resolve_date(controller: &CalendarController, raw: Option<&str>) -> anyhow::Result<NaiveDate> {
    let today = controller.today();
    match raw {
        Some(raw) => parse_date_expr(raw, today).with_context(|| format!("cannot resolve date '{raw}'")),
        None => Ok(today),
    }
}

fn cmd_shift<W: Write>(
    out: &mut W,
    controller: &mut CalendarController,
    renderer: &Renderer,
    mode: OutputMode,
    raw_date: Option<&str>,
) -> anyhow::Result<()> {
    let date = resolve_date(controller, raw_date)?;
    controller.select_date(date);
    let assignment = controller.get_shift_for_date(date, None)?;

    match mode {
        OutputMode::Json => write_json(
            out,
            &json!({
                "date": date,
                "team": assignment.team,
                "shift": assignment.shift,
                "color": assignment.shift.named_color(),
                "hex": assignment.shift.hex_color(),
            }),
        ),
        OutputMode::Table => renderer.write_shift(out, date, assignment),
    }
}

fn cmd_teams<W: Write>(
    out: &mut W,
    controller: &mut CalendarController,
    renderer: &Renderer,
    mode: OutputMode,
    raw_date: Option<&str>,
) -> anyhow::Result<()> {
    let date = resolve_date(controller, raw_date)?;
    controller.select_date(date);
    let assignments = controller.calculator().get_all_teams_shifts(date)?;

    match mode {
        OutputMode::Json => write_json(out, &json!({ "date": date, "assignments": assignments })),
        OutputMode::Table => renderer.write_teams(out, date, &assignments),
    }
}

fn cmd_month<W: Write>(
    out: &mut W,
    controller: &mut CalendarController,
    renderer: &Renderer,
    mode: OutputMode,
    raw_month: Option<&str>,
    raw_select: Option<&str>,
) -> anyhow::Result<()> {
    if let Some(raw) = raw_select {
        let date = resolve_date(controller, Some(raw))?;
        controller.select_date(date);
    }
    if let Some(raw) = raw_month {
        let month = raw
            .parse::<YearMonth>()
            .with_context(|| format!("expected YYYY-MM, got '{raw}'"))?;
        controller.navigate_month(MonthTarget::Exact(month));
    }

    let state = controller.state();
    let cells = controller.month_view()?;

    match mode {
        OutputMode::Json => write_json(
            out,
            &json!({
                "month": state.visible_month.to_string(),
                "team": state.selected_team,
                "selected_date": state.selected_date,
                "days": cells,
            }),
        ),
        OutputMode::Table => renderer.write_month(out, state.visible_month, state.selected_team, &cells),
    }
}

fn cmd_range<W: Write>(
    out: &mut W,
    controller: &CalendarController,
    renderer: &Renderer,
    mode: OutputMode,
    raw_from: &str,
    raw_to: &str,
) -> anyhow::Result<()> {
    let from = resolve_date(controller, Some(raw_from))?;
    let to = resolve_date(controller, Some(raw_to))?;
    let team = controller.state().selected_team;
    let schedule = controller.calculator().shifts_in_range(team, from, to)?;

    match mode {
        OutputMode::Json => {
            let days = schedule
                .iter()
                .map(|(date, shift)| json!({ "date": date, "shift": shift }))
                .collect::<Vec<_>>();
            write_json(out, &json!({ "team": team, "days": days }))
        }
        OutputMode::Table => renderer.write_range(out, team, &schedule),
    }
}

fn cmd_next<W: Write>(
    out: &mut W,
    controller: &CalendarController,
    mode: OutputMode,
    label: ShiftLabel,
    raw_from: Option<&str>,
) -> anyhow::Result<()> {
    let from = resolve_date(controller, raw_from)?;
    let team = controller.state().selected_team;
    let found = controller.calculator().next_occurrence(team, label, from)?;

    match mode {
        OutputMode::Json => write_json(
            out,
            &json!({ "team": team, "shift": label, "from": from, "date": found }),
        ),
        OutputMode::Table => {
            match found {
                Some(date) => writeln!(out, "{team} next works {label} on {}", date.format("%Y-%m-%d %a"))?,
                None => writeln!(out, "{team} never works {label} in this rotation")?,
            }
            Ok(())
        }
    }
}

fn cmd_colors<W: Write>(
    out: &mut W,
    controller: &CalendarController,
    renderer: &Renderer,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let calculator = controller.calculator();
    let named = calculator.get_shift_colors();
    let detailed = calculator.get_detailed_shift_colors();

    match mode {
        OutputMode::Json => write_json(out, &json!({ "named": named, "detailed": detailed })),
        OutputMode::Table => renderer.write_colors(out, &named, &detailed),
    }
}

fn cmd_config<W: Write>(
    out: &mut W,
    controller: &CalendarController,
    cfg: &AppConfig,
    renderer: &Renderer,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let rotation = controller.calculator().config();
    let source = cfg.loaded_file.as_ref().map(|path| path.display().to_string());

    match mode {
        OutputMode::Json => write_json(
            out,
            &json!({
                "source": source,
                "rotation": *rotation,
                "rotation_days": rotation.rotation_days()?,
                "timezone": cfg.calendar.timezone.name(),
                "default_team": cfg.calendar.default_team,
            }),
        ),
        OutputMode::Table => renderer.write_rotation(out, &rotation, source.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::Value;

    use super::{OutputMode, dispatch};
    use crate::calculator::ShiftCalculator;
    use crate::calendar::{CalendarController, FixedClock};
    use crate::cli::Command;
    use crate::config::AppConfig;
    use crate::render::Renderer;
    use crate::shift::{ShiftLabel, TeamId};

    fn controller(team: TeamId) -> CalendarController {
        CalendarController::new(
            ShiftCalculator::default(),
            team,
            FixedClock(NaiveDate::from_ymd_opt(2025, 7, 15).expect("date")),
        )
    }

    fn run(team: TeamId, mode: OutputMode, command: Command) -> String {
        let mut ctl = controller(team);
        let mut buf = Vec::new();
        dispatch(
            &mut buf,
            &mut ctl,
            &AppConfig::default(),
            &Renderer::new(false),
            mode,
            command,
        )
        .expect("dispatch");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn shift_defaults_to_today() {
        let text = run(TeamId::Team1, OutputMode::Table, Command::Shift { date: None });
        assert_eq!(text.trim(), "2025-07-15 Tue Team1 rest");
    }

    #[test]
    fn shift_json_includes_colors() {
        let text = run(
            TeamId::Team2,
            OutputMode::Json,
            Command::Shift {
                date: Some("tomorrow".to_string()),
            },
        );
        let value: Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value["date"], "2025-07-16");
        assert_eq!(value["team"], "Team2");
        assert_eq!(value["shift"], "rest");
        assert_eq!(value["color"], "gray");
        assert_eq!(value["hex"], "#d9d9d9");
    }

    #[test]
    fn teams_json_is_in_canonical_order() {
        let text = run(
            TeamId::Team1,
            OutputMode::Json,
            Command::Teams {
                date: Some("2025-07-15".to_string()),
            },
        );
        let value: Value = serde_json::from_str(&text).expect("json");
        let teams = value["assignments"]
            .as_array()
            .expect("array")
            .iter()
            .map(|a| format!("{}:{}", a["team"].as_str().unwrap_or(""), a["shift"].as_str().unwrap_or("")))
            .collect::<Vec<_>>();
        assert_eq!(teams, vec!["Team1:rest", "Team2:morning", "Team3:day", "Team4:night"]);
    }

    #[test]
    fn month_json_covers_requested_month() {
        let text = run(
            TeamId::Team3,
            OutputMode::Json,
            Command::Month {
                month: Some("2025-02".to_string()),
                select: None,
            },
        );
        let value: Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value["month"], "2025-02");
        assert_eq!(value["days"].as_array().expect("days").len(), 28);
        assert_eq!(value["selected_date"], "2025-07-15");
    }

    #[test]
    fn next_finds_upcoming_shift() {
        let text = run(
            TeamId::Team4,
            OutputMode::Table,
            Command::Next {
                label: ShiftLabel::Day,
                from: None,
            },
        );
        assert_eq!(text.trim(), "Team4 next works day on 2025-07-18 Fri");
    }

    #[test]
    fn bad_date_is_an_error() {
        let mut ctl = controller(TeamId::Team1);
        let err = dispatch(
            Vec::new(),
            &mut ctl,
            &AppConfig::default(),
            &Renderer::new(false),
            OutputMode::Table,
            Command::Shift {
                date: Some("2025-02-30".to_string()),
            },
        )
        .expect_err("invalid date");
        assert!(format!("{err:#}").contains("invalid date"));
    }

    #[test]
    fn config_lists_derived_days() {
        let text = run(TeamId::Team1, OutputMode::Table, Command::Config);
        assert!(text.contains("base date     2025-07-15"));
        assert!(text.contains("D3"));
    }
}
