use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ShiftError;

/// A fixed work group on the rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TeamId {
    Team1,
    Team2,
    Team3,
    Team4,
}

impl TeamId {
    /// Canonical team order used by every multi-team view.
    pub const ALL: [TeamId; 4] = [TeamId::Team1, TeamId::Team2, TeamId::Team3, TeamId::Team4];

    pub fn as_str(self) -> &'static str {
        match self {
            TeamId::Team1 => "Team1",
            TeamId::Team2 => "Team2",
            TeamId::Team3 => "Team3",
            TeamId::Team4 => "Team4",
        }
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamId {
    type Err = ShiftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let number = lower.strip_prefix("team").unwrap_or(&lower);
        match number {
            "1" => Ok(TeamId::Team1),
            "2" => Ok(TeamId::Team2),
            "3" => Ok(TeamId::Team3),
            "4" => Ok(TeamId::Team4),
            _ => Err(ShiftError::UnknownTeam(s.trim().to_string())),
        }
    }
}

/// The kind of duty a team has on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftLabel {
    Rest,
    Morning,
    Day,
    Night,
}

impl ShiftLabel {
    pub const ALL: [ShiftLabel; 4] = [
        ShiftLabel::Rest,
        ShiftLabel::Morning,
        ShiftLabel::Day,
        ShiftLabel::Night,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ShiftLabel::Rest => "rest",
            ShiftLabel::Morning => "morning",
            ShiftLabel::Day => "day",
            ShiftLabel::Night => "night",
        }
    }

    // Both color scales are exhaustive matches so a new label cannot be
    // added without a color.
    pub fn named_color(self) -> NamedColor {
        match self {
            ShiftLabel::Morning => NamedColor::Blue,
            ShiftLabel::Day => NamedColor::Green,
            ShiftLabel::Night => NamedColor::Purple,
            ShiftLabel::Rest => NamedColor::Gray,
        }
    }

    pub fn hex_color(self) -> HexColor {
        match self {
            ShiftLabel::Morning => HexColor("#1890ff"),
            ShiftLabel::Day => HexColor("#52c41a"),
            ShiftLabel::Night => HexColor("#722ed1"),
            ShiftLabel::Rest => HexColor("#d9d9d9"),
        }
    }
}

impl fmt::Display for ShiftLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShiftLabel {
    type Err = ShiftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" => Ok(ShiftLabel::Rest),
            "morning" => Ok(ShiftLabel::Morning),
            "day" => Ok(ShiftLabel::Day),
            "night" => Ok(ShiftLabel::Night),
            other => Err(ShiftError::MalformedConfig(format!("unknown shift label: {other}"))),
        }
    }
}

/// Coarse color scale used for text labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamedColor {
    Blue,
    Green,
    Purple,
    Gray,
}

impl NamedColor {
    pub fn as_str(self) -> &'static str {
        match self {
            NamedColor::Blue => "blue",
            NamedColor::Green => "green",
            NamedColor::Purple => "purple",
            NamedColor::Gray => "gray",
        }
    }

    /// SGR foreground code for terminal output.
    pub fn ansi_code(self) -> &'static str {
        match self {
            NamedColor::Blue => "34",
            NamedColor::Green => "32",
            NamedColor::Purple => "35",
            NamedColor::Gray => "90",
        }
    }
}

impl fmt::Display for NamedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `#rrggbb` color used for cell backgrounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HexColor(pub &'static str);

impl HexColor {
    pub fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShiftAssignment {
    pub team: TeamId,
    pub shift: ShiftLabel,
}

pub fn shift_colors() -> BTreeMap<ShiftLabel, NamedColor> {
    ShiftLabel::ALL
        .iter()
        .map(|label| (*label, label.named_color()))
        .collect()
}

pub fn detailed_shift_colors() -> BTreeMap<ShiftLabel, HexColor> {
    ShiftLabel::ALL
        .iter()
        .map(|label| (*label, label.hex_color()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_team_spellings() {
        assert_eq!("Team1".parse::<TeamId>().expect("team"), TeamId::Team1);
        assert_eq!("team3".parse::<TeamId>().expect("team"), TeamId::Team3);
        assert_eq!(" 4 ".parse::<TeamId>().expect("team"), TeamId::Team4);
        assert_eq!(
            "Team5".parse::<TeamId>(),
            Err(ShiftError::UnknownTeam("Team5".to_string()))
        );
    }

    #[test]
    fn color_tables_cover_every_label() {
        let named = shift_colors();
        let hex = detailed_shift_colors();
        for label in ShiftLabel::ALL {
            assert!(named.contains_key(&label), "missing named color for {label}");
            assert!(hex.contains_key(&label), "missing hex color for {label}");
        }
        assert_eq!(named[&ShiftLabel::Morning], NamedColor::Blue);
        assert_eq!(hex[&ShiftLabel::Night].as_str(), "#722ed1");
    }

    #[test]
    fn shift_label_rejects_unknown_kind() {
        assert!("swing".parse::<ShiftLabel>().is_err());
        assert_eq!("NIGHT".parse::<ShiftLabel>().expect("label"), ShiftLabel::Night);
    }
}
