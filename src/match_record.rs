use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FullTimeResult {
    #[serde(rename = "H")]
    HomeWin,
    #[serde(rename = "D")]
    Draw,
    #[serde(rename = "A")]
    AwayWin,
}

impl FullTimeResult {
    pub const ALL: [FullTimeResult; 3] = [
        FullTimeResult::HomeWin,
        FullTimeResult::Draw,
        FullTimeResult::AwayWin,
    ];

    pub fn code(self) -> char {
        match self {
            FullTimeResult::HomeWin => 'H',
            FullTimeResult::Draw => 'D',
            FullTimeResult::AwayWin => 'A',
        }
    }

    pub fn from_code(raw: &str) -> Option<Self> {
        match raw.trim() {
            "H" | "h" => Some(FullTimeResult::HomeWin),
            "D" | "d" => Some(FullTimeResult::Draw),
            "A" | "a" => Some(FullTimeResult::AwayWin),
            _ => None,
        }
    }

    pub fn from_goals(home_goals: u32, away_goals: u32) -> Self {
        match home_goals.cmp(&away_goals) {
            std::cmp::Ordering::Greater => FullTimeResult::HomeWin,
            std::cmp::Ordering::Less => FullTimeResult::AwayWin,
            std::cmp::Ordering::Equal => FullTimeResult::Draw,
        }
    }
}

impl fmt::Display for FullTimeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Per-side match statistics. Seasons in the source files do not always carry
/// every column, so each count is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideStats {
    pub shots: Option<u32>,
    pub shots_on_target: Option<u32>,
    pub corners: Option<u32>,
    pub fouls: Option<u32>,
    pub yellow_cards: Option<u32>,
    pub red_cards: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub league: Option<String>,
    pub season: String,
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: u32,
    pub away_goals: u32,
    pub result: FullTimeResult,
    pub half_time_home_goals: Option<u32>,
    pub half_time_away_goals: Option<u32>,
    pub referee: Option<String>,
    pub home_stats: SideStats,
    pub away_stats: SideStats,
}

impl MatchRecord {
    /// Bare fixture with no optional statistics.
    pub fn new(
        date: NaiveDate,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        home_goals: u32,
        away_goals: u32,
        result: FullTimeResult,
    ) -> Self {
        Self {
            league: None,
            season: "Current".to_string(),
            date,
            home_team: home_team.into(),
            away_team: away_team.into(),
            home_goals,
            away_goals,
            result,
            half_time_home_goals: None,
            half_time_away_goals: None,
            referee: None,
            home_stats: SideStats::default(),
            away_stats: SideStats::default(),
        }
    }

    pub fn with_stats(mut self, home: SideStats, away: SideStats) -> Self {
        self.home_stats = home;
        self.away_stats = away;
        self
    }
}

/// Sorted, de-duplicated list of every team appearing in `matches`.
pub fn team_names(matches: &[MatchRecord]) -> Vec<String> {
    let mut names: Vec<String> = matches
        .iter()
        .flat_map(|m| [m.home_team.clone(), m.away_team.clone()])
        .collect();
    names.sort();
    names.dedup();
    names
}
