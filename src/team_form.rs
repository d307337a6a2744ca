use serde::Serialize;

use crate::feature_schema::SIDE_FEATURES;
use crate::form_window::FormWindow;
use crate::match_record::{FullTimeResult, MatchRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Venue {
    Home,
    Away,
}

/// A result from one team's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FormResult {
    Win,
    Draw,
    Loss,
}

impl FormResult {
    pub fn for_venue(result: FullTimeResult, venue: Venue) -> Self {
        match (result, venue) {
            (FullTimeResult::Draw, _) => FormResult::Draw,
            (FullTimeResult::HomeWin, Venue::Home) | (FullTimeResult::AwayWin, Venue::Away) => {
                FormResult::Win
            }
            _ => FormResult::Loss,
        }
    }

    pub fn letter(self) -> char {
        match self {
            FormResult::Win => 'W',
            FormResult::Draw => 'D',
            FormResult::Loss => 'L',
        }
    }
}

/// Totals restricted to matches played at one venue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VenueRecord {
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_scored: u32,
    pub goals_conceded: u32,
}

impl VenueRecord {
    pub fn matches(&self) -> u32 {
        self.wins + self.draws + self.losses
    }

    pub fn win_ratio(&self) -> f64 {
        ratio(self.wins, self.matches())
    }

    pub fn avg_goals_scored(&self) -> f64 {
        ratio(self.goals_scored, self.matches())
    }

    pub fn avg_goals_conceded(&self) -> f64 {
        ratio(self.goals_conceded, self.matches())
    }
}

/// Running statistics for one team, updated after every match it plays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamFormState {
    pub matches_played: u32,
    pub goals_scored: u32,
    pub goals_conceded: u32,
    pub shots_on_target: u32,
    pub corners: u32,
    pub fouls: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub home: VenueRecord,
    pub away: VenueRecord,
    pub last5_goals_scored: FormWindow<u32>,
    pub last5_goals_conceded: FormWindow<u32>,
    pub last5_results: FormWindow<FormResult>,
}

impl TeamFormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a finished match into the running totals. `venue` is where this
    /// team played it.
    pub fn apply(&mut self, record: &MatchRecord, venue: Venue) {
        let (scored, conceded, stats) = match venue {
            Venue::Home => (record.home_goals, record.away_goals, &record.home_stats),
            Venue::Away => (record.away_goals, record.home_goals, &record.away_stats),
        };

        self.matches_played += 1;
        self.goals_scored += scored;
        self.goals_conceded += conceded;
        self.shots_on_target += stats.shots_on_target.unwrap_or(0);
        self.corners += stats.corners.unwrap_or(0);
        self.fouls += stats.fouls.unwrap_or(0);
        self.yellow_cards += stats.yellow_cards.unwrap_or(0);
        self.red_cards += stats.red_cards.unwrap_or(0);

        let outcome = FormResult::for_venue(record.result, venue);
        let venue_record = match venue {
            Venue::Home => &mut self.home,
            Venue::Away => &mut self.away,
        };
        venue_record.goals_scored += scored;
        venue_record.goals_conceded += conceded;
        match outcome {
            FormResult::Win => {
                self.wins += 1;
                venue_record.wins += 1;
            }
            FormResult::Draw => {
                self.draws += 1;
                venue_record.draws += 1;
            }
            FormResult::Loss => {
                self.losses += 1;
                venue_record.losses += 1;
            }
        }

        self.last5_goals_scored.push(scored);
        self.last5_goals_conceded.push(conceded);
        self.last5_results.push(outcome);
    }

    pub fn venue(&self, venue: Venue) -> &VenueRecord {
        match venue {
            Venue::Home => &self.home,
            Venue::Away => &self.away,
        }
    }

    pub fn avg_goals_scored(&self) -> f64 {
        ratio(self.goals_scored, self.matches_played)
    }

    pub fn avg_goals_conceded(&self) -> f64 {
        ratio(self.goals_conceded, self.matches_played)
    }

    pub fn avg_shots_on_target(&self) -> f64 {
        ratio(self.shots_on_target, self.matches_played)
    }

    pub fn avg_corners(&self) -> f64 {
        ratio(self.corners, self.matches_played)
    }

    pub fn win_ratio(&self) -> f64 {
        ratio(self.wins, self.matches_played)
    }

    pub fn draw_ratio(&self) -> f64 {
        ratio(self.draws, self.matches_played)
    }

    pub fn loss_ratio(&self) -> f64 {
        ratio(self.losses, self.matches_played)
    }

    /// The fifteen per-side columns, in schema order, for a team about to
    /// play at `venue`.
    pub fn side_features(&self, venue: Venue) -> [f64; SIDE_FEATURES] {
        let at_venue = self.venue(venue);
        [
            self.avg_goals_scored(),
            self.avg_goals_conceded(),
            self.avg_shots_on_target(),
            self.avg_corners(),
            self.win_ratio(),
            self.draw_ratio(),
            self.loss_ratio(),
            self.last5_goals_scored.mean(),
            self.last5_goals_conceded.mean(),
            self.last5_results.share(&FormResult::Win),
            self.last5_results.share(&FormResult::Draw),
            self.last5_results.share(&FormResult::Loss),
            at_venue.win_ratio(),
            at_venue.avg_goals_scored(),
            at_venue.avg_goals_conceded(),
        ]
    }

    /// Last results as letters, oldest first, e.g. `WDLWW`.
    pub fn form_string(&self) -> String {
        self.last5_results.iter().map(|r| r.letter()).collect()
    }
}

fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
