use std::collections::VecDeque;

use tracing::{info, warn};

use crate::match_record::{MatchRecord, team_names};
use crate::model_store::ModelArtifacts;
use crate::predictor::{Prediction, predict_fixture};

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormFocus {
    Home,
    Away,
}

/// Why no prediction can be made right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    Ready,
    Missing,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub history: Vec<MatchRecord>,
    pub teams: Vec<String>,
    pub home_idx: usize,
    pub away_idx: usize,
    pub focus: FormFocus,
    pub artifacts: Option<ModelArtifacts>,
    pub model_status: ModelStatus,
    pub prediction: Option<Prediction>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl AppState {
    pub fn new(history: Vec<MatchRecord>, artifacts: Option<ModelArtifacts>) -> Self {
        let teams = team_names(&history);
        let model_status = if artifacts.is_some() {
            ModelStatus::Ready
        } else {
            ModelStatus::Missing
        };
        Self {
            away_idx: if teams.len() > 1 { 1 } else { 0 },
            home_idx: 0,
            teams,
            history,
            focus: FormFocus::Home,
            artifacts,
            model_status,
            prediction: None,
            logs: VecDeque::with_capacity(MAX_LOGS),
            help_overlay: false,
        }
    }

    pub fn with_model_error(mut self, err: impl Into<String>) -> Self {
        self.artifacts = None;
        self.model_status = ModelStatus::Failed(err.into());
        self
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FormFocus::Home => FormFocus::Away,
            FormFocus::Away => FormFocus::Home,
        };
    }

    fn focused_idx(&mut self) -> &mut usize {
        match self.focus {
            FormFocus::Home => &mut self.home_idx,
            FormFocus::Away => &mut self.away_idx,
        }
    }

    pub fn select_next(&mut self) {
        let total = self.teams.len();
        let idx = self.focused_idx();
        *idx = if total == 0 { 0 } else { (*idx + 1) % total };
    }

    pub fn select_prev(&mut self) {
        let total = self.teams.len();
        let idx = self.focused_idx();
        *idx = if total == 0 {
            0
        } else if *idx == 0 {
            total - 1
        } else {
            *idx - 1
        };
    }

    pub fn home_team(&self) -> Option<&str> {
        self.teams.get(self.home_idx).map(String::as_str)
    }

    pub fn away_team(&self) -> Option<&str> {
        self.teams.get(self.away_idx).map(String::as_str)
    }

    /// Runs the selected fixture through the model. Problems end up in the
    /// log rather than as errors.
    pub fn predict_selected(&mut self) {
        let (Some(home), Some(away)) = (self.home_team(), self.away_team()) else {
            self.push_log("[WARN] No teams loaded");
            return;
        };
        let (home, away) = (home.to_string(), away.to_string());
        if home == away {
            self.prediction = None;
            self.push_log("[WARN] Pick two different teams");
            return;
        }
        let Some(artifacts) = self.artifacts.as_ref() else {
            self.push_log("[WARN] Model unavailable, run `train` first");
            return;
        };

        match predict_fixture(&self.history, &home, &away, artifacts) {
            Ok(prediction) => {
                info!(home = %home, away = %away, "fixture predicted");
                let (top, p) = prediction.ranked[0];
                let line = format!(
                    "[INFO] {home} v {away}: {} {:.1}%",
                    prediction.label(top),
                    p * 100.0
                );
                self.prediction = Some(prediction);
                self.push_log(line);
            }
            Err(err) => {
                warn!(error = %err, "prediction failed");
                self.prediction = None;
                self.push_log(format!("[ERROR] {err}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_is_capped() {
        let mut s = AppState::new(Vec::new(), None);
        for i in 0..250 {
            s.push_log(format!("line {i}"));
        }
        assert_eq!(s.logs.len(), MAX_LOGS);
        assert_eq!(s.logs.front().map(String::as_str), Some("line 50"));
    }
}
