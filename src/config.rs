use std::path::PathBuf;

use chrono::NaiveDate;

use crate::gbt::GbtConfig;
use crate::match_store;
use crate::training::TrainingConfig;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_MODELS_DIR: &str = "models";
pub const DEFAULT_LEAGUE_PREFIX: &str = "E0";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub league_prefix: String,
    pub models_dir: PathBuf,
    pub db_path: Option<PathBuf>,
    pub backtest_cutoff: NaiveDate,
    pub training: TrainingConfig,
}

impl AppConfig {
    /// Reads `.env.local` then `.env` (earlier files win) and the process
    /// environment. Unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");

        let defaults = TrainingConfig::default();
        let gbt_defaults = GbtConfig::default();
        let gbt = GbtConfig {
            rounds: env_parse("MATCHDAY_GBT_ROUNDS", gbt_defaults.rounds).clamp(1, 5_000),
            eta: env_parse("MATCHDAY_GBT_ETA", gbt_defaults.eta).clamp(1e-4, 1.0),
            max_depth: env_parse("MATCHDAY_GBT_MAX_DEPTH", gbt_defaults.max_depth).clamp(1, 16),
            lambda: env_parse("MATCHDAY_GBT_LAMBDA", gbt_defaults.lambda).max(0.0),
            min_child_weight: env_parse(
                "MATCHDAY_GBT_MIN_CHILD_WEIGHT",
                gbt_defaults.min_child_weight,
            )
            .max(0.0),
            gamma: env_parse("MATCHDAY_GBT_GAMMA", gbt_defaults.gamma).max(0.0),
            max_bins: gbt_defaults.max_bins,
        };

        Self {
            data_dir: env_path("MATCHDAY_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.into()),
            league_prefix: env_string("MATCHDAY_LEAGUE_PREFIX")
                .unwrap_or_else(|| DEFAULT_LEAGUE_PREFIX.to_string()),
            models_dir: env_path("MATCHDAY_MODELS_DIR")
                .unwrap_or_else(|| DEFAULT_MODELS_DIR.into()),
            db_path: env_path("MATCHDAY_DB_PATH").or_else(match_store::default_db_path),
            backtest_cutoff: env_string("MATCHDAY_BACKTEST_CUTOFF")
                .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok())
                .unwrap_or_else(default_backtest_cutoff),
            training: TrainingConfig {
                min_history: env_parse("MATCHDAY_MIN_HISTORY", defaults.min_history),
                test_fraction: env_parse("MATCHDAY_TEST_FRACTION", defaults.test_fraction)
                    .clamp(0.0, 0.9),
                seed: env_parse("MATCHDAY_SEED", defaults.seed),
                gbt,
            },
        }
    }
}

pub fn default_backtest_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env_string(key).map(PathBuf::from)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_string(key)
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
