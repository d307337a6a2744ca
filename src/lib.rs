pub mod aggregator;
pub mod backtest;
pub mod backtest_export;
pub mod config;
pub mod csv_loader;
pub mod feature_schema;
pub mod form_state;
pub mod form_window;
pub mod gbt;
pub mod label_encoder;
pub mod logging;
pub mod match_record;
pub mod match_store;
pub mod metrics;
pub mod model_store;
pub mod outcome_model;
pub mod paths;
pub mod predictor;
pub mod team_form;
pub mod training;
