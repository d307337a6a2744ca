use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use chrono::NaiveDate;

use matchday_form::aggregator::build_features;
use matchday_form::csv_loader::parse_csv_text;
use matchday_form::gbt::GbtConfig;
use matchday_form::match_record::{FullTimeResult, MatchRecord, SideStats};
use matchday_form::predictor::prepare_fixture;
use matchday_form::training::fit_artifacts;

/// Double round robin of 20 teams with deterministic scores.
fn synthetic_season(seasons: usize) -> Vec<MatchRecord> {
    let teams: Vec<String> = (0..20).map(|i| format!("Team {i:02}")).collect();
    let start = NaiveDate::from_ymd_opt(2015, 8, 1).unwrap();
    let mut out = Vec::new();
    let mut n = 0i64;
    for s in 0..seasons {
        for i in 0..teams.len() {
            for j in 0..teams.len() {
                if i == j {
                    continue;
                }
                let hg = ((i * 7 + j * 3 + s) % 5) as u32;
                let ag = ((j * 5 + i + s) % 4) as u32;
                let stats = |g: u32| SideStats {
                    shots: Some(g * 3 + 6),
                    shots_on_target: Some(g + 2),
                    corners: Some(g + 3),
                    fouls: Some(10),
                    yellow_cards: Some(1),
                    red_cards: Some(0),
                };
                out.push(
                    MatchRecord::new(
                        start + chrono::Duration::days(n / 10),
                        teams[i].clone(),
                        teams[j].clone(),
                        hg,
                        ag,
                        FullTimeResult::from_goals(hg, ag),
                    )
                    .with_stats(stats(hg), stats(ag)),
                );
                n += 1;
            }
        }
    }
    out
}

fn season_csv(matches: &[MatchRecord]) -> String {
    let mut out = String::from("Div,Date,HomeTeam,AwayTeam,FTHG,FTAG,FTR,HST,AST,HC,AC\n");
    for m in matches {
        out.push_str(&format!(
            "E0,{},{},{},{},{},{},{},{},{},{}\n",
            m.date.format("%d/%m/%Y"),
            m.home_team,
            m.away_team,
            m.home_goals,
            m.away_goals,
            m.result,
            m.home_stats.shots_on_target.unwrap_or(0),
            m.away_stats.shots_on_target.unwrap_or(0),
            m.home_stats.corners.unwrap_or(0),
            m.away_stats.corners.unwrap_or(0),
        ));
    }
    out
}

fn bench_aggregation(c: &mut Criterion) {
    let matches = synthetic_season(5);
    c.bench_function("form_aggregation_5_seasons", |b| {
        b.iter(|| {
            let rows = build_features(black_box(&matches));
            black_box(rows.len());
        })
    });
}

fn bench_csv_parse(c: &mut Criterion) {
    let text = season_csv(&synthetic_season(1));
    c.bench_function("csv_parse_season", |b| {
        b.iter(|| {
            let parsed = parse_csv_text(black_box(&text), "Current").unwrap();
            black_box(parsed.records.len());
        })
    });
}

fn bench_fixture_features(c: &mut Criterion) {
    let matches = synthetic_season(5);
    c.bench_function("fixture_features", |b| {
        b.iter(|| {
            let (row, _) =
                prepare_fixture(black_box(&matches), "Team 03", "Team 11").unwrap();
            black_box(row.values[0]);
        })
    });
}

fn bench_model_predict(c: &mut Criterion) {
    let rows = build_features(&synthetic_season(2));
    let artifacts = fit_artifacts(
        &rows,
        GbtConfig {
            rounds: 50,
            ..GbtConfig::default()
        },
    )
    .unwrap();
    c.bench_function("model_predict_row", |b| {
        b.iter(|| {
            let p = artifacts.predict_probs(black_box(&rows[rows.len() / 2]));
            black_box(p.home);
        })
    });
}

fn bench_model_fit(c: &mut Criterion) {
    let rows = build_features(&synthetic_season(2));
    let mut group = c.benchmark_group("model_fit");
    group.sample_size(10);
    group.bench_function("gbt_20_rounds", |b| {
        b.iter(|| {
            let artifacts = fit_artifacts(
                black_box(&rows),
                GbtConfig {
                    rounds: 20,
                    ..GbtConfig::default()
                },
            )
            .unwrap();
            black_box(artifacts.training_rows);
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_aggregation,
    bench_csv_parse,
    bench_fixture_features,
    bench_model_predict,
    bench_model_fit
);
criterion_main!(benches);
