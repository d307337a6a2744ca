use chrono::NaiveDate;

use matchday_form::aggregator::{FormAggregator, aggregate_checked, build_features};
use matchday_form::feature_schema::{FEATURE_COUNT, FeatureRow};
use matchday_form::match_record::{FullTimeResult, MatchRecord, SideStats};

fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 8, 1).unwrap() + chrono::Duration::days(n)
}

fn game(n: i64, home: &str, away: &str, hg: u32, ag: u32) -> MatchRecord {
    MatchRecord::new(day(n), home, away, hg, ag, FullTimeResult::from_goals(hg, ag))
}

fn feature(row: &FeatureRow, name: &str) -> f64 {
    row.get(name).expect("known feature name")
}

fn league() -> Vec<MatchRecord> {
    let teams = ["Arsenal", "Chelsea", "Everton", "Fulham", "Leeds"];
    let mut out = Vec::new();
    let mut n = 0;
    for (i, home) in teams.iter().enumerate() {
        for (j, away) in teams.iter().enumerate() {
            if i == j {
                continue;
            }
            let hg = ((i * 3 + j) % 4) as u32;
            let ag = ((j * 2 + i) % 3) as u32;
            let stats = |sot: u32| SideStats {
                shots_on_target: Some(sot),
                corners: Some(sot + 1),
                yellow_cards: Some(1),
                ..SideStats::default()
            };
            out.push(game(n, home, away, hg, ag).with_stats(stats(hg + 2), stats(ag + 1)));
            n += 1;
        }
    }
    out
}

#[test]
fn first_meeting_is_all_zero() {
    let rows = build_features(&[game(0, "Arsenal", "Chelsea", 3, 1)]);
    assert_eq!(rows.len(), 1);
    assert!(rows[0].values.iter().all(|v| *v == 0.0));
    assert_eq!(rows[0].values.len(), FEATURE_COUNT);
    assert_eq!(rows[0].result, FullTimeResult::HomeWin);
}

#[test]
fn zero_history_side_is_zero_whatever_the_opponent() {
    let mut matches = league();
    let last = matches.len() as i64;
    matches.push(game(last, "Arsenal", "Newcomers", 0, 0));
    let rows = build_features(&matches);
    let row = rows.last().unwrap();
    assert!(row.values[15..30].iter().all(|v| *v == 0.0));
    assert!(row.values[..15].iter().any(|v| *v != 0.0));
    assert_eq!(row.away_matches_prior, 0);
}

#[test]
fn home_record_after_three_matches() {
    let matches = vec![
        game(0, "Spurs", "Wolves", 2, 0),
        game(1, "Spurs", "Forest", 1, 1),
        game(2, "Spurs", "Brighton", 0, 3),
        game(3, "Spurs", "Burnley", 0, 0),
    ];
    let rows = build_features(&matches);
    let row = &rows[3];
    assert!((feature(row, "Home_WinRatio_Prev") - 1.0 / 3.0).abs() < 1e-12);
    assert!((feature(row, "Home_AvgGoalsScored_Prev") - 1.0).abs() < 1e-12);
    assert!((feature(row, "Home_AvgGoalsConceded_Prev") - 4.0 / 3.0).abs() < 1e-12);
    assert!((feature(row, "Home_Form_Losses_Last5") - 1.0 / 3.0).abs() < 1e-12);
    assert!((feature(row, "Home_HomeWinRatio_Prev") - 1.0 / 3.0).abs() < 1e-12);
    // Burnley has never played.
    assert_eq!(feature(row, "Away_AvgGoalsConceded_Prev"), 0.0);
    assert!((feature(row, "GoalDifference_Prev") - 1.0).abs() < 1e-12);
}

#[test]
fn form_window_covers_last_five_only() {
    let mut matches = Vec::new();
    for i in 0..6u32 {
        matches.push(game(i as i64, "Spurs", &format!("Opp{i}"), i + 1, 0));
    }
    matches.push(game(6, "Spurs", "Opp6", 0, 0));
    let rows = build_features(&matches);
    let row = &rows[6];
    // Matches 2..=6 scored 2, 3, 4, 5, 6.
    assert!((feature(row, "Home_Form_GoalsScored_Last5") - 4.0).abs() < 1e-12);
    assert!((feature(row, "Home_Form_Wins_Last5") - 1.0).abs() < 1e-12);
    // Season average still covers all six.
    assert!((feature(row, "Home_AvgGoalsScored_Prev") - 3.5).abs() < 1e-12);
}

#[test]
fn window_keeps_arrival_order_after_seven_matches() {
    let matches: Vec<MatchRecord> = (0..7u32)
        .map(|i| game(i as i64, "Spurs", &format!("Opp{i}"), i + 1, i % 2))
        .collect();
    let mut agg = FormAggregator::new();
    agg.run(&matches);
    let spurs = agg.team("Spurs").unwrap();
    let scored: Vec<u32> = spurs.last5_goals_scored.iter().copied().collect();
    assert_eq!(scored, vec![3, 4, 5, 6, 7]);
    let conceded: Vec<u32> = spurs.last5_goals_conceded.iter().copied().collect();
    assert_eq!(conceded, vec![0, 1, 0, 1, 0]);
    assert_eq!(spurs.last5_results.len(), 5);
    assert_eq!(spurs.matches_played, 7);
}

#[test]
fn ratios_are_consistent_with_counts() {
    let (_, agg) = aggregate_checked(&league()).unwrap();
    for (name, t) in agg.teams() {
        assert_eq!(t.wins + t.draws + t.losses, t.matches_played, "{name}");
        assert_eq!(
            t.home.matches() + t.away.matches(),
            t.matches_played,
            "{name}"
        );
        let sum = t.win_ratio() + t.draw_ratio() + t.loss_ratio();
        assert!((sum - 1.0).abs() < 1e-12, "{name}");
        assert_eq!(t.yellow_cards, t.matches_played);
    }
}

#[test]
fn relative_features_match_their_definition() {
    for row in build_features(&league()) {
        let goal_diff = feature(&row, "Home_AvgGoalsScored_Prev")
            - feature(&row, "Away_AvgGoalsConceded_Prev");
        assert!((feature(&row, "GoalDifference_Prev") - goal_diff).abs() < 1e-12);
        let sot = feature(&row, "Home_AvgShotsTarget_Prev") - feature(&row, "Away_AvgShotsTarget_Prev");
        assert!((feature(&row, "ShotsTargetDifference_Prev") - sot).abs() < 1e-12);
        let wins = feature(&row, "Home_Form_Wins_Last5") - feature(&row, "Away_Form_Wins_Last5");
        assert!((feature(&row, "FormDifference_Wins_Last5") - wins).abs() < 1e-12);
    }
}

#[test]
fn later_results_never_leak_into_earlier_rows() {
    let base = league();
    let mut altered = base.clone();
    let k = base.len() / 2;
    for m in altered.iter_mut().skip(k) {
        m.home_goals += 5;
        m.result = FullTimeResult::HomeWin;
    }
    let a = build_features(&base);
    let b = build_features(&altered);
    for i in 0..=k {
        assert_eq!(a[i].values, b[i].values, "row {i}");
    }
    assert_ne!(a[base.len() - 1].values, b[base.len() - 1].values);
}

#[test]
fn repeated_passes_are_identical() {
    let matches = league();
    assert_eq!(build_features(&matches), build_features(&matches));
}
