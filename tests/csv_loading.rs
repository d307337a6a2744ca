use std::fs;

use chrono::NaiveDate;

use matchday_form::csv_loader::{discover_league_files, load_league, parse_csv_text};
use matchday_form::match_record::FullTimeResult;

const SEASON_2223: &str = "\
Div,Date,Time,HomeTeam,AwayTeam,FTHG,FTAG,FTR,HTHG,HTAG,HTR,Referee,HS,AS,HST,AST,HF,AF,HC,AC,HY,AY,HR,AR
E0,05/08/2022,20:00,Crystal Palace,Arsenal,0,2,A,0,1,A,A Taylor,10,10,2,2,16,11,3,5,1,2,0,0
E0,06/08/2022,12:30,Fulham,Liverpool,2,2,D,1,0,H,A Madley,9,11,3,4,7,9,4,4,2,0,0,0
E0,06/08/2022,15:00,Bournemouth,Aston Villa,2,0,H,1,0,H,P Bankes,7,15,3,2,18,16,5,5,3,3,0,0
";

const SEASON_CURRENT: &str = "\
Div,Date,HomeTeam,AwayTeam,FTHG,FTAG,FTR
E0,11/08/23,Burnley,Man City,0,3,A
E0,12/08/23,Arsenal,Nott'm Forest,2,1,H
E0,,Brighton,Luton,4,1,H
E0,13/08/23,Brentford,Tottenham,2,2,X
";

#[test]
fn parses_full_row_with_stats() {
    let parsed = parse_csv_text(SEASON_2223, "2022-2023").unwrap();
    assert_eq!(parsed.records.len(), 3);
    assert_eq!(parsed.dropped, 0);
    let first = &parsed.records[0];
    assert_eq!(first.league.as_deref(), Some("E0"));
    assert_eq!(first.season, "2022-2023");
    assert_eq!(first.date, NaiveDate::from_ymd_opt(2022, 8, 5).unwrap());
    assert_eq!(first.home_team, "Crystal Palace");
    assert_eq!(first.result, FullTimeResult::AwayWin);
    assert_eq!(first.half_time_away_goals, Some(1));
    assert_eq!(first.referee.as_deref(), Some("A Taylor"));
    assert_eq!(first.home_stats.shots_on_target, Some(2));
    assert_eq!(first.home_stats.fouls, Some(16));
    assert_eq!(first.away_stats.corners, Some(5));
    assert_eq!(first.away_stats.yellow_cards, Some(2));
}

#[test]
fn missing_stat_columns_are_none_and_bad_rows_dropped() {
    let parsed = parse_csv_text(SEASON_CURRENT, "Current").unwrap();
    assert_eq!(parsed.records.len(), 2);
    assert_eq!(parsed.dropped, 2);
    let r = &parsed.records[1];
    assert_eq!(r.home_team, "Arsenal");
    assert_eq!(r.date, NaiveDate::from_ymd_opt(2023, 8, 12).unwrap());
    assert_eq!(r.home_stats.shots_on_target, None);
    assert_eq!(r.referee, None);
}

#[test]
fn missing_required_column_is_an_error() {
    let err = parse_csv_text("Date,HomeTeam,AwayTeam,FTHG,FTAG\n", "Current").unwrap_err();
    assert!(err.to_string().contains("FTR"));
}

#[test]
fn loads_folder_sorted_by_date_with_season_labels() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("E0.csv"), SEASON_CURRENT).unwrap();
    fs::write(dir.path().join("E0(2022-2023).csv"), SEASON_2223).unwrap();
    fs::write(dir.path().join("SP1.csv"), SEASON_CURRENT).unwrap();
    fs::write(dir.path().join("E0-notes.txt"), "ignore me").unwrap();

    let files = discover_league_files(dir.path(), "E0").unwrap();
    assert_eq!(files.len(), 2);

    let loaded = load_league(dir.path(), "E0").unwrap();
    assert_eq!(loaded.matches.len(), 5);
    assert_eq!(loaded.dropped, 2);
    assert!(loaded.matches.windows(2).all(|w| w[0].date <= w[1].date));
    assert_eq!(loaded.matches[0].season, "2022-2023");
    assert_eq!(loaded.matches[4].season, "Current");
    // Same-day fixtures keep file order.
    assert_eq!(loaded.matches[1].home_team, "Fulham");
    assert_eq!(loaded.matches[2].home_team, "Bournemouth");
}

#[test]
fn latin1_file_is_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = b"Div,Date,HomeTeam,AwayTeam,FTHG,FTAG,FTR\nF1,12/08/2023,N".to_vec();
    bytes.push(0xEE);
    bytes.extend_from_slice(b"mes,Lyon,1,0,H\n");
    fs::write(dir.path().join("F1.csv"), bytes).unwrap();

    let loaded = load_league(dir.path(), "F1").unwrap();
    assert_eq!(loaded.matches[0].home_team, "N\u{ee}mes");
}

#[test]
fn empty_folder_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_league(dir.path(), "E0").is_err());
}
