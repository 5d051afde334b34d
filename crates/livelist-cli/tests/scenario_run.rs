//! Replaying scenario files end to end.

use std::path::PathBuf;

use livelist_cli::commands::{check_file, check_scenario, ensure_passed, run_file, run_scenario};
use livelist_cli::render::{event_log, event_table, to_json};
use livelist_cli::scenario::{Scenario, Step};

fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

#[test]
fn segments_scenario_event_log() {
    let report = run_file(&scenario_path("segments.toml"), true).unwrap();

    assert!(report.mirror_matches);
    assert_eq!(report.event_count(), 7);
    insta::assert_snapshot!(event_log(&report), @r#"
1. remove segment 1
   remove 2..5 [c, d, e]
2. push "g" onto segment 1
   insert 3..4 [g]
3. insert segment ["x", "y"] at 0
   insert 0..2 [x, y]
4. swap segments 0 and 2
   permute 0..6 [4, 5, 2, 3, 0, 1]
5. replace segment 1 with ["q"]
   update 2..3 [q]
   remove 3..4 [b]
6. reverse segment 2
   permute 3..5 [1, 0]
=> [f, g, q, y, x]
"#);
}

#[test]
fn check_report_serializes() {
    let report = check_file(&scenario_path("segments.toml")).unwrap();

    assert!(report.passed());
    ensure_passed(&report).unwrap();
    insta::assert_snapshot!(to_json(&report).unwrap(), @r#"
{
  "name": "segments",
  "steps": 6,
  "events": 7,
  "size": 5,
  "failures": []
}
"#);
}

#[test]
fn run_report_json_carries_tagged_events() {
    let scenario = Scenario {
        name: Some("tiny".to_string()),
        segments: vec![vec!["a".to_string()]],
        steps: vec![Step::Set {
            segment: 0,
            index: 0,
            value: "b".to_string(),
        }],
    };
    let report = run_scenario(&scenario, false).unwrap();
    let json: serde_json::Value = serde_json::from_str(&to_json(&report).unwrap()).unwrap();

    assert_eq!(json["final"], serde_json::json!(["b"]));
    assert_eq!(
        json["steps"][0]["events"],
        serde_json::json!([{ "kind": "update", "from": 0, "values": ["b"] }])
    );
}

#[test]
fn steps_without_events_still_appear() {
    let scenario = Scenario {
        name: None,
        segments: vec![vec!["a".to_string(), "b".to_string()]],
        steps: vec![
            Step::Sort { segment: 0 },
            Step::InsertSegment {
                at: 1,
                values: vec![],
            },
        ],
    };
    let report = run_scenario(&scenario, true).unwrap();

    assert_eq!(report.name, "scenario");
    assert_eq!(report.steps.len(), 2);
    assert!(report.steps.iter().all(|step| step.events.is_empty()));
    let table = event_table(&report).to_string();
    assert!(table.contains("sort segment 0"));
    assert_eq!(check_scenario(&scenario).unwrap().events, 0);
}

#[test]
fn failing_step_names_its_number() {
    let scenario = Scenario {
        name: None,
        segments: vec![vec!["a".to_string()]],
        steps: vec![Step::Remove {
            segment: 0,
            index: 3,
        }],
    };
    let error = run_scenario(&scenario, false).unwrap_err();
    let message = format!("{error:#}");
    assert!(message.contains("step 1 (remove 0:3) failed"), "{message}");
}

#[test]
fn missing_file_reports_path() {
    let error = run_file(&scenario_path("absent.toml"), false).unwrap_err();
    assert!(format!("{error:#}").contains("absent.toml"));
}

#[test]
fn check_collects_failed_steps_and_keeps_going() {
    let scenario = Scenario {
        name: Some("partial".to_string()),
        segments: vec![vec!["a".to_string()]],
        steps: vec![
            Step::Remove {
                segment: 0,
                index: 3,
            },
            Step::Set {
                segment: 0,
                index: 0,
                value: "b".to_string(),
            },
        ],
    };
    let report = check_scenario(&scenario).unwrap();

    assert!(!report.passed());
    assert_eq!(report.failures.len(), 1);
    assert!(
        report.failures[0].starts_with("step 1 (remove 0:3) failed"),
        "{:?}",
        report.failures
    );
    assert_eq!(report.events, 1);
    assert_eq!(report.size, 1);
    let error = ensure_passed(&report).unwrap_err();
    assert!(error.to_string().contains("partial failed 1 check(s)"));
}
