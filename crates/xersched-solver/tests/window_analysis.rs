//! End-to-end window analysis over a small as-built export.
//!
//! The fixture is a five-activity chain recorded as fully built through
//! early February; the window spans mid-January to 2023-02-10, so the
//! analysis sees one activity mid-flight at the open and one still running
//! at the close.

use chrono::NaiveDate;
use xersched_parser::parse_str;
use xersched_solver::{build_window_report, ScheduleContext, WindowOptions};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

const CAL: &str = "(0||1()s|08:00|f|16:00)(0||2()s|08:00|f|16:00)(0||3()s|08:00|f|16:00)(0||4()s|08:00|f|16:00)(0||5()s|08:00|f|16:00)(0||6())(0||7())";

fn fixture() -> String {
    let task_row = |id: &str, code: &str, name: &str, hours: &str, ts: &str, te: &str, als: &str, ale: &str| {
        format!(
            "%R\t{id}\tp1\tw1\tc1\t{code}\t{name}\tTT_Task\tTK_Complete\t{hours}\t0\t{ts}\t{te}\t{als}\t{ale}\t\t\t\t\n"
        )
    };
    let mut text = String::new();
    text.push_str("ERMHDR\t19.0\t2023-06-30\tProject\tadmin\n");
    text.push_str("%T\tPROJECT\n");
    text.push_str("%F\tproj_id\tproj_short_name\tplan_start_date\tlast_recalc_date\n");
    text.push_str("%R\tp1\tPLANT\t2023-01-02 00:00\t2023-06-30 00:00\n");
    text.push_str("%T\tCALENDAR\n");
    text.push_str("%F\tclndr_id\tclndr_name\tclndr_data\n");
    text.push_str(&format!("%R\tc1\tStandard\t{CAL}\n"));
    text.push_str("%T\tPROJWBS\n");
    text.push_str("%F\twbs_id\tproj_id\twbs_short_name\twbs_name\tparent_wbs_id\tproj_node_flag\n");
    text.push_str("%R\tw1\tp1\tPLANT\tPlant\t\tY\n");
    text.push_str("%T\tTASK\n");
    text.push_str("%F\ttask_id\tproj_id\twbs_id\tclndr_id\ttask_code\ttask_name\ttask_type\tstatus_code\ttarget_drtn_hr_cnt\tremain_drtn_hr_cnt\ttarget_start_date\ttarget_end_date\tact_start_date\tact_end_date\tcstr_type\tcstr_date\tcstr_type2\tcstr_date2\n");
    text.push_str(&task_row(
        "1000", "A1000", "Mobilise", "40",
        "2023-01-02 08:00", "2023-01-06 16:00",
        "2023-01-02 08:00", "2023-01-06 16:00",
    ));
    text.push_str(&task_row(
        "1010", "A1010", "Excavate", "80",
        "2023-01-09 08:00", "2023-01-20 16:00",
        "2023-01-09 08:00", "2023-01-20 16:00",
    ));
    text.push_str(&task_row(
        "1020", "A1020", "Foundations", "80",
        "2023-01-23 08:00", "2023-02-03 16:00",
        "2023-01-23 08:00", "2023-02-03 16:00",
    ));
    text.push_str(&task_row(
        "1030", "A1030", "Steel erection", "40",
        "2023-02-06 08:00", "2023-02-10 16:00",
        "2023-02-06 08:00", "2023-02-08 16:00",
    ));
    text.push_str(&task_row(
        "1040", "A1040", "Commission", "40",
        "2023-02-09 08:00", "2023-02-15 16:00",
        "2023-02-09 08:00", "2023-02-15 16:00",
    ));
    text.push_str("%T\tTASKPRED\n");
    text.push_str("%F\ttask_pred_id\ttask_id\tpred_task_id\tproj_id\tpred_proj_id\tpred_type\tlag_hr_cnt\n");
    text.push_str("%R\tr1\t1010\t1000\tp1\tp1\tPR_FS\t0\n");
    text.push_str("%R\tr2\t1020\t1010\tp1\tp1\tPR_FS\t0\n");
    text.push_str("%R\tr3\t1030\t1020\tp1\tp1\tPR_FS\t0\n");
    text.push_str("%R\tr4\t1040\t1030\tp1\tp1\tPR_FS\t0\n");
    text
}

fn analyze() -> xersched_solver::WindowComparison {
    let outcome = parse_str(&fixture()).expect("fixture parses");
    let context = ScheduleContext::new(outcome.document);
    let options = WindowOptions {
        monitored: vec!["A1010".into(), "A1030".into()],
        ..WindowOptions::default()
    };
    context
        .window(date(2023, 1, 15), date(2023, 2, 10), options)
        .expect("window analysis runs")
}

#[test]
fn endpoints_are_reprojected_to_their_dates() {
    let comparison = analyze();

    assert_eq!(comparison.open.data_date, date(2023, 1, 15));
    assert_eq!(comparison.close.data_date, date(2023, 2, 10));
    assert_eq!(comparison.open.document.data_date(), Some(date(2023, 1, 15)));

    // At the open, excavation is mid-flight: start kept, finish cleared.
    let excavate = comparison.open.document.activity("1010").unwrap();
    assert!(excavate.act_start.is_some());
    assert!(excavate.act_end.is_none());
    assert_eq!(excavate.remain_drtn_hr, 48.0);

    // Later work is reset to not-started.
    let foundations = comparison.open.document.activity("1020").unwrap();
    assert!(foundations.act_start.is_none());

    // At the close, commissioning is the one still running.
    let commission = comparison.close.document.activity("1040").unwrap();
    assert!(commission.act_start.is_some());
    assert!(commission.act_end.is_none());
}

#[test]
fn chain_stays_critical_across_the_window() {
    let comparison = analyze();

    let expected: Vec<String> = ["1000", "1010", "1020", "1030", "1040"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(comparison.open.results.critical_path, expected);
    assert_eq!(comparison.close.results.critical_path, expected);
    assert_eq!(comparison.critical_comparison.divergence_index, 0);
    assert!(comparison.critical_comparison.removed.is_empty());
    assert!(comparison.critical_comparison.added.is_empty());
}

#[test]
fn in_period_tables_match_the_recorded_movement() {
    let comparison = analyze();

    let codes = |rows: &[xersched_solver::window::PeriodActivity]| -> Vec<String> {
        rows.iter().map(|r| r.task_code.clone()).collect()
    };

    assert_eq!(
        codes(&comparison.completed_in_period),
        vec!["A1010", "A1020", "A1030"]
    );
    assert_eq!(
        codes(&comparison.planned_in_period),
        vec!["A1020", "A1030", "A1040"]
    );
    assert_eq!(codes(&comparison.started_in_period), vec!["A1040"]);
}

#[test]
fn rapid_completion_is_spotted() {
    let comparison = analyze();

    assert_eq!(comparison.rapid_completions.len(), 1);
    let rapid = &comparison.rapid_completions[0];
    assert_eq!(rapid.task_code, "A1030");
    assert_eq!(rapid.planned_days, 4);
    assert_eq!(rapid.actual_days, 2);
    assert!(rapid.completion_ratio <= 0.7);
}

#[test]
fn monitored_rows_flag_actual_versus_planned() {
    let comparison = analyze();

    let excavate = comparison
        .monitored
        .iter()
        .find(|m| m.task_code == "A1010")
        .unwrap();
    // Started before the window opened, so the start is an actual on both
    // endpoints; the finish is forecast at the open and actual at the close.
    assert!(excavate.start_at_open.is_actual);
    assert!(!excavate.finish_at_open.is_actual);
    assert!(excavate.finish_at_close.is_actual);
    assert_eq!(excavate.start_slip_days, Some(0));
    assert_eq!(excavate.finish_slip_days, Some(0));

    let steel = comparison
        .monitored
        .iter()
        .find(|m| m.task_code == "A1030")
        .unwrap();
    // Untouched at the open (planned dates), done by the close; it finished
    // two calendar days early.
    assert!(!steel.start_at_open.is_actual);
    assert!(steel.finish_at_close.is_actual);
    assert_eq!(steel.finish_slip_days, Some(-2));
}

#[test]
fn window_report_serialises() {
    let comparison = analyze();
    let report = build_window_report(&comparison);

    let json = serde_json::to_string_pretty(&report).expect("report serialises");
    assert!(json.contains("\"window_start\""));
    assert!(json.contains("A1030"));
    assert_eq!(report.critical_path_at_close.len(), 5);
    assert_eq!(report.project.short_name, "PLANT");
}

#[test]
fn inverted_window_is_rejected() {
    let outcome = parse_str(&fixture()).expect("fixture parses");
    let context = ScheduleContext::new(outcome.document);
    let err = context
        .window(date(2023, 2, 10), date(2023, 1, 15), WindowOptions::default())
        .unwrap_err();
    assert!(matches!(err, xersched_core::XerError::InvalidWindow(_, _)));
}
