//! Disk-level parsing: legacy code page decoding and error taxonomy for
//! unreadable input.

use xersched_core::XerError;
use xersched_parser::{parse_file, write_bytes};

const CAL: &str = "(0||1()s|08:00|f|16:00)(0||2()s|08:00|f|16:00)(0||3()s|08:00|f|16:00)(0||4()s|08:00|f|16:00)(0||5()s|08:00|f|16:00)(0||6())(0||7())";

fn fixture_bytes() -> Vec<u8> {
    // 0xE9 is e-acute in cp1252 but an invalid byte in UTF-8.
    let text = format!(
        concat!(
            "ERMHDR\t19.0\t2023-06-30\tProject\tadmin\n",
            "%T\tPROJECT\n",
            "%F\tproj_id\tproj_short_name\tplan_start_date\tlast_recalc_date\n",
            "%R\tp1\tR\u{e9}novation\t2023-01-02 00:00\t2023-01-02 00:00\n",
            "%T\tCALENDAR\n",
            "%F\tclndr_id\tclndr_name\tclndr_data\n",
            "%R\tc1\tStandard\t{cal}\n",
            "%T\tPROJWBS\n",
            "%F\twbs_id\tproj_id\twbs_short_name\twbs_name\tparent_wbs_id\tproj_node_flag\n",
            "%R\tw1\tp1\tPRJ\tProjet\t\tY\n",
            "%T\tTASK\n",
            "%F\ttask_id\tproj_id\twbs_id\tclndr_id\ttask_code\ttask_name\ttask_type\tstatus_code\t",
            "target_drtn_hr_cnt\tremain_drtn_hr_cnt\ttarget_start_date\ttarget_end_date\t",
            "act_start_date\tact_end_date\tcstr_type\tcstr_date\tcstr_type2\tcstr_date2\n",
            "%R\t1000\tp1\tw1\tc1\tA1000\tD\u{e9}molition\tTT_Task\tTK_NotStart\t40\t40\t",
            "2023-01-02 08:00\t2023-01-06 16:00\t\t\t\t\t\t\n",
        ),
        cal = CAL
    );
    let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(&text);
    bytes.into_owned()
}

#[test]
fn reads_cp1252_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schedule.xer");
    std::fs::write(&path, fixture_bytes()).unwrap();

    let outcome = parse_file(&path).unwrap();
    let document = &outcome.document;

    assert_eq!(document.projects[0].short_name, "R\u{e9}novation");
    assert_eq!(document.activity("1000").unwrap().task_name, "D\u{e9}molition");

    // Writing reproduces the same cp1252 bytes.
    assert_eq!(write_bytes(document), fixture_bytes());
}

#[test]
fn missing_file_is_an_io_error() {
    let err = parse_file(std::path::Path::new("/definitely/not/here.xer")).unwrap_err();
    assert!(matches!(err, XerError::Io(_)));
}

#[test]
fn non_xer_file_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "these are not the tables you are looking for\n").unwrap();

    let err = parse_file(&path).unwrap_err();
    assert!(matches!(err, XerError::MalformedFile(_)));
}
