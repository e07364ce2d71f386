use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use rowbeam::row::OwnedRow;
use rowbeam::testing::{
    assert_rows_unordered_equal, bsv_bytes, decode_bsv, decode_csv, sample_trips_csv, temp_dir,
    write_file,
};

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_rowbeam");
    Command::new(exe)
}

fn run(args: &[&str], stdin: &[u8]) -> Output {
    let mut child = cmd()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn rowbeam");
    // the child may exit on a usage error before reading its input
    let _ = child.stdin.take().expect("stdin").write_all(stdin);
    child.wait_with_output().expect("wait")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn count_prints_matches() {
    let out = run(&["count"], &sample_trips_csv());
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(out.stdout, b"3\n");

    let out = run(&["count", "--starts-with", "t"], &sample_trips_csv());
    assert_eq!(out.stdout, b"7\n");
}

#[test]
fn select_and_reverse_from_files() {
    let dir = temp_dir().expect("tempdir");
    let a = write_file(dir.path(), "a.csv", b"x,y,z\n").expect("write");
    let b = write_file(dir.path(), "b.csv", b"a,b,c,d,e,f,g,h\n").expect("write");

    let out = run(&["select", "2,1", &path_arg(&a), &path_arg(&b)], b"");
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(out.stdout, b"y,x\nb,a\n");

    let out = run(&["reverse", &path_arg(&b)], b"");
    assert_eq!(out.stdout, b"h,g,f,e,d,c,b,a\n");
}

#[test]
fn unzip_zip_to_csv_pipeline() {
    let dir = temp_dir().expect("tempdir");
    let prefix = path_arg(&dir.path().join("trip"));

    let unzip = run(&["unzip", &prefix], &sample_trips_csv());
    assert!(unzip.status.success(), "{}", stderr(&unzip));
    let names = String::from_utf8(unzip.stdout).expect("utf8");
    assert_eq!(names.lines().count(), 8);

    let zip = run(&["zip", "1,8"], names.as_bytes());
    assert!(zip.status.success(), "{}", stderr(&zip));
    let rows = decode_bsv(&zip.stdout, 2).expect("bsv rows");
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0], OwnedRow::new(["fare", "card"]));

    let zip = run(&["zip"], names.as_bytes());
    let csv = run(&["to-csv", "--columns", "8"], &zip.stdout);
    assert!(csv.status.success(), "{}", stderr(&csv));
    assert_eq!(csv.stdout, sample_trips_csv());
}

#[test]
fn sum_groups_by_key() {
    let dir = temp_dir().expect("tempdir");
    let keys = write_file(
        dir.path(),
        "keys",
        &bsv_bytes(&[&[b"a"], &[b"a"], &[b"b"]]),
    )
    .expect("write");
    let values: Vec<[u8; 8]> = [1.0f64, 2.0, 5.0].iter().map(|v| v.to_le_bytes()).collect();
    let values = write_file(
        dir.path(),
        "values",
        &bsv_bytes(&[&[&values[0][..]], &[&values[1][..]], &[&values[2][..]]]),
    )
    .expect("write");
    let names = format!("{} {}\n", path_arg(&keys), path_arg(&values));

    let out = run(&["sum", "--output", "csv"], names.as_bytes());
    assert!(out.status.success(), "{}", stderr(&out));
    let expected = vec![OwnedRow::new(["a", "3"]), OwnedRow::new(["b", "5"])];
    assert_rows_unordered_equal(&decode_csv(&out.stdout).expect("csv"), &expected);

    let out = run(&["sum"], names.as_bytes());
    assert_eq!(decode_bsv(&out.stdout, 2).expect("bsv").len(), 2);
}

#[test]
fn tee_and_stats() {
    let dir = temp_dir().expect("tempdir");
    let tee = dir.path().join("copy.bsv");
    let out = run(&["to-bsv", "--tee", &path_arg(&tee), "--stats"], b"a,b\nc,d\n");
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(out.stdout, bsv_bytes(&[&[b"a", b"b"], &[b"c", b"d"]]));
    assert_eq!(std::fs::read(&tee).expect("tee file"), out.stdout);

    let stats: serde_json::Value =
        serde_json::from_str(stderr(&out).lines().last().expect("stats line")).expect("json");
    assert_eq!(stats["command"], "to-bsv");
    assert_eq!(stats["rows_read"], 2);
    assert_eq!(stats["rows_written"], 2);
    assert_eq!(stats["bytes_written"], out.stdout.len());
}

#[test]
fn compressed_stdout_reads_back() {
    let out = run(&["--output-codec", "gzip", "reverse"], b"1,2\n");
    assert!(out.status.success(), "{}", stderr(&out));
    let back = run(&["count", "--codec", "gzip", "--starts-with", "2"], &out.stdout);
    assert_eq!(back.stdout, b"1\n");
}

#[test]
fn usage_errors_exit_2() {
    let cases: [&[&str]; 5] = [
        &["select", "0"],
        &["select", "1,1"],
        &["select", "a"],
        &["to-csv"],
        &["count", "--codec", "nope"],
    ];
    for args in cases {
        let out = run(args, b"a,b\n");
        assert_eq!(out.status.code(), Some(2), "{args:?}: {}", stderr(&out));
    }

    let out = run(&["zip"], b"\n");
    assert_eq!(out.status.code(), Some(2));

    let dir = temp_dir().expect("tempdir");
    let only = write_file(dir.path(), "only", &bsv_bytes(&[&[b"a"]])).expect("write");
    let out = run(&["zip", "2"], path_arg(&only).as_bytes());
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("cannot select above column 1"));
}

#[test]
fn schema_errors_exit_3() {
    let out = run(&["select", "3"], b"a,b,c\nd,e\n");
    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).contains("row 2"));
}

#[test]
fn misaligned_columns_exit_4() {
    let dir = temp_dir().expect("tempdir");
    let long = write_file(dir.path(), "long", &bsv_bytes(&[&[b"a"], &[b"b"]])).expect("write");
    let short = write_file(dir.path(), "short", &bsv_bytes(&[&[b"1"]])).expect("write");
    let names = format!("{}\n{}\n", path_arg(&long), path_arg(&short));
    let out = run(&["zip"], names.as_bytes());
    assert_eq!(out.status.code(), Some(4));
    assert!(stderr(&out).contains("didn't end at the same length"));
}

#[test]
fn io_errors_exit_5() {
    let out = run(&["count", "/definitely/not/here.csv"], b"");
    assert_eq!(out.status.code(), Some(5));

    let out = run(&["to-csv", "--columns", "2"], b"\x01\x00a\x05\x00b");
    assert_eq!(out.status.code(), Some(5));
}
