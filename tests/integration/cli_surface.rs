//! CLI boundary tests: flags, exit codes, and diagnostics.

use std::fs;
use std::process::Command;

const BIN: &str = env!("CARGO_BIN_EXE_vglog-filter");

const LOG: &str = "\
==1== Invalid read
==1==    at 0x1: f (x.c:1)
==1== Successfully downloaded debug
==1== Invalid write
==1==    at 0x2: g (y.c:2)
";

fn write_log(dir: &tempfile::TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    name.to_string()
}

#[test]
fn file_input_trims_to_the_last_marker() {
    let dir = tempfile::tempdir().unwrap();
    let name = write_log(&dir, "run.log", LOG);
    let output = Command::new(BIN)
        .arg(&name)
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "Invalid write\ng (y.c:2)\n\n"
    );
}

#[test]
fn keep_debug_info_disables_trimming() {
    let dir = tempfile::tempdir().unwrap();
    let name = write_log(&dir, "run.log", LOG);
    let output = Command::new(BIN)
        .args(["--keep-debug-info", &name])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Invalid read"));
    assert!(stdout.contains("Invalid write"));
}

#[test]
fn stdin_defaults_to_stream_mode_trimming() {
    use std::io::Write as _;
    use std::process::Stdio;

    let mut child = Command::new(BIN)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(LOG.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "Invalid write\ng (y.c:2)\n\n"
    );
}

#[test]
fn custom_marker_and_depth_are_honored() {
    let dir = tempfile::tempdir().unwrap();
    let log = "\
==1== Invalid read of size 4
==1==    at 0x1: one (a.c:1)
CUT
==1== Invalid read of size 4
==1==    at 0x2: two (b.c:2)
==1== Invalid read of size 4
==1==    at 0x3: three (c.c:3)
";
    let name = write_log(&dir, "run.log", log);
    let output = Command::new(BIN)
        .args(["-m", "CUT", "-d", "0", &name])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("one"));
    // Depth 0 keys on whole blocks, so both post-marker reads survive.
    assert!(stdout.contains("two"));
    assert!(stdout.contains("three"));
}

#[test]
fn unknown_flag_exits_2_with_usage() {
    let output = Command::new(BIN).arg("--bogus").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage:"));
}

#[test]
fn out_of_range_depth_exits_2() {
    let output = Command::new(BIN).args(["-d", "1001"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn empty_marker_exits_2() {
    let output = Command::new(BIN).args(["-m", ""]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_file_exits_1_with_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(BIN)
        .arg("no_such.log")
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn hostile_path_is_rejected() {
    let output = Command::new(BIN).arg("../escape.log").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("traversal"));
}

#[test]
fn version_flag_prints_and_exits_0() {
    let output = Command::new(BIN).arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("vglog-filter version"));
}

#[test]
fn empty_file_warns_and_exits_0() {
    let dir = tempfile::tempdir().unwrap();
    let name = write_log(&dir, "empty.log", "");
    let output = Command::new(BIN)
        .arg(&name)
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("empty"));
}
