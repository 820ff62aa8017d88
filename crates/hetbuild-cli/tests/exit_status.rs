use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn hetbuild(args: &[&str], job: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hetbuild"))
        .args(args)
        .arg(job)
        .output()
        .unwrap()
}

fn job(upper_constant: f64, area_tolerance: f64) -> String {
    format!(
        r#"
[lower]
name = "lower"
kind = "square"
a = 3.0

[upper]
name = "upper"
kind = "square"
a = {upper_constant}

[search]
n-max = 16
angles = [0.0]

[tolerances]
area = {area_tolerance}
"#
    )
}

#[test]
fn no_coincidence_exits_with_failure() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("job.toml");
    fs::write(&path, job(std::f64::consts::PI, 1e-9)).unwrap();

    let output = hetbuild(&["-q", "build"], &path);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No coincidence lattice found"), "stderr: {stderr}");
}

#[test]
fn exhausted_escalation_exits_with_failure() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("job.toml");
    fs::write(&path, job(std::f64::consts::PI, 1e-9)).unwrap();

    let output = hetbuild(&["-q", "match", "--max-strain", "0.01"], &path);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn successful_search_exits_cleanly_and_writes_results() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("job.toml");
    let results = dir.path().join("results.toml");
    fs::write(&path, job(4.05, 0.05)).unwrap();

    let output = hetbuild(&["-q", "build", "-o", results.to_str().unwrap()], &path);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(fs::read_to_string(&results).unwrap().contains("[[results]]"));
}
