use std::process::Command;

fn run(fixture: &str) -> (String, String, bool) {
    let path = format!("tests/fixtures/{fixture}");
    let output = Command::new(env!("CARGO_BIN_EXE_ridepay"))
        .arg(&path)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

const HEADER: &str = "account,role,balance,earnings,pending_penalty,penalty_deadline";

#[test]
fn qr_and_cash_settlements() {
    let (stdout, stderr, success) = run("valid.csv");

    assert!(success);
    assert!(!stderr.contains("line "));

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], HEADER);
    assert_eq!(lines[1], "1,rider,60.0000,0.0000,0.0000,");
    assert_eq!(lines[2], "2,driver,5.0000,38.0000,0.0000,");
    // no wallet balance, so the commission became a penalty with a deadline
    assert!(lines[3].starts_with("3,driver,0.0000,0.0000,5.0000,"));
    assert!(!lines[3].ends_with(','));
}

#[test]
fn errors_warn_but_do_not_block() {
    let (stdout, stderr, success) = run("with_errors.csv");

    assert!(success);
    assert!(stderr.contains("unrecognized command type"));
    assert!(stderr.contains("top_up missing amount"));
    assert!(stderr.contains("cash_ride has invalid amount NaN"));
    assert!(stderr.contains("top_up has invalid amount inf"));

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], HEADER);
    // replayed and rider-scanned tokens did not settle again
    assert_eq!(lines[1], "1,rider,60.0000,0.0000,0.0000,");
    assert_eq!(lines[2], "2,driver,0.0000,38.0000,0.0000,");
}

#[test]
fn penalty_paid_after_top_up() {
    let (stdout, _, success) = run("penalty.csv");

    assert!(success);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], HEADER);
    // 5 + 3 owed, 20 topped up, then paid in full
    assert_eq!(lines[1], "2,driver,12.0000,0.0000,0.0000,");
}

#[test]
fn missing_input_fails() {
    let (_, stderr, success) = run("does_not_exist.csv");

    assert!(!success);
    assert!(stderr.contains("failed to open command file"));
}
