//! CLI tests for `autopilot simulate`, `autopilot check` and `autopilot init`.
//!
//! Spawns the autopilot binary against scenario files in a temp dir and
//! verifies exit codes, printed feeds, and the transcript.

use std::fs;
use std::path::Path;
use std::process::Command;

use autopilot::exit_codes;
use autopilot::io::config::{SchedulerConfig, load_config};

const DRAFT: &str = r#"
name = "draft"

[[screens]]
tick = 0
id = "dwarfmode"
focus = ["dwarfmode/Default"]

[[screens]]
tick = 2
id = "military"

[[tasks]]
description = "open military"
steps = [
  { op = "expect", screen = "dwarfmode", focus = "dwarfmode/Default" },
  { op = "key", key = "D_MILITARY" },
  { op = "await", screen = "military" },
  { op = "key", key = "SELECT" },
]
"#;

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write scenario");
    path
}

fn autopilot() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_autopilot"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn simulate_prints_feeds_and_writes_transcript() {
    let temp = tempfile::tempdir().expect("tempdir");
    let scenario = write(temp.path(), "draft.toml", DRAFT);
    let transcript = temp.path().join("out/transcript.json");

    let output = autopilot()
        .arg("simulate")
        .arg(&scenario)
        .arg("--transcript")
        .arg(&transcript)
        .output()
        .expect("autopilot simulate");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("tick 0: D_MILITARY"), "stdout: {stdout}");
    assert!(stdout.contains("tick 2: SELECT"), "stdout: {stdout}");

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&transcript).expect("read")).expect("json");
    assert_eq!(json["scenario"], "draft");
    assert_eq!(json["stop"]["kind"], "drained");
    assert_eq!(json["completed"][0], "open military");
}

#[test]
fn simulate_exits_halted_on_screen_mismatch() {
    let temp = tempfile::tempdir().expect("tempdir");
    let scenario = write(
        temp.path(),
        "wrong.toml",
        r#"
[[screens]]
tick = 0
id = "dwarfmode"

[[tasks]]
description = "trade"
steps = [
  { op = "expect", screen = "trade" },
  { op = "key", key = "SELECT" },
]
"#,
    );

    let output = autopilot()
        .arg("simulate")
        .arg(&scenario)
        .output()
        .expect("autopilot simulate");

    assert_eq!(output.status.code(), Some(exit_codes::HALTED));
    assert!(String::from_utf8_lossy(&output.stderr).contains("halted"));
}

#[test]
fn simulate_exits_incomplete_at_tick_limit() {
    let temp = tempfile::tempdir().expect("tempdir");
    let scenario = write(
        temp.path(),
        "stuck.toml",
        r#"
[[screens]]
tick = 0
id = "dwarfmode"

[[tasks]]
description = "waiting"
steps = [{ op = "await", screen = "never" }]
"#,
    );

    let status = autopilot()
        .arg("simulate")
        .arg(&scenario)
        .arg("--max-ticks")
        .arg("3")
        .status()
        .expect("autopilot simulate");

    assert_eq!(status.code(), Some(exit_codes::INCOMPLETE));
}

#[test]
fn check_rejects_invalid_config() {
    let temp = tempfile::tempdir().expect("tempdir");
    let scenario = write(temp.path(), "draft.toml", DRAFT);
    let config = write(temp.path(), "autopilot.toml", "default_wait_multiplier = 0\n");

    let status = autopilot()
        .arg("check")
        .arg(&scenario)
        .arg("--config")
        .arg(&config)
        .status()
        .expect("autopilot check");
    assert_eq!(status.code(), Some(exit_codes::INVALID));

    let status = autopilot()
        .arg("check")
        .arg(&scenario)
        .status()
        .expect("autopilot check");
    assert_eq!(status.code(), Some(exit_codes::OK));
}

#[test]
fn init_writes_a_config_that_simulate_accepts() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = temp.path().join("conf/autopilot.toml");

    let status = autopilot()
        .arg("init")
        .arg(&config)
        .args(["--default-wait-multiplier", "2", "--dismissed-wait-limit", "50"])
        .status()
        .expect("autopilot init");
    assert_eq!(status.code(), Some(exit_codes::OK));
    assert_eq!(
        load_config(&config).expect("load"),
        SchedulerConfig {
            default_wait_multiplier: 2,
            dismissed_wait_limit: Some(50),
            alternate_frontend: false,
        }
    );

    let status = autopilot()
        .arg("init")
        .arg(&config)
        .status()
        .expect("autopilot init");
    assert_eq!(status.code(), Some(exit_codes::INVALID));

    let scenario = write(temp.path(), "late.toml", &DRAFT.replace("tick = 2", "tick = 3"));
    let output = autopilot()
        .arg("simulate")
        .arg(&scenario)
        .arg("--config")
        .arg(&config)
        .output()
        .expect("autopilot simulate");
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    // The screen switches on tick 3; at two ticks per step the task next
    // looks on tick 4.
    assert!(String::from_utf8_lossy(&output.stdout).contains("tick 4: SELECT"));
}
