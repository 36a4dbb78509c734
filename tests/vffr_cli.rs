use std::env;
use std::fs;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn vffr_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_vffr").expect("vffr test binary not built")
}

#[test]
fn vffr_help_mentions_name() {
    let output = Command::new(vffr_bin())
        .arg("--help")
        .output()
        .expect("run vffr --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("VFFR"));
    assert!(combined.contains("--recall-ceiling-ms"));
}

#[test]
fn vffr_list_input_devices_uses_test_override() {
    let output = Command::new(vffr_bin())
        .arg("--list-input-devices")
        .env("VFFR_TEST_DEVICES", "Desk Mic, Headset")
        .output()
        .expect("run vffr --list-input-devices");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("Available audio input devices:"));
    assert!(combined.contains("  - Headset"));
}

#[test]
fn vffr_rejects_malformed_subject() {
    let output = Command::new(vffr_bin())
        .args(["--subject", "bob", "--no-logs"])
        .output()
        .expect("run vffr --subject bob");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("--subject"));
}

#[test]
fn vffr_reports_missing_default_word_pool() {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("vffr_cli_no_pool_{nanos}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    let output = Command::new(vffr_bin())
        .args(["--subject", "LTP001", "--no-logs"])
        .current_dir(&dir)
        .output()
        .expect("run vffr without word pools");
    let _ = fs::remove_dir_all(&dir);
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("loading word pool wordpools/wordpool_en.txt"));
}
