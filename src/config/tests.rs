use super::validation::{canonical_file, sanitize_shell};
use super::{default_vad_engine, is_valid_subject, AppConfig, VadEngineKind};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = std::env::temp_dir().join(format!("vffr_cfg_{nanos}_{name}"));
    fs::write(&path, contents).expect("write temp file");
    path
}

#[test]
fn defaults_validate() {
    let mut cfg = AppConfig::parse_from(["test-app"]);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.trials, 10);
    assert_eq!(cfg.block_size, 1);
    assert_eq!(cfg.vad_engine, default_vad_engine());
}

#[test]
fn word_pools_default_to_the_wordpools_directory() {
    let cfg = AppConfig::parse_from(["test-app"]);
    assert_eq!(cfg.word_pool, PathBuf::from("wordpools/wordpool_en.txt"));
    assert_eq!(cfg.numbering_pool, PathBuf::from("wordpools/wasnorm_wordpool.txt"));

    let cfg = AppConfig::parse_from(["test-app", "--word-pool", "/lab/pools/en.txt"]);
    assert_eq!(cfg.word_pool, PathBuf::from("/lab/pools/en.txt"));
}

#[test]
fn accepts_ltp_and_test_subjects() {
    assert!(is_valid_subject("LTP123"));
    assert!(is_valid_subject("LTP000"));
    assert!(is_valid_subject("TEST"));
}

#[test]
fn rejects_malformed_subjects() {
    for bad in ["", "LTP12", "LTP1234", "ltp123", "LTPabc", "XTP123", "test", " LTP123"] {
        assert!(!is_valid_subject(bad), "{bad:?} should be rejected");
    }
}

#[test]
fn rejects_bad_subject_flag() {
    let mut cfg = AppConfig::parse_from(["test-app", "--subject", "LTP12"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--subject", "LTP012"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_experiment_with_path_separators() {
    let mut cfg = AppConfig::parse_from(["test-app", "--experiment", "../escape"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_trials_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--trials", "0"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--block-size", "0"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn recall_ceiling_must_cover_required_phases() {
    // 1.0 s settle + 2.0 s main + 0.5 s tail.
    let mut cfg = AppConfig::parse_from(["test-app", "--recall-ceiling-ms", "3499"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--recall-ceiling-ms", "3500"]);
    assert!(cfg.validate().is_ok());
    let mut cfg = AppConfig::parse_from(["test-app", "--recall-ceiling-ms", "120001"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_vad_settings_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--vad-threshold-db", "5.0"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--vad-frame-ms", "4"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--vad-smoothing-frames", "11"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn vad_engine_accepts_simple() {
    let cfg = AppConfig::parse_from(["test-app", "--vad-engine", "simple"]);
    assert_eq!(cfg.vad_engine, VadEngineKind::Simple);
    assert_eq!(cfg.voice_pipeline_config().vad_engine.label(), "simple");
}

#[test]
fn language_model_scripts_must_be_configured_together() {
    let script = temp_file("kenlm.sh", "exit 0\n");
    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--kenlm-script",
        script.to_str().unwrap(),
    ]);
    assert!(cfg.validate().is_err());

    let create = temp_file("create_lm.sh", "exit 0\n");
    let dict = temp_file("wordpool.dict", "cat k ae t\n");
    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--kenlm-script",
        script.to_str().unwrap(),
        "--create-lm-script",
        create.to_str().unwrap(),
        "--lm-dictionary",
        dict.to_str().unwrap(),
    ]);
    assert!(cfg.validate().is_ok());
    assert!(cfg.kenlm_script.as_ref().unwrap().is_absolute());
}

#[test]
fn missing_recognition_script_is_rejected() {
    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--recognition-script",
        "/no/such/recognize.sh",
    ]);
    assert!(cfg.validate().is_err());
}

#[test]
fn canonical_file_rejects_directories() {
    let dir = std::env::temp_dir();
    assert!(canonical_file(&dir, "--flag").is_err());
}

#[test]
fn sanitize_shell_keeps_flags() {
    assert_eq!(sanitize_shell("bash -e").unwrap(), "bash -e");
    assert_eq!(sanitize_shell("SH").unwrap(), "sh");
    assert!(sanitize_shell("python3").is_err());
    assert!(sanitize_shell("   ").is_err());
}

#[test]
fn shell_command_splits_program_and_args() {
    let mut cfg = AppConfig::parse_from(["test-app", "--shell-cmd", "bash -e"]);
    cfg.validate().unwrap();
    let (program, args) = cfg.shell_command().unwrap();
    assert_eq!(program, "bash");
    assert_eq!(args, vec!["-e".to_string()]);
}

#[test]
fn protocol_reflects_cli_timings() {
    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--trials",
        "4",
        "--block-size",
        "3",
        "--trial-poll-ms",
        "5",
        "--session-poll-ms",
        "250",
        "--strict-liveness",
    ]);
    cfg.validate().unwrap();
    let protocol = cfg.protocol();
    assert_eq!(protocol.trials, 4);
    assert_eq!(protocol.block_count(), 2);
    assert!(protocol.strict_liveness);
    assert_eq!(protocol.trial_recall.poll, Duration::from_millis(5));
    assert_eq!(protocol.initial_recall.poll, Duration::from_millis(250));
    assert_eq!(protocol.initial_recall.min, Duration::from_secs(10));
    assert_eq!(protocol.final_recall.min, Duration::from_secs(20));
    assert_eq!(protocol.final_recall.max, Duration::from_secs(40));
}
