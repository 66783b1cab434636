mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use common::setup_workspace;

fn eyla_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("eyla");
    path
}

fn run_eyla(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = eyla_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run eyla binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn out_dir(config_path: &Path) -> PathBuf {
    config_path.parent().unwrap().parent().unwrap().join("out")
}

fn data_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .skip(1)
        .map(str::to_string)
        .collect()
}

#[test]
fn test_run_writes_curated_tables() {
    let (_tmp, config_path) = setup_workspace("");

    let (stdout, stderr, success) = run_eyla(&config_path, &["run", "--progress", "off"]);
    assert!(success, "run failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Curated adverts:       5"), "got: {}", stdout);
    assert!(stdout.contains("Curated skills:        3"), "got: {}", stdout);

    let out = out_dir(&config_path);
    for file in [
        "curated_adverts.csv",
        "curated_skills.csv",
        "profession_monthly.csv",
        "qualification_monthly.csv",
    ] {
        assert!(out.join(file).exists(), "missing {}", file);
    }

    let curated = fs::read_to_string(out.join("curated_adverts.csv")).unwrap();
    assert!(curated.starts_with("id,created,year,month_year,profession,nation,region_code"));
    assert_eq!(data_lines(&out.join("curated_adverts.csv")).len(), 5);
    assert_eq!(data_lines(&out.join("profession_monthly.csv")).len(), 3);
    assert_eq!(data_lines(&out.join("qualification_monthly.csv")).len(), 3);
}

#[test]
fn test_run_is_deterministic() {
    let (_tmp, config_path) = setup_workspace("");
    let out = out_dir(&config_path).join("curated_adverts.csv");

    let (_, _, success) = run_eyla(&config_path, &["run"]);
    assert!(success);
    let first = fs::read_to_string(&out).unwrap();

    let (_, _, success) = run_eyla(&config_path, &["run", "--serial"]);
    assert!(success);
    let second = fs::read_to_string(&out).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_run_sample_mode() {
    let (_tmp, config_path) = setup_workspace("[batch]\nsample_size = 2\n");

    let (stdout, stderr, success) = run_eyla(&config_path, &["run", "--sample"]);
    assert!(success, "sample run failed: {}", stderr);
    assert!(stdout.contains("sample"));
    assert!(stdout.contains("Distinct texts:        2 in 1 chunks"), "got: {}", stdout);

    // The level-7 advert is outside the sample, so no level and it survives
    // the ceiling.
    let rows = data_lines(&out_dir(&config_path).join("curated_adverts.csv"));
    assert_eq!(rows.len(), 6);
}

#[test]
fn test_run_resumes_from_checkpoints() {
    let (tmp, config_path) = setup_workspace("[batch]\nchunk_size = 2\ncheckpoint_dir = \"chunks\"\n");
    let out = out_dir(&config_path).join("curated_adverts.csv");

    let (_, stderr, success) = run_eyla(&config_path, &["run"]);
    assert!(success, "first run failed: {}", stderr);
    let first = fs::read_to_string(&out).unwrap();

    // Relative checkpoint dirs resolve against the config file.
    let chunks = tmp.path().join("config").join("chunks");
    assert!(chunks.join("chunk-00000.json").exists());
    assert!(chunks.join("chunk-00002.json").exists());

    // Corrupt one checkpoint; it must be recomputed, not trusted.
    fs::write(chunks.join("chunk-00001.json"), "{\"index\":1,").unwrap();

    let (_, stderr, success) = run_eyla(&config_path, &["run", "--progress", "json"]);
    assert!(success, "resumed run failed: {}", stderr);
    assert_eq!(first, fs::read_to_string(&out).unwrap());

    let resumed: Vec<serde_json::Value> = stderr
        .lines()
        .filter_map(|l| serde_json::from_str(l).ok())
        .filter(|v: &serde_json::Value| v["event"] == "resumed")
        .collect();
    assert_eq!(resumed.len(), 1);
    assert_eq!(resumed[0]["chunks"], 2);
    assert_eq!(resumed[0]["total"], 3);
}

#[test]
fn test_json_progress_lines() {
    let (_tmp, config_path) = setup_workspace("");

    let (stdout, stderr, success) = run_eyla(&config_path, &["run", "--progress", "json"]);
    assert!(success);
    assert!(!stdout.contains("\"event\""));

    let events: Vec<serde_json::Value> = stderr
        .lines()
        .map(|l| serde_json::from_str(l).expect("each stderr line is JSON"))
        .collect();
    assert!(events.iter().any(|e| e["event"] == "loaded" && e["table"] == "adverts"));
    assert!(events
        .iter()
        .any(|e| e["event"] == "deduplicated" && e["table"] == "rural_urban" && e["dropped"] == 1));
    assert!(events
        .iter()
        .any(|e| e["event"] == "stage" && e["stage"] == "deduplicate" && e["rows_out"] == 9));
}

#[test]
fn test_reject_duplicate_keys_fails() {
    let (_tmp, config_path) = setup_workspace("[enrichment]\nduplicate_keys = \"reject\"\n");

    let (_, stderr, success) = run_eyla(&config_path, &["run"]);
    assert!(!success);
    assert!(stderr.contains("salaries"), "got: {}", stderr);
}

#[test]
fn test_invalid_config_fails() {
    let (_tmp, config_path) = setup_workspace("[batch]\nchunk_size = 0\n");

    let (_, stderr, success) = run_eyla(&config_path, &["run"]);
    assert!(!success);
    assert!(stderr.contains("chunk_size"));
}

#[test]
fn test_missing_reference_fails() {
    let (tmp, config_path) = setup_workspace("");
    fs::write(
        tmp.path().join("data").join("rural_urban.csv"),
        "NUTS315CD,NUTS315NM,RUC11CD,RUC11,Broad_RUC11\n",
    )
    .unwrap();

    let (_, stderr, success) = run_eyla(&config_path, &["run"]);
    assert!(!success);
    assert!(stderr.contains("rural/urban"), "got: {}", stderr);
}

#[test]
fn test_sources() {
    let (tmp, config_path) = setup_workspace("");
    fs::remove_file(tmp.path().join("data").join("skills.csv")).unwrap();

    let (stdout, _, success) = run_eyla(&config_path, &["sources"]);
    assert!(success);
    assert!(stdout.contains("TABLE"));
    assert!(stdout.lines().any(|l| l.starts_with("adverts") && l.contains("OK")));
    assert!(stdout.lines().any(|l| l.starts_with("skills") && l.contains("MISSING")));
}

#[test]
fn test_extract() {
    let (_tmp, config_path) = setup_workspace("");

    let (stdout, _, success) = run_eyla(&config_path, &["extract", "NVQ Level 2 or NVQ Level 3"]);
    assert!(success);
    assert!(stdout.contains("level:      2"), "got: {}", stdout);

    let (stdout, _, _) = run_eyla(&config_path, &["extract", "no quals needed"]);
    assert!(stdout.contains("level:      none"));
}

#[test]
fn test_extract_without_config() {
    let missing = PathBuf::from("/nonexistent/eyla.toml");
    let (stdout, _, success) = run_eyla(&missing, &["extract", "must hold a degree"]);
    assert!(success);
    assert!(stdout.contains("level:      6"));
    assert!(stdout.contains("table:      2023-06"));
}

#[test]
fn test_extract_with_invalid_config_fails() {
    let (_tmp, config_path) = setup_workspace("[qualifications.levels]\npgc = 6\n");

    for args in [&["extract", "PGCE required"][..], &["patterns"][..]] {
        let (stdout, stderr, success) = run_eyla(&config_path, args);
        assert!(!success, "{:?} should fail, got: {}", args, stdout);
        assert!(stderr.contains("pgc"), "got: {}", stderr);
    }
}

#[test]
fn test_reclassify_with_broken_reference_fails() {
    let (tmp, config_path) = setup_workspace("");
    fs::write(
        tmp.path().join("data").join("rural_urban.csv"),
        "NUTS315CD,NUTS315NM,RUC11CD,RUC11,Broad_RUC11\n",
    )
    .unwrap();

    let (stdout, stderr, success) = run_eyla(&config_path, &["reclassify", "UKL22"]);
    assert!(!success, "got: {}", stdout);
    assert!(stderr.contains("rural/urban"), "got: {}", stderr);
}

#[test]
fn test_reclassify_london() {
    let (_tmp, config_path) = setup_workspace("");

    for code in ["UKI31", "UKI75", "TLI42"] {
        let (stdout, _, success) = run_eyla(&config_path, &["reclassify", code]);
        assert!(success);
        assert!(stdout.contains("code:   TLI"), "{}: {}", code, stdout);
        assert!(stdout.contains("region: London"));
        assert!(stdout.contains("nation: England"));
    }

    let (stdout, _, _) = run_eyla(&config_path, &["reclassify", "UKL22"]);
    assert!(stdout.contains("code:   TLL22"));
    assert!(stdout.contains("region: Cardiff and Vale of Glamorgan"));
    assert!(stdout.contains("nation: Wales"));
}

#[test]
fn test_inflate() {
    let (_tmp, config_path) = setup_workspace("");

    let (stdout, _, success) = run_eyla(&config_path, &["inflate", "20000", "2023"]);
    assert!(success);
    assert_eq!(stdout.trim(), "20000.00");

    let (stdout, _, _) = run_eyla(&config_path, &["inflate", "20000", "2022"]);
    assert_eq!(stdout.trim(), "21793.33");

    let (stdout, _, _) = run_eyla(&config_path, &["inflate", "0", "2022"]);
    assert_eq!(stdout.trim(), "none");
}

#[test]
fn test_patterns_uses_configured_table() {
    let (_tmp, config_path) = setup_workspace(
        "[qualifications]\nversion = \"test-1\"\n[qualifications.levels]\npgce = 6\n",
    );

    let (stdout, _, success) = run_eyla(&config_path, &["patterns"]);
    assert!(success);
    assert!(stdout.contains("test-1"));
    assert!(stdout.contains("pgce"));
    assert!(!stdout.contains("nneb"));
}
