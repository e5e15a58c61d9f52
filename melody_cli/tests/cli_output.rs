use std::{env, fs, path::PathBuf, process::Command};

const LESSON: &str = r#"{
    "meta": { "lesson_id": "w1_l1", "title": "Do Re Mi", "world_id": "forest" },
    "bpm": 120,
    "notes": [
        { "lane": 0, "time_ms": 1000, "word": "cat" },
        { "lane": 1, "time_ms": 1500 },
        { "lane": 2, "time_ms": 2000, "word": "sun", "kind": "golden" },
        { "lane": 0, "time_ms": 2500 },
        { "lane": 1, "time_ms": 3000 },
        { "lane": 2, "time_ms": 3500 }
    ]
}"#;

fn norm_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "")
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = env::temp_dir().join(format!("melody_cli_{}_{}", name, std::process::id()));
    fs::write(&path, contents).unwrap();
    path
}

fn run(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_melody_cli"))
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn check_describes_lesson() {
    let lesson = temp_file("check.json", LESSON);
    let out = run(&["check", lesson.to_str().unwrap()]);

    assert!(out.status.success());
    let stdout = norm_newlines(&String::from_utf8_lossy(&out.stdout));
    assert!(stdout.contains("Do Re Mi (w1_l1)"));
    assert!(stdout.contains("notes: 6"));
    assert!(stdout.contains("lanes: 3"));
    assert!(stdout.contains("words: 2"));
}

#[test]
fn check_rejects_lesson_without_notes() {
    let lesson = temp_file(
        "empty.json",
        r#"{ "meta": { "lesson_id": "x", "title": "X" }, "bpm": 100, "notes": [] }"#,
    );
    let out = run(&["check", lesson.to_str().unwrap()]);

    assert!(!out.status.success());
    assert_eq!(out.status.code(), Some(1));
    let stderr = norm_newlines(&String::from_utf8_lossy(&out.stderr));
    assert!(stderr.contains("Error: invalid lesson: "));
    assert!(stderr.contains("Caused by:"));
    assert!(stderr.contains("lesson x has no notes"));
}

#[test]
fn missing_lesson_file_reports_path() {
    let missing = env::temp_dir().join(format!("melody_cli_missing_{}.json", std::process::id()));
    let _ = fs::remove_file(&missing);
    let out = run(&["simulate", "--quiet", missing.to_str().unwrap()]);

    assert_eq!(out.status.code(), Some(1));
    let stderr = norm_newlines(&String::from_utf8_lossy(&out.stderr));
    assert!(stderr.contains("Error: failed to read lesson: "));
}

#[test]
fn simulate_perfect_autoplay_summary() {
    let lesson = temp_file("perfect.json", LESSON);
    let out = run(&["simulate", "--quiet", lesson.to_str().unwrap()]);
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["lesson_id"], "w1_l1");
    assert_eq!(v["final_state"], "Completed");
    assert_eq!(v["summary"]["perfect"], 6);
    assert_eq!(v["summary"]["perfect_play"], true);
    assert_eq!(v["summary"]["stars"], 3);
    assert_eq!(v["words"]["total"], 2);
    assert_eq!(v["words"]["legendary"], 1);
}

#[test]
fn simulate_with_misses_and_config() {
    let lesson = temp_file("misses.json", LESSON);
    let config = temp_file(
        "config.json",
        r#"{ "countdown_seconds": 1, "adaptive": { "enabled": false } }"#,
    );
    let out = run(&[
        "simulate",
        "--quiet",
        "--miss-every",
        "3",
        "--config",
        config.to_str().unwrap(),
        lesson.to_str().unwrap(),
    ]);
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["summary"]["miss"], 2);
    assert_eq!(v["summary"]["full_combo"], false);
    assert_eq!(v["difficulty"], "easy");
    // The golden "sun" note is the third one and is skipped
    assert_eq!(v["words"]["legendary"], 0);
}

#[test]
fn simulate_timeline_lists_judgments() {
    let lesson = temp_file("timeline.json", LESSON);
    let out = run(&["simulate", "--offset-ms", "-120", lesson.to_str().unwrap()]);
    assert!(out.status.success());

    let stdout = norm_newlines(&String::from_utf8_lossy(&out.stdout));
    assert!(stdout.contains("Simulation Start (6 notes, 120.0 bpm)"));
    assert!(stdout.contains("countdown 3"));
    assert!(stdout.contains("note_0 lane 0 GOOD! (-120.0ms)"));
    assert!(stdout.contains("collected \"cat\" (Basic)"));
}

#[test]
fn invalid_config_is_rejected() {
    let lesson = temp_file("badcfg_lesson.json", LESSON);
    let config = temp_file("badcfg.json", r#"{ "look_ahead_ms": -5 }"#);
    let out = run(&[
        "simulate",
        "--config",
        config.to_str().unwrap(),
        lesson.to_str().unwrap(),
    ]);

    assert_eq!(out.status.code(), Some(1));
    let stderr = norm_newlines(&String::from_utf8_lossy(&out.stderr));
    assert!(stderr.contains("Error: invalid config: "));
    assert!(stderr.contains("look_ahead_ms must be > 0"));
}
