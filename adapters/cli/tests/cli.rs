use std::process::Command;

fn content(file: &str) -> String {
    format!("{}/../../content/{file}", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn bundled_level_plays_to_the_time_limit() {
    let output = Command::new(env!("CARGO_BIN_EXE_rampart"))
        .args(["--catalog", &content("catalog.toml")])
        .args(["--level", &content("level.toml")])
        .args(["--tower", "1:archer", "--tower", "2:barracks"])
        .args(["--max-seconds", "3"])
        .output()
        .expect("failed to launch the rampart binary");

    assert!(output.status.success(), "rampart should exit cleanly");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("level `Greenfield Pass`: still in progress"));
    assert!(stdout.contains("towers built 2 (rejected 0)"));
}

#[test]
fn missing_level_file_is_reported() {
    let output = Command::new(env!("CARGO_BIN_EXE_rampart"))
        .args(["--catalog", &content("catalog.toml")])
        .args(["--level", &content("no-such-level.toml")])
        .output()
        .expect("failed to launch the rampart binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read level"));
}
