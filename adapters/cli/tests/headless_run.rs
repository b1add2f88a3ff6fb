use std::process::Command;

fn lanebound() -> Command {
    Command::new(env!("CARGO_BIN_EXE_lanebound"))
}

#[test]
fn sample_configuration_plays_to_an_outcome() {
    let output = lanebound()
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .env("RUST_LOG", "warn")
        .args(["--config", "assets/match.toml", "--seed", "4"])
        .output()
        .expect("failed to launch the lanebound binary");

    assert!(output.status.success(), "lanebound exited with {}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Welcome to Lanebound."));
    assert!(stdout.contains("outcome: Win") || stdout.contains("outcome: Lose"));
}

#[test]
fn missing_configuration_file_is_reported() {
    let output = lanebound()
        .args(["--config", "does/not/exist.toml"])
        .output()
        .expect("failed to launch the lanebound binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read match configuration"));
}

#[test]
fn a_tick_limit_too_small_to_finish_fails() {
    let output = lanebound()
        .args(["--max-ticks", "1"])
        .output()
        .expect("failed to launch the lanebound binary");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("match undecided after 1 ticks"));
}
