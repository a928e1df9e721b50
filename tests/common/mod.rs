//! Shared test infrastructure for integration tests.

use std::path::Path;
use std::process::{Command, Output};

/// Run the compiled `ptrack` binary in the given working directory.
pub fn run_ptrack(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ptrack"))
        .args(args)
        .current_dir(dir)
        .output()
        .expect("spawn ptrack")
}

/// Run and assert a zero exit, returning stdout for inspection.
pub fn run_ok(dir: &Path, args: &[&str]) -> String {
    let output = run_ptrack(dir, args);
    assert!(
        output.status.success(),
        "ptrack {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Parse the registry snapshot written in the working directory.
pub fn read_snapshot(dir: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(dir.join("propagation.targets.json"))
        .expect("read propagation.targets.json");
    serde_json::from_str(&content).expect("parse snapshot json")
}
