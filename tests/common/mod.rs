// tests/common/mod.rs
// Shared test utilities for integration tests
#![allow(dead_code)]

use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;

/// Primes in `[2, limit)` by sieve, independent of the pipeline's own test.
pub fn primes_below(limit: u64) -> Vec<u64> {
    if limit < 3 {
        return Vec::new();
    }
    let limit = limit as usize;
    let mut composite = vec![false; limit];
    let mut primes = Vec::new();
    for n in 2..limit {
        if composite[n] {
            continue;
        }
        primes.push(n as u64);
        let mut multiple = n * n;
        while multiple < limit {
            composite[multiple] = true;
            multiple += n;
        }
    }
    primes
}

/// Helper function to run sinkline with given arguments
pub fn run_sinkline(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_sinkline"))
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute sinkline");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Helper function to run sinkline with a temporary JSON config file
pub fn run_sinkline_with_config(args: &[&str], config: &str) -> (String, String, i32) {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file
        .write_all(config.as_bytes())
        .expect("Failed to write to temp file");

    let path = temp_file.path().to_str().unwrap().to_string();
    let mut full_args = vec!["--config", path.as_str()];
    full_args.extend_from_slice(args);
    run_sinkline(&full_args)
}
