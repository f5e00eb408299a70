//! Shared helpers for integration tests
//!
//! Provides a scripted stand-in for the external device tool so the tests
//! exercise real process lifecycles without a device attached.
#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Write an executable fake tool script into `dir`
///
/// The script logs every invocation's arguments (one line per invocation)
/// to `invocations.log`, then runs `cases` as the body of a
/// `case "$1" in ... esac` block.
pub fn fake_tool(dir: &Path, cases: &str) -> (PathBuf, PathBuf) {
    let log = dir.join("invocations.log");
    let tool = dir.join("fake-mos.sh");
    let script = format!(
        "#!/bin/sh\nLOG=\"{log}\"\necho \"$@\" >> \"$LOG\"\ncase \"$1\" in\n{cases}\nesac\n",
        log = log.display(),
    );
    fs::write(&tool, script).unwrap();

    let mut perms = fs::metadata(&tool).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&tool, perms).unwrap();

    (tool, log)
}

/// Logged invocation lines, oldest first
pub fn logged_lines(log: &Path) -> Vec<String> {
    fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Poll `cond` until it holds, panicking after five seconds
pub async fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("condition not met within 5s");
}
