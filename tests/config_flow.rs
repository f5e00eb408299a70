//! Configuration diff-and-sync and mirror save dispatch against a scripted
//! fake tool
#![cfg(unix)]

mod common;

use std::sync::Arc;

use serial_test::serial;

use common::{fake_tool, logged_lines};
use mosman_core::Error;
use mosman_session::{
    config_sync, Mirror, NullSink, SaveAction, SessionManager, SyncOutcome, CONFIG_MIRROR,
};

const REMOTE_CONFIG: &str = r#"{"wifi":{"ssid":"A","pass":"x"},"debug":1}"#;

fn config_cases() -> String {
    // Single quotes keep the JSON's double quotes literal in the script.
    format!("  config-get) printf '{}' ;;", REMOTE_CONFIG)
}

#[tokio::test]
async fn sync_issues_set_then_save_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (tool, log) = fake_tool(dir.path(), &config_cases());
    let session = SessionManager::new(tool.to_string_lossy(), dir.path());

    let local = r#"{"wifi":{"ssid":"B","pass":"x"},"debug":1}"#;
    let remote = config_sync::fetch_config(&session).await.unwrap();
    let changed = config_sync::diff(&remote, local);

    let outcome = config_sync::sync(&session, &changed, Arc::new(NullSink))
        .await
        .unwrap();
    assert_eq!(outcome, SyncOutcome::Saved);

    let lines = logged_lines(&log);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "config-get");
    assert!(lines[1].starts_with("call Config.Set "));
    assert!(lines[1].contains(r#"{"config":{"wifi":{"ssid":"B"}}}"#));
    assert_eq!(lines[2], r#"call Config.Save {"reboot": true}"#);
}

#[tokio::test]
async fn sync_stops_after_failed_set() {
    let dir = tempfile::tempdir().unwrap();
    let cases = format!(
        "{}\n  call) if [ \"$2\" = \"Config.Set\" ]; then exit 1; fi ;;",
        config_cases()
    );
    let (tool, log) = fake_tool(dir.path(), &cases);
    let session = SessionManager::new(tool.to_string_lossy(), dir.path());

    let remote = config_sync::fetch_config(&session).await.unwrap();
    let changed = config_sync::diff(&remote, r#"{"debug":2}"#);

    let err = config_sync::sync(&session, &changed, Arc::new(NullSink))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CommandFailed { .. }));

    // The failed set is the only call; the save is never attempted.
    let calls: Vec<_> = logged_lines(&log)
        .into_iter()
        .filter(|line| line.starts_with("call "))
        .collect();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("call Config.Set "));
}

#[tokio::test]
async fn sync_empty_diff_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (tool, log) = fake_tool(dir.path(), &config_cases());
    let session = SessionManager::new(tool.to_string_lossy(), dir.path());

    let remote = config_sync::fetch_config(&session).await.unwrap();
    let changed = config_sync::diff(&remote, REMOTE_CONFIG);
    assert!(changed.is_empty());

    let outcome = config_sync::sync(&session, &changed, Arc::new(NullSink))
        .await
        .unwrap();
    assert_eq!(outcome, SyncOutcome::Unchanged);

    // Only the fetch hit the tool.
    assert_eq!(logged_lines(&log), vec!["config-get"]);
}

#[tokio::test]
#[serial]
async fn saving_edited_config_mirror_syncs_and_reboots() {
    let dir = tempfile::tempdir().unwrap();
    let (tool, log) = fake_tool(dir.path(), &config_cases());
    let session = SessionManager::new(tool.to_string_lossy(), dir.path());
    let mirror = Mirror::new(dir.path().join("files"));

    let edited = r#"{"wifi":{"ssid":"B","pass":"x"},"debug":1}"#;
    let config_path = mirror.write_file(CONFIG_MIRROR, edited).unwrap();

    let action = mirror
        .on_saved(&session, &config_path, Arc::new(NullSink))
        .await
        .unwrap();
    assert_eq!(action, SaveAction::Config(SyncOutcome::Saved));

    let lines = logged_lines(&log);
    assert_eq!(lines[0], "config-get");
    assert!(lines[1].starts_with("call Config.Set "));
    assert_eq!(lines[2], r#"call Config.Save {"reboot": true}"#);
}

#[tokio::test]
async fn saving_unchanged_config_mirror_aborts_save() {
    let dir = tempfile::tempdir().unwrap();
    let (tool, log) = fake_tool(dir.path(), &config_cases());
    let session = SessionManager::new(tool.to_string_lossy(), dir.path());
    let mirror = Mirror::new(dir.path().join("files"));

    let config_path = mirror.write_file(CONFIG_MIRROR, REMOTE_CONFIG).unwrap();

    let action = mirror
        .on_saved(&session, &config_path, Arc::new(NullSink))
        .await
        .unwrap();
    assert_eq!(action, SaveAction::Config(SyncOutcome::Unchanged));

    assert!(!logged_lines(&log).iter().any(|line| line.starts_with("call ")));
}

#[tokio::test]
async fn saving_plain_mirror_file_uploads_under_base_name() {
    let dir = tempfile::tempdir().unwrap();
    let (tool, log) = fake_tool(dir.path(), "");
    let session = SessionManager::new(tool.to_string_lossy(), dir.path());
    let mirror = Mirror::new(dir.path().join("files"));

    let local = mirror.write_file("init.js", "load('api.js');").unwrap();

    let action = mirror
        .on_saved(&session, &local, Arc::new(NullSink))
        .await
        .unwrap();
    assert_eq!(action, SaveAction::Uploaded("init.js".to_string()));

    let lines = logged_lines(&log);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("put "));
    assert!(lines[0].ends_with(" init.js"));
}
