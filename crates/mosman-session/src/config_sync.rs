//! Device configuration fetch, diff, and sync
//!
//! The device's live configuration is fetched as JSON, diffed structurally
//! against a locally edited copy, and a nonempty diff is written back with a
//! `Config.Set` / `Config.Save` pair. The save reboots the device.

use std::sync::Arc;

use serde_json::{Map, Value};

use mosman_core::prelude::*;

use crate::session::{Markers, SessionManager};
use crate::sink::OutputSink;

/// Outcome of a sync request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The diff was nonempty and was written; the device is rebooting
    Saved,
    /// The diff was empty; no device interaction happened
    Unchanged,
}

/// Fetch the device configuration text via `config-get`
///
/// The output must parse as JSON; anything else would poison the mirror and
/// every later diff, so it surfaces as an error instead.
pub async fn fetch_config(session: &SessionManager) -> Result<String> {
    let output = session.invoke_capturing_output(&["config-get"]).await?;
    serde_json::from_str::<Value>(&output)?;
    Ok(output)
}

/// Structural diff between a fetched snapshot and a locally edited copy
///
/// For every key in `local`: object values recurse (an absent remote object
/// compares as empty), everything else is included on inequality against the
/// remote value. Keys only present in `remote` are never part of the diff.
/// Malformed JSON on either side yields an empty diff -- a sync is never
/// attempted from garbage input.
pub fn diff(remote_text: &str, local_text: &str) -> Map<String, Value> {
    let remote: Value = match serde_json::from_str(remote_text) {
        Ok(value) => value,
        Err(_) => return Map::new(),
    };
    let local: Value = match serde_json::from_str(local_text) {
        Ok(value) => value,
        Err(_) => return Map::new(),
    };

    match (remote.as_object(), local.as_object()) {
        (Some(remote), Some(local)) => diff_objects(remote, local),
        _ => Map::new(),
    }
}

fn diff_objects(remote: &Map<String, Value>, local: &Map<String, Value>) -> Map<String, Value> {
    let mut changed = Map::new();
    let empty = Map::new();

    for (key, value) in local {
        match value {
            // Only objects recurse; arrays, strings, numbers, booleans and
            // null compare wholesale.
            Value::Object(local_obj) => {
                let remote_obj = remote.get(key).and_then(Value::as_object).unwrap_or(&empty);
                let sub = diff_objects(remote_obj, local_obj);
                if !sub.is_empty() {
                    changed.insert(key.clone(), Value::Object(sub));
                }
            }
            _ => {
                if remote.get(key) != Some(value) {
                    changed.insert(key.clone(), value.clone());
                }
            }
        }
    }

    changed
}

/// Write a nonempty diff to the device
///
/// Issues `Config.Set` with the diff, then `Config.Save` with a reboot; the
/// second call is only attempted when the first succeeds. The reboot drops
/// any live console stream -- the idle scheduler reconnects on its next
/// tick.
pub async fn sync(
    session: &SessionManager,
    changed: &Map<String, Value>,
    sink: Arc<dyn OutputSink>,
) -> Result<SyncOutcome> {
    if changed.is_empty() {
        debug!("Config diff is empty; nothing to save");
        return Ok(SyncOutcome::Unchanged);
    }

    let payload = serde_json::json!({ "config": changed }).to_string();
    session
        .invoke(
            &["call", "Config.Set", payload.as_str()],
            sink.clone(),
            Markers::Emit,
        )
        .await?;
    session
        .invoke(
            &["call", "Config.Save", r#"{"reboot": true}"#],
            sink,
            Markers::Emit,
        )
        .await?;

    info!("Config saved; device is rebooting");
    Ok(SyncOutcome::Saved)
}
