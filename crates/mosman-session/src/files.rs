//! Device file listing and transfer

use std::path::Path;
use std::sync::Arc;

use mosman_core::prelude::*;

use crate::session::{Markers, SessionManager};
use crate::sink::OutputSink;

/// Parse `ls` output into file names
///
/// The tool prints names separated by runs of whitespace, with decorative
/// padding around them.
pub fn parse_file_list(output: &str) -> Vec<String> {
    output.split_whitespace().map(str::to_string).collect()
}

/// Mirrors the device's remote file list
///
/// The list is replaced wholesale on every refresh and is stale in between
/// -- callers treat it as eventually consistent.
#[derive(Debug, Default)]
pub struct DeviceFileCache {
    files: Vec<String>,
}

impl DeviceFileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh the cached list from a fresh `ls`
    ///
    /// On failure the previous list is left untouched.
    pub async fn refresh(&mut self, session: &SessionManager) -> Result<()> {
        let output = session.invoke_capturing_output(&["ls"]).await?;
        self.files = parse_file_list(&output);
        debug!("Device file list refreshed: {} entries", self.files.len());
        Ok(())
    }

    /// The cached remote file names, in device order
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Forget the cached list (port deselected)
    pub fn clear(&mut self) {
        self.files.clear();
    }
}

/// Fetch a remote file's content
pub async fn get_file(session: &SessionManager, name: &str) -> Result<String> {
    session.invoke_capturing_output(&["get", name]).await
}

/// Upload a local file under a remote name
pub async fn put_file(
    session: &SessionManager,
    local: &Path,
    remote: &str,
    sink: Arc<dyn OutputSink>,
) -> Result<()> {
    let local = local.to_string_lossy();
    session
        .invoke(&["put", local.as_ref(), remote], sink, Markers::Emit)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_list_trims_and_splits() {
        assert_eq!(parse_file_list("  a.js  b.json \n"), vec!["a.js", "b.json"]);
    }

    #[test]
    fn test_parse_file_list_empty_output() {
        assert!(parse_file_list("").is_empty());
        assert!(parse_file_list("   \n  ").is_empty());
    }

    #[tokio::test]
    async fn test_refresh_replaces_list_wholesale() {
        // A session whose tool is `echo` makes `ls` echo back its own
        // arguments, which is enough to observe the wholesale replacement.
        let session = SessionManager::new("echo", std::env::temp_dir());
        let mut cache = DeviceFileCache::new();

        cache.refresh(&session).await.unwrap();
        assert_eq!(cache.files(), &["ls".to_string()]);
    }

    #[tokio::test]
    async fn test_refresh_failure_leaves_list_untouched() {
        let good = SessionManager::new("echo", std::env::temp_dir());
        let bad = SessionManager::new("definitely-not-a-real-tool-xyz", std::env::temp_dir());
        let mut cache = DeviceFileCache::new();

        cache.refresh(&good).await.unwrap();
        let before = cache.files().to_vec();

        assert!(cache.refresh(&bad).await.is_err());
        assert_eq!(cache.files(), before.as_slice());
    }

    #[tokio::test]
    async fn test_clear_forgets_list() {
        let session = SessionManager::new("echo", std::env::temp_dir());
        let mut cache = DeviceFileCache::new();
        cache.refresh(&session).await.unwrap();
        assert!(!cache.files().is_empty());

        cache.clear();
        assert!(cache.files().is_empty());
    }
}
