//! Local mirror of fetched device files
//!
//! A storage directory shadows files fetched from the device, plus a
//! fixed-name mirror of the device configuration. Saving the config mirror
//! triggers the diff-and-sync sequence; saving any other file inside the
//! directory uploads it under its base name.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mosman_core::prelude::*;

use crate::config_sync::{self, SyncOutcome};
use crate::files;
use crate::session::SessionManager;
use crate::sink::OutputSink;

/// Fixed name of the local configuration mirror file
pub const CONFIG_MIRROR: &str = "__config.json";

/// What a saved path maps to inside the mirror layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavedKind {
    /// The configuration mirror; triggers diff-and-sync
    Config,
    /// A plain mirrored file; uploaded under this remote name
    File(String),
    /// Not under the mirror directory; ignored
    Outside,
}

/// Result of dispatching a save notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveAction {
    Config(SyncOutcome),
    Uploaded(String),
    Ignored,
}

/// The mirror directory and its dispatch rules
#[derive(Debug, Clone)]
pub struct Mirror {
    dir: PathBuf,
}

impl Mirror {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the configuration mirror file
    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_MIRROR)
    }

    /// Create the mirror directory if missing
    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Classify a saved path against the mirror layout
    pub fn classify(&self, path: &Path) -> SavedKind {
        if path == self.config_path() {
            return SavedKind::Config;
        }
        if path.starts_with(&self.dir) {
            match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => SavedKind::File(name.to_string()),
                None => SavedKind::Outside,
            }
        } else {
            SavedKind::Outside
        }
    }

    /// Write fetched remote content into the mirror
    pub fn write_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        self.ensure()?;
        let local = self.dir.join(name);
        std::fs::write(&local, content)?;
        Ok(local)
    }

    /// Fetch a remote file into the mirror and return its local path
    pub async fn fetch_file(&self, session: &SessionManager, name: &str) -> Result<PathBuf> {
        let content = files::get_file(session, name).await?;
        self.write_file(name, &content)
    }

    /// Fetch the device configuration into the config mirror
    pub async fn fetch_config(&self, session: &SessionManager) -> Result<PathBuf> {
        let content = config_sync::fetch_config(session).await?;
        self.write_file(CONFIG_MIRROR, &content)
    }

    /// Dispatch a save notification for `path`
    ///
    /// The config mirror re-fetches the live device configuration, diffs the
    /// local edit against it, and syncs a nonempty diff (rebooting the
    /// device). Any other file inside the mirror is uploaded under its base
    /// name. Paths outside the mirror are ignored.
    pub async fn on_saved(
        &self,
        session: &SessionManager,
        path: &Path,
        sink: Arc<dyn OutputSink>,
    ) -> Result<SaveAction> {
        match self.classify(path) {
            SavedKind::Config => {
                let remote = config_sync::fetch_config(session).await?;
                let local = std::fs::read_to_string(path)?;
                let changed = config_sync::diff(&remote, &local);
                let outcome = config_sync::sync(session, &changed, sink).await?;
                Ok(SaveAction::Config(outcome))
            }
            SavedKind::File(remote_name) => {
                files::put_file(session, path, &remote_name, sink).await?;
                info!("Uploaded {} as {}", path.display(), remote_name);
                Ok(SaveAction::Uploaded(remote_name))
            }
            SavedKind::Outside => Ok(SaveAction::Ignored),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;

    #[test]
    fn test_classify_config_mirror() {
        let mirror = Mirror::new("/data/mirror");
        assert_eq!(
            mirror.classify(Path::new("/data/mirror/__config.json")),
            SavedKind::Config
        );
    }

    #[test]
    fn test_classify_plain_file_uses_base_name() {
        let mirror = Mirror::new("/data/mirror");
        assert_eq!(
            mirror.classify(Path::new("/data/mirror/init.js")),
            SavedKind::File("init.js".to_string())
        );
        // Nested paths still upload under the base name.
        assert_eq!(
            mirror.classify(Path::new("/data/mirror/sub/app.js")),
            SavedKind::File("app.js".to_string())
        );
    }

    #[test]
    fn test_classify_outside_path_ignored() {
        let mirror = Mirror::new("/data/mirror");
        assert_eq!(
            mirror.classify(Path::new("/data/elsewhere/init.js")),
            SavedKind::Outside
        );
        assert_eq!(
            mirror.classify(Path::new("/data/mirror-other/init.js")),
            SavedKind::Outside
        );
    }

    #[test]
    fn test_write_file_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = Mirror::new(dir.path().join("files"));

        let local = mirror.write_file("init.js", "load('api.js');").unwrap();
        assert_eq!(std::fs::read_to_string(local).unwrap(), "load('api.js');");
    }

    #[tokio::test]
    async fn test_on_saved_ignores_outside_paths() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = Mirror::new(dir.path().join("files"));
        // Any session interaction would fail; Ignored proves there is none.
        let session =
            SessionManager::new("definitely-not-a-real-tool-xyz", std::env::temp_dir());

        let action = mirror
            .on_saved(&session, Path::new("/somewhere/else.txt"), Arc::new(NullSink))
            .await
            .unwrap();
        assert_eq!(action, SaveAction::Ignored);
    }
}
