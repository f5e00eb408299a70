//! Mirror-directory watcher
//!
//! Watches the local mirror for saved files and forwards their paths to the
//! attach loop, debounced so one editor save produces one dispatch.

use std::path::PathBuf;
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Default debounce duration in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Watches the mirror directory and reports saved file paths
pub struct MirrorWatcher {
    /// Directory to watch
    dir: PathBuf,
    /// Debounce duration
    debounce: Duration,
    /// Handle to stop the watcher
    stop_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MirrorWatcher {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            stop_tx: None,
        }
    }

    /// Set debounce duration in milliseconds
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce = Duration::from_millis(ms);
        self
    }

    /// Start watching for saved files
    ///
    /// Sends each saved file's path to `saved_tx`.
    pub fn start(&mut self, saved_tx: mpsc::Sender<PathBuf>) -> Result<(), String> {
        if self.is_running() {
            return Err("Watcher is already running".to_string());
        }

        let dir = self.dir.clone();
        let debounce = self.debounce;
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel();

        self.stop_tx = Some(stop_tx);

        // The debouncer is blocking; give it its own thread.
        tokio::task::spawn_blocking(move || {
            Self::run_watcher(dir, debounce, saved_tx, stop_rx);
        });

        Ok(())
    }

    /// Stop the watcher
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Check if the watcher is running
    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }

    /// Internal: run the blocking watcher
    fn run_watcher(
        dir: PathBuf,
        debounce: Duration,
        saved_tx: mpsc::Sender<PathBuf>,
        mut stop_rx: tokio::sync::oneshot::Receiver<()>,
    ) {
        let tx_clone = saved_tx.clone();

        let debouncer_result = new_debouncer(
            debounce,
            None, // No tick rate override
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let mut seen: Vec<PathBuf> = Vec::new();
                    for event in &events {
                        if !event.kind.is_create() && !event.kind.is_modify() {
                            continue;
                        }
                        for path in &event.paths {
                            if path.is_file() && !seen.contains(path) {
                                seen.push(path.clone());
                            }
                        }
                    }
                    for path in seen {
                        debug!("Mirror file saved: {}", path.display());
                        let _ = tx_clone.blocking_send(path);
                    }
                }
                Err(errors) => {
                    for error in errors {
                        warn!("Mirror watcher error: {:?}", error);
                    }
                }
            },
        );

        let mut debouncer = match debouncer_result {
            Ok(d) => d,
            Err(e) => {
                error!("Failed to create mirror watcher: {}", e);
                return;
            }
        };

        if let Err(e) = debouncer.watch(&dir, RecursiveMode::Recursive) {
            warn!("Failed to watch {}: {}", dir.display(), e);
        } else {
            info!("Watching: {}", dir.display());
        }

        // Keep running until stop signal
        loop {
            match stop_rx.try_recv() {
                Ok(()) | Err(tokio::sync::oneshot::error::TryRecvError::Closed) => {
                    info!("Mirror watcher stopping");
                    break;
                }
                Err(tokio::sync::oneshot::error::TryRecvError::Empty) => {
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
        }
    }
}

impl Drop for MirrorWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watcher_creation() {
        let watcher = MirrorWatcher::new(PathBuf::from("/tmp/mirror"));
        assert!(!watcher.is_running());
        assert_eq!(watcher.debounce, Duration::from_millis(DEFAULT_DEBOUNCE_MS));
    }

    #[test]
    fn test_with_debounce_ms() {
        let watcher = MirrorWatcher::new(PathBuf::from("/tmp/mirror")).with_debounce_ms(100);
        assert_eq!(watcher.debounce, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_stop_when_not_started() {
        let mut watcher = MirrorWatcher::new(PathBuf::from("/tmp/mirror"));
        // Should not panic
        watcher.stop();
        assert!(!watcher.is_running());
    }

    #[tokio::test]
    async fn test_double_start_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = MirrorWatcher::new(dir.path().to_path_buf());
        let (tx, _rx) = mpsc::channel(32);

        assert!(watcher.start(tx.clone()).is_ok());
        assert!(watcher.is_running());

        let second = watcher.start(tx);
        assert!(second.is_err());
        assert!(second.unwrap_err().contains("already running"));

        watcher.stop();
    }

    #[tokio::test]
    async fn test_reports_saved_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher =
            MirrorWatcher::new(dir.path().to_path_buf()).with_debounce_ms(50);
        let (tx, mut rx) = mpsc::channel(32);
        watcher.start(tx).unwrap();

        // Give the watcher a beat to register before writing.
        tokio::time::sleep(Duration::from_millis(200)).await;
        let saved = dir.path().join("init.js");
        std::fs::write(&saved, "load('api.js');").unwrap();

        let reported =
            tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
        let reported = reported.expect("watcher should report within 5s").unwrap();
        assert_eq!(reported.file_name(), saved.file_name());

        watcher.stop();
    }
}
