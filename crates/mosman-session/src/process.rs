//! Device tool process management

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::{mpsc, watch};

use mosman_core::prelude::*;

use crate::sink::OutputSink;

/// Exit outcome of a tool process
///
/// `code == None` means the process was killed by a signal before exiting on
/// its own -- the preemption path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: Option<i32>,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn killed(&self) -> bool {
        self.code.is_none()
    }
}

/// One running invocation of the external device tool
///
/// Cheap to clone; clones share the kill switch and the exit notification.
/// The child itself is owned by a reaper task that fulfills the exit
/// notification exactly once, so waiters never busy-poll for termination.
#[derive(Debug, Clone)]
pub struct ToolProcess {
    pid: Option<u32>,
    kill_tx: mpsc::Sender<()>,
    exit_rx: watch::Receiver<Option<ProcessExit>>,
}

impl ToolProcess {
    /// Spawn the tool with the given arguments in `cwd`
    ///
    /// Stdout and stderr chunks are streamed to `sink` in arrival order as
    /// lossy UTF-8, interleaved however the OS delivers them.
    pub fn spawn(
        program: &str,
        args: &[String],
        cwd: &Path,
        sink: Arc<dyn OutputSink>,
    ) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true) // Critical: cleanup on drop
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool_not_found(program)
                } else {
                    Error::Launch { source: e }
                }
            })?;

        let pid = child.id();
        debug!("Tool process started with PID: {:?}", pid);

        let stdout = child.stdout.take().expect("stdout was configured");
        let stdout_task = tokio::spawn(Self::stream_reader(stdout, sink.clone()));

        let stderr = child.stderr.take().expect("stderr was configured");
        let stderr_task = tokio::spawn(Self::stream_reader(stderr, sink));

        let (kill_tx, mut kill_rx) = mpsc::channel::<()>(1);
        let (exit_tx, exit_rx) = watch::channel(None::<ProcessExit>);

        // Reaper task: owns the child and fulfills the exit notification.
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = kill_rx.recv() => {
                    if let Err(e) = child.start_kill() {
                        warn!("Failed to kill tool process: {}", e);
                    }
                    child.wait().await
                }
            };

            // Drain the readers first: the exit notification promises that
            // everything the process wrote has reached the sink.
            let _ = stdout_task.await;
            let _ = stderr_task.await;

            let exit = match status {
                Ok(status) => ProcessExit {
                    code: status.code(),
                },
                Err(e) => {
                    error!("Failed to wait for tool process: {}", e);
                    ProcessExit { code: None }
                }
            };
            debug!("Tool process (pid {:?}) exited: {:?}", pid, exit);
            let _ = exit_tx.send(Some(exit));
        });

        Ok(Self {
            pid,
            kill_tx,
            exit_rx,
        })
    }

    /// Stream byte chunks from a child pipe into the sink
    async fn stream_reader<R>(mut reader: R, sink: Arc<dyn OutputSink>)
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => sink.append(&String::from_utf8_lossy(&buf[..n])),
                Err(e) => {
                    debug!("Stream read error: {}", e);
                    break;
                }
            }
        }
    }

    /// Request a forceful kill
    ///
    /// Idempotent and non-blocking; observe the actual termination via
    /// [`Self::wait`].
    pub fn kill(&self) {
        let _ = self.kill_tx.try_send(());
    }

    /// Await the exit notification
    pub async fn wait(&self) -> ProcessExit {
        let mut rx = self.exit_rx.clone();
        let exit = match rx.wait_for(|exit| exit.is_some()).await {
            Ok(exit) => (*exit).expect("exit value set by reaper"),
            // Reaper gone without reporting; only happens on runtime teardown.
            Err(_) => ProcessExit { code: None },
        };
        exit
    }

    /// Whether the exit notification has fired
    pub fn is_finished(&self) -> bool {
        self.exit_rx.borrow().is_some()
    }

    /// Get the process ID
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// Whether `other` refers to the same invocation
    pub(crate) fn same_invocation(&self, other: &ToolProcess) -> bool {
        self.kill_tx.same_channel(&other.kill_tx)
    }
}
