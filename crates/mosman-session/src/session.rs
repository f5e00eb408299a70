//! The session manager: single-flight invocation of the device tool
//!
//! All device interaction funnels through [`SessionManager::invoke`], which
//! owns the single active-process slot. A new invocation forcibly preempts
//! whatever is running, waits for its exit notification, and only then
//! starts the new process -- so at most one external tool process exists at
//! any instant, and a preempted invocation never resolves as success.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use mosman_core::boards::board_flags;
use mosman_core::prelude::*;
use mosman_core::Settings;

use crate::process::ToolProcess;
use crate::sink::{BufferSink, OutputSink};

/// Bound on the wait for a preempted process to exit
///
/// The reference behavior waited forever; a tool that ignores SIGKILL this
/// long has wedged the port and the session cannot continue.
pub const PREEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Whether an invocation writes decorative start/end markers to its sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markers {
    Emit,
    Suppress,
}

/// Selected port, board, and global flags
#[derive(Debug, Default, Clone)]
struct Selection {
    port: Option<String>,
    board: Option<String>,
    extra_flags: Vec<String>,
}

/// Serializes all tool invocations through a single active-process slot
#[derive(Debug)]
pub struct SessionManager {
    /// External tool binary name or path
    tool: String,

    /// Working directory for every invocation (the firmware project)
    project_dir: PathBuf,

    /// Current port/board/flag selection
    selection: std::sync::Mutex<Selection>,

    /// The single active-process slot; holding this lock across the
    /// take-kill-wait-spawn sequence is what serializes invocations
    active: Mutex<Option<ToolProcess>>,

    /// Callers currently waiting for a forced kill to complete; nonzero
    /// suppresses idle-console starts
    preempt_waiters: AtomicUsize,
}

impl SessionManager {
    /// Create a session manager for `tool` running in `project_dir`
    pub fn new(tool: impl Into<String>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            project_dir: project_dir.into(),
            selection: std::sync::Mutex::new(Selection::default()),
            active: Mutex::new(None),
            preempt_waiters: AtomicUsize::new(0),
        }
    }

    /// Create a session manager from persisted settings
    pub fn from_settings(settings: &Settings, project_dir: impl Into<PathBuf>) -> Self {
        let manager = Self::new(settings.tool.clone(), project_dir);
        manager.set_port(settings.port().map(str::to_string));
        manager.set_board(settings.board().map(str::to_string));
        manager.set_extra_flags(&settings.extra_flags);
        manager
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn port(&self) -> Option<String> {
        self.selection.lock().expect("selection lock").port.clone()
    }

    pub fn set_port(&self, port: Option<String>) {
        self.selection.lock().expect("selection lock").port = port.filter(|p| !p.is_empty());
    }

    pub fn board(&self) -> Option<String> {
        self.selection.lock().expect("selection lock").board.clone()
    }

    pub fn set_board(&self, board: Option<String>) {
        self.selection.lock().expect("selection lock").board = board.filter(|b| !b.is_empty());
    }

    /// Set the raw flag string appended to every invocation
    pub fn set_extra_flags(&self, flags: &str) {
        self.selection.lock().expect("selection lock").extra_flags =
            flags.split_whitespace().map(str::to_string).collect();
    }

    /// Run the tool with `args`, streaming output to `sink`
    ///
    /// Any currently running invocation is killed first and its exit
    /// awaited. Resolves `Ok` only when the new process exits with status 0.
    pub async fn invoke<S: AsRef<str>>(
        &self,
        args: &[S],
        sink: Arc<dyn OutputSink>,
        markers: Markers,
    ) -> Result<()> {
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        let subcommand = args.first().cloned().unwrap_or_default();

        let process = {
            let mut slot = self.active.lock().await;
            if let Some(old) = slot.take() {
                self.preempt(old).await?;
            }
            self.spawn_into_slot(&mut slot, &args, sink.clone(), markers)?
        };

        self.finish(process, sink, markers, &subcommand).await
    }

    /// Run the tool only when the session is fully idle
    ///
    /// Returns `None` without side effects when a process is active, the
    /// active slot is contended, or a preemption is outstanding. Used by the
    /// idle console scheduler, which must never delay a real command.
    pub async fn invoke_if_idle<S: AsRef<str>>(
        &self,
        args: &[S],
        sink: Arc<dyn OutputSink>,
        markers: Markers,
    ) -> Option<Result<()>> {
        if self.preempt_pending() {
            return None;
        }

        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        let subcommand = args.first().cloned().unwrap_or_default();

        let process = {
            let mut slot = self.active.try_lock().ok()?;
            if slot.is_some() {
                return None;
            }
            match self.spawn_into_slot(&mut slot, &args, sink.clone(), markers) {
                Ok(process) => process,
                Err(e) => return Some(Err(e)),
            }
        };

        Some(self.finish(process, sink, markers, &subcommand).await)
    }

    /// Run an invocation with marker suppression and a private buffering
    /// sink, resolving to the concatenated output text
    pub async fn invoke_capturing_output<S: AsRef<str>>(&self, args: &[S]) -> Result<String> {
        let sink = Arc::new(BufferSink::new());
        self.invoke(args, sink.clone(), Markers::Suppress).await?;
        Ok(sink.contents())
    }

    /// Whether a process currently occupies the active slot
    pub fn is_busy(&self) -> bool {
        match self.active.try_lock() {
            Ok(slot) => slot.is_some(),
            Err(_) => true,
        }
    }

    /// Whether any caller is waiting on a forced kill
    pub fn preempt_pending(&self) -> bool {
        self.preempt_waiters.load(Ordering::SeqCst) > 0
    }

    /// Full argument list for `args`: selected port, board flags on
    /// `build`, then the global extra flags
    fn full_args(&self, args: &[String]) -> Vec<String> {
        let selection = self.selection.lock().expect("selection lock");
        let mut full = args.to_vec();
        if let Some(port) = &selection.port {
            full.push("--port".to_string());
            full.push(port.clone());
        }
        if args.first().is_some_and(|a| a == "build") {
            if let Some(flags) = selection.board.as_deref().and_then(board_flags) {
                full.extend(flags.split_whitespace().map(str::to_string));
            }
        }
        full.extend(selection.extra_flags.iter().cloned());
        full
    }

    /// Spawn into the (empty) slot held by `slot`
    fn spawn_into_slot(
        &self,
        slot: &mut Option<ToolProcess>,
        args: &[String],
        sink: Arc<dyn OutputSink>,
        markers: Markers,
    ) -> Result<ToolProcess> {
        let full = self.full_args(args);
        info!("Running: {} {}", self.tool, full.join(" "));
        if markers == Markers::Emit {
            sink.append(&format!("\n--[command: {} {}]\n", self.tool, full.join(" ")));
        }
        let process = ToolProcess::spawn(&self.tool, &full, &self.project_dir, sink)?;
        *slot = Some(process.clone());
        Ok(process)
    }

    /// Await `process`, clear the slot if it is still ours, and map the
    /// exit outcome
    async fn finish(
        &self,
        process: ToolProcess,
        sink: Arc<dyn OutputSink>,
        markers: Markers,
        subcommand: &str,
    ) -> Result<()> {
        let exit = process.wait().await;

        {
            let mut slot = self.active.lock().await;
            if slot.as_ref().is_some_and(|p| p.same_invocation(&process)) {
                *slot = None;
            }
        }

        if markers == Markers::Emit {
            sink.append("--[command complete]\n");
        }

        match exit.code {
            Some(0) => Ok(()),
            Some(code) => Err(Error::command_failed(subcommand, code)),
            None => Err(Error::interrupted(subcommand)),
        }
    }

    /// Kill `old` and await its exit notification, bounded by
    /// [`PREEMPT_TIMEOUT`]
    ///
    /// On timeout the slot stays empty and the error is fatal: the zombie
    /// may still hold the port, so continuing would violate single-flight.
    async fn preempt(&self, old: ToolProcess) -> Result<()> {
        self.preempt_waiters.fetch_add(1, Ordering::SeqCst);
        debug!("Preempting running tool process (pid {:?})", old.id());
        old.kill();
        let waited = tokio::time::timeout(PREEMPT_TIMEOUT, old.wait()).await;
        self.preempt_waiters.fetch_sub(1, Ordering::SeqCst);

        match waited {
            Ok(_) => Ok(()),
            Err(_) => {
                error!("Tool process ignored kill for {:?}", PREEMPT_TIMEOUT);
                Err(Error::PreemptTimeout)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn raise_preempt_waiters(&self) {
        self.preempt_waiters.fetch_add(1, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub(crate) fn drop_preempt_waiters(&self) {
        self.preempt_waiters.fetch_sub(1, Ordering::SeqCst);
    }
}
