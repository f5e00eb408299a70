//! Idle console scheduling
//!
//! Keeps a best-effort `console` stream running whenever the session is idle
//! and a port is selected, so live device output is always on screen without
//! an explicit user action. Real commands always win: `invoke` preempts the
//! stream, and the scheduler backs off whenever the session is busy or a
//! preemption is in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use mosman_core::prelude::*;

use crate::session::{Markers, SessionManager};
use crate::sink::OutputSink;

/// Default scheduler period
pub const DEFAULT_IDLE_TICK: Duration = Duration::from_secs(1);

/// Periodically restarts the console stream while the session is idle
pub struct IdleConsoleScheduler {
    session: Arc<SessionManager>,
    sink: Arc<dyn OutputSink>,
    tick: Duration,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl IdleConsoleScheduler {
    pub fn new(session: Arc<SessionManager>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            session,
            sink,
            tick: DEFAULT_IDLE_TICK,
            stop_tx: None,
        }
    }

    /// Override the scheduler period
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Start ticking
    ///
    /// On each tick: skip when no port is selected, a process is active, or
    /// a preemption is outstanding; otherwise start a `console` invocation
    /// and swallow its outcome (console runs are routinely interrupted by
    /// the next real command).
    ///
    /// `stop()` takes effect between console runs; a live stream is not
    /// killed by the scheduler itself -- the next real command or process
    /// shutdown ends it.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(Error::config("Idle console scheduler is already running"));
        }

        let (stop_tx, mut stop_rx) = oneshot::channel();
        self.stop_tx = Some(stop_tx);

        let session = self.session.clone();
        let sink = self.sink.clone();
        let tick = self.tick;

        tokio::spawn(async move {
            info!("Idle console scheduler started (tick {:?})", tick);
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        info!("Idle console scheduler stopping");
                        break;
                    }
                    _ = interval.tick() => {
                        if session.port().is_none() {
                            continue;
                        }
                        if let Some(Err(e)) = session
                            .invoke_if_idle(&["console"], sink.clone(), Markers::Emit)
                            .await
                        {
                            debug!("Idle console ended: {}", e);
                        }
                    }
                }
            }
        });

        Ok(())
    }

    /// Stop the scheduler
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Check if the scheduler is running
    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }
}

impl Drop for IdleConsoleScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
