//! # mosman-session - Device Tool Process Management
//!
//! Owns the external device tool's process lifecycle: single-flight
//! invocation with forced preemption, idle console streaming, configuration
//! diff-and-sync, and the device file mirror.
//!
//! Depends on [`mosman_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Session Management
//! - [`SessionManager`] - Serializes every invocation through the single
//!   active-process slot; preempts whatever is running first
//! - [`ToolProcess`] - One running invocation with a kill switch and an
//!   exit notification
//! - [`Markers`] - Whether an invocation writes start/end markers
//!
//! ### Output Sinks
//! - [`OutputSink`] - Append-only destination for streamed output
//! - [`BufferSink`], [`ChannelSink`], [`StdoutSink`], [`NullSink`]
//!
//! ### Idle Console
//! - [`IdleConsoleScheduler`] - Restarts the console stream while idle
//!
//! ### Configuration Sync
//! - [`config_sync::fetch_config()`] / [`config_sync::diff()`] /
//!   [`config_sync::sync()`] - Fetch, structural diff, set-and-save
//! - [`SyncOutcome`] - Saved vs. nothing-to-save
//!
//! ### Device Files
//! - [`DeviceFileCache`] - Wholesale-replaced remote file list
//! - [`Mirror`] - Local storage directory with save-dispatch rules
//! - [`ports::list_ports()`] - Port enumeration and the startup health hint

pub mod config_sync;
pub mod console;
pub mod files;
pub mod mirror;
pub mod ports;
pub mod process;
pub mod session;
pub mod sink;
pub mod tool_check;

// Public API re-exports
pub use config_sync::{diff, fetch_config, sync, SyncOutcome};
pub use console::{IdleConsoleScheduler, DEFAULT_IDLE_TICK};
pub use files::{get_file, parse_file_list, put_file, DeviceFileCache};
pub use mirror::{Mirror, SaveAction, SavedKind, CONFIG_MIRROR};
pub use ports::{list_ports, parse_ports, tool_health_hint};
pub use process::{ProcessExit, ToolProcess};
pub use session::{Markers, SessionManager, PREEMPT_TIMEOUT};
pub use sink::{BufferSink, ChannelSink, NullSink, OutputSink, StdoutSink};
pub use tool_check::ensure_tool;
