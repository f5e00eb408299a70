//! mosman - a session-managing companion CLI for the Mongoose OS mos tool
//!
//! The binary entry point lives in `main.rs`; command implementations and
//! the mirror watcher live here. All device interaction funnels through
//! [`mosman_session::SessionManager`].

pub mod commands;
pub mod watcher;

pub use commands::Context;
