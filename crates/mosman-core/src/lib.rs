//! # mosman-core - Core Domain Types
//!
//! Foundation crate for mosman. Provides the error taxonomy, logging setup,
//! the board table, and persisted settings.
//!
//! This crate has **zero internal dependencies** -- it only depends on
//! external crates (serde, thiserror, toml, dirs, tracing).
//!
//! ## Public API
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ### Boards (`boards`)
//! - [`board_flags()`] - Build flags for a human-readable board name
//! - [`board_names()`] - All known board names
//!
//! ### Settings (`settings`)
//! - [`Settings`] - Persisted port/board/flag selection (.mosman/config.toml)
//! - [`load_settings()`] / [`save_settings()`]
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use mosman_core::prelude::*;
//! ```

pub mod boards;
pub mod error;
pub mod logging;
pub mod settings;

/// Prelude for common imports used throughout all mosman crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use boards::{board_flags, board_names, BOARDS};
pub use error::{Error, Result, ResultExt};
pub use settings::{load_settings, save_settings, settings_path, Settings, DEFAULT_TOOL};
