//! External tool availability checking

use std::path::PathBuf;

use mosman_core::prelude::*;

/// Verify the external tool exists on PATH before first use
///
/// Spawning would fail anyway, but checking up front turns every command's
/// failure mode into one clear message.
pub fn ensure_tool(tool: &str) -> Result<PathBuf> {
    which::which(tool).map_err(|_| Error::tool_not_found(tool))
}
