//! Port enumeration

use mosman_core::prelude::*;

use crate::session::SessionManager;

/// Parse `ports` output into port names
pub fn parse_ports(output: &str) -> Vec<String> {
    output.split_whitespace().map(str::to_string).collect()
}

/// Enumerate available device ports via the tool's `ports` subcommand
pub async fn list_ports(session: &SessionManager) -> Result<Vec<String>> {
    let output = session.invoke_capturing_output(&["ports"]).await?;
    Ok(parse_ports(&output))
}

/// User-facing hint when the startup `ports` probe fails
///
/// The probe doubles as a tool-version check: old releases lack the
/// subcommand entirely.
pub fn tool_health_hint(tool: &str) -> String {
    format!(
        "'{tool} ports' failed. The tool may be missing or too old; try '{tool} update latest'."
    )
}
