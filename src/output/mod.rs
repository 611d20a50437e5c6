use anyhow::Context;
use std::path::Path;

use crate::handler::DubResponse;
use crate::Result;

/// Render the envelope as pretty-printed JSON
pub fn format_response(response: &DubResponse) -> Result<String> {
    serde_json::to_string_pretty(response).context("Failed to serialize response")
}

/// Save the envelope to file
pub fn save_to_file(response: &DubResponse, path: &Path) -> Result<()> {
    let content = format_response(response)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print the envelope to stdout
pub fn print_to_console(response: &DubResponse) -> Result<()> {
    println!("{}", format_response(response)?);
    Ok(())
}
