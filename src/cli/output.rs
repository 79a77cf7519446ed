//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ScriptError;

/// Map domain errors to a single line for CLI output.
pub fn map_error(e: &ScriptError) -> String {
    format!("sendscript: {}", e)
}
