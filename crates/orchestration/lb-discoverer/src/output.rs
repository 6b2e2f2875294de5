//! Rendering of discovered files.

use lb_error::{LbError, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::DiscoveredFile;

/// Output format for discovered files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One path per line (default)
    #[default]
    Plain,

    /// JSON Lines format - one JSON object per line
    Jsonl,

    /// A single pretty-printed JSON array
    Json,
}

/// Write `files` to `writer` in the given format and flush it.
pub fn write_files<W: Write>(
    writer: &mut W,
    files: &[DiscoveredFile],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Plain => {
            for file in files {
                writeln!(writer, "{}", file.path).map_err(write_error)?;
            }
        }
        OutputFormat::Jsonl => {
            for file in files {
                let line = serde_json::to_string(file).map_err(serialize_error)?;
                writeln!(writer, "{line}").map_err(write_error)?;
            }
        }
        OutputFormat::Json => {
            let doc = serde_json::to_string_pretty(files).map_err(serialize_error)?;
            writeln!(writer, "{doc}").map_err(write_error)?;
        }
    }

    writer.flush().map_err(write_error)
}

fn serialize_error(e: serde_json::Error) -> LbError {
    LbError::Config(format!("JSON serialization failed: {e}"))
}

fn write_error(e: std::io::Error) -> LbError {
    LbError::Output(format!("Failed to write output: {e}"))
}
