//! CLI argument definitions for lb-discoverer.

use chrono::{DateTime, Utc};
use clap::{ArgGroup, Parser, ValueEnum};
use lb_cli_common::LogLevel;
use lb_discoverer::config::{DEFAULT_FILE_PATTERN, DEFAULT_SESSION_PATTERN};
use lb_discoverer::parse_date;
use std::path::PathBuf;

/// Time-windowed discovery of session log files.
///
/// Lists the log files of one or more devices whose recording interval
/// overlaps `[--start, --stop)`. Devices live either below a local directory
/// (an SD card dump) or below a bucket prefix. Matching paths are written
/// to stdout; logs and the run summary go to stderr.
///
/// ## Examples
///
/// Local directory:
///   lb-discoverer --base-path /mnt/sdcard EEEE0001 --start 2020-08-02 --stop 2020-08-04
///
/// S3-compatible store:
///   lb-discoverer -b canedge-logs --s3-endpoint http://minio.local:9000 \
///       EEEE0001 EEEE0002 --start -7d --output-format jsonl
#[derive(Parser, Debug)]
#[command(name = "lb-discoverer")]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("storage").required(true).args(["base_path", "bucket"])))]
pub struct Cli {
    /// Device roots to search (e.g. EEEE0001)
    #[arg(required = true)]
    pub devices: Vec<String>,

    // === Local Storage ===
    /// Local directory holding the device roots
    #[arg(long, env = "LB_BASE_PATH")]
    pub base_path: Option<PathBuf>,

    // === S3 Configuration ===
    /// S3 bucket holding the device roots, or an s3://bucket/prefix location
    #[arg(short, long, env = "LB_S3_BUCKET")]
    pub bucket: Option<String>,

    /// Key prefix the device roots live under (overrides a location prefix)
    #[arg(short, long, env = "LB_S3_PREFIX")]
    pub prefix: Option<String>,

    /// Custom S3 endpoint URL (MinIO, LocalStack)
    #[arg(long, env = "LB_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// AWS access key ID
    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    pub access_key: Option<String>,

    /// AWS secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// AWS profile name
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Retries for throttled or failed S3 requests
    #[arg(long, default_value = "3")]
    pub max_retries: u32,

    // === Window ===
    /// Inclusive window start (RFC 3339, date only, or relative like -24h)
    #[arg(long, value_parser = parse_date, allow_hyphen_values = true)]
    pub start: Option<DateTime<Utc>>,

    /// Exclusive window stop
    #[arg(long, value_parser = parse_date, allow_hyphen_values = true)]
    pub stop: Option<DateTime<Utc>>,

    // === Naming ===
    /// Accepted file extension, case-insensitive (repeatable, default MF4)
    #[arg(long = "extension", short = 'e')]
    pub extensions: Vec<String>,

    /// Accept files of any extension
    #[arg(long, conflicts_with = "extensions")]
    pub any_extension: bool,

    /// Regex for session folder names
    #[arg(long, default_value = DEFAULT_SESSION_PATTERN)]
    pub session_pattern: String,

    /// Regex for log file stems
    #[arg(long, default_value = DEFAULT_FILE_PATTERN)]
    pub file_pattern: String,

    // === Parallelism Options ===
    /// Maximum device roots traversed at once (must be >= 1)
    #[arg(long, default_value = "4", value_parser = parse_positive_usize)]
    pub concurrency: usize,

    // === Output Options ===
    /// Output format for discovered files
    #[arg(long, value_enum, default_value = "plain")]
    pub output_format: OutputFormatArg,

    // === Logging Options ===
    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

/// Output format argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    /// One path per line
    Plain,
    /// JSON Lines (one JSON object per line)
    Jsonl,
    /// Pretty-printed JSON array
    Json,
}

impl From<OutputFormatArg> for lb_discoverer::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Plain => lb_discoverer::OutputFormat::Plain,
            OutputFormatArg::Jsonl => lb_discoverer::OutputFormat::Jsonl,
            OutputFormatArg::Json => lb_discoverer::OutputFormat::Json,
        }
    }
}

/// Parse a positive usize (>= 1).
fn parse_positive_usize(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value < 1 {
        return Err(format!("{value} is not in 1.."));
    }
    Ok(value)
}
