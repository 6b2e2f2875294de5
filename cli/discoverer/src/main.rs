//! lb-discoverer CLI
//!
//! Time-windowed discovery of session log files.

use clap::Parser;
use lb_cli_common::{format_bytes, format_number, init_logging};

mod args;
mod run;

use args::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Logs go to stderr, so stdout only carries discovered files
    init_logging(args.log_level)?;

    let outcome = run::execute(args).await?;
    let stats = &outcome.discovery.stats;

    eprintln!();
    eprintln!("Discovery completed:");
    eprintln!("  Devices:          {}", format_number(stats.roots_processed as u64));
    eprintln!("  Empty devices:    {}", format_number(stats.empty_roots as u64));
    eprintln!(
        "  Folders listed:   {} of {} ({} pruned, {:.0}%)",
        format_number(stats.folders_listed as u64),
        format_number(stats.folders_seen as u64),
        format_number(stats.folders_pruned as u64),
        stats.prune_ratio() * 100.0
    );
    eprintln!("  First-file reads: {}", format_number(stats.first_file_lookups as u64));
    eprintln!("  Files matched:    {}", format_number(stats.files_matched as u64));
    eprintln!("  Files skipped:    {}", format_number(stats.files_skipped as u64));
    eprintln!("  Bytes matched:    {}", format_bytes(stats.bytes_matched));

    if let Some(duration) = stats.duration() {
        eprintln!(
            "  Duration:         {:.2}s",
            duration.num_milliseconds() as f64 / 1000.0
        );
    }

    if !outcome.discovery.anomalies.is_empty() {
        eprintln!("  Anomalies:        {}", outcome.discovery.anomalies.len());
        for anomaly in &outcome.discovery.anomalies {
            eprintln!("    {anomaly}");
        }
    }

    if !outcome.failures.is_empty() {
        for (root, error) in &outcome.failures {
            eprintln!("  Failed {root}: {error}");
        }
        std::process::exit(4); // Partial failure
    }

    Ok(())
}
