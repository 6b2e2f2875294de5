//! Main execution logic for lb-discoverer CLI.

use anyhow::{Result, bail};
use lb_discoverer::storage::s3::{RetryConfig, S3Config, S3Credentials};
use lb_discoverer::{
    Discoverer, Discovery, DiscoveryConfig, LocalStorage, QueryWindow, S3Storage,
    StorageAdapter, write_files,
};
use lb_error::LbError;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::args::Cli;

/// Results of a CLI run.
pub struct Outcome {
    /// Merged results of the roots that succeeded
    pub discovery: Discovery,

    /// Roots whose traversal failed, with the error
    pub failures: Vec<(String, LbError)>,
}

/// Execute the discoverer with the provided arguments.
pub async fn execute(args: Cli) -> Result<Outcome> {
    let window = QueryWindow::from_bounds(args.start, args.stop)?;
    let storage = build_storage(&args).await?;
    let discoverer = Discoverer::new(storage.clone(), build_config(&args))?;

    info!(
        storage = %storage.description(),
        devices = args.devices.len(),
        window = %window.description(),
        "Starting discovery"
    );

    let mut discovery = Discovery::default();
    let mut failures = Vec::new();

    for root in discoverer.discover_each(args.devices.as_slice(), &window).await {
        match root.result {
            Ok(listing) => discovery.merge(listing),
            Err(e) => failures.push((root.root, e)),
        }
    }
    discovery.stats.complete();

    let mut stdout = std::io::stdout().lock();
    write_files(&mut stdout, &discovery.files, args.output_format.into())?;

    Ok(Outcome {
        discovery,
        failures,
    })
}

/// Build the storage adapter selected on the command line.
async fn build_storage(args: &Cli) -> Result<Arc<dyn StorageAdapter>> {
    if let Some(base_path) = &args.base_path {
        if !base_path.is_dir() {
            bail!("Base path {} is not a directory", base_path.display());
        }
        let storage: Arc<dyn StorageAdapter> = Arc::new(LocalStorage::new(base_path));
        return Ok(storage);
    }

    let Some(bucket) = &args.bucket else {
        bail!("Either --base-path or --bucket is required");
    };

    let mut s3_config = S3Config::from_location(bucket)?
        .with_region(&args.region)
        .with_timeout(Duration::from_secs(args.timeout))
        .with_retry(RetryConfig::new(args.max_retries));

    if let Some(prefix) = &args.prefix {
        s3_config = s3_config.with_prefix(prefix);
    }

    if let Some(endpoint) = &args.s3_endpoint {
        s3_config = s3_config.with_endpoint(endpoint);
    }

    if let (Some(access_key), Some(secret_key)) = (&args.access_key, &args.secret_key) {
        s3_config = s3_config.with_credentials(S3Credentials::keys(access_key, secret_key));
    } else if let Some(profile) = &args.profile {
        s3_config = s3_config.with_credentials(S3Credentials::Profile(profile.clone()));
    }

    let storage: Arc<dyn StorageAdapter> = Arc::new(S3Storage::from_config(&s3_config).await);
    Ok(storage)
}

/// Build the discovery configuration from CLI arguments.
fn build_config(args: &Cli) -> DiscoveryConfig {
    let mut config = DiscoveryConfig::new()
        .with_session_pattern(&args.session_pattern)
        .with_file_pattern(&args.file_pattern)
        .with_concurrency(args.concurrency);

    if args.any_extension {
        config = config.with_any_extension();
    } else if !args.extensions.is_empty() {
        config = config.with_extensions(args.extensions.iter().cloned());
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(extra: &[&str]) -> Cli {
        let base = ["lb-discoverer", "--base-path", "/tmp", "EEEE0001"];
        Cli::try_parse_from([&base[..], extra].concat()).unwrap()
    }

    #[test]
    fn test_build_config_defaults() {
        let config = build_config(&parse(&[]));

        assert_eq!(config, DiscoveryConfig::new());
    }

    #[test]
    fn test_build_config_extensions() {
        let config = build_config(&parse(&["-e", "mf4", "-e", "MFC", "--concurrency", "8"]));
        assert_eq!(config.file_extensions, vec!["mf4", "MFC"]);
        assert_eq!(config.concurrency, 8);

        let any = build_config(&parse(&["--any-extension"]));
        assert!(any.file_extensions.is_empty());
    }

    #[tokio::test]
    async fn test_missing_base_path_rejected() {
        let cli = Cli::try_parse_from([
            "lb-discoverer",
            "--base-path",
            "/definitely/not/here",
            "EEEE0001",
        ])
        .unwrap();

        assert!(build_storage(&cli).await.is_err());
    }
}
