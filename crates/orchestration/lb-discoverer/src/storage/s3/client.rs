//! Where a fleet bucket lives and how to reach it.

use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use lb_error::{LbError, Result};
use std::time::Duration;

use super::retry::RetryConfig;

/// How list and head requests are signed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum S3Credentials {
    /// The SDK's default provider chain (environment, shared config, instance role)
    #[default]
    Default,

    /// Named profile from the shared AWS config files
    Profile(String),

    /// Static access key pair
    Keys {
        access_key: String,
        secret_key: String,
    },
}

impl S3Credentials {
    pub fn keys(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self::Keys {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

/// A fleet bucket, optionally below a key prefix, and the client settings
/// used to walk it.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,

    /// Key prefix the device roots live under
    pub prefix: Option<String>,

    pub region: Option<String>,

    /// Custom endpoint URL (MinIO, LocalStack, on-premise gateways)
    pub endpoint: Option<String>,

    pub credentials: S3Credentials,

    /// Per-operation timeout
    pub timeout: Duration,

    pub retry: RetryConfig,
}

impl S3Config {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
            region: None,
            endpoint: None,
            credentials: S3Credentials::Default,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }

    /// Parse `s3://bucket/some/prefix` or a bare bucket name.
    pub fn from_location(location: &str) -> Result<Self> {
        let location = location.trim();
        let rest = location.strip_prefix("s3://").unwrap_or(location);
        let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));

        if bucket.is_empty() {
            return Err(LbError::Config(format!(
                "No bucket in S3 location '{location}'"
            )));
        }

        let mut config = Self::new(bucket);
        let prefix = prefix.trim_matches('/');
        if !prefix.is_empty() {
            config.prefix = Some(prefix.to_string());
        }
        Ok(config)
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_credentials(mut self, credentials: S3Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Self-hosted gateways generally do not resolve virtual-hosted buckets.
    pub fn path_style(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Build a client for this bucket.
    pub async fn connect(&self) -> Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(self.timeout)
                .build(),
        );

        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &self.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        loader = match &self.credentials {
            S3Credentials::Default => loader,
            S3Credentials::Profile(name) => loader.profile_name(name),
            S3Credentials::Keys {
                access_key,
                secret_key,
            } => loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "lb-discoverer",
            )),
        };

        let shared = loader.load().await;
        let config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(self.path_style())
            .build();

        Client::from_conf(config)
    }
}
