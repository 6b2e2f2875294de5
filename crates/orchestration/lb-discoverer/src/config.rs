//! Configuration types for the discoverer.

use serde::{Deserialize, Serialize};

/// Session folder names: a fixed-width decimal counter.
pub const DEFAULT_SESSION_PATTERN: &str = "^[0-9]{8}$";

/// Log file stems: a fixed-width decimal counter.
pub const DEFAULT_FILE_PATTERN: &str = "^[0-9]{8}$";

/// Extension accepted when no filter is configured explicitly.
pub const DEFAULT_EXTENSION: &str = "MF4";

/// Configuration for a discovery run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Accepted file extensions, matched case-insensitively (empty = accept all)
    pub file_extensions: Vec<String>,

    /// Regex a session folder name must match to take part in pruning
    pub session_pattern: String,

    /// Regex a log file stem must match to be considered well-formed
    pub file_pattern: String,

    /// Maximum number of device roots traversed at once by `discover_each`
    pub concurrency: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            file_extensions: vec![DEFAULT_EXTENSION.to_string()],
            session_pattern: DEFAULT_SESSION_PATTERN.to_string(),
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            concurrency: 4,
        }
    }
}

impl DiscoveryConfig {
    /// Create a new discovery configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the extension filter. An empty list disables filtering.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Accept files regardless of extension.
    pub fn with_any_extension(mut self) -> Self {
        self.file_extensions.clear();
        self
    }

    pub fn with_session_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.session_pattern = pattern.into();
        self
    }

    pub fn with_file_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.file_pattern = pattern.into();
        self
    }

    /// Set the root-level concurrency (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_config_defaults() {
        let config = DiscoveryConfig::new();

        assert_eq!(config.file_extensions, vec!["MF4".to_string()]);
        assert_eq!(config.session_pattern, "^[0-9]{8}$");
        assert_eq!(config.file_pattern, "^[0-9]{8}$");
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn test_discovery_config_builder() {
        let config = DiscoveryConfig::new()
            .with_extensions(["mf4", "TXT"])
            .with_session_pattern("^[0-9]{4}$")
            .with_concurrency(0);

        assert_eq!(config.file_extensions, vec!["mf4", "TXT"]);
        assert_eq!(config.session_pattern, "^[0-9]{4}$");
        assert_eq!(config.concurrency, 1);
        assert!(config.with_any_extension().file_extensions.is_empty());
    }
}
