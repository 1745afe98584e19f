/*!
 * Enclave Configuration
 * Generic per-enclave configuration and the payload records exchanged with a region
 */

use super::options::HostConfig;
use serde::{Deserialize, Serialize};

/// Default descriptors the region uses for its standard streams
pub const DEFAULT_STDIN_FD: i32 = 0;
pub const DEFAULT_STDOUT_FD: i32 = 1;
pub const DEFAULT_STDERR_FD: i32 = 2;

/// Log verbosity requested from code inside the region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoggingLevel {
    Error,
    Warning,
    #[default]
    Info,
    Debug,
}

/// Environment variable forwarded into the region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
}

/// Generic enclave configuration passed to Initialize
///
/// Unset fields are filled from the host configuration by `apply_defaults`
/// before the configuration crosses the boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclaveConfig {
    #[serde(default)]
    pub host_config: Option<HostConfig>,
    #[serde(default)]
    pub stdin_fd: Option<i32>,
    #[serde(default)]
    pub stdout_fd: Option<i32>,
    #[serde(default)]
    pub stderr_fd: Option<i32>,
    #[serde(default)]
    pub logging_level: Option<LoggingLevel>,
    #[serde(default)]
    pub environment_variables: Vec<EnvironmentVariable>,
    /// Allow the region to be re-created in a forked child
    #[serde(default)]
    pub enable_fork: bool,
}

impl EnclaveConfig {
    /// Configuration with every default derived from `host`
    pub fn from_host(host: &HostConfig) -> Self {
        let mut config = Self::default();
        config.apply_defaults(host);
        config
    }

    /// Fill in every field the caller left unset
    pub fn apply_defaults(&mut self, host: &HostConfig) {
        if self.host_config.is_none() {
            self.host_config = Some(host.clone());
        }
        self.stdin_fd.get_or_insert(DEFAULT_STDIN_FD);
        self.stdout_fd.get_or_insert(DEFAULT_STDOUT_FD);
        self.stderr_fd.get_or_insert(DEFAULT_STDERR_FD);
        self.logging_level.get_or_insert(LoggingLevel::default());
    }

    pub fn with_fork(mut self, enable_fork: bool) -> Self {
        self.enable_fork = enable_fork;
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment_variables.push(EnvironmentVariable {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

/// Input to a Run call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclaveInput {
    pub payload: Vec<u8>,
}

/// Output of a Run call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclaveOutput {
    pub payload: Vec<u8>,
}

/// Input to Finalize
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclaveFinal {
    pub payload: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_defaults_keeps_explicit_values() {
        let host = HostConfig::default().with_local_name("host");
        let mut config = EnclaveConfig {
            stdout_fd: Some(7),
            logging_level: Some(LoggingLevel::Debug),
            ..Default::default()
        };
        config.apply_defaults(&host);

        assert_eq!(config.host_config, Some(host));
        assert_eq!(config.stdin_fd, Some(DEFAULT_STDIN_FD));
        assert_eq!(config.stdout_fd, Some(7));
        assert_eq!(config.stderr_fd, Some(DEFAULT_STDERR_FD));
        assert_eq!(config.logging_level, Some(LoggingLevel::Debug));
    }

    #[test]
    fn test_from_host_fills_everything() {
        let config = EnclaveConfig::from_host(&HostConfig::default());
        assert!(config.host_config.is_some());
        assert_eq!(config.logging_level, Some(LoggingLevel::Info));
        assert!(!config.enable_fork);
    }
}
