/*!
 * Manager Options
 * Host configuration source for the enclave manager
 */

use crate::core::{EnclaveError, EnclaveResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default timeout when connecting to a config server
pub const DEFAULT_CONFIG_SERVER_TIMEOUT: Duration = Duration::from_millis(1000);

/// Host-side configuration shared by every enclave this process loads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Local name advertised by this host
    #[serde(default)]
    pub local_name: Option<String>,
}

impl HostConfig {
    pub fn with_local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = Some(name.into());
        self
    }
}

/// Where to fetch a host configuration from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigServerConnectionAttributes {
    pub server_address: String,
    pub connection_timeout: Duration,
}

/// Options consumed by the enclave manager on construction
///
/// Holds either a complete host configuration or the attributes needed to
/// fetch one remotely. Accessors for the variant not held fail with a
/// precondition error instead of falling back to a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ManagerOptions {
    HostConfig(HostConfig),
    ConfigServer(ConfigServerConnectionAttributes),
}

impl Default for ManagerOptions {
    fn default() -> Self {
        ManagerOptions::HostConfig(HostConfig::default())
    }
}

impl ManagerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to the config-server variant
    pub fn set_config_server_connection_attributes(
        &mut self,
        address: impl Into<String>,
        timeout: Duration,
    ) -> &mut Self {
        *self = ManagerOptions::ConfigServer(ConfigServerConnectionAttributes {
            server_address: address.into(),
            connection_timeout: timeout,
        });
        self
    }

    /// Switch to the host-config variant
    pub fn set_host_config(&mut self, config: HostConfig) -> &mut Self {
        *self = ManagerOptions::HostConfig(config);
        self
    }

    pub fn holds_host_config(&self) -> bool {
        matches!(self, ManagerOptions::HostConfig(_))
    }

    pub fn host_config(&self) -> EnclaveResult<&HostConfig> {
        match self {
            ManagerOptions::HostConfig(config) => Ok(config),
            ManagerOptions::ConfigServer(_) => Err(EnclaveError::FailedPrecondition(
                "Options object does not contain a HostConfig".into(),
            )),
        }
    }

    pub fn config_server_address(&self) -> EnclaveResult<&str> {
        self.server_attributes("config-server address")
            .map(|attrs| attrs.server_address.as_str())
    }

    pub fn config_server_connection_timeout(&self) -> EnclaveResult<Duration> {
        self.server_attributes("server-connection timeout")
            .map(|attrs| attrs.connection_timeout)
    }

    fn server_attributes(&self, what: &str) -> EnclaveResult<&ConfigServerConnectionAttributes> {
        match self {
            ManagerOptions::ConfigServer(attrs) => Ok(attrs),
            ManagerOptions::HostConfig(_) => Err(EnclaveError::FailedPrecondition(format!(
                "Options object does not hold {}",
                what
            ))),
        }
    }

    /// Build options from the process environment
    ///
    /// Environment variables:
    /// - ENCLAVE_CONFIG_SERVER_ADDRESS: fetch the host config from this server
    /// - ENCLAVE_CONFIG_SERVER_TIMEOUT_MS: connection timeout (default: 1000)
    /// - ENCLAVE_HOST_LOCAL_NAME: local name of the host config otherwise
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(address) = lookup("ENCLAVE_CONFIG_SERVER_ADDRESS") {
            let timeout = lookup("ENCLAVE_CONFIG_SERVER_TIMEOUT_MS")
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_CONFIG_SERVER_TIMEOUT);
            let mut options = Self::new();
            options.set_config_server_connection_attributes(address, timeout);
            return options;
        }

        ManagerOptions::HostConfig(HostConfig {
            local_name: lookup("ENCLAVE_HOST_LOCAL_NAME"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_holds_empty_host_config() {
        let options = ManagerOptions::default();
        assert!(options.holds_host_config());
        assert_eq!(options.host_config().unwrap(), &HostConfig::default());
    }

    #[test]
    fn test_wrong_variant_accessors_fail() {
        let mut options = ManagerOptions::new();
        options.set_config_server_connection_attributes("localhost:4321", Duration::from_secs(2));
        assert!(!options.holds_host_config());
        assert_eq!(options.config_server_address().unwrap(), "localhost:4321");
        assert_eq!(
            options.config_server_connection_timeout().unwrap(),
            Duration::from_secs(2)
        );
        assert!(matches!(
            options.host_config(),
            Err(EnclaveError::FailedPrecondition(_))
        ));

        options.set_host_config(HostConfig::default().with_local_name("h"));
        assert!(matches!(
            options.config_server_address(),
            Err(EnclaveError::FailedPrecondition(_))
        ));
        assert!(matches!(
            options.config_server_connection_timeout(),
            Err(EnclaveError::FailedPrecondition(_))
        ));
    }

    #[test]
    fn test_from_lookup_prefers_config_server() {
        let env: HashMap<&str, &str> = [
            ("ENCLAVE_CONFIG_SERVER_ADDRESS", "10.0.0.1:80"),
            ("ENCLAVE_CONFIG_SERVER_TIMEOUT_MS", "250"),
            ("ENCLAVE_HOST_LOCAL_NAME", "ignored"),
        ]
        .into_iter()
        .collect();
        let options = ManagerOptions::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(options.config_server_address().unwrap(), "10.0.0.1:80");
        assert_eq!(
            options.config_server_connection_timeout().unwrap(),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_from_lookup_host_config() {
        let options = ManagerOptions::from_lookup(|k| {
            (k == "ENCLAVE_HOST_LOCAL_NAME").then(|| "host-a".to_string())
        });
        assert_eq!(
            options.host_config().unwrap().local_name.as_deref(),
            Some("host-a")
        );
    }
}
