/*!
 * Enclave Manager Builder
 * Builder pattern for EnclaveManager construction
 */

use super::manager::EnclaveManager;
use super::shared::{SharedName, SharedResourceManager, CLOCK_MONOTONIC, CLOCK_REALTIME};
use super::tables::ClientTables;
use crate::clock::{ClockService, CLOCK_PERIOD};
use crate::config::{HostConfig, ManagerOptions};
use crate::core::{EnclaveError, EnclaveResult};
use crate::primitives::NativeDriver;
use crate::signals::SignalDispatcher;
use log::{error, info};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Builder for EnclaveManager
pub struct EnclaveManagerBuilder {
    options: ManagerOptions,
    driver: Option<Arc<dyn NativeDriver>>,
    dispatcher: Option<Arc<SignalDispatcher>>,
    clock_period: Duration,
}

impl EnclaveManagerBuilder {
    pub fn new() -> Self {
        Self {
            options: ManagerOptions::default(),
            driver: None,
            dispatcher: None,
            clock_period: CLOCK_PERIOD,
        }
    }

    pub fn with_options(mut self, options: ManagerOptions) -> Self {
        self.options = options;
        self
    }

    /// Native driver used by the file and embedded backends
    pub fn with_driver(mut self, driver: Arc<dyn NativeDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Use a private dispatcher instead of the process-wide one
    pub fn with_dispatcher(mut self, dispatcher: Arc<SignalDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn with_clock_period(mut self, period: Duration) -> Self {
        self.clock_period = period;
        self
    }

    /// Build the EnclaveManager and start its clock
    pub fn build(self) -> EnclaveResult<EnclaveManager> {
        let host_config = resolve_host_config(&self.options);

        let clock = ClockService::start_with_period(self.clock_period).map_err(|e| {
            EnclaveError::ResourceExhausted(format!("Failed to start clock service: {}", e))
        })?;

        let shared_resources = SharedResourceManager::new();
        shared_resources.register_unmanaged(
            SharedName::address(CLOCK_MONOTONIC),
            clock.state().monotonic_cell(),
        )?;
        shared_resources.register_unmanaged(
            SharedName::address(CLOCK_REALTIME),
            clock.state().realtime_cell(),
        )?;

        let mut features = vec!["clock"];
        if self.driver.is_some() {
            features.push("native-driver");
        }
        if self.dispatcher.is_some() {
            features.push("private-dispatcher");
        }
        if !self.options.holds_host_config() {
            features.push("config-server");
        }
        info!("Enclave manager initialized with: {}", features.join(", "));

        Ok(EnclaveManager {
            options: self.options,
            host_config,
            tables: RwLock::new(ClientTables::default()),
            shared_resources,
            dispatcher: self.dispatcher.unwrap_or_else(SignalDispatcher::global),
            driver: self.driver,
            clock,
        })
    }
}

impl Default for EnclaveManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Host configuration the manager hands to enclaves
///
/// Fetching it from a config server is not supported; that variant falls
/// back to an empty configuration.
fn resolve_host_config(options: &ManagerOptions) -> HostConfig {
    match options.host_config() {
        Ok(host_config) => host_config.clone(),
        Err(_) => {
            error!(
                "Host config retrieval from {} is not implemented, using defaults",
                options.config_server_address().unwrap_or("<unknown>")
            );
            HostConfig::default()
        }
    }
}
