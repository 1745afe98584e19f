/*!
 * Enclave Manager
 *
 * Owns the name to client registry and drives every enclave through
 * load, initialize, finalize and destroy. Also keeps the bookkeeping a
 * forked child needs to re-create its parent's regions at the same
 * addresses.
 */

use super::builder::EnclaveManagerBuilder;
use super::shared::SharedResourceManager;
use super::tables::ClientTables;
use crate::client::{load_from_config, EnclaveClient, EnclaveLoader};
use crate::clock::ClockService;
use crate::config::{
    EnclaveConfig, EnclaveFinal, EnclaveLoadConfig, ForkConfig, HostConfig, ManagerOptions,
};
use crate::core::{Address, EnclaveError, EnclaveResult, Size};
use crate::monitoring::LifecycleSpan;
use crate::primitives::NativeDriver;
use crate::signals::SignalDispatcher;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Orchestrates the lifecycle of every enclave in the process
pub struct EnclaveManager {
    pub(super) options: ManagerOptions,
    pub(super) host_config: HostConfig,
    pub(super) tables: RwLock<ClientTables>,
    pub(super) shared_resources: SharedResourceManager,
    pub(super) dispatcher: Arc<SignalDispatcher>,
    pub(super) driver: Option<Arc<dyn NativeDriver>>,
    pub(super) clock: ClockService,
}

impl EnclaveManager {
    pub fn builder() -> EnclaveManagerBuilder {
        EnclaveManagerBuilder::new()
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    pub fn host_config(&self) -> &HostConfig {
        &self.host_config
    }

    pub fn shared_resources(&self) -> &SharedResourceManager {
        &self.shared_resources
    }

    pub fn dispatcher(&self) -> &Arc<SignalDispatcher> {
        &self.dispatcher
    }

    pub fn clock(&self) -> &ClockService {
        &self.clock
    }

    /// Load `name` with a configuration derived from the host configuration
    pub fn load_enclave(
        &self,
        name: &str,
        loader: &dyn EnclaveLoader,
    ) -> EnclaveResult<Arc<dyn EnclaveClient>> {
        self.load_enclave_with_config(name, loader, None, 0, 0)
    }

    /// Load `name` from `loader`
    ///
    /// A nonzero `base_address` with a nonzero `enclave_size` pins the region
    /// to that placement. Loaders without a backend record create the client
    /// themselves.
    pub fn load_enclave_with_config(
        &self,
        name: &str,
        loader: &dyn EnclaveLoader,
        config: Option<EnclaveConfig>,
        base_address: Address,
        enclave_size: Size,
    ) -> EnclaveResult<Arc<dyn EnclaveClient>> {
        let mut load_config = loader.load_config();
        load_config.name = name.to_string();
        if let Some(config) = config {
            load_config.config = Some(config);
        }

        if load_config.backend.is_none() {
            return self.load_with_loader(name, loader, load_config.config, base_address, enclave_size);
        }

        if base_address != 0 && enclave_size > 0 {
            if let Some(native) = load_config.native_config_mut() {
                native.fork_config = Some(ForkConfig {
                    base_address,
                    enclave_size,
                });
            }
        }
        self.load_enclave_from_config(load_config)
    }

    /// Load an enclave from a complete load configuration
    pub fn load_enclave_from_config(
        &self,
        load_config: EnclaveLoadConfig,
    ) -> EnclaveResult<Arc<dyn EnclaveClient>> {
        let name = load_config.name.clone();
        let span = LifecycleSpan::new("load", &name);
        let _entered = span.enter();
        let result = self.load_resolved(&name, load_config);
        span.record_result(&result);
        result
    }

    fn load_resolved(
        &self,
        name: &str,
        mut load_config: EnclaveLoadConfig,
    ) -> EnclaveResult<Arc<dyn EnclaveClient>> {
        let config = self.resolve_config(load_config.config.take());
        load_config.config = Some(config.clone());

        let forked_child = config.enable_fork
            && load_config
                .fork_config()
                .map(|fork| fork.base_address != 0)
                .unwrap_or(false);

        if forked_child {
            // The inherited entry refers to the parent's region
            if self.remove_enclave_reference(name).is_some() {
                debug!(enclave = name, "Dropped inherited enclave reference");
            }
        } else {
            self.ensure_name_available(name)?;
        }

        let client = load_from_config(&load_config, &config, self.driver.as_ref())?;
        let persisted = config.enable_fork.then_some(load_config);
        self.register_and_initialize(name, client, &config, persisted)
    }

    /// Tear down `client`: Finalize, Destroy, signal deregistration, removal
    ///
    /// Only the Finalize outcome is returned; later failures are logged.
    pub fn destroy_enclave(
        &self,
        client: Option<&Arc<dyn EnclaveClient>>,
        final_input: &EnclaveFinal,
        skip_finalize: bool,
    ) -> EnclaveResult<()> {
        let Some(client) = client else {
            return Ok(());
        };
        let span = LifecycleSpan::new("destroy", client.name());
        let _entered = span.enter();

        let finalize_status = if skip_finalize {
            Ok(())
        } else {
            client.enter_and_finalize(final_input)
        };
        if let Err(e) = &finalize_status {
            warn!(enclave = client.name(), error = %e, "Finalize failed");
        }

        if let Err(e) = client.destroy_enclave() {
            error!(enclave = client.name(), error = %e, "Failed to destroy enclave");
        }

        if let Err(e) = self.dispatcher.deregister_all_signals_for_client(client.as_ref()) {
            error!(enclave = client.name(), error = %e, "Failed to deregister signals");
        }

        self.tables.write().remove_client(client.id());
        info!(enclave = client.name(), "Enclave destroyed");

        span.record_result(&finalize_status);
        finalize_status
    }

    pub fn get_client(&self, name: &str) -> Option<Arc<dyn EnclaveClient>> {
        self.tables.read().client(name)
    }

    pub fn get_name(&self, client: &dyn EnclaveClient) -> Option<String> {
        self.tables.read().name(client.id())
    }

    /// Persisted load configuration, empty if the client was not fork-enabled
    pub fn get_load_config_from_client(&self, client: &dyn EnclaveClient) -> EnclaveLoadConfig {
        self.tables
            .read()
            .load_config(client.id())
            .unwrap_or_default()
    }

    /// Forget `name` without destroying its region
    pub fn remove_enclave_reference(&self, name: &str) -> Option<Arc<dyn EnclaveClient>> {
        self.tables.write().remove_name(name)
    }

    /// Re-create `name` in a forked child at the parent's placement
    pub fn reload_in_child(&self, name: &str) -> EnclaveResult<Arc<dyn EnclaveClient>> {
        let parent = self
            .get_client(name)
            .ok_or_else(|| EnclaveError::NotFound(format!("No enclave named {}", name)))?;

        let mut load_config = self.get_load_config_from_client(parent.as_ref());
        let enable_fork = load_config
            .config
            .as_ref()
            .map(|config| config.enable_fork)
            .unwrap_or(false);
        if !enable_fork {
            return Err(EnclaveError::FailedPrecondition(format!(
                "Enclave {} was not loaded with fork enabled",
                name
            )));
        }

        let base_address = parent.base_address();
        let enclave_size = parent.enclave_size();
        if base_address == 0 || enclave_size == 0 {
            return Err(EnclaveError::FailedPrecondition(format!(
                "Enclave {} has no fixed placement to reload at",
                name
            )));
        }

        let native = load_config.native_config_mut().ok_or_else(|| {
            EnclaveError::FailedPrecondition(format!("Enclave {} has no native backend", name))
        })?;
        native.fork_config = Some(ForkConfig {
            base_address,
            enclave_size,
        });
        load_config.name = name.to_string();

        info!(enclave = name, base_address, enclave_size, "Reloading enclave in child");
        self.load_enclave_from_config(load_config)
    }

    /// Number of registered enclaves
    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.tables.read().names()
    }

    fn load_with_loader(
        &self,
        name: &str,
        loader: &dyn EnclaveLoader,
        config: Option<EnclaveConfig>,
        base_address: Address,
        enclave_size: Size,
    ) -> EnclaveResult<Arc<dyn EnclaveClient>> {
        self.ensure_name_available(name)?;
        let config = self.resolve_config(config);
        let client = loader.load_enclave(name, base_address, enclave_size, &config)?;
        self.register_and_initialize(name, client, &config, None)
    }

    fn resolve_config(&self, config: Option<EnclaveConfig>) -> EnclaveConfig {
        let mut config = config.unwrap_or_default();
        config.apply_defaults(&self.host_config);
        config
    }

    fn ensure_name_available(&self, name: &str) -> EnclaveResult<()> {
        if self.tables.read().contains_name(name) {
            return Err(EnclaveError::AlreadyExists(format!(
                "Name already exists: {}",
                name
            )));
        }
        Ok(())
    }

    fn register_and_initialize(
        &self,
        name: &str,
        client: Arc<dyn EnclaveClient>,
        config: &EnclaveConfig,
        persisted: Option<EnclaveLoadConfig>,
    ) -> EnclaveResult<Arc<dyn EnclaveClient>> {
        let inserted = self
            .tables
            .write()
            .insert(name, Arc::clone(&client), persisted);
        if !inserted {
            // Lost a race with a concurrent load of the same name
            if let Err(e) = client.destroy_enclave() {
                error!(enclave = name, error = %e, "Failed to destroy duplicate enclave");
            }
            return Err(EnclaveError::AlreadyExists(format!(
                "Name already exists: {}",
                name
            )));
        }

        if let Err(e) = client.enter_and_initialize(config) {
            error!(enclave = name, error = %e, "Failed to initialize enclave");
            if let Err(destroy_error) = client.destroy_enclave() {
                error!(enclave = name, error = %destroy_error, "Failed to destroy enclave");
            }
            self.tables.write().remove_client(client.id());
            return Err(e);
        }

        info!(enclave = name, id = %client.id(), "Enclave loaded");
        Ok(client)
    }
}
