/*!
 * Client Tables
 * Name and client indexes kept consistent under one lock
 */

use crate::client::EnclaveClient;
use crate::config::EnclaveLoadConfig;
use crate::core::ClientId;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry maps; the name table owns the clients
#[derive(Default)]
pub(crate) struct ClientTables {
    client_by_name: HashMap<String, Arc<dyn EnclaveClient>>,
    name_by_client: HashMap<ClientId, String>,
    load_config_by_client: HashMap<ClientId, EnclaveLoadConfig>,
}

impl ClientTables {
    pub fn contains_name(&self, name: &str) -> bool {
        self.client_by_name.contains_key(name)
    }

    pub fn client(&self, name: &str) -> Option<Arc<dyn EnclaveClient>> {
        self.client_by_name.get(name).cloned()
    }

    pub fn name(&self, client: ClientId) -> Option<String> {
        self.name_by_client.get(&client).cloned()
    }

    pub fn load_config(&self, client: ClientId) -> Option<EnclaveLoadConfig> {
        self.load_config_by_client.get(&client).cloned()
    }

    pub fn len(&self) -> usize {
        self.client_by_name.len()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.client_by_name.keys().cloned().collect();
        names.sort();
        names
    }

    /// Insert `client` under `name`; false if the name is taken
    pub fn insert(
        &mut self,
        name: &str,
        client: Arc<dyn EnclaveClient>,
        load_config: Option<EnclaveLoadConfig>,
    ) -> bool {
        if self.client_by_name.contains_key(name) {
            return false;
        }
        let id = client.id();
        self.client_by_name.insert(name.to_string(), client);
        self.name_by_client.insert(id, name.to_string());
        if let Some(load_config) = load_config {
            self.load_config_by_client.insert(id, load_config);
        }
        true
    }

    /// Drop every entry for `client`
    pub fn remove_client(&mut self, client: ClientId) -> Option<Arc<dyn EnclaveClient>> {
        self.load_config_by_client.remove(&client);
        let name = self.name_by_client.remove(&client)?;
        self.client_by_name.remove(&name)
    }

    /// Drop every entry for the client registered under `name`
    pub fn remove_name(&mut self, name: &str) -> Option<Arc<dyn EnclaveClient>> {
        let client = self.client_by_name.remove(name)?;
        self.name_by_client.remove(&client.id());
        self.load_config_by_client.remove(&client.id());
        Some(client)
    }
}
