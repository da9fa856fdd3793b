//! In-memory inventory
//!
//! Cheap to clone; clones share the same records.

use super::{CredentialStore, PortMappingStore, SwitchStore};
use crate::error::StoreError;
use bnp_types::{Credential, ManagementProtocol, NetworkPort, PortMapping, Switch, same_mac};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Records {
    switches: HashMap<Uuid, Switch>,
    credentials: HashMap<Uuid, Credential>,
    mappings: HashMap<String, PortMapping>,
    network_ports: HashMap<String, NetworkPort>,
}

impl Records {
    fn check_switch_unique(&self, switch: &Switch) -> Result<(), StoreError> {
        for other in self.switches.values().filter(|other| other.id != switch.id) {
            if same_mac(&other.mac_address, &switch.mac_address) {
                return Err(StoreError::Conflict(format!("mac_address {}", switch.mac_address)));
            }
            if other.ip_address == switch.ip_address {
                return Err(StoreError::Conflict(format!("ip_address {}", switch.ip_address)));
            }
        }
        Ok(())
    }
}

/// Inventory kept in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventory {
    records: Arc<RwLock<Records>>,
}

impl InMemoryInventory {
    /// Empty inventory
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SwitchStore for InMemoryInventory {
    async fn get_switch(&self, id: Uuid) -> Result<Option<Switch>, StoreError> {
        Ok(self.records.read().await.switches.get(&id).cloned())
    }

    async fn get_switch_by_mac(&self, mac: &str) -> Result<Option<Switch>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .switches
            .values()
            .find(|switch| same_mac(&switch.mac_address, mac))
            .cloned())
    }

    async fn get_switch_by_ip(&self, ip: IpAddr) -> Result<Option<Switch>, StoreError> {
        let records = self.records.read().await;
        Ok(records.switches.values().find(|switch| switch.ip_address == ip).cloned())
    }

    async fn list_switches(&self) -> Result<Vec<Switch>, StoreError> {
        let records = self.records.read().await;
        let mut switches: Vec<Switch> = records.switches.values().cloned().collect();
        switches.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(switches)
    }

    async fn add_switch(&self, switch: Switch) -> Result<Switch, StoreError> {
        let mut records = self.records.write().await;
        if records.switches.contains_key(&switch.id) {
            return Err(StoreError::Conflict(format!("switch {}", switch.id)));
        }
        records.check_switch_unique(&switch)?;
        records.switches.insert(switch.id, switch.clone());
        Ok(switch)
    }

    async fn update_switch(&self, switch: Switch) -> Result<Switch, StoreError> {
        let mut records = self.records.write().await;
        if !records.switches.contains_key(&switch.id) {
            return Err(StoreError::NotFound(format!("switch {}", switch.id)));
        }
        records.check_switch_unique(&switch)?;
        records.switches.insert(switch.id, switch.clone());
        Ok(switch)
    }

    async fn update_validation_result(&self, id: Uuid, result: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let switch = records
            .switches
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("switch {id}")))?;
        switch.validation_result = Some(result.to_string());
        Ok(())
    }

    async fn delete_switch(&self, id: Uuid) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.switches.remove(&id).is_none() {
            return Err(StoreError::NotFound(format!("switch {id}")));
        }
        let orphaned: Vec<String> = records
            .mappings
            .values()
            .filter(|mapping| mapping.switch_id == id)
            .map(|mapping| mapping.neutron_port_id.clone())
            .collect();
        for port_id in orphaned {
            records.mappings.remove(&port_id);
            records.network_ports.remove(&port_id);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CredentialStore for InMemoryInventory {
    async fn get_credential_by_id(&self, id: Uuid) -> Result<Option<Credential>, StoreError> {
        Ok(self.records.read().await.credentials.get(&id).cloned())
    }

    async fn get_credential_by_name_and_protocol(
        &self,
        name: &str,
        protocol: ManagementProtocol,
    ) -> Result<Vec<Credential>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .credentials
            .values()
            .filter(|credential| credential.name == name && credential.protocol() == protocol)
            .cloned()
            .collect())
    }

    async fn list_credentials(&self) -> Result<Vec<Credential>, StoreError> {
        let records = self.records.read().await;
        let mut credentials: Vec<Credential> = records.credentials.values().cloned().collect();
        credentials.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(credentials)
    }

    async fn add_credential(&self, credential: Credential) -> Result<Credential, StoreError> {
        let mut records = self.records.write().await;
        if records.credentials.contains_key(&credential.id) {
            return Err(StoreError::Conflict(format!("credential {}", credential.id)));
        }
        records.credentials.insert(credential.id, credential.clone());
        Ok(credential)
    }

    async fn delete_credential(&self, id: Uuid) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .credentials
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("credential {id}")))
    }
}

#[async_trait::async_trait]
impl PortMappingStore for InMemoryInventory {
    async fn add_mapping(&self, mapping: PortMapping, network_port: NetworkPort) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let port_id = mapping.neutron_port_id.clone();
        if network_port.neutron_port_id != port_id {
            return Err(StoreError::Backend(format!(
                "network port {} does not belong to mapping {port_id}",
                network_port.neutron_port_id
            )));
        }
        if records.mappings.contains_key(&port_id) {
            return Err(StoreError::Conflict(format!("port mapping {port_id}")));
        }
        if !records.switches.contains_key(&mapping.switch_id) {
            return Err(StoreError::NotFound(format!("switch {}", mapping.switch_id)));
        }
        records.mappings.insert(port_id.clone(), mapping);
        records.network_ports.insert(port_id, network_port);
        Ok(())
    }

    async fn delete_mapping(&self, neutron_port_id: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let mapping = records.mappings.remove(neutron_port_id);
        let network_port = records.network_ports.remove(neutron_port_id);
        if mapping.is_none() && network_port.is_none() {
            return Err(StoreError::NotFound(format!("port mapping {neutron_port_id}")));
        }
        Ok(())
    }

    async fn get_mapping(&self, neutron_port_id: &str) -> Result<Option<PortMapping>, StoreError> {
        Ok(self.records.read().await.mappings.get(neutron_port_id).cloned())
    }

    async fn get_mappings_by_switch(&self, switch_id: Uuid) -> Result<Vec<PortMapping>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .mappings
            .values()
            .filter(|mapping| mapping.switch_id == switch_id)
            .cloned()
            .collect())
    }

    async fn get_network_port(&self, neutron_port_id: &str) -> Result<Option<NetworkPort>, StoreError> {
        Ok(self.records.read().await.network_ports.get(neutron_port_id).cloned())
    }

    async fn get_network_ports_by_segmentation_id(&self, segmentation_id: u16) -> Result<Vec<NetworkPort>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .network_ports
            .values()
            .filter(|port| port.segmentation_id == segmentation_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use bnp_types::{AccessType, BindStatus};

    fn mapping(port_id: &str, switch_id: Uuid) -> (PortMapping, NetworkPort) {
        (
            PortMapping {
                neutron_port_id: port_id.to_string(),
                switch_port_name: "Ten-GigabitEthernet1/0/10".to_string(),
                switch_id,
                ifindex: 10,
            },
            NetworkPort {
                neutron_port_id: port_id.to_string(),
                lag_id: None,
                access_type: AccessType::Access,
                segmentation_id: 100,
                bind_status: BindStatus::Success,
            },
        )
    }

    #[tokio::test]
    async fn test_switch_lookup_ignores_mac_spelling() {
        let store = InMemoryInventory::new();
        let switch = store
            .add_switch(test_switch("tor-1", "08:00:09:01:02:03", "192.0.2.10"))
            .await
            .unwrap();

        let found = store.get_switch_by_mac("08-00-09-01-02-03").await.unwrap().unwrap();
        assert_eq!(found.id, switch.id);
        assert!(store.get_switch_by_mac("08:00:09:01:02:04").await.unwrap().is_none());
        assert!(store.get_switch_by_ip("192.0.2.10".parse().unwrap()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_mac_or_ip_conflicts() {
        let store = InMemoryInventory::new();
        store
            .add_switch(test_switch("tor-1", "08:00:09:01:02:03", "192.0.2.10"))
            .await
            .unwrap();

        let same_mac = store
            .add_switch(test_switch("tor-2", "08:00:09:01:02:03", "192.0.2.11"))
            .await;
        assert!(matches!(same_mac, Err(StoreError::Conflict(_))));
        let same_ip = store
            .add_switch(test_switch("tor-2", "08:00:09:01:02:04", "192.0.2.10"))
            .await;
        assert!(matches!(same_ip, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_switch_cascades_mappings() {
        let store = InMemoryInventory::new();
        let switch = store
            .add_switch(test_switch("tor-1", "08:00:09:01:02:03", "192.0.2.10"))
            .await
            .unwrap();
        let (map, port) = mapping("port-1", switch.id);
        store.add_mapping(map, port).await.unwrap();
        assert_eq!(store.get_network_ports_by_segmentation_id(100).await.unwrap().len(), 1);

        store.delete_switch(switch.id).await.unwrap();
        assert!(store.get_mapping("port-1").await.unwrap().is_none());
        assert!(store.get_network_port("port-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mapping_requires_a_known_switch_and_unique_port() {
        let store = InMemoryInventory::new();
        let (map, port) = mapping("port-1", Uuid::new_v4());
        assert!(matches!(store.add_mapping(map, port).await, Err(StoreError::NotFound(_))));

        let switch = store
            .add_switch(test_switch("tor-1", "08:00:09:01:02:03", "192.0.2.10"))
            .await
            .unwrap();
        let (map, port) = mapping("port-1", switch.id);
        store.add_mapping(map.clone(), port.clone()).await.unwrap();
        assert!(matches!(store.add_mapping(map, port).await, Err(StoreError::Conflict(_))));
        assert_eq!(store.get_mappings_by_switch(switch.id).await.unwrap().len(), 1);

        store.delete_mapping("port-1").await.unwrap();
        assert!(matches!(store.delete_mapping("port-1").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_credentials_by_name_and_protocol() {
        let store = InMemoryInventory::new();
        let credential = store.add_credential(v2c_credential("tor-community")).await.unwrap();

        let found = store
            .get_credential_by_name_and_protocol("tor-community", ManagementProtocol::SnmpV2c)
            .await
            .unwrap();
        assert_eq!(found, vec![credential.clone()]);
        assert!(
            store
                .get_credential_by_name_and_protocol("tor-community", ManagementProtocol::SnmpV3)
                .await
                .unwrap()
                .is_empty()
        );

        store.delete_credential(credential.id).await.unwrap();
        assert!(store.get_credential_by_id(credential.id).await.unwrap().is_none());
    }
}
