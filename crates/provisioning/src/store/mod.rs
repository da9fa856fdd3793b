//! Inventory store interfaces
//!
//! Switches, credentials and port mappings live in a persistent store owned by
//! the surrounding control plane. The provisioning engine only talks to it
//! through these traits; [`memory::InMemoryInventory`] backs the binary and
//! the tests.

pub mod memory;

use crate::error::StoreError;
use bnp_types::{Credential, ManagementProtocol, NetworkPort, PortMapping, Switch};
use std::net::IpAddr;
use uuid::Uuid;

pub use memory::InMemoryInventory;

/// Switch records
#[async_trait::async_trait]
pub trait SwitchStore: Send + Sync {
    /// Switch by id
    async fn get_switch(&self, id: Uuid) -> Result<Option<Switch>, StoreError>;

    /// Switch by chassis MAC, in any spelling
    async fn get_switch_by_mac(&self, mac: &str) -> Result<Option<Switch>, StoreError>;

    /// Switch by management address
    async fn get_switch_by_ip(&self, ip: IpAddr) -> Result<Option<Switch>, StoreError>;

    /// Every switch
    async fn list_switches(&self) -> Result<Vec<Switch>, StoreError>;

    /// Insert a switch; id, MAC and address must be unused
    async fn add_switch(&self, switch: Switch) -> Result<Switch, StoreError>;

    /// Replace a switch record
    async fn update_switch(&self, switch: Switch) -> Result<Switch, StoreError>;

    /// Record the outcome of protocol validation
    async fn update_validation_result(&self, id: Uuid, result: &str) -> Result<(), StoreError>;

    /// Delete a switch and every port mapping that references it
    async fn delete_switch(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Credential records
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Credential by id
    async fn get_credential_by_id(&self, id: Uuid) -> Result<Option<Credential>, StoreError>;

    /// Credentials with `name` for `protocol`
    async fn get_credential_by_name_and_protocol(
        &self,
        name: &str,
        protocol: ManagementProtocol,
    ) -> Result<Vec<Credential>, StoreError>;

    /// Every credential
    async fn list_credentials(&self) -> Result<Vec<Credential>, StoreError>;

    /// Insert a credential
    async fn add_credential(&self, credential: Credential) -> Result<Credential, StoreError>;

    /// Delete a credential
    async fn delete_credential(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Port mappings and network port records
#[async_trait::async_trait]
pub trait PortMappingStore: Send + Sync {
    /// Insert a mapping together with its network port record
    async fn add_mapping(&self, mapping: PortMapping, network_port: NetworkPort) -> Result<(), StoreError>;

    /// Delete the mapping and network port of a virtual port
    async fn delete_mapping(&self, neutron_port_id: &str) -> Result<(), StoreError>;

    /// Mapping of a virtual port
    async fn get_mapping(&self, neutron_port_id: &str) -> Result<Option<PortMapping>, StoreError>;

    /// Mappings onto one switch
    async fn get_mappings_by_switch(&self, switch_id: Uuid) -> Result<Vec<PortMapping>, StoreError>;

    /// Network port record of a virtual port
    async fn get_network_port(&self, neutron_port_id: &str) -> Result<Option<NetworkPort>, StoreError>;

    /// Network ports on one VLAN
    async fn get_network_ports_by_segmentation_id(&self, segmentation_id: u16) -> Result<Vec<NetworkPort>, StoreError>;
}

/// Everything the orchestrator and switch service need
pub trait InventoryStore: SwitchStore + CredentialStore + PortMappingStore {}

impl<T> InventoryStore for T where T: SwitchStore + CredentialStore + PortMappingStore {}
