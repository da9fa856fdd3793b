//! Provisioning
//!
//! VLAN isolation of bare-metal ports on top-of-rack switches.
//!
//! - [`driver::PortProvisioningDriver`]: what a protocol driver can do
//! - [`snmp_driver::SnmpProvisioningDriver`]: Q-BRIDGE-MIB over SNMP v1/v2c/v3
//! - [`manager::ProvisioningManager`]: drivers by `<vendor>_<protocol>[_<family>]`
//! - [`orchestrator::ProvisioningOrchestrator`]: bind/unbind of bare-metal ports
//! - [`switch_service::SwitchService`]: switch lifecycle and protocol validation
//! - [`store`]: inventory traits and an in-memory implementation

pub mod access;
pub mod bitmap;
pub mod config;
pub mod driver;
pub mod error;
pub mod inventory;
pub mod manager;
pub mod orchestrator;
pub mod snmp_driver;
pub mod store;
pub mod switch_service;

#[cfg(test)]
mod bitmap_test;
#[cfg(test)]
mod test_utils;

pub use bitmap::EgressPortList;
pub use config::ProvisioningConfig;
pub use driver::{PortBinding, PortProvisioningDriver};
pub use error::{ConfigError, DriverError, ProvisioningError, StoreError};
pub use inventory::Inventory;
pub use manager::ProvisioningManager;
pub use orchestrator::{PortBindRequest, ProvisioningOrchestrator};
pub use snmp_driver::SnmpProvisioningDriver;
pub use store::{InMemoryInventory, InventoryStore};
pub use switch_service::SwitchService;
