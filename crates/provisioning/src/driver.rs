//! Port-provisioning driver interface
//!
//! A driver speaks one management protocol to one vendor (optionally one
//! product family) and is selected by the key returned from
//! [`PortProvisioningDriver::get_driver_name`].

use crate::error::DriverError;
use bnp_types::{AccessType, DeviceCredentials, PortInfo, SwitchPort};

/// A bare-metal port to isolate on (or retract from) a VLAN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    /// Virtual network port id
    pub neutron_port_id: String,
    /// VLAN id
    pub segmentation_id: u16,
    /// Access or trunk
    pub access_type: AccessType,
    /// Link aggregation group, when bonded
    pub lag_id: Option<String>,
    /// Physical ports; the first entry is provisioned
    pub switchports: Vec<SwitchPort>,
    /// How to reach the switch
    pub credentials: DeviceCredentials,
}

impl PortBinding {
    /// Interface index of the provisioned switch port
    pub fn ifindex(&self) -> Result<u32, DriverError> {
        let switchport = self.switchports.first().ok_or_else(|| {
            DriverError::InvalidPort(format!("port {} has no switch ports", self.neutron_port_id))
        })?;
        switchport.ifindex.ok_or_else(|| {
            DriverError::InvalidPort(format!(
                "switch port {} of port {} has no ifindex",
                switchport.port_id, self.neutron_port_id
            ))
        })
    }
}

/// Capabilities every provisioning driver offers
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait PortProvisioningDriver: Send + Sync + std::fmt::Debug {
    /// Make the port a member of its VLAN, creating the VLAN if needed
    async fn set_isolation(&self, port: &PortBinding) -> Result<(), DriverError>;

    /// Remove the port from its VLAN; the VLAN itself stays
    async fn delete_isolation(&self, port: &PortBinding) -> Result<(), DriverError>;

    /// Bond the ports into a link aggregation group
    async fn create_lag(&self, port: &PortBinding) -> Result<(), DriverError>;

    /// Dissolve the link aggregation group
    async fn delete_lag(&self, port: &PortBinding) -> Result<(), DriverError>;

    /// Registry key: `<vendor>_<protocol>[_<family>]`
    fn get_driver_name(&self) -> String;

    /// Chassis MAC reported by the switch, used to validate credentials
    async fn get_protocol_validation_result(&self, credentials: &DeviceCredentials) -> Result<String, DriverError>;

    /// Physical interfaces of the switch
    async fn get_device_info(&self, credentials: &DeviceCredentials) -> Result<Vec<PortInfo>, DriverError>;
}

/// Registry key for a vendor, protocol and optional family
pub fn driver_key(vendor: &str, protocol: &str, family: Option<&str>) -> String {
    match family.filter(|f| !f.is_empty()) {
        Some(family) => format!("{vendor}_{protocol}_{family}"),
        None => format!("{vendor}_{protocol}"),
    }
}
