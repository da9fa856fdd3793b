//! Physical switch records

use crate::credential::ManagementProtocol;
use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use uuid::Uuid;

/// Validation result recorded when the switch answered with the expected MAC
pub const VALIDATION_SUCCESS: &str = "Success";

/// Validation result recorded when no driver serves the switch
pub const NO_DRIVER_FOUND: &str = "No Provisioning driver found for given Vendor/Family/Protocol";

/// Validation result recorded when the device could not be queried
pub const DEVICE_NOT_REACHABLE: &str = "Either device is not reachable or invalid credentials";

/// Validation result recorded when the switch's credential reference does not resolve
pub const CREDENTIALS_NOT_FOUND: &str = "Credentials not found or ambiguous for given Protocol";

/// Validation result for a switch whose reported MAC differs from the record
pub fn invalid_mac_result(actual: &str) -> String {
    format!("Invalid MAC Actual Switch MAC is {actual}")
}

/// Whether ports on a switch may be provisioned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PortProvisioning {
    /// Bind/unbind requests are served
    #[default]
    Enabled,
    /// Bind/unbind requests are refused
    Disabled,
}

impl PortProvisioning {
    /// `ENABLED` or `DISABLED`
    pub fn as_str(self) -> &'static str {
        match self {
            PortProvisioning::Enabled => "ENABLED",
            PortProvisioning::Disabled => "DISABLED",
        }
    }
}

impl FromStr for PortProvisioning {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ENABLED" => Ok(PortProvisioning::Enabled),
            "DISABLED" => Ok(PortProvisioning::Disabled),
            _ => Err(ModelError::InvalidProvisioningState(s.to_string())),
        }
    }
}

impl fmt::Display for PortProvisioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for PortProvisioning {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PortProvisioning> for String {
    fn from(value: PortProvisioning) -> Self {
        value.as_str().to_string()
    }
}

/// A top-of-rack switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Switch {
    /// Unique id
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Vendor, first component of the driver key (e.g. "hpe")
    pub vendor: String,

    /// Optional product family, last component of the driver key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    /// Management address
    pub ip_address: IpAddr,

    /// Chassis MAC (unique)
    pub mac_address: String,

    /// Protocol spoken to the switch
    pub management_protocol: ManagementProtocol,

    /// Credential reference: a credential id or name
    pub credentials: String,

    /// Whether ports may be provisioned
    #[serde(default)]
    pub port_provisioning: PortProvisioning,

    /// Outcome of the last protocol validation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_result: Option<String>,
}

impl Switch {
    /// True when bind/unbind requests may touch this switch
    pub fn is_provisioning_enabled(&self) -> bool {
        self.port_provisioning == PortProvisioning::Enabled
    }
}

/// Requested changes to a switch; `None` leaves a field as is
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchUpdate {
    /// New display name
    #[serde(default)]
    pub name: Option<String>,
    /// New vendor
    #[serde(default)]
    pub vendor: Option<String>,
    /// New family
    #[serde(default)]
    pub family: Option<String>,
    /// New management address
    #[serde(default)]
    pub ip_address: Option<IpAddr>,
    /// New chassis MAC; triggers validation
    #[serde(default)]
    pub mac_address: Option<String>,
    /// New management protocol
    #[serde(default)]
    pub management_protocol: Option<ManagementProtocol>,
    /// New credential reference
    #[serde(default)]
    pub credentials: Option<String>,
    /// New provisioning flag
    #[serde(default)]
    pub port_provisioning: Option<PortProvisioning>,
    /// Re-run protocol validation even if the MAC is unchanged
    #[serde(default)]
    pub validate: bool,
}
