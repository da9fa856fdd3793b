//! Port bindings, mappings and interface state

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Highest usable 802.1Q VLAN id
pub const MAX_SEGMENTATION_ID: u16 = 4094;

/// Check an 802.1Q VLAN id
pub fn validate_segmentation_id(segmentation_id: u32) -> Result<u16, ModelError> {
    match u16::try_from(segmentation_id) {
        Ok(id) if (1..=MAX_SEGMENTATION_ID).contains(&id) => Ok(id),
        _ => Err(ModelError::InvalidSegmentationId(segmentation_id)),
    }
}

/// One entry of a bare-metal port's local link information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchPort {
    /// Interface name on the switch (e.g. "Ten-GigabitEthernet1/0/10")
    pub port_id: String,

    /// Chassis MAC of the switch
    pub switch_id: String,

    /// Free-form switch hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch_info: Option<String>,

    /// Interface index, once resolved against the switch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifindex: Option<u32>,
}

/// How the port carries the VLAN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    /// Untagged member of one VLAN
    #[default]
    Access,
    /// Tagged member
    Trunk,
}

/// Outcome of the last bind attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindStatus {
    /// Port isolated on the switch
    #[default]
    Success,
    /// Device or store failure
    Failure,
}

impl BindStatus {
    /// Numeric form: 0 on success, non-zero on failure
    pub fn code(self) -> u8 {
        match self {
            BindStatus::Success => 0,
            BindStatus::Failure => 1,
        }
    }
}

/// Bare-metal port to physical switch port mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    /// Virtual network port id (primary key)
    pub neutron_port_id: String,
    /// Interface name on the switch
    pub switch_port_name: String,
    /// Switch record id
    pub switch_id: Uuid,
    /// Interface index on the switch
    pub ifindex: u32,
}

/// Network binding state of a bare-metal port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPort {
    /// Virtual network port id (primary key)
    pub neutron_port_id: String,
    /// Link aggregation group, when bonded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lag_id: Option<String>,
    /// Access or trunk
    #[serde(default)]
    pub access_type: AccessType,
    /// VLAN id
    pub segmentation_id: u16,
    /// Outcome of the bind
    #[serde(default)]
    pub bind_status: BindStatus,
}

/// ifOperStatus of an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PortStatus {
    /// up(1)
    Up,
    /// down(2)
    Down,
    /// testing(3)
    Testing,
    /// unknown(4), also used for values outside the MIB
    Unknown,
    /// dormant(5)
    Dormant,
    /// notPresent(6)
    NotPresent,
    /// lowerLayerDown(7)
    LowerLayerDown,
}

impl PortStatus {
    /// Map an IF-MIB ifOperStatus value
    pub fn from_oper_status(value: i64) -> Self {
        match value {
            1 => PortStatus::Up,
            2 => PortStatus::Down,
            3 => PortStatus::Testing,
            5 => PortStatus::Dormant,
            6 => PortStatus::NotPresent,
            7 => PortStatus::LowerLayerDown,
            _ => PortStatus::Unknown,
        }
    }
}

/// A physical interface as reported by the switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// ifIndex
    pub ifindex: u32,
    /// ifDescr
    pub interface_name: String,
    /// ifOperStatus
    pub port_status: PortStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segmentation_ids_are_802_1q_vlans() {
        assert_eq!(validate_segmentation_id(1).unwrap(), 1);
        assert_eq!(validate_segmentation_id(4094).unwrap(), 4094);
        assert!(validate_segmentation_id(0).is_err());
        assert!(validate_segmentation_id(4095).is_err());
        assert!(validate_segmentation_id(70_000).is_err());
    }

    #[test]
    fn test_oper_status_maps_to_names() {
        assert_eq!(PortStatus::from_oper_status(1), PortStatus::Up);
        assert_eq!(PortStatus::from_oper_status(7), PortStatus::LowerLayerDown);
        assert_eq!(PortStatus::from_oper_status(42), PortStatus::Unknown);
        assert_eq!(serde_json::to_string(&PortStatus::NotPresent).unwrap(), "\"NOTPRESENT\"");
    }

    #[test]
    fn test_bind_status_codes() {
        assert_eq!(BindStatus::Success.code(), 0);
        assert_ne!(BindStatus::Failure.code(), 0);
    }
}
