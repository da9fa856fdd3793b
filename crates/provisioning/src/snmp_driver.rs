//! SNMP provisioning driver
//!
//! Isolates ports through the Q-BRIDGE-MIB static VLAN table: the row status
//! column creates the VLAN, the egress-ports column carries the membership
//! bitmap. Interfaces come from the IF-MIB and the chassis MAC from LLDP-MIB.

use crate::bitmap::EgressPortList;
use crate::driver::{PortBinding, PortProvisioningDriver, driver_key};
use crate::error::DriverError;
use bnp_types::{AccessParameters, DeviceCredentials, PortInfo, PortStatus, format_mac, normalize_mac};
use snmp_client::{Lookup, Oid, SnmpClientTrait, SnmpConnector, SnmpSecurity, SnmpTarget, UsmUser, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// dot1qVlanStaticRowStatus
pub const OID_VLAN_CREATE: &[u32] = &[1, 3, 6, 1, 2, 1, 17, 7, 1, 4, 3, 1, 5];
/// dot1qVlanStaticEgressPorts
pub const OID_VLAN_EGRESS_PORT: &[u32] = &[1, 3, 6, 1, 2, 1, 17, 7, 1, 4, 3, 1, 2];
/// ifIndex
pub const OID_IF_INDEX: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 1];
/// ifDescr
pub const OID_IF_DESCR: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 2];
/// ifType
pub const OID_IF_TYPE: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 3];
/// ifOperStatus
pub const OID_IF_OPER_STATUS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 8];
/// lldpLocChassisId.0
pub const OID_CHASSIS_MAC: &[u32] = &[1, 0, 8802, 1, 1, 2, 1, 3, 2, 0];

/// RowStatus createAndGo
pub const ROW_CREATE_AND_GO: i64 = 4;
/// ifType ethernetCsmacd, the only interfaces reported as physical ports
pub const IF_TYPE_ETHERNET: i64 = 6;

/// Protocol component of SNMP driver keys
pub const PROTOCOL_SNMP: &str = "snmp";

fn oid(arcs: &[u32]) -> Result<Oid, DriverError> {
    Oid::new(arcs.to_vec()).map_err(|e| DriverError::device("oid", e))
}

/// Convert resolved access parameters into an SNMP target
pub fn snmp_target(credentials: &DeviceCredentials) -> Result<SnmpTarget, DriverError> {
    let security = match &credentials.access {
        AccessParameters::SnmpV1 { write_community } => SnmpSecurity::V1 {
            community: write_community.clone(),
        },
        AccessParameters::SnmpV2c { write_community } => SnmpSecurity::V2c {
            community: write_community.clone(),
        },
        AccessParameters::SnmpV3 {
            security_name,
            auth_protocol,
            auth_key,
            priv_protocol,
            priv_key,
        } => SnmpSecurity::V3(UsmUser {
            security_name: security_name.clone(),
            auth: auth_protocol
                .as_ref()
                .zip(auth_key.as_ref())
                .map(|(p, k)| (auth_protocol_of(*p), k.clone())),
            privacy: priv_protocol
                .as_ref()
                .zip(priv_key.as_ref())
                .map(|(p, k)| (priv_protocol_of(*p), k.clone())),
        }),
        other => {
            return Err(DriverError::UnsupportedCredentials(format!(
                "SNMP driver cannot use {} credentials",
                other.protocol()
            )));
        }
    };
    Ok(SnmpTarget::new(credentials.ip_address, security))
}

fn auth_protocol_of(protocol: bnp_types::AuthProtocol) -> snmp_client::AuthProtocol {
    match protocol {
        bnp_types::AuthProtocol::Md5 => snmp_client::AuthProtocol::Md5,
        bnp_types::AuthProtocol::Sha => snmp_client::AuthProtocol::Sha1,
    }
}

fn priv_protocol_of(protocol: bnp_types::PrivProtocol) -> snmp_client::PrivProtocol {
    match protocol {
        bnp_types::PrivProtocol::Des => snmp_client::PrivProtocol::Des,
        bnp_types::PrivProtocol::TripleDes => snmp_client::PrivProtocol::TripleDes,
        bnp_types::PrivProtocol::Aes128 => snmp_client::PrivProtocol::Aes128,
        bnp_types::PrivProtocol::Aes192 => snmp_client::PrivProtocol::Aes192,
        bnp_types::PrivProtocol::Aes256 => snmp_client::PrivProtocol::Aes256,
    }
}

const MAC_MAX: u64 = 0xffff_ffff_ffff;

/// Chassis MAC from the lldpLocChassisId value
///
/// Most switches return the six raw octets; some return the MAC as text or
/// as a plain integer.
pub fn chassis_mac(value: &Value) -> Option<String> {
    if let Value::Counter64(raw) = value {
        return (*raw <= MAC_MAX).then(|| format_mac(*raw));
    }
    if let Some(raw) = value.as_i64() {
        return u64::try_from(raw).ok().filter(|raw| *raw <= MAC_MAX).map(format_mac);
    }
    let bytes = value.as_bytes()?;
    if bytes.len() == 6 {
        let raw = bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
        return Some(format_mac(raw));
    }
    value.to_text().and_then(|text| normalize_mac(&text).ok())
}

/// Provisioning driver for switches managed over SNMP
pub struct SnmpProvisioningDriver {
    vendor: String,
    family: Option<String>,
    connector: Arc<dyn SnmpConnector>,
}

impl fmt::Debug for SnmpProvisioningDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnmpProvisioningDriver")
            .field("vendor", &self.vendor)
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}

impl SnmpProvisioningDriver {
    /// Driver for every switch of `vendor`
    pub fn new(vendor: impl Into<String>, connector: Arc<dyn SnmpConnector>) -> Self {
        Self {
            vendor: vendor.into(),
            family: None,
            connector,
        }
    }

    /// Restrict the driver to one product family
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    async fn client(
        &self,
        operation: &str,
        credentials: &DeviceCredentials,
    ) -> Result<Box<dyn SnmpClientTrait>, DriverError> {
        let target = snmp_target(credentials)?;
        debug!("Opening SNMP session to {} for {}", credentials.ip_address, operation);
        self.connector
            .connect(&target)
            .await
            .map_err(|e| DriverError::device(operation, e))
    }

    /// Create the VLAN unless the switch already has it
    async fn ensure_vlan(&self, client: &dyn SnmpClientTrait, segmentation_id: u16) -> Result<(), DriverError> {
        let vlan_oid = oid(OID_VLAN_CREATE)?.child(u32::from(segmentation_id));
        let exists = match client.get(&vlan_oid).await {
            Ok(Lookup::Found(value)) => {
                debug!("VLAN {} row status {}", segmentation_id, value);
                true
            }
            Ok(Lookup::NotFound) => false,
            Err(e) => {
                error!("Error reading VLAN {} row status: {}", segmentation_id, e);
                return Err(DriverError::device("set_isolation", e));
            }
        };
        if !exists {
            info!("Creating VLAN {}", segmentation_id);
            client
                .set(&vlan_oid, Value::Integer(ROW_CREATE_AND_GO))
                .await
                .map_err(|e| DriverError::device("set_isolation", e))?;
        }
        Ok(())
    }

    async fn read_egress(
        &self,
        operation: &str,
        client: &dyn SnmpClientTrait,
        egress_oid: &Oid,
    ) -> Result<Option<EgressPortList>, DriverError> {
        match client.get(egress_oid).await {
            Ok(Lookup::Found(value)) => value
                .as_bytes()
                .map(|bytes| Some(EgressPortList::from_bytes(bytes)))
                .ok_or_else(|| DriverError::device(operation, format!("egress ports are not an octet string: {value}"))),
            Ok(Lookup::NotFound) => Ok(None),
            Err(e) => Err(DriverError::device(operation, e)),
        }
    }
}

#[async_trait::async_trait]
impl PortProvisioningDriver for SnmpProvisioningDriver {
    async fn set_isolation(&self, port: &PortBinding) -> Result<(), DriverError> {
        let ifindex = port.ifindex()?;
        let segmentation_id = port.segmentation_id;
        let client = self.client("set_isolation", &port.credentials).await?;

        let result = async {
            self.ensure_vlan(client.as_ref(), segmentation_id).await?;
            let egress_oid = oid(OID_VLAN_EGRESS_PORT)?.child(u32::from(segmentation_id));
            let mut egress = self
                .read_egress("set_isolation", client.as_ref(), &egress_oid)
                .await?
                .unwrap_or_default();
            egress.set(ifindex)?;
            client
                .set(&egress_oid, Value::OctetString(egress.into_bytes()))
                .await
                .map_err(|e| DriverError::device("set_isolation", e))
        }
        .await;

        match &result {
            Ok(()) => info!(
                "Port {} (ifindex {}) isolated on VLAN {}",
                port.neutron_port_id, ifindex, segmentation_id
            ),
            Err(e) => error!("Exception in configuring VLAN {}: {}", segmentation_id, e),
        }
        result
    }

    async fn delete_isolation(&self, port: &PortBinding) -> Result<(), DriverError> {
        let ifindex = port.ifindex()?;
        let segmentation_id = port.segmentation_id;
        let client = self.client("delete_isolation", &port.credentials).await?;

        let result = async {
            let egress_oid = oid(OID_VLAN_EGRESS_PORT)?.child(u32::from(segmentation_id));
            let Some(mut egress) = self
                .read_egress("delete_isolation", client.as_ref(), &egress_oid)
                .await?
            else {
                warn!("VLAN {} has no egress ports on the switch, nothing to clear", segmentation_id);
                return Ok(());
            };
            egress.clear(ifindex)?;
            client
                .set(&egress_oid, Value::OctetString(egress.into_bytes()))
                .await
                .map_err(|e| DriverError::device("delete_isolation", e))
        }
        .await;

        match &result {
            Ok(()) => info!(
                "Port {} (ifindex {}) removed from VLAN {}",
                port.neutron_port_id, ifindex, segmentation_id
            ),
            Err(e) => error!("Exception in deleting VLAN {}: {}", segmentation_id, e),
        }
        result
    }

    async fn create_lag(&self, port: &PortBinding) -> Result<(), DriverError> {
        debug!("create_lag is not supported over SNMP, ignoring port {}", port.neutron_port_id);
        Ok(())
    }

    async fn delete_lag(&self, port: &PortBinding) -> Result<(), DriverError> {
        debug!("delete_lag is not supported over SNMP, ignoring port {}", port.neutron_port_id);
        Ok(())
    }

    fn get_driver_name(&self) -> String {
        driver_key(&self.vendor, PROTOCOL_SNMP, self.family.as_deref())
    }

    async fn get_protocol_validation_result(&self, credentials: &DeviceCredentials) -> Result<String, DriverError> {
        const OPERATION: &str = "get_protocol_validation_result";
        let client = self.client(OPERATION, credentials).await?;
        let value = client
            .get(&oid(OID_CHASSIS_MAC)?)
            .await
            .map_err(|e| DriverError::device(OPERATION, e))?
            .into_value()
            .ok_or_else(|| DriverError::device(OPERATION, "switch does not report a chassis id"))?;
        chassis_mac(&value)
            .ok_or_else(|| DriverError::device(OPERATION, format!("chassis id is not a MAC address: {value}")))
    }

    async fn get_device_info(&self, credentials: &DeviceCredentials) -> Result<Vec<PortInfo>, DriverError> {
        const OPERATION: &str = "get_device_info";
        let client = self.client(OPERATION, credentials).await?;
        let columns = [
            oid(OID_IF_INDEX)?,
            oid(OID_IF_DESCR)?,
            oid(OID_IF_TYPE)?,
            oid(OID_IF_OPER_STATUS)?,
        ];
        let rows = client
            .get_bulk(&columns)
            .await
            .map_err(|e| DriverError::device(OPERATION, e))?;

        let ports: Vec<PortInfo> = rows
            .iter()
            .filter_map(|row| match row.as_slice() {
                [index, descr, if_type, status, ..] if if_type.value.as_i64() == Some(IF_TYPE_ETHERNET) => {
                    let ifindex = index
                        .value
                        .as_i64()
                        .and_then(|v| u32::try_from(v).ok())
                        .or_else(|| index.oid.last_arc())?;
                    Some(PortInfo {
                        ifindex,
                        interface_name: descr.value.to_text().unwrap_or_default(),
                        port_status: PortStatus::from_oper_status(status.value.as_i64().unwrap_or(4)),
                    })
                }
                _ => None,
            })
            .collect();
        debug!("Switch {} reports {} physical ports", credentials.ip_address, ports.len());
        Ok(ports)
    }
}
