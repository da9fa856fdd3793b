//! Test utilities for unit testing drivers and services
//!
//! Fixtures for switches, credentials and port bindings, plus helpers that
//! populate a [`MockSnmpAgent`] the way a switch would answer.

#[cfg(test)]
use crate::driver::PortBinding;
#[cfg(test)]
use crate::snmp_driver::{OID_CHASSIS_MAC, OID_IF_DESCR, OID_IF_INDEX, OID_IF_OPER_STATUS, OID_IF_TYPE};
#[cfg(test)]
use bnp_types::*;
#[cfg(test)]
use snmp_client::{MockSnmpAgent, Oid, Value};

/// Helper to create a test switch served by the default `hpe_snmp` driver
#[cfg(test)]
pub fn test_switch(name: &str, mac: &str, ip: &str) -> Switch {
    Switch {
        id: uuid::Uuid::new_v4(),
        name: name.to_string(),
        vendor: "hpe".to_string(),
        family: None,
        ip_address: ip.parse().unwrap(),
        mac_address: mac.to_string(),
        management_protocol: ManagementProtocol::SnmpV2c,
        credentials: "tor-community".to_string(),
        port_provisioning: PortProvisioning::Enabled,
        validation_result: None,
    }
}

/// Helper to create an SNMPv2c credential
#[cfg(test)]
pub fn v2c_credential(name: &str) -> Credential {
    Credential {
        id: uuid::Uuid::new_v4(),
        name: name.to_string(),
        access: AccessParameters::SnmpV2c {
            write_community: "private".to_string(),
        },
    }
}

/// Helper to create resolved SNMPv2c access parameters
#[cfg(test)]
pub fn v2c_credentials() -> DeviceCredentials {
    DeviceCredentials::new(
        "192.0.2.10".parse().unwrap(),
        AccessParameters::SnmpV2c {
            write_community: "private".to_string(),
        },
    )
}

/// Helper to create a binding of one switch port with a known ifindex
#[cfg(test)]
pub fn binding(segmentation_id: u16, ifindex: u32) -> PortBinding {
    PortBinding {
        neutron_port_id: "port-1".to_string(),
        segmentation_id,
        access_type: AccessType::Access,
        lag_id: None,
        switchports: vec![SwitchPort {
            port_id: format!("Ten-GigabitEthernet1/0/{ifindex}"),
            switch_id: "08:00:09:01:02:03".to_string(),
            switch_info: None,
            ifindex: Some(ifindex),
        }],
        credentials: v2c_credentials(),
    }
}

/// Add one IF-MIB row to the agent
#[cfg(test)]
pub fn add_interface(agent: &MockSnmpAgent, ifindex: u32, name: &str, if_type: i64, oper_status: i64) {
    let column = |base: &[u32]| Oid::new(base.to_vec()).unwrap().child(ifindex);
    agent.insert(column(OID_IF_INDEX), Value::Integer(i64::from(ifindex)));
    agent.insert(column(OID_IF_DESCR), Value::OctetString(name.as_bytes().to_vec()));
    agent.insert(column(OID_IF_TYPE), Value::Integer(if_type));
    agent.insert(column(OID_IF_OPER_STATUS), Value::Integer(oper_status));
}

/// Agent that reports `mac` as its LLDP chassis id
#[cfg(test)]
pub fn chassis_agent(mac: &str) -> MockSnmpAgent {
    let agent = MockSnmpAgent::new();
    let octets: Vec<u8> = normalize_mac(mac)
        .unwrap()
        .split(':')
        .map(|pair| u8::from_str_radix(pair, 16).unwrap())
        .collect();
    agent.insert(Oid::new(OID_CHASSIS_MAC.to_vec()).unwrap(), Value::OctetString(octets));
    agent
}
