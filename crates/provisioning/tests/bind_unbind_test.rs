//! Binds and unbinds bare-metal ports end to end against a mock switch.

use bnp_types::{
    AccessParameters, AccessType, BindStatus, Credential, ManagementProtocol, PortProvisioning, Switch, SwitchPort,
    VALIDATION_SUCCESS,
};
use provisioning::snmp_driver::{
    OID_CHASSIS_MAC, OID_IF_DESCR, OID_IF_INDEX, OID_IF_OPER_STATUS, OID_IF_TYPE, OID_VLAN_CREATE,
    OID_VLAN_EGRESS_PORT, ROW_CREATE_AND_GO,
};
use provisioning::store::{CredentialStore, PortMappingStore, SwitchStore};
use provisioning::{
    InMemoryInventory, PortBindRequest, ProvisioningConfig, ProvisioningError, ProvisioningManager,
    ProvisioningOrchestrator,
};
use snmp_client::{MockSnmpAgent, Oid, Value};
use std::sync::Arc;

const SWITCH_MAC: &str = "08:00:09:01:02:03";
const PORT_NAME: &str = "Ten-GigabitEthernet1/0/10";

fn column(base: &[u32], index: u32) -> Oid {
    Oid::new(base.to_vec()).unwrap().child(index)
}

/// A 24-port switch with an SVI that must never be picked
fn switch_agent() -> MockSnmpAgent {
    let agent = MockSnmpAgent::new();
    agent.insert(
        Oid::new(OID_CHASSIS_MAC.to_vec()).unwrap(),
        Value::OctetString(vec![0x08, 0x00, 0x09, 0x01, 0x02, 0x03]),
    );
    let mut interfaces: Vec<(u32, String, i64)> = (1..=24)
        .map(|i| (i, format!("Ten-GigabitEthernet1/0/{i}"), 6))
        .collect();
    interfaces.push((1000, "Vlan-interface1".to_string(), 136));
    for (ifindex, name, if_type) in interfaces {
        agent.insert(column(OID_IF_INDEX, ifindex), Value::Integer(i64::from(ifindex)));
        agent.insert(column(OID_IF_DESCR, ifindex), Value::OctetString(name.into_bytes()));
        agent.insert(column(OID_IF_TYPE, ifindex), Value::Integer(if_type));
        agent.insert(column(OID_IF_OPER_STATUS, ifindex), Value::Integer(1));
    }
    agent
}

struct Fixture {
    agent: MockSnmpAgent,
    store: Arc<InMemoryInventory>,
    orchestrator: ProvisioningOrchestrator<InMemoryInventory>,
    switch: Switch,
}

async fn fixture() -> Fixture {
    let agent = switch_agent();
    let store = Arc::new(InMemoryInventory::new());
    store
        .add_credential(Credential {
            id: uuid::Uuid::new_v4(),
            name: "tor-community".to_string(),
            access: AccessParameters::SnmpV2c {
                write_community: "private".to_string(),
            },
        })
        .await
        .unwrap();
    let switch = store
        .add_switch(Switch {
            id: uuid::Uuid::new_v4(),
            name: "tor-1".to_string(),
            vendor: "hpe".to_string(),
            family: None,
            ip_address: "192.0.2.10".parse().unwrap(),
            mac_address: SWITCH_MAC.to_string(),
            management_protocol: ManagementProtocol::SnmpV2c,
            credentials: "tor-community".to_string(),
            port_provisioning: PortProvisioning::Enabled,
            validation_result: None,
        })
        .await
        .unwrap();

    let manager = ProvisioningManager::from_config(&ProvisioningConfig::default(), Arc::new(agent.clone()));
    let orchestrator = ProvisioningOrchestrator::new(Arc::new(manager), Arc::clone(&store));
    Fixture {
        agent,
        store,
        orchestrator,
        switch,
    }
}

fn request(port_id: &str, segmentation_id: u32, switch_mac: &str, port_name: &str) -> PortBindRequest {
    PortBindRequest {
        neutron_port_id: port_id.to_string(),
        segmentation_id,
        access_type: AccessType::Access,
        lag_id: None,
        switchports: vec![SwitchPort {
            port_id: port_name.to_string(),
            switch_id: switch_mac.to_string(),
            switch_info: None,
            ifindex: None,
        }],
    }
}

#[tokio::test]
async fn test_bind_then_unbind_round_trip() {
    let f = fixture().await;

    let mapping = f
        .orchestrator
        .bind_port(&request("port-1", 100, "08-00-09-01-02-03", PORT_NAME))
        .await
        .unwrap();
    assert_eq!(mapping.ifindex, 10);
    assert_eq!(mapping.switch_id, f.switch.id);
    assert_eq!(mapping.switch_port_name, PORT_NAME);

    let sets = f.agent.sets();
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].oid, column(OID_VLAN_CREATE, 100));
    assert_eq!(sets[0].value, Value::Integer(ROW_CREATE_AND_GO));
    assert_eq!(
        f.agent.value(&column(OID_VLAN_EGRESS_PORT, 100)),
        Some(Value::OctetString(vec![0x00, 0x40]))
    );

    let network_port = f.store.get_network_port("port-1").await.unwrap().unwrap();
    assert_eq!(network_port.segmentation_id, 100);
    assert_eq!(network_port.bind_status, BindStatus::Success);
    let switch = f.store.get_switch(f.switch.id).await.unwrap().unwrap();
    assert_eq!(switch.validation_result.as_deref(), Some(VALIDATION_SUCCESS));

    f.orchestrator.unbind_port("port-1").await.unwrap();

    assert_eq!(
        f.agent.value(&column(OID_VLAN_EGRESS_PORT, 100)),
        Some(Value::OctetString(vec![0x00, 0x00]))
    );
    assert_eq!(f.agent.sets().len(), 3, "unbind writes only the egress bitmap");
    assert_eq!(
        f.agent.value(&column(OID_VLAN_CREATE, 100)),
        Some(Value::Integer(ROW_CREATE_AND_GO))
    );
    assert!(f.store.get_mapping("port-1").await.unwrap().is_none());
    assert!(f.store.get_network_port("port-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_second_port_on_vlan_keeps_first_member() {
    let f = fixture().await;

    f.orchestrator
        .bind_port(&request("port-1", 200, SWITCH_MAC, "Ten-GigabitEthernet1/0/1"))
        .await
        .unwrap();
    f.orchestrator
        .bind_port(&request("port-2", 200, SWITCH_MAC, "Ten-GigabitEthernet1/0/9"))
        .await
        .unwrap();

    let creates = f
        .agent
        .sets()
        .iter()
        .filter(|set| set.oid == column(OID_VLAN_CREATE, 200))
        .count();
    assert_eq!(creates, 1, "the VLAN is created once");
    assert_eq!(
        f.agent.value(&column(OID_VLAN_EGRESS_PORT, 200)),
        Some(Value::OctetString(vec![0x80, 0x80]))
    );
    assert_eq!(f.store.get_network_ports_by_segmentation_id(200).await.unwrap().len(), 2);

    f.orchestrator.unbind_port("port-1").await.unwrap();
    assert_eq!(
        f.agent.value(&column(OID_VLAN_EGRESS_PORT, 200)),
        Some(Value::OctetString(vec![0x00, 0x80]))
    );
}

#[tokio::test]
async fn test_bind_fails_before_any_set() {
    let f = fixture().await;

    let unknown_switch = f
        .orchestrator
        .bind_port(&request("port-1", 100, "08:00:09:0a:0b:0c", PORT_NAME))
        .await;
    assert!(matches!(unknown_switch, Err(ProvisioningError::SwitchNotFound(_))));

    let unknown_port = f
        .orchestrator
        .bind_port(&request("port-1", 100, SWITCH_MAC, "Vlan-interface1"))
        .await;
    assert!(matches!(unknown_port, Err(ProvisioningError::PhysicalPortNotFound { .. })));

    let bad_vlan = f.orchestrator.bind_port(&request("port-1", 4095, SWITCH_MAC, PORT_NAME)).await;
    assert!(matches!(bad_vlan, Err(ProvisioningError::Model(_))));

    let mut no_links = request("port-1", 100, SWITCH_MAC, PORT_NAME);
    no_links.switchports.clear();
    assert!(matches!(
        f.orchestrator.bind_port(&no_links).await,
        Err(ProvisioningError::InvalidRequest(_))
    ));
    assert!(matches!(
        f.orchestrator.check_port(&no_links).await,
        Err(ProvisioningError::InvalidRequest(_))
    ));

    assert!(f.agent.sets().is_empty());
}

#[tokio::test]
async fn test_disabled_switch_and_mac_mismatch_are_refused() {
    let f = fixture().await;
    let mut switch = f.switch.clone();
    switch.port_provisioning = PortProvisioning::Disabled;
    f.store.update_switch(switch.clone()).await.unwrap();

    let result = f.orchestrator.bind_port(&request("port-1", 100, SWITCH_MAC, PORT_NAME)).await;
    assert!(matches!(result, Err(ProvisioningError::ProvisioningDisabled(_))));
    assert_eq!(
        f.orchestrator
            .bind_port_status(&request("port-1", 100, SWITCH_MAC, PORT_NAME))
            .await,
        BindStatus::Failure
    );

    switch.port_provisioning = PortProvisioning::Enabled;
    f.store.update_switch(switch).await.unwrap();
    f.agent.insert(
        Oid::new(OID_CHASSIS_MAC.to_vec()).unwrap(),
        Value::OctetString(vec![0x08, 0x00, 0x09, 0x01, 0x02, 0xff]),
    );
    let result = f.orchestrator.check_port(&request("port-1", 100, SWITCH_MAC, PORT_NAME)).await;
    match result {
        Err(ProvisioningError::MacMismatch { actual, .. }) => assert_eq!(actual, "08:00:09:01:02:ff"),
        other => panic!("unexpected result {other:?}"),
    }
    assert!(f.agent.sets().is_empty());
}

#[tokio::test]
async fn test_rebind_and_unknown_unbind() {
    let f = fixture().await;
    assert_eq!(
        f.orchestrator
            .bind_port_status(&request("port-1", 100, SWITCH_MAC, PORT_NAME))
            .await,
        BindStatus::Success
    );

    let again = f.orchestrator.bind_port(&request("port-1", 101, SWITCH_MAC, PORT_NAME)).await;
    assert!(matches!(again, Err(ProvisioningError::InvalidRequest(_))));

    let missing = f.orchestrator.unbind_port("port-404").await;
    assert!(matches!(missing, Err(ProvisioningError::MappingNotFound(_))));
}

#[tokio::test]
async fn test_unreachable_switch_keeps_mapping_on_unbind() {
    let f = fixture().await;
    f.orchestrator
        .bind_port(&request("port-1", 100, SWITCH_MAC, PORT_NAME))
        .await
        .unwrap();

    f.agent.set_unreachable(true);
    let result = f.orchestrator.unbind_port("port-1").await;
    assert!(matches!(result, Err(ProvisioningError::Driver(_))));
    assert!(f.store.get_mapping("port-1").await.unwrap().is_some());
    assert!(
        !f.store
            .get_credential_by_name_and_protocol("tor-community", ManagementProtocol::SnmpV2c)
            .await
            .unwrap()
            .is_empty()
    );
}
