//! Bind and unbind bare-metal ports
//!
//! Binding resolves the switch a port is cabled to, checks the switch still
//! answers with the MAC on record, finds the interface index of the cabled
//! port, isolates it on the VLAN and records the mapping. Unbinding replays
//! the recorded mapping against the switch and forgets it.
//!
//! The device write and the store write are not transactional: a failed
//! store write after a successful SET leaves the port isolated on the switch.

use crate::access::device_credentials;
use crate::driver::{PortBinding, PortProvisioningDriver};
use crate::error::ProvisioningError;
use crate::manager::ProvisioningManager;
use crate::store::InventoryStore;
use bnp_types::{
    AccessType, BindStatus, NetworkPort, PortMapping, Switch, SwitchPort, VALIDATION_SUCCESS, same_mac,
    validate_segmentation_id,
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// A bare-metal port to bind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBindRequest {
    /// Virtual network port id
    pub neutron_port_id: String,
    /// VLAN id
    pub segmentation_id: u32,
    /// Access or trunk
    pub access_type: AccessType,
    /// Link aggregation group, when bonded
    pub lag_id: Option<String>,
    /// Local link information; the first entry is provisioned
    pub switchports: Vec<SwitchPort>,
}

/// Binds ports through the registered drivers and records the mappings
#[derive(Debug)]
pub struct ProvisioningOrchestrator<S> {
    manager: Arc<ProvisioningManager>,
    store: Arc<S>,
}

impl<S: InventoryStore> ProvisioningOrchestrator<S> {
    /// Orchestrator over a registry and an inventory
    pub fn new(manager: Arc<ProvisioningManager>, store: Arc<S>) -> Self {
        Self { manager, store }
    }

    /// Check a port can be bound without touching the VLAN configuration
    ///
    /// Every switch port must name a known, enabled switch that answers with
    /// the MAC on record.
    pub async fn check_port(&self, request: &PortBindRequest) -> Result<(), ProvisioningError> {
        if request.switchports.is_empty() {
            return Err(ProvisioningError::InvalidRequest(format!(
                "port {} has no local link information",
                request.neutron_port_id
            )));
        }
        for switchport in &request.switchports {
            let switch = self.switch_by_mac(&switchport.switch_id).await?;
            self.enabled_driver(&switch).await?;
        }
        Ok(())
    }

    /// Isolate the port on its VLAN and record the mapping
    pub async fn bind_port(&self, request: &PortBindRequest) -> Result<PortMapping, ProvisioningError> {
        let segmentation_id = validate_segmentation_id(request.segmentation_id)?;
        let switchport = request.switchports.first().ok_or_else(|| {
            ProvisioningError::InvalidRequest(format!(
                "port {} has no local link information",
                request.neutron_port_id
            ))
        })?;
        if self.store.get_mapping(&request.neutron_port_id).await?.is_some() {
            return Err(ProvisioningError::InvalidRequest(format!(
                "port {} is already bound",
                request.neutron_port_id
            )));
        }

        let switch = self.switch_by_mac(&switchport.switch_id).await?;
        let (driver, credentials) = self.enabled_driver(&switch).await?;

        let ports = driver.get_device_info(&credentials).await?;
        let ifindex = ports
            .iter()
            .find(|port| port.interface_name == switchport.port_id)
            .map(|port| port.ifindex)
            .ok_or_else(|| ProvisioningError::PhysicalPortNotFound {
                port: switchport.port_id.clone(),
                switch: switch.mac_address.clone(),
            })?;
        debug!("Port {} on switch {} has ifindex {}", switchport.port_id, switch.name, ifindex);

        let mut switchports = request.switchports.clone();
        switchports[0].ifindex = Some(ifindex);
        let binding = PortBinding {
            neutron_port_id: request.neutron_port_id.clone(),
            segmentation_id,
            access_type: request.access_type,
            lag_id: request.lag_id.clone(),
            switchports,
            credentials,
        };
        driver.set_isolation(&binding).await?;

        let mapping = PortMapping {
            neutron_port_id: request.neutron_port_id.clone(),
            switch_port_name: switchport.port_id.clone(),
            switch_id: switch.id,
            ifindex,
        };
        let network_port = NetworkPort {
            neutron_port_id: request.neutron_port_id.clone(),
            lag_id: request.lag_id.clone(),
            access_type: request.access_type,
            segmentation_id,
            bind_status: BindStatus::Success,
        };
        self.store.add_mapping(mapping.clone(), network_port).await?;
        if switch.validation_result.as_deref() != Some(VALIDATION_SUCCESS) {
            self.store.update_validation_result(switch.id, VALIDATION_SUCCESS).await?;
        }

        info!(
            "Bound port {} to {} on switch {} (VLAN {})",
            request.neutron_port_id, switchport.port_id, switch.name, segmentation_id
        );
        Ok(mapping)
    }

    /// [`Self::bind_port`], reduced to the bind status reported to the control plane
    pub async fn bind_port_status(&self, request: &PortBindRequest) -> BindStatus {
        match self.bind_port(request).await {
            Ok(_) => BindStatus::Success,
            Err(e) => {
                error!("Exception in configuring VLAN for port {}: {}", request.neutron_port_id, e);
                BindStatus::Failure
            }
        }
    }

    /// Retract the port from its VLAN and forget the mapping
    pub async fn unbind_port(&self, neutron_port_id: &str) -> Result<(), ProvisioningError> {
        let network_port = self
            .store
            .get_network_port(neutron_port_id)
            .await?
            .ok_or_else(|| ProvisioningError::MappingNotFound(neutron_port_id.to_string()))?;
        let mapping = self
            .store
            .get_mapping(neutron_port_id)
            .await?
            .ok_or_else(|| ProvisioningError::MappingNotFound(neutron_port_id.to_string()))?;
        let switch = self
            .store
            .get_switch(mapping.switch_id)
            .await?
            .ok_or_else(|| ProvisioningError::SwitchNotFound(mapping.switch_id.to_string()))?;

        let credentials = device_credentials(self.store.as_ref(), &switch).await?;
        let driver = self.driver(&switch)?;
        let binding = PortBinding {
            neutron_port_id: neutron_port_id.to_string(),
            segmentation_id: network_port.segmentation_id,
            access_type: network_port.access_type,
            lag_id: network_port.lag_id.clone(),
            switchports: vec![SwitchPort {
                port_id: mapping.switch_port_name.clone(),
                switch_id: switch.mac_address.clone(),
                switch_info: None,
                ifindex: Some(mapping.ifindex),
            }],
            credentials,
        };
        driver.delete_isolation(&binding).await?;
        self.store.delete_mapping(neutron_port_id).await?;

        info!(
            "Unbound port {} from {} on switch {} (VLAN {})",
            neutron_port_id, mapping.switch_port_name, switch.name, network_port.segmentation_id
        );
        Ok(())
    }

    async fn switch_by_mac(&self, mac: &str) -> Result<Switch, ProvisioningError> {
        self.store.get_switch_by_mac(mac).await?.ok_or_else(|| {
            error!("No physical switch found '{}'", mac);
            ProvisioningError::SwitchNotFound(mac.to_string())
        })
    }

    fn driver(&self, switch: &Switch) -> Result<Arc<dyn PortProvisioningDriver>, ProvisioningError> {
        self.manager.resolve(switch).ok_or_else(|| {
            ProvisioningError::NoDriver(format!(
                "vendor {}, protocol {}, family {}",
                switch.vendor,
                switch.management_protocol,
                switch.family.as_deref().unwrap_or("-")
            ))
        })
    }

    /// Driver and credentials of an enabled switch that reports its recorded MAC
    async fn enabled_driver(
        &self,
        switch: &Switch,
    ) -> Result<(Arc<dyn PortProvisioningDriver>, bnp_types::DeviceCredentials), ProvisioningError> {
        if !switch.is_provisioning_enabled() {
            error!("Physical switch {} is not enabled", switch.name);
            return Err(ProvisioningError::ProvisioningDisabled(switch.name.clone()));
        }
        let credentials = device_credentials(self.store.as_ref(), switch).await?;
        let driver = self.driver(switch)?;
        let actual = driver.get_protocol_validation_result(&credentials).await?;
        if !same_mac(&actual, &switch.mac_address) {
            return Err(ProvisioningError::MacMismatch {
                expected: switch.mac_address.clone(),
                actual,
            });
        }
        Ok((driver, credentials))
    }
}
