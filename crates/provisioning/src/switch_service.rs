//! Switch and credential lifecycle
//!
//! Creating a switch, changing its MAC or asking for it explicitly runs
//! protocol validation: the driver reads the chassis MAC from the device and
//! the outcome is stored as the switch's `validation_result`. Validation never
//! fails the request; an unreachable device or a missing driver is recorded
//! as text.

use crate::access::{references, resolve_credential};
use crate::error::{ProvisioningError, StoreError};
use crate::manager::ProvisioningManager;
use crate::store::InventoryStore;
use bnp_types::{
    CREDENTIALS_NOT_FOUND, Credential, DEVICE_NOT_REACHABLE, DeviceCredentials, NO_DRIVER_FOUND, PortProvisioning,
    Switch, SwitchUpdate, VALIDATION_SUCCESS, invalid_mac_result, normalize_mac, same_mac,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Switch and credential operations backed by an inventory
#[derive(Debug)]
pub struct SwitchService<S> {
    manager: Arc<ProvisioningManager>,
    store: Arc<S>,
}

impl<S: InventoryStore> SwitchService<S> {
    /// Service over a registry and an inventory
    pub fn new(manager: Arc<ProvisioningManager>, store: Arc<S>) -> Self {
        Self { manager, store }
    }

    /// Validation result for a switch reached with `credentials`
    pub async fn validate_protocol(&self, switch: &Switch, credentials: &DeviceCredentials) -> String {
        let Some(driver) = self.manager.resolve(switch) else {
            return NO_DRIVER_FOUND.to_string();
        };
        match driver.get_protocol_validation_result(credentials).await {
            Ok(actual) if same_mac(&actual, &switch.mac_address) => VALIDATION_SUCCESS.to_string(),
            Ok(actual) => {
                warn!("Switch {} reports MAC {}, expected {}", switch.name, actual, switch.mac_address);
                invalid_mac_result(&actual)
            }
            Err(e) => {
                error!("Exception in protocol validation of switch {}: {}", switch.name, e);
                DEVICE_NOT_REACHABLE.to_string()
            }
        }
    }

    /// Register a switch; provisioning starts enabled
    pub async fn create_switch(&self, mut switch: Switch) -> Result<Switch, ProvisioningError> {
        normalize_mac(&switch.mac_address)?;
        if self.store.get_switch_by_ip(switch.ip_address).await?.is_some() {
            return Err(ProvisioningError::DuplicateSwitch(format!("ip_address {}", switch.ip_address)));
        }
        if self.store.get_switch_by_mac(&switch.mac_address).await?.is_some() {
            return Err(ProvisioningError::DuplicateSwitch(format!("mac_address {}", switch.mac_address)));
        }
        let credential = resolve_credential(self.store.as_ref(), switch.management_protocol, &switch.credentials).await?;

        switch.port_provisioning = PortProvisioning::Enabled;
        let credentials = DeviceCredentials::new(switch.ip_address, credential.access);
        switch.validation_result = Some(self.validate_protocol(&switch, &credentials).await);

        let switch = self.store.add_switch(switch).await.map_err(conflict_as_duplicate)?;
        info!(
            "Created switch {} ({}): {}",
            switch.name,
            switch.id,
            switch.validation_result.as_deref().unwrap_or("")
        );
        Ok(switch)
    }

    /// Apply an update; a new MAC or `validate` re-runs validation
    pub async fn update_switch(&self, id: Uuid, update: SwitchUpdate) -> Result<Switch, ProvisioningError> {
        let mut switch = self.get_switch(id).await?;

        if let Some(ip) = update.ip_address.filter(|ip| *ip != switch.ip_address) {
            if self.store.get_switch_by_ip(ip).await?.is_some() {
                return Err(ProvisioningError::DuplicateSwitch(format!("ip_address {ip}")));
            }
            switch.ip_address = ip;
        }
        if let Some(port_provisioning) = update.port_provisioning {
            switch.port_provisioning = port_provisioning;
        }
        if let Some(name) = update.name {
            switch.name = name;
        }
        if let Some(vendor) = update.vendor {
            switch.vendor = vendor;
        }
        if let Some(family) = update.family {
            switch.family = Some(family).filter(|f| !f.is_empty());
        }
        match (update.management_protocol, update.credentials) {
            (Some(protocol), Some(credentials)) => {
                resolve_credential(self.store.as_ref(), protocol, &credentials).await?;
                switch.management_protocol = protocol;
                switch.credentials = credentials;
            }
            (Some(protocol), None) if protocol != switch.management_protocol => {
                return Err(ProvisioningError::InvalidRequest(format!(
                    "Invalid management_protocol {protocol} without new credentials"
                )));
            }
            (None, Some(credentials)) => {
                resolve_credential(self.store.as_ref(), switch.management_protocol, &credentials).await?;
                switch.credentials = credentials;
            }
            _ => {}
        }

        if let Some(mac) = update.mac_address.as_ref() {
            normalize_mac(mac)?;
            if let Some(other) = self.store.get_switch_by_mac(mac).await? {
                if other.id != switch.id {
                    return Err(ProvisioningError::DuplicateSwitch(format!("mac_address {mac}")));
                }
            }
            switch.mac_address = mac.clone();
        }
        if update.mac_address.is_some() || update.validate {
            let credential =
                resolve_credential(self.store.as_ref(), switch.management_protocol, &switch.credentials).await?;
            let credentials = DeviceCredentials::new(switch.ip_address, credential.access);
            switch.validation_result = Some(self.validate_protocol(&switch, &credentials).await);
        }

        let switch = self.store.update_switch(switch).await.map_err(conflict_as_duplicate)?;
        info!("Updated switch {} ({})", switch.name, switch.id);
        Ok(switch)
    }

    /// Re-run validation of a stored switch and record the result
    pub async fn validate_switch(&self, id: Uuid) -> Result<String, ProvisioningError> {
        let switch = self.get_switch(id).await?;
        let result = match resolve_credential(self.store.as_ref(), switch.management_protocol, &switch.credentials).await
        {
            Ok(credential) => {
                let credentials = DeviceCredentials::new(switch.ip_address, credential.access);
                self.validate_protocol(&switch, &credentials).await
            }
            Err(e @ (ProvisioningError::CredentialsNotFound(_) | ProvisioningError::InvalidCredentials(_))) => {
                error!("Cannot validate switch {}: {}", switch.name, e);
                CREDENTIALS_NOT_FOUND.to_string()
            }
            Err(e) => return Err(e),
        };
        self.store.update_validation_result(id, &result).await?;
        Ok(result)
    }

    /// Delete a disabled switch with no port mappings
    pub async fn delete_switch(&self, id: Uuid) -> Result<(), ProvisioningError> {
        let switch = self.get_switch(id).await?;
        if !self.store.get_mappings_by_switch(id).await?.is_empty() {
            return Err(ProvisioningError::SwitchInUse(id));
        }
        if switch.is_provisioning_enabled() {
            return Err(ProvisioningError::ProvisioningStillEnabled(id));
        }
        self.store.delete_switch(id).await?;
        info!("Deleted switch {} ({})", switch.name, id);
        Ok(())
    }

    /// Switch by id
    pub async fn get_switch(&self, id: Uuid) -> Result<Switch, ProvisioningError> {
        self.store
            .get_switch(id)
            .await?
            .ok_or_else(|| ProvisioningError::SwitchNotFound(id.to_string()))
    }

    /// Every switch
    pub async fn list_switches(&self) -> Result<Vec<Switch>, ProvisioningError> {
        Ok(self.store.list_switches().await?)
    }

    /// Store a validated credential
    pub async fn add_credential(&self, credential: Credential) -> Result<Credential, ProvisioningError> {
        credential.validate()?;
        let credential = self.store.add_credential(credential).await?;
        info!("Added {} credential {} ({})", credential.protocol(), credential.name, credential.id);
        Ok(credential)
    }

    /// Delete a credential no switch references
    pub async fn delete_credential(&self, id: Uuid) -> Result<(), ProvisioningError> {
        let credential = self
            .store
            .get_credential_by_id(id)
            .await?
            .ok_or_else(|| ProvisioningError::CredentialsNotFound(id.to_string()))?;
        let switches = self.store.list_switches().await?;
        if let Some(switch) = switches.iter().find(|switch| references(switch, &credential)) {
            return Err(ProvisioningError::CredentialInUse(format!(
                "{} is used by switch {}",
                credential.name, switch.name
            )));
        }
        self.store.delete_credential(id).await?;
        info!("Deleted credential {} ({})", credential.name, id);
        Ok(())
    }
}

fn conflict_as_duplicate(e: StoreError) -> ProvisioningError {
    match e {
        StoreError::Conflict(what) => ProvisioningError::DuplicateSwitch(what),
        other => ProvisioningError::Store(other),
    }
}
