//! Inventory files
//!
//! Credentials and switches can be seeded from a YAML document:
//!
//! ```yaml
//! credentials:
//!   - name: tor-community
//!     protocol_type: snmpv2c
//!     write_community: private
//! switches:
//!   - name: tor-1
//!     vendor: hpe
//!     ip_address: 192.0.2.10
//!     mac_address: "08:00:09:01:02:03"
//!     management_protocol: snmpv2c
//!     credentials: tor-community
//! ```

use crate::error::{ConfigError, ProvisioningError};
use crate::store::InventoryStore;
use bnp_types::{Credential, Switch, normalize_mac};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Environment variable naming the inventory file
pub const INVENTORY_ENV: &str = "BNP_INVENTORY";

/// Credentials and switches to load into a store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Credential records
    #[serde(default)]
    pub credentials: Vec<Credential>,
    /// Switch records
    #[serde(default)]
    pub switches: Vec<Switch>,
}

impl Inventory {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Store every record; credentials are validated first
    ///
    /// Switches are stored as written, validation results included; run
    /// protocol validation afterwards to refresh them.
    pub async fn load_into<S>(self, store: &S) -> Result<(), ProvisioningError>
    where
        S: InventoryStore + ?Sized,
    {
        for credential in self.credentials {
            credential.validate()?;
            store.add_credential(credential).await?;
        }
        for switch in self.switches {
            normalize_mac(&switch.mac_address)?;
            store.add_switch(switch).await?;
        }
        info!(
            "Loaded {} credentials and {} switches",
            store.list_credentials().await?.len(),
            store.list_switches().await?.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CredentialStore, InMemoryInventory, SwitchStore};
    use bnp_types::{AccessParameters, ManagementProtocol};

    const INVENTORY: &str = r#"
credentials:
  - name: tor-community
    protocol_type: snmpv2c
    write_community: private
  - name: tor-v3
    protocol_type: snmpv3
    security_name: bnp
    auth_protocol: sha
    auth_key: authpass1
switches:
  - name: tor-1
    vendor: hpe
    family: "5900"
    ip_address: 192.0.2.10
    mac_address: "08:00:09:01:02:03"
    management_protocol: snmpv2c
    credentials: tor-community
"#;

    #[tokio::test]
    async fn test_loads_credentials_and_switches() {
        let inventory = Inventory::from_yaml_str(INVENTORY).unwrap();
        assert_eq!(inventory.credentials.len(), 2);
        assert!(matches!(inventory.credentials[1].access, AccessParameters::SnmpV3 { .. }));

        let store = InMemoryInventory::new();
        inventory.load_into(&store).await.unwrap();

        let switch = store.get_switch_by_mac("08:00:09:01:02:03").await.unwrap().unwrap();
        assert_eq!(switch.family.as_deref(), Some("5900"));
        assert_eq!(switch.management_protocol, ManagementProtocol::SnmpV2c);
        assert_eq!(
            store
                .get_credential_by_name_and_protocol("tor-v3", ManagementProtocol::SnmpV3)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_rejects_invalid_credentials() {
        let yaml = r"
credentials:
  - name: short
    protocol_type: snmpv3
    security_name: bnp
    auth_protocol: md5
    auth_key: short
";
        let store = InMemoryInventory::new();
        let result = Inventory::from_yaml_str(yaml).unwrap().load_into(&store).await;
        assert!(matches!(result, Err(ProvisioningError::Model(_))));
        assert!(store.list_credentials().await.unwrap().is_empty());
    }

    #[test]
    fn test_unknown_protocol_is_a_parse_error() {
        let yaml = r"
switches:
  - name: tor-1
    vendor: hpe
    ip_address: 192.0.2.10
    mac_address: 08:00:09:01:02:03
    management_protocol: telnet
    credentials: tor-community
";
        assert!(matches!(Inventory::from_yaml_str(yaml), Err(ConfigError::Yaml(_))));
    }
}
