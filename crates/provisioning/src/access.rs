//! Credential resolution
//!
//! A switch references its credential either by id or by name. Names are
//! only unique per protocol, so a name lookup is scoped to the switch's
//! management protocol.

use crate::error::ProvisioningError;
use crate::store::CredentialStore;
use bnp_types::{Credential, DeviceCredentials, ManagementProtocol, Switch};
use tracing::debug;
use uuid::Uuid;

/// Credential `reference` (id or name) for `protocol`
pub async fn resolve_credential<S>(
    store: &S,
    protocol: ManagementProtocol,
    reference: &str,
) -> Result<Credential, ProvisioningError>
where
    S: CredentialStore + ?Sized,
{
    let credential = match Uuid::parse_str(reference.trim()) {
        Ok(id) => store.get_credential_by_id(id).await?,
        Err(_) => {
            let mut matches = store.get_credential_by_name_and_protocol(reference, protocol).await?;
            if matches.len() > 1 {
                return Err(ProvisioningError::InvalidCredentials(format!(
                    "Multiple credentials match name {reference}, use an id to be more specific"
                )));
            }
            matches.pop()
        }
    };
    match credential {
        Some(credential) if credential.protocol() == protocol => {
            debug!("Resolved credential '{}' to {}", reference, credential.id);
            Ok(credential)
        }
        _ => Err(ProvisioningError::CredentialsNotFound(reference.to_string())),
    }
}

/// Address and access parameters to reach `switch`
pub async fn device_credentials<S>(store: &S, switch: &Switch) -> Result<DeviceCredentials, ProvisioningError>
where
    S: CredentialStore + ?Sized,
{
    let credential = resolve_credential(store, switch.management_protocol, &switch.credentials).await?;
    Ok(DeviceCredentials::new(switch.ip_address, credential.access))
}

/// True when `switch` references `credential` by id or by name
pub fn references(switch: &Switch, credential: &Credential) -> bool {
    let reference = switch.credentials.trim();
    match Uuid::parse_str(reference) {
        Ok(id) => id == credential.id,
        Err(_) => reference == credential.name && switch.management_protocol == credential.protocol(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CredentialStore, InMemoryInventory};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_resolves_by_id_and_by_name() {
        let store = InMemoryInventory::new();
        let credential = store.add_credential(v2c_credential("tor-community")).await.unwrap();

        let by_name = resolve_credential(&store, ManagementProtocol::SnmpV2c, "tor-community")
            .await
            .unwrap();
        assert_eq!(by_name.id, credential.id);

        let by_id = resolve_credential(&store, ManagementProtocol::SnmpV2c, &credential.id.to_string())
            .await
            .unwrap();
        assert_eq!(by_id.name, "tor-community");
    }

    #[tokio::test]
    async fn test_protocol_must_match() {
        let store = InMemoryInventory::new();
        let credential = store.add_credential(v2c_credential("tor-community")).await.unwrap();

        let result = resolve_credential(&store, ManagementProtocol::SnmpV3, &credential.id.to_string()).await;
        assert!(matches!(result, Err(ProvisioningError::CredentialsNotFound(_))));
        let result = resolve_credential(&store, ManagementProtocol::SnmpV1, "tor-community").await;
        assert!(matches!(result, Err(ProvisioningError::CredentialsNotFound(_))));
    }

    #[tokio::test]
    async fn test_ambiguous_names_are_rejected() {
        let store = InMemoryInventory::new();
        store.add_credential(v2c_credential("tor-community")).await.unwrap();
        store.add_credential(v2c_credential("tor-community")).await.unwrap();

        let result = resolve_credential(&store, ManagementProtocol::SnmpV2c, "tor-community").await;
        assert!(matches!(result, Err(ProvisioningError::InvalidCredentials(_))));
    }

    #[test]
    fn test_references_by_id_or_name() {
        let credential = v2c_credential("tor-community");
        let mut switch = test_switch("tor-1", "08:00:09:01:02:03", "192.0.2.10");
        assert!(references(&switch, &credential));

        switch.credentials = credential.id.to_string();
        assert!(references(&switch, &credential));

        switch.credentials = "other".to_string();
        assert!(!references(&switch, &credential));
    }
}
