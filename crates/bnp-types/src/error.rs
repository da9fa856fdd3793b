//! Model validation errors

use thiserror::Error;

/// A record that violates the model's invariants
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Credential fields are missing or inconsistent
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// Management protocol name is not one of the supported protocols
    #[error("Unsupported management protocol: {0}")]
    UnsupportedProtocol(String),

    /// Authentication or privacy protocol name is not supported
    #[error("Unsupported security protocol: {0}")]
    UnsupportedSecurityProtocol(String),

    /// Port provisioning flag is neither ENABLED nor DISABLED
    #[error("Invalid port provisioning state: {0}")]
    InvalidProvisioningState(String),

    /// Text that is not a 48-bit MAC address
    #[error("Invalid MAC address: {0}")]
    InvalidMac(String),

    /// VLAN id outside 1..=4094
    #[error("Invalid segmentation id: {0}")]
    InvalidSegmentationId(u32),
}
