//! Provisioning error types.
//!
//! Device failures are normalised at the driver boundary into
//! [`DriverError`]; the orchestrator and switch service report
//! [`ProvisioningError`], which wraps driver, store and model errors.

use bnp_types::ModelError;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by a port-provisioning driver
#[derive(Debug, Error)]
pub enum DriverError {
    /// The device rejected or never answered a request
    #[error("Device provisioning failed during {operation}: {message}")]
    DeviceProvisioningFailure {
        /// Driver operation that failed
        operation: String,
        /// Text of the underlying error
        message: String,
    },

    /// The port descriptor cannot be provisioned
    #[error("Invalid port: {0}")]
    InvalidPort(String),

    /// The driver does not speak the protocol of the credentials
    #[error("Unsupported credentials: {0}")]
    UnsupportedCredentials(String),
}

impl DriverError {
    /// Wrap a device-side failure of `operation`
    pub fn device(operation: &str, cause: impl std::fmt::Display) -> Self {
        DriverError::DeviceProvisioningFailure {
            operation: operation.to_string(),
            message: cause.to_string(),
        }
    }
}

/// Errors raised by an inventory store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record with that key
    #[error("Not found: {0}")]
    NotFound(String),

    /// A unique key is already taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backing store failed
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by bind/unbind and switch lifecycle operations
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// No switch with that MAC or id
    #[error("Switch not found: {0}")]
    SwitchNotFound(String),

    /// The switch references a credential that does not exist
    #[error("Credentials not found for id or name: {0}")]
    CredentialsNotFound(String),

    /// The referenced credential cannot be used for the switch
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// No driver registered for vendor/protocol/family
    #[error("No provisioning driver found for {0}")]
    NoDriver(String),

    /// Port provisioning is disabled on the switch
    #[error("Port provisioning is disabled on switch {0}")]
    ProvisioningDisabled(String),

    /// The switch reported a different chassis MAC
    #[error("Switch MAC mismatch: expected {expected}, device reports {actual}")]
    MacMismatch {
        /// MAC on record
        expected: String,
        /// MAC reported by the device
        actual: String,
    },

    /// The named interface is not a physical port of the switch
    #[error("Physical port {port} not found on switch {switch}")]
    PhysicalPortNotFound {
        /// Interface name requested
        port: String,
        /// Switch MAC
        switch: String,
    },

    /// No mapping for the virtual port
    #[error("No switch port mapping for port {0}")]
    MappingNotFound(String),

    /// Malformed request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The switch still has port mappings
    #[error("Switch {0} has active port mappings")]
    SwitchInUse(Uuid),

    /// The switch must be disabled before it is deleted
    #[error("Disable the switch {0} to delete")]
    ProvisioningStillEnabled(Uuid),

    /// The credential is referenced by a switch
    #[error("Credential {0} is in use by a switch")]
    CredentialInUse(String),

    /// Another switch already has that address
    #[error("Switch with {0} is already present")]
    DuplicateSwitch(String),

    /// Driver failure
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid record
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Errors loading [`crate::config::ProvisioningConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML for the expected shape
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
