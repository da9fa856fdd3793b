//! Provisioning configuration
//!
//! Loaded from the YAML file named by `BNP_CONFIG` when set, then overridden
//! by `BNP_SNMP_TIMEOUT` / `BNP_SNMP_RETRIES`. Missing keys take the defaults.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use snmp_client::SnmpConfig;
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "BNP_CONFIG";
/// Environment override for `snmp_timeout`
pub const SNMP_TIMEOUT_ENV: &str = "BNP_SNMP_TIMEOUT";
/// Environment override for `snmp_retries`
pub const SNMP_RETRIES_ENV: &str = "BNP_SNMP_RETRIES";

/// Settings shared by the registry and the SNMP transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// Driver implementations to load, by catalog name
    pub provisioning_driver: Vec<String>,
    /// Seconds to wait for each SNMP response
    pub snmp_timeout: u64,
    /// SNMP resends after the first attempt
    pub snmp_retries: u32,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            provisioning_driver: vec!["snmp".to_string()],
            snmp_timeout: 3,
            snmp_retries: 5,
        }
    }
}

impl ProvisioningConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
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

    /// Configuration from `BNP_CONFIG` (or defaults) plus environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let config = match env::var(CONFIG_ENV) {
            Ok(path) => {
                info!("Loading provisioning configuration from {}", path);
                Self::from_file(path)?
            }
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| env::var(name).ok())
    }

    /// Apply `BNP_SNMP_*` overrides looked up through `lookup`
    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(timeout) = lookup(SNMP_TIMEOUT_ENV) {
            self.snmp_timeout = timeout.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{SNMP_TIMEOUT_ENV} must be a number of seconds, got {timeout}"))
            })?;
        }
        if let Some(retries) = lookup(SNMP_RETRIES_ENV) {
            self.snmp_retries = retries.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{SNMP_RETRIES_ENV} must be a count, got {retries}"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject values the transport cannot use
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snmp_timeout == 0 {
            return Err(ConfigError::Invalid("snmp_timeout must be at least 1 second".to_string()));
        }
        if self.provisioning_driver.iter().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::Invalid("provisioning_driver entries must not be empty".to_string()));
        }
        Ok(())
    }

    /// Transport settings for SNMP sessions
    pub fn snmp_config(&self) -> SnmpConfig {
        SnmpConfig {
            timeout: Duration::from_secs(self.snmp_timeout),
            retries: self.snmp_retries,
            ..SnmpConfig::default()
        }
    }
}
