//! Provisioning driver registry
//!
//! Drivers are registered once at startup under the key they report from
//! `get_driver_name`, and looked up per switch by vendor, protocol and family.
//! The first driver registered for a key wins.

use crate::config::ProvisioningConfig;
use crate::driver::{PortProvisioningDriver, driver_key};
use crate::snmp_driver::SnmpProvisioningDriver;
use bnp_types::Switch;
use snmp_client::SnmpConnector;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Vendor served by the built-in SNMP driver
pub const DEFAULT_SNMP_VENDOR: &str = "hpe";

/// Registered drivers by key
#[derive(Debug, Default)]
pub struct ProvisioningManager {
    drivers: HashMap<String, Arc<dyn PortProvisioningDriver>>,
}

impl ProvisioningManager {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from the configured driver names
    ///
    /// Known names: `snmp` (alias `hpe_snmp`), and `snmp:<vendor>[:<family>]`
    /// for a vendor or family specific SNMP driver. Unknown names are skipped.
    pub fn from_config(config: &ProvisioningConfig, connector: Arc<dyn SnmpConnector>) -> Self {
        info!("Configured provisioning driver names: {:?}", config.provisioning_driver);
        let mut manager = Self::new();
        for name in &config.provisioning_driver {
            match catalog_driver(name.trim(), &connector) {
                Some(driver) => {
                    manager.register(driver);
                }
                None => warn!("Unknown provisioning driver '{}', skipping", name),
            }
        }
        info!("Registered provisioning drivers: {:?}", manager.driver_names());
        manager
    }

    /// Register a driver; returns false if its key was already taken
    pub fn register(&mut self, driver: Arc<dyn PortProvisioningDriver>) -> bool {
        let key = driver.get_driver_name();
        if let Some(existing) = self.drivers.get(&key) {
            error!(
                "Provisioning driver {:?} ignored, driver {:?} already registered for '{}'",
                driver, existing, key
            );
            return false;
        }
        info!("Registered provisioning driver '{}'", key);
        self.drivers.insert(key, driver);
        true
    }

    /// Driver registered under exactly `key`
    pub fn provisioning_driver(&self, key: &str) -> Option<Arc<dyn PortProvisioningDriver>> {
        self.drivers.get(key).cloned()
    }

    /// Driver for a vendor/protocol/family; the family key is tried first
    pub fn driver_for(&self, vendor: &str, protocol: &str, family: Option<&str>) -> Option<Arc<dyn PortProvisioningDriver>> {
        family
            .filter(|f| !f.is_empty())
            .and_then(|family| self.provisioning_driver(&driver_key(vendor, protocol, Some(family))))
            .or_else(|| self.provisioning_driver(&driver_key(vendor, protocol, None)))
    }

    /// Driver for a switch record
    pub fn resolve(&self, switch: &Switch) -> Option<Arc<dyn PortProvisioningDriver>> {
        let driver = self.driver_for(
            &switch.vendor,
            switch.management_protocol.driver_protocol(),
            switch.family.as_deref(),
        );
        if driver.is_none() {
            warn!(
                "No provisioning driver for vendor '{}', protocol '{}', family '{}'",
                switch.vendor,
                switch.management_protocol,
                switch.family.as_deref().unwrap_or("")
            );
        }
        driver
    }

    /// Registered keys, sorted
    pub fn driver_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.drivers.keys().cloned().collect();
        names.sort();
        names
    }

    /// True when no driver is registered
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

fn catalog_driver(name: &str, connector: &Arc<dyn SnmpConnector>) -> Option<Arc<dyn PortProvisioningDriver>> {
    let snmp = |vendor: &str| SnmpProvisioningDriver::new(vendor, Arc::clone(connector));
    match name.split(':').collect::<Vec<_>>().as_slice() {
        ["snmp" | "hpe_snmp"] => Some(Arc::new(snmp(DEFAULT_SNMP_VENDOR))),
        ["snmp", vendor] if !vendor.is_empty() => Some(Arc::new(snmp(vendor))),
        ["snmp", vendor, family] if !vendor.is_empty() && !family.is_empty() => {
            Some(Arc::new(snmp(vendor).with_family(*family)))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use snmp_client::MockSnmpAgent;

    fn connector() -> Arc<dyn SnmpConnector> {
        Arc::new(MockSnmpAgent::new())
    }

    #[test]
    fn test_default_config_registers_hpe_snmp() {
        let manager = ProvisioningManager::from_config(&ProvisioningConfig::default(), connector());
        assert_eq!(manager.driver_names(), vec!["hpe_snmp"]);
    }

    #[test]
    fn test_unknown_names_are_skipped() {
        let config = ProvisioningConfig {
            provisioning_driver: vec!["netconf".to_string(), "snmp:arista".to_string(), "snmp::".to_string()],
            ..ProvisioningConfig::default()
        };
        let manager = ProvisioningManager::from_config(&config, connector());
        assert_eq!(manager.driver_names(), vec!["arista_snmp"]);
    }

    #[test]
    fn test_first_registration_wins() {
        let mut manager = ProvisioningManager::new();
        let first: Arc<dyn PortProvisioningDriver> = Arc::new(SnmpProvisioningDriver::new("hpe", connector()));
        let second: Arc<dyn PortProvisioningDriver> = Arc::new(SnmpProvisioningDriver::new("hpe", connector()));

        assert!(manager.register(Arc::clone(&first)));
        assert!(!manager.register(second));
        let registered = manager.provisioning_driver("hpe_snmp").unwrap();
        assert!(Arc::ptr_eq(&registered, &first));
    }

    #[test]
    fn test_family_key_takes_precedence() {
        let mut manager = ProvisioningManager::new();
        let plain: Arc<dyn PortProvisioningDriver> = Arc::new(SnmpProvisioningDriver::new("hpe", connector()));
        let family: Arc<dyn PortProvisioningDriver> =
            Arc::new(SnmpProvisioningDriver::new("hpe", connector()).with_family("5900"));
        manager.register(Arc::clone(&plain));
        manager.register(Arc::clone(&family));

        let mut switch = test_switch("tor-1", "08:00:09:01:02:03", "192.0.2.10");
        switch.family = Some("5900".to_string());
        assert!(Arc::ptr_eq(&manager.resolve(&switch).unwrap(), &family));

        switch.family = Some("7900".to_string());
        assert!(Arc::ptr_eq(&manager.resolve(&switch).unwrap(), &plain));

        switch.family = None;
        assert!(Arc::ptr_eq(&manager.resolve(&switch).unwrap(), &plain));
    }

    #[test]
    fn test_every_snmp_version_maps_to_the_snmp_driver() {
        let manager = ProvisioningManager::from_config(&ProvisioningConfig::default(), connector());
        let mut switch = test_switch("tor-1", "08:00:09:01:02:03", "192.0.2.10");
        for protocol in ["snmpv1", "snmpv2c", "snmpv3"] {
            switch.management_protocol = protocol.parse().unwrap();
            assert!(manager.resolve(&switch).is_some(), "{protocol}");
        }
        switch.management_protocol = "netconf_ssh".parse().unwrap();
        assert!(manager.resolve(&switch).is_none());
        switch.management_protocol = "snmpv2c".parse().unwrap();
        switch.vendor = "cisco".to_string();
        assert!(manager.resolve(&switch).is_none());
    }
}
