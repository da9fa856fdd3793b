//! BNP Provisioner
//!
//! Loads the provisioning configuration and the switch inventory, registers
//! the configured drivers and runs protocol validation against every switch:
//! each switch is asked for its chassis MAC over its management protocol and
//! the outcome is stored as its validation result.

use anyhow::{Context, Result};
use bnp_types::VALIDATION_SUCCESS;
use provisioning::inventory::INVENTORY_ENV;
use provisioning::{InMemoryInventory, Inventory, ProvisioningConfig, ProvisioningManager, SwitchService};
use snmp_client::UdpConnector;
use std::env;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bnp_provisioner=info,provisioning=info,snmp_client=warn".into()),
        )
        .init();

    info!("Starting BNP Provisioner");

    // Load configuration from the environment
    let config = ProvisioningConfig::load().context("Failed to load provisioning configuration")?;
    let inventory_path = env::var(INVENTORY_ENV).unwrap_or_else(|_| "inventory.yaml".to_string());

    info!("Configuration:");
    info!("  Provisioning drivers: {:?}", config.provisioning_driver);
    info!("  SNMP timeout: {}s", config.snmp_timeout);
    info!("  SNMP retries: {}", config.snmp_retries);
    info!("  Inventory: {}", inventory_path);

    let connector = Arc::new(UdpConnector::new(config.snmp_config()));
    let manager = ProvisioningManager::from_config(&config, connector);
    if manager.is_empty() {
        warn!("No provisioning driver registered, every switch will report no driver");
    }

    let store = Arc::new(InMemoryInventory::new());
    Inventory::from_file(&inventory_path)
        .with_context(|| format!("Failed to read inventory {inventory_path}"))?
        .load_into(store.as_ref())
        .await
        .context("Failed to load inventory")?;

    let service = SwitchService::new(Arc::new(manager), store);
    let switches = service.list_switches().await?;
    let mut failed = 0usize;
    for switch in &switches {
        let result = service.validate_switch(switch.id).await?;
        if result == VALIDATION_SUCCESS {
            info!("Switch {} ({}): {}", switch.name, switch.ip_address, result);
        } else {
            failed += 1;
            warn!("Switch {} ({}): {}", switch.name, switch.ip_address, result);
        }
    }

    info!(
        "Validated {} switches, {} passed, {} need attention",
        switches.len(),
        switches.len() - failed,
        failed
    );
    Ok(())
}
