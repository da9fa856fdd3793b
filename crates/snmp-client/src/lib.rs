//! SNMP Client
//!
//! A small SNMP command generator used to provision VLAN membership on
//! top-of-rack switches. Speaks SNMPv1 and SNMPv2c community messages and
//! SNMPv3 with the User-based Security Model, over UDP.
//!
//! # Example
//!
//! ```no_run
//! use snmp_client::{Lookup, Oid, SnmpClient, SnmpConfig, SnmpSecurity, SnmpTarget};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let target = SnmpTarget::new(
//!     "192.0.2.10".parse()?,
//!     SnmpSecurity::V2c { community: "private".to_string() },
//! );
//! let client = SnmpClient::connect(target, SnmpConfig::default()).await?;
//!
//! // Does VLAN 100 exist?
//! let row_status: Oid = "1.3.6.1.2.1.17.7.1.4.3.1.5.100".parse()?;
//! if let Lookup::NotFound = client.get(&row_status).await? {
//!     println!("VLAN 100 is not configured");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Versions**: v1, v2c and v3 (noAuthNoPriv, authNoPriv, authPriv)
//! - **USM**: HMAC-MD5-96, HMAC-SHA-96, DES, 3DES, AES-128/192/256
//! - **Retries**: fixed timeout and retry count, no backoff
//! - **Walks**: GETBULK on v2c/v3, GETNEXT on v1

pub mod ber;
pub mod client;
pub mod error;
pub mod message;
pub mod oid;
#[path = "trait.rs"]
pub mod snmp_trait;
pub mod usm;
pub mod value;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::{SnmpClient, SnmpConfig, SnmpSecurity, SnmpTarget, UdpConnector};
pub use error::SnmpError;
pub use oid::Oid;
pub use snmp_trait::{Lookup, SnmpClientTrait, SnmpConnector};
pub use usm::{AuthProtocol, PrivProtocol, UsmUser};
pub use value::{Value, VarBind};
#[cfg(feature = "test-util")]
pub use mock::MockSnmpAgent;
