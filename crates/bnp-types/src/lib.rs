//! BNP Types
//!
//! Records shared by the provisioning engine, its stores and the
//! `bnp-provisioner` binary: switches, credentials, port mappings and the
//! interface state a switch reports.

pub mod credential;
pub mod error;
pub mod mac;
pub mod port;
pub mod switch;

pub use credential::*;
pub use error::ModelError;
pub use mac::{format_mac, normalize_mac, same_mac};
pub use port::*;
pub use switch::*;
