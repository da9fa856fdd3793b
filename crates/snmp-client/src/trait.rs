//! SnmpClient traits for mocking
//!
//! Drivers talk to switches through [`SnmpClientTrait`] and build clients
//! through [`SnmpConnector`], so unit tests can substitute an in-memory agent
//! for a real device.

use crate::client::SnmpTarget;
use crate::error::SnmpError;
use crate::oid::Oid;
use crate::value::{Value, VarBind};

/// Outcome of reading one object instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The agent returned a value
    Found(Value),
    /// The object or instance does not exist on the agent
    NotFound,
}

impl Lookup {
    /// The value, if found
    pub fn into_value(self) -> Option<Value> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }
}

/// Operations the provisioning drivers need from an SNMP session
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait SnmpClientTrait: Send + Sync {
    /// Read one object instance
    async fn get(&self, oid: &Oid) -> Result<Lookup, SnmpError>;

    /// Walk the table columns `oids` in lockstep, one row per instance
    async fn get_bulk(&self, oids: &[Oid]) -> Result<Vec<Vec<VarBind>>, SnmpError>;

    /// Write one object instance
    async fn set(&self, oid: &Oid, value: Value) -> Result<(), SnmpError>;
}

/// Builds a session for a switch from its address and credentials
#[async_trait::async_trait]
pub trait SnmpConnector: Send + Sync {
    /// Open a session to `target`
    async fn connect(&self, target: &SnmpTarget) -> Result<Box<dyn SnmpClientTrait>, SnmpError>;
}
