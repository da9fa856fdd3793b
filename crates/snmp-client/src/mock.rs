//! Mock SNMP agent for unit testing
//!
//! [`MockSnmpAgent`] keeps a MIB in a `BTreeMap`, answers GET/walk/SET from
//! it and records every SET, so driver tests can assert on the exact writes a
//! switch would have received. It is also its own [`SnmpConnector`].

use crate::client::SnmpTarget;
use crate::error::SnmpError;
use crate::oid::Oid;
use crate::snmp_trait::{Lookup, SnmpClientTrait, SnmpConnector};
use crate::value::{Value, VarBind};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// In-memory SNMP agent
#[derive(Debug, Clone, Default)]
pub struct MockSnmpAgent {
    mib: Arc<Mutex<BTreeMap<Oid, Value>>>,
    sets: Arc<Mutex<Vec<VarBind>>>,
    gets: Arc<Mutex<Vec<Oid>>>,
    failing: Arc<Mutex<HashSet<Oid>>>,
    unreachable: Arc<Mutex<bool>>,
    connections: Arc<Mutex<Vec<SnmpTarget>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockSnmpAgent {
    /// Agent with an empty MIB
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object (for test setup)
    pub fn insert(&self, oid: Oid, value: Value) {
        lock(&self.mib).insert(oid, value);
    }

    /// Current value of an object
    pub fn value(&self, oid: &Oid) -> Option<Value> {
        lock(&self.mib).get(oid).cloned()
    }

    /// Every SET received, in order
    pub fn sets(&self) -> Vec<VarBind> {
        lock(&self.sets).clone()
    }

    /// Every GET received, in order
    pub fn gets(&self) -> Vec<Oid> {
        lock(&self.gets).clone()
    }

    /// Targets sessions were opened for
    pub fn connections(&self) -> Vec<SnmpTarget> {
        lock(&self.connections).clone()
    }

    /// Make GET and SET of `oid` fail with genErr
    pub fn fail_oid(&self, oid: Oid) {
        lock(&self.failing).insert(oid);
    }

    /// Make every request time out, as an unreachable device would
    pub fn set_unreachable(&self, unreachable: bool) {
        *lock(&self.unreachable) = unreachable;
    }

    fn check(&self, operation: &'static str, oid: Option<&Oid>) -> Result<(), SnmpError> {
        if *lock(&self.unreachable) {
            return Err(SnmpError::during(
                operation,
                SnmpError::Timeout {
                    target: "mock-agent".to_string(),
                    attempts: 1,
                },
            ));
        }
        if oid.is_some_and(|oid| lock(&self.failing).contains(oid)) {
            return Err(SnmpError::during(
                operation,
                SnmpError::Agent {
                    status: 5,
                    name: "genErr",
                    index: 1,
                },
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SnmpClientTrait for MockSnmpAgent {
    async fn get(&self, oid: &Oid) -> Result<Lookup, SnmpError> {
        lock(&self.gets).push(oid.clone());
        self.check("get", Some(oid))?;
        Ok(match lock(&self.mib).get(oid) {
            Some(value) if !value.is_exception() => Lookup::Found(value.clone()),
            _ => Lookup::NotFound,
        })
    }

    async fn get_bulk(&self, oids: &[Oid]) -> Result<Vec<Vec<VarBind>>, SnmpError> {
        self.check("get_bulk", None)?;
        let mib = lock(&self.mib);
        let columns: Vec<Vec<VarBind>> = oids
            .iter()
            .map(|column| {
                mib.range(column.clone()..)
                    .skip_while(|(oid, _)| *oid == column)
                    .take_while(|(oid, _)| oid.starts_with(column))
                    .map(|(oid, value)| VarBind::new(oid.clone(), value.clone()))
                    .collect()
            })
            .collect();
        let height = columns.iter().map(Vec::len).min().unwrap_or(0);
        Ok((0..height)
            .map(|row| columns.iter().map(|column| column[row].clone()).collect())
            .collect())
    }

    async fn set(&self, oid: &Oid, value: Value) -> Result<(), SnmpError> {
        self.check("set", Some(oid))?;
        lock(&self.sets).push(VarBind::new(oid.clone(), value.clone()));
        lock(&self.mib).insert(oid.clone(), value);
        Ok(())
    }
}

#[async_trait::async_trait]
impl SnmpConnector for MockSnmpAgent {
    async fn connect(&self, target: &SnmpTarget) -> Result<Box<dyn SnmpClientTrait>, SnmpError> {
        lock(&self.connections).push(target.clone());
        Ok(Box::new(self.clone()))
    }
}
