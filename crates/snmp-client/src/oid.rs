//! Object identifiers

use crate::error::SnmpError;
use std::fmt;
use std::str::FromStr;

/// An SNMP object identifier.
///
/// Ordering is lexicographic over the arcs, which is the order agents walk
/// their MIB in, so an `Oid` can key a `BTreeMap` that answers GETNEXT.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid(Vec<u32>);

impl Oid {
    /// Build an OID from its arcs
    pub fn new(arcs: Vec<u32>) -> Result<Self, SnmpError> {
        match arcs.as_slice() {
            [first, second, ..] if *first <= 2 && (*first == 2 || *second < 40) => Ok(Self(arcs)),
            _ => Err(SnmpError::InvalidOid(
                arcs.iter().map(u32::to_string).collect::<Vec<_>>().join("."),
            )),
        }
    }

    /// Arcs of this OID
    pub fn arcs(&self) -> &[u32] {
        &self.0
    }

    /// OID with one more arc appended (a table instance or column)
    pub fn child(&self, arc: u32) -> Oid {
        let mut arcs = self.0.clone();
        arcs.push(arc);
        Oid(arcs)
    }

    /// True when `prefix` is this OID or one of its ancestors
    pub fn starts_with(&self, prefix: &Oid) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Last arc, usually the instance index of a table cell
    pub fn last_arc(&self) -> Option<u32> {
        self.0.last().copied()
    }
}

impl FromStr for Oid {
    type Err = SnmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('.');
        let arcs = trimmed
            .split('.')
            .map(|arc| arc.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SnmpError::InvalidOid(format!("{s}: {e}")))?;
        Oid::new(arcs).map_err(|_| SnmpError::InvalidOid(s.to_string()))
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut arcs = self.0.iter();
        if let Some(first) = arcs.next() {
            write!(f, "{first}")?;
        }
        for arc in arcs {
            write!(f, ".{arc}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_dotted_text_with_or_without_leading_dot() {
        let a: Oid = "1.3.6.1.2.1.17.7.1.4.3.1.5".parse().unwrap();
        let b: Oid = ".1.3.6.1.2.1.17.7.1.4.3.1.5".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "1.3.6.1.2.1.17.7.1.4.3.1.5");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("".parse::<Oid>().is_err());
        assert!("1".parse::<Oid>().is_err());
        assert!("1.3.x.1".parse::<Oid>().is_err());
        assert!("3.1".parse::<Oid>().is_err());
        assert!("1.40".parse::<Oid>().is_err());
    }

    #[test]
    fn test_child_and_prefix() {
        let base: Oid = "1.3.6.1.2.1.2.2.1.2".parse().unwrap();
        let cell = base.child(17);
        assert!(cell.starts_with(&base));
        assert!(!base.starts_with(&cell));
        assert_eq!(cell.last_arc(), Some(17));
    }

    #[test]
    fn test_orders_like_a_mib_walk() {
        let a: Oid = "1.3.6.1.2.1.2.2.1.1".parse().unwrap();
        let b: Oid = "1.3.6.1.2.1.2.2.1.1.1".parse().unwrap();
        let c: Oid = "1.3.6.1.2.1.2.2.1.2".parse().unwrap();
        assert!(a < b && b < c);
    }
}
