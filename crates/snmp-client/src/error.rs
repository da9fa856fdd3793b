//! SNMP client errors

use thiserror::Error;

/// Errors that can occur when talking to an SNMP agent
#[derive(Debug, Error)]
pub enum SnmpError {
    /// Socket error while sending or receiving a datagram
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No matching response after every retry
    #[error("No response from {target} after {attempts} attempts")]
    Timeout {
        /// Agent address
        target: String,
        /// Number of requests sent
        attempts: u32,
    },

    /// Malformed BER or an unexpected message layout
    #[error("Decode error: {0}")]
    Decode(String),

    /// Agent answered with a non-zero error-status
    #[error("Agent returned {name} (error-status {status}, error-index {index})")]
    Agent {
        /// Raw error-status
        status: i64,
        /// RFC 3416 name of the error-status
        name: &'static str,
        /// Raw error-index
        index: i64,
    },

    /// SNMPv3 security processing failed (report PDU, digest or decryption)
    #[error("USM error: {0}")]
    Security(String),

    /// Text that does not parse as an object identifier
    #[error("Invalid OID: {0}")]
    InvalidOid(String),

    /// Client configuration the agent cannot be spoken to with
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure of a named client operation
    #[error("SNMP {operation} failed: {source}")]
    Operation {
        /// Operation name (`get`, `get_bulk`, `set`, `connect`)
        operation: &'static str,
        /// Underlying error
        #[source]
        source: Box<SnmpError>,
    },
}

impl SnmpError {
    /// Wrap an error with the name of the operation that produced it
    pub fn during(operation: &'static str, source: SnmpError) -> Self {
        match source {
            already @ SnmpError::Operation { .. } => already,
            other => SnmpError::Operation {
                operation,
                source: Box::new(other),
            },
        }
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        SnmpError::Decode(message.into())
    }
}
