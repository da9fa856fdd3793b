//! MAC address formatting
//!
//! Switch records, port bindings and the MAC a switch reports about itself all
//! arrive in different spellings. Everything is compared in one canonical form:
//! lowercase, zero-padded hex pairs separated by colons.

use crate::error::ModelError;

/// Canonical form of a textual MAC (`08-00-09-01-02-03`, `0800.0901.0203`, ...)
pub fn normalize_mac(mac: &str) -> Result<String, ModelError> {
    let digits: String = mac
        .trim()
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .collect();
    if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ModelError::InvalidMac(mac.to_string()));
    }
    let lower = digits.to_ascii_lowercase();
    Ok(pairs(&lower))
}

/// Format a 48-bit value as a MAC: `0x080009010203` -> `08:00:09:01:02:03`
pub fn format_mac(value: u64) -> String {
    pairs(&format!("{:012x}", value & 0xffff_ffff_ffff))
}

/// True when both spell the same MAC
pub fn same_mac(a: &str, b: &str) -> bool {
    match (normalize_mac(a), normalize_mac(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn pairs(hex: &str) -> String {
    (0..6)
        .map(|i| &hex[i * 2..i * 2 + 2])
        .collect::<Vec<_>>()
        .join(":")
}
