//! VLAN egress-port bitmap
//!
//! `dot1qVlanStaticEgressPorts` is an octet string with one bit per
//! interface: interface `i` lives in byte `(i - 1) / 8`, most significant bit
//! first, so ifindex 1 is `0x80` of byte 0 and ifindex 8 is `0x01` of byte 0.

use crate::error::DriverError;

/// Byte offset and bit mask of an interface inside the bitmap
pub fn bit_position(ifindex: u32) -> Result<(usize, u8), DriverError> {
    if ifindex == 0 {
        return Err(DriverError::InvalidPort("ifindex 0 has no egress bit".to_string()));
    }
    let byte_index = ((ifindex - 1) / 8) as usize;
    let bit_index = match ifindex % 8 {
        0 => 8,
        bit => bit,
    };
    Ok((byte_index, 0x80 >> (bit_index - 1)))
}

/// Egress-port membership of one VLAN as read from the switch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EgressPortList {
    bytes: Vec<u8>,
}

impl EgressPortList {
    /// Wrap the octet string read from the device
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// Octet string to write back
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Take the octet string
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Add an interface, zero-extending a short bitmap
    pub fn set(&mut self, ifindex: u32) -> Result<(), DriverError> {
        let (byte_index, mask) = bit_position(ifindex)?;
        if self.bytes.len() <= byte_index {
            self.bytes.resize(byte_index + 1, 0);
        }
        self.bytes[byte_index] |= mask;
        Ok(())
    }

    /// Remove an interface; a bitmap too short to hold it is left alone
    pub fn clear(&mut self, ifindex: u32) -> Result<(), DriverError> {
        let (byte_index, mask) = bit_position(ifindex)?;
        if let Some(byte) = self.bytes.get_mut(byte_index) {
            *byte &= !mask;
        }
        Ok(())
    }

    /// True when the interface is a member
    #[cfg(test)]
    pub fn contains(&self, ifindex: u32) -> bool {
        bit_position(ifindex)
            .ok()
            .and_then(|(byte_index, mask)| self.bytes.get(byte_index).map(|byte| byte & mask != 0))
            .unwrap_or(false)
    }

    /// Member interfaces in ascending order
    #[cfg(test)]
    pub fn members(&self) -> Vec<u32> {
        let mut members = Vec::new();
        for (byte_index, byte) in self.bytes.iter().enumerate() {
            for bit in 0..8u32 {
                if byte & (0x80 >> bit) != 0 {
                    members.push(byte_index as u32 * 8 + bit + 1);
                }
            }
        }
        members
    }
}
