//! Basic Encoding Rules, restricted to the subset SNMP uses
//!
//! Only definite lengths and single-byte tags are supported. Encoders append
//! to a caller supplied buffer; the [`Reader`] hands out borrowed slices of
//! the input so callers can locate fields (the SNMPv3 digest) by offset.

use crate::error::SnmpError;
use crate::oid::Oid;

/// Universal and SNMP application tags
pub mod tag {
    /// INTEGER
    pub const INTEGER: u8 = 0x02;
    /// OCTET STRING
    pub const OCTET_STRING: u8 = 0x04;
    /// NULL
    pub const NULL: u8 = 0x05;
    /// OBJECT IDENTIFIER
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    /// SEQUENCE
    pub const SEQUENCE: u8 = 0x30;
    /// IpAddress
    pub const IP_ADDRESS: u8 = 0x40;
    /// Counter32
    pub const COUNTER32: u8 = 0x41;
    /// Gauge32 / Unsigned32
    pub const GAUGE32: u8 = 0x42;
    /// TimeTicks
    pub const TIMETICKS: u8 = 0x43;
    /// Opaque
    pub const OPAQUE: u8 = 0x44;
    /// Counter64
    pub const COUNTER64: u8 = 0x46;
    /// noSuchObject exception
    pub const NO_SUCH_OBJECT: u8 = 0x80;
    /// noSuchInstance exception
    pub const NO_SUCH_INSTANCE: u8 = 0x81;
    /// endOfMibView exception
    pub const END_OF_MIB_VIEW: u8 = 0x82;
}

/// Append a definite length
pub fn push_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let significant = &bytes[skip..];
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}

/// Append a complete tag-length-value
pub fn push_tlv(out: &mut Vec<u8>, tag: u8, content: &[u8]) {
    out.push(tag);
    push_length(out, content.len());
    out.extend_from_slice(content);
}

/// Minimal two's complement content octets of a signed integer
pub fn integer_content(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let next_high_bit = bytes[start + 1] & 0x80;
        let redundant = (bytes[start] == 0x00 && next_high_bit == 0)
            || (bytes[start] == 0xff && next_high_bit != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

/// Content octets of an unsigned application integer (Counter32, Gauge32, Counter64...)
pub fn unsigned_content(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count().min(bytes.len() - 1);
    let mut content = Vec::with_capacity(9);
    if bytes[skip] & 0x80 != 0 {
        content.push(0);
    }
    content.extend_from_slice(&bytes[skip..]);
    content
}

/// Content octets of an object identifier
pub fn oid_content(oid: &Oid) -> Vec<u8> {
    let arcs = oid.arcs();
    let mut content = Vec::with_capacity(arcs.len() + 4);
    // Oid::new guarantees at least two arcs
    let first = u64::from(arcs[0]) * 40 + u64::from(arcs[1]);
    push_subidentifier(&mut content, first);
    for arc in &arcs[2..] {
        push_subidentifier(&mut content, u64::from(*arc));
    }
    content
}

fn push_subidentifier(out: &mut Vec<u8>, mut value: u64) {
    let mut groups = [0u8; 10];
    let mut n = 0;
    loop {
        groups[n] = (value & 0x7f) as u8;
        n += 1;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i == 0 { 0 } else { 0x80 };
        out.push(groups[i] | continuation);
    }
}

/// Decode a signed INTEGER
pub fn decode_integer(content: &[u8]) -> Result<i64, SnmpError> {
    if content.is_empty() || content.len() > 8 {
        return Err(SnmpError::decode(format!(
            "INTEGER of {} octets",
            content.len()
        )));
    }
    let seed: i64 = if content[0] & 0x80 != 0 { -1 } else { 0 };
    Ok(content
        .iter()
        .fold(seed, |acc, b| (acc << 8) | i64::from(*b)))
}

/// Decode an unsigned application integer.
///
/// Values are read as raw magnitude so agents that forget the leading zero
/// on a large Counter32 still decode to the intended number.
pub fn decode_unsigned(content: &[u8]) -> Result<u64, SnmpError> {
    let trimmed = match content {
        [0, rest @ ..] if !rest.is_empty() => rest,
        other => other,
    };
    if content.is_empty() || trimmed.len() > 8 {
        return Err(SnmpError::decode(format!(
            "unsigned integer of {} octets",
            content.len()
        )));
    }
    Ok(trimmed.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Decode an unsigned value that must fit 32 bits
pub fn decode_unsigned32(content: &[u8]) -> Result<u32, SnmpError> {
    let value = decode_unsigned(content)?;
    u32::try_from(value).map_err(|_| SnmpError::decode(format!("{value} overflows 32 bits")))
}

/// Decode OBJECT IDENTIFIER content octets
pub fn decode_oid(content: &[u8]) -> Result<Oid, SnmpError> {
    let mut subidentifiers = Vec::with_capacity(content.len());
    let mut current: u64 = 0;
    let mut pending = false;
    for byte in content {
        if current > (u64::MAX >> 7) {
            return Err(SnmpError::decode("OID sub-identifier overflow"));
        }
        current = (current << 7) | u64::from(byte & 0x7f);
        pending = true;
        if byte & 0x80 == 0 {
            subidentifiers.push(current);
            current = 0;
            pending = false;
        }
    }
    if pending || subidentifiers.is_empty() {
        return Err(SnmpError::decode("truncated OBJECT IDENTIFIER"));
    }

    let first = subidentifiers[0];
    let (a, b) = match first {
        0..=39 => (0, first),
        40..=79 => (1, first - 40),
        _ => (2, first - 80),
    };
    let mut arcs = Vec::with_capacity(subidentifiers.len() + 1);
    arcs.push(a);
    arcs.push(arc32(b)?);
    for sub in &subidentifiers[1..] {
        arcs.push(arc32(*sub)?);
    }
    Oid::new(arcs)
}

fn arc32(value: u64) -> Result<u32, SnmpError> {
    u32::try_from(value).map_err(|_| SnmpError::decode(format!("OID arc {value} overflows 32 bits")))
}

/// Cursor over a sequence of TLVs
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    /// Read TLVs from `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// No bytes left
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read the next TLV, returning its tag and content
    pub fn read_tlv(&mut self) -> Result<(u8, &'a [u8]), SnmpError> {
        let (&tag, rest) = self
            .data
            .split_first()
            .ok_or_else(|| SnmpError::decode("unexpected end of data reading tag"))?;
        let (&first, mut rest) = rest
            .split_first()
            .ok_or_else(|| SnmpError::decode("unexpected end of data reading length"))?;

        let len = if first & 0x80 == 0 {
            usize::from(first)
        } else {
            let octets = usize::from(first & 0x7f);
            if octets == 0 || octets > 4 || rest.len() < octets {
                return Err(SnmpError::decode(format!(
                    "unsupported length form 0x{first:02x}"
                )));
            }
            let (len_bytes, tail) = rest.split_at(octets);
            rest = tail;
            len_bytes
                .iter()
                .fold(0usize, |acc, b| (acc << 8) | usize::from(*b))
        };

        if rest.len() < len {
            return Err(SnmpError::decode(format!(
                "length {len} exceeds the {} remaining octets",
                rest.len()
            )));
        }
        let (content, tail) = rest.split_at(len);
        self.data = tail;
        Ok((tag, content))
    }

    /// Read the next TLV and require a specific tag
    pub fn expect(&mut self, expected: u8, what: &str) -> Result<&'a [u8], SnmpError> {
        let (tag, content) = self.read_tlv()?;
        if tag != expected {
            return Err(SnmpError::decode(format!(
                "expected {what} (tag 0x{expected:02x}), found tag 0x{tag:02x}"
            )));
        }
        Ok(content)
    }

    /// Read an INTEGER
    pub fn read_integer(&mut self, what: &str) -> Result<i64, SnmpError> {
        decode_integer(self.expect(tag::INTEGER, what)?)
    }

    /// Read an OCTET STRING
    pub fn read_octets(&mut self, what: &str) -> Result<&'a [u8], SnmpError> {
        self.expect(tag::OCTET_STRING, what)
    }

    /// Read a SEQUENCE and return a reader over its content
    pub fn read_sequence(&mut self, what: &str) -> Result<Reader<'a>, SnmpError> {
        self.expect(tag::SEQUENCE, what).map(Reader::new)
    }
}

/// Byte offset of `inner` within `outer`, when `inner` was sliced from it
pub(crate) fn offset_within(outer: &[u8], inner: &[u8]) -> Option<usize> {
    let start = outer.as_ptr() as usize;
    let position = inner.as_ptr() as usize;
    (position >= start && position + inner.len() <= start + outer.len()).then(|| position - start)
}
