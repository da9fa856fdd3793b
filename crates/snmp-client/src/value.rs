//! Variable binding values

use crate::ber::{self, tag};
use crate::error::SnmpError;
use crate::oid::Oid;
use std::fmt;
use std::net::Ipv4Addr;

/// Value carried in a variable binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// INTEGER (also used for enumerations such as RowStatus)
    Integer(i64),
    /// OCTET STRING
    OctetString(Vec<u8>),
    /// NULL, the placeholder value of every read request
    Null,
    /// OBJECT IDENTIFIER
    ObjectIdentifier(Oid),
    /// IpAddress
    IpAddress(Ipv4Addr),
    /// Counter32
    Counter32(u32),
    /// Gauge32 / Unsigned32
    Gauge32(u32),
    /// TimeTicks (hundredths of a second)
    TimeTicks(u32),
    /// Opaque
    Opaque(Vec<u8>),
    /// Counter64
    Counter64(u64),
    /// The agent does not implement the object
    NoSuchObject,
    /// The object exists but this instance does not
    NoSuchInstance,
    /// Walked past the last object of the agent's view
    EndOfMibView,
}

impl Value {
    /// True for the v2c exception values that stand in for a missing object
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }

    /// Numeric value of any integer-like variant
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => Some(i64::from(*v)),
            Value::Counter64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Raw octets of an OCTET STRING or Opaque
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::OctetString(bytes) | Value::Opaque(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// OCTET STRING rendered as text, lossily
    pub fn to_text(&self) -> Option<String> {
        self.as_bytes()
            .map(|bytes| String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string())
    }

    /// Append the TLV for this value
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Value::Integer(v) => ber::push_tlv(out, tag::INTEGER, &ber::integer_content(*v)),
            Value::OctetString(bytes) => ber::push_tlv(out, tag::OCTET_STRING, bytes),
            Value::Null => ber::push_tlv(out, tag::NULL, &[]),
            Value::ObjectIdentifier(oid) => {
                ber::push_tlv(out, tag::OBJECT_IDENTIFIER, &ber::oid_content(oid));
            }
            Value::IpAddress(addr) => ber::push_tlv(out, tag::IP_ADDRESS, &addr.octets()),
            Value::Counter32(v) => {
                ber::push_tlv(out, tag::COUNTER32, &ber::unsigned_content(u64::from(*v)));
            }
            Value::Gauge32(v) => ber::push_tlv(out, tag::GAUGE32, &ber::unsigned_content(u64::from(*v))),
            Value::TimeTicks(v) => {
                ber::push_tlv(out, tag::TIMETICKS, &ber::unsigned_content(u64::from(*v)));
            }
            Value::Opaque(bytes) => ber::push_tlv(out, tag::OPAQUE, bytes),
            Value::Counter64(v) => ber::push_tlv(out, tag::COUNTER64, &ber::unsigned_content(*v)),
            Value::NoSuchObject => ber::push_tlv(out, tag::NO_SUCH_OBJECT, &[]),
            Value::NoSuchInstance => ber::push_tlv(out, tag::NO_SUCH_INSTANCE, &[]),
            Value::EndOfMibView => ber::push_tlv(out, tag::END_OF_MIB_VIEW, &[]),
        }
    }

    /// Decode a value from its tag and content octets
    pub fn decode(value_tag: u8, content: &[u8]) -> Result<Value, SnmpError> {
        let value = match value_tag {
            tag::INTEGER => Value::Integer(ber::decode_integer(content)?),
            tag::OCTET_STRING => Value::OctetString(content.to_vec()),
            tag::NULL => Value::Null,
            tag::OBJECT_IDENTIFIER => Value::ObjectIdentifier(ber::decode_oid(content)?),
            tag::IP_ADDRESS => {
                let octets: [u8; 4] = content.try_into().map_err(|_| {
                    SnmpError::decode(format!("IpAddress of {} octets", content.len()))
                })?;
                Value::IpAddress(Ipv4Addr::from(octets))
            }
            tag::COUNTER32 => Value::Counter32(ber::decode_unsigned32(content)?),
            tag::GAUGE32 => Value::Gauge32(ber::decode_unsigned32(content)?),
            tag::TIMETICKS => Value::TimeTicks(ber::decode_unsigned32(content)?),
            tag::OPAQUE => Value::Opaque(content.to_vec()),
            tag::COUNTER64 => Value::Counter64(ber::decode_unsigned(content)?),
            tag::NO_SUCH_OBJECT => Value::NoSuchObject,
            tag::NO_SUCH_INSTANCE => Value::NoSuchInstance,
            tag::END_OF_MIB_VIEW => Value::EndOfMibView,
            other => {
                return Err(SnmpError::decode(format!("unknown value tag 0x{other:02x}")));
            }
        };
        Ok(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::OctetString(bytes) | Value::Opaque(bytes) => {
                if !bytes.is_empty() && bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
                    write!(f, "{}", String::from_utf8_lossy(bytes))
                } else {
                    write!(f, "0x")?;
                    bytes.iter().try_for_each(|b| write!(f, "{b:02x}"))
                }
            }
            Value::Null => write!(f, "NULL"),
            Value::ObjectIdentifier(oid) => write!(f, "{oid}"),
            Value::IpAddress(addr) => write!(f, "{addr}"),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => write!(f, "{v}"),
            Value::Counter64(v) => write!(f, "{v}"),
            Value::NoSuchObject => write!(f, "noSuchObject"),
            Value::NoSuchInstance => write!(f, "noSuchInstance"),
            Value::EndOfMibView => write!(f, "endOfMibView"),
        }
    }
}

/// An OID and its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarBind {
    /// Object instance
    pub oid: Oid,
    /// Value, `Null` in read requests
    pub value: Value,
}

impl VarBind {
    /// Binding with a value
    pub fn new(oid: Oid, value: Value) -> Self {
        Self { oid, value }
    }

    /// Binding for a read request
    pub fn null(oid: Oid) -> Self {
        Self { oid, value: Value::Null }
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        let mut content = Vec::new();
        ber::push_tlv(&mut content, tag::OBJECT_IDENTIFIER, &ber::oid_content(&self.oid));
        self.value.encode(&mut content);
        ber::push_tlv(out, tag::SEQUENCE, &content);
    }

    pub(crate) fn decode(content: &[u8]) -> Result<VarBind, SnmpError> {
        let mut reader = ber::Reader::new(content);
        let oid = ber::decode_oid(reader.expect(tag::OBJECT_IDENTIFIER, "varbind name")?)?;
        let (value_tag, value_content) = reader.read_tlv()?;
        Ok(VarBind {
            oid,
            value: Value::decode(value_tag, value_content)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_exceptions_and_application_types() {
        assert_eq!(Value::decode(tag::NO_SUCH_INSTANCE, &[]).unwrap(), Value::NoSuchInstance);
        assert!(Value::decode(tag::NO_SUCH_OBJECT, &[]).unwrap().is_exception());
        assert_eq!(
            Value::decode(tag::IP_ADDRESS, &[10, 0, 0, 1]).unwrap(),
            Value::IpAddress(Ipv4Addr::new(10, 0, 0, 1))
        );
        assert!(Value::decode(tag::IP_ADDRESS, &[10, 0, 1]).is_err());
        assert_eq!(
            Value::decode(tag::COUNTER32, &[0x00, 0xff, 0xff, 0xff, 0xff]).unwrap(),
            Value::Counter32(u32::MAX)
        );
        assert!(Value::decode(0x47, &[]).is_err());
    }

    #[test]
    fn test_row_status_create_and_go_encodes_as_integer_four() {
        let mut out = Vec::new();
        Value::Integer(4).encode(&mut out);
        assert_eq!(out, vec![0x02, 0x01, 0x04]);
    }

    #[test]
    fn test_display_prefers_text_then_hex() {
        assert_eq!(Value::OctetString(b"GigabitEthernet1/0/1".to_vec()).to_string(), "GigabitEthernet1/0/1");
        assert_eq!(Value::OctetString(vec![0x80, 0x00]).to_string(), "0x8000");
        assert_eq!(Value::Integer(-3).as_i64(), Some(-3));
        assert_eq!(Value::Null.as_i64(), None);
    }
}
