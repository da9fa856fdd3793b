//! Protocol data units and community (v1/v2c) messages

use crate::ber::{self, tag, Reader};
use crate::error::SnmpError;
use crate::oid::Oid;
use crate::value::VarBind;

/// msgVersion of SNMPv1
pub const VERSION_1: i64 = 0;
/// msgVersion of SNMPv2c
pub const VERSION_2C: i64 = 1;
/// msgVersion of SNMPv3
pub const VERSION_3: i64 = 3;

/// PDU kinds a manager sends or receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduType {
    /// GetRequest-PDU
    Get,
    /// GetNextRequest-PDU
    GetNext,
    /// Response-PDU
    Response,
    /// SetRequest-PDU
    Set,
    /// GetBulkRequest-PDU
    GetBulk,
    /// Report-PDU
    Report,
}

impl PduType {
    /// Context-specific constructed tag
    pub fn tag(self) -> u8 {
        match self {
            PduType::Get => 0xa0,
            PduType::GetNext => 0xa1,
            PduType::Response => 0xa2,
            PduType::Set => 0xa3,
            PduType::GetBulk => 0xa5,
            PduType::Report => 0xa8,
        }
    }

    /// Inverse of [`PduType::tag`]
    pub fn from_tag(value: u8) -> Option<Self> {
        match value {
            0xa0 => Some(PduType::Get),
            0xa1 => Some(PduType::GetNext),
            0xa2 => Some(PduType::Response),
            0xa3 => Some(PduType::Set),
            0xa5 => Some(PduType::GetBulk),
            0xa8 => Some(PduType::Report),
            _ => None,
        }
    }
}

/// A PDU.
///
/// For GETBULK the two status fields carry non-repeaters and
/// max-repetitions instead, as on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    /// PDU kind
    pub pdu_type: PduType,
    /// request-id
    pub request_id: i32,
    /// error-status, or non-repeaters
    pub error_status: i64,
    /// error-index, or max-repetitions
    pub error_index: i64,
    /// variable-bindings
    pub varbinds: Vec<VarBind>,
}

impl Pdu {
    /// GetRequest for `oids`
    pub fn get(request_id: i32, oids: &[Oid]) -> Self {
        Self::read(PduType::Get, request_id, oids)
    }

    /// GetNextRequest for `oids`
    pub fn get_next(request_id: i32, oids: &[Oid]) -> Self {
        Self::read(PduType::GetNext, request_id, oids)
    }

    /// GetBulkRequest for `oids`
    pub fn get_bulk(request_id: i32, non_repeaters: i64, max_repetitions: i64, oids: &[Oid]) -> Self {
        Self {
            pdu_type: PduType::GetBulk,
            request_id,
            error_status: non_repeaters,
            error_index: max_repetitions,
            varbinds: oids.iter().cloned().map(VarBind::null).collect(),
        }
    }

    /// SetRequest carrying `varbinds`
    pub fn set(request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Self {
            pdu_type: PduType::Set,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds,
        }
    }

    fn read(pdu_type: PduType, request_id: i32, oids: &[Oid]) -> Self {
        Self {
            pdu_type,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds: oids.iter().cloned().map(VarBind::null).collect(),
        }
    }

    /// Append the PDU TLV
    pub fn encode(&self, out: &mut Vec<u8>) {
        let mut body = Vec::new();
        ber::push_tlv(&mut body, tag::INTEGER, &ber::integer_content(i64::from(self.request_id)));
        ber::push_tlv(&mut body, tag::INTEGER, &ber::integer_content(self.error_status));
        ber::push_tlv(&mut body, tag::INTEGER, &ber::integer_content(self.error_index));
        let mut list = Vec::new();
        for varbind in &self.varbinds {
            varbind.encode(&mut list);
        }
        ber::push_tlv(&mut body, tag::SEQUENCE, &list);
        ber::push_tlv(out, self.pdu_type.tag(), &body);
    }

    /// Decode the next TLV of `reader` as a PDU
    pub fn read_from(reader: &mut Reader<'_>) -> Result<Pdu, SnmpError> {
        let (pdu_tag, content) = reader.read_tlv()?;
        let pdu_type = PduType::from_tag(pdu_tag)
            .ok_or_else(|| SnmpError::decode(format!("unexpected PDU tag 0x{pdu_tag:02x}")))?;

        let mut body = Reader::new(content);
        let raw_id = body.read_integer("request-id")?;
        let request_id = i32::try_from(raw_id)
            .map_err(|_| SnmpError::decode(format!("request-id {raw_id} out of range")))?;
        let error_status = body.read_integer("error-status")?;
        let error_index = body.read_integer("error-index")?;

        let mut list = body.read_sequence("variable-bindings")?;
        let mut varbinds = Vec::new();
        while !list.is_empty() {
            varbinds.push(VarBind::decode(list.expect(tag::SEQUENCE, "varbind")?)?);
        }

        Ok(Pdu {
            pdu_type,
            request_id,
            error_status,
            error_index,
            varbinds,
        })
    }

    /// Turn a non-zero error-status into an error
    pub fn check_error(&self) -> Result<(), SnmpError> {
        if self.error_status == 0 {
            return Ok(());
        }
        Err(SnmpError::Agent {
            status: self.error_status,
            name: error_status_name(self.error_status),
            index: self.error_index,
        })
    }
}

/// error-status 2, the v1 way of saying an object does not exist
pub const NO_SUCH_NAME: i64 = 2;

/// RFC 3416 name of an error-status value
pub fn error_status_name(status: i64) -> &'static str {
    match status {
        0 => "noError",
        1 => "tooBig",
        2 => "noSuchName",
        3 => "badValue",
        4 => "readOnly",
        5 => "genErr",
        6 => "noAccess",
        7 => "wrongType",
        8 => "wrongLength",
        9 => "wrongEncoding",
        10 => "wrongValue",
        11 => "noCreation",
        12 => "inconsistentValue",
        13 => "resourceUnavailable",
        14 => "commitFailed",
        15 => "undoFailed",
        16 => "authorizationError",
        17 => "notWritable",
        18 => "inconsistentName",
        _ => "unknownError",
    }
}

/// A decoded v1/v2c message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityMessage {
    /// msgVersion (0 or 1)
    pub version: i64,
    /// Community string
    pub community: Vec<u8>,
    /// Payload
    pub pdu: Pdu,
}

impl CommunityMessage {
    /// Encode `SEQUENCE { version, community, pdu }`
    pub fn encode(&self) -> Vec<u8> {
        let mut content = Vec::new();
        ber::push_tlv(&mut content, tag::INTEGER, &ber::integer_content(self.version));
        ber::push_tlv(&mut content, tag::OCTET_STRING, &self.community);
        self.pdu.encode(&mut content);
        let mut out = Vec::with_capacity(content.len() + 4);
        ber::push_tlv(&mut out, tag::SEQUENCE, &content);
        out
    }

    /// Decode a received datagram
    pub fn decode(data: &[u8]) -> Result<CommunityMessage, SnmpError> {
        let mut outer = Reader::new(data);
        let mut message = outer.read_sequence("message")?;
        let version = message.read_integer("msgVersion")?;
        if version != VERSION_1 && version != VERSION_2C {
            return Err(SnmpError::decode(format!("unexpected msgVersion {version}")));
        }
        let community = message.read_octets("community")?.to_vec();
        let pdu = Pdu::read_from(&mut message)?;
        Ok(CommunityMessage {
            version,
            community,
            pdu,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_encodes_a_v2c_get_byte_for_byte() {
        let oid: Oid = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        let message = CommunityMessage {
            version: VERSION_2C,
            community: b"public".to_vec(),
            pdu: Pdu::get(1, &[oid]),
        };
        let expected: Vec<u8> = vec![
            0x30, 0x26, 0x02, 0x01, 0x01, 0x04, 0x06, b'p', b'u', b'b', b'l', b'i', b'c', 0xa0,
            0x19, 0x02, 0x01, 0x01, 0x02, 0x01, 0x00, 0x02, 0x01, 0x00, 0x30, 0x0e, 0x30, 0x0c,
            0x06, 0x08, 0x2b, 0x06, 0x01, 0x02, 0x01, 0x01, 0x01, 0x00, 0x05, 0x00,
        ];
        assert_eq!(message.encode(), expected);
        assert_eq!(CommunityMessage::decode(&expected).unwrap(), message);
    }

    #[test]
    fn test_set_response_with_error_status_is_reported() {
        let oid: Oid = "1.3.6.1.2.1.17.7.1.4.3.1.5.100".parse().unwrap();
        let mut pdu = Pdu::set(7, vec![VarBind::new(oid, Value::Integer(4))]);
        pdu.pdu_type = PduType::Response;
        pdu.error_status = 17;
        pdu.error_index = 1;
        let err = pdu.check_error().unwrap_err();
        assert!(err.to_string().contains("notWritable"), "{err}");
    }

    #[test]
    fn test_rejects_v3_in_community_decoder() {
        let message = CommunityMessage {
            version: VERSION_3,
            community: Vec::new(),
            pdu: Pdu::get(1, &[]),
        };
        assert!(CommunityMessage::decode(&message.encode()).is_err());
    }
}
