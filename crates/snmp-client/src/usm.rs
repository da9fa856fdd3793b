//! SNMPv3 User-based Security Model
//!
//! Implements the parts of RFC 3414 and RFC 3826 a command generator needs:
//! password to key conversion and localization, HMAC-MD5-96 / HMAC-SHA-96
//! authentication, CBC-DES, 3DES-EDE and AES-CFB128 privacy, engine discovery
//! and the scoped PDU framing of a v3 message.
//!
//! AES-192/256 keys are extended the way most agents do it (Blumenthal draft),
//! 3DES keys with the Reeder draft algorithm.

use crate::ber::{self, tag, Reader};
use crate::error::SnmpError;
use crate::message::{Pdu, VERSION_3};
use crate::oid::Oid;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{AsyncStreamCipher, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::{Digest, Sha1};
use std::fmt;
use std::time::Instant;

/// msgFlags authFlag
pub const FLAG_AUTH: u8 = 0x01;
/// msgFlags privFlag
pub const FLAG_PRIV: u8 = 0x02;
/// msgFlags reportableFlag
pub const FLAG_REPORTABLE: u8 = 0x04;

/// msgSecurityModel of USM
const SECURITY_MODEL_USM: i64 = 3;
/// Largest message this client accepts (fits in one UDP datagram)
const MAX_MESSAGE_SIZE: i64 = 65507;
/// Length of the truncated HMAC carried in msgAuthenticationParameters
const AUTH_PARAMS_LEN: usize = 12;
/// Octets of repeated password hashed by the password-to-key algorithm
const PASSWORD_EXPANSION: usize = 1_048_576;

/// Authentication protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthProtocol {
    /// usmHMACMD5AuthProtocol
    Md5,
    /// usmHMACSHAAuthProtocol
    Sha1,
}

/// Privacy protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrivProtocol {
    /// usmDESPrivProtocol (CBC-DES)
    Des,
    /// usm3DESEDEPrivProtocol
    TripleDes,
    /// usmAesCfb128Protocol
    Aes128,
    /// AES-192 in CFB mode
    Aes192,
    /// AES-256 in CFB mode
    Aes256,
}

impl AuthProtocol {
    /// Digest length of the underlying hash
    pub fn digest_len(self) -> usize {
        match self {
            AuthProtocol::Md5 => 16,
            AuthProtocol::Sha1 => 20,
        }
    }

    /// RFC 3414 A.2 password to key conversion
    pub fn password_to_key(self, password: &[u8]) -> Result<Vec<u8>, SnmpError> {
        if password.is_empty() {
            return Err(SnmpError::Config("empty USM password".to_string()));
        }
        Ok(match self {
            AuthProtocol::Md5 => expand_password::<Md5>(password),
            AuthProtocol::Sha1 => expand_password::<Sha1>(password),
        })
    }

    /// Localize a master key to one authoritative engine: `H(Ku || engineID || Ku)`
    pub fn localize_key(self, key: &[u8], engine_id: &[u8]) -> Vec<u8> {
        self.hash(&[key, engine_id, key])
    }

    /// Password to localized key in one step
    pub fn localized_key(self, password: &[u8], engine_id: &[u8]) -> Result<Vec<u8>, SnmpError> {
        Ok(self.localize_key(&self.password_to_key(password)?, engine_id))
    }

    fn hash(self, parts: &[&[u8]]) -> Vec<u8> {
        match self {
            AuthProtocol::Md5 => digest_parts::<Md5>(parts),
            AuthProtocol::Sha1 => digest_parts::<Sha1>(parts),
        }
    }

    fn sign(self, key: &[u8], data: &[u8]) -> Result<[u8; AUTH_PARAMS_LEN], SnmpError> {
        let full = match self {
            AuthProtocol::Md5 => {
                let mut mac = Hmac::<Md5>::new_from_slice(key).map_err(|e| invalid_key("HMAC-MD5", e))?;
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            AuthProtocol::Sha1 => {
                let mut mac = Hmac::<Sha1>::new_from_slice(key).map_err(|e| invalid_key("HMAC-SHA", e))?;
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        };
        let mut truncated = [0u8; AUTH_PARAMS_LEN];
        truncated.copy_from_slice(&full[..AUTH_PARAMS_LEN]);
        Ok(truncated)
    }

    fn verify(self, key: &[u8], data: &[u8], received: &[u8]) -> Result<(), SnmpError> {
        let outcome = match self {
            AuthProtocol::Md5 => {
                let mut mac = Hmac::<Md5>::new_from_slice(key).map_err(|e| invalid_key("HMAC-MD5", e))?;
                mac.update(data);
                mac.verify_truncated_left(received)
            }
            AuthProtocol::Sha1 => {
                let mut mac = Hmac::<Sha1>::new_from_slice(key).map_err(|e| invalid_key("HMAC-SHA", e))?;
                mac.update(data);
                mac.verify_truncated_left(received)
            }
        };
        outcome.map_err(|_| SnmpError::Security("wrong digest on incoming message".to_string()))
    }
}

impl PrivProtocol {
    /// Octets of localized key material the cipher consumes (key plus pre-IV for CBC modes)
    pub fn key_len(self) -> usize {
        match self {
            PrivProtocol::Des | PrivProtocol::Aes128 => 16,
            PrivProtocol::Aes192 => 24,
            PrivProtocol::TripleDes | PrivProtocol::Aes256 => 32,
        }
    }

    fn is_cbc(self) -> bool {
        matches!(self, PrivProtocol::Des | PrivProtocol::TripleDes)
    }
}

fn expand_password<D: Digest>(password: &[u8]) -> Vec<u8> {
    let mut hasher = D::new();
    let mut block = [0u8; 64];
    let mut index = 0usize;
    for _ in 0..PASSWORD_EXPANSION / block.len() {
        for byte in &mut block {
            *byte = password[index % password.len()];
            index += 1;
        }
        hasher.update(block);
    }
    hasher.finalize().to_vec()
}

fn digest_parts<D: Digest>(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = D::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

fn invalid_key(cipher: &str, e: impl fmt::Display) -> SnmpError {
    SnmpError::Security(format!("{cipher} key rejected: {e}"))
}

/// An SNMPv3 user as configured on the agent
#[derive(Clone, PartialEq, Eq)]
pub struct UsmUser {
    /// msgUserName
    pub security_name: String,
    /// Authentication protocol and passphrase
    pub auth: Option<(AuthProtocol, String)>,
    /// Privacy protocol and passphrase
    pub privacy: Option<(PrivProtocol, String)>,
}

impl fmt::Debug for UsmUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsmUser")
            .field("security_name", &self.security_name)
            .field("auth", &self.auth.as_ref().map(|(p, _)| p))
            .field("privacy", &self.privacy.as_ref().map(|(p, _)| p))
            .finish()
    }
}

impl UsmUser {
    /// msgFlags for requests sent as this user
    pub fn flags(&self) -> u8 {
        let mut flags = FLAG_REPORTABLE;
        if self.auth.is_some() {
            flags |= FLAG_AUTH;
        }
        if self.privacy.is_some() {
            flags |= FLAG_PRIV;
        }
        flags
    }

    /// Reject combinations USM cannot express
    pub fn validate(&self) -> Result<(), SnmpError> {
        if self.security_name.is_empty() {
            return Err(SnmpError::Config("empty security name".to_string()));
        }
        if self.privacy.is_some() && self.auth.is_none() {
            return Err(SnmpError::Config(
                "privacy requires an authentication protocol".to_string(),
            ));
        }
        let short = |secret: &str| secret.len() < 8;
        if self.auth.as_ref().is_some_and(|(_, key)| short(key))
            || self.privacy.as_ref().is_some_and(|(_, key)| short(key))
        {
            return Err(SnmpError::Config(
                "USM passphrases must be at least 8 characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// Keys of one user localized to one engine
#[derive(Clone)]
pub struct LocalizedKeys {
    auth: Option<(AuthProtocol, Vec<u8>)>,
    privacy: Option<(PrivProtocol, Vec<u8>)>,
}

impl fmt::Debug for LocalizedKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalizedKeys")
            .field("auth", &self.auth.as_ref().map(|(p, _)| p))
            .field("privacy", &self.privacy.as_ref().map(|(p, _)| p))
            .finish_non_exhaustive()
    }
}

impl LocalizedKeys {
    /// Derive the user's keys for `engine_id`
    pub fn derive(user: &UsmUser, engine_id: &[u8]) -> Result<Self, SnmpError> {
        user.validate()?;
        let auth = match &user.auth {
            Some((protocol, password)) => Some((
                *protocol,
                protocol.localized_key(password.as_bytes(), engine_id)?,
            )),
            None => None,
        };
        let privacy = match (&user.privacy, &user.auth) {
            (Some((privacy, password)), Some((auth, _))) => {
                let key = auth.localized_key(password.as_bytes(), engine_id)?;
                Some((*privacy, extend_key(*auth, *privacy, key, engine_id)?))
            }
            _ => None,
        };
        Ok(Self { auth, privacy })
    }

    /// Keys for the unauthenticated discovery exchange
    pub fn none() -> Self {
        Self {
            auth: None,
            privacy: None,
        }
    }
}

/// Stretch or cut a localized key to the length the privacy cipher needs
fn extend_key(
    auth: AuthProtocol,
    privacy: PrivProtocol,
    mut key: Vec<u8>,
    engine_id: &[u8],
) -> Result<Vec<u8>, SnmpError> {
    let needed = privacy.key_len();
    while key.len() < needed {
        let next = if privacy == PrivProtocol::TripleDes {
            let last = key[key.len() - auth.digest_len()..].to_vec();
            auth.localized_key(&last, engine_id)?
        } else {
            auth.hash(&[&key])
        };
        key.extend_from_slice(&next);
    }
    key.truncate(needed);
    Ok(key)
}

/// Authoritative engine identity and clock as last learned from the agent
#[derive(Debug, Clone)]
pub struct EngineState {
    /// msgAuthoritativeEngineID
    pub engine_id: Vec<u8>,
    /// msgAuthoritativeEngineBoots
    pub boots: u32,
    /// msgAuthoritativeEngineTime when learned
    pub time: u32,
    learned_at: Instant,
}

impl EngineState {
    /// Record engine parameters received now
    pub fn new(engine_id: Vec<u8>, boots: u32, time: u32) -> Self {
        Self {
            engine_id,
            boots,
            time,
            learned_at: Instant::now(),
        }
    }

    /// Engine time as estimated from the local clock
    pub fn estimated_time(&self) -> u32 {
        let elapsed = u32::try_from(self.learned_at.elapsed().as_secs()).unwrap_or(u32::MAX);
        self.time.saturating_add(elapsed)
    }
}

/// UsmSecurityParameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityParameters {
    /// msgAuthoritativeEngineID
    pub engine_id: Vec<u8>,
    /// msgAuthoritativeEngineBoots
    pub boots: u32,
    /// msgAuthoritativeEngineTime
    pub time: u32,
    /// msgUserName
    pub user_name: Vec<u8>,
    /// msgAuthenticationParameters
    pub auth_params: Vec<u8>,
    /// msgPrivacyParameters
    pub priv_params: Vec<u8>,
}

impl SecurityParameters {
    /// Encoded SEQUENCE plus the offset of the authentication parameter content in it
    fn encode(&self) -> (Vec<u8>, usize) {
        let mut content = Vec::new();
        ber::push_tlv(&mut content, tag::OCTET_STRING, &self.engine_id);
        ber::push_tlv(&mut content, tag::INTEGER, &ber::integer_content(i64::from(self.boots)));
        ber::push_tlv(&mut content, tag::INTEGER, &ber::integer_content(i64::from(self.time)));
        ber::push_tlv(&mut content, tag::OCTET_STRING, &self.user_name);
        ber::push_tlv(&mut content, tag::OCTET_STRING, &self.auth_params);
        let auth_offset = content.len() - self.auth_params.len();
        ber::push_tlv(&mut content, tag::OCTET_STRING, &self.priv_params);

        let mut out = Vec::with_capacity(content.len() + 4);
        ber::push_tlv(&mut out, tag::SEQUENCE, &content);
        let header = out.len() - content.len();
        (out, header + auth_offset)
    }

    fn decode(bytes: &[u8]) -> Result<(Self, &[u8]), SnmpError> {
        let mut outer = Reader::new(bytes);
        let mut seq = outer.read_sequence("UsmSecurityParameters")?;
        let engine_id = seq.read_octets("msgAuthoritativeEngineID")?.to_vec();
        let boots = clock_value(seq.read_integer("msgAuthoritativeEngineBoots")?)?;
        let time = clock_value(seq.read_integer("msgAuthoritativeEngineTime")?)?;
        let user_name = seq.read_octets("msgUserName")?.to_vec();
        let auth_slice = seq.read_octets("msgAuthenticationParameters")?;
        let priv_params = seq.read_octets("msgPrivacyParameters")?.to_vec();
        Ok((
            Self {
                engine_id,
                boots,
                time,
                user_name,
                auth_params: auth_slice.to_vec(),
                priv_params,
            },
            auth_slice,
        ))
    }
}

fn clock_value(value: i64) -> Result<u32, SnmpError> {
    u32::try_from(value).map_err(|_| SnmpError::decode(format!("engine clock value {value} out of range")))
}

/// Why an agent answered with a Report-PDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsmReport {
    /// usmStatsUnsupportedSecLevels
    UnsupportedSecLevel,
    /// usmStatsNotInTimeWindows
    NotInTimeWindow,
    /// usmStatsUnknownUserNames
    UnknownUserName,
    /// usmStatsUnknownEngineIDs
    UnknownEngineId,
    /// usmStatsWrongDigests
    WrongDigest,
    /// usmStatsDecryptionErrors
    DecryptionError,
    /// Any other report counter
    Other(Oid),
}

impl UsmReport {
    /// Classify a Report-PDU by its first variable binding
    pub fn from_pdu(pdu: &Pdu) -> Option<Self> {
        let oid = &pdu.varbinds.first()?.oid;
        let usm_stats = Oid::new(vec![1, 3, 6, 1, 6, 3, 15, 1, 1]).ok()?;
        if !oid.starts_with(&usm_stats) {
            return Some(UsmReport::Other(oid.clone()));
        }
        Some(match oid.arcs().get(usm_stats.arcs().len()) {
            Some(1) => UsmReport::UnsupportedSecLevel,
            Some(2) => UsmReport::NotInTimeWindow,
            Some(3) => UsmReport::UnknownUserName,
            Some(4) => UsmReport::UnknownEngineId,
            Some(5) => UsmReport::WrongDigest,
            Some(6) => UsmReport::DecryptionError,
            _ => UsmReport::Other(oid.clone()),
        })
    }
}

impl fmt::Display for UsmReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsmReport::UnsupportedSecLevel => write!(f, "unsupported security level"),
            UsmReport::NotInTimeWindow => write!(f, "not in time window"),
            UsmReport::UnknownUserName => write!(f, "unknown user name"),
            UsmReport::UnknownEngineId => write!(f, "unknown engine id"),
            UsmReport::WrongDigest => write!(f, "wrong digest (check the authentication key)"),
            UsmReport::DecryptionError => write!(f, "decryption error (check the privacy key)"),
            UsmReport::Other(oid) => write!(f, "report {oid}"),
        }
    }
}

/// A decoded v3 message
#[derive(Debug, Clone)]
pub struct V3Message {
    /// msgID
    pub msg_id: i32,
    /// msgFlags
    pub flags: u8,
    /// Security parameters as received
    pub security: SecurityParameters,
    /// contextEngineID of the scoped PDU
    pub context_engine_id: Vec<u8>,
    /// Payload
    pub pdu: Pdu,
}

/// Engine discovery request: noAuthNoPriv, reportable, empty engine and user
pub fn encode_discovery(msg_id: i32, request_id: i32) -> Result<Vec<u8>, SnmpError> {
    let scoped = scoped_pdu(&[], &Pdu::get(request_id, &[]));
    encode_message(
        msg_id,
        FLAG_REPORTABLE,
        &SecurityParameters::default(),
        &scoped,
        None,
    )
}

/// Authenticated and, if configured, encrypted request
pub fn encode_request(
    msg_id: i32,
    user: &UsmUser,
    keys: &LocalizedKeys,
    engine: &EngineState,
    salt: u64,
    pdu: &Pdu,
) -> Result<Vec<u8>, SnmpError> {
    let time = engine.estimated_time();
    let scoped = scoped_pdu(&engine.engine_id, pdu);

    let (msg_data, priv_params) = match &keys.privacy {
        Some((protocol, key)) => {
            let (ciphertext, priv_params) = encrypt(*protocol, key, engine.boots, time, salt, &scoped)?;
            let mut data = Vec::with_capacity(ciphertext.len() + 4);
            ber::push_tlv(&mut data, tag::OCTET_STRING, &ciphertext);
            (data, priv_params)
        }
        None => (scoped, Vec::new()),
    };

    let security = SecurityParameters {
        engine_id: engine.engine_id.clone(),
        boots: engine.boots,
        time,
        user_name: user.security_name.as_bytes().to_vec(),
        auth_params: if keys.auth.is_some() {
            vec![0; AUTH_PARAMS_LEN]
        } else {
            Vec::new()
        },
        priv_params,
    };
    let mut flags = FLAG_REPORTABLE;
    if keys.auth.is_some() {
        flags |= FLAG_AUTH;
    }
    if keys.privacy.is_some() {
        flags |= FLAG_PRIV;
    }
    let auth = keys.auth.as_ref().map(|(protocol, key)| (*protocol, key.as_slice()));
    encode_message(msg_id, flags, &security, &msg_data, auth)
}

fn scoped_pdu(context_engine_id: &[u8], pdu: &Pdu) -> Vec<u8> {
    let mut content = Vec::new();
    ber::push_tlv(&mut content, tag::OCTET_STRING, context_engine_id);
    ber::push_tlv(&mut content, tag::OCTET_STRING, &[]);
    pdu.encode(&mut content);
    let mut out = Vec::with_capacity(content.len() + 4);
    ber::push_tlv(&mut out, tag::SEQUENCE, &content);
    out
}

fn encode_message(
    msg_id: i32,
    flags: u8,
    security: &SecurityParameters,
    msg_data: &[u8],
    auth: Option<(AuthProtocol, &[u8])>,
) -> Result<Vec<u8>, SnmpError> {
    let mut global = Vec::new();
    ber::push_tlv(&mut global, tag::INTEGER, &ber::integer_content(i64::from(msg_id)));
    ber::push_tlv(&mut global, tag::INTEGER, &ber::integer_content(MAX_MESSAGE_SIZE));
    ber::push_tlv(&mut global, tag::OCTET_STRING, &[flags]);
    ber::push_tlv(&mut global, tag::INTEGER, &ber::integer_content(SECURITY_MODEL_USM));

    let (security_bytes, auth_offset) = security.encode();

    let mut inner = Vec::new();
    ber::push_tlv(&mut inner, tag::INTEGER, &ber::integer_content(VERSION_3));
    ber::push_tlv(&mut inner, tag::SEQUENCE, &global);
    ber::push_tlv(&mut inner, tag::OCTET_STRING, &security_bytes);
    let security_start = inner.len() - security_bytes.len();
    inner.extend_from_slice(msg_data);

    let mut whole = Vec::with_capacity(inner.len() + 4);
    ber::push_tlv(&mut whole, tag::SEQUENCE, &inner);
    let inner_start = whole.len() - inner.len();

    if let Some((protocol, key)) = auth {
        let digest = protocol.sign(key, &whole)?;
        let at = inner_start + security_start + auth_offset;
        whole[at..at + AUTH_PARAMS_LEN].copy_from_slice(&digest);
    }
    Ok(whole)
}

/// Decode a received v3 message, verifying and decrypting it with `keys`
pub fn decode_message(data: &[u8], keys: &LocalizedKeys) -> Result<V3Message, SnmpError> {
    let mut outer = Reader::new(data);
    let mut message = outer.read_sequence("message")?;
    let version = message.read_integer("msgVersion")?;
    if version != VERSION_3 {
        return Err(SnmpError::decode(format!("unexpected msgVersion {version}")));
    }

    let mut global = message.read_sequence("msgGlobalData")?;
    let raw_id = global.read_integer("msgID")?;
    let msg_id = i32::try_from(raw_id).map_err(|_| SnmpError::decode(format!("msgID {raw_id} out of range")))?;
    global.read_integer("msgMaxSize")?;
    let flags = *global
        .read_octets("msgFlags")?
        .first()
        .ok_or_else(|| SnmpError::decode("empty msgFlags"))?;
    let model = global.read_integer("msgSecurityModel")?;
    if model != SECURITY_MODEL_USM {
        return Err(SnmpError::decode(format!("unsupported security model {model}")));
    }

    let (security, auth_slice) = SecurityParameters::decode(message.read_octets("msgSecurityParameters")?)?;

    if flags & FLAG_AUTH != 0 {
        let (protocol, key) = keys
            .auth
            .as_ref()
            .ok_or_else(|| SnmpError::Security("authenticated message but no authentication key".to_string()))?;
        if auth_slice.len() != AUTH_PARAMS_LEN {
            return Err(SnmpError::Security(format!(
                "authentication parameters of {} octets",
                auth_slice.len()
            )));
        }
        let offset = ber::offset_within(data, auth_slice)
            .ok_or_else(|| SnmpError::decode("authentication parameters outside message"))?;
        let mut zeroed = data.to_vec();
        zeroed[offset..offset + AUTH_PARAMS_LEN].fill(0);
        protocol.verify(key, &zeroed, auth_slice)?;
    }

    let plaintext;
    let mut scoped = if flags & FLAG_PRIV != 0 {
        let (protocol, key) = keys
            .privacy
            .as_ref()
            .ok_or_else(|| SnmpError::Security("encrypted message but no privacy key".to_string()))?;
        let ciphertext = message.read_octets("encryptedPDU")?;
        plaintext = decrypt(*protocol, key, &security, ciphertext)?;
        Reader::new(&plaintext).read_sequence("scopedPDU")?
    } else {
        message.read_sequence("scopedPDU")?
    };

    let context_engine_id = scoped.read_octets("contextEngineID")?.to_vec();
    scoped.read_octets("contextName")?;
    let pdu = Pdu::read_from(&mut scoped)?;

    Ok(V3Message {
        msg_id,
        flags,
        security,
        context_engine_id,
        pdu,
    })
}

/// Read only the msgID of a v3 message, before any security processing
pub fn peek_msg_id(data: &[u8]) -> Result<i32, SnmpError> {
    let mut outer = Reader::new(data);
    let mut message = outer.read_sequence("message")?;
    message.read_integer("msgVersion")?;
    let raw_id = message.read_sequence("msgGlobalData")?.read_integer("msgID")?;
    i32::try_from(raw_id).map_err(|_| SnmpError::decode(format!("msgID {raw_id} out of range")))
}

fn encrypt(
    protocol: PrivProtocol,
    key: &[u8],
    boots: u32,
    time: u32,
    salt: u64,
    plaintext: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), SnmpError> {
    if protocol.is_cbc() {
        // salt = engineBoots || local counter
        let mut salt_bytes = Vec::with_capacity(8);
        salt_bytes.extend_from_slice(&boots.to_be_bytes());
        salt_bytes.extend_from_slice(&(salt as u32).to_be_bytes());
        let (cipher_key, iv) = cbc_key_and_iv(protocol, key, &salt_bytes);

        let mut buffer = plaintext.to_vec();
        buffer.resize(plaintext.len().div_ceil(8) * 8, 0);
        let len = buffer.len();
        let padded = match protocol {
            PrivProtocol::Des => cbc::Encryptor::<des::Des>::new_from_slices(cipher_key, &iv)
                .map_err(|e| invalid_key("DES", e))?
                .encrypt_padded_mut::<NoPadding>(&mut buffer, len)
                .is_ok(),
            _ => cbc::Encryptor::<des::TdesEde3>::new_from_slices(cipher_key, &iv)
                .map_err(|e| invalid_key("3DES", e))?
                .encrypt_padded_mut::<NoPadding>(&mut buffer, len)
                .is_ok(),
        };
        if !padded {
            return Err(SnmpError::Security("CBC block alignment".to_string()));
        }
        Ok((buffer, salt_bytes))
    } else {
        let salt_bytes = salt.to_be_bytes().to_vec();
        let iv = aes_iv(boots, time, &salt_bytes);
        let mut buffer = plaintext.to_vec();
        aes_cfb(protocol, key, &iv, &mut buffer, true)?;
        Ok((buffer, salt_bytes))
    }
}

fn decrypt(
    protocol: PrivProtocol,
    key: &[u8],
    security: &SecurityParameters,
    ciphertext: &[u8],
) -> Result<Vec<u8>, SnmpError> {
    if security.priv_params.len() != 8 {
        return Err(SnmpError::Security(format!(
            "privacy parameters of {} octets",
            security.priv_params.len()
        )));
    }
    let mut buffer = ciphertext.to_vec();
    if protocol.is_cbc() {
        if buffer.len() % 8 != 0 {
            return Err(SnmpError::Security("ciphertext is not a multiple of 8 octets".to_string()));
        }
        let (cipher_key, iv) = cbc_key_and_iv(protocol, key, &security.priv_params);
        let decrypted = match protocol {
            PrivProtocol::Des => cbc::Decryptor::<des::Des>::new_from_slices(cipher_key, &iv)
                .map_err(|e| invalid_key("DES", e))?
                .decrypt_padded_mut::<NoPadding>(&mut buffer)
                .is_ok(),
            _ => cbc::Decryptor::<des::TdesEde3>::new_from_slices(cipher_key, &iv)
                .map_err(|e| invalid_key("3DES", e))?
                .decrypt_padded_mut::<NoPadding>(&mut buffer)
                .is_ok(),
        };
        if !decrypted {
            return Err(SnmpError::Security("CBC decryption failed".to_string()));
        }
    } else {
        let iv = aes_iv(security.boots, security.time, &security.priv_params);
        aes_cfb(protocol, key, &iv, &mut buffer, false)?;
    }
    Ok(buffer)
}

/// Split key material into cipher key and pre-IV and salt the IV
fn cbc_key_and_iv<'k>(protocol: PrivProtocol, key: &'k [u8], salt: &[u8]) -> (&'k [u8], [u8; 8]) {
    let (cipher_key, pre_iv) = key.split_at(protocol.key_len() - 8);
    let mut iv = [0u8; 8];
    for (i, byte) in iv.iter_mut().enumerate() {
        *byte = pre_iv[i] ^ salt[i];
    }
    (cipher_key, iv)
}

fn aes_iv(boots: u32, time: u32, salt: &[u8]) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[..4].copy_from_slice(&boots.to_be_bytes());
    iv[4..8].copy_from_slice(&time.to_be_bytes());
    iv[8..].copy_from_slice(&salt[..8]);
    iv
}

fn aes_cfb(
    protocol: PrivProtocol,
    key: &[u8],
    iv: &[u8; 16],
    buffer: &mut [u8],
    encrypt: bool,
) -> Result<(), SnmpError> {
    macro_rules! run {
        ($cipher:ty) => {
            if encrypt {
                cfb_mode::Encryptor::<$cipher>::new_from_slices(key, iv)
                    .map_err(|e| invalid_key("AES", e))?
                    .encrypt(buffer);
            } else {
                cfb_mode::Decryptor::<$cipher>::new_from_slices(key, iv)
                    .map_err(|e| invalid_key("AES", e))?
                    .decrypt(buffer);
            }
        };
    }
    match protocol {
        PrivProtocol::Aes128 => run!(aes::Aes128),
        PrivProtocol::Aes192 => run!(aes::Aes192),
        PrivProtocol::Aes256 => run!(aes::Aes256),
        PrivProtocol::Des | PrivProtocol::TripleDes => {
            return Err(SnmpError::Config(format!("{protocol:?} is not a CFB cipher")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Value, VarBind};

    fn rfc3414_engine() -> Vec<u8> {
        hex::decode("000000000000000000000002").unwrap()
    }

    #[test]
    fn test_md5_key_localization_matches_rfc3414() {
        let ku = AuthProtocol::Md5.password_to_key(b"maplesyrup").unwrap();
        assert_eq!(hex::encode(&ku), "9faf3283884e92834ebc9847d8edd963");
        let kul = AuthProtocol::Md5.localize_key(&ku, &rfc3414_engine());
        assert_eq!(hex::encode(kul), "526f5eed9fcce26f8964c2930787d82b");
    }

    #[test]
    fn test_sha_key_localization_matches_rfc3414() {
        let ku = AuthProtocol::Sha1.password_to_key(b"maplesyrup").unwrap();
        assert_eq!(hex::encode(&ku), "9fb5cc0381497b3793528939ff788d5d79145211");
        let kul = AuthProtocol::Sha1.localize_key(&ku, &rfc3414_engine());
        assert_eq!(hex::encode(kul), "6695febc9288e36282235fc7151f128497b38f3f");
    }

    #[test]
    fn test_privacy_keys_are_sized_for_the_cipher() {
        let engine = rfc3414_engine();
        for (privacy, len) in [
            (PrivProtocol::Des, 16),
            (PrivProtocol::TripleDes, 32),
            (PrivProtocol::Aes128, 16),
            (PrivProtocol::Aes192, 24),
            (PrivProtocol::Aes256, 32),
        ] {
            let user = user(Some((privacy, "privpassword")));
            let keys = LocalizedKeys::derive(&user, &engine).unwrap();
            let (_, key) = keys.privacy.unwrap();
            assert_eq!(key.len(), len, "{privacy:?}");
        }

        // Blumenthal extension starts with the plain localized key
        let plain = AuthProtocol::Sha1.localized_key(b"privpassword", &engine).unwrap();
        let keys = LocalizedKeys::derive(&user(Some((PrivProtocol::Aes256, "privpassword"))), &engine).unwrap();
        assert_eq!(&keys.privacy.unwrap().1[..20], plain.as_slice());
    }

    fn user(privacy: Option<(PrivProtocol, &str)>) -> UsmUser {
        UsmUser {
            security_name: "bnp".to_string(),
            auth: Some((AuthProtocol::Sha1, "authpassword".to_string())),
            privacy: privacy.map(|(p, k)| (p, k.to_string())),
        }
    }

    fn sample_pdu() -> Pdu {
        let oid: Oid = "1.3.6.1.2.1.17.7.1.4.3.1.2.100".parse().unwrap();
        Pdu::set(42, vec![VarBind::new(oid, Value::OctetString(vec![0x80, 0x00, 0x01]))])
    }

    #[test]
    fn test_authenticated_encrypted_requests_verify_and_decrypt() {
        let engine = EngineState::new(b"\x80\x00\x1f\x88\x04switch".to_vec(), 7, 1200);
        for privacy in [
            PrivProtocol::Des,
            PrivProtocol::TripleDes,
            PrivProtocol::Aes128,
            PrivProtocol::Aes256,
        ] {
            let user = user(Some((privacy, "privpassword")));
            let keys = LocalizedKeys::derive(&user, &engine.engine_id).unwrap();
            let wire = encode_request(9, &user, &keys, &engine, 0x0102_0304_0506_0708, &sample_pdu()).unwrap();

            let decoded = decode_message(&wire, &keys).unwrap();
            assert_eq!(decoded.msg_id, 9);
            assert_eq!(decoded.flags, FLAG_AUTH | FLAG_PRIV | FLAG_REPORTABLE);
            assert_eq!(decoded.pdu, sample_pdu(), "{privacy:?}");
            assert_eq!(decoded.context_engine_id, engine.engine_id);
            assert_eq!(peek_msg_id(&wire).unwrap(), 9);
        }
    }

    #[test]
    fn test_tampered_message_fails_digest_check() {
        let engine = EngineState::new(b"\x80\x00\x1f\x88\x04switch".to_vec(), 1, 10);
        let user = user(None);
        let keys = LocalizedKeys::derive(&user, &engine.engine_id).unwrap();
        let mut wire = encode_request(3, &user, &keys, &engine, 0, &sample_pdu()).unwrap();
        let last = wire.len() - 1;
        wire[last] ^= 0x01;
        let err = decode_message(&wire, &keys).unwrap_err();
        assert!(matches!(err, SnmpError::Security(_)), "{err}");
    }

    #[test]
    fn test_discovery_request_is_unauthenticated_and_reportable() {
        let wire = encode_discovery(5, 6).unwrap();
        let decoded = decode_message(&wire, &LocalizedKeys::none()).unwrap();
        assert_eq!(decoded.flags, FLAG_REPORTABLE);
        assert!(decoded.security.engine_id.is_empty());
        assert!(decoded.pdu.varbinds.is_empty());
    }

    #[test]
    fn test_privacy_without_auth_is_rejected() {
        let user = UsmUser {
            security_name: "bnp".to_string(),
            auth: None,
            privacy: Some((PrivProtocol::Aes128, "privpassword".to_string())),
        };
        assert!(user.validate().is_err());
    }

    #[test]
    fn test_classifies_report_pdus() {
        let oid: Oid = "1.3.6.1.6.3.15.1.1.2.0".parse().unwrap();
        let mut pdu = Pdu::get(1, &[oid]);
        pdu.pdu_type = crate::message::PduType::Report;
        assert_eq!(UsmReport::from_pdu(&pdu), Some(UsmReport::NotInTimeWindow));
    }
}
