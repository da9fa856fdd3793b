//! SNMP client over UDP
//!
//! One [`SnmpClient`] is one session with one agent. Requests on a session
//! are serialised: each call sends a datagram, waits up to the configured
//! timeout for the matching response and resends it up to `retries` times.

use crate::error::SnmpError;
use crate::message::{CommunityMessage, NO_SUCH_NAME, Pdu, PduType, VERSION_1, VERSION_2C};
use crate::oid::Oid;
use crate::snmp_trait::{Lookup, SnmpClientTrait, SnmpConnector};
use crate::usm::{self, EngineState, LocalizedKeys, UsmReport, UsmUser};
use crate::value::{Value, VarBind};
use rand::Rng;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

/// Largest datagram accepted from an agent
const RECEIVE_BUFFER: usize = 65535;

/// Request parameters shared by every session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnmpConfig {
    /// Time to wait for each response
    pub timeout: Duration,
    /// Resends after the first attempt times out
    pub retries: u32,
    /// Agent UDP port
    pub port: u16,
    /// max-repetitions of GETBULK requests
    pub max_repetitions: i64,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            retries: 5,
            port: 161,
            max_repetitions: 52,
        }
    }
}

/// Security model and secrets used to reach an agent
#[derive(Clone, PartialEq, Eq)]
pub enum SnmpSecurity {
    /// SNMPv1 community
    V1 {
        /// Write community
        community: String,
    },
    /// SNMPv2c community
    V2c {
        /// Write community
        community: String,
    },
    /// SNMPv3 USM user
    V3(UsmUser),
}

impl fmt::Debug for SnmpSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnmpSecurity::V1 { .. } => f.write_str("V1 { community: <redacted> }"),
            SnmpSecurity::V2c { .. } => f.write_str("V2c { community: <redacted> }"),
            SnmpSecurity::V3(user) => f.debug_tuple("V3").field(user).finish(),
        }
    }
}

/// An agent to open a session with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnmpTarget {
    /// Agent address
    pub address: IpAddr,
    /// How to authenticate
    pub security: SnmpSecurity,
}

impl SnmpTarget {
    /// Target an agent
    pub fn new(address: IpAddr, security: SnmpSecurity) -> Self {
        Self { address, security }
    }
}

#[derive(Debug)]
struct Session {
    next_request_id: i32,
    next_msg_id: i32,
    salt: u64,
    engine: Option<(EngineState, LocalizedKeys)>,
}

impl Session {
    fn random() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            next_request_id: rng.gen_range(1..i32::MAX / 2),
            next_msg_id: rng.gen_range(1..i32::MAX / 2),
            salt: rng.r#gen(),
            engine: None,
        }
    }

    fn request_id(&mut self) -> i32 {
        let id = self.next_request_id;
        self.next_request_id = if id == i32::MAX { 1 } else { id + 1 };
        id
    }

    fn msg_id(&mut self) -> i32 {
        let id = self.next_msg_id;
        self.next_msg_id = if id == i32::MAX { 1 } else { id + 1 };
        id
    }

    fn salt(&mut self) -> u64 {
        self.salt = self.salt.wrapping_add(1);
        self.salt
    }
}

/// SNMP session with one agent
#[derive(Debug)]
pub struct SnmpClient {
    target: SnmpTarget,
    peer: SocketAddr,
    config: SnmpConfig,
    socket: UdpSocket,
    session: Mutex<Session>,
}

impl SnmpClient {
    /// Open a UDP session to `target`
    ///
    /// No traffic is sent until the first request; SNMPv3 engine discovery
    /// happens lazily on that request.
    pub async fn connect(target: SnmpTarget, config: SnmpConfig) -> Result<Self, SnmpError> {
        if let SnmpSecurity::V3(user) = &target.security {
            user.validate()?;
        }
        let peer = SocketAddr::new(target.address, config.port);
        let local: SocketAddr = match peer {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;
        debug!("Opened SNMP session to {}", peer);

        Ok(Self {
            target,
            peer,
            config,
            socket,
            session: Mutex::new(Session::random()),
        })
    }

    /// Agent this session talks to
    pub fn target(&self) -> &SnmpTarget {
        &self.target
    }

    /// Read one object instance
    pub async fn get(&self, oid: &Oid) -> Result<Lookup, SnmpError> {
        debug!("SNMP GET {} on {}", oid, self.peer);
        self.read_one(oid).await.map_err(|e| SnmpError::during("get", e))
    }

    /// Walk table columns in lockstep
    ///
    /// Uses GETBULK (non-repeaters 0) on v2c/v3 and GETNEXT on v1. The walk
    /// stops at the first row where a column leaves its subtree.
    pub async fn get_bulk(&self, oids: &[Oid]) -> Result<Vec<Vec<VarBind>>, SnmpError> {
        debug!("SNMP walk of {} column(s) on {}", oids.len(), self.peer);
        self.walk(oids).await.map_err(|e| SnmpError::during("get_bulk", e))
    }

    /// Write one object instance
    pub async fn set(&self, oid: &Oid, value: Value) -> Result<(), SnmpError> {
        debug!("SNMP SET {} = {} on {}", oid, value, self.peer);
        let result = async {
            let response = self.request(Pdu::set(0, vec![VarBind::new(oid.clone(), value)])).await?;
            response.check_error()
        }
        .await;
        result.map_err(|e| SnmpError::during("set", e))
    }

    async fn read_one(&self, oid: &Oid) -> Result<Lookup, SnmpError> {
        let response = self.request(Pdu::get(0, std::slice::from_ref(oid))).await?;
        if response.error_status == NO_SUCH_NAME {
            return Ok(Lookup::NotFound);
        }
        response.check_error()?;
        Ok(match response.varbinds.into_iter().next() {
            Some(varbind) if !varbind.value.is_exception() => Lookup::Found(varbind.value),
            _ => Lookup::NotFound,
        })
    }

    async fn walk(&self, columns: &[Oid]) -> Result<Vec<Vec<VarBind>>, SnmpError> {
        let width = columns.len();
        if width == 0 {
            return Ok(Vec::new());
        }
        let bulk = !matches!(self.target.security, SnmpSecurity::V1 { .. });
        let mut cursor = columns.to_vec();
        let mut rows = Vec::new();

        'walk: loop {
            let pdu = if bulk {
                Pdu::get_bulk(0, 0, self.config.max_repetitions, &cursor)
            } else {
                Pdu::get_next(0, &cursor)
            };
            let response = self.request(pdu).await?;
            if !bulk && response.error_status == NO_SUCH_NAME {
                break;
            }
            response.check_error()?;

            let mut advanced = false;
            for chunk in response.varbinds.chunks_exact(width) {
                let in_table = chunk
                    .iter()
                    .zip(columns)
                    .zip(&cursor)
                    .all(|((varbind, column), previous)| {
                        !varbind.value.is_exception()
                            && varbind.oid.starts_with(column)
                            && varbind.oid > *previous
                    });
                if !in_table {
                    break 'walk;
                }
                cursor = chunk.iter().map(|varbind| varbind.oid.clone()).collect();
                rows.push(chunk.to_vec());
                advanced = true;
            }
            if !advanced {
                break;
            }
        }
        debug!("SNMP walk on {} returned {} row(s)", self.peer, rows.len());
        Ok(rows)
    }

    /// Send a request PDU (request-id assigned here) and return the response PDU
    async fn request(&self, mut pdu: Pdu) -> Result<Pdu, SnmpError> {
        let mut session = self.session.lock().await;
        pdu.request_id = session.request_id();
        match &self.target.security {
            SnmpSecurity::V1 { community } => self.community_exchange(VERSION_1, community, pdu).await,
            SnmpSecurity::V2c { community } => self.community_exchange(VERSION_2C, community, pdu).await,
            SnmpSecurity::V3(user) => self.usm_exchange(&mut session, user, pdu).await,
        }
    }

    async fn community_exchange(&self, version: i64, community: &str, pdu: Pdu) -> Result<Pdu, SnmpError> {
        let request_id = pdu.request_id;
        let wire = CommunityMessage {
            version,
            community: community.as_bytes().to_vec(),
            pdu,
        }
        .encode();

        self.exchange(&wire, |data| {
            let message = CommunityMessage::decode(data)?;
            let matches = message.pdu.request_id == request_id && message.pdu.pdu_type == PduType::Response;
            Ok(matches.then_some(message.pdu))
        })
        .await
    }

    async fn usm_exchange(&self, session: &mut Session, user: &UsmUser, pdu: Pdu) -> Result<Pdu, SnmpError> {
        if session.engine.is_none() {
            let engine = self.discover(session).await?;
            let keys = LocalizedKeys::derive(user, &engine.engine_id)?;
            session.engine = Some((engine, keys));
        }

        let mut resynchronised = false;
        loop {
            let msg_id = session.msg_id();
            let salt = session.salt();
            let Some((engine, keys)) = &session.engine else {
                return Err(SnmpError::Security("no authoritative engine".to_string()));
            };
            let wire = usm::encode_request(msg_id, user, keys, engine, salt, &pdu)?;
            let keys = keys.clone();

            let response = self
                .exchange(&wire, |data| {
                    if usm::peek_msg_id(data)? != msg_id {
                        return Ok(None);
                    }
                    usm::decode_message(data, &keys).map(Some)
                })
                .await?;

            if response.pdu.pdu_type != PduType::Report {
                return Ok(response.pdu);
            }
            let report = UsmReport::from_pdu(&response.pdu);
            if report == Some(UsmReport::NotInTimeWindow) && !resynchronised {
                resynchronised = true;
                if let Some((engine, _)) = session.engine.as_mut() {
                    *engine = EngineState::new(
                        engine.engine_id.clone(),
                        response.security.boots,
                        response.security.time,
                    );
                }
                debug!("Re-synchronised engine clock of {}", self.peer);
                continue;
            }
            return Err(SnmpError::Security(
                report.map_or_else(|| "empty report".to_string(), |r| r.to_string()),
            ));
        }
    }

    async fn discover(&self, session: &mut Session) -> Result<EngineState, SnmpError> {
        let msg_id = session.msg_id();
        let wire = usm::encode_discovery(msg_id, session.request_id())?;
        let none = LocalizedKeys::none();
        let response = self
            .exchange(&wire, |data| {
                if usm::peek_msg_id(data)? != msg_id {
                    return Ok(None);
                }
                usm::decode_message(data, &none).map(Some)
            })
            .await?;

        let security = response.security;
        if security.engine_id.is_empty() {
            return Err(SnmpError::Security(format!(
                "{} did not report its engine id",
                self.peer
            )));
        }
        debug!(
            "Discovered engine {} of {} (boots {}, time {})",
            hex(&security.engine_id),
            self.peer,
            security.boots,
            security.time
        );
        Ok(EngineState::new(security.engine_id, security.boots, security.time))
    }

    /// Send `wire` until `accept` recognises a response or retries run out.
    ///
    /// `accept` returns `Ok(None)` for datagrams that belong to another
    /// request; those and undecodable datagrams are dropped.
    async fn exchange<T>(
        &self,
        wire: &[u8],
        mut accept: impl FnMut(&[u8]) -> Result<Option<T>, SnmpError> + Send,
    ) -> Result<T, SnmpError> {
        let attempts = self.config.retries + 1;
        let mut buffer = vec![0u8; RECEIVE_BUFFER];
        for attempt in 1..=attempts {
            self.socket.send(wire).await?;
            let deadline = Instant::now() + self.config.timeout;
            while let Ok(received) = timeout_at(deadline, self.socket.recv(&mut buffer)).await {
                let received = received?;
                match accept(&buffer[..received]) {
                    Ok(Some(response)) => return Ok(response),
                    Ok(None) => debug!("Discarding response for another request from {}", self.peer),
                    Err(e) => warn!("Discarding undecodable response from {}: {}", self.peer, e),
                }
            }
            debug!("Attempt {}/{} to {} timed out", attempt, attempts, self.peer);
        }
        Err(SnmpError::Timeout {
            target: self.peer.to_string(),
            attempts,
        })
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[async_trait::async_trait]
impl SnmpClientTrait for SnmpClient {
    async fn get(&self, oid: &Oid) -> Result<Lookup, SnmpError> {
        SnmpClient::get(self, oid).await
    }

    async fn get_bulk(&self, oids: &[Oid]) -> Result<Vec<Vec<VarBind>>, SnmpError> {
        SnmpClient::get_bulk(self, oids).await
    }

    async fn set(&self, oid: &Oid, value: Value) -> Result<(), SnmpError> {
        SnmpClient::set(self, oid, value).await
    }
}

/// Opens real UDP sessions with a fixed [`SnmpConfig`]
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpConnector {
    config: SnmpConfig,
}

impl UdpConnector {
    /// Connector using `config` for every session
    pub fn new(config: SnmpConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl SnmpConnector for UdpConnector {
    async fn connect(&self, target: &SnmpTarget) -> Result<Box<dyn SnmpClientTrait>, SnmpError> {
        let client = SnmpClient::connect(target.clone(), self.config)
            .await
            .map_err(|e| SnmpError::during("connect", e))?;
        Ok(Box::new(client))
    }
}
