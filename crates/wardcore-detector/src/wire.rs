//! On-wire encoding for the failure detector's UDP datagrams.
//!
//! Every datagram starts with a 4-byte header (`type: u16`, `status: u16`)
//! followed by a message-specific body. Locators are length-prefixed UTF-8,
//! never null-terminated.

use crate::error::DetectorError;

pub const STATUS_OK: u16 = 0;

pub const MSG_PING: u16 = 1;
pub const MSG_PROXY_PING: u16 = 2;
pub const MSG_PROXY_PING_RESPONSE: u16 = 3;
pub const MSG_GET_SERVER_LIST: u16 = 4;
pub const MSG_GET_SERVER_LIST_RESPONSE: u16 = 5;
pub const MSG_HINT_SERVER_DOWN: u16 = 6;

/// Set on a ping nonce to mark it as a coordinator-issued probe rather than
/// a peer-to-peer one, so the replier can distinguish the two without a
/// separate message type.
pub const COORD_PROBE_FLAG: u64 = 0x8000_0000_0000_0000;

/// Sentinel `reply_nanos` meaning the proxied target never answered.
pub const UNREACHABLE_REPLY_NANOS: u64 = u64::MAX;

const HEADER_LEN: usize = 4;

fn write_header(out: &mut Vec<u8>, msg_type: u16, status: u16) {
    out.extend_from_slice(&msg_type.to_le_bytes());
    out.extend_from_slice(&status.to_le_bytes());
}

fn read_header(data: &[u8]) -> Result<(u16, u16, &[u8]), DetectorError> {
    if data.len() < HEADER_LEN {
        return Err(DetectorError::Malformed(format!(
            "datagram too short for header: need {HEADER_LEN}, have {}",
            data.len()
        )));
    }
    let msg_type = u16::from_le_bytes([data[0], data[1]]);
    let status = u16::from_le_bytes([data[2], data[3]]);
    Ok((msg_type, status, &data[HEADER_LEN..]))
}

fn read_u64(data: &[u8], what: &'static str) -> Result<(u64, &[u8]), DetectorError> {
    if data.len() < 8 {
        return Err(DetectorError::Malformed(format!(
            "truncated {what}: need 8 bytes, have {}",
            data.len()
        )));
    }
    let (head, tail) = data.split_at(8);
    Ok((u64::from_le_bytes(head.try_into().unwrap()), tail))
}

fn read_u32(data: &[u8], what: &'static str) -> Result<(u32, &[u8]), DetectorError> {
    if data.len() < 4 {
        return Err(DetectorError::Malformed(format!(
            "truncated {what}: need 4 bytes, have {}",
            data.len()
        )));
    }
    let (head, tail) = data.split_at(4);
    Ok((u32::from_le_bytes(head.try_into().unwrap()), tail))
}

fn write_locator(out: &mut Vec<u8>, locator: &str) {
    let bytes = locator.as_bytes();
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

fn read_locator<'a>(data: &'a [u8], what: &'static str) -> Result<(String, &'a [u8]), DetectorError> {
    let (len, rest) = read_u32(data, what)?;
    let len = len as usize;
    if rest.len() < len {
        return Err(DetectorError::Malformed(format!(
            "truncated {what} body: need {len} bytes, have {}",
            rest.len()
        )));
    }
    let (body, tail) = rest.split_at(len);
    let locator = String::from_utf8(body.to_vec())
        .map_err(|e| DetectorError::Malformed(format!("{what} is not valid utf8: {e}")))?;
    Ok((locator, tail))
}

/// Shared shape of `PING` requests and replies: a single correlating nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingMessage {
    pub nonce: u64,
}

impl PingMessage {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + 8);
        write_header(&mut out, MSG_PING, STATUS_OK);
        out.extend_from_slice(&self.nonce.to_le_bytes());
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, DetectorError> {
        let (msg_type, _status, body) = read_header(data)?;
        if msg_type != MSG_PING {
            return Err(DetectorError::Malformed(format!(
                "expected PING, got type {msg_type}"
            )));
        }
        let (nonce, _) = read_u64(body, "ping nonce")?;
        Ok(Self { nonce })
    }
}

/// Request asking a peer to proxy-ping a third party on the sender's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyPingRequest {
    pub target_locator: String,
    pub nonce: u64,
    pub timeout_micros: u64,
}

impl ProxyPingRequest {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + 4 + self.target_locator.len() + 16);
        write_header(&mut out, MSG_PROXY_PING, STATUS_OK);
        write_locator(&mut out, &self.target_locator);
        out.extend_from_slice(&self.nonce.to_le_bytes());
        out.extend_from_slice(&self.timeout_micros.to_le_bytes());
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, DetectorError> {
        let (msg_type, _status, body) = read_header(data)?;
        if msg_type != MSG_PROXY_PING {
            return Err(DetectorError::Malformed(format!(
                "expected PROXY_PING, got type {msg_type}"
            )));
        }
        let (target_locator, body) = read_locator(body, "proxy ping target locator")?;
        let (nonce, body) = read_u64(body, "proxy ping nonce")?;
        let (timeout_micros, _) = read_u64(body, "proxy ping timeout")?;
        Ok(Self {
            target_locator,
            nonce,
            timeout_micros,
        })
    }
}

/// Reply to a `ProxyPingRequest`: the measured round-trip time in
/// nanoseconds, or [`UNREACHABLE_REPLY_NANOS`] if the target never answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyPingResponse {
    pub nonce: u64,
    pub reply_nanos: u64,
}

impl ProxyPingResponse {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + 16);
        write_header(&mut out, MSG_PROXY_PING_RESPONSE, STATUS_OK);
        out.extend_from_slice(&self.nonce.to_le_bytes());
        out.extend_from_slice(&self.reply_nanos.to_le_bytes());
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, DetectorError> {
        let (msg_type, _status, body) = read_header(data)?;
        if msg_type != MSG_PROXY_PING_RESPONSE {
            return Err(DetectorError::Malformed(format!(
                "expected PROXY_PING_RESPONSE, got type {msg_type}"
            )));
        }
        let (nonce, body) = read_u64(body, "proxy ping response nonce")?;
        let (reply_nanos, _) = read_u64(body, "proxy ping response reply_nanos")?;
        Ok(Self { nonce, reply_nanos })
    }

    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        self.reply_nanos == UNREACHABLE_REPLY_NANOS
    }
}

/// Request for the current membership list, optionally filtered by server
/// type (`u32::MAX` meaning "all types").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetServerListRequest {
    pub server_type_filter: u32,
}

impl GetServerListRequest {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + 4);
        write_header(&mut out, MSG_GET_SERVER_LIST, STATUS_OK);
        out.extend_from_slice(&self.server_type_filter.to_le_bytes());
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, DetectorError> {
        let (msg_type, _status, body) = read_header(data)?;
        if msg_type != MSG_GET_SERVER_LIST {
            return Err(DetectorError::Malformed(format!(
                "expected GET_SERVER_LIST, got type {msg_type}"
            )));
        }
        let (server_type_filter, _) = read_u32(body, "server list filter")?;
        Ok(Self { server_type_filter })
    }
}

/// One membership entry: a locator and its declared server type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerListEntry {
    pub locator: String,
    pub server_type: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetServerListResponse {
    pub entries: Vec<ServerListEntry>,
}

impl GetServerListResponse {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + 4);
        write_header(&mut out, MSG_GET_SERVER_LIST_RESPONSE, STATUS_OK);
        out.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        for entry in &self.entries {
            write_locator(&mut out, &entry.locator);
            out.extend_from_slice(&entry.server_type.to_le_bytes());
        }
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, DetectorError> {
        let (msg_type, _status, body) = read_header(data)?;
        if msg_type != MSG_GET_SERVER_LIST_RESPONSE {
            return Err(DetectorError::Malformed(format!(
                "expected GET_SERVER_LIST_RESPONSE, got type {msg_type}"
            )));
        }
        let (count, mut body) = read_u32(body, "server list count")?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let (locator, rest) = read_locator(body, "server list entry locator")?;
            let (server_type, rest) = read_u32(rest, "server list entry type")?;
            entries.push(ServerListEntry {
                locator,
                server_type,
            });
            body = rest;
        }
        Ok(Self { entries })
    }
}

/// Unsolicited gossip announcing that `locator` is believed dead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintServerDown {
    pub locator: String,
}

impl HintServerDown {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + 4 + self.locator.len());
        write_header(&mut out, MSG_HINT_SERVER_DOWN, STATUS_OK);
        write_locator(&mut out, &self.locator);
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, DetectorError> {
        let (msg_type, _status, body) = read_header(data)?;
        if msg_type != MSG_HINT_SERVER_DOWN {
            return Err(DetectorError::Malformed(format!(
                "expected HINT_SERVER_DOWN, got type {msg_type}"
            )));
        }
        let (locator, _) = read_locator(body, "hint server down locator")?;
        Ok(Self { locator })
    }
}

/// Peeks at a datagram's message type without fully decoding it, so the
/// dispatch loop can route to the right decoder.
pub fn peek_type(data: &[u8]) -> Result<u16, DetectorError> {
    let (msg_type, _, _) = read_header(data)?;
    Ok(msg_type)
}
