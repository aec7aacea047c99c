//! The failure detector's dispatch-thread main loop.
//!
//! `FailureDetector` owns three UDP endpoints and is driven entirely from a
//! single thread: there is no interior locking because nothing outside that
//! thread ever touches its state (see the concurrency model this crate
//! follows — dispatch-owned state is exclusive to the dispatch thread).

use std::net::SocketAddr;
use std::time::Duration;

use mio::{Events, Interest, Poll, Token};
use tracing::{debug, warn};

use wardcore_clock::Clock;
use wardcore_net::{Net, Rng, UdpEndpoint};
use wardcore_types::locator;

use crate::error::DetectorError;
use crate::server_list::ServerList;
use crate::timeout_queue::TimeoutQueue;
use crate::wire::{
    GetServerListRequest, GetServerListResponse, HintServerDown, PingMessage, ProxyPingRequest,
    ProxyPingResponse, COORD_PROBE_FLAG, UNREACHABLE_REPLY_NANOS,
};

const CLIENT_TOKEN: Token = Token(0);
const SERVER_TOKEN: Token = Token(1);
const COORD_TOKEN: Token = Token(2);

pub struct FailureDetectorConfig {
    pub self_locator: String,
    pub bind_address: String,
    pub locator_preference: Vec<String>,
    pub port_offset: u16,
    pub probe_interval_micros: u64,
    pub timeout_micros: u64,
    pub max_datagram_bytes: usize,
    pub coordinator_addr: SocketAddr,
}

/// Owns the three failure-detector endpoints and their shared scheduling
/// state. Exclusive to whichever thread drives `run`/the `handle_*` methods.
pub struct FailureDetector<C, N, R> {
    client_ep: UdpEndpoint,
    server_ep: UdpEndpoint,
    coord_ep: UdpEndpoint,
    coordinator_addr: SocketAddr,
    self_locator: String,
    server_list: ServerList,
    queue: TimeoutQueue,
    last_ping_micros: u64,
    probe_interval_micros: u64,
    max_datagram_bytes: usize,
    logged_empty_peer_list: bool,
    clock: C,
    #[allow(dead_code)]
    net: N,
    rng: R,
}

impl<C: Clock, N: Net, R: Rng> FailureDetector<C, N, R> {
    pub fn new(
        config: FailureDetectorConfig,
        clock: C,
        net: N,
        rng: R,
    ) -> Result<Self, DetectorError> {
        let preference: Vec<&str> = config
            .locator_preference
            .iter()
            .map(String::as_str)
            .collect();
        let port = locator::failure_detector_port(&config.self_locator, &preference, config.port_offset)
            .map_err(|e| DetectorError::Fatal(format!("cannot derive bind port: {e}")))?;

        let bind = |bind_port: u16| -> Result<UdpEndpoint, DetectorError> {
            let addr: SocketAddr = format!("{}:{}", config.bind_address, bind_port)
                .parse()
                .map_err(|e| DetectorError::Fatal(format!("invalid bind address: {e}")))?;
            net.bind_udp(addr).map_err(DetectorError::from)
        };

        // Only `server_ep` binds to the locator-derived port: it is the one
        // peers address when they resolve this node through
        // `failure_detector_port`. `client_ep`/`coord_ep` are outbound-only
        // and take ephemeral ports.
        let client_ep = bind(0)?;
        let server_ep = bind(port)?;
        let coord_ep = bind(0)?;

        let now = clock.now_micros();
        Ok(Self {
            client_ep,
            server_ep,
            coord_ep,
            coordinator_addr: config.coordinator_addr,
            self_locator: config.self_locator,
            server_list: ServerList::new(),
            queue: TimeoutQueue::new(config.timeout_micros),
            last_ping_micros: now.saturating_sub(config.probe_interval_micros),
            probe_interval_micros: config.probe_interval_micros,
            max_datagram_bytes: config.max_datagram_bytes,
            logged_empty_peer_list: false,
            clock,
            net,
            rng,
        })
    }

    /// Binds endpoints at explicit addresses instead of deriving them from a
    /// locator — used by tests that need ephemeral loopback ports.
    pub fn with_endpoints(
        client_ep: UdpEndpoint,
        server_ep: UdpEndpoint,
        coord_ep: UdpEndpoint,
        coordinator_addr: SocketAddr,
        self_locator: String,
        probe_interval_micros: u64,
        timeout_micros: u64,
        max_datagram_bytes: usize,
        clock: C,
        net: N,
        rng: R,
    ) -> Self {
        let now = clock.now_micros();
        Self {
            client_ep,
            server_ep,
            coord_ep,
            coordinator_addr,
            self_locator,
            server_list: ServerList::new(),
            queue: TimeoutQueue::new(timeout_micros),
            last_ping_micros: now.saturating_sub(probe_interval_micros),
            probe_interval_micros,
            max_datagram_bytes,
            logged_empty_peer_list: false,
            clock,
            net,
            rng,
        }
    }

    pub fn server_list_mut(&mut self) -> &mut ServerList {
        &mut self.server_list
    }

    /// Asks the coordinator for a fresh membership list. The refresh cadence
    /// is a policy decision left to the caller (e.g. on startup and from a
    /// periodic dispatch-thread command); this method only performs the
    /// send.
    pub fn request_server_list(&self, server_type_filter: u32) -> Result<(), DetectorError> {
        let request = GetServerListRequest { server_type_filter };
        self.coord_ep
            .send_to(&request.encode(), self.coordinator_addr)?;
        Ok(())
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    fn next_nonce(&self, coord_flag: bool) -> u64 {
        let raw = self.rng.next_u64() & !COORD_PROBE_FLAG;
        if coord_flag {
            raw | COORD_PROBE_FLAG
        } else {
            raw
        }
    }

    /// Step 1 of the main loop: sends a probe to a random peer if the probe
    /// interval has elapsed. Returns the peer addressed, if any.
    pub fn maybe_send_probe(&mut self, peer_addr_resolver: impl Fn(&str) -> Option<SocketAddr>) {
        let now = self.clock.now_micros();
        if now < self.last_ping_micros + self.probe_interval_micros {
            return;
        }
        self.last_ping_micros = now;

        let Some(peer) = self.server_list.pick_random_peer(&self.self_locator, &self.rng) else {
            if !self.logged_empty_peer_list {
                warn!("no peers available to probe; server list is empty or contains only self");
                self.logged_empty_peer_list = true;
            }
            return;
        };
        let locator = peer.locator.clone();
        self.logged_empty_peer_list = false;

        let Some(addr) = peer_addr_resolver(&locator) else {
            warn!(%locator, "cannot resolve peer locator to a socket address; skipping probe");
            return;
        };

        let nonce = self.next_nonce(false);
        match self.client_ep.send_to(&PingMessage { nonce }.encode(), addr) {
            Ok(_) => {
                self.queue.enqueue(locator, nonce, now);
            }
            Err(err) => warn!(%locator, %err, "failed to send probe"),
        }
    }

    /// Step 3's `serverEp` branch: an inbound `PING` or `PROXY_PING`.
    pub fn handle_server_datagram(
        &mut self,
        data: &[u8],
        from: SocketAddr,
        peer_addr_resolver: impl Fn(&str) -> Option<SocketAddr>,
    ) {
        match crate::wire::peek_type(data) {
            Ok(crate::wire::MSG_PING) => match PingMessage::decode(data) {
                Ok(ping) => {
                    let reply = PingMessage { nonce: ping.nonce }.encode();
                    if let Err(err) = self.server_ep.send_to(&reply, from) {
                        warn!(%err, "failed to echo ping reply");
                    }
                }
                Err(err) => warn!(%err, "malformed ping request dropped"),
            },
            Ok(crate::wire::MSG_PROXY_PING) => match ProxyPingRequest::decode(data) {
                Ok(req) => {
                    let nonce = self.next_nonce(true);
                    let Some(target_addr) = peer_addr_resolver(&req.target_locator) else {
                        warn!(locator = %req.target_locator, "cannot resolve proxy ping target");
                        return;
                    };
                    let now = self.clock.now_micros();
                    match self.client_ep.send_to(&PingMessage { nonce }.encode(), target_addr) {
                        Ok(_) => self.queue.enqueue(req.target_locator, nonce, now),
                        Err(err) => warn!(%err, "failed to send proxy ping"),
                    }
                }
                Err(err) => warn!(%err, "malformed proxy ping request dropped"),
            },
            Ok(other) => debug!(msg_type = other, "unexpected message on serverEp, dropping"),
            Err(err) => warn!(%err, "malformed datagram on serverEp dropped"),
        }
    }

    /// Step 3's `clientEp` branch: an inbound probe response.
    pub fn handle_client_datagram(&mut self, data: &[u8]) {
        let ping = match PingMessage::decode(data) {
            Ok(ping) => ping,
            Err(err) => {
                warn!(%err, "malformed ping response dropped");
                return;
            }
        };
        let Some(entry) = self.queue.dequeue_by_nonce(ping.nonce) else {
            debug!(nonce = ping.nonce, "response to unknown or already-settled nonce dropped");
            return;
        };
        if ping.nonce & COORD_PROBE_FLAG != 0 {
            let now = self.clock.now_micros();
            let elapsed_nanos = now.saturating_sub(entry.start_micros).saturating_mul(1000);
            let reply = ProxyPingResponse {
                nonce: ping.nonce,
                reply_nanos: elapsed_nanos,
            };
            if let Err(err) = self.server_ep.send_to(&reply.encode(), self.coordinator_addr) {
                warn!(%err, "failed to send proxy ping response to coordinator");
            }
        }
    }

    /// Step 3's `coordEp` branch: a server-list reply.
    pub fn handle_coord_datagram(&mut self, data: &[u8]) {
        match GetServerListResponse::decode(data) {
            Ok(response) => self.server_list.replace(response),
            Err(err) => warn!(%err, "malformed server list reply dropped"),
        }
    }

    /// Step 4: drains all due entries, alerting the coordinator for each.
    pub fn drain_timeouts(&mut self) {
        let now = self.clock.now_micros();
        while let Some(entry) = self.queue.dequeue_expired(now) {
            if entry.nonce & COORD_PROBE_FLAG != 0 {
                let reply = ProxyPingResponse {
                    nonce: entry.nonce,
                    reply_nanos: UNREACHABLE_REPLY_NANOS,
                };
                if let Err(err) = self.server_ep.send_to(&reply.encode(), self.coordinator_addr) {
                    warn!(%err, "failed to send unreachable proxy ping response");
                }
            } else {
                let hint = HintServerDown {
                    locator: entry.locator.clone(),
                };
                if let Err(err) = self.coord_ep.send_to(&hint.encode(), self.coordinator_addr) {
                    warn!(%err, locator = %entry.locator, "failed to send hint-server-down");
                }
            }
        }
    }

    fn micros_until_next_action(&self) -> u64 {
        let now = self.clock.now_micros();
        let time_to_ping = (self.last_ping_micros + self.probe_interval_micros).saturating_sub(now);
        let time_to_timeout = self.queue.micros_until_next_timeout(now);
        time_to_ping.min(time_to_timeout)
    }

    /// Runs one iteration of the main loop, backed by real `mio` polling.
    /// `peer_addr_resolver` maps a service locator to a socket address (left
    /// to the caller since it depends on DNS/locator policy outside this
    /// crate's scope).
    pub fn run_once(
        &mut self,
        poll: &mut Poll,
        peer_addr_resolver: impl Fn(&str) -> Option<SocketAddr> + Copy,
    ) -> Result<(), DetectorError> {
        self.maybe_send_probe(peer_addr_resolver);

        let timeout_micros = self.micros_until_next_action();
        let timeout = if timeout_micros == u64::MAX {
            None
        } else {
            Some(Duration::from_micros(timeout_micros))
        };

        let mut events = Events::with_capacity(16);
        poll.poll(&mut events, timeout)?;

        let mut buf = vec![0u8; self.max_datagram_bytes];
        for event in &events {
            match event.token() {
                CLIENT_TOKEN => {
                    while let Some((n, _from)) = self.client_ep.try_recv_from(&mut buf)? {
                        self.handle_client_datagram(&buf[..n]);
                    }
                }
                SERVER_TOKEN => {
                    while let Some((n, from)) = self.server_ep.try_recv_from(&mut buf)? {
                        self.handle_server_datagram(&buf[..n], from, peer_addr_resolver);
                    }
                }
                COORD_TOKEN => {
                    while let Some((n, _from)) = self.coord_ep.try_recv_from(&mut buf)? {
                        self.handle_coord_datagram(&buf[..n]);
                    }
                }
                _ => {}
            }
        }

        self.drain_timeouts();
        Ok(())
    }

    /// Registers all three endpoints with `poll`, using the fixed tokens
    /// `run_once` expects.
    pub fn register(&mut self, poll: &Poll) -> Result<(), DetectorError> {
        poll.registry()
            .register(self.client_ep.mio_source(), CLIENT_TOKEN, Interest::READABLE)?;
        poll.registry()
            .register(self.server_ep.mio_source(), SERVER_TOKEN, Interest::READABLE)?;
        poll.registry()
            .register(self.coord_ep.mio_source(), COORD_TOKEN, Interest::READABLE)?;
        Ok(())
    }
}
