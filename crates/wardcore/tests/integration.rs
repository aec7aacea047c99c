//! End-to-end scenarios wiring configuration, the failure detector, and the
//! prepared-ops table together the way a real deployment would.

use std::net::SocketAddr;

use wardcore::{
    dispatch_channel, DispatchCommand, FailureDetector, LogStore, ObjectManager, PreparedOps,
    WardcoreConfig,
};
use wardcore_clock::FakeClock;
use wardcore_net::{FakeRng, MioNet, Net};
use wardcore_txlog::testing::MemoryLogStore;
use wardcore_types::{ClientLeaseId, KeyHash, RpcId, TableId};

fn bind_loopback(net: &MioNet) -> wardcore_net::UdpEndpoint {
    net.bind_udp("127.0.0.1:0".parse().unwrap()).unwrap()
}

#[test]
fn config_defaults_drive_detector_construction() {
    let config = WardcoreConfig::default();
    let net = MioNet;

    let client_ep = bind_loopback(&net);
    let server_ep = bind_loopback(&net);
    let coord_ep = bind_loopback(&net);
    let coordinator_addr: SocketAddr = "127.0.0.1:0".parse().unwrap();

    let detector = FailureDetector::with_endpoints(
        client_ep,
        server_ep,
        coord_ep,
        coordinator_addr,
        "tcp:host=127.0.0.1,port=11000".to_string(),
        config.detector.probe_interval_micros,
        config.detector.timeout_micros,
        config.net.max_datagram_bytes,
        FakeClock::new(),
        net,
        FakeRng::constant(1),
    );
    assert_eq!(detector.queue_len(), 0);
}

struct NoopObjectManager;

impl ObjectManager for NoopObjectManager {
    fn lock(&self, _table_id: TableId, _key_hash: KeyHash) {}
    fn unlock(&self, _table_id: TableId, _key_hash: KeyHash) {}
}

#[test]
fn prepared_ops_survive_a_dispatch_command_round_trip() {
    let (handle, receiver) = dispatch_channel(config_capacity());
    handle
        .send_command(DispatchCommand::RefreshServerList {
            server_type_filter: 0,
        })
        .unwrap();
    assert_eq!(receiver.drain_commands().len(), 1);

    let log = MemoryLogStore::new();
    let clock = FakeClock::at(0);
    let table = PreparedOps::new(clock.clone(), 500);

    let object = wardcore_txlog::PreparedOpRecord::new(
        wardcore_types::OpType::Write,
        ClientLeaseId::new(1),
        RpcId::new(1),
        vec![],
        bytes::Bytes::from_static(b"payload"),
    );
    let mut bytes = bytes::BytesMut::new();
    object.assemble_for_log(&mut bytes);
    let log_ref = log.append(&bytes).unwrap();

    table
        .buffer_op(ClientLeaseId::new(1), RpcId::new(1), log_ref, false)
        .unwrap();
    assert_eq!(table.len(), 1);

    let object_manager = NoopObjectManager;
    table.regrab_locks_after_recovery(&log, &object_manager);

    assert_eq!(table.pop_op(ClientLeaseId::new(1), RpcId::new(1)), log_ref);
    assert!(table.is_empty());
}

fn config_capacity() -> usize {
    WardcoreConfig::default().dispatch.dispatch_queue_capacity
}
