//! Throughput benchmarks for the relay forward path.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use meridian_integration_tests::{TestPeer, relay_between, relay_dest};
use meridian_relay::Direction;

/// One full hop: peer -> relay receive -> relay send -> peer.
fn bench_forward_hop(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward_hop");

    for payload_len in [64usize, 512, 1400] {
        group.throughput(Throughput::Bytes(payload_len as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(payload_len),
            &payload_len,
            |b, &payload_len| {
                let north = TestPeer::bind();
                let south = TestPeer::bind();
                let mut relay = relay_between(&north, &south);
                let dest = relay_dest(&relay);
                let payload = vec![0xA5u8; payload_len];

                b.iter(|| {
                    north.send(dest, &payload);
                    let received = loop {
                        if let Some(p) = relay.recv(Direction::North).unwrap() {
                            break p;
                        }
                    };
                    relay.send_south(&received).unwrap();
                    let echoed = south.recv();
                    assert_eq!(echoed.len(), payload_len);
                });
            },
        );
    }

    group.finish();
}

/// Receive-side drain with nothing pending, the hot idle path.
fn bench_idle_poll(c: &mut Criterion) {
    let north = TestPeer::bind();
    let south = TestPeer::bind();
    let mut relay = relay_between(&north, &south);

    c.bench_function("idle_poll", |b| {
        b.iter(|| {
            assert!(relay.recv(Direction::North).unwrap().is_none());
        });
    });
}

criterion_group!(benches, bench_forward_hop, bench_idle_poll);
criterion_main!(benches);
