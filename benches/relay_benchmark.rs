use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

use pairlink::signaling::{ClientId, Envelope, SignalingMessage};

/// an ice-candidate as a browser would send it, before the relay stamps it
const CANDIDATE_JSON: &str = r#"{"type":"ice-candidate","candidate":{"candidate":"candidate:842163049 1 udp 1677729535 203.0.113.7 46154 typ srflx raddr 0.0.0.0 rport 0 generation 0","sdpMid":"0","sdpMLineIndex":0},"target":"client-b2c3d4e5f"}"#;

fn offer_json() -> String {
    let sdp = "v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n".repeat(40);
    serde_json::json!({
        "type": "offer",
        "offer": { "type": "offer", "sdp": sdp },
        "target": "client-b2c3d4e5f",
    })
    .to_string()
}

/// parsing benchmark
fn bench_parsing(c: &mut Criterion) {
    let offer = offer_json();

    let mut group = c.benchmark_group("Parsing");
    group.throughput(Throughput::Elements(1));

    group.bench_function("ice_candidate", |b| {
        b.iter(|| {
            let msg: SignalingMessage = serde_json::from_str(black_box(CANDIDATE_JSON)).unwrap();
            black_box(msg)
        })
    });

    group.bench_function("offer", |b| {
        b.iter(|| {
            let msg: SignalingMessage = serde_json::from_str(black_box(&offer)).unwrap();
            black_box(msg)
        })
    });

    group.finish();
}

/// stamp-and-serialize benchmark
fn bench_forward(c: &mut Criterion) {
    let sender = ClientId::from("client-a1b2c3d4e");
    let parsed: SignalingMessage = serde_json::from_str(CANDIDATE_JSON).unwrap();

    let mut group = c.benchmark_group("Forward");
    group.throughput(Throughput::Elements(1));

    group.bench_function("stamp_and_encode", |b| {
        b.iter(|| {
            let out = parsed
                .clone()
                .stamped(black_box(&sender))
                .to_outbound()
                .unwrap();
            black_box(out)
        })
    });

    group.finish();
}

/// full relay hop: text in, stamped text out
fn bench_full_cycle(c: &mut Criterion) {
    let sender = ClientId::from("client-a1b2c3d4e");
    let offer = offer_json();

    let mut group = c.benchmark_group("FullCycle");
    group.throughput(Throughput::Elements(1));

    group.bench_function("offer_hop", |b| {
        b.iter(|| {
            let envelope = Envelope::parse(black_box(&offer)).unwrap();
            let out = envelope.stamped_outbound(&sender).unwrap();
            black_box(out)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_parsing, bench_forward, bench_full_cycle);
criterion_main!(benches);
