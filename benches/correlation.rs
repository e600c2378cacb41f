//! Correlation and dispatch benchmark suite.
//!
//! Measures the per-frame hot path:
//! - Registering and resolving pending requests with N other actions outstanding
//! - Parsing an inbound response frame
//! - Fanning an event out to N subscribers
//!
//! Run with: cargo bench --bench correlation
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::json;

use window_relay::transport::Correlator;
use window_relay::{Action, ClientEvent, EventBus, EventKind, Response};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const OUTSTANDING: &[usize] = &[0, 8, 64];
const SUBSCRIBERS: &[usize] = &[1, 16, 128];

fn response(action: &str) -> Response {
    Response {
        success: true,
        message: String::new(),
        action: action.to_string(),
        data: None,
    }
}

// ============================================================================
// Benchmark: Register + Resolve
// ============================================================================

fn bench_register_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("register_resolve");

    for &outstanding in OUTSTANDING {
        group.bench_with_input(
            BenchmarkId::new("outstanding", outstanding),
            &outstanding,
            |b, &outstanding| {
                let mut correlator = Correlator::new();
                let _receivers: Vec<_> = (0..outstanding)
                    .map(|i| correlator.register(&format!("custom_{i}")).1)
                    .collect();

                b.iter(|| {
                    let (_, rx) = correlator.register(Action::Ping.as_str());
                    black_box(correlator.resolve(response(Action::Ping.as_str())));
                    black_box(rx);
                });
            },
        );
    }

    group.finish();
}

// ============================================================================
// Benchmark: Frame Parsing
// ============================================================================

fn bench_parse(c: &mut Criterion) {
    let windows: Vec<_> = (0..32)
        .map(|i| {
            json!({
                "label": format!("window-{i}"),
                "url": "https://example.com",
                "title": "Example",
                "created_at": 1_700_000_000u64,
                "is_visible": true,
                "is_focused": false,
                "is_transparent": false,
                "is_always_on_top": false,
            })
        })
        .collect();
    let frame = json!({
        "success": true,
        "message": "ok",
        "action": "list_windows",
        "data": { "windows": windows },
    })
    .to_string();

    c.bench_function("parse_list_windows_32", |b| {
        b.iter(|| {
            let response = Response::parse(black_box(&frame)).expect("valid frame");
            black_box(response.windows().expect("windows"))
        });
    });
}

// ============================================================================
// Benchmark: Event Fan-out
// ============================================================================

fn bench_emit(c: &mut Criterion) {
    let mut group = c.benchmark_group("emit");

    for &count in SUBSCRIBERS {
        let bus = EventBus::new();
        for _ in 0..count {
            bus.subscribe(EventKind::Message, |event| {
                black_box(event);
            });
        }
        let event = ClientEvent::Message(response("window_update"));

        group.bench_with_input(BenchmarkId::new("subscribers", count), &count, |b, _| {
            b.iter(|| black_box(bus.emit(&event)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_register_resolve, bench_parse, bench_emit);
criterion_main!(benches);
