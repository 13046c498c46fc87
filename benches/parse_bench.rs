use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;
use std::hint::black_box;

const CHROME_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0) AppleWebKit/537.36 Chrome/120.0.0.0 Safari/537.36";

fn legacy_payload() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "csp-report": {
            "document-uri": "https://example.com/page",
            "referrer": "https://example.com/",
            "violated-directive": "script-src 'self'",
            "effective-directive": "script-src",
            "original-policy": "default-src 'self'; script-src 'self'; report-uri /csp-report",
            "blocked-uri": "https://evil.example/payload.js",
            "status-code": 200,
            "source-file": "https://example.com/app.js",
            "line-number": 42,
            "column-number": 13
        }
    }))
    .unwrap()
}

fn reporting_api_batch(size: usize) -> Vec<u8> {
    let entries: Vec<_> = (0..size)
        .map(|i| {
            json!({
                "type": "csp-violation",
                "age": i,
                "url": format!("https://example.com/page/{i}"),
                "body": {
                    "documentURL": format!("https://example.com/page/{i}"),
                    "effectiveDirective": "script-src-elem",
                    "blockedURL": "eval",
                    "statusCode": "200",
                    "lineNumber": format!("{i}")
                }
            })
        })
        .collect();
    serde_json::to_vec(&entries).unwrap()
}

fn bench_parse_legacy(c: &mut Criterion) {
    let payload = legacy_payload();
    c.bench_function("parse_legacy_single", |b| {
        b.iter(|| {
            let reports =
                csp_ingest::parse(black_box(&payload), CHROME_UA, "203.0.113.7").unwrap();
            black_box(reports)
        });
    });
}

fn bench_parse_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_reporting_api_batch");
    for size in [1usize, 10, 100] {
        let payload = reporting_api_batch(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("batch_{size}"), |b| {
            b.iter(|| {
                let reports =
                    csp_ingest::parse(black_box(&payload), CHROME_UA, "203.0.113.7").unwrap();
                black_box(reports)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse_legacy, bench_parse_batches);
criterion_main!(benches);
