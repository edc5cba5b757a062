//! Decode throughput benchmark

use promframes::{decode, DecoderOptions};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;

fn create_matrix_body(series: usize, samples: usize) -> Vec<u8> {
    let start = 1_609_459_200i64;
    let result: Vec<_> = (0..series)
        .map(|s| {
            let values: Vec<_> = (0..samples)
                .map(|i| json!([start + i as i64 * 15, format!("{}", (i % 100) as f64 / 100.0)]))
                .collect();
            json!({
                "metric": {"__name__": "cpu_usage", "host": format!("host-{}", s)},
                "values": values,
            })
        })
        .collect();

    serde_json::to_vec(&json!({
        "status": "success",
        "data": {"resultType": "matrix", "result": result},
    }))
    .unwrap()
}

fn create_streams_body(lines: usize) -> Vec<u8> {
    let start = 1_645_030_244_810_757_120i64;
    let values: Vec<_> = (0..lines)
        .map(|i| json!([(start + i as i64).to_string(), format!("level=info msg=\"request {}\"", i)]))
        .collect();

    serde_json::to_vec(&json!({
        "status": "success",
        "data": {
            "resultType": "streams",
            "result": [{"stream": {"app": "api"}, "values": values}],
        },
    }))
    .unwrap()
}

fn benchmark_matrix(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_matrix");
    let opts = DecoderOptions::default();

    for series in [1usize, 10, 100] {
        let body = create_matrix_body(series, 1_000);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(series), &body, |b, body| {
            b.iter(|| black_box(decode(body, &opts).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_streams(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_streams");
    let opts = DecoderOptions::default();

    let body = create_streams_body(10_000);
    group.throughput(Throughput::Bytes(body.len() as u64));
    group.bench_function("10k_lines", |b| {
        b.iter(|| black_box(decode(&body, &opts).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, benchmark_matrix, benchmark_streams);

criterion_main!(benches);
