use criterion::{Criterion, black_box, criterion_group, criterion_main};
use glide_history::codec::{read_signed, write_signed};
use glide_history::{HistoricalObject, Position, TrackedValue, decode};

/// One second of pointer motion sampled every 4 ms along a circle.
fn circle_samples() -> Vec<(u64, Position)> {
    (0..250u64)
        .map(|i| {
            let angle = i as f64 * 0.05;
            let pos = Position::new(400.0 + 150.0 * angle.cos(), 300.0 + 150.0 * angle.sin());
            (1_700_000_000_000 + i * 4, pos)
        })
        .collect()
}

fn packed_circle() -> Vec<u8> {
    let mut obj = HistoricalObject::<Position>::new(None);
    for (t, p) in circle_samples() {
        obj.update(t, &p).unwrap();
    }
    obj.pack().unwrap()
}

fn bench_varint_roundtrip(c: &mut Criterion) {
    let values: Vec<i64> = (-512..512).map(|v| v * 37).collect();
    c.bench_function("varint_roundtrip_1024", |bencher| {
        bencher.iter(|| {
            let mut buf = Vec::with_capacity(4096);
            for &v in &values {
                write_signed(&mut buf, black_box(v));
            }
            let mut pos = 0;
            let mut sum = 0i64;
            while pos < buf.len() {
                sum = sum.wrapping_add(read_signed(&buf, &mut pos).unwrap());
            }
            black_box(sum)
        })
    });
}

fn bench_encode_one_flush(c: &mut Criterion) {
    let samples = circle_samples();
    c.bench_function("encode_250_samples", |bencher| {
        bencher.iter(|| {
            let mut obj = HistoricalObject::<Position>::new(Some(&Position::new(550.0, 300.0)));
            for (t, p) in &samples {
                obj.update(*t, black_box(p)).unwrap();
            }
            black_box(obj.pack())
        })
    });
}

fn bench_decode_one_flush(c: &mut Criterion) {
    let buf = packed_circle();
    c.bench_function("decode_250_samples", |bencher| {
        bencher.iter(|| black_box(decode(Position::field_config(), black_box(&buf)).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_varint_roundtrip,
    bench_encode_one_flush,
    bench_decode_one_flush
);
criterion_main!(benches);
