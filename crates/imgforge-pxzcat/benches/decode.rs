use criterion::{black_box, criterion_group, criterion_main, Criterion};
use imgforge_pxzcat::{align_up, decode_vli, encode_vli};

fn bench_vli_roundtrip(c: &mut Criterion) {
    let values: Vec<u64> = (0..10_000).map(|i| i * 37).collect();
    let encoded: Vec<Vec<u8>> = values.iter().map(|&v| encode_vli(v)).collect();

    c.bench_function("decode_vli_10k", |b| {
        b.iter(|| {
            let mut total = 0u64;
            for bytes in &encoded {
                let (value, _) = decode_vli(black_box(bytes)).unwrap();
                total = total.wrapping_add(value);
            }
            black_box(total)
        });
    });
}

fn bench_align_up(c: &mut Criterion) {
    c.bench_function("align_up_stream_padding", |b| {
        b.iter(|| {
            let mut total = 0u64;
            for n in 0..10_000u64 {
                total = total.wrapping_add(align_up(black_box(n), 4));
            }
            black_box(total)
        });
    });
}

criterion_group!(decode_benches, bench_vli_roundtrip, bench_align_up);
criterion_main!(decode_benches);
