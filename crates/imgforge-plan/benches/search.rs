use std::path::PathBuf;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use imgforge_plan::{plan, HEADROOM_BYTES};
use imgforge_resource::{Goal, TagSet};

fn temp_namer() -> impl FnMut() -> PathBuf {
    let mut n = 0u32;
    move || {
        n += 1;
        PathBuf::from(format!("/tmp/bench-step-{n}"))
    }
}

fn bench_xz_unwrap(c: &mut Criterion) {
    c.bench_function("plan_xz_unwrap", |b| {
        b.iter(|| {
            let initial = TagSet::new().with_template(true).with_xz(true).with_size(1_073_741_824);
            let must_have = Goal::new().with_filename("out.img").with_size(1_073_741_824).with_format("raw");
            let must_not_have = Goal { template: true, xz: true, ..Goal::new() };
            let result = plan(black_box(initial), &must_have, &must_not_have, false, 8, temp_namer()).unwrap();
            black_box(result)
        });
    });
}

fn bench_growth_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_growth");
    for depth in [4u32, 8, 12] {
        group.bench_with_input(BenchmarkId::new("max_depth", depth), &depth, |b, &depth| {
            b.iter(|| {
                let initial = TagSet::new().with_size(1_073_741_824).with_format("raw");
                let must_have = Goal::new().with_size(1_073_741_824 + HEADROOM_BYTES + 1);
                let result = plan(black_box(initial), &must_have, &Goal::new(), false, depth, temp_namer()).unwrap();
                black_box(result)
            });
        });
    }
    group.finish();
}

criterion_group!(search_benches, bench_xz_unwrap, bench_growth_paths);
criterion_main!(search_benches);
