//! Benchmarks for the keyed children diff.
//!
//! The cheap paths (prefix/suffix, rotations) should stay linear; the full
//! shuffle exercises the linear-search fallback and is expected to grow
//! quadratically.
//!
//! Run with: cargo bench -p weft-harness --bench keyed_diff_bench

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use weft_harness::MemoryHost;
use weft_harness::fixtures::keyed_list;
use weft_render::Renderer;

fn keys(n: u32) -> Vec<u32> {
    (0..n).collect()
}

/// Deterministic shuffle (LCG) so runs are comparable.
fn shuffled(n: u32) -> Vec<u32> {
    let mut out = keys(n);
    let mut state = 0x2545_F491_u64;
    for i in (1..out.len()).rev() {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        let j = (state >> 33) as usize % (i + 1);
        out.swap(i, j);
    }
    out
}

fn bench_transition(c: &mut Criterion, name: &str, make: impl Fn(u32) -> (Vec<u32>, Vec<u32>)) {
    let mut group = c.benchmark_group(format!("keyed_diff/{name}"));
    for n in [16u32, 128, 1024] {
        let (from, to) = make(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter_batched(
                || {
                    let mut renderer = Renderer::new(MemoryHost::new());
                    let root = renderer.host().root();
                    renderer
                        .render(Some(keyed_list(&from)), root)
                        .expect("mount");
                    (renderer, root, keyed_list(&to))
                },
                |(mut renderer, root, next)| {
                    black_box(renderer.render(Some(next), root).expect("patch"))
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_unchanged(c: &mut Criterion) {
    bench_transition(c, "unchanged", |n| (keys(n), keys(n)));
}

fn bench_rotate(c: &mut Criterion) {
    bench_transition(c, "rotate", |n| {
        let from = keys(n);
        let mut to = from.clone();
        to.rotate_right(1);
        (from, to)
    });
}

fn bench_reverse(c: &mut Criterion) {
    bench_transition(c, "reverse", |n| {
        let from = keys(n);
        let to = from.iter().rev().copied().collect();
        (from, to)
    });
}

fn bench_shuffle(c: &mut Criterion) {
    bench_transition(c, "shuffle", |n| (keys(n), shuffled(n)));
}

fn bench_replace_half(c: &mut Criterion) {
    bench_transition(c, "replace_half", |n| {
        let from = keys(n);
        let to = (0..n).map(|k| if k % 2 == 0 { k } else { k + n }).collect();
        (from, to)
    });
}

criterion_group!(
    benches,
    bench_unchanged,
    bench_rotate,
    bench_reverse,
    bench_shuffle,
    bench_replace_half
);
criterion_main!(benches);
