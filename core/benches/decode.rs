use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use fasma_core::{
    matrix::{decode_matrix, BlockSpec, PrefixAnchor},
    reader::segment,
    testing::{labelled_blocks, SyntheticRhf},
    Dialect, ParseConfig,
};

const LABELLED: BlockSpec = BlockSpec {
    columns: 5,
    block_skip: 1,
    anchor: PrefixAnchor::Last('S'),
    offset: 6,
    exponent_marker: None,
};

fn bench_segment(c: &mut Criterion) {
    for (n_basis, n_occupied) in [(12, 6), (48, 24)] {
        let text = SyntheticRhf::chain(n_basis, n_occupied).gaussian();

        c.bench_function(&format!("Segment and index {n_basis} basis functions"), |b| {
            b.iter(|| segment(black_box(&text), Dialect::Gaussian))
        });
    }
}

fn bench_blocks(c: &mut Criterion) {
    for n in [24, 96] {
        let matrix = nalgebra::DMatrix::from_fn(n, n, |i, j| (i as f64 - j as f64) * 0.125);
        let lines: Vec<String> = labelled_blocks(&matrix, LABELLED.columns)
            .lines()
            .map(str::to_owned)
            .collect();

        c.bench_function(&format!("Decode {n}x{n} block matrix"), |b| {
            b.iter(|| decode_matrix(black_box(&lines), 1, n, n, &LABELLED))
        });
    }
}

fn bench_extract(c: &mut Criterion) {
    let chain = SyntheticRhf::chain(24, 12);
    let jobs = segment(&chain.gaussian(), Dialect::Gaussian);
    let config = ParseConfig::default();

    c.bench_function("Extract a 24 basis function TD job", |b| {
        b.iter(|| fasma_core::extract_job(black_box(&jobs[0]), &config, None))
    });
}

criterion_group!(benches, bench_segment, bench_blocks, bench_extract);
criterion_main!(benches);
