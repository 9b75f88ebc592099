use criterion::{black_box, criterion_group, criterion_main, Criterion};
use spncrack::{challenge, BitMatrix, SeedSpace, Solver, SolverConfig};

fn engine_benchmarks(c: &mut Criterion) {
    let spn = challenge::spn_with_rounds(8).expect("diffusion matrix is invertible");
    let matrix = BitMatrix::from_rows(challenge::DIFFUSION);

    let mut group = c.benchmark_group("Preimage Search Engine");

    group.bench_function("GF(2) matrix inversion (32x32)", |b| {
        b.iter(|| black_box(matrix).invert().unwrap())
    });

    group.bench_function("seed space construction", |b| {
        b.iter(|| SeedSpace::build(black_box(&spn), black_box(&challenge::TARGET)))
    });

    group.bench_function("forward transform (8 rounds)", |b| {
        let state = [0x5au8; 32];
        b.iter(|| spn.transform(black_box(&state)))
    });

    // The search itself, with and without the lookahead ranking. Fixed RNG
    // seeds keep each measurement on an identical node sequence.
    group.bench_function("solve 8 rounds (lexicographic)", |b| {
        b.iter(|| Solver::new(&spn, challenge::TARGET).solve().unwrap())
    });

    group.bench_function("solve 8 rounds (ranked)", |b| {
        let config = SolverConfig {
            use_heuristic: true,
            ..SolverConfig::default()
        };
        b.iter(|| {
            Solver::with_config(&spn, challenge::TARGET, config.clone())
                .solve()
                .unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, engine_benchmarks);
criterion_main!(benches);
