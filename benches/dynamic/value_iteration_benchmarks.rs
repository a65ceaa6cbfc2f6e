use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use markov_dp::{MarkovDecisionProcess, ValueIteration, ValueIterationConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn random_mdp(n: usize, m: usize) -> MarkovDecisionProcess<usize, usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(2718);
    let mut flat = vec![0.0; n * n * m];
    for s in 0..n {
        for a in 0..m {
            let weights: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
            let total: f64 = weights.iter().sum();
            for (target, w) in weights.iter().enumerate() {
                flat[target * n * m + s * m + a] = w / total;
            }
        }
    }
    let rewards = (0..n * m).map(|_| rng.gen_range(0.0..1.0)).collect();
    MarkovDecisionProcess::new((0..n).collect(), (0..m).collect(), flat, rewards, 0.95).unwrap()
}

fn bench_value_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_iteration");
    for &n in &[16, 64, 256] {
        let mdp = random_mdp(n, 4);
        let config = ValueIterationConfig::default().with_iterations(50);

        group.bench_with_input(BenchmarkId::new("sequential", n), &mdp, |b, mdp| {
            let solver = ValueIteration::new(config);
            b.iter(|| solver.run(black_box(mdp)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("parallel", n), &mdp, |b, mdp| {
            let solver = ValueIteration::new(config.parallel());
            b.iter(|| solver.run(black_box(mdp)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_value_iteration);
criterion_main!(benches);
