use crate::dynamic::{
    value_iteration, MarkovDecisionProcess, ValueIteration, ValueIterationConfig,
};
use approx::{assert_abs_diff_eq, assert_relative_eq};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Builds a random MDP with stochastic transition rows, flattened target-major.
fn random_mdp(n: usize, m: usize, gamma: f64, seed: u64) -> MarkovDecisionProcess<usize, usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut flat = vec![0.0; n * n * m];
    for s in 0..n {
        for a in 0..m {
            let weights: Vec<f64> = (0..n).map(|_| rng.gen::<f64>() + 1e-3).collect();
            let total: f64 = weights.iter().sum();
            for (target, w) in weights.iter().enumerate() {
                flat[target * n * m + s * m + a] = w / total;
            }
        }
    }
    let rewards = (0..n * m).map(|_| rng.gen_range(-1.0..1.0)).collect();
    MarkovDecisionProcess::new((0..n).collect(), (0..m).collect(), flat, rewards, gamma).unwrap()
}

#[test]
fn test_single_state_partial_sums_discounted() {
    let r = 2.0;
    let gamma: f64 = 0.5;
    let mdp = MarkovDecisionProcess::new(vec!["s"], vec!["a"], vec![1.0], vec![r], gamma).unwrap();

    for k in [1, 2, 5, 20] {
        let (_, v) = value_iteration(&mdp, k);
        let expected = r * (1.0 - gamma.powi(k as i32)) / (1.0 - gamma);
        assert_relative_eq!(*v.get(&"s").unwrap(), expected, epsilon = 1e-12);
    }
}

#[test]
fn test_single_state_undiscounted_grows_linearly() {
    let mdp = MarkovDecisionProcess::undiscounted(vec!["s"], vec!["a"], vec![1.0], vec![3.0])
        .unwrap();
    for k in [1, 7, 50] {
        let (policy, v) = value_iteration(&mdp, k);
        assert_eq!(v.get(&"s"), Some(&(3.0 * k as f64)));
        assert_eq!(policy.get(&"s"), Some(&"a"));
    }
}

#[test]
fn test_zero_iterations_yield_zero_values_and_first_actions() {
    let mdp = random_mdp(4, 3, 0.9, 7);
    let solution = ValueIteration::new(ValueIterationConfig::default().with_iterations(0))
        .run(&mdp)
        .unwrap();

    assert_eq!(solution.iterations, 0);
    assert!(solution.value_function.values().all(|&v| v == 0.0));
    assert!(solution.action_values.values().all(|&q| q == 0.0));
    assert!(solution.policy.values().all(|&a| a == 0));
    assert_eq!(solution.policy.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
}

#[test]
fn test_two_state_self_loops() {
    let mdp = MarkovDecisionProcess::new(
        vec!["A", "B"],
        vec!["stay"],
        vec![1.0, 0.0, 0.0, 1.0],
        vec![0.0, 1.0],
        0.9,
    )
    .unwrap();

    let (policy, v) = value_iteration(&mdp, 100);

    assert_eq!(v.get(&"A"), Some(&0.0));
    assert_abs_diff_eq!(*v.get(&"B").unwrap(), 10.0, epsilon = 1e-3);
    assert_eq!(policy.get(&"A"), Some(&"stay"));
    assert_eq!(policy.get(&"B"), Some(&"stay"));
}

// "right" from A reaches B; every other pair loops on itself. B pays 1 per
// step whichever action is taken, so both of B's Q-values always tie.
fn left_right() -> MarkovDecisionProcess<&'static str, &'static str> {
    MarkovDecisionProcess::new(
        vec!["A", "B"],
        vec!["left", "right"],
        vec![
            1.0, 0.0, 0.0, 0.0, // target A
            0.0, 1.0, 1.0, 1.0, // target B
        ],
        vec![0.0, 0.0, 1.0, 1.0],
        0.9,
    )
    .unwrap()
}

#[test]
fn test_left_right_tie_break() {
    let mdp = left_right();

    // After one sweep both actions at A are worth 0: the first one wins.
    let (policy, _) = value_iteration(&mdp, 1);
    assert_eq!(policy.get(&"A"), Some(&"left"));
    assert_eq!(policy.get(&"B"), Some(&"left"));

    let solution = ValueIteration::new(ValueIterationConfig::default().with_iterations(200))
        .run(&mdp)
        .unwrap();
    assert_eq!(solution.policy.get(&"A"), Some(&"right"));
    assert_eq!(solution.policy.get(&"B"), Some(&"left"));

    let v_a = *solution.value_function.get(&"A").unwrap();
    let v_b = *solution.value_function.get(&"B").unwrap();
    assert_eq!(solution.action_values.get(&("A", "right")), Some(&v_a));
    assert_eq!(
        solution.action_values.get(&("B", "left")),
        solution.action_values.get(&("B", "right"))
    );
    assert_abs_diff_eq!(v_b, 10.0, epsilon = 1e-6);
    assert_abs_diff_eq!(v_a, 9.0, epsilon = 1e-6);
}

#[test]
fn test_policy_attains_value_exactly() {
    let mdp = random_mdp(6, 4, 0.95, 42);
    let solution = ValueIteration::new(ValueIterationConfig::default().with_iterations(150))
        .run(&mdp)
        .unwrap();

    for (state, action) in solution.policy.iter() {
        let v = *solution.value_function.get(state).unwrap();
        let q = *solution.action_values.get(&(*state, *action)).unwrap();
        assert_eq!(q, v);
        // No earlier action reaches the same value.
        for earlier in 0..*action {
            assert!(*solution.action_values.get(&(*state, earlier)).unwrap() < v);
        }
    }
}

#[test]
fn test_runs_are_deterministic() {
    let mdp = random_mdp(5, 3, 0.8, 1234);
    let first = value_iteration(&mdp, 60);
    let second = value_iteration(&mdp, 60);
    assert_eq!(first, second);
}

#[test]
fn test_parallel_sweeps_match_sequential_exactly() {
    let mdp = random_mdp(12, 5, 0.9, 99);
    let config = ValueIterationConfig::default().with_iterations(80);

    let sequential = ValueIteration::new(config).run(&mdp).unwrap();
    let global_pool = ValueIteration::new(config.parallel()).run(&mdp).unwrap();
    let dedicated_pool = ValueIteration::new(config.with_threads(3)).run(&mdp).unwrap();

    assert_eq!(sequential, global_pool);
    assert_eq!(sequential, dedicated_pool);
}

#[test]
fn test_keyed_and_flat_models_solve_identically() {
    let flat = left_right();
    let keyed = MarkovDecisionProcess::from_tables(
        vec!["A", "B"],
        vec!["left", "right"],
        vec![
            (("A", "A", "left"), 1.0),
            (("B", "A", "right"), 1.0),
            (("B", "B", "left"), 1.0),
            (("B", "B", "right"), 1.0),
        ],
        vec![
            (("B", "right"), 1.0),
            (("A", "left"), 0.0),
            (("B", "left"), 1.0),
            (("A", "right"), 0.0),
        ],
        0.9,
    )
    .unwrap();

    assert_eq!(value_iteration(&flat, 50), value_iteration(&keyed, 50));
}
