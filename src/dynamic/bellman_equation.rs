//! This module provides fixed-budget value iteration for a
//! [`MarkovDecisionProcess`], solving the Bellman optimality equations by
//! synchronous sweeps and extracting a greedy policy.
//!
//! Each sweep has two phases. Every Q-value is first recomputed from the value
//! function of the previous sweep,
//!
//! `Q(s, a) = R(s, a) + gamma * sum_{s'} T(s' | s, a) * V(s')`,
//!
//! and only then is every state value replaced by `max_a Q(s, a)`. No tolerance
//! is applied anywhere: the loop runs exactly the requested number of sweeps and
//! the policy picks, per state, the first action whose Q-value equals the final
//! state value.

use super::keyed_table::KeyedTable;
use super::markov_decision_process::MarkovDecisionProcess;
use crate::error::Result;
use log::{debug, info, log_enabled, trace, warn, Level};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, ArrayView3, ArrayViewMut1, Zip};
use num_traits::Float;
use std::fmt::Debug;
use std::hash::Hash;

/// Sweep budget used when the caller does not pick one.
pub const DEFAULT_ITERATIONS: usize = 1000;

/// Greedy action per state, in state declaration order.
pub type Policy<S, A> = KeyedTable<S, A>;

/// Value per state, in state declaration order.
pub type ValueFunction<S, F> = KeyedTable<S, F>;

/// Q-value per state-action pair, state-major.
pub type ActionValues<S, A, F> = KeyedTable<(S, A), F>;

/// How a sweep is spread over threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parallelism {
    #[default]
    Sequential,
    /// Split each phase across rayon workers. `None` uses the global pool,
    /// `Some(n)` a dedicated pool of `n` threads.
    Parallel { num_threads: Option<usize> },
}

/// Configuration options for value iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueIterationConfig {
    /// Exact number of sweeps to perform
    pub number_iterations: usize,
    /// Threading strategy for each sweep
    pub parallelism: Parallelism,
}

impl Default for ValueIterationConfig {
    fn default() -> Self {
        Self {
            number_iterations: DEFAULT_ITERATIONS,
            parallelism: Parallelism::Sequential,
        }
    }
}

impl ValueIterationConfig {
    pub fn with_iterations(mut self, number_iterations: usize) -> Self {
        self.number_iterations = number_iterations;
        self
    }

    /// Runs sweeps on the global rayon pool.
    pub fn parallel(mut self) -> Self {
        self.parallelism = Parallelism::Parallel { num_threads: None };
        self
    }

    /// Runs sweeps on a dedicated pool of `num_threads` workers.
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.parallelism = Parallelism::Parallel {
            num_threads: Some(num_threads),
        };
        self
    }
}

/// Everything a value iteration run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueIterationSolution<S, A, F> {
    pub policy: Policy<S, A>,
    pub value_function: ValueFunction<S, F>,
    /// Q-values from the final sweep.
    pub action_values: ActionValues<S, A, F>,
    /// Number of sweeps performed.
    pub iterations: usize,
}

/// A configured value iteration solver.
#[derive(Debug, Clone, Default)]
pub struct ValueIteration {
    config: ValueIterationConfig,
}

impl ValueIteration {
    pub fn new(config: ValueIterationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValueIterationConfig {
        &self.config
    }

    /// Solves `mdp` with the configured budget and threading.
    ///
    /// # Errors
    /// Returns `ThreadPool` if a dedicated worker pool cannot be built.
    pub fn run<S, A, F>(
        &self,
        mdp: &MarkovDecisionProcess<S, A, F>,
    ) -> Result<ValueIterationSolution<S, A, F>>
    where
        S: Clone + Eq + Hash + Debug,
        A: Clone + Eq + Hash + Debug,
        F: Float + Debug + Send + Sync,
    {
        let number_iterations = self.config.number_iterations;
        debug!(
            "value iteration: {} states, {} actions, gamma {:?}, {} sweeps, {:?}",
            mdp.num_states(),
            mdp.num_actions(),
            mdp.discount_factor(),
            number_iterations,
            self.config.parallelism
        );
        if mdp.discount_factor() == F::one() && number_iterations > 0 {
            info!("undiscounted model: values are not guaranteed to converge");
        }

        let (q, v) = match self.config.parallelism {
            Parallelism::Sequential => Sweeper::new(mdp, false).run(number_iterations),
            Parallelism::Parallel { num_threads: None } => {
                Sweeper::new(mdp, true).run(number_iterations)
            }
            Parallelism::Parallel {
                num_threads: Some(num_threads),
            } => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build()?;
                let sweeper = Sweeper::new(mdp, true);
                pool.install(|| sweeper.run(number_iterations))
            }
        };

        Ok(assemble(mdp, q, v, number_iterations))
    }
}

/// Performs `number_iterations` synchronous sweeps on the given MDP, returning:
/// 1. A greedy policy (one action per state).
/// 2. The value function after the last sweep (one entry per state).
///
/// With zero sweeps every value is 0 and every state maps to the first action.
///
/// # Examples
///
/// ```
/// use markov_dp::{value_iteration, MarkovDecisionProcess};
///
/// // A pays nothing, B pays 1 per step; both loop on themselves.
/// let mdp: MarkovDecisionProcess<_, _, f64> = MarkovDecisionProcess::new(
///     vec!["A", "B"],
///     vec!["stay"],
///     vec![1.0, 0.0, 0.0, 1.0],
///     vec![0.0, 1.0],
///     0.9,
/// )
/// .unwrap();
///
/// let (policy, values) = value_iteration(&mdp, 100);
///
/// assert_eq!(policy.get(&"A"), Some(&"stay"));
/// assert_eq!(values.get(&"A"), Some(&0.0));
/// assert!((values.get(&"B").unwrap() - 10.0).abs() < 1e-3);
/// ```
pub fn value_iteration<S, A, F>(
    mdp: &MarkovDecisionProcess<S, A, F>,
    number_iterations: usize,
) -> (Policy<S, A>, ValueFunction<S, F>)
where
    S: Clone + Eq + Hash + Debug,
    A: Clone + Eq + Hash + Debug,
    F: Float + Debug + Send + Sync,
{
    let (q, v) = Sweeper::new(mdp, false).run(number_iterations);
    let solution = assemble(mdp, q, v, number_iterations);
    (solution.policy, solution.value_function)
}

/// Borrowed dense tables driving the sweeps. Holds no identifiers, so the
/// parallel path only needs `F: Send + Sync`.
struct Sweeper<'a, F> {
    rewards: ArrayView2<'a, F>,
    transitions: ArrayView3<'a, F>,
    gamma: F,
    parallel: bool,
}

impl<'a, F> Sweeper<'a, F>
where
    F: Float + Debug + Send + Sync,
{
    fn new<S, A>(mdp: &'a MarkovDecisionProcess<S, A, F>, parallel: bool) -> Self
    where
        S: Clone + Eq + Hash + Debug,
        A: Clone + Eq + Hash + Debug,
    {
        Self {
            rewards: mdp.reward_matrix(),
            transitions: mdp.transition_tensor(),
            gamma: mdp.discount_factor(),
            parallel,
        }
    }

    /// Returns the final Q table `[s, a]` and value vector `[s]`.
    fn run(&self, number_iterations: usize) -> (Array2<F>, Array1<F>) {
        let (n, m) = self.rewards.dim();
        let mut q = Array2::zeros((n, m));
        let mut v = Array1::zeros(n);
        let mut v_next = Array1::zeros(n);

        for sweep in 0..number_iterations {
            self.backup(v.view(), &mut q);
            self.maximize(q.view(), &mut v_next);
            if log_enabled!(Level::Trace) {
                let delta = max_abs_diff(v.view(), v_next.view());
                trace!("sweep {}: max |dV| = {:?}", sweep + 1, delta);
            }
            std::mem::swap(&mut v, &mut v_next);
        }

        (q, v)
    }

    fn q_value(&self, i: usize, j: usize, v: ArrayView1<'_, F>) -> F {
        let expected = self
            .transitions
            .slice(s![i, j, ..])
            .iter()
            .zip(v.iter())
            .fold(F::zero(), |acc, (&p, &value)| acc + p * value);
        self.rewards[[i, j]] + self.gamma * expected
    }

    /// Phase (a): overwrite all of `q` from the previous sweep's `v`.
    fn backup(&self, v: ArrayView1<'_, F>, q: &mut Array2<F>) {
        let update = |i: usize, mut row: ArrayViewMut1<'_, F>| {
            for (j, q_ij) in row.iter_mut().enumerate() {
                *q_ij = self.q_value(i, j, v);
            }
        };
        let zip = Zip::indexed(q.rows_mut());
        if self.parallel {
            zip.par_for_each(update);
        } else {
            zip.for_each(update);
        }
    }

    /// Phase (b): overwrite all of `v` with the row maxima of the fresh `q`.
    fn maximize(&self, q: ArrayView2<'_, F>, v: &mut Array1<F>) {
        let zip = Zip::from(v).and(q.rows());
        if self.parallel {
            zip.par_for_each(|v_i, row| *v_i = row_max(row));
        } else {
            zip.for_each(|v_i, row| *v_i = row_max(row));
        }
    }
}

/// Largest entry, keeping the earliest on ties.
fn row_max<F: Float>(row: ArrayView1<'_, F>) -> F {
    row.iter()
        .copied()
        .reduce(|best, q| if q > best { q } else { best })
        .unwrap_or_else(F::neg_infinity)
}

fn max_abs_diff<F: Float>(a: ArrayView1<'_, F>, b: ArrayView1<'_, F>) -> F {
    a.iter()
        .zip(b.iter())
        .fold(F::zero(), |acc, (&x, &y)| acc.max((x - y).abs()))
}

/// Index of the first action whose Q-value equals the state value, per state.
fn greedy_actions<F: Float>(q: ArrayView2<'_, F>, v: ArrayView1<'_, F>) -> Vec<usize> {
    q.rows()
        .into_iter()
        .zip(v.iter())
        .enumerate()
        .map(|(i, (row, &best))| {
            row.iter().position(|&q_ij| q_ij == best).unwrap_or_else(|| {
                warn!(
                    "no action attains the value of state index {}; using the first action",
                    i
                );
                0
            })
        })
        .collect()
}

fn assemble<S, A, F>(
    mdp: &MarkovDecisionProcess<S, A, F>,
    q: Array2<F>,
    v: Array1<F>,
    iterations: usize,
) -> ValueIterationSolution<S, A, F>
where
    S: Clone + Eq + Hash + Debug,
    A: Clone + Eq + Hash + Debug,
    F: Float,
{
    let actions = mdp.actions();
    let policy = mdp
        .states()
        .iter()
        .cloned()
        .zip(
            greedy_actions(q.view(), v.view())
                .into_iter()
                .map(|j| actions[j].clone()),
        )
        .collect();
    let value_function = mdp.states().iter().cloned().zip(v.iter().copied()).collect();
    let action_values = mdp
        .enumerate_pairs()
        .into_iter()
        .zip(q.iter().copied())
        .collect();

    ValueIterationSolution {
        policy,
        value_function,
        action_values,
        iterations,
    }
}
