//! A finite Markov Decision Process built from flat or keyed input lists.
//!
//! The flat layout follows a fixed ordering contract. With `n` states and `m`
//! actions, rewards hold `n * m` values ordered state-major (for each state,
//! for each action), and transition probabilities hold `n * n * m` values
//! ordered by target state first, then by the same state-major pair order.
//! Lengths are checked at construction and the values are cached as dense
//! tables so solvers never re-derive them.

use super::keyed_table::KeyedTable;
use crate::error::{Error, Result};
use approx::AbsDiffEq;
use indexmap::IndexSet;
use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3};
use num_traits::Float;
use std::fmt::Debug;
use std::hash::Hash;

/// A finite MDP with a shared action set for every state.
#[derive(Debug, Clone)]
pub struct MarkovDecisionProcess<S, A, F = f64> {
    states: IndexSet<S>,
    actions: IndexSet<A>,
    /// Rewards indexed `[s, a]`.
    rewards: Array2<F>,
    /// Transition probabilities indexed `[s, a, s']`.
    transitions: Array3<F>,
    discount_factor: F,
}

impl<S, A, F> MarkovDecisionProcess<S, A, F>
where
    S: Clone + Eq + Hash + Debug,
    A: Clone + Eq + Hash + Debug,
    F: Float,
{
    /// Creates a new MDP from flat input lists.
    ///
    /// # Errors
    /// - `InvalidModel` if the state or action set is empty or repeats an identifier.
    /// - `InvalidDiscountFactor` if `discount_factor` is outside `[0, 1]`.
    /// - `ShapeMismatch` if `reward_values.len() != n * m` or
    ///   `transition_probabilities.len() != n * n * m`.
    ///
    /// # Examples
    ///
    /// ```
    /// use markov_dp::MarkovDecisionProcess;
    ///
    /// let mdp = MarkovDecisionProcess::new(
    ///     vec!["A", "B"],
    ///     vec!["stay"],
    ///     // T(A|A,stay), T(A|B,stay), T(B|A,stay), T(B|B,stay)
    ///     vec![1.0, 0.0, 0.0, 1.0],
    ///     vec![0.0, 1.0],
    ///     0.9,
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(mdp.reward(&"B", &"stay"), Some(1.0));
    /// assert_eq!(mdp.transition_probability(&"A", &"B", &"stay"), Some(0.0));
    /// ```
    pub fn new(
        states: Vec<S>,
        actions: Vec<A>,
        transition_probabilities: Vec<F>,
        reward_values: Vec<F>,
        discount_factor: F,
    ) -> Result<Self> {
        let states = collect_identifiers(states, "state")?;
        let actions = collect_identifiers(actions, "action")?;
        check_discount_factor(discount_factor)?;

        let n = states.len();
        let m = actions.len();

        let reward_len = reward_values.len();
        let rewards = Array2::from_shape_vec((n, m), reward_values).map_err(|_| {
            Error::ShapeMismatch {
                what: "reward values",
                expected: n * m,
                actual: reward_len,
            }
        })?;
        // Flat order is [s', s, a]; solvers want each (s, a) row contiguous.
        let transition_len = transition_probabilities.len();
        let by_target = Array3::from_shape_vec((n, n, m), transition_probabilities).map_err(|_| {
            Error::ShapeMismatch {
                what: "transition probabilities",
                expected: n * n * m,
                actual: transition_len,
            }
        })?;
        let by_pair = by_target.permuted_axes([1, 2, 0]);
        let transitions = by_pair.as_standard_layout().into_owned();

        Ok(Self {
            states,
            actions,
            rewards,
            transitions,
            discount_factor,
        })
    }

    /// Creates an MDP with discount factor 1.
    pub fn undiscounted(
        states: Vec<S>,
        actions: Vec<A>,
        transition_probabilities: Vec<F>,
        reward_values: Vec<F>,
    ) -> Result<Self> {
        Self::new(
            states,
            actions,
            transition_probabilities,
            reward_values,
            F::one(),
        )
    }

    /// Creates an MDP from keyed rows instead of positional lists.
    ///
    /// Transition rows are `((target, state, action), probability)`; rows that
    /// are never mentioned have probability zero. Reward rows are
    /// `((state, action), reward)` and every pair must be covered.
    pub fn from_tables<T, R>(
        states: Vec<S>,
        actions: Vec<A>,
        transitions: T,
        rewards: R,
        discount_factor: F,
    ) -> Result<Self>
    where
        T: IntoIterator<Item = ((S, S, A), F)>,
        R: IntoIterator<Item = ((S, A), F)>,
    {
        let states = collect_identifiers(states, "state")?;
        let actions = collect_identifiers(actions, "action")?;
        check_discount_factor(discount_factor)?;

        let n = states.len();
        let m = actions.len();

        let mut reward_grid: Array2<Option<F>> = Array2::from_elem((n, m), None);
        for ((state, action), reward) in rewards {
            let i = lookup_state(&states, &state)?;
            let j = lookup_action(&actions, &action)?;
            if reward_grid[[i, j]].replace(reward).is_some() {
                return Err(Error::DuplicateEntry(format!("{:?}", (state, action))));
            }
        }
        let mut reward_values = Array2::zeros((n, m));
        for (i, state) in states.iter().enumerate() {
            for (j, action) in actions.iter().enumerate() {
                reward_values[[i, j]] = reward_grid[[i, j]]
                    .ok_or_else(|| Error::MissingReward(format!("{:?}", (state, action))))?;
            }
        }

        let mut transition_grid = Array3::zeros((n, m, n));
        let mut seen = Array3::from_elem((n, m, n), false);
        for ((target, state, action), probability) in transitions {
            let k = lookup_state(&states, &target)?;
            let i = lookup_state(&states, &state)?;
            let j = lookup_action(&actions, &action)?;
            if std::mem::replace(&mut seen[[i, j, k]], true) {
                return Err(Error::DuplicateEntry(format!(
                    "{:?}",
                    (target, state, action)
                )));
            }
            transition_grid[[i, j, k]] = probability;
        }

        Ok(Self {
            states,
            actions,
            rewards: reward_values,
            transitions: transition_grid,
            discount_factor,
        })
    }

    /// States in declaration order.
    pub fn states(&self) -> &IndexSet<S> {
        &self.states
    }

    /// Actions in declaration order.
    pub fn actions(&self) -> &IndexSet<A> {
        &self.actions
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }

    pub fn discount_factor(&self) -> F {
        self.discount_factor
    }

    /// Position of `state` in declaration order.
    pub fn state_index(&self, state: &S) -> Option<usize> {
        self.states.get_index_of(state)
    }

    /// Position of `action` in declaration order.
    pub fn action_index(&self, action: &A) -> Option<usize> {
        self.actions.get_index_of(action)
    }

    /// R(s, a), or `None` for an unknown identifier.
    pub fn reward(&self, state: &S, action: &A) -> Option<F> {
        let i = self.state_index(state)?;
        let j = self.action_index(action)?;
        Some(self.rewards[[i, j]])
    }

    /// T(target | state, action), or `None` for an unknown identifier.
    pub fn transition_probability(&self, target: &S, state: &S, action: &A) -> Option<F> {
        let k = self.state_index(target)?;
        let i = self.state_index(state)?;
        let j = self.action_index(action)?;
        Some(self.transitions[[i, j, k]])
    }

    /// Dense reward matrix indexed `[s, a]`.
    pub fn reward_matrix(&self) -> ArrayView2<'_, F> {
        self.rewards.view()
    }

    /// Dense transition tensor indexed `[s, a, s']`.
    pub fn transition_tensor(&self) -> ArrayView3<'_, F> {
        self.transitions.view()
    }

    /// All state-action pairs, state-major.
    pub fn enumerate_pairs(&self) -> Vec<(S, A)> {
        self.states
            .iter()
            .flat_map(|state| {
                self.actions
                    .iter()
                    .map(move |action| (state.clone(), action.clone()))
            })
            .collect()
    }

    /// R keyed by `(state, action)`, in [`enumerate_pairs`](Self::enumerate_pairs) order.
    pub fn reward_table(&self) -> KeyedTable<(S, A), F> {
        self.enumerate_pairs()
            .into_iter()
            .zip(self.rewards.iter().copied())
            .collect()
    }

    /// T keyed by `(target, state, action)`: target outer, then state-major pairs.
    pub fn transition_table(&self) -> KeyedTable<(S, S, A), F> {
        let pairs = self.enumerate_pairs();
        let mut table = KeyedTable::with_capacity(self.num_states() * pairs.len());
        let m = self.num_actions();
        for (k, target) in self.states.iter().enumerate() {
            for (p, (state, action)) in pairs.iter().enumerate() {
                let probability = self.transitions[[p / m, p % m, k]];
                table.insert((target.clone(), state.clone(), action.clone()), probability);
            }
        }
        table
    }

    /// Checks that every transition row is a probability distribution.
    ///
    /// Construction does not enforce this; solvers assume it.
    ///
    /// # Errors
    /// - `InvalidProbability` for an entry outside `[0, 1]`.
    /// - `NonStochasticRow` if a row sum differs from 1 by more than `epsilon`.
    pub fn validate_stochastic(&self, epsilon: F) -> Result<()>
    where
        F: AbsDiffEq<Epsilon = F>,
    {
        for (i, state) in self.states.iter().enumerate() {
            for (j, action) in self.actions.iter().enumerate() {
                let row = self.transitions.slice(s![i, j, ..]);
                for (k, &probability) in row.iter().enumerate() {
                    if !(probability >= F::zero() && probability <= F::one()) {
                        return Err(Error::InvalidProbability {
                            target: format!("{:?}", self.states[k]),
                            state: format!("{:?}", state),
                            action: format!("{:?}", action),
                            probability: probability.to_f64().unwrap_or(f64::NAN),
                        });
                    }
                }
                let sum = row.iter().fold(F::zero(), |acc, &p| acc + p);
                if !sum.abs_diff_eq(&F::one(), epsilon) {
                    return Err(Error::NonStochasticRow {
                        state: format!("{:?}", state),
                        action: format!("{:?}", action),
                        sum: sum.to_f64().unwrap_or(f64::NAN),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Collects identifiers in declaration order, rejecting empty or repeated ones.
fn collect_identifiers<T>(items: Vec<T>, kind: &str) -> Result<IndexSet<T>>
where
    T: Eq + Hash + Debug,
{
    if items.is_empty() {
        return Err(Error::InvalidModel(format!("{} set is empty", kind)));
    }
    let mut set = IndexSet::with_capacity(items.len());
    for item in items {
        let (i, inserted) = set.insert_full(item);
        if !inserted {
            return Err(Error::InvalidModel(format!(
                "duplicate {} {:?}",
                kind, set[i]
            )));
        }
    }
    Ok(set)
}

fn check_discount_factor<F: Float>(discount_factor: F) -> Result<()> {
    if discount_factor >= F::zero() && discount_factor <= F::one() {
        Ok(())
    } else {
        Err(Error::InvalidDiscountFactor(
            discount_factor.to_f64().unwrap_or(f64::NAN),
        ))
    }
}

fn lookup_state<S: Eq + Hash + Debug>(states: &IndexSet<S>, state: &S) -> Result<usize> {
    states
        .get_index_of(state)
        .ok_or_else(|| Error::UnknownState(format!("{:?}", state)))
}

fn lookup_action<A: Eq + Hash + Debug>(actions: &IndexSet<A>, action: &A) -> Result<usize> {
    actions
        .get_index_of(action)
        .ok_or_else(|| Error::UnknownAction(format!("{:?}", action)))
}
