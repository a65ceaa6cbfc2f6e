pub mod bellman_equation;
pub mod keyed_table;
pub mod markov_decision_process;

#[cfg(test)]
mod tests;

// Re-export the solver surface with descriptive names
pub use bellman_equation::{
    value_iteration, ActionValues, Parallelism, Policy, ValueFunction, ValueIteration,
    ValueIterationConfig, ValueIterationSolution, DEFAULT_ITERATIONS,
};
pub use keyed_table::KeyedTable;
pub use markov_decision_process::MarkovDecisionProcess;
