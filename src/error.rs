use thiserror::Error;

/// Errors raised while building or solving a Markov Decision Process.
///
/// State and action identifiers are carried in their `Debug` rendering so the
/// error type stays independent of the identifier types.
#[derive(Debug, Error)]
pub enum Error {
    /// A flat input list does not have the length implied by the state and action counts.
    #[error("shape mismatch for {what}: expected {expected} values, got {actual}")]
    ShapeMismatch {
        /// Which input list is wrong
        what: &'static str,
        /// Length implied by the model
        expected: usize,
        /// Length supplied
        actual: usize,
    },

    /// Empty or repeated state or action identifiers.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// Discount factor outside `[0, 1]` or NaN.
    #[error("discount factor must lie in [0, 1], got {0}")]
    InvalidDiscountFactor(f64),

    /// A transition entry outside `[0, 1]`.
    #[error("transition probability {probability} out of range for {target} <- ({state}, {action})")]
    InvalidProbability {
        /// Target state
        target: String,
        /// Source state
        state: String,
        /// Action taken
        action: String,
        /// Offending value
        probability: f64,
    },

    /// A transition row whose probabilities do not sum to 1.
    #[error("transition row ({state}, {action}) sums to {sum}, expected 1")]
    NonStochasticRow {
        /// Source state
        state: String,
        /// Action taken
        action: String,
        /// Row total
        sum: f64,
    },

    /// A keyed row names a state the model does not declare.
    #[error("unknown state {0}")]
    UnknownState(String),

    /// A keyed row names an action the model does not declare.
    #[error("unknown action {0}")]
    UnknownAction(String),

    /// A keyed row repeats a key already supplied.
    #[error("duplicate entry for {0}")]
    DuplicateEntry(String),

    /// Keyed construction left a state-action pair without a reward.
    #[error("missing reward for {0}")]
    MissingReward(String),

    /// A dedicated rayon pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;
