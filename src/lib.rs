//! Synchronous value iteration for finite, discounted Markov Decision Processes.

pub mod dynamic;
pub mod error;

pub use dynamic::*;
pub use error::{Error, Result};
