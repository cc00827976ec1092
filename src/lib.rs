//! Evolutionary crystal-structure search library
//!
//! This library implements a population-based stochastic search for low-energy
//! periodic atomic arrangements in a given composition space. It provides a
//! periodic-lattice geometry engine (Niggli reduction, supercell construction,
//! tolerance-based structure matching) and a generation-based evolutionary
//! control loop with bounded-concurrency fitness evaluation.

pub mod config;
pub mod evaluate;
pub mod search;
pub mod structure;

/// Common result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
