use std::fmt;

use serde::{Deserialize, Serialize};

use crate::structure::cell::Cell;

use super::operators::VariationKind;

/// Unique, monotonically-increasing organism identifier. Allocated only by
/// the engine's control thread.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct OrganismId(pub u64);

impl fmt::Display for OrganismId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an organism came to be.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Provenance {
    /// Produced by an initial-structure producer during seeding.
    Seeded,
    /// Produced by a variation operator applied to parent organisms.
    Bred {
        variation: VariationKind,
        parents: Vec<OrganismId>,
    },
    /// Elite carried forward unchanged from a previous generation.
    Promoted { from: OrganismId },
}

/// One candidate in the population: a cell plus its evaluation state.
///
/// `value` is the raw fitness-determining quantity (energy per atom, lower
/// is better), `None` until evaluated. `fitness` is the generation-
/// normalized score in [0, 1], `None` until the generation computes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organism {
    pub id: OrganismId,
    pub cell: Cell,
    pub value: Option<f64>,
    pub fitness: Option<f64>,
    pub provenance: Provenance,
}

impl Organism {
    pub fn new(id: OrganismId, cell: Cell, provenance: Provenance) -> Self {
        Organism {
            id,
            cell,
            value: None,
            fitness: None,
            provenance,
        }
    }

    /// The value with the evaluation-failure sentinel for unknowns.
    pub fn value_or_infinite(&self) -> f64 {
        self.value.unwrap_or(f64::INFINITY)
    }
}
