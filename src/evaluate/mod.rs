// External-collaborator seams: energy evaluation and symmetry analysis.

// ======================== MODULE DECLARATIONS ========================
pub mod pair_potential;

mod _tests_pair_potential;

pub use pair_potential::LennardJones;

use anyhow::{bail, Error};

use crate::structure::cell::Cell;

/// Computes the fitness-determining value (energy per atom) of a cell.
///
/// Convention: a failed or non-convergent computation yields
/// `f64::INFINITY` and returns the input cell unchanged; implementations
/// never error out. Evaluation may relax the geometry, so the returned
/// cell can differ from the input.
pub trait EnergyEvaluator: Send + Sync {
    fn evaluate(&self, cell: &Cell) -> (Cell, f64);
}

/// External symmetry analysis. Both operations may fail; callers must fall
/// back to the input cell unchanged (never fatal).
pub trait SymmetryOracle: Send + Sync {
    /// Symmetry-minimized representative basis.
    fn wyckoff_cell(&self, cell: &Cell) -> Result<Cell, Error>;

    /// Primitive cell of the structure.
    fn primitive_cell(&self, cell: &Cell) -> Result<Cell, Error>;
}

/// Oracle used when no external symmetry code is wired in. Always fails,
/// which makes every caller take its documented fallback path.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOracle;

impl SymmetryOracle for NullOracle {
    fn wyckoff_cell(&self, _cell: &Cell) -> Result<Cell, Error> {
        bail!("no symmetry oracle configured")
    }

    fn primitive_cell(&self, _cell: &Cell) -> Result<Cell, Error> {
        bail!("no symmetry oracle configured")
    }
}
