// Development: the accept/reject filtering applied to every candidate,
// before and after evaluation. Canonicalizes the cell and enforces the
// hard constraints; rejections are verdicts, not errors, and the run
// always continues past them.

use std::collections::BTreeSet;
use std::fmt;

use log::info;

use crate::config::{Constraints, SearchConfig};
use crate::structure::cell::{Cell, Species};
use crate::structure::niggli;

/// Why a candidate was rejected.
#[derive(Debug, Clone)]
pub enum Rejection {
    /// Degenerate volume, non-finite coordinates, or a failed basis
    /// transform.
    Malformed(String),
    /// A hard constraint failed; `bound` names it.
    Constraint { bound: &'static str, detail: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Malformed(detail) => write!(f, "malformed geometry: {}", detail),
            Rejection::Constraint { bound, detail } => {
                write!(f, "constraint '{}' violated: {}", bound, detail)
            }
        }
    }
}

/// Whether the candidate is being filtered before or after evaluation.
/// Evaluation may relax the cell, so the same checks run twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PreEvaluation,
    PostEvaluation,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::PreEvaluation => write!(f, "pre-evaluation"),
            Phase::PostEvaluation => write!(f, "post-evaluation"),
        }
    }
}

/// The constraint-filtering step.
pub struct Development {
    constraints: Constraints,
    composition: BTreeSet<Species>,
}

// Coincident distinct sites also show up at distance zero; only one
// zero-distance hit (the probe's own image) is legitimate.
const COINCIDENT_EPS: f64 = 1e-6;

impl Development {
    pub fn new(config: &SearchConfig) -> Self {
        Development {
            constraints: config.constraints.clone(),
            composition: config
                .composition_space
                .iter()
                .map(|symbol| Species::new(symbol))
                .collect(),
        }
    }

    /// Canonicalize and filter a candidate cell. On success the returned
    /// cell (Niggli-reduced) replaces the candidate's.
    pub fn develop(&self, cell: &Cell, phase: Phase) -> Result<Cell, Rejection> {
        let result = self.develop_inner(cell);
        if let Err(rejection) = &result {
            info!("{} development rejected candidate: {}", phase, rejection);
        }
        result
    }

    /// Post-evaluation bound on the value itself.
    pub fn check_value(&self, value: f64) -> Result<(), Rejection> {
        if let Some(max_value) = self.constraints.max_value {
            if value > max_value {
                let rejection = Rejection::Constraint {
                    bound: "max value",
                    detail: format!("{} exceeds {}", value, max_value),
                };
                info!("post-evaluation development rejected candidate: {}", rejection);
                return Err(rejection);
            }
        }
        Ok(())
    }

    fn develop_inner(&self, cell: &Cell) -> Result<Cell, Rejection> {
        let reduced = niggli::reduce(cell)
            .map(|r| r.cell)
            .map_err(|err| Rejection::Malformed(err.to_string()))?;

        self.check_atom_count(&reduced)?;
        self.check_composition(&reduced)?;
        self.check_lattice_bounds(&reduced)?;
        self.check_interatomic_distances(&reduced)?;
        Ok(reduced)
    }

    fn check_atom_count(&self, cell: &Cell) -> Result<(), Rejection> {
        let n = cell.num_sites();
        if n < self.constraints.min_num_atoms || n > self.constraints.max_num_atoms {
            return Err(Rejection::Constraint {
                bound: "atom count",
                detail: format!(
                    "{} sites outside [{}, {}]",
                    n, self.constraints.min_num_atoms, self.constraints.max_num_atoms
                ),
            });
        }
        Ok(())
    }

    fn check_composition(&self, cell: &Cell) -> Result<(), Rejection> {
        for site in cell.sites() {
            if !self.composition.contains(&site.species) {
                return Err(Rejection::Constraint {
                    bound: "composition space",
                    detail: format!("species {} is not in the composition space", site.species),
                });
            }
        }
        Ok(())
    }

    fn check_lattice_bounds(&self, cell: &Cell) -> Result<(), Rejection> {
        let (a, b, c) = cell.lattice_parameters();
        for length in [a, b, c] {
            if length < self.constraints.min_lattice_length
                || length > self.constraints.max_lattice_length
            {
                return Err(Rejection::Constraint {
                    bound: "lattice length",
                    detail: format!(
                        "{:.4} A outside [{}, {}]",
                        length,
                        self.constraints.min_lattice_length,
                        self.constraints.max_lattice_length
                    ),
                });
            }
        }
        let (alpha, beta, gamma) = cell.lattice_angles();
        for angle in [alpha, beta, gamma] {
            let degrees = angle.to_degrees();
            if degrees < self.constraints.min_lattice_angle_deg
                || degrees > self.constraints.max_lattice_angle_deg
            {
                return Err(Rejection::Constraint {
                    bound: "lattice angle",
                    detail: format!(
                        "{:.2} degrees outside [{}, {}]",
                        degrees,
                        self.constraints.min_lattice_angle_deg,
                        self.constraints.max_lattice_angle_deg
                    ),
                });
            }
        }
        Ok(())
    }

    fn check_interatomic_distances(&self, cell: &Cell) -> Result<(), Rejection> {
        // Widest threshold any species pair can require.
        let max_radius = cell
            .sites()
            .iter()
            .map(|site| site.species.covalent_radius())
            .fold(0.0, f64::max);
        let search_radius = (self.constraints.min_distance_scale * 2.0 * max_radius)
            .max(self.constraints.min_interatomic_distance.unwrap_or(0.0));
        if search_radius <= 0.0 {
            return Ok(());
        }

        for site in cell.sites() {
            let center = cell.frac_to_cart(site.frac);
            let mut zero_hits = 0;
            for neighbor in cell.neighbors_within(center, search_radius) {
                if neighbor.distance < COINCIDENT_EPS {
                    zero_hits += 1;
                    if zero_hits > 1 {
                        return Err(Rejection::Constraint {
                            bound: "interatomic distance",
                            detail: format!("coincident sites at {}", site.species),
                        });
                    }
                    continue;
                }
                let threshold = (self.constraints.min_distance_scale
                    * (site.species.covalent_radius() + neighbor.species.covalent_radius()))
                .max(self.constraints.min_interatomic_distance.unwrap_or(0.0));
                if neighbor.distance < threshold {
                    return Err(Rejection::Constraint {
                        bound: "interatomic distance",
                        detail: format!(
                            "{}-{} separation {:.3} A below minimum {:.3} A",
                            site.species, neighbor.species, neighbor.distance, threshold
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}
