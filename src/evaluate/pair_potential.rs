// Built-in Lennard-Jones evaluator. Gives the engine and the CLI a real,
// deterministic collaborator without an external simulation code; it makes
// no claim of chemical accuracy.

use nalgebra::Vector3;

use crate::structure::cell::Cell;

use super::EnergyEvaluator;

/// 12-6 Lennard-Jones pair potential with a hard cutoff and optional
/// steepest-descent relaxation of the site positions (lattice held fixed).
#[derive(Debug, Clone, Copy)]
pub struct LennardJones {
    /// Well depth, in the run's energy unit.
    pub epsilon: f64,
    /// Zero-crossing distance, in Angstroms.
    pub sigma: f64,
    /// Interaction cutoff, in Angstroms.
    pub cutoff: f64,
    /// Number of steepest-descent steps; 0 evaluates the input as-is.
    pub relax_steps: usize,
    /// Step length per unit force, in Angstroms.
    pub step_size: f64,
}

impl Default for LennardJones {
    fn default() -> Self {
        LennardJones {
            epsilon: 1.0,
            sigma: 2.0,
            cutoff: 6.0,
            relax_steps: 0,
            step_size: 0.01,
        }
    }
}

// Self-images show up at distance zero in the neighbor list.
const SELF_IMAGE_EPS: f64 = 1e-8;

impl LennardJones {
    /// Total energy divided by the number of sites. Pair terms are halved
    /// because the per-site neighbor sums count each pair twice.
    pub fn energy_per_atom(&self, cell: &Cell) -> f64 {
        if cell.num_sites() == 0 {
            return f64::INFINITY;
        }
        let mut total = 0.0;
        for site in cell.sites() {
            let center = cell.frac_to_cart(site.frac);
            for neighbor in cell.neighbors_within(center, self.cutoff) {
                if neighbor.distance < SELF_IMAGE_EPS {
                    continue;
                }
                let sr6 = (self.sigma / neighbor.distance).powi(6);
                total += 0.5 * 4.0 * self.epsilon * (sr6 * sr6 - sr6);
            }
        }
        total / cell.num_sites() as f64
    }

    /// Analytic force on every site from the pair potential.
    fn forces(&self, cell: &Cell) -> Vec<Vector3<f64>> {
        cell.sites()
            .iter()
            .map(|site| {
                let center = cell.frac_to_cart(site.frac);
                let mut force = Vector3::zeros();
                for neighbor in cell.neighbors_within(center, self.cutoff) {
                    if neighbor.distance < SELF_IMAGE_EPS {
                        continue;
                    }
                    let sr6 = (self.sigma / neighbor.distance).powi(6);
                    let magnitude = 24.0 * self.epsilon * (2.0 * sr6 * sr6 - sr6)
                        / (neighbor.distance * neighbor.distance);
                    force += magnitude * (center - neighbor.position);
                }
                force
            })
            .collect()
    }
}

impl EnergyEvaluator for LennardJones {
    fn evaluate(&self, cell: &Cell) -> (Cell, f64) {
        let mut current = cell.wrapped();

        for _ in 0..self.relax_steps {
            let forces = self.forces(&current);
            let moved: Vec<_> = current
                .sites()
                .iter()
                .zip(&forces)
                .map(|(site, force)| {
                    let step = current.cart_to_frac(self.step_size * force);
                    crate::structure::cell::Site::new(site.species.clone(), site.frac + step)
                })
                .collect();
            match current.with_sites(moved) {
                Ok(next) => current = next.wrapped(),
                // Relaxation walked into malformed geometry: report failure.
                Err(_) => return (cell.clone(), f64::INFINITY),
            }
        }

        let energy = self.energy_per_atom(&current);
        if energy.is_finite() {
            (current, energy)
        } else {
            (cell.clone(), f64::INFINITY)
        }
    }
}
