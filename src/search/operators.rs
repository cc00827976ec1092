// Selection and variation operator families. Both are closed enums: the
// set of operators is fixed, and weights over them are configuration.

use anyhow::{anyhow, bail, Error};
use nalgebra::{Matrix3, Vector3};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::config::{MutationParams, SearchConfig};
use crate::structure::cell::{Cell, Site, Species};

use super::generation::Generation;
use super::organism::Organism;

/// The variation operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariationKind {
    /// Lattice strain plus site jiggle on one parent.
    Mutation,
    /// Cut-and-splice of two parents.
    Crossover,
    /// Species swap between two unlike sites of one parent.
    Permutation,
    /// Elite carried forward unchanged (applied by the engine, not drawn).
    Promotion,
}

/// Parent selection over a finalized generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Selection {
    /// Best of `size` uniformly drawn organisms, by fitness.
    Tournament { size: usize },
    /// Fitness-proportionate draw.
    Roulette,
}

impl Selection {
    pub fn pick<'a, R: Rng>(
        &self,
        generation: &'a Generation,
        rng: &mut R,
    ) -> Option<&'a Organism> {
        let organisms = generation.organisms();
        if organisms.is_empty() {
            return None;
        }
        match self {
            Selection::Tournament { size } => {
                let mut best: Option<&Organism> = None;
                for _ in 0..(*size).max(1) {
                    let candidate = &organisms[rng.gen_range(0..organisms.len())];
                    let better = best.map_or(true, |current| {
                        candidate.fitness.unwrap_or(0.0) > current.fitness.unwrap_or(0.0)
                    });
                    if better {
                        best = Some(candidate);
                    }
                }
                best
            }
            Selection::Roulette => {
                let total: f64 = organisms
                    .iter()
                    .map(|o| o.fitness.unwrap_or(0.0).max(0.0))
                    .sum();
                if total <= 0.0 {
                    return Some(&organisms[rng.gen_range(0..organisms.len())]);
                }
                let target = rng.gen::<f64>() * total;
                let mut cumulative = 0.0;
                for organism in organisms {
                    cumulative += organism.fitness.unwrap_or(0.0).max(0.0);
                    if cumulative >= target {
                        return Some(organism);
                    }
                }
                organisms.last()
            }
        }
    }
}

/// Draw weights over the drawable variation kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VariationWeights {
    pub mutation: f64,
    pub crossover: f64,
    pub permutation: f64,
}

impl VariationWeights {
    pub fn draw<R: Rng>(&self, rng: &mut R) -> VariationKind {
        let total = self.mutation + self.crossover + self.permutation;
        if total <= 0.0 {
            return VariationKind::Mutation;
        }
        let target = rng.gen::<f64>() * total;
        if target < self.mutation {
            VariationKind::Mutation
        } else if target < self.mutation + self.crossover {
            VariationKind::Crossover
        } else {
            VariationKind::Permutation
        }
    }
}

/// Strain the lattice and jiggle the sites of one parent cell.
pub fn mutate<R: Rng>(parent: &Cell, params: &MutationParams, rng: &mut R) -> Result<Cell, Error> {
    let strain_dist = Normal::new(0.0, params.strain_sigma.max(1e-12))
        .map_err(|err| anyhow!("bad strain sigma: {}", err))?;
    let jiggle_dist = Normal::new(0.0, params.jiggle_sigma.max(1e-12))
        .map_err(|err| anyhow!("bad jiggle sigma: {}", err))?;

    let mut strain = Matrix3::identity();
    for row in 0..3 {
        for col in 0..3 {
            strain[(row, col)] +=
                strain_dist
                    .sample(rng)
                    .clamp(-params.max_strain, params.max_strain);
        }
    }
    let strained = Cell::new(strain * parent.lattice(), parent.sites().to_vec())?;

    let jiggled: Vec<Site> = strained
        .sites()
        .iter()
        .map(|site| {
            let displacement = Vector3::new(
                jiggle_dist.sample(rng),
                jiggle_dist.sample(rng),
                jiggle_dist.sample(rng),
            );
            Site::new(
                site.species.clone(),
                site.frac + strained.cart_to_frac(displacement),
            )
        })
        .collect();
    strained.with_sites(jiggled)
}

/// Cut-and-splice crossover: average the parent lattices, take the sites
/// on one side of a random fractional cut plane from each parent.
pub fn crossover<R: Rng>(first: &Cell, second: &Cell, rng: &mut R) -> Result<Cell, Error> {
    let lattice = (first.lattice() + second.lattice()) * 0.5;
    let axis = rng.gen_range(0..3);
    let cut = rng.gen_range(0.25..0.75);

    let mut sites = Vec::new();
    for site in first.wrapped().sites() {
        if site.frac[axis] < cut {
            sites.push(site.clone());
        }
    }
    for site in second.wrapped().sites() {
        if site.frac[axis] >= cut {
            sites.push(site.clone());
        }
    }
    if sites.is_empty() {
        bail!("crossover produced an empty basis");
    }
    Cell::new(lattice, sites)
}

/// Swap the species of two unlike sites.
pub fn permute_species<R: Rng>(parent: &Cell, rng: &mut R) -> Result<Cell, Error> {
    let sites = parent.sites();
    let distinct = parent.species_counts().len();
    if distinct < 2 {
        bail!("species permutation needs at least two distinct species");
    }
    // Distinct species exist, so a random unlike pair turns up quickly.
    for _ in 0..64 {
        let i = rng.gen_range(0..sites.len());
        let j = rng.gen_range(0..sites.len());
        if i == j || sites[i].species == sites[j].species {
            continue;
        }
        let mut swapped = sites.to_vec();
        let species_i = swapped[i].species.clone();
        swapped[i].species = swapped[j].species.clone();
        swapped[j].species = species_i;
        return parent.with_sites(swapped);
    }
    bail!("species permutation found no unlike pair");
}

/// Initial-structure producers for the seeding state, each with a
/// remaining-quota counter.
pub enum Producer {
    /// Random lattices and bases drawn within the constraint bounds.
    Random { remaining: u32 },
    /// Caller-provided seed structures, consumed in order.
    Seeds { cells: Vec<Cell>, cursor: usize },
}

impl Producer {
    pub fn remaining(&self) -> u32 {
        match self {
            Producer::Random { remaining } => *remaining,
            Producer::Seeds { cells, cursor } => (cells.len() - cursor) as u32,
        }
    }

    /// Force the quota to zero after a failed draw.
    pub fn force_exhausted(&mut self) {
        match self {
            Producer::Random { remaining } => *remaining = 0,
            Producer::Seeds { cells, cursor } => *cursor = cells.len(),
        }
    }

    /// Account for an accepted organism.
    pub fn note_accepted(&mut self) {
        match self {
            Producer::Random { remaining } => *remaining = remaining.saturating_sub(1),
            // Seeds advance on every draw instead.
            Producer::Seeds { .. } => {}
        }
    }

    pub fn produce<R: Rng>(&mut self, config: &SearchConfig, rng: &mut R) -> Result<Cell, Error> {
        match self {
            Producer::Random { .. } => random_cell(config, rng),
            Producer::Seeds { cells, cursor } => {
                let cell = cells
                    .get(*cursor)
                    .cloned()
                    .ok_or_else(|| anyhow!("seed producer exhausted"))?;
                *cursor += 1;
                Ok(cell)
            }
        }
    }
}

/// Draw a random cell within the configured bounds.
fn random_cell<R: Rng>(config: &SearchConfig, rng: &mut R) -> Result<Cell, Error> {
    let constraints = &config.constraints;
    for _ in 0..100 {
        let length =
            |rng: &mut R| rng.gen_range(constraints.min_lattice_length..=constraints.max_lattice_length);
        let angle = |rng: &mut R| {
            rng.gen_range(constraints.min_lattice_angle_deg..=constraints.max_lattice_angle_deg)
                .to_radians()
        };
        let (a, b, c) = (length(rng), length(rng), length(rng));
        let (alpha, beta, gamma) = (angle(rng), angle(rng), angle(rng));

        let num_atoms = rng.gen_range(constraints.min_num_atoms..=constraints.max_num_atoms);
        let sites = (0..num_atoms)
            .map(|_| {
                let symbol = &config.composition_space[rng.gen_range(0..config.composition_space.len())];
                Site::new(
                    Species::new(symbol),
                    Vector3::new(rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>()),
                )
            })
            .collect();

        if let Ok(cell) = Cell::from_parameters(a, b, c, alpha, beta, gamma, sites) {
            return Ok(cell);
        }
    }
    bail!("random producer failed to build a non-degenerate lattice")
}
