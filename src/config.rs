// Constants and run configuration

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::search::convergence::ConvergenceCriterion;
use crate::search::operators::{Selection, VariationWeights};

// Tolerances
pub const LATTICE_TOLERANCE: f64 = 1e-10; // For most lattice operations
pub const NIGGLI_TOLERANCE: f64 = 1e-8; // Step guards of the Niggli reduction
pub const DEGENERATE_VOLUME_EPS: f64 = 1e-9; // Below this a lattice is malformed
pub const SUPERCELL_SITE_EPS: f64 = 1e-8; // Fractional boundary filter for supercell sites
pub const SUPERCELL_VOLUME_WINDOW: f64 = 1e-3; // 0.1% volume window in the supercell search

/// Parameters of the lattice-strain / site-jiggle mutation operator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MutationParams {
    /// Standard deviation of the random strain components.
    pub strain_sigma: f64,
    /// Per-component clamp on the strain matrix entries.
    pub max_strain: f64,
    /// Standard deviation of the Cartesian site displacement, in Angstroms.
    pub jiggle_sigma: f64,
}

impl Default for MutationParams {
    fn default() -> Self {
        MutationParams {
            strain_sigma: 0.05,
            max_strain: 0.2,
            jiggle_sigma: 0.2,
        }
    }
}

/// Misfit tolerances of the structure matcher.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatcherParams {
    /// Allowed site displacement between matched structures, in Angstroms.
    pub atomic_misfit: f64,
    /// Allowed deviation of the lattice lengths, in Angstroms.
    pub length_misfit: f64,
    /// Allowed deviation of the lattice angles, in degrees.
    pub angle_misfit_deg: f64,
}

impl Default for MatcherParams {
    fn default() -> Self {
        MatcherParams {
            atomic_misfit: 0.15,
            length_misfit: 0.1,
            angle_misfit_deg: 2.0,
        }
    }
}

/// Hard constraints enforced by the development step on every candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    pub min_num_atoms: usize,
    pub max_num_atoms: usize,
    /// Bounds on the lattice lengths, in Angstroms.
    pub min_lattice_length: f64,
    pub max_lattice_length: f64,
    /// Bounds on the lattice angles, in degrees.
    pub min_lattice_angle_deg: f64,
    pub max_lattice_angle_deg: f64,
    /// The minimum allowed separation of two sites is this factor times the
    /// sum of their covalent radii.
    pub min_distance_scale: f64,
    /// Optional hard floor on interatomic distances, in Angstroms.
    pub min_interatomic_distance: Option<f64>,
    /// Optional upper bound on the evaluated value, checked post-evaluation.
    pub max_value: Option<f64>,
}

impl Default for Constraints {
    fn default() -> Self {
        Constraints {
            min_num_atoms: 1,
            max_num_atoms: 20,
            min_lattice_length: 1.0,
            max_lattice_length: 15.0,
            min_lattice_angle_deg: 40.0,
            max_lattice_angle_deg: 140.0,
            min_distance_scale: 0.6,
            min_interatomic_distance: None,
            max_value: None,
        }
    }
}

/// Immutable configuration of a search run.
///
/// Constructed once at startup (usually from JSON) and passed by reference
/// into every component; nothing mutates it after setup, so it can be shared
/// freely across worker tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Element symbols of the composition space being searched.
    pub composition_space: Vec<String>,
    /// Target number of organisms per generation.
    pub population_size: usize,
    /// Under bounded concurrency a generation may be committed once it holds
    /// this many organisms; defaults to the full population size.
    pub min_population: Option<usize>,
    /// Number of elite organisms carried forward unchanged each generation.
    pub num_promoted: usize,
    /// Quota of the random initial-structure producer.
    pub num_random_organisms: u32,
    /// Generations without improvement before the endgame variation weights
    /// take over.
    pub endgame_after: u32,
    pub variation_weights: VariationWeights,
    pub endgame_weights: VariationWeights,
    pub selection: Selection,
    pub mutation: MutationParams,
    pub matcher: MatcherParams,
    pub constraints: Constraints,
    /// Organisms whose value lies within this window of an existing
    /// organism's value are treated as duplicates (replace-if-better).
    pub d_value: Option<f64>,
    /// Maximum number of fitness evaluations running concurrently per batch.
    pub max_concurrent: usize,
    /// Seed for the run's random number generator; random when absent.
    pub random_seed: Option<u64>,
    /// The run converges when any of these criteria is met.
    pub convergence: Vec<ConvergenceCriterion>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            composition_space: Vec::new(),
            population_size: 20,
            min_population: None,
            num_promoted: 1,
            num_random_organisms: 20,
            endgame_after: 15,
            variation_weights: VariationWeights {
                mutation: 0.35,
                crossover: 0.45,
                permutation: 0.2,
            },
            endgame_weights: VariationWeights {
                mutation: 0.45,
                crossover: 0.45,
                permutation: 0.1,
            },
            selection: Selection::Tournament { size: 3 },
            mutation: MutationParams::default(),
            matcher: MatcherParams::default(),
            constraints: Constraints::default(),
            d_value: None,
            max_concurrent: 4,
            random_seed: None,
            convergence: vec![ConvergenceCriterion::MaxGenerations(50)],
        }
    }
}

impl SearchConfig {
    /// Validate the configuration at startup. These are the only fatal
    /// errors of the system; everything downstream rejects and continues.
    pub fn validate(&self) -> crate::Result<()> {
        if self.composition_space.is_empty() {
            bail!("configuration error: composition space is empty");
        }
        if self.population_size == 0 {
            bail!("configuration error: population size must be positive");
        }
        if self.max_concurrent == 0 {
            bail!("configuration error: max_concurrent must be positive");
        }
        if self.convergence.is_empty() {
            bail!("configuration error: no convergence criteria configured");
        }
        if let Some(min) = self.min_population {
            if min == 0 || min > self.population_size {
                bail!(
                    "configuration error: min_population {} outside 1..={}",
                    min,
                    self.population_size
                );
            }
        }
        if self.constraints.min_num_atoms == 0
            || self.constraints.min_num_atoms > self.constraints.max_num_atoms
        {
            bail!("configuration error: invalid atom-count bounds");
        }
        Ok(())
    }
}
