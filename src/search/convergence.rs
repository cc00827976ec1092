// Convergence criteria: the run stops when any configured predicate fires.

use serde::{Deserialize, Serialize};

use crate::evaluate::SymmetryOracle;
use crate::structure::cell::Cell;
use crate::structure::matcher::StructureMatcher;

use super::generation::Generation;

/// Counters the criteria are evaluated against after each committed
/// generation.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub generations_completed: u32,
    pub evaluations: u64,
    pub stagnation: u32,
    pub best_value: Option<f64>,
}

/// The closed family of convergence predicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConvergenceCriterion {
    MaxGenerations(u32),
    MaxEvaluations(u64),
    /// Generations without improvement of the best value.
    Stagnation { generations: u32 },
    /// Best value at or below this threshold.
    ValueAchieved(f64),
    /// The target structure was observed in the population.
    StructureFound(Cell),
}

impl ConvergenceCriterion {
    pub fn is_met(
        &self,
        progress: &Progress,
        generation: &Generation,
        matcher: &StructureMatcher,
        oracle: &dyn SymmetryOracle,
    ) -> bool {
        match self {
            ConvergenceCriterion::MaxGenerations(limit) => {
                progress.generations_completed >= *limit
            }
            ConvergenceCriterion::MaxEvaluations(limit) => progress.evaluations >= *limit,
            ConvergenceCriterion::Stagnation { generations } => {
                progress.stagnation >= *generations
            }
            ConvergenceCriterion::ValueAchieved(threshold) => progress
                .best_value
                .map_or(false, |best| best <= *threshold),
            ConvergenceCriterion::StructureFound(target) => generation
                .organisms()
                .iter()
                .any(|organism| matcher.matches(&organism.cell, target, oracle)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ConvergenceCriterion::MaxGenerations(limit) => {
                format!("reached {} generations", limit)
            }
            ConvergenceCriterion::MaxEvaluations(limit) => {
                format!("reached {} evaluations", limit)
            }
            ConvergenceCriterion::Stagnation { generations } => {
                format!("no improvement for {} generations", generations)
            }
            ConvergenceCriterion::ValueAchieved(threshold) => {
                format!("best value reached {}", threshold)
            }
            ConvergenceCriterion::StructureFound(_) => "target structure found".to_string(),
        }
    }
}
