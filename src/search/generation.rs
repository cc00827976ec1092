// Generations and the duplicate policies applied while populating them.

use log::debug;

use crate::evaluate::SymmetryOracle;
use crate::structure::cell::Cell;
use crate::structure::matcher::StructureMatcher;

use super::organism::{Organism, OrganismId};

/// Outcome of offering an organism to a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// The newcomer was strictly better than a duplicate incumbent, which
    /// was evicted.
    ReplacedIncumbent(OrganismId),
    RejectedAsDuplicate(OrganismId),
    RejectedNearValue(OrganismId),
}

/// An ordered collection of organisms for one optimization round.
///
/// Insertion order is iteration order but carries no other semantics.
/// Once finalized, no two members are mutual structural duplicates
/// (subject to the replace-if-better policy).
#[derive(Debug, Clone)]
pub struct Generation {
    pub index: u32,
    organisms: Vec<Organism>,
}

impl Generation {
    pub fn new(index: u32) -> Self {
        Generation {
            index,
            organisms: Vec::new(),
        }
    }

    pub fn organisms(&self) -> &[Organism] {
        &self.organisms
    }

    pub fn len(&self) -> usize {
        self.organisms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.organisms.is_empty()
    }

    /// The organism with the lowest value.
    pub fn best(&self) -> Option<&Organism> {
        self.organisms.iter().min_by(|a, b| {
            a.value_or_infinite()
                .partial_cmp(&b.value_or_infinite())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    /// Normalize values into fitnesses. The best (lowest-value) organism
    /// gets 1.0, the worst 0.0; when all values coincide everyone gets 1.0.
    /// Organisms carrying the evaluation-failure sentinel get 0.0 outright
    /// so the finite values keep a meaningful spread.
    pub fn find_fitnesses(&mut self) {
        let finite: Vec<f64> = self
            .organisms
            .iter()
            .map(|o| o.value_or_infinite())
            .filter(|v| v.is_finite())
            .collect();
        if finite.is_empty() {
            for organism in &mut self.organisms {
                organism.fitness = Some(0.0);
            }
            return;
        }
        let best = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let worst = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        for organism in &mut self.organisms {
            let value = organism.value_or_infinite();
            organism.fitness = Some(if !value.is_finite() {
                0.0
            } else if best == worst {
                1.0
            } else {
                (value - worst) / (best - worst)
            });
        }
    }

    /// Offer an organism to the generation under the duplicate policies:
    /// a structural duplicate (per the matcher) or a near-duplicate value
    /// (within `d_value`) evicts the incumbent only if the newcomer's
    /// value is strictly better; otherwise the newcomer is rejected.
    pub fn try_admit(
        &mut self,
        newcomer: Organism,
        matcher: &StructureMatcher,
        oracle: &dyn SymmetryOracle,
        d_value: Option<f64>,
    ) -> Admission {
        if let Some(pos) = self
            .organisms
            .iter()
            .position(|incumbent| matcher.matches(&newcomer.cell, &incumbent.cell, oracle))
        {
            let incumbent_id = self.organisms[pos].id;
            if newcomer.value_or_infinite() < self.organisms[pos].value_or_infinite() {
                debug!(
                    "organism {} replaces structural duplicate {}",
                    newcomer.id, incumbent_id
                );
                self.organisms[pos] = newcomer;
                return Admission::ReplacedIncumbent(incumbent_id);
            }
            return Admission::RejectedAsDuplicate(incumbent_id);
        }

        if let Some(window) = d_value {
            if let Some(pos) = self.organisms.iter().position(|incumbent| {
                (incumbent.value_or_infinite() - newcomer.value_or_infinite()).abs() < window
            }) {
                let incumbent_id = self.organisms[pos].id;
                if newcomer.value_or_infinite() < self.organisms[pos].value_or_infinite() {
                    self.organisms[pos] = newcomer;
                    return Admission::ReplacedIncumbent(incumbent_id);
                }
                return Admission::RejectedNearValue(incumbent_id);
            }
        }

        self.organisms.push(newcomer);
        Admission::Accepted
    }
}

/// Whole-run redundancy guard. Membership is monotonic: structures are
/// only ever added, and a hit rejects the candidate outright (no
/// replace-if-better across generations).
#[derive(Debug, Clone)]
pub struct RunArchive {
    matcher: StructureMatcher,
    members: Vec<Cell>,
}

impl RunArchive {
    pub fn new(matcher: StructureMatcher) -> Self {
        RunArchive {
            matcher,
            members: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, cell: &Cell, oracle: &dyn SymmetryOracle) -> bool {
        self.members
            .iter()
            .any(|member| self.matcher.matches(cell, member, oracle))
    }

    pub fn insert(&mut self, cell: Cell) {
        self.members.push(cell);
    }
}
