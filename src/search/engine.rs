// The evolutionary control loop. One control thread owns all mutable
// state; evaluation fans out over a bounded rayon batch and joins back
// before any admission decision is made.

use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::{bail, Error};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::config::SearchConfig;
use crate::evaluate::{EnergyEvaluator, SymmetryOracle};
use crate::structure::cell::Cell;
use crate::structure::matcher::StructureMatcher;

use super::convergence::{ConvergenceCriterion, Progress};
use super::development::{Development, Phase};
use super::generation::{Admission, Generation, RunArchive};
use super::operators::{self, Producer, VariationKind, VariationWeights};
use super::organism::{Organism, OrganismId, Provenance};
use super::run_log::{RunLog, RunRecord};

/// Terminal report of a finished run.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best: Organism,
    pub generations: u32,
    pub evaluations: u64,
    pub converged_by: ConvergenceCriterion,
}

/// Engine states. Seeding fills generation zero from the producers,
/// Breeding fills every later generation from the previous one, and
/// Converged is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Seeding,
    Breeding,
    Converged,
}

pub struct EvolutionEngine {
    config: SearchConfig,
    evaluator: Arc<dyn EnergyEvaluator>,
    oracle: Arc<dyn SymmetryOracle>,
    development: Development,
    matcher: StructureMatcher,
    archive: RunArchive,
    run_log: Option<RunLog>,
    seed_cells: Vec<Cell>,
    rng: StdRng,
    next_id: u64,
    evaluations: u64,
    stagnation: u32,
    best: Option<Organism>,
}

impl EvolutionEngine {
    pub fn new(
        config: SearchConfig,
        evaluator: Arc<dyn EnergyEvaluator>,
        oracle: Arc<dyn SymmetryOracle>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let matcher = StructureMatcher::new(
            config.matcher.atomic_misfit,
            config.matcher.length_misfit,
            config.matcher.angle_misfit_deg,
        );
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(EvolutionEngine {
            development: Development::new(&config),
            archive: RunArchive::new(matcher),
            matcher,
            config,
            evaluator,
            oracle,
            run_log: None,
            seed_cells: Vec::new(),
            rng,
            next_id: 0,
            evaluations: 0,
            stagnation: 0,
            best: None,
        })
    }

    /// Structures fed to the seeding state ahead of the random producer.
    pub fn with_seed_cells(mut self, cells: Vec<Cell>) -> Self {
        self.seed_cells = cells;
        self
    }

    pub fn with_run_log(mut self, run_log: RunLog) -> Self {
        self.run_log = Some(run_log);
        self
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    pub fn best(&self) -> Option<&Organism> {
        self.best.as_ref()
    }

    fn allocate_id(&mut self) -> OrganismId {
        let id = OrganismId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Drive the run to convergence.
    pub fn run(&mut self) -> Result<SearchOutcome, Error> {
        let mut records: Vec<RunRecord> = Vec::new();
        let mut state = EngineState::Seeding;
        let mut previous: Option<Generation> = None;
        let mut completed = 0u32;
        let mut converged_by: Option<ConvergenceCriterion> = None;

        loop {
            let mut generation = match state {
                EngineState::Seeding => self.seed_generation()?,
                EngineState::Breeding => {
                    let parents = previous
                        .as_ref()
                        .ok_or_else(|| Error::msg("breeding without a parent generation"))?;
                    self.breed_generation(completed, parents)?
                }
                EngineState::Converged => break,
            };

            generation.find_fitnesses();
            self.commit(&generation, &mut records);
            completed = generation.index + 1;

            let progress = Progress {
                generations_completed: completed,
                evaluations: self.evaluations,
                stagnation: self.stagnation,
                best_value: self.best.as_ref().map(|b| b.value_or_infinite()),
            };
            let met = self
                .config
                .convergence
                .iter()
                .find(|criterion| {
                    criterion.is_met(&progress, &generation, &self.matcher, self.oracle.as_ref())
                })
                .cloned();
            state = match met {
                Some(criterion) => {
                    info!("run converged: {}", criterion.describe());
                    converged_by = Some(criterion);
                    EngineState::Converged
                }
                None => EngineState::Breeding,
            };
            previous = Some(generation);
        }

        if let Some(run_log) = &self.run_log {
            if let Err(err) = run_log.write_sorted_index(&records) {
                warn!("failed to write final run index: {}", err);
            }
        }

        let best = self
            .best
            .clone()
            .ok_or_else(|| Error::msg("run finished without any evaluated organism"))?;
        let converged_by =
            converged_by.ok_or_else(|| Error::msg("run finished without converging"))?;
        Ok(SearchOutcome {
            best,
            generations: completed,
            evaluations: self.evaluations,
            converged_by,
        })
    }

    /// Fill generation zero from the seed and random producers.
    fn seed_generation(&mut self) -> Result<Generation, Error> {
        let mut producers: Vec<Producer> = Vec::new();
        if !self.seed_cells.is_empty() {
            producers.push(Producer::Seeds {
                cells: mem::take(&mut self.seed_cells),
                cursor: 0,
            });
        }
        producers.push(Producer::Random {
            remaining: self.config.num_random_organisms,
        });

        let mut generation = Generation::new(0);
        let mut pending: Vec<Organism> = Vec::new();
        for producer in &mut producers {
            while producer.remaining() > 0 {
                let candidate = match producer.produce(&self.config, &mut self.rng) {
                    Ok(cell) => cell,
                    Err(err) => {
                        warn!("initial-structure producer failed: {}", err);
                        producer.force_exhausted();
                        break;
                    }
                };
                if let Ok(developed) = self.development.develop(&candidate, Phase::PreEvaluation) {
                    producer.note_accepted();
                    let id = self.allocate_id();
                    pending.push(Organism::new(id, developed, Provenance::Seeded));
                    if pending.len() >= self.config.max_concurrent {
                        self.evaluate_and_admit(&mut pending, &mut generation);
                    }
                }
            }
        }
        self.evaluate_and_admit(&mut pending, &mut generation);

        if generation.is_empty() {
            bail!("seeding produced no viable organisms");
        }
        info!("generation 0 seeded with {} organisms", generation.len());
        Ok(generation)
    }

    /// Fill a later generation by promotion and bred offspring.
    fn breed_generation(&mut self, index: u32, parents: &Generation) -> Result<Generation, Error> {
        let mut generation = Generation::new(index);

        // Elites keep their evaluated values; no re-evaluation.
        let mut elites: Vec<&Organism> = parents.organisms().iter().collect();
        elites.sort_by(|a, b| {
            a.value_or_infinite()
                .partial_cmp(&b.value_or_infinite())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for elite in elites.into_iter().take(self.config.num_promoted) {
            let id = self.allocate_id();
            let promoted = Organism {
                id,
                cell: elite.cell.clone(),
                value: elite.value,
                fitness: None,
                provenance: Provenance::Promoted { from: elite.id },
            };
            generation.try_admit(
                promoted,
                &self.matcher,
                self.oracle.as_ref(),
                self.config.d_value,
            );
        }

        let weights = if self.stagnation >= self.config.endgame_after {
            debug!("stagnation {} reached the endgame weights", self.stagnation);
            self.config.endgame_weights
        } else {
            self.config.variation_weights
        };
        let floor = self
            .config
            .min_population
            .unwrap_or(self.config.population_size);

        // The floor is checked against admitted organisms only; pending
        // batch members can still be rejected after evaluation, in which
        // case the loop keeps breeding replacements.
        let mut pending: Vec<Organism> = Vec::new();
        let mut consecutive_rejections = 0u64;
        while generation.len() < floor {
            let bred = self.breed_offspring(parents, &weights).and_then(|(cell, provenance)| {
                let developed = self
                    .development
                    .develop(&cell, Phase::PreEvaluation)
                    .map_err(|rejection| Error::msg(rejection.to_string()))?;
                Ok((developed, provenance))
            });
            match bred {
                Ok((developed, provenance)) => {
                    if self.archive.contains(&developed, self.oracle.as_ref()) {
                        debug!("offspring duplicates an archived structure");
                        consecutive_rejections += 1;
                    } else {
                        consecutive_rejections = 0;
                        let id = self.allocate_id();
                        pending.push(Organism::new(id, developed, provenance));
                        if pending.len() >= self.config.max_concurrent
                            || generation.len() + pending.len() >= floor
                        {
                            self.evaluate_and_admit(&mut pending, &mut generation);
                        }
                        continue;
                    }
                }
                Err(err) => {
                    debug!("breeding attempt rejected: {}", err);
                    consecutive_rejections += 1;
                }
            }
            if consecutive_rejections > 0 && consecutive_rejections % 1000 == 0 {
                debug!(
                    "{} consecutive breeding rejections in generation {}",
                    consecutive_rejections, index
                );
            }
        }

        info!("generation {} bred with {} organisms", index, generation.len());
        Ok(generation)
    }

    /// Apply a drawn variation operator to selected parents.
    fn breed_offspring(
        &mut self,
        parents: &Generation,
        weights: &VariationWeights,
    ) -> Result<(Cell, Provenance), Error> {
        let kind = weights.draw(&mut self.rng);
        match kind {
            VariationKind::Mutation => {
                let parent = self.select_parent(parents)?;
                let cell = operators::mutate(&parent.cell, &self.config.mutation, &mut self.rng)?;
                Ok((
                    cell,
                    Provenance::Bred {
                        variation: kind,
                        parents: vec![parent.id],
                    },
                ))
            }
            VariationKind::Crossover => {
                let first = self.select_parent(parents)?;
                let second = self.select_parent(parents)?;
                let cell = operators::crossover(&first.cell, &second.cell, &mut self.rng)?;
                Ok((
                    cell,
                    Provenance::Bred {
                        variation: kind,
                        parents: vec![first.id, second.id],
                    },
                ))
            }
            VariationKind::Permutation => {
                let parent = self.select_parent(parents)?;
                let cell = operators::permute_species(&parent.cell, &mut self.rng)?;
                Ok((
                    cell,
                    Provenance::Bred {
                        variation: kind,
                        parents: vec![parent.id],
                    },
                ))
            }
            VariationKind::Promotion => bail!("promotion is never drawn as a variation"),
        }
    }

    fn select_parent(&mut self, parents: &Generation) -> Result<Organism, Error> {
        self.config
            .selection
            .pick(parents, &mut self.rng)
            .cloned()
            .ok_or_else(|| Error::msg("selection over an empty generation"))
    }

    /// Evaluate a pending batch in parallel, then admit sequentially on
    /// the control thread. The par_iter collect is the join barrier.
    fn evaluate_and_admit(&mut self, pending: &mut Vec<Organism>, generation: &mut Generation) {
        if pending.is_empty() {
            return;
        }
        let batch = mem::take(pending);
        self.evaluations += batch.len() as u64;
        let evaluator = Arc::clone(&self.evaluator);
        let evaluated: Vec<(Organism, Cell, f64)> = batch
            .into_par_iter()
            .map(|organism| {
                // A panicking evaluator counts as a failed evaluation; it
                // must not take the run down with it.
                let (relaxed, value) =
                    match panic::catch_unwind(AssertUnwindSafe(|| {
                        evaluator.evaluate(&organism.cell)
                    })) {
                        Ok(result) => result,
                        Err(_) => {
                            warn!("energy evaluator panicked for organism {}", organism.id);
                            (organism.cell.clone(), f64::INFINITY)
                        }
                    };
                let value = if value.is_finite() { value } else { f64::INFINITY };
                (organism, relaxed, value)
            })
            .collect();

        for (mut organism, relaxed, value) in evaluated {
            let developed = match self.development.develop(&relaxed, Phase::PostEvaluation) {
                Ok(cell) => cell,
                Err(_) => continue,
            };
            if value.is_finite() && self.development.check_value(value).is_err() {
                continue;
            }
            organism.cell = developed;
            organism.value = Some(value);
            match generation.try_admit(
                organism,
                &self.matcher,
                self.oracle.as_ref(),
                self.config.d_value,
            ) {
                Admission::Accepted | Admission::ReplacedIncumbent(_) => {}
                Admission::RejectedAsDuplicate(incumbent) => {
                    debug!("organism rejected as duplicate of {}", incumbent)
                }
                Admission::RejectedNearValue(incumbent) => {
                    debug!("organism rejected near the value of {}", incumbent)
                }
            }
        }
    }

    /// Archive the committed generation, persist it, and update the
    /// best-so-far and stagnation counters.
    fn commit(&mut self, generation: &Generation, records: &mut Vec<RunRecord>) {
        for organism in generation.organisms() {
            if !self.archive.contains(&organism.cell, self.oracle.as_ref()) {
                self.archive.insert(organism.cell.clone());
            }
        }
        if let Some(run_log) = &self.run_log {
            match run_log.record_generation(generation) {
                Ok(mut generation_records) => records.append(&mut generation_records),
                Err(err) => warn!("failed to persist generation {}: {}", generation.index, err),
            }
        }

        let improved = match (generation.best(), &self.best) {
            (Some(candidate), Some(best)) => {
                candidate.value_or_infinite() < best.value_or_infinite()
            }
            (Some(_), None) => true,
            (None, _) => false,
        };
        if improved {
            if let Some(candidate) = generation.best() {
                info!(
                    "new best organism {} with value {}",
                    candidate.id,
                    candidate.value_or_infinite()
                );
                self.best = Some(candidate.clone());
            }
            self.stagnation = 0;
        } else {
            self.stagnation += 1;
        }
    }
}
