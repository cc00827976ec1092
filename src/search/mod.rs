// Search module: the evolutionary control loop and its population model

// ======================== MODULE DECLARATIONS ========================
pub mod convergence;
pub mod development;
pub mod engine;
pub mod generation;
pub mod operators;
pub mod organism;
pub mod run_log;

// Test modules
mod _tests_development;
mod _tests_generation;

// ======================== POPULATION MODEL ========================
pub use generation::{Admission, Generation, RunArchive};
pub use organism::{Organism, OrganismId, Provenance};

// ======================== CANDIDATE FILTERING ========================
pub use development::{Development, Phase, Rejection};

// ======================== VARIATION AND SELECTION ========================
pub use operators::{Producer, Selection, VariationKind, VariationWeights};

// ======================== CONTROL LOOP ========================
pub use convergence::{ConvergenceCriterion, Progress};
pub use engine::{EvolutionEngine, SearchOutcome};
pub use run_log::{RunLog, RunRecord};
