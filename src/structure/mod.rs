// Structure module: periodic cells and the geometry engine built on them

// ======================== MODULE DECLARATIONS ========================
pub mod cell;
pub mod format;
pub mod matcher;
pub mod niggli;
pub mod supercell_search;

mod _tests_format;
mod _tests_matcher;
mod _tests_niggli;

// ======================== PERIODIC CELLS ========================
pub use cell::{Cell, Neighbor, Site, Species};

// ======================== LATTICE REDUCTION ========================
pub use niggli::{reduce, ReducedCell};

// ======================== SUPERCELL SEARCH ========================
pub use supercell_search::find_roundest_supercell;

// ======================== STRUCTURE MATCHING ========================
pub use matcher::StructureMatcher;

// ======================== TEXT INTERCHANGE ========================
pub use format::{parse_cell, write_cell};
