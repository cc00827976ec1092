// Persisted run artifacts: per-generation index records plus the
// structure files they point at, and a final value-sorted index. These
// are write-only side effects; the core never reads them back.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Error};

use crate::structure::format::write_cell;

use super::generation::Generation;
use super::organism::OrganismId;

/// One persisted index entry.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: OrganismId,
    pub value: f64,
    pub structure_path: PathBuf,
}

/// Directory-backed artifact writer.
#[derive(Debug, Clone)]
pub struct RunLog {
    dir: PathBuf,
}

impl RunLog {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating run-log directory {}", dir.display()))?;
        Ok(RunLog { dir })
    }

    /// Write the per-generation index and the structure file of every
    /// member. Returns the records for the final index.
    pub fn record_generation(&self, generation: &Generation) -> Result<Vec<RunRecord>, Error> {
        let mut records = Vec::with_capacity(generation.len());
        let mut index = String::new();
        for organism in generation.organisms() {
            let structure_path = self.dir.join(format!("organism_{}.txt", organism.id));
            fs::write(&structure_path, write_cell(&organism.cell))
                .with_context(|| format!("writing {}", structure_path.display()))?;
            let value = organism.value_or_infinite();
            index.push_str(&format!(
                "{} {} {}\n",
                organism.id,
                value,
                structure_path.display()
            ));
            records.push(RunRecord {
                id: organism.id,
                value,
                structure_path,
            });
        }
        let index_path = self
            .dir
            .join(format!("generation_{:04}.index", generation.index));
        fs::write(&index_path, index)
            .with_context(|| format!("writing {}", index_path.display()))?;
        Ok(records)
    }

    /// Write the final index, sorted ascending by value.
    pub fn write_sorted_index(&self, records: &[RunRecord]) -> Result<(), Error> {
        let mut sorted: Vec<&RunRecord> = records.iter().collect();
        sorted.sort_by(|a, b| {
            a.value
                .partial_cmp(&b.value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut index = String::new();
        for record in sorted {
            index.push_str(&format!(
                "{} {} {}\n",
                record.id,
                record.value,
                record.structure_path.display()
            ));
        }
        let path = self.dir.join("run.index");
        fs::write(&path, index).with_context(|| format!("writing {}", path.display()))
    }
}
