// Command-line front end for the evolutionary crystal-structure search.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;

use xtal_search::config::SearchConfig;
use xtal_search::evaluate::{LennardJones, NullOracle};
use xtal_search::search::{EvolutionEngine, RunLog};
use xtal_search::structure::{niggli, parse_cell, write_cell, StructureMatcher};

#[derive(Parser)]
#[command(name = "xtal-search", version, about = "Evolutionary crystal-structure search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Worker threads for fitness evaluation (0 = rayon default)
    #[arg(long, global = true, default_value_t = 0)]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an evolutionary search from a JSON configuration
    Run {
        /// Path to the JSON search configuration
        config: PathBuf,
        /// Directory for per-generation structure and index files
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Structure files fed to the seeding state ahead of the random producer
        #[arg(short, long)]
        seed: Vec<PathBuf>,
    },
    /// Niggli-reduce a structure file and print the reduced cell
    Reduce {
        /// Path to the structure file
        input: PathBuf,
    },
    /// Decide whether two structure files describe the same structure
    Match {
        first: PathBuf,
        second: PathBuf,
        /// Allowed site displacement, in Angstroms
        #[arg(long, default_value_t = 0.15)]
        atomic_misfit: f64,
        /// Allowed lattice-length deviation, in Angstroms
        #[arg(long, default_value_t = 0.1)]
        length_misfit: f64,
        /// Allowed lattice-angle deviation, in degrees
        #[arg(long, default_value_t = 2.0)]
        angle_misfit: f64,
    },
}

fn main() -> xtal_search::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("configuring the rayon thread pool")?;
    }

    match cli.command {
        Commands::Run {
            config,
            output,
            seed,
        } => run_search(config, output, seed),
        Commands::Reduce { input } => reduce_structure(input),
        Commands::Match {
            first,
            second,
            atomic_misfit,
            length_misfit,
            angle_misfit,
        } => match_structures(first, second, atomic_misfit, length_misfit, angle_misfit),
    }
}

fn run_search(
    config_path: PathBuf,
    output: Option<PathBuf>,
    seed_paths: Vec<PathBuf>,
) -> xtal_search::Result<()> {
    let text = fs::read_to_string(&config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;
    let config: SearchConfig =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", config_path.display()))?;

    let mut seeds = Vec::with_capacity(seed_paths.len());
    for path in &seed_paths {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        seeds.push(parse_cell(&text).with_context(|| format!("parsing {}", path.display()))?);
    }

    let evaluator = Arc::new(LennardJones::default());
    let oracle = Arc::new(NullOracle);
    let mut engine = EvolutionEngine::new(config, evaluator, oracle)?.with_seed_cells(seeds);
    if let Some(dir) = output {
        engine = engine.with_run_log(RunLog::new(dir)?);
    }

    let outcome = engine.run()?;
    info!(
        "finished after {} generations and {} evaluations: {}",
        outcome.generations,
        outcome.evaluations,
        outcome.converged_by.describe()
    );
    println!(
        "best organism {} with value {}",
        outcome.best.id,
        outcome.best.value_or_infinite()
    );
    print!("{}", write_cell(&outcome.best.cell));
    Ok(())
}

fn reduce_structure(input: PathBuf) -> xtal_search::Result<()> {
    let text = fs::read_to_string(&input).with_context(|| format!("reading {}", input.display()))?;
    let cell = parse_cell(&text).with_context(|| format!("parsing {}", input.display()))?;
    let reduced = niggli::reduce(&cell)?;
    print!("{}", write_cell(&reduced.cell));
    Ok(())
}

fn match_structures(
    first: PathBuf,
    second: PathBuf,
    atomic_misfit: f64,
    length_misfit: f64,
    angle_misfit: f64,
) -> xtal_search::Result<()> {
    let first_text =
        fs::read_to_string(&first).with_context(|| format!("reading {}", first.display()))?;
    let a = parse_cell(&first_text).with_context(|| format!("parsing {}", first.display()))?;
    let second_text =
        fs::read_to_string(&second).with_context(|| format!("reading {}", second.display()))?;
    let b = parse_cell(&second_text).with_context(|| format!("parsing {}", second.display()))?;

    let matcher = StructureMatcher::new(atomic_misfit, length_misfit, angle_misfit);
    if matcher.matches(&a, &b, &NullOracle) {
        println!("match");
    } else {
        println!("no match");
    }
    Ok(())
}
