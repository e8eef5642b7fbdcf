//! Cost model command-line driver.
//!
//! This binary exposes the library's standalone pieces. It performs:
//! 1. **Set inspection:** Load a contention-set file and summarize it.
//! 2. **Trace replay:** Drive a configured cache model with an access trace and report per-iteration cost.
//! 3. **Static analysis:** Print the cost-to-boundary map of a program description.

mod trace;

use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cachehunt_core::cache::{self, ContentionSetTable};
use cachehunt_core::config::Config;
use cachehunt_core::engine::{EnumConstraints, EnumerativeBackend, PathId, PathState, SymExpr};
use cachehunt_core::icfg::{DEFAULT_LOOP_MARKER, Icfg, IcfgCostMap, InstId, Program};
use cachehunt_core::CostHooks;

use trace::Event;

#[derive(Parser, Debug)]
#[command(
    name = "cachehunt",
    author,
    version,
    about = "Memory-hierarchy cost model for symbolic execution",
    long_about = "Inspect contention sets, replay access traces through a cache model, or analyze a program's distance to its loop boundary.\n\nExamples:\n  cachehunt sets sets.txt\n  cachehunt replay --config xeon.json trace.txt\n  cachehunt analyze program.json --marker loop_boundary"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Summarize a contention-set file.
    Sets {
        /// Contention-set file.
        file: PathBuf,
    },

    /// Replay an access trace and print per-iteration statistics.
    Replay {
        /// JSON configuration; built-in defaults when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Contention-set file, overriding the configured path.
        #[arg(long)]
        sets: Option<PathBuf>,

        /// Trace file.
        trace: PathBuf,
    },

    /// Print the cost-to-boundary of every instruction.
    Analyze {
        /// Program description (JSON).
        program: PathBuf,

        /// Name of the loop boundary marker function.
        #[arg(long, default_value = DEFAULT_LOOP_MARKER)]
        marker: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Sets { file } => cmd_sets(&file),
        Commands::Replay {
            config,
            sets,
            trace,
        } => cmd_replay(config, sets, &trace),
        Commands::Analyze { program, marker } => cmd_analyze(&program, &marker),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Prints set count, address count, and how many sets have each associativity.
fn cmd_sets(file: &Path) -> Result<(), Box<dyn Error>> {
    let table = ContentionSetTable::load(file)?;
    let addresses: usize = table.sets().iter().map(|set| set.addresses.len()).sum();
    let mut histogram: BTreeMap<usize, usize> = BTreeMap::new();
    for set in table.sets() {
        *histogram.entry(set.associativity).or_default() += 1;
    }

    println!("Contention sets: {}", table.len());
    println!("Addresses: {addresses}");
    println!("Associativity histogram:");
    for (ways, count) in histogram {
        println!("  {ways:>4}-way: {count}");
    }
    Ok(())
}

/// Replays a trace on a single path, resolving symbolic accesses with the
/// configured resolver policy.
fn cmd_replay(config: Option<PathBuf>, sets: Option<PathBuf>, trace: &Path) -> Result<(), Box<dyn Error>> {
    let config = match config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let table = sets.map(ContentionSetTable::load).transpose()?.map(Arc::new);
    let model = cache::build_model_with_table(&config, table)?;
    let text = std::fs::read_to_string(trace).map_err(|err| format!("cannot read {}: {err}", trace.display()))?;
    let events = trace::parse(&text)?;
    tracing::info!(events = events.len(), trace = %trace.display(), "replaying trace");

    let mut backend = EnumerativeBackend::new();
    let hooks = CostHooks::new(config.resolver);
    let mut path: PathState<EnumerativeBackend> =
        PathState::new(PathId(0), EnumConstraints::default(), model, InstId(0));

    for event in events {
        match event {
            Event::Boundary => {
                if !hooks.on_loop_boundary(&mut path)? {
                    println!("[*] Iteration cap reached");
                    break;
                }
            }
            Event::Instructions(count) => {
                for _ in 0..count {
                    hooks.on_instruction_executed(&mut path);
                }
            }
            Event::Access { address, is_write } => {
                let _ = hooks.on_memory_access(&mut backend, &mut path, &SymExpr::Const(address), is_write)?;
            }
            Event::Symbolic {
                base,
                stride,
                count,
                is_write,
            } => {
                let expr = backend.symbol(0..count, base, stride);
                let resolved = hooks.on_memory_access(&mut backend, &mut path, &expr, is_write)?;
                if let SymExpr::Const(address) = resolved {
                    println!("[*] Symbolic {} resolved to {address:#x}", if is_write { "store" } else { "load" });
                }
            }
        }
    }

    let model = path.model();
    print!("{}", model.dump_stats());
    println!();
    println!("Iterations: {}", model.num_iterations());
    println!("Estimated total cost: {:.2} ns", model.estimate_total_cost());
    Ok(())
}

/// Prints one row per instruction in id order.
fn cmd_analyze(program: &Path, marker: &str) -> Result<(), Box<dyn Error>> {
    let program = Program::from_file(program)?;
    let icfg = Icfg::build(&program)?;
    let costs = IcfgCostMap::from_icfg(&icfg, marker);

    println!("{:>8}  {:<24}  {:<6}  {:>10}", "id", "function", "direct", "cost");
    for node in 0..icfg.len() {
        let id = icfg.id(node);
        let entry = costs.entry(id);
        println!(
            "{:>8}  {:<24}  {:<6}  {:>10}",
            id.0,
            icfg.function_name(icfg.function_of(node)),
            entry.on_direct_path,
            entry.lower_bound_cost
        );
    }
    Ok(())
}
