//! CLI entry point for the `accsim` assembler and simulator.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use assembler::assemble;
use assembler::bench::{benchmark, DEFAULT_RUNS};
use assembler::compare::{compare_dumps, DumpComparison};
use assembler::config::{ConfigLayer, RunConfig};
use assembler::dump::{data_memory_dump, register_dump};
use assembler::formats::{pad_to_length, render, CommentLevel, OutputFormat};
use assembler::loader::load_image;
use clap::{Args, Parser, Subcommand};
use log::info;
use serde as _;
use simulator_core::{SimError, Simulator};
use toml as _;
#[cfg(test)]
use tempfile as _;

const EXIT_MISMATCH: u8 = 1;
const EXIT_TIMEOUT: u8 = 2;
const MAX_LISTED_MISMATCHES: usize = 10;

#[derive(Debug, Parser)]
#[command(
    name = "accsim",
    version,
    about = "Assembler and cycle-level simulator for an 8-bit accumulator CPU"
)]
struct Cli {
    /// Enable debug logging and detailed comparison output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Assemble source code to a program image.
    Assemble(AssembleArgs),
    /// Simulate a program image.
    Simulate(SimulateArgs),
    /// Assemble and simulate in one step.
    Run(RunArgs),
    /// Compare two memory dump files.
    MemCompare(CompareArgs),
    /// Assemble a program and time repeated runs of it.
    Bench(BenchArgs),
}

#[derive(Debug, Args)]
struct AssembleArgs {
    /// Assembly source file.
    input: PathBuf,
    /// Output file (default: input stem plus the format's extension).
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Output format.
    #[arg(short, long, value_enum, default_value_t)]
    format: OutputFormat,
    /// Comment level for text formats.
    #[arg(short, long, value_enum, default_value_t)]
    comments: CommentLevel,
    /// Total output length in bytes; the program is zero-padded to it.
    #[arg(short = 'l', long)]
    output_length: Option<usize>,
}

#[derive(Debug, Args)]
struct SimulateArgs {
    /// Program image to simulate.
    input: PathBuf,
    /// Input format.
    #[arg(short, long, value_enum, default_value_t)]
    format: OutputFormat,
    #[command(flatten)]
    options: SimulationOptions,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Assembly source file.
    input: PathBuf,
    /// Where to write the assembled binary (default: input stem + `.bin`).
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[command(flatten)]
    options: SimulationOptions,
}

#[derive(Debug, Args)]
struct BenchArgs {
    /// Assembly source file.
    input: PathBuf,
    /// Number of runs.
    #[arg(short = 'n', long, default_value_t = DEFAULT_RUNS)]
    runs: u32,
    #[command(flatten)]
    timing: TimingOptions,
}

#[derive(Debug, Args)]
struct SimulationOptions {
    #[command(flatten)]
    timing: TimingOptions,
    /// Dump final data memory to this file.
    #[arg(long)]
    dump_memory: Option<PathBuf>,
    /// Include the whole data address space in the memory dump.
    #[arg(long)]
    dump_memory_full: bool,
    /// Dump the final register file to this file.
    #[arg(long)]
    dump_registers: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct TimingOptions {
    /// Watchdog bound in cycles (default: run until HALT).
    #[arg(short, long)]
    max_cycles: Option<u64>,
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Instruction fetch latency in cycles.
    #[arg(long)]
    fetch_latency: Option<u32>,
    /// Data load latency in cycles.
    #[arg(long)]
    load_latency: Option<u32>,
    /// Data store latency in cycles.
    #[arg(long)]
    store_latency: Option<u32>,
}

impl TimingOptions {
    const fn flags(&self) -> ConfigLayer {
        ConfigLayer {
            fetch_latency: self.fetch_latency,
            load_latency: self.load_latency,
            store_latency: self.store_latency,
            max_cycles: self.max_cycles,
        }
    }
}

#[derive(Debug, Args)]
struct CompareArgs {
    /// First dump file.
    first: PathBuf,
    /// Second dump file.
    second: PathBuf,
}

fn default_output_path(input: &Path, format: OutputFormat) -> PathBuf {
    input.with_extension(format.extension())
}

fn assemble_file(
    input: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    comments: CommentLevel,
    output_length: Option<usize>,
) -> Result<Vec<u8>> {
    let source = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let result =
        assemble(&source).with_context(|| format!("failed to assemble {}", input.display()))?;

    let mut binary = result.binary.clone();
    if let Some(length) = output_length {
        pad_to_length(&mut binary, length)?;
        info!("output padded to {length} bytes");
    }

    let output_path = output.map_or_else(|| default_output_path(input, format), Path::to_path_buf);
    let bytes = render(format, &binary, &result.listing, &source, input, comments);
    fs::write(&output_path, bytes)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    println!(
        "Assembled {} ({} instructions) -> {}",
        input.display(),
        result.listing.len(),
        output_path.display()
    );
    Ok(binary)
}

fn resolve_config(timing: &TimingOptions) -> Result<RunConfig> {
    let working_dir = std::env::current_dir().context("failed to read working directory")?;
    RunConfig::resolve(&working_dir, timing.config.as_deref(), timing.flags())
}

fn simulate(binary: &[u8], options: &SimulationOptions) -> Result<ExitCode> {
    let config = resolve_config(&options.timing)?;
    info!(
        "simulating {} instructions with {:?}",
        binary.len() / 2,
        config.sim
    );

    let mut simulator = Simulator::new(config.sim);
    simulator.load_binary(binary)?;

    let code = match simulator.run_until_halt(config.max_cycles) {
        Ok(result) => {
            println!("\nSimulation Results:");
            println!("Total cycles: {}", result.cycle_count);
            println!("Halted: {}", result.state.halted);
            println!("\n{}", result.state);
            ExitCode::SUCCESS
        }
        Err(SimError::Watchdog(timeout)) => {
            println!("\nSimulation timed out after {} cycles", timeout.cycle_count);
            println!("Halted: false");
            println!("\n{}", simulator.current_state());
            ExitCode::from(EXIT_TIMEOUT)
        }
        Err(error) => return Err(error).context("simulation failed"),
    };

    write_dumps(&simulator, options)?;
    Ok(code)
}

fn write_dumps(simulator: &Simulator, options: &SimulationOptions) -> Result<()> {
    let state = simulator.current_state();
    if let Some(path) = &options.dump_memory {
        let dump = data_memory_dump(&state.modules.data_memory, options.dump_memory_full);
        fs::write(path, dump).with_context(|| format!("failed to write {}", path.display()))?;
        println!("\nData memory state dumped to: {}", path.display());
        if options.dump_memory_full {
            println!("  (Full memory space included)");
        }
    }
    if let Some(path) = &options.dump_registers {
        let dump = register_dump(&state.modules.register_file);
        fs::write(path, dump).with_context(|| format!("failed to write {}", path.display()))?;
        println!("Register file state dumped to: {}", path.display());
    }
    Ok(())
}

fn compare_files(args: &CompareArgs, verbose: bool) -> Result<ExitCode> {
    let read = |path: &Path| {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    };
    let comparison = compare_dumps(&read(&args.first)?, &read(&args.second)?);

    match &comparison {
        DumpComparison::Identical { count } => {
            println!("SUCCESS: Memory dumps are identical!");
            if verbose {
                println!("  Compared {count} binary values");
                println!("  File 1: {}", args.first.display());
                println!("  File 2: {}", args.second.display());
            }
        }
        DumpComparison::CountMismatch { left, right } => {
            println!("MISMATCH: Different number of values");
            println!("  {}: {left} values", args.first.display());
            println!("  {}: {right} values", args.second.display());
        }
        DumpComparison::Different {
            compared,
            mismatches,
        } => {
            println!("MISMATCH: Found {} differences", mismatches.len());
            println!("  Total values compared: {compared}");
            if verbose {
                println!("\nDetailed differences:");
                for mismatch in mismatches.iter().take(MAX_LISTED_MISMATCHES) {
                    println!("  {mismatch}");
                }
                if mismatches.len() > MAX_LISTED_MISMATCHES {
                    println!(
                        "  ... and {} more differences",
                        mismatches.len() - MAX_LISTED_MISMATCHES
                    );
                }
            } else {
                println!("  Use --verbose to see detailed differences");
            }
        }
    }

    Ok(if comparison.is_identical() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_MISMATCH)
    })
}

fn bench_file(args: &BenchArgs) -> Result<ExitCode> {
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let result = assemble(&source)
        .with_context(|| format!("failed to assemble {}", args.input.display()))?;
    let config = resolve_config(&args.timing)?;

    println!(
        "Benchmarking {} ({} runs)...",
        args.input.display(),
        args.runs
    );
    let report = benchmark(&result.binary, config.sim, args.runs, config.max_cycles)
        .context("benchmark run failed")?;
    println!("{report}");
    Ok(ExitCode::SUCCESS)
}

fn run_command(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Assemble(args) => {
            assemble_file(
                &args.input,
                args.output.as_deref(),
                args.format,
                args.comments,
                args.output_length,
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Simulate(args) => {
            let contents = fs::read(&args.input)
                .with_context(|| format!("failed to read {}", args.input.display()))?;
            let binary = load_image(args.format, &contents)
                .with_context(|| format!("failed to load {}", args.input.display()))?;
            simulate(&binary, &args.options)
        }
        Command::Run(args) => {
            let binary = assemble_file(
                &args.input,
                args.output.as_deref(),
                OutputFormat::Bin,
                CommentLevel::None,
                None,
            )?;
            simulate(&binary, &args.options)
        }
        Command::MemCompare(args) => compare_files(&args, cli.verbose),
        Command::Bench(args) => bench_file(&args),
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run_command(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
