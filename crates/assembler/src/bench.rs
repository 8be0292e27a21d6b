//! Repeated-run throughput measurement.

use std::fmt;
use std::time::{Duration, Instant};

use log::info;
use simulator_core::{SimConfig, SimError, Simulator};

/// Default number of runs per benchmark.
pub const DEFAULT_RUNS: u32 = 10;

/// Totals over every run of one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkReport {
    /// Number of completed runs.
    pub runs: u32,
    /// Cycles summed over all runs.
    pub total_cycles: u64,
    /// Wall-clock time for all runs.
    pub elapsed: Duration,
}

impl BenchmarkReport {
    /// Mean cycles per run.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_cycles(&self) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        self.total_cycles as f64 / f64::from(self.runs)
    }

    /// Mean wall-clock time per run.
    #[must_use]
    pub fn average_time(&self) -> Duration {
        self.elapsed.checked_div(self.runs).unwrap_or_default()
    }

    /// Simulated cycles per wall-clock second.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn cycles_per_second(&self) -> f64 {
        if self.elapsed.is_zero() {
            return 0.0;
        }
        self.total_cycles as f64 / self.elapsed.as_secs_f64()
    }
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Execution time: {:.2} seconds for {} runs",
            self.elapsed.as_secs_f64(),
            self.runs
        )?;
        writeln!(
            f,
            "Average execution time: {:.4} seconds per run",
            self.average_time().as_secs_f64()
        )?;
        writeln!(f, "Total cycles executed: {}", self.total_cycles)?;
        writeln!(
            f,
            "Average cycles executed: {:.0} per run",
            self.average_cycles()
        )?;
        write!(
            f,
            "Cycles simulated per second: {}",
            format_rate(self.cycles_per_second())
        )
    }
}

fn format_rate(rate: f64) -> String {
    if rate >= 1_000_000.0 {
        format!("{:.2}M", rate / 1_000_000.0)
    } else if rate >= 1_000.0 {
        format!("{:.2}K", rate / 1_000.0)
    } else {
        format!("{rate:.2}")
    }
}

/// Runs `binary` from reset `runs` times and totals the cycles.
///
/// Every run uses a fresh simulator so no state carries over.
///
/// # Errors
///
/// Returns the first fault or watchdog timeout of any run.
pub fn benchmark(
    binary: &[u8],
    config: SimConfig,
    runs: u32,
    max_cycles: Option<u64>,
) -> Result<BenchmarkReport, SimError> {
    info!("benchmarking {} bytes over {runs} runs", binary.len());
    let mut total_cycles = 0;
    let start = Instant::now();
    for _ in 0..runs {
        let mut simulator = Simulator::new(config);
        simulator.load_binary(binary)?;
        total_cycles += simulator.run_until_halt(max_cycles)?.cycle_count;
    }
    Ok(BenchmarkReport {
        runs,
        total_cycles,
        elapsed: start.elapsed(),
    })
}
