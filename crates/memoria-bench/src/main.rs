use std::path::PathBuf;

use clap::Parser;

use memoria_bench::config::{BenchmarkConfig, ModelKind, ResolvedOutputs};
use memoria_bench::logging::init_logging;
use memoria_bench::runner::MemoriaRunner;
use memoria_core::AppInfo;

/// Memoria expectation calculator with Monte Carlo validation.
#[derive(Debug, Parser)]
#[command(
    name = "memoria-bench",
    author,
    version,
    about = "Analytical memoria expectations checked against seeded simulations"
)]
struct Cli {
    /// Path to a YAML configuration file (built-in defaults when omitted).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the gate level (1-40).
    #[arg(long, value_name = "LEVEL", allow_negative_numbers = true)]
    level: Option<i64>,

    /// Override the number of unit members.
    #[arg(long, value_name = "SIZE", allow_negative_numbers = true)]
    unit_size: Option<i64>,

    /// Override the number of days.
    #[arg(long, value_name = "DAYS", allow_negative_numbers = true)]
    days: Option<i64>,

    /// Override the number of Monte Carlo runs (0 disables simulation).
    #[arg(long, value_name = "RUNS", allow_negative_numbers = true)]
    runs: Option<i64>,

    /// Override the RNG seed.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Force the invite bonus on.
    #[arg(long, conflicts_with = "no_invite")]
    invited: bool,

    /// Force the invite bonus off.
    #[arg(long)]
    no_invite: bool,

    /// Select the drop model.
    #[arg(long, value_enum)]
    model: Option<ModelKind>,

    /// Spread runs across all cores.
    #[arg(long)]
    parallel: bool,

    /// Print the probability table used by the selected model.
    #[arg(long)]
    show_table: bool,

    /// Exit after validating the configuration (no simulation is run).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = match cli.config.as_ref() {
        Some(path) => BenchmarkConfig::from_path(path)?,
        None => BenchmarkConfig::default(),
    };

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(level) = cli.level {
        config.scenario.gate_level = level;
    }

    if let Some(unit_size) = cli.unit_size {
        config.scenario.unit_size = unit_size;
    }

    if let Some(days) = cli.days {
        config.scenario.days = days;
    }

    if let Some(runs) = cli.runs {
        config.simulation.runs = runs;
    }

    if let Some(seed) = cli.seed {
        config.simulation.seed = Some(seed);
    }

    if cli.invited {
        config.scenario.invited = true;
    }

    if cli.no_invite {
        config.scenario.invited = false;
    }

    if let Some(model) = cli.model {
        config.model = model;
    }

    if cli.parallel {
        config.simulation.parallel = true;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let histogram_width = config.simulation.histogram_width;

    println!(
        "{} {} | run '{run_id}': {:?} model, gate level {}, unit size {}, invited={}, {} days, {} runs",
        AppInfo::name(),
        AppInfo::version(),
        config.model,
        config.scenario.gate_level,
        config.scenario.unit_size,
        config.scenario.invited,
        config.scenario.days,
        config.simulation.runs,
    );

    let _logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = MemoriaRunner::new(config, outputs)?;

    if cli.show_table {
        println!("\nProbability table (gate level {})", runner.plan().scenario.level.get());
        println!("  outcome | probability");
        for outcome in runner.table().outcomes() {
            println!(
                "  {:>7} | {:>10.1}%",
                outcome.drops,
                outcome.probability * 100.0
            );
        }
    }

    if cli.validate_only {
        println!("Validation-only mode: simulation skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    let expectation = &summary.expectation;
    let days = expectation.days;

    println!("\n* Analytical expectation");
    println!("  daily total: {:.3}", expectation.daily_total);
    for (label, value) in &expectation.daily_breakdown {
        println!("  daily {label}: {value:.3}");
    }
    println!("  {days}-day total: {:.3}", expectation.cumulative_total);
    if let Some(std_dev) = expectation.cumulative_std_dev {
        println!("  {days}-day std dev: {std_dev:.3}");
    }
    for (label, value) in &expectation.cumulative_breakdown {
        println!("  {days}-day {label}: {value:.3}");
    }

    if let Some(sim) = summary.simulation.as_ref() {
        println!("\n* Simulation ({} runs)", sim.runs);
        println!("  mean={:.3}, std={:.3}", sim.mean, sim.std_dev);
        println!(
            "  95% CI [{:.3}, {:.3}], z={:+.2}, p={:.3}",
            sim.ci95.0, sim.ci95.1, sim.z_score, sim.p_value
        );
        println!();
        print!("{}", sim.console_histogram(histogram_width));
    }

    if let Some(path) = summary.summary_path.as_ref() {
        println!("Summary table: {}", path.display());
    }
    if let Some(path) = summary.plot_path.as_ref() {
        println!("Histogram plot: {}", path.display());
    }
    if let Some(path) = summary.jsonl_path.as_ref() {
        println!(
            "Run log: {} ({} rows)",
            path.display(),
            summary.rows_written
        );
    }

    Ok(())
}
