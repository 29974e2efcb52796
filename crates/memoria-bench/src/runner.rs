use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use memoria_core::engine::{run_seeds, simulate_seeded};
use memoria_core::{
    DropDistribution, DropModel, MemoriaModel, ParamError, PerCharacter, VisitModel,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::analytics::{AnalyticsError, ExpectationReport, SimulationSummary, write_markdown};
use crate::config::{BenchmarkConfig, ModelKind, ResolvedOutputs, RunPlan, ValidationError};

/// Concrete model chosen by the configuration.
enum ModelHandle {
    Drop(DropModel),
    Visit(VisitModel),
}

impl ModelHandle {
    fn from_plan(plan: &RunPlan) -> Result<Self, ParamError> {
        Ok(match plan.model {
            ModelKind::Drop => ModelHandle::Drop(DropModel::new(plan.scenario)),
            ModelKind::Visit => ModelHandle::Visit(VisitModel::new(plan.scenario)?),
        })
    }

    fn as_model(&self) -> &dyn MemoriaModel {
        match self {
            ModelHandle::Drop(model) => model,
            ModelHandle::Visit(model) => model,
        }
    }

    /// Standard deviation of a `days`-day total; runs are sums of independent days.
    fn cumulative_std_dev(&self, days: u32) -> Option<f64> {
        match self {
            ModelHandle::Drop(model) => Some((model.daily_variance() * f64::from(days)).sqrt()),
            ModelHandle::Visit(_) => None,
        }
    }

    fn breakdown(&self, days: u32) -> Vec<(String, f64)> {
        match self {
            ModelHandle::Drop(model) => {
                let exp = model.expectation_after_days(days);
                vec![("per member".to_string(), exp.per_member)]
            }
            ModelHandle::Visit(model) => match model.expectation_after_days(days).per_character {
                PerCharacter::All { all } => vec![("all".to_string(), all)],
                PerCharacter::Invited { invited, others } => vec![
                    ("invited".to_string(), invited),
                    ("others".to_string(), others),
                ],
            },
        }
    }
}

/// Primary entry point: analytical expectations plus optional Monte Carlo runs.
pub struct MemoriaRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    plan: RunPlan,
    model: ModelHandle,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub expectation: ExpectationReport,
    pub simulation: Option<SimulationSummary>,
    pub totals: Vec<u64>,
    pub rows_written: usize,
    pub summary_path: Option<PathBuf>,
    pub plot_path: Option<PathBuf>,
    pub jsonl_path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RunLogRow<'a> {
    run_id: &'a str,
    run_index: usize,
    run_seed: u64,
    model: ModelKind,
    gate_level: u8,
    unit_size: u32,
    invited: bool,
    days: u32,
    total: u64,
}

impl MemoriaRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let plan = config.plan()?;
        let model = ModelHandle::from_plan(&plan)?;
        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            plan,
            model,
        })
    }

    pub fn plan(&self) -> &RunPlan {
        &self.plan
    }

    /// Distribution the selected model draws from.
    pub fn table(&self) -> &DropDistribution {
        self.model.as_model().table()
    }

    pub fn expectation(&self) -> ExpectationReport {
        let model = self.model.as_model();
        let days = self.plan.days;
        ExpectationReport {
            model: self.plan.model,
            scenario: self.plan.scenario,
            days,
            daily_total: model.daily_total(),
            cumulative_total: model.expected_total(days),
            cumulative_std_dev: self.model.cumulative_std_dev(days),
            daily_breakdown: self.model.breakdown(1),
            cumulative_breakdown: self.model.breakdown(days),
        }
    }

    /// `(seed, total)` per run, in run order for both serial and parallel modes.
    pub fn simulate(&self) -> Vec<(u64, u64)> {
        let mut master = match self.config.simulation.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let seeds = run_seeds(self.plan.runs, &mut master);
        let model = self.model.as_model();
        let days = self.plan.days;

        if self.config.simulation.parallel {
            seeds
                .par_iter()
                .map(|&seed| (seed, simulate_seeded(model, days, seed)))
                .collect()
        } else {
            seeds
                .iter()
                .map(|&seed| (seed, simulate_seeded(model, days, seed)))
                .collect()
        }
    }

    /// Compute expectations, run the simulation and write any configured outputs.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        let expectation = self.expectation();
        if self.logging_enabled && tracing::enabled!(Level::INFO) {
            event!(
                target: "memoria_bench::run",
                Level::INFO,
                run_id = %self.config.run_id,
                model = ?self.plan.model,
                gate_level = self.plan.scenario.level.get(),
                unit_size = self.plan.scenario.unit_size.get(),
                invited = self.plan.scenario.invited,
                days = self.plan.days,
                daily_total = expectation.daily_total,
                cumulative_total = expectation.cumulative_total
            );
        }

        let (simulation, totals, jsonl_path, rows_written) = if self.plan.runs > 0 {
            let results = self.simulate();
            let totals: Vec<u64> = results.iter().map(|&(_, total)| total).collect();
            let summary = SimulationSummary::from_totals(&totals, expectation.cumulative_total)?;

            if self.logging_enabled && tracing::enabled!(Level::INFO) {
                event!(
                    target: "memoria_bench::simulation",
                    Level::INFO,
                    run_id = %self.config.run_id,
                    runs = summary.runs as u64,
                    parallel = self.config.simulation.parallel,
                    mean = summary.mean,
                    std_dev = summary.std_dev,
                    z_score = summary.z_score,
                    p_value = summary.p_value
                );
            }

            let (jsonl_path, rows_written) = match self.outputs.jsonl.as_ref() {
                Some(path) => (Some(path.clone()), self.write_rows(path, &results)?),
                None => (None, 0),
            };
            (Some(summary), totals, jsonl_path, rows_written)
        } else {
            (None, Vec::new(), None, 0)
        };

        let summary_path = match self.outputs.summary_md.as_ref() {
            Some(path) => {
                ensure_parent(path.parent())?;
                write_markdown(path, &expectation, self.table(), simulation.as_ref())?;
                Some(path.clone())
            }
            None => None,
        };

        let plot_path = match (simulation.as_ref(), self.outputs.plots_dir.as_ref()) {
            (Some(sim), Some(dir)) => match sim.render_plot(dir) {
                Ok(path) => Some(path),
                Err(err) => {
                    eprintln!("WARN: {}", err);
                    event!(target: "memoria_bench::run", Level::WARN, error = %err);
                    None
                }
            },
            _ => None,
        };

        Ok(RunSummary {
            expectation,
            simulation,
            totals,
            rows_written,
            summary_path,
            plot_path,
            jsonl_path,
        })
    }

    fn write_rows(&self, path: &Path, results: &[(u64, u64)]) -> Result<usize, RunnerError> {
        ensure_parent(path.parent())?;
        let mut writer = BufWriter::new(File::create(path)?);
        let scenario = &self.plan.scenario;

        let mut rows_written = 0usize;
        for (run_index, &(run_seed, total)) in results.iter().enumerate() {
            let row = RunLogRow {
                run_id: &self.config.run_id,
                run_index,
                run_seed,
                model: self.plan.model,
                gate_level: scenario.level.get(),
                unit_size: scenario.unit_size.get(),
                invited: scenario.invited,
                days: self.plan.days,
                total,
            };
            serde_json::to_writer(&mut writer, &row)?;
            writer.write_all(b"\n")?;
            rows_written += 1;
        }

        writer.flush()?;
        Ok(rows_written)
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{0}")]
    Param(#[from] ParamError),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}
