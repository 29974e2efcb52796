use memoria_core::model::{ParamError, Scenario, checked_days, checked_runs};
use memoria_core::VisitModel;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_RUN_ID: &str = "memoria";
const DEFAULT_GATE_LEVEL: i64 = 32;
const DEFAULT_UNIT_SIZE: i64 = 6;
const DEFAULT_DAYS: i64 = 30;
const DEFAULT_RUNS: i64 = 1_000;
const DEFAULT_HISTOGRAM_WIDTH: usize = 50;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root configuration loaded from YAML. Every block is optional.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchmarkConfig {
    #[serde(default = "default_run_id")]
    pub run_id: String,
    #[serde(default)]
    pub scenario: ScenarioConfig,
    #[serde(default)]
    pub model: ModelKind,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            run_id: default_run_id(),
            scenario: ScenarioConfig::default(),
            model: ModelKind::default(),
            simulation: SimulationConfig::default(),
            outputs: OutputsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl BenchmarkConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchmarkConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.plan()?;
        self.simulation.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        Ok(())
    }

    /// Typed parameters for a run, checked by the core crate.
    pub fn plan(&self) -> Result<RunPlan, ValidationError> {
        let scenario = self.scenario.scenario()?;
        let days = checked_days(self.scenario.days)?;
        let runs = checked_runs(self.simulation.runs)?;
        if self.model == ModelKind::Visit {
            VisitModel::new(scenario)?;
        }
        Ok(RunPlan {
            scenario,
            model: self.model,
            days,
            runs,
        })
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        let resolve = |value: &Option<String>| {
            value
                .as_deref()
                .map(|template| resolve_template(&self.run_id, template))
        };
        ResolvedOutputs {
            summary_md: resolve(&self.outputs.summary_md),
            plots_dir: resolve(&self.outputs.plots_dir),
            jsonl: resolve(&self.outputs.jsonl),
        }
    }
}

fn default_run_id() -> String {
    DEFAULT_RUN_ID.to_string()
}

/// Gate level, party and horizon. Values stay raw so negatives reach validation.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScenarioConfig {
    #[serde(default = "default_gate_level")]
    pub gate_level: i64,
    #[serde(default = "default_unit_size")]
    pub unit_size: i64,
    #[serde(default = "default_invited")]
    pub invited: bool,
    #[serde(default = "default_days")]
    pub days: i64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            gate_level: DEFAULT_GATE_LEVEL,
            unit_size: DEFAULT_UNIT_SIZE,
            invited: default_invited(),
            days: DEFAULT_DAYS,
        }
    }
}

impl ScenarioConfig {
    pub fn scenario(&self) -> Result<Scenario, ParamError> {
        Scenario::try_new(self.gate_level, self.unit_size, self.invited)
    }
}

fn default_gate_level() -> i64 {
    DEFAULT_GATE_LEVEL
}

fn default_unit_size() -> i64 {
    DEFAULT_UNIT_SIZE
}

fn default_invited() -> bool {
    true
}

fn default_days() -> i64 {
    DEFAULT_DAYS
}

#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Every member draws independently from the level table each day.
    #[default]
    Drop,
    /// Two visitor sessions per day, one memoria per visited member.
    Visit,
}

/// Monte Carlo block; `runs: 0` disables simulation.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SimulationConfig {
    #[serde(default = "default_runs")]
    pub runs: i64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default = "default_histogram_width")]
    pub histogram_width: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            runs: DEFAULT_RUNS,
            seed: None,
            parallel: false,
            histogram_width: DEFAULT_HISTOGRAM_WIDTH,
        }
    }
}

impl SimulationConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.histogram_width == 0 {
            return Err(ValidationError::InvalidField {
                field: "simulation.histogram_width".to_string(),
                message: "histogram width must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn default_runs() -> i64 {
    DEFAULT_RUNS
}

fn default_histogram_width() -> usize {
    DEFAULT_HISTOGRAM_WIDTH
}

/// Output artifacts. Nothing is written unless a path is configured.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct OutputsConfig {
    #[serde(default)]
    pub summary_md: Option<String>,
    #[serde(default)]
    pub plots_dir: Option<String>,
    #[serde(default)]
    pub jsonl: Option<String>,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.summary_md", &self.summary_md),
            ("outputs.plots_dir", &self.plots_dir),
            ("outputs.jsonl", &self.jsonl),
        ] {
            let Some(value) = value else {
                continue;
            };

            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Validated, typed run parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPlan {
    pub scenario: Scenario,
    pub model: ModelKind,
    pub days: u32,
    pub runs: usize,
}

/// Fully resolved output paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub summary_md: Option<PathBuf>,
    pub plots_dir: Option<PathBuf>,
    pub jsonl: Option<PathBuf>,
}

impl ResolvedOutputs {
    /// Directory that receives `telemetry.jsonl`, if any output is on disk.
    pub fn telemetry_dir(&self) -> Option<PathBuf> {
        self.summary_md
            .as_ref()
            .map(|path| {
                path.parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."))
            })
    }
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

impl From<ParamError> for ValidationError {
    fn from(err: ParamError) -> Self {
        let field = match err {
            ParamError::InvalidLevel(_) => "scenario.gate_level",
            ParamError::InvalidUnitSize(_) | ParamError::UnitTooSmall { .. } => {
                "scenario.unit_size"
            }
            ParamError::InvalidDays(_) => "scenario.days",
            ParamError::InvalidRuns(_) => "simulation.runs",
        };
        ValidationError::InvalidField {
            field: field.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_YAML: &str = r#"
run_id: "lv10_unit6"
scenario:
  gate_level: 10
  unit_size: 6
  invited: true
  days: 30
model: drop
simulation:
  runs: 10000
  seed: 42
outputs:
  summary_md: "bench/out/{run_id}/summary.md"
  plots_dir: "bench/out/{run_id}/plots"
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    fn field_of(err: ValidationError) -> String {
        match err {
            ValidationError::InvalidField { field, .. } => field,
        }
    }

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        cfg.validate().expect("validate");

        assert_eq!(cfg.simulation.histogram_width, DEFAULT_HISTOGRAM_WIDTH);
        assert!(!cfg.simulation.parallel);
        assert!(cfg.logging.enable_structured);
        assert_eq!(cfg.logging.level(), Some(Level::DEBUG));

        let plan = cfg.plan().expect("plan");
        assert_eq!(plan.scenario.level.get(), 10);
        assert_eq!(plan.days, 30);
        assert_eq!(plan.runs, 10_000);

        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.summary_md,
            Some(PathBuf::from("bench/out/lv10_unit6/summary.md"))
        );
        assert_eq!(outputs.jsonl, None);
        assert_eq!(
            outputs.telemetry_dir(),
            Some(PathBuf::from("bench/out/lv10_unit6"))
        );
    }

    #[test]
    fn empty_document_uses_reference_defaults() {
        let mut cfg: BenchmarkConfig = serde_yaml::from_str("{}").expect("parse");
        cfg.validate().expect("defaults validate");
        assert_eq!(cfg, BenchmarkConfig::default());

        let plan = cfg.plan().unwrap();
        assert_eq!(plan.scenario.level.get(), 32);
        assert_eq!(plan.scenario.unit_size.get(), 6);
        assert!(plan.scenario.invited);
        assert_eq!(plan.days, 30);
        assert_eq!(plan.runs, 1_000);
        assert_eq!(plan.model, ModelKind::Drop);
        assert_eq!(cfg.resolved_outputs(), ResolvedOutputs::default());
    }

    #[test]
    fn rejects_out_of_range_level() {
        let yaml = BASIC_YAML.replace("gate_level: 10", "gate_level: 41");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("level 41 should fail");
        assert_eq!(field_of(err), "scenario.gate_level");
    }

    #[test]
    fn rejects_negative_days_and_runs() {
        let yaml = BASIC_YAML.replace("days: 30", "days: -1");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        assert_eq!(field_of(cfg.validate().unwrap_err()), "scenario.days");

        let yaml = BASIC_YAML.replace("runs: 10000", "runs: -10");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        assert_eq!(field_of(cfg.validate().unwrap_err()), "simulation.runs");
    }

    #[test]
    fn zero_runs_is_valid() {
        let yaml = BASIC_YAML.replace("runs: 10000", "runs: 0");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("zero runs disables simulation");
        assert_eq!(cfg.plan().unwrap().runs, 0);
    }

    #[test]
    fn visit_model_requires_five_members() {
        let yaml = BASIC_YAML
            .replace("model: drop", "model: visit")
            .replace("unit_size: 6", "unit_size: 4");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        assert_eq!(field_of(cfg.validate().unwrap_err()), "scenario.unit_size");

        let yaml = BASIC_YAML.replace("unit_size: 6", "unit_size: 4");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("drop model accepts small units");
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("lv10_unit6", "lv 10");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        assert_eq!(field_of(cfg.validate().unwrap_err()), "run_id");
    }

    #[test]
    fn rejects_blank_output_path() {
        let yaml = BASIC_YAML.replace("bench/out/{run_id}/plots", "  ");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        assert_eq!(field_of(cfg.validate().unwrap_err()), "outputs.plots_dir");
    }

    #[test]
    fn outputs_resolve_template_multiple_occurrences() {
        let yaml = BASIC_YAML.replace(
            "bench/out/{run_id}/plots",
            "bench/out/{run_id}/{run_id}/plots",
        );
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid");
        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.plots_dir,
            Some(PathBuf::from("bench/out/lv10_unit6/lv10_unit6/plots"))
        );
    }
}
