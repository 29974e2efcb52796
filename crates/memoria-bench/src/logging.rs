use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::{self, NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LoggingConfig, ResolvedOutputs};

pub struct LoggingGuard {
    _guard: WorkerGuard,
    pub telemetry_path: Option<PathBuf>,
}

/// Install a JSON subscriber when structured logging is enabled.
///
/// Events go to `<summary dir>/telemetry.jsonl` when a summary path is
/// configured and to stderr otherwise.
pub fn init_logging(
    logging: &LoggingConfig,
    outputs: &ResolvedOutputs,
) -> Result<Option<LoggingGuard>> {
    if !logging.enable_structured {
        return Ok(None);
    }

    let (writer, guard, telemetry_path) = match outputs.telemetry_dir() {
        Some(telemetry_dir) => {
            fs::create_dir_all(&telemetry_dir).with_context(|| {
                format!(
                    "creating telemetry directory at {}",
                    telemetry_dir.display()
                )
            })?;
            let telemetry_path = telemetry_dir.join("telemetry.jsonl");
            let file = File::create(&telemetry_path).with_context(|| {
                format!("creating telemetry file at {}", telemetry_path.display())
            })?;
            let (writer, guard) = lossless(file);
            (writer, guard, Some(telemetry_path))
        }
        None => {
            let (writer, guard) = lossless(std::io::stderr());
            (writer, guard, None)
        }
    };

    let level = logging.level().unwrap_or(Level::INFO);
    let filter = EnvFilter::new(level.as_str());

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .json()
        .with_current_span(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(writer)
        .finish();

    // A global subscriber may already be set (e.g., when running in tests)
    let _ = tracing::subscriber::set_global_default(subscriber);

    Ok(Some(LoggingGuard {
        _guard: guard,
        telemetry_path,
    }))
}

fn lossless<W: std::io::Write + Send + 'static>(sink: W) -> (NonBlocking, WorkerGuard) {
    non_blocking::NonBlockingBuilder::default()
        .lossy(false)
        .finish(sink)
}
