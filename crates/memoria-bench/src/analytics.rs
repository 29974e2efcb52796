use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use memoria_core::{DropDistribution, Scenario};
use plotters::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::config::ModelKind;

const CONFIDENCE_Z: f64 = 1.96; // 95% CI
const MAX_CONSOLE_ROWS: usize = 30;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("no simulation totals to summarise")]
    Empty,
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}

/// Analytical expectations for the configured scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ExpectationReport {
    pub model: ModelKind,
    pub scenario: Scenario,
    pub days: u32,
    pub daily_total: f64,
    pub cumulative_total: f64,
    /// Analytical spread of the cumulative total, when the model has a closed form.
    pub cumulative_std_dev: Option<f64>,
    /// `(label, per-day value)` for each member group.
    pub daily_breakdown: Vec<(String, f64)>,
    pub cumulative_breakdown: Vec<(String, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistogramBin {
    pub total: u64,
    pub count: usize,
}

/// Empirical distribution of cumulative totals compared with the expectation.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub runs: usize,
    pub expected_total: f64,
    pub mean: f64,
    /// Population standard deviation of the run totals.
    pub std_dev: f64,
    pub std_error: f64,
    pub ci95: (f64, f64),
    pub min: u64,
    pub max: u64,
    pub z_score: f64,
    pub p_value: f64,
    pub histogram: Vec<HistogramBin>,
}

impl SimulationSummary {
    pub fn from_totals(totals: &[u64], expected_total: f64) -> Result<Self, AnalyticsError> {
        let (Some(&min), Some(&max)) = (totals.iter().min(), totals.iter().max()) else {
            return Err(AnalyticsError::Empty);
        };

        let n = totals.len() as f64;
        let mean = totals.iter().map(|&t| t as f64).sum::<f64>() / n;
        let squared = totals
            .iter()
            .map(|&t| (t as f64 - mean).powi(2))
            .sum::<f64>();
        let std_dev = (squared / n).sqrt();
        let std_error = if totals.len() > 1 {
            (squared / (n - 1.0) / n).sqrt()
        } else {
            0.0
        };
        let margin = CONFIDENCE_Z * std_error;
        let (z_score, p_value) = two_sided_z(mean - expected_total, std_error);

        let mut counts = vec![0usize; (max - min) as usize + 1];
        for &total in totals {
            counts[(total - min) as usize] += 1;
        }
        let histogram = counts
            .into_iter()
            .enumerate()
            .map(|(offset, count)| HistogramBin {
                total: min + offset as u64,
                count,
            })
            .collect();

        Ok(Self {
            runs: totals.len(),
            expected_total,
            mean,
            std_dev,
            std_error,
            ci95: (mean - margin, mean + margin),
            min,
            max,
            z_score,
            p_value,
            histogram,
        })
    }

    /// Whether the simulated mean lies within `k` standard errors of the expectation.
    pub fn within_std_errors(&self, k: f64) -> bool {
        (self.mean - self.expected_total).abs() <= k * self.std_error + f64::EPSILON
    }

    /// Integer bins merged into at most [`MAX_CONSOLE_ROWS`] rows of `(low, high, count)`.
    pub fn bucketed(&self) -> Vec<(u64, u64, usize)> {
        let span = self.histogram.len();
        let width = span.div_ceil(MAX_CONSOLE_ROWS).max(1);
        self.histogram
            .chunks(width)
            .map(|chunk| {
                let low = chunk[0].total;
                let high = chunk[chunk.len() - 1].total;
                (low, high, chunk.iter().map(|bin| bin.count).sum())
            })
            .collect()
    }

    /// Text histogram with the bar containing the expectation marked.
    pub fn console_histogram(&self, width: usize) -> String {
        let rows = self.bucketed();
        let peak = rows.iter().map(|row| row.2).max().unwrap_or(0).max(1);
        let label_width = self.max.to_string().len();
        let mut out = String::new();
        for (low, high, count) in rows {
            let bar = "#".repeat(count * width / peak);
            let label = if low == high {
                format!("{low:>label_width$}")
            } else {
                format!("{low:>label_width$}-{high:<label_width$}")
            };
            let marker = if (low as f64 - 0.5..high as f64 + 0.5).contains(&self.expected_total)
            {
                "  <- expected"
            } else {
                ""
            };
            let _ = writeln!(out, "{label} | {bar} {count}{marker}");
        }
        out
    }

    /// Bar chart of the run totals with the expectation as a vertical line.
    /// Draws no text.
    pub fn render_plot(&self, dir: impl AsRef<Path>) -> Result<PathBuf, AnalyticsError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| AnalyticsError::Io {
                context: "creating plots directory",
                source: e,
            })?;
        }

        let output_path = dir.join("totals_histogram.png");
        let histogram = self.histogram.clone();
        let expected = self.expected_total;
        let x_min = (self.min as f64).min(expected) - 1.0;
        let x_max = (self.max as f64).max(expected) + 1.0;
        let y_max = histogram.iter().map(|bin| bin.count).max().unwrap_or(0) + 1;

        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let plot_attempt = std::panic::catch_unwind(move || {
            let root = BitMapBackend::new(&output_path, (800, 500)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .build_cartesian_2d(x_min..x_max, 0usize..y_max)
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .draw_series(histogram.iter().map(|bin| {
                    let center = bin.total as f64;
                    Rectangle::new(
                        [(center - 0.5, 0), (center + 0.5, bin.count)],
                        BLUE.mix(0.7).filled(),
                    )
                }))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(expected, 0), (expected, y_max)],
                    RED.stroke_width(2),
                )))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(chart);

            root.present()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(root);

            Ok(output_path)
        });

        std::panic::set_hook(prev_hook);

        match plot_attempt {
            Ok(result) => result,
            Err(_) => Err(AnalyticsError::Plot(
                "plotters panicked while rendering".into(),
            )),
        }
    }
}

fn two_sided_z(diff: f64, std_error: f64) -> (f64, f64) {
    if std_error <= 0.0 {
        return if diff.abs() < 1e-12 {
            (0.0, 1.0)
        } else {
            (diff.signum() * f64::INFINITY, 0.0)
        };
    }
    let z = diff / std_error;
    let normal = Normal::new(0.0, 1.0).unwrap();
    let p = 2.0 * (1.0 - normal.cdf(z.abs()));
    (z, p.clamp(0.0, 1.0))
}

/// Markdown report: expectations, the probability table and, when present,
/// the simulation comparison.
pub fn write_markdown(
    path: impl AsRef<Path>,
    expectation: &ExpectationReport,
    table: &DropDistribution,
    simulation: Option<&SimulationSummary>,
) -> Result<(), AnalyticsError> {
    let scenario = &expectation.scenario;
    let mut rows = String::new();
    rows.push_str("# Memoria Expectation Summary\n\n");
    let _ = writeln!(
        rows,
        "Model: {:?} | Gate level: {} | Unit size: {} | Invited: {} | Days: {}\n",
        expectation.model,
        scenario.level.get(),
        scenario.unit_size.get(),
        scenario.invited,
        expectation.days
    );

    rows.push_str("| Group | Per day | Cumulative |\n");
    rows.push_str("|-------|---------|------------|\n");
    let _ = writeln!(
        rows,
        "| Total | {:.3} | {:.3} |",
        expectation.daily_total, expectation.cumulative_total
    );
    if let Some(std_dev) = expectation.cumulative_std_dev {
        let _ = writeln!(rows, "| Std dev | | {std_dev:.3} |");
    }
    for ((label, daily), (_, cumulative)) in expectation
        .daily_breakdown
        .iter()
        .zip(&expectation.cumulative_breakdown)
    {
        let _ = writeln!(rows, "| {label} | {daily:.3} | {cumulative:.3} |");
    }

    rows.push_str("\n## Probability table\n\n");
    rows.push_str("| Outcome | Probability (%) |\n");
    rows.push_str("|---------|-----------------|\n");
    for outcome in table.outcomes() {
        let _ = writeln!(
            rows,
            "| {} | {:.1} |",
            outcome.drops,
            outcome.probability * 100.0
        );
    }

    if let Some(sim) = simulation {
        rows.push_str("\n## Simulation\n\n");
        rows.push_str("| Runs | Mean | Std dev | 95% CI | Min | Max | z | p-value |\n");
        rows.push_str("|------|------|---------|--------|-----|-----|---|---------|\n");
        let _ = writeln!(
            rows,
            "| {runs} | {mean:.3} | {sd:.3} | [{lo:.3}, {hi:.3}] | {min} | {max} | {z:+.2} | {p:.3} |",
            runs = sim.runs,
            mean = sim.mean,
            sd = sim.std_dev,
            lo = sim.ci95.0,
            hi = sim.ci95.1,
            min = sim.min,
            max = sim.max,
            z = sim.z_score,
            p = sim.p_value,
        );
    }

    fs::write(path.as_ref(), rows).map_err(|e| AnalyticsError::Io {
        context: "writing summary markdown",
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_statistics_on_fixed_totals() {
        let summary = SimulationSummary::from_totals(&[10, 12, 12, 14], 12.0).unwrap();
        assert_eq!(summary.runs, 4);
        assert!((summary.mean - 12.0).abs() < 1e-12);
        // population variance = (4 + 0 + 0 + 4) / 4 = 2
        assert!((summary.std_dev - 2f64.sqrt()).abs() < 1e-12);
        // sample variance = 8 / 3, standard error = sqrt(8 / 3 / 4)
        assert!((summary.std_error - (8.0f64 / 12.0).sqrt()).abs() < 1e-12);
        assert_eq!(summary.z_score, 0.0);
        assert!((summary.p_value - 1.0).abs() < 1e-12);
        assert_eq!((summary.min, summary.max), (10, 14));
        assert_eq!(
            summary.histogram,
            vec![
                HistogramBin { total: 10, count: 1 },
                HistogramBin { total: 11, count: 0 },
                HistogramBin { total: 12, count: 2 },
                HistogramBin { total: 13, count: 0 },
                HistogramBin { total: 14, count: 1 },
            ]
        );
        assert!(summary.within_std_errors(0.0));
    }

    #[test]
    fn empty_totals_are_rejected() {
        assert!(matches!(
            SimulationSummary::from_totals(&[], 1.0),
            Err(AnalyticsError::Empty)
        ));
    }

    #[test]
    fn constant_totals_far_from_expectation_have_zero_p_value() {
        let summary = SimulationSummary::from_totals(&[5, 5, 5], 7.0).unwrap();
        assert_eq!(summary.std_error, 0.0);
        assert_eq!(summary.p_value, 0.0);
        assert!(!summary.within_std_errors(3.0));
    }

    #[test]
    fn console_histogram_merges_wide_ranges_and_marks_expectation() {
        let totals: Vec<u64> = (100..=189).collect();
        let summary = SimulationSummary::from_totals(&totals, 144.5).unwrap();
        let rows = summary.bucketed();
        assert_eq!(rows.len(), MAX_CONSOLE_ROWS);
        assert_eq!(rows[0], (100, 102, 3));

        let text = summary.console_histogram(20);
        assert_eq!(text.lines().count(), MAX_CONSOLE_ROWS);
        assert_eq!(text.matches("<- expected").count(), 1);
    }

    #[test]
    fn plot_renders_without_font_support() {
        let totals: Vec<u64> = (0..200).map(|i| 700 + i % 41).collect();
        let summary = SimulationSummary::from_totals(&totals, 720.0).unwrap();
        let dir = tempfile::tempdir().expect("temp dir");

        let path = summary
            .render_plot(dir.path().join("plots"))
            .expect("plot renders");
        assert_eq!(path, dir.path().join("plots").join("totals_histogram.png"));
        let bytes = fs::read(&path).expect("png readable");
        assert!(bytes.starts_with(b"\x89PNG"));
    }
}
