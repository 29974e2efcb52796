use std::path::PathBuf;

use memoria_bench::config::{BenchmarkConfig, ModelKind};

#[test]
fn bundled_config_loads_and_validates() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("bench/memoria.yaml");
    let config = BenchmarkConfig::from_path(&path).expect("bundled config is valid");

    assert_eq!(config.run_id, "level10_unit6");
    assert_eq!(config.model, ModelKind::Drop);
    let plan = config.plan().expect("plan");
    assert_eq!(plan.scenario.level.get(), 10);
    assert_eq!(plan.days, 30);
    assert_eq!(plan.runs, 10_000);

    let outputs = config.resolved_outputs();
    assert_eq!(
        outputs.summary_md,
        Some(PathBuf::from("target/memoria/level10_unit6/summary.md"))
    );
}
