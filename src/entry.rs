use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

use crate::pipeline::config::PipelineConfig;
use crate::pipeline::runner::CommandRunner;
use crate::pipeline::{PipelineSummary, RigidAlignmentPipeline};
use crate::processing::batch::{pair_files_by_name, transplant_batch, BatchReport};

/// Loads a TOML pipeline configuration and runs every stage with the
/// external tools found on `PATH`.
pub fn run_pipeline(config_path: &str) -> Result<PipelineSummary> {
    let config = PipelineConfig::from_toml_file(config_path)?;
    info!(config = config_path, "starting rigid alignment pipeline");

    let runner = CommandRunner::default();
    RigidAlignmentPipeline::new(&config, &runner)
        .run()
        .with_context(|| format!("Pipeline from {} failed", config_path))
}

/// Transplants `attribute` between same-named meshes of two directories.
pub fn run_transplant_dirs(
    source_dir: &str,
    target_dir: &str,
    attribute: &str,
    parallel: bool,
) -> Result<BatchReport> {
    let jobs = pair_files_by_name(source_dir, target_dir)?;
    if jobs.is_empty() {
        bail!(
            "No meshes with matching names in {} and {}",
            Path::new(source_dir).display(),
            Path::new(target_dir).display()
        );
    }
    transplant_batch(&jobs, attribute, parallel)
}
