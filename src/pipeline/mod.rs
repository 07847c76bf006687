pub mod config;
pub mod runner;

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::io::output::write_population_csv;
use crate::processing::batch::{transplant_batch, BatchReport, TransplantJob};
use crate::utils::utils::{file_stem, list_vtk_files, suffixed_vtk_path};
use config::PipelineConfig;
use runner::{ToolParams, ToolRunner};

pub const REPORT_FILE: &str = "transplant_report.json";
pub const POPULATION_FILE: &str = "population.csv";

/// What a pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    /// Remeshed surfaces carrying the transplanted attribute.
    pub aligned: Vec<PathBuf>,
    pub report: BatchReport,
    pub population_csv: PathBuf,
}

/// Rigid alignment, per-subject remeshing, attribute transplant and viewer,
/// run in that order against external tools.
pub struct RigidAlignmentPipeline<'a, R: ToolRunner> {
    config: &'a PipelineConfig,
    runner: &'a R,
}

impl<'a, R: ToolRunner> RigidAlignmentPipeline<'a, R> {
    pub fn new(config: &'a PipelineConfig, runner: &'a R) -> Self {
        Self { config, runner }
    }

    pub fn run(&self) -> Result<PipelineSummary> {
        self.config.validate()?;
        let sphere = self.config.common_sphere()?;

        self.run_rigid_alignment()?;
        let aligned = self.run_remeshing(&sphere)?;

        let jobs: Vec<TransplantJob> = aligned
            .iter()
            .map(|target| TransplantJob::new(&sphere, target))
            .collect();
        let report = transplant_batch(&jobs, &self.config.attribute, self.config.parallel)
            .context("Transplant stage failed")?;
        let output = &self.config.directories.output;
        report.write_json(output.join(REPORT_FILE))?;
        if report.failed() > 0 {
            bail!(
                "{} of {} transplants failed, see {}",
                report.failed(),
                report.outcomes.len(),
                output.join(REPORT_FILE).display()
            );
        }

        let population_csv = output.join(POPULATION_FILE);
        write_population_csv(&aligned, &population_csv)?;
        if self.config.launch_viewer {
            let mut params = ToolParams::new();
            params.insert("csvFile".to_string(), path_param(&population_csv));
            self.run_tool(&self.config.tools.viewer, &params)?;
        }

        info!(subjects = aligned.len(), "pipeline finished");
        Ok(PipelineSummary {
            aligned,
            report,
            population_csv,
        })
    }

    fn run_rigid_alignment(&self) -> Result<()> {
        let dirs = &self.config.directories;
        let mut params = ToolParams::new();
        params.insert("mesh".to_string(), path_param(&dirs.models));
        params.insert("landmark".to_string(), path_param(&dirs.fiducials));
        params.insert("sphere".to_string(), path_param(&dirs.sphere));
        params.insert("output".to_string(), path_param(&dirs.output));
        self.run_tool(&self.config.tools.rigid_alignment, &params)
    }

    /// Remeshes every model onto the common sphere; returns the outputs in model order.
    fn run_remeshing(&self, sphere: &Path) -> Result<Vec<PathBuf>> {
        let dirs = &self.config.directories;
        let models = list_vtk_files(&dirs.models).context("Failed to list input models")?;
        if models.is_empty() {
            bail!("No .vtk models in {}", dirs.models.display());
        }

        let mut aligned = Vec::with_capacity(models.len());
        for model in &models {
            let stem = file_stem(model)
                .with_context(|| format!("Model {} has no usable name", model.display()))?;
            let rotated = suffixed_vtk_path(&dirs.output, &stem, &self.config.rotated_sphere_suffix);
            let output = suffixed_vtk_path(&dirs.output, &stem, &self.config.aligned_suffix);

            let mut params = ToolParams::new();
            params.insert("tempModel".to_string(), path_param(sphere));
            params.insert("input".to_string(), path_param(model));
            params.insert("ref".to_string(), path_param(&rotated));
            params.insert("output".to_string(), path_param(&output));
            self.run_tool(&self.config.tools.remesh, &params)?;

            if !output.is_file() {
                bail!(
                    "{} finished without writing {}",
                    self.config.tools.remesh,
                    output.display()
                );
            }
            aligned.push(output);
        }
        Ok(aligned)
    }

    fn run_tool(&self, tool: &str, params: &ToolParams) -> Result<()> {
        let status = self
            .runner
            .run(tool, params)
            .with_context(|| format!("Could not run {}", tool))?;
        if !status.is_success() {
            match status.code {
                Some(code) => bail!("{} exited with status {}", tool, code),
                None => bail!("{} was terminated by a signal", tool),
            }
        }
        Ok(())
    }
}

fn path_param(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
