//! Pipeline configuration.
//!
//! Directories, external tool names and output naming for the rigid
//! alignment pipeline. Loaded from TOML; every field has a default.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::utils::list_vtk_files;

/// Input and output directories, mirroring the four directory pickers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Directories {
    /// Input surface models.
    pub models: PathBuf,
    /// Landmark (fiducial) files.
    pub fiducials: PathBuf,
    /// Directory holding the common unit sphere.
    pub sphere: PathBuf,
    /// Where every stage writes its results.
    pub output: PathBuf,
}

/// Names (or paths) of the external executables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolNames {
    pub rigid_alignment: String,
    pub remesh: String,
    pub viewer: String,
}

impl Default for ToolNames {
    fn default() -> Self {
        Self {
            rigid_alignment: "RigidAlignment".to_string(),
            remesh: "SRemesh".to_string(),
            viewer: "ShapePopulationViewer".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub directories: Directories,
    pub tools: ToolNames,

    /// Point array copied from the common sphere onto every aligned mesh.
    pub attribute: String,

    /// Run the transplant jobs on the rayon pool.
    pub parallel: bool,

    /// Open the population viewer once everything is written.
    pub launch_viewer: bool,

    /// Suffix of the per-subject sphere written by the rigid alignment tool.
    pub rotated_sphere_suffix: String,

    /// Suffix of the per-subject remeshed surface.
    pub aligned_suffix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            directories: Directories::default(),
            tools: ToolNames::default(),
            attribute: "_paraPhi".to_string(),
            parallel: true,
            launch_viewer: false,
            rotated_sphere_suffix: "_rotSphere".to_string(),
            aligned_suffix: "_aligned".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid pipeline configuration")
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config: {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("In {}", path.display()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize pipeline configuration")
    }

    /// Every directory must be chosen and exist, and the sphere directory must
    /// hold a mesh; otherwise the inputs are invalid and nothing runs.
    pub fn validate(&self) -> Result<()> {
        let dirs = &self.directories;
        for (label, dir) in [
            ("models", &dirs.models),
            ("fiducials", &dirs.fiducials),
            ("sphere", &dirs.sphere),
            ("output", &dirs.output),
        ] {
            if dir.as_os_str().is_empty() || dir == Path::new(".") {
                bail!("Invalid inputs: no {} directory selected", label);
            }
            if !dir.is_dir() {
                bail!(
                    "Invalid inputs: {} directory {} does not exist",
                    label,
                    dir.display()
                );
            }
        }

        if self.attribute.is_empty() {
            bail!("Invalid inputs: attribute name is empty");
        }

        self.common_sphere()?;
        Ok(())
    }

    /// The common unit sphere: first `.vtk` file of the sphere directory.
    pub fn common_sphere(&self) -> Result<PathBuf> {
        list_vtk_files(&self.directories.sphere)
            .context("Failed to list sphere directory")?
            .into_iter()
            .next()
            .with_context(|| {
                format!(
                    "Invalid inputs: no .vtk sphere in {}",
                    self.directories.sphere.display()
                )
            })
    }
}
