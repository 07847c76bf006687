use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::transplant::transplant;
use crate::utils::utils::list_vtk_files;

/// One source/target pair of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransplantJob {
    pub source: PathBuf,
    pub target: PathBuf,
}

impl TransplantJob {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub source: PathBuf,
    pub target: PathBuf,
    /// Error kind, e.g. `PointCountMismatch`; `None` on success.
    pub error_kind: Option<String>,
    pub error: Option<String>,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-job results of a batch, in job order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub attribute: String,
    pub outcomes: Vec<JobOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize batch report")?;
        fs::write(path, json)
            .with_context(|| format!("Could not write batch report: {}", path.display()))
    }
}

/// Pairs `.vtk` files that share a file name in `source_dir` and `target_dir`.
///
/// Files present on only one side are skipped with a warning.
pub fn pair_files_by_name<P: AsRef<Path>, Q: AsRef<Path>>(
    source_dir: P,
    target_dir: Q,
) -> Result<Vec<TransplantJob>> {
    let source_dir = source_dir.as_ref();
    let target_dir = target_dir.as_ref();

    let targets: HashSet<_> = list_vtk_files(target_dir)
        .context("Failed to list target meshes")?
        .into_iter()
        .filter_map(|p| p.file_name().map(|n| n.to_os_string()))
        .collect();

    let mut jobs = Vec::new();
    for source in list_vtk_files(source_dir).context("Failed to list source meshes")? {
        let Some(name) = source.file_name().map(|n| n.to_os_string()) else {
            continue;
        };
        if targets.contains(&name) {
            jobs.push(TransplantJob::new(source.clone(), target_dir.join(&name)));
        } else {
            warn!("No target mesh for {}, skipping", source.display());
        }
    }

    if jobs.len() < targets.len() {
        warn!(
            "{} target meshes in {} have no source counterpart",
            targets.len() - jobs.len(),
            target_dir.display()
        );
    }

    Ok(jobs)
}

/// Resolves symlinks for existing files; otherwise makes the path absolute
/// and drops `.` components, so two spellings of one file compare equal.
fn normalized(path: &Path) -> Result<PathBuf> {
    match fs::canonicalize(path) {
        Ok(path) => Ok(path),
        Err(_) => std::path::absolute(path)
            .with_context(|| format!("Could not resolve target path {}", path.display())),
    }
}

/// Runs every job, optionally on the rayon pool, and reports each outcome.
///
/// A failing job never stops the others. Job lists that write the same
/// target twice are rejected up front.
pub fn transplant_batch(
    jobs: &[TransplantJob],
    attribute_name: &str,
    parallel: bool,
) -> Result<BatchReport> {
    if attribute_name.is_empty() {
        bail!("Attribute name must not be empty");
    }

    let mut seen = HashSet::new();
    for job in jobs {
        if !seen.insert(normalized(&job.target)?) {
            bail!(
                "Target {} appears in more than one job",
                job.target.display()
            );
        }
    }

    let run = |job: &TransplantJob| -> JobOutcome {
        match transplant(&job.source, &job.target, attribute_name) {
            Ok(()) => JobOutcome {
                source: job.source.clone(),
                target: job.target.clone(),
                error_kind: None,
                error: None,
            },
            Err(e) => {
                warn!("Transplant onto {} failed: {}", job.target.display(), e);
                JobOutcome {
                    source: job.source.clone(),
                    target: job.target.clone(),
                    error_kind: Some(e.kind().to_string()),
                    error: Some(e.to_string()),
                }
            }
        }
    };

    let outcomes: Vec<JobOutcome> = if parallel {
        jobs.par_iter().map(run).collect()
    } else {
        jobs.iter().map(run).collect()
    };

    let report = BatchReport {
        attribute: attribute_name.to_string(),
        outcomes,
    };
    info!(
        attribute = attribute_name,
        succeeded = report.succeeded(),
        failed = report.failed(),
        "batch finished"
    );
    Ok(report)
}

#[cfg(test)]
mod batch_tests {
    use super::*;
    use crate::io::input::read_mesh;
    use crate::utils::test_utils::{tetrahedron_vtk, triangle_vtk, write_fixture};
    use serde_json::Value;

    const PHI: [f32; 4] = [0.1, 0.2, 0.3, 0.4];

    fn setup_dirs(dir: &Path) -> (PathBuf, PathBuf) {
        let src = dir.join("spheres");
        let dst = dir.join("aligned");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dst).unwrap();
        (src, dst)
    }

    #[test]
    fn test_pair_files_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let (src, dst) = setup_dirs(dir.path());
        for name in ["s01.vtk", "s02.vtk", "s03.vtk"] {
            write_fixture(&src, name, &tetrahedron_vtk(Some(("_paraPhi", &PHI))));
        }
        for name in ["s02.vtk", "s01.vtk", "extra.vtk"] {
            write_fixture(&dst, name, &tetrahedron_vtk(None));
        }

        let jobs = pair_files_by_name(&src, &dst).unwrap();
        assert_eq!(
            jobs,
            vec![
                TransplantJob::new(src.join("s01.vtk"), dst.join("s01.vtk")),
                TransplantJob::new(src.join("s02.vtk"), dst.join("s02.vtk")),
            ]
        );
    }

    #[test]
    fn test_batch_reports_each_job() {
        let dir = tempfile::tempdir().unwrap();
        let (src, dst) = setup_dirs(dir.path());
        let source = write_fixture(&src, "template.vtk", &tetrahedron_vtk(Some(("_paraPhi", &PHI))));
        let good_a = write_fixture(&dst, "a.vtk", &tetrahedron_vtk(None));
        let bad = write_fixture(&dst, "b.vtk", &triangle_vtk());
        let good_c = write_fixture(&dst, "c.vtk", &tetrahedron_vtk(None));

        let jobs = vec![
            TransplantJob::new(&source, &good_a),
            TransplantJob::new(&source, &bad),
            TransplantJob::new(&source, &good_c),
        ];

        for parallel in [false, true] {
            let report = transplant_batch(&jobs, "_paraPhi", parallel).unwrap();
            assert_eq!(report.outcomes.len(), 3);
            assert_eq!(report.succeeded(), 2);
            assert_eq!(report.failed(), 1);
            assert_eq!(report.outcomes[1].target, bad);
            assert_eq!(
                report.outcomes[1].error_kind.as_deref(),
                Some("PointCountMismatch")
            );
            assert_eq!(report.failures().count(), 1);
        }

        for target in [&good_a, &good_c] {
            let mesh = read_mesh(target).unwrap();
            assert_eq!(mesh.point_attribute("_paraPhi").unwrap().len(), 4);
        }
    }

    #[test]
    fn test_batch_rejects_duplicate_targets() {
        let jobs = vec![
            TransplantJob::new("a.vtk", "out.vtk"),
            TransplantJob::new("b.vtk", "out.vtk"),
        ];
        let err = transplant_batch(&jobs, "_paraPhi", true).unwrap_err();
        assert!(err.to_string().contains("more than one job"));
    }

    #[test]
    fn test_batch_rejects_differently_spelled_duplicates() {
        let jobs = vec![
            TransplantJob::new("a.vtk", "out.vtk"),
            TransplantJob::new("b.vtk", "./out.vtk"),
        ];
        assert!(transplant_batch(&jobs, "_paraPhi", true).is_err());

        let dir = tempfile::tempdir().unwrap();
        let target = write_fixture(dir.path(), "t.vtk", &tetrahedron_vtk(None));
        let jobs = vec![
            TransplantJob::new("a.vtk", &target),
            TransplantJob::new("b.vtk", dir.path().join(".").join("t.vtk")),
        ];
        let err = transplant_batch(&jobs, "_paraPhi", false).unwrap_err();
        assert!(err.to_string().contains("more than one job"));
        assert_eq!(fs::read_to_string(&target).unwrap(), tetrahedron_vtk(None));
    }

    #[test]
    fn test_batch_rejects_empty_attribute() {
        let jobs = vec![TransplantJob::new("a.vtk", "b.vtk")];
        assert!(transplant_batch(&jobs, "", false).is_err());
    }

    #[test]
    fn test_report_json() {
        let dir = tempfile::tempdir().unwrap();
        let report = BatchReport {
            attribute: "_paraPhi".to_string(),
            outcomes: vec![JobOutcome {
                source: PathBuf::from("a.vtk"),
                target: PathBuf::from("b.vtk"),
                error_kind: Some("AttributeNotFound".to_string()),
                error: Some("point attribute '_paraPhi' not found in a.vtk".to_string()),
            }],
        };
        let path = dir.path().join("report.json");
        report.write_json(&path).unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["attribute"], "_paraPhi");
        assert_eq!(value["outcomes"][0]["error_kind"], "AttributeNotFound");

        let back: BatchReport = serde_json::from_value(value).unwrap();
        assert_eq!(back, report);
    }
}
