// File: src/python_bind.rs
use pyo3::exceptions::{PyIOError, PyKeyError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::path::Path;

use crate::error::TransplantError;
use crate::io::SurfaceMesh;
use crate::pipeline::PipelineSummary;
use crate::processing::batch::{BatchReport, JobOutcome};

impl From<TransplantError> for PyErr {
    fn from(err: TransplantError) -> Self {
        let message = err.to_string();
        match err {
            TransplantError::AttributeNotFound { .. } => PyKeyError::new_err(message),
            TransplantError::PointCountMismatch { .. } => PyValueError::new_err(message),
            TransplantError::SourceRead { .. }
            | TransplantError::TargetRead { .. }
            | TransplantError::Write { .. } => PyIOError::new_err(message),
        }
    }
}

/// Anything reported through `anyhow` surfaces as a `RuntimeError`.
pub fn runtime_error(err: anyhow::Error) -> PyErr {
    PyRuntimeError::new_err(format!("{:#}", err))
}

#[pyclass]
#[derive(Debug, Clone)]
pub struct PyMeshInfo {
    #[pyo3(get)]
    pub path: String,
    #[pyo3(get)]
    pub title: String,
    /// "ASCII" or "BINARY".
    #[pyo3(get)]
    pub encoding: String,
    #[pyo3(get)]
    pub num_points: usize,
    #[pyo3(get)]
    pub num_polygons: usize,
    #[pyo3(get)]
    pub point_attributes: Vec<String>,
}

#[pymethods]
impl PyMeshInfo {
    fn __repr__(&self) -> String {
        format!(
            "MeshInfo(path={}, points={}, polygons={}, attributes={:?})",
            self.path, self.num_points, self.num_polygons, self.point_attributes
        )
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.point_attributes.iter().any(|a| a == name)
    }
}

impl PyMeshInfo {
    pub fn from_mesh(path: &Path, mesh: &SurfaceMesh) -> Self {
        Self {
            path: path.to_string_lossy().into_owned(),
            title: mesh.title().to_string(),
            encoding: mesh.encoding().as_str().to_string(),
            num_points: mesh.num_points(),
            num_polygons: mesh.num_polygons(),
            point_attributes: mesh.point_attribute_names(),
        }
    }
}

#[pyclass]
#[derive(Debug, Clone)]
pub struct PyJobOutcome {
    #[pyo3(get)]
    pub source: String,
    #[pyo3(get)]
    pub target: String,
    #[pyo3(get)]
    pub error_kind: Option<String>,
    #[pyo3(get)]
    pub error: Option<String>,
}

#[pymethods]
impl PyJobOutcome {
    #[getter]
    fn success(&self) -> bool {
        self.error.is_none()
    }

    fn __repr__(&self) -> String {
        match &self.error_kind {
            None => format!("JobOutcome(target={}, ok)", self.target),
            Some(kind) => format!("JobOutcome(target={}, error={})", self.target, kind),
        }
    }
}

impl From<&JobOutcome> for PyJobOutcome {
    fn from(outcome: &JobOutcome) -> Self {
        Self {
            source: outcome.source.to_string_lossy().into_owned(),
            target: outcome.target.to_string_lossy().into_owned(),
            error_kind: outcome.error_kind.clone(),
            error: outcome.error.clone(),
        }
    }
}

#[pyclass]
#[derive(Debug, Clone)]
pub struct PyBatchReport {
    #[pyo3(get)]
    pub attribute: String,
    #[pyo3(get)]
    pub outcomes: Vec<PyJobOutcome>,
    /// Remeshed surfaces; only filled by a pipeline run.
    #[pyo3(get)]
    pub aligned: Vec<String>,
}

#[pymethods]
impl PyBatchReport {
    #[getter]
    fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_none()).count()
    }

    #[getter]
    fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    fn failures(&self) -> Vec<PyJobOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.error.is_some())
            .cloned()
            .collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "BatchReport(attribute={}, succeeded={}, failed={})",
            self.attribute,
            self.succeeded(),
            self.failed()
        )
    }

    fn __len__(&self) -> usize {
        self.outcomes.len()
    }
}

impl From<BatchReport> for PyBatchReport {
    fn from(report: BatchReport) -> Self {
        Self {
            outcomes: report.outcomes.iter().map(PyJobOutcome::from).collect(),
            attribute: report.attribute,
            aligned: Vec::new(),
        }
    }
}

impl From<PipelineSummary> for PyBatchReport {
    fn from(summary: PipelineSummary) -> Self {
        let mut report = PyBatchReport::from(summary.report);
        report.aligned = summary
            .aligned
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        report
    }
}
