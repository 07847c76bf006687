pub mod entry;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod processing;
pub mod python_bind;
pub mod utils;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;
use std::path::Path;

use entry::{run_pipeline, run_transplant_dirs};
use io::input::read_mesh;
use io::output::write_attribute_csv;
use processing::transplant::transplant;
use python_bind::{runtime_error, PyBatchReport, PyJobOutcome, PyMeshInfo};

/// Copies a point attribute from `source` onto `target`, overwriting `target`.
///
/// Raises `KeyError` when the source lacks the attribute, `ValueError` on a
/// point count mismatch and `IOError` for unreadable or unwritable files.
#[pyfunction]
#[pyo3(name = "transplant", signature = (source, target, attribute = "_paraPhi"))]
fn transplant_py(py: Python<'_>, source: &str, target: &str, attribute: &str) -> PyResult<()> {
    py.allow_threads(|| transplant(source, target, attribute))?;
    Ok(())
}

/// Transplants between same-named `.vtk` files of two directories.
#[pyfunction]
#[pyo3(signature = (source_dir, target_dir, attribute = "_paraPhi", parallel = true))]
fn transplant_dirs(
    py: Python<'_>,
    source_dir: &str,
    target_dir: &str,
    attribute: &str,
    parallel: bool,
) -> PyResult<PyBatchReport> {
    let report = py
        .allow_threads(|| run_transplant_dirs(source_dir, target_dir, attribute, parallel))
        .map_err(runtime_error)?;
    Ok(report.into())
}

#[pyfunction]
fn mesh_info(path: &str) -> PyResult<PyMeshInfo> {
    let mesh = read_mesh(path).map_err(runtime_error)?;
    Ok(PyMeshInfo::from_mesh(Path::new(path), &mesh))
}

/// Writes `point_index,x,y,z,value` rows for one point attribute of a mesh.
#[pyfunction]
#[pyo3(signature = (mesh_path, csv_path, attribute = "_paraPhi"))]
fn export_attribute_csv(mesh_path: &str, csv_path: &str, attribute: &str) -> PyResult<()> {
    let mesh = read_mesh(mesh_path).map_err(runtime_error)?;
    write_attribute_csv(&mesh, attribute, csv_path).map_err(runtime_error)
}

/// Runs the rigid alignment pipeline described by a TOML file.
#[pyfunction]
#[pyo3(name = "run_pipeline")]
fn run_pipeline_py(py: Python<'_>, config_path: &str) -> PyResult<PyBatchReport> {
    let summary = py
        .allow_threads(|| run_pipeline(config_path))
        .map_err(runtime_error)?;
    Ok(summary.into())
}

/// Installs a stderr log subscriber; returns false if one is already set.
#[pyfunction]
#[pyo3(signature = (level = "info"))]
fn init_logging(level: &str) -> PyResult<bool> {
    let level: tracing::Level = level
        .parse()
        .map_err(|_| PyValueError::new_err(format!("Unknown log level: {}", level)))?;
    Ok(tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok())
}

#[pymodule]
fn shapetransplant(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(transplant_py, m)?)?;
    m.add_function(wrap_pyfunction!(transplant_dirs, m)?)?;
    m.add_function(wrap_pyfunction!(mesh_info, m)?)?;
    m.add_function(wrap_pyfunction!(export_attribute_csv, m)?)?;
    m.add_function(wrap_pyfunction!(run_pipeline_py, m)?)?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;

    m.add_class::<PyMeshInfo>()?;
    m.add_class::<PyJobOutcome>()?;
    m.add_class::<PyBatchReport>()?;
    Ok(())
}
