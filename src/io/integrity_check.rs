use anyhow::{anyhow, Result};
use tracing::warn;

use super::SurfaceMesh;

pub fn check_mesh_integrity(mesh: &SurfaceMesh) -> Result<()> {
    let checks: &[(&str, fn(&SurfaceMesh) -> Result<()>)] = &[
        ("check_coordinate_count", check_coordinate_count),
        ("check_cell_indices", check_cell_indices),
        ("check_attribute_lengths", check_attribute_lengths),
    ];

    for (name, f) in checks {
        if let Err(e) = f(mesh) {
            warn!("Integrity check '{}' failed: {}", name, e);
            return Err(e);
        }
    }

    warn_non_finite_points(mesh);
    Ok(())
}

/// Check that the point buffer holds whole xyz triples
fn check_coordinate_count(mesh: &SurfaceMesh) -> Result<()> {
    let count = mesh.coordinate_count();
    if count % 3 != 0 {
        return Err(anyhow!(
            "Point buffer has {} values, which is not a multiple of 3",
            count
        ));
    }
    Ok(())
}

/// Check that every cell only references existing points
fn check_cell_indices(mesh: &SurfaceMesh) -> Result<()> {
    let n_points = mesh.num_points();
    for (cell_index, cell) in mesh.all_cells().iter().enumerate() {
        if let Some(&bad) = cell.iter().find(|&&v| v as usize >= n_points) {
            return Err(anyhow!(
                "Cell {} references point {} but the mesh has {} points",
                cell_index,
                bad,
                n_points
            ));
        }
    }
    Ok(())
}

/// Check that every point attribute has one tuple per point
fn check_attribute_lengths(mesh: &SurfaceMesh) -> Result<()> {
    let n_points = mesh.num_points();
    for (name, len) in mesh.point_attribute_lengths() {
        if len != n_points {
            return Err(anyhow!(
                "Point attribute '{}' has {} tuples, expected {}",
                name,
                len,
                n_points
            ));
        }
    }
    Ok(())
}

fn warn_non_finite_points(mesh: &SurfaceMesh) {
    let non_finite = mesh
        .points()
        .iter()
        .filter(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        .count();
    if non_finite > 0 {
        warn!("Mesh '{}' has {} non-finite points", mesh.title(), non_finite);
    }
}
