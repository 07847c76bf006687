use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{Result, TransplantError};
use crate::io::input::read_mesh;
use crate::io::output::encode_mesh;

/// Copies the point array `attribute_name` from the mesh at `source_path` onto
/// the mesh at `target_path`, making it the target's active scalars, and
/// rewrites the target in place in the encoding it was read in.
///
/// The target file is not touched unless every check passed and the updated
/// mesh has been encoded; the final file write itself is not atomic.
///
/// # Errors
///
/// - [`TransplantError::SourceRead`] / [`TransplantError::TargetRead`] when a
///   mesh cannot be read, parsed, or fails its integrity checks
/// - [`TransplantError::AttributeNotFound`] when the source has no such array
/// - [`TransplantError::PointCountMismatch`] when the array has not exactly one
///   tuple per target point
/// - [`TransplantError::Write`] when the target cannot be encoded or written
pub fn transplant<P: AsRef<Path>, Q: AsRef<Path>>(
    source_path: P,
    target_path: Q,
    attribute_name: &str,
) -> Result<()> {
    let source_path = source_path.as_ref();
    let target_path = target_path.as_ref();

    let source = read_mesh(source_path).map_err(|e| TransplantError::SourceRead {
        path: source_path.to_path_buf(),
        message: format!("{:#}", e),
    })?;

    let array = source
        .point_attribute(attribute_name)
        .ok_or_else(|| TransplantError::AttributeNotFound {
            name: attribute_name.to_string(),
            path: source_path.to_path_buf(),
        })?;

    let mut target = read_mesh(target_path).map_err(|e| TransplantError::TargetRead {
        path: target_path.to_path_buf(),
        message: format!("{:#}", e),
    })?;

    if array.len() != target.num_points() {
        return Err(TransplantError::PointCountMismatch {
            name: attribute_name.to_string(),
            array_len: array.len(),
            target_points: target.num_points(),
        });
    }

    let n_values = array.len();
    target.set_active_scalars(array);

    let bytes = encode_mesh(&target).map_err(|e| TransplantError::Write {
        path: target_path.to_path_buf(),
        message: format!("{:#}", e),
    })?;
    fs::write(target_path, bytes).map_err(|e| TransplantError::Write {
        path: target_path.to_path_buf(),
        message: e.to_string(),
    })?;

    info!(
        source = %source_path.display(),
        target = %target_path.display(),
        attribute = attribute_name,
        values = n_values,
        "transplanted point attribute"
    );
    Ok(())
}
