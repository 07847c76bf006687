use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;
use vtkio::model::Vtk;

use super::integrity_check::check_mesh_integrity;
use super::{FileEncoding, SurfaceMesh};

const VTK_MAGIC: &str = "# vtk DataFile Version";

/// First legacy version whose cells are written as OFFSETS/CONNECTIVITY,
/// a layout the parser skips without reporting it.
const FIRST_UNSUPPORTED_MAJOR: u32 = 5;

/// `(major, minor)` from the `# vtk DataFile Version x.y` line.
pub fn header_version(bytes: &[u8]) -> Result<(u32, u32)> {
    let first = bytes.split(|&b| b == b'\n').next().unwrap_or_default();
    let line = String::from_utf8_lossy(first);
    let version = line
        .trim()
        .strip_prefix(VTK_MAGIC)
        .ok_or_else(|| anyhow!("Missing legacy VTK header, found {:?}", line.trim()))?
        .trim();

    let (major, minor) = version.split_once('.').unwrap_or((version, "0"));
    let major = major
        .parse::<u32>()
        .with_context(|| format!("Bad legacy VTK version {:?}", version))?;
    let minor = minor
        .parse::<u32>()
        .with_context(|| format!("Bad legacy VTK version {:?}", version))?;
    Ok((major, minor))
}

/// Utility: read the encoding keyword from the third header line.
pub fn sniff_encoding(bytes: &[u8]) -> Result<FileEncoding> {
    let mut lines = bytes.split(|&b| b == b'\n');

    let magic = lines
        .next()
        .map(|l| String::from_utf8_lossy(l).trim().to_string())
        .unwrap_or_default();
    if !magic.starts_with(VTK_MAGIC) {
        bail!("Missing legacy VTK header, found {:?}", magic);
    }

    // second line is the free-form title
    lines
        .next()
        .ok_or_else(|| anyhow!("Legacy VTK header ends after the version line"))?;

    let keyword = lines
        .next()
        .map(|l| String::from_utf8_lossy(l).trim().to_ascii_uppercase())
        .ok_or_else(|| anyhow!("Legacy VTK header has no encoding line"))?;

    match keyword.as_str() {
        "ASCII" => Ok(FileEncoding::Ascii),
        "BINARY" => Ok(FileEncoding::Binary),
        other => bail!("Unknown legacy VTK encoding {:?}", other),
    }
}

/// Reads a legacy VTK POLYDATA file, keeping track of its encoding.
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<SurfaceMesh> {
    let path_ref = path.as_ref();

    if !path_ref.exists() {
        return Err(anyhow!("File does not exist: {}", path_ref.display()));
    }

    if !path_ref.is_file() {
        return Err(anyhow!("Path is not a file: {}", path_ref.display()));
    }

    let bytes =
        fs::read(path_ref).with_context(|| format!("Failed to open file: {}", path_ref.display()))?;

    let encoding = sniff_encoding(&bytes)
        .with_context(|| format!("Failed to read header of {}", path_ref.display()))?;

    let (major, minor) = header_version(&bytes)
        .with_context(|| format!("Failed to read header of {}", path_ref.display()))?;
    if major >= FIRST_UNSUPPORTED_MAJOR {
        bail!(
            "{} is a VTK {}.{} file; cells stored as OFFSETS/CONNECTIVITY are not supported, \
             save it as legacy 4.2 or older",
            path_ref.display(),
            major,
            minor
        );
    }

    let vtk = Vtk::parse_legacy_be(bytes.as_slice())
        .map_err(|e| anyhow!("Failed to parse VTK file {}: {}", path_ref.display(), e))?;

    let mesh = SurfaceMesh::from_vtk(vtk, encoding)
        .with_context(|| format!("Unsupported dataset in {}", path_ref.display()))?;

    check_mesh_integrity(&mesh)
        .with_context(|| format!("Mesh {} failed integrity checks", path_ref.display()))?;

    debug!(
        path = %path_ref.display(),
        points = mesh.num_points(),
        polygons = mesh.num_polygons(),
        encoding = mesh.encoding().as_str(),
        "loaded mesh"
    );

    Ok(mesh)
}
