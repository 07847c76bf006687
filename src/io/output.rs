use anyhow::{anyhow, bail, Context, Result};
use csv::Writer;
use std::fs;
use std::path::Path;
use tracing::debug;

use super::{FileEncoding, SurfaceMesh};

/// Serializes the mesh as a legacy VTK file in its own encoding.
pub fn encode_mesh(mesh: &SurfaceMesh) -> Result<Vec<u8>> {
    let vtk = mesh.to_vtk();
    match mesh.encoding() {
        FileEncoding::Ascii => {
            let mut text = String::new();
            vtk.write_legacy_ascii(&mut text)
                .map_err(|e| anyhow!("Failed to encode ASCII VTK: {}", e))?;
            Ok(text.into_bytes())
        }
        FileEncoding::Binary => {
            let mut bytes = Vec::new();
            vtk.write_legacy(&mut bytes)
                .map_err(|e| anyhow!("Failed to encode binary VTK: {}", e))?;
            Ok(bytes)
        }
    }
}

/// Writes the mesh to `path`, overwriting it.
///
/// The file is only opened once the whole mesh has been encoded, so an
/// encoding failure leaves an existing file untouched.
pub fn write_mesh<P: AsRef<Path>>(mesh: &SurfaceMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_mesh(mesh)?;
    fs::write(path, bytes).with_context(|| format!("Could not write mesh: {}", path.display()))?;
    debug!(path = %path.display(), encoding = mesh.encoding().as_str(), "wrote mesh");
    Ok(())
}

/// Dumps one point attribute next to the point coordinates.
pub fn write_attribute_csv<P: AsRef<Path>>(
    mesh: &SurfaceMesh,
    attribute_name: &str,
    path: P,
) -> Result<()> {
    let array = mesh
        .point_attribute(attribute_name)
        .ok_or_else(|| anyhow!("Mesh has no point attribute '{}'", attribute_name))?;
    if array.num_comp == 0 {
        bail!("Attribute '{}' declares zero components", attribute_name);
    }
    let points = mesh.points();
    if array.len() != points.len() {
        bail!(
            "Attribute '{}' has {} tuples for {} points",
            attribute_name,
            array.len(),
            points.len()
        );
    }

    let mut wtr = Writer::from_path(path.as_ref())
        .with_context(|| format!("Could not create CSV: {}", path.as_ref().display()))?;

    // Write header
    let num_comp = array.num_comp as usize;
    let mut header = vec![
        "point_index".to_string(),
        "x".to_string(),
        "y".to_string(),
        "z".to_string(),
    ];
    if num_comp == 1 {
        header.push("value".to_string());
    } else {
        header.extend((0..num_comp).map(|k| format!("value_{}", k)));
    }
    wtr.write_record(&header)?;

    let values = array.values_f64();
    for (i, (point, tuple)) in points.iter().zip(values.chunks_exact(num_comp)).enumerate() {
        let mut record = vec![
            i.to_string(),
            point.x.to_string(),
            point.y.to_string(),
            point.z.to_string(),
        ];
        record.extend(tuple.iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes the mesh list the population viewer loads, one path per row.
pub fn write_population_csv<P: AsRef<Path>, Q: AsRef<Path>>(
    meshes: &[P],
    csv_path: Q,
) -> Result<()> {
    let csv_path = csv_path.as_ref();
    if let Some(parent) = csv_path.parent() {
        fs::create_dir_all(parent)
            .context(format!("Could not create output directory: {:?}", parent))?;
    }

    let mut wtr = Writer::from_path(csv_path)
        .with_context(|| format!("Could not create CSV: {}", csv_path.display()))?;
    wtr.write_record(["VTK Files"])?;
    for mesh in meshes {
        let row = mesh.as_ref().to_string_lossy().into_owned();
        wtr.write_record([row])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod output_tests {
    use super::*;
    use crate::io::input::read_mesh;
    use crate::io::ScalarArray;
    use crate::utils::test_utils::{random_scalars, tetrahedron, tetrahedron_triangles};
    use vtkio::model::IOBuffer;

    #[test]
    fn test_ascii_roundtrip_preserves_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.vtk");

        let mut mesh = tetrahedron();
        let values = random_scalars(4);
        mesh.set_active_scalars(ScalarArray::new("_paraPhi", 1, IOBuffer::F32(values.clone())));
        write_mesh(&mesh, &path).unwrap();

        let loaded = read_mesh(&path).unwrap();
        assert_eq!(loaded.encoding(), FileEncoding::Ascii);
        assert_eq!(loaded.num_points(), 4);
        assert_eq!(loaded.points(), mesh.points());
        let expected: Vec<Vec<u32>> = tetrahedron_triangles().iter().map(|t| t.to_vec()).collect();
        assert_eq!(loaded.polygons(), expected);

        let phi = loaded.point_attribute("_paraPhi").unwrap();
        match phi.data {
            IOBuffer::F32(got) => {
                let got_bits: Vec<u32> = got.iter().map(|v| v.to_bits()).collect();
                let want_bits: Vec<u32> = values.iter().map(|v| v.to_bits()).collect();
                assert_eq!(got_bits, want_bits);
            }
            other => panic!("expected float scalars, got {:?}", other),
        }
    }

    #[test]
    fn test_binary_roundtrip_keeps_encoding_and_doubles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.vtk");

        let mut mesh = tetrahedron();
        mesh.set_encoding(FileEncoding::Binary);
        let values = vec![0.1f64, -2.5e-7, 1.0 / 3.0, 12345.678];
        mesh.set_active_scalars(ScalarArray::new("depth", 1, IOBuffer::F64(values.clone())));
        write_mesh(&mesh, &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(
            crate::io::input::sniff_encoding(&bytes).unwrap(),
            FileEncoding::Binary
        );

        let loaded = read_mesh(&path).unwrap();
        assert_eq!(loaded.encoding(), FileEncoding::Binary);
        assert_eq!(loaded.polygons().len(), 4);
        assert_eq!(loaded.point_attribute("depth").unwrap().data, IOBuffer::F64(values));
    }

    #[test]
    fn test_write_attribute_csv() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("phi.csv");

        let mut mesh = tetrahedron();
        mesh.set_active_scalars(ScalarArray::new(
            "_paraPhi",
            1,
            IOBuffer::F32(vec![0.5, 1.5, 2.5, 3.5]),
        ));
        write_attribute_csv(&mesh, "_paraPhi", &csv_path).unwrap();

        let mut rdr = csv::Reader::from_path(&csv_path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["point_index", "x", "y", "z", "value"]);

        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(&rows[1][0], "1");
        assert_eq!(&rows[1][1], "1");
        assert_eq!(&rows[3][4], "3.5");
    }

    #[test]
    fn test_write_attribute_csv_unknown_name() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = tetrahedron();
        assert!(write_attribute_csv(&mesh, "missing", dir.path().join("x.csv")).is_err());
    }

    #[test]
    fn test_write_population_csv() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("viewer").join("population.csv");
        let meshes = vec![dir.path().join("a_aligned.vtk"), dir.path().join("b_aligned.vtk")];

        write_population_csv(&meshes, &csv_path).unwrap();

        let content = fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "VTK Files");
        assert_eq!(lines.len(), 3);
        assert!(lines[2].ends_with("b_aligned.vtk"));
    }
}
