use crate::io::SurfaceMesh;
use nalgebra::Point3;
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

pub fn tetrahedron_points() -> Vec<Point3<f32>> {
    vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
    ]
}

pub fn tetrahedron_triangles() -> Vec<[u32; 3]> {
    vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]]
}

/// Closed four point surface without attributes
pub fn tetrahedron() -> SurfaceMesh {
    SurfaceMesh::from_triangles("tetrahedron", &tetrahedron_points(), &tetrahedron_triangles())
}

/// ASCII legacy file of the tetrahedron, optionally with one float SCALARS section
pub fn tetrahedron_vtk(scalars: Option<(&str, &[f32])>) -> String {
    let mut text = String::from(
        "# vtk DataFile Version 4.2\n\
         tetrahedron\n\
         ASCII\n\
         DATASET POLYDATA\n\
         POINTS 4 float\n\
         0 0 0 1 0 0 0 1 0\n\
         0 0 1\n\
         POLYGONS 4 16\n\
         3 0 2 1\n\
         3 0 1 3\n\
         3 0 3 2\n\
         3 1 2 3\n",
    );
    if let Some((name, values)) = scalars {
        text.push_str(&format!("POINT_DATA {}\n", values.len()));
        text.push_str(&format!("SCALARS {} float 1\n", name));
        text.push_str("LOOKUP_TABLE default\n");
        for v in values {
            text.push_str(&format!("{}\n", v));
        }
    }
    text
}

/// Same surface with a FIELD block holding `_paraPhi` and an int `label` array
pub fn tetrahedron_vtk_with_field(phi: &[f32]) -> String {
    let mut text = tetrahedron_vtk(None);
    text.push_str("POINT_DATA 4\n");
    text.push_str("FIELD FieldData 2\n");
    text.push_str(&format!("_paraPhi 1 {} float\n", phi.len()));
    let values: Vec<String> = phi.iter().map(|v| v.to_string()).collect();
    text.push_str(&values.join(" "));
    text.push('\n');
    text.push_str("label 1 4 int\n");
    text.push_str("7 8 9 10\n");
    text
}

/// The tetrahedron in the 5.1 legacy layout, as current VTK writes it
pub fn tetrahedron_vtk_v5() -> String {
    String::from(
        "# vtk DataFile Version 5.1\n\
         tetrahedron\n\
         ASCII\n\
         DATASET POLYDATA\n\
         POINTS 4 float\n\
         0 0 0 1 0 0 0 1 0\n\
         0 0 1\n\
         POLYGONS 5 12\n\
         OFFSETS vtktypeint64\n\
         0 3 6 9 12\n\
         CONNECTIVITY vtktypeint64\n\
         0 2 1 0 1 3 0 3 2 1 2 3\n",
    )
}

/// ASCII legacy file of a single triangle (three points)
pub fn triangle_vtk() -> String {
    String::from(
        "# vtk DataFile Version 4.2\n\
         triangle\n\
         ASCII\n\
         DATASET POLYDATA\n\
         POINTS 3 float\n\
         0 0 0 1 0 0 0 1 0\n\
         POLYGONS 1 4\n\
         3 0 1 2\n",
    )
}

pub fn write_fixture(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("failed to write fixture");
    path
}

/// Random scalars in [-1000, 1000), with plenty of mantissa bits set
pub fn random_scalars(n: usize) -> Vec<f32> {
    let mut rng = rand::rng();
    (0..n)
        .map(|_| rng.random_range(-1000.0f32..1000.0f32))
        .collect()
}
