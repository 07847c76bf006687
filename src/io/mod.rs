pub mod input;
pub mod integrity_check;
pub mod output;

use anyhow::bail;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use tracing::warn;
use vtkio::model::{
    Attribute, Attributes, ByteOrder, DataArray, DataSet, ElementType, FieldArray, IOBuffer,
    Piece, PolyDataPiece, Version, VertexNumbers, Vtk,
};

/// Legacy SCALARS sections hold 1 to 4 components.
pub const MAX_SCALAR_COMPONENTS: u32 = 4;

/// Encoding of a legacy VTK file, as declared on its third header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileEncoding {
    Ascii,
    Binary,
}

impl FileEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileEncoding::Ascii => "ASCII",
            FileEncoding::Binary => "BINARY",
        }
    }
}

/// A named point array, kept in the scalar type it was stored with on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarArray {
    pub name: String,
    pub num_comp: u32,
    pub data: IOBuffer,
}

impl ScalarArray {
    pub fn new(name: impl Into<String>, num_comp: u32, data: IOBuffer) -> Self {
        Self {
            name: name.into(),
            num_comp,
            data,
        }
    }

    /// Number of tuples (one per point for a well formed array).
    pub fn len(&self) -> usize {
        if self.num_comp == 0 {
            return 0;
        }
        self.data.len() / self.num_comp as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values widened to f64, in storage order.
    pub fn values_f64(&self) -> Vec<f64> {
        buffer_to_f64(&self.data)
    }
}

/// Polygonal surface read from (or written to) a legacy VTK POLYDATA file.
///
/// Points, cells and cell data are carried through untouched; only point
/// attributes are edited in place.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceMesh {
    version: Version,
    title: String,
    encoding: FileEncoding,
    piece: PolyDataPiece,
}

impl SurfaceMesh {
    /// Wraps a parsed VTK model; fails unless it holds exactly one inline polydata piece.
    pub fn from_vtk(vtk: Vtk, encoding: FileEncoding) -> anyhow::Result<Self> {
        let Vtk {
            version,
            title,
            data,
            ..
        } = vtk;

        let piece = match data {
            DataSet::PolyData { pieces, .. } => {
                let mut pieces = pieces.into_iter();
                match (pieces.next(), pieces.next()) {
                    (Some(Piece::Inline(piece)), None) => *piece,
                    (Some(_), None) => bail!("Polydata piece is not stored inline"),
                    (None, _) => bail!("Polydata dataset has no pieces"),
                    (Some(_), Some(_)) => bail!("Polydata dataset has more than one piece"),
                }
            }
            _ => bail!("Expected a POLYDATA dataset"),
        };

        Ok(Self {
            version,
            title,
            encoding,
            piece,
        })
    }

    /// Builds a triangle mesh with float coordinates and no attributes.
    pub fn from_triangles(title: &str, points: &[Point3<f32>], triangles: &[[u32; 3]]) -> Self {
        let coords: Vec<f32> = points.iter().flat_map(|p| [p.x, p.y, p.z]).collect();

        let mut vertices = Vec::with_capacity(triangles.len() * 4);
        for tri in triangles {
            vertices.push(3);
            vertices.extend_from_slice(tri);
        }

        Self {
            version: Version { major: 4, minor: 2 },
            title: title.to_string(),
            encoding: FileEncoding::Ascii,
            piece: PolyDataPiece {
                points: IOBuffer::F32(coords),
                verts: None,
                lines: None,
                polys: Some(VertexNumbers::Legacy {
                    num_cells: triangles.len() as u32,
                    vertices,
                }),
                strips: None,
                data: Attributes::default(),
            },
        }
    }

    /// Rebuilds a VTK model suitable for the legacy writers.
    pub fn to_vtk(&self) -> Vtk {
        Vtk {
            version: self.version.clone(),
            title: self.title.clone(),
            byte_order: ByteOrder::BigEndian,
            file_path: None,
            data: DataSet::inline(self.piece.clone()),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn encoding(&self) -> FileEncoding {
        self.encoding
    }

    pub fn set_encoding(&mut self, encoding: FileEncoding) {
        self.encoding = encoding;
    }

    pub fn num_points(&self) -> usize {
        self.piece.points.len() / 3
    }

    /// Raw coordinate buffer length, used by the integrity checks.
    pub(crate) fn coordinate_count(&self) -> usize {
        self.piece.points.len()
    }

    pub fn points(&self) -> Vec<Point3<f64>> {
        buffer_to_f64(&self.piece.points)
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect()
    }

    pub fn num_polygons(&self) -> usize {
        self.piece
            .polys
            .as_ref()
            .map_or(0, |polys| split_cells(polys).len())
    }

    /// Polygon connectivity, one index list per polygon.
    pub fn polygons(&self) -> Vec<Vec<u32>> {
        self.piece.polys.as_ref().map_or_else(Vec::new, split_cells)
    }

    /// Every cell of every kind (vertices, lines, polygons, strips).
    pub(crate) fn all_cells(&self) -> Vec<Vec<u32>> {
        [
            &self.piece.verts,
            &self.piece.lines,
            &self.piece.polys,
            &self.piece.strips,
        ]
        .into_iter()
        .flatten()
        .flat_map(split_cells)
        .collect()
    }

    /// Looks up a point array by name among SCALARS sections and FIELD arrays.
    pub fn point_attribute(&self, name: &str) -> Option<ScalarArray> {
        for attribute in &self.piece.data.point {
            match attribute {
                Attribute::DataArray(DataArray {
                    name: array_name,
                    elem: ElementType::Scalars { num_comp, .. },
                    data,
                }) if array_name == name => {
                    return Some(ScalarArray::new(array_name.clone(), *num_comp, data.clone()));
                }
                Attribute::Field { data_array, .. } => {
                    if let Some(array) = data_array.iter().find(|a| a.name == name) {
                        return Some(ScalarArray::new(
                            array.name.clone(),
                            array.elem,
                            array.data.clone(),
                        ));
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Names of all point arrays, in file order.
    pub fn point_attribute_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for attribute in &self.piece.data.point {
            match attribute {
                Attribute::DataArray(array) => names.push(array.name.clone()),
                Attribute::Field { data_array, .. } => {
                    names.extend(data_array.iter().map(|a| a.name.clone()))
                }
            }
        }
        names
    }

    /// `(name, tuple count)` for every point array that is stored per point.
    pub(crate) fn point_attribute_lengths(&self) -> Vec<(String, usize)> {
        let mut lengths = Vec::new();
        for attribute in &self.piece.data.point {
            match attribute {
                Attribute::DataArray(array) => {
                    if let Some(num_comp) = element_components(&array.elem) {
                        lengths.push((array.name.clone(), tuples(array.data.len(), num_comp)));
                    }
                }
                Attribute::Field { data_array, .. } => {
                    for array in data_array {
                        lengths.push((array.name.clone(), tuples(array.data.len(), array.elem)));
                    }
                }
            }
        }
        lengths
    }

    /// Removes every point array called `name`; FIELD blocks emptied by this are dropped.
    pub fn remove_point_attribute(&mut self, name: &str) -> bool {
        let mut removed = false;
        self.piece.data.point.retain_mut(|attribute| match attribute {
            Attribute::DataArray(array) => {
                if array.name == name {
                    removed = true;
                    false
                } else {
                    true
                }
            }
            Attribute::Field { data_array, .. } => {
                let before = data_array.len();
                data_array.retain(|a| a.name != name);
                let emptied = data_array.len() != before;
                removed |= emptied;
                !(emptied && data_array.is_empty())
            }
        });
        removed
    }

    /// Makes `array` the active point scalars, replacing any array of the same name.
    ///
    /// The active scalars of a legacy file are its first SCALARS section, so the
    /// array goes in front of the remaining point data. Arrays with more
    /// components than SCALARS allows go in front as a FIELD array instead.
    pub fn set_active_scalars(&mut self, array: ScalarArray) {
        self.remove_point_attribute(&array.name);

        let attribute = if (1..=MAX_SCALAR_COMPONENTS).contains(&array.num_comp) {
            Attribute::DataArray(DataArray {
                name: array.name,
                elem: ElementType::Scalars {
                    num_comp: array.num_comp,
                    lookup_table: None,
                },
                data: array.data,
            })
        } else {
            warn!(
                attribute = %array.name,
                components = array.num_comp,
                "too many components for SCALARS, storing as a FIELD array"
            );
            Attribute::Field {
                name: String::from("FieldData"),
                data_array: vec![FieldArray {
                    name: array.name,
                    elem: array.num_comp,
                    data: array.data,
                }],
            }
        };
        self.piece.data.point.insert(0, attribute);
    }
}

fn tuples(values: usize, num_comp: u32) -> usize {
    if num_comp == 0 {
        0
    } else {
        values / num_comp as usize
    }
}

/// Components per tuple; `None` for lookup tables, which are not sized by point.
fn element_components(elem: &ElementType) -> Option<u32> {
    match elem {
        ElementType::Scalars { num_comp, .. } => Some(*num_comp),
        ElementType::ColorScalars(n) | ElementType::TCoords(n) | ElementType::Generic(n) => {
            Some(*n)
        }
        ElementType::Vectors | ElementType::Normals => Some(3),
        ElementType::Tensors => Some(9),
        ElementType::LookupTable => None,
    }
}

fn split_cells(numbers: &VertexNumbers) -> Vec<Vec<u32>> {
    match numbers {
        VertexNumbers::Legacy { vertices, .. } => {
            let mut cells = Vec::new();
            let mut i = 0;
            while i < vertices.len() {
                let n = vertices[i] as usize;
                let end = (i + 1 + n).min(vertices.len());
                cells.push(vertices[i + 1..end].to_vec());
                i = end;
            }
            cells
        }
        VertexNumbers::XML {
            connectivity,
            offsets,
        } => {
            let mut start = 0usize;
            offsets
                .iter()
                .map(|&end| {
                    let end = end as usize;
                    let cell = connectivity
                        .get(start..end)
                        .unwrap_or(&[])
                        .iter()
                        .map(|&v| v as u32)
                        .collect();
                    start = end;
                    cell
                })
                .collect()
        }
    }
}

fn buffer_to_f64(buffer: &IOBuffer) -> Vec<f64> {
    match buffer {
        IOBuffer::F32(v) => v.iter().map(|&x| f64::from(x)).collect(),
        IOBuffer::F64(v) => v.clone(),
        IOBuffer::I8(v) => v.iter().map(|&x| f64::from(x)).collect(),
        IOBuffer::U8(v) => v.iter().map(|&x| f64::from(x)).collect(),
        IOBuffer::I16(v) => v.iter().map(|&x| f64::from(x)).collect(),
        IOBuffer::U16(v) => v.iter().map(|&x| f64::from(x)).collect(),
        IOBuffer::I32(v) => v.iter().map(|&x| f64::from(x)).collect(),
        IOBuffer::U32(v) => v.iter().map(|&x| f64::from(x)).collect(),
        IOBuffer::I64(v) => v.iter().map(|&x| x as f64).collect(),
        IOBuffer::U64(v) => v.iter().map(|&x| x as f64).collect(),
        IOBuffer::Bit(v) => v.iter().map(|&x| f64::from(x)).collect(),
    }
}
