//! Geometry types: meshes, vertex data and primitives

use super::core::UniqueId;

/// Per-geometry id of a material symbol used by primitives
///
/// Instances map the same ids to concrete materials through their
/// material bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

/// A `<geometry>` element
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Session id
    pub unique_id: UniqueId,
    /// The `id` attribute
    pub original_id: Option<String>,
    /// The `name` attribute
    pub name: Option<String>,
    /// Mesh data; `None` for geometry types that are not meshes
    pub mesh: Option<Mesh>,
}

/// Flat array of vertex attribute values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VertexSet {
    /// Id of the `<source>` the values came from; the first one for
    /// concatenated sets
    pub source: Option<String>,
    /// Values per element (3 for positions, 2 for most texture coordinates)
    pub stride: usize,
    /// The values, `stride` per element
    pub values: Vec<f64>,
}

impl VertexSet {
    /// Number of elements
    pub fn len(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.values.len() / self.stride
        }
    }

    /// Whether there are no elements
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A polygon mesh
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    /// Vertex positions
    pub positions: VertexSet,
    /// Normals
    pub normals: VertexSet,
    /// Tangents
    pub tangents: VertexSet,
    /// Binormals
    pub binormals: VertexSet,
    /// Vertex colors, one entry per distinct source
    pub colors: Vec<VertexSet>,
    /// Texture coordinates, one entry per distinct source
    pub uv_coords: Vec<VertexSet>,
    /// Primitive groups in document order
    pub primitives: Vec<MeshPrimitive>,
}

impl Mesh {
    /// Total face count over all primitives
    pub fn face_count(&self) -> usize {
        self.primitives.iter().map(|p| p.face_count).sum()
    }
}

/// Primitive element the indices came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    /// `<lines>`
    Lines,
    /// `<linestrips>`
    LineStrips,
    /// `<polygons>`
    Polygons,
    /// `<polylist>`
    Polylist,
    /// `<triangles>`
    Triangles,
    /// `<trifans>`
    TriFans,
    /// `<tristrips>`
    TriStrips,
}

impl PrimitiveKind {
    /// Map an element name
    pub fn from_element(name: &str) -> Option<Self> {
        match name {
            "lines" => Some(PrimitiveKind::Lines),
            "linestrips" => Some(PrimitiveKind::LineStrips),
            "polygons" => Some(PrimitiveKind::Polygons),
            "polylist" => Some(PrimitiveKind::Polylist),
            "triangles" => Some(PrimitiveKind::Triangles),
            "trifans" => Some(PrimitiveKind::TriFans),
            "tristrips" => Some(PrimitiveKind::TriStrips),
            _ => None,
        }
    }

    /// Vertices per face for fixed-size primitives
    pub fn fixed_face_size(&self) -> Option<usize> {
        match self {
            PrimitiveKind::Lines => Some(2),
            PrimitiveKind::Triangles => Some(3),
            _ => None,
        }
    }
}

/// Indices into one vertex set
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexList {
    /// Position of the referenced set in [`Mesh::colors`] or [`Mesh::uv_coords`]
    pub set_index: usize,
    /// The input's `set` attribute
    pub set: Option<u32>,
    /// Indices, one per face vertex
    pub indices: Vec<u32>,
}

/// One primitive group with its per-semantic index lists
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPrimitive {
    /// Element kind
    pub kind: PrimitiveKind,
    /// The `material` symbol
    pub material_symbol: Option<String>,
    /// Per-geometry id of the material symbol
    pub material_id: MaterialId,
    /// Number of faces (lines, polygons, strips or fans)
    pub face_count: usize,
    /// Vertex count per face for variable-size primitives, empty otherwise
    pub face_vertex_counts: Vec<u32>,
    /// Indices into [`Mesh::positions`]
    pub position_indices: Vec<u32>,
    /// Indices into [`Mesh::normals`]
    pub normal_indices: Vec<u32>,
    /// Indices into [`Mesh::tangents`]
    pub tangent_indices: Vec<u32>,
    /// Indices into [`Mesh::binormals`]
    pub binormal_indices: Vec<u32>,
    /// Color index lists
    pub color_indices: Vec<IndexList>,
    /// Texture coordinate index lists
    pub uv_indices: Vec<IndexList>,
}

impl MeshPrimitive {
    /// Empty primitive of the given kind
    pub fn new(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            material_symbol: None,
            material_id: MaterialId(0),
            face_count: 0,
            face_vertex_counts: Vec::new(),
            position_indices: Vec::new(),
            normal_indices: Vec::new(),
            tangent_indices: Vec::new(),
            binormal_indices: Vec::new(),
            color_indices: Vec::new(),
            uv_indices: Vec::new(),
        }
    }

    /// Number of face vertices
    pub fn vertex_count(&self) -> usize {
        self.position_indices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_set_len() {
        let set = VertexSet {
            source: None,
            stride: 3,
            values: vec![0.0; 9],
        };
        assert_eq!(set.len(), 3);
        assert!(VertexSet::default().is_empty());
        assert_eq!(VertexSet::default().len(), 0);
    }

    #[test]
    fn test_primitive_kind_from_element() {
        assert_eq!(
            PrimitiveKind::from_element("polylist"),
            Some(PrimitiveKind::Polylist)
        );
        assert_eq!(PrimitiveKind::from_element("mesh"), None);
        assert_eq!(PrimitiveKind::Triangles.fixed_face_size(), Some(3));
        assert_eq!(PrimitiveKind::TriFans.fixed_face_size(), None);
    }
}
