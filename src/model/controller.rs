//! Skin and morph controllers

use super::core::UniqueId;

/// 4x4 identity, row-major
pub const IDENTITY_MATRIX: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Skin data of a `<skin>`, independent of concrete joint nodes
#[derive(Debug, Clone, PartialEq)]
pub struct SkinControllerData {
    /// Session id
    pub unique_id: UniqueId,
    /// The controller's `id` attribute
    pub original_id: Option<String>,
    /// The controller's `name` attribute
    pub name: Option<String>,
    /// Bind shape matrix, row-major
    pub bind_shape_matrix: [f64; 16],
    /// Joint names or ids from the `JOINT` source
    pub joint_names: Vec<String>,
    /// One inverse bind matrix per joint, row-major
    pub inverse_bind_matrices: Vec<[f64; 16]>,
    /// Weight values from the `WEIGHT` source
    pub weights: Vec<f64>,
    /// Influence count per vertex
    pub joints_per_vertex: Vec<u32>,
    /// Joint index per influence; -1 binds to the bind shape
    pub joint_indices: Vec<i64>,
    /// Weight index per influence
    pub weight_indices: Vec<u32>,
}

impl SkinControllerData {
    /// Number of skinned vertices
    pub fn vertex_count(&self) -> usize {
        self.joints_per_vertex.len()
    }
}

/// Skin data bound to a source mesh and concrete joint nodes
#[derive(Debug, Clone, PartialEq)]
pub struct SkinController {
    /// Session id
    pub unique_id: UniqueId,
    /// The skin data
    pub skin_controller_data: UniqueId,
    /// Skinned geometry or morph controller
    pub source: UniqueId,
    /// Joint nodes in joint order
    pub joints: Vec<UniqueId>,
}

/// `method` attribute of `<morph>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MorphMethod {
    /// `NORMALIZED`
    #[default]
    Normalized,
    /// `RELATIVE`
    Relative,
}

/// A `<morph>` controller
#[derive(Debug, Clone, PartialEq)]
pub struct MorphController {
    /// Session id
    pub unique_id: UniqueId,
    /// The controller's `id` attribute
    pub original_id: Option<String>,
    /// The controller's `name` attribute
    pub name: Option<String>,
    /// Base geometry
    pub source: UniqueId,
    /// Blend method
    pub method: MorphMethod,
    /// Target geometries
    pub morph_targets: Vec<UniqueId>,
    /// One weight per target
    pub morph_weights: Vec<f64>,
}

/// A controller handed to the writer
#[derive(Debug, Clone, PartialEq)]
pub enum Controller {
    /// Bound skin
    Skin(SkinController),
    /// Morph
    Morph(MorphController),
}

impl Controller {
    /// Session id of the controller
    pub fn unique_id(&self) -> UniqueId {
        match self {
            Controller::Skin(skin) => skin.unique_id,
            Controller::Morph(morph) => morph.unique_id,
        }
    }
}
