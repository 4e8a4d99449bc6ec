//! Scene graph types: visual scenes, nodes, transformations and instances

use super::core::UniqueId;
use super::geometry::MaterialId;

/// A `<visual_scene>`
#[derive(Debug, Clone, PartialEq)]
pub struct VisualScene {
    /// Session id
    pub unique_id: UniqueId,
    /// The `id` attribute
    pub original_id: Option<String>,
    /// The `name` attribute
    pub name: Option<String>,
    /// Top-level nodes
    pub root_nodes: Vec<Node>,
}

/// Node trees from one `<library_nodes>`
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryNodes {
    /// Session id
    pub unique_id: UniqueId,
    /// Top-level nodes
    pub nodes: Vec<Node>,
}

/// The `type` attribute of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeType {
    /// Plain node
    #[default]
    Node,
    /// Skeleton joint
    Joint,
}

/// A `<node>`
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Session id
    pub unique_id: UniqueId,
    /// The `id` attribute
    pub original_id: Option<String>,
    /// The `sid` attribute
    pub sid: Option<String>,
    /// The `name` attribute
    pub name: Option<String>,
    /// The `type` attribute
    pub node_type: NodeType,
    /// Transformations in document order
    pub transformations: Vec<Transformation>,
    /// Instantiated geometries
    pub instance_geometries: Vec<InstanceGeometry>,
    /// Instantiated controllers
    pub instance_controllers: Vec<InstanceController>,
    /// Instantiated cameras
    pub instance_cameras: Vec<Instance>,
    /// Instantiated lights
    pub instance_lights: Vec<Instance>,
    /// Instantiated library nodes
    pub instance_nodes: Vec<Instance>,
    /// Child nodes
    pub children: Vec<Node>,
}

impl Node {
    /// Empty node with the given id
    pub fn new(unique_id: UniqueId) -> Self {
        Self {
            unique_id,
            original_id: None,
            sid: None,
            name: None,
            node_type: NodeType::Node,
            transformations: Vec::new(),
            instance_geometries: Vec::new(),
            instance_controllers: Vec::new(),
            instance_cameras: Vec::new(),
            instance_lights: Vec::new(),
            instance_nodes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Find a node in this subtree by id
    pub fn find_mut(&mut self, id: UniqueId) -> Option<&mut Node> {
        if self.unique_id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// Visit every node of this subtree, parents first
    pub fn walk_mut(&mut self, f: &mut dyn FnMut(&mut Node)) {
        f(self);
        for child in &mut self.children {
            child.walk_mut(f);
        }
    }
}

/// Transformation operation with its values
#[derive(Debug, Clone, PartialEq)]
pub enum TransformKind {
    /// 4x4 row-major matrix
    Matrix([f64; 16]),
    /// Translation vector
    Translate([f64; 3]),
    /// Rotation around an axis, angle in degrees
    Rotate {
        /// Rotation axis
        axis: [f64; 3],
        /// Angle in degrees
        angle: f64,
    },
    /// Non-uniform scale
    Scale([f64; 3]),
    /// Eye position, interest point and up vector
    Lookat([f64; 9]),
    /// Skew angle, rotation axis and translation axis
    Skew([f64; 7]),
}

impl TransformKind {
    /// Element name of the operation
    pub fn element_name(&self) -> &'static str {
        match self {
            TransformKind::Matrix(_) => "matrix",
            TransformKind::Translate(_) => "translate",
            TransformKind::Rotate { .. } => "rotate",
            TransformKind::Scale(_) => "scale",
            TransformKind::Lookat(_) => "lookat",
            TransformKind::Skew(_) => "skew",
        }
    }
}

/// One transformation of a node
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    /// Operation and values
    pub kind: TransformKind,
    /// The `sid` attribute, used as animation target
    pub sid: Option<String>,
    /// Animations driving this transformation
    pub animation_list: Option<UniqueId>,
}

/// Binding of a primitive material symbol to a material
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialBinding {
    /// The `symbol` attribute of `<instance_material>`
    pub symbol: String,
    /// The material named by `target`
    pub material: UniqueId,
    /// Per-geometry id of the symbol, once the geometry is known
    pub material_id: Option<MaterialId>,
}

/// `<instance_geometry>`
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceGeometry {
    /// Instantiated geometry
    pub geometry: UniqueId,
    /// The `name` attribute
    pub name: Option<String>,
    /// Material bindings from `<bind_material>`
    pub material_bindings: Vec<MaterialBinding>,
}

/// `<instance_controller>`
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceController {
    /// Instantiated controller; a skin controller once joints are bound
    pub controller: UniqueId,
    /// The `name` attribute
    pub name: Option<String>,
    /// `<skeleton>` root URIs in document order
    pub skeleton_roots: Vec<String>,
    /// Material bindings from `<bind_material>`
    pub material_bindings: Vec<MaterialBinding>,
}

/// Instance of a camera, light or library node
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Instantiated object
    pub target: UniqueId,
    /// The `name` attribute
    pub name: Option<String>,
}
