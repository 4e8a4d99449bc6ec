//! Intermediate resolution store
//!
//! Holds whatever cannot be finished during the forward pass: references
//! whose targets may appear later (or in other documents), instance
//! controllers waiting for their joints, animation channels waiting for
//! their target nodes, and the objects those resolutions still have to
//! modify. The post-pass drains all of it.

use crate::error::ErrorContext;
use crate::model::{
    FileId, Formula, KinematicsScene, LibraryNodes, MaterialId, Node, SkinControllerData,
    UniqueId, VisualScene,
};
use std::collections::HashMap;
use url::Url;

/// A reference that must name a defined element once loading is done
#[derive(Debug, Clone)]
pub struct PendingReference {
    /// Element holding the reference
    pub element: &'static str,
    /// Absolute target URI
    pub uri: Url,
    /// Where the reference was found
    pub context: ErrorContext,
}

/// Material symbol ids of one geometry
#[derive(Debug, Default, Clone)]
pub struct GeometryMaterialIdInfo {
    ids: HashMap<String, MaterialId>,
    next: u32,
}

impl GeometryMaterialIdInfo {
    /// Id of `symbol`, allocated on first use
    pub fn get_or_create(&mut self, symbol: &str) -> MaterialId {
        if let Some(&id) = self.ids.get(symbol) {
            return id;
        }
        self.next += 1;
        let id = MaterialId(self.next);
        self.ids.insert(symbol.to_string(), id);
        id
    }

    /// Id of a symbol used by some primitive
    pub fn get(&self, symbol: &str) -> Option<MaterialId> {
        self.ids.get(symbol).copied()
    }

    /// Number of known symbols
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no symbol is known
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Position of an instance inside a held node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceRef {
    /// Node owning the instance
    pub node: UniqueId,
    /// Index in the node's instance list
    pub index: usize,
}

/// An `<instance_controller>` waiting for its controller to be bound
#[derive(Debug, Clone)]
pub struct InstanceControllerData {
    /// `<skeleton>` roots, in document order
    pub skeleton_roots: Vec<Url>,
    /// Where the instance lives
    pub instance: InstanceRef,
    /// Where the instance was found
    pub context: ErrorContext,
}

/// Skin data of a `<controller>` as needed for binding
#[derive(Debug, Clone)]
pub struct SkinInfo {
    /// Written skin controller data
    pub data: UniqueId,
    /// Skinned geometry or morph controller
    pub source: Url,
    /// Joint names from the `JOINT` source
    pub joint_names: Vec<String>,
    /// Whether joint names are element ids rather than sids
    pub joints_are_ids: bool,
    /// Skin data content, independent of how joints were named
    pub content: SkinContent,
}

/// Vertex influences and matrices of a skin
///
/// Floats are compared by bit pattern. Joint names are left out: two skins
/// naming the same nodes by sid and by id are the same skin once bound.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SkinContent {
    joints_per_vertex: Vec<u32>,
    joint_indices: Vec<i64>,
    weight_indices: Vec<u32>,
    floats: Vec<u64>,
}

impl SkinContent {
    /// Content of `data`
    pub fn of(data: &SkinControllerData) -> Self {
        let floats = data
            .bind_shape_matrix
            .iter()
            .chain(data.inverse_bind_matrices.iter().flatten())
            .chain(&data.weights)
            .map(|value| value.to_bits())
            .collect();
        Self {
            joints_per_vertex: data.joints_per_vertex.clone(),
            joint_indices: data.joint_indices.clone(),
            weight_indices: data.weight_indices.clone(),
            floats,
        }
    }
}

/// What a `<controller>` turned out to be
#[derive(Debug, Clone)]
pub enum ControllerInfo {
    /// `<skin>`
    Skin(SkinInfo),
    /// `<morph>`
    Morph {
        /// Written morph controller
        morph: UniqueId,
        /// Base geometry
        source: Url,
    },
}

/// Structural identity of a bound skin
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SkinControllerKey {
    /// Skinned geometry or morph controller
    pub source: UniqueId,
    /// Joint nodes in joint order
    pub joints: Vec<UniqueId>,
    /// Skin data content
    pub content: SkinContent,
}

/// Bound skins, deduplicated by structure
#[derive(Debug, Default)]
pub struct SkinControllerSet {
    entries: HashMap<SkinControllerKey, UniqueId>,
}

impl SkinControllerSet {
    /// Existing id for `key`
    pub fn get(&self, key: &SkinControllerKey) -> Option<UniqueId> {
        self.entries.get(key).copied()
    }

    /// Record a new skin controller
    pub fn insert(&mut self, key: SkinControllerKey, id: UniqueId) {
        self.entries.insert(key, id);
    }

    /// Number of distinct skin controllers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether none was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An animation `<channel>` waiting for its target
#[derive(Debug, Clone)]
pub struct PendingChannel {
    /// Curve built from the channel's sampler
    pub animation: UniqueId,
    /// Target address
    pub target: String,
    /// Document the channel is in
    pub file_id: FileId,
    /// Where the channel was found
    pub context: ErrorContext,
}

/// A formula whose references are resolved after loading
#[derive(Debug, Clone)]
pub struct PendingFormula {
    /// The formula, without referenced formulas
    pub formula: Formula,
    /// `csymbol` targets
    pub references: Vec<Url>,
    /// Where the formula was found
    pub context: ErrorContext,
}

/// A `<bind_joint_axis>` waiting for its node and joint
#[derive(Debug, Clone)]
pub struct PendingJointAxis {
    /// Instantiated kinematics scene
    pub scene: UniqueId,
    /// Node transformation address
    pub target: String,
    /// Joint axis address
    pub axis: String,
    /// Initial value
    pub value: Option<f64>,
    /// Document the binding is in
    pub file_id: FileId,
    /// Where the binding was found
    pub context: ErrorContext,
}

/// Everything held for the post-pass of one session
#[derive(Debug, Default)]
pub struct IntermediateStore {
    /// Material symbol ids per geometry
    pub geometry_materials: HashMap<UniqueId, GeometryMaterialIdInfo>,
    /// Parsed controllers by their `<controller>` id
    pub controllers: HashMap<UniqueId, ControllerInfo>,
    /// Instances per referenced controller, in document order
    pub instance_controllers: Vec<(UniqueId, Vec<InstanceControllerData>)>,
    /// Bound skin controllers
    pub skin_controllers: SkinControllerSet,
    /// References checked for existence after loading
    pub pending_references: Vec<PendingReference>,
    /// Animation channels
    pub channels: Vec<PendingChannel>,
    /// Visual scenes, written after binding
    pub visual_scenes: Vec<VisualScene>,
    /// Library nodes, written after binding
    pub library_nodes: Vec<LibraryNodes>,
    /// Formulas, written after reference checks
    pub formulas: Vec<PendingFormula>,
    /// Kinematics scenes, written after axis binding
    pub kinematics_scenes: Vec<KinematicsScene>,
    /// Joint axis bindings
    pub joint_axis_bindings: Vec<PendingJointAxis>,
}

impl IntermediateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-geometry id of a primitive's material symbol
    pub fn material_id(&mut self, geometry: UniqueId, symbol: &str) -> MaterialId {
        self.geometry_materials
            .entry(geometry)
            .or_default()
            .get_or_create(symbol)
    }

    /// Queue an instance controller under its controller
    pub fn add_instance_controller(&mut self, controller: UniqueId, data: InstanceControllerData) {
        match self
            .instance_controllers
            .iter_mut()
            .find(|(id, _)| *id == controller)
        {
            Some((_, list)) => list.push(data),
            None => self.instance_controllers.push((controller, vec![data])),
        }
    }

    /// Held node with the given id
    pub fn find_node_mut(&mut self, id: UniqueId) -> Option<&mut Node> {
        self.visual_scenes
            .iter_mut()
            .flat_map(|scene| scene.root_nodes.iter_mut())
            .chain(
                self.library_nodes
                    .iter_mut()
                    .flat_map(|lib| lib.nodes.iter_mut()),
            )
            .find_map(|node| node.find_mut(id))
    }

    /// Visit every held node
    pub fn for_each_node_mut(&mut self, f: &mut dyn FnMut(&mut Node)) {
        for scene in &mut self.visual_scenes {
            for node in &mut scene.root_nodes {
                node.walk_mut(f);
            }
        }
        for lib in &mut self.library_nodes {
            for node in &mut lib.nodes {
                node.walk_mut(f);
            }
        }
    }

    /// Drop everything
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
