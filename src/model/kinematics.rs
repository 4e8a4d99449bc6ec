//! Formulas and kinematics

use super::core::UniqueId;

/// A `<newparam>` of a formula
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaParameter {
    /// The `sid` attribute
    pub sid: String,
    /// Constant value, if the parameter holds a float
    pub value: Option<f64>,
}

/// A `<formula>`
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    /// Session id
    pub unique_id: UniqueId,
    /// The `id` attribute
    pub original_id: Option<String>,
    /// The `name` attribute
    pub name: Option<String>,
    /// Parameters in document order
    pub parameters: Vec<FormulaParameter>,
    /// Parameter reference or value from `<target>`
    pub target: Option<String>,
    /// Other formulas used by the math (`csymbol` references)
    pub referenced_formulas: Vec<UniqueId>,
}

/// Motion type of a joint axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointPrimitiveKind {
    /// Translation along the axis
    Prismatic,
    /// Rotation around the axis
    Revolute,
}

/// One degree of freedom of a joint
#[derive(Debug, Clone, PartialEq)]
pub struct JointPrimitive {
    /// Motion type
    pub kind: JointPrimitiveKind,
    /// The `sid` attribute
    pub sid: Option<String>,
    /// Axis direction
    pub axis: [f64; 3],
    /// `(min, max)` limits
    pub limits: Option<(f64, f64)>,
}

/// A kinematics `<joint>`
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    /// Session id
    pub unique_id: UniqueId,
    /// The `sid` attribute
    pub sid: Option<String>,
    /// The `name` attribute
    pub name: Option<String>,
    /// Degrees of freedom
    pub primitives: Vec<JointPrimitive>,
}

/// A `<kinematics_model>`
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicsModel {
    /// Session id
    pub unique_id: UniqueId,
    /// The `id` attribute
    pub original_id: Option<String>,
    /// The `name` attribute
    pub name: Option<String>,
    /// Joints of the model
    pub joints: Vec<Joint>,
}

/// Binding of one joint axis to a node transformation
#[derive(Debug, Clone, PartialEq)]
pub struct JointAxisBinding {
    /// Node owning the driven transformation
    pub node: UniqueId,
    /// Index of the transformation within the node
    pub transformation_index: usize,
    /// Joint owning the axis
    pub joint: UniqueId,
    /// Index of the axis within the joint
    pub axis_index: usize,
    /// Initial value
    pub value: Option<f64>,
}

/// A `<kinematics_scene>`
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicsScene {
    /// Session id
    pub unique_id: UniqueId,
    /// The `id` attribute
    pub original_id: Option<String>,
    /// The `name` attribute
    pub name: Option<String>,
    /// Models from `<instance_kinematics_model>`
    pub kinematics_models: Vec<UniqueId>,
    /// Axis bindings from the instantiating `<instance_kinematics_scene>`
    pub bindings: Vec<JointAxisBinding>,
}
