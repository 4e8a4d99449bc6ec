//! Object model handed to a [`crate::Writer`]

mod animation;
mod controller;
mod core;
mod geometry;
mod kinematics;
mod material;
mod optics;
mod scene;

pub use animation::{
    AnimationBinding, AnimationClass, AnimationCurve, AnimationList, Interpolation,
};
pub use controller::{
    Controller, IDENTITY_MATRIX, MorphController, MorphMethod, SkinController,
    SkinControllerData,
};
pub use core::{
    Asset, ClassId, ColladaVersion, Contributor, FileId, Scene, UniqueId, Unit, UpAxis,
};
pub use geometry::{
    Geometry, IndexList, MaterialId, Mesh, MeshPrimitive, PrimitiveKind, VertexSet,
};
pub use kinematics::{
    Formula, FormulaParameter, Joint, JointAxisBinding, JointPrimitive, JointPrimitiveKind,
    KinematicsModel, KinematicsScene,
};
pub use material::{
    Color, ColorOrTexture, Effect, EffectCommon, Image, Material, ShaderType, Texture,
};
pub use optics::{Camera, Light, LightType, Projection};
pub use scene::{
    Instance, InstanceController, InstanceGeometry, LibraryNodes, MaterialBinding, Node,
    NodeType, TransformKind, Transformation, VisualScene,
};
