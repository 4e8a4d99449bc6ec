//! COLLADA grammar tables
//!
//! A static table keyed by (parent [`ElementKind`], child element name)
//! gives each child's kind, how often it may occur and which attributes it
//! takes. Element kinds belong to a [`Family`]; how strictly a family's
//! grammar is enforced is a per-family [`ValidationPolicy`].
//!
//! Known COLLADA elements the loader does not model map to
//! [`ElementKind::Skip`] and are passed over silently.

use crate::sax::Attribute;

/// Group of related COLLADA elements sharing one validation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// `<COLLADA>`, libraries, `<scene>`
    Document,
    /// `<asset>` and its children
    Asset,
    /// Geometries, meshes and their data sources
    Geometry,
    /// Skin and morph controllers
    Controller,
    /// Animations
    Animation,
    /// Materials
    Material,
    /// Effects and shading profiles
    Effect,
    /// Images
    Image,
    /// Cameras
    Camera,
    /// Lights
    Light,
    /// Visual scenes, nodes and instances
    Scene,
    /// Formulas
    Formula,
    /// Kinematics models and scenes
    Kinematics,
    /// `<extra>`, `<technique>` and MathML content
    Extra,
}

impl Family {
    /// Built-in strictness of the family
    pub fn default_policy(self) -> ValidationPolicy {
        match self {
            Family::Geometry | Family::Controller | Family::Animation => ValidationPolicy::Strict,
            Family::Extra => ValidationPolicy::Open,
            _ => ValidationPolicy::Lenient,
        }
    }
}

/// How grammar violations inside a family are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// Report as error and discard the enclosing top-level object
    Strict,
    /// Report as warning and skip the offending element
    Lenient,
    /// Accept any content without reporting
    Open,
}

/// Kind of an element, selecting its parser and its child table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ElementKind {
    Collada,
    LibraryGeometries,
    LibraryControllers,
    LibraryAnimations,
    LibraryMaterials,
    LibraryEffects,
    LibraryImages,
    LibraryCameras,
    LibraryLights,
    LibraryVisualScenes,
    LibraryNodes,
    LibraryFormulas,
    LibraryKinematicsModels,
    LibraryKinematicsScenes,
    SceneRoot,
    InstanceVisualScene,
    Asset,
    Contributor,
    Unit,
    /// Leaf element whose text content is handed to the parent
    TextField,
    Geometry,
    Mesh,
    Source,
    FloatArray,
    NameArray,
    IntArray,
    BoolArray,
    SourceTechniqueCommon,
    Accessor,
    Param,
    Vertices,
    Input,
    Primitive,
    /// `<p>`, `<vcount>`, `<v>`
    IndexArray,
    Controller,
    Skin,
    Joints,
    VertexWeights,
    Morph,
    Targets,
    Animation,
    Sampler,
    Channel,
    Material,
    InstanceEffect,
    Effect,
    ProfileCommon,
    EffectTechnique,
    Shader,
    ShaderParam,
    Color,
    FloatValue,
    Texture,
    Image,
    InitFrom,
    Camera,
    Optics,
    OpticsTechniqueCommon,
    Projection,
    Light,
    LightTechniqueCommon,
    LightType,
    VisualScene,
    Node,
    Transform,
    InstanceGeometry,
    InstanceController,
    /// `<instance_camera>`, `<instance_light>`, `<instance_node>`
    InstanceSimple,
    BindMaterial,
    BindMaterialTechniqueCommon,
    InstanceMaterial,
    Formula,
    FormulaNewparam,
    FormulaTarget,
    FormulaTechnique,
    Math,
    KinematicsModel,
    KinematicsModelTechniqueCommon,
    Joint,
    JointPrimitive,
    Limits,
    KinematicsScene,
    InstanceKinematicsModel,
    InstanceKinematicsScene,
    BindJointAxis,
    BindAxis,
    BindValue,
    Extra,
    /// Known but not modelled; the subtree is passed over
    Skip,
}

impl ElementKind {
    /// Family of the kind; `None` for data kinds shared between families,
    /// which take the family of their parent
    pub fn family(self) -> Option<Family> {
        use ElementKind::*;
        match self {
            Collada | LibraryGeometries | LibraryControllers | LibraryAnimations
            | LibraryMaterials | LibraryEffects | LibraryImages | LibraryCameras
            | LibraryLights | LibraryVisualScenes | LibraryNodes | LibraryFormulas
            | LibraryKinematicsModels | LibraryKinematicsScenes | SceneRoot
            | InstanceVisualScene => Some(Family::Document),
            Asset | Contributor | Unit => Some(Family::Asset),
            Geometry | Mesh | Vertices | Primitive => Some(Family::Geometry),
            Controller | Skin | Joints | VertexWeights | Morph | Targets => {
                Some(Family::Controller)
            }
            Animation | Sampler | Channel => Some(Family::Animation),
            Material | InstanceEffect => Some(Family::Material),
            Effect | ProfileCommon | EffectTechnique | Shader | ShaderParam | Texture => {
                Some(Family::Effect)
            }
            Image | InitFrom => Some(Family::Image),
            Camera | Optics | OpticsTechniqueCommon | Projection => Some(Family::Camera),
            Light | LightTechniqueCommon | LightType => Some(Family::Light),
            VisualScene | Node | Transform | InstanceGeometry | InstanceController
            | InstanceSimple | BindMaterial | BindMaterialTechniqueCommon | InstanceMaterial => {
                Some(Family::Scene)
            }
            Formula | FormulaNewparam | FormulaTarget | FormulaTechnique => Some(Family::Formula),
            KinematicsModel | KinematicsModelTechniqueCommon | Joint | JointPrimitive | Limits
            | KinematicsScene | InstanceKinematicsModel | InstanceKinematicsScene
            | BindJointAxis | BindAxis | BindValue => Some(Family::Kinematics),
            Math | Extra | Skip => Some(Family::Extra),
            TextField | Source | FloatArray | NameArray | IntArray | BoolArray
            | SourceTechniqueCommon | Accessor | Param | Input | IndexArray | Color
            | FloatValue => None,
        }
    }

    /// Whether the kind produces a complete object that is written or held
    ///
    /// Strict violations anywhere below such an element discard it.
    pub fn is_top_level(self) -> bool {
        use ElementKind::*;
        matches!(
            self,
            Geometry
                | Controller
                | Animation
                | Material
                | Effect
                | Image
                | Camera
                | Light
                | VisualScene
                | LibraryNodes
                | Formula
                | KinematicsModel
                | KinematicsScene
        )
    }

    /// Child table of the kind
    pub fn children(self) -> &'static [ChildRule] {
        children_of(self)
    }
}

/// Value type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    /// Any string
    Text,
    /// URI reference
    Uri,
    /// Non-negative integer
    UInt,
    /// Floating point number
    Float,
}

/// One declared attribute of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeRule {
    /// Attribute name
    pub name: &'static str,
    /// Value type
    pub ty: AttributeType,
    /// Whether the attribute must be present
    pub required: bool,
}

/// Unbounded occurrence count
pub const UNBOUNDED: u32 = u32::MAX;

/// One allowed child of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildRule {
    /// Element name; `*` matches any name
    pub name: &'static str,
    /// Kind of the child
    pub kind: ElementKind,
    /// Minimum occurrences
    pub min: u32,
    /// Maximum occurrences, [`UNBOUNDED`] for no limit
    pub max: u32,
    /// Declared attributes
    pub attributes: &'static [AttributeRule],
}

const fn opt_attr(name: &'static str, ty: AttributeType) -> AttributeRule {
    AttributeRule {
        name,
        ty,
        required: false,
    }
}

const fn req_attr(name: &'static str, ty: AttributeType) -> AttributeRule {
    AttributeRule {
        name,
        ty,
        required: true,
    }
}

const fn rule(
    name: &'static str,
    kind: ElementKind,
    min: u32,
    max: u32,
    attributes: &'static [AttributeRule],
) -> ChildRule {
    ChildRule {
        name,
        kind,
        min,
        max,
        attributes,
    }
}

const fn opt(name: &'static str, kind: ElementKind, attributes: &'static [AttributeRule]) -> ChildRule {
    rule(name, kind, 0, 1, attributes)
}

const fn one(name: &'static str, kind: ElementKind, attributes: &'static [AttributeRule]) -> ChildRule {
    rule(name, kind, 1, 1, attributes)
}

const fn many(name: &'static str, kind: ElementKind, attributes: &'static [AttributeRule]) -> ChildRule {
    rule(name, kind, 0, UNBOUNDED, attributes)
}

const fn some(name: &'static str, kind: ElementKind, attributes: &'static [AttributeRule]) -> ChildRule {
    rule(name, kind, 1, UNBOUNDED, attributes)
}

const fn skip(name: &'static str) -> ChildRule {
    rule(name, ElementKind::Skip, 0, UNBOUNDED, &[])
}

const fn text(name: &'static str) -> ChildRule {
    rule(name, ElementKind::TextField, 0, 1, SID)
}

use AttributeType::{Float, Text, UInt, Uri};
use ElementKind as K;

const NONE: &[AttributeRule] = &[];
const SID: &[AttributeRule] = &[opt_attr("sid", Text)];
const ID_NAME: &[AttributeRule] = &[opt_attr("id", Text), opt_attr("name", Text)];
const ID_NAME_SID: &[AttributeRule] = &[
    opt_attr("id", Text),
    opt_attr("name", Text),
    opt_attr("sid", Text),
];
const URL_INSTANCE: &[AttributeRule] = &[
    req_attr("url", Uri),
    opt_attr("sid", Text),
    opt_attr("name", Text),
];
const ARRAY: &[AttributeRule] = &[
    opt_attr("id", Text),
    opt_attr("name", Text),
    req_attr("count", UInt),
    opt_attr("digits", UInt),
    opt_attr("magnitude", UInt),
    opt_attr("minInclusive", Text),
    opt_attr("maxInclusive", Text),
];
const SOURCE: &[AttributeRule] = &[req_attr("id", Text), opt_attr("name", Text)];
const ACCESSOR: &[AttributeRule] = &[
    req_attr("count", UInt),
    opt_attr("offset", UInt),
    req_attr("source", Uri),
    opt_attr("stride", UInt),
];
const ACCESSOR_PARAM: &[AttributeRule] = &[
    opt_attr("name", Text),
    opt_attr("sid", Text),
    req_attr("type", Text),
    opt_attr("semantic", Text),
];
const REF_PARAM: &[AttributeRule] = &[req_attr("ref", Text)];
const UNSHARED_INPUT: &[AttributeRule] = &[req_attr("semantic", Text), req_attr("source", Uri)];
const SHARED_INPUT: &[AttributeRule] = &[
    req_attr("offset", UInt),
    req_attr("semantic", Text),
    req_attr("source", Uri),
    opt_attr("set", UInt),
];
const PRIMITIVE: &[AttributeRule] = &[
    opt_attr("name", Text),
    req_attr("count", UInt),
    opt_attr("material", Text),
];
const VERTICES: &[AttributeRule] = &[req_attr("id", Text), opt_attr("name", Text)];
const ROOT: &[AttributeRule] = &[req_attr("version", Text), opt_attr("base", Uri)];
const UNIT: &[AttributeRule] = &[opt_attr("meter", Float), opt_attr("name", Text)];
const SKIN: &[AttributeRule] = &[req_attr("source", Uri)];
const MORPH: &[AttributeRule] = &[req_attr("source", Uri), opt_attr("method", Text)];
const COUNT: &[AttributeRule] = &[req_attr("count", UInt)];
const SAMPLER: &[AttributeRule] = &[
    opt_attr("id", Text),
    opt_attr("pre_behavior", Text),
    opt_attr("post_behavior", Text),
];
const CHANNEL: &[AttributeRule] = &[req_attr("source", Uri), req_attr("target", Text)];
const EFFECT: &[AttributeRule] = &[req_attr("id", Text), opt_attr("name", Text)];
const ID_ONLY: &[AttributeRule] = &[opt_attr("id", Text)];
const ID_SID: &[AttributeRule] = &[opt_attr("id", Text), opt_attr("sid", Text)];
const TEXTURE: &[AttributeRule] = &[req_attr("texture", Text), opt_attr("texcoord", Text)];
const IMAGE: &[AttributeRule] = &[
    opt_attr("id", Text),
    opt_attr("name", Text),
    opt_attr("sid", Text),
    opt_attr("format", Text),
    opt_attr("height", UInt),
    opt_attr("width", UInt),
    opt_attr("depth", UInt),
];
const INIT_FROM: &[AttributeRule] = &[
    opt_attr("mips_generate", Text),
    opt_attr("array_index", UInt),
    opt_attr("mip_index", UInt),
    opt_attr("depth", UInt),
    opt_attr("face", Text),
];
const NODE: &[AttributeRule] = &[
    opt_attr("id", Text),
    opt_attr("name", Text),
    opt_attr("sid", Text),
    opt_attr("type", Text),
    opt_attr("layer", Text),
];
const INSTANCE_NODE: &[AttributeRule] = &[
    req_attr("url", Uri),
    opt_attr("sid", Text),
    opt_attr("name", Text),
    opt_attr("proxy", Uri),
];
const INSTANCE_MATERIAL: &[AttributeRule] = &[
    req_attr("symbol", Text),
    req_attr("target", Uri),
    opt_attr("sid", Text),
    opt_attr("name", Text),
];
const NEWPARAM: &[AttributeRule] = &[req_attr("sid", Text)];
const BIND_JOINT_AXIS: &[AttributeRule] = &[req_attr("target", Text)];
const OPAQUE: &[AttributeRule] = &[opt_attr("opaque", Text)];
const SID_NAME: &[AttributeRule] = &[opt_attr("sid", Text), opt_attr("name", Text)];
const EXTRA: &[AttributeRule] = &[
    opt_attr("id", Text),
    opt_attr("name", Text),
    opt_attr("type", Text),
];

const EXTRA_CHILD: ChildRule = many("extra", K::Extra, EXTRA);
const ASSET_CHILD: ChildRule = opt("asset", K::Asset, NONE);

static COLLADA_CHILDREN: &[ChildRule] = &[
    one("asset", K::Asset, NONE),
    many("library_geometries", K::LibraryGeometries, ID_NAME),
    many("library_controllers", K::LibraryControllers, ID_NAME),
    many("library_animations", K::LibraryAnimations, ID_NAME),
    many("library_materials", K::LibraryMaterials, ID_NAME),
    many("library_effects", K::LibraryEffects, ID_NAME),
    many("library_images", K::LibraryImages, ID_NAME),
    many("library_cameras", K::LibraryCameras, ID_NAME),
    many("library_lights", K::LibraryLights, ID_NAME),
    many("library_visual_scenes", K::LibraryVisualScenes, ID_NAME),
    many("library_nodes", K::LibraryNodes, ID_NAME),
    many("library_formulas", K::LibraryFormulas, ID_NAME),
    many("library_kinematics_models", K::LibraryKinematicsModels, ID_NAME),
    many("library_kinematics_scenes", K::LibraryKinematicsScenes, ID_NAME),
    skip("library_animation_clips"),
    skip("library_physics_materials"),
    skip("library_physics_models"),
    skip("library_physics_scenes"),
    skip("library_force_fields"),
    skip("library_articulated_systems"),
    skip("library_joints"),
    opt("scene", K::SceneRoot, NONE),
    EXTRA_CHILD,
];

static ASSET_CHILDREN: &[ChildRule] = &[
    many("contributor", K::Contributor, NONE),
    skip("coverage"),
    opt("created", K::TextField, NONE),
    opt("keywords", K::TextField, NONE),
    opt("modified", K::TextField, NONE),
    opt("revision", K::TextField, NONE),
    opt("subject", K::TextField, NONE),
    opt("title", K::TextField, NONE),
    opt("unit", K::Unit, UNIT),
    opt("up_axis", K::TextField, NONE),
    EXTRA_CHILD,
];

static CONTRIBUTOR_CHILDREN: &[ChildRule] = &[
    opt("author", K::TextField, NONE),
    skip("author_email"),
    skip("author_website"),
    opt("authoring_tool", K::TextField, NONE),
    opt("comments", K::TextField, NONE),
    opt("copyright", K::TextField, NONE),
    opt("source_data", K::TextField, NONE),
];

static LIBRARY_GEOMETRIES_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    some("geometry", K::Geometry, ID_NAME),
    EXTRA_CHILD,
];

static GEOMETRY_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    opt("mesh", K::Mesh, NONE),
    skip("convex_mesh"),
    skip("spline"),
    skip("brep"),
    EXTRA_CHILD,
];

static MESH_CHILDREN: &[ChildRule] = &[
    some("source", K::Source, SOURCE),
    one("vertices", K::Vertices, VERTICES),
    many("lines", K::Primitive, PRIMITIVE),
    many("linestrips", K::Primitive, PRIMITIVE),
    many("polygons", K::Primitive, PRIMITIVE),
    many("polylist", K::Primitive, PRIMITIVE),
    many("triangles", K::Primitive, PRIMITIVE),
    many("trifans", K::Primitive, PRIMITIVE),
    many("tristrips", K::Primitive, PRIMITIVE),
    EXTRA_CHILD,
];

static SOURCE_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    opt("float_array", K::FloatArray, ARRAY),
    opt("Name_array", K::NameArray, ARRAY),
    opt("IDREF_array", K::NameArray, ARRAY),
    opt("int_array", K::IntArray, ARRAY),
    opt("bool_array", K::BoolArray, ARRAY),
    skip("SIDREF_array"),
    skip("token_array"),
    opt("technique_common", K::SourceTechniqueCommon, NONE),
    skip("technique"),
];

static SOURCE_TECHNIQUE_CHILDREN: &[ChildRule] = &[one("accessor", K::Accessor, ACCESSOR)];

static ACCESSOR_CHILDREN: &[ChildRule] = &[many("param", K::Param, ACCESSOR_PARAM)];

static VERTICES_CHILDREN: &[ChildRule] = &[
    some("input", K::Input, UNSHARED_INPUT),
    EXTRA_CHILD,
];

static PRIMITIVE_CHILDREN: &[ChildRule] = &[
    many("input", K::Input, SHARED_INPUT),
    opt("vcount", K::IndexArray, NONE),
    many("p", K::IndexArray, NONE),
    skip("ph"),
    EXTRA_CHILD,
];

static LIBRARY_CONTROLLERS_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    some("controller", K::Controller, ID_NAME),
    EXTRA_CHILD,
];

static CONTROLLER_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    opt("skin", K::Skin, SKIN),
    opt("morph", K::Morph, MORPH),
    EXTRA_CHILD,
];

static SKIN_CHILDREN: &[ChildRule] = &[
    opt("bind_shape_matrix", K::TextField, NONE),
    rule("source", K::Source, 3, UNBOUNDED, SOURCE),
    one("joints", K::Joints, NONE),
    one("vertex_weights", K::VertexWeights, COUNT),
    EXTRA_CHILD,
];

static JOINTS_CHILDREN: &[ChildRule] = &[
    rule("input", K::Input, 2, UNBOUNDED, UNSHARED_INPUT),
    EXTRA_CHILD,
];

static VERTEX_WEIGHTS_CHILDREN: &[ChildRule] = &[
    rule("input", K::Input, 2, UNBOUNDED, SHARED_INPUT),
    opt("vcount", K::IndexArray, NONE),
    opt("v", K::IndexArray, NONE),
    EXTRA_CHILD,
];

static MORPH_CHILDREN: &[ChildRule] = &[
    rule("source", K::Source, 2, UNBOUNDED, SOURCE),
    one("targets", K::Targets, NONE),
    EXTRA_CHILD,
];

static TARGETS_CHILDREN: &[ChildRule] = &[
    rule("input", K::Input, 2, UNBOUNDED, UNSHARED_INPUT),
    EXTRA_CHILD,
];

static LIBRARY_ANIMATIONS_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    some("animation", K::Animation, ID_NAME),
    EXTRA_CHILD,
];

static ANIMATION_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    many("animation", K::Animation, ID_NAME),
    many("source", K::Source, SOURCE),
    many("sampler", K::Sampler, SAMPLER),
    many("channel", K::Channel, CHANNEL),
    EXTRA_CHILD,
];

static SAMPLER_CHILDREN: &[ChildRule] = &[some("input", K::Input, UNSHARED_INPUT)];

static LIBRARY_MATERIALS_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    some("material", K::Material, ID_NAME),
    EXTRA_CHILD,
];

static MATERIAL_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    one("instance_effect", K::InstanceEffect, URL_INSTANCE),
    EXTRA_CHILD,
];

static INSTANCE_EFFECT_CHILDREN: &[ChildRule] = &[
    skip("technique_hint"),
    skip("setparam"),
    EXTRA_CHILD,
];

static LIBRARY_EFFECTS_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    some("effect", K::Effect, EFFECT),
    EXTRA_CHILD,
];

static EFFECT_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    skip("annotate"),
    skip("image"),
    skip("newparam"),
    many("profile_COMMON", K::ProfileCommon, ID_ONLY),
    skip("profile_GLSL"),
    skip("profile_CG"),
    skip("profile_GLES"),
    skip("profile_GLES2"),
    skip("profile_BRIDGE"),
    EXTRA_CHILD,
];

static PROFILE_COMMON_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    skip("image"),
    skip("newparam"),
    one("technique", K::EffectTechnique, ID_SID),
    EXTRA_CHILD,
];

static EFFECT_TECHNIQUE_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    skip("image"),
    opt("constant", K::Shader, NONE),
    opt("lambert", K::Shader, NONE),
    opt("phong", K::Shader, NONE),
    opt("blinn", K::Shader, NONE),
    EXTRA_CHILD,
];

static SHADER_CHILDREN: &[ChildRule] = &[
    opt("emission", K::ShaderParam, NONE),
    opt("ambient", K::ShaderParam, NONE),
    opt("diffuse", K::ShaderParam, NONE),
    opt("specular", K::ShaderParam, NONE),
    opt("shininess", K::ShaderParam, NONE),
    opt("reflective", K::ShaderParam, NONE),
    opt("reflectivity", K::ShaderParam, NONE),
    opt("transparent", K::ShaderParam, OPAQUE),
    opt("transparency", K::ShaderParam, NONE),
    opt("index_of_refraction", K::ShaderParam, NONE),
];

static SHADER_PARAM_CHILDREN: &[ChildRule] = &[
    opt("color", K::Color, SID),
    opt("float", K::FloatValue, SID),
    opt("texture", K::Texture, TEXTURE),
    skip("param"),
];

static TEXTURE_CHILDREN: &[ChildRule] = &[EXTRA_CHILD];

static LIBRARY_IMAGES_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    some("image", K::Image, IMAGE),
    EXTRA_CHILD,
];

static IMAGE_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    skip("renderable"),
    opt("init_from", K::InitFrom, INIT_FROM),
    skip("data"),
    skip("create_2d"),
    skip("create_3d"),
    skip("create_cube"),
    EXTRA_CHILD,
];

static INIT_FROM_CHILDREN: &[ChildRule] = &[opt("ref", K::TextField, NONE), skip("hex")];

static LIBRARY_CAMERAS_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    some("camera", K::Camera, ID_NAME),
    EXTRA_CHILD,
];

static CAMERA_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    one("optics", K::Optics, NONE),
    skip("imager"),
    EXTRA_CHILD,
];

static OPTICS_CHILDREN: &[ChildRule] = &[
    one("technique_common", K::OpticsTechniqueCommon, NONE),
    skip("technique"),
    EXTRA_CHILD,
];

static OPTICS_TECHNIQUE_CHILDREN: &[ChildRule] = &[
    opt("perspective", K::Projection, NONE),
    opt("orthographic", K::Projection, NONE),
];

static PROJECTION_CHILDREN: &[ChildRule] = &[
    text("xfov"),
    text("yfov"),
    text("xmag"),
    text("ymag"),
    text("aspect_ratio"),
    rule("znear", K::TextField, 1, 1, SID),
    rule("zfar", K::TextField, 1, 1, SID),
];

static LIBRARY_LIGHTS_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    some("light", K::Light, ID_NAME),
    EXTRA_CHILD,
];

static LIGHT_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    one("technique_common", K::LightTechniqueCommon, NONE),
    skip("technique"),
    EXTRA_CHILD,
];

static LIGHT_TECHNIQUE_CHILDREN: &[ChildRule] = &[
    opt("ambient", K::LightType, NONE),
    opt("directional", K::LightType, NONE),
    opt("point", K::LightType, NONE),
    opt("spot", K::LightType, NONE),
];

static LIGHT_TYPE_CHILDREN: &[ChildRule] = &[
    one("color", K::Color, SID),
    text("constant_attenuation"),
    text("linear_attenuation"),
    text("quadratic_attenuation"),
    text("falloff_angle"),
    text("falloff_exponent"),
];

static LIBRARY_VISUAL_SCENES_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    some("visual_scene", K::VisualScene, ID_NAME),
    EXTRA_CHILD,
];

static VISUAL_SCENE_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    some("node", K::Node, NODE),
    skip("evaluate_scene"),
    EXTRA_CHILD,
];

static LIBRARY_NODES_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    some("node", K::Node, NODE),
    EXTRA_CHILD,
];

static NODE_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    many("lookat", K::Transform, SID),
    many("matrix", K::Transform, SID),
    many("rotate", K::Transform, SID),
    many("scale", K::Transform, SID),
    many("skew", K::Transform, SID),
    many("translate", K::Transform, SID),
    many("instance_camera", K::InstanceSimple, URL_INSTANCE),
    many("instance_controller", K::InstanceController, URL_INSTANCE),
    many("instance_geometry", K::InstanceGeometry, URL_INSTANCE),
    many("instance_light", K::InstanceSimple, URL_INSTANCE),
    many("instance_node", K::InstanceSimple, INSTANCE_NODE),
    many("node", K::Node, NODE),
    EXTRA_CHILD,
];

static INSTANCE_GEOMETRY_CHILDREN: &[ChildRule] = &[
    opt("bind_material", K::BindMaterial, NONE),
    EXTRA_CHILD,
];

static INSTANCE_CONTROLLER_CHILDREN: &[ChildRule] = &[
    many("skeleton", K::TextField, NONE),
    opt("bind_material", K::BindMaterial, NONE),
    EXTRA_CHILD,
];

static INSTANCE_SIMPLE_CHILDREN: &[ChildRule] = &[EXTRA_CHILD];

static BIND_MATERIAL_CHILDREN: &[ChildRule] = &[
    skip("param"),
    one("technique_common", K::BindMaterialTechniqueCommon, NONE),
    skip("technique"),
    EXTRA_CHILD,
];

static BIND_MATERIAL_TECHNIQUE_CHILDREN: &[ChildRule] = &[some(
    "instance_material",
    K::InstanceMaterial,
    INSTANCE_MATERIAL,
)];

static INSTANCE_MATERIAL_CHILDREN: &[ChildRule] = &[
    skip("bind"),
    skip("bind_vertex_input"),
    EXTRA_CHILD,
];

static SCENE_CHILDREN: &[ChildRule] = &[
    skip("instance_physics_scene"),
    opt("instance_visual_scene", K::InstanceVisualScene, URL_INSTANCE),
    opt("instance_kinematics_scene", K::InstanceKinematicsScene, URL_INSTANCE),
    EXTRA_CHILD,
];

static INSTANCE_VISUAL_SCENE_CHILDREN: &[ChildRule] = &[EXTRA_CHILD];

static INSTANCE_KINEMATICS_SCENE_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    skip("newparam"),
    skip("setparam"),
    skip("bind_kinematics_model"),
    many("bind_joint_axis", K::BindJointAxis, BIND_JOINT_AXIS),
    EXTRA_CHILD,
];

static BIND_JOINT_AXIS_CHILDREN: &[ChildRule] = &[
    one("axis", K::BindAxis, NONE),
    one("value", K::BindValue, NONE),
];

static BIND_AXIS_CHILDREN: &[ChildRule] = &[
    opt("SIDREF", K::TextField, NONE),
    opt("param", K::Param, REF_PARAM),
];

static BIND_VALUE_CHILDREN: &[ChildRule] = &[
    opt("float", K::FloatValue, NONE),
    skip("param"),
];

static LIBRARY_FORMULAS_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    some("formula", K::Formula, ID_NAME_SID),
    EXTRA_CHILD,
];

static FORMULA_CHILDREN: &[ChildRule] = &[
    many("newparam", K::FormulaNewparam, NEWPARAM),
    one("target", K::FormulaTarget, NONE),
    one("technique_common", K::FormulaTechnique, NONE),
    skip("technique"),
    EXTRA_CHILD,
];

static FORMULA_NEWPARAM_CHILDREN: &[ChildRule] = &[
    opt("float", K::FloatValue, NONE),
    skip("int"),
    skip("bool"),
    skip("SIDREF"),
];

static FORMULA_TARGET_CHILDREN: &[ChildRule] = &[
    opt("float", K::FloatValue, NONE),
    opt("param", K::Param, REF_PARAM),
];

static FORMULA_TECHNIQUE_CHILDREN: &[ChildRule] = &[opt("math", K::Math, NONE)];

static MATH_CHILDREN: &[ChildRule] = &[rule("*", K::Math, 0, UNBOUNDED, NONE)];

static LIBRARY_KINEMATICS_MODELS_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    some("kinematics_model", K::KinematicsModel, ID_NAME),
    EXTRA_CHILD,
];

static KINEMATICS_MODEL_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    one("technique_common", K::KinematicsModelTechniqueCommon, NONE),
    skip("technique"),
    EXTRA_CHILD,
];

static KINEMATICS_MODEL_TECHNIQUE_CHILDREN: &[ChildRule] = &[
    skip("newparam"),
    skip("instance_joint"),
    many("joint", K::Joint, ID_NAME_SID),
    skip("link"),
    skip("formula"),
    skip("instance_formula"),
];

static JOINT_CHILDREN: &[ChildRule] = &[
    many("prismatic", K::JointPrimitive, SID),
    many("revolute", K::JointPrimitive, SID),
    EXTRA_CHILD,
];

static JOINT_PRIMITIVE_CHILDREN: &[ChildRule] = &[
    rule("axis", K::TextField, 1, 1, SID),
    opt("limits", K::Limits, NONE),
];

static LIMITS_CHILDREN: &[ChildRule] = &[
    opt("min", K::TextField, SID_NAME),
    opt("max", K::TextField, SID_NAME),
];

static LIBRARY_KINEMATICS_SCENES_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    some("kinematics_scene", K::KinematicsScene, ID_NAME),
    EXTRA_CHILD,
];

static KINEMATICS_SCENE_CHILDREN: &[ChildRule] = &[
    ASSET_CHILD,
    many("instance_kinematics_model", K::InstanceKinematicsModel, URL_INSTANCE),
    skip("instance_articulated_system"),
    EXTRA_CHILD,
];

static INSTANCE_KINEMATICS_MODEL_CHILDREN: &[ChildRule] = &[
    skip("bind"),
    skip("newparam"),
    skip("setparam"),
    EXTRA_CHILD,
];

static EXTRA_CHILDREN: &[ChildRule] = &[
    opt("asset", K::Skip, NONE),
    rule("*", K::Skip, 0, UNBOUNDED, NONE),
];

fn children_of(kind: ElementKind) -> &'static [ChildRule] {
    match kind {
        K::Collada => COLLADA_CHILDREN,
        K::Asset => ASSET_CHILDREN,
        K::Contributor => CONTRIBUTOR_CHILDREN,
        K::LibraryGeometries => LIBRARY_GEOMETRIES_CHILDREN,
        K::Geometry => GEOMETRY_CHILDREN,
        K::Mesh => MESH_CHILDREN,
        K::Source => SOURCE_CHILDREN,
        K::SourceTechniqueCommon => SOURCE_TECHNIQUE_CHILDREN,
        K::Accessor => ACCESSOR_CHILDREN,
        K::Vertices => VERTICES_CHILDREN,
        K::Primitive => PRIMITIVE_CHILDREN,
        K::LibraryControllers => LIBRARY_CONTROLLERS_CHILDREN,
        K::Controller => CONTROLLER_CHILDREN,
        K::Skin => SKIN_CHILDREN,
        K::Joints => JOINTS_CHILDREN,
        K::VertexWeights => VERTEX_WEIGHTS_CHILDREN,
        K::Morph => MORPH_CHILDREN,
        K::Targets => TARGETS_CHILDREN,
        K::LibraryAnimations => LIBRARY_ANIMATIONS_CHILDREN,
        K::Animation => ANIMATION_CHILDREN,
        K::Sampler => SAMPLER_CHILDREN,
        K::LibraryMaterials => LIBRARY_MATERIALS_CHILDREN,
        K::Material => MATERIAL_CHILDREN,
        K::InstanceEffect => INSTANCE_EFFECT_CHILDREN,
        K::LibraryEffects => LIBRARY_EFFECTS_CHILDREN,
        K::Effect => EFFECT_CHILDREN,
        K::ProfileCommon => PROFILE_COMMON_CHILDREN,
        K::EffectTechnique => EFFECT_TECHNIQUE_CHILDREN,
        K::Shader => SHADER_CHILDREN,
        K::ShaderParam => SHADER_PARAM_CHILDREN,
        K::Texture => TEXTURE_CHILDREN,
        K::LibraryImages => LIBRARY_IMAGES_CHILDREN,
        K::Image => IMAGE_CHILDREN,
        K::InitFrom => INIT_FROM_CHILDREN,
        K::LibraryCameras => LIBRARY_CAMERAS_CHILDREN,
        K::Camera => CAMERA_CHILDREN,
        K::Optics => OPTICS_CHILDREN,
        K::OpticsTechniqueCommon => OPTICS_TECHNIQUE_CHILDREN,
        K::Projection => PROJECTION_CHILDREN,
        K::LibraryLights => LIBRARY_LIGHTS_CHILDREN,
        K::Light => LIGHT_CHILDREN,
        K::LightTechniqueCommon => LIGHT_TECHNIQUE_CHILDREN,
        K::LightType => LIGHT_TYPE_CHILDREN,
        K::LibraryVisualScenes => LIBRARY_VISUAL_SCENES_CHILDREN,
        K::VisualScene => VISUAL_SCENE_CHILDREN,
        K::LibraryNodes => LIBRARY_NODES_CHILDREN,
        K::Node => NODE_CHILDREN,
        K::InstanceGeometry => INSTANCE_GEOMETRY_CHILDREN,
        K::InstanceController => INSTANCE_CONTROLLER_CHILDREN,
        K::InstanceSimple => INSTANCE_SIMPLE_CHILDREN,
        K::BindMaterial => BIND_MATERIAL_CHILDREN,
        K::BindMaterialTechniqueCommon => BIND_MATERIAL_TECHNIQUE_CHILDREN,
        K::InstanceMaterial => INSTANCE_MATERIAL_CHILDREN,
        K::SceneRoot => SCENE_CHILDREN,
        K::InstanceVisualScene => INSTANCE_VISUAL_SCENE_CHILDREN,
        K::InstanceKinematicsScene => INSTANCE_KINEMATICS_SCENE_CHILDREN,
        K::BindJointAxis => BIND_JOINT_AXIS_CHILDREN,
        K::BindAxis => BIND_AXIS_CHILDREN,
        K::BindValue => BIND_VALUE_CHILDREN,
        K::LibraryFormulas => LIBRARY_FORMULAS_CHILDREN,
        K::Formula => FORMULA_CHILDREN,
        K::FormulaNewparam => FORMULA_NEWPARAM_CHILDREN,
        K::FormulaTarget => FORMULA_TARGET_CHILDREN,
        K::FormulaTechnique => FORMULA_TECHNIQUE_CHILDREN,
        K::Math => MATH_CHILDREN,
        K::LibraryKinematicsModels => LIBRARY_KINEMATICS_MODELS_CHILDREN,
        K::KinematicsModel => KINEMATICS_MODEL_CHILDREN,
        K::KinematicsModelTechniqueCommon => KINEMATICS_MODEL_TECHNIQUE_CHILDREN,
        K::Joint => JOINT_CHILDREN,
        K::JointPrimitive => JOINT_PRIMITIVE_CHILDREN,
        K::Limits => LIMITS_CHILDREN,
        K::LibraryKinematicsScenes => LIBRARY_KINEMATICS_SCENES_CHILDREN,
        K::KinematicsScene => KINEMATICS_SCENE_CHILDREN,
        K::InstanceKinematicsModel => INSTANCE_KINEMATICS_MODEL_CHILDREN,
        K::Extra => EXTRA_CHILDREN,
        K::TextField
        | K::FloatArray
        | K::NameArray
        | K::IntArray
        | K::BoolArray
        | K::Param
        | K::Input
        | K::IndexArray
        | K::Unit
        | K::Channel
        | K::Transform
        | K::Color
        | K::FloatValue
        | K::Skip => &[],
    }
}

static ROOT_RULE: ChildRule = one("COLLADA", K::Collada, ROOT);

/// Rule for the document element
pub fn root_rule() -> &'static ChildRule {
    &ROOT_RULE
}

/// Position and rule of `name` among the children of `parent`
pub fn child_rule(parent: ElementKind, name: &str) -> Option<(usize, &'static ChildRule)> {
    let children = parent.children();
    children
        .iter()
        .position(|rule| rule.name == name)
        .or_else(|| children.iter().position(|rule| rule.name == "*"))
        .map(|index| (index, &children[index]))
}

/// Attributes never validated: namespace declarations and prefixed names
pub fn should_skip_attribute(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:") || name.contains(':')
}

/// A deviation of an element's attributes from its rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeIssue {
    /// Required attribute absent
    Missing(&'static str),
    /// Attribute not declared
    Unknown(String),
    /// Value does not match the declared type
    Malformed {
        /// Attribute name
        name: &'static str,
        /// Offending value
        value: String,
        /// Expected type
        expected: AttributeType,
    },
}

fn value_matches(ty: AttributeType, value: &str) -> bool {
    match ty {
        AttributeType::Text => true,
        AttributeType::Uri => !value.trim().is_empty(),
        AttributeType::UInt => value.trim().parse::<u64>().is_ok(),
        AttributeType::Float => value.trim().parse::<f64>().is_ok(),
    }
}

/// Check attributes against a rule
pub fn validate_attributes(rule: &ChildRule, attributes: &[Attribute]) -> Vec<AttributeIssue> {
    let mut issues = Vec::new();

    // Open content takes anything
    if rule.name == "*" {
        return issues;
    }

    for declared in rule.attributes {
        match attributes.iter().find(|a| a.name == declared.name) {
            Some(found) => {
                if !value_matches(declared.ty, &found.value) {
                    issues.push(AttributeIssue::Malformed {
                        name: declared.name,
                        value: found.value.clone(),
                        expected: declared.ty,
                    });
                }
            }
            None if declared.required => issues.push(AttributeIssue::Missing(declared.name)),
            None => {}
        }
    }

    for attr in attributes {
        if should_skip_attribute(&attr.name) {
            continue;
        }
        if !rule.attributes.iter().any(|d| d.name == attr.name) {
            issues.push(AttributeIssue::Unknown(attr.name.clone()));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<Attribute> {
        pairs
            .iter()
            .map(|(n, v)| Attribute {
                name: n.to_string(),
                value: v.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_child_lookup() {
        let (_, rule) = child_rule(ElementKind::Mesh, "polylist").unwrap();
        assert_eq!(rule.kind, ElementKind::Primitive);
        assert!(child_rule(ElementKind::Mesh, "node").is_none());
    }

    #[test]
    fn test_unmodelled_elements_skip() {
        let (_, rule) = child_rule(ElementKind::Collada, "library_physics_models").unwrap();
        assert_eq!(rule.kind, ElementKind::Skip);
        let (_, rule) = child_rule(ElementKind::Effect, "profile_GLSL").unwrap();
        assert_eq!(rule.kind, ElementKind::Skip);
    }

    #[test]
    fn test_wildcards() {
        let (_, rule) = child_rule(ElementKind::Extra, "technique").unwrap();
        assert_eq!(rule.kind, ElementKind::Skip);
        let (_, rule) = child_rule(ElementKind::Math, "apply").unwrap();
        assert_eq!(rule.kind, ElementKind::Math);
    }

    #[test]
    fn test_family_policies() {
        assert_eq!(Family::Geometry.default_policy(), ValidationPolicy::Strict);
        assert_eq!(Family::Controller.default_policy(), ValidationPolicy::Strict);
        assert_eq!(Family::Animation.default_policy(), ValidationPolicy::Strict);
        assert_eq!(Family::Material.default_policy(), ValidationPolicy::Lenient);
        assert_eq!(Family::Scene.default_policy(), ValidationPolicy::Lenient);
        assert_eq!(Family::Extra.default_policy(), ValidationPolicy::Open);
    }

    #[test]
    fn test_shared_kinds_inherit_family() {
        assert_eq!(ElementKind::Source.family(), None);
        assert_eq!(ElementKind::FloatArray.family(), None);
        assert_eq!(ElementKind::Geometry.family(), Some(Family::Geometry));
    }

    #[test]
    fn test_validate_missing_required() {
        let (_, rule) = child_rule(ElementKind::Source, "float_array").unwrap();
        let issues = validate_attributes(rule, &attrs(&[("id", "a")]));
        assert_eq!(issues, vec![AttributeIssue::Missing("count")]);
    }

    #[test]
    fn test_validate_unknown_and_malformed() {
        let (_, rule) = child_rule(ElementKind::Source, "float_array").unwrap();
        let issues = validate_attributes(
            rule,
            &attrs(&[("count", "x"), ("color", "red"), ("xmlns:foo", "urn")]),
        );
        assert_eq!(issues.len(), 2);
        assert!(matches!(issues[0], AttributeIssue::Malformed { name: "count", .. }));
        assert_eq!(issues[1], AttributeIssue::Unknown("color".to_string()));
    }

    #[test]
    fn test_should_skip_attribute() {
        assert!(should_skip_attribute("xmlns"));
        assert!(should_skip_attribute("xmlns:xsi"));
        assert!(should_skip_attribute("xsi:schemaLocation"));
        assert!(!should_skip_attribute("id"));
    }

    #[test]
    fn test_root_rule() {
        assert_eq!(root_rule().name, "COLLADA");
        let issues = validate_attributes(root_rule(), &attrs(&[("version", "1.4.1")]));
        assert!(issues.is_empty());
    }
}
