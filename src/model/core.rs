//! Identifiers and document-level types shared by every object

use std::fmt;

/// Kind tag of a [`UniqueId`]
///
/// The tag travels with every id so that a reference can be checked against
/// the kind of object it is expected to point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClassId {
    /// Tag of [`UniqueId::INVALID`]
    NoType,
    /// `<visual_scene>`
    VisualScene,
    /// `<library_nodes>`
    LibraryNodes,
    /// `<node>`
    Node,
    /// `<geometry>`
    Geometry,
    /// `<material>`
    Material,
    /// `<effect>`
    Effect,
    /// `<camera>`
    Camera,
    /// `<light>`
    Light,
    /// `<image>`
    Image,
    /// One animation curve (a `<sampler>`)
    Animation,
    /// Animations bound to one animatable value
    AnimationList,
    /// `<controller>` as addressed from `<instance_controller>`
    Controller,
    /// Skin data of a `<skin>` controller
    SkinControllerData,
    /// A skin bound to concrete joints
    SkinController,
    /// `<morph>` controller
    MorphController,
    /// `<formula>`
    Formula,
    /// `<kinematics_model>`
    KinematicsModel,
    /// `<kinematics_scene>`
    KinematicsScene,
    /// Kinematics `<joint>`
    Joint,
}

impl ClassId {
    /// Human readable name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            ClassId::NoType => "none",
            ClassId::VisualScene => "visual scene",
            ClassId::LibraryNodes => "library nodes",
            ClassId::Node => "node",
            ClassId::Geometry => "geometry",
            ClassId::Material => "material",
            ClassId::Effect => "effect",
            ClassId::Camera => "camera",
            ClassId::Light => "light",
            ClassId::Image => "image",
            ClassId::Animation => "animation",
            ClassId::AnimationList => "animation list",
            ClassId::Controller => "controller",
            ClassId::SkinControllerData => "skin controller data",
            ClassId::SkinController => "skin controller",
            ClassId::MorphController => "morph controller",
            ClassId::Formula => "formula",
            ClassId::KinematicsModel => "kinematics model",
            ClassId::KinematicsScene => "kinematics scene",
            ClassId::Joint => "joint",
        }
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Index of a physical document within one load session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    /// No document
    pub const INVALID: FileId = FileId(u32::MAX);

    /// Whether this refers to a registered document
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session-unique identifier of an object
///
/// Ids are handed out by the loader's registry. `object_id` grows
/// monotonically per [`ClassId`] within a session and is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniqueId {
    /// Kind of the object
    pub class_id: ClassId,
    /// Per-kind counter value
    pub object_id: u64,
    /// Document the object was defined in (or first referenced from)
    pub file_id: FileId,
}

impl UniqueId {
    /// Sentinel for "no such object"
    pub const INVALID: UniqueId = UniqueId {
        class_id: ClassId::NoType,
        object_id: 0,
        file_id: FileId::INVALID,
    };

    /// Create an id from its parts
    pub fn new(class_id: ClassId, object_id: u64, file_id: FileId) -> Self {
        Self {
            class_id,
            object_id,
            file_id,
        }
    }

    /// Whether this is anything but [`UniqueId::INVALID`]
    pub fn is_valid(&self) -> bool {
        self.class_id != ClassId::NoType
    }
}

impl Default for UniqueId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}:{}@{}", self.class_id, self.object_id, self.file_id)
        } else {
            f.write_str("<invalid>")
        }
    }
}

/// COLLADA schema version of a document, from the root `version` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColladaVersion {
    /// Attribute absent or not recognised
    #[default]
    Unknown,
    /// 1.4.x
    V1_4,
    /// 1.5.x
    V1_5,
}

impl ColladaVersion {
    /// Map a `version` attribute value
    pub fn from_attribute(value: &str) -> Self {
        let value = value.trim();
        if value.starts_with("1.4") {
            ColladaVersion::V1_4
        } else if value.starts_with("1.5") {
            ColladaVersion::V1_5
        } else {
            ColladaVersion::Unknown
        }
    }
}

/// Axis pointing up in the document's coordinate system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpAxis {
    /// `X_UP`
    X,
    /// `Y_UP`
    #[default]
    Y,
    /// `Z_UP`
    Z,
}

impl UpAxis {
    /// Parse `X_UP`, `Y_UP` or `Z_UP`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "X_UP" => Some(UpAxis::X),
            "Y_UP" => Some(UpAxis::Y),
            "Z_UP" => Some(UpAxis::Z),
            _ => None,
        }
    }
}

/// Linear unit of the document
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    /// Unit name, e.g. "meter" or "inch"
    pub name: String,
    /// Size of one unit in meters
    pub meter: f64,
}

impl Default for Unit {
    fn default() -> Self {
        Self {
            name: "meter".to_string(),
            meter: 1.0,
        }
    }
}

/// One `<contributor>` of an asset
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Contributor {
    /// Author name
    pub author: Option<String>,
    /// Tool that produced the document
    pub authoring_tool: Option<String>,
    /// Free-form comments
    pub comments: Option<String>,
    /// Copyright notice
    pub copyright: Option<String>,
    /// URI of the source data
    pub source_data: Option<String>,
}

/// Document metadata from `<asset>`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Asset {
    /// Everyone who worked on the document
    pub contributors: Vec<Contributor>,
    /// Creation date as written in the document
    pub created: Option<String>,
    /// Last modification date as written in the document
    pub modified: Option<String>,
    /// Title
    pub title: Option<String>,
    /// Subject
    pub subject: Option<String>,
    /// Keywords
    pub keywords: Option<String>,
    /// Revision
    pub revision: Option<String>,
    /// Linear unit
    pub unit: Unit,
    /// Up axis
    pub up_axis: UpAxis,
    /// Schema version of the document this asset came from
    pub version: ColladaVersion,
}

/// The document's `<scene>`: which visual and kinematics scenes are active
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    /// Instantiated visual scene
    pub instance_visual_scene: Option<UniqueId>,
    /// Instantiated kinematics scene
    pub instance_kinematics_scene: Option<UniqueId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_id() {
        assert!(!UniqueId::INVALID.is_valid());
        assert_eq!(UniqueId::default(), UniqueId::INVALID);
        assert_eq!(UniqueId::INVALID.to_string(), "<invalid>");
    }

    #[test]
    fn test_id_display() {
        let id = UniqueId::new(ClassId::Geometry, 3, FileId(0));
        assert_eq!(id.to_string(), "geometry:3@0");
    }

    #[test]
    fn test_version_from_attribute() {
        assert_eq!(ColladaVersion::from_attribute("1.4.1"), ColladaVersion::V1_4);
        assert_eq!(ColladaVersion::from_attribute("1.5.0"), ColladaVersion::V1_5);
        assert_eq!(ColladaVersion::from_attribute("2.0"), ColladaVersion::Unknown);
    }

    #[test]
    fn test_up_axis() {
        assert_eq!(UpAxis::parse("Z_UP"), Some(UpAxis::Z));
        assert_eq!(UpAxis::parse(" Y_UP "), Some(UpAxis::Y));
        assert_eq!(UpAxis::parse("W_UP"), None);
    }
}
