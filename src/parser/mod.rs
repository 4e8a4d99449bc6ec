//! Element dispatch for COLLADA documents
//!
//! [`Dispatcher`] receives the SAX events of one document and keeps a stack
//! of open elements. Every element is looked up in the grammar tables,
//! checked against the validation policy of its family and handed to a
//! parser built by [`create_parser`]. A parser receives the element's text
//! and the finished results of its children, and turns them into its own
//! result when the element closes. That result is attached to the parent,
//! or written out directly for complete objects.
//!
//! Strict violations inside a top-level object (a geometry, a controller,
//! ...) mark the object as poisoned: it is dropped when it closes and its id
//! is undefined again, so references to it are reported as dangling.

mod animation;
mod common;
mod controller;
mod document;
mod geometry;
mod kinematics;
mod material;
pub mod numbers;
mod optics;
mod scene;
mod source;

use crate::config::{LoaderConfig, ObjectFlags};
use crate::error::{Error, ErrorContext, ErrorHandler, ParserError, Result, Severity};
use crate::grammar::{
    AttributeIssue, ElementKind, Family, ValidationPolicy, child_rule, root_rule,
    validate_attributes,
};
use crate::intermediate::{IntermediateStore, PendingReference};
use crate::model::{
    Asset, ClassId, Color, ColladaVersion, Contributor, EffectCommon, FileId, FormulaParameter,
    Instance, InstanceGeometry, Joint, JointPrimitive, MaterialBinding, Mesh, Node, Texture,
    Transformation, UniqueId, Unit,
};
use crate::registry::Registry;
use crate::sax::{Attribute, Location, SaxHandler, attribute};
use crate::sid_tree::{SidNodeId, SidTarget, SidTree};
use crate::writer::Writer;
use std::collections::{HashSet, VecDeque};
use url::Url;

use controller::{MorphParsed, SkinParsed, VertexWeights};
use geometry::{RawPrimitive, Vertices};
use kinematics::JointAxisParsed;
use material::ShaderValue;
use optics::{LightData, OpticsData};
use source::{Accessor, ArrayData, Input, ParamData, Source};

const CLASS_MISMATCH_HINT: &str = "the id already names an element of another kind";

/// Result of a finished element, handed to its parent
#[derive(Debug)]
pub(crate) enum Parsed {
    /// Nothing for the parent
    None,
    /// Text content of a leaf element
    Text { name: String, value: String },
    Asset(Asset),
    Contributor(Contributor),
    Unit(Unit),
    Array(ArrayData),
    Accessor(Accessor),
    Param(ParamData),
    Source(Source),
    Input(Input),
    /// `<p>`, `<vcount>` or `<v>`
    Indices { name: String, values: Vec<i64> },
    Vertices(Vertices),
    Primitive(RawPrimitive),
    Mesh(Mesh),
    Joints(Vec<Input>),
    VertexWeights(VertexWeights),
    Targets(Vec<Input>),
    Skin(SkinParsed),
    Morph(MorphParsed),
    Sampler { id: UniqueId, original_id: Option<String>, inputs: Vec<Input> },
    Channel { source: String, target: String },
    InstanceEffect(UniqueId),
    Color(Color),
    Float(f64),
    Texture(Texture),
    ShaderParam { name: String, value: ShaderValue },
    Shader(EffectCommon),
    ImageRef(String),
    Optics(OpticsData),
    Light(LightData),
    Transform { transformation: Transformation, sid_node: Option<SidNodeId> },
    InstanceGeometry(InstanceGeometry),
    InstanceController {
        instance: crate::model::InstanceController,
        skeleton_roots: Vec<Url>,
    },
    /// `<instance_camera>`, `<instance_light>` or `<instance_node>`
    Instance { element: String, instance: Instance },
    MaterialBindings(Vec<MaterialBinding>),
    MaterialBinding(MaterialBinding),
    Node(Node),
    InstanceVisualScene(UniqueId),
    InstanceKinematicsScene(UniqueId),
    FormulaParameter(FormulaParameter),
    FormulaTarget(String),
    MathReferences(Vec<String>),
    JointPrimitive { primitive: JointPrimitive, sid_node: Option<SidNodeId> },
    Limits(Option<f64>, Option<f64>),
    KinematicsJoint(Joint),
    KinematicsJoints(Vec<Joint>),
    InstanceKinematicsModel(UniqueId),
    JointAxis(JointAxisParsed),
    Axis(String),
}

/// An element about to be parsed
pub(crate) struct ElementStart<'a> {
    /// Local element name
    pub name: &'a str,
    /// Attributes, unescaped
    pub attributes: &'a [Attribute],
    /// Sid tree node of the element, if it has `id` or `sid`
    pub sid_node: Option<SidNodeId>,
}

impl ElementStart<'_> {
    /// Attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        attribute(self.attributes, name)
    }

    /// Attribute value that must be present
    pub fn required(&self, name: &str) -> Result<&str> {
        self.attr(name)
            .ok_or_else(|| Error::missing_attribute(self.name, name))
    }

    /// Non-negative integer attribute
    pub fn attr_usize(&self, name: &str) -> Result<Option<usize>> {
        self.attr(name)
            .map(|value| {
                value.trim().parse::<usize>().map_err(|_| {
                    Error::parse_error_with_context(
                        &format!("{}@{}", self.name, name),
                        value,
                        "non-negative integer",
                    )
                })
            })
            .transpose()
    }

    /// Owned optional attribute
    pub fn attr_string(&self, name: &str) -> Option<String> {
        self.attr(name).map(str::to_string)
    }
}

/// Parser of one element kind
///
/// Errors returned from any method drop the element; how loudly depends on
/// the validation policy of the element's family.
pub(crate) trait ElementParser {
    /// Character data of the element; may arrive in several runs
    fn text(&mut self, _text: &str, _ctx: &mut LoadContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Result of a finished child element
    fn attach(&mut self, _child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        Ok(())
    }

    /// The element closed
    fn finish(self: Box<Self>, ctx: &mut LoadContext<'_>) -> Result<Parsed>;

    /// Id defined by the element, undefined again if the element is dropped
    fn object_id(&self) -> Option<UniqueId> {
        None
    }
}

/// State of one load session, shared by every document of the session
pub(crate) struct LoadContext<'a> {
    /// Unique ids and documents
    pub registry: Registry,
    /// Sid scopes of all documents
    pub sid_tree: SidTree,
    /// Everything held for the post-pass
    pub store: IntermediateStore,
    /// Session configuration
    pub config: &'a LoaderConfig,
    /// Receiver of finished objects
    pub writer: &'a mut dyn Writer,
    handler: &'a mut dyn ErrorHandler,
    /// Document being parsed
    pub file_id: FileId,
    /// Position of the current event
    pub location: Location,
    /// Version of the document being parsed
    pub version: ColladaVersion,
    /// Whether the document being parsed is the one the load started with
    pub is_root_file: bool,
    pending_files: VecDeque<FileId>,
    queued_files: HashSet<FileId>,
    loaded_files: HashSet<FileId>,
    /// Objects handed to the writer so far
    pub objects_written: usize,
}

impl<'a> LoadContext<'a> {
    /// Start a session
    pub fn new(
        config: &'a LoaderConfig,
        writer: &'a mut dyn Writer,
        handler: &'a mut dyn ErrorHandler,
    ) -> Self {
        Self {
            registry: Registry::new(),
            sid_tree: SidTree::new(),
            store: IntermediateStore::new(),
            config,
            writer,
            handler,
            file_id: FileId::INVALID,
            location: Location::default(),
            version: ColladaVersion::Unknown,
            is_root_file: false,
            pending_files: VecDeque::new(),
            queued_files: HashSet::new(),
            loaded_files: HashSet::new(),
            objects_written: 0,
        }
    }

    /// Make `file_id` the current document
    pub fn begin_file(&mut self, file_id: FileId, is_root_file: bool) {
        self.file_id = file_id;
        self.is_root_file = is_root_file;
        self.location = Location::default();
        self.version = ColladaVersion::Unknown;
        self.queued_files.insert(file_id);
    }

    /// Record that the current document could be opened
    ///
    /// References into documents never marked are not checked.
    pub fn mark_loaded(&mut self) {
        self.loaded_files.insert(self.file_id);
    }

    /// Whether a document was parsed in this session
    pub fn is_loaded(&self, file_id: FileId) -> bool {
        self.loaded_files.contains(&file_id)
    }

    /// Next referenced document still to be parsed
    pub fn next_pending_file(&mut self) -> Option<FileId> {
        self.pending_files.pop_front()
    }

    /// Whether the writer asked for an object kind
    pub fn wants(&self, flags: ObjectFlags) -> bool {
        self.config.object_flags().intersects(flags)
    }

    /// Context of the current event
    pub fn error_context(&self) -> ErrorContext {
        let mut context = ErrorContext::new()
            .line(self.location.line)
            .column(self.location.column);
        if let Some(uri) = self.registry.file_uri(self.file_id) {
            context = context.file(uri.to_string());
        }
        context
    }

    /// Report a problem at the current position
    ///
    /// Returns whether loading may continue.
    pub fn report(&mut self, severity: Severity, error: &Error) -> bool {
        let context = self.error_context();
        self.report_with_context(severity, error, context)
    }

    /// Report a problem found away from the current position
    pub fn report_with_context(
        &mut self,
        severity: Severity,
        error: &Error,
        context: ErrorContext,
    ) -> bool {
        let report = ParserError::new(severity, error, context);
        tracing::trace!(code = %report.code, "reporting {}", report.message);
        let keep_going = self.handler.handle_error(&report);
        keep_going && severity != Severity::Critical
    }

    /// Report a problem, turning a stop request into [`Error::Aborted`]
    pub fn report_or_abort(&mut self, severity: Severity, error: &Error) -> Result<()> {
        if self.report(severity, error) {
            Ok(())
        } else {
            Err(Error::Aborted(error.to_string()))
        }
    }

    /// [`Self::report_or_abort`] with a hint for the reader
    pub fn report_hinted(&mut self, severity: Severity, error: &Error, hint: &str) -> Result<()> {
        let context = self.error_context().hint(hint);
        if self.report_with_context(severity, error, context) {
            Ok(())
        } else {
            Err(Error::Aborted(error.to_string()))
        }
    }

    /// Resolve a reference against the current document
    pub fn resolve(&self, reference: &str) -> Result<Url> {
        self.registry.resolve(self.file_id, reference)
    }

    /// Queue the document of `uri` if it is another one and may be loaded
    pub fn note_reference(&mut self, uri: &Url) {
        let file_id = self.registry.get_or_create_file_id(uri);
        if file_id != self.file_id
            && self.config.external_references()
            && self.queued_files.insert(file_id)
        {
            tracing::debug!(%uri, "queued referenced document");
            self.pending_files.push_back(file_id);
        }
    }

    /// Id a reference points at, checked for existence after loading
    ///
    /// A reference naming an element of another kind is reported and
    /// yields [`UniqueId::INVALID`].
    pub fn id_for_reference(
        &mut self,
        reference: &str,
        class_id: ClassId,
        element: &'static str,
    ) -> Result<UniqueId> {
        let uri = match self.resolve(reference) {
            Ok(uri) => uri,
            Err(err) => {
                self.report_or_abort(Severity::Error, &err)?;
                return Ok(UniqueId::INVALID);
            }
        };
        self.note_reference(&uri);
        match self.registry.get_or_create_id(&uri, class_id) {
            Ok(id) => {
                self.store.pending_references.push(PendingReference {
                    element,
                    uri,
                    context: self.error_context(),
                });
                Ok(id)
            }
            Err(err) => {
                self.report_hinted(Severity::Error, &err, CLASS_MISMATCH_HINT)?;
                Ok(UniqueId::INVALID)
            }
        }
    }

    /// Record a reference that is only checked for existence
    pub fn expect_reference(&mut self, reference: &str, element: &'static str) -> Result<Url> {
        let uri = self.resolve(reference)?;
        self.note_reference(&uri);
        self.store.pending_references.push(PendingReference {
            element,
            uri: uri.clone(),
            context: self.error_context(),
        });
        Ok(uri)
    }

    /// Define the object of an element, keyed by its `id` if it has one
    ///
    /// Also makes the element's sid node stand for the object.
    pub fn define_object(&mut self, start: &ElementStart<'_>, class_id: ClassId) -> Result<UniqueId> {
        let id = match start.attr("id") {
            Some(raw) => {
                let uri = self.resolve(&format!("#{}", raw))?;
                match self.registry.get_or_create_id(&uri, class_id) {
                    Ok(id) if self.registry.is_defined(id) => {
                        self.report_hinted(
                            Severity::Error,
                            &Error::DuplicateId(raw.to_string()),
                            "ids must be unique within a document; references reach the first element",
                        )?;
                        self.registry.create_anonymous_id(class_id, self.file_id)
                    }
                    Ok(id) => id,
                    Err(err) => {
                        self.report_hinted(Severity::Error, &err, CLASS_MISMATCH_HINT)?;
                        self.registry.create_anonymous_id(class_id, self.file_id)
                    }
                }
            }
            None => self.registry.create_anonymous_id(class_id, self.file_id),
        };
        self.registry.define(id);
        if let Some(node) = start.sid_node {
            self.sid_tree.set_target(node, SidTarget::Object(id));
        }
        Ok(id)
    }

    /// Check a writer answer and count the object
    pub fn check_written(&mut self, ok: bool, what: &str) -> Result<()> {
        if ok {
            self.objects_written += 1;
            Ok(())
        } else {
            Err(Error::WriterFailed(what.to_string()))
        }
    }
}

/// Build the parser for an element
pub(crate) fn create_parser(
    kind: ElementKind,
    start: &ElementStart<'_>,
    ctx: &mut LoadContext<'_>,
) -> Result<Box<dyn ElementParser>> {
    use ElementKind as K;
    Ok(match kind {
        K::Collada => Box::new(document::ColladaParser::new(start, ctx)),
        K::LibraryGeometries
        | K::LibraryControllers
        | K::LibraryAnimations
        | K::LibraryMaterials
        | K::LibraryEffects
        | K::LibraryImages
        | K::LibraryCameras
        | K::LibraryLights
        | K::LibraryVisualScenes
        | K::LibraryFormulas
        | K::LibraryKinematicsModels
        | K::LibraryKinematicsScenes
        | K::Extra
        | K::Skip => Box::new(common::IgnoreParser),
        K::SceneRoot => Box::new(document::SceneParser::default()),
        K::InstanceVisualScene => Box::new(document::InstanceVisualSceneParser::new(start, ctx)?),
        K::InstanceKinematicsScene => {
            Box::new(document::InstanceKinematicsSceneParser::new(start, ctx)?)
        }
        K::BindJointAxis => Box::new(document::BindJointAxisParser::new(start)?),
        K::BindAxis => Box::new(document::BindAxisParser::default()),
        K::BindValue => Box::new(common::PassThroughParser::default()),
        K::Asset => Box::new(document::AssetParser::default()),
        K::Contributor => Box::new(document::ContributorParser::default()),
        K::Unit => Box::new(document::UnitParser::new(start)?),
        K::TextField => Box::new(common::TextFieldParser::new(start)),
        K::Source => Box::new(source::SourceParser::new(start)?),
        K::FloatArray | K::NameArray | K::IntArray | K::BoolArray => {
            Box::new(source::ArrayParser::new(kind, start)?)
        }
        K::SourceTechniqueCommon => Box::new(common::PassThroughParser::default()),
        K::Accessor => Box::new(source::AccessorParser::new(start)?),
        K::Param => Box::new(common::ParamParser::new(start)),
        K::Input => Box::new(source::InputParser::new(start)?),
        K::IndexArray => Box::new(source::IndexArrayParser::new(start)),
        K::Geometry => Box::new(geometry::GeometryParser::new(start, ctx)?),
        K::Mesh => Box::new(geometry::MeshParser::default()),
        K::Vertices => Box::new(geometry::VerticesParser::new(start)?),
        K::Primitive => Box::new(geometry::PrimitiveParser::new(start)?),
        K::Controller => Box::new(controller::ControllerParser::new(start, ctx)?),
        K::Skin => Box::new(controller::SkinParser::new(start, ctx)?),
        K::Joints | K::Targets => Box::new(controller::InputSetParser::new(kind)),
        K::VertexWeights => Box::new(controller::VertexWeightsParser::new(start)?),
        K::Morph => Box::new(controller::MorphParser::new(start, ctx)?),
        K::Animation => Box::new(animation::AnimationParser::default()),
        K::Sampler => Box::new(animation::SamplerParser::new(start, ctx)?),
        K::Channel => Box::new(animation::ChannelParser::new(start)?),
        K::Material => Box::new(material::MaterialParser::new(start, ctx)?),
        K::InstanceEffect => Box::new(material::InstanceEffectParser::new(start, ctx)?),
        K::Effect => Box::new(material::EffectParser::new(start, ctx)?),
        K::ProfileCommon | K::EffectTechnique => Box::new(common::PassThroughParser::default()),
        K::Shader => Box::new(material::ShaderParser::new(start)),
        K::ShaderParam => Box::new(material::ShaderParamParser::new(start)),
        K::Color => Box::new(common::ColorParser::default()),
        K::FloatValue => Box::new(common::FloatParser::new(start)),
        K::Texture => Box::new(material::TextureParser::new(start)?),
        K::Image => Box::new(material::ImageParser::new(start, ctx)?),
        K::InitFrom => Box::new(material::InitFromParser::default()),
        K::Camera => Box::new(optics::CameraParser::new(start, ctx)?),
        K::Optics | K::OpticsTechniqueCommon => Box::new(common::PassThroughParser::default()),
        K::Projection => Box::new(optics::ProjectionParser::new(start)),
        K::Light => Box::new(optics::LightParser::new(start, ctx)?),
        K::LightTechniqueCommon => Box::new(common::PassThroughParser::default()),
        K::LightType => Box::new(optics::LightTypeParser::new(start)),
        K::VisualScene => Box::new(scene::VisualSceneParser::new(start, ctx)?),
        K::LibraryNodes => Box::new(scene::LibraryNodesParser::new(ctx)),
        K::Node => Box::new(scene::NodeParser::new(start, ctx)?),
        K::Transform => Box::new(scene::TransformParser::new(start)),
        K::InstanceGeometry => Box::new(scene::InstanceGeometryParser::new(start, ctx)?),
        K::InstanceController => Box::new(scene::InstanceControllerParser::new(start, ctx)?),
        K::InstanceSimple => Box::new(scene::InstanceSimpleParser::new(start, ctx)?),
        K::BindMaterial => Box::new(common::PassThroughParser::default()),
        K::BindMaterialTechniqueCommon => Box::new(scene::MaterialBindingsParser::default()),
        K::InstanceMaterial => Box::new(scene::InstanceMaterialParser::new(start, ctx)?),
        K::Formula => Box::new(kinematics::FormulaParser::new(start, ctx)?),
        K::FormulaNewparam => Box::new(kinematics::FormulaNewparamParser::new(start)?),
        K::FormulaTarget => Box::new(kinematics::FormulaTargetParser::default()),
        K::FormulaTechnique => Box::new(common::PassThroughParser::default()),
        K::Math => Box::new(kinematics::MathParser::new(start)),
        K::KinematicsModel => Box::new(kinematics::KinematicsModelParser::new(start, ctx)?),
        K::KinematicsModelTechniqueCommon => Box::new(kinematics::JointListParser::default()),
        K::Joint => Box::new(kinematics::JointParser::new(start, ctx)?),
        K::JointPrimitive => Box::new(kinematics::JointPrimitiveParser::new(start)?),
        K::Limits => Box::new(kinematics::LimitsParser::default()),
        K::KinematicsScene => Box::new(kinematics::KinematicsSceneParser::new(start, ctx)?),
        K::InstanceKinematicsModel => {
            Box::new(kinematics::InstanceKinematicsModelParser::new(start, ctx)?)
        }
    })
}

/// Writer flags and id class of kinds that are only parsed when requested
fn requested_by(kind: ElementKind) -> Option<(ObjectFlags, Option<ClassId>)> {
    use ElementKind as K;
    Some(match kind {
        K::Geometry => (ObjectFlags::GEOMETRY, Some(ClassId::Geometry)),
        K::Controller => (
            ObjectFlags::CONTROLLER | ObjectFlags::SKIN_CONTROLLER_DATA,
            Some(ClassId::Controller),
        ),
        K::Animation => (ObjectFlags::ANIMATION | ObjectFlags::ANIMATION_LIST, None),
        K::Material => (ObjectFlags::MATERIAL, Some(ClassId::Material)),
        K::Effect => (ObjectFlags::EFFECT, Some(ClassId::Effect)),
        K::Image => (ObjectFlags::IMAGE, Some(ClassId::Image)),
        K::Camera => (ObjectFlags::CAMERA, Some(ClassId::Camera)),
        K::Light => (ObjectFlags::LIGHT, Some(ClassId::Light)),
        K::Formula => (ObjectFlags::FORMULA, Some(ClassId::Formula)),
        K::KinematicsModel => (ObjectFlags::KINEMATICS, Some(ClassId::KinematicsModel)),
        _ => return None,
    })
}

/// One open element
struct Frame {
    kind: ElementKind,
    name: String,
    family: Family,
    parser: Option<Box<dyn ElementParser>>,
    counts: Vec<u32>,
    poisoned: bool,
    sid_node: Option<SidNodeId>,
}

/// SAX handler driving the element parsers of one document
pub(crate) struct Dispatcher<'c, 'a> {
    ctx: &'c mut LoadContext<'a>,
    frames: Vec<Frame>,
    skip_depth: usize,
    root_seen: bool,
    failure: Option<Error>,
}

impl<'c, 'a> Dispatcher<'c, 'a> {
    /// Dispatcher for the current document of `ctx`
    pub fn new(ctx: &'c mut LoadContext<'a>) -> Self {
        Self {
            ctx,
            frames: Vec::new(),
            skip_depth: 0,
            root_seen: false,
            failure: None,
        }
    }

    /// Conclude the document
    ///
    /// Returns the error that stopped parsing, if any. That error has
    /// already been reported.
    pub fn finish(self) -> Option<Error> {
        if self.failure.is_some() {
            return self.failure;
        }
        if !self.root_seen {
            let err = Error::InvalidXml("document has no <COLLADA> element".to_string());
            self.ctx.report(Severity::Critical, &err);
            return Some(err);
        }
        None
    }

    fn policy(&self, family: Family) -> ValidationPolicy {
        self.ctx.config.policy(family)
    }

    /// Report; a stop request from the handler ends parsing
    fn report(&mut self, severity: Severity, error: &Error) -> bool {
        if self.ctx.report(severity, error) {
            true
        } else {
            if self.failure.is_none() {
                self.failure = Some(if severity == Severity::Critical {
                    Error::InvalidXml(error.to_string())
                } else {
                    Error::Aborted(error.to_string())
                });
            }
            false
        }
    }

    /// Mark the nearest enclosing top-level object as poisoned
    fn poison(&mut self) {
        if let Some(frame) = self.frames.iter_mut().rev().find(|f| f.kind.is_top_level()) {
            frame.poisoned = true;
        }
    }

    /// Handle a grammar violation under a family's policy
    fn violation(&mut self, family: Family, error: Error) -> bool {
        match self.policy(family) {
            ValidationPolicy::Open => true,
            ValidationPolicy::Lenient => self.report(Severity::Warning, &error),
            ValidationPolicy::Strict => {
                self.poison();
                self.report(Severity::Error, &error)
            }
        }
    }

    /// Handle an error returned by a parser
    fn parser_failure(&mut self, family: Family, object_id: Option<UniqueId>, error: Error) -> bool {
        if let Some(id) = object_id {
            self.ctx.registry.undefine(id);
        }
        match error {
            Error::Aborted(_) => {
                self.failure = Some(error);
                false
            }
            Error::WriterFailed(_) => {
                self.ctx.report(Severity::Critical, &error);
                self.failure = Some(error);
                false
            }
            error => match self.policy(family) {
                ValidationPolicy::Strict => {
                    self.poison();
                    self.report(Severity::Error, &error)
                }
                ValidationPolicy::Lenient | ValidationPolicy::Open => {
                    self.report(Severity::Warning, &error)
                }
            },
        }
    }

    fn skip_subtree(&mut self) {
        self.skip_depth = 1;
    }

    /// Define the id of an element whose content is not requested
    fn define_unrequested(&mut self, class_id: ClassId, attributes: &[Attribute]) {
        let Some(raw) = attribute(attributes, "id") else {
            return;
        };
        if let Ok(uri) = self.ctx.resolve(&format!("#{}", raw))
            && let Ok(id) = self.ctx.registry.get_or_create_id(&uri, class_id)
        {
            self.ctx.registry.define(id);
        }
    }
}

impl SaxHandler for Dispatcher<'_, '_> {
    fn element_begin(&mut self, name: &str, attributes: &[Attribute], location: Location) -> bool {
        self.ctx.location = location;
        if self.skip_depth > 0 {
            self.skip_depth += 1;
            return true;
        }

        let parent = self.frames.last().map(|f| (f.kind, f.name.clone(), f.family));
        let (rule, family) = match &parent {
            None => {
                if self.root_seen || name != "COLLADA" {
                    let err = Error::InvalidXml(format!(
                        "document element is <{}>, expected <COLLADA>",
                        name
                    ));
                    self.ctx.report(Severity::Critical, &err);
                    self.failure = Some(err);
                    return false;
                }
                self.root_seen = true;
                (root_rule(), Family::Document)
            }
            Some((parent_kind, parent_name, parent_family)) => {
                let Some((index, rule)) = child_rule(*parent_kind, name) else {
                    let err = Error::UnexpectedElement {
                        parent: parent_name.clone(),
                        element: name.to_string(),
                    };
                    self.skip_subtree();
                    return self.violation(*parent_family, err);
                };

                let count = match self.frames.last_mut() {
                    Some(frame) => {
                        frame.counts[index] += 1;
                        frame.counts[index]
                    }
                    None => 1,
                };
                if rule.kind == ElementKind::Skip {
                    self.skip_subtree();
                    return true;
                }
                if count > rule.max {
                    let err = Error::Cardinality(format!(
                        "<{}> allows at most {} <{}>",
                        parent_name, rule.max, name
                    ));
                    self.skip_subtree();
                    return self.violation(*parent_family, err);
                }
                (rule, rule.kind.family().unwrap_or(*parent_family))
            }
        };

        let mut drop_element = false;
        for issue in validate_attributes(rule, attributes) {
            let keep_going = match issue {
                AttributeIssue::Unknown(attr) => {
                    if self.policy(family) == ValidationPolicy::Open {
                        true
                    } else {
                        self.report(
                            Severity::Warning,
                            &Error::UnknownAttribute {
                                element: name.to_string(),
                                attribute: attr,
                            },
                        )
                    }
                }
                AttributeIssue::Missing(attr) => {
                    drop_element = true;
                    self.violation(family, Error::missing_attribute(name, attr))
                }
                AttributeIssue::Malformed {
                    name: attr,
                    value,
                    expected,
                } => {
                    drop_element = true;
                    self.violation(
                        family,
                        Error::parse_error_with_context(
                            &format!("{}@{}", name, attr),
                            &value,
                            &format!("{:?}", expected).to_lowercase(),
                        ),
                    )
                }
            };
            if !keep_going {
                return false;
            }
        }
        // The document element is parsed even with broken attributes
        if drop_element && parent.is_some() {
            self.skip_subtree();
            return true;
        }

        if let Some((flags, class_id)) = requested_by(rule.kind)
            && !self.ctx.wants(flags)
        {
            if let Some(class_id) = class_id {
                self.define_unrequested(class_id, attributes);
            }
            self.skip_subtree();
            return true;
        }

        let id = attribute(attributes, "id");
        let sid = attribute(attributes, "sid");
        let sid_node = if id.is_some() || sid.is_some() {
            let scope = self.frames.iter().rev().find_map(|f| f.sid_node);
            Some(self.ctx.sid_tree.create_node(scope, self.ctx.file_id, id, sid))
        } else {
            None
        };

        let start = ElementStart {
            name,
            attributes,
            sid_node,
        };
        let parser = match create_parser(rule.kind, &start, self.ctx) {
            Ok(parser) => parser,
            Err(err) => {
                self.skip_subtree();
                return self.parser_failure(family, None, err);
            }
        };

        self.frames.push(Frame {
            kind: rule.kind,
            name: name.to_string(),
            family,
            parser: Some(parser),
            counts: vec![0; rule.kind.children().len()],
            poisoned: false,
            sid_node,
        });
        true
    }

    fn element_end(&mut self, _name: &str, location: Location) -> bool {
        self.ctx.location = location;
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return true;
        }

        let missing: Vec<Error> = match self.frames.last() {
            Some(frame) => frame
                .kind
                .children()
                .iter()
                .zip(&frame.counts)
                .filter(|(rule, count)| **count < rule.min)
                .map(|(rule, count)| {
                    Error::Cardinality(format!(
                        "<{}> requires at least {} <{}>, found {}",
                        frame.name, rule.min, rule.name, count
                    ))
                })
                .collect(),
            None => return true,
        };
        if let Some(family) = self.frames.last().map(|f| f.family) {
            for err in missing {
                if !self.violation(family, err) {
                    return false;
                }
            }
        }

        let Some(frame) = self.frames.pop() else {
            return true;
        };
        let Some(parser) = frame.parser else {
            return true;
        };
        let object_id = parser.object_id();
        if frame.poisoned {
            if let Some(id) = object_id {
                self.ctx.registry.undefine(id);
            }
            tracing::debug!(element = %frame.name, "dropped after validation errors");
            return true;
        }

        let parsed = match parser.finish(self.ctx) {
            Ok(parsed) => parsed,
            Err(err) => return self.parser_failure(frame.family, object_id, err),
        };
        if matches!(parsed, Parsed::None) {
            return true;
        }

        let attached = match self.frames.last_mut() {
            Some(parent) => match parent.parser.as_mut() {
                Some(parent_parser) => {
                    let parent_id = parent_parser.object_id();
                    match parent_parser.attach(parsed, self.ctx) {
                        Ok(()) => Ok(()),
                        Err(err) => {
                            parent.parser = None;
                            Err((parent.family, parent_id, err))
                        }
                    }
                }
                None => Ok(()),
            },
            None => Ok(()),
        };
        match attached {
            Ok(()) => true,
            Err((family, parent_id, err)) => self.parser_failure(family, parent_id, err),
        }
    }

    fn text_data(&mut self, text: &str, location: Location) -> bool {
        self.ctx.location = location;
        if self.skip_depth > 0 {
            return true;
        }
        let failed = match self.frames.last_mut() {
            Some(frame) => match frame.parser.as_mut() {
                Some(parser) => match parser.text(text, self.ctx) {
                    Ok(()) => None,
                    Err(err) => {
                        let id = parser.object_id();
                        frame.parser = None;
                        Some((frame.family, id, err))
                    }
                },
                None => None,
            },
            None => None,
        };
        match failed {
            Some((family, id, err)) => self.parser_failure(family, id, err),
            None => true,
        }
    }

    fn parser_error(&mut self, error: Error, severity: Severity, location: Location) -> bool {
        self.ctx.location = location;
        let keep_going = self.ctx.report(severity, &error);
        if severity == Severity::Critical {
            self.failure = Some(error);
            return false;
        }
        if !keep_going {
            self.failure = Some(Error::Aborted(error.to_string()));
        }
        keep_going
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, ErrorCollector};
    use crate::sax::parse_bytes;
    use crate::writer::DocumentCollector;

    fn run(xml: &str, config: &LoaderConfig) -> (DocumentCollector, ErrorCollector, bool) {
        let mut writer = DocumentCollector::new();
        let mut errors = ErrorCollector::new();
        let ok = {
            let mut ctx = LoadContext::new(config, &mut writer, &mut errors);
            let file = ctx
                .registry
                .get_or_create_file_id(&Url::parse("file:///test/doc.dae").unwrap());
            ctx.begin_file(file, true);
            let mut dispatcher = Dispatcher::new(&mut ctx);
            let parsed = parse_bytes(xml.as_bytes(), &mut dispatcher);
            parsed && dispatcher.finish().is_none()
        };
        (writer, errors, ok)
    }

    const TRIANGLE: &str = r##"<COLLADA version="1.4.1">
<asset/>
<library_geometries>
  <geometry id="tri">
    <mesh>
      <source id="pos">
        <float_array id="pos-array" count="9">0 0 0 1 0 0 0 1 0</float_array>
        <technique_common>
          <accessor source="#pos-array" count="3" stride="3">
            <param name="X" type="float"/><param name="Y" type="float"/><param name="Z" type="float"/>
          </accessor>
        </technique_common>
      </source>
      <vertices id="verts"><input semantic="POSITION" source="#pos"/></vertices>
      <triangles count="1"><input semantic="VERTEX" source="#verts" offset="0"/><p>0 1 2</p></triangles>
    </mesh>
  </geometry>
</library_geometries>
</COLLADA>"##;

    #[test]
    fn test_triangle_geometry_is_written() {
        let (writer, errors, ok) = run(TRIANGLE, &LoaderConfig::new());
        assert!(ok);
        assert!(errors.errors().is_empty(), "{:?}", errors.errors());
        assert_eq!(writer.geometries.len(), 1);
        let mesh = writer.geometries[0].mesh.as_ref().unwrap();
        assert_eq!(mesh.positions.len(), 3);
        assert_eq!(mesh.primitives[0].position_indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_unknown_element_in_strict_family_drops_object() {
        let xml = TRIANGLE.replace("<mesh>", "<mesh><bogus/>");
        let (writer, errors, ok) = run(&xml, &LoaderConfig::new());
        assert!(ok);
        assert!(writer.geometries.is_empty());
        let reported: Vec<_> = errors.with_code(ErrorCode::UnexpectedElement).collect();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].severity, Severity::Error);
    }

    #[test]
    fn test_lenient_override_keeps_object() {
        let xml = TRIANGLE.replace("<mesh>", "<mesh><bogus/>");
        let config = LoaderConfig::new().with_policy(Family::Geometry, ValidationPolicy::Lenient);
        let (writer, errors, _) = run(&xml, &config);
        assert_eq!(writer.geometries.len(), 1);
        assert_eq!(errors.with_severity(Severity::Warning).count(), 1);
    }

    #[test]
    fn test_unknown_element_in_lenient_family_is_warning() {
        let xml = r#"<COLLADA version="1.4.1"><asset><bogus/></asset></COLLADA>"#;
        let (_, errors, ok) = run(xml, &LoaderConfig::new());
        assert!(ok);
        assert_eq!(errors.errors().len(), 1);
        assert_eq!(errors.errors()[0].severity, Severity::Warning);
    }

    #[test]
    fn test_extra_content_is_silent() {
        let xml = r#"<COLLADA version="1.4.1"><asset/><extra><technique profile="x"><anything a="1"><deep/></anything></technique></extra></COLLADA>"#;
        let (_, errors, ok) = run(xml, &LoaderConfig::new());
        assert!(ok);
        assert!(errors.errors().is_empty());
    }

    #[test]
    fn test_unknown_attribute_is_warning() {
        let xml = r#"<COLLADA version="1.4.1" color="blue"><asset/></COLLADA>"#;
        let (_, errors, ok) = run(xml, &LoaderConfig::new());
        assert!(ok);
        let warnings: Vec<_> = errors.with_code(ErrorCode::UnknownAttribute).collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, Severity::Warning);
    }

    #[test]
    fn test_missing_required_child_is_reported() {
        let xml = r#"<COLLADA version="1.4.1"></COLLADA>"#;
        let (_, errors, _) = run(xml, &LoaderConfig::new());
        assert_eq!(errors.with_code(ErrorCode::Cardinality).count(), 1);
    }

    #[test]
    fn test_wrong_root_is_critical() {
        let xml = r#"<model/>"#;
        let (_, errors, ok) = run(xml, &LoaderConfig::new());
        assert!(!ok);
        assert_eq!(errors.errors().len(), 1);
        assert_eq!(errors.errors()[0].severity, Severity::Critical);
    }

    #[test]
    fn test_unrequested_kind_is_skipped() {
        let config = LoaderConfig::new().with_object_flags(ObjectFlags::MATERIAL);
        let (writer, errors, ok) = run(TRIANGLE, &config);
        assert!(ok);
        assert!(errors.errors().is_empty());
        assert!(writer.geometries.is_empty());
    }

    #[test]
    fn test_handler_stop_aborts() {
        let xml = r#"<COLLADA version="1.4.1"><asset><bogus/></asset><asset/></COLLADA>"#;
        let config = LoaderConfig::new();
        let mut writer = DocumentCollector::new();
        let mut calls = 0;
        let mut handler = |_: &ParserError| {
            calls += 1;
            false
        };
        let failure = {
            let mut ctx = LoadContext::new(&config, &mut writer, &mut handler);
            let file = ctx
                .registry
                .get_or_create_file_id(&Url::parse("file:///test/doc.dae").unwrap());
            ctx.begin_file(file, true);
            let mut dispatcher = Dispatcher::new(&mut ctx);
            assert!(!parse_bytes(xml.as_bytes(), &mut dispatcher));
            dispatcher.finish()
        };
        assert!(matches!(failure, Some(Error::Aborted(_))));
        assert_eq!(calls, 1);
    }
}
