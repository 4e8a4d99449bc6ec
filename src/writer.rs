//! Output side of the loader
//!
//! A [`Writer`] receives every finished object exactly once, by value.
//! Returning `false` from any method stops loading; the loader then calls
//! [`Writer::cancel`] and [`Writer::finish`] is never reached.
//!
//! Within one document, objects arrive in document order. Visual scenes,
//! library nodes, formulas, kinematics scenes, skin controllers and
//! animation lists arrive after every document has been read, because they
//! can only be completed once all references are known.

use crate::model::{
    AnimationCurve, AnimationList, Asset, Camera, Controller, Effect, Formula, Geometry, Image,
    KinematicsModel, KinematicsScene, LibraryNodes, Light, Material, Scene, SkinControllerData,
    VisualScene,
};

/// Consumer of loaded objects
///
/// Every method has a default that accepts and drops the object, so a
/// writer only implements what it cares about.
#[allow(unused_variables)]
pub trait Writer {
    /// Loading begins
    fn start(&mut self) -> bool {
        true
    }

    /// `<asset>` of the root document
    fn write_global_asset(&mut self, asset: Asset) -> bool {
        true
    }

    /// `<scene>` of the root document
    fn write_scene(&mut self, scene: Scene) -> bool {
        true
    }

    /// A visual scene with all bindings complete
    fn write_visual_scene(&mut self, visual_scene: VisualScene) -> bool {
        true
    }

    /// A `<library_nodes>` with all bindings complete
    fn write_library_nodes(&mut self, library_nodes: LibraryNodes) -> bool {
        true
    }

    /// A geometry
    fn write_geometry(&mut self, geometry: Geometry) -> bool {
        true
    }

    /// A material
    fn write_material(&mut self, material: Material) -> bool {
        true
    }

    /// An effect
    fn write_effect(&mut self, effect: Effect) -> bool {
        true
    }

    /// A camera
    fn write_camera(&mut self, camera: Camera) -> bool {
        true
    }

    /// A light
    fn write_light(&mut self, light: Light) -> bool {
        true
    }

    /// An image
    fn write_image(&mut self, image: Image) -> bool {
        true
    }

    /// An animation curve
    fn write_animation(&mut self, animation: AnimationCurve) -> bool {
        true
    }

    /// Curves bound to one animated transformation
    fn write_animation_list(&mut self, animation_list: AnimationList) -> bool {
        true
    }

    /// Skin data shared by skin controllers
    fn write_skin_controller_data(&mut self, data: SkinControllerData) -> bool {
        true
    }

    /// A skin or morph controller
    fn write_controller(&mut self, controller: Controller) -> bool {
        true
    }

    /// A formula
    fn write_formula(&mut self, formula: Formula) -> bool {
        true
    }

    /// A kinematics model
    fn write_kinematics_model(&mut self, model: KinematicsModel) -> bool {
        true
    }

    /// A kinematics scene with its axis bindings
    fn write_kinematics_scene(&mut self, scene: KinematicsScene) -> bool {
        true
    }

    /// Loading completed
    fn finish(&mut self) -> bool {
        true
    }

    /// Loading was abandoned
    ///
    /// Always preceded by `start`. Comes instead of `finish`, or after a
    /// `finish` that returned `false`.
    fn cancel(&mut self, message: &str) {}
}

/// Writer keeping every object in memory
#[derive(Debug, Default)]
pub struct DocumentCollector {
    /// Global asset
    pub asset: Option<Asset>,
    /// Root scene
    pub scene: Option<Scene>,
    /// Visual scenes
    pub visual_scenes: Vec<VisualScene>,
    /// Library nodes
    pub library_nodes: Vec<LibraryNodes>,
    /// Geometries
    pub geometries: Vec<Geometry>,
    /// Materials
    pub materials: Vec<Material>,
    /// Effects
    pub effects: Vec<Effect>,
    /// Cameras
    pub cameras: Vec<Camera>,
    /// Lights
    pub lights: Vec<Light>,
    /// Images
    pub images: Vec<Image>,
    /// Animation curves
    pub animations: Vec<AnimationCurve>,
    /// Animation lists
    pub animation_lists: Vec<AnimationList>,
    /// Skin controller data
    pub skin_controller_data: Vec<SkinControllerData>,
    /// Skin and morph controllers
    pub controllers: Vec<Controller>,
    /// Formulas
    pub formulas: Vec<Formula>,
    /// Kinematics models
    pub kinematics_models: Vec<KinematicsModel>,
    /// Kinematics scenes
    pub kinematics_scenes: Vec<KinematicsScene>,
    /// Whether `start` was called
    pub started: bool,
    /// Whether `finish` was called
    pub finished: bool,
    /// Message passed to `cancel`
    pub cancelled: Option<String>,
}

impl DocumentCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }
}

impl Writer for DocumentCollector {
    fn write_global_asset(&mut self, asset: Asset) -> bool {
        self.asset = Some(asset);
        true
    }

    fn write_scene(&mut self, scene: Scene) -> bool {
        self.scene = Some(scene);
        true
    }

    fn write_visual_scene(&mut self, visual_scene: VisualScene) -> bool {
        self.visual_scenes.push(visual_scene);
        true
    }

    fn write_library_nodes(&mut self, library_nodes: LibraryNodes) -> bool {
        self.library_nodes.push(library_nodes);
        true
    }

    fn write_geometry(&mut self, geometry: Geometry) -> bool {
        self.geometries.push(geometry);
        true
    }

    fn write_material(&mut self, material: Material) -> bool {
        self.materials.push(material);
        true
    }

    fn write_effect(&mut self, effect: Effect) -> bool {
        self.effects.push(effect);
        true
    }

    fn write_camera(&mut self, camera: Camera) -> bool {
        self.cameras.push(camera);
        true
    }

    fn write_light(&mut self, light: Light) -> bool {
        self.lights.push(light);
        true
    }

    fn write_image(&mut self, image: Image) -> bool {
        self.images.push(image);
        true
    }

    fn write_animation(&mut self, animation: AnimationCurve) -> bool {
        self.animations.push(animation);
        true
    }

    fn write_animation_list(&mut self, animation_list: AnimationList) -> bool {
        self.animation_lists.push(animation_list);
        true
    }

    fn write_skin_controller_data(&mut self, data: SkinControllerData) -> bool {
        self.skin_controller_data.push(data);
        true
    }

    fn write_controller(&mut self, controller: Controller) -> bool {
        self.controllers.push(controller);
        true
    }

    fn write_formula(&mut self, formula: Formula) -> bool {
        self.formulas.push(formula);
        true
    }

    fn write_kinematics_model(&mut self, model: KinematicsModel) -> bool {
        self.kinematics_models.push(model);
        true
    }

    fn write_kinematics_scene(&mut self, scene: KinematicsScene) -> bool {
        self.kinematics_scenes.push(scene);
        true
    }

    fn start(&mut self) -> bool {
        self.started = true;
        true
    }

    fn finish(&mut self) -> bool {
        self.finished = true;
        true
    }

    fn cancel(&mut self, message: &str) {
        self.cancelled = Some(message.to_string());
    }
}
