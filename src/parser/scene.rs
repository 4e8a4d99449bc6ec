//! Visual scenes, library nodes and the node hierarchy
//!
//! Scenes are not written when they close. Skin bindings, material ids and
//! animation lists are filled into their nodes by the post-pass, so the
//! finished scenes are held in the intermediate store until then.

use super::numbers::ListParser;
use super::{ElementParser, ElementStart, LoadContext, Parsed};
use crate::config::ObjectFlags;
use crate::error::{Error, Result};
use crate::intermediate::{InstanceControllerData, InstanceRef};
use crate::model::{
    ClassId, Instance, InstanceController, InstanceGeometry, LibraryNodes, MaterialBinding, Node,
    NodeType, TransformKind, Transformation, UniqueId, VisualScene,
};
use crate::sid_tree::{SidNodeId, SidTarget};
use url::Url;

pub(crate) struct VisualSceneParser {
    scene: VisualScene,
}

impl VisualSceneParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        Ok(Self {
            scene: VisualScene {
                unique_id: ctx.define_object(start, ClassId::VisualScene)?,
                original_id: start.attr_string("id"),
                name: start.attr_string("name"),
                root_nodes: Vec::new(),
            },
        })
    }
}

impl ElementParser for VisualSceneParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::Node(node) = child {
            self.scene.root_nodes.push(node);
        }
        Ok(())
    }

    fn finish(self: Box<Self>, ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        if ctx.wants(ObjectFlags::VISUAL_SCENE) {
            ctx.store.visual_scenes.push(self.scene);
        }
        Ok(Parsed::None)
    }

    fn object_id(&self) -> Option<UniqueId> {
        Some(self.scene.unique_id)
    }
}

pub(crate) struct LibraryNodesParser {
    library: LibraryNodes,
}

impl LibraryNodesParser {
    pub fn new(ctx: &mut LoadContext<'_>) -> Self {
        Self {
            library: LibraryNodes {
                unique_id: ctx
                    .registry
                    .create_anonymous_id(ClassId::LibraryNodes, ctx.file_id),
                nodes: Vec::new(),
            },
        }
    }
}

impl ElementParser for LibraryNodesParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::Node(node) = child {
            self.library.nodes.push(node);
        }
        Ok(())
    }

    fn finish(self: Box<Self>, ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        if ctx.wants(ObjectFlags::LIBRARY_NODES) {
            ctx.store.library_nodes.push(self.library);
        }
        Ok(Parsed::None)
    }
}

pub(crate) struct NodeParser {
    node: Node,
}

impl NodeParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        let mut node = Node::new(ctx.define_object(start, ClassId::Node)?);
        node.original_id = start.attr_string("id");
        node.sid = start.attr_string("sid");
        node.name = start.attr_string("name");
        node.node_type = match start.attr("type").map(str::trim) {
            Some("JOINT") => NodeType::Joint,
            _ => NodeType::Node,
        };
        Ok(Self { node })
    }
}

impl ElementParser for NodeParser {
    fn attach(&mut self, child: Parsed, ctx: &mut LoadContext<'_>) -> Result<()> {
        let node = &mut self.node;
        match child {
            Parsed::Transform {
                transformation,
                sid_node,
            } => {
                if let Some(sid_node) = sid_node {
                    ctx.sid_tree.set_target(
                        sid_node,
                        SidTarget::Transformation {
                            node: node.unique_id,
                            index: node.transformations.len(),
                        },
                    );
                }
                node.transformations.push(transformation);
            }
            Parsed::InstanceGeometry(instance) => node.instance_geometries.push(instance),
            Parsed::InstanceController {
                instance,
                skeleton_roots,
            } => {
                let data = InstanceControllerData {
                    skeleton_roots,
                    instance: InstanceRef {
                        node: node.unique_id,
                        index: node.instance_controllers.len(),
                    },
                    context: ctx.error_context(),
                };
                ctx.store.add_instance_controller(instance.controller, data);
                node.instance_controllers.push(instance);
            }
            Parsed::Instance { element, instance } => match element.as_str() {
                "instance_camera" => node.instance_cameras.push(instance),
                "instance_light" => node.instance_lights.push(instance),
                _ => node.instance_nodes.push(instance),
            },
            Parsed::Node(child) => node.children.push(child),
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Node(self.node))
    }

    fn object_id(&self) -> Option<UniqueId> {
        Some(self.node.unique_id)
    }
}

/// `<matrix>`, `<translate>`, `<rotate>`, `<scale>`, `<lookat>`, `<skew>`
pub(crate) struct TransformParser {
    element: &'static str,
    sid: Option<String>,
    sid_node: Option<SidNodeId>,
    values: ListParser<f64>,
}

impl TransformParser {
    pub fn new(start: &ElementStart<'_>) -> Self {
        let element = match start.name {
            "matrix" => "matrix",
            "translate" => "translate",
            "rotate" => "rotate",
            "scale" => "scale",
            "lookat" => "lookat",
            _ => "skew",
        };
        Self {
            element,
            sid: start.attr_string("sid"),
            sid_node: start.sid_node,
            values: ListParser::with_capacity(element, 16),
        }
    }
}

fn fixed<const N: usize>(element: &str, values: &[f64]) -> Result<[f64; N]> {
    values.try_into().map_err(|_| {
        Error::InvalidModel(format!(
            "<{}> holds {} values, expected {}",
            element,
            values.len(),
            N
        ))
    })
}

impl ElementParser for TransformParser {
    fn text(&mut self, text: &str, _ctx: &mut LoadContext<'_>) -> Result<()> {
        self.values.feed(text)
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        let element = self.element;
        let values = self.values.finish()?;
        let kind = match element {
            "matrix" => TransformKind::Matrix(fixed(element, &values)?),
            "translate" => TransformKind::Translate(fixed(element, &values)?),
            "rotate" => {
                let [x, y, z, angle] = fixed::<4>(element, &values)?;
                TransformKind::Rotate {
                    axis: [x, y, z],
                    angle,
                }
            }
            "scale" => TransformKind::Scale(fixed(element, &values)?),
            "lookat" => TransformKind::Lookat(fixed(element, &values)?),
            _ => TransformKind::Skew(fixed(element, &values)?),
        };
        Ok(Parsed::Transform {
            transformation: Transformation {
                kind,
                sid: self.sid,
                animation_list: None,
            },
            sid_node: self.sid_node,
        })
    }
}

pub(crate) struct InstanceGeometryParser {
    instance: InstanceGeometry,
}

impl InstanceGeometryParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        let url = start.required("url")?;
        Ok(Self {
            instance: InstanceGeometry {
                geometry: ctx.id_for_reference(url, ClassId::Geometry, "instance_geometry")?,
                name: start.attr_string("name"),
                material_bindings: Vec::new(),
            },
        })
    }
}

impl ElementParser for InstanceGeometryParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::MaterialBindings(bindings) = child {
            self.instance.material_bindings = bindings;
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::InstanceGeometry(self.instance))
    }
}

pub(crate) struct InstanceControllerParser {
    instance: InstanceController,
    skeleton_roots: Vec<Url>,
}

impl InstanceControllerParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        let url = start.required("url")?;
        Ok(Self {
            instance: InstanceController {
                controller: ctx.id_for_reference(url, ClassId::Controller, "instance_controller")?,
                name: start.attr_string("name"),
                skeleton_roots: Vec::new(),
                material_bindings: Vec::new(),
            },
            skeleton_roots: Vec::new(),
        })
    }
}

impl ElementParser for InstanceControllerParser {
    fn attach(&mut self, child: Parsed, ctx: &mut LoadContext<'_>) -> Result<()> {
        match child {
            Parsed::Text { name, value } if name == "skeleton" => {
                let uri = ctx.resolve(&value)?;
                self.instance.skeleton_roots.push(value);
                self.skeleton_roots.push(uri);
            }
            Parsed::MaterialBindings(bindings) => self.instance.material_bindings = bindings,
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::InstanceController {
            instance: self.instance,
            skeleton_roots: self.skeleton_roots,
        })
    }
}

/// `<instance_camera>`, `<instance_light>`, `<instance_node>`
pub(crate) struct InstanceSimpleParser {
    element: String,
    instance: Instance,
}

impl InstanceSimpleParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        let (class_id, element) = match start.name {
            "instance_camera" => (ClassId::Camera, "instance_camera"),
            "instance_light" => (ClassId::Light, "instance_light"),
            _ => (ClassId::Node, "instance_node"),
        };
        let url = start.required("url")?;
        let target = ctx.id_for_reference(url, class_id, element)?;
        if class_id == ClassId::Node
            && let Some(sid_node) = start.sid_node
        {
            let uri = ctx.resolve(url)?;
            if let Some(id) = crate::registry::fragment_id(&uri) {
                let file_id = ctx.registry.get_or_create_file_id(&uri);
                ctx.sid_tree.link_instance(sid_node, file_id, &id);
            }
        }
        Ok(Self {
            element: element.to_string(),
            instance: Instance {
                target,
                name: start.attr_string("name"),
            },
        })
    }
}

impl ElementParser for InstanceSimpleParser {
    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Instance {
            element: self.element,
            instance: self.instance,
        })
    }
}

/// `<technique_common>` of `<bind_material>`
#[derive(Default)]
pub(crate) struct MaterialBindingsParser {
    bindings: Vec<MaterialBinding>,
}

impl ElementParser for MaterialBindingsParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::MaterialBinding(binding) = child {
            self.bindings.push(binding);
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::MaterialBindings(self.bindings))
    }
}

pub(crate) struct InstanceMaterialParser {
    binding: MaterialBinding,
}

impl InstanceMaterialParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        let symbol = start.required("symbol")?.to_string();
        let target = start.required("target")?;
        Ok(Self {
            binding: MaterialBinding {
                symbol,
                material: ctx.id_for_reference(target, ClassId::Material, "instance_material")?,
                material_id: None,
            },
        })
    }
}

impl ElementParser for InstanceMaterialParser {
    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::MaterialBinding(self.binding))
    }
}
