//! Formulas, kinematics models and kinematics scenes
//!
//! Kinematics models are written when they close. Formulas and kinematics
//! scenes wait for the post-pass: formulas reference each other through
//! MathML `csymbol` URLs, and scenes receive the axis bindings of the
//! `<instance_kinematics_scene>` that instantiates them.

use super::numbers::{parse_fixed, parse_float};
use super::{ElementParser, ElementStart, LoadContext, Parsed};
use crate::config::ObjectFlags;
use crate::error::{Error, Result};
use crate::intermediate::PendingFormula;
use crate::model::{
    ClassId, Formula, FormulaParameter, Joint, JointPrimitive, JointPrimitiveKind,
    KinematicsModel, KinematicsScene, UniqueId,
};
use crate::registry::fragment_id;
use crate::sid_tree::{SidNodeId, SidTarget};
use url::Url;

/// `<bind_joint_axis>` content
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct JointAxisParsed {
    pub target: String,
    pub axis: String,
    pub value: Option<f64>,
}

pub(crate) struct FormulaParser {
    formula: Formula,
    references: Vec<Url>,
}

impl FormulaParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        Ok(Self {
            formula: Formula {
                unique_id: ctx.define_object(start, ClassId::Formula)?,
                original_id: start.attr_string("id"),
                name: start.attr_string("name"),
                parameters: Vec::new(),
                target: None,
                referenced_formulas: Vec::new(),
            },
            references: Vec::new(),
        })
    }
}

impl ElementParser for FormulaParser {
    fn attach(&mut self, child: Parsed, ctx: &mut LoadContext<'_>) -> Result<()> {
        match child {
            Parsed::FormulaParameter(parameter) => self.formula.parameters.push(parameter),
            Parsed::FormulaTarget(target) => self.formula.target = Some(target),
            Parsed::MathReferences(references) => {
                for reference in references {
                    let uri = ctx.resolve(&reference)?;
                    ctx.note_reference(&uri);
                    self.references.push(uri);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        if ctx.wants(ObjectFlags::FORMULA) {
            let context = ctx.error_context();
            ctx.store.formulas.push(PendingFormula {
                formula: self.formula,
                references: self.references,
                context,
            });
        }
        Ok(Parsed::None)
    }

    fn object_id(&self) -> Option<UniqueId> {
        Some(self.formula.unique_id)
    }
}

/// `<newparam>` of a formula
pub(crate) struct FormulaNewparamParser {
    parameter: FormulaParameter,
}

impl FormulaNewparamParser {
    pub fn new(start: &ElementStart<'_>) -> Result<Self> {
        Ok(Self {
            parameter: FormulaParameter {
                sid: start.required("sid")?.to_string(),
                value: None,
            },
        })
    }
}

impl ElementParser for FormulaNewparamParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::Float(value) = child {
            self.parameter.value = Some(value);
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::FormulaParameter(self.parameter))
    }
}

/// `<target>` of a formula: a constant or a parameter reference
#[derive(Default)]
pub(crate) struct FormulaTargetParser {
    target: Option<String>,
}

impl ElementParser for FormulaTargetParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        match child {
            Parsed::Float(value) => self.target = Some(value.to_string()),
            Parsed::Param(param) => self.target = param.reference,
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(match self.target {
            Some(target) => Parsed::FormulaTarget(target),
            None => Parsed::None,
        })
    }
}

/// Any MathML element; collects `csymbol` URLs naming other elements
pub(crate) struct MathParser {
    references: Vec<String>,
}

impl MathParser {
    pub fn new(start: &ElementStart<'_>) -> Self {
        let mut references = Vec::new();
        if start.name == "csymbol"
            && let Some(url) = start.attr("definitionURL")
            && url.contains('#')
        {
            references.push(url.trim().to_string());
        }
        Self { references }
    }
}

impl ElementParser for MathParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::MathReferences(references) = child {
            self.references.extend(references);
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(if self.references.is_empty() {
            Parsed::None
        } else {
            Parsed::MathReferences(self.references)
        })
    }
}

pub(crate) struct KinematicsModelParser {
    model: KinematicsModel,
}

impl KinematicsModelParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        Ok(Self {
            model: KinematicsModel {
                unique_id: ctx.define_object(start, ClassId::KinematicsModel)?,
                original_id: start.attr_string("id"),
                name: start.attr_string("name"),
                joints: Vec::new(),
            },
        })
    }
}

impl ElementParser for KinematicsModelParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::KinematicsJoints(joints) = child {
            self.model.joints = joints;
        }
        Ok(())
    }

    fn finish(self: Box<Self>, ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        if ctx.wants(ObjectFlags::KINEMATICS) {
            let ok = ctx.writer.write_kinematics_model(self.model);
            ctx.check_written(ok, "kinematics model")?;
        }
        Ok(Parsed::None)
    }

    fn object_id(&self) -> Option<UniqueId> {
        Some(self.model.unique_id)
    }
}

/// `<technique_common>` of a kinematics model
#[derive(Default)]
pub(crate) struct JointListParser {
    joints: Vec<Joint>,
}

impl ElementParser for JointListParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::KinematicsJoint(joint) = child {
            self.joints.push(joint);
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::KinematicsJoints(self.joints))
    }
}

pub(crate) struct JointParser {
    joint: Joint,
}

impl JointParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        Ok(Self {
            joint: Joint {
                unique_id: ctx.define_object(start, ClassId::Joint)?,
                sid: start.attr_string("sid"),
                name: start.attr_string("name"),
                primitives: Vec::new(),
            },
        })
    }
}

impl ElementParser for JointParser {
    fn attach(&mut self, child: Parsed, ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::JointPrimitive {
            primitive,
            sid_node,
        } = child
        {
            if let Some(sid_node) = sid_node {
                ctx.sid_tree.set_target(
                    sid_node,
                    SidTarget::JointAxis {
                        joint: self.joint.unique_id,
                        index: self.joint.primitives.len(),
                    },
                );
            }
            self.joint.primitives.push(primitive);
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::KinematicsJoint(self.joint))
    }

    fn object_id(&self) -> Option<UniqueId> {
        Some(self.joint.unique_id)
    }
}

/// `<prismatic>` or `<revolute>`
pub(crate) struct JointPrimitiveParser {
    primitive: JointPrimitive,
    sid_node: Option<SidNodeId>,
}

impl JointPrimitiveParser {
    pub fn new(start: &ElementStart<'_>) -> Result<Self> {
        let kind = match start.name {
            "prismatic" => JointPrimitiveKind::Prismatic,
            "revolute" => JointPrimitiveKind::Revolute,
            other => {
                return Err(Error::InvalidModel(format!(
                    "<{}> is not a joint primitive",
                    other
                )));
            }
        };
        Ok(Self {
            primitive: JointPrimitive {
                kind,
                sid: start.attr_string("sid"),
                axis: [0.0; 3],
                limits: None,
            },
            sid_node: start.sid_node,
        })
    }
}

impl ElementParser for JointPrimitiveParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        match child {
            Parsed::Text { name, value } if name == "axis" => {
                self.primitive.axis = parse_fixed::<3>("axis", &value)?;
            }
            Parsed::Limits(Some(min), Some(max)) => self.primitive.limits = Some((min, max)),
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::JointPrimitive {
            primitive: self.primitive,
            sid_node: self.sid_node,
        })
    }
}

#[derive(Default)]
pub(crate) struct LimitsParser {
    min: Option<f64>,
    max: Option<f64>,
}

impl ElementParser for LimitsParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::Text { name, value } = child {
            let value = Some(parse_float(&name, &value)?);
            match name.as_str() {
                "min" => self.min = value,
                "max" => self.max = value,
                _ => {}
            }
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Limits(self.min, self.max))
    }
}

pub(crate) struct KinematicsSceneParser {
    scene: KinematicsScene,
}

impl KinematicsSceneParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        Ok(Self {
            scene: KinematicsScene {
                unique_id: ctx.define_object(start, ClassId::KinematicsScene)?,
                original_id: start.attr_string("id"),
                name: start.attr_string("name"),
                kinematics_models: Vec::new(),
                bindings: Vec::new(),
            },
        })
    }
}

impl ElementParser for KinematicsSceneParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::InstanceKinematicsModel(model) = child {
            self.scene.kinematics_models.push(model);
        }
        Ok(())
    }

    fn finish(self: Box<Self>, ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        if ctx.wants(ObjectFlags::KINEMATICS) {
            ctx.store.kinematics_scenes.push(self.scene);
        }
        Ok(Parsed::None)
    }

    fn object_id(&self) -> Option<UniqueId> {
        Some(self.scene.unique_id)
    }
}

pub(crate) struct InstanceKinematicsModelParser {
    model: UniqueId,
}

impl InstanceKinematicsModelParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        let url = start.required("url")?;
        let model = ctx.id_for_reference(url, ClassId::KinematicsModel, "instance_kinematics_model")?;
        // Sid addresses through the instance continue into the model
        if let Some(sid_node) = start.sid_node {
            let uri = ctx.resolve(url)?;
            if let Some(id) = fragment_id(&uri) {
                let file_id = ctx.registry.get_or_create_file_id(&uri);
                ctx.sid_tree.link_instance(sid_node, file_id, &id);
            }
        }
        Ok(Self { model })
    }
}

impl ElementParser for InstanceKinematicsModelParser {
    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::InstanceKinematicsModel(self.model))
    }
}
