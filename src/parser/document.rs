//! Document-level elements: `<COLLADA>`, `<asset>` and `<scene>`

use super::kinematics::JointAxisParsed;
use super::{ElementParser, ElementStart, LoadContext, Parsed};
use crate::config::ObjectFlags;
use crate::error::{Error, Result};
use crate::intermediate::PendingJointAxis;
use crate::model::{
    Asset, ClassId, ColladaVersion, Contributor, Scene, UniqueId, Unit, UpAxis,
};

/// The document element
pub(crate) struct ColladaParser;

impl ColladaParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Self {
        ctx.version = ColladaVersion::from_attribute(start.attr("version").unwrap_or_default());
        if ctx.version == ColladaVersion::Unknown {
            tracing::warn!(version = ?start.attr("version"), "unrecognised COLLADA version");
        }
        ColladaParser
    }
}

impl ElementParser for ColladaParser {
    fn attach(&mut self, child: Parsed, ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::Asset(mut asset) = child
            && ctx.is_root_file
            && ctx.wants(ObjectFlags::ASSET)
        {
            asset.version = ctx.version;
            let ok = ctx.writer.write_global_asset(asset);
            ctx.check_written(ok, "global asset")?;
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::None)
    }
}

#[derive(Default)]
pub(crate) struct AssetParser {
    asset: Asset,
}

impl ElementParser for AssetParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        let asset = &mut self.asset;
        match child {
            Parsed::Contributor(contributor) => asset.contributors.push(contributor),
            Parsed::Unit(unit) => asset.unit = unit,
            Parsed::Text { name, value } => match name.as_str() {
                "created" => asset.created = Some(value),
                "modified" => asset.modified = Some(value),
                "title" => asset.title = Some(value),
                "subject" => asset.subject = Some(value),
                "keywords" => asset.keywords = Some(value),
                "revision" => asset.revision = Some(value),
                "up_axis" => {
                    asset.up_axis = UpAxis::parse(&value).ok_or_else(|| {
                        Error::parse_error_with_context("up_axis", &value, "X_UP, Y_UP or Z_UP")
                    })?;
                }
                _ => {}
            },
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Asset(self.asset))
    }
}

#[derive(Default)]
pub(crate) struct ContributorParser {
    contributor: Contributor,
}

impl ElementParser for ContributorParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::Text { name, value } = child {
            let c = &mut self.contributor;
            match name.as_str() {
                "author" => c.author = Some(value),
                "authoring_tool" => c.authoring_tool = Some(value),
                "comments" => c.comments = Some(value),
                "copyright" => c.copyright = Some(value),
                "source_data" => c.source_data = Some(value),
                _ => {}
            }
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Contributor(self.contributor))
    }
}

pub(crate) struct UnitParser {
    unit: Unit,
}

impl UnitParser {
    pub fn new(start: &ElementStart<'_>) -> Result<Self> {
        let mut unit = Unit::default();
        if let Some(meter) = start.attr("meter") {
            unit.meter = super::numbers::parse_float("unit@meter", meter)?;
        }
        if let Some(name) = start.attr("name") {
            unit.name = name.to_string();
        }
        Ok(Self { unit })
    }
}

impl ElementParser for UnitParser {
    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Unit(self.unit))
    }
}

/// The document's `<scene>`
#[derive(Default)]
pub(crate) struct SceneParser {
    scene: Scene,
}

impl ElementParser for SceneParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        match child {
            Parsed::InstanceVisualScene(id) => self.scene.instance_visual_scene = Some(id),
            Parsed::InstanceKinematicsScene(id) => self.scene.instance_kinematics_scene = Some(id),
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        if ctx.is_root_file && ctx.wants(ObjectFlags::SCENE) {
            let ok = ctx.writer.write_scene(self.scene);
            ctx.check_written(ok, "scene")?;
        }
        Ok(Parsed::None)
    }
}

pub(crate) struct InstanceVisualSceneParser {
    scene: UniqueId,
}

impl InstanceVisualSceneParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        let url = start.required("url")?;
        Ok(Self {
            scene: ctx.id_for_reference(url, ClassId::VisualScene, "instance_visual_scene")?,
        })
    }
}

impl ElementParser for InstanceVisualSceneParser {
    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::InstanceVisualScene(self.scene))
    }
}

pub(crate) struct InstanceKinematicsSceneParser {
    scene: UniqueId,
}

impl InstanceKinematicsSceneParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        let url = start.required("url")?;
        Ok(Self {
            scene: ctx.id_for_reference(url, ClassId::KinematicsScene, "instance_kinematics_scene")?,
        })
    }
}

impl ElementParser for InstanceKinematicsSceneParser {
    fn attach(&mut self, child: Parsed, ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::JointAxis(binding) = child
            && ctx.wants(ObjectFlags::KINEMATICS)
        {
            let context = ctx.error_context();
            ctx.store.joint_axis_bindings.push(PendingJointAxis {
                scene: self.scene,
                target: binding.target,
                axis: binding.axis,
                value: binding.value,
                file_id: ctx.file_id,
                context,
            });
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::InstanceKinematicsScene(self.scene))
    }
}

pub(crate) struct BindJointAxisParser {
    target: String,
    axis: Option<String>,
    value: Option<f64>,
}

impl BindJointAxisParser {
    pub fn new(start: &ElementStart<'_>) -> Result<Self> {
        Ok(Self {
            target: start.required("target")?.to_string(),
            axis: None,
            value: None,
        })
    }
}

impl ElementParser for BindJointAxisParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        match child {
            Parsed::Axis(axis) => self.axis = Some(axis),
            Parsed::Float(value) => self.value = Some(value),
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        let axis = self.axis.ok_or_else(|| {
            Error::InvalidModel(format!("<bind_joint_axis target=\"{}\"> names no axis", self.target))
        })?;
        Ok(Parsed::JointAxis(JointAxisParsed {
            target: self.target,
            axis,
            value: self.value,
        }))
    }
}

/// `<axis>` of `<bind_joint_axis>`; a `<SIDREF>` or a parameter reference,
/// both taken as sid addresses
#[derive(Default)]
pub(crate) struct BindAxisParser {
    axis: Option<String>,
}

impl ElementParser for BindAxisParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        match child {
            Parsed::Text { value, .. } => self.axis = Some(value),
            Parsed::Param(param) => self.axis = param.reference,
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(match self.axis {
            Some(axis) if !axis.is_empty() => Parsed::Axis(axis),
            _ => Parsed::None,
        })
    }
}
