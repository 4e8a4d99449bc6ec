//! `<controller>` parsing: skins and morphs
//!
//! Skin data is written as soon as the controller closes. Binding a skin to
//! concrete joint nodes needs the instantiating `<instance_controller>` and
//! its skeleton roots, so that part is left to the post-pass.

use super::numbers::{parse_fixed, value_count};
use super::source::{ArrayData, Input, Source, find_source};
use super::{ElementParser, ElementStart, LoadContext, Parsed};
use crate::config::ObjectFlags;
use crate::error::{Error, Result};
use crate::grammar::ElementKind;
use crate::intermediate::{ControllerInfo, SkinContent, SkinInfo};
use crate::model::{
    ClassId, Controller, IDENTITY_MATRIX, MorphController, MorphMethod, SkinControllerData,
    UniqueId,
};
use url::Url;

/// `<vertex_weights>` content
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VertexWeights {
    pub count: usize,
    pub inputs: Vec<Input>,
    pub vcount: Vec<i64>,
    pub v: Vec<i64>,
}

/// A finished `<skin>`
#[derive(Debug)]
pub(crate) struct SkinParsed {
    pub data: SkinControllerData,
    pub info: SkinInfo,
}

/// A finished `<morph>`
#[derive(Debug)]
pub(crate) struct MorphParsed {
    pub morph: MorphController,
    pub source: Url,
}

pub(crate) struct ControllerParser {
    unique_id: UniqueId,
    original_id: Option<String>,
    name: Option<String>,
    skin: Option<SkinParsed>,
    morph: Option<MorphParsed>,
}

impl ControllerParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        Ok(Self {
            unique_id: ctx.define_object(start, ClassId::Controller)?,
            original_id: start.attr_string("id"),
            name: start.attr_string("name"),
            skin: None,
            morph: None,
        })
    }
}

impl ElementParser for ControllerParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        match child {
            Parsed::Skin(skin) => self.skin = Some(skin),
            Parsed::Morph(morph) => self.morph = Some(morph),
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        let this = *self;
        if let Some(SkinParsed { mut data, info }) = this.skin {
            data.original_id = this.original_id.clone();
            data.name = this.name.clone();
            ctx.store
                .controllers
                .insert(this.unique_id, ControllerInfo::Skin(info));
            if ctx.wants(ObjectFlags::SKIN_CONTROLLER_DATA) {
                tracing::debug!(id = %data.unique_id, "writing skin controller data");
                let ok = ctx.writer.write_skin_controller_data(data);
                ctx.check_written(ok, "skin controller data")?;
            }
        } else if let Some(MorphParsed { mut morph, source }) = this.morph {
            morph.original_id = this.original_id;
            morph.name = this.name;
            ctx.store.controllers.insert(
                this.unique_id,
                ControllerInfo::Morph {
                    morph: morph.unique_id,
                    source,
                },
            );
            if ctx.wants(ObjectFlags::CONTROLLER) {
                tracing::debug!(id = %morph.unique_id, "writing morph controller");
                let ok = ctx.writer.write_controller(Controller::Morph(morph));
                ctx.check_written(ok, "morph controller")?;
            }
        }
        Ok(Parsed::None)
    }

    fn object_id(&self) -> Option<UniqueId> {
        Some(self.unique_id)
    }
}

pub(crate) struct SkinParser {
    data_id: UniqueId,
    source: Url,
    bind_shape_matrix: [f64; 16],
    sources: Vec<Source>,
    joints: Vec<Input>,
    weights: Option<VertexWeights>,
}

impl SkinParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        let source = ctx.expect_reference(start.required("source")?, "skin")?;
        Ok(Self {
            data_id: ctx
                .registry
                .create_anonymous_id(ClassId::SkinControllerData, ctx.file_id),
            source,
            bind_shape_matrix: IDENTITY_MATRIX,
            sources: Vec::new(),
            joints: Vec::new(),
            weights: None,
        })
    }

    fn input<'i>(inputs: &'i [Input], semantic: &str, element: &str) -> Result<&'i Input> {
        inputs
            .iter()
            .find(|input| input.semantic == semantic)
            .ok_or_else(|| {
                Error::InvalidModel(format!("<{}> has no {} input", element, semantic))
            })
    }
}

impl ElementParser for SkinParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        match child {
            Parsed::Text { name, value } if name == "bind_shape_matrix" => {
                self.bind_shape_matrix = parse_fixed::<16>("bind_shape_matrix", &value)?;
            }
            Parsed::Source(source) => self.sources.push(source),
            Parsed::Joints(inputs) => self.joints = inputs,
            Parsed::VertexWeights(weights) => self.weights = Some(weights),
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        let joint_input = Self::input(&self.joints, "JOINT", "joints")?;
        let joint_source = find_source(&self.sources, &joint_input.source)?;
        let joint_names = joint_source.names("JOINT")?.to_vec();
        let joints_are_ids = matches!(joint_source.data, ArrayData::IdRef(_));

        let inverse_bind_matrices = match Self::input(&self.joints, "INV_BIND_MATRIX", "joints") {
            Ok(input) => {
                let values = find_source(&self.sources, &input.source)?.floats("INV_BIND_MATRIX")?;
                if values.len() != joint_names.len() * 16 {
                    return Err(Error::InvalidModel(format!(
                        "{} joints but {} inverse bind matrix values",
                        joint_names.len(),
                        values.len()
                    )));
                }
                values
                    .chunks_exact(16)
                    .map(|chunk| {
                        let mut matrix = [0.0; 16];
                        matrix.copy_from_slice(chunk);
                        matrix
                    })
                    .collect()
            }
            Err(_) => vec![IDENTITY_MATRIX; joint_names.len()],
        };

        let vw = self
            .weights
            .as_ref()
            .ok_or_else(|| Error::InvalidModel("<skin> has no <vertex_weights>".to_string()))?;
        let weight_input = Self::input(&vw.inputs, "WEIGHT", "vertex_weights")?;
        let weights = find_source(&self.sources, &weight_input.source)?
            .floats("WEIGHT")?
            .to_vec();
        let joint_offset = Self::input(&vw.inputs, "JOINT", "vertex_weights")?.offset;
        let weight_offset = weight_input.offset;
        let stride = vw.inputs.iter().map(|i| i.offset.saturating_add(1)).max().unwrap_or(1);

        if vw.vcount.len() != vw.count {
            return Err(Error::InvalidModel(format!(
                "<vertex_weights> declares {} vertices, <vcount> holds {}",
                vw.count,
                vw.vcount.len()
            )));
        }
        let mut joints_per_vertex = Vec::with_capacity(vw.vcount.len());
        for &n in &vw.vcount {
            joints_per_vertex.push(u32::try_from(n).map_err(|_| {
                Error::parse_error_with_context("vcount value", &n.to_string(), "u32")
            })?);
        }
        let influences: usize = joints_per_vertex.iter().map(|&n| n as usize).sum();
        let needed = value_count("vertex_weights", influences, stride)?;
        if vw.v.len() != needed {
            return Err(Error::InvalidModel(format!(
                "<v> holds {} values, {} influences of {} inputs need {}",
                vw.v.len(),
                influences,
                stride,
                needed
            )));
        }

        let mut joint_indices = Vec::with_capacity(influences);
        let mut weight_indices = Vec::with_capacity(influences);
        for influence in vw.v.chunks_exact(stride) {
            let joint = influence[joint_offset];
            if joint < -1 || joint >= joint_names.len() as i64 {
                return Err(Error::InvalidModel(format!(
                    "joint index {} out of range for {} joints",
                    joint,
                    joint_names.len()
                )));
            }
            let weight = influence[weight_offset];
            if weight < 0 || weight as usize >= weights.len() {
                return Err(Error::InvalidModel(format!(
                    "weight index {} out of range for {} weights",
                    weight,
                    weights.len()
                )));
            }
            joint_indices.push(joint);
            weight_indices.push(weight as u32);
        }

        let data = SkinControllerData {
            unique_id: self.data_id,
            original_id: None,
            name: None,
            bind_shape_matrix: self.bind_shape_matrix,
            joint_names,
            inverse_bind_matrices,
            weights,
            joints_per_vertex,
            joint_indices,
            weight_indices,
        };
        let info = SkinInfo {
            data: data.unique_id,
            source: self.source.clone(),
            joint_names: data.joint_names.clone(),
            joints_are_ids,
            content: SkinContent::of(&data),
        };
        Ok(Parsed::Skin(SkinParsed { data, info }))
    }
}

/// `<joints>` and `<targets>`
pub(crate) struct InputSetParser {
    kind: ElementKind,
    inputs: Vec<Input>,
}

impl InputSetParser {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            inputs: Vec::new(),
        }
    }
}

impl ElementParser for InputSetParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::Input(input) = child {
            self.inputs.push(input);
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(match self.kind {
            ElementKind::Targets => Parsed::Targets(self.inputs),
            _ => Parsed::Joints(self.inputs),
        })
    }
}

pub(crate) struct VertexWeightsParser {
    weights: VertexWeights,
}

impl VertexWeightsParser {
    pub fn new(start: &ElementStart<'_>) -> Result<Self> {
        Ok(Self {
            weights: VertexWeights {
                count: start.attr_usize("count")?.unwrap_or(0),
                inputs: Vec::new(),
                vcount: Vec::new(),
                v: Vec::new(),
            },
        })
    }
}

impl ElementParser for VertexWeightsParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        match child {
            Parsed::Input(input) => self.weights.inputs.push(input),
            Parsed::Indices { name, values } if name == "vcount" => self.weights.vcount = values,
            Parsed::Indices { values, .. } => self.weights.v = values,
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::VertexWeights(self.weights))
    }
}

pub(crate) struct MorphParser {
    morph: MorphController,
    source: Url,
    sources: Vec<Source>,
    targets: Vec<Input>,
}

impl MorphParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        let reference = start.required("source")?;
        let source = ctx.resolve(reference)?;
        let base = ctx.id_for_reference(reference, ClassId::Geometry, "morph")?;
        let method = match start.attr("method").map(str::trim) {
            None | Some("NORMALIZED") => MorphMethod::Normalized,
            Some("RELATIVE") => MorphMethod::Relative,
            Some(other) => {
                return Err(Error::parse_error_with_context(
                    "morph@method",
                    other,
                    "NORMALIZED or RELATIVE",
                ));
            }
        };
        Ok(Self {
            morph: MorphController {
                unique_id: ctx
                    .registry
                    .create_anonymous_id(ClassId::MorphController, ctx.file_id),
                original_id: None,
                name: None,
                source: base,
                method,
                morph_targets: Vec::new(),
                morph_weights: Vec::new(),
            },
            source,
            sources: Vec::new(),
            targets: Vec::new(),
        })
    }
}

impl ElementParser for MorphParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        match child {
            Parsed::Source(source) => self.sources.push(source),
            Parsed::Targets(inputs) => self.targets = inputs,
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        let mut this = *self;
        let target_input = SkinParser::input(&this.targets, "MORPH_TARGET", "targets")?;
        let weight_input = SkinParser::input(&this.targets, "MORPH_WEIGHT", "targets")?;
        let names = find_source(&this.sources, &target_input.source)?
            .names("MORPH_TARGET")?
            .to_vec();
        let weights = find_source(&this.sources, &weight_input.source)?
            .floats("MORPH_WEIGHT")?
            .to_vec();
        if names.len() != weights.len() {
            return Err(Error::InvalidModel(format!(
                "{} morph targets but {} weights",
                names.len(),
                weights.len()
            )));
        }
        for name in &names {
            let target = ctx.id_for_reference(&format!("#{}", name), ClassId::Geometry, "morph")?;
            this.morph.morph_targets.push(target);
        }
        this.morph.morph_weights = weights;
        Ok(Parsed::Morph(MorphParsed {
            morph: this.morph,
            source: this.source,
        }))
    }
}
