//! `<animation>` parsing
//!
//! Every `<sampler>` becomes one [`AnimationCurve`]. Channels name their
//! targets by sid address, which usually points into a visual scene that
//! has not been read yet, so they are queued for the post-pass.

use super::numbers::value_count;
use super::source::{Input, Source, find_source};
use super::{ElementParser, ElementStart, LoadContext, Parsed};
use crate::config::ObjectFlags;
use crate::error::{Error, Result};
use crate::intermediate::PendingChannel;
use crate::model::{AnimationCurve, ClassId, Interpolation, UniqueId};

#[derive(Default)]
pub(crate) struct AnimationParser {
    sources: Vec<Source>,
    curves: Vec<AnimationCurve>,
    channels: Vec<PendingChannel>,
}

impl AnimationParser {
    fn source_for<'s>(&'s self, inputs: &[Input], semantic: &str) -> Result<Option<&'s Source>> {
        match inputs.iter().find(|i| i.semantic == semantic) {
            Some(input) => find_source(&self.sources, &input.source).map(Some),
            None => Ok(None),
        }
    }

    fn build_curve(
        &self,
        unique_id: UniqueId,
        original_id: Option<String>,
        inputs: &[Input],
    ) -> Result<AnimationCurve> {
        let input = self.source_for(inputs, "INPUT")?
            .ok_or_else(|| Error::InvalidModel("<sampler> has no INPUT".to_string()))?;
        let output = self.source_for(inputs, "OUTPUT")?
            .ok_or_else(|| Error::InvalidModel("<sampler> has no OUTPUT".to_string()))?;

        let input_values = input.floats("INPUT")?.to_vec();
        let output_values = output.floats("OUTPUT")?.to_vec();
        let out_dimension = output.stride.max(1);
        if output_values.len() != value_count("sampler", input_values.len(), out_dimension)? {
            return Err(Error::InvalidModel(format!(
                "sampler has {} keys but {} output values of dimension {}",
                input_values.len(),
                output_values.len(),
                out_dimension
            )));
        }

        let interpolations = match self.source_for(inputs, "INTERPOLATION")? {
            Some(source) => {
                let names = source.names("INTERPOLATION")?;
                if names.len() != input_values.len() {
                    return Err(Error::InvalidModel(format!(
                        "sampler has {} keys but {} interpolations",
                        input_values.len(),
                        names.len()
                    )));
                }
                names
                    .iter()
                    .map(|name| {
                        Interpolation::parse(name).ok_or_else(|| {
                            Error::parse_error_with_context("INTERPOLATION", name, "interpolation")
                        })
                    })
                    .collect::<Result<Vec<_>>>()?
            }
            None => vec![Interpolation::Linear; input_values.len()],
        };

        let tangents = |semantic: &str| -> Result<Vec<f64>> {
            Ok(match self.source_for(inputs, semantic)? {
                Some(source) => source.floats(semantic)?.to_vec(),
                None => Vec::new(),
            })
        };

        Ok(AnimationCurve {
            unique_id,
            original_id,
            in_tangents: tangents("IN_TANGENT")?,
            out_tangents: tangents("OUT_TANGENT")?,
            input_values,
            output_values,
            out_dimension,
            interpolations,
        })
    }
}

impl ElementParser for AnimationParser {
    fn attach(&mut self, child: Parsed, ctx: &mut LoadContext<'_>) -> Result<()> {
        match child {
            Parsed::Source(source) => self.sources.push(source),
            Parsed::Sampler {
                id,
                original_id,
                inputs,
            } => {
                let curve = self.build_curve(id, original_id, &inputs)?;
                self.curves.push(curve);
            }
            Parsed::Channel { source, target } => {
                let animation = ctx.id_for_reference(&source, ClassId::Animation, "channel")?;
                self.channels.push(PendingChannel {
                    animation,
                    target,
                    file_id: ctx.file_id,
                    context: ctx.error_context(),
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        if ctx.wants(ObjectFlags::ANIMATION) {
            for curve in self.curves {
                tracing::debug!(id = %curve.unique_id, keys = curve.key_count(), "writing animation");
                let ok = ctx.writer.write_animation(curve);
                ctx.check_written(ok, "animation")?;
            }
        }
        if ctx.wants(ObjectFlags::ANIMATION_LIST) {
            ctx.store.channels.extend(self.channels);
        }
        Ok(Parsed::None)
    }
}

pub(crate) struct SamplerParser {
    id: UniqueId,
    original_id: Option<String>,
    inputs: Vec<Input>,
}

impl SamplerParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        Ok(Self {
            id: ctx.define_object(start, ClassId::Animation)?,
            original_id: start.attr_string("id"),
            inputs: Vec::new(),
        })
    }
}

impl ElementParser for SamplerParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::Input(input) = child {
            self.inputs.push(input);
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Sampler {
            id: self.id,
            original_id: self.original_id,
            inputs: self.inputs,
        })
    }

    fn object_id(&self) -> Option<UniqueId> {
        Some(self.id)
    }
}

pub(crate) struct ChannelParser {
    source: String,
    target: String,
}

impl ChannelParser {
    pub fn new(start: &ElementStart<'_>) -> Result<Self> {
        Ok(Self {
            source: start.required("source")?.to_string(),
            target: start.required("target")?.to_string(),
        })
    }
}

impl ElementParser for ChannelParser {
    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Channel {
            source: self.source,
            target: self.target,
        })
    }
}
