//! Materials, effects and images

use super::{ElementParser, ElementStart, LoadContext, Parsed};
use crate::config::ObjectFlags;
use crate::error::{Error, Result};
use crate::model::{
    ClassId, Color, ColorOrTexture, Effect, EffectCommon, Image, Material, ShaderType, Texture,
    UniqueId,
};

/// Value of one shader parameter
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ShaderValue {
    Color(Color),
    Float(f64),
    Texture(Texture),
}

impl ShaderValue {
    fn into_color(self, name: &str) -> Result<ColorOrTexture> {
        match self {
            ShaderValue::Color(color) => Ok(ColorOrTexture::Color(color)),
            ShaderValue::Texture(texture) => Ok(ColorOrTexture::Texture(texture)),
            ShaderValue::Float(_) => Err(Error::InvalidModel(format!(
                "<{}> expects a color or texture, found <float>",
                name
            ))),
        }
    }

    fn into_float(self, name: &str) -> Result<f64> {
        match self {
            ShaderValue::Float(value) => Ok(value),
            _ => Err(Error::InvalidModel(format!("<{}> expects a <float>", name))),
        }
    }
}

pub(crate) struct MaterialParser {
    material: Material,
}

impl MaterialParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        Ok(Self {
            material: Material {
                unique_id: ctx.define_object(start, ClassId::Material)?,
                original_id: start.attr_string("id"),
                name: start.attr_string("name"),
                instantiated_effect: UniqueId::INVALID,
            },
        })
    }
}

impl ElementParser for MaterialParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::InstanceEffect(effect) = child {
            self.material.instantiated_effect = effect;
        }
        Ok(())
    }

    fn finish(self: Box<Self>, ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        if ctx.wants(ObjectFlags::MATERIAL) {
            let ok = ctx.writer.write_material(self.material);
            ctx.check_written(ok, "material")?;
        }
        Ok(Parsed::None)
    }

    fn object_id(&self) -> Option<UniqueId> {
        Some(self.material.unique_id)
    }
}

pub(crate) struct InstanceEffectParser {
    effect: UniqueId,
}

impl InstanceEffectParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        let url = start.required("url")?;
        Ok(Self {
            effect: ctx.id_for_reference(url, ClassId::Effect, "instance_effect")?,
        })
    }
}

impl ElementParser for InstanceEffectParser {
    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::InstanceEffect(self.effect))
    }
}

pub(crate) struct EffectParser {
    effect: Effect,
}

impl EffectParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        Ok(Self {
            effect: Effect {
                unique_id: ctx.define_object(start, ClassId::Effect)?,
                original_id: start.attr_string("id"),
                name: start.attr_string("name"),
                common_effects: Vec::new(),
            },
        })
    }
}

impl ElementParser for EffectParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::Shader(common) = child {
            self.effect.common_effects.push(common);
        }
        Ok(())
    }

    fn finish(self: Box<Self>, ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        if ctx.wants(ObjectFlags::EFFECT) {
            let ok = ctx.writer.write_effect(self.effect);
            ctx.check_written(ok, "effect")?;
        }
        Ok(Parsed::None)
    }

    fn object_id(&self) -> Option<UniqueId> {
        Some(self.effect.unique_id)
    }
}

/// `<constant>`, `<lambert>`, `<phong>`, `<blinn>`
pub(crate) struct ShaderParser {
    common: EffectCommon,
}

impl ShaderParser {
    pub fn new(start: &ElementStart<'_>) -> Self {
        Self {
            common: EffectCommon {
                shader_type: ShaderType::from_element(start.name).unwrap_or_default(),
                ..EffectCommon::default()
            },
        }
    }
}

impl ElementParser for ShaderParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        let Parsed::ShaderParam { name, value } = child else {
            return Ok(());
        };
        let common = &mut self.common;
        match name.as_str() {
            "emission" => common.emission = value.into_color(&name)?,
            "ambient" => common.ambient = value.into_color(&name)?,
            "diffuse" => common.diffuse = value.into_color(&name)?,
            "specular" => common.specular = value.into_color(&name)?,
            "reflective" => common.reflective = value.into_color(&name)?,
            "transparent" => common.transparent = value.into_color(&name)?,
            "shininess" => common.shininess = Some(value.into_float(&name)?),
            "reflectivity" => common.reflectivity = Some(value.into_float(&name)?),
            "transparency" => common.transparency = Some(value.into_float(&name)?),
            "index_of_refraction" => common.index_of_refraction = Some(value.into_float(&name)?),
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Shader(self.common))
    }
}

/// `<diffuse>`, `<shininess>` and the other shader parameters
pub(crate) struct ShaderParamParser {
    name: String,
    value: Option<ShaderValue>,
}

impl ShaderParamParser {
    pub fn new(start: &ElementStart<'_>) -> Self {
        Self {
            name: start.name.to_string(),
            value: None,
        }
    }
}

impl ElementParser for ShaderParamParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        self.value = match child {
            Parsed::Color(color) => Some(ShaderValue::Color(color)),
            Parsed::Float(value) => Some(ShaderValue::Float(value)),
            Parsed::Texture(texture) => Some(ShaderValue::Texture(texture)),
            _ => return Ok(()),
        };
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(match self.value {
            Some(value) => Parsed::ShaderParam {
                name: self.name,
                value,
            },
            // `<param>` values are not modelled
            None => Parsed::None,
        })
    }
}

pub(crate) struct TextureParser {
    texture: Texture,
}

impl TextureParser {
    pub fn new(start: &ElementStart<'_>) -> Result<Self> {
        Ok(Self {
            texture: Texture {
                sampler: start.required("texture")?.to_string(),
                texcoord: start.attr_string("texcoord"),
            },
        })
    }
}

impl ElementParser for TextureParser {
    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Texture(self.texture))
    }
}

pub(crate) struct ImageParser {
    image: Image,
}

impl ImageParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        Ok(Self {
            image: Image {
                unique_id: ctx.define_object(start, ClassId::Image)?,
                original_id: start.attr_string("id"),
                name: start.attr_string("name"),
                format: start.attr_string("format"),
                image_uri: None,
            },
        })
    }
}

impl ElementParser for ImageParser {
    fn attach(&mut self, child: Parsed, ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::ImageRef(location) = child {
            let uri = match ctx.resolve(&location) {
                Ok(uri) => uri.to_string(),
                Err(err) => {
                    tracing::debug!(%location, %err, "keeping image location unresolved");
                    location
                }
            };
            self.image.image_uri = Some(uri);
        }
        Ok(())
    }

    fn finish(self: Box<Self>, ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        if ctx.wants(ObjectFlags::IMAGE) {
            let ok = ctx.writer.write_image(self.image);
            ctx.check_written(ok, "image")?;
        }
        Ok(Parsed::None)
    }

    fn object_id(&self) -> Option<UniqueId> {
        Some(self.image.unique_id)
    }
}

/// `<init_from>`: a location as text (1.4) or in a `<ref>` child (1.5)
#[derive(Default)]
pub(crate) struct InitFromParser {
    location: String,
}

impl ElementParser for InitFromParser {
    fn text(&mut self, text: &str, _ctx: &mut LoadContext<'_>) -> Result<()> {
        self.location.push_str(text);
        Ok(())
    }

    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::Text { value, .. } = child {
            self.location = value;
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        let location = self.location.trim();
        Ok(if location.is_empty() {
            Parsed::None
        } else {
            Parsed::ImageRef(location.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_value_conversion() {
        let color = ShaderValue::Color(Color::BLACK);
        assert_eq!(
            color.into_color("diffuse").unwrap(),
            ColorOrTexture::Color(Color::BLACK)
        );
        assert!(ShaderValue::Float(1.0).into_color("diffuse").is_err());
        assert_eq!(ShaderValue::Float(20.0).into_float("shininess").unwrap(), 20.0);
        let texture = ShaderValue::Texture(Texture {
            sampler: "s".into(),
            texcoord: None,
        });
        assert!(texture.into_float("shininess").is_err());
    }
}
