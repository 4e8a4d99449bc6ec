//! Cameras and lights

use super::numbers::parse_float;
use super::{ElementParser, ElementStart, LoadContext, Parsed};
use crate::config::ObjectFlags;
use crate::error::Result;
use crate::model::{Camera, ClassId, Color, Light, LightType, Projection, UniqueId};

/// Common technique of `<optics>`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OpticsData {
    pub projection: Projection,
    pub znear: f64,
    pub zfar: f64,
}

/// Common technique of `<light>`; unset values keep their defaults
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LightData {
    pub light_type: LightType,
    pub color: Option<Color>,
    pub constant_attenuation: Option<f64>,
    pub linear_attenuation: Option<f64>,
    pub quadratic_attenuation: Option<f64>,
    pub falloff_angle: Option<f64>,
    pub falloff_exponent: Option<f64>,
}

pub(crate) struct CameraParser {
    camera: Camera,
}

impl CameraParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        Ok(Self {
            camera: Camera {
                unique_id: ctx.define_object(start, ClassId::Camera)?,
                original_id: start.attr_string("id"),
                name: start.attr_string("name"),
                projection: None,
                znear: 0.0,
                zfar: 0.0,
            },
        })
    }
}

impl ElementParser for CameraParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::Optics(optics) = child {
            self.camera.projection = Some(optics.projection);
            self.camera.znear = optics.znear;
            self.camera.zfar = optics.zfar;
        }
        Ok(())
    }

    fn finish(self: Box<Self>, ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        if ctx.wants(ObjectFlags::CAMERA) {
            let ok = ctx.writer.write_camera(self.camera);
            ctx.check_written(ok, "camera")?;
        }
        Ok(Parsed::None)
    }

    fn object_id(&self) -> Option<UniqueId> {
        Some(self.camera.unique_id)
    }
}

/// `<perspective>` or `<orthographic>`
pub(crate) struct ProjectionParser {
    orthographic: bool,
    first: Option<f64>,
    second: Option<f64>,
    aspect_ratio: Option<f64>,
    znear: f64,
    zfar: f64,
}

impl ProjectionParser {
    pub fn new(start: &ElementStart<'_>) -> Self {
        Self {
            orthographic: start.name == "orthographic",
            first: None,
            second: None,
            aspect_ratio: None,
            znear: 0.0,
            zfar: 0.0,
        }
    }
}

impl ElementParser for ProjectionParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        let Parsed::Text { name, value } = child else {
            return Ok(());
        };
        let value = parse_float(&name, &value)?;
        match name.as_str() {
            "xfov" | "xmag" => self.first = Some(value),
            "yfov" | "ymag" => self.second = Some(value),
            "aspect_ratio" => self.aspect_ratio = Some(value),
            "znear" => self.znear = value,
            "zfar" => self.zfar = value,
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        let projection = if self.orthographic {
            Projection::Orthographic {
                xmag: self.first,
                ymag: self.second,
                aspect_ratio: self.aspect_ratio,
            }
        } else {
            Projection::Perspective {
                xfov: self.first,
                yfov: self.second,
                aspect_ratio: self.aspect_ratio,
            }
        };
        Ok(Parsed::Optics(OpticsData {
            projection,
            znear: self.znear,
            zfar: self.zfar,
        }))
    }
}

pub(crate) struct LightParser {
    light: Light,
}

impl LightParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        let mut light = Light::new(ctx.define_object(start, ClassId::Light)?);
        light.original_id = start.attr_string("id");
        light.name = start.attr_string("name");
        Ok(Self { light })
    }
}

impl ElementParser for LightParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::Light(data) = child {
            let light = &mut self.light;
            light.light_type = Some(data.light_type);
            if let Some(color) = data.color {
                light.color = color;
            }
            if let Some(value) = data.constant_attenuation {
                light.constant_attenuation = value;
            }
            if let Some(value) = data.linear_attenuation {
                light.linear_attenuation = value;
            }
            if let Some(value) = data.quadratic_attenuation {
                light.quadratic_attenuation = value;
            }
            if let Some(value) = data.falloff_angle {
                light.falloff_angle = value;
            }
            if let Some(value) = data.falloff_exponent {
                light.falloff_exponent = value;
            }
        }
        Ok(())
    }

    fn finish(self: Box<Self>, ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        if ctx.wants(ObjectFlags::LIGHT) {
            let ok = ctx.writer.write_light(self.light);
            ctx.check_written(ok, "light")?;
        }
        Ok(Parsed::None)
    }

    fn object_id(&self) -> Option<UniqueId> {
        Some(self.light.unique_id)
    }
}

/// `<ambient>`, `<directional>`, `<point>`, `<spot>`
pub(crate) struct LightTypeParser {
    data: LightData,
}

impl LightTypeParser {
    pub fn new(start: &ElementStart<'_>) -> Self {
        Self {
            data: LightData {
                light_type: LightType::from_element(start.name).unwrap_or(LightType::Point),
                color: None,
                constant_attenuation: None,
                linear_attenuation: None,
                quadratic_attenuation: None,
                falloff_angle: None,
                falloff_exponent: None,
            },
        }
    }
}

impl ElementParser for LightTypeParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        match child {
            Parsed::Color(color) => self.data.color = Some(color),
            Parsed::Text { name, value } => {
                let value = Some(parse_float(&name, &value)?);
                match name.as_str() {
                    "constant_attenuation" => self.data.constant_attenuation = value,
                    "linear_attenuation" => self.data.linear_attenuation = value,
                    "quadratic_attenuation" => self.data.quadratic_attenuation = value,
                    "falloff_angle" => self.data.falloff_angle = value,
                    "falloff_exponent" => self.data.falloff_exponent = value,
                    _ => {}
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Light(self.data))
    }
}
