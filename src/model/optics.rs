//! Camera and light types

use super::core::UniqueId;
use super::material::Color;

/// Projection of a camera
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Perspective projection; field of view in degrees
    Perspective {
        /// Horizontal field of view
        xfov: Option<f64>,
        /// Vertical field of view
        yfov: Option<f64>,
        /// Width over height
        aspect_ratio: Option<f64>,
    },
    /// Orthographic projection; magnifications in scene units
    Orthographic {
        /// Horizontal magnification
        xmag: Option<f64>,
        /// Vertical magnification
        ymag: Option<f64>,
        /// Width over height
        aspect_ratio: Option<f64>,
    },
}

/// A `<camera>`
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Session id
    pub unique_id: UniqueId,
    /// The `id` attribute
    pub original_id: Option<String>,
    /// The `name` attribute
    pub name: Option<String>,
    /// Projection; `None` if the optics had no common technique
    pub projection: Option<Projection>,
    /// Near clipping plane
    pub znear: f64,
    /// Far clipping plane
    pub zfar: f64,
}

/// Kind of a light
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    /// `<ambient>`
    Ambient,
    /// `<directional>`
    Directional,
    /// `<point>`
    Point,
    /// `<spot>`
    Spot,
}

impl LightType {
    /// Map an element name
    pub fn from_element(name: &str) -> Option<Self> {
        match name {
            "ambient" => Some(LightType::Ambient),
            "directional" => Some(LightType::Directional),
            "point" => Some(LightType::Point),
            "spot" => Some(LightType::Spot),
            _ => None,
        }
    }
}

/// A `<light>`
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// Session id
    pub unique_id: UniqueId,
    /// The `id` attribute
    pub original_id: Option<String>,
    /// The `name` attribute
    pub name: Option<String>,
    /// Kind; `None` if the light had no common technique
    pub light_type: Option<LightType>,
    /// Light color
    pub color: Color,
    /// Constant attenuation (point and spot)
    pub constant_attenuation: f64,
    /// Linear attenuation (point and spot)
    pub linear_attenuation: f64,
    /// Quadratic attenuation (point and spot)
    pub quadratic_attenuation: f64,
    /// Cone angle in degrees (spot)
    pub falloff_angle: f64,
    /// Cone falloff exponent (spot)
    pub falloff_exponent: f64,
}

impl Light {
    /// Light with COLLADA default parameters
    pub fn new(unique_id: UniqueId) -> Self {
        Self {
            unique_id,
            original_id: None,
            name: None,
            light_type: None,
            color: Color {
                r: 1.0,
                g: 1.0,
                b: 1.0,
                a: 1.0,
            },
            constant_attenuation: 1.0,
            linear_attenuation: 0.0,
            quadratic_attenuation: 0.0,
            falloff_angle: 180.0,
            falloff_exponent: 0.0,
        }
    }
}
