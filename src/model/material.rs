//! Material, effect and image types

use super::core::UniqueId;

/// A `<material>`
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Session id
    pub unique_id: UniqueId,
    /// The `id` attribute
    pub original_id: Option<String>,
    /// The `name` attribute
    pub name: Option<String>,
    /// Effect from `<instance_effect>`
    pub instantiated_effect: UniqueId,
}

/// RGBA color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red
    pub r: f64,
    /// Green
    pub g: f64,
    /// Blue
    pub b: f64,
    /// Alpha
    pub a: f64,
}

impl Color {
    /// Opaque black
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    /// Build from three or four components; alpha defaults to 1
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match *values {
            [r, g, b] => Some(Color { r, g, b, a: 1.0 }),
            [r, g, b, a] => Some(Color { r, g, b, a }),
            _ => None,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Texture reference of a shader parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// The `texture` attribute (sampler sid or image id)
    pub sampler: String,
    /// The `texcoord` attribute (texture coordinate set symbol)
    pub texcoord: Option<String>,
}

/// Value of a color-like shader parameter
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ColorOrTexture {
    /// Not specified in the document
    #[default]
    Unspecified,
    /// Constant color
    Color(Color),
    /// Texture lookup
    Texture(Texture),
}

/// Shading model of a common profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShaderType {
    /// `<constant>`
    Constant,
    /// `<lambert>`
    Lambert,
    /// `<phong>`
    #[default]
    Phong,
    /// `<blinn>`
    Blinn,
}

impl ShaderType {
    /// Map an element name
    pub fn from_element(name: &str) -> Option<Self> {
        match name {
            "constant" => Some(ShaderType::Constant),
            "lambert" => Some(ShaderType::Lambert),
            "phong" => Some(ShaderType::Phong),
            "blinn" => Some(ShaderType::Blinn),
            _ => None,
        }
    }
}

/// `<profile_COMMON>` shading parameters
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EffectCommon {
    /// Shading model
    pub shader_type: ShaderType,
    /// Emitted color
    pub emission: ColorOrTexture,
    /// Ambient color
    pub ambient: ColorOrTexture,
    /// Diffuse color
    pub diffuse: ColorOrTexture,
    /// Specular color
    pub specular: ColorOrTexture,
    /// Specular exponent
    pub shininess: Option<f64>,
    /// Reflected color
    pub reflective: ColorOrTexture,
    /// Reflection amount
    pub reflectivity: Option<f64>,
    /// Transparent color
    pub transparent: ColorOrTexture,
    /// Transparency amount
    pub transparency: Option<f64>,
    /// Index of refraction
    pub index_of_refraction: Option<f64>,
}

/// An `<effect>`
#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    /// Session id
    pub unique_id: UniqueId,
    /// The `id` attribute
    pub original_id: Option<String>,
    /// The `name` attribute
    pub name: Option<String>,
    /// One entry per `<profile_COMMON>`
    pub common_effects: Vec<EffectCommon>,
}

/// An `<image>`
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Session id
    pub unique_id: UniqueId,
    /// The `id` attribute
    pub original_id: Option<String>,
    /// The `name` attribute
    pub name: Option<String>,
    /// The `format` attribute
    pub format: Option<String>,
    /// Location from `<init_from>`, resolved against the document URI
    pub image_uri: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_slice() {
        assert_eq!(
            Color::from_slice(&[0.5, 0.25, 1.0]),
            Some(Color {
                r: 0.5,
                g: 0.25,
                b: 1.0,
                a: 1.0
            })
        );
        assert_eq!(Color::from_slice(&[1.0, 0.0, 0.0, 0.5]).map(|c| c.a), Some(0.5));
        assert_eq!(Color::from_slice(&[1.0]), None);
    }

    #[test]
    fn test_shader_type() {
        assert_eq!(ShaderType::from_element("blinn"), Some(ShaderType::Blinn));
        assert_eq!(ShaderType::from_element("glsl"), None);
    }
}
