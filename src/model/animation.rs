//! Animation curves and animation lists

use super::core::UniqueId;

/// Interpolation between two keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// `LINEAR`
    #[default]
    Linear,
    /// `STEP`
    Step,
    /// `BEZIER`
    Bezier,
    /// `HERMITE`
    Hermite,
    /// `BSPLINE`
    BSpline,
    /// `CARDINAL`
    Cardinal,
}

impl Interpolation {
    /// Map a `Name_array` entry; unknown names are `None`
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "LINEAR" => Some(Interpolation::Linear),
            "STEP" => Some(Interpolation::Step),
            "BEZIER" => Some(Interpolation::Bezier),
            "HERMITE" => Some(Interpolation::Hermite),
            "BSPLINE" => Some(Interpolation::BSpline),
            "CARDINAL" => Some(Interpolation::Cardinal),
            _ => None,
        }
    }
}

/// One animation curve, built from a `<sampler>`
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationCurve {
    /// Session id
    pub unique_id: UniqueId,
    /// The sampler's `id` attribute
    pub original_id: Option<String>,
    /// Key times
    pub input_values: Vec<f64>,
    /// Key values, `out_dimension` per key
    pub output_values: Vec<f64>,
    /// Values per key
    pub out_dimension: usize,
    /// Interpolation per key
    pub interpolations: Vec<Interpolation>,
    /// Incoming tangents
    pub in_tangents: Vec<f64>,
    /// Outgoing tangents
    pub out_tangents: Vec<f64>,
}

impl AnimationCurve {
    /// Number of keys
    pub fn key_count(&self) -> usize {
        self.input_values.len()
    }
}

/// Which part of a transformation a curve drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationClass {
    /// All values
    All,
    /// First component (`.X`)
    X,
    /// Second component (`.Y`)
    Y,
    /// Third component (`.Z`)
    Z,
    /// Rotation angle (`.ANGLE`)
    Angle,
    /// One matrix element, `(row)(column)`
    MatrixElement {
        /// Row
        row: usize,
        /// Column
        column: usize,
    },
    /// One element by index, `(n)`
    Element(usize),
}

/// One curve bound into an [`AnimationList`]
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationBinding {
    /// The curve
    pub animation: UniqueId,
    /// Driven component
    pub class: AnimationClass,
}

/// All curves driving one node transformation
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationList {
    /// Session id, referenced by [`crate::model::Transformation::animation_list`]
    pub unique_id: UniqueId,
    /// Curves in channel order
    pub bindings: Vec<AnimationBinding>,
}
