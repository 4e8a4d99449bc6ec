//! Loader configuration

use crate::grammar::{Family, ValidationPolicy};
use std::collections::HashMap;

bitflags::bitflags! {
    /// Object kinds handed to the writer
    ///
    /// Kinds that are not requested are still scanned far enough to keep
    /// references to them valid, but their content is not parsed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ObjectFlags: u32 {
        /// Global `<asset>` of the root document
        const ASSET = 1 << 0;
        /// `<scene>` of the root document
        const SCENE = 1 << 1;
        /// Visual scenes
        const VISUAL_SCENE = 1 << 2;
        /// `<library_nodes>`
        const LIBRARY_NODES = 1 << 3;
        /// Geometries
        const GEOMETRY = 1 << 4;
        /// Materials
        const MATERIAL = 1 << 5;
        /// Effects
        const EFFECT = 1 << 6;
        /// Cameras
        const CAMERA = 1 << 7;
        /// Lights
        const LIGHT = 1 << 8;
        /// Images
        const IMAGE = 1 << 9;
        /// Animation curves
        const ANIMATION = 1 << 10;
        /// Animation lists binding curves to transformations
        const ANIMATION_LIST = 1 << 11;
        /// Skin controller data
        const SKIN_CONTROLLER_DATA = 1 << 12;
        /// Skin and morph controllers
        const CONTROLLER = 1 << 13;
        /// Formulas
        const FORMULA = 1 << 14;
        /// Kinematics models and scenes
        const KINEMATICS = 1 << 15;
    }
}

impl Default for ObjectFlags {
    fn default() -> Self {
        Self::all()
    }
}

/// Configuration for a [`Loader`](crate::Loader)
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    object_flags: ObjectFlags,
    policies: HashMap<Family, ValidationPolicy>,
    external_references: bool,
}

impl LoaderConfig {
    /// Load everything, with the built-in validation policies
    pub fn new() -> Self {
        Self {
            object_flags: ObjectFlags::all(),
            policies: HashMap::new(),
            external_references: true,
        }
    }

    /// Restrict the object kinds handed to the writer
    pub fn with_object_flags(mut self, flags: ObjectFlags) -> Self {
        self.object_flags = flags;
        self
    }

    /// Override the validation policy of one element family
    ///
    /// # Example
    ///
    /// ```
    /// use collada_loader::{Family, LoaderConfig, ValidationPolicy};
    ///
    /// let config = LoaderConfig::new().with_policy(Family::Geometry, ValidationPolicy::Lenient);
    /// assert_eq!(config.policy(Family::Geometry), ValidationPolicy::Lenient);
    /// ```
    pub fn with_policy(mut self, family: Family, policy: ValidationPolicy) -> Self {
        self.policies.insert(family, policy);
        self
    }

    /// Whether documents referenced by URI are loaded as well
    pub fn with_external_references(mut self, enabled: bool) -> Self {
        self.external_references = enabled;
        self
    }

    /// Requested object kinds
    pub fn object_flags(&self) -> ObjectFlags {
        self.object_flags
    }

    /// Effective policy of a family
    pub fn policy(&self, family: Family) -> ValidationPolicy {
        self.policies
            .get(&family)
            .copied()
            .unwrap_or_else(|| family.default_policy())
    }

    /// Whether external documents are followed
    pub fn external_references(&self) -> bool {
        self.external_references
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.object_flags(), ObjectFlags::all());
        assert!(config.external_references());
        assert_eq!(config.policy(Family::Geometry), ValidationPolicy::Strict);
        assert_eq!(config.policy(Family::Scene), ValidationPolicy::Lenient);
    }

    #[test]
    fn test_overrides() {
        let config = LoaderConfig::new()
            .with_object_flags(ObjectFlags::GEOMETRY | ObjectFlags::MATERIAL)
            .with_policy(Family::Scene, ValidationPolicy::Strict)
            .with_external_references(false);
        assert!(config.object_flags().contains(ObjectFlags::GEOMETRY));
        assert!(!config.object_flags().contains(ObjectFlags::CAMERA));
        assert_eq!(config.policy(Family::Scene), ValidationPolicy::Strict);
        assert!(!config.external_references());
    }
}
